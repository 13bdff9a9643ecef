use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::json;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use text_patcher::config::{
    apply_config, check_config, load_all, DocumentOutcome, MatcherSpec, PatchConfig,
};
use text_patcher::{ApplyResult, PatchEngine, PatchError, RuleReport, WorkspaceGuard};

#[derive(Parser)]
#[command(name = "text-patcher")]
#[command(about = "Idempotent text patching with literal and regex rules", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply rule files to their target documents
    Apply {
        /// Rule file, or directory of .toml rule files
        #[arg(short, long)]
        rules: PathBuf,

        /// Workspace root documents must live in (defaults to the current directory)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Show what would change without writing
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show a diff of each changed document
        #[arg(short, long)]
        diff: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report which rules would apply, without writing
    Check {
        /// Rule file, or directory of .toml rule files
        #[arg(short, long)]
        rules: PathBuf,

        /// Workspace root documents must live in (defaults to the current directory)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the rules in rule files
    List {
        /// Rule file, or directory of .toml rule files
        #[arg(short, long)]
        rules: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Apply {
            rules,
            workspace,
            dry_run,
            diff,
            json,
        } => cmd_apply(&rules, workspace, dry_run, diff, json),

        Commands::Check {
            rules,
            workspace,
            json,
        } => cmd_check(&rules, workspace, json),

        Commands::List { rules } => cmd_list(&rules),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Resolve the workspace root.
///
/// Priority order:
/// 1. Explicit --workspace flag
/// 2. TEXT_PATCHER_WORKSPACE environment variable
/// 3. Current directory
fn resolve_workspace(cli_workspace: Option<PathBuf>) -> Result<WorkspaceGuard> {
    let root = match cli_workspace {
        Some(path) => path,
        None => match env::var_os("TEXT_PATCHER_WORKSPACE") {
            Some(path) => PathBuf::from(path),
            None => env::current_dir().context("cannot determine current directory")?,
        },
    };
    WorkspaceGuard::new(&root)
        .with_context(|| format!("invalid workspace {}", root.display()))
}

fn load_rule_files(rules: &Path) -> Result<Vec<(PathBuf, PatchConfig)>> {
    Ok(load_all(rules)?)
}

/// Tally of rule outcomes across every document.
#[derive(Default)]
struct Totals {
    applied: usize,
    already_applied: usize,
    absent: usize,
    failed: usize,
    changed_documents: usize,
}

impl Totals {
    fn record(&mut self, reports: &[RuleReport]) {
        for report in reports {
            match report.result {
                ApplyResult::Applied { .. } => self.applied += 1,
                ApplyResult::SkippedGuard => self.already_applied += 1,
                ApplyResult::SkippedAbsent => self.absent += 1,
                ApplyResult::Failed => self.failed += 1,
            }
        }
    }

    fn print(&self, applied_label: &str) {
        println!("{}", "Summary:".bold());
        println!(
            "  {} {}",
            format!("{}", self.applied).green(),
            applied_label
        );
        println!(
            "  {} already applied",
            format!("{}", self.already_applied).yellow()
        );
        println!("  {} skipped (absent)", format!("{}", self.absent).cyan());
        println!("  {} failed", format!("{}", self.failed).red());
    }
}

fn cmd_apply(
    rules: &Path,
    workspace: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
    as_json: bool,
) -> Result<()> {
    let guard = resolve_workspace(workspace)?;
    let root = guard.root().to_path_buf();
    let engine = PatchEngine::new().with_workspace(guard).dry_run(dry_run);

    let rule_files = load_rule_files(rules)?;
    let mut totals = Totals::default();
    let mut json_entries = Vec::new();

    if !as_json {
        println!("Workspace: {}", root.display());
        if dry_run {
            println!("{}", "[DRY RUN - no documents will be written]".cyan());
        }
        println!();
    }

    for (rule_file, config) in &rule_files {
        let outcomes = apply_config(config, &root, &engine)
            .with_context(|| format!("cannot compile rules in {}", rule_file.display()))?;

        if as_json {
            json_entries.extend(outcomes.iter().map(|o| outcome_json(rule_file, o)));
        } else {
            println!("Applying rules from {}...", rule_file.display());
        }

        for (document, result) in &outcomes {
            match result {
                Ok(session) => {
                    totals.record(&session.reports);
                    if session.changed {
                        totals.changed_documents += 1;
                    }
                    if as_json {
                        continue;
                    }
                    print_reports(document, &session.reports, dry_run);
                    if show_diff && session.changed {
                        display_diff(document, &session.original_content, &session.final_content);
                    }
                }
                Err(err) => {
                    match err {
                        // Reports end with the failing rule.
                        PatchError::RequiredRuleAbsent { reports, .. } => totals.record(reports),
                        _ => totals.failed += 1,
                    }
                    if !as_json {
                        print_error(document, err, dry_run);
                    }
                }
            }
        }

        if !as_json {
            println!();
        }
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&json_entries)?);
    } else {
        let label = if dry_run { "would apply" } else { "applied" };
        totals.print(label);
        println!(
            "  {} document(s) {}",
            totals.changed_documents,
            if dry_run { "would change" } else { "changed" }
        );
    }

    if totals.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_check(rules: &Path, workspace: Option<PathBuf>, as_json: bool) -> Result<()> {
    let guard = resolve_workspace(workspace)?;
    let root = guard.root().to_path_buf();
    let engine = PatchEngine::new().with_workspace(guard);

    let rule_files = load_rule_files(rules)?;
    let mut pending = Vec::new();
    let mut patched = Vec::new();
    let mut not_applicable = Vec::new();
    let mut broken = Vec::new();
    let mut json_entries = Vec::new();

    for (rule_file, config) in &rule_files {
        let outcomes = check_config(config, &root, &engine)
            .with_context(|| format!("cannot compile rules in {}", rule_file.display()))?;
        json_entries.extend(outcomes.iter().map(|o| outcome_json(rule_file, o)));

        for (document, result) in outcomes {
            match result {
                Ok(session) => {
                    for report in &session.reports {
                        let entry = (document.clone(), report.rule.clone());
                        match report.result {
                            ApplyResult::Applied { .. } => pending.push(entry),
                            ApplyResult::SkippedGuard => patched.push(entry),
                            // Failed ends the session as RequiredRuleAbsent.
                            ApplyResult::SkippedAbsent | ApplyResult::Failed => {
                                not_applicable.push(entry)
                            }
                        }
                    }
                }
                Err(PatchError::RequiredRuleAbsent { rule, .. }) => {
                    broken.push((document, rule, "required text not found".to_string()));
                }
                Err(err) => broken.push((document, String::from("-"), err.to_string())),
            }
        }
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&json_entries)?);
    } else {
        println!("{}", "Rule Status Report".bold());
        println!("Workspace: {}", root.display());
        println!();
        print_group("✓", "UP TO DATE", &patched, |s| s.green());
        print_group("⊙", "PENDING", &pending, |s| s.yellow());
        print_group("⊘", "NOT APPLICABLE", &not_applicable, |s| s.cyan());

        if !broken.is_empty() {
            println!(
                "{} {} ({} documents)",
                "✗".red(),
                "FAILED".red().bold(),
                broken.len()
            );
            for (document, rule, reason) in &broken {
                println!("  - {} [{}] ({})", document.display(), rule, reason.dimmed());
            }
            println!();
        }
    }

    if !pending.is_empty() || !broken.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_group(
    symbol: &str,
    title: &str,
    entries: &[(PathBuf, String)],
    paint: impl Fn(&str) -> colored::ColoredString,
) {
    if entries.is_empty() {
        return;
    }
    println!(
        "{} {} ({} rules)",
        paint(symbol),
        paint(title).bold(),
        entries.len()
    );
    for (document, rule) in entries {
        println!("  - {} ({})", rule, document.display().to_string().dimmed());
    }
    println!();
}

fn cmd_list(rules: &Path) -> Result<()> {
    for (rule_file, config) in load_rule_files(rules)? {
        let name = if config.meta.name.is_empty() {
            rule_file.display().to_string()
        } else {
            config.meta.name.clone()
        };
        println!("{} ({})", name.bold(), rule_file.display());
        if let Some(description) = &config.meta.description {
            println!("  {}", description.dimmed());
        }

        for def in &config.rules {
            let kind = match def.find {
                MatcherSpec::Literal { .. } => "literal",
                MatcherSpec::Regex { .. } => "regex",
            };
            let mut flags = Vec::new();
            if def.required {
                flags.push("required");
            }
            if def.guard.is_some() {
                flags.push("guarded");
            }
            println!(
                "  - {} [{}] -> {}{}",
                def.id,
                kind,
                def.file,
                if flags.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", flags.join(", "))
                }
            );
        }
        println!();
    }
    Ok(())
}

fn print_reports(document: &Path, reports: &[RuleReport], dry_run: bool) {
    for report in reports {
        match report.result {
            ApplyResult::Applied { replacements } => {
                let verb = if dry_run { "Would apply to" } else { "Applied to" };
                let count = if replacements > 1 {
                    format!(" ({replacements} replacements)")
                } else {
                    String::new()
                };
                println!(
                    "{} {}: {} {}{}",
                    "✓".green(),
                    report.rule,
                    verb,
                    document.display(),
                    count
                );
            }
            ApplyResult::SkippedGuard => {
                println!(
                    "{} {}: Already applied to {}",
                    "⊙".yellow(),
                    report.rule,
                    document.display()
                );
            }
            ApplyResult::SkippedAbsent => {
                println!(
                    "{} {}: Skipped (no match in {})",
                    "⊘".cyan(),
                    report.rule,
                    document.display()
                );
            }
            ApplyResult::Failed => {
                eprintln!("{} {}: Failed - required text not found", "✗".red(), report.rule);
            }
        }
    }
}

fn print_error(document: &Path, err: &PatchError, dry_run: bool) {
    match err {
        PatchError::RequiredRuleAbsent { rule, reports, .. } => {
            print_reports(document, reports, dry_run);
            eprintln!(
                "  {}",
                format!("CONFLICT: required rule '{}' matched nothing", rule).red()
            );
            eprintln!("  File: {}", document.display());
            eprintln!("  Possible causes:");
            eprintln!("    - The document was edited since the rules were written");
            eprintln!("    - An earlier rule in this file changed the text it expects");
            eprintln!("  No changes were written to this document.");
        }
        PatchError::Io { path, source } => {
            eprintln!("{} {}: {}", "✗".red(), path.display(), source);
        }
        other => {
            eprintln!("{} {}: {}", "✗".red(), document.display(), other);
        }
    }
}

fn outcome_json(rule_file: &Path, (document, result): &DocumentOutcome) -> serde_json::Value {
    match result {
        Ok(session) => json!({
            "rules_file": rule_file,
            "status": "ok",
            "session": session,
        }),
        Err(PatchError::RequiredRuleAbsent { rule, reports, .. }) => json!({
            "rules_file": rule_file,
            "document": document,
            "status": "aborted",
            "failed_rule": rule,
            "reports": reports,
        }),
        Err(err) => json!({
            "rules_file": rule_file,
            "document": document,
            "status": "error",
            "error": err.to_string(),
        }),
    }
}

/// Show a line diff between original and patched content.
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);
    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => continue,
        };
        print!("{}", line);
    }
    println!();
}
