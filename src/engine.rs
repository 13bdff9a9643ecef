//! Patch engine - runs one rule set against one document
//!
//! A session:
//! - Resolves and loads the document (optionally confined to a workspace)
//! - Folds the rule set over the content in order, each rule seeing the
//!   output of the rule before it
//! - Aborts without writing when a required rule's matcher is absent
//! - Persists atomically, and only when the content actually changed

use crate::document::Document;
use crate::rule::{ApplyResult, RuleError, RuleSet};
use crate::safety::{SafetyError, WorkspaceGuard};
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Outcome of one rule within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleReport {
    pub rule: String,
    pub result: ApplyResult,
}

/// Line-level size of a session's change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub lines_added: usize,
    pub lines_removed: usize,
}

impl DiffSummary {
    pub fn between(before: &str, after: &str) -> Self {
        let mut summary = Self::default();
        if before == after {
            return summary;
        }
        for change in TextDiff::from_lines(before, after).iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => summary.lines_added += 1,
                ChangeTag::Delete => summary.lines_removed += 1,
                ChangeTag::Equal => {}
            }
        }
        summary
    }
}

/// Result of folding a rule set over in-memory content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub content: String,
    pub reports: Vec<RuleReport>,
    /// Id of the required rule that stopped the fold, if any
    pub aborted_by: Option<String>,
}

/// Apply `rules` to `content` in order without touching the filesystem.
///
/// Stops at the first required rule whose matcher is absent; rules after it
/// get no report.
pub fn apply_rules(content: &str, rules: &RuleSet) -> Fold {
    let mut current = content.to_string();
    let mut reports = Vec::with_capacity(rules.len());
    let mut aborted_by = None;

    for rule in rules {
        let (next, result) = rule.apply(&current);
        let next = match next {
            Cow::Owned(next) => Some(next),
            Cow::Borrowed(_) => None,
        };
        if let Some(next) = next {
            current = next;
        }

        log::debug!("rule '{}': {}", rule.id(), result);
        reports.push(RuleReport {
            rule: rule.id().to_string(),
            result,
        });

        if result.is_failed() {
            aborted_by = Some(rule.id().to_string());
            break;
        }
    }

    Fold {
        content: current,
        reports,
        aborted_by,
    }
}

/// Summary of a completed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[must_use = "SessionResult should be checked for applied/skipped rules"]
pub struct SessionResult {
    /// Resolved path of the document
    pub document: PathBuf,
    pub reports: Vec<RuleReport>,
    /// Content differs from what was loaded
    pub changed: bool,
    /// Content was written back (false for unchanged documents and dry runs)
    pub persisted: bool,
    pub original_hash: u64,
    pub final_hash: u64,
    pub diff: DiffSummary,
    #[serde(skip)]
    pub original_content: String,
    #[serde(skip)]
    pub final_content: String,
}

impl SessionResult {
    pub fn applied(&self) -> usize {
        self.reports.iter().filter(|r| r.result.is_applied()).count()
    }

    pub fn skipped(&self) -> usize {
        self.reports.iter().filter(|r| r.result.is_skipped()).count()
    }

    pub fn report(&self, rule: &str) -> Option<&ApplyResult> {
        self.reports
            .iter()
            .find(|r| r.rule == rule)
            .map(|r| &r.result)
    }

    /// Unified diff from the loaded content to the final content; empty when
    /// nothing changed.
    pub fn unified_diff(&self) -> String {
        if !self.changed {
            return String::new();
        }
        let name = self.document.display().to_string();
        let diff = TextDiff::from_lines(&self.original_content, &self.final_content)
            .unified_diff()
            .context_radius(3)
            .header(&name, &name)
            .to_string();
        diff
    }
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A required rule's matcher was not found. Carries the reports produced
    /// up to and including the failing rule; nothing was written.
    #[error("required rule '{rule}' did not match {document}; document has drifted from its expected shape")]
    RequiredRuleAbsent {
        document: PathBuf,
        rule: String,
        reports: Vec<RuleReport>,
    },

    /// A rule definition did not compile; raised before any document is read.
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Workspace(#[from] SafetyError),
}

/// Runs patch sessions.
///
/// Sessions against the same document must be serialized by the caller.
#[derive(Debug, Clone, Default)]
pub struct PatchEngine {
    workspace: Option<WorkspaceGuard>,
    dry_run: bool,
}

impl PatchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Confine documents to `guard`'s workspace; relative identities are
    /// resolved against its root.
    pub fn with_workspace(mut self, guard: WorkspaceGuard) -> Self {
        self.workspace = Some(guard);
        self
    }

    /// Compute results without writing anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn workspace(&self) -> Option<&WorkspaceGuard> {
        self.workspace.as_ref()
    }

    /// Run `rules` against the document at `document`.
    pub fn run(
        &self,
        document: impl AsRef<Path>,
        rules: &RuleSet,
    ) -> Result<SessionResult, PatchError> {
        self.session(document.as_ref(), rules, !self.dry_run)
    }

    /// Same as [`run`](Self::run) but never writes, whatever the engine's
    /// dry-run setting.
    pub fn check(
        &self,
        document: impl AsRef<Path>,
        rules: &RuleSet,
    ) -> Result<SessionResult, PatchError> {
        self.session(document.as_ref(), rules, false)
    }

    fn session(
        &self,
        identity: &Path,
        rules: &RuleSet,
        write: bool,
    ) -> Result<SessionResult, PatchError> {
        let mut session = Session::open(self, identity)?;
        session.apply(rules)?;
        session.finish(write)
    }
}

/// Owns a document for the duration of one run.
struct Session<'e> {
    engine: &'e PatchEngine,
    document: Document,
    reports: Vec<RuleReport>,
}

impl<'e> Session<'e> {
    fn open(engine: &'e PatchEngine, identity: &Path) -> Result<Self, PatchError> {
        let path = match &engine.workspace {
            Some(guard) => guard.resolve(identity)?,
            None => identity.to_path_buf(),
        };
        let document = Document::load(&path).map_err(|source| PatchError::Io {
            path: path.clone(),
            source,
        })?;
        log::debug!("loaded {} ({} bytes)", path.display(), document.content().len());

        Ok(Self {
            engine,
            document,
            reports: Vec::new(),
        })
    }

    fn apply(&mut self, rules: &RuleSet) -> Result<(), PatchError> {
        let fold = apply_rules(self.document.content(), rules);
        if let Some(rule) = fold.aborted_by {
            log::warn!(
                "required rule '{}' absent in {}; aborting without writing",
                rule,
                self.document.path().display()
            );
            return Err(PatchError::RequiredRuleAbsent {
                document: self.document.path().to_path_buf(),
                rule,
                reports: fold.reports,
            });
        }
        self.reports = fold.reports;
        self.document.set_content(fold.content);
        Ok(())
    }

    fn finish(self, write: bool) -> Result<SessionResult, PatchError> {
        let changed = self.document.is_modified();
        let path = self.document.path().to_path_buf();

        let persisted = if changed && write {
            if let Some(guard) = &self.engine.workspace {
                guard.revalidate(&path)?;
            }
            self.document.persist().map_err(|source| PatchError::Io {
                path: path.clone(),
                source,
            })?
        } else {
            false
        };

        let result = SessionResult {
            reports: self.reports,
            changed,
            persisted,
            original_hash: self.document.original_hash(),
            final_hash: self.document.content_hash(),
            diff: DiffSummary::between(self.document.original(), self.document.content()),
            original_content: self.document.original().to_string(),
            final_content: self.document.content().to_string(),
            document: path,
        };

        if result.persisted {
            log::info!(
                "patched {} ({} applied, {} skipped)",
                result.document.display(),
                result.applied(),
                result.skipped()
            );
        } else if !changed {
            log::debug!("{} unchanged; skipping write", result.document.display());
        }

        Ok(result)
    }
}
