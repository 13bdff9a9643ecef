//! Rule file applicator - turns a loaded config into patch sessions
//!
//! This module:
//! - Groups rule definitions by target document, keeping file order and the
//!   rule order inside each file
//! - Compiles every rule before any document is read
//! - Runs one engine session per document and reports each outcome

use crate::config::schema::PatchConfig;
use crate::engine::{PatchEngine, PatchError, SessionResult};
use crate::rule::{RuleError, RuleSet};
use std::path::{Component, Path, PathBuf};

/// Compiled rules for one target document.
#[derive(Debug, Clone)]
pub struct PatchPlan {
    pub document: PathBuf,
    pub rules: RuleSet,
}

/// Session outcome for one document.
pub type DocumentOutcome = (PathBuf, Result<SessionResult, PatchError>);

impl PatchConfig {
    /// Resolve target documents and compile their rule sets.
    ///
    /// Fails on the first rule that does not compile, before any I/O.
    pub fn compile(&self, workspace_root: &Path) -> Result<Vec<PatchPlan>, RuleError> {
        let mut plans: Vec<PatchPlan> = Vec::new();

        for def in &self.rules {
            let document = if self.meta.workspace_relative {
                normalize(&workspace_root.join(&def.file))
            } else {
                normalize(Path::new(&def.file))
            };
            let rule = def.to_rule()?;

            match plans.iter_mut().find(|plan| plan.document == document) {
                Some(plan) => plan.rules.push(rule)?,
                None => {
                    let mut rules = RuleSet::new(self.meta.name.clone());
                    rules.push(rule)?;
                    plans.push(PatchPlan { document, rules });
                }
            }
        }

        Ok(plans)
    }
}

/// Lexical normalization so `a.txt` and `./a.txt` share one session.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

/// Apply a rule file, one session per target document.
///
/// Honors the engine's dry-run setting. A rule that does not compile fails
/// the whole file with [`PatchError::Rule`] before any document is read.
pub fn apply_config(
    config: &PatchConfig,
    workspace_root: &Path,
    engine: &PatchEngine,
) -> Result<Vec<DocumentOutcome>, PatchError> {
    let plans = config.compile(workspace_root)?;
    Ok(plans
        .into_iter()
        .map(|plan| {
            let result = engine.run(&plan.document, &plan.rules);
            (plan.document, result)
        })
        .collect())
}

/// Evaluate a rule file without writing anything.
pub fn check_config(
    config: &PatchConfig,
    workspace_root: &Path,
    engine: &PatchEngine,
) -> Result<Vec<DocumentOutcome>, PatchError> {
    let plans = config.compile(workspace_root)?;
    Ok(plans
        .into_iter()
        .map(|plan| {
            let result = engine.check(&plan.document, &plan.rules);
            (plan.document, result)
        })
        .collect())
}
