//! Text Patcher: idempotent source-text patching
//!
//! Applies an ordered [`RuleSet`] of literal and regex substitutions to a text
//! document and writes the result back. The engine knows nothing about the
//! grammar of the document it edits; it works purely on text.
//!
//! # Architecture
//!
//! A [`Rule`] is a matcher (the pre-condition), a replacement, and an optional
//! guard (the post-condition). The [`PatchEngine`] loads a document, folds the
//! rule set over its content in order, and persists once at the end.
//!
//! # Safety
//!
//! - Rules whose guard already matches are skipped, so re-running a rule set
//!   on a patched document changes nothing
//! - A required rule whose matcher is absent aborts the session before any write
//! - Atomic file writes (tempfile + fsync + rename), skipped when unchanged
//! - Optional workspace boundary enforcement
//! - Malformed patterns are rejected when a rule is built
//!
//! # Example
//!
//! ```no_run
//! use text_patcher::{PatchEngine, Rule, RuleSet};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rules = RuleSet::from_rules(
//!     "perf-tab",
//!     [Rule::literal(
//!         "import-optimizer",
//!         "import './Images.css'",
//!         "import './Images.css'\nimport PerformanceOptimizer from './PerformanceOptimizer'",
//!     )?
//!     .with_guard_literal("import PerformanceOptimizer")?
//!     .required(true)],
//! )?;
//!
//! let result = PatchEngine::new().run("src/components/Images.tsx", &rules)?;
//! println!("{} applied, changed: {}", result.applied(), result.changed);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod engine;
pub mod rule;
pub mod safety;

// Re-exports
pub use config::{
    apply_config, check_config, load_from_path, load_from_str, ConfigError, PatchConfig,
};
pub use document::Document;
pub use engine::{
    apply_rules, DiffSummary, Fold, PatchEngine, PatchError, RuleReport, SessionResult,
};
pub use rule::{
    ApplyResult, MatchOutcome, Matcher, Pattern, PatternFlags, ReplaceScope, Replacement, Rule,
    RuleError, RuleSet,
};
pub use safety::{SafetyError, WorkspaceGuard};
