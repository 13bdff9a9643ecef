pub mod applicator;
pub mod loader;
pub mod schema;

pub use applicator::{apply_config, check_config, DocumentOutcome, PatchPlan};
pub use loader::{discover_rule_files, load_all, load_from_path, load_from_str, ConfigError};
pub use schema::{
    MatcherSpec, Metadata, PatchConfig, RuleDefinition, ValidationError, ValidationIssue,
};
