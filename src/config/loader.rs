use crate::config::schema::{PatchConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
    /// A rule directory could not be walked
    Discovery {
        path: PathBuf,
        source: walkdir::Error,
    },
    /// A rule directory holds no `.toml` files
    NoRuleFiles { path: PathBuf },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read rule file {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(f, "failed to parse rule file {}: {}", path.display(), source),
                None => write!(f, "failed to parse rule TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid rule file {}:\n{}", path.display(), source),
                None => write!(f, "invalid rule file:\n{}", source),
            },
            ConfigError::Discovery { path, source } => {
                write!(f, "failed to scan {}: {}", path.display(), source)
            }
            ConfigError::NoRuleFiles { path } => {
                write!(f, "no .toml rule files found in {}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
            ConfigError::Discovery { source, .. } => Some(source),
            ConfigError::NoRuleFiles { .. } => None,
        }
    }
}

pub fn load_from_str(input: &str) -> Result<PatchConfig, ConfigError> {
    let config: PatchConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Find the rule files to load for `path`.
///
/// A file is returned as-is. A directory yields its top-level `.toml` files
/// in name order, which is the order their rule sets run in.
pub fn discover_rule_files(path: impl AsRef<Path>) -> Result<Vec<PathBuf>, ConfigError> {
    let path = path.as_ref();
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).max_depth(1) {
        let entry = entry.map_err(|source| ConfigError::Discovery {
            path: path.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|ext| ext.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(ConfigError::NoRuleFiles {
            path: path.to_path_buf(),
        });
    }
    Ok(files)
}

/// Load every rule file under `path` (see [`discover_rule_files`]).
pub fn load_all(path: impl AsRef<Path>) -> Result<Vec<(PathBuf, PatchConfig)>, ConfigError> {
    discover_rule_files(path)?
        .into_iter()
        .map(|file| load_from_path(&file).map(|config| (file, config)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ValidationIssue;

    const VALID: &str = r#"
[meta]
name = "tabs"

[[rules]]
id = "b-to-x"
file = "doc.txt"
find = { type = "literal", text = "B" }
replace = "X"
guard = { type = "literal", text = "X" }
"#;

    #[test]
    fn test_load_valid_config() {
        let config = load_from_str(VALID).unwrap();
        assert_eq!(config.meta.name, "tabs");
        assert_eq!(config.rules.len(), 1);
        assert!(!config.rules[0].required);
    }

    #[test]
    fn test_toml_syntax_error() {
        let err = load_from_str("[[rules]\nid = ").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { path: None, .. }));
    }

    #[test]
    fn test_validation_collects_all_issues() {
        let input = r#"
[[rules]]
id = "dup"
file = ""
find = { type = "literal", text = "a" }

[[rules]]
id = "dup"
file = "x.txt"
find = { type = "regex", pattern = "" }
"#;
        let err = load_from_str(input).unwrap_err();
        let ConfigError::Validation { source, .. } = err else {
            panic!("expected validation error");
        };
        assert!(source.issues.contains(&ValidationIssue::MissingField {
            rule_id: Some("dup".to_string()),
            field: "file",
        }));
        assert!(source
            .issues
            .contains(&ValidationIssue::DuplicateId("dup".to_string())));
        assert!(source.issues.contains(&ValidationIssue::MissingField {
            rule_id: Some("dup".to_string()),
            field: "find.pattern",
        }));
    }

    #[test]
    fn test_malformed_pattern_fails_load() {
        let input = r#"
[[rules]]
id = "broken"
file = "x.txt"
find = { type = "regex", pattern = "(unclosed" }
"#;
        let err = load_from_str(input).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("broken"), "{message}");
        assert!(message.contains("malformed pattern"), "{message}");
    }

    #[test]
    fn test_guard_equal_to_find_rejected() {
        let input = r#"
[[rules]]
id = "loop"
file = "x.txt"
find = { type = "literal", text = "B" }
replace = "X"
guard = { type = "literal", text = "B" }
"#;
        let err = load_from_str(input).unwrap_err();
        assert!(err.to_string().contains("guard must differ"));
    }

    #[test]
    fn test_required_rule_needs_guard() {
        let input = r#"
[[rules]]
id = "b"
file = "x.txt"
required = true
find = { type = "literal", text = "B" }
replace = "X"
"#;
        let err = load_from_str(input).unwrap_err();
        let ConfigError::Validation { source, .. } = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            source.issues,
            vec![ValidationIssue::RequiredWithoutGuard("b".to_string())]
        );

        let guarded = format!("{input}guard = {{ type = \"literal\", text = \"X\" }}\n");
        assert!(load_from_str(&guarded).is_ok());
    }

    #[test]
    fn test_empty_rule_list_rejected() {
        let err = load_from_str("[meta]\nname = \"empty\"\n").unwrap_err();
        let ConfigError::Validation { source, .. } = err else {
            panic!("expected validation error");
        };
        assert_eq!(source.issues, vec![ValidationIssue::EmptyRuleList]);
    }

    #[test]
    fn test_load_from_path_attaches_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("bad.toml");
        fs::write(&file, "[[rules]]\nid = \"x\"\n").unwrap();
        let err = load_from_path(&file).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_discover_rule_files_sorted() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("20-style.toml"), VALID).unwrap();
        fs::write(temp_dir.path().join("10-tabs.toml"), VALID).unwrap();
        fs::write(temp_dir.path().join("notes.md"), "ignored").unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("nested/30-deep.toml"), VALID).unwrap();

        let files = discover_rule_files(temp_dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["10-tabs.toml", "20-style.toml"]);

        let loaded = load_all(temp_dir.path()).unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_discover_empty_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = discover_rule_files(temp_dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NoRuleFiles { .. }));
    }
}
