use crate::rule::{Matcher, PatternFlags, ReplaceScope, Replacement, Rule, RuleError};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// A rule file: metadata plus an ordered list of rule definitions.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct PatchConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl PatchConfig {
    /// Check every definition, collecting all problems instead of stopping at
    /// the first. Patterns are compiled here so a malformed expression fails
    /// the load rather than a later session.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        let mut seen = HashSet::new();
        for def in &self.rules {
            let rule_id = (!def.id.trim().is_empty()).then(|| def.id.clone());
            let before = issues.len();

            if rule_id.is_none() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: None,
                    field: "id",
                });
            } else if !seen.insert(def.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId(def.id.clone()));
            }
            if def.file.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: rule_id.clone(),
                    field: "file",
                });
            }
            if def.find.is_blank() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: rule_id.clone(),
                    field: def.find.field_name("find"),
                });
            }
            if let Some(guard) = def.guard.as_ref().filter(|guard| guard.is_blank()) {
                issues.push(ValidationIssue::MissingField {
                    rule_id: rule_id.clone(),
                    field: guard.field_name("guard"),
                });
            }

            // Without a guard a required rule fails every run after the first.
            if def.required && def.guard.is_none() {
                issues.push(ValidationIssue::RequiredWithoutGuard(def.id.clone()));
            }

            // Only build the rule when the definition is otherwise complete,
            // so one mistake is reported once.
            if issues.len() == before {
                if let Err(err) = def.to_rule() {
                    issues.push(ValidationIssue::InvalidRule {
                        rule_id: def.id.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Resolve each rule's `file` against the workspace root
    #[serde(default)]
    pub workspace_relative: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleDefinition {
    pub id: String,
    pub file: String,
    pub find: MatcherSpec,
    /// Empty string deletes the match
    #[serde(default)]
    pub replace: String,
    #[serde(default)]
    pub guard: Option<MatcherSpec>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub scope: ReplaceScope,
    /// Expand `$1` / `${name}` in `replace`. Defaults to true for regex
    /// matchers and false for literals.
    #[serde(default)]
    pub expand: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RuleDefinition {
    /// Build the engine rule this definition describes.
    pub fn to_rule(&self) -> Result<Rule, RuleError> {
        let matcher = self.find.to_matcher(&self.id)?;
        let expand = self.expand.unwrap_or(!matcher.is_literal());
        let replacement = if expand {
            Replacement::Template(self.replace.clone())
        } else {
            Replacement::Literal(self.replace.clone())
        };

        let mut rule = Rule::new(self.id.clone(), matcher, replacement)?
            .with_scope(self.scope)?
            .required(self.required);
        if let Some(guard) = &self.guard {
            rule = rule.with_guard(guard.to_matcher(&self.id)?)?;
        }
        Ok(rule)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MatcherSpec {
    /// Exact substring
    Literal { text: String },
    Regex {
        pattern: String,
        #[serde(default)]
        multiline: bool,
        #[serde(default)]
        dot_matches_new_line: bool,
        #[serde(default)]
        case_insensitive: bool,
    },
}

impl MatcherSpec {
    pub fn to_matcher(&self, rule_id: &str) -> Result<Matcher, RuleError> {
        match self {
            MatcherSpec::Literal { text } => Ok(Matcher::literal(text.clone())),
            MatcherSpec::Regex {
                pattern,
                multiline,
                dot_matches_new_line,
                case_insensitive,
            } => {
                let flags = PatternFlags {
                    multiline: *multiline,
                    dot_matches_new_line: *dot_matches_new_line,
                    case_insensitive: *case_insensitive,
                };
                Matcher::pattern(pattern.clone(), flags).map_err(|source| {
                    RuleError::MalformedPattern {
                        rule: rule_id.to_string(),
                        pattern: pattern.clone(),
                        source,
                    }
                })
            }
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            MatcherSpec::Literal { text } => text.is_empty(),
            MatcherSpec::Regex { pattern, .. } => pattern.is_empty(),
        }
    }

    fn field_name(&self, prefix: &str) -> &'static str {
        match (prefix, self) {
            ("guard", MatcherSpec::Literal { .. }) => "guard.text",
            ("guard", MatcherSpec::Regex { .. }) => "guard.pattern",
            (_, MatcherSpec::Literal { .. }) => "find.text",
            (_, MatcherSpec::Regex { .. }) => "find.pattern",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyRuleList,
    MissingField {
        rule_id: Option<String>,
        field: &'static str,
    },
    DuplicateId(String),
    RequiredWithoutGuard(String),
    /// The definition is complete but does not form a valid rule
    InvalidRule { rule_id: String, message: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "rule file contains no rules"),
            ValidationIssue::MissingField { rule_id, field } => match rule_id {
                Some(id) => write!(f, "rule '{id}' missing required field '{field}'"),
                None => write!(f, "rule missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId(id) => write!(f, "rule id '{id}' is defined twice"),
            ValidationIssue::RequiredWithoutGuard(id) => write!(
                f,
                "rule '{id}' is required but has no guard; re-running it would fail"
            ),
            ValidationIssue::InvalidRule { message, .. } => write!(f, "{message}"),
        }
    }
}
