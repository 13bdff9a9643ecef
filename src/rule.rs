//! Rules: a single text transformation plus its applicability checks.
//!
//! A [`Rule`] pairs a [`Matcher`] (the pre-condition) with a [`Replacement`] and
//! an optional guard matcher (the post-condition). When the guard already
//! matches the current content the rule is skipped, which is what makes a
//! second run of the same [`RuleSet`] against a patched document a no-op.

use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::ops::Range;
use thiserror::Error;

/// Flags applied when compiling a [`Pattern`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PatternFlags {
    /// `^` and `$` match at line boundaries
    pub multiline: bool,
    /// `.` also matches `\n`
    pub dot_matches_new_line: bool,
    pub case_insensitive: bool,
}

impl PatternFlags {
    pub fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    pub fn dot_matches_new_line(mut self) -> Self {
        self.dot_matches_new_line = true;
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }
}

/// A compiled regular expression together with the source it was built from.
///
/// Equality ignores the compiled automaton and compares source and flags.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    flags: PatternFlags,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: impl Into<String>, flags: PatternFlags) -> Result<Self, regex::Error> {
        let source = source.into();
        let regex = RegexBuilder::new(&source)
            .multi_line(flags.multiline)
            .dot_matches_new_line(flags.dot_matches_new_line)
            .case_insensitive(flags.case_insensitive)
            .build()?;
        Ok(Self {
            source,
            flags,
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> PatternFlags {
        self.flags
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

impl Eq for Pattern {}

/// Locates text in a document: either an exact substring or a regex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    Literal(String),
    Pattern(Pattern),
}

impl Matcher {
    pub fn literal(text: impl Into<String>) -> Self {
        Matcher::Literal(text.into())
    }

    pub fn pattern(source: impl Into<String>, flags: PatternFlags) -> Result<Self, regex::Error> {
        Pattern::new(source, flags).map(Matcher::Pattern)
    }

    /// True if at least one match exists in `content`.
    pub fn is_match(&self, content: &str) -> bool {
        match self {
            Matcher::Literal(text) => content.contains(text.as_str()),
            Matcher::Pattern(pattern) => pattern.regex.is_match(content),
        }
    }

    /// Locate the first match and its capture groups.
    ///
    /// Literal matchers report a single group (the matched text itself).
    pub fn find(&self, content: &str) -> MatchOutcome {
        match self {
            Matcher::Literal(text) => match content.find(text.as_str()) {
                Some(start) => MatchOutcome::Found {
                    span: start..start + text.len(),
                    groups: vec![Some(text.clone())],
                },
                None => MatchOutcome::Absent,
            },
            Matcher::Pattern(pattern) => match pattern.regex.captures(content) {
                Some(caps) => MatchOutcome::Found {
                    span: caps.get(0).map_or(0..0, |m| m.range()),
                    groups: caps
                        .iter()
                        .map(|group| group.map(|m| m.as_str().to_string()))
                        .collect(),
                },
                None => MatchOutcome::Absent,
            },
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Matcher::Literal(_))
    }

    fn is_empty_literal(&self) -> bool {
        matches!(self, Matcher::Literal(text) if text.is_empty())
    }

    /// Same text to search for, also across kinds: a literal and a flag-free
    /// pattern with identical source count as one expression.
    fn same_expression(&self, other: &Matcher) -> bool {
        match (self, other) {
            (Matcher::Literal(text), Matcher::Pattern(pattern))
            | (Matcher::Pattern(pattern), Matcher::Literal(text)) => {
                pattern.flags == PatternFlags::default() && pattern.source == *text
            }
            _ => self == other,
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Literal(text) => write!(f, "literal {:?}", text),
            Matcher::Pattern(pattern) => write!(f, "pattern /{}/", pattern.source),
        }
    }
}

/// Result of searching content with a [`Matcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Absent,
    Found {
        /// Byte range of the first match
        span: Range<usize>,
        /// Capture groups of the first match; index 0 is the whole match
        groups: Vec<Option<String>>,
    },
}

impl MatchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, MatchOutcome::Found { .. })
    }
}

/// Text written in place of a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    /// Inserted verbatim; `$` has no special meaning
    Literal(String),
    /// `$1` / `${name}` references are expanded against the match
    Template(String),
}

impl Replacement {
    pub fn as_str(&self) -> &str {
        match self {
            Replacement::Literal(text) | Replacement::Template(text) => text,
        }
    }
}

/// How many matches a pattern rule replaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplaceScope {
    #[default]
    First,
    All,
}

/// Outcome of applying one rule to the current content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
#[must_use = "ApplyResult should be checked for failure"]
pub enum ApplyResult {
    /// Matcher found and content rewritten
    Applied { replacements: usize },
    /// Guard already matches; the rule's effect is present
    SkippedGuard,
    /// Matcher not found and the rule is optional
    SkippedAbsent,
    /// Matcher not found and the rule is required
    Failed,
}

impl ApplyResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyResult::Applied { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ApplyResult::SkippedGuard | ApplyResult::SkippedAbsent)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ApplyResult::Failed)
    }
}

impl fmt::Display for ApplyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyResult::Applied { replacements: 1 } => write!(f, "applied"),
            ApplyResult::Applied { replacements } => {
                write!(f, "applied ({} replacements)", replacements)
            }
            ApplyResult::SkippedGuard => write!(f, "skipped (already applied)"),
            ApplyResult::SkippedAbsent => write!(f, "skipped (matcher absent)"),
            ApplyResult::Failed => write!(f, "failed (required matcher absent)"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("rule '{rule}': {what} must not be empty")]
    EmptyMatcher { rule: String, what: &'static str },

    #[error("rule '{rule}': malformed pattern {pattern:?}: {source}")]
    MalformedPattern {
        rule: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{rule}': guard must differ from the matcher it guards")]
    GuardEqualsMatcher { rule: String },

    #[error("rule '{rule}': {message}")]
    InvalidCombination { rule: String, message: String },

    #[error("duplicate rule id '{0}'")]
    DuplicateId(String),
}

/// One text transformation.
///
/// Rules are immutable once built; every constructor and builder step
/// validates the combination it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    id: String,
    matcher: Matcher,
    replacement: Replacement,
    scope: ReplaceScope,
    guard: Option<Matcher>,
    required: bool,
}

impl Rule {
    /// Literal substring rule: replaces the first occurrence of `find`.
    pub fn literal(
        id: impl Into<String>,
        find: impl Into<String>,
        replace: impl Into<String>,
    ) -> Result<Self, RuleError> {
        Self::new(
            id,
            Matcher::literal(find),
            Replacement::Literal(replace.into()),
        )
    }

    /// Regex rule. The pattern is compiled here so malformed expressions
    /// surface before any document is touched.
    pub fn pattern(
        id: impl Into<String>,
        pattern: &str,
        flags: PatternFlags,
        replacement: Replacement,
    ) -> Result<Self, RuleError> {
        let id = id.into();
        let matcher =
            Matcher::pattern(pattern, flags).map_err(|source| RuleError::MalformedPattern {
                rule: id.clone(),
                pattern: pattern.to_string(),
                source,
            })?;
        Self::new(id, matcher, replacement)
    }

    pub fn new(
        id: impl Into<String>,
        matcher: Matcher,
        replacement: Replacement,
    ) -> Result<Self, RuleError> {
        let id = id.into();
        if matcher.is_empty_literal() {
            return Err(RuleError::EmptyMatcher {
                rule: id,
                what: "matcher",
            });
        }
        if matcher.is_literal() && matches!(replacement, Replacement::Template(_)) {
            return Err(RuleError::InvalidCombination {
                rule: id,
                message: "template replacements require a pattern matcher".to_string(),
            });
        }
        Ok(Self {
            id,
            matcher,
            replacement,
            scope: ReplaceScope::First,
            guard: None,
            required: false,
        })
    }

    /// Skip this rule whenever `guard` already matches the current content.
    pub fn with_guard(mut self, guard: Matcher) -> Result<Self, RuleError> {
        if guard.is_empty_literal() {
            return Err(RuleError::EmptyMatcher {
                rule: self.id,
                what: "guard",
            });
        }
        if guard.same_expression(&self.matcher) {
            return Err(RuleError::GuardEqualsMatcher { rule: self.id });
        }
        self.guard = Some(guard);
        Ok(self)
    }

    pub fn with_guard_literal(self, text: impl Into<String>) -> Result<Self, RuleError> {
        self.with_guard(Matcher::literal(text))
    }

    pub fn with_guard_pattern(self, pattern: &str, flags: PatternFlags) -> Result<Self, RuleError> {
        let guard =
            Matcher::pattern(pattern, flags).map_err(|source| RuleError::MalformedPattern {
                rule: self.id.clone(),
                pattern: pattern.to_string(),
                source,
            })?;
        self.with_guard(guard)
    }

    pub fn with_scope(mut self, scope: ReplaceScope) -> Result<Self, RuleError> {
        if scope == ReplaceScope::All && self.matcher.is_literal() {
            return Err(RuleError::InvalidCombination {
                rule: self.id,
                message: "literal rules always replace the first occurrence".to_string(),
            });
        }
        self.scope = scope;
        Ok(self)
    }

    /// A required rule fails the session when its matcher is absent.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn replacement(&self) -> &Replacement {
        &self.replacement
    }

    pub fn scope(&self) -> ReplaceScope {
        self.scope
    }

    pub fn guard(&self) -> Option<&Matcher> {
        self.guard.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn matches(&self, content: &str) -> MatchOutcome {
        self.matcher.find(content)
    }

    pub fn guard_satisfied(&self, content: &str) -> bool {
        self.guard
            .as_ref()
            .is_some_and(|guard| guard.is_match(content))
    }

    /// Apply this rule to `content`.
    ///
    /// Content is borrowed back unchanged for every outcome except `Applied`.
    pub fn apply<'a>(&self, content: &'a str) -> (Cow<'a, str>, ApplyResult) {
        if self.guard_satisfied(content) {
            return (Cow::Borrowed(content), ApplyResult::SkippedGuard);
        }

        match (&self.matcher, self.scope) {
            (Matcher::Pattern(pattern), ReplaceScope::All) => {
                let regex = pattern.regex();
                let replacements = regex.find_iter(content).count();
                if replacements == 0 {
                    return (Cow::Borrowed(content), self.absent());
                }
                let replaced = match &self.replacement {
                    Replacement::Literal(text) => {
                        regex.replace_all(content, NoExpand(text.as_str()))
                    }
                    Replacement::Template(template) => {
                        regex.replace_all(content, template.as_str())
                    }
                };
                (replaced, ApplyResult::Applied { replacements })
            }
            (Matcher::Pattern(pattern), ReplaceScope::First) => {
                let Some(caps) = pattern.regex().captures(content) else {
                    return (Cow::Borrowed(content), self.absent());
                };
                let span = caps.get(0).map_or(0..0, |m| m.range());
                let mut out = String::with_capacity(content.len());
                out.push_str(&content[..span.start]);
                match &self.replacement {
                    Replacement::Literal(text) => out.push_str(text),
                    Replacement::Template(template) => caps.expand(template, &mut out),
                }
                out.push_str(&content[span.end..]);
                (Cow::Owned(out), ApplyResult::Applied { replacements: 1 })
            }
            (Matcher::Literal(_), _) => {
                let MatchOutcome::Found { span, .. } = self.matches(content) else {
                    return (Cow::Borrowed(content), self.absent());
                };
                let text = self.replacement.as_str();
                let mut out = String::with_capacity(content.len() - span.len() + text.len());
                out.push_str(&content[..span.start]);
                out.push_str(text);
                out.push_str(&content[span.end..]);
                (Cow::Owned(out), ApplyResult::Applied { replacements: 1 })
            }
        }
    }

    fn absent(&self) -> ApplyResult {
        if self.required {
            ApplyResult::Failed
        } else {
            ApplyResult::SkippedAbsent
        }
    }
}

/// An ordered sequence of rules applied within one session.
///
/// Order matters: each rule sees the content produced by the rules before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    name: String,
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    pub fn from_rules(
        name: impl Into<String>,
        rules: impl IntoIterator<Item = Rule>,
    ) -> Result<Self, RuleError> {
        let mut set = Self::new(name);
        for rule in rules {
            set.push(rule)?;
        }
        Ok(set)
    }

    /// Append a rule. Ids must be unique within the set.
    pub fn push(&mut self, rule: Rule) -> Result<(), RuleError> {
        if self.get(rule.id()).is_some() {
            return Err(RuleError::DuplicateId(rule.id));
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_replaces_first_occurrence() {
        let rule = Rule::literal("b", "B", "X").unwrap();
        let (out, result) = rule.apply("A B C");
        assert_eq!(out, "A X C");
        assert_eq!(result, ApplyResult::Applied { replacements: 1 });

        let (out, _) = rule.apply("B B");
        assert_eq!(out, "X B");
    }

    #[test]
    fn test_guard_skips_reapplication() {
        let rule = Rule::literal("b", "B", "X")
            .unwrap()
            .with_guard_literal("X")
            .unwrap();
        let (out, result) = rule.apply("A X C");
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, "A X C");
        assert_eq!(result, ApplyResult::SkippedGuard);
    }

    #[test]
    fn test_guard_checked_before_matcher() {
        let rule = Rule::literal("b", "B", "X")
            .unwrap()
            .with_guard_literal("X")
            .unwrap()
            .required(true);
        // Matcher present too, but the guard wins.
        let (out, result) = rule.apply("B X");
        assert_eq!(out, "B X");
        assert_eq!(result, ApplyResult::SkippedGuard);
    }

    #[test]
    fn test_absent_optional_and_required() {
        let optional = Rule::literal("opt", "missing", "x").unwrap();
        let (out, result) = optional.apply("content");
        assert_eq!(out, "content");
        assert_eq!(result, ApplyResult::SkippedAbsent);

        let required = optional.clone().required(true);
        let (out, result) = required.apply("content");
        assert_eq!(out, "content");
        assert_eq!(result, ApplyResult::Failed);
        assert!(result.is_failed());
    }

    #[test]
    fn test_literal_replacement_is_not_expanded() {
        let rule = Rule::literal("cash", "price", "$1 ${name}").unwrap();
        let (out, _) = rule.apply("the price");
        assert_eq!(out, "the $1 ${name}");
    }

    #[test]
    fn test_pattern_template_uses_first_match_groups() {
        let rule = Rule::pattern(
            "swap",
            r"(\w+)=(\w+)",
            PatternFlags::default(),
            Replacement::Template("$2=$1".to_string()),
        )
        .unwrap();
        let (out, result) = rule.apply("a=b c=d");
        assert_eq!(out, "b=a c=d");
        assert_eq!(result, ApplyResult::Applied { replacements: 1 });
    }

    #[test]
    fn test_pattern_named_group_template() {
        let rule = Rule::pattern(
            "import",
            r"import (?P<name>\w+) from",
            PatternFlags::default(),
            Replacement::Template("import { ${name} } from".to_string()),
        )
        .unwrap();
        let (out, _) = rule.apply("import Foo from './Foo'");
        assert_eq!(out, "import { Foo } from './Foo'");
    }

    #[test]
    fn test_pattern_literal_replacement_keeps_dollar() {
        let rule = Rule::pattern(
            "dollar",
            r"\d+",
            PatternFlags::default(),
            Replacement::Literal("$1".to_string()),
        )
        .unwrap();
        let (out, _) = rule.apply("cost 42");
        assert_eq!(out, "cost $1");
    }

    #[test]
    fn test_pattern_scope_all_counts_replacements() {
        let rule = Rule::pattern(
            "quotes",
            "\"",
            PatternFlags::default(),
            Replacement::Literal("'".to_string()),
        )
        .unwrap()
        .with_scope(ReplaceScope::All)
        .unwrap();
        let (out, result) = rule.apply(r#"f("a", "b")"#);
        assert_eq!(out, "f('a', 'b')");
        assert_eq!(result, ApplyResult::Applied { replacements: 4 });
    }

    #[test]
    fn test_dot_matches_new_line_flag() {
        let text = "<button>\n  Settings\n</button>\n</button>";
        let plain = Rule::pattern(
            "tabs",
            r"Settings.*</button>\s*</button>",
            PatternFlags::default(),
            Replacement::Literal("Settings</button>".to_string()),
        )
        .unwrap();
        assert_eq!(plain.apply(text).1, ApplyResult::SkippedAbsent);

        let dotall = Rule::pattern(
            "tabs",
            r"Settings.*</button>\s*</button>",
            PatternFlags::default().dot_matches_new_line(),
            Replacement::Literal("Settings</button>".to_string()),
        )
        .unwrap();
        let (out, result) = dotall.apply(text);
        assert!(result.is_applied());
        assert_eq!(out, "<button>\n  Settings</button>");
    }

    #[test]
    fn test_multiline_flag_anchors_lines() {
        let rule = Rule::pattern(
            "indent",
            r"^x",
            PatternFlags::default().multiline(),
            Replacement::Literal("y".to_string()),
        )
        .unwrap()
        .with_scope(ReplaceScope::All)
        .unwrap();
        let (out, result) = rule.apply("x\nx\n");
        assert_eq!(out, "y\ny\n");
        assert_eq!(result, ApplyResult::Applied { replacements: 2 });
    }

    #[test]
    fn test_matches_reports_groups() {
        let rule = Rule::pattern(
            "kv",
            r"(\w+)=(\d+)?",
            PatternFlags::default(),
            Replacement::Literal(String::new()),
        )
        .unwrap();
        match rule.matches("key=") {
            MatchOutcome::Found { span, groups } => {
                assert_eq!(span, 0..4);
                assert_eq!(
                    groups,
                    vec![Some("key=".to_string()), Some("key".to_string()), None]
                );
            }
            MatchOutcome::Absent => panic!("expected a match"),
        }
        assert_eq!(rule.matches("nothing"), MatchOutcome::Absent);
    }

    #[test]
    fn test_malformed_pattern_rejected() {
        let err = Rule::pattern(
            "bad",
            "(unclosed",
            PatternFlags::default(),
            Replacement::Literal(String::new()),
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::MalformedPattern { ref rule, .. } if rule == "bad"));

        let err = Rule::literal("bad-guard", "a", "b")
            .unwrap()
            .with_guard_pattern("[", PatternFlags::default())
            .unwrap_err();
        assert!(matches!(err, RuleError::MalformedPattern { .. }));
    }

    #[test]
    fn test_guard_must_differ_from_matcher() {
        let err = Rule::literal("same", "B", "X")
            .unwrap()
            .with_guard_literal("B")
            .unwrap_err();
        assert!(matches!(err, RuleError::GuardEqualsMatcher { .. }));

        // Same source with different flags is a different expression.
        let rule = Rule::pattern(
            "flags",
            "b",
            PatternFlags::default(),
            Replacement::Literal("B".to_string()),
        )
        .unwrap()
        .with_guard_pattern("b", PatternFlags::default().case_insensitive());
        assert!(rule.is_ok());
    }

    #[test]
    fn test_guard_equal_across_matcher_kinds() {
        let err = Rule::pattern(
            "regex-find",
            "B",
            PatternFlags::default(),
            Replacement::Literal("X".to_string()),
        )
        .unwrap()
        .with_guard_literal("B")
        .unwrap_err();
        assert!(matches!(err, RuleError::GuardEqualsMatcher { .. }));

        let err = Rule::literal("literal-find", "B", "X")
            .unwrap()
            .with_guard_pattern("B", PatternFlags::default())
            .unwrap_err();
        assert!(matches!(err, RuleError::GuardEqualsMatcher { .. }));

        // Flags change what the pattern matches.
        let rule = Rule::pattern(
            "flagged",
            "b",
            PatternFlags::default().case_insensitive(),
            Replacement::Literal("X".to_string()),
        )
        .unwrap()
        .with_guard_literal("b");
        assert!(rule.is_ok());
    }

    #[test]
    fn test_invalid_combinations() {
        assert!(matches!(
            Rule::literal("empty", "", "x"),
            Err(RuleError::EmptyMatcher { .. })
        ));
        assert!(matches!(
            Rule::literal("all", "a", "b")
                .unwrap()
                .with_scope(ReplaceScope::All),
            Err(RuleError::InvalidCombination { .. })
        ));
        assert!(matches!(
            Rule::new(
                "template",
                Matcher::literal("a"),
                Replacement::Template("$1".to_string())
            ),
            Err(RuleError::InvalidCombination { .. })
        ));
    }

    #[test]
    fn test_rule_set_rejects_duplicate_ids() {
        let mut set = RuleSet::new("dupes");
        set.push(Rule::literal("one", "a", "b").unwrap()).unwrap();
        let err = set
            .push(Rule::literal("one", "c", "d").unwrap())
            .unwrap_err();
        assert!(matches!(err, RuleError::DuplicateId(ref id) if id == "one"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_apply_result_display() {
        assert_eq!(ApplyResult::Applied { replacements: 1 }.to_string(), "applied");
        assert!(ApplyResult::Applied { replacements: 3 }
            .to_string()
            .contains("3 replacements"));
        assert!(ApplyResult::SkippedGuard.to_string().contains("already"));
        assert!(ApplyResult::Failed.to_string().contains("failed"));
    }
}
