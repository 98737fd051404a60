//! Column eligibility filter.
//!
//! Decides whether a column may take part in matching at all. Rules are
//! evaluated in order and the first match wins:
//!
//! 1. caller-supplied exclusion pattern -> excluded
//! 2. trailing identifier/key token (`*_ID`, `*_KEY`, `CUSTKEY`) -> eligible
//! 3. descriptive field (`NAME`, `TITLE`, `COMMENT`, ...) -> excluded
//! 4. measurement (`AMOUNT`, `PRICE`, ...) -> excluded
//! 5. system/audit column (`CREATED_AT`, `*_BY`, `_VERSION`, ...) -> excluded
//! 6. temporal or boolean base type -> excluded
//! 7. otherwise eligible
//!
//! A leading-underscore column whose only token is `ID` or `KEY` is
//! eligible unless a caller pattern excludes it; rule 2 covers it before
//! the audit check can fire.

use regex::Regex;

use super::keywords::KeywordTables;
use super::normalize::NormalizedName;

/// Outcome of the eligibility check, with the rule that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible(&'static str),
    Excluded(&'static str),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible(_))
    }

    /// Name of the rule that decided.
    pub fn rule(&self) -> &'static str {
        match self {
            Self::Eligible(rule) | Self::Excluded(rule) => rule,
        }
    }
}

/// Applies the eligibility rules to columns.
#[derive(Debug, Clone)]
pub struct EligibilityFilter<'k> {
    keywords: &'k KeywordTables,
    extra: Vec<Regex>,
}

impl<'k> EligibilityFilter<'k> {
    pub fn new(keywords: &'k KeywordTables) -> Self {
        Self {
            keywords,
            extra: Vec::new(),
        }
    }

    /// Add caller-supplied exclusion patterns, matched against the canonical name.
    pub fn with_exclusions(mut self, patterns: Vec<Regex>) -> Self {
        self.extra = patterns;
        self
    }

    /// Check a column by its normalized name and base type.
    pub fn check(&self, name: &NormalizedName, base_type: &str) -> Eligibility {
        // Caller patterns win over every built-in rule, key suffixes included.
        if self.extra.iter().any(|re| re.is_match(&name.canonical)) {
            return Eligibility::Excluded("custom_pattern");
        }
        if self.ends_with_key_token(name) {
            return Eligibility::Eligible("key_suffix");
        }

        let tokens = &name.tokens;
        let has = |set: &[&str]| tokens.iter().any(|t| set.contains(&t.as_str()));

        if has(self.keywords.descriptive) {
            return Eligibility::Excluded("descriptive");
        }
        if has(self.keywords.measurement) {
            return Eligibility::Excluded("measurement");
        }
        if self.is_audit(name) {
            return Eligibility::Excluded("audit");
        }
        if self.keywords.non_key_types.contains(&base_type) {
            return Eligibility::Excluded("non_key_type");
        }
        Eligibility::Eligible("default")
    }

    fn ends_with_key_token(&self, name: &NormalizedName) -> bool {
        name.last_token()
            .is_some_and(|last| self.keywords.split_key_suffix(last).is_some())
    }

    fn is_audit(&self, name: &NormalizedName) -> bool {
        if self.keywords.audit_names.contains(&name.canonical.as_str()) {
            return true;
        }
        if name
            .tokens
            .iter()
            .any(|t| self.keywords.audit_tokens.contains(&t.as_str()))
        {
            return true;
        }
        // `*_BY` / `*_AT` need a stem; a column called just `AT` is left alone.
        name.tokens.len() > 1
            && name
                .last_token()
                .is_some_and(|t| self.keywords.audit_suffixes.contains(&t))
    }
}
