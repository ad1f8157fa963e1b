//! Semantic type inference.
//!
//! A column is classified by walking [`SEMANTIC_RULES`] in order and taking
//! the first rule that matches. Value rules look at a small sample of
//! stringified non-null values; name rules look at the lowercased column
//! name. Reordering the table changes results, so any change to it bumps
//! [`SEMANTIC_RULESET_VERSION`].

use super::types::SemanticType;
use regex::Regex;
use std::sync::LazyLock;

pub const SEMANTIC_RULESET_VERSION: u32 = 1;

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok());

static PHONE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\+?1?-?\.?\s?\(?[0-9]{3}\)?[\s.-]?[0-9]{3}[\s.-]?[0-9]{4}$").ok()
});

static DATE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"^\d{4}-\d{2}-\d{2}", r"^\d{2}/\d{2}/\d{4}", r"^\d{2}-\d{2}-\d{4}"]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// What a rule inspects
#[derive(Debug, Clone, Copy)]
pub enum RuleTest {
    /// Any sampled value matches the pattern
    AnyValue(fn(&str) -> bool),
    /// The lowercased column name contains one of the keywords
    NameContains(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct SemanticRule {
    pub label: SemanticType,
    pub test: RuleTest,
}

impl SemanticRule {
    fn matches(&self, lowered_name: &str, samples: &[String]) -> bool {
        match self.test {
            RuleTest::AnyValue(predicate) => samples.iter().any(|s| predicate(s)),
            RuleTest::NameContains(keywords) => keywords.iter().any(|k| lowered_name.contains(k)),
        }
    }
}

fn is_email(value: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(value))
}

fn is_phone(value: &str) -> bool {
    PHONE_RE.as_ref().is_some_and(|re| re.is_match(value))
}

fn is_date_prefix(value: &str) -> bool {
    DATE_RES.iter().any(|re| re.is_match(value))
}

/// Ordered, first-match-wins classification table
pub const SEMANTIC_RULES: &[SemanticRule] = &[
    SemanticRule {
        label: SemanticType::Email,
        test: RuleTest::AnyValue(is_email),
    },
    SemanticRule {
        label: SemanticType::Phone,
        test: RuleTest::AnyValue(is_phone),
    },
    SemanticRule {
        label: SemanticType::Date,
        test: RuleTest::AnyValue(is_date_prefix),
    },
    SemanticRule {
        label: SemanticType::Identifier,
        test: RuleTest::NameContains(&["id", "key", "uuid"]),
    },
    SemanticRule {
        label: SemanticType::Currency,
        test: RuleTest::NameContains(&["price", "cost", "amount", "salary"]),
    },
    SemanticRule {
        label: SemanticType::Geographic,
        test: RuleTest::NameContains(&["address", "city", "state", "country", "zip"]),
    },
];

/// Classify a column from its name and a sample of stringified non-null values.
pub fn classify(column_name: &str, samples: &[String]) -> SemanticType {
    let lowered = column_name.to_lowercase();
    SEMANTIC_RULES
        .iter()
        .find(|rule| rule.matches(&lowered, samples))
        .map_or(SemanticType::Generic, |rule| rule.label)
}
