//! Pattern matcher: decides whether an error satisfies every criterion of a pattern.

use crate::models::{Attribute, Criterion, CriterionValue, ErrorContext, PatternCriteria};

/// Whether `error` satisfies every set criterion of `criteria`.
///
/// A pattern whose criteria are all unset matches every error.
pub fn matches(error: &ErrorContext, criteria: &PatternCriteria) -> bool {
    Criterion::ALL.iter().all(|criterion| match criterion.value(criteria) {
        None => true,
        Some(value) => accepts(value, criterion.attribute(error)),
    })
}

/// Whether a criterion value accepts an attribute of an error.
pub fn accepts(value: CriterionValue<'_>, attribute: Attribute<'_>) -> bool {
    match (value, attribute) {
        (CriterionValue::Flag(expected), Attribute::Flag(actual)) => expected == actual,
        (CriterionValue::Exact(expected), Attribute::Text(Some(actual))) => expected == actual,
        (value, Attribute::Text(Some(actual))) => value
            .like_pattern()
            .is_some_and(|pattern| like_match(actual, &pattern)),
        _ => false,
    }
}

/// SQL `LIKE` where `%` is the only wildcard. Case-sensitive and anchored at both ends.
pub fn like_match(value: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('%').collect();

    if parts.len() == 1 {
        return value == pattern;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];

    if !value.starts_with(first) {
        return false;
    }
    let mut rest = &value[first.len()..];

    if rest.len() < last.len() || !rest.ends_with(last) {
        return false;
    }
    rest = &rest[..rest.len() - last.len()];

    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(index) => rest = &rest[index + part.len()..],
            None => return false,
        }
    }

    true
}
