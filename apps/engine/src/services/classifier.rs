//! Problem classifier: attributes errors to the problems whose patterns match them.

use std::collections::BTreeMap;

use crate::models::{ErrorContext, Problem};

use super::matcher::matches;

/// Whether at least one pattern of the problem matches the error.
pub fn problem_matches(error: &ErrorContext, problem: &Problem) -> bool {
    problem
        .patterns
        .iter()
        .any(|pattern| matches(error, &pattern.criteria))
}

/// Map every error to the ids of the problems it belongs to, ascending.
///
/// Errors matching no problem map to an empty list.
pub fn classify_errors(errors: &[ErrorContext], problems: &[Problem]) -> BTreeMap<i64, Vec<i64>> {
    let mut result = BTreeMap::new();

    for error in errors {
        let mut problem_ids: Vec<i64> = problems
            .iter()
            .filter(|problem| problem_matches(error, problem))
            .map(|problem| problem.id)
            .collect();
        problem_ids.sort_unstable();
        problem_ids.dedup();

        result.insert(error.id(), problem_ids);
    }

    tracing::debug!(
        "Classified {} errors against {} problems",
        errors.len(),
        problems.len()
    );

    result
}
