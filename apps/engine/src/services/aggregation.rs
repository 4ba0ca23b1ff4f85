//! Aggregation of the errors attributed to a problem.
//!
//! Aggregates are recomputed from an explicit error set on every read. For each
//! dimension the "first" value is the smallest one in lexicographic order, so a
//! given error set always yields the same aggregate regardless of input order.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::models::{DimensionSummary, ErrorContext, ProblemAggregate};

/// Summarize the errors of a problem having `pattern_count` patterns.
pub fn aggregate<'a, I>(pattern_count: usize, errors: I) -> ProblemAggregate
where
    I: IntoIterator<Item = &'a ErrorContext>,
{
    let mut error_count = 0;
    let mut scenarios = BTreeSet::new();
    let mut branches = BTreeSet::new();
    let mut releases = BTreeSet::new();
    let mut versions = BTreeSet::new();
    let mut countries = BTreeSet::new();
    let mut types = BTreeSet::new();
    let mut platforms = BTreeSet::new();
    let mut first_seen: Option<DateTime<Utc>> = None;
    let mut last_seen: Option<DateTime<Utc>> = None;

    for error in errors {
        error_count += 1;

        scenarios.insert(error.scenario.name.as_str());
        branches.insert(error.execution.branch.as_str());
        if let Some(release) = error.execution.release.as_deref() {
            releases.insert(release);
        }
        if let Some(version) = error.execution.version.as_deref() {
            versions.insert(version);
        }
        countries.insert(error.run.country.code.as_str());
        types.insert(error.run.run_type.code.as_str());
        platforms.insert(error.run.platform.as_str());

        let tested = error.execution.test_date_time;
        first_seen = Some(first_seen.map_or(tested, |seen| tested.min(seen)));
        last_seen = Some(last_seen.map_or(tested, |seen| tested.max(seen)));
    }

    ProblemAggregate {
        pattern_count,
        error_count,
        scenario_count: scenarios.len(),
        first_scenario_name: scenarios.first().map(|s| s.to_string()),
        branches: summarize(&branches),
        releases: summarize(&releases),
        versions: summarize(&versions),
        countries: summarize(&countries),
        types: summarize(&types),
        platforms: summarize(&platforms),
        first_seen_date_time: first_seen,
        last_seen_date_time: last_seen,
    }
}

fn summarize(values: &BTreeSet<&str>) -> DimensionSummary {
    DimensionSummary {
        count: values.len(),
        first: values.first().map(|v| v.to_string()),
    }
}
