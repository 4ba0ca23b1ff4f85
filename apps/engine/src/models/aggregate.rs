//! Aggregate statistics of the errors attributed to a problem.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Distinct-value summary of one dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DimensionSummary {
    pub count: usize,
    /// Smallest value in the dimension's natural order.
    pub first: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemAggregate {
    pub pattern_count: usize,
    pub error_count: usize,
    pub scenario_count: usize,
    pub first_scenario_name: Option<String>,
    pub branches: DimensionSummary,
    pub releases: DimensionSummary,
    pub versions: DimensionSummary,
    /// By country code.
    pub countries: DimensionSummary,
    /// By run type code.
    pub types: DimensionSummary,
    pub platforms: DimensionSummary,
    pub first_seen_date_time: Option<DateTime<Utc>>,
    pub last_seen_date_time: Option<DateTime<Utc>>,
}
