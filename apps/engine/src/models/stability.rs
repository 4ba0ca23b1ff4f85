//! Stability timelines of a problem.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Status of one execution slot in a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StabilityStatus {
    /// No execution occupies the slot.
    #[serde(rename = "-")]
    NotRun,
    /// The execution has at least one error of the problem.
    #[serde(rename = "E")]
    Error,
    /// The execution ran without any error of the problem.
    #[serde(rename = "O")]
    Ok,
}

impl StabilityStatus {
    pub fn as_char(&self) -> char {
        match self {
            Self::NotRun => '-',
            Self::Error => 'E',
            Self::Ok => 'O',
        }
    }
}

impl std::fmt::Display for StabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStability {
    pub status: StabilityStatus,
    pub execution_id: Option<i64>,
    pub test_date_time: Option<DateTime<Utc>>,
}

impl ExecutionStability {
    pub fn not_run() -> Self {
        ExecutionStability {
            status: StabilityStatus::NotRun,
            execution_id: None,
            test_date_time: None,
        }
    }
}

/// One timeline row: the most recent executions of a cycle, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleStability {
    pub cycle_definition_id: i64,
    pub branch: String,
    pub cycle_name: String,
    pub executions: Vec<ExecutionStability>,
}

impl CycleStability {
    /// Compact rendering such as `--OOEEO`.
    pub fn timeline(&self) -> String {
        self.executions.iter().map(|e| e.status.as_char()).collect()
    }
}
