//! Ingested test results: the error containment chain.
//!
//! These records come from the ingestion pipeline and are never mutated by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Country a run was executed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: i64,
    pub project_id: i64,
    pub code: String,
    pub name: String,
}

/// Run type (API, desktop browser, mobile browser...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunType {
    pub id: i64,
    pub project_id: i64,
    pub code: String,
    pub name: String,
    pub is_browser: bool,
    pub is_mobile: bool,
}

/// A named recurring test cycle on a branch, e.g. "develop/day".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleDefinition {
    pub id: i64,
    pub project_id: i64,
    pub branch: String,
    pub name: String,
    /// Display order of the branch among the project's branches.
    pub branch_position: i32,
}

/// One execution of a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub id: i64,
    pub cycle_definition_id: i64,
    pub branch: String,
    pub name: String,
    pub release: Option<String>,
    pub version: Option<String>,
    pub test_date_time: DateTime<Utc>,
}

/// One country/type/platform combination executed within an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: i64,
    pub execution_id: i64,
    pub country: Country,
    pub run_type: RunType,
    pub platform: String,
}

/// A scenario as executed by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedScenario {
    pub id: i64,
    pub run_id: i64,
    pub feature_file: String,
    pub feature_name: String,
    pub name: String,
    pub severity: String,
    pub line: i32,
}

/// One failed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    pub id: i64,
    pub executed_scenario_id: i64,
    pub step: String,
    pub step_definition: String,
    pub step_line: i32,
    pub exception: Option<String>,
}

/// An error together with the scenario, run and execution it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub error: Error,
    pub scenario: ExecutedScenario,
    pub run: Run,
    pub execution: Execution,
}

impl ErrorContext {
    pub fn id(&self) -> i64 {
        self.error.id
    }
}
