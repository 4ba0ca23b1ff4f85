//! Problem models: a named, human-curated grouping of failure patterns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::aggregate::ProblemAggregate;
use super::pattern::{Pattern, PatternCriteria};
use super::stability::CycleStability;

/// Stored status of a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProblemStatus {
    Open,
    Closed,
}

impl ProblemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(Self::Open),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProblemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status as displayed: a closed problem whose errors came back after its closing date
/// has reappeared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EffectiveStatus {
    Open,
    Closed,
    Reappeared,
}

impl EffectiveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Reappeared => "REAPPEARED",
        }
    }
}

/// Whether the defect linked to a problem exists in the defect tracking system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DefectExistence {
    Exists,
    Nonexistent,
    /// The tracker could not be reached when the defect was last checked.
    Unknown,
}

impl DefectExistence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exists => "EXISTS",
            Self::Nonexistent => "NONEXISTENT",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "EXISTS" => Some(Self::Exists),
            "NONEXISTENT" => Some(Self::Nonexistent),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// A problem together with its owned patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub comment: Option<String>,
    pub status: ProblemStatus,
    pub blamed_team_id: Option<i64>,
    pub defect_id: Option<String>,
    pub defect_existence: Option<DefectExistence>,
    /// Derived from `defect_id`, never stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defect_url: Option<String>,
    pub closing_date_time: Option<DateTime<Utc>>,
    pub root_cause_id: Option<i64>,
    pub creation_date_time: DateTime<Utc>,
    pub patterns: Vec<Pattern>,
}

impl Problem {
    pub fn has_defect(&self) -> bool {
        self.defect_id.as_deref().is_some_and(|d| !d.trim().is_empty())
    }

    /// REAPPEARED when closed before the last time one of its errors was seen.
    pub fn effective_status(&self, last_seen: Option<DateTime<Utc>>) -> EffectiveStatus {
        match self.status {
            ProblemStatus::Open => EffectiveStatus::Open,
            ProblemStatus::Closed => match (self.closing_date_time, last_seen) {
                (Some(closing), Some(seen)) if closing < seen => EffectiveStatus::Reappeared,
                _ => EffectiveStatus::Closed,
            },
        }
    }
}

/// Tracker-driven fields of a problem, computed from the defect it was linked to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefectStatusUpdate {
    pub problem_id: i64,
    pub defect_id: String,
    pub defect_existence: DefectExistence,
    pub status: ProblemStatus,
    pub closing_date_time: Option<DateTime<Utc>>,
}

impl DefectStatusUpdate {
    /// Snapshot of the tracker-driven fields of a problem linked to a defect.
    pub fn of(problem: &Problem) -> Option<Self> {
        Some(DefectStatusUpdate {
            problem_id: problem.id,
            defect_id: problem.defect_id.clone()?,
            defect_existence: problem.defect_existence?,
            status: problem.status,
            closing_date_time: problem.closing_date_time,
        })
    }
}

/// A problem to create.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProblem {
    pub name: String,
    pub comment: Option<String>,
    pub blamed_team_id: Option<i64>,
    pub defect_id: Option<String>,
    pub root_cause_id: Option<i64>,
    pub patterns: Vec<PatternCriteria>,
}

/// Client-editable properties of a problem. Applied as a full replacement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemProperties {
    pub name: String,
    pub comment: Option<String>,
    pub blamed_team_id: Option<i64>,
    pub defect_id: Option<String>,
    pub root_cause_id: Option<i64>,
}

/// A problem with its read-side computations.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemWithAggregate {
    pub problem: Problem,
    pub aggregate: ProblemAggregate,
    pub effective_status: EffectiveStatus,
    pub stabilities: Vec<CycleStability>,
}

/// Result of moving a pattern to another problem.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickUpPatternResult {
    pub destination_problem: Problem,
    /// The source problem, when it lost its last pattern and was deleted.
    pub deleted_problem: Option<Problem>,
}

/// Result of deleting a pattern.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePatternResult {
    /// The owning problem, when it lost its last pattern and was deleted.
    pub deleted_problem: Option<Problem>,
}

/// A team errors can be blamed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub assign_to_problems: bool,
}

/// Cause category a problem must name when closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootCause {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
}
