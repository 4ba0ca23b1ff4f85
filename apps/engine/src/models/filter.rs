//! Search criteria over the problems of a project.

use serde::{Deserialize, Serialize};

use super::problem::{DefectExistence, EffectiveStatus, Problem};

/// Status filter. `Closed` excludes reappeared problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemStatusFilter {
    Open,
    Closed,
    Reappeared,
    OpenOrReappeared,
}

impl ProblemStatusFilter {
    pub fn accepts(&self, status: EffectiveStatus) -> bool {
        match self {
            Self::Open => status == EffectiveStatus::Open,
            Self::Closed => status == EffectiveStatus::Closed,
            Self::Reappeared => status == EffectiveStatus::Reappeared,
            Self::OpenOrReappeared => {
                matches!(status, EffectiveStatus::Open | EffectiveStatus::Reappeared)
            }
        }
    }
}

/// Special `defect_id` filter value selecting problems without a defect.
pub const NO_DEFECT: &str = "none";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemFilter {
    /// Case-insensitive substring of the name.
    pub name: Option<String>,
    pub status: Option<ProblemStatusFilter>,
    pub blamed_team_id: Option<i64>,
    /// Case-insensitive substring of the defect id, or [`NO_DEFECT`].
    pub defect_id: Option<String>,
    pub defect_existence: Option<DefectExistence>,
    pub root_cause_id: Option<i64>,
}

impl ProblemFilter {
    /// Whether the stored properties pass the filter. The status filter needs the
    /// effective status and is applied separately.
    pub fn accepts_properties(&self, problem: &Problem) -> bool {
        if let Some(name) = non_blank(&self.name) {
            if !problem.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }

        if let Some(defect) = non_blank(&self.defect_id) {
            if defect.eq_ignore_ascii_case(NO_DEFECT) {
                if problem.has_defect() {
                    return false;
                }
            } else {
                let matches = problem
                    .defect_id
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&defect.to_lowercase()));
                if !matches {
                    return false;
                }
            }
        }

        if self.blamed_team_id.is_some() && problem.blamed_team_id != self.blamed_team_id {
            return false;
        }
        if self.root_cause_id.is_some() && problem.root_cause_id != self.root_cause_id {
            return false;
        }
        if self.defect_existence.is_some() && problem.defect_existence != self.defect_existence {
            return false;
        }

        true
    }

    pub fn accepts_status(&self, status: EffectiveStatus) -> bool {
        self.status.is_none_or(|filter| filter.accepts(status))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
