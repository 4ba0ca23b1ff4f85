//! Contract with the external defect tracking system.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{DefectExistence, Problem, ProblemStatus};

/// Placeholder URL prefix used when the adapter has no URL template.
pub const UNCONFIGURED_DEFECT_URL_PREFIX: &str =
    "please-configure-project-setting-defect-url-format-";

/// Placeholder replaced by the defect id in URL templates.
pub const DEFECT_ID_PLACEHOLDER: &str = "{{id}}";

/// Status of a defect as reported by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defect {
    pub id: String,
    pub status: ProblemStatus,
    /// Set when the defect is closed.
    pub close_date_time: Option<DateTime<Utc>>,
}

/// The tracker could not be queried.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct DefectFetchError(pub String);

/// Adapter to a defect tracking system (Jira, GitHub issues...).
#[async_trait]
pub trait DefectAdapter: Send + Sync {
    /// Human-readable name of the tracker, used in error messages.
    fn name(&self) -> String;

    /// Whether `defect_id` is syntactically valid for this tracker.
    fn is_valid_id(&self, project_id: i64, defect_id: &str) -> bool;

    /// Current statuses of the given defects. Defects unknown to the tracker are
    /// absent from the result.
    async fn get_statuses(
        &self,
        project_id: i64,
        defect_ids: &[String],
    ) -> Result<Vec<Defect>, DefectFetchError>;

    /// URL template with a `{{id}}` placeholder, if configured for the project.
    fn url_template(&self, project_id: i64) -> Option<String>;
}

/// URL of a defect in the tracker.
pub fn defect_url(adapter: &dyn DefectAdapter, project_id: i64, defect_id: &str) -> String {
    match adapter.url_template(project_id) {
        Some(template) if !template.trim().is_empty() => {
            template.replace(DEFECT_ID_PLACEHOLDER, defect_id)
        }
        _ => format!("{}{}", UNCONFIGURED_DEFECT_URL_PREFIX, defect_id),
    }
}

/// Apply a tracker answer to a problem. Returns whether anything changed.
///
/// Closing dates are compared down to the second.
pub fn apply_defect_status(problem: &mut Problem, defect: Option<&Defect>) -> bool {
    let (existence, status, closing) = match defect {
        None => (DefectExistence::Nonexistent, ProblemStatus::Open, None),
        Some(d) if d.status == ProblemStatus::Closed => {
            (DefectExistence::Exists, ProblemStatus::Closed, d.close_date_time)
        }
        Some(_) => (DefectExistence::Exists, ProblemStatus::Open, None),
    };

    let changed = problem.defect_existence != Some(existence)
        || problem.status != status
        || problem.closing_date_time.map(|d| d.timestamp()) != closing.map(|d| d.timestamp());

    problem.defect_existence = Some(existence);
    problem.status = status;
    problem.closing_date_time = closing;

    changed
}
