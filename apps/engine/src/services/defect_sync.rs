//! Periodic synchronization of problem statuses with the defect tracker.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, sleep};
use tracing::{debug, error, info};

use crate::config::DefectSyncConfig;
use crate::db::ProblemRepository;
use crate::error::{AppError, AppResult};
use crate::models::{DefectStatusUpdate, Problem};

use super::defect::{DefectAdapter, apply_defect_status};

/// Pulls defect statuses and applies them to the problems linked to defects.
pub struct DefectSynchronizer {
    problems: Arc<dyn ProblemRepository>,
    adapter: Arc<dyn DefectAdapter>,
}

impl DefectSynchronizer {
    pub fn new(problems: Arc<dyn ProblemRepository>, adapter: Arc<dyn DefectAdapter>) -> Self {
        DefectSynchronizer { problems, adapter }
    }

    /// Refresh every problem of the project having a defect.
    ///
    /// Only the tracker-driven fields are written, so edits made while the tracker
    /// is queried are kept. Problems deleted or relinked meanwhile are skipped.
    ///
    /// Returns the number of problems whose status changed.
    pub async fn sync_project(&self, project_id: i64) -> AppResult<usize> {
        let mut linked: Vec<Problem> = self
            .problems
            .list_problems(project_id)
            .await?
            .into_iter()
            .filter(Problem::has_defect)
            .collect();
        if linked.is_empty() {
            return Ok(0);
        }

        let defect_ids: Vec<String> = linked
            .iter()
            .filter_map(|p| p.defect_id.as_deref().map(|id| id.trim().to_string()))
            .collect();

        let defects = self
            .adapter
            .get_statuses(project_id, &defect_ids)
            .await
            .map_err(|e| AppError::GatewayFailure {
                system: self.adapter.name(),
                message: e.to_string(),
            })?;
        let by_id: HashMap<&str, _> = defects.iter().map(|d| (d.id.as_str(), d)).collect();

        let mut changes = Vec::new();
        for problem in linked.iter_mut() {
            let defect = problem
                .defect_id
                .as_deref()
                .and_then(|id| by_id.get(id.trim()).copied());
            if apply_defect_status(problem, defect) {
                changes.extend(DefectStatusUpdate::of(problem));
            }
        }
        if changes.is_empty() {
            debug!(
                "No defect status change for {} problems in project {}",
                linked.len(),
                project_id
            );
            return Ok(0);
        }

        let updated = self
            .problems
            .save_defect_statuses(project_id, &changes)
            .await?;
        info!(
            "Synchronized {} of {} problems with {} in project {}",
            updated.len(),
            linked.len(),
            self.adapter.name(),
            project_id
        );

        Ok(updated.len())
    }
}

/// Start the defect synchronization background task.
///
/// Each tick synchronizes every project in turn. A failing project is logged and
/// retried on the next tick.
pub fn start_defect_sync_task(
    synchronizer: Arc<DefectSynchronizer>,
    project_ids: Vec<i64>,
    config: DefectSyncConfig,
) {
    tokio::spawn(async move {
        info!(
            "Starting defect synchronization for {} projects (interval: {} seconds)",
            project_ids.len(),
            config.interval_secs
        );

        sleep(Duration::from_secs(config.initial_delay_secs)).await;
        let mut ticker = interval(Duration::from_secs(config.interval_secs.max(1)));

        loop {
            ticker.tick().await;

            for project_id in &project_ids {
                if let Err(e) = synchronizer.sync_project(*project_id).await {
                    error!("Defect synchronization error for project {}: {}", project_id, e);
                }
            }
        }
    });
}
