//! Problem lifecycle: creation, edition, closing and pattern management, plus the
//! read-side computations (classification, aggregates, stability) over problems.
//!
//! Every operation validates all its inputs before the first write, and every
//! write is a single atomic repository call. Uniqueness rules are checked here for
//! the error hints, and again by the repository inside the write.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use futures_util::future::try_join_all;
use tracing::{debug, info, warn};

use crate::db::{ErrorRepository, ProblemRepository, ReferenceRepository};
use crate::error::{AppError, AppResult, entities};
use crate::models::{
    CycleDefinition, CycleStability, DefectExistence, DefectStatusUpdate, DeletePatternResult,
    ErrorContext, Execution, NewProblem, Pattern, PatternCriteria, PickUpPatternResult, Problem,
    ProblemAggregate, ProblemFilter, ProblemProperties, ProblemStatus, ProblemWithAggregate,
};

use super::aggregation::aggregate;
use super::classifier;
use super::defect::{DefectAdapter, apply_defect_status, defect_url};
use super::stability::{cycle_stability, failing_executions, sort_cycles};

/// Entry point of the engine's operations.
#[derive(Clone)]
pub struct ProblemService {
    problems: Arc<dyn ProblemRepository>,
    references: Arc<dyn ReferenceRepository>,
    errors: Arc<dyn ErrorRepository>,
    defects: Option<Arc<dyn DefectAdapter>>,
    stability_execution_count: usize,
}

/// Most recent executions of every cycle of a project, loaded once per request.
struct CycleHistory {
    cycles: Vec<CycleDefinition>,
    executions: HashMap<i64, Vec<Execution>>,
}

impl ProblemService {
    pub fn new(
        problems: Arc<dyn ProblemRepository>,
        references: Arc<dyn ReferenceRepository>,
        errors: Arc<dyn ErrorRepository>,
        stability_execution_count: usize,
    ) -> Self {
        ProblemService {
            problems,
            references,
            errors,
            defects: None,
            stability_execution_count: stability_execution_count.max(1),
        }
    }

    /// Build a service over a single store implementing every repository.
    pub fn from_store<S>(store: S, stability_execution_count: usize) -> Self
    where
        S: ProblemRepository + ReferenceRepository + ErrorRepository + Clone + 'static,
    {
        Self::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
            stability_execution_count,
        )
    }

    /// Link the problems to a defect tracking system.
    pub fn with_defect_adapter(mut self, adapter: Arc<dyn DefectAdapter>) -> Self {
        self.defects = Some(adapter);
        self
    }

    pub fn defect_adapter(&self) -> Option<&Arc<dyn DefectAdapter>> {
        self.defects.as_ref()
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Create a problem with at least one pattern.
    ///
    /// The problem starts OPEN, unless its defect is known to be closed.
    pub async fn create(&self, project_id: i64, new_problem: NewProblem) -> AppResult<Problem> {
        let name = new_problem.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::invalid(
                entities::PROBLEM,
                "name_mandatory",
                "The name of the problem is mandatory.",
            ));
        }
        if new_problem.patterns.is_empty() {
            return Err(AppError::invalid(
                entities::PROBLEM,
                "patterns_mandatory",
                "A problem must have at least one pattern.",
            ));
        }

        let defect_id = non_blank(new_problem.defect_id.as_deref());
        let hint = "Consider appending the pattern to this existing problem.";
        self.validate_unique_name(project_id, &name, None, hint).await?;
        if let Some(defect_id) = defect_id.as_deref() {
            self.validate_unique_defect_id(project_id, defect_id, None, hint)
                .await?;
        }
        self.validate_team(project_id, new_problem.blamed_team_id).await?;
        self.validate_root_cause(project_id, new_problem.root_cause_id)
            .await?;

        let mut patterns: Vec<Pattern> = Vec::with_capacity(new_problem.patterns.len());
        for criteria in &new_problem.patterns {
            self.validate_pattern_references(project_id, criteria).await?;
            if patterns.iter().any(|p| p.criteria.same_criteria(criteria)) {
                return Err(AppError::invalid(
                    entities::PROBLEM_PATTERN,
                    "not_unique",
                    "Several patterns of the problem have the same criteria.",
                ));
            }
            patterns.push(Pattern {
                id: 0,
                problem_id: 0,
                criteria: criteria.normalized(),
            });
        }

        let mut problem = Problem {
            id: 0,
            project_id,
            name,
            comment: non_blank(new_problem.comment.as_deref()),
            status: ProblemStatus::Open,
            blamed_team_id: new_problem.blamed_team_id,
            defect_id,
            defect_existence: None,
            defect_url: None,
            closing_date_time: None,
            root_cause_id: new_problem.root_cause_id,
            creation_date_time: Utc::now(),
            patterns,
        };

        // Last, so that no tracker request is made for an otherwise invalid problem
        if let Some(defect_id) = problem.defect_id.clone() {
            self.assign_defect(project_id, &mut problem, &defect_id)
                .await?;
        }

        let stored = self.problems.insert_problem(project_id, &problem).await?;
        info!(
            "Created problem {} '{}' with {} patterns in project {}",
            stored.id,
            stored.name,
            stored.patterns.len(),
            project_id
        );

        Ok(self.with_defect_url(stored))
    }

    /// Replace the editable properties of a problem. Status and patterns are untouched,
    /// except when a new defect dictates the status.
    pub async fn update_properties(
        &self,
        project_id: i64,
        problem_id: i64,
        properties: ProblemProperties,
    ) -> AppResult<Problem> {
        let mut problem = self.load_problem(project_id, problem_id).await?;

        let name = properties.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::invalid(
                entities::PROBLEM,
                "name_mandatory",
                "The name of the problem is mandatory.",
            ));
        }

        let defect_id = non_blank(properties.defect_id.as_deref());
        let hint = "Consider moving the patterns to this existing problem.";
        if name != problem.name {
            self.validate_unique_name(project_id, &name, Some(problem_id), hint)
                .await?;
        }
        let defect_changed = defect_id != problem.defect_id;
        if defect_changed {
            if let Some(defect_id) = defect_id.as_deref() {
                self.validate_unique_defect_id(project_id, defect_id, Some(problem_id), hint)
                    .await?;
            }
        }
        self.validate_team(project_id, properties.blamed_team_id)
            .await?;
        self.validate_root_cause(project_id, properties.root_cause_id)
            .await?;
        if problem.status == ProblemStatus::Closed && properties.root_cause_id.is_none() {
            return Err(AppError::invalid(
                entities::PROBLEM,
                "root_cause_mandatory_for_closed_problems",
                "A closed problem must have a root cause.",
            ));
        }

        problem.name = name;
        problem.comment = non_blank(properties.comment.as_deref());
        problem.blamed_team_id = properties.blamed_team_id;
        problem.root_cause_id = properties.root_cause_id;

        if defect_changed {
            problem.defect_id = defect_id.clone();
            match defect_id {
                Some(defect_id) => {
                    self.assign_defect(project_id, &mut problem, &defect_id)
                        .await?
                }
                // Removing the defect keeps the current status
                None => problem.defect_existence = None,
            }
        }

        self.problems.save_problem(&problem).await?;
        info!("Updated problem {} in project {}", problem.id, project_id);

        Ok(self.with_defect_url(problem))
    }

    /// Close a problem, naming its root cause.
    pub async fn close(
        &self,
        project_id: i64,
        problem_id: i64,
        root_cause_id: i64,
    ) -> AppResult<Problem> {
        let mut problem = self.load_problem(project_id, problem_id).await?;
        self.ensure_status_is_manual(&problem)?;
        self.validate_root_cause(project_id, Some(root_cause_id))
            .await?;

        problem.status = ProblemStatus::Closed;
        problem.closing_date_time = Some(Utc::now());
        problem.root_cause_id = Some(root_cause_id);

        self.problems.save_problem(&problem).await?;
        info!(
            "Closed problem {} with root cause {} in project {}",
            problem.id, root_cause_id, project_id
        );

        Ok(self.with_defect_url(problem))
    }

    /// Reopen a problem. The root cause is kept.
    pub async fn reopen(&self, project_id: i64, problem_id: i64) -> AppResult<Problem> {
        let mut problem = self.load_problem(project_id, problem_id).await?;
        self.ensure_status_is_manual(&problem)?;

        problem.status = ProblemStatus::Open;
        problem.closing_date_time = None;

        self.problems.save_problem(&problem).await?;
        info!("Reopened problem {} in project {}", problem.id, project_id);

        Ok(self.with_defect_url(problem))
    }

    /// Delete a problem and all its patterns.
    pub async fn delete(&self, project_id: i64, problem_id: i64) -> AppResult<()> {
        self.load_problem(project_id, problem_id).await?;
        self.problems.delete_problem(project_id, problem_id).await?;
        info!("Deleted problem {} in project {}", problem_id, project_id);
        Ok(())
    }

    /// Add a pattern to a problem.
    pub async fn append_pattern(
        &self,
        project_id: i64,
        problem_id: i64,
        criteria: PatternCriteria,
    ) -> AppResult<Pattern> {
        self.load_problem(project_id, problem_id).await?;
        self.validate_pattern_references(project_id, &criteria)
            .await?;

        let pattern = self
            .problems
            .insert_pattern(problem_id, &criteria.normalized())
            .await?;
        info!(
            "Appended pattern {} to problem {} in project {}",
            pattern.id, problem_id, project_id
        );

        Ok(pattern)
    }

    /// Move a pattern to another problem, deleting its former problem when it has no
    /// pattern left.
    pub async fn pick_up_pattern(
        &self,
        project_id: i64,
        destination_problem_id: i64,
        pattern_id: i64,
    ) -> AppResult<PickUpPatternResult> {
        let destination = self
            .problems
            .find_problem(project_id, destination_problem_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(
                    entities::PROBLEM,
                    "The problem where to move the pattern does not exist: it has perhaps been removed.",
                )
            })?;
        let pattern = self
            .problems
            .find_pattern(project_id, pattern_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(
                    entities::PROBLEM_PATTERN,
                    "The pattern to move does not exist: it has perhaps been removed.",
                )
            })?;

        let source = self.load_problem(project_id, pattern.problem_id).await?;
        let deleted_id = self
            .problems
            .move_pattern(pattern_id, destination.id)
            .await?;
        info!(
            "Moved pattern {} from problem {} to problem {} in project {}",
            pattern_id, source.id, destination.id, project_id
        );

        let destination = self
            .load_problem(project_id, destination_problem_id)
            .await?;
        let deleted_problem = deleted_id.map(|id| {
            info!("Deleted problem {} left without pattern", id);
            self.with_defect_url(without_pattern(source, pattern_id))
        });

        Ok(PickUpPatternResult {
            destination_problem: self.with_defect_url(destination),
            deleted_problem,
        })
    }

    /// Delete a pattern, deleting its problem when it has no pattern left.
    pub async fn delete_pattern(
        &self,
        project_id: i64,
        pattern_id: i64,
    ) -> AppResult<DeletePatternResult> {
        let pattern = self.load_pattern(project_id, pattern_id).await?;
        let problem = self.load_problem(project_id, pattern.problem_id).await?;

        let deleted_id = self.problems.delete_pattern(pattern_id).await?;
        info!(
            "Deleted pattern {} of problem {} in project {}",
            pattern_id, problem.id, project_id
        );

        let deleted_problem = deleted_id.map(|id| {
            info!("Deleted problem {} left without pattern", id);
            self.with_defect_url(without_pattern(problem, pattern_id))
        });

        Ok(DeletePatternResult { deleted_problem })
    }

    /// Replace the criteria of a pattern, keeping its problem.
    pub async fn update_pattern(
        &self,
        project_id: i64,
        pattern_id: i64,
        criteria: PatternCriteria,
    ) -> AppResult<Pattern> {
        let pattern = self.load_pattern(project_id, pattern_id).await?;
        let problem = self.load_problem(project_id, pattern.problem_id).await?;
        self.validate_pattern_references(project_id, &criteria)
            .await?;

        let updated = Pattern {
            criteria: criteria.normalized(),
            ..pattern
        };
        self.problems.update_pattern(&updated).await?;
        info!(
            "Updated pattern {} of problem {} in project {}",
            pattern_id, problem.id, project_id
        );

        Ok(updated)
    }

    /// Ask the defect tracker for the status of the problem's defect and apply it.
    pub async fn refresh_defect_status(&self, project_id: i64, problem_id: i64) -> AppResult<Problem> {
        let adapter = self.defects.clone().ok_or_else(|| {
            AppError::invalid(
                entities::PROBLEM,
                "no_defect_tracking_system",
                "No defect tracking system is configured for this project.",
            )
        })?;
        let mut problem = self.load_problem(project_id, problem_id).await?;

        let Some(defect_id) = problem.defect_id.clone().filter(|d| !d.trim().is_empty()) else {
            return Ok(self.with_defect_url(problem));
        };

        let defects = adapter
            .get_statuses(project_id, std::slice::from_ref(&defect_id))
            .await
            .map_err(|e| {
                warn!(
                    "Cannot refresh defect status of problem {} (defect {}): {}",
                    problem_id, defect_id, e
                );
                AppError::GatewayFailure {
                    system: adapter.name(),
                    message: e.to_string(),
                }
            })?;

        let defect = defects
            .iter()
            .find(|d| d.id == defect_id)
            .or(defects.first());
        apply_defect_status(&mut problem, defect);

        // The problem is reloaded: it may have been edited during the tracker call
        if let Some(update) = DefectStatusUpdate::of(&problem) {
            let updated = self
                .problems
                .save_defect_statuses(project_id, std::slice::from_ref(&update))
                .await?;
            if updated.is_empty() {
                debug!(
                    "Problem {} was unlinked from defect {} during refresh",
                    problem_id, defect_id
                );
            } else {
                info!(
                    "Refreshed problem {} from defect {}: {} ({})",
                    problem_id,
                    defect_id,
                    update.status,
                    update.defect_existence.as_str()
                );
            }
        }

        let problem = self.load_problem(project_id, problem_id).await?;
        Ok(self.with_defect_url(problem))
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub async fn find_one(&self, project_id: i64, problem_id: i64) -> AppResult<Problem> {
        let problem = self.load_problem(project_id, problem_id).await?;
        Ok(self.with_defect_url(problem))
    }

    /// A problem with its aggregate, effective status and stability timelines.
    pub async fn find_one_with_aggregate(
        &self,
        project_id: i64,
        problem_id: i64,
    ) -> AppResult<ProblemWithAggregate> {
        let problem = self.load_problem(project_id, problem_id).await?;
        let history = self.cycle_history(project_id).await?;
        self.enrich(project_id, problem, &history).await
    }

    /// Problems passing the filter, most recently created first.
    pub async fn find_matching_problems(
        &self,
        project_id: i64,
        filter: &ProblemFilter,
    ) -> AppResult<Vec<ProblemWithAggregate>> {
        let candidates: Vec<Problem> = self
            .problems
            .list_problems(project_id)
            .await?
            .into_iter()
            .filter(|problem| filter.accepts_properties(problem))
            .collect();

        let history = self.cycle_history(project_id).await?;
        let mut result = Vec::with_capacity(candidates.len());
        for problem in candidates {
            let enriched = self.enrich(project_id, problem, &history).await?;
            if filter.accepts_status(enriched.effective_status) {
                result.push(enriched);
            }
        }

        debug!(
            "Found {} problems matching filter in project {}",
            result.len(),
            project_id
        );
        Ok(result)
    }

    /// Errors a candidate pattern would match, ascending id.
    pub async fn preview_matches(
        &self,
        project_id: i64,
        criteria: &PatternCriteria,
    ) -> AppResult<Vec<ErrorContext>> {
        let errors = self
            .errors
            .find_matching_errors(project_id, &criteria.normalized())
            .await?;
        debug!(
            "Pattern preview matches {} errors in project {}",
            errors.len(),
            project_id
        );
        Ok(errors)
    }

    /// Problems of each requested error. Every requested id is a key of the result.
    pub async fn classify_errors(
        &self,
        project_id: i64,
        error_ids: &[i64],
    ) -> AppResult<BTreeMap<i64, Vec<i64>>> {
        let errors = self
            .errors
            .find_errors_by_ids(project_id, error_ids)
            .await?;
        let problems = self.problems.list_problems(project_id).await?;

        let mut result = classifier::classify_errors(&errors, &problems);
        for id in error_ids {
            result.entry(*id).or_default();
        }
        Ok(result)
    }

    /// Errors currently matching at least one pattern of the problem, ascending id.
    pub async fn problem_errors(
        &self,
        project_id: i64,
        problem_id: i64,
    ) -> AppResult<Vec<ErrorContext>> {
        let problem = self.load_problem(project_id, problem_id).await?;
        self.errors_of(project_id, &problem).await
    }

    /// Errors currently matching the pattern, ascending id.
    pub async fn pattern_errors(
        &self,
        project_id: i64,
        pattern_id: i64,
    ) -> AppResult<Vec<ErrorContext>> {
        let pattern = self.load_pattern(project_id, pattern_id).await?;
        self.errors
            .find_matching_errors(project_id, &pattern.criteria)
            .await
    }

    pub async fn aggregate(&self, project_id: i64, problem_id: i64) -> AppResult<ProblemAggregate> {
        let problem = self.load_problem(project_id, problem_id).await?;
        let errors = self.errors_of(project_id, &problem).await?;
        Ok(aggregate(problem.patterns.len(), &errors))
    }

    /// One timeline per cycle definition of the project.
    pub async fn stability(
        &self,
        project_id: i64,
        problem_id: i64,
    ) -> AppResult<Vec<CycleStability>> {
        let problem = self.load_problem(project_id, problem_id).await?;
        let errors = self.errors_of(project_id, &problem).await?;
        let history = self.cycle_history(project_id).await?;
        Ok(self.stabilities(&history, &errors))
    }

    /// Number of distinct problems having at least one error in the execution.
    pub async fn count_problems_of_execution(
        &self,
        project_id: i64,
        execution_id: i64,
    ) -> AppResult<usize> {
        if self
            .errors
            .find_execution(project_id, execution_id)
            .await?
            .is_none()
        {
            return Err(AppError::not_found(
                entities::EXECUTION,
                format!("The execution {} does not exist.", execution_id),
            ));
        }

        let errors = self.errors.find_errors_of_execution(execution_id).await?;
        let problems = self.problems.list_problems(project_id).await?;

        Ok(problems
            .iter()
            .filter(|problem| {
                errors
                    .iter()
                    .any(|error| classifier::problem_matches(error, problem))
            })
            .count())
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    async fn load_problem(&self, project_id: i64, problem_id: i64) -> AppResult<Problem> {
        self.problems
            .find_problem(project_id, problem_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(
                    entities::PROBLEM,
                    "The problem does not exist: it has perhaps been removed.",
                )
            })
    }

    async fn load_pattern(&self, project_id: i64, pattern_id: i64) -> AppResult<Pattern> {
        self.problems
            .find_pattern(project_id, pattern_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(
                    entities::PROBLEM_PATTERN,
                    "The pattern does not exist: it has perhaps been removed.",
                )
            })
    }

    async fn errors_of(&self, project_id: i64, problem: &Problem) -> AppResult<Vec<ErrorContext>> {
        let matched = try_join_all(
            problem
                .patterns
                .iter()
                .map(|pattern| self.errors.find_matching_errors(project_id, &pattern.criteria)),
        )
        .await?;

        let mut errors = BTreeMap::new();
        for error in matched.into_iter().flatten() {
            errors.entry(error.id()).or_insert(error);
        }
        Ok(errors.into_values().collect())
    }

    async fn cycle_history(&self, project_id: i64) -> AppResult<CycleHistory> {
        let mut cycles = self.references.list_cycle_definitions(project_id).await?;
        sort_cycles(&mut cycles);

        let latest = try_join_all(cycles.iter().map(|cycle| {
            self.errors
                .find_last_executions(cycle.id, self.stability_execution_count)
        }))
        .await?;
        let executions = cycles.iter().map(|cycle| cycle.id).zip(latest).collect();

        Ok(CycleHistory { cycles, executions })
    }

    fn stabilities(&self, history: &CycleHistory, errors: &[ErrorContext]) -> Vec<CycleStability> {
        let failing = failing_executions(errors);
        history
            .cycles
            .iter()
            .map(|cycle| {
                let latest = history
                    .executions
                    .get(&cycle.id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                cycle_stability(cycle, self.stability_execution_count, latest, &failing)
            })
            .collect()
    }

    async fn enrich(
        &self,
        project_id: i64,
        problem: Problem,
        history: &CycleHistory,
    ) -> AppResult<ProblemWithAggregate> {
        let errors = self.errors_of(project_id, &problem).await?;
        let aggregate = aggregate(problem.patterns.len(), &errors);
        let effective_status = problem.effective_status(aggregate.last_seen_date_time);
        let stabilities = self.stabilities(history, &errors);

        Ok(ProblemWithAggregate {
            problem: self.with_defect_url(problem),
            aggregate,
            effective_status,
            stabilities,
        })
    }

    fn with_defect_url(&self, mut problem: Problem) -> Problem {
        problem.defect_url = match (&self.defects, problem.defect_id.as_deref()) {
            (Some(adapter), Some(defect_id)) if !defect_id.trim().is_empty() => {
                Some(defect_url(adapter.as_ref(), problem.project_id, defect_id))
            }
            _ => None,
        };
        problem
    }

    /// Status of a problem linked to a tracked defect follows the defect.
    fn ensure_status_is_manual(&self, problem: &Problem) -> AppResult<()> {
        if problem.has_defect() && self.defects.is_some() {
            return Err(AppError::invalid(
                entities::PROBLEM,
                "problem_status_managed_by_defect",
                "The status of a problem with a defect is managed by the defect tracking system.",
            ));
        }
        Ok(())
    }

    /// Initialize defect existence and status from the tracker.
    async fn assign_defect(
        &self,
        project_id: i64,
        problem: &mut Problem,
        defect_id: &str,
    ) -> AppResult<()> {
        let Some(adapter) = &self.defects else {
            return Ok(());
        };

        if !adapter.is_valid_id(project_id, defect_id) {
            return Err(AppError::invalid(
                entities::PROBLEM,
                "wrong_defect_id_format",
                format!("The defect ID is not in the format expected by {}.", adapter.name()),
            ));
        }

        match adapter
            .get_statuses(project_id, &[defect_id.to_string()])
            .await
        {
            Ok(defects) => {
                let defect = defects
                    .iter()
                    .find(|d| d.id == defect_id)
                    .or(defects.first());
                apply_defect_status(problem, defect);
            }
            Err(e) => {
                warn!(
                    "Cannot check existence of defect {} in {}: {}",
                    defect_id,
                    adapter.name(),
                    e
                );
                problem.defect_existence = Some(DefectExistence::Unknown);
                problem.status = ProblemStatus::Open;
                problem.closing_date_time = None;
            }
        }
        Ok(())
    }

    async fn validate_unique_name(
        &self,
        project_id: i64,
        name: &str,
        own_id: Option<i64>,
        hint: &str,
    ) -> AppResult<()> {
        if let Some(other) = self.problems.find_problem_by_name(project_id, name).await? {
            if Some(other.id) != own_id {
                return Err(AppError::not_unique(
                    entities::PROBLEM,
                    format!("The name is already used by another problem. {}", hint),
                    other.id,
                ));
            }
        }
        Ok(())
    }

    async fn validate_unique_defect_id(
        &self,
        project_id: i64,
        defect_id: &str,
        own_id: Option<i64>,
        hint: &str,
    ) -> AppResult<()> {
        if let Some(other) = self
            .problems
            .find_problem_by_defect_id(project_id, defect_id)
            .await?
        {
            if Some(other.id) != own_id {
                return Err(AppError::not_unique(
                    entities::PROBLEM,
                    format!("The defect ID is already assigned to another problem. {}", hint),
                    other.id,
                ));
            }
        }
        Ok(())
    }

    async fn validate_team(&self, project_id: i64, team_id: Option<i64>) -> AppResult<()> {
        let Some(team_id) = team_id else {
            return Ok(());
        };
        let team = self
            .references
            .find_team(project_id, team_id)
            .await?
            .ok_or_else(|| AppError::not_found(entities::TEAM, "The team does not exist."))?;
        if !team.assign_to_problems {
            return Err(AppError::invalid(
                entities::TEAM,
                "not_assignable_team",
                "This team cannot be assigned to problems.",
            ));
        }
        Ok(())
    }

    async fn validate_root_cause(&self, project_id: i64, root_cause_id: Option<i64>) -> AppResult<()> {
        let Some(root_cause_id) = root_cause_id else {
            return Ok(());
        };
        self.references
            .find_root_cause(project_id, root_cause_id)
            .await?
            .ok_or_else(|| AppError::not_found(entities::ROOT_CAUSE, "The root cause does not exist."))?;
        Ok(())
    }

    async fn validate_pattern_references(
        &self,
        project_id: i64,
        criteria: &PatternCriteria,
    ) -> AppResult<()> {
        if let Some(code) = non_blank(criteria.country_code.as_deref()) {
            if self
                .references
                .find_country_by_code(project_id, &code)
                .await?
                .is_none()
            {
                return Err(AppError::not_found(
                    entities::COUNTRY,
                    format!("The country {} does not exist.", code),
                ));
            }
        }
        if let Some(code) = non_blank(criteria.type_code.as_deref()) {
            if self
                .references
                .find_type_by_code(project_id, &code)
                .await?
                .is_none()
            {
                return Err(AppError::not_found(
                    entities::TYPE,
                    format!("The type {} does not exist.", code),
                ));
            }
        }
        Ok(())
    }
}

fn without_pattern(mut problem: Problem, pattern_id: i64) -> Problem {
    problem.patterns.retain(|p| p.id != pattern_id);
    problem
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
