//! Persistence contracts used by the services.
//!
//! | Trait | Data | Implementations |
//! |-------|------|-----------------|
//! | `ProblemRepository` | problems and their patterns | `DbPool`, `InMemoryStore` |
//! | `ReferenceRepository` | teams, root causes, countries, types, cycles | `DbPool`, `InMemoryStore` |
//! | `ErrorRepository` | ingested errors (read only) | `DbPool`, `InMemoryStore` |
//!
//! Every write is atomic: the uniqueness checks guarding a write, and the
//! cascades it triggers, happen in the same transaction (or lock scope) as the
//! write itself.

use async_trait::async_trait;

use crate::error::{AppError, AppResult, entities};
use crate::models::{
    Country, CycleDefinition, DefectStatusUpdate, ErrorContext, Execution, Pattern,
    PatternCriteria, Problem, RootCause, RunType, Team,
};

pub(crate) fn problem_not_found(problem_id: i64) -> AppError {
    AppError::not_found(
        entities::PROBLEM,
        format!("The problem {} does not exist: it has perhaps been removed", problem_id),
    )
}

pub(crate) fn pattern_not_found(pattern_id: i64) -> AppError {
    AppError::not_found(
        entities::PROBLEM_PATTERN,
        format!("The pattern {} does not exist: it has perhaps been removed", pattern_id),
    )
}

pub(crate) fn name_not_unique(other_id: i64) -> AppError {
    AppError::not_unique(
        entities::PROBLEM,
        "The name is already used by another problem.",
        other_id,
    )
}

pub(crate) fn defect_id_not_unique(other_id: i64) -> AppError {
    AppError::not_unique(
        entities::PROBLEM,
        "The defect ID is already assigned to another problem.",
        other_id,
    )
}

pub(crate) fn source_is_destination() -> AppError {
    AppError::invalid(
        entities::PROBLEM,
        "source_is_destination",
        "The pattern already belongs to this problem.",
    )
}

/// Fails when one of `patterns`, other than `ignored_pattern_id`, has the same criteria.
pub(crate) fn ensure_unique_criteria(
    patterns: &[Pattern],
    criteria: &PatternCriteria,
    ignored_pattern_id: Option<i64>,
) -> AppResult<()> {
    if let Some(existing) = patterns
        .iter()
        .filter(|p| Some(p.id) != ignored_pattern_id)
        .find(|p| p.criteria.same_criteria(criteria))
    {
        return Err(AppError::not_unique(
            entities::PROBLEM_PATTERN,
            "The problem already has a pattern with the same criteria.",
            existing.id,
        ));
    }
    Ok(())
}

#[async_trait]
pub trait ProblemRepository: Send + Sync {
    async fn find_problem(&self, project_id: i64, problem_id: i64) -> AppResult<Option<Problem>>;

    /// Exact (case-sensitive) name lookup.
    async fn find_problem_by_name(&self, project_id: i64, name: &str)
    -> AppResult<Option<Problem>>;

    async fn find_problem_by_defect_id(
        &self,
        project_id: i64,
        defect_id: &str,
    ) -> AppResult<Option<Problem>>;

    /// All problems of the project, most recently created first.
    async fn list_problems(&self, project_id: i64) -> AppResult<Vec<Problem>>;

    async fn find_pattern(&self, project_id: i64, pattern_id: i64) -> AppResult<Option<Pattern>>;

    /// Insert a problem with its patterns. Ids in `problem` are ignored.
    ///
    /// Fails `not_unique` when the name or the defect id is used by another problem.
    async fn insert_problem(&self, project_id: i64, problem: &Problem) -> AppResult<Problem>;

    /// Persist the properties of an existing problem (patterns untouched).
    ///
    /// Fails `not_unique` when the name or the defect id is used by another problem.
    async fn save_problem(&self, problem: &Problem) -> AppResult<()>;

    /// Write the tracker-driven fields (existence, status, closing date) of problems
    /// still linked to the defect the update was computed from. Other properties are
    /// left as they are. Problems deleted or relinked meanwhile are skipped.
    ///
    /// Returns the ids of the updated problems.
    async fn save_defect_statuses(
        &self,
        project_id: i64,
        updates: &[DefectStatusUpdate],
    ) -> AppResult<Vec<i64>>;

    /// Delete a problem and its patterns.
    async fn delete_problem(&self, project_id: i64, problem_id: i64) -> AppResult<()>;

    /// Add a pattern to a problem. Fails `not_unique` when the problem already has a
    /// pattern with the same criteria.
    async fn insert_pattern(
        &self,
        problem_id: i64,
        criteria: &PatternCriteria,
    ) -> AppResult<Pattern>;

    /// Replace the criteria of a pattern. Fails `not_unique` when another pattern of
    /// its problem has the same criteria.
    async fn update_pattern(&self, pattern: &Pattern) -> AppResult<()>;

    /// Reparent a pattern. Returns the id of the source problem when it lost its last
    /// pattern and was deleted.
    ///
    /// Fails `source_is_destination` when the pattern already belongs to the
    /// destination, and `not_unique` when the destination has the same criteria.
    async fn move_pattern(
        &self,
        pattern_id: i64,
        destination_problem_id: i64,
    ) -> AppResult<Option<i64>>;

    /// Delete a pattern. Returns the id of its problem when it lost its last pattern
    /// and was deleted.
    async fn delete_pattern(&self, pattern_id: i64) -> AppResult<Option<i64>>;
}

#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    async fn find_team(&self, project_id: i64, team_id: i64) -> AppResult<Option<Team>>;

    async fn find_root_cause(
        &self,
        project_id: i64,
        root_cause_id: i64,
    ) -> AppResult<Option<RootCause>>;

    async fn find_country_by_code(&self, project_id: i64, code: &str)
    -> AppResult<Option<Country>>;

    async fn find_type_by_code(&self, project_id: i64, code: &str) -> AppResult<Option<RunType>>;

    async fn list_cycle_definitions(&self, project_id: i64) -> AppResult<Vec<CycleDefinition>>;
}

#[async_trait]
pub trait ErrorRepository: Send + Sync {
    /// Errors of the project among `error_ids`, ascending id. Unknown ids are skipped.
    async fn find_errors_by_ids(
        &self,
        project_id: i64,
        error_ids: &[i64],
    ) -> AppResult<Vec<ErrorContext>>;

    /// Errors of the project matching `criteria`, ascending id.
    async fn find_matching_errors(
        &self,
        project_id: i64,
        criteria: &PatternCriteria,
    ) -> AppResult<Vec<ErrorContext>>;

    async fn find_execution(&self, project_id: i64, execution_id: i64)
    -> AppResult<Option<Execution>>;

    /// Errors of one execution, ascending id.
    async fn find_errors_of_execution(&self, execution_id: i64) -> AppResult<Vec<ErrorContext>>;

    /// The `limit` most recent executions of a cycle, newest first.
    async fn find_last_executions(
        &self,
        cycle_definition_id: i64,
        limit: usize,
    ) -> AppResult<Vec<Execution>>;
}
