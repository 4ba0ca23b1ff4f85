//! Database queries for problems and their patterns.
//!
//! Writes run in one transaction. Writes depending on the patterns of a problem
//! lock its row first (`SELECT ... FOR UPDATE`), so that concurrent pattern
//! writes on the same problem are serialized; pattern rows are locked before
//! problem rows.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, JoinType, NotSet,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set, SqlErr,
    TransactionTrait,
};

use crate::entity::problem::{self, Entity as ProblemRow};
use crate::entity::problem_pattern::{self, Entity as PatternRow};
use crate::error::{AppError, AppResult};
use crate::models::{
    DefectExistence, DefectStatusUpdate, Pattern, PatternCriteria, Problem, ProblemStatus,
};

use super::DbPool;
use super::repository::{
    ProblemRepository, defect_id_not_unique, ensure_unique_criteria, name_not_unique,
    pattern_not_found, problem_not_found, source_is_destination,
};

fn to_pattern(model: problem_pattern::Model) -> Pattern {
    Pattern {
        id: model.id,
        problem_id: model.problem_id,
        criteria: PatternCriteria {
            feature_file: model.feature_file,
            feature_name: model.feature_name,
            scenario_name: model.scenario_name,
            scenario_name_starts_with: model.scenario_name_starts_with,
            step: model.step,
            step_starts_with: model.step_starts_with,
            step_definition: model.step_definition,
            step_definition_starts_with: model.step_definition_starts_with,
            exception: model.exception,
            release: model.release,
            country_code: model.country_code,
            type_code: model.type_code,
            type_is_browser: model.type_is_browser,
            type_is_mobile: model.type_is_mobile,
            platform: model.platform,
        },
    }
}

fn to_problem(model: problem::Model, patterns: Vec<Pattern>) -> AppResult<Problem> {
    let status = ProblemStatus::parse(&model.status).ok_or_else(|| {
        AppError::Database(format!(
            "Invalid status for problem {}: {}",
            model.id, model.status
        ))
    })?;
    let defect_existence = match model.defect_existence.as_deref() {
        Some(value) => Some(DefectExistence::parse(value).ok_or_else(|| {
            AppError::Database(format!(
                "Invalid defect existence for problem {}: {}",
                model.id, value
            ))
        })?),
        None => None,
    };

    Ok(Problem {
        id: model.id,
        project_id: model.project_id,
        name: model.name,
        comment: model.comment,
        status,
        blamed_team_id: model.blamed_team_id,
        defect_id: model.defect_id,
        defect_existence,
        defect_url: None,
        closing_date_time: model.closing_date_time,
        root_cause_id: model.root_cause_id,
        creation_date_time: model.creation_date_time,
        patterns,
    })
}

fn pattern_model(problem_id: i64, criteria: &PatternCriteria) -> problem_pattern::ActiveModel {
    let criteria = criteria.normalized();
    problem_pattern::ActiveModel {
        id: NotSet,
        problem_id: Set(problem_id),
        feature_file: Set(criteria.feature_file),
        feature_name: Set(criteria.feature_name),
        scenario_name: Set(criteria.scenario_name),
        scenario_name_starts_with: Set(criteria.scenario_name_starts_with),
        step: Set(criteria.step),
        step_starts_with: Set(criteria.step_starts_with),
        step_definition: Set(criteria.step_definition),
        step_definition_starts_with: Set(criteria.step_definition_starts_with),
        exception: Set(criteria.exception),
        release: Set(criteria.release),
        country_code: Set(criteria.country_code),
        type_code: Set(criteria.type_code),
        type_is_browser: Set(criteria.type_is_browser),
        type_is_mobile: Set(criteria.type_is_mobile),
        platform: Set(criteria.platform),
    }
}

fn problem_model(problem: &Problem) -> problem::ActiveModel {
    problem::ActiveModel {
        id: Set(problem.id),
        project_id: Set(problem.project_id),
        name: Set(problem.name.clone()),
        comment: Set(problem.comment.clone()),
        status: Set(problem.status.as_str().to_string()),
        blamed_team_id: Set(problem.blamed_team_id),
        defect_id: Set(problem.defect_id.clone()),
        defect_existence: Set(problem.defect_existence.map(|e| e.as_str().to_string())),
        closing_date_time: Set(problem.closing_date_time),
        root_cause_id: Set(problem.root_cause_id),
        creation_date_time: Set(problem.creation_date_time),
    }
}

/// Only the tracker-driven columns are set.
fn defect_status_model(update: &DefectStatusUpdate) -> problem::ActiveModel {
    problem::ActiveModel {
        status: Set(update.status.as_str().to_string()),
        defect_existence: Set(Some(update.defect_existence.as_str().to_string())),
        closing_date_time: Set(update.closing_date_time),
        ..Default::default()
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn problem_for_update(problem_id: i64) -> Select<ProblemRow> {
    ProblemRow::find_by_id(problem_id).lock_exclusive()
}

fn pattern_for_update(pattern_id: i64) -> Select<PatternRow> {
    PatternRow::find_by_id(pattern_id).lock_exclusive()
}

/// Lock a problem row until the end of the transaction.
async fn lock_problem<C: ConnectionTrait>(
    conn: &C,
    problem_id: i64,
) -> AppResult<problem::Model> {
    problem_for_update(problem_id)
        .one(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to lock problem: {}", e)))?
        .ok_or_else(|| problem_not_found(problem_id))
}

/// Lock a pattern row until the end of the transaction.
async fn lock_pattern<C: ConnectionTrait>(
    conn: &C,
    pattern_id: i64,
) -> AppResult<problem_pattern::Model> {
    pattern_for_update(pattern_id)
        .one(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to lock pattern: {}", e)))?
        .ok_or_else(|| pattern_not_found(pattern_id))
}

async fn patterns_of<C: ConnectionTrait>(conn: &C, problem_id: i64) -> AppResult<Vec<Pattern>> {
    let patterns = PatternRow::find()
        .filter(problem_pattern::Column::ProblemId.eq(problem_id))
        .order_by_asc(problem_pattern::Column::Id)
        .all(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get patterns: {}", e)))?;

    Ok(patterns.into_iter().map(to_pattern).collect())
}

/// Delete a problem when it has no pattern left. Returns whether it was deleted.
///
/// The caller holds the lock on the problem row.
async fn delete_if_empty<C: ConnectionTrait>(conn: &C, problem_id: i64) -> AppResult<bool> {
    let remaining = PatternRow::find()
        .filter(problem_pattern::Column::ProblemId.eq(problem_id))
        .count(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to count patterns: {}", e)))?;
    if remaining > 0 {
        return Ok(false);
    }

    ProblemRow::delete_by_id(problem_id)
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to delete problem: {}", e)))?;
    Ok(true)
}

impl DbPool {
    /// Attach patterns to problem rows, keeping their order.
    async fn with_patterns(&self, rows: Vec<problem::Model>) -> AppResult<Vec<Problem>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|p| p.id).collect();
        let patterns = PatternRow::find()
            .filter(problem_pattern::Column::ProblemId.is_in(ids))
            .order_by_asc(problem_pattern::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get patterns: {}", e)))?;

        let mut by_problem: HashMap<i64, Vec<Pattern>> = HashMap::new();
        for pattern in patterns {
            by_problem
                .entry(pattern.problem_id)
                .or_default()
                .push(to_pattern(pattern));
        }

        rows.into_iter()
            .map(|row| {
                let patterns = by_problem.remove(&row.id).unwrap_or_default();
                to_problem(row, patterns)
            })
            .collect()
    }

    async fn first_with_patterns(&self, row: Option<problem::Model>) -> AppResult<Option<Problem>> {
        match row {
            Some(row) => Ok(self.with_patterns(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    /// Translate a unique index violation on a problem write into the conflicting
    /// problem.
    async fn conflicting_problem(&self, problem: &Problem, err: DbErr) -> AppError {
        if !is_unique_violation(&err) {
            return AppError::Database(format!("Failed to save problem: {}", err));
        }

        let others = ProblemRow::find()
            .filter(problem::Column::ProjectId.eq(problem.project_id))
            .filter(problem::Column::Id.ne(problem.id))
            .filter(
                sea_orm::Condition::any()
                    .add(problem::Column::Name.eq(problem.name.as_str()))
                    .add(problem::Column::DefectId.eq(problem.defect_id.clone())),
            )
            .all(self.connection())
            .await;

        match others {
            Ok(others) => {
                if let Some(other) = others.iter().find(|o| o.name == problem.name) {
                    name_not_unique(other.id)
                } else if let Some(other) = others.first() {
                    defect_id_not_unique(other.id)
                } else {
                    AppError::Database(format!("Failed to save problem: {}", err))
                }
            }
            Err(e) => AppError::Database(format!("Failed to find conflicting problem: {}", e)),
        }
    }
}

#[async_trait]
impl ProblemRepository for DbPool {
    async fn find_problem(&self, project_id: i64, problem_id: i64) -> AppResult<Option<Problem>> {
        let row = ProblemRow::find_by_id(problem_id)
            .filter(problem::Column::ProjectId.eq(project_id))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get problem: {}", e)))?;

        self.first_with_patterns(row).await
    }

    async fn find_problem_by_name(
        &self,
        project_id: i64,
        name: &str,
    ) -> AppResult<Option<Problem>> {
        let row = ProblemRow::find()
            .filter(problem::Column::ProjectId.eq(project_id))
            .filter(problem::Column::Name.eq(name))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get problem by name: {}", e)))?;

        self.first_with_patterns(row).await
    }

    async fn find_problem_by_defect_id(
        &self,
        project_id: i64,
        defect_id: &str,
    ) -> AppResult<Option<Problem>> {
        let row = ProblemRow::find()
            .filter(problem::Column::ProjectId.eq(project_id))
            .filter(problem::Column::DefectId.eq(defect_id))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get problem by defect: {}", e)))?;

        self.first_with_patterns(row).await
    }

    async fn list_problems(&self, project_id: i64) -> AppResult<Vec<Problem>> {
        let rows = ProblemRow::find()
            .filter(problem::Column::ProjectId.eq(project_id))
            .order_by_desc(problem::Column::CreationDateTime)
            .order_by_desc(problem::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list problems: {}", e)))?;

        self.with_patterns(rows).await
    }

    async fn find_pattern(&self, project_id: i64, pattern_id: i64) -> AppResult<Option<Pattern>> {
        let result = PatternRow::find_by_id(pattern_id)
            .join(JoinType::InnerJoin, problem_pattern::Relation::Problem.def())
            .filter(problem::Column::ProjectId.eq(project_id))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get pattern: {}", e)))?;

        Ok(result.map(to_pattern))
    }

    async fn insert_problem(&self, project_id: i64, problem: &Problem) -> AppResult<Problem> {
        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let model = problem::ActiveModel {
            id: NotSet,
            project_id: Set(project_id),
            ..problem_model(problem)
        };
        let row = match model.insert(&txn).await {
            Ok(row) => row,
            Err(e) => {
                drop(txn);
                let conflicting = Problem {
                    id: 0,
                    project_id,
                    ..problem.clone()
                };
                return Err(self.conflicting_problem(&conflicting, e).await);
            }
        };

        let mut patterns = Vec::with_capacity(problem.patterns.len());
        for pattern in &problem.patterns {
            let inserted = pattern_model(row.id, &pattern.criteria)
                .insert(&txn)
                .await
                .map_err(|e| AppError::Database(format!("Failed to insert pattern: {}", e)))?;
            patterns.push(to_pattern(inserted));
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit problem: {}", e)))?;

        to_problem(row, patterns)
    }

    async fn save_problem(&self, problem: &Problem) -> AppResult<()> {
        let result = ProblemRow::update_many()
            .set(problem_model(problem))
            .filter(problem::Column::Id.eq(problem.id))
            .filter(problem::Column::ProjectId.eq(problem.project_id))
            .exec(self.connection())
            .await;

        match result {
            Ok(result) if result.rows_affected == 0 => Err(problem_not_found(problem.id)),
            Ok(_) => Ok(()),
            Err(e) => Err(self.conflicting_problem(problem, e).await),
        }
    }

    async fn save_defect_statuses(
        &self,
        project_id: i64,
        updates: &[DefectStatusUpdate],
    ) -> AppResult<Vec<i64>> {
        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let mut updated = Vec::with_capacity(updates.len());
        for update in updates {
            let result = ProblemRow::update_many()
                .set(defect_status_model(update))
                .filter(problem::Column::Id.eq(update.problem_id))
                .filter(problem::Column::ProjectId.eq(project_id))
                .filter(problem::Column::DefectId.eq(update.defect_id.as_str()))
                .exec(&txn)
                .await
                .map_err(|e| {
                    AppError::Database(format!("Failed to update defect status: {}", e))
                })?;
            if result.rows_affected > 0 {
                updated.push(update.problem_id);
            }
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit defect statuses: {}", e)))?;

        Ok(updated)
    }

    async fn delete_problem(&self, project_id: i64, problem_id: i64) -> AppResult<()> {
        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Pattern rows first, like every other pattern write
        PatternRow::find()
            .filter(problem_pattern::Column::ProblemId.eq(problem_id))
            .lock_exclusive()
            .all(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to lock patterns: {}", e)))?;

        let result = ProblemRow::delete_many()
            .filter(problem::Column::Id.eq(problem_id))
            .filter(problem::Column::ProjectId.eq(project_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete problem: {}", e)))?;
        if result.rows_affected == 0 {
            return Err(problem_not_found(problem_id));
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit problem deletion: {}", e)))?;

        Ok(())
    }

    async fn insert_pattern(
        &self,
        problem_id: i64,
        criteria: &PatternCriteria,
    ) -> AppResult<Pattern> {
        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        lock_problem(&txn, problem_id).await?;
        ensure_unique_criteria(&patterns_of(&txn, problem_id).await?, criteria, None)?;

        let inserted = pattern_model(problem_id, criteria)
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert pattern: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit pattern: {}", e)))?;

        Ok(to_pattern(inserted))
    }

    async fn update_pattern(&self, pattern: &Pattern) -> AppResult<()> {
        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let stored = lock_pattern(&txn, pattern.id).await?;
        lock_problem(&txn, stored.problem_id).await?;
        ensure_unique_criteria(
            &patterns_of(&txn, stored.problem_id).await?,
            &pattern.criteria,
            Some(pattern.id),
        )?;

        let model = problem_pattern::ActiveModel {
            id: Set(pattern.id),
            ..pattern_model(stored.problem_id, &pattern.criteria)
        };
        model
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to update pattern: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit pattern: {}", e)))?;

        Ok(())
    }

    async fn move_pattern(
        &self,
        pattern_id: i64,
        destination_problem_id: i64,
    ) -> AppResult<Option<i64>> {
        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let pattern = lock_pattern(&txn, pattern_id).await?;
        let source_id = pattern.problem_id;
        if source_id == destination_problem_id {
            return Err(source_is_destination());
        }

        // Lowest id first, so that crossed moves cannot deadlock
        let (first, second) = if source_id < destination_problem_id {
            (source_id, destination_problem_id)
        } else {
            (destination_problem_id, source_id)
        };
        lock_problem(&txn, first).await?;
        lock_problem(&txn, second).await?;

        ensure_unique_criteria(
            &patterns_of(&txn, destination_problem_id).await?,
            &to_pattern(pattern.clone()).criteria,
            None,
        )?;

        let mut model: problem_pattern::ActiveModel = pattern.into();
        model.problem_id = Set(destination_problem_id);
        model
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to move pattern: {}", e)))?;

        let deleted = delete_if_empty(&txn, source_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit pattern move: {}", e)))?;

        Ok(deleted.then_some(source_id))
    }

    async fn delete_pattern(&self, pattern_id: i64) -> AppResult<Option<i64>> {
        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let pattern = lock_pattern(&txn, pattern_id).await?;
        lock_problem(&txn, pattern.problem_id).await?;

        PatternRow::delete_by_id(pattern_id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete pattern: {}", e)))?;

        let deleted = delete_if_empty(&txn, pattern.problem_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit pattern deletion: {}", e)))?;

        Ok(deleted.then_some(pattern.problem_id))
    }
}
