//! Database queries for ingested errors.
//!
//! Pattern criteria are pushed down to PostgreSQL: each criterion becomes a condition
//! on one column of the error containment chain, with the same semantics as the
//! in-memory matcher (`%` is the only wildcard, `_` and `\` are literal).

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Select,
};

use crate::entity::error::{self as error_row, Entity as ErrorRow};
use crate::entity::{
    country, cycle_definition, executed_scenario, execution, run, run_type,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    Country, Criterion, CriterionValue, Error, ErrorContext, ExecutedScenario, Execution,
    PatternCriteria, Run, RunType,
};

use super::DbPool;
use super::repository::ErrorRepository;

/// Errors joined up to their cycle definition, country and type.
fn errors_of_project(project_id: i64) -> Select<ErrorRow> {
    ErrorRow::find()
        .join(JoinType::InnerJoin, error_row::Relation::ExecutedScenario.def())
        .join(JoinType::InnerJoin, executed_scenario::Relation::Run.def())
        .join(JoinType::InnerJoin, run::Relation::Execution.def())
        .join(JoinType::InnerJoin, execution::Relation::CycleDefinition.def())
        .join(JoinType::InnerJoin, run::Relation::Country.def())
        .join(JoinType::InnerJoin, run::Relation::RunType.def())
        .filter(cycle_definition::Column::ProjectId.eq(project_id))
}

/// Conjunction of the set criteria. An all-wildcard pattern yields an empty condition.
fn criteria_condition(criteria: &PatternCriteria) -> Condition {
    Criterion::ALL
        .iter()
        .fold(Condition::all(), |condition, criterion| {
            match criterion.value(criteria) {
                Some(value) => condition.add(criterion_condition(*criterion, value)),
                None => condition,
            }
        })
}

fn criterion_condition(criterion: Criterion, value: CriterionValue<'_>) -> Condition {
    match criterion {
        Criterion::FeatureFile => column_condition(executed_scenario::Column::FeatureFile, value),
        Criterion::FeatureName => column_condition(executed_scenario::Column::FeatureName, value),
        Criterion::ScenarioName => column_condition(executed_scenario::Column::Name, value),
        Criterion::Step => column_condition(error_row::Column::Step, value),
        Criterion::StepDefinition => column_condition(error_row::Column::StepDefinition, value),
        Criterion::Exception => column_condition(error_row::Column::Exception, value),
        Criterion::Release => column_condition(execution::Column::Release, value),
        Criterion::Country => column_condition(country::Column::Code, value),
        Criterion::Type => column_condition(run_type::Column::Code, value),
        Criterion::Platform => column_condition(run::Column::Platform, value),
        Criterion::TypeIsBrowser => column_condition(run_type::Column::IsBrowser, value),
        Criterion::TypeIsMobile => column_condition(run_type::Column::IsMobile, value),
    }
}

fn column_condition<C: ColumnTrait>(column: C, value: CriterionValue<'_>) -> Condition {
    match value {
        CriterionValue::Exact(v) => Condition::all().add(column.eq(v)),
        CriterionValue::Flag(b) => Condition::all().add(column.eq(b)),
        CriterionValue::Prefix(_) | CriterionValue::Contains(_) => match value.like_pattern() {
            Some(pattern) => Condition::all().add(column.like(escape_like(&pattern))),
            None => Condition::all(),
        },
    }
}

/// Make `_` and `\` literal in a PostgreSQL `LIKE` pattern, keeping `%` as wildcard.
pub(crate) fn escape_like(pattern: &str) -> String {
    pattern.replace('\\', "\\\\").replace('_', "\\_")
}

impl DbPool {
    /// Attach scenario, run and execution to error rows, keeping their order.
    async fn load_contexts(&self, rows: Vec<error_row::Model>) -> AppResult<Vec<ErrorContext>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let scenario_ids: Vec<i64> = rows
            .iter()
            .map(|e| e.executed_scenario_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let scenarios: HashMap<i64, executed_scenario::Model> = executed_scenario::Entity::find()
            .filter(executed_scenario::Column::Id.is_in(scenario_ids))
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to fetch executed scenarios: {}", e)))?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let run_ids: Vec<i64> = scenarios
            .values()
            .map(|s| s.run_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let runs: HashMap<i64, run::Model> = run::Entity::find()
            .filter(run::Column::Id.is_in(run_ids))
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to fetch runs: {}", e)))?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        let execution_ids: Vec<i64> = runs
            .values()
            .map(|r| r.execution_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let executions: HashMap<i64, execution::Model> = execution::Entity::find()
            .filter(execution::Column::Id.is_in(execution_ids))
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to fetch executions: {}", e)))?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();

        let country_ids: HashSet<i64> = runs.values().map(|r| r.country_id).collect();
        let countries: HashMap<i64, country::Model> = country::Entity::find()
            .filter(country::Column::Id.is_in(country_ids))
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to fetch countries: {}", e)))?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let type_ids: HashSet<i64> = runs.values().map(|r| r.type_id).collect();
        let types: HashMap<i64, run_type::Model> = run_type::Entity::find()
            .filter(run_type::Column::Id.is_in(type_ids))
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to fetch types: {}", e)))?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();

        let contexts = rows
            .into_iter()
            .filter_map(|row| {
                let scenario = scenarios.get(&row.executed_scenario_id)?;
                let run = runs.get(&scenario.run_id)?;
                let execution = executions.get(&run.execution_id)?;
                let country = countries.get(&run.country_id)?;
                let run_type = types.get(&run.type_id)?;

                Some(ErrorContext {
                    error: Error {
                        id: row.id,
                        executed_scenario_id: row.executed_scenario_id,
                        step: row.step,
                        step_definition: row.step_definition,
                        step_line: row.step_line,
                        exception: row.exception,
                    },
                    scenario: to_scenario(scenario),
                    run: Run {
                        id: run.id,
                        execution_id: run.execution_id,
                        country: to_country(country),
                        run_type: to_run_type(run_type),
                        platform: run.platform.clone(),
                    },
                    execution: to_execution(execution),
                })
            })
            .collect();

        Ok(contexts)
    }
}

#[async_trait]
impl ErrorRepository for DbPool {
    async fn find_errors_by_ids(
        &self,
        project_id: i64,
        error_ids: &[i64],
    ) -> AppResult<Vec<ErrorContext>> {
        if error_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = errors_of_project(project_id)
            .filter(error_row::Column::Id.is_in(error_ids.to_vec()))
            .order_by_asc(error_row::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get errors: {}", e)))?;

        self.load_contexts(rows).await
    }

    async fn find_matching_errors(
        &self,
        project_id: i64,
        criteria: &PatternCriteria,
    ) -> AppResult<Vec<ErrorContext>> {
        let rows = errors_of_project(project_id)
            .filter(criteria_condition(criteria))
            .order_by_asc(error_row::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get matching errors: {}", e)))?;

        self.load_contexts(rows).await
    }

    async fn find_execution(
        &self,
        project_id: i64,
        execution_id: i64,
    ) -> AppResult<Option<Execution>> {
        let result = execution::Entity::find_by_id(execution_id)
            .join(JoinType::InnerJoin, execution::Relation::CycleDefinition.def())
            .filter(cycle_definition::Column::ProjectId.eq(project_id))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get execution: {}", e)))?;

        Ok(result.as_ref().map(to_execution))
    }

    async fn find_errors_of_execution(&self, execution_id: i64) -> AppResult<Vec<ErrorContext>> {
        let rows = ErrorRow::find()
            .join(JoinType::InnerJoin, error_row::Relation::ExecutedScenario.def())
            .join(JoinType::InnerJoin, executed_scenario::Relation::Run.def())
            .filter(run::Column::ExecutionId.eq(execution_id))
            .order_by_asc(error_row::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to get errors of execution: {}", e))
            })?;

        self.load_contexts(rows).await
    }

    async fn find_last_executions(
        &self,
        cycle_definition_id: i64,
        limit: usize,
    ) -> AppResult<Vec<Execution>> {
        let result = execution::Entity::find()
            .filter(execution::Column::CycleDefinitionId.eq(cycle_definition_id))
            .order_by_desc(execution::Column::TestDateTime)
            .order_by_desc(execution::Column::Id)
            .limit(limit as u64)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get last executions: {}", e)))?;

        Ok(result.iter().map(to_execution).collect())
    }
}

fn to_execution(model: &execution::Model) -> Execution {
    Execution {
        id: model.id,
        cycle_definition_id: model.cycle_definition_id,
        branch: model.branch.clone(),
        name: model.name.clone(),
        release: model.release.clone(),
        version: model.version.clone(),
        test_date_time: model.test_date_time,
    }
}

fn to_scenario(model: &executed_scenario::Model) -> ExecutedScenario {
    ExecutedScenario {
        id: model.id,
        run_id: model.run_id,
        feature_file: model.feature_file.clone(),
        feature_name: model.feature_name.clone(),
        name: model.name.clone(),
        severity: model.severity.clone(),
        line: model.line,
    }
}

pub(crate) fn to_country(model: &country::Model) -> Country {
    Country {
        id: model.id,
        project_id: model.project_id,
        code: model.code.clone(),
        name: model.name.clone(),
    }
}

pub(crate) fn to_run_type(model: &run_type::Model) -> RunType {
    RunType {
        id: model.id,
        project_id: model.project_id,
        code: model.code.clone(),
        name: model.name.clone(),
        is_browser: model.is_browser,
        is_mobile: model.is_mobile,
    }
}
