//! Database queries for project reference data.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::entity::{country, cycle_definition, root_cause, run_type, team};
use crate::error::{AppError, AppResult};
use crate::models::{Country, CycleDefinition, RootCause, RunType, Team};

use super::DbPool;
use super::errors::{to_country, to_run_type};
use super::repository::ReferenceRepository;

#[async_trait]
impl ReferenceRepository for DbPool {
    async fn find_team(&self, project_id: i64, team_id: i64) -> AppResult<Option<Team>> {
        let result = team::Entity::find_by_id(team_id)
            .filter(team::Column::ProjectId.eq(project_id))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get team: {}", e)))?;

        Ok(result.map(|t| Team {
            id: t.id,
            project_id: t.project_id,
            name: t.name,
            assign_to_problems: t.assign_to_problems,
        }))
    }

    async fn find_root_cause(
        &self,
        project_id: i64,
        root_cause_id: i64,
    ) -> AppResult<Option<RootCause>> {
        let result = root_cause::Entity::find_by_id(root_cause_id)
            .filter(root_cause::Column::ProjectId.eq(project_id))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get root cause: {}", e)))?;

        Ok(result.map(|r| RootCause {
            id: r.id,
            project_id: r.project_id,
            name: r.name,
        }))
    }

    async fn find_country_by_code(
        &self,
        project_id: i64,
        code: &str,
    ) -> AppResult<Option<Country>> {
        let result = country::Entity::find()
            .filter(country::Column::ProjectId.eq(project_id))
            .filter(country::Column::Code.eq(code))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get country: {}", e)))?;

        Ok(result.as_ref().map(to_country))
    }

    async fn find_type_by_code(&self, project_id: i64, code: &str) -> AppResult<Option<RunType>> {
        let result = run_type::Entity::find()
            .filter(run_type::Column::ProjectId.eq(project_id))
            .filter(run_type::Column::Code.eq(code))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get type: {}", e)))?;

        Ok(result.as_ref().map(to_run_type))
    }

    async fn list_cycle_definitions(&self, project_id: i64) -> AppResult<Vec<CycleDefinition>> {
        let result = cycle_definition::Entity::find()
            .filter(cycle_definition::Column::ProjectId.eq(project_id))
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get cycle definitions: {}", e)))?;

        Ok(result
            .into_iter()
            .map(|c| CycleDefinition {
                id: c.id,
                project_id: c.project_id,
                branch: c.branch,
                name: c.name,
                branch_position: c.branch_position,
            })
            .collect())
    }
}
