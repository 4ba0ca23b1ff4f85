//! Migration: Create problems and problem_patterns tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE problems (
                    id BIGSERIAL PRIMARY KEY,
                    project_id BIGINT NOT NULL,
                    name VARCHAR(256) NOT NULL,
                    comment TEXT,
                    status VARCHAR(16) NOT NULL DEFAULT 'OPEN'
                        CHECK (status IN ('OPEN', 'CLOSED')),
                    blamed_team_id BIGINT REFERENCES teams(id),
                    defect_id VARCHAR(32),
                    defect_existence VARCHAR(16)
                        CHECK (defect_existence IS NULL OR defect_existence IN ('EXISTS', 'NONEXISTENT', 'UNKNOWN')),
                    closing_date_time TIMESTAMPTZ,
                    root_cause_id BIGINT REFERENCES root_causes(id),
                    creation_date_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    UNIQUE (project_id, name)
                );

                -- A defect is linked to at most one problem of the project
                CREATE UNIQUE INDEX idx_problems_project_defect ON problems(project_id, defect_id)
                    WHERE defect_id IS NOT NULL;

                CREATE INDEX idx_problems_project_creation ON problems(project_id, creation_date_time DESC);

                CREATE TABLE problem_patterns (
                    id BIGSERIAL PRIMARY KEY,
                    problem_id BIGINT NOT NULL REFERENCES problems(id) ON DELETE CASCADE,

                    -- NULL criteria are wildcards
                    feature_file VARCHAR(256),
                    feature_name VARCHAR(256),
                    scenario_name VARCHAR(512),
                    scenario_name_starts_with BOOLEAN NOT NULL DEFAULT FALSE,
                    step VARCHAR(2048),
                    step_starts_with BOOLEAN NOT NULL DEFAULT FALSE,
                    step_definition VARCHAR(2048),
                    step_definition_starts_with BOOLEAN NOT NULL DEFAULT FALSE,
                    exception TEXT,
                    release VARCHAR(32),
                    country_code VARCHAR(2),
                    type_code VARCHAR(16),
                    type_is_browser BOOLEAN,
                    type_is_mobile BOOLEAN,
                    platform VARCHAR(32)
                );

                CREATE INDEX idx_problem_patterns_problem_id ON problem_patterns(problem_id);
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TABLE IF EXISTS problem_patterns CASCADE;
                DROP TABLE IF EXISTS problems CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
