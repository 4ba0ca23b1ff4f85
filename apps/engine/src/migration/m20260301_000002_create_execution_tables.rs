//! Migration: Create execution tables.
//!
//! The containment chain of ingested errors: execution, run, executed scenario, error.

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
                CREATE TABLE executions (
                    id BIGSERIAL PRIMARY KEY,
                    cycle_definition_id BIGINT NOT NULL REFERENCES cycle_definitions(id) ON DELETE CASCADE,
                    branch VARCHAR(16) NOT NULL,
                    name VARCHAR(16) NOT NULL,
                    release VARCHAR(32),
                    version VARCHAR(64),
                    test_date_time TIMESTAMPTZ NOT NULL
                );

                -- Most recent executions of a cycle (stability timelines)
                CREATE INDEX idx_executions_cycle_date ON executions(cycle_definition_id, test_date_time DESC);

                CREATE TABLE runs (
                    id BIGSERIAL PRIMARY KEY,
                    execution_id BIGINT NOT NULL REFERENCES executions(id) ON DELETE CASCADE,
                    country_id BIGINT NOT NULL REFERENCES countries(id),
                    type_id BIGINT NOT NULL REFERENCES types(id),
                    platform VARCHAR(32) NOT NULL
                );

                CREATE INDEX idx_runs_execution_id ON runs(execution_id);

                CREATE TABLE executed_scenarios (
                    id BIGSERIAL PRIMARY KEY,
                    run_id BIGINT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
                    feature_file VARCHAR(256) NOT NULL,
                    feature_name VARCHAR(256) NOT NULL,
                    name VARCHAR(512) NOT NULL,
                    severity VARCHAR(32) NOT NULL DEFAULT '',
                    line INTEGER NOT NULL DEFAULT 0
                );

                CREATE INDEX idx_executed_scenarios_run_id ON executed_scenarios(run_id);

                CREATE TABLE errors (
                    id BIGSERIAL PRIMARY KEY,
                    executed_scenario_id BIGINT NOT NULL REFERENCES executed_scenarios(id) ON DELETE CASCADE,
                    step VARCHAR(2048) NOT NULL,
                    step_definition VARCHAR(2048) NOT NULL,
                    step_line INTEGER NOT NULL DEFAULT 0,
                    exception TEXT
                );

                CREATE INDEX idx_errors_executed_scenario_id ON errors(executed_scenario_id);
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
                DROP TABLE IF EXISTS errors CASCADE;
                DROP TABLE IF EXISTS executed_scenarios CASCADE;
                DROP TABLE IF EXISTS runs CASCADE;
                DROP TABLE IF EXISTS executions CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
