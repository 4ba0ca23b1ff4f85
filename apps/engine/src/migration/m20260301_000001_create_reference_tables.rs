//! Migration: Create project reference tables.
//!
//! Countries, run types, teams, root causes and cycle definitions are maintained by
//! the project settings and only read by the engine.

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
                CREATE TABLE countries (
                    id BIGSERIAL PRIMARY KEY,
                    project_id BIGINT NOT NULL,
                    code VARCHAR(2) NOT NULL,
                    name VARCHAR(40) NOT NULL,
                    UNIQUE (project_id, code)
                );

                CREATE TABLE types (
                    id BIGSERIAL PRIMARY KEY,
                    project_id BIGINT NOT NULL,
                    code VARCHAR(16) NOT NULL,
                    name VARCHAR(50) NOT NULL,
                    is_browser BOOLEAN NOT NULL DEFAULT FALSE,
                    is_mobile BOOLEAN NOT NULL DEFAULT FALSE,
                    UNIQUE (project_id, code)
                );

                CREATE TABLE teams (
                    id BIGSERIAL PRIMARY KEY,
                    project_id BIGINT NOT NULL,
                    name VARCHAR(128) NOT NULL,
                    assign_to_problems BOOLEAN NOT NULL DEFAULT TRUE,
                    UNIQUE (project_id, name)
                );

                CREATE TABLE root_causes (
                    id BIGSERIAL PRIMARY KEY,
                    project_id BIGINT NOT NULL,
                    name VARCHAR(128) NOT NULL,
                    UNIQUE (project_id, name)
                );

                CREATE TABLE cycle_definitions (
                    id BIGSERIAL PRIMARY KEY,
                    project_id BIGINT NOT NULL,
                    branch VARCHAR(16) NOT NULL,
                    name VARCHAR(16) NOT NULL,
                    branch_position INTEGER NOT NULL DEFAULT 0,
                    UNIQUE (project_id, branch, name)
                );
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
                DROP TABLE IF EXISTS cycle_definitions CASCADE;
                DROP TABLE IF EXISTS root_causes CASCADE;
                DROP TABLE IF EXISTS teams CASCADE;
                DROP TABLE IF EXISTS types CASCADE;
                DROP TABLE IF EXISTS countries CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
