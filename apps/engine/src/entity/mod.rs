//! SeaORM entity definitions for PostgreSQL database.

pub mod country;
pub mod cycle_definition;
pub mod error;
pub mod executed_scenario;
pub mod execution;
pub mod problem;
pub mod problem_pattern;
pub mod root_cause;
pub mod run;
pub mod run_type;
pub mod team;
