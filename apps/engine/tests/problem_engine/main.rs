//! Problem engine test suite.
//!
//! Runs the problem service end-to-end over the in-memory store, seeded with a
//! small project of executions, runs, scenarios and errors.
//!
//! Run with: cargo test --test problem_engine


mod test_aggregates;
mod test_defects;
mod test_lifecycle;
mod test_matching;
mod test_patterns;
