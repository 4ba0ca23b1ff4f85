//! Problem engine library.
//!
//! Groups test failures into problems through user-defined patterns, computes
//! aggregates and stability timelines over them, and manages their lifecycle,
//! optionally linked to a defect tracker.

pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod migration;
pub mod models;
pub mod services;
