//! Domain models for the problem engine.

pub mod aggregate;
pub mod criterion;
pub mod execution;
pub mod filter;
pub mod pattern;
pub mod problem;
pub mod stability;

// Re-export commonly used types
pub use aggregate::{DimensionSummary, ProblemAggregate};
pub use criterion::{Attribute, Criterion, CriterionValue};
pub use execution::{
    Country, CycleDefinition, Error, ErrorContext, ExecutedScenario, Execution, Run, RunType,
};
pub use filter::{ProblemFilter, ProblemStatusFilter};
pub use pattern::{Pattern, PatternCriteria};
pub use problem::{
    DefectExistence, DefectStatusUpdate, DeletePatternResult, EffectiveStatus, NewProblem,
    PickUpPatternResult, Problem, ProblemProperties, ProblemStatus, ProblemWithAggregate,
    RootCause, Team,
};
pub use stability::{CycleStability, ExecutionStability, StabilityStatus};
