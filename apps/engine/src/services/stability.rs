//! Stability timelines: whether a problem still reproduces, execution by execution.

use std::collections::HashSet;

use crate::models::{
    CycleDefinition, CycleStability, ErrorContext, Execution, ExecutionStability, StabilityStatus,
};

/// Build the timeline of one cycle.
///
/// `latest_executions` are the most recent executions of the cycle, newest first.
/// The result has exactly `slots` entries, oldest first, padded on the left with
/// empty slots when the cycle has fewer executions.
pub fn execution_stability(
    slots: usize,
    latest_executions: &[Execution],
    failing_execution_ids: &HashSet<i64>,
) -> Vec<ExecutionStability> {
    let executions = &latest_executions[..latest_executions.len().min(slots)];
    let mut timeline = vec![ExecutionStability::not_run(); slots - executions.len()];

    timeline.extend(executions.iter().rev().map(|execution| {
        let status = if failing_execution_ids.contains(&execution.id) {
            StabilityStatus::Error
        } else {
            StabilityStatus::Ok
        };
        ExecutionStability {
            status,
            execution_id: Some(execution.id),
            test_date_time: Some(execution.test_date_time),
        }
    }));

    timeline
}

/// Ids of the executions the given errors belong to.
pub fn failing_executions<'a, I>(errors: I) -> HashSet<i64>
where
    I: IntoIterator<Item = &'a ErrorContext>,
{
    errors.into_iter().map(|error| error.execution.id).collect()
}

/// One timeline row for a cycle definition.
pub fn cycle_stability(
    cycle: &CycleDefinition,
    slots: usize,
    latest_executions: &[Execution],
    failing_execution_ids: &HashSet<i64>,
) -> CycleStability {
    CycleStability {
        cycle_definition_id: cycle.id,
        branch: cycle.branch.clone(),
        cycle_name: cycle.name.clone(),
        executions: execution_stability(slots, latest_executions, failing_execution_ids),
    }
}

/// Display order of timeline rows: branch position, then branch, then cycle name.
pub fn sort_cycles(cycles: &mut [CycleDefinition]) {
    cycles.sort_by(|a, b| {
        a.branch_position
            .cmp(&b.branch_position)
            .then_with(|| a.branch.cmp(&b.branch))
            .then_with(|| a.name.cmp(&b.name))
    });
}
