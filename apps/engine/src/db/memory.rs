//! In-memory implementation of the repositories.
//!
//! Used by embedders that keep their own persistence and by tests. Every
//! repository call takes the store lock once, so each write (uniqueness checks
//! and cascades included) is atomic. Matching is done with the pure pattern
//! matcher.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{AppError, AppResult};
use crate::models::{
    Country, CycleDefinition, DefectStatusUpdate, Error, ErrorContext, ExecutedScenario,
    Execution, Pattern, PatternCriteria, Problem, RootCause, Run, RunType, Team,
};
use crate::services::matcher::matches;

use super::repository::{
    ErrorRepository, ProblemRepository, ReferenceRepository, defect_id_not_unique,
    ensure_unique_criteria, name_not_unique, pattern_not_found, problem_not_found,
    source_is_destination,
};

#[derive(Default)]
struct State {
    countries: BTreeMap<i64, Country>,
    types: BTreeMap<i64, RunType>,
    teams: BTreeMap<i64, Team>,
    root_causes: BTreeMap<i64, RootCause>,
    cycle_definitions: BTreeMap<i64, CycleDefinition>,
    executions: BTreeMap<i64, Execution>,
    runs: BTreeMap<i64, Run>,
    scenarios: BTreeMap<i64, ExecutedScenario>,
    errors: BTreeMap<i64, Error>,
    problems: BTreeMap<i64, Problem>,
    next_problem_id: i64,
    next_pattern_id: i64,
}

impl State {
    fn execution_project(&self, execution_id: i64) -> Option<i64> {
        let execution = self.executions.get(&execution_id)?;
        self.cycle_definitions
            .get(&execution.cycle_definition_id)
            .map(|cycle| cycle.project_id)
    }

    fn context(&self, error: &Error) -> Option<ErrorContext> {
        let scenario = self.scenarios.get(&error.executed_scenario_id)?;
        let run = self.runs.get(&scenario.run_id)?;
        let execution = self.executions.get(&run.execution_id)?;
        Some(ErrorContext {
            error: error.clone(),
            scenario: scenario.clone(),
            run: run.clone(),
            execution: execution.clone(),
        })
    }

    /// Contexts of the project's errors, ascending id.
    fn contexts(&self, project_id: i64) -> impl Iterator<Item = ErrorContext> + '_ {
        self.errors
            .values()
            .filter_map(move |error| self.context(error))
            .filter(move |context| self.execution_project(context.execution.id) == Some(project_id))
    }

    fn pattern_owner(&self, pattern_id: i64) -> Option<(i64, usize)> {
        self.problems.values().find_map(|problem| {
            problem
                .patterns
                .iter()
                .position(|pattern| pattern.id == pattern_id)
                .map(|index| (problem.id, index))
        })
    }

    /// Fails when another problem of the project has the same name or defect id.
    fn ensure_unique_properties(
        &self,
        project_id: i64,
        own_id: Option<i64>,
        problem: &Problem,
    ) -> AppResult<()> {
        let others = self
            .problems
            .values()
            .filter(|p| p.project_id == project_id && Some(p.id) != own_id);
        for other in others {
            if other.name == problem.name {
                return Err(name_not_unique(other.id));
            }
            if problem.defect_id.is_some() && other.defect_id == problem.defect_id {
                return Err(defect_id_not_unique(other.id));
            }
        }
        Ok(())
    }

    fn next_pattern_id(&mut self) -> i64 {
        self.next_pattern_id += 1;
        self.next_pattern_id
    }
}

/// Repositories backed by process memory.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| AppError::Database("In-memory store mutex poisoned".to_string()))
    }

    // Ingestion-side seeding. Records keep the ids given by the caller.

    pub fn add_country(&self, country: Country) -> AppResult<()> {
        self.lock()?.countries.insert(country.id, country);
        Ok(())
    }

    pub fn add_type(&self, run_type: RunType) -> AppResult<()> {
        self.lock()?.types.insert(run_type.id, run_type);
        Ok(())
    }

    pub fn add_team(&self, team: Team) -> AppResult<()> {
        self.lock()?.teams.insert(team.id, team);
        Ok(())
    }

    pub fn add_root_cause(&self, root_cause: RootCause) -> AppResult<()> {
        self.lock()?.root_causes.insert(root_cause.id, root_cause);
        Ok(())
    }

    pub fn add_cycle_definition(&self, cycle: CycleDefinition) -> AppResult<()> {
        self.lock()?.cycle_definitions.insert(cycle.id, cycle);
        Ok(())
    }

    pub fn add_execution(&self, execution: Execution) -> AppResult<()> {
        self.lock()?.executions.insert(execution.id, execution);
        Ok(())
    }

    pub fn add_run(&self, run: Run) -> AppResult<()> {
        self.lock()?.runs.insert(run.id, run);
        Ok(())
    }

    pub fn add_scenario(&self, scenario: ExecutedScenario) -> AppResult<()> {
        self.lock()?.scenarios.insert(scenario.id, scenario);
        Ok(())
    }

    pub fn add_error(&self, error: Error) -> AppResult<()> {
        self.lock()?.errors.insert(error.id, error);
        Ok(())
    }
}

#[async_trait]
impl ProblemRepository for InMemoryStore {
    async fn find_problem(&self, project_id: i64, problem_id: i64) -> AppResult<Option<Problem>> {
        let state = self.lock()?;
        Ok(state
            .problems
            .get(&problem_id)
            .filter(|p| p.project_id == project_id)
            .cloned())
    }

    async fn find_problem_by_name(
        &self,
        project_id: i64,
        name: &str,
    ) -> AppResult<Option<Problem>> {
        let state = self.lock()?;
        Ok(state
            .problems
            .values()
            .find(|p| p.project_id == project_id && p.name == name)
            .cloned())
    }

    async fn find_problem_by_defect_id(
        &self,
        project_id: i64,
        defect_id: &str,
    ) -> AppResult<Option<Problem>> {
        let state = self.lock()?;
        Ok(state
            .problems
            .values()
            .find(|p| p.project_id == project_id && p.defect_id.as_deref() == Some(defect_id))
            .cloned())
    }

    async fn list_problems(&self, project_id: i64) -> AppResult<Vec<Problem>> {
        let state = self.lock()?;
        let mut problems: Vec<Problem> = state
            .problems
            .values()
            .filter(|p| p.project_id == project_id)
            .cloned()
            .collect();
        problems.sort_by(|a, b| {
            b.creation_date_time
                .cmp(&a.creation_date_time)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(problems)
    }

    async fn find_pattern(&self, project_id: i64, pattern_id: i64) -> AppResult<Option<Pattern>> {
        let state = self.lock()?;
        Ok(state
            .problems
            .values()
            .filter(|p| p.project_id == project_id)
            .flat_map(|p| p.patterns.iter())
            .find(|pattern| pattern.id == pattern_id)
            .cloned())
    }

    async fn insert_problem(&self, project_id: i64, problem: &Problem) -> AppResult<Problem> {
        let mut state = self.lock()?;
        state.ensure_unique_properties(project_id, None, problem)?;

        state.next_problem_id += 1;
        let id = state.next_problem_id;

        let mut stored = problem.clone();
        stored.id = id;
        stored.project_id = project_id;
        stored.defect_url = None;
        stored.patterns = Vec::with_capacity(problem.patterns.len());
        for pattern in &problem.patterns {
            let pattern_id = state.next_pattern_id();
            stored.patterns.push(Pattern {
                id: pattern_id,
                problem_id: id,
                criteria: pattern.criteria.clone(),
            });
        }

        state.problems.insert(id, stored.clone());
        Ok(stored)
    }

    async fn save_problem(&self, problem: &Problem) -> AppResult<()> {
        let mut state = self.lock()?;
        state.ensure_unique_properties(problem.project_id, Some(problem.id), problem)?;

        let stored = state
            .problems
            .get_mut(&problem.id)
            .filter(|p| p.project_id == problem.project_id)
            .ok_or_else(|| problem_not_found(problem.id))?;
        let patterns = std::mem::take(&mut stored.patterns);
        *stored = Problem {
            patterns,
            defect_url: None,
            ..problem.clone()
        };
        Ok(())
    }

    async fn save_defect_statuses(
        &self,
        project_id: i64,
        updates: &[DefectStatusUpdate],
    ) -> AppResult<Vec<i64>> {
        let mut state = self.lock()?;

        let mut updated = Vec::with_capacity(updates.len());
        for update in updates {
            let Some(stored) = state
                .problems
                .get_mut(&update.problem_id)
                .filter(|p| p.project_id == project_id)
                .filter(|p| p.defect_id.as_deref() == Some(update.defect_id.as_str()))
            else {
                continue;
            };
            stored.defect_existence = Some(update.defect_existence);
            stored.status = update.status;
            stored.closing_date_time = update.closing_date_time;
            updated.push(update.problem_id);
        }
        Ok(updated)
    }

    async fn delete_problem(&self, project_id: i64, problem_id: i64) -> AppResult<()> {
        let mut state = self.lock()?;
        match state.problems.get(&problem_id) {
            Some(p) if p.project_id == project_id => {
                state.problems.remove(&problem_id);
                Ok(())
            }
            _ => Err(problem_not_found(problem_id)),
        }
    }

    async fn insert_pattern(
        &self,
        problem_id: i64,
        criteria: &PatternCriteria,
    ) -> AppResult<Pattern> {
        let mut state = self.lock()?;
        let problem = state
            .problems
            .get(&problem_id)
            .ok_or_else(|| problem_not_found(problem_id))?;
        ensure_unique_criteria(&problem.patterns, criteria, None)?;

        let pattern = Pattern {
            id: state.next_pattern_id(),
            problem_id,
            criteria: criteria.clone(),
        };
        if let Some(problem) = state.problems.get_mut(&problem_id) {
            problem.patterns.push(pattern.clone());
        }
        Ok(pattern)
    }

    async fn update_pattern(&self, pattern: &Pattern) -> AppResult<()> {
        let mut state = self.lock()?;
        let (problem_id, index) = state
            .pattern_owner(pattern.id)
            .ok_or_else(|| pattern_not_found(pattern.id))?;

        let Some(problem) = state.problems.get_mut(&problem_id) else {
            return Err(problem_not_found(problem_id));
        };
        ensure_unique_criteria(&problem.patterns, &pattern.criteria, Some(pattern.id))?;
        problem.patterns[index].criteria = pattern.criteria.clone();
        Ok(())
    }

    async fn move_pattern(
        &self,
        pattern_id: i64,
        destination_problem_id: i64,
    ) -> AppResult<Option<i64>> {
        let mut state = self.lock()?;
        let (source_id, index) = state
            .pattern_owner(pattern_id)
            .ok_or_else(|| pattern_not_found(pattern_id))?;
        if source_id == destination_problem_id {
            return Err(source_is_destination());
        }
        let destination = state
            .problems
            .get(&destination_problem_id)
            .ok_or_else(|| problem_not_found(destination_problem_id))?;
        if let Some(moved) = state
            .problems
            .get(&source_id)
            .and_then(|source| source.patterns.get(index))
        {
            ensure_unique_criteria(&destination.patterns, &moved.criteria, None)?;
        }

        let Some(source) = state.problems.get_mut(&source_id) else {
            return Err(problem_not_found(source_id));
        };
        let mut pattern = source.patterns.remove(index);
        let source_emptied = source.patterns.is_empty();

        pattern.problem_id = destination_problem_id;
        if let Some(destination) = state.problems.get_mut(&destination_problem_id) {
            destination.patterns.push(pattern);
        }

        if source_emptied {
            state.problems.remove(&source_id);
            return Ok(Some(source_id));
        }
        Ok(None)
    }

    async fn delete_pattern(&self, pattern_id: i64) -> AppResult<Option<i64>> {
        let mut state = self.lock()?;
        let (problem_id, index) = state
            .pattern_owner(pattern_id)
            .ok_or_else(|| pattern_not_found(pattern_id))?;

        let Some(problem) = state.problems.get_mut(&problem_id) else {
            return Err(problem_not_found(problem_id));
        };
        problem.patterns.remove(index);

        if problem.patterns.is_empty() {
            state.problems.remove(&problem_id);
            return Ok(Some(problem_id));
        }
        Ok(None)
    }
}

#[async_trait]
impl ReferenceRepository for InMemoryStore {
    async fn find_team(&self, project_id: i64, team_id: i64) -> AppResult<Option<Team>> {
        let state = self.lock()?;
        Ok(state
            .teams
            .get(&team_id)
            .filter(|t| t.project_id == project_id)
            .cloned())
    }

    async fn find_root_cause(
        &self,
        project_id: i64,
        root_cause_id: i64,
    ) -> AppResult<Option<RootCause>> {
        let state = self.lock()?;
        Ok(state
            .root_causes
            .get(&root_cause_id)
            .filter(|r| r.project_id == project_id)
            .cloned())
    }

    async fn find_country_by_code(
        &self,
        project_id: i64,
        code: &str,
    ) -> AppResult<Option<Country>> {
        let state = self.lock()?;
        Ok(state
            .countries
            .values()
            .find(|c| c.project_id == project_id && c.code == code)
            .cloned())
    }

    async fn find_type_by_code(&self, project_id: i64, code: &str) -> AppResult<Option<RunType>> {
        let state = self.lock()?;
        Ok(state
            .types
            .values()
            .find(|t| t.project_id == project_id && t.code == code)
            .cloned())
    }

    async fn list_cycle_definitions(&self, project_id: i64) -> AppResult<Vec<CycleDefinition>> {
        let state = self.lock()?;
        Ok(state
            .cycle_definitions
            .values()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ErrorRepository for InMemoryStore {
    async fn find_errors_by_ids(
        &self,
        project_id: i64,
        error_ids: &[i64],
    ) -> AppResult<Vec<ErrorContext>> {
        let state = self.lock()?;
        Ok(state
            .contexts(project_id)
            .filter(|context| error_ids.contains(&context.id()))
            .collect())
    }

    async fn find_matching_errors(
        &self,
        project_id: i64,
        criteria: &PatternCriteria,
    ) -> AppResult<Vec<ErrorContext>> {
        let state = self.lock()?;
        Ok(state
            .contexts(project_id)
            .filter(|context| matches(context, criteria))
            .collect())
    }

    async fn find_execution(
        &self,
        project_id: i64,
        execution_id: i64,
    ) -> AppResult<Option<Execution>> {
        let state = self.lock()?;
        if state.execution_project(execution_id) != Some(project_id) {
            return Ok(None);
        }
        Ok(state.executions.get(&execution_id).cloned())
    }

    async fn find_errors_of_execution(&self, execution_id: i64) -> AppResult<Vec<ErrorContext>> {
        let state = self.lock()?;
        Ok(state
            .errors
            .values()
            .filter_map(|error| state.context(error))
            .filter(|context| context.execution.id == execution_id)
            .collect())
    }

    async fn find_last_executions(
        &self,
        cycle_definition_id: i64,
        limit: usize,
    ) -> AppResult<Vec<Execution>> {
        let state = self.lock()?;
        let mut executions: Vec<Execution> = state
            .executions
            .values()
            .filter(|e| e.cycle_definition_id == cycle_definition_id)
            .cloned()
            .collect();
        executions.sort_by(|a, b| {
            b.test_date_time
                .cmp(&a.test_date_time)
                .then_with(|| b.id.cmp(&a.id))
        });
        executions.truncate(limit);
        Ok(executions)
    }
}
