//! Aggregates, stability timelines, effective status and problem search.

use problem_engine::db::ProblemRepository;
use problem_engine::models::{
    EffectiveStatus, ProblemFilter, ProblemStatusFilter, ProblemWithAggregate,
};

use super::fixtures::*;

fn timelines(problem: &ProblemWithAggregate) -> Vec<String> {
    problem.stabilities.iter().map(|s| s.timeline()).collect()
}

#[tokio::test]
async fn test_aggregate_of_step_problem() {
    let store = seeded_store();
    let service = service(&store);
    let problem = create(&service, "Step 2 fails", step("Step 2")).await;

    let aggregate = service.aggregate(PROJECT, problem.id).await.unwrap();

    assert_eq!(aggregate.pattern_count, 1);
    assert_eq!(aggregate.error_count, 3);
    assert_eq!(aggregate.scenario_count, 3);
    assert_eq!(aggregate.first_scenario_name.as_deref(), Some("Scenario a"));
    assert_eq!(aggregate.branches.count, 1);
    assert_eq!(aggregate.branches.first.as_deref(), Some("develop"));
    assert_eq!(aggregate.releases.count, 2);
    assert_eq!(aggregate.releases.first.as_deref(), Some("1.0"));
    assert_eq!(aggregate.versions.count, 2);
    assert_eq!(aggregate.countries.count, 2);
    assert_eq!(aggregate.countries.first.as_deref(), Some("be"));
    assert_eq!(aggregate.types.count, 3);
    assert_eq!(aggregate.types.first.as_deref(), Some("api"));
    assert_eq!(aggregate.platforms.count, 2);
    assert_eq!(aggregate.first_seen_date_time, Some(at(1, 10)));
    assert_eq!(aggregate.last_seen_date_time, Some(at(2, 10)));
}

#[tokio::test]
async fn test_scenarios_are_counted_by_name() {
    let store = seeded_store();
    let service = service(&store);
    let problem = create(&service, "Exception 2", exception("Exc%2")).await;

    let aggregate = service.aggregate(PROJECT, problem.id).await.unwrap();

    // Errors 5 and 6 share "Scenario d"
    assert_eq!(aggregate.error_count, 4);
    assert_eq!(aggregate.scenario_count, 3);
    assert_eq!(aggregate.branches.count, 2);
    assert_eq!(aggregate.releases.count, 1);
    assert_eq!(aggregate.last_seen_date_time, Some(at(1, 20)));
}

#[tokio::test]
async fn test_stability_rows_follow_branch_position() {
    let store = seeded_store();
    let service = service(&store);
    let problem = create(&service, "Step 2 fails", step("Step 2")).await;

    let stabilities = service.stability(PROJECT, problem.id).await.unwrap();

    let rows: Vec<(String, String, String)> = stabilities
        .iter()
        .map(|s| (s.branch.clone(), s.cycle_name.clone(), s.timeline()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("develop".to_string(), "day".to_string(), "--EE".to_string()),
            ("develop".to_string(), "night".to_string(), "---O".to_string()),
            ("master".to_string(), "day".to_string(), "---O".to_string()),
        ]
    );
    assert!(stabilities.iter().all(|s| s.executions.len() == SLOTS));
}

#[tokio::test]
async fn test_problem_without_errors() {
    let store = seeded_store();
    let service = service(&store);
    let problem = create(&service, "Never seen", step("Step 404")).await;

    let enriched = service
        .find_one_with_aggregate(PROJECT, problem.id)
        .await
        .unwrap();

    assert_eq!(enriched.aggregate.error_count, 0);
    assert!(enriched.aggregate.first_seen_date_time.is_none());
    assert!(enriched.aggregate.first_scenario_name.is_none());
    assert_eq!(enriched.effective_status, EffectiveStatus::Open);
    assert_eq!(timelines(&enriched), vec!["--OO", "---O", "---O"]);
}

#[tokio::test]
async fn test_closed_problem_seen_again_has_reappeared() {
    let store = seeded_store();
    let service = service(&store);
    let problem = create(&service, "Step 2 fails", step("Step 2")).await;

    service.close(PROJECT, problem.id, ROOT_CAUSE_BUG).await.unwrap();
    let enriched = service
        .find_one_with_aggregate(PROJECT, problem.id)
        .await
        .unwrap();
    assert_eq!(enriched.effective_status, EffectiveStatus::Closed);

    // Closed between the two executions where the problem occurs
    let mut stored = store.find_problem(PROJECT, problem.id).await.unwrap().unwrap();
    stored.closing_date_time = Some(at(1, 12));
    store.save_problem(&stored).await.unwrap();

    let enriched = service
        .find_one_with_aggregate(PROJECT, problem.id)
        .await
        .unwrap();
    assert_eq!(enriched.effective_status, EffectiveStatus::Reappeared);
}

#[tokio::test]
async fn test_status_filters() {
    let store = seeded_store();
    let service = service(&store);
    let open = create(&service, "Open", step("Step 1")).await;
    let closed = create(&service, "Closed", step("Step 404")).await;
    let reappeared = create(&service, "Reappeared", step("Step 2")).await;

    service.close(PROJECT, closed.id, ROOT_CAUSE_BUG).await.unwrap();
    service.close(PROJECT, reappeared.id, ROOT_CAUSE_BUG).await.unwrap();
    let mut stored = store
        .find_problem(PROJECT, reappeared.id)
        .await
        .unwrap()
        .unwrap();
    stored.closing_date_time = Some(at(1, 12));
    store.save_problem(&stored).await.unwrap();

    let search = |status: ProblemStatusFilter| {
        let service = service.clone();
        async move {
            let filter = ProblemFilter {
                status: Some(status),
                ..Default::default()
            };
            let found = service.find_matching_problems(PROJECT, &filter).await.unwrap();
            ids(&found, |p| p.problem.id)
        }
    };

    assert_eq!(search(ProblemStatusFilter::Open).await, vec![open.id]);
    assert_eq!(search(ProblemStatusFilter::Closed).await, vec![closed.id]);
    assert_eq!(search(ProblemStatusFilter::Reappeared).await, vec![reappeared.id]);
    assert_eq!(
        search(ProblemStatusFilter::OpenOrReappeared).await,
        vec![reappeared.id, open.id]
    );
}

#[tokio::test]
async fn test_property_filters() {
    let store = seeded_store();
    let service = service(&store);
    let first = create(&service, "Login page is slow", step("Step 1")).await;
    let mut second = new_problem("Checkout fails", vec![step("Step 2")]);
    second.blamed_team_id = Some(TEAM_QA);
    second.defect_id = Some("JIRA-12".to_string());
    second.root_cause_id = Some(ROOT_CAUSE_ENV);
    let second = service.create(PROJECT, second).await.unwrap();

    let search = |filter: ProblemFilter| {
        let service = service.clone();
        async move {
            let found = service.find_matching_problems(PROJECT, &filter).await.unwrap();
            ids(&found, |p| p.problem.id)
        }
    };

    // Most recently created first
    assert_eq!(
        search(ProblemFilter::default()).await,
        vec![second.id, first.id]
    );
    assert_eq!(
        search(ProblemFilter {
            name: Some("LOGIN".to_string()),
            ..Default::default()
        })
        .await,
        vec![first.id]
    );
    assert_eq!(
        search(ProblemFilter {
            defect_id: Some("none".to_string()),
            ..Default::default()
        })
        .await,
        vec![first.id]
    );
    assert_eq!(
        search(ProblemFilter {
            defect_id: Some("jira".to_string()),
            ..Default::default()
        })
        .await,
        vec![second.id]
    );
    assert_eq!(
        search(ProblemFilter {
            blamed_team_id: Some(TEAM_QA),
            root_cause_id: Some(ROOT_CAUSE_ENV),
            ..Default::default()
        })
        .await,
        vec![second.id]
    );
}

#[tokio::test]
async fn test_search_results_carry_aggregates() {
    let store = seeded_store();
    let service = service(&store);
    create(&service, "Exception 2", exception("Exc%2")).await;

    let found = service
        .find_matching_problems(PROJECT, &ProblemFilter::default())
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].aggregate.error_count, 4);
    assert_eq!(timelines(&found[0]), vec!["--EO", "---O", "---E"]);
}
