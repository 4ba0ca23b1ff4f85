//! Pattern matching and classification of the seeded errors.

use problem_engine::error::entities;
use problem_engine::models::PatternCriteria;

use super::fixtures::*;

async fn preview(criteria: PatternCriteria) -> Vec<i64> {
    let store = seeded_store();
    let errors = service(&store).preview_matches(PROJECT, &criteria).await.unwrap();
    ids(&errors, |e| e.id())
}

#[tokio::test]
async fn test_wildcard_pattern_matches_every_error_of_the_project() {
    assert_eq!(
        preview(PatternCriteria::default()).await,
        vec![1, 2, 3, 4, 5, 6, 7, 8]
    );
}

#[tokio::test]
async fn test_step_is_exact_and_case_sensitive() {
    assert_eq!(preview(step("Step 2")).await, vec![2, 3, 4]);
    assert!(preview(step("Step")).await.is_empty());
    assert!(preview(step("step 2")).await.is_empty());
}

#[tokio::test]
async fn test_step_starts_with() {
    let mut criteria = step("Step 2");
    criteria.step_starts_with = true;

    assert_eq!(preview(criteria).await, vec![2, 3, 4, 8]);
}

#[tokio::test]
async fn test_criteria_narrow_the_match() {
    let broad = exception("Exc%2");
    assert_eq!(preview(broad.clone()).await, vec![2, 3, 5, 6]);

    let mut narrower = broad.with_scenario_name("Scenario d");
    narrower.scenario_name_starts_with = true;
    assert_eq!(preview(narrower.clone()).await, vec![5, 6]);

    let narrowest = narrower.with_step_definition("^Step 8$");
    assert_eq!(preview(narrowest).await, vec![6]);
}

#[tokio::test]
async fn test_percent_is_the_only_wildcard() {
    assert_eq!(
        preview(exception("E%7")).await,
        preview(exception("Exception 7")).await
    );
    assert_eq!(preview(exception("Exc_2")).await, vec![5]);
    assert!(preview(exception("Exception_2")).await.is_empty());
}

#[tokio::test]
async fn test_missing_exception_never_matches_an_exception_criterion() {
    let matched = preview(exception("%")).await;

    assert!(!matched.contains(&7));
    assert_eq!(matched.len(), 7);
}

#[tokio::test]
async fn test_browser_flag_partitions_errors() {
    let browser = preview(PatternCriteria::default().with_type_is_browser(true)).await;
    let not_browser = preview(PatternCriteria::default().with_type_is_browser(false)).await;

    assert_eq!(browser, vec![3, 4, 5, 6, 7, 8]);
    assert_eq!(not_browser, vec![1, 2]);
}

#[tokio::test]
async fn test_run_and_execution_criteria() {
    assert_eq!(
        preview(PatternCriteria::default().with_type_is_mobile(true)).await,
        vec![4, 7, 8]
    );
    assert_eq!(preview(PatternCriteria::default().with_country("be")).await, vec![3]);
    assert_eq!(
        preview(PatternCriteria::default().with_type("firefox")).await,
        vec![3, 5, 6]
    );
    assert_eq!(
        preview(PatternCriteria::default().with_release("1.1")).await,
        vec![4, 7, 8]
    );
    assert_eq!(
        preview(PatternCriteria::default().with_platform("prod")).await,
        vec![4, 7, 8]
    );
    assert_eq!(
        preview(PatternCriteria::default().with_feature_file("b.feature")).await,
        vec![4, 5, 6]
    );
    assert_eq!(
        preview(PatternCriteria::default().with_feature_name("Feature B")).await,
        vec![4, 5, 6]
    );
}

#[tokio::test]
async fn test_classify_errors_lists_every_requested_error() {
    let store = seeded_store();
    let service = service(&store);
    let by_step = create(&service, "Step 2 fails", step("Step 2")).await;
    let by_exception = create(&service, "Exception 2", exception("Exc%2")).await;

    let classified = service
        .classify_errors(PROJECT, &[1, 2, 3, 4, 5, 9, 99])
        .await
        .unwrap();

    let both = {
        let mut both = vec![by_step.id, by_exception.id];
        both.sort();
        both
    };
    assert_eq!(classified.len(), 7);
    assert_eq!(classified[&1], Vec::<i64>::new());
    assert_eq!(classified[&2], both);
    assert_eq!(classified[&3], both);
    assert_eq!(classified[&4], vec![by_step.id]);
    assert_eq!(classified[&5], vec![by_exception.id]);
    // Error 9 belongs to another project
    assert!(classified[&9].is_empty());
    assert!(classified[&99].is_empty());
}

#[tokio::test]
async fn test_problem_errors_are_deduplicated_across_patterns() {
    let store = seeded_store();
    let service = service(&store);
    let problem = service
        .create(
            PROJECT,
            new_problem("Step 2 or Exception 2", vec![step("Step 2"), exception("Exc%2")]),
        )
        .await
        .unwrap();

    let errors = service.problem_errors(PROJECT, problem.id).await.unwrap();
    assert_eq!(ids(&errors, |e| e.id()), vec![2, 3, 4, 5, 6]);

    let exception_pattern = problem.patterns[1].id;
    let errors = service
        .pattern_errors(PROJECT, exception_pattern)
        .await
        .unwrap();
    assert_eq!(ids(&errors, |e| e.id()), vec![2, 3, 5, 6]);
}

#[tokio::test]
async fn test_count_problems_of_execution() {
    let store = seeded_store();
    let service = service(&store);
    create(&service, "Step 2 fails", step("Step 2")).await;
    create(&service, "Exception 2", exception("Exc%2")).await;

    assert_eq!(service.count_problems_of_execution(PROJECT, 1).await.unwrap(), 2);
    assert_eq!(service.count_problems_of_execution(PROJECT, 3).await.unwrap(), 1);
    assert_eq!(service.count_problems_of_execution(PROJECT, 4).await.unwrap(), 0);

    // Execution 5 belongs to another project
    let err = service
        .count_problems_of_execution(PROJECT, 5)
        .await
        .unwrap_err();
    assert_not_found(&err, entities::EXECUTION);
}
