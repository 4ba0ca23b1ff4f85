//! Problem creation, edition, closing and deletion.

use problem_engine::db::ProblemRepository;
use problem_engine::error::entities;
use problem_engine::models::{PatternCriteria, ProblemProperties, ProblemStatus};

use super::fixtures::*;

fn properties(name: &str) -> ProblemProperties {
    ProblemProperties {
        name: name.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_trims_and_normalizes() {
    let store = seeded_store();
    let service = service(&store);
    let mut criteria = step("Step 2");
    criteria.feature_file = Some(String::new());
    criteria.scenario_name_starts_with = true;

    let mut new = new_problem("  Step 2 fails  ", vec![criteria]);
    new.comment = Some("   ".to_string());
    let problem = service.create(PROJECT, new).await.unwrap();

    assert_eq!(problem.name, "Step 2 fails");
    assert!(problem.comment.is_none());
    assert_eq!(problem.status, ProblemStatus::Open);
    assert!(problem.closing_date_time.is_none());
    assert!(problem.defect_url.is_none());
    assert_eq!(problem.patterns.len(), 1);
    assert_eq!(problem.patterns[0].problem_id, problem.id);
    assert_eq!(problem.patterns[0].criteria, step("Step 2"));

    let reloaded = service.find_one(PROJECT, problem.id).await.unwrap();
    assert_eq!(reloaded.patterns, problem.patterns);
}

#[tokio::test]
async fn test_create_requires_name_and_patterns() {
    let store = seeded_store();
    let service = service(&store);

    let err = service
        .create(PROJECT, new_problem("   ", vec![step("Step 2")]))
        .await
        .unwrap_err();
    assert_invalid(&err, "name_mandatory");

    let err = service
        .create(PROJECT, new_problem("No pattern", vec![]))
        .await
        .unwrap_err();
    assert_invalid(&err, "patterns_mandatory");

    assert!(store.list_problems(PROJECT).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_duplicate_name() {
    let store = seeded_store();
    let service = service(&store);
    let existing = create(&service, "Step 2 fails", step("Step 2")).await;

    let err = service
        .create(PROJECT, new_problem("Step 2 fails", vec![step("Step 3")]))
        .await
        .unwrap_err();

    assert_invalid(&err, "not_unique");
    assert_eq!(err.entity(), Some(entities::PROBLEM));
    assert_eq!(err.other_id(), Some(existing.id));
    assert_eq!(store.list_problems(PROJECT).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_same_name_in_another_project() {
    let store = seeded_store();
    let service = service(&store);
    create(&service, "Step 2 fails", step("Step 2")).await;

    let other = service
        .create(OTHER_PROJECT, new_problem("Step 2 fails", vec![step("Step 2")]))
        .await
        .unwrap();

    assert_eq!(other.project_id, OTHER_PROJECT);
    let err = service.find_one(PROJECT, other.id).await.unwrap_err();
    assert_not_found(&err, entities::PROBLEM);
}

#[tokio::test]
async fn test_create_validates_references() {
    let store = seeded_store();
    let service = service(&store);

    let mut new = new_problem("Blamed", vec![step("Step 2")]);
    new.blamed_team_id = Some(TEAM_UNASSIGNABLE);
    let err = service.create(PROJECT, new.clone()).await.unwrap_err();
    assert_invalid(&err, "not_assignable_team");
    assert_eq!(err.entity(), Some(entities::TEAM));

    new.blamed_team_id = Some(99);
    let err = service.create(PROJECT, new.clone()).await.unwrap_err();
    assert_not_found(&err, entities::TEAM);

    new.blamed_team_id = Some(TEAM_QA);
    new.root_cause_id = Some(99);
    let err = service.create(PROJECT, new.clone()).await.unwrap_err();
    assert_not_found(&err, entities::ROOT_CAUSE);

    new.root_cause_id = Some(ROOT_CAUSE_BUG);
    let created = service.create(PROJECT, new).await.unwrap();
    assert_eq!(created.blamed_team_id, Some(TEAM_QA));
    assert_eq!(created.root_cause_id, Some(ROOT_CAUSE_BUG));
}

#[tokio::test]
async fn test_create_validates_pattern_references() {
    let store = seeded_store();
    let service = service(&store);

    let err = service
        .create(
            PROJECT,
            new_problem("Country", vec![PatternCriteria::default().with_country("zz")]),
        )
        .await
        .unwrap_err();
    assert_not_found(&err, entities::COUNTRY);

    let err = service
        .create(
            PROJECT,
            new_problem("Type", vec![PatternCriteria::default().with_type("desktop")]),
        )
        .await
        .unwrap_err();
    assert_not_found(&err, entities::TYPE);

    let created = service
        .create(
            PROJECT,
            new_problem(
                "Known",
                vec![PatternCriteria::default().with_country("fr").with_type("api")],
            ),
        )
        .await
        .unwrap();
    assert_eq!(created.patterns.len(), 1);
}

#[tokio::test]
async fn test_create_rejects_duplicate_patterns() {
    let store = seeded_store();
    let service = service(&store);
    let mut same = step("Step 2");
    same.exception = Some(String::new());

    let err = service
        .create(PROJECT, new_problem("Twice", vec![step("Step 2"), same]))
        .await
        .unwrap_err();

    assert_invalid(&err, "not_unique");
    assert_eq!(err.entity(), Some(entities::PROBLEM_PATTERN));
}

#[tokio::test]
async fn test_update_properties() {
    let store = seeded_store();
    let service = service(&store);
    let problem = create(&service, "Step 2 fails", step("Step 2")).await;
    let other = create(&service, "Step 3 fails", step("Step 3")).await;

    let updated = service
        .update_properties(
            PROJECT,
            problem.id,
            ProblemProperties {
                name: " Step 2 is broken ".to_string(),
                comment: Some("Seen on every run".to_string()),
                blamed_team_id: Some(TEAM_QA),
                defect_id: None,
                root_cause_id: Some(ROOT_CAUSE_ENV),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Step 2 is broken");
    assert_eq!(updated.comment.as_deref(), Some("Seen on every run"));
    assert_eq!(updated.patterns.len(), 1);

    // Keeping its own name is allowed
    service
        .update_properties(PROJECT, problem.id, properties("Step 2 is broken"))
        .await
        .unwrap();

    let err = service
        .update_properties(PROJECT, problem.id, properties("Step 3 fails"))
        .await
        .unwrap_err();
    assert_invalid(&err, "not_unique");
    assert_eq!(err.other_id(), Some(other.id));

    let err = service
        .update_properties(PROJECT, 999, properties("Anything"))
        .await
        .unwrap_err();
    assert_not_found(&err, entities::PROBLEM);
}

#[tokio::test]
async fn test_close_and_reopen() {
    let store = seeded_store();
    let service = service(&store);
    let problem = create(&service, "Step 2 fails", step("Step 2")).await;

    let err = service.close(PROJECT, problem.id, 99).await.unwrap_err();
    assert_not_found(&err, entities::ROOT_CAUSE);

    let closed = service
        .close(PROJECT, problem.id, ROOT_CAUSE_BUG)
        .await
        .unwrap();
    assert_eq!(closed.status, ProblemStatus::Closed);
    assert!(closed.closing_date_time.is_some());
    assert_eq!(closed.root_cause_id, Some(ROOT_CAUSE_BUG));

    let reopened = service.reopen(PROJECT, problem.id).await.unwrap();
    assert_eq!(reopened.status, ProblemStatus::Open);
    assert!(reopened.closing_date_time.is_none());
    assert_eq!(reopened.root_cause_id, Some(ROOT_CAUSE_BUG));

    let err = service.close(PROJECT, 999, ROOT_CAUSE_BUG).await.unwrap_err();
    assert_not_found(&err, entities::PROBLEM);
}

#[tokio::test]
async fn test_closed_problem_keeps_its_root_cause() {
    let store = seeded_store();
    let service = service(&store);
    let problem = create(&service, "Step 2 fails", step("Step 2")).await;
    service
        .close(PROJECT, problem.id, ROOT_CAUSE_BUG)
        .await
        .unwrap();

    let err = service
        .update_properties(PROJECT, problem.id, properties("Step 2 fails"))
        .await
        .unwrap_err();
    assert_invalid(&err, "root_cause_mandatory_for_closed_problems");

    let updated = service
        .update_properties(
            PROJECT,
            problem.id,
            ProblemProperties {
                root_cause_id: Some(ROOT_CAUSE_ENV),
                ..properties("Step 2 fails")
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, ProblemStatus::Closed);
    assert_eq!(updated.root_cause_id, Some(ROOT_CAUSE_ENV));
}

#[tokio::test]
async fn test_delete() {
    let store = seeded_store();
    let service = service(&store);
    let problem = create(&service, "Step 2 fails", step("Step 2")).await;

    service.delete(PROJECT, problem.id).await.unwrap();

    let err = service.find_one(PROJECT, problem.id).await.unwrap_err();
    assert_not_found(&err, entities::PROBLEM);
    let err = service.delete(PROJECT, problem.id).await.unwrap_err();
    assert_not_found(&err, entities::PROBLEM);
    let errors = service.preview_matches(PROJECT, &step("Step 2")).await.unwrap();
    assert_eq!(errors.len(), 3);
}
