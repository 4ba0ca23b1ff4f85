//! Appending, moving, editing and deleting patterns.

use problem_engine::error::entities;

use super::fixtures::*;

#[tokio::test]
async fn test_append_pattern() {
    let store = seeded_store();
    let service = service(&store);
    let problem = create(&service, "Step 2 fails", step("Step 2")).await;

    let pattern = service
        .append_pattern(PROJECT, problem.id, exception("Exc%2"))
        .await
        .unwrap();
    assert_eq!(pattern.problem_id, problem.id);

    let errors = service.problem_errors(PROJECT, problem.id).await.unwrap();
    assert_eq!(ids(&errors, |e| e.id()), vec![2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn test_append_duplicate_pattern_names_the_existing_one() {
    let store = seeded_store();
    let service = service(&store);
    let problem = create(&service, "Step 2 fails", step("Step 2")).await;
    let mut same = step("Step 2");
    same.platform = Some(String::new());

    let err = service
        .append_pattern(PROJECT, problem.id, same)
        .await
        .unwrap_err();

    assert_invalid(&err, "not_unique");
    assert_eq!(err.entity(), Some(entities::PROBLEM_PATTERN));
    assert_eq!(err.other_id(), Some(problem.patterns[0].id));
}

#[tokio::test]
async fn test_starts_with_flag_makes_a_different_pattern() {
    let store = seeded_store();
    let service = service(&store);
    let problem = create(&service, "Step 2 fails", step("Step 2")).await;
    let mut prefix = step("Step 2");
    prefix.step_starts_with = true;

    service
        .append_pattern(PROJECT, problem.id, prefix)
        .await
        .unwrap();

    let reloaded = service.find_one(PROJECT, problem.id).await.unwrap();
    assert_eq!(reloaded.patterns.len(), 2);
}

#[tokio::test]
async fn test_append_to_unknown_problem() {
    let store = seeded_store();
    let service = service(&store);

    let err = service
        .append_pattern(PROJECT, 999, step("Step 2"))
        .await
        .unwrap_err();

    assert_not_found(&err, entities::PROBLEM);
}

#[tokio::test]
async fn test_pick_up_last_pattern_deletes_source() {
    let store = seeded_store();
    let service = service(&store);
    let source = create(&service, "Step 2 fails", step("Step 2")).await;
    let destination = create(&service, "Exception 2", exception("Exc%2")).await;

    let result = service
        .pick_up_pattern(PROJECT, destination.id, source.patterns[0].id)
        .await
        .unwrap();

    assert_eq!(result.destination_problem.id, destination.id);
    assert_eq!(result.destination_problem.patterns.len(), 2);
    let deleted = result.deleted_problem.unwrap();
    assert_eq!(deleted.id, source.id);
    assert!(deleted.patterns.is_empty());

    let err = service.find_one(PROJECT, source.id).await.unwrap_err();
    assert_not_found(&err, entities::PROBLEM);
    let errors = service.problem_errors(PROJECT, destination.id).await.unwrap();
    assert_eq!(ids(&errors, |e| e.id()), vec![2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn test_pick_up_keeps_source_with_remaining_patterns() {
    let store = seeded_store();
    let service = service(&store);
    let source = service
        .create(
            PROJECT,
            new_problem("Two patterns", vec![step("Step 2"), step("Step 3")]),
        )
        .await
        .unwrap();
    let destination = create(&service, "Exception 2", exception("Exc%2")).await;

    let result = service
        .pick_up_pattern(PROJECT, destination.id, source.patterns[1].id)
        .await
        .unwrap();

    assert!(result.deleted_problem.is_none());
    let source = service.find_one(PROJECT, source.id).await.unwrap();
    assert_eq!(source.patterns.len(), 1);
    assert_eq!(source.patterns[0].criteria, step("Step 2"));
}

#[tokio::test]
async fn test_pick_up_refusals() {
    let store = seeded_store();
    let service = service(&store);
    let source = create(&service, "Step 2 fails", step("Step 2")).await;
    let destination = service
        .create(
            PROJECT,
            new_problem("Also step 2", vec![step("Step 2"), exception("Exc%2")]),
        )
        .await
        .unwrap();

    let err = service
        .pick_up_pattern(PROJECT, source.id, source.patterns[0].id)
        .await
        .unwrap_err();
    assert_invalid(&err, "source_is_destination");

    let err = service
        .pick_up_pattern(PROJECT, destination.id, source.patterns[0].id)
        .await
        .unwrap_err();
    assert_invalid(&err, "not_unique");
    assert_eq!(err.other_id(), Some(destination.patterns[0].id));

    let err = service
        .pick_up_pattern(PROJECT, destination.id, 999)
        .await
        .unwrap_err();
    assert_not_found(&err, entities::PROBLEM_PATTERN);

    let err = service
        .pick_up_pattern(PROJECT, 999, source.patterns[0].id)
        .await
        .unwrap_err();
    assert_not_found(&err, entities::PROBLEM);

    // Nothing moved
    let source = service.find_one(PROJECT, source.id).await.unwrap();
    assert_eq!(source.patterns.len(), 1);
}

#[tokio::test]
async fn test_delete_pattern() {
    let store = seeded_store();
    let service = service(&store);
    let problem = service
        .create(
            PROJECT,
            new_problem("Two patterns", vec![step("Step 2"), step("Step 3")]),
        )
        .await
        .unwrap();

    let result = service
        .delete_pattern(PROJECT, problem.patterns[0].id)
        .await
        .unwrap();
    assert!(result.deleted_problem.is_none());

    let result = service
        .delete_pattern(PROJECT, problem.patterns[1].id)
        .await
        .unwrap();
    assert_eq!(result.deleted_problem.map(|p| p.id), Some(problem.id));

    let err = service.find_one(PROJECT, problem.id).await.unwrap_err();
    assert_not_found(&err, entities::PROBLEM);
    let err = service
        .delete_pattern(PROJECT, problem.patterns[1].id)
        .await
        .unwrap_err();
    assert_not_found(&err, entities::PROBLEM_PATTERN);
}

#[tokio::test]
async fn test_update_pattern() {
    let store = seeded_store();
    let service = service(&store);
    let problem = service
        .create(
            PROJECT,
            new_problem("Two patterns", vec![step("Step 2"), step("Step 3")]),
        )
        .await
        .unwrap();
    let first = problem.patterns[0].id;
    let second = problem.patterns[1].id;

    // Same criteria as itself
    service
        .update_pattern(PROJECT, first, step("Step 2"))
        .await
        .unwrap();

    let err = service
        .update_pattern(PROJECT, first, step("Step 3"))
        .await
        .unwrap_err();
    assert_invalid(&err, "not_unique");
    assert_eq!(err.other_id(), Some(second));

    let updated = service
        .update_pattern(PROJECT, first, step("Step 8"))
        .await
        .unwrap();
    assert_eq!(updated.id, first);
    assert_eq!(updated.problem_id, problem.id);

    let errors = service.pattern_errors(PROJECT, first).await.unwrap();
    assert_eq!(ids(&errors, |e| e.id()), vec![6]);
}
