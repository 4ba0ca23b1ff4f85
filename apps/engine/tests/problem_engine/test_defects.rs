//! Problems linked to defects of a tracker.

use std::sync::Arc;

use problem_engine::db::ProblemRepository;
use problem_engine::error::{AppResult, entities};
use problem_engine::models::{DefectExistence, Problem, ProblemProperties, ProblemStatus};
use problem_engine::services::{DefectSynchronizer, ProblemService};

use super::fixtures::*;

async fn create_with_defect(
    service: &ProblemService,
    name: &str,
    defect_id: &str,
) -> AppResult<Problem> {
    let mut new = new_problem(name, vec![step(name)]);
    new.defect_id = Some(defect_id.to_string());
    service.create(PROJECT, new).await
}

#[tokio::test]
async fn test_create_with_closed_defect() {
    let store = seeded_store();
    let tracker = ScriptedTracker::new();
    tracker.close("BUG-1", at(3, 9));
    let service = tracked_service(&store, &tracker);

    let problem = create_with_defect(&service, "Step 2", "BUG-1").await.unwrap();

    assert_eq!(problem.status, ProblemStatus::Closed);
    assert_eq!(problem.defect_existence, Some(DefectExistence::Exists));
    assert_eq!(problem.closing_date_time, Some(at(3, 9)));
    assert_eq!(
        problem.defect_url.as_deref(),
        Some("https://tracker.example.com/browse/BUG-1")
    );
}

#[tokio::test]
async fn test_create_with_open_absent_or_unreachable_defect() {
    let store = seeded_store();
    let tracker = ScriptedTracker::new();
    tracker.open("BUG-2");
    let service = tracked_service(&store, &tracker);

    let open = create_with_defect(&service, "Step 1", "BUG-2").await.unwrap();
    assert_eq!(open.status, ProblemStatus::Open);
    assert_eq!(open.defect_existence, Some(DefectExistence::Exists));

    let absent = create_with_defect(&service, "Step 2", "BUG-404").await.unwrap();
    assert_eq!(absent.status, ProblemStatus::Open);
    assert_eq!(absent.defect_existence, Some(DefectExistence::Nonexistent));

    tracker.set_unreachable(true);
    let unknown = create_with_defect(&service, "Step 3", "BUG-3").await.unwrap();
    assert_eq!(unknown.status, ProblemStatus::Open);
    assert_eq!(unknown.defect_existence, Some(DefectExistence::Unknown));
    assert!(unknown.closing_date_time.is_none());
}

#[tokio::test]
async fn test_defect_is_checked_after_other_rules() {
    let store = seeded_store();
    let tracker = ScriptedTracker::new();
    let service = tracked_service(&store, &tracker);
    create_with_defect(&service, "Step 2", "BUG-1").await.unwrap();
    let calls = tracker.calls();

    let err = create_with_defect(&service, "Step 2", "malformed")
        .await
        .unwrap_err();
    assert_invalid(&err, "not_unique");

    let err = create_with_defect(&service, "Step 3", "malformed")
        .await
        .unwrap_err();
    assert_invalid(&err, "wrong_defect_id_format");
    assert_eq!(tracker.calls(), calls);
}

#[tokio::test]
async fn test_defect_is_unique_in_project() {
    let store = seeded_store();
    let tracker = ScriptedTracker::new();
    let service = tracked_service(&store, &tracker);
    let first = create_with_defect(&service, "Step 2", "BUG-1").await.unwrap();

    let err = create_with_defect(&service, "Step 3", "BUG-1")
        .await
        .unwrap_err();

    assert_invalid(&err, "not_unique");
    assert_eq!(err.entity(), Some(entities::PROBLEM));
    assert_eq!(err.other_id(), Some(first.id));
}

#[tokio::test]
async fn test_status_is_managed_by_defect() {
    let store = seeded_store();
    let tracker = ScriptedTracker::new();
    tracker.open("BUG-1");
    let service = tracked_service(&store, &tracker);
    let problem = create_with_defect(&service, "Step 2", "BUG-1").await.unwrap();

    let err = service
        .close(PROJECT, problem.id, ROOT_CAUSE_BUG)
        .await
        .unwrap_err();
    assert_invalid(&err, "problem_status_managed_by_defect");

    let err = service.reopen(PROJECT, problem.id).await.unwrap_err();
    assert_invalid(&err, "problem_status_managed_by_defect");
}

#[tokio::test]
async fn test_defect_without_tracker_is_free_text() {
    let store = seeded_store();
    let service = service(&store);

    let problem = create_with_defect(&service, "Step 2", "any text").await.unwrap();
    assert!(problem.defect_existence.is_none());
    assert!(problem.defect_url.is_none());

    let closed = service
        .close(PROJECT, problem.id, ROOT_CAUSE_BUG)
        .await
        .unwrap();
    assert_eq!(closed.status, ProblemStatus::Closed);

    let err = service
        .refresh_defect_status(PROJECT, problem.id)
        .await
        .unwrap_err();
    assert_invalid(&err, "no_defect_tracking_system");
}

#[tokio::test]
async fn test_change_and_remove_defect() {
    let store = seeded_store();
    let tracker = ScriptedTracker::new();
    tracker.close("BUG-9", at(4, 0));
    let service = tracked_service(&store, &tracker);
    let problem = create(&service, "Step 2 fails", step("Step 2")).await;

    let linked = service
        .update_properties(
            PROJECT,
            problem.id,
            ProblemProperties {
                name: problem.name.clone(),
                defect_id: Some("BUG-9".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(linked.status, ProblemStatus::Closed);
    assert_eq!(linked.defect_existence, Some(DefectExistence::Exists));

    let unlinked = service
        .update_properties(
            PROJECT,
            problem.id,
            ProblemProperties {
                name: problem.name.clone(),
                root_cause_id: Some(ROOT_CAUSE_BUG),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(unlinked.defect_id.is_none());
    assert!(unlinked.defect_existence.is_none());
    assert!(unlinked.defect_url.is_none());
    assert_eq!(unlinked.status, ProblemStatus::Closed);
}

#[tokio::test]
async fn test_refresh_defect_status() {
    let store = seeded_store();
    let tracker = ScriptedTracker::new();
    tracker.open("BUG-1");
    let service = tracked_service(&store, &tracker);
    let problem = create_with_defect(&service, "Step 2", "BUG-1").await.unwrap();
    let untracked = create(&service, "Step 3 fails", step("Step 3")).await;

    tracker.close("BUG-1", at(5, 8));
    let refreshed = service
        .refresh_defect_status(PROJECT, problem.id)
        .await
        .unwrap();
    assert_eq!(refreshed.status, ProblemStatus::Closed);
    assert_eq!(refreshed.closing_date_time, Some(at(5, 8)));

    tracker.forget("BUG-1");
    let refreshed = service
        .refresh_defect_status(PROJECT, problem.id)
        .await
        .unwrap();
    assert_eq!(refreshed.status, ProblemStatus::Open);
    assert_eq!(refreshed.defect_existence, Some(DefectExistence::Nonexistent));

    let calls = tracker.calls();
    let unchanged = service
        .refresh_defect_status(PROJECT, untracked.id)
        .await
        .unwrap();
    assert_eq!(unchanged.status, ProblemStatus::Open);
    assert_eq!(tracker.calls(), calls);

    tracker.set_unreachable(true);
    let err = service
        .refresh_defect_status(PROJECT, problem.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "GATEWAY_FAILURE");

    let err = service
        .refresh_defect_status(PROJECT, 999)
        .await
        .unwrap_err();
    assert_not_found(&err, entities::PROBLEM);
}

#[tokio::test]
async fn test_synchronizer_saves_only_changed_problems() {
    let store = seeded_store();
    let tracker = ScriptedTracker::new();
    tracker.open("BUG-1");
    tracker.open("BUG-2");
    let service = tracked_service(&store, &tracker);
    let first = create_with_defect(&service, "Step 1", "BUG-1").await.unwrap();
    let second = create_with_defect(&service, "Step 2", "BUG-2").await.unwrap();
    create(&service, "Step 3 fails", step("Step 3")).await;

    let synchronizer = DefectSynchronizer::new(Arc::new(store.clone()), tracker.clone());

    assert_eq!(synchronizer.sync_project(PROJECT).await.unwrap(), 0);

    tracker.close("BUG-1", at(6, 0));
    assert_eq!(synchronizer.sync_project(PROJECT).await.unwrap(), 1);
    let stored = store.find_problem(PROJECT, first.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ProblemStatus::Closed);
    assert_eq!(stored.closing_date_time, Some(at(6, 0)));

    tracker.forget("BUG-2");
    assert_eq!(synchronizer.sync_project(PROJECT).await.unwrap(), 1);
    let stored = store.find_problem(PROJECT, second.id).await.unwrap().unwrap();
    assert_eq!(stored.defect_existence, Some(DefectExistence::Nonexistent));

    tracker.set_unreachable(true);
    assert!(synchronizer.sync_project(PROJECT).await.is_err());
    let stored = store.find_problem(PROJECT, first.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ProblemStatus::Closed);
}

#[tokio::test]
async fn test_synchronizer_ignores_projects_without_defects() {
    let store = seeded_store();
    let tracker = ScriptedTracker::new();
    let service = tracked_service(&store, &tracker);
    create(&service, "Step 2 fails", step("Step 2")).await;

    let synchronizer = DefectSynchronizer::new(Arc::new(store.clone()), tracker.clone());

    assert_eq!(synchronizer.sync_project(PROJECT).await.unwrap(), 0);
    assert_eq!(tracker.calls(), 0);
}
