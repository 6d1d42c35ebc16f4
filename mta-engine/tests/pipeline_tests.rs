//! Pipeline integration tests
//!
//! Drive [`Pipeline::process`] against a temporary state folder with fake
//! collaborators.

mod helpers;

use chrono::{Duration as ChronoDuration, Utc};
use helpers::*;
use mta_engine::models::{Department, Fingerprint, ProcessingRecord, TrackerOutcome};
use mta_engine::services::PipelineFailure;
use tempfile::TempDir;

#[tokio::test]
async fn reference_meeting_is_processed_once() {
    // Given: an empty state folder
    let dir = TempDir::new().unwrap();
    let categorizer = FakeCategorizer::reference();
    let tracker = FakeTracker::new();
    let pipeline = pipeline(&dir, categorizer.clone(), tracker.clone());
    let req = request(MEETING, &reference_items());

    // When: the request is delivered
    let first = pipeline.process(&req).await.unwrap();

    // Then: all four items are new and created
    assert_eq!(first.total_items, 4);
    assert_eq!(first.new_items, 4);
    assert!(first.skipped_items.is_empty());
    assert_eq!(first.tracker_results.len(), 4);
    assert!(first.tracker_results.iter().all(TrackerOutcome::is_success));
    let departments: Vec<Department> = first.categorized_items.iter().map(|c| c.department).collect();
    assert_eq!(
        departments,
        vec![
            Department::Production,
            Department::Design,
            Department::Procurement,
            Department::Production
        ]
    );

    // When: the identical request is delivered again
    let second = pipeline.process(&req).await.unwrap();

    // Then: everything is skipped and no collaborator is called
    assert_eq!(second.new_items, 0);
    assert_eq!(second.skipped_items.len(), 4);
    assert!(second.skipped_items.iter().all(|s| s.reason == "Already processed"));
    assert!(second.tracker_results.is_empty());
    assert_eq!(categorizer.call_count(), 1);
    assert_eq!(tracker.call_count(), 1);
    assert_eq!(tracker.created().len(), 4);
}

#[tokio::test]
async fn records_carry_request_details() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&dir, FakeCategorizer::reference(), FakeTracker::new());

    pipeline.process(&request(MEETING, &["Label design"])).await.unwrap();

    let record = pipeline
        .store()
        .get(&Fingerprint::of("Label design"))
        .await
        .unwrap()
        .expect("record committed");
    assert_eq!(record.task, "Label design");
    assert_eq!(record.department, Department::Design);
    assert_eq!(record.meeting_name, MEETING);
    assert_eq!(record.external_task_id.as_deref(), Some("task-1"));
}

#[tokio::test]
async fn dedup_ignores_meeting_name_and_sanitization() {
    let dir = TempDir::new().unwrap();
    let tracker = FakeTracker::new();
    let pipeline = pipeline(&dir, FakeCategorizer::reference(), tracker.clone());

    pipeline.process(&request("Monday sync", &["Label design"])).await.unwrap();
    let again = pipeline
        .process(&request("Friday review", &["  <Label design>  "]))
        .await
        .unwrap();

    assert_eq!(again.new_items, 0);
    assert_eq!(again.skipped_items[0].task, "Label design");
    assert_eq!(tracker.created(), vec!["Label design"]);
}

#[tokio::test]
async fn tracker_failure_is_isolated_to_its_item() {
    // Given: a tracker that fails only the second item
    let dir = TempDir::new().unwrap();
    let items = ["Nutrition formulation", "Label design", "Commercial costing"];
    let pipeline = pipeline(&dir, FakeCategorizer::reference(), FakeTracker::failing_on(&["Label design"]));

    // When
    let summary = pipeline.process(&request(MEETING, &items)).await.unwrap();

    // Then: items 1 and 3 are recorded with ids, item 2 is reported failed and unrecorded
    assert!(summary.tracker_results[0].is_success());
    assert!(!summary.tracker_results[1].is_success());
    assert!(summary.tracker_results[2].is_success());

    let store = pipeline.store();
    let first = store.get(&Fingerprint::of(items[0])).await.unwrap().unwrap();
    assert!(first.external_task_id.is_some());
    assert!(store.get(&Fingerprint::of(items[1])).await.unwrap().is_none());
    assert!(store.get(&Fingerprint::of(items[2])).await.unwrap().is_some());
}

#[tokio::test]
async fn failed_item_is_retried_on_next_delivery() {
    let dir = TempDir::new().unwrap();
    let items = ["Nutrition formulation", "Label design"];
    pipeline(&dir, FakeCategorizer::reference(), FakeTracker::failing_on(&["Label design"]))
        .process(&request(MEETING, &items))
        .await
        .unwrap();

    let tracker = FakeTracker::new();
    let retry = pipeline(&dir, FakeCategorizer::reference(), tracker.clone())
        .process(&request(MEETING, &items))
        .await
        .unwrap();

    assert_eq!(retry.new_items, 1);
    assert_eq!(retry.skipped_items.len(), 1);
    assert_eq!(tracker.created(), vec!["Label design"]);
}

#[tokio::test]
async fn categorizer_failure_reports_prior_skips() {
    let dir = TempDir::new().unwrap();
    pipeline(&dir, FakeCategorizer::reference(), FakeTracker::new())
        .process(&request(MEETING, &["Label design"]))
        .await
        .unwrap();

    let tracker = FakeTracker::new();
    let err = pipeline(&dir, FakeCategorizer::with_mode(CategorizerMode::Unavailable), tracker.clone())
        .process(&request(MEETING, &["Label design", "Commercial costing"]))
        .await
        .unwrap_err();

    assert!(matches!(err.failure, PipelineFailure::Categorizer(_)));
    assert_eq!(err.total_items, 2);
    assert_eq!(err.skipped_items.len(), 1);
    assert_eq!(err.skipped_items[0].task, "Label design");
    assert_eq!(tracker.call_count(), 0);
}

#[tokio::test]
async fn categorizer_length_mismatch_aborts_batch() {
    let dir = TempDir::new().unwrap();
    let tracker = FakeTracker::new();
    let pipeline = pipeline(&dir, FakeCategorizer::with_mode(CategorizerMode::DropLast), tracker.clone());

    let err = pipeline
        .process(&request(MEETING, &["Label design", "Commercial costing"]))
        .await
        .unwrap_err();

    assert!(matches!(err.failure, PipelineFailure::Categorizer(_)));
    assert_eq!(tracker.call_count(), 0);
    assert!(pipeline.store().load().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_commit_does_not_fail_the_request() {
    // Given: a tracker run after which the state document cannot be written
    let dir = TempDir::new().unwrap();
    let tracker = FakeTracker::breaking_state(&dir);
    let pipeline = pipeline(&dir, FakeCategorizer::reference(), tracker.clone());

    // When: the request is delivered
    let summary = pipeline.process(&request(MEETING, &reference_items())).await.unwrap();

    // Then: every created task is still reported, nothing was recorded
    assert_eq!(summary.message, "Webhook processed successfully");
    assert_eq!(summary.new_items, 4);
    assert_eq!(summary.tracker_results.len(), 4);
    assert!(summary.tracker_results.iter().all(TrackerOutcome::is_success));
    assert_eq!(tracker.created().len(), 4);
    assert!(pipeline.store().load().await.is_err());
}

#[tokio::test]
async fn tracker_outage_commits_nothing() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&dir, FakeCategorizer::reference(), FakeTracker::unavailable());

    let err = pipeline.process(&request(MEETING, &reference_items())).await.unwrap_err();

    assert!(matches!(err.failure, PipelineFailure::Tracker(_)));
    assert!(err.skipped_items.is_empty());
    assert!(pipeline.store().load().await.unwrap().is_empty());
}

#[tokio::test]
async fn identity_mismatch_skips_only_that_item() {
    // Given: a tracker that reports item 1 under another task's text
    let dir = TempDir::new().unwrap();
    let tracker = FakeTracker::renaming("Label design", "Commercial costing");
    let pipeline = pipeline(&dir, FakeCategorizer::reference(), tracker);

    // When
    let summary = pipeline
        .process(&request(MEETING, &["Label design", "Nutrition formulation"]))
        .await
        .unwrap();

    // Then: the mismatched item is neither recorded nor reported as a success
    let store = pipeline.store();
    assert!(store.get(&Fingerprint::of("Label design")).await.unwrap().is_none());
    assert!(store.get(&Fingerprint::of("Commercial costing")).await.unwrap().is_none());
    assert!(store.get(&Fingerprint::of("Nutrition formulation")).await.unwrap().is_some());
    assert_eq!(summary.tracker_results.len(), 1);
    assert_eq!(summary.tracker_results[0].task(), "Nutrition formulation");
    assert_eq!(summary.new_items, 2);
}

#[tokio::test]
async fn unknown_department_falls_back_to_production() {
    let dir = TempDir::new().unwrap();
    let categorizer = FakeCategorizer::with_table(&[("Label design", "Marketing")]);
    let pipeline = pipeline(&dir, categorizer, FakeTracker::new());

    let summary = pipeline.process(&request(MEETING, &["Label design"])).await.unwrap();

    assert_eq!(summary.categorized_items[0].department, Department::Production);
}

#[tokio::test]
async fn expired_record_no_longer_dedups() {
    // Given: a record older than the 30 day TTL
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let mut state = mta_engine::state::StateMap::new();
    state.insert(
        Fingerprint::of("Label design"),
        ProcessingRecord {
            task: "Label design".to_string(),
            department: Department::Design,
            meeting_name: "Old meeting".to_string(),
            external_task_id: Some("old-1".to_string()),
            processed_at: Utc::now() - ChronoDuration::days(31),
        },
    );
    std::fs::write(store.state_path(), serde_json::to_string(&state).unwrap()).unwrap();

    // When
    let tracker = FakeTracker::new();
    let summary = pipeline(&dir, FakeCategorizer::reference(), tracker.clone())
        .process(&request(MEETING, &["Label design"]))
        .await
        .unwrap();

    // Then: the item is treated as new again
    assert_eq!(summary.new_items, 1);
    assert_eq!(tracker.created(), vec!["Label design"]);
}

#[tokio::test]
async fn legacy_state_document_still_dedups() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let doc = serde_json::json!({
        (Fingerprint::of("Label design").to_string()): {
            "task": "Label design",
            "department": "Design",
            "meetingName": "Old meeting",
            "zohoTaskId": "123456",
            "processedAt": Utc::now().to_rfc3339(),
        }
    });
    std::fs::write(store.state_path(), doc.to_string()).unwrap();

    let summary = pipeline(&dir, FakeCategorizer::reference(), FakeTracker::new())
        .process(&request(MEETING, &["Label design"]))
        .await
        .unwrap();

    assert_eq!(summary.new_items, 0);
    let record = store.get(&Fingerprint::of("Label design")).await.unwrap().unwrap();
    assert_eq!(record.external_task_id.as_deref(), Some("123456"));
}

#[tokio::test]
async fn held_lock_surfaces_as_state_failure() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&dir, FakeCategorizer::reference(), FakeTracker::new());
    let _guard = pipeline.store().lock().acquire().await.unwrap();

    let err = pipeline.process(&request(MEETING, &["Label design"])).await.unwrap_err();

    match err.failure {
        PipelineFailure::State(state) => assert!(state.is_lock_timeout()),
        other => panic!("expected lock timeout, got {:?}", other),
    }
}
