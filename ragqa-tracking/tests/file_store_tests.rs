use std::path::Path;
use std::sync::Arc;

use ragqa_tracking::{
    ExperimentTracker, FileTrackingStore, RunInfo, RunStatus, TrackingError, TrackingStore,
};
use tempfile::TempDir;

const EXPERIMENT: &str = "rag-qa-pipeline";

fn tracker(root: &Path) -> ExperimentTracker {
    ExperimentTracker::new(Arc::new(FileTrackingStore::new(root)), EXPERIMENT)
}

fn read_meta(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn run_records_params_artifact_and_status() {
    let dir = TempDir::new().unwrap();
    let run = tracker(dir.path()).start_run().await.unwrap();
    let run_dir = dir.path().join(&run.info().experiment_id).join(run.run_id());

    run.log_params([
        ("chunk_size", "500".to_string()),
        ("retrieval_k", "5".to_string()),
        ("embedding_model", "all-MiniLM-L6-v2".to_string()),
        ("llm", "gpt-3.5-turbo".to_string()),
        ("query", "What is the invoice total?".to_string()),
    ])
    .await
    .unwrap();
    run.log_text("The invoice total is $450.", "output_answer.txt").await.unwrap();
    let finished: RunInfo = run.finish().await.unwrap();

    let params = run_dir.join("params");
    assert_eq!(std::fs::read_to_string(params.join("chunk_size")).unwrap(), "500");
    assert_eq!(std::fs::read_to_string(params.join("retrieval_k")).unwrap(), "5");
    assert_eq!(
        std::fs::read_to_string(params.join("query")).unwrap(),
        "What is the invoice total?"
    );
    assert_eq!(std::fs::read_dir(&params).unwrap().count(), 5);
    assert_eq!(
        std::fs::read_to_string(run_dir.join("artifacts/output_answer.txt")).unwrap(),
        "The invoice total is $450."
    );

    assert_eq!(finished.status, RunStatus::Finished);
    let end_time = finished.end_time.unwrap();
    assert!(end_time >= finished.start_time);

    let meta = read_meta(&run_dir.join("meta.json"));
    assert_eq!(meta["status"], "FINISHED");
    assert_eq!(meta["end_time"], end_time);
}

#[tokio::test]
async fn experiment_is_created_once_and_reused() {
    let dir = TempDir::new().unwrap();

    let first = tracker(dir.path()).start_run().await.unwrap();
    let second = tracker(dir.path()).start_run().await.unwrap();

    assert_eq!(first.info().experiment_id, second.info().experiment_id);
    assert_ne!(first.run_id(), second.run_id());

    let meta = read_meta(&dir.path().join(&first.info().experiment_id).join("meta.json"));
    assert_eq!(meta["name"], EXPERIMENT);
}

#[tokio::test]
async fn experiments_get_distinct_ids() {
    let dir = TempDir::new().unwrap();
    let store = FileTrackingStore::new(dir.path());

    let a = store.create_experiment("a").await.unwrap();
    let b = store.create_experiment("b").await.unwrap();

    assert_ne!(a, b);
    assert_eq!(store.get_experiment_by_name("b").await.unwrap().unwrap().experiment_id, b);
    assert!(store.get_experiment_by_name("missing").await.unwrap().is_none());
    assert!(matches!(store.create_experiment("a").await, Err(TrackingError::InvalidParam(_))));
}

#[tokio::test]
async fn invalid_params_are_rejected_before_writing() {
    let dir = TempDir::new().unwrap();
    let run = tracker(dir.path()).start_run().await.unwrap();

    let bad_key = run.log_param("query?", "x").await;
    let long_value = run.log_param("query", "q".repeat(6001)).await;

    assert!(matches!(bad_key, Err(TrackingError::InvalidParam(_))));
    assert!(matches!(long_value, Err(TrackingError::InvalidParam(_))));
    let params = dir.path().join(&run.info().experiment_id).join(run.run_id()).join("params");
    assert_eq!(std::fs::read_dir(params).unwrap().count(), 0);
}

#[tokio::test]
async fn params_cannot_change_value() {
    let dir = TempDir::new().unwrap();
    let run = tracker(dir.path()).start_run().await.unwrap();

    run.log_param("chunk_size", 500).await.unwrap();
    run.log_param("chunk_size", 500).await.unwrap();

    assert!(matches!(
        run.log_param("chunk_size", 1000).await,
        Err(TrackingError::InvalidParam(_))
    ));
}

#[tokio::test]
async fn unknown_experiment_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = FileTrackingStore::new(dir.path());

    assert!(matches!(store.create_run("42", "r", 0).await, Err(TrackingError::NotFound(_))));
}

#[tokio::test]
async fn unfinished_run_stays_running() {
    let dir = TempDir::new().unwrap();
    let run = tracker(dir.path()).start_run().await.unwrap();
    run.log_param("chunk_size", 500).await.unwrap();
    let run_dir = dir.path().join(&run.info().experiment_id).join(run.run_id());
    drop(run);

    let meta = read_meta(&run_dir.join("meta.json"));
    assert_eq!(meta["status"], "RUNNING");
    assert!(meta.get("end_time").is_none());
}
