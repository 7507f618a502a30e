// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn run() -> Run {
    Run::new("run-1", "ps", 1, Utc::now())
}

fn write(dir: &std::path::Path, name: &str, contents: &str) {
    let run_dir = dir.join("run-1");
    std::fs::create_dir_all(&run_dir).unwrap();
    std::fs::write(run_dir.join(name), contents).unwrap();
}

#[tokio::test]
async fn missing_status_is_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    let results = DirectoryResults::new(dir.path().to_path_buf());
    assert_eq!(
        results.harvest(&run()).await,
        Err(HarvestError::NotReady("run-1".to_string()))
    );
}

#[tokio::test]
async fn successful_status_with_output() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        STATUS_FILE,
        r#"{"rc":0,"hostname":"node07","cpu_time":1.5,"real_time":2.0,
            "started_at":"2026-01-01T00:00:00Z","finished_at":"2026-01-01T00:00:02Z"}"#,
    );
    write(dir.path(), OUTPUT_FILE, r#"{"energy":-0.5}"#);

    let harvest = DirectoryResults::new(dir.path().to_path_buf())
        .harvest(&run())
        .await
        .unwrap();
    assert_eq!(harvest.hostname.as_deref(), Some("node07"));
    assert_eq!(harvest.cpu_time, 1.5);
    assert_eq!(harvest.real_time, 2.0);
    assert!(harvest.finished_at.is_some());
    assert_eq!(harvest.result, serde_json::json!({"energy": -0.5}));
}

#[tokio::test]
async fn output_file_is_optional() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), STATUS_FILE, r#"{"rc":0}"#);

    let harvest = DirectoryResults::new(dir.path().to_path_buf())
        .harvest(&run())
        .await
        .unwrap();
    assert_eq!(harvest.result, serde_json::json!({}));
    assert!(harvest.hostname.is_none());
}

#[tokio::test]
async fn nonzero_rc_fails() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), STATUS_FILE, r#"{"rc":3}"#);

    let err = DirectoryResults::new(dir.path().to_path_buf())
        .harvest(&run())
        .await
        .unwrap_err();
    assert_eq!(err, HarvestError::Failed("job exited with code 3".to_string()));
}

#[tokio::test]
async fn unreadable_status_fails() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), STATUS_FILE, "{not json");

    let err = DirectoryResults::new(dir.path().to_path_buf())
        .harvest(&run())
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::Failed(_)));
}
