//! End-to-end tests: upload, ingestion, then daily report.
//!
//! Run with: `cargo test -p rollup-worker --test pipeline_test`

mod helpers;

use chrono::{NaiveDate, Utc};
use helpers::{
    local_pipeline, memory_pipeline, paged_memory_pipeline, upload_event, ORDERS_CSV,
    REPORTS_BUCKET,
};
use rollup_core::constants::{daily_summary_key, PROCESSED_PREFIX};
use rollup_core::{DailySummary, ProcessingResult, ProcessingStatus};
use rollup_storage::{BlobStore, MemoryOp, ObjectMetadata};
use serde_json::json;

#[tokio::test]
async fn test_upload_then_daily_report() {
    let pipeline = memory_pipeline();
    pipeline.upload("uploads/orders.csv", ORDERS_CSV, "text/csv").await;

    let outcome = pipeline.ingestion.invoke(&upload_event(&["uploads/orders.csv"])).await;
    assert!(outcome.is_success(), "ingestion outcome: {:?}", outcome);
    assert_eq!(outcome.message(), "File processed successfully");

    let details = outcome.details().expect("details");
    assert_eq!(details.processed_files, 1);
    let artifact_key = &details.artifacts[0];
    assert!(artifact_key.ends_with("_orders.csv_processed.json"));

    let stored: ProcessingResult = serde_json::from_slice(
        &pipeline.store.get(REPORTS_BUCKET, artifact_key).await.unwrap(),
    )
    .unwrap();
    assert_eq!(stored.record_count, 4);
    assert_eq!(stored.processing_status, ProcessingStatus::Success);
    assert_eq!(stored.source_file, "uploads/orders.csv");

    // Report on the date the artifact key was stamped with.
    let stamp = artifact_key
        .strip_prefix(PROCESSED_PREFIX)
        .and_then(|rest| rest.get(..8))
        .expect("artifact key carries a date stamp");
    let report_date = NaiveDate::parse_from_str(stamp, "%Y%m%d").unwrap();

    let report_outcome = pipeline
        .daily
        .invoke(&json!({ "report_date": report_date.format("%Y-%m-%d").to_string() }))
        .await;
    assert!(report_outcome.is_success(), "report outcome: {:?}", report_outcome);
    let report = report_outcome.details().expect("details");
    assert!(report.total_files_processed >= 1);
    assert!(report.total_records >= 4);
    assert_eq!(report.skipped_artifacts, 0);

    let summary: DailySummary = serde_json::from_slice(
        &pipeline
            .store
            .get(REPORTS_BUCKET, &daily_summary_key(report_date))
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(summary.files_by_type.get("text/csv"), Some(&1));
    assert_eq!(summary.files_processed[0].record_count, 4);
}

#[tokio::test]
async fn test_daily_report_reads_every_listing_page() {
    let pipeline = paged_memory_pipeline(2);
    for i in 0..5 {
        let result = ProcessingResult::success(
            "raw-data",
            format!("f{i}.txt"),
            100,
            "text/plain",
            i + 1,
            Utc::now(),
        );
        pipeline
            .store
            .put(
                REPORTS_BUCKET,
                &format!("processed/20240115_00000{i}_f{i}.txt_processed.json"),
                serde_json::to_vec(&result).unwrap(),
                "application/json",
                &ObjectMetadata::new(),
            )
            .await
            .unwrap();
    }

    let report = pipeline
        .daily
        .handle(chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        .await
        .unwrap();

    assert_eq!(report.summary.total_files, 5);
    assert_eq!(report.summary.total_records, 15);
    assert_eq!(report.summary.average_records_per_file, 3.0);
}

#[tokio::test]
async fn test_batch_mixes_sources_and_failures() {
    let pipeline = memory_pipeline();
    pipeline.upload("a.csv", ORDERS_CSV, "text/csv").await;
    pipeline.upload("notes/b c.txt", b"one\n\ntwo\n", "text/plain").await;

    let mut event = upload_event(&["a.csv", "missing.json", "notes/b c.txt"]);
    event["Records"]
        .as_array_mut()
        .unwrap()
        .insert(1, json!({ "eventSource": "aws:sqs", "body": "hello" }));

    let outcome = pipeline.ingestion.invoke(&event).await;

    assert!(outcome.is_success());
    let details = outcome.details().unwrap();
    assert_eq!(details.processed_files, 3);
    assert_eq!(details.skipped_files, 1);
    assert_eq!(details.failed_files, 0);
    assert_eq!(pipeline.store.len(REPORTS_BUCKET), 3);

    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["items"][1]["result"], "skipped");
    assert_eq!(value["items"][2]["processing_status"], "error");
    assert_eq!(value["items"][3]["key"], "notes/b c.txt");
    assert_eq!(value["items"][3]["record_count"], 2);
}

#[tokio::test]
async fn test_persist_failure_marks_only_that_item() {
    let pipeline = memory_pipeline();
    pipeline.upload("bad.csv", ORDERS_CSV, "text/csv").await;
    pipeline.upload("good.csv", ORDERS_CSV, "text/csv").await;
    pipeline
        .store
        .fail_on_match(MemoryOp::Put, REPORTS_BUCKET, "_bad.csv_processed");

    let mut event = upload_event(&["bad.csv", "good.csv"]);
    event["Records"]
        .as_array_mut()
        .unwrap()
        .insert(1, json!({ "eventSource": "aws:sns" }));

    let outcome = pipeline.ingestion.invoke(&event).await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.status_code(), 500);
    assert_eq!(outcome.message(), "Error processing file");
    let details = outcome.details().unwrap();
    assert_eq!(details.failed_files, 1);
    assert_eq!(details.skipped_files, 1);
    assert_eq!(details.processed_files, 1);
    assert_eq!(details.artifacts.len(), 1);
    assert!(details.artifacts[0].ends_with("_good.csv_processed.json"));
    assert_eq!(pipeline.store.len(REPORTS_BUCKET), 1);

    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["items"][0]["result"], "failed");
    assert_eq!(value["items"][0]["key"], "bad.csv");
    assert_eq!(value["items"][0]["retryable"], true);
    assert_eq!(value["items"][2]["result"], "persisted");
}

#[tokio::test]
async fn test_local_backend_end_to_end() {
    let (pipeline, temp_dir) = local_pipeline().await;
    pipeline.upload("in/orders.csv", ORDERS_CSV, "text/csv").await;

    let outcome = pipeline.ingestion.invoke(&upload_event(&["in/orders.csv"])).await;
    assert!(outcome.is_success(), "ingestion outcome: {:?}", outcome);

    let artifact_key = outcome.details().unwrap().artifacts[0].clone();
    assert!(temp_dir.path().join(REPORTS_BUCKET).join(&artifact_key).exists());

    let stored: ProcessingResult = serde_json::from_slice(
        &pipeline.store.get(REPORTS_BUCKET, &artifact_key).await.unwrap(),
    )
    .unwrap();
    assert_eq!(stored.record_count, 4);
    assert_eq!(stored.content_type, "text/csv");
}

#[tokio::test]
async fn test_invalid_trigger_is_failure_outcome() {
    let pipeline = memory_pipeline();

    let outcome = pipeline
        .daily
        .invoke(&json!({ "report_date": "yesterday" }))
        .await;

    assert!(!outcome.is_success());
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["status"], "failure");
    assert_eq!(value["status_code"], 500);
    assert!(value["error"].as_str().unwrap().contains("yesterday"));
    assert!(pipeline.store.is_empty(REPORTS_BUCKET));
}
