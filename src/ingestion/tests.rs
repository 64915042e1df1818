//! Ingestion Module Tests
//!
//! ## Test Scopes
//! - **Runs**: end-to-end stage sequences for accepted, oversized and empty batches.
//! - **Store Failures**: a failing batch store ends the run with `INGEST-IO`.
//! - **Intake**: request checks and the `202`/`400` answers of `POST /batches`.

#[cfg(test)]
mod tests {
    use crate::events::{IngestionStage, Quantity};
    use crate::ingestion::handlers::handle_submit_batch;
    use crate::ingestion::{
        BatchRequest, BatchStore, IngestionPipeline, SimulatedBatchStore, MAX_INGEST_RECORD_COUNT,
    };
    use crate::pipeline::RunContext;
    use crate::test_support::{
        events_on, memory_log, resources, stages_of, wait_until, INGESTION_TOPIC,
    };

    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum::{Extension, Json};
    use std::sync::Arc;
    use std::time::Duration;

    struct BrokenStore;

    #[async_trait]
    impl BatchStore for BrokenStore {
        async fn persist(&self, _context: &RunContext) -> std::io::Result<()> {
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "warehouse unreachable",
            ))
        }
    }

    fn request(batch_id: &str, record_count: i64) -> BatchRequest {
        BatchRequest {
            tenant_id: "tenant-x".to_string(),
            batch_id: batch_id.to_string(),
            source_system: "CDW".to_string(),
            record_count,
        }
    }

    fn pipeline(
        log: &Arc<crate::messaging::MemoryEventLog>,
        store: Arc<dyn BatchStore>,
    ) -> IngestionPipeline {
        IngestionPipeline::new(store, resources(log, INGESTION_TOPIC))
    }

    fn fast_store() -> Arc<dyn BatchStore> {
        Arc::new(SimulatedBatchStore::new(Duration::from_millis(5)))
    }

    // ============================================================
    // RUNS
    // ============================================================

    #[tokio::test]
    async fn test_accepted_batch_reaches_persisted() {
        // ARRANGE
        let log = memory_log();
        let pipeline = pipeline(&log, fast_store());

        // ACT
        let outcome = pipeline.start_run(request("batch-100", 1500)).await.unwrap();

        // ASSERT
        assert!(outcome.is_succeeded());
        let events = events_on::<IngestionStage>(&log, INGESTION_TOPIC);
        assert_eq!(
            stages_of(&events, "batch-100"),
            vec![
                IngestionStage::Received,
                IngestionStage::Validated,
                IngestionStage::Persisted
            ]
        );
        for event in &events {
            assert_eq!(event.tenant_id(), "tenant-x");
            assert_eq!(event.quantity(), &Quantity::RecordCount(1500));
            assert_eq!(event.source_system(), "CDW");
            assert_eq!(event.event_id(), events[0].event_id());
        }
    }

    #[tokio::test]
    async fn test_ceiling_is_inclusive() {
        let log = memory_log();
        let pipeline = pipeline(&log, fast_store());

        let at_max = pipeline
            .start_run(request("batch-max", MAX_INGEST_RECORD_COUNT))
            .await
            .unwrap();
        let over_max = pipeline
            .start_run(request("batch-over", MAX_INGEST_RECORD_COUNT + 1))
            .await
            .unwrap();

        assert!(at_max.is_succeeded());
        assert!(!over_max.is_succeeded());

        let events = events_on::<IngestionStage>(&log, INGESTION_TOPIC);
        assert_eq!(
            stages_of(&events, "batch-over"),
            vec![IngestionStage::Received, IngestionStage::Failed]
        );
        let failed = events
            .iter()
            .find(|e| e.stage() == IngestionStage::Failed)
            .unwrap();
        assert_eq!(failed.error_code(), Some("INGEST-VALIDATION"));
    }

    #[tokio::test]
    async fn test_empty_batch_fails_validation() {
        let log = memory_log();
        let pipeline = pipeline(&log, fast_store());

        pipeline.start_run(request("batch-empty", 0)).await.unwrap();

        let events = events_on::<IngestionStage>(&log, INGESTION_TOPIC);
        assert_eq!(
            stages_of(&events, "batch-empty"),
            vec![IngestionStage::Received, IngestionStage::Failed]
        );
        assert_eq!(events[1].error_code(), Some("INGEST-VALIDATION"));
    }

    #[tokio::test]
    async fn test_each_run_gets_its_own_event_id() {
        let log = memory_log();
        let pipeline = pipeline(&log, fast_store());

        pipeline.start_run(request("batch-a", 1)).await.unwrap();
        pipeline.start_run(request("batch-b", 1)).await.unwrap();

        let events = events_on::<IngestionStage>(&log, INGESTION_TOPIC);
        let a = events.iter().find(|e| e.run_id() == "batch-a").unwrap();
        let b = events.iter().find(|e| e.run_id() == "batch-b").unwrap();
        assert_ne!(a.event_id(), b.event_id());
    }

    // ============================================================
    // STORE FAILURES
    // ============================================================

    #[tokio::test]
    async fn test_store_failure_ends_with_ingest_io() {
        let log = memory_log();
        let pipeline = pipeline(&log, Arc::new(BrokenStore));

        let outcome = pipeline.start_run(request("batch-io", 10)).await.unwrap();

        assert!(!outcome.is_succeeded());
        let events = events_on::<IngestionStage>(&log, INGESTION_TOPIC);
        assert_eq!(
            stages_of(&events, "batch-io"),
            vec![
                IngestionStage::Received,
                IngestionStage::Validated,
                IngestionStage::Failed
            ]
        );
        let failed = events.last().unwrap();
        assert_eq!(failed.error_code(), Some("INGEST-IO"));
        assert!(failed
            .error_message()
            .unwrap()
            .contains("warehouse unreachable"));
    }

    // ============================================================
    // INTAKE
    // ============================================================

    #[test]
    fn test_request_validation_lists_every_violation() {
        let bad = BatchRequest {
            tenant_id: " ".to_string(),
            batch_id: "b".repeat(129),
            source_system: "CDW".to_string(),
            record_count: 0,
        };

        let errors = bad.validate();

        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("tenantId"));
        assert!(errors[1].contains("batchId"));
        assert!(errors[2].contains("recordCount"));
        assert!(request("batch-1", 1).validate().is_empty());
    }

    #[test]
    fn test_request_uses_camel_case_fields() {
        let parsed: BatchRequest = serde_json::from_str(
            r#"{"tenantId":"t","batchId":"b","sourceSystem":"CDW","recordCount":5}"#,
        )
        .unwrap();

        assert_eq!(parsed.record_count, 5);
        assert_eq!(parsed.batch_id, "b");
    }

    #[tokio::test]
    async fn test_submit_answers_accepted_and_runs_in_background() {
        // ARRANGE
        let log = memory_log();
        let pipeline = Arc::new(pipeline(&log, fast_store()));

        // ACT
        let response =
            handle_submit_batch(Extension(pipeline), Json(request("batch-http", 25))).await;

        // ASSERT
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        wait_until(|| {
            stages_of(&events_on::<IngestionStage>(&log, INGESTION_TOPIC), "batch-http")
                .contains(&IngestionStage::Persisted)
        })
        .await;
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_request_without_run() {
        let log = memory_log();
        let pipeline = Arc::new(pipeline(&log, fast_store()));

        let response = handle_submit_batch(Extension(pipeline), Json(request("", 0))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(log.records(INGESTION_TOPIC).unwrap().is_empty());
    }
}
