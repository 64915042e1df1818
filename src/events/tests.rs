//! Event Model Tests
//!
//! ## Test Scopes
//! - **Builder**: required-field presence and timestamp precision.
//! - **Codec**: round trips for both pipelines and rejection of bad bytes.
//! - **Validation**: domain rules that a successful decode does not guarantee.

#[cfg(test)]
mod tests {
    use crate::error::CodecError;
    use crate::events::{
        decode, encode, validate, DeidEvent, DeidStage, IngestionEvent, IngestionStage,
        PipelineStage, Quantity,
    };
    use chrono::{TimeZone, Utc};

    const EVENT_ID: &str = "5f0c6d1e-8f59-4a8e-9d3e-2f0a3b1c4d5e";

    fn ingestion_event(stage: IngestionStage) -> IngestionEvent {
        IngestionEvent::builder()
            .event_id(EVENT_ID)
            .occurred_now()
            .tenant_id("tenant-x")
            .run_id("batch-100")
            .stage(stage)
            .quantity(Quantity::RecordCount(1500))
            .source_system("CDW")
            .build()
            .unwrap()
    }

    fn failed_deid_event() -> DeidEvent {
        DeidEvent::builder()
            .event_id(EVENT_ID)
            .occurred_now()
            .tenant_id("tenant-x")
            .run_id("job-1-batch-100")
            .stage(DeidStage::Failed)
            .quantity(Quantity::Location("s3://raw/tenant-x/batch-100".to_string()))
            .source_system("CDW")
            .error_code(Some("DEID-VALIDATION".to_string()))
            .error_message(Some("recordCount too large".to_string()))
            .build()
            .unwrap()
    }

    // ============================================================
    // BUILDER
    // ============================================================

    #[test]
    fn test_builder_rejects_missing_tenant() {
        let result = IngestionEvent::builder()
            .event_id(EVENT_ID)
            .occurred_now()
            .run_id("batch-100")
            .stage(IngestionStage::Received)
            .quantity(Quantity::RecordCount(1))
            .source_system("CDW")
            .build();

        match result {
            Err(CodecError::SchemaViolation { field, .. }) => assert_eq!(field, "tenantId"),
            other => panic!("expected schema violation, got {:?}", other),
        }
    }

    #[test]
    fn test_builder_error_fields_are_optional() {
        let event = ingestion_event(IngestionStage::Validated);

        assert_eq!(event.error_code(), None);
        assert_eq!(event.error_message(), None);
    }

    #[test]
    fn test_builder_truncates_to_millis() {
        let precise = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();

        let event = IngestionEvent::builder()
            .event_id(EVENT_ID)
            .occurred_at(precise)
            .tenant_id("t")
            .run_id("r")
            .stage(IngestionStage::Received)
            .quantity(Quantity::RecordCount(1))
            .source_system("CDW")
            .build()
            .unwrap();

        assert_eq!(event.occurred_at().timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn test_partition_key_format() {
        let event = ingestion_event(IngestionStage::Received);
        assert_eq!(event.partition_key(), "tenant-x:batch-100");
    }

    #[test]
    fn test_stage_terminal_flags() {
        assert!(!IngestionStage::Received.is_terminal());
        assert!(!IngestionStage::Validated.is_terminal());
        assert!(IngestionStage::Persisted.is_terminal());
        assert!(IngestionStage::Failed.is_terminal());

        assert!(!DeidStage::Running.is_terminal());
        assert!(DeidStage::Completed.is_terminal());
        assert_eq!(DeidStage::Completed.to_string(), "COMPLETED");
    }

    // ============================================================
    // CODEC
    // ============================================================

    #[test]
    fn test_round_trip_preserves_every_field() {
        let event = ingestion_event(IngestionStage::Persisted);

        let bytes = encode(&event).unwrap();
        let decoded = decode::<IngestionStage>(&bytes).unwrap();

        assert_eq!(decoded, event);
    }

    #[test]
    fn test_round_trip_with_error_details() {
        let event = failed_deid_event();

        let decoded = decode::<DeidStage>(&encode(&event).unwrap()).unwrap();

        assert_eq!(decoded, event);
        assert_eq!(decoded.error_code(), Some("DEID-VALIDATION"));
        assert_eq!(decoded.error_message(), Some("recordCount too large"));
    }

    #[test]
    fn test_encode_rejects_wrong_quantity_kind() {
        let event = IngestionEvent::builder()
            .event_id(EVENT_ID)
            .occurred_now()
            .tenant_id("tenant-x")
            .run_id("batch-100")
            .stage(IngestionStage::Received)
            .quantity(Quantity::Location("s3://raw".to_string()))
            .source_system("CDW")
            .build()
            .unwrap();

        match encode(&event) {
            Err(CodecError::SchemaViolation { field, .. }) => assert_eq!(field, "quantity"),
            other => panic!("expected schema violation, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_empty_and_truncated_input() {
        let bytes = encode(&ingestion_event(IngestionStage::Received)).unwrap();

        assert!(matches!(decode::<IngestionStage>(&[]), Err(CodecError::Decode(_))));
        assert!(matches!(
            decode::<IngestionStage>(&bytes[..bytes.len() - 4]),
            Err(CodecError::Decode(_))
        ));
        assert!(matches!(
            decode::<IngestionStage>(&bytes[..10]),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_version_and_magic() {
        let mut bytes = encode(&ingestion_event(IngestionStage::Received)).unwrap();

        bytes[2] = 9;
        assert!(matches!(decode::<IngestionStage>(&bytes), Err(CodecError::Decode(_))));

        bytes[2] = 1;
        bytes[0] = b'X';
        assert!(matches!(decode::<IngestionStage>(&bytes), Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut bytes = encode(&ingestion_event(IngestionStage::Received)).unwrap();
        bytes.extend_from_slice(&[0, 0, 0]);

        assert!(decode::<IngestionStage>(&bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_other_pipeline() {
        let bytes = encode(&ingestion_event(IngestionStage::Persisted)).unwrap();

        assert!(matches!(decode::<DeidStage>(&bytes), Err(CodecError::Decode(_))));
    }

    // ============================================================
    // VALIDATION
    // ============================================================

    #[test]
    fn test_validate_accepts_well_formed_events() {
        assert!(validate(&ingestion_event(IngestionStage::Received)).is_ok());
        assert!(validate(&failed_deid_event()).is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_tenant_after_decode() {
        let event = IngestionEvent::builder()
            .event_id(EVENT_ID)
            .occurred_now()
            .tenant_id("  ")
            .run_id("batch-100")
            .stage(IngestionStage::Received)
            .quantity(Quantity::RecordCount(1))
            .source_system("CDW")
            .build()
            .unwrap();

        // Decoding succeeds, the domain check does not
        let decoded = decode::<IngestionStage>(&encode(&event).unwrap()).unwrap();
        let err = validate(&decoded).unwrap_err();

        assert_eq!(err.field, "tenantId");
    }

    #[test]
    fn test_validate_rejects_non_uuid_event_id() {
        let event = IngestionEvent::builder()
            .event_id("not-a-uuid")
            .occurred_now()
            .tenant_id("tenant-x")
            .run_id("batch-100")
            .stage(IngestionStage::Received)
            .quantity(Quantity::RecordCount(1))
            .source_system("CDW")
            .build()
            .unwrap();

        assert_eq!(validate(&event).unwrap_err().field, "eventId");
    }

    #[test]
    fn test_validate_requires_error_code_on_failed() {
        let event = IngestionEvent::builder()
            .event_id(EVENT_ID)
            .occurred_now()
            .tenant_id("tenant-x")
            .run_id("batch-100")
            .stage(IngestionStage::Failed)
            .quantity(Quantity::RecordCount(0))
            .source_system("CDW")
            .build()
            .unwrap();

        assert_eq!(validate(&event).unwrap_err().field, "errorCode");
    }

    #[test]
    fn test_validate_rejects_error_details_on_progress_event() {
        let event = IngestionEvent::builder()
            .event_id(EVENT_ID)
            .occurred_now()
            .tenant_id("tenant-x")
            .run_id("batch-100")
            .stage(IngestionStage::Validated)
            .quantity(Quantity::RecordCount(10))
            .source_system("CDW")
            .error_message(Some("oops".to_string()))
            .build()
            .unwrap();

        assert!(validate(&event).is_err());
    }

    #[test]
    fn test_validate_allows_zero_record_count() {
        // A zero-count run must still be able to announce itself before failing
        let event = IngestionEvent::builder()
            .event_id(EVENT_ID)
            .occurred_now()
            .tenant_id("tenant-x")
            .run_id("batch-0")
            .stage(IngestionStage::Received)
            .quantity(Quantity::RecordCount(0))
            .source_system("CDW")
            .build()
            .unwrap();

        assert!(validate(&event).is_ok());
    }
}
