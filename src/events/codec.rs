//! Binary Stage Event Codec
//!
//! Layout: `b"SE"` magic, one schema-version byte, then a bincode body. The body starts with
//! the pipeline name so bytes from one topic never decode as another pipeline's event.

use super::types::{PipelineStage, Quantity, StageEvent};
use crate::error::CodecError;

use bincode::Options;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MAGIC: [u8; 2] = *b"SE";
pub const SCHEMA_VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1;

/// Upper bound for one encoded body.
pub const MAX_EVENT_BYTES: u64 = 64 * 1024;

#[derive(Serialize, Deserialize)]
struct WireEvent<S> {
    pipeline: String,
    event_id: String,
    occurred_at_ms: i64,
    tenant_id: String,
    run_id: String,
    stage: S,
    quantity: Quantity,
    source_system: String,
    error_code: Option<String>,
    error_message: Option<String>,
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_EVENT_BYTES)
}

fn check_quantity<S: PipelineStage>(quantity: &Quantity) -> Result<(), CodecError> {
    if quantity.kind() != S::QUANTITY {
        return Err(CodecError::schema(
            "quantity",
            format!(
                "{} events carry {:?}, got {:?}",
                S::PIPELINE,
                S::QUANTITY,
                quantity.kind()
            ),
        ));
    }
    Ok(())
}

pub fn encode<S: PipelineStage>(event: &StageEvent<S>) -> Result<Vec<u8>, CodecError> {
    check_quantity::<S>(&event.quantity)?;

    let wire = WireEvent {
        pipeline: S::PIPELINE.to_string(),
        event_id: event.event_id.clone(),
        occurred_at_ms: event.occurred_at.timestamp_millis(),
        tenant_id: event.tenant_id.clone(),
        run_id: event.run_id.clone(),
        stage: event.stage,
        quantity: event.quantity.clone(),
        source_system: event.source_system.clone(),
        error_code: event.error_code.clone(),
        error_message: event.error_message.clone(),
    };

    let body = wire_options()
        .serialize(&wire)
        .map_err(|e| CodecError::schema("event", e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(&MAGIC);
    bytes.push(SCHEMA_VERSION);
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

pub fn decode<S: PipelineStage>(bytes: &[u8]) -> Result<StageEvent<S>, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::Decode(format!(
            "payload of {} bytes is shorter than the header",
            bytes.len()
        )));
    }
    if bytes[..MAGIC.len()] != MAGIC {
        return Err(CodecError::Decode("missing stage event magic".to_string()));
    }
    let version = bytes[MAGIC.len()];
    if version != SCHEMA_VERSION {
        return Err(CodecError::Decode(format!(
            "unsupported schema version {}",
            version
        )));
    }

    let wire: WireEvent<S> = wire_options()
        .deserialize(&bytes[HEADER_LEN..])
        .map_err(|e| CodecError::Decode(e.to_string()))?;

    if wire.pipeline != S::PIPELINE {
        return Err(CodecError::Decode(format!(
            "expected a {} event, got {}",
            S::PIPELINE,
            wire.pipeline
        )));
    }
    check_quantity::<S>(&wire.quantity)?;

    let occurred_at = DateTime::<Utc>::from_timestamp_millis(wire.occurred_at_ms).ok_or_else(
        || CodecError::Decode(format!("timestamp {} out of range", wire.occurred_at_ms)),
    )?;

    Ok(StageEvent {
        event_id: wire.event_id,
        occurred_at,
        tenant_id: wire.tenant_id,
        run_id: wire.run_id,
        stage: wire.stage,
        quantity: wire.quantity,
        source_system: wire.source_system,
        error_code: wire.error_code,
        error_message: wire.error_message,
    })
}
