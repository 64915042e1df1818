//! Domain checks on stage events, run before publish and after decode.
//!
//! A successful decode only proves the bytes match the schema; these rules catch events
//! that are well-formed but unusable, like a blank tenant.

use super::types::{PipelineStage, Quantity, StageEvent};
use crate::error::EventValidationError;

pub const MAX_TENANT_ID_LEN: usize = 64;
pub const MAX_RUN_ID_LEN: usize = 256;

pub fn validate<S: PipelineStage>(event: &StageEvent<S>) -> Result<(), EventValidationError> {
    if uuid::Uuid::parse_str(&event.event_id).is_err() {
        return Err(EventValidationError::new("eventId", "must be a UUID"));
    }

    not_blank("tenantId", &event.tenant_id)?;
    max_len("tenantId", &event.tenant_id, MAX_TENANT_ID_LEN)?;
    not_blank("runId", &event.run_id)?;
    max_len("runId", &event.run_id, MAX_RUN_ID_LEN)?;
    not_blank("sourceSystem", &event.source_system)?;

    if let Quantity::Location(location) = &event.quantity {
        not_blank("quantity", location)?;
    }

    if event.stage == S::FAILED {
        match event.error_code.as_deref() {
            Some(code) if !code.trim().is_empty() => {}
            _ => {
                return Err(EventValidationError::new(
                    "errorCode",
                    "FAILED events must carry an error code",
                ))
            }
        }
    } else if event.error_code.is_some() || event.error_message.is_some() {
        return Err(EventValidationError::new(
            "errorCode",
            format!("{} events must not carry error details", event.stage),
        ));
    }

    Ok(())
}

fn not_blank(field: &'static str, value: &str) -> Result<(), EventValidationError> {
    if value.trim().is_empty() {
        return Err(EventValidationError::new(field, "must not be blank"));
    }
    Ok(())
}

fn max_len(field: &'static str, value: &str, max: usize) -> Result<(), EventValidationError> {
    if value.chars().count() > max {
        return Err(EventValidationError::new(
            field,
            format!("must be at most {} characters", max),
        ));
    }
    Ok(())
}
