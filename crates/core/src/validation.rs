//! Case intake validation.
//!
//! Validation runs once, before any pipeline stage touches the input. It
//! enforces caller-contract requirements (required fields present) and
//! guardrail bounds on untrusted input sizes. It does **not** reject
//! clinically suspicious content: an out-of-order timeline or alarming vitals
//! are detectable anomalies for the metrics layer, not input errors.

use crate::case::CaseInput;
use crate::constants::{
    MAX_NARRATIVE_BYTES, MAX_PATIENT_AGE_YEARS, MAX_TELEMETRY_READINGS, MAX_TIMELINE_EVENTS,
};
use crate::error::{CaseError, CaseResult};
use ncast_types::NonEmptyText;

/// Validates a raw intake record.
///
/// # Errors
///
/// Returns [`CaseError::InvalidInput`] when a required field is missing or a
/// guardrail bound is exceeded. No partial processing happens after a
/// validation failure.
pub fn validate_case_input(case: &CaseInput) -> CaseResult<()> {
    NonEmptyText::new(&case.case_id)
        .map_err(|_| CaseError::InvalidInput("case_id must not be empty".into()))?;

    if case.packet.narrative.len() > MAX_NARRATIVE_BYTES {
        return Err(CaseError::InvalidInput(format!(
            "packet narrative exceeds maximum size of {} bytes",
            MAX_NARRATIVE_BYTES
        )));
    }

    if case.timeline.len() > MAX_TIMELINE_EVENTS {
        return Err(CaseError::InvalidInput(format!(
            "timeline exceeds maximum of {} events",
            MAX_TIMELINE_EVENTS
        )));
    }

    if case.telemetry.readings.len() > MAX_TELEMETRY_READINGS {
        return Err(CaseError::InvalidInput(format!(
            "telemetry exceeds maximum of {} readings",
            MAX_TELEMETRY_READINGS
        )));
    }

    for event in &case.timeline {
        if event.source.trim().is_empty() {
            return Err(CaseError::InvalidInput(
                "timeline event source must not be empty".into(),
            ));
        }
    }

    if let Some(demographics) = &case.demographics {
        if let Some(age) = demographics.age_years {
            if age > MAX_PATIENT_AGE_YEARS {
                return Err(CaseError::InvalidInput(format!(
                    "patient age {} exceeds plausible maximum of {}",
                    age, MAX_PATIENT_AGE_YEARS
                )));
            }
        }
        if let Some(weight) = demographics.weight_kg {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(CaseError::InvalidInput(
                    "patient weight must be a positive finite number".into(),
                ));
            }
        }
    }

    Ok(())
}
