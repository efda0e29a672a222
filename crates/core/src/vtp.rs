//! Verified Transfer Packet assembly and verification.
//!
//! A packet is the canonical, privacy-redacted export of one completed
//! pipeline run. Assembly ordering is a correctness invariant: every other
//! field is finalised **before** the integrity block is computed, because the
//! hash covers the entire packet body and must never cover itself. After the
//! hash is computed the packet is immutable; any field change invalidates
//! the hash and requires rebuilding.
//!
//! Redaction happens here, not upstream: patient demographics are dropped
//! wholesale (they are simply not part of the packet shape) and every
//! risk-flag evidence quote is truncated to the policy cap. The privacy block
//! records what was done and under which policy version.

use chrono::{DateTime, Utc};
use ncast_ids::{HexDigest, RunId};
use serde::{Deserialize, Serialize};

use crate::canonical::canonicalize;
use crate::case::CaseInput;
use crate::constants::{MAX_EVIDENCE_QUOTE_CHARS, REDACTION_POLICY_VERSION, VTP_VERSION};
use crate::error::{CaseError, CaseResult};
use crate::flags::RiskFlag;
use crate::integrity::{content_hash, SignerContext};
use crate::metrics::{CaseTimers, Completeness, NumericMetrics, StabilityAssessment};
use crate::routing::RoutingDecision;

/// Packet identity and provenance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VtpMetadata {
    pub version: String,
    pub id: RunId,
    pub case_id: String,
    pub run_id: RunId,
    pub created_at: DateTime<Utc>,
    pub environment: String,
    pub synthetic: bool,
}

/// What redaction did to this packet, and under which policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyBlock {
    pub redaction_summary: Vec<String>,
    pub policy_version: String,
}

/// The numeric-reasoning block: everything derived, minus the timers (which
/// get their own coordination-timeline block).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericReasoning {
    pub stability: StabilityAssessment,
    pub completeness: Completeness,
    pub anomalies: Vec<crate::metrics::Anomaly>,
}

/// One pipeline stage as recorded in the agent trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTraceStep {
    pub step: String,
    pub latency_ms: u64,
}

/// Summary of the pipeline stages that produced this packet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTraceSummary {
    pub steps: Vec<AgentTraceStep>,
    pub total_latency_ms: u64,
}

/// Outcome of integrity computation for a packet.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    /// Hash computed and signed.
    Verified,
    /// Hash computed; no signer was available.
    Unsigned,
}

/// The integrity block, populated last.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityBlock {
    pub hash: HexDigest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub verification_status: VerificationStatus,
}

/// The canonical, hashed, privacy-redacted export of a pipeline run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerifiedTransferPacket {
    pub metadata: VtpMetadata,
    pub privacy: PrivacyBlock,
    pub coordination_timeline: CaseTimers,
    pub numeric_reasoning: NumericReasoning,
    pub risk_flags: Vec<RiskFlag>,
    pub routing: RoutingDecision,
    pub agent_trace: AgentTraceSummary,
    /// `None` only transiently during assembly; a built packet always
    /// carries its integrity block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<IntegrityBlock>,
}

/// Result of re-verifying a built packet.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct VtpVerification {
    pub hash_valid: bool,
    pub signature_valid: bool,
}

/// Assembles and seals a packet from a completed run's outputs.
///
/// The integrity hash is computed over the canonical serialization of the
/// packet with `integrity` absent, then signed if a signer is supplied.
#[allow(clippy::too_many_arguments)]
pub fn build_vtp(
    case: &CaseInput,
    flags: &[RiskFlag],
    decision: &RoutingDecision,
    metrics: &NumericMetrics,
    run_id: &RunId,
    trace: AgentTraceSummary,
    environment: &str,
    synthetic: bool,
    signer: Option<&SignerContext>,
) -> CaseResult<VerifiedTransferPacket> {
    let (risk_flags, truncated_quotes) = redact_flags(flags);

    let mut redaction_summary = Vec::new();
    if case.demographics.is_some() {
        redaction_summary.push("patient demographics omitted from packet".to_owned());
    }
    if truncated_quotes > 0 {
        redaction_summary.push(format!(
            "{truncated_quotes} evidence quote(s) truncated to {MAX_EVIDENCE_QUOTE_CHARS} characters"
        ));
    }

    let mut vtp = VerifiedTransferPacket {
        metadata: VtpMetadata {
            version: VTP_VERSION.to_owned(),
            id: RunId::new(),
            case_id: case.case_id.clone(),
            run_id: run_id.clone(),
            created_at: Utc::now(),
            environment: environment.to_owned(),
            synthetic,
        },
        privacy: PrivacyBlock {
            redaction_summary,
            policy_version: REDACTION_POLICY_VERSION.to_owned(),
        },
        coordination_timeline: metrics.timers.clone(),
        numeric_reasoning: NumericReasoning {
            stability: metrics.stability.clone(),
            completeness: metrics.completeness.clone(),
            anomalies: metrics.anomalies.clone(),
        },
        risk_flags,
        routing: decision.clone(),
        agent_trace: trace,
        integrity: None,
    };

    // Everything above is final; only now does the integrity block exist.
    let hash = hash_packet_body(&vtp)?;
    let signature = signer.map(|s| s.sign(&hash)).transpose()?;
    let verification_status = if signature.is_some() {
        VerificationStatus::Verified
    } else {
        VerificationStatus::Unsigned
    };
    vtp.integrity = Some(IntegrityBlock {
        hash,
        signature,
        verification_status,
    });
    Ok(vtp)
}

/// Re-derives the integrity-stripped body hash and checks it (and the
/// signature, when a signer is available) against the stored integrity block.
///
/// Mismatches are reported as booleans; this never fails on a mismatch.
pub fn verify_vtp(
    vtp: &VerifiedTransferPacket,
    signer: Option<&SignerContext>,
) -> CaseResult<VtpVerification> {
    let Some(integrity) = &vtp.integrity else {
        return Ok(VtpVerification {
            hash_valid: false,
            signature_valid: false,
        });
    };

    let recomputed = hash_packet_body(vtp)?;
    let hash_valid = recomputed == integrity.hash;
    let signature_valid = match (signer, &integrity.signature) {
        (Some(signer), Some(signature)) => signer.verify(&recomputed, signature),
        _ => false,
    };
    Ok(VtpVerification {
        hash_valid,
        signature_valid,
    })
}

/// Canonicalizes and hashes the packet body with the integrity block absent.
fn hash_packet_body(vtp: &VerifiedTransferPacket) -> CaseResult<HexDigest> {
    let body = if vtp.integrity.is_some() {
        let mut stripped = vtp.clone();
        stripped.integrity = None;
        serde_json::to_value(&stripped)
    } else {
        serde_json::to_value(vtp)
    }
    .map_err(CaseError::Serialization)?;
    let canonical = canonicalize(&body)?;
    Ok(content_hash(&canonical))
}

fn redact_flags(flags: &[RiskFlag]) -> (Vec<RiskFlag>, usize) {
    let mut truncated_quotes = 0;
    let redacted = flags
        .iter()
        .cloned()
        .map(|mut flag| {
            let (quote, truncated) =
                ncast_types::truncate_chars(&flag.evidence.quote, MAX_EVIDENCE_QUOTE_CHARS);
            if truncated {
                truncated_quotes += 1;
            }
            flag.evidence.quote = quote;
            flag
        })
        .collect();
    (redacted, truncated_quotes)
}
