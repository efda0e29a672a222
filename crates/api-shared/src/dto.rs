//! Request and response payloads for the REST API.
//!
//! Payloads whose shape belongs to the core (the case input, the packet) are
//! carried as raw JSON values here and deserialized into core types at the
//! handler edge. That keeps OpenAPI schema derivation independent of the core
//! type tree while the wire format stays exactly the core's serde form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Request to run the coordination pipeline over one case.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RunCaseReq {
    /// The case intake record, in the core's `CaseInput` JSON form.
    #[schema(value_type = Object)]
    pub case: Value,
    /// When true, the run ends with a gated ledger commit.
    #[serde(default)]
    pub commit: bool,
}

/// Response for a completed pipeline run.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RunCaseRes {
    pub run_id: String,
    pub workflow_state: String,
    pub reason: String,
    /// Content hash of the sealed packet.
    pub hash: String,
    /// True when the packet was appended to the ledger during this run.
    pub committed: bool,
    /// Ledger transaction id, when committed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Gate warning recorded on the commit, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_warning: Option<String>,
    /// Gate rejection reason, when the security gate vetoed the commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_reason: Option<String>,
    /// The full Verified Transfer Packet.
    #[schema(value_type = Object)]
    pub vtp: Value,
}

/// Request to verify a previously built packet.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyVtpReq {
    /// The packet to verify, in the core's `VerifiedTransferPacket` JSON form.
    #[schema(value_type = Object)]
    pub vtp: Value,
}

/// Verification verdict for a packet.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyVtpRes {
    pub hash_valid: bool,
    pub signature_valid: bool,
}

/// One ledger entry, as returned by the commit lookup endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LedgerEntryRes {
    pub hash: String,
    pub transaction_id: String,
    pub case_id: String,
    pub run_id: String,
    pub workflow_state: String,
    pub committed_at: DateTime<Utc>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Error payload for non-2xx responses.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}
