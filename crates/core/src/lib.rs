//! # NeuroCast Core
//!
//! Deterministic core of the NeuroCast stroke-care coordination backend:
//!
//! - Risk-flag extraction from case narratives and timelines
//! - The routing decision engine (PROCEED / HOLD / ESCALATE)
//! - Derived numeric metrics (timers, stability, completeness)
//! - The Verified Transfer Packet pipeline: canonicalization → SHA-256
//!   hashing → ECDSA signing → security gate → append-only commit ledger
//!
//! **No API concerns**: HTTP servers, OpenAPI schemas, and transport DTOs
//! belong in `api-rest` and `api-shared`. The core exposes each stage as a
//! pure function or an injectable service and reads no environment variables
//! at request time.

pub mod canonical;
pub mod case;
pub mod config;
pub mod constants;
pub mod error;
pub mod flags;
pub mod gate;
pub mod integrity;
pub mod ledger;
pub mod metrics;
pub mod pipeline;
pub mod routing;
pub mod validation;
pub mod vtp;

pub use canonical::canonicalize;
pub use case::{
    ArrivalMode, CaseInput, EventCertainty, Facility, FacilityType, Packet, PatientDemographics,
    Sex, Telemetry, TimelineEvent, TimelineEventType, VitalsReading,
};
pub use config::CoreConfig;
pub use error::{CaseError, CaseResult};
pub use flags::{
    extract_risk_flags, FlagCategory, FlagConfidence, FlagEvidence, FlagSeverity, RiskFlag,
};
pub use gate::{GateAction, GateDecision, LocalRiskGate, SecurityGate};
pub use integrity::{content_hash, verify_content_hash, SignerContext};
pub use ledger::{
    CommitMetadata, CommitOutcome, CommitRecord, FileLedger, InMemoryLedger, Ledger, LedgerStore,
};
pub use metrics::{compute_metrics, NumericMetrics, StabilityClass};
pub use ncast_ids::{HexDigest, RunId};
pub use pipeline::{PipelineRun, PipelineService};
pub use routing::{route, RoutingDecision, TriggeredRule, WorkflowState};
pub use validation::validate_case_input;
pub use vtp::{
    build_vtp, verify_vtp, AgentTraceStep, AgentTraceSummary, IntegrityBlock,
    VerificationStatus, VerifiedTransferPacket, VtpVerification,
};
