//! Pipeline orchestration.
//!
//! One service wires the stages in their fixed order: validate → extract
//! flags → route → metrics → build packet → security gate → commit. Each
//! stage is a pure function call; the orchestrator contributes only staging,
//! per-stage latency capture for the agent trace, and structured log events.
//! It knows nothing about any streaming transport; progress surfaces as
//! `tracing` events that a caller may fan out however it likes.

use std::sync::Arc;
use std::time::Instant;

use ncast_ids::RunId;
use serde::{Deserialize, Serialize};

use crate::case::CaseInput;
use crate::config::CoreConfig;
use crate::error::CaseResult;
use crate::flags::{extract_risk_flags, RiskFlag};
use crate::gate::SecurityGate;
use crate::integrity::SignerContext;
use crate::ledger::{CommitMetadata, CommitOutcome, Ledger, LedgerStore};
use crate::metrics::{compute_metrics, NumericMetrics};
use crate::routing::{route, RoutingDecision};
use crate::validation::validate_case_input;
use crate::vtp::{
    build_vtp, verify_vtp, AgentTraceStep, AgentTraceSummary, VerifiedTransferPacket,
    VtpVerification,
};

/// Everything a completed pipeline run produced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: RunId,
    pub flags: Vec<RiskFlag>,
    pub decision: RoutingDecision,
    pub metrics: NumericMetrics,
    pub vtp: VerifiedTransferPacket,
    /// `None` when the caller asked for a build-only run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitOutcome>,
}

/// Stage-ordered pipeline over injected collaborators.
pub struct PipelineService {
    signer: Option<Arc<SignerContext>>,
    gate: Arc<dyn SecurityGate>,
    ledger: Ledger,
    environment: String,
    synthetic: bool,
}

impl PipelineService {
    pub fn new(
        cfg: &CoreConfig,
        signer: Option<Arc<SignerContext>>,
        gate: Arc<dyn SecurityGate>,
        store: Arc<dyn LedgerStore>,
    ) -> Self {
        Self {
            signer,
            gate,
            ledger: Ledger::new(store),
            environment: cfg.environment().to_owned(),
            synthetic: cfg.synthetic(),
        }
    }

    /// Runs the full pipeline including the gated commit.
    pub fn run(&self, case: &CaseInput) -> CaseResult<PipelineRun> {
        self.run_inner(case, true)
    }

    /// Runs the pipeline but stops after packet assembly; the ledger is not
    /// consulted or written.
    pub fn run_without_commit(&self, case: &CaseInput) -> CaseResult<PipelineRun> {
        self.run_inner(case, false)
    }

    fn run_inner(&self, case: &CaseInput, commit: bool) -> CaseResult<PipelineRun> {
        validate_case_input(case)?;

        let run_id = RunId::new();
        tracing::info!(case_id = %case.case_id, run_id = %run_id, "pipeline run started");

        let mut trace = TraceRecorder::default();

        let flags = trace.record("extract-flags", || extract_risk_flags(case));
        tracing::info!(run_id = %run_id, flags = flags.len(), "risk flags extracted");

        let decision = trace.record("route", || route(&flags));
        tracing::info!(run_id = %run_id, state = %decision.state, "routing decision made");

        let metrics = trace.record("metrics", || compute_metrics(case, &flags));

        // The packet carries its own trace, so the seal-and-sign step cannot
        // time itself; the trace covers the stages that produced the body.
        let vtp = build_vtp(
            case,
            &flags,
            &decision,
            &metrics,
            &run_id,
            trace.finish(),
            &self.environment,
            self.synthetic,
            self.signer.as_deref(),
        )?;
        tracing::info!(run_id = %run_id, vtp_id = %vtp.metadata.id, "packet built and sealed");

        let commit = if commit {
            let gate_decision = self.gate.evaluate(&vtp)?;
            tracing::info!(
                run_id = %run_id,
                action = ?gate_decision.action,
                risk_score = gate_decision.risk_score,
                "security gate evaluated"
            );

            // A built packet always carries its integrity block.
            let hash = &vtp
                .integrity
                .as_ref()
                .expect("build_vtp always populates the integrity block")
                .hash;
            let metadata = CommitMetadata {
                vtp_id: vtp.metadata.id.clone(),
                case_id: case.case_id.clone(),
                run_id: run_id.clone(),
                workflow_state: decision.state,
                created_at: vtp.metadata.created_at,
            };
            Some(self.ledger.commit(hash, metadata, &gate_decision)?)
        } else {
            None
        };

        Ok(PipelineRun {
            run_id,
            flags,
            decision,
            metrics,
            vtp,
            commit,
        })
    }

    /// Re-verifies a packet against this service's signer.
    pub fn verify(&self, vtp: &VerifiedTransferPacket) -> CaseResult<VtpVerification> {
        verify_vtp(vtp, self.signer.as_deref())
    }

    /// The ledger behind this pipeline, for direct lookups.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}

/// Accumulates per-stage latency into an [`AgentTraceSummary`].
#[derive(Default)]
struct TraceRecorder {
    steps: Vec<AgentTraceStep>,
}

impl TraceRecorder {
    fn record<T>(&mut self, step: &str, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.steps.push(AgentTraceStep {
            step: step.to_owned(),
            latency_ms: started.elapsed().as_millis() as u64,
        });
        out
    }

    fn finish(self) -> AgentTraceSummary {
        let total_latency_ms = self.steps.iter().map(|s| s.latency_ms).sum();
        AgentTraceSummary {
            steps: self.steps,
            total_latency_ms,
        }
    }
}
