//! Pre-commit security gate.
//!
//! Every packet passes a security-gate check before it may be committed to
//! the ledger. The gate itself is external to the core: the core's only
//! contract is the decision shape (ALLOW / WARN / BLOCK plus a 0-100 risk
//! score) and the rule that BLOCK is a hard veto on commit.
//!
//! [`LocalRiskGate`] is the demo stand-in for the external scanner: a
//! deterministic score over the packet's flag severities and stability.

use serde::{Deserialize, Serialize};

use crate::constants::{GATE_BLOCK_AT, GATE_WARN_AT};
use crate::error::{CaseError, CaseResult};
use crate::flags::FlagSeverity;
use crate::metrics::StabilityClass;
use crate::vtp::VerifiedTransferPacket;

/// The gate's verdict on a packet.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateAction {
    Allow,
    Warn,
    Block,
}

/// A security-gate decision for one packet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub action: GateAction,
    /// Risk score in [0, 100].
    pub risk_score: u8,
    pub reason: String,
}

/// A pre-commit security check.
pub trait SecurityGate: Send + Sync {
    /// Evaluates a packet before commit.
    ///
    /// # Errors
    ///
    /// Implementations backed by an external service may fail to produce a
    /// decision at all; that is [`CaseError::Gate`], distinct from a BLOCK
    /// verdict (which is a successful evaluation).
    fn evaluate(&self, vtp: &VerifiedTransferPacket) -> CaseResult<GateDecision>;
}

/// Deterministic local gate scoring flag severities and stability.
///
/// Scoring: 25 per CRITICAL flag, 10 per WARNING, 2 per INFO, plus 15 when
/// the packet reports UNSTABLE, clamped to 100.
#[derive(Clone, Debug)]
pub struct LocalRiskGate {
    warn_at: u8,
    block_at: u8,
}

impl LocalRiskGate {
    /// Creates a gate with explicit thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::InvalidInput`] unless `warn_at <= block_at <= 100`.
    pub fn new(warn_at: u8, block_at: u8) -> CaseResult<Self> {
        if warn_at > block_at || block_at > 100 {
            return Err(CaseError::InvalidInput(format!(
                "gate thresholds must satisfy warn_at <= block_at <= 100, got warn_at={warn_at} block_at={block_at}"
            )));
        }
        Ok(Self { warn_at, block_at })
    }

    fn score(&self, vtp: &VerifiedTransferPacket) -> u8 {
        let mut score: u32 = 0;
        for flag in &vtp.risk_flags {
            score += match flag.severity {
                FlagSeverity::Critical => 25,
                FlagSeverity::Warning => 10,
                FlagSeverity::Info => 2,
            };
        }
        if vtp.numeric_reasoning.stability.class == StabilityClass::Unstable {
            score += 15;
        }
        score.min(100) as u8
    }
}

impl Default for LocalRiskGate {
    fn default() -> Self {
        Self {
            warn_at: GATE_WARN_AT,
            block_at: GATE_BLOCK_AT,
        }
    }
}

impl SecurityGate for LocalRiskGate {
    fn evaluate(&self, vtp: &VerifiedTransferPacket) -> CaseResult<GateDecision> {
        let risk_score = self.score(vtp);
        let (action, reason) = if risk_score >= self.block_at {
            (
                GateAction::Block,
                format!("risk score {risk_score} at or above block threshold {}", self.block_at),
            )
        } else if risk_score >= self.warn_at {
            (
                GateAction::Warn,
                format!("risk score {risk_score} at or above warn threshold {}", self.warn_at),
            )
        } else {
            (GateAction::Allow, format!("risk score {risk_score} below thresholds"))
        };
        Ok(GateDecision {
            action,
            risk_score,
            reason,
        })
    }
}
