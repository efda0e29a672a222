//! Routing decision engine.
//!
//! `route` classifies a case into a workflow state from its extracted risk
//! flags. The rules form an **ordered decision list**, evaluated top to
//! bottom with the first matching rule winning, not a set of independent
//! boolean checks. Exactly one triggered rule is recorded per decision so the
//! outcome stays explainable as a single causal rule rather than a union of
//! conditions.
//!
//! The engine is a total, deterministic function: every flag set (including
//! the empty set) yields exactly one state, with no randomness and no I/O.

use serde::{Deserialize, Serialize};

use crate::constants::SAFETY_DISCLAIMER;
use crate::flags::{FlagCategory, FlagSeverity, RiskFlag};

/// Workflow state assigned to a case.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Proceed,
    Hold,
    Escalate,
}

impl WorkflowState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Proceed => "PROCEED",
            Self::Hold => "HOLD",
            Self::Escalate => "ESCALATE",
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The rule that produced a routing decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredRule {
    pub id: String,
    pub name: String,
    pub explanation: String,
}

/// Output of the routing engine. Never mutated after creation; a re-run
/// produces a new decision under a new run id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub state: WorkflowState,
    pub reason: String,
    /// Ordered triggered rules. Always exactly one entry: the first rule in
    /// the decision list whose predicate matched.
    pub triggered_rules: Vec<TriggeredRule>,
    pub next_steps: Vec<String>,
    pub disclaimer: String,
}

/// One entry in the ordered decision list.
struct RoutingRule {
    id: &'static str,
    name: &'static str,
    state: WorkflowState,
    reason: &'static str,
    explanation: &'static str,
    applies: fn(&[RiskFlag]) -> bool,
}

fn any_critical_meds(flags: &[RiskFlag]) -> bool {
    flags
        .iter()
        .any(|f| f.severity == FlagSeverity::Critical && f.category == FlagCategory::Meds)
}

fn any_unknown_onset(flags: &[RiskFlag]) -> bool {
    flags.iter().any(|f| {
        let label = f.label.to_lowercase();
        label.contains("unknown onset") || label.contains("wake-up")
    })
}

/// The decision list. Order is the priority order; the final rule matches
/// unconditionally so the engine is total.
const ROUTING_RULES: &[RoutingRule] = &[
    RoutingRule {
        id: "critical-meds",
        name: "Critical medication block",
        state: WorkflowState::Hold,
        reason: "critical anticoagulant risk",
        explanation: "A CRITICAL medication flag blocks transfer until reversal is assessed.",
        applies: any_critical_meds,
    },
    RoutingRule {
        id: "unknown-onset",
        name: "Unknown onset / wake-up pattern",
        state: WorkflowState::Escalate,
        reason: "possible unknown onset / wake-up pattern",
        explanation: "Onset time cannot be established, so the treatment window needs review.",
        applies: any_unknown_onset,
    },
    RoutingRule {
        id: "clear-path",
        name: "Clear path",
        state: WorkflowState::Proceed,
        reason: "no high-risk blockers detected",
        explanation: "No rule above matched; the case can proceed through coordination.",
        applies: |_| true,
    },
];

fn next_steps_for(state: WorkflowState) -> Vec<String> {
    let steps: [&str; 3] = match state {
        WorkflowState::Hold => [
            "Hold transfer activation pending anticoagulant reversal assessment",
            "Notify the receiving stroke team of the medication block",
            "Re-run triage once a reversal plan is documented",
        ],
        WorkflowState::Escalate => [
            "Escalate to the stroke consultant for wake-up protocol review",
            "Request perfusion imaging to establish the treatment window",
            "Keep the EMS crew on standby until the window is confirmed",
        ],
        WorkflowState::Proceed => [
            "Activate transfer to the thrombectomy-capable centre",
            "Send the verified transfer packet to the receiving team",
            "Confirm ETA with transport dispatch",
        ],
    };
    steps.iter().map(|s| (*s).to_owned()).collect()
}

/// Assigns a workflow state to a set of risk flags.
///
/// First match in the decision list wins; later rules are not evaluated once
/// one matches, so a flag set containing both a CRITICAL/MEDS flag and an
/// unknown-onset label resolves to HOLD.
pub fn route(flags: &[RiskFlag]) -> RoutingDecision {
    let rule = ROUTING_RULES
        .iter()
        .find(|r| (r.applies)(flags))
        // SAFETY: the final rule's predicate is unconditionally true
        .expect("routing decision list always has a matching rule");

    RoutingDecision {
        state: rule.state,
        reason: rule.reason.to_owned(),
        triggered_rules: vec![TriggeredRule {
            id: rule.id.to_owned(),
            name: rule.name.to_owned(),
            explanation: rule.explanation.to_owned(),
        }],
        next_steps: next_steps_for(rule.state),
        disclaimer: SAFETY_DISCLAIMER.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{FlagConfidence, FlagEvidence};

    fn flag(severity: FlagSeverity, category: FlagCategory, label: &str) -> RiskFlag {
        RiskFlag {
            id: format!("test-{}", label.to_lowercase().replace(' ', "-")),
            label: label.into(),
            severity,
            confidence: FlagConfidence::High,
            category,
            evidence: FlagEvidence {
                quote: "".into(),
                source_anchor: "test".into(),
                document_type: "test".into(),
            },
            guidance: "".into(),
            include_in_handoff: true,
        }
    }

    #[test]
    fn critical_meds_routes_to_hold() {
        let flags = vec![flag(FlagSeverity::Critical, FlagCategory::Meds, "Anticoagulant exposure: apixaban")];
        let decision = route(&flags);
        assert_eq!(decision.state, WorkflowState::Hold);
        assert_eq!(decision.reason, "critical anticoagulant risk");
        assert_eq!(decision.triggered_rules.len(), 1);
        assert_eq!(decision.triggered_rules[0].id, "critical-meds");
    }

    #[test]
    fn wake_up_pattern_routes_to_escalate() {
        let flags = vec![flag(
            FlagSeverity::Warning,
            FlagCategory::Timeline,
            "Possible unknown onset / wake-up pattern",
        )];
        let decision = route(&flags);
        assert_eq!(decision.state, WorkflowState::Escalate);
        assert_eq!(decision.triggered_rules[0].id, "unknown-onset");
    }

    #[test]
    fn empty_flags_route_to_proceed() {
        let decision = route(&[]);
        assert_eq!(decision.state, WorkflowState::Proceed);
        assert_eq!(decision.reason, "no high-risk blockers detected");
        assert_eq!(decision.triggered_rules[0].id, "clear-path");
    }

    #[test]
    fn critical_meds_takes_priority_over_unknown_onset() {
        let flags = vec![
            flag(
                FlagSeverity::Warning,
                FlagCategory::Timeline,
                "Possible unknown onset / wake-up pattern",
            ),
            flag(FlagSeverity::Critical, FlagCategory::Meds, "Anticoagulant exposure: warfarin"),
        ];
        let decision = route(&flags);
        assert_eq!(decision.state, WorkflowState::Hold);
        assert_eq!(decision.triggered_rules[0].id, "critical-meds");
        // Exactly one rule recorded even though two matched.
        assert_eq!(decision.triggered_rules.len(), 1);
    }

    #[test]
    fn unknown_onset_match_is_case_insensitive() {
        let flags = vec![flag(
            FlagSeverity::Warning,
            FlagCategory::Timeline,
            "UNKNOWN ONSET suspected",
        )];
        assert_eq!(route(&flags).state, WorkflowState::Escalate);
    }

    #[test]
    fn critical_non_meds_flag_does_not_hold() {
        let flags = vec![flag(FlagSeverity::Critical, FlagCategory::Vitals, "Hypoxia")];
        assert_eq!(route(&flags).state, WorkflowState::Proceed);
    }

    #[test]
    fn every_decision_carries_disclaimer_and_three_steps() {
        for flags in [
            vec![],
            vec![flag(FlagSeverity::Critical, FlagCategory::Meds, "m")],
            vec![flag(FlagSeverity::Warning, FlagCategory::Timeline, "wake-up")],
        ] {
            let decision = route(&flags);
            assert_eq!(decision.disclaimer, SAFETY_DISCLAIMER);
            assert_eq!(decision.next_steps.len(), 3);
        }
    }
}
