//! Risk-flag extraction.
//!
//! The extractor is a deterministic keyword and timeline-completeness scanner:
//! the same narrative and timeline always produce the same flags, in the same
//! order. The routing engine depends only on each flag's severity, category,
//! and label, never on guidance wording, so guidance text can evolve without
//! touching routing semantics.

use serde::{Deserialize, Serialize};

use crate::case::{CaseInput, TimelineEventType};
use crate::constants::{ANTICOAGULANTS, WAKE_UP_PHRASES};

/// Severity of a detected concern.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagSeverity {
    Critical,
    Warning,
    Info,
}

/// Extractor confidence in a detected concern.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagConfidence {
    High,
    Medium,
    Low,
}

/// Category of a detected concern.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagCategory {
    Meds,
    Timeline,
    Vitals,
    Documentation,
    Other,
}

/// Where a flag's evidence came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagEvidence {
    /// Verbatim excerpt supporting the flag. Truncated during packet
    /// redaction, never here.
    pub quote: String,
    /// Anchor into the source document (e.g. a byte offset in the narrative).
    pub source_anchor: String,
    pub document_type: String,
}

/// A single detected coordination concern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFlag {
    pub id: String,
    pub label: String,
    pub severity: FlagSeverity,
    pub confidence: FlagConfidence,
    pub category: FlagCategory,
    pub evidence: FlagEvidence,
    /// Coordination guidance for the receiving team.
    pub guidance: String,
    pub include_in_handoff: bool,
}

/// Bytes of narrative context captured around a keyword match. Generous on
/// purpose: the packet redaction step caps quotes later, and a reviewer
/// working from the flag list alone needs the surrounding sentence.
const EVIDENCE_CONTEXT_BYTES: usize = 120;

/// Extracts risk flags from a case's narrative and timeline.
///
/// Pure with respect to its input. Emission order is fixed: medication flags
/// in the order of the drug vocabulary, then timeline flags, then
/// documentation flags. Canonicalization additionally sorts flag sequences by
/// id before hashing, so callers need determinism here only for display.
pub fn extract_risk_flags(case: &CaseInput) -> Vec<RiskFlag> {
    let mut flags = Vec::new();
    let narrative = case.packet.narrative.as_str();
    let lowered = narrative.to_lowercase();

    for drug in ANTICOAGULANTS {
        if let Some(pos) = lowered.find(drug) {
            flags.push(RiskFlag {
                id: format!("meds-anticoagulant-{drug}"),
                label: format!("Anticoagulant exposure: {drug}"),
                severity: FlagSeverity::Critical,
                confidence: FlagConfidence::High,
                category: FlagCategory::Meds,
                evidence: FlagEvidence {
                    quote: narrative_snippet(narrative, pos, drug.len()),
                    source_anchor: format!("narrative:{pos}"),
                    document_type: "handoff-narrative".into(),
                },
                guidance:
                    "Confirm last dose time and coagulation status before any transfer decision."
                        .into(),
                include_in_handoff: true,
            });
        }
    }

    if let Some(pos) = WAKE_UP_PHRASES.iter().find_map(|p| lowered.find(p)) {
        flags.push(RiskFlag {
            id: "timeline-unknown-onset".into(),
            label: "Possible unknown onset / wake-up pattern".into(),
            severity: FlagSeverity::Warning,
            confidence: FlagConfidence::Medium,
            category: FlagCategory::Timeline,
            evidence: FlagEvidence {
                quote: narrative_snippet(narrative, pos, 0),
                source_anchor: format!("narrative:{pos}"),
                document_type: "handoff-narrative".into(),
            },
            guidance: "Treat onset time as unestablished; escalate for wake-up protocol review."
                .into(),
            include_in_handoff: true,
        });
    }

    if !case.has_event(TimelineEventType::LastKnownWell) {
        flags.push(RiskFlag {
            id: "timeline-missing-lkw".into(),
            label: "Last known well undocumented - possible unknown onset".into(),
            severity: FlagSeverity::Warning,
            confidence: FlagConfidence::High,
            category: FlagCategory::Timeline,
            evidence: FlagEvidence {
                quote: "".into(),
                source_anchor: "timeline:LAST_KNOWN_WELL".into(),
                document_type: "timeline".into(),
            },
            guidance: "Obtain a last-known-well time from family or EMS before window decisions."
                .into(),
            include_in_handoff: true,
        });
    }

    if !case.packet.meds_list_present {
        flags.push(RiskFlag {
            id: "doc-missing-meds-list".into(),
            label: "Medication list missing from packet".into(),
            severity: FlagSeverity::Warning,
            confidence: FlagConfidence::High,
            category: FlagCategory::Documentation,
            evidence: FlagEvidence {
                quote: "".into(),
                source_anchor: "packet:meds_list_present".into(),
                document_type: "packet-checklist".into(),
            },
            guidance: "Request the current medication list from the sending facility.".into(),
            include_in_handoff: true,
        });
    }

    if !case.packet.imaging_report_present {
        flags.push(RiskFlag {
            id: "doc-missing-imaging-report".into(),
            label: "Imaging report missing from packet".into(),
            severity: FlagSeverity::Info,
            confidence: FlagConfidence::High,
            category: FlagCategory::Documentation,
            evidence: FlagEvidence {
                quote: "".into(),
                source_anchor: "packet:imaging_report_present".into(),
                document_type: "packet-checklist".into(),
            },
            guidance: "Attach the CT/CTA report when available.".into(),
            include_in_handoff: false,
        });
    }

    flags
}

/// Returns the narrative region around a match, widened to
/// `EVIDENCE_CONTEXT_BYTES` on each side and snapped to character boundaries.
///
/// `match_start` comes from a search over the lowercased narrative, whose byte
/// offsets can drift from the original for non-ASCII text, so both edges are
/// clamped and snapped rather than trusted.
fn narrative_snippet(narrative: &str, match_start: usize, match_len: usize) -> String {
    let mut start = match_start
        .saturating_sub(EVIDENCE_CONTEXT_BYTES)
        .min(narrative.len());
    while start > 0 && !narrative.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = match_start
        .saturating_add(match_len + EVIDENCE_CONTEXT_BYTES)
        .min(narrative.len());
    while end < narrative.len() && !narrative.is_char_boundary(end) {
        end += 1;
    }
    narrative[start..end].trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{ArrivalMode, EventCertainty, Facility, FacilityType, Packet, Telemetry, TimelineEvent};
    use chrono::{TimeZone, Utc};

    fn case_with(narrative: &str, meds: bool, imaging: bool, lkw: bool) -> CaseInput {
        let mut timeline = Vec::new();
        if lkw {
            timeline.push(TimelineEvent {
                event_type: TimelineEventType::LastKnownWell,
                timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
                source: "family".into(),
                certainty: EventCertainty::Estimated,
            });
        }
        CaseInput {
            case_id: "case-001".into(),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
            facility: Facility {
                facility_type: FacilityType::SpokeEd,
                name: None,
            },
            arrival_mode: ArrivalMode::Ems,
            demographics: None,
            timeline,
            packet: Packet {
                narrative: narrative.into(),
                meds_list_present: meds,
                imaging_report_present: imaging,
            },
            telemetry: Telemetry::default(),
        }
    }

    #[test]
    fn detects_anticoagulant_case_insensitively() {
        let case = case_with("Family reports patient takes Apixaban 5mg BID.", true, true, true);
        let flags = extract_risk_flags(&case);
        let meds: Vec<_> = flags
            .iter()
            .filter(|f| f.category == FlagCategory::Meds)
            .collect();
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].id, "meds-anticoagulant-apixaban");
        assert_eq!(meds[0].severity, FlagSeverity::Critical);
        assert!(meds[0].evidence.quote.contains("Apixaban"));
    }

    #[test]
    fn detects_wake_up_pattern_phrase() {
        let case = case_with("Patient woke up with left-sided weakness.", true, true, true);
        let flags = extract_risk_flags(&case);
        let flag = flags
            .iter()
            .find(|f| f.id == "timeline-unknown-onset")
            .unwrap();
        assert_eq!(flag.severity, FlagSeverity::Warning);
        assert_eq!(flag.category, FlagCategory::Timeline);
        assert!(flag.label.to_lowercase().contains("wake-up"));
    }

    #[test]
    fn missing_lkw_emits_timeline_warning_with_unknown_onset_label() {
        let case = case_with("No keywords here.", true, true, false);
        let flags = extract_risk_flags(&case);
        let flag = flags
            .iter()
            .find(|f| f.id == "timeline-missing-lkw")
            .unwrap();
        assert_eq!(flag.severity, FlagSeverity::Warning);
        assert!(flag.label.to_lowercase().contains("unknown onset"));
    }

    #[test]
    fn clean_complete_case_emits_no_flags() {
        let case = case_with("Sudden onset at 09:10, witnessed.", true, true, true);
        assert!(extract_risk_flags(&case).is_empty());
    }

    #[test]
    fn missing_documentation_emits_flags() {
        let case = case_with("Witnessed onset.", false, false, true);
        let flags = extract_risk_flags(&case);
        assert!(flags.iter().any(|f| f.id == "doc-missing-meds-list"
            && f.severity == FlagSeverity::Warning));
        assert!(flags.iter().any(|f| f.id == "doc-missing-imaging-report"
            && f.severity == FlagSeverity::Info));
    }

    #[test]
    fn extraction_is_deterministic() {
        let case = case_with("On warfarin and heparin, woke up with aphasia.", false, false, false);
        let first = extract_risk_flags(&case);
        let second = extract_risk_flags(&case);
        assert_eq!(first, second);
        // Vocabulary order: warfarin precedes heparin.
        assert_eq!(first[0].id, "meds-anticoagulant-warfarin");
        assert_eq!(first[1].id, "meds-anticoagulant-heparin");
    }

    #[test]
    fn snippet_is_char_boundary_safe() {
        let narrative = "préamble préamble préamble warfarin après après";
        let pos = narrative.to_lowercase().find("warfarin").unwrap();
        let snippet = narrative_snippet(narrative, pos, "warfarin".len());
        assert!(snippet.contains("warfarin"));
    }
}
