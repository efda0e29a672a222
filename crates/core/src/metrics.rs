//! Derived numeric metrics.
//!
//! Everything here is computed from the case input and its risk flags alone:
//! no clock reads, no external state, so a re-run over the same input always
//! produces the same metrics. The time-since-LKW timer is therefore anchored
//! to the case record's `created_at`, not to wall-clock "now".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::case::{CaseInput, TimelineEventType};
use crate::constants::{
    HEART_RATE_MAX_BPM, HEART_RATE_MIN_BPM, SPO2_MIN_PCT, SYSTOLIC_BP_MAX_MMHG, TRANSPORT_ETA_MIN,
};
use crate::flags::{FlagSeverity, RiskFlag};

/// Minutes between defined timeline event pairs. A timer is `None` when
/// either endpoint event is absent from the case.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseTimers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_since_lkw: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub door_to_ct_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ct_to_decision_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_to_center_min: Option<u32>,
}

/// Stability classification for the case.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StabilityClass {
    Stable,
    Borderline,
    Unstable,
}

/// Stability classification plus the observations that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilityAssessment {
    pub class: StabilityClass,
    pub reasons: Vec<String>,
}

/// Packet completeness as a 0-100 score with the missing required items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completeness {
    pub score_pct: u8,
    pub missing: Vec<String>,
}

/// A single detected vitals or timeline violation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    pub name: String,
    pub value: String,
    pub severity: FlagSeverity,
}

/// The derived quantitative view of a case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericMetrics {
    pub timers: CaseTimers,
    pub stability: StabilityAssessment,
    pub completeness: Completeness,
    pub anomalies: Vec<Anomaly>,
}

/// Whole minutes between two instants, rounded, floored at zero.
fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let seconds = (end - start).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    ((seconds as f64) / 60.0).round() as u32
}

/// Computes the derived metrics for a case.
pub fn compute_metrics(case: &CaseInput, flags: &[RiskFlag]) -> NumericMetrics {
    let lkw = case.latest_event(TimelineEventType::LastKnownWell);
    let ed_arrival = case.latest_event(TimelineEventType::EdArrival);
    let ct_start = case.latest_event(TimelineEventType::CtStart);
    let decision = case.latest_event(TimelineEventType::DecisionTime);
    let transfer = case.latest_event(TimelineEventType::TransferActivated);

    let timers = CaseTimers {
        minutes_since_lkw: lkw.map(|e| minutes_between(e.timestamp, case.created_at)),
        door_to_ct_min: ed_arrival
            .zip(ct_start)
            .map(|(a, c)| minutes_between(a.timestamp, c.timestamp)),
        ct_to_decision_min: ct_start
            .zip(decision)
            .map(|(c, d)| minutes_between(c.timestamp, d.timestamp)),
        // No arrival-at-centre event exists; once transfer is activated the
        // demo reports the fixed transport estimate.
        eta_to_center_min: transfer.map(|_| TRANSPORT_ETA_MIN),
    };

    let mut anomalies = Vec::new();
    let mut reasons = Vec::new();

    for reading in &case.telemetry.readings {
        if let Some(sbp) = reading.systolic_bp_mmhg {
            if sbp > SYSTOLIC_BP_MAX_MMHG {
                anomalies.push(Anomaly {
                    name: "systolic-bp-high".into(),
                    value: format!("{sbp} mmHg"),
                    severity: FlagSeverity::Warning,
                });
                reasons.push(format!("systolic BP {sbp} above {SYSTOLIC_BP_MAX_MMHG}"));
            }
        }
        if let Some(hr) = reading.heart_rate_bpm {
            if !(HEART_RATE_MIN_BPM..=HEART_RATE_MAX_BPM).contains(&hr) {
                anomalies.push(Anomaly {
                    name: "heart-rate-out-of-range".into(),
                    value: format!("{hr} bpm"),
                    severity: FlagSeverity::Warning,
                });
                reasons.push(format!(
                    "heart rate {hr} outside [{HEART_RATE_MIN_BPM},{HEART_RATE_MAX_BPM}]"
                ));
            }
        }
        if let Some(spo2) = reading.spo2_pct {
            if spo2 < SPO2_MIN_PCT {
                anomalies.push(Anomaly {
                    name: "spo2-low".into(),
                    value: format!("{spo2}%"),
                    severity: FlagSeverity::Warning,
                });
                reasons.push(format!("SpO2 {spo2}% below {SPO2_MIN_PCT}%"));
            }
        }
    }
    let vitals_anomaly = !anomalies.is_empty();

    // CT before ED arrival is an ordering violation, not bad input.
    let timeline_violated = match (ed_arrival, ct_start) {
        (Some(ed), Some(ct)) => ct.timestamp < ed.timestamp,
        _ => false,
    };
    if timeline_violated {
        anomalies.push(Anomaly {
            name: "timeline-order-violation".into(),
            value: "CT_START precedes ED_ARRIVAL".into(),
            severity: FlagSeverity::Critical,
        });
        reasons.push("timeline ordering violated: CT_START precedes ED_ARRIVAL".into());
    }

    // Mirror CRITICAL risk flags into the anomaly list so a packet reader
    // sees every critical observation in one place. They do not influence
    // the stability class, which is defined by vitals and timeline only.
    for flag in flags.iter().filter(|f| f.severity == FlagSeverity::Critical) {
        anomalies.push(Anomaly {
            name: flag.id.clone(),
            value: flag.label.clone(),
            severity: FlagSeverity::Critical,
        });
    }

    let class = if timeline_violated {
        StabilityClass::Unstable
    } else if vitals_anomaly {
        StabilityClass::Borderline
    } else {
        StabilityClass::Stable
    };

    let mut missing = Vec::new();
    if lkw.is_none() {
        missing.push("last-known-well".to_owned());
    }
    if !case.packet.meds_list_present {
        missing.push("meds-list".to_owned());
    }
    if ct_start.is_none() {
        missing.push("ct-start".to_owned());
    }
    if !case.has_event(TimelineEventType::CtaResult) {
        missing.push("cta-result".to_owned());
    }

    let mut score: i32 = 100 - 10 * missing.len() as i32;
    if case.packet.meds_list_present {
        score += 5;
    }
    let score_pct = score.clamp(0, 100) as u8;

    NumericMetrics {
        timers,
        stability: StabilityAssessment { class, reasons },
        completeness: Completeness {
            score_pct,
            missing,
        },
        anomalies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{
        ArrivalMode, EventCertainty, Facility, FacilityType, Packet, Telemetry, TimelineEvent,
        VitalsReading,
    };
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, m, 0).unwrap()
    }

    fn event(event_type: TimelineEventType, ts: DateTime<Utc>) -> TimelineEvent {
        TimelineEvent {
            event_type,
            timestamp: ts,
            source: "test".into(),
            certainty: EventCertainty::Confirmed,
        }
    }

    fn case(timeline: Vec<TimelineEvent>, readings: Vec<VitalsReading>, meds: bool) -> CaseInput {
        CaseInput {
            case_id: "case-001".into(),
            created_at: at(10, 0),
            facility: Facility {
                facility_type: FacilityType::SpokeEd,
                name: None,
            },
            arrival_mode: ArrivalMode::Ems,
            demographics: None,
            timeline,
            packet: Packet {
                narrative: "".into(),
                meds_list_present: meds,
                imaging_report_present: true,
            },
            telemetry: Telemetry { readings },
        }
    }

    fn reading(sbp: Option<u16>, hr: Option<u16>, spo2: Option<u8>) -> VitalsReading {
        VitalsReading {
            recorded_at: at(9, 50),
            systolic_bp_mmhg: sbp,
            heart_rate_bpm: hr,
            spo2_pct: spo2,
        }
    }

    #[test]
    fn timers_computed_for_present_event_pairs() {
        let metrics = compute_metrics(
            &case(
                vec![
                    event(TimelineEventType::LastKnownWell, at(8, 0)),
                    event(TimelineEventType::EdArrival, at(9, 10)),
                    event(TimelineEventType::CtStart, at(9, 32)),
                    event(TimelineEventType::DecisionTime, at(9, 55)),
                    event(TimelineEventType::TransferActivated, at(9, 58)),
                ],
                vec![],
                true,
            ),
            &[],
        );
        assert_eq!(metrics.timers.minutes_since_lkw, Some(120));
        assert_eq!(metrics.timers.door_to_ct_min, Some(22));
        assert_eq!(metrics.timers.ct_to_decision_min, Some(23));
        assert_eq!(metrics.timers.eta_to_center_min, Some(TRANSPORT_ETA_MIN));
    }

    #[test]
    fn timers_undefined_when_endpoint_missing() {
        let metrics = compute_metrics(
            &case(vec![event(TimelineEventType::EdArrival, at(9, 10))], vec![], true),
            &[],
        );
        assert_eq!(metrics.timers.minutes_since_lkw, None);
        assert_eq!(metrics.timers.door_to_ct_min, None);
        assert_eq!(metrics.timers.ct_to_decision_min, None);
        assert_eq!(metrics.timers.eta_to_center_min, None);
    }

    #[test]
    fn negative_intervals_floor_at_zero() {
        // LKW after created_at: clock skew from an estimating source.
        let metrics = compute_metrics(
            &case(vec![event(TimelineEventType::LastKnownWell, at(11, 0))], vec![], true),
            &[],
        );
        assert_eq!(metrics.timers.minutes_since_lkw, Some(0));
    }

    #[test]
    fn stable_when_no_anomalies() {
        let metrics = compute_metrics(
            &case(
                vec![
                    event(TimelineEventType::LastKnownWell, at(8, 0)),
                    event(TimelineEventType::EdArrival, at(9, 0)),
                    event(TimelineEventType::CtStart, at(9, 20)),
                ],
                vec![reading(Some(150), Some(80), Some(97))],
                true,
            ),
            &[],
        );
        assert_eq!(metrics.stability.class, StabilityClass::Stable);
        assert!(metrics.anomalies.is_empty());
    }

    #[test]
    fn vitals_anomalies_make_borderline() {
        let metrics = compute_metrics(
            &case(vec![], vec![reading(Some(210), Some(45), Some(88))], true),
            &[],
        );
        assert_eq!(metrics.stability.class, StabilityClass::Borderline);
        let names: Vec<_> = metrics.anomalies.iter().map(|a| a.name.as_str()).collect();
        assert!(names.contains(&"systolic-bp-high"));
        assert!(names.contains(&"heart-rate-out-of-range"));
        assert!(names.contains(&"spo2-low"));
    }

    #[test]
    fn timeline_violation_overrides_borderline() {
        let metrics = compute_metrics(
            &case(
                vec![
                    event(TimelineEventType::EdArrival, at(9, 30)),
                    event(TimelineEventType::CtStart, at(9, 10)),
                ],
                vec![reading(Some(210), None, None)],
                true,
            ),
            &[],
        );
        assert_eq!(metrics.stability.class, StabilityClass::Unstable);
        assert!(metrics
            .anomalies
            .iter()
            .any(|a| a.name == "timeline-order-violation" && a.severity == FlagSeverity::Critical));
    }

    #[test]
    fn completeness_full_marks_with_everything_present() {
        let metrics = compute_metrics(
            &case(
                vec![
                    event(TimelineEventType::LastKnownWell, at(8, 0)),
                    event(TimelineEventType::CtStart, at(9, 20)),
                    event(TimelineEventType::CtaResult, at(9, 40)),
                ],
                vec![],
                true,
            ),
            &[],
        );
        // 100 - 0 missing + 5 meds bonus, clamped to 100.
        assert_eq!(metrics.completeness.score_pct, 100);
        assert!(metrics.completeness.missing.is_empty());
    }

    #[test]
    fn completeness_score_reflects_missing_items() {
        let metrics = compute_metrics(&case(vec![], vec![], false), &[]);
        // All four required items missing: 100 - 40 = 60.
        assert_eq!(metrics.completeness.score_pct, 60);
        assert_eq!(
            metrics.completeness.missing,
            vec!["last-known-well", "meds-list", "ct-start", "cta-result"]
        );
    }

    #[test]
    fn completeness_score_stays_in_bounds() {
        let metrics = compute_metrics(&case(vec![], vec![], false), &[]);
        assert!(metrics.completeness.score_pct <= 100);
        let metrics = compute_metrics(
            &case(
                vec![
                    event(TimelineEventType::LastKnownWell, at(8, 0)),
                    event(TimelineEventType::CtStart, at(9, 20)),
                    event(TimelineEventType::CtaResult, at(9, 40)),
                ],
                vec![],
                true,
            ),
            &[],
        );
        assert!(metrics.completeness.score_pct <= 100);
    }

    #[test]
    fn critical_flags_mirrored_into_anomalies() {
        use crate::flags::{FlagCategory, FlagConfidence, FlagEvidence};
        let flag = RiskFlag {
            id: "meds-anticoagulant-warfarin".into(),
            label: "Anticoagulant exposure: warfarin".into(),
            severity: FlagSeverity::Critical,
            confidence: FlagConfidence::High,
            category: FlagCategory::Meds,
            evidence: FlagEvidence {
                quote: "".into(),
                source_anchor: "".into(),
                document_type: "".into(),
            },
            guidance: "".into(),
            include_in_handoff: true,
        };
        let metrics = compute_metrics(&case(vec![], vec![], true), &[flag]);
        assert!(metrics
            .anomalies
            .iter()
            .any(|a| a.name == "meds-anticoagulant-warfarin"));
        // Mirrored flags never change the stability class.
        assert_eq!(metrics.stability.class, StabilityClass::Stable);
    }
}
