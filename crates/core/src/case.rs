//! Case intake data model.
//!
//! A [`CaseInput`] is the raw record for one potential patient transfer,
//! created once at intake and treated as immutable afterwards: a re-run of the
//! pipeline produces a new run over the same input, never a mutation of it.
//!
//! Timeline semantics: the event sequence is kept in arrival order, and at
//! most one event of each type is *meaningful*: when a type is duplicated the
//! last occurrence wins (see [`CaseInput::latest_event`]). An out-of-order
//! timeline (CT before ED arrival) is valid input; the metrics layer reports
//! it as an anomaly rather than this layer rejecting it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of facility the case originates from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FacilityType {
    #[serde(rename = "spoke-ED")]
    SpokeEd,
    #[serde(rename = "thrombectomy-center")]
    ThrombectomyCenter,
    #[serde(rename = "EMS")]
    Ems,
    #[serde(rename = "clinic")]
    Clinic,
}

impl FacilityType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SpokeEd => "spoke-ED",
            Self::ThrombectomyCenter => "thrombectomy-center",
            Self::Ems => "EMS",
            Self::Clinic => "clinic",
        }
    }
}

/// The facility descriptor attached to a case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    #[serde(rename = "type")]
    pub facility_type: FacilityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// How the patient arrived.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ArrivalMode {
    #[serde(rename = "EMS")]
    Ems,
    #[serde(rename = "walk-in")]
    WalkIn,
    #[serde(rename = "transfer")]
    Transfer,
}

/// Patient sex as recorded at intake.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
    Unknown,
}

/// Optional demographics captured at intake.
///
/// Demographics never reach a transfer packet; the redaction step drops them
/// wholesale and records that it did so.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatientDemographics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_years: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<Sex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
}

/// Controlled vocabulary of timeline event types.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineEventType {
    LastKnownWell,
    EdArrival,
    CtStart,
    CtaResult,
    DecisionTime,
    TransferActivated,
}

impl TimelineEventType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LastKnownWell => "LAST_KNOWN_WELL",
            Self::EdArrival => "ED_ARRIVAL",
            Self::CtStart => "CT_START",
            Self::CtaResult => "CTA_RESULT",
            Self::DecisionTime => "DECISION_TIME",
            Self::TransferActivated => "TRANSFER_ACTIVATED",
        }
    }
}

/// How certain the reporting source was about an event timestamp.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCertainty {
    Confirmed,
    Estimated,
    Unknown,
}

/// One entry in a case's coordination timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub event_type: TimelineEventType,
    pub timestamp: DateTime<Utc>,
    /// Who reported the event (e.g. "EMS radio", "ED triage nurse").
    pub source: String,
    pub certainty: EventCertainty,
}

/// Free-text handoff packet with completeness booleans.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub narrative: String,
    pub meds_list_present: bool,
    pub imaging_report_present: bool,
}

/// A single vital-signs reading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VitalsReading {
    pub recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systolic_bp_mmhg: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate_bpm: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spo2_pct: Option<u8>,
}

/// Vital-sign telemetry attached to a case.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    #[serde(default)]
    pub readings: Vec<VitalsReading>,
}

/// The raw intake record for one patient transfer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseInput {
    pub case_id: String,
    pub created_at: DateTime<Utc>,
    pub facility: Facility,
    pub arrival_mode: ArrivalMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demographics: Option<PatientDemographics>,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
    pub packet: Packet,
    #[serde(default)]
    pub telemetry: Telemetry,
}

impl CaseInput {
    /// Returns the meaningful event of `event_type`, if any.
    ///
    /// At most one event of each type is meaningful per case; when upstream
    /// sources report duplicates, the last occurrence in the sequence wins.
    pub fn latest_event(&self, event_type: TimelineEventType) -> Option<&TimelineEvent> {
        self.timeline
            .iter()
            .rev()
            .find(|e| e.event_type == event_type)
    }

    /// True if the timeline carries any event of `event_type`.
    pub fn has_event(&self, event_type: TimelineEventType) -> bool {
        self.latest_event(event_type).is_some()
    }
}
