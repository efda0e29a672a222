//! Fixed vocabulary and thresholds for the NeuroCast pipeline.
//!
//! These values are intentionally compile-time constants rather than
//! configuration: the routing rules, redaction cap, and vitals thresholds are
//! part of the packet contract, and two deployments disagreeing on them would
//! produce packets that hash identically but mean different things.

/// Version string stamped into every Verified Transfer Packet.
pub const VTP_VERSION: &str = "1.0";

/// Version of the redaction policy applied while assembling a packet.
pub const REDACTION_POLICY_VERSION: &str = "ncast-redaction/1";

/// Disclaimer carried by every routing decision.
pub const SAFETY_DISCLAIMER: &str = "Coordination only. No diagnosis.";

/// Maximum length of a risk-flag evidence quote inside a packet, in characters.
pub const MAX_EVIDENCE_QUOTE_CHARS: usize = 120;

/// Anticoagulant drug names scanned for in the packet narrative.
///
/// Matching is case-insensitive substring search; any hit produces a
/// MEDS/CRITICAL risk flag.
pub const ANTICOAGULANTS: &[&str] = &[
    "warfarin",
    "apixaban",
    "rivaroxaban",
    "dabigatran",
    "edoxaban",
    "enoxaparin",
    "heparin",
];

/// Narrative phrases indicating a possible unknown-onset / wake-up pattern.
pub const WAKE_UP_PHRASES: &[&str] = &[
    "wake-up",
    "woke up with",
    "unknown onset",
    "found down",
];

/// Systolic blood pressure above this is a vitals anomaly (mmHg).
pub const SYSTOLIC_BP_MAX_MMHG: u16 = 190;

/// Heart rate outside this inclusive range is a vitals anomaly (bpm).
pub const HEART_RATE_MIN_BPM: u16 = 50;
pub const HEART_RATE_MAX_BPM: u16 = 120;

/// Oxygen saturation below this is a vitals anomaly (%).
pub const SPO2_MIN_PCT: u8 = 92;

/// Fixed inter-facility transport estimate reported once a transfer is
/// activated (minutes). There is no arrival event to subtract, so the demo
/// reports this constant as the ETA-to-centre timer.
pub const TRANSPORT_ETA_MIN: u32 = 45;

/// Intake guardrails. Bounds the size of untrusted case input before any
/// processing happens.
pub const MAX_NARRATIVE_BYTES: usize = 64 * 1024;
pub const MAX_TIMELINE_EVENTS: usize = 200;
pub const MAX_TELEMETRY_READINGS: usize = 1_000;
pub const MAX_PATIENT_AGE_YEARS: u8 = 130;

/// Default security-gate thresholds on the 0-100 risk score.
pub const GATE_WARN_AT: u8 = 40;
pub const GATE_BLOCK_AT: u8 = 75;
