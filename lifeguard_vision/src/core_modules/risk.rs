// THEORY:
// A coarse, single-tick risk label that predates the behaviour classifier. It
// only looks at the latest presence hint, whether this frame moved, and how long
// the subject has been still. It is reported next to the classifier's verdict
// for operators who read the simpler label, and feeds no decision.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    NoHumanDetected,
    ActiveSwimming,
    PotentialDrowning,
    MinimalMotion,
    Unknown,
}

/// `human_present` is `None` until the first presence hint arrives.
pub fn assess_risk(
    human_present: Option<bool>,
    motion_detected: bool,
    no_motion_duration: f64,
    alert_timeout_secs: f64,
) -> RiskLevel {
    match human_present {
        None => RiskLevel::Unknown,
        Some(false) => RiskLevel::NoHumanDetected,
        Some(true) if motion_detected => RiskLevel::ActiveSwimming,
        Some(true) if no_motion_duration > alert_timeout_secs => RiskLevel::PotentialDrowning,
        Some(true) => RiskLevel::MinimalMotion,
    }
}
