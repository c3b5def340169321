// THEORY:
// The `AlertCooldownController` is the last stage of a tick. It converts the
// classifier's verdict into two kinds of output:
//
// 1.  **Beeper transitions**: a single `beeping_active` flag shared by every
//     category. Distress starts it, recovery (swimming) stops it, and plain
//     monitoring lets it time out.
// 2.  **Alert events**: candidates per category (`drowning`, `motion`) pass a
//     cooldown gate. A candidate that arrives while its category is cooling down
//     is dropped, never queued or retried. At most one event leaves per tick, and
//     a drowning event wins over a motion event.
//
// All timers are session-clock `Duration`s, so wall-clock adjustments cannot
// reset them. The controller runs for the lifetime of a session; `reset` returns
// it to the state it was constructed in.

use crate::config::AlertConfig;
use crate::core_modules::behavior::{Behavior, BehaviorRecord};
use crate::core_modules::pattern_analyzer::{PatternAnalysis, PatternType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    Drowning,
    Motion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

/// Whether a category is currently cooling down after an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryState {
    Inactive,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The subject was seen swimming again.
    Recovered,
    /// Nothing alarming for long enough under plain monitoring.
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "reason")]
pub enum BeepAction {
    #[default]
    None,
    Start,
    Stop(StopReason),
}

/// An alert handed to the notification collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub category: AlertCategory,
    pub severity: Severity,
    pub message: String,
    pub behavior: Behavior,
    pub confidence: f64,
    /// Session-clock time of the tick that raised the alert.
    pub session_time: Duration,
    pub timestamp: DateTime<Utc>,
}

/// Per-category timestamps on the session clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryTimes {
    pub drowning: Option<Duration>,
    pub motion: Option<Duration>,
}

impl CategoryTimes {
    pub fn get(&self, category: AlertCategory) -> Option<Duration> {
        match category {
            AlertCategory::Drowning => self.drowning,
            AlertCategory::Motion => self.motion,
        }
    }

    fn set(&mut self, category: AlertCategory, at: Duration) {
        match category {
            AlertCategory::Drowning => self.drowning = Some(at),
            AlertCategory::Motion => self.motion = Some(at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlertState {
    pub beeping_active: bool,
    /// When each category last (re)triggered the alarm.
    pub last_trigger: CategoryTimes,
    /// When each category last got an event past the cooldown gate.
    pub last_emitted: CategoryTimes,
}

/// Everything the controller decided for one tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlertDecision {
    pub beep: BeepAction,
    pub alert: Option<AlertEvent>,
    /// Candidates dropped by the cooldown gate this tick.
    pub suppressed: Vec<AlertCategory>,
}

pub struct AlertCooldownController {
    config: AlertConfig,
    state: AlertState,
}

impl AlertCooldownController {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            state: AlertState::default(),
        }
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    pub fn beeping_active(&self) -> bool {
        self.state.beeping_active
    }

    pub fn cooldown(&self, category: AlertCategory) -> Duration {
        let secs = match category {
            AlertCategory::Drowning => self.config.drowning_cooldown_secs,
            AlertCategory::Motion => self.config.motion_cooldown_secs,
        };
        Duration::from_secs_f64(secs)
    }

    pub fn category_state(&self, category: AlertCategory, now: Duration) -> CategoryState {
        match self.state.last_emitted.get(category) {
            Some(at) if now.saturating_sub(at) < self.cooldown(category) => CategoryState::Active,
            _ => CategoryState::Inactive,
        }
    }

    /// Applies one tick's verdict.
    pub fn evaluate(&mut self, record: &BehaviorRecord, pattern: &PatternAnalysis, now: Duration) -> AlertDecision {
        let mut decision = AlertDecision::default();
        let mut drowning_candidate: Option<(Severity, String)> = None;

        match record.behavior {
            Behavior::Drowning => {
                drowning_candidate = Some((
                    Severity::Critical,
                    format!("Drowning detected ({:.0}% confidence)", record.confidence),
                ));
                if !self.state.beeping_active {
                    decision.beep = self.start_beeping(now);
                }
            }
            Behavior::PotentialDrowning => {
                let retrigger = Duration::from_secs_f64(self.config.potential_retrigger_secs);
                if !self.state.beeping_active && self.elapsed_since_trigger(AlertCategory::Drowning, now, retrigger) {
                    drowning_candidate = Some((
                        Severity::High,
                        format!(
                            "Potential drowning: no motion for {:.1}s",
                            pattern.no_motion_duration
                        ),
                    ));
                    decision.beep = self.start_beeping(now);
                }
            }
            Behavior::Swimming => {
                if self.state.beeping_active {
                    decision.beep = self.stop_beeping(StopReason::Recovered);
                }
            }
            Behavior::Monitoring => {
                let auto_stop = Duration::from_secs_f64(self.config.auto_stop_secs);
                if self.state.beeping_active && self.elapsed_since_trigger(AlertCategory::Drowning, now, auto_stop) {
                    decision.beep = self.stop_beeping(StopReason::Timeout);
                }
            }
            Behavior::Unknown => {}
        }

        if let Some((severity, message)) = drowning_candidate {
            if self.pass_gate(AlertCategory::Drowning, now) {
                decision.alert = Some(self.event(AlertCategory::Drowning, severity, message, record, now));
            } else {
                decision.suppressed.push(AlertCategory::Drowning);
            }
        }

        if pattern.pattern_type == PatternType::PotentialDrowning && decision.alert.is_none() {
            if self.pass_gate(AlertCategory::Motion, now) {
                let message = format!("No motion for {:.1}s", pattern.no_motion_duration);
                decision.alert = Some(self.event(AlertCategory::Motion, Severity::Medium, message, record, now));
            } else {
                decision.suppressed.push(AlertCategory::Motion);
            }
        }

        for category in &decision.suppressed {
            debug!(?category, "alert suppressed by cooldown");
        }
        if let Some(event) = &decision.alert {
            warn!(
                category = ?event.category,
                severity = ?event.severity,
                confidence = event.confidence,
                message = %event.message,
                "alert triggered"
            );
        }

        decision
    }

    /// True when no trigger is recorded or the last one is older than `after`.
    fn elapsed_since_trigger(&self, category: AlertCategory, now: Duration, after: Duration) -> bool {
        match self.state.last_trigger.get(category) {
            Some(at) => now.saturating_sub(at) > after,
            None => true,
        }
    }

    fn pass_gate(&mut self, category: AlertCategory, now: Duration) -> bool {
        if self.category_state(category, now) == CategoryState::Active {
            return false;
        }
        self.state.last_emitted.set(category, now);
        self.state.last_trigger.set(category, now);
        true
    }

    fn start_beeping(&mut self, now: Duration) -> BeepAction {
        self.state.beeping_active = true;
        self.state.last_trigger.set(AlertCategory::Drowning, now);
        info!(session_time = ?now, "beeping started");
        BeepAction::Start
    }

    fn stop_beeping(&mut self, reason: StopReason) -> BeepAction {
        self.state.beeping_active = false;
        info!(?reason, "beeping stopped");
        BeepAction::Stop(reason)
    }

    fn event(
        &self,
        category: AlertCategory,
        severity: Severity,
        message: String,
        record: &BehaviorRecord,
        now: Duration,
    ) -> AlertEvent {
        AlertEvent {
            category,
            severity,
            message,
            behavior: record.behavior,
            confidence: record.confidence,
            session_time: now,
            timestamp: Utc::now(),
        }
    }

    pub fn reset(&mut self) {
        self.state = AlertState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn record(behavior: Behavior, at: u64) -> BehaviorRecord {
        BehaviorRecord {
            behavior,
            confidence: 80.0,
            timestamp: secs(at),
        }
    }

    fn calm() -> PatternAnalysis {
        PatternAnalysis {
            no_motion_duration: 0.0,
            motion_frequency: 1.0,
            average_motion_intensity: 3.0,
            pattern_type: PatternType::ActiveSwimming,
            window_len: 10,
        }
    }

    fn still(for_secs: f64) -> PatternAnalysis {
        PatternAnalysis {
            no_motion_duration: for_secs,
            motion_frequency: 0.0,
            average_motion_intensity: 0.0,
            pattern_type: PatternType::PotentialDrowning,
            window_len: 10,
        }
    }

    fn controller() -> AlertCooldownController {
        AlertCooldownController::new(AlertConfig::default())
    }

    #[test]
    fn drowning_cooldown_suppresses_then_releases() {
        let mut c = controller();

        let first = c.evaluate(&record(Behavior::Drowning, 0), &calm(), secs(0));
        assert_eq!(first.beep, BeepAction::Start);
        let event = first.alert.expect("first drowning fires");
        assert_eq!(event.category, AlertCategory::Drowning);
        assert_eq!(event.severity, Severity::Critical);
        assert_eq!(event.confidence, 80.0);
        assert!(c.beeping_active());

        let second = c.evaluate(&record(Behavior::Drowning, 5), &calm(), secs(5));
        assert_eq!(second.beep, BeepAction::None);
        assert!(second.alert.is_none());
        assert_eq!(second.suppressed, vec![AlertCategory::Drowning]);
        assert_eq!(c.category_state(AlertCategory::Drowning, secs(5)), CategoryState::Active);

        let third = c.evaluate(&record(Behavior::Drowning, 31), &calm(), secs(31));
        assert!(third.alert.is_some());
        assert!(third.suppressed.is_empty());
    }

    #[test]
    fn potential_drowning_waits_for_retrigger_window() {
        let mut c = controller();
        c.evaluate(&record(Behavior::Drowning, 0), &calm(), secs(0));
        c.evaluate(&record(Behavior::Swimming, 2), &calm(), secs(2));
        assert!(!c.beeping_active());

        let early = c.evaluate(&record(Behavior::PotentialDrowning, 8), &still(6.0), secs(8));
        assert_eq!(early.beep, BeepAction::None);
        assert!(!c.beeping_active());

        let late = c.evaluate(&record(Behavior::PotentialDrowning, 11), &still(6.0), secs(11));
        assert_eq!(late.beep, BeepAction::Start);
        // Beeper starts, but the drowning category is still cooling down.
        assert_eq!(late.suppressed.first(), Some(&AlertCategory::Drowning));
        assert!(c.beeping_active());
    }

    #[test]
    fn potential_drowning_alert_is_high_severity() {
        let mut c = controller();
        let decision = c.evaluate(&record(Behavior::PotentialDrowning, 0), &calm(), secs(0));
        assert_eq!(decision.beep, BeepAction::Start);
        assert_eq!(decision.alert.map(|e| e.severity), Some(Severity::High));
    }

    #[test]
    fn swimming_stops_the_beeper() {
        let mut c = controller();
        c.evaluate(&record(Behavior::Drowning, 0), &calm(), secs(0));
        let decision = c.evaluate(&record(Behavior::Swimming, 1), &calm(), secs(1));
        assert_eq!(decision.beep, BeepAction::Stop(StopReason::Recovered));
        assert!(!c.beeping_active());
        let again = c.evaluate(&record(Behavior::Swimming, 2), &calm(), secs(2));
        assert_eq!(again.beep, BeepAction::None);
    }

    #[test]
    fn monitoring_times_out_the_beeper() {
        let mut c = controller();
        c.evaluate(&record(Behavior::Drowning, 0), &calm(), secs(0));
        let early = c.evaluate(&record(Behavior::Monitoring, 20), &calm(), secs(20));
        assert_eq!(early.beep, BeepAction::None);
        assert!(c.beeping_active());
        let late = c.evaluate(&record(Behavior::Monitoring, 31), &calm(), secs(31));
        assert_eq!(late.beep, BeepAction::Stop(StopReason::Timeout));
    }

    #[test]
    fn motion_alert_has_its_own_cooldown() {
        let mut c = controller();
        let first = c.evaluate(&record(Behavior::Monitoring, 11), &still(11.0), secs(11));
        let event = first.alert.expect("motion alert");
        assert_eq!(event.category, AlertCategory::Motion);
        assert_eq!(event.severity, Severity::Medium);
        assert_eq!(first.beep, BeepAction::None);

        let during = c.evaluate(&record(Behavior::Monitoring, 15), &still(15.0), secs(15));
        assert!(during.alert.is_none());
        assert_eq!(during.suppressed, vec![AlertCategory::Motion]);

        let after = c.evaluate(&record(Behavior::Monitoring, 21), &still(21.0), secs(21));
        assert_eq!(after.alert.map(|e| e.category), Some(AlertCategory::Motion));
    }

    #[test]
    fn drowning_event_wins_the_tick() {
        let mut c = controller();
        let decision = c.evaluate(&record(Behavior::Drowning, 12), &still(12.0), secs(12));
        assert_eq!(decision.alert.map(|e| e.category), Some(AlertCategory::Drowning));
        assert!(decision.suppressed.is_empty());
        assert_eq!(c.state().last_emitted.motion, None);
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let mut c = controller();
        c.evaluate(&record(Behavior::Drowning, 0), &still(12.0), secs(0));
        c.reset();
        assert_eq!(*c.state(), AlertState::default());
        assert!(!c.beeping_active());
        let decision = c.evaluate(&record(Behavior::Drowning, 1), &calm(), secs(1));
        assert!(decision.alert.is_some());
    }
}
