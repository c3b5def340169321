// THEORY:
// A `MonitoringSession` is the explicit context that owns one complete pipeline:
// a motion detector, a pattern window, a behaviour history and an alert state
// machine. Nothing in it is global, so two cameras are simply two sessions.
//
// A tick runs every stage in order on one frame and returns everything it
// decided:
//
//   frame -> MotionDetector -> MotionSample -> MotionPatternAnalyzer
//         -> PatternAnalysis -> BehaviorClassifier (+ presence hint)
//         -> BehaviorRecord -> AlertCooldownController -> alert / beep
//
// Frame-level failures never leave a tick. A missing, undecodable or wrongly
// sized frame becomes an input-unavailable sample and the stages carry on with
// their previous state. Only configuration errors (at construction) and ticking
// a stopped session are reported as `Err`.

use crate::config::MonitorConfig;
use crate::core_modules::alert_controller::{AlertCooldownController, AlertEvent, BeepAction};
use crate::core_modules::behavior::{Behavior, BehaviorClassifier, BehaviorRecord};
use crate::core_modules::frame::Frame;
use crate::core_modules::motion_detector::{MotionDetector, MotionSample};
use crate::core_modules::pattern_analyzer::{MotionPatternAnalyzer, PatternAnalysis, PatternType};
use crate::core_modules::region::Region;
use crate::core_modules::risk::{RiskLevel, assess_risk};
use crate::error::{Result, VisionError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// The latest human-presence hint, computed by the caller at its own cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanPresence {
    pub human_count: usize,
    pub regions: Vec<Region>,
    /// Session time of the frame the hint was computed from.
    pub observed_at: Duration,
}

impl HumanPresence {
    pub fn from_regions(regions: Vec<Region>, observed_at: Duration) -> Self {
        Self {
            human_count: regions.len(),
            regions,
            observed_at,
        }
    }

    pub fn human_present(&self) -> bool {
        self.human_count > 0
    }
}

/// One row for the persistence collaborator, emitted every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub motion_detected: bool,
    pub motion_percentage: f64,
    pub input_unavailable: bool,
    pub pattern_type: PatternType,
    pub behavior: Behavior,
    pub confidence: f64,
    pub beeping_active: bool,
    /// `None` until the caller has supplied a presence hint.
    pub human_present: Option<bool>,
    pub human_count: Option<usize>,
    pub risk: RiskLevel,
    pub session_time: Duration,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub active: bool,
    pub beeping_active: bool,
    pub last_behavior: Behavior,
    pub confidence: f64,
}

/// Everything one tick decided.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub detection: DetectionRecord,
    /// At most one alert per tick; `None` when nothing fired or it was suppressed.
    pub alert: Option<AlertEvent>,
    pub beep: BeepAction,
    pub sample: MotionSample,
    pub pattern: PatternAnalysis,
}

pub struct MonitoringSession {
    config: MonitorConfig,
    active: bool,
    motion: MotionDetector,
    patterns: MotionPatternAnalyzer,
    behavior: BehaviorClassifier,
    alerts: AlertCooldownController,
    presence: Option<HumanPresence>,
    last_record: Option<BehaviorRecord>,
    ticks: u64,
}

impl MonitoringSession {
    /// Builds an inactive session. Invalid configuration is fatal here.
    pub fn new(config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            motion: MotionDetector::new(config.motion.clone()),
            patterns: MotionPatternAnalyzer::new(config.pattern.clone()),
            behavior: BehaviorClassifier::new(config.behavior.clone()),
            alerts: AlertCooldownController::new(config.alert.clone()),
            config,
            active: false,
            presence: None,
            last_record: None,
            ticks: 0,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Resets every stage and starts accepting ticks.
    pub fn start(&mut self) {
        self.reset_components();
        self.active = true;
        info!(
            width = self.config.frame.working_width,
            height = self.config.frame.working_height,
            "monitoring session started"
        );
    }

    /// Stops accepting ticks and discards all history.
    pub fn stop(&mut self) {
        let ticks = self.ticks;
        self.reset_components();
        self.active = false;
        info!(ticks, "monitoring session stopped");
    }

    fn reset_components(&mut self) {
        self.motion.reset();
        self.patterns.reset();
        self.behavior.reset();
        self.alerts.reset();
        self.presence = None;
        self.last_record = None;
        self.ticks = 0;
    }

    pub fn status(&self) -> SessionStatus {
        let (last_behavior, confidence) = self
            .last_record
            .as_ref()
            .map(|r| (r.behavior, r.confidence))
            .unwrap_or((Behavior::Unknown, 0.0));
        SessionStatus {
            active: self.active,
            beeping_active: self.alerts.beeping_active(),
            last_behavior,
            confidence,
        }
    }

    pub fn human_presence(&self) -> Option<&HumanPresence> {
        self.presence.as_ref()
    }

    pub fn update_human_presence(&mut self, presence: HumanPresence) {
        debug!(human_count = presence.human_count, "presence hint updated");
        self.presence = Some(presence);
    }

    /// Runs one frame, or one missing frame, through every stage.
    pub fn tick(&mut self, input: Result<Frame>, now: Duration) -> Result<TickReport> {
        if !self.active {
            return Err(VisionError::SessionInactive);
        }

        let expected = (self.config.frame.working_width, self.config.frame.working_height);
        let input = input.and_then(|frame| {
            if frame.dimensions() == expected {
                Ok(frame)
            } else {
                Err(VisionError::FrameGeometry {
                    expected,
                    actual: frame.dimensions(),
                })
            }
        });

        let sample = self.motion.process(input, now);
        let pattern = self.patterns.analyze(&sample);
        let human_present = self.presence.as_ref().map(HumanPresence::human_present);
        let record = self
            .behavior
            .classify_with_presence(&sample, &pattern, human_present);
        let decision = self.alerts.evaluate(&record, &pattern, now);

        let detection = DetectionRecord {
            motion_detected: sample.motion_detected,
            motion_percentage: sample.motion_percentage,
            input_unavailable: sample.input_unavailable,
            pattern_type: pattern.pattern_type,
            behavior: record.behavior,
            confidence: record.confidence,
            beeping_active: self.alerts.beeping_active(),
            human_present,
            human_count: self.presence.as_ref().map(|p| p.human_count),
            risk: assess_risk(
                human_present,
                sample.motion_detected,
                pattern.no_motion_duration,
                self.config.pattern.alert_timeout_secs,
            ),
            session_time: now,
            timestamp: Utc::now(),
        };

        debug!(
            tick = self.ticks,
            motion_percentage = sample.motion_percentage,
            pattern = ?pattern.pattern_type,
            behavior = ?record.behavior,
            confidence = record.confidence,
            beeping = detection.beeping_active,
            "tick processed"
        );

        self.ticks += 1;
        self.last_record = Some(record);

        Ok(TickReport {
            detection,
            alert: decision.alert,
            beep: decision.beep,
            sample,
            pattern,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;

    fn small_config() -> MonitorConfig {
        let mut config = MonitorConfig::default();
        config.frame.working_width = 8;
        config.frame.working_height = 8;
        config
    }

    fn gray(level: u8) -> Frame {
        Frame::filled(8, 8, Pixel::new(level, level, level)).unwrap()
    }

    #[test]
    fn ticking_requires_start() {
        let mut session = MonitoringSession::new(small_config()).unwrap();
        let err = session.tick(Ok(gray(0)), Duration::ZERO).unwrap_err();
        assert!(matches!(err, VisionError::SessionInactive));

        session.start();
        assert!(session.tick(Ok(gray(0)), Duration::ZERO).is_ok());
        session.stop();
        assert!(!session.status().active);
        assert!(session.tick(Ok(gray(0)), Duration::ZERO).is_err());
    }

    #[test]
    fn invalid_configuration_prevents_construction() {
        let mut config = small_config();
        config.motion.motion_threshold = -1.0;
        assert!(matches!(
            MonitoringSession::new(config),
            Err(VisionError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn oversized_window_is_rejected_before_any_tick() {
        let mut config = small_config();
        config.pattern.time_window_secs = 1e30;
        assert!(matches!(
            MonitoringSession::new(config),
            Err(VisionError::InvalidConfiguration { field: "pattern.time_window_secs", .. })
        ));

        let mut config = small_config();
        config.alert.motion_cooldown_secs = 1e30;
        assert!(MonitoringSession::new(config).is_err());
    }

    #[test]
    fn wrong_geometry_is_absorbed_as_unavailable() {
        let mut session = MonitoringSession::new(small_config()).unwrap();
        session.start();
        let odd = Frame::filled(4, 4, Pixel::new(0, 0, 0)).unwrap();
        let report = session.tick(Ok(odd), Duration::ZERO).unwrap();
        assert!(report.detection.input_unavailable);
        assert!(!report.detection.motion_detected);
        assert_eq!(report.detection.behavior, Behavior::Unknown);
    }

    #[test]
    fn motion_flows_into_the_record() {
        let mut session = MonitoringSession::new(small_config()).unwrap();
        session.start();
        session.tick(Ok(gray(0)), Duration::ZERO).unwrap();
        let report = session.tick(Ok(gray(200)), Duration::from_secs(1)).unwrap();
        assert!(report.detection.motion_detected);
        assert_eq!(report.detection.motion_percentage, 100.0);
        assert_eq!(report.detection.risk, RiskLevel::Unknown);
        assert_eq!(report.detection.session_time, Duration::from_secs(1));
        assert_eq!(session.ticks(), 2);
    }

    #[test]
    fn presence_hint_is_stamped_on_records() {
        let mut session = MonitoringSession::new(small_config()).unwrap();
        session.start();
        session.update_human_presence(HumanPresence::from_regions(Vec::new(), Duration::ZERO));
        let report = session.tick(Ok(gray(0)), Duration::ZERO).unwrap();
        assert_eq!(report.detection.human_present, Some(false));
        assert_eq!(report.detection.human_count, Some(0));
        assert_eq!(report.detection.risk, RiskLevel::NoHumanDetected);

        // Restarting forgets the hint.
        session.start();
        assert!(session.human_presence().is_none());
    }

    #[test]
    fn status_tracks_last_behavior() {
        let mut session = MonitoringSession::new(small_config()).unwrap();
        assert_eq!(session.status().last_behavior, Behavior::Unknown);
        session.start();
        session.tick(Ok(gray(0)), Duration::ZERO).unwrap();
        let status = session.status();
        assert!(status.active);
        assert!(!status.beeping_active);
        assert_eq!(status.last_behavior, Behavior::Monitoring);
    }
}
