// THEORY:
// This file is the entry point for the `lifeguard_vision` library crate. It
// exposes a frame-by-frame drowning-detection pipeline to an external caller
// that owns frame acquisition and alert delivery.
//
// The leaf analysis units live in `core_modules` (motion, skin regions, pattern
// window, behaviour classifier, alert controller). `session` ties one instance of
// each into an explicit per-camera context, and `monitor` drives a session as an
// async tick loop over a `FrameSource`. Callers that want their own loop can use
// `MonitoringSession` directly.

pub mod clock;
pub mod config;
pub mod core_modules;
pub mod error;
pub mod frame_source;
pub mod monitor;
pub mod session;
pub mod sinks;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::MonitorConfig;
pub use core_modules::alert_controller::{AlertCategory, AlertEvent, BeepAction, Severity, StopReason};
pub use core_modules::behavior::{Behavior, BehaviorRecord};
pub use core_modules::frame::Frame;
pub use core_modules::pattern_analyzer::{PatternAnalysis, PatternType};
pub use core_modules::risk::RiskLevel;
pub use error::{Result, VisionError};
pub use frame_source::{FramePoll, FrameSource, QueuedFrameSource};
pub use monitor::{Monitor, RunSummary};
pub use session::{DetectionRecord, HumanPresence, MonitoringSession, SessionStatus, TickReport};
pub use sinks::{AlertLog, AlertSink, DetectionLog, DetectionSink};
