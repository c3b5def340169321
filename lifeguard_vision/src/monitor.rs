// THEORY:
// The `Monitor` is the tick loop around one `MonitoringSession`. It plays the
// caller's role the core refuses to play itself: it pulls frames from a
// `FrameSource`, reads the clock, refreshes the human-presence hint on its own
// cadence and hands every record and alert to the sinks.
//
// Concurrency model:
// 1.  **One frame at a time**: a tick runs to completion before the next poll.
//     There is no parallelism inside a monitor.
// 2.  **Cooperative stop**: the stop signal is checked once per loop iteration,
//     so a stop lands between ticks, never in the middle of one.
// 3.  **Idle is normal**: `Pending` from the source sleeps for `idle_poll_ms`
//     (or until stop is signalled) and polls again.
// 4.  **Isolation**: each camera gets its own `Monitor` on its own task. Nothing
//     is shared between monitors.

use crate::clock::Clock;
use crate::config::MonitorConfig;
use crate::core_modules::skin_detector::SkinRegionDetector;
use crate::error::Result;
use crate::frame_source::{FramePoll, FrameSource};
use crate::session::{HumanPresence, MonitoringSession, SessionStatus};
use crate::sinks::{AlertSink, DetectionSink};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Counters for one `run`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub unavailable_frames: u64,
    pub alerts_emitted: u64,
    pub idle_polls: u64,
    pub presence_updates: u64,
    /// False when the source ran out instead.
    pub stopped_by_signal: bool,
}

pub struct Monitor<S: FrameSource, C: Clock> {
    camera: String,
    session: MonitoringSession,
    skin: SkinRegionDetector,
    source: S,
    clock: C,
    detection_sinks: Vec<Box<dyn DetectionSink>>,
    alert_sinks: Vec<Box<dyn AlertSink>>,
}

impl<S: FrameSource, C: Clock> Monitor<S, C> {
    pub fn new(camera: impl Into<String>, config: MonitorConfig, source: S, clock: C) -> Result<Self> {
        let skin = SkinRegionDetector::new(config.skin.clone());
        let session = MonitoringSession::new(config)?;
        Ok(Self {
            camera: camera.into(),
            session,
            skin,
            source,
            clock,
            detection_sinks: Vec::new(),
            alert_sinks: Vec::new(),
        })
    }

    pub fn with_detection_sink(mut self, sink: impl DetectionSink + 'static) -> Self {
        self.detection_sinks.push(Box::new(sink));
        self
    }

    pub fn with_alert_sink(mut self, sink: impl AlertSink + 'static) -> Self {
        self.alert_sinks.push(Box::new(sink));
        self
    }

    pub fn camera(&self) -> &str {
        &self.camera
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Runs until the source is exhausted or `stop` reads `true`.
    ///
    /// The session is started on entry and stopped on exit, so every run begins
    /// from empty state and leaves none behind.
    pub async fn run(&mut self, mut stop: watch::Receiver<bool>) -> Result<RunSummary> {
        let runner = self.session.config().runner.clone();
        let idle = Duration::from_millis(runner.idle_poll_ms);
        let mut summary = RunSummary::default();

        self.session.start();
        info!(camera = %self.camera, "monitor started");

        loop {
            if *stop.borrow() {
                summary.stopped_by_signal = true;
                break;
            }

            let input = match self.source.poll_frame() {
                FramePoll::Ready(frame) => Ok(frame),
                FramePoll::Unavailable(err) => Err(err),
                FramePoll::Pending => {
                    summary.idle_polls += 1;
                    tokio::select! {
                        _ = tokio::time::sleep(idle) => {}
                        changed = stop.changed() => {
                            // Sender dropped: nobody can stop us any more, keep pacing.
                            if changed.is_err() {
                                tokio::time::sleep(idle).await;
                            }
                        }
                    }
                    continue;
                }
                FramePoll::Exhausted => break,
            };

            let now = self.clock.now();
            let presence_due = summary.ticks % runner.presence_every_n_ticks == 0;
            if let (true, Ok(frame)) = (presence_due, &input) {
                let regions = self.skin.detect_humans(frame);
                self.session
                    .update_human_presence(HumanPresence::from_regions(regions, now));
                summary.presence_updates += 1;
            }

            let report = self.session.tick(input, now)?;
            summary.ticks += 1;
            if report.detection.input_unavailable {
                summary.unavailable_frames += 1;
            }

            for sink in &mut self.detection_sinks {
                sink.record_detection(&report.detection);
            }
            if let Some(alert) = &report.alert {
                summary.alerts_emitted += 1;
                for sink in &mut self.alert_sinks {
                    sink.notify(alert);
                }
            }

            tokio::task::yield_now().await;
        }

        if summary.unavailable_frames > 0 {
            warn!(
                camera = %self.camera,
                unavailable = summary.unavailable_frames,
                "some frames were unavailable"
            );
        }
        self.session.stop();
        info!(
            camera = %self.camera,
            ticks = summary.ticks,
            alerts = summary.alerts_emitted,
            stopped_by_signal = summary.stopped_by_signal,
            "monitor finished"
        );
        Ok(summary)
    }
}
