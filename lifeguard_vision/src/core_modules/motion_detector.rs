// THEORY:
// The `MotionDetector` is the first stage of the temporal analysis layer. It owns
// the one piece of memory frame differencing needs, the previous frame, and turns
// every incoming frame into a `MotionSample`.
//
// Key architectural principles:
// 1.  **Frame differencing**: both frames are reduced to gray levels and compared
//     pixel by pixel. A pixel moved when its delta is strictly above the
//     configured threshold.
// 2.  **Ownership hand-off**: after a successful comparison the new frame replaces
//     the stored one; the old frame is dropped.
// 3.  **Degrade, don't fail**: a missing or undecodable frame yields a sample
//     flagged `input_unavailable` and leaves the stored frame untouched, so one
//     bad frame cannot halt monitoring.
// 4.  **Bounded payloads**: only the first N motion points in scan order are kept.

use crate::config::MotionConfig;
use crate::core_modules::frame::Frame;
use crate::core_modules::smart_pixel::smart_pixel::absolute_difference;
use crate::error::{Result, VisionError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One pixel that changed between two frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionPoint {
    pub x: u32,
    pub y: u32,
    /// The gray-level delta that made this pixel count as motion.
    pub intensity: u8,
}

/// The result of comparing one frame against its predecessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Session-clock time of the tick that produced this sample.
    pub timestamp: Duration,
    pub motion_detected: bool,
    /// Share of moving pixels in percent, rounded to two decimals.
    pub motion_percentage: f64,
    pub motion_pixel_count: usize,
    /// The first moving pixels in scan order, capped by configuration.
    pub motion_points: Vec<MotionPoint>,
    pub processing_time: Duration,
    /// Set when no usable frame was available for this tick.
    pub input_unavailable: bool,
    pub unavailable_reason: Option<String>,
}

impl MotionSample {
    fn still(timestamp: Duration, processing_time: Duration) -> Self {
        Self {
            timestamp,
            motion_detected: false,
            motion_percentage: 0.0,
            motion_pixel_count: 0,
            motion_points: Vec::new(),
            processing_time,
            input_unavailable: false,
            unavailable_reason: None,
        }
    }

    fn unavailable(timestamp: Duration, reason: String, processing_time: Duration) -> Self {
        Self {
            input_unavailable: true,
            unavailable_reason: Some(reason),
            ..Self::still(timestamp, processing_time)
        }
    }
}

/// Holds the previous frame and produces one `MotionSample` per tick.
pub struct MotionDetector {
    config: MotionConfig,
    previous_frame: Option<Frame>,
    frames_processed: u64,
    motion_frames: u64,
}

impl MotionDetector {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            previous_frame: None,
            frames_processed: 0,
            motion_frames: 0,
        }
    }

    /// Compares `input` against the stored frame.
    ///
    /// An `Err` input is reported as an input-unavailable sample and never
    /// touches the stored frame.
    pub fn process(&mut self, input: Result<Frame>, timestamp: Duration) -> MotionSample {
        let started = Instant::now();

        let frame = match input {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "frame unavailable, keeping previous frame");
                return MotionSample::unavailable(timestamp, err.to_string(), started.elapsed());
            }
        };

        let Some(previous) = &self.previous_frame else {
            debug!("first frame stored as reference");
            self.previous_frame = Some(frame);
            self.frames_processed += 1;
            return MotionSample::still(timestamp, started.elapsed());
        };

        if previous.dimensions() != frame.dimensions() {
            debug!(
                previous = ?previous.dimensions(),
                current = ?frame.dimensions(),
                "frame geometry changed, restarting reference"
            );
            self.previous_frame = Some(frame);
            self.frames_processed += 1;
            return MotionSample::still(timestamp, started.elapsed());
        }

        let delta = match absolute_difference(previous, &frame) {
            Ok(delta) => delta,
            Err(err) => {
                return MotionSample::unavailable(timestamp, err.to_string(), started.elapsed());
            }
        };

        let mut motion_pixel_count = 0usize;
        let mut motion_points = Vec::with_capacity(self.config.max_motion_points.min(delta.len()));
        for (index, intensity) in delta.samples.iter().enumerate() {
            if (*intensity as f64) <= self.config.motion_threshold {
                continue;
            }
            motion_pixel_count += 1;
            if motion_points.len() < self.config.max_motion_points {
                motion_points.push(MotionPoint {
                    x: (index % delta.width as usize) as u32,
                    y: (index / delta.width as usize) as u32,
                    intensity: *intensity,
                });
            }
        }

        let motion_percentage = percentage_of(motion_pixel_count, delta.len());
        let motion_detected = motion_percentage > self.config.min_motion_percentage;

        self.frames_processed += 1;
        if motion_detected {
            self.motion_frames += 1;
        }
        // The new frame becomes the reference; the old one is dropped here.
        self.previous_frame = Some(frame);

        MotionSample {
            timestamp,
            motion_detected,
            motion_percentage,
            motion_pixel_count,
            motion_points,
            processing_time: started.elapsed(),
            input_unavailable: false,
            unavailable_reason: None,
        }
    }

    /// Reports a tick with no frame at all.
    pub fn skip(&mut self, reason: impl Into<String>, timestamp: Duration) -> MotionSample {
        self.process(Err(VisionError::input_unavailable(reason)), timestamp)
    }

    /// Forgets the previous frame and the lifetime counters.
    pub fn reset(&mut self) {
        self.previous_frame = None;
        self.frames_processed = 0;
        self.motion_frames = 0;
    }

    pub fn has_previous_frame(&self) -> bool {
        self.previous_frame.is_some()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn motion_frames(&self) -> u64 {
        self.motion_frames
    }
}

/// `100 * part / total`, rounded to two decimals. Zero when `total` is zero.
pub fn percentage_of(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = 100.0 * part as f64 / total as f64;
    (raw * 100.0).round() / 100.0
}
