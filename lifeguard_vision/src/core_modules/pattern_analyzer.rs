// THEORY:
// The `MotionPatternAnalyzer` turns a stream of per-frame `MotionSample`s into a
// short-term description of activity. It keeps a sliding window of recent
// samples (ten seconds by default) and derives three statistics from it:
//
// - how long the subject has been still,
// - how often motion occurs (events per second across the window span),
// - how strong the motion is when it occurs (mean motion percentage).
//
// A fixed, ordered rule list maps those numbers onto a `PatternType`.
//
// The still-time is measured from the most recent motion seen since the last
// reset, not only inside the window. A subject that has not moved for longer
// than the window is exactly the case the alert timeout exists for, so the last
// motion timestamp is remembered past eviction.

use crate::config::PatternConfig;
use crate::core_modules::motion_detector::MotionSample;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Coarse activity label derived from the sample window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    NoActivity,
    MinimalActivity,
    ModerateActivity,
    ActiveSwimming,
    PotentialDrowning,
}

impl PatternType {
    /// Ordered rule list, first match wins.
    pub fn classify(
        no_motion_duration: f64,
        motion_frequency: f64,
        average_motion_intensity: f64,
        config: &PatternConfig,
    ) -> Self {
        if no_motion_duration > config.alert_timeout_secs {
            PatternType::PotentialDrowning
        } else if motion_frequency > config.active_swimming_frequency {
            PatternType::ActiveSwimming
        } else if average_motion_intensity > config.moderate_intensity {
            PatternType::ModerateActivity
        } else if average_motion_intensity > config.minimal_intensity {
            PatternType::MinimalActivity
        } else {
            PatternType::NoActivity
        }
    }

    pub fn is_alarming(self) -> bool {
        self == PatternType::PotentialDrowning
    }
}

/// Statistics of the current sample window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternAnalysis {
    /// Seconds since the last motion, never negative.
    pub no_motion_duration: f64,
    /// Motion samples per second across the window span.
    pub motion_frequency: f64,
    /// Mean motion percentage over the samples that had motion.
    pub average_motion_intensity: f64,
    pub pattern_type: PatternType,
    /// Samples in the window after this update.
    pub window_len: usize,
}

impl PatternAnalysis {
    fn empty() -> Self {
        Self {
            no_motion_duration: 0.0,
            motion_frequency: 0.0,
            average_motion_intensity: 0.0,
            pattern_type: PatternType::NoActivity,
            window_len: 0,
        }
    }

    /// True when there was nothing to analyse; callers treat this as unknown.
    pub fn is_empty_window(&self) -> bool {
        self.window_len == 0
    }
}

#[derive(Debug, Clone)]
struct WindowEntry {
    timestamp: Duration,
    motion_detected: bool,
    motion_percentage: f64,
}

/// Sliding-window aggregator over recent motion samples.
pub struct MotionPatternAnalyzer {
    config: PatternConfig,
    window: VecDeque<WindowEntry>,
    last_motion_at: Option<Duration>,
    observing_since: Option<Duration>,
}

impl MotionPatternAnalyzer {
    pub fn new(config: PatternConfig) -> Self {
        Self {
            config,
            window: VecDeque::new(),
            last_motion_at: None,
            observing_since: None,
        }
    }

    /// Adds `sample` to the window and analyses the result.
    ///
    /// The sample's timestamp is "now". Samples flagged input-unavailable carry
    /// no observation and are not added, but the window is still evicted and
    /// analysed at that time.
    pub fn analyze(&mut self, sample: &MotionSample) -> PatternAnalysis {
        let now = sample.timestamp;

        if !sample.input_unavailable {
            self.observing_since.get_or_insert(now);
            if sample.motion_detected {
                self.last_motion_at = Some(now);
            }
            self.window.push_back(WindowEntry {
                timestamp: now,
                motion_detected: sample.motion_detected,
                motion_percentage: sample.motion_percentage,
            });
        }

        self.evict_older_than(now);
        self.snapshot(now)
    }

    /// Analysis of the current window at time `now`, without adding a sample.
    pub fn snapshot(&self, now: Duration) -> PatternAnalysis {
        if self.window.is_empty() {
            return PatternAnalysis::empty();
        }

        let reference = self
            .last_motion_at
            .or(self.observing_since)
            .or_else(|| self.window.front().map(|e| e.timestamp))
            .unwrap_or(now);
        let no_motion_duration = now.saturating_sub(reference).as_secs_f64();

        let motion_count = self.window.iter().filter(|e| e.motion_detected).count();

        let motion_frequency = match (self.window.front(), self.window.back()) {
            (Some(oldest), Some(newest)) if self.window.len() >= 2 => {
                let span = newest.timestamp.saturating_sub(oldest.timestamp).as_secs_f64();
                if span > 0.0 { motion_count as f64 / span } else { 0.0 }
            }
            _ => 0.0,
        };

        let average_motion_intensity = if motion_count == 0 {
            0.0
        } else {
            self.window
                .iter()
                .filter(|e| e.motion_detected)
                .map(|e| e.motion_percentage)
                .sum::<f64>()
                / motion_count as f64
        };

        PatternAnalysis {
            no_motion_duration,
            motion_frequency,
            average_motion_intensity,
            pattern_type: PatternType::classify(
                no_motion_duration,
                motion_frequency,
                average_motion_intensity,
                &self.config,
            ),
            window_len: self.window.len(),
        }
    }

    fn evict_older_than(&mut self, now: Duration) {
        let Some(cutoff) = now.checked_sub(self.config.time_window()) else {
            return;
        };
        while self.window.front().is_some_and(|e| e.timestamp < cutoff) {
            self.window.pop_front();
        }
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.last_motion_at = None;
        self.observing_since = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(secs: f64, motion_percentage: f64) -> MotionSample {
        MotionSample {
            timestamp: Duration::from_secs_f64(secs),
            motion_detected: motion_percentage > 0.1,
            motion_percentage,
            motion_pixel_count: 0,
            motion_points: Vec::new(),
            processing_time: Duration::ZERO,
            input_unavailable: false,
            unavailable_reason: None,
        }
    }

    fn analyzer() -> MotionPatternAnalyzer {
        MotionPatternAnalyzer::new(PatternConfig::default())
    }

    #[test]
    fn empty_window_is_neutral() {
        let analysis = analyzer().snapshot(Duration::from_secs(3));
        assert!(analysis.is_empty_window());
        assert_eq!(analysis.pattern_type, PatternType::NoActivity);
        assert_eq!(analysis.no_motion_duration, 0.0);
        assert_eq!(analysis.motion_frequency, 0.0);
    }

    #[test]
    fn single_sample_has_zero_frequency() {
        let analysis = analyzer().analyze(&sample(0.0, 8.0));
        assert_eq!(analysis.window_len, 1);
        assert_eq!(analysis.motion_frequency, 0.0);
        assert_eq!(analysis.average_motion_intensity, 8.0);
        assert_eq!(analysis.pattern_type, PatternType::ModerateActivity);
    }

    #[test]
    fn stillness_becomes_potential_drowning_after_timeout() {
        let mut analyzer = analyzer();
        let mut last = None;
        for tick in 0..=10 {
            last = Some(analyzer.analyze(&sample(tick as f64, 0.0)));
        }
        let at_ten = last.unwrap();
        assert_eq!(at_ten.no_motion_duration, 10.0);
        assert_ne!(at_ten.pattern_type, PatternType::PotentialDrowning);

        let at_eleven = analyzer.analyze(&sample(11.0, 0.0));
        assert!(at_eleven.no_motion_duration > 10.0);
        assert_eq!(at_eleven.pattern_type, PatternType::PotentialDrowning);
        assert!(at_eleven.window_len <= 11);

        let moved = analyzer.analyze(&sample(12.0, 3.0));
        assert_eq!(moved.no_motion_duration, 0.0);
        assert!(!moved.pattern_type.is_alarming());
    }

    #[test]
    fn frequent_motion_is_active_swimming() {
        let mut analyzer = analyzer();
        let mut last = None;
        for tick in 0..10 {
            last = Some(analyzer.analyze(&sample(tick as f64 * 0.5, 2.0)));
        }
        let analysis = last.unwrap();
        // 10 motion samples over a 4.5 s span.
        assert!((analysis.motion_frequency - 10.0 / 4.5).abs() < 1e-9);
        assert_eq!(analysis.pattern_type, PatternType::ActiveSwimming);
    }

    #[test]
    fn intensity_bands() {
        let config = PatternConfig::default();
        assert_eq!(PatternType::classify(0.0, 0.1, 6.0, &config), PatternType::ModerateActivity);
        assert_eq!(PatternType::classify(0.0, 0.1, 1.0, &config), PatternType::MinimalActivity);
        assert_eq!(PatternType::classify(0.0, 0.1, 0.5, &config), PatternType::NoActivity);
        assert_eq!(PatternType::classify(10.5, 3.0, 9.0, &config), PatternType::PotentialDrowning);
    }

    #[test]
    fn old_samples_are_evicted() {
        let mut analyzer = analyzer();
        analyzer.analyze(&sample(0.0, 4.0));
        analyzer.analyze(&sample(5.0, 0.0));
        let analysis = analyzer.analyze(&sample(10.5, 0.0));
        assert_eq!(analysis.window_len, 2);
        assert_eq!(analysis.average_motion_intensity, 0.0);
        // The last motion was at 0 s even though it left the window.
        assert_eq!(analysis.no_motion_duration, 10.5);
        assert_eq!(analysis.pattern_type, PatternType::PotentialDrowning);
    }

    #[test]
    fn unavailable_samples_are_not_observations() {
        let mut analyzer = analyzer();
        analyzer.analyze(&sample(0.0, 4.0));
        let mut gap = sample(3.0, 0.0);
        gap.input_unavailable = true;
        let analysis = analyzer.analyze(&gap);
        assert_eq!(analysis.window_len, 1);
        assert_eq!(analysis.no_motion_duration, 3.0);
    }

    #[test]
    fn reset_clears_window_and_motion_memory() {
        let mut analyzer = analyzer();
        analyzer.analyze(&sample(0.0, 4.0));
        analyzer.reset();
        assert_eq!(analyzer.window_len(), 0);
        let analysis = analyzer.analyze(&sample(20.0, 0.0));
        assert_eq!(analysis.no_motion_duration, 0.0);
    }
}
