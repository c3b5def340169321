// THEORY:
// The `BehaviorClassifier` is the behavioural analysis layer. Where the pattern
// analyzer answers "what has the water looked like for the last few seconds", the
// classifier keeps a longer memory (a minute by default) and answers "what is the
// swimmer doing".
//
// Key architectural principles:
// 1.  **Rolling history**: each tick appends one entry (motion share, pattern,
//     still-time, presence hint). Entries are evicted by age.
// 2.  **Ordered rule list**: the decision table is a static slice of rules over
//     statistics of the newest entries. The first rule that matches wins, which
//     keeps the outcome reproducible and testable without any clock.
// 3.  **Self-agreement confidence**: a deliberately simpler per-entry vote is run
//     over the newest few entries. Confidence is the share of votes that agree
//     with the table's verdict.

use crate::config::BehaviorConfig;
use crate::core_modules::motion_detector::MotionSample;
use crate::core_modules::pattern_analyzer::{PatternAnalysis, PatternType};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// What the classifier believes the subject is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    #[default]
    Unknown,
    Monitoring,
    Swimming,
    PotentialDrowning,
    Drowning,
}

impl Behavior {
    pub fn is_distress(self) -> bool {
        matches!(self, Behavior::PotentialDrowning | Behavior::Drowning)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorRecord {
    pub behavior: Behavior,
    /// Agreement of recent per-entry votes with `behavior`, 0-100.
    pub confidence: f64,
    pub timestamp: Duration,
}

#[derive(Debug, Clone, PartialEq)]
struct HistoryEntry {
    timestamp: Duration,
    motion_percentage: f64,
    pattern_type: PatternType,
    no_motion_duration: f64,
    human_present: Option<bool>,
}

/// Statistics the decision table reads.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowStats {
    pub avg_motion: f64,
    /// Population variance of the motion percentage.
    pub motion_variance: f64,
    pub no_motion_count: usize,
    pub dominant_pattern: Option<PatternType>,
}

struct Rule {
    behavior: Behavior,
    applies: fn(&WindowStats, &BehaviorConfig) -> bool,
}

const DECISION_TABLE: &[Rule] = &[
    Rule {
        behavior: Behavior::Drowning,
        applies: prolonged_stillness,
    },
    Rule {
        behavior: Behavior::Swimming,
        applies: vigorous_swimming,
    },
    Rule {
        behavior: Behavior::Swimming,
        applies: varied_motion,
    },
    Rule {
        behavior: Behavior::PotentialDrowning,
        applies: repeated_stillness,
    },
];

fn prolonged_stillness(s: &WindowStats, c: &BehaviorConfig) -> bool {
    s.no_motion_count >= c.drowning_no_motion_count && s.avg_motion < c.drowning_max_avg_motion
}

fn vigorous_swimming(s: &WindowStats, c: &BehaviorConfig) -> bool {
    s.avg_motion > c.vigorous_avg_motion
        && s.motion_variance > c.vigorous_variance
        && s.dominant_pattern == Some(PatternType::ActiveSwimming)
}

fn varied_motion(s: &WindowStats, c: &BehaviorConfig) -> bool {
    s.avg_motion > c.swimming_avg_motion && s.motion_variance > c.swimming_variance
}

fn repeated_stillness(s: &WindowStats, c: &BehaviorConfig) -> bool {
    s.no_motion_count >= c.potential_no_motion_count
}

/// Classifies behaviour from a rolling history of ticks.
pub struct BehaviorClassifier {
    config: BehaviorConfig,
    history: VecDeque<HistoryEntry>,
}

impl BehaviorClassifier {
    pub fn new(config: BehaviorConfig) -> Self {
        Self {
            config,
            history: VecDeque::new(),
        }
    }

    pub fn classify(&mut self, sample: &MotionSample, pattern: &PatternAnalysis) -> BehaviorRecord {
        self.classify_with_presence(sample, pattern, None)
    }

    /// Records the tick and classifies the updated history.
    ///
    /// Input-unavailable samples are not recorded; the history is still aged and
    /// classified at the sample's time.
    pub fn classify_with_presence(
        &mut self,
        sample: &MotionSample,
        pattern: &PatternAnalysis,
        human_present: Option<bool>,
    ) -> BehaviorRecord {
        let now = sample.timestamp;
        if !sample.input_unavailable {
            self.history.push_back(HistoryEntry {
                timestamp: now,
                motion_percentage: sample.motion_percentage,
                pattern_type: pattern.pattern_type,
                no_motion_duration: pattern.no_motion_duration,
                human_present,
            });
        }
        self.evict_older_than(now);

        if self.history.is_empty() {
            return BehaviorRecord {
                behavior: Behavior::Unknown,
                confidence: 0.0,
                timestamp: now,
            };
        }

        let stats = self.window_stats();
        let behavior = DECISION_TABLE
            .iter()
            .find(|rule| (rule.applies)(&stats, &self.config))
            .map(|rule| rule.behavior)
            .unwrap_or(Behavior::Monitoring);

        BehaviorRecord {
            behavior,
            confidence: self.confidence_for(behavior),
            timestamp: now,
        }
    }

    /// Statistics over the newest `classification_entries` entries.
    pub fn window_stats(&self) -> WindowStats {
        let recent: Vec<&HistoryEntry> = newest(&self.history, self.config.classification_entries).collect();
        let count = recent.len();
        if count == 0 {
            return WindowStats {
                avg_motion: 0.0,
                motion_variance: 0.0,
                no_motion_count: 0,
                dominant_pattern: None,
            };
        }

        let avg_motion = recent.iter().map(|e| e.motion_percentage).sum::<f64>() / count as f64;
        let motion_variance = recent
            .iter()
            .map(|e| (e.motion_percentage - avg_motion).powi(2))
            .sum::<f64>()
            / count as f64;
        let no_motion_count = recent
            .iter()
            .filter(|e| e.no_motion_duration > self.config.no_motion_secs)
            .count();

        WindowStats {
            avg_motion,
            motion_variance,
            no_motion_count,
            dominant_pattern: self.dominant_pattern(),
        }
    }

    /// Most frequent pattern across the whole history; ties go to the one seen first.
    fn dominant_pattern(&self) -> Option<PatternType> {
        let mut counts: Vec<(PatternType, usize)> = Vec::new();
        for entry in &self.history {
            match counts.iter_mut().find(|(pattern, _)| *pattern == entry.pattern_type) {
                Some((_, n)) => *n += 1,
                None => counts.push((entry.pattern_type, 1)),
            }
        }
        let best = counts.iter().map(|(_, n)| *n).max()?;
        counts.into_iter().find(|(_, n)| *n == best).map(|(pattern, _)| pattern)
    }

    fn entry_vote(&self, entry: &HistoryEntry) -> Behavior {
        let c = &self.config;
        if entry.no_motion_duration > c.no_motion_secs && entry.motion_percentage < c.entry_drowning_max_motion {
            Behavior::Drowning
        } else if entry.motion_percentage > c.entry_swimming_min_motion {
            Behavior::Swimming
        } else {
            Behavior::Monitoring
        }
    }

    fn confidence_for(&self, behavior: Behavior) -> f64 {
        let votes: Vec<Behavior> = newest(&self.history, self.config.confidence_entries)
            .map(|entry| self.entry_vote(entry))
            .collect();
        if votes.is_empty() {
            return 0.0;
        }
        let agreeing = votes.iter().filter(|vote| **vote == behavior).count();
        100.0 * agreeing as f64 / votes.len() as f64
    }

    fn evict_older_than(&mut self, now: Duration) {
        let Some(cutoff) = now.checked_sub(Duration::from_secs_f64(self.config.history_secs)) else {
            return;
        };
        while self.history.front().is_some_and(|e| e.timestamp < cutoff) {
            self.history.pop_front();
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Share of recorded ticks that carried a positive presence hint, if any did.
    pub fn presence_ratio(&self) -> Option<f64> {
        let hinted: Vec<bool> = self.history.iter().filter_map(|e| e.human_present).collect();
        if hinted.is_empty() {
            return None;
        }
        Some(hinted.iter().filter(|present| **present).count() as f64 / hinted.len() as f64)
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

fn newest<T>(history: &VecDeque<T>, n: usize) -> impl Iterator<Item = &T> {
    history.iter().skip(history.len().saturating_sub(n))
}
