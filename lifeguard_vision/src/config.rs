// THEORY:
// The `config` module gathers every tunable constant of the engine into one
// serializable tree. Each analysis stage receives only its own section, so the
// stages stay independent of each other and of how the configuration was
// obtained (defaults, a JSON file, or environment overrides).
//
// Validation happens once, before a session is built. A bad value is a fatal
// `InvalidConfiguration` error rather than something a stage has to guard
// against on every frame.

use crate::error::{Result, VisionError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Deployment preset. Only the default log level differs between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Testing,
    Production,
}

impl Environment {
    pub fn default_log_level(self) -> &'static str {
        match self {
            Environment::Development => "debug",
            Environment::Testing => "info",
            Environment::Production => "warn",
        }
    }
}

impl FromStr for Environment {
    type Err = VisionError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(VisionError::invalid(
                "environment",
                format!("unknown environment `{other}`"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Working width every frame is resampled to by the caller.
    pub working_width: u32,
    pub working_height: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            working_width: 640,
            working_height: 480,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// A pixel is "motion" when its gray-level delta is strictly above this.
    pub motion_threshold: f64,
    /// A frame has motion when this share of pixels (percent) is exceeded.
    pub min_motion_percentage: f64,
    /// Cap on the motion points kept per sample, in scan order.
    pub max_motion_points: usize,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            motion_threshold: 25.0,
            min_motion_percentage: 0.1,
            max_motion_points: 100,
        }
    }
}

/// Skin-tone and "human-like" shape bounds.
///
/// The hue range also accepts sunlit water and wood tones; the defaults are the
/// historical heuristic and are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinConfig {
    pub hue_min: f32,
    pub hue_max: f32,
    pub saturation_min: f32,
    pub saturation_max: f32,
    pub value_min: f32,
    pub value_max: f32,
    /// Connected components smaller than this are noise.
    pub min_component_pixels: usize,
    pub min_region_area: usize,
    pub max_region_area: usize,
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
    /// Fraction of the frame on each side a region's center must stay clear of.
    pub edge_margin: f64,
}

impl Default for SkinConfig {
    fn default() -> Self {
        Self {
            hue_min: 0.0,
            hue_max: 50.0,
            saturation_min: 0.1,
            saturation_max: 0.9,
            value_min: 0.2,
            value_max: 1.0,
            min_component_pixels: 50,
            min_region_area: 1000,
            max_region_area: 50000,
            min_aspect_ratio: 0.3,
            max_aspect_ratio: 1.2,
            edge_margin: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub time_window_secs: f64,
    /// ALERT_TIMEOUT: no-motion duration that marks a potential drowning.
    pub alert_timeout_secs: f64,
    pub active_swimming_frequency: f64,
    pub moderate_intensity: f64,
    pub minimal_intensity: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            time_window_secs: 10.0,
            alert_timeout_secs: 10.0,
            active_swimming_frequency: 0.5,
            moderate_intensity: 5.0,
            minimal_intensity: 0.5,
        }
    }
}

impl PatternConfig {
    pub fn time_window(&self) -> Duration {
        Duration::from_secs_f64(self.time_window_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub history_secs: f64,
    /// How many of the newest entries the decision table looks at.
    pub classification_entries: usize,
    /// How many of the newest entries vote on the confidence.
    pub confidence_entries: usize,
    /// An entry counts as "no motion" above this no-motion duration.
    pub no_motion_secs: f64,
    pub drowning_no_motion_count: usize,
    pub drowning_max_avg_motion: f64,
    pub vigorous_avg_motion: f64,
    pub vigorous_variance: f64,
    pub swimming_avg_motion: f64,
    pub swimming_variance: f64,
    pub potential_no_motion_count: usize,
    /// Single-entry vote: motion share below this with no motion counts as drowning.
    pub entry_drowning_max_motion: f64,
    /// Single-entry vote: motion share above this counts as swimming.
    pub entry_swimming_min_motion: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            history_secs: 60.0,
            classification_entries: 10,
            confidence_entries: 5,
            no_motion_secs: 5.0,
            drowning_no_motion_count: 3,
            drowning_max_avg_motion: 2.0,
            vigorous_avg_motion: 5.0,
            vigorous_variance: 10.0,
            swimming_avg_motion: 3.0,
            swimming_variance: 5.0,
            potential_no_motion_count: 2,
            entry_drowning_max_motion: 2.0,
            entry_swimming_min_motion: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub drowning_cooldown_secs: f64,
    pub motion_cooldown_secs: f64,
    /// A potential drowning only starts the beeper this long after the last trigger.
    pub potential_retrigger_secs: f64,
    /// Beeping stops by itself under `monitoring` after this long.
    pub auto_stop_secs: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            drowning_cooldown_secs: 30.0,
            motion_cooldown_secs: 10.0,
            potential_retrigger_secs: 10.0,
            auto_stop_secs: 30.0,
        }
    }
}

/// Policies that belong to the caller driving the session, not to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Recompute the human-presence hint on every n-th tick.
    pub presence_every_n_ticks: u64,
    /// Back-off while the frame source has nothing new.
    pub idle_poll_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            presence_every_n_ticks: 5,
            idle_poll_ms: 33,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LogConfig {
    /// Explicit filter; falls back to the environment preset when unset.
    pub level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MonitorConfig {
    pub environment: Environment,
    pub frame: FrameConfig,
    pub motion: MotionConfig,
    pub skin: SkinConfig,
    pub pattern: PatternConfig,
    pub behavior: BehaviorConfig,
    pub alert: AlertConfig,
    pub runner: RunnerConfig,
    pub log: LogConfig,
}

impl MonitorConfig {
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }

    /// Builds a configuration from `LIFEGUARD_*` variables on top of the defaults.
    pub fn from_env() -> Result<Self> {
        let environment = match env::var("LIFEGUARD_ENV") {
            Ok(raw) => raw.parse()?,
            Err(_) => Environment::default(),
        };
        let mut config = Self::for_environment(environment);

        config.frame.working_width = env_or_parse("LIFEGUARD_FRAME_WIDTH", config.frame.working_width);
        config.frame.working_height = env_or_parse("LIFEGUARD_FRAME_HEIGHT", config.frame.working_height);
        config.motion.motion_threshold =
            env_or_parse("LIFEGUARD_MOTION_THRESHOLD", config.motion.motion_threshold);
        config.pattern.alert_timeout_secs =
            env_or_parse("LIFEGUARD_ALERT_TIMEOUT_SECS", config.pattern.alert_timeout_secs);
        config.alert.drowning_cooldown_secs = env_or_parse(
            "LIFEGUARD_DROWNING_COOLDOWN_SECS",
            config.alert.drowning_cooldown_secs,
        );
        config.alert.motion_cooldown_secs =
            env_or_parse("LIFEGUARD_MOTION_COOLDOWN_SECS", config.alert.motion_cooldown_secs);
        config.runner.presence_every_n_ticks =
            env_or_parse("LIFEGUARD_PRESENCE_EVERY", config.runner.presence_every_n_ticks);
        config.log.level = env::var("RUST_LOG").ok();

        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn log_level(&self) -> &str {
        self.log
            .level
            .as_deref()
            .unwrap_or_else(|| self.environment.default_log_level())
    }

    /// Rejects values no stage can work with.
    pub fn validate(&self) -> Result<()> {
        let frame = &self.frame;
        if frame.working_width == 0 || frame.working_height == 0 {
            return Err(VisionError::invalid(
                "frame.working_width",
                "working resolution must be non-zero",
            ));
        }

        let motion = &self.motion;
        check_range("motion.motion_threshold", motion.motion_threshold, 0.0, 255.0)?;
        check_range("motion.min_motion_percentage", motion.min_motion_percentage, 0.0, 100.0)?;
        if motion.max_motion_points == 0 {
            return Err(VisionError::invalid("motion.max_motion_points", "must be at least 1"));
        }

        let skin = &self.skin;
        check_range("skin.hue_min", skin.hue_min as f64, 0.0, 360.0)?;
        check_range("skin.hue_max", skin.hue_max as f64, 0.0, 360.0)?;
        check_ordered("skin.hue_max", skin.hue_min as f64, skin.hue_max as f64)?;
        check_range("skin.saturation_min", skin.saturation_min as f64, 0.0, 1.0)?;
        check_range("skin.saturation_max", skin.saturation_max as f64, 0.0, 1.0)?;
        check_ordered("skin.saturation_max", skin.saturation_min as f64, skin.saturation_max as f64)?;
        check_range("skin.value_min", skin.value_min as f64, 0.0, 1.0)?;
        check_range("skin.value_max", skin.value_max as f64, 0.0, 1.0)?;
        check_ordered("skin.value_max", skin.value_min as f64, skin.value_max as f64)?;
        if skin.min_component_pixels == 0 {
            return Err(VisionError::invalid("skin.min_component_pixels", "must be at least 1"));
        }
        if skin.min_region_area == 0 {
            return Err(VisionError::invalid("skin.min_region_area", "must be at least 1"));
        }
        if skin.min_region_area > skin.max_region_area {
            return Err(VisionError::invalid(
                "skin.max_region_area",
                format!("{} is below min_region_area {}", skin.max_region_area, skin.min_region_area),
            ));
        }
        check_positive("skin.min_aspect_ratio", skin.min_aspect_ratio)?;
        check_ordered("skin.max_aspect_ratio", skin.min_aspect_ratio, skin.max_aspect_ratio)?;
        check_finite("skin.edge_margin", skin.edge_margin)?;
        if !(0.0..0.5).contains(&skin.edge_margin) {
            return Err(VisionError::invalid("skin.edge_margin", "must be within [0, 0.5)"));
        }

        let pattern = &self.pattern;
        check_positive("pattern.time_window_secs", pattern.time_window_secs)?;
        check_duration("pattern.time_window_secs", pattern.time_window_secs)?;
        check_positive("pattern.alert_timeout_secs", pattern.alert_timeout_secs)?;
        check_duration("pattern.alert_timeout_secs", pattern.alert_timeout_secs)?;
        check_non_negative("pattern.active_swimming_frequency", pattern.active_swimming_frequency)?;
        check_non_negative("pattern.moderate_intensity", pattern.moderate_intensity)?;
        check_non_negative("pattern.minimal_intensity", pattern.minimal_intensity)?;

        let behavior = &self.behavior;
        check_positive("behavior.history_secs", behavior.history_secs)?;
        check_duration("behavior.history_secs", behavior.history_secs)?;
        if behavior.classification_entries == 0 {
            return Err(VisionError::invalid("behavior.classification_entries", "must be at least 1"));
        }
        if behavior.confidence_entries == 0 {
            return Err(VisionError::invalid("behavior.confidence_entries", "must be at least 1"));
        }
        check_duration("behavior.no_motion_secs", behavior.no_motion_secs)?;
        for (field, value) in [
            ("behavior.drowning_max_avg_motion", behavior.drowning_max_avg_motion),
            ("behavior.vigorous_avg_motion", behavior.vigorous_avg_motion),
            ("behavior.vigorous_variance", behavior.vigorous_variance),
            ("behavior.swimming_avg_motion", behavior.swimming_avg_motion),
            ("behavior.swimming_variance", behavior.swimming_variance),
            ("behavior.entry_drowning_max_motion", behavior.entry_drowning_max_motion),
            ("behavior.entry_swimming_min_motion", behavior.entry_swimming_min_motion),
        ] {
            check_non_negative(field, value)?;
        }

        let alert = &self.alert;
        check_duration("alert.drowning_cooldown_secs", alert.drowning_cooldown_secs)?;
        check_duration("alert.motion_cooldown_secs", alert.motion_cooldown_secs)?;
        check_duration("alert.potential_retrigger_secs", alert.potential_retrigger_secs)?;
        check_duration("alert.auto_stop_secs", alert.auto_stop_secs)?;

        if self.runner.presence_every_n_ticks == 0 {
            return Err(VisionError::invalid("runner.presence_every_n_ticks", "must be at least 1"));
        }

        Ok(())
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(VisionError::invalid(field, format!("{value} is not a finite number")))
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    check_finite(field, value)?;
    if value < min || value > max {
        return Err(VisionError::invalid(field, format!("{value} is outside [{min}, {max}]")));
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: f64) -> Result<()> {
    check_finite(field, value)?;
    if value < 0.0 {
        return Err(VisionError::invalid(field, format!("{value} is negative")));
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<()> {
    check_finite(field, value)?;
    if value <= 0.0 {
        return Err(VisionError::invalid(field, format!("{value} must be positive")));
    }
    Ok(())
}

/// Seconds that must convert into a `Duration` without overflowing.
fn check_duration(field: &'static str, value: f64) -> Result<()> {
    check_non_negative(field, value)?;
    if Duration::try_from_secs_f64(value).is_err() {
        return Err(VisionError::invalid(field, format!("{value} seconds is out of range")));
    }
    Ok(())
}

fn check_ordered(field: &'static str, low: f64, high: f64) -> Result<()> {
    check_finite(field, high)?;
    if low > high {
        return Err(VisionError::invalid(field, format!("range [{low}, {high}] is inverted")));
    }
    Ok(())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Failed to parse env var, using default");
                default
            }
        },
        Err(_) => default,
    }
}
