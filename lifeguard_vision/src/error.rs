//! Error taxonomy for the vision engine.
//!
//! Per-frame failures (`InputUnavailable`, `Decode`, `FrameGeometry`) never
//! leave a tick: the session turns them into an input-unavailable
//! `MotionSample`. Configuration failures are returned from construction
//! and stop the session from starting.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("input unavailable: {reason}")]
    InputUnavailable { reason: String },

    #[error("frame could not be decoded: {0}")]
    Decode(#[from] image::ImageError),

    #[error("frame is {actual:?}, working resolution is {expected:?}")]
    FrameGeometry {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    #[error("configuration file: {0}")]
    ConfigFile(#[from] std::io::Error),

    #[error("configuration parse: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("monitoring session is not active")]
    SessionInactive,
}

impl VisionError {
    pub fn input_unavailable(reason: impl Into<String>) -> Self {
        VisionError::InputUnavailable {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        VisionError::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }

    /// True for errors that only affect the current frame.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            VisionError::InputUnavailable { .. }
                | VisionError::Decode(_)
                | VisionError::FrameGeometry { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, VisionError>;
