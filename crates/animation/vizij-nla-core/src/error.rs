//! Error types for structural and editing operations.
//!
//! Evaluation itself never fails: unresolved paths, broken drivers and degenerate
//! geometry degrade locally (see [`SkipReason`](crate::report::SkipReason)). The
//! errors below are returned by operations that change the data model.

use serde::{Deserialize, Serialize};

use crate::ids::ActionId;

pub type Result<T> = core::result::Result<T, NlaError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum NlaError {
    /// Action id not present in the library
    #[error("Action not found: {id:?}")]
    ActionNotFound { id: ActionId },

    /// Track index out of range
    #[error("Track not found: index {index}")]
    TrackNotFound { index: usize },

    /// Strip index out of range within a track
    #[error("Strip not found: index {strip} in track {track}")]
    StripNotFound { track: usize, strip: usize },

    /// Keyframe index out of range
    #[error("Keyframe index {index} out of range (len {len})")]
    KeyframeOutOfRange { index: usize, len: usize },

    /// Operation needs keyframes but the curve holds samples (or the reverse)
    #[error("Curve '{path}[{index}]' holds {found}, expected {expected}")]
    CurveDataMismatch {
        path: String,
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// New strip would overlap an existing one
    #[error("Strip '{name}' [{start}, {end}] overlaps an existing strip")]
    StripOverlap { name: String, start: f32, end: f32 },

    /// Strip bounds are inverted or empty
    #[error("Invalid strip range for '{name}': start {start} >= end {end}")]
    InvalidStripRange { name: String, start: f32, end: f32 },

    /// Tweak mode requested while already active, or exited while inactive
    #[error("Invalid tweak state: {reason}")]
    TweakState { reason: String },

    /// Bake window is empty or inverted
    #[error("Invalid frame range: {start}..{end}")]
    InvalidFrameRange { start: f32, end: f32 },

    /// Serialization error
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl NlaError {
    /// Check if this is a recoverable error (the caller can fix input and retry)
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::StripOverlap { .. }
                | Self::InvalidStripRange { .. }
                | Self::TweakState { .. }
                | Self::InvalidFrameRange { .. }
        )
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::ActionNotFound { .. }
            | Self::TrackNotFound { .. }
            | Self::StripNotFound { .. }
            | Self::KeyframeOutOfRange { .. } => "lookup",
            Self::CurveDataMismatch { .. }
            | Self::StripOverlap { .. }
            | Self::InvalidStripRange { .. }
            | Self::InvalidFrameRange { .. } => "validation",
            Self::TweakState { .. } => "state",
            Self::Serialization { .. } => "serialization",
        }
    }
}

impl From<serde_json::Error> for NlaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}
