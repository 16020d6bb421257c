//! Error taxonomy for the flight log analysis pipeline.
//!
//! These are semantic kinds, not a type per component: most components
//! (C5, C6, C7) never let an error escape their public API at all — they
//! degrade to a neutral value and log a warning. Only C4 (`ModelNotReady`)
//! and C9 (`SinkUnavailable`) propagate errors to their caller; C8 absorbs
//! everything else into a neutral result.

use thiserror::Error;

/// A single named error code, mirroring the taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorCode {
    InvalidInput,
    ModelNotReady,
    Canceled,
    Internal,
    SinkUnavailable,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::ModelNotReady => "MODEL_NOT_READY",
            Self::Canceled => "CANCELED",
            Self::Internal => "INTERNAL",
            Self::SinkUnavailable => "SINK_UNAVAILABLE",
        };
        f.write_str(s)
    }
}

/// Errors that can cross a component boundary.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model not ready for class {class}")]
    ModelNotReady { class: String },

    #[error("analysis canceled: {0}")]
    Canceled(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("sink unavailable: {0}")]
    SinkUnavailable(String),
}

impl PipelineError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::ModelNotReady { .. } => ErrorCode::ModelNotReady,
            Self::Canceled(_) => ErrorCode::Canceled,
            Self::Internal(_) => ErrorCode::Internal,
            Self::SinkUnavailable(_) => ErrorCode::SinkUnavailable,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
