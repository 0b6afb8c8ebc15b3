//! Generation Context - Errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("Task id cannot be empty")]
    EmptyTaskId,

    #[error("Describe a style or provide lyrics")]
    MissingContent,

    #[error("Duration must be between 10 and 300 seconds, got {0}")]
    DurationOutOfRange(f32),

    #[error("BPM must be between 30 and 300, got {0}")]
    BpmOutOfRange(u16),

    #[error("Batch size must be between 1 and 8, got {0}")]
    BatchSizeOutOfRange(u8),

    #[error("Inference steps must be between 1 and 50, got {0}")]
    InferenceStepsOutOfRange(u8),
}
