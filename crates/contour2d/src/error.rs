use thiserror::Error;

/// Errors produced while building or drawing contour geometry.
///
/// Most malformed input degrades into an empty mesh instead of an error; only
/// input that would otherwise read out of bounds, and failures reported by the
/// GPU backend, surface here.
#[derive(Debug, Error)]
pub enum ContourError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("shader program `{label}` failed to compile: {message}")]
    Shader { label: String, message: String },
    #[error("buffer operation failed: {0}")]
    Buffer(String),
    #[error("backend has no resource for handle {0}")]
    UnknownHandle(u32),
}

pub type Result<T> = std::result::Result<T, ContourError>;

pub(crate) fn invalid_argument(message: impl Into<String>) -> ContourError {
    ContourError::InvalidArgument(message.into())
}
