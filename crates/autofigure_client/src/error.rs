use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unsupported file: {0}")]
    UnsupportedFile(String),
    #[error("file too large (max {max_bytes}, actual {actual})")]
    TooLarge { max_bytes: u64, actual: u64 },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Request(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Why a job could not be created, classified for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("not authorized: {0}")]
    Authorization(String),
    #[error("server unavailable: {0}")]
    Transient(String),
}

impl From<ApiError> for SubmissionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, message } => match status {
                400 | 422 => SubmissionError::Validation(message),
                401 | 403 => SubmissionError::Authorization(message),
                _ => SubmissionError::Transient(message),
            },
            ApiError::UnsupportedFile(_) | ApiError::TooLarge { .. } => {
                SubmissionError::Validation(err.to_string())
            }
            other => SubmissionError::Transient(other.to_string()),
        }
    }
}

/// Live channel failures. All of them are retried by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("failed to connect: {0}")]
    Connect(String),
    #[error("server returned status {0}")]
    HttpStatus(u16),
    #[error("stream interrupted: {0}")]
    Interrupted(String),
}
