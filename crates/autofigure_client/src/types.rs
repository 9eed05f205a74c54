use autofigure_core::JobId;
use serde::{Deserialize, Serialize};

use crate::SubmissionError;

/// Body of `POST /api/run`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct JobRequest {
    pub method_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimize_iterations: Option<u32>,
    /// Server-relative path returned by a reference upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_image_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
}

impl JobRequest {
    pub fn new(method_text: impl Into<String>) -> Self {
        Self {
            method_text: method_text.into(),
            ..Self::default()
        }
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.optimize_iterations = Some(iterations);
        self
    }

    pub fn with_reference(mut self, path: impl Into<String>) -> Self {
        self.reference_image_path = Some(path.into());
        self
    }

    pub fn with_invite_code(mut self, code: impl Into<String>) -> Self {
        self.invite_code = Some(code.into());
        self
    }

    /// Checks what can be checked without asking the server.
    pub fn validate(&self) -> Result<(), SubmissionError> {
        if self.method_text.trim().is_empty() {
            return Err(SubmissionError::Validation(
                "method text must not be empty".to_string(),
            ));
        }
        if matches!(&self.invite_code, Some(code) if code.trim().is_empty()) {
            return Err(SubmissionError::Validation(
                "invite code must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitResponse {
    pub job_id: JobId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedFile {
    pub path: String,
    pub url: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelAck {
    Cancelled,
    AlreadyFinished,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CancelResponse {
    pub status: CancelAck,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InviteStatus {
    pub valid: bool,
    pub code_type: String,
    pub daily_limit: u32,
    pub used_today: u32,
    pub remaining: i64,
}

/// Server error bodies come as `{"error": ..}` or `{"detail": ..}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}
