use autofigure_core::{Artifact, JobId};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use url::Url;

use crate::types::{CancelResponse, ErrorBody, SubmitResponse};
use crate::{ApiError, CancelAck, ClientSettings, InviteStatus, JobRequest, UploadedFile};

/// Request/response endpoints of the generation server.
#[async_trait::async_trait]
pub trait JobApi: Send + Sync {
    async fn submit(&self, request: &JobRequest) -> Result<JobId, ApiError>;

    async fn upload_reference(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, ApiError>;

    async fn cancel(&self, job_id: &JobId) -> Result<CancelAck, ApiError>;

    /// Full text of the job's process log.
    async fn logs(&self, job_id: &JobId) -> Result<String, ApiError>;

    /// Every artifact currently on disk for the job.
    async fn artifacts(&self, job_id: &JobId) -> Result<Vec<Artifact>, ApiError>;

    async fn verify_invite(&self, code: &str) -> Result<InviteStatus, ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpJobApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpJobApi {
    pub fn new(settings: &ClientSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base: parse_base_url(&settings.base_url)?,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|err| ApiError::InvalidUrl(format!("{path}: {err}")))
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let response = check_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[async_trait::async_trait]
impl JobApi for HttpJobApi {
    async fn submit(&self, request: &JobRequest) -> Result<JobId, ApiError> {
        let response = self
            .client
            .post(self.endpoint("api/run")?)
            .json(request)
            .send()
            .await?;
        let body: SubmitResponse = Self::read_json(response).await?;
        Ok(body.job_id)
    }

    async fn upload_reference(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, ApiError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let form = Form::new().part("file", part);
        let response = self
            .client
            .post(self.endpoint("api/upload")?)
            .multipart(form)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn cancel(&self, job_id: &JobId) -> Result<CancelAck, ApiError> {
        let response = self
            .client
            .post(self.endpoint(&format!("api/cancel/{job_id}"))?)
            .send()
            .await?;
        let body: CancelResponse = Self::read_json(response).await?;
        Ok(body.status)
    }

    async fn logs(&self, job_id: &JobId) -> Result<String, ApiError> {
        let response = self
            .client
            .get(self.endpoint(&format!("api/logs/{job_id}"))?)
            .send()
            .await?;
        Ok(check_status(response).await?.text().await?)
    }

    async fn artifacts(&self, job_id: &JobId) -> Result<Vec<Artifact>, ApiError> {
        let response = self
            .client
            .get(self.endpoint(&format!("api/artifacts-list/{job_id}"))?)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn verify_invite(&self, code: &str) -> Result<InviteStatus, ApiError> {
        let response = self
            .client
            .post(self.endpoint("api/verify-code")?)
            .json(&serde_json::json!({ "code": code }))
            .send()
            .await?;
        Self::read_json(response).await
    }
}

/// Parses the server base URL so that relative endpoint paths join below it.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).map_err(|err| ApiError::InvalidUrl(format!("{raw}: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ApiError::InvalidUrl(format!("unsupported scheme {other}"))),
    }
}

/// Turns a server-relative artifact URL into an absolute one.
pub fn resolve_artifact_url(base_url: &str, artifact_url: &str) -> String {
    parse_base_url(base_url)
        .ok()
        .and_then(|base| base.join(artifact_url).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| artifact_url.to_string())
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        message: error_message(&body, status),
    })
}

fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    let parsed = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.error.or(body.detail));
    match parsed {
        Some(message) => message,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let base = parse_base_url("http://host:8000/prefix").unwrap();
        assert_eq!(base.join("api/run").unwrap().as_str(), "http://host:8000/prefix/api/run");
    }

    #[test]
    fn base_url_rejects_other_schemes() {
        assert!(matches!(
            parse_base_url("ftp://host"),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn artifact_urls_resolve_against_host_root() {
        assert_eq!(
            resolve_artifact_url("http://host:8000", "/api/artifacts/j/final.svg"),
            "http://host:8000/api/artifacts/j/final.svg"
        );
        assert_eq!(
            resolve_artifact_url("not a url", "/api/artifacts/j/final.svg"),
            "/api/artifacts/j/final.svg"
        );
    }

    #[test]
    fn error_message_prefers_server_text() {
        let status = reqwest::StatusCode::FORBIDDEN;
        assert_eq!(error_message(r#"{"error":"invite invalid"}"#, status), "invite invalid");
        assert_eq!(error_message(r#"{"detail":"Job not found"}"#, status), "Job not found");
        assert_eq!(error_message("", status), "Forbidden");
    }
}
