use std::path::Path;
use std::sync::Arc;

use autofigure_core::{Artifact, JobId, JobSnapshot, Msg, Notification, TrackerState};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracker_logging::{tracker_info, tracker_warn};

use crate::api::resolve_artifact_url;
use crate::runtime::SessionRuntime;
use crate::{
    ApiError, CancelAck, ClientSettings, HttpJobApi, HttpLiveChannel, InviteStatus, JobApi,
    JobRequest, LiveChannel, SubmissionError, UploadedFile,
};

/// Entry point for the presentation layer: submits jobs and starts tracking sessions.
pub struct JobController {
    api: Arc<dyn JobApi>,
    channel: Arc<dyn LiveChannel>,
    settings: ClientSettings,
}

impl JobController {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let api = Arc::new(HttpJobApi::new(&settings)?);
        let channel = Arc::new(HttpLiveChannel::new(&settings)?);
        Ok(Self::with_transport(settings, api, channel))
    }

    /// Uses caller-provided transports instead of the HTTP ones.
    pub fn with_transport(
        settings: ClientSettings,
        api: Arc<dyn JobApi>,
        channel: Arc<dyn LiveChannel>,
    ) -> Self {
        Self {
            api,
            channel,
            settings,
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Creates a job. Nothing is tracked yet, so a failed submission can simply be retried.
    pub async fn submit(&self, request: &JobRequest) -> Result<JobId, SubmissionError> {
        request.validate()?;
        match self.api.submit(request).await {
            Ok(job_id) => {
                tracker_info!("submitted job {job_id}");
                Ok(job_id)
            }
            Err(err) => {
                let classified = SubmissionError::from(err);
                tracker_warn!("job submission rejected: {classified}");
                Err(classified)
            }
        }
    }

    /// Starts a tracking session for `job_id`. Must be called within a tokio runtime.
    pub fn track(&self, job_id: JobId) -> TrackingSession {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (notify_tx, notifications) = mpsc::unbounded_channel();
        let state = TrackerState::new(self.settings.retry, self.settings.log_poll_interval);
        let (snapshot_tx, snapshot_rx) = watch::channel(state.view());
        let shutdown = CancellationToken::new();

        let runtime = SessionRuntime::new(
            self.api.clone(),
            self.channel.clone(),
            msg_tx.clone(),
            notify_tx,
            snapshot_tx,
            shutdown.clone(),
        );
        let _ = msg_tx.send(Msg::Track(job_id.clone()));
        let task = tokio::spawn(runtime.run(state, msg_rx));
        tracker_info!("tracking job {job_id}");

        TrackingSession {
            job_id,
            msg_tx,
            snapshot_rx,
            notifications,
            shutdown,
            task: Some(task),
        }
    }

    pub async fn submit_and_track(
        &self,
        request: &JobRequest,
    ) -> Result<TrackingSession, SubmissionError> {
        let job_id = self.submit(request).await?;
        Ok(self.track(job_id))
    }

    /// Asks the server to stop a job that is not tracked by this process.
    pub async fn cancel(&self, job_id: &JobId) -> Result<CancelAck, ApiError> {
        self.api.cancel(job_id).await
    }

    /// Uploads a local reference image; pass the returned `path` in [`JobRequest`].
    pub async fn upload_reference(&self, path: &Path) -> Result<UploadedFile, ApiError> {
        let content_type = image_content_type(path)
            .ok_or_else(|| ApiError::UnsupportedFile(path.display().to_string()))?;
        let bytes = tokio::fs::read(path).await?;
        let actual = bytes.len() as u64;
        if actual > self.settings.max_upload_bytes {
            return Err(ApiError::TooLarge {
                max_bytes: self.settings.max_upload_bytes,
                actual,
            });
        }
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "reference.png".to_string());
        self.api
            .upload_reference(&file_name, content_type, bytes)
            .await
    }

    pub async fn verify_invite(&self, code: &str) -> Result<InviteStatus, SubmissionError> {
        match self.api.verify_invite(code).await {
            Ok(status) => Ok(status),
            // Unknown codes come back as 404.
            Err(ApiError::Status {
                status: 404,
                message,
            }) => Err(SubmissionError::Authorization(message)),
            Err(err) => Err(err.into()),
        }
    }

    pub fn artifact_url(&self, artifact: &Artifact) -> String {
        resolve_artifact_url(&self.settings.base_url, &artifact.url)
    }
}

fn image_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Handle to one job-tracking session.
///
/// Dropping the handle tears the session down: the live channel, reconnect
/// timer and fallback poller are all stopped.
pub struct TrackingSession {
    job_id: JobId,
    msg_tx: mpsc::UnboundedSender<Msg>,
    snapshot_rx: watch::Receiver<JobSnapshot>,
    notifications: mpsc::UnboundedReceiver<Notification>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TrackingSession {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver that observes every snapshot change.
    pub fn watch(&self) -> watch::Receiver<JobSnapshot> {
        self.snapshot_rx.clone()
    }

    pub async fn next_notification(&mut self) -> Option<Notification> {
        self.notifications.recv().await
    }

    /// Returns a queued notification without waiting.
    pub fn try_next_notification(&mut self) -> Option<Notification> {
        self.notifications.try_recv().ok()
    }

    /// Cancels the job. Local status flips to cancelled right away; the
    /// server request runs in the background.
    pub fn cancel(&self) {
        let _ = self.msg_tx.send(Msg::CancelRequested);
    }

    /// Retries the live channel after it was given up on.
    pub fn reconnect(&self) {
        let _ = self.msg_tx.send(Msg::ReconnectRequested);
    }

    /// Waits until nothing further will change the snapshot.
    pub async fn settled(&self) -> JobSnapshot {
        let mut rx = self.snapshot_rx.clone();
        let settled = rx
            .wait_for(|snapshot| snapshot.settled)
            .await
            .map(|snapshot| (*snapshot).clone());
        settled.unwrap_or_else(|_| rx.borrow().clone())
    }

    /// Tears the session down and waits for its task to finish.
    pub async fn close(mut self) {
        let _ = self.msg_tx.send(Msg::Teardown);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
