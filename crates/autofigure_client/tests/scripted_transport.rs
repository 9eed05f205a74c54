use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use autofigure_client::{
    ApiError, CancelAck, ChannelError, ClientSettings, EventStream, InviteStatus, JobApi,
    JobController, JobRequest, LiveChannel, SseFrame, UploadedFile,
};
use autofigure_core::{Artifact, JobId, JobStatus, RetryPolicy};
use futures_util::stream::{self, StreamExt};
use pretty_assertions::assert_eq;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct FakeApi {
    log_polls: AtomicUsize,
    cancels: AtomicUsize,
}

#[async_trait]
impl JobApi for FakeApi {
    async fn submit(&self, _request: &JobRequest) -> Result<JobId, ApiError> {
        Ok(JobId::new("fake"))
    }

    async fn upload_reference(
        &self,
        _file_name: &str,
        _content_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<UploadedFile, ApiError> {
        Err(ApiError::UnsupportedFile("not scripted".into()))
    }

    async fn cancel(&self, _job_id: &JobId) -> Result<CancelAck, ApiError> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(CancelAck::Cancelled)
    }

    async fn logs(&self, _job_id: &JobId) -> Result<String, ApiError> {
        let n = self.log_polls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("[stdout] poll {n}\n"))
    }

    async fn artifacts(&self, _job_id: &JobId) -> Result<Vec<Artifact>, ApiError> {
        Ok(Vec::new())
    }

    async fn verify_invite(&self, _code: &str) -> Result<InviteStatus, ApiError> {
        Err(ApiError::UnsupportedFile("not scripted".into()))
    }
}

/// Hands out one scripted outcome per connect; refuses once the script runs out.
/// Scripted streams stay open after their frames, like an idle server.
#[derive(Default)]
struct ScriptedChannel {
    script: Mutex<VecDeque<Result<Vec<SseFrame>, ChannelError>>>,
    connects: AtomicUsize,
}

impl ScriptedChannel {
    fn new(script: Vec<Result<Vec<SseFrame>, ChannelError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            connects: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LiveChannel for ScriptedChannel {
    async fn connect(&self, _job_id: &JobId) -> Result<EventStream, ChannelError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(frames)) => Ok(stream::iter(frames.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed()),
            Some(Err(err)) => Err(err),
            None => Err(ChannelError::Connect("script exhausted".into())),
        }
    }
}

fn frame(event: &str, data: serde_json::Value) -> SseFrame {
    SseFrame {
        event: event.to_string(),
        data: data.to_string(),
    }
}

fn controller(api: Arc<FakeApi>, channel: Arc<ScriptedChannel>) -> JobController {
    let settings = ClientSettings {
        retry: RetryPolicy {
            max_retries: 1,
            reconnect_delay: Duration::from_millis(10),
        },
        log_poll_interval: Duration::from_millis(15),
        ..ClientSettings::default()
    };
    JobController::with_transport(settings, api, channel)
}

#[tokio::test]
async fn manual_reconnect_recovers_a_disconnected_session() {
    tracker_logging::initialize_for_tests();
    let api = Arc::new(FakeApi::default());
    let channel = Arc::new(ScriptedChannel::new(vec![
        Err(ChannelError::HttpStatus(503)),
        Err(ChannelError::Connect("refused".into())),
        Ok(vec![
            frame(
                "artifact",
                serde_json::json!({"kind": "icon_nobg", "name": "a.png", "path": "icons/a.png", "url": "/a.png"}),
            ),
            frame("status", serde_json::json!({"state": "finished", "code": 0})),
        ]),
    ]));
    let session = controller(api.clone(), channel.clone()).track(JobId::new("fake"));

    let mut rx = session.watch();
    tokio::time::timeout(WAIT, rx.wait_for(|s| s.status == JobStatus::Disconnected && !s.log_tail.is_empty()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(channel.connects.load(Ordering::SeqCst), 2);

    session.reconnect();
    let snapshot = tokio::time::timeout(WAIT, session.settled()).await.unwrap();
    assert_eq!(snapshot.status, JobStatus::Succeeded);
    assert_eq!(snapshot.current_step, 3);
    assert_eq!(snapshot.step_label, "Extracting icons");
    assert_eq!(channel.connects.load(Ordering::SeqCst), 3);

    // Let the final log fetch land, then polling must stay quiet.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let polls = api.log_polls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(api.log_polls.load(Ordering::SeqCst), polls);
    assert_eq!(api.cancels.load(Ordering::SeqCst), 0);
    session.close().await;
}

#[tokio::test]
async fn reconnect_is_ignored_while_the_channel_is_healthy() {
    tracker_logging::initialize_for_tests();
    let api = Arc::new(FakeApi::default());
    let channel = Arc::new(ScriptedChannel::new(vec![Ok(vec![frame(
        "status",
        serde_json::json!({"state": "started"}),
    )])]));
    let session = controller(api.clone(), channel.clone()).track(JobId::new("fake"));

    tokio::time::sleep(Duration::from_millis(5)).await;
    session.reconnect();
    session.cancel();
    let snapshot = tokio::time::timeout(WAIT, session.settled()).await.unwrap();

    assert_eq!(snapshot.status, JobStatus::Cancelled);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(api.cancels.load(Ordering::SeqCst), 1);
    assert_eq!(channel.connects.load(Ordering::SeqCst), 1);
}
