use std::sync::Arc;
use std::time::Duration;

use autofigure_core::{JobId, Msg};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracker_logging::{tracker_debug, tracker_info, tracker_warn};

use crate::JobApi;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polls the log text and artifact list until `token` is cancelled. Failed
/// pulls are skipped for that cycle.
pub(crate) fn spawn_fallback_poller(
    api: Arc<dyn JobApi>,
    job_id: JobId,
    interval: Duration,
    token: CancellationToken,
    msg_tx: mpsc::UnboundedSender<Msg>,
) {
    tokio::spawn(async move {
        tracker_info!("job {job_id}: polling logs and artifacts every {interval:?}");
        let mut ticker = tokio::time::interval(interval.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            let (logs, artifacts) = tokio::select! {
                _ = token.cancelled() => break,
                polled = async {
                    ticker.tick().await;
                    tokio::join!(api.logs(&job_id), api.artifacts(&job_id))
                } => polled,
            };
            let mut msgs = Vec::with_capacity(2);
            match logs {
                Ok(text) => msgs.push(Msg::LogsPolled(text)),
                Err(err) => tracker_debug!("job {job_id}: log poll skipped: {err}"),
            }
            match artifacts {
                Ok(list) => msgs.push(Msg::ArtifactsPolled(list)),
                Err(err) => tracker_debug!("job {job_id}: artifact poll skipped: {err}"),
            }
            if msgs.into_iter().any(|msg| msg_tx.send(msg).is_err()) {
                break;
            }
        }
        tracker_debug!("job {job_id}: fallback polling stopped");
    });
}

/// One-shot reconciliation pull of the artifact list.
pub(crate) fn spawn_artifact_fetch(
    api: Arc<dyn JobApi>,
    job_id: JobId,
    token: CancellationToken,
    msg_tx: mpsc::UnboundedSender<Msg>,
) {
    tokio::spawn(async move {
        let result = tokio::select! {
            _ = token.cancelled() => return,
            result = api.artifacts(&job_id) => result,
        };
        let msg = match result {
            Ok(artifacts) => {
                tracker_debug!("job {job_id}: artifact list has {} entries", artifacts.len());
                Msg::ArtifactsListed(artifacts)
            }
            Err(err) => {
                tracker_warn!("job {job_id}: final artifact list failed: {err}");
                Msg::ArtifactsListFailed
            }
        };
        let _ = msg_tx.send(msg);
    });
}

/// One-shot pull of the full log text.
pub(crate) fn spawn_log_fetch(
    api: Arc<dyn JobApi>,
    job_id: JobId,
    token: CancellationToken,
    msg_tx: mpsc::UnboundedSender<Msg>,
) {
    tokio::spawn(async move {
        let result = tokio::select! {
            _ = token.cancelled() => return,
            result = api.logs(&job_id) => result,
        };
        match result {
            Ok(text) => {
                let _ = msg_tx.send(Msg::LogsPolled(text));
            }
            Err(err) => tracker_debug!("job {job_id}: final log fetch failed: {err}"),
        }
    });
}
