use std::sync::Arc;
use std::time::Duration;

use autofigure_core::{update, Effect, JobId, JobSnapshot, LiveEvent, Msg, Notification, TrackerState};
use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracker_logging::{tracker_debug, tracker_info, tracker_trace, tracker_warn};

use crate::poller::{spawn_artifact_fetch, spawn_log_fetch, spawn_fallback_poller};
use crate::{JobApi, LiveChannel};

/// Executes effects for one tracking session.
///
/// All messages are handled sequentially on the task running [`Self::run`];
/// the spawned helpers only report back through `msg_tx`. Every helper holds a
/// child token of `shutdown`, so teardown stops all of them at once.
pub(crate) struct SessionRuntime {
    api: Arc<dyn JobApi>,
    channel: Arc<dyn LiveChannel>,
    msg_tx: mpsc::UnboundedSender<Msg>,
    notify_tx: mpsc::UnboundedSender<Notification>,
    snapshot_tx: watch::Sender<JobSnapshot>,
    shutdown: CancellationToken,
    connection: Option<CancellationToken>,
    reconnect_timer: Option<CancellationToken>,
    fallback_poller: Option<CancellationToken>,
}

impl SessionRuntime {
    pub(crate) fn new(
        api: Arc<dyn JobApi>,
        channel: Arc<dyn LiveChannel>,
        msg_tx: mpsc::UnboundedSender<Msg>,
        notify_tx: mpsc::UnboundedSender<Notification>,
        snapshot_tx: watch::Sender<JobSnapshot>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            api,
            channel,
            msg_tx,
            notify_tx,
            snapshot_tx,
            shutdown,
            connection: None,
            reconnect_timer: None,
            fallback_poller: None,
        }
    }

    pub(crate) async fn run(mut self, mut state: TrackerState, mut msg_rx: mpsc::UnboundedReceiver<Msg>) {
        loop {
            let msg = tokio::select! {
                _ = self.shutdown.cancelled() => Msg::Teardown,
                msg = msg_rx.recv() => msg.unwrap_or(Msg::Teardown),
            };
            let stop = matches!(msg, Msg::Teardown);

            let (next, effects) = update(std::mem::take(&mut state), msg);
            state = next;
            for effect in effects {
                self.apply(effect);
            }
            if state.consume_dirty() {
                self.snapshot_tx.send_replace(state.view());
            }
            if stop {
                break;
            }
        }
        self.shutdown.cancel();
        tracker_debug!("session runtime stopped");
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::OpenChannel { job_id, connection } => self.open_channel(job_id, connection),
            Effect::CloseChannel => cancel_slot(&mut self.connection),
            Effect::ScheduleReconnect { attempt, delay } => self.schedule_reconnect(attempt, delay),
            Effect::CancelReconnect => cancel_slot(&mut self.reconnect_timer),
            Effect::StartFallbackPolling { job_id, interval } => {
                let token = self.replace_slot(SlotKind::FallbackPoller);
                spawn_fallback_poller(self.api.clone(), job_id, interval, token, self.msg_tx.clone());
            }
            Effect::StopFallbackPolling => cancel_slot(&mut self.fallback_poller),
            Effect::FetchArtifacts { job_id } => spawn_artifact_fetch(
                self.api.clone(),
                job_id,
                self.shutdown.child_token(),
                self.msg_tx.clone(),
            ),
            Effect::FetchLogs { job_id } => spawn_log_fetch(
                self.api.clone(),
                job_id,
                self.shutdown.child_token(),
                self.msg_tx.clone(),
            ),
            Effect::SendCancel { job_id } => self.send_cancel(job_id),
            Effect::Notify(notification) => {
                let _ = self.notify_tx.send(notification);
            }
        }
    }

    fn replace_slot(&mut self, kind: SlotKind) -> CancellationToken {
        let token = self.shutdown.child_token();
        let slot = match kind {
            SlotKind::Connection => &mut self.connection,
            SlotKind::ReconnectTimer => &mut self.reconnect_timer,
            SlotKind::FallbackPoller => &mut self.fallback_poller,
        };
        cancel_slot(slot);
        *slot = Some(token.clone());
        token
    }

    fn open_channel(&mut self, job_id: JobId, connection: u64) {
        let token = self.replace_slot(SlotKind::Connection);
        let channel = self.channel.clone();
        let msg_tx = self.msg_tx.clone();
        tracker_info!("job {job_id}: opening live channel (connection {connection})");
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracker_debug!("job {job_id}: connection {connection} closed");
                }
                _ = pump_channel(channel.as_ref(), &job_id, connection, &msg_tx) => {}
            }
        });
    }

    fn schedule_reconnect(&mut self, attempt: u32, delay: Duration) {
        let token = self.replace_slot(SlotKind::ReconnectTimer);
        let msg_tx = self.msg_tx.clone();
        tracker_info!("live channel reconnect attempt {attempt} in {delay:?}");
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = msg_tx.send(Msg::ReconnectDue { attempt });
                }
            }
        });
    }

    /// Fire-and-forget: local state is already cancelled, the reply only gets logged.
    fn send_cancel(&self, job_id: JobId) {
        let api = self.api.clone();
        tokio::spawn(async move {
            match api.cancel(&job_id).await {
                Ok(ack) => tracker_info!("job {job_id}: cancel acknowledged ({ack:?})"),
                Err(err) => tracker_warn!("job {job_id}: cancel request failed: {err}"),
            }
        });
    }
}

enum SlotKind {
    Connection,
    ReconnectTimer,
    FallbackPoller,
}

fn cancel_slot(slot: &mut Option<CancellationToken>) {
    if let Some(token) = slot.take() {
        token.cancel();
    }
}

/// Reads one connection until it fails or ends, forwarding validated events.
async fn pump_channel(
    channel: &dyn LiveChannel,
    job_id: &JobId,
    connection: u64,
    msg_tx: &mpsc::UnboundedSender<Msg>,
) {
    let mut stream = match channel.connect(job_id).await {
        Ok(stream) => stream,
        Err(err) => {
            tracker_warn!("job {job_id}: live channel connect failed: {err}");
            let _ = msg_tx.send(Msg::ChannelFailed {
                connection,
                reason: err.to_string(),
            });
            return;
        }
    };
    let _ = msg_tx.send(Msg::ChannelOpened { connection });

    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                tracker_warn!("job {job_id}: live channel error: {err}");
                let _ = msg_tx.send(Msg::ChannelFailed {
                    connection,
                    reason: err.to_string(),
                });
                return;
            }
        };
        tracker_trace!("job {job_id}: frame {} {}", frame.event, frame.data);
        match LiveEvent::parse(&frame.event, &frame.data) {
            Ok(event) => {
                tracker_debug!("job {job_id}: {} event", event.name());
                if msg_tx.send(Msg::ChannelEvent { connection, event }).is_err() {
                    return;
                }
            }
            Err(err) => tracker_warn!("job {job_id}: skipping event: {err}"),
        }
    }

    tracker_debug!("job {job_id}: live channel ended (connection {connection})");
    let _ = msg_tx.send(Msg::ChannelFailed {
        connection,
        reason: "stream ended".to_string(),
    });
}
