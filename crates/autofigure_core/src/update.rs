use crate::{
    step_label, Artifact, Effect, ErrorDirective, JobId, JobStatus, LiveEvent, Msg, Notification,
    StatusEvent, TrackerState,
};

/// Pure update function: applies a message to state and returns any effects.
///
/// Once the session is torn down every message is ignored.
pub fn update(mut state: TrackerState, msg: Msg) -> (TrackerState, Vec<Effect>) {
    if state.is_torn_down() {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::Track(job_id) => track(&mut state, job_id),
        Msg::ChannelOpened { connection } => {
            if state.channel().is_current(connection) {
                state.channel_mut().on_open();
            }
            Vec::new()
        }
        Msg::ChannelEvent { connection, event } => channel_event(&mut state, connection, event),
        Msg::ChannelFailed { connection, .. } => channel_failed(&mut state, connection),
        Msg::ReconnectDue { attempt } => {
            let connection = state.channel_mut().on_reconnect_due(attempt);
            match (connection, state.job_id().cloned()) {
                (Some(connection), Some(job_id)) => {
                    vec![Effect::OpenChannel { job_id, connection }]
                }
                _ => Vec::new(),
            }
        }
        Msg::ReconnectRequested => manual_reconnect(&mut state),
        Msg::LogsPolled(text) => {
            state.replace_log_tail(&text);
            Vec::new()
        }
        Msg::ArtifactsPolled(artifacts) => merge_listed(&mut state, artifacts),
        Msg::ArtifactsListed(artifacts) => {
            let effects = merge_listed(&mut state, artifacts);
            state.poller_mut().complete_final_pass();
            state.mark_dirty();
            effects
        }
        Msg::ArtifactsListFailed => {
            state.poller_mut().complete_final_pass();
            state.mark_dirty();
            Vec::new()
        }
        Msg::CancelRequested => cancel(&mut state),
        Msg::Teardown => teardown(&mut state),
    };

    (state, effects)
}

fn track(state: &mut TrackerState, job_id: JobId) -> Vec<Effect> {
    // One job per session.
    if state.job_id().is_some() {
        return Vec::new();
    }
    state.begin(job_id.clone());
    let connection = state.channel_mut().start();
    let mut effects = Vec::with_capacity(2);
    change_status(state, JobStatus::Running, None, &mut effects);
    effects.push(Effect::OpenChannel { job_id, connection });
    effects
}

fn channel_event(state: &mut TrackerState, connection: u64, event: LiveEvent) -> Vec<Effect> {
    if !state.channel().is_current(connection) || !state.channel_mut().on_event() {
        return Vec::new();
    }

    let mut effects = Vec::new();
    if state.status() == JobStatus::Disconnected {
        // A replayed finish goes straight to its terminal status.
        if !matches!(event, LiveEvent::Status(StatusEvent::Finished { .. })) {
            change_status(state, JobStatus::Running, None, &mut effects);
        }
        if state.poller_mut().stop_polling() {
            effects.push(Effect::StopFallbackPolling);
        }
    }

    match event {
        LiveEvent::Artifact(artifact) => {
            if state.ledger_mut().record(artifact.clone()) {
                announce_artifact(state, artifact, &mut effects);
            }
        }
        LiveEvent::Status(StatusEvent::Started) => {}
        LiveEvent::Status(StatusEvent::Finished { code, error }) => {
            finish(state, code, error, &mut effects);
        }
        LiveEvent::Log(line) => state.push_log_line(line.render()),
    }
    effects
}

/// Folds a pulled artifact list into the ledger, announcing only new entries.
fn merge_listed(state: &mut TrackerState, artifacts: Vec<Artifact>) -> Vec<Effect> {
    let mut effects = Vec::new();
    let added = state.ledger_mut().merge(artifacts);
    for artifact in added {
        announce_artifact(state, artifact, &mut effects);
    }
    effects
}

/// Emits notifications for an artifact the ledger just accepted.
fn announce_artifact(state: &mut TrackerState, artifact: Artifact, effects: &mut Vec<Effect>) {
    state.mark_dirty();
    let advance = state.steps_mut().advance(&artifact.kind);
    effects.push(Effect::Notify(Notification::ArtifactAdded(artifact)));
    if advance.changed {
        effects.push(Effect::Notify(Notification::StepChanged {
            step: advance.step,
            label: step_label(advance.step),
        }));
    }
}

fn finish(
    state: &mut TrackerState,
    code: Option<i64>,
    error: Option<String>,
    effects: &mut Vec<Effect>,
) {
    let (status, message) = match code {
        Some(0) => (JobStatus::Succeeded, None),
        Some(code) => (
            JobStatus::Failed,
            Some(error.unwrap_or_else(|| format!("job exited with code {code}"))),
        ),
        None => (
            JobStatus::Failed,
            Some(error.unwrap_or_else(|| "job exited without a code".to_string())),
        ),
    };

    state.channel_mut().finish();
    effects.push(Effect::CloseChannel);
    effects.push(Effect::CancelReconnect);
    if state.poller_mut().stop_polling() {
        effects.push(Effect::StopFallbackPolling);
    }
    change_status(state, status, message, effects);

    if let Some(job_id) = state.job_id().cloned() {
        if state.poller_mut().request_final_pass() {
            effects.push(Effect::FetchArtifacts {
                job_id: job_id.clone(),
            });
            effects.push(Effect::FetchLogs { job_id });
        }
    }
}

fn channel_failed(state: &mut TrackerState, connection: u64) -> Vec<Effect> {
    if !state.channel().is_current(connection) {
        return Vec::new();
    }

    match state.channel_mut().on_error() {
        ErrorDirective::Suppressed => Vec::new(),
        ErrorDirective::Reconnect { attempt, delay } => {
            state.mark_dirty();
            vec![
                Effect::Notify(Notification::Reconnecting {
                    attempt,
                    max_retries: state.channel().policy().max_retries,
                }),
                Effect::ScheduleReconnect { attempt, delay },
            ]
        }
        ErrorDirective::Exhausted => {
            let mut effects = vec![Effect::CloseChannel];
            change_status(state, JobStatus::Disconnected, None, &mut effects);
            if let Some(job_id) = state.job_id().cloned() {
                if state.poller_mut().start_polling() {
                    effects.push(Effect::StartFallbackPolling {
                        job_id,
                        interval: state.log_poll_interval(),
                    });
                }
            }
            effects
        }
    }
}

/// Gives the live channel a fresh retry budget after it was given up on.
/// Fallback polling keeps running until an event proves the channel is back.
fn manual_reconnect(state: &mut TrackerState) -> Vec<Effect> {
    if state.status() != JobStatus::Disconnected {
        return Vec::new();
    }
    let Some(job_id) = state.job_id().cloned() else {
        return Vec::new();
    };
    let connection = state.channel_mut().start();
    state.mark_dirty();
    vec![Effect::OpenChannel { job_id, connection }]
}

fn cancel(state: &mut TrackerState) -> Vec<Effect> {
    let Some(job_id) = state.job_id().cloned() else {
        return Vec::new();
    };
    if state.status().is_terminal() {
        return Vec::new();
    }

    state.channel_mut().cancel();
    let mut effects = vec![
        Effect::SendCancel { job_id },
        Effect::CloseChannel,
        Effect::CancelReconnect,
    ];
    if state.poller_mut().stop_polling() {
        effects.push(Effect::StopFallbackPolling);
    }
    change_status(state, JobStatus::Cancelled, None, &mut effects);
    effects
}

fn teardown(state: &mut TrackerState) -> Vec<Effect> {
    state.tear_down();
    state.channel_mut().cancel();
    let mut effects = vec![Effect::CloseChannel, Effect::CancelReconnect];
    if state.poller_mut().stop_polling() {
        effects.push(Effect::StopFallbackPolling);
    }
    effects
}

fn change_status(
    state: &mut TrackerState,
    status: JobStatus,
    error: Option<String>,
    effects: &mut Vec<Effect>,
) {
    if state.set_status(status, error.clone()) {
        effects.push(Effect::Notify(Notification::StatusChanged { status, error }));
    }
}
