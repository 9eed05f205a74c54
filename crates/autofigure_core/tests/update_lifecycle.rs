use std::time::Duration;

use autofigure_core::{
    update, Artifact, ArtifactKind, ChannelPhase, Effect, JobId, JobStatus, LiveEvent, LogLine,
    Msg, Notification, RetryPolicy, StatusEvent, TrackerState, LOG_TAIL_LINES,
};

fn tracking(max_retries: u32) -> TrackerState {
    let policy = RetryPolicy {
        max_retries,
        reconnect_delay: Duration::from_millis(10),
    };
    let (state, _) = update(
        TrackerState::new(policy, Duration::from_secs(1)),
        Msg::Track(JobId::new("job-1")),
    );
    state
}

fn artifact(path: &str, kind: &str) -> Artifact {
    Artifact {
        path: path.to_string(),
        url: format!("/api/artifacts/job-1/{path}"),
        name: path.to_string(),
        kind: ArtifactKind::from_label(kind),
    }
}

fn fail(state: TrackerState) -> (TrackerState, Vec<Effect>) {
    let connection = state.channel().connection();
    update(
        state,
        Msg::ChannelFailed {
            connection,
            reason: "eof".into(),
        },
    )
}

fn disconnected() -> TrackerState {
    let state = tracking(0);
    let (state, _) = fail(state);
    assert_eq!(state.status(), JobStatus::Disconnected);
    state
}

#[test]
fn final_pass_merges_without_duplicates_and_settles() {
    let state = tracking(2);
    let conn = state.channel().connection();
    let (state, _) = update(
        state,
        Msg::ChannelEvent {
            connection: conn,
            event: LiveEvent::Artifact(artifact("figure.png", "figure")),
        },
    );
    let (state, _) = update(
        state,
        Msg::ChannelEvent {
            connection: conn,
            event: LiveEvent::Status(StatusEvent::Finished {
                code: Some(0),
                error: None,
            }),
        },
    );
    assert!(!state.view().settled);

    let (state, effects) = update(
        state,
        Msg::ArtifactsListed(vec![
            artifact("figure.png", "figure"),
            artifact("final.svg", "final_svg"),
            artifact("run.log", "log"),
        ]),
    );

    assert_eq!(state.ledger().len(), 3);
    assert_eq!(state.steps().current(), 5);
    let added: Vec<_> = effects
        .iter()
        .filter_map(|e| match e {
            Effect::Notify(Notification::ArtifactAdded(a)) => Some(a.path.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(added, vec!["final.svg", "run.log"]);
    let view = state.view();
    assert!(view.settled);
    assert_eq!(view.best_svg().map(|a| a.path.as_str()), Some("final.svg"));
}

#[test]
fn failed_final_pass_still_settles() {
    let state = tracking(2);
    let conn = state.channel().connection();
    let (state, _) = update(
        state,
        Msg::ChannelEvent {
            connection: conn,
            event: LiveEvent::Status(StatusEvent::Finished {
                code: Some(2),
                error: None,
            }),
        },
    );
    let (state, _) = update(state, Msg::ArtifactsListFailed);
    assert!(state.view().settled);
    assert_eq!(state.status(), JobStatus::Failed);
}

#[test]
fn cancel_forces_status_and_stops_everything() {
    let state = disconnected();
    let (state, effects) = update(state, Msg::CancelRequested);

    assert_eq!(
        effects,
        vec![
            Effect::SendCancel {
                job_id: JobId::new("job-1")
            },
            Effect::CloseChannel,
            Effect::CancelReconnect,
            Effect::StopFallbackPolling,
            Effect::Notify(Notification::StatusChanged {
                status: JobStatus::Cancelled,
                error: None
            }),
        ]
    );
    assert_eq!(state.status(), JobStatus::Cancelled);
    assert_eq!(state.channel().phase(), ChannelPhase::Cancelled);
    assert!(state.view().settled);

    // A cancelled session never changes status on its own.
    let (state, effects) = fail(state);
    assert!(effects.is_empty());
    let (state, effects) = update(state, Msg::ReconnectDue { attempt: 1 });
    assert!(effects.is_empty());
    let (state, effects) = update(state, Msg::CancelRequested);
    assert!(effects.is_empty());
    assert_eq!(state.status(), JobStatus::Cancelled);
}

#[test]
fn cancel_before_tracking_is_a_noop() {
    let (state, effects) = update(TrackerState::default(), Msg::CancelRequested);
    assert!(effects.is_empty());
    assert_eq!(state.status(), JobStatus::Idle);
}

#[test]
fn event_after_manual_reconnect_recovers_from_disconnected() {
    let state = disconnected();
    let (state, effects) = update(state, Msg::ReconnectRequested);
    assert_eq!(
        effects,
        vec![Effect::OpenChannel {
            job_id: JobId::new("job-1"),
            connection: 2
        }]
    );
    assert_eq!(state.status(), JobStatus::Disconnected);
    assert!(state.poller().polling_active());

    let (state, effects) = update(
        state,
        Msg::ChannelEvent {
            connection: 2,
            event: LiveEvent::Status(StatusEvent::Started),
        },
    );
    assert_eq!(state.status(), JobStatus::Running);
    assert!(effects.contains(&Effect::StopFallbackPolling));
    assert!(!state.poller().polling_active());
}

#[test]
fn manual_reconnect_is_only_for_disconnected() {
    let state = tracking(2);
    let (_state, effects) = update(state, Msg::ReconnectRequested);
    assert!(effects.is_empty());
}

#[test]
fn repeated_exhaustion_does_not_restart_polling() {
    let state = disconnected();
    let (state, _) = update(state, Msg::ReconnectRequested);
    let (state, effects) = fail(state);
    assert!(!effects
        .iter()
        .any(|e| matches!(e, Effect::StartFallbackPolling { .. })));
    assert_eq!(state.status(), JobStatus::Disconnected);
}

#[test]
fn log_tail_is_bounded_and_replaced_by_polls() {
    let mut state = tracking(2);
    let conn = state.channel().connection();
    for i in 0..(LOG_TAIL_LINES + 5) {
        let (next, _) = update(
            state,
            Msg::ChannelEvent {
                connection: conn,
                event: LiveEvent::Log(LogLine {
                    stream: "stdout".into(),
                    line: format!("line {i}"),
                }),
            },
        );
        state = next;
    }
    let view = state.view();
    assert_eq!(view.log_tail.len(), LOG_TAIL_LINES);
    assert_eq!(view.log_tail[0], "[stdout] line 5");

    let (state, _) = update(state, Msg::LogsPolled("[meta] cmd=x\n\n[stdout] hi\n".into()));
    assert_eq!(state.view().log_tail, vec!["[meta] cmd=x", "[stdout] hi"]);
}

#[test]
fn teardown_ignores_everything_after() {
    let state = tracking(2);
    let conn = state.channel().connection();
    let (state, effects) = update(state, Msg::Teardown);
    assert!(effects.contains(&Effect::CloseChannel));
    assert!(effects.contains(&Effect::CancelReconnect));
    assert!(state.is_torn_down());

    let (state, effects) = update(
        state,
        Msg::ChannelEvent {
            connection: conn,
            event: LiveEvent::Artifact(artifact("figure.png", "figure")),
        },
    );
    assert!(effects.is_empty());
    let (state, effects) = update(state, Msg::ArtifactsListed(vec![artifact("a", "figure")]));
    assert!(effects.is_empty());
    assert!(state.ledger().is_empty());
    assert!(state.view().settled);
}

#[test]
fn polled_artifact_list_advances_a_disconnected_session() {
    let state = disconnected();
    let listed = vec![artifact("figure.png", "figure"), artifact("final.svg", "final_svg")];

    let (state, effects) = update(state, Msg::ArtifactsPolled(listed.clone()));
    assert_eq!(
        effects,
        vec![
            Effect::Notify(Notification::ArtifactAdded(listed[0].clone())),
            Effect::Notify(Notification::StepChanged {
                step: 1,
                label: "Generating figure"
            }),
            Effect::Notify(Notification::ArtifactAdded(listed[1].clone())),
            Effect::Notify(Notification::StepChanged {
                step: 5,
                label: "Assembling final SVG"
            }),
        ]
    );
    assert_eq!(state.status(), JobStatus::Disconnected);
    assert_eq!(state.steps().current(), 5);
    assert_eq!(state.ledger().len(), 2);
    assert!(!state.poller().final_pass_done());
    assert!(!state.is_settled());

    let (state, effects) = update(state, Msg::ArtifactsPolled(listed));
    assert!(effects.is_empty());
    assert_eq!(state.ledger().len(), 2);
}

#[test]
fn replayed_finish_after_manual_reconnect_skips_running() {
    let state = disconnected();
    let (state, _) = update(state, Msg::ReconnectRequested);
    let (state, effects) = update(
        state,
        Msg::ChannelEvent {
            connection: 2,
            event: LiveEvent::Status(StatusEvent::Finished {
                code: Some(0),
                error: None,
            }),
        },
    );

    let statuses: Vec<_> = effects
        .iter()
        .filter_map(|e| match e {
            Effect::Notify(Notification::StatusChanged { status, .. }) => Some(*status),
            _ => None,
        })
        .collect();
    assert_eq!(statuses, vec![JobStatus::Succeeded]);
    assert!(effects.contains(&Effect::StopFallbackPolling));
    assert_eq!(state.status(), JobStatus::Succeeded);
}
