//! Plain-text rendering of session output.

use autofigure_client::{InviteStatus, JobController};
use autofigure_core::{JobSnapshot, JobStatus, Notification, STEP_COUNT};

const BAR_WIDTH: usize = 20;

pub fn progress_bar(snapshot: &JobSnapshot) -> String {
    let filled = usize::from(snapshot.current_step) * BAR_WIDTH / usize::from(STEP_COUNT);
    format!(
        "[{}{}] {}/{} {}",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        snapshot.current_step,
        STEP_COUNT,
        snapshot.step_label
    )
}

pub fn notification_line(notification: &Notification, controller: &JobController) -> String {
    match notification {
        Notification::ArtifactAdded(artifact) => format!(
            "  + {} {} ({})",
            artifact.kind,
            artifact.name,
            controller.artifact_url(artifact)
        ),
        Notification::StepChanged { step, label } => {
            format!("step {step}/{STEP_COUNT}: {label}")
        }
        Notification::StatusChanged { status, error } => match error {
            Some(error) => format!("status: {} ({error})", status.label()),
            None => format!("status: {}", status.label()),
        },
        Notification::Reconnecting {
            attempt,
            max_retries,
        } => format!("connection lost, reconnecting ({attempt}/{max_retries})"),
    }
}

pub fn summary(snapshot: &JobSnapshot, controller: &JobController) -> Vec<String> {
    let mut lines = vec![progress_bar(snapshot)];
    let job = snapshot
        .job_id
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    match (&snapshot.status, &snapshot.error_message) {
        (status, Some(error)) => lines.push(format!("job {job}: {} - {error}", status.label())),
        (status, None) => lines.push(format!("job {job}: {}", status.label())),
    }
    if let Some(svg) = snapshot.best_svg() {
        lines.push(format!("result: {}", controller.artifact_url(svg)));
    }
    lines.push(format!("{} artifact(s)", snapshot.artifacts.len()));
    if snapshot.status == JobStatus::Failed {
        let tail_start = snapshot.log_tail.len().saturating_sub(10);
        lines.extend(snapshot.log_tail[tail_start..].iter().map(|line| format!("  | {line}")));
    }
    lines
}

pub fn invite_line(code: &str, invite: &InviteStatus) -> String {
    format!(
        "invite {code}: {} code, {} of {} used today, {} remaining",
        invite.code_type, invite.used_today, invite.daily_limit, invite.remaining
    )
}
