use std::time::Duration;

use crate::{Artifact, JobId, JobStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    OpenChannel { job_id: JobId, connection: u64 },
    CloseChannel,
    ScheduleReconnect { attempt: u32, delay: Duration },
    CancelReconnect,
    /// Periodic pull of the log text and artifact list while the live channel is down.
    StartFallbackPolling { job_id: JobId, interval: Duration },
    StopFallbackPolling,
    FetchArtifacts { job_id: JobId },
    FetchLogs { job_id: JobId },
    SendCancel { job_id: JobId },
    Notify(Notification),
}

/// Discrete change notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    ArtifactAdded(Artifact),
    StepChanged { step: u8, label: &'static str },
    StatusChanged {
        status: JobStatus,
        error: Option<String>,
    },
    Reconnecting { attempt: u32, max_retries: u32 },
}
