use crate::{Artifact, JobId, LiveEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A job identifier became known; start tracking it.
    Track(JobId),
    /// The live channel for `connection` is connected.
    ChannelOpened { connection: u64 },
    /// A validated event arrived on `connection`.
    ChannelEvent { connection: u64, event: LiveEvent },
    /// `connection` failed or ended without a finished status.
    ChannelFailed { connection: u64, reason: String },
    /// The reconnect timer for `attempt` expired.
    ReconnectDue { attempt: u32 },
    /// User asked to retry the live channel after it was given up on.
    ReconnectRequested,
    /// A log poll returned the full log text.
    LogsPolled(String),
    /// A fallback poll returned the artifact list.
    ArtifactsPolled(Vec<Artifact>),
    /// The final reconciliation pass returned the artifact list.
    ArtifactsListed(Vec<Artifact>),
    /// The artifact list could not be fetched.
    ArtifactsListFailed,
    /// User cancelled the job.
    CancelRequested,
    /// The hosting view is going away.
    Teardown,
}
