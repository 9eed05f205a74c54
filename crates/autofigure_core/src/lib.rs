//! Job tracker core: pure state machine for following one generation job.
//!
//! Nothing here performs IO. The client feeds [`Msg`]s into [`update`] and
//! executes the returned [`Effect`]s.
mod channel;
mod effect;
mod event;
mod kind;
mod ledger;
mod msg;
mod poller;
mod state;
mod step;
mod update;
mod view_model;

pub use channel::{ChannelPhase, ChannelSupervisor, ErrorDirective, RetryPolicy};
pub use effect::{Effect, Notification};
pub use event::{EventParseError, LiveEvent, LogLine, StatusEvent};
pub use kind::ArtifactKind;
pub use ledger::{Artifact, ArtifactLedger};
pub use msg::Msg;
pub use poller::FallbackPoller;
pub use state::{
    JobId, JobStatus, TrackerState, DEFAULT_LOG_POLL_INTERVAL, LOG_TAIL_LINES,
};
pub use step::{step_label, StepAdvance, StepModel, STEP_COUNT};
pub use update::update;
pub use view_model::JobSnapshot;
