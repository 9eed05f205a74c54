//! Job tracker client: HTTP API, live channel transport and session runtime.
mod api;
mod channel;
mod controller;
mod error;
mod poller;
mod runtime;
mod settings;
mod sse;
mod types;

pub use api::{resolve_artifact_url, HttpJobApi, JobApi};
pub use channel::{EventStream, HttpLiveChannel, LiveChannel};
pub use controller::{JobController, TrackingSession};
pub use error::{ApiError, ChannelError, SubmissionError};
pub use settings::{ClientSettings, MAX_UPLOAD_BYTES};
pub use sse::{SseDecoder, SseFrame, MAX_PENDING_LINE};
pub use types::{CancelAck, InviteStatus, JobRequest, UploadedFile};
