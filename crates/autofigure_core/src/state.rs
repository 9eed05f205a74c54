use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::view_model::JobSnapshot;
use crate::{ArtifactLedger, ChannelSupervisor, FallbackPoller, RetryPolicy, StepModel};

/// Lines of process output kept for display.
pub const LOG_TAIL_LINES: usize = 200;

pub const DEFAULT_LOG_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Opaque job handle returned by submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    /// Live channel gave up; not terminal.
    Disconnected,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything one job-tracking session knows. Mutated only through [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerState {
    job_id: Option<JobId>,
    status: JobStatus,
    error_message: Option<String>,
    steps: StepModel,
    ledger: ArtifactLedger,
    channel: ChannelSupervisor,
    poller: FallbackPoller,
    log_poll_interval: Duration,
    log_tail: VecDeque<String>,
    torn_down: bool,
    dirty: bool,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self::new(RetryPolicy::default(), DEFAULT_LOG_POLL_INTERVAL)
    }
}

impl TrackerState {
    pub fn new(policy: RetryPolicy, log_poll_interval: Duration) -> Self {
        Self {
            job_id: None,
            status: JobStatus::Idle,
            error_message: None,
            steps: StepModel::new(),
            ledger: ArtifactLedger::new(),
            channel: ChannelSupervisor::new(policy),
            poller: FallbackPoller::default(),
            log_poll_interval,
            log_tail: VecDeque::new(),
            torn_down: false,
            dirty: false,
        }
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job_id.as_ref()
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn steps(&self) -> &StepModel {
        &self.steps
    }

    pub fn ledger(&self) -> &ArtifactLedger {
        &self.ledger
    }

    pub fn channel(&self) -> &ChannelSupervisor {
        &self.channel
    }

    pub fn poller(&self) -> &FallbackPoller {
        &self.poller
    }

    pub fn log_poll_interval(&self) -> Duration {
        self.log_poll_interval
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Settled once nothing further is expected to change the snapshot.
    pub fn is_settled(&self) -> bool {
        match self.status {
            JobStatus::Cancelled => true,
            JobStatus::Succeeded | JobStatus::Failed => self.poller.final_pass_done(),
            _ => self.torn_down,
        }
    }

    pub fn view(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.job_id.clone(),
            status: self.status,
            current_step: self.steps.current(),
            step_label: self.steps.label(),
            artifacts: self.ledger.to_vec(),
            error_message: self.error_message.clone(),
            log_tail: self.log_tail.iter().cloned().collect(),
            reconnect_attempt: self.channel.retries(),
            settled: self.is_settled(),
        }
    }

    /// Returns whether anything visible changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn begin(&mut self, job_id: JobId) {
        self.job_id = Some(job_id);
        self.mark_dirty();
    }

    /// Returns `true` if the status actually changed.
    pub(crate) fn set_status(&mut self, status: JobStatus, error: Option<String>) -> bool {
        if self.status == status && error.is_none() {
            return false;
        }
        self.status = status;
        if error.is_some() {
            self.error_message = error;
        }
        self.mark_dirty();
        true
    }

    pub(crate) fn steps_mut(&mut self) -> &mut StepModel {
        &mut self.steps
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut ArtifactLedger {
        &mut self.ledger
    }

    pub(crate) fn channel_mut(&mut self) -> &mut ChannelSupervisor {
        &mut self.channel
    }

    pub(crate) fn poller_mut(&mut self) -> &mut FallbackPoller {
        &mut self.poller
    }

    pub(crate) fn push_log_line(&mut self, line: String) {
        if self.log_tail.len() == LOG_TAIL_LINES {
            self.log_tail.pop_front();
        }
        self.log_tail.push_back(line);
        self.mark_dirty();
    }

    pub(crate) fn replace_log_tail(&mut self, text: &str) {
        let lines: Vec<&str> = text.lines().filter(|line| !line.is_empty()).collect();
        let skip = lines.len().saturating_sub(LOG_TAIL_LINES);
        self.log_tail = lines.into_iter().skip(skip).map(ToOwned::to_owned).collect();
        self.mark_dirty();
    }

    pub(crate) fn tear_down(&mut self) {
        self.torn_down = true;
        self.mark_dirty();
    }
}
