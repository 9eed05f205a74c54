//! Reconnect state machine for the live channel.
//!
//! IO lives elsewhere: this type only decides whether a connection should be
//! opened, retried after a fixed delay, or given up on. Each open gets a new
//! connection number so that traffic from a superseded connection can be told
//! apart from the current one.

use std::time::Duration;

/// Constant-delay reconnect policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Reconnects allowed after consecutive failures; the next failure gives up.
    pub max_retries: u32,
    pub reconnect_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            reconnect_delay: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelPhase {
    #[default]
    Idle,
    Connecting,
    Open,
    /// A reconnect timer is armed for this attempt number.
    PendingReconnect { attempt: u32 },
    /// Closed on purpose after the job finished.
    ClosedClean,
    /// Closed after the retry budget ran out.
    ClosedError,
    Cancelled,
}

/// What the caller should do after a connection error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDirective {
    /// Error arrived after the channel was closed on purpose; nothing to do.
    Suppressed,
    Reconnect { attempt: u32, delay: Duration },
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelSupervisor {
    policy: RetryPolicy,
    phase: ChannelPhase,
    retries: u32,
    connection: u64,
}

impl ChannelSupervisor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn phase(&self) -> ChannelPhase {
        self.phase
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn connection(&self) -> u64 {
        self.connection
    }

    pub fn is_current(&self, connection: u64) -> bool {
        connection == self.connection
    }

    /// Whether the channel was closed for good (finished or cancelled).
    pub fn is_closed(&self) -> bool {
        matches!(self.phase, ChannelPhase::ClosedClean | ChannelPhase::Cancelled)
    }

    /// Begins a fresh connection with a full retry budget. Returns its number.
    pub fn start(&mut self) -> u64 {
        self.retries = 0;
        self.connect()
    }

    fn connect(&mut self) -> u64 {
        self.connection += 1;
        self.phase = ChannelPhase::Connecting;
        self.connection
    }

    pub fn on_open(&mut self) {
        if self.phase == ChannelPhase::Connecting {
            self.phase = ChannelPhase::Open;
        }
    }

    /// Any event proves the stream is healthy and resets the retry counter.
    /// Returns `false` when the channel no longer accepts traffic.
    pub fn on_event(&mut self) -> bool {
        match self.phase {
            ChannelPhase::Connecting | ChannelPhase::Open => {
                self.phase = ChannelPhase::Open;
                self.retries = 0;
                true
            }
            _ => false,
        }
    }

    pub fn on_error(&mut self) -> ErrorDirective {
        match self.phase {
            ChannelPhase::Connecting | ChannelPhase::Open => {}
            _ => return ErrorDirective::Suppressed,
        }
        self.retries += 1;
        if self.retries <= self.policy.max_retries {
            self.phase = ChannelPhase::PendingReconnect {
                attempt: self.retries,
            };
            ErrorDirective::Reconnect {
                attempt: self.retries,
                delay: self.policy.reconnect_delay,
            }
        } else {
            self.phase = ChannelPhase::ClosedError;
            ErrorDirective::Exhausted
        }
    }

    /// Fires when the reconnect timer for `attempt` expires. Returns the new
    /// connection number, or `None` if that timer is stale.
    pub fn on_reconnect_due(&mut self, attempt: u32) -> Option<u64> {
        match self.phase {
            ChannelPhase::PendingReconnect { attempt: pending } if pending == attempt => {
                Some(self.connect())
            }
            _ => None,
        }
    }

    pub fn finish(&mut self) {
        self.phase = ChannelPhase::ClosedClean;
    }

    pub fn cancel(&mut self) {
        self.phase = ChannelPhase::Cancelled;
    }
}
