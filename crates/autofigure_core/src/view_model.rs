use crate::{Artifact, JobId, JobStatus, STEP_COUNT};

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobSnapshot {
    pub job_id: Option<JobId>,
    pub status: JobStatus,
    pub current_step: u8,
    pub step_label: &'static str,
    /// Insertion order; presentation picks its own display order.
    pub artifacts: Vec<Artifact>,
    pub error_message: Option<String>,
    pub log_tail: Vec<String>,
    /// Consecutive failed connection attempts on the live channel.
    pub reconnect_attempt: u32,
    pub settled: bool,
}

impl JobSnapshot {
    pub fn progress(&self) -> f32 {
        f32::from(self.current_step) / f32::from(STEP_COUNT)
    }

    /// Latest SVG artifact, preferring the most refined one.
    pub fn best_svg(&self) -> Option<&Artifact> {
        self.artifacts
            .iter()
            .filter(|artifact| artifact.kind.is_svg())
            .max_by_key(|artifact| artifact.kind.step())
    }
}
