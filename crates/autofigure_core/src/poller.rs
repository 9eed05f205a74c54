/// Bookkeeping for the fallback poller. The polling itself happens in the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FallbackPoller {
    polling_active: bool,
    final_pass_issued: bool,
    final_pass_done: bool,
}

impl FallbackPoller {
    pub fn polling_active(&self) -> bool {
        self.polling_active
    }

    /// Returns `true` if polling was not already running.
    pub fn start_polling(&mut self) -> bool {
        !std::mem::replace(&mut self.polling_active, true)
    }

    /// Returns `true` if polling was running.
    pub fn stop_polling(&mut self) -> bool {
        std::mem::replace(&mut self.polling_active, false)
    }

    /// The reconciliation pull happens at most once per session.
    pub fn request_final_pass(&mut self) -> bool {
        !std::mem::replace(&mut self.final_pass_issued, true)
    }

    pub fn final_pass_issued(&self) -> bool {
        self.final_pass_issued
    }

    pub fn complete_final_pass(&mut self) {
        if self.final_pass_issued {
            self.final_pass_done = true;
        }
    }

    pub fn final_pass_done(&self) -> bool {
        self.final_pass_done
    }
}
