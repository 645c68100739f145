use std::time::Duration;

use tracing::debug;

use super::{JobStatus, VideoBackend};
use crate::error::GenerationError;
use crate::pipeline::clock::SharedClock;
use crate::pipeline::settings_layer::{DEFAULT_POLL_BUDGET_SECS, DEFAULT_POLL_INTERVAL_SECS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub budget: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            budget: Duration::from_secs(DEFAULT_POLL_BUDGET_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Pending { attempts: u32 },
    Completed { video_url: String, attempts: u32 },
    Failed { message: String, attempts: u32 },
    TimedOut { waited: Duration, attempts: u32 },
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Pending { attempts }
            | Self::Completed { attempts, .. }
            | Self::Failed { attempts, .. }
            | Self::TimedOut { attempts, .. } => *attempts,
        }
    }

    /// One observation moves a pending job forward. A pending job whose next
    /// wait would overrun the budget times out instead.
    pub fn advance(self, status: JobStatus, waited: Duration, policy: &PollPolicy) -> Self {
        let Self::Pending { attempts } = self else {
            return self;
        };
        let attempts = attempts + 1;
        match status {
            JobStatus::Completed { video_url } => Self::Completed { video_url, attempts },
            JobStatus::Failed { message } => Self::Failed { message, attempts },
            JobStatus::Pending if waited + policy.interval > policy.budget => {
                Self::TimedOut { waited, attempts }
            }
            JobStatus::Pending => Self::Pending { attempts },
        }
    }
}

/// Polls immediately, then once per interval, until the job settles or the
/// budget is spent. Transport errors while polling abort the wait.
#[derive(Clone)]
pub struct JobPoller {
    clock: SharedClock,
    policy: PollPolicy,
}

impl JobPoller {
    pub fn new(clock: SharedClock, policy: PollPolicy) -> Self {
        Self { clock, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub async fn run(
        &self,
        backend: &dyn VideoBackend,
        request_id: &str,
    ) -> Result<PollState, GenerationError> {
        let started = self.clock.elapsed();
        let mut state = PollState::Pending { attempts: 0 };
        loop {
            let status = backend.poll(request_id).await?;
            let waited = self.clock.elapsed().saturating_sub(started);
            state = state.advance(status, waited, &self.policy);
            debug!(
                job_id = request_id,
                attempts = state.attempts(),
                waited_secs = waited.as_secs(),
                "video job polled"
            );
            if state.is_terminal() {
                return Ok(state);
            }
            self.clock.sleep(self.policy.interval).await;
        }
    }
}
