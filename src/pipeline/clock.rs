use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Time source for anything that waits. Pollers take an `Arc<dyn Clock>` so tests
/// can run multi-minute budgets instantly.
#[async_trait]
pub trait Clock: Send + Sync + 'static {
    /// Monotonic time since the clock was created.
    fn elapsed(&self) -> Duration;
    async fn sleep(&self, duration: Duration);
}

pub type SharedClock = Arc<dyn Clock>;

#[derive(Debug, Clone)]
pub struct TokioClock {
    started: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock whose `sleep` returns immediately after advancing virtual time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += duration;
        }
    }

    /// Total virtual time spent sleeping.
    pub fn slept(&self) -> Duration {
        self.sleeps
            .lock()
            .map(|sleeps| sleeps.iter().sum())
            .unwrap_or_default()
    }

    pub fn sleep_count(&self) -> usize {
        self.sleeps.lock().map(|sleeps| sleeps.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.now.lock().map(|now| *now).unwrap_or_default()
    }

    async fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_clock_advances_without_waiting() {
        let clock = ManualClock::new();
        clock.sleep(Duration::from_secs(600)).await;
        clock.advance(Duration::from_secs(5));

        assert_eq!(clock.elapsed(), Duration::from_secs(605));
        assert_eq!(clock.slept(), Duration::from_secs(600));
        assert_eq!(clock.sleep_count(), 1);
    }
}
