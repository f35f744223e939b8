// src/pacing.rs
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Keeps a minimum spacing between calls to one upstream host.
///
/// Each HTTP client owns its own `Pacer`, so two different hosts never wait on each other
/// while concurrent callers of the same host queue up behind the lock.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until at least `interval` has passed since the previous call.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            sleep_until(prev + self.interval).await;
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn consecutive_calls_are_spaced() {
        let pacer = Pacer::new(Duration::from_millis(250));
        let start = Instant::now();
        pacer.wait().await;
        pacer.wait().await;
        pacer.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn first_call_does_not_wait() {
        let pacer = Pacer::new(Duration::from_secs(5));
        let start = Instant::now();
        pacer.wait().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
