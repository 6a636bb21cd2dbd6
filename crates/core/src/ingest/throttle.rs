use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

const MAX_BACKOFF_DOUBLINGS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential { base: Duration },
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(d) => d,
            Backoff::Exponential { base } => {
                let doublings = attempt.saturating_sub(1).min(MAX_BACKOFF_DOUBLINGS);
                base.saturating_mul(1u32 << doublings)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per fetch, including the first.
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub attempt_timeout: Duration,
}

/// Enforces a minimum gap between successive requests to one upstream source.
///
/// Shared by every extraction; the lock is held across the wait so issuance is serialized.
#[derive(Debug, Clone)]
pub struct RequestThrottle {
    min_interval: Duration,
    last_issued: Arc<Mutex<Option<Instant>>>,
}

impl RequestThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_issued: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn acquire(&self) {
        let mut last = self.last_issued.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            let wait = ready_at.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                tracing::debug!(?wait, "rate limit delay before upstream fetch");
                sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}
