// Fixed-interval pacing between requests
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::trace;

/// Something to await between two requests so we stay under the API quota.
///
/// Production code sleeps; tests plug in `NoDelay`.
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn wait(&self);
}

/// Waits the same amount of time on every call
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

#[async_trait]
impl Throttle for FixedDelay {
    async fn wait(&self) {
        trace!("Pausing {}ms", self.delay.as_millis());
        sleep(self.delay).await;
    }
}

/// Never waits
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Throttle for NoDelay {
    async fn wait(&self) {}
}
