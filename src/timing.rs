use std::time::Duration;

use tokio::time::Instant;

/// Waits the uploader inserts while Frontify catches up with its own writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Pause after each completed phase before the next request is issued.
    pub settle_delay: Duration,
    /// Pause between two `AssetById` polls that found the asset unfinished.
    pub poll_interval: Duration,
    /// Processing allowance per uploaded chunk; bounds the whole poll loop.
    pub ready_timeout_per_chunk: Duration,
    /// Upper bound of a single GraphQL request or chunk PUT.
    pub request_timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(1),
            poll_interval: Duration::from_secs(10),
            ready_timeout_per_chunk: Duration::from_secs(5 * 60),
            request_timeout: Duration::from_secs(100),
        }
    }
}

impl Timing {
    pub fn ready_deadline(&self, chunk_count: usize) -> Duration {
        self.ready_timeout_per_chunk
            .saturating_mul(chunk_count.max(1) as u32)
    }

    pub(crate) async fn settle(&self) {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
    }

    /// Never sleeps past `deadline`.
    pub(crate) async fn before_next_poll(&self, deadline: Instant) {
        let wake = Instant::now()
            .checked_add(self.poll_interval)
            .map_or(deadline, |wake| wake.min(deadline));
        tokio::time::sleep_until(wake).await;
    }
}
