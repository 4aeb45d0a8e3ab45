//! Fixed-rate admission control for outbound calls.

use std::num::NonZeroU32;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

/// Admits one caller per fixed interval.
///
/// There is no burst allowance: the slot after an idle period is "now", and
/// every following slot is exactly one interval after the previous one.
#[derive(Debug)]
pub struct FixedRateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl FixedRateLimiter {
    pub fn per_second(ceiling: NonZeroU32) -> Self {
        Self::with_interval(Duration::from_secs(1) / ceiling.get())
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until the next slot is available and claims it.
    pub async fn acquire(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next_slot = Some(slot + self.interval);
            slot
        };

        if slot > Instant::now() {
            log::trace!("rate limiter holding call for {:?}", slot - Instant::now());
            sleep_until(slot).await;
        }
    }
}
