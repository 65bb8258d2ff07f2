use std::time::{Duration, Instant};

use dashmap::DashMap;

const WINDOW: Duration = Duration::from_secs(15 * 60);
const MAX_REQUESTS: u32 = 5;

/// Per-email limiter for reset-link requests: 5 per 15 minutes. Every
/// request counts (the point is to stop someone flooding a mailbox), so
/// `check` both tests and records.
pub struct ResetRateLimiter {
    /// email -> (count, window_start)
    entries: DashMap<String, (u32, Instant)>,
}

impl ResetRateLimiter {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Returns Ok(()) and counts the request, or Err with seconds until the
    /// window reopens.
    pub fn check(&self, email: &str) -> Result<(), u64> {
        let now = Instant::now();

        let mut entry = self.entries.entry(email.to_lowercase()).or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > WINDOW {
            *count = 1;
            *start = now;
            return Ok(());
        }

        if *count >= MAX_REQUESTS {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(WINDOW.as_secs().saturating_sub(elapsed));
        }

        *count += 1;
        Ok(())
    }

    /// Remove stale entries older than the given duration.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.entries
            .retain(|_, (_, start)| now.duration_since(*start) < max_age);
    }
}
