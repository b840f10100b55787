use super::CounterStore;
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct Window {
    count: u64,
    expires_at: Instant,
}

/// In-memory fixed-window counter. Stands in for the "shared counter
/// store" the spec assumes exists externally; this implementation never
/// actually fails, but `CounterStore::increment` still returns `Option`
/// so a networked backend can report unreachability without changing
/// `RateLimiter`.
#[derive(Default)]
pub struct DashMapCounterStore {
    windows: DashMap<String, Window>,
}

impl DashMapCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for DashMapCounterStore {
    fn increment(&self, key: &str, window_secs: u64) -> Option<u64> {
        let now = Instant::now();
        let mut entry = self.windows.entry(key.to_string()).or_insert_with(|| Window {
            count: 0,
            expires_at: now + Duration::from_secs(window_secs),
        });

        if entry.expires_at <= now {
            entry.count = 0;
            entry.expires_at = now + Duration::from_secs(window_secs);
        }

        entry.count += 1;
        Some(entry.count)
    }

    fn remaining(&self, key: &str, limit: u64) -> Option<u64> {
        let now = Instant::now();
        self.windows.get(key).map(|w| {
            if w.expires_at <= now {
                limit
            } else {
                limit.saturating_sub(w.count)
            }
        })
    }

    fn reset_in_seconds(&self, key: &str) -> Option<u64> {
        let now = Instant::now();
        self.windows
            .get(key)
            .map(|w| w.expires_at.saturating_duration_since(now).as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_within_window() {
        let store = DashMapCounterStore::new();
        assert_eq!(store.increment("k", 60), Some(1));
        assert_eq!(store.increment("k", 60), Some(2));
        assert_eq!(store.remaining("k", 100), Some(98));
    }

    #[test]
    fn window_resets_after_expiry() {
        let store = DashMapCounterStore::new();
        assert_eq!(store.increment("k", 0), Some(1));
        std::thread::sleep(Duration::from_millis(5));
        // window_secs=0 means already-expired on the next check
        assert_eq!(store.increment("k", 60), Some(1));
    }

    #[test]
    fn boundary_101st_request_exceeds_limit_of_100() {
        let store = DashMapCounterStore::new();
        let mut last = 0;
        for _ in 0..101 {
            last = store.increment("ip", 60).unwrap();
        }
        assert_eq!(last, 101);
        assert!(last > 100);
    }
}
