//! Shared circuit-breaker primitive: a process-wide volatile flag that
//! flips unhealthy on failure and decays back to healthy after a fixed
//! window. Used by LLMClient (spec.md §4.10) and MetadataFetcher
//! (spec.md §4.11), both of which degrade to a neutral/default result
//! rather than retrying a backend that just failed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Staleness up to `decay_secs` is tolerable per the concurrency model,
/// so reads/writes are plain atomics, no lock.
pub struct HealthGate {
    available: AtomicBool,
    last_checked_unix: AtomicU64,
    decay_secs: u64,
}

impl HealthGate {
    pub fn new(decay_secs: u64) -> Self {
        Self {
            available: AtomicBool::new(true),
            last_checked_unix: AtomicU64::new(0),
            decay_secs,
        }
    }

    pub fn mark_failed(&self) {
        self.available.store(false, Ordering::Relaxed);
        self.last_checked_unix.store(now_unix(), Ordering::Relaxed);
    }

    pub fn mark_healthy(&self) {
        self.available.store(true, Ordering::Relaxed);
        self.last_checked_unix.store(now_unix(), Ordering::Relaxed);
    }

    /// Treats a gate that has never failed, or whose failure has decayed,
    /// as healthy.
    pub fn is_healthy(&self) -> bool {
        if self.available.load(Ordering::Relaxed) {
            return true;
        }
        let last = self.last_checked_unix.load(Ordering::Relaxed);
        now_unix().saturating_sub(last) >= self.decay_secs
    }
}

fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_available() {
        let gate = HealthGate::new(30);
        assert!(gate.is_healthy());
    }

    #[test]
    fn clears_on_failure() {
        let gate = HealthGate::new(30);
        gate.mark_failed();
        assert!(!gate.is_healthy());
    }

    #[test]
    fn recovers_on_success() {
        let gate = HealthGate::new(30);
        gate.mark_failed();
        gate.mark_healthy();
        assert!(gate.is_healthy());
    }
}
