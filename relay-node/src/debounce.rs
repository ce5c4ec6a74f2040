//! Per-session duplicate suppression.
//!
//! The same link is often posted several times in quick succession
//! (forwards, quote chains), and different links can resolve to the same
//! resource. Both get a per-session suppression window: first sighting
//! passes, repeats within the window are dropped.

use dashmap::DashMap;
use std::time::{Duration, Instant};

pub struct Debouncer {
    interval: Duration,
    cache: DashMap<(String, String), Instant>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            cache: DashMap::new(),
        }
    }

    /// Returns `true` if `key` was already seen in `session` within the
    /// window. A miss records the sighting.
    fn hit(&self, session: &str, key: String) -> bool {
        if self.interval.is_zero() {
            return false;
        }

        // Lazy expiry: drop stale entries whenever we are consulted.
        self.cache.retain(|_, seen_at| seen_at.elapsed() < self.interval);

        let entry = (session.to_string(), key);
        if self.cache.contains_key(&entry) {
            return true;
        }

        self.cache.insert(entry, Instant::now());
        false
    }

    /// Suppression keyed on the raw matched link.
    pub fn hit_link(&self, session: &str, link: &str) -> bool {
        self.hit(session, format!("link:{link}"))
    }

    /// Suppression keyed on the canonical resource identity, so distinct
    /// links to the same resource still dedupe.
    pub fn hit_resource(&self, session: &str, resource: &str) -> bool {
        self.hit(session, format!("res:{resource}"))
    }
}
