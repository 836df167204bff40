//! Time-windowed cache of resolved payout multipliers.
use std::collections::HashMap;

use crate::jobs::components::Currency;

#[derive(Debug, Clone, Copy)]
struct BoostEntry {
    value: f64,
    computed_at_ms: i64,
}

/// Per-(job, currency) boost cache with a fixed freshness window.
#[derive(Debug, Clone, Default)]
pub struct BoostCache {
    entries: HashMap<(String, Currency), BoostEntry>,
}

impl BoostCache {
    /// Returns the cached value while fresh; otherwise resolves, stores and
    /// returns the new value. `force` bypasses the freshness check.
    pub fn get_or_resolve(
        &mut self,
        job: &str,
        currency: Currency,
        force: bool,
        now_ms: i64,
        window_ms: i64,
        resolve: impl FnOnce() -> f64,
    ) -> f64 {
        let key = (job.to_lowercase(), currency);
        if let Some(entry) = self.entries.get_mut(&key) {
            if !force && now_ms - entry.computed_at_ms <= window_ms {
                return entry.value;
            }
            let value = resolve();
            entry.value = value;
            entry.computed_at_ms = now_ms;
            return value;
        }

        let value = resolve();
        self.entries.insert(
            key,
            BoostEntry {
                value,
                computed_at_ms: now_ms,
            },
        );
        value
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
