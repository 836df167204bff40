//! Per-action earnings log handed to the persistence sink.
use std::collections::HashMap;

/// Accumulated payouts for one action label.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EarningsEntry {
    pub count: u64,
    pub money: f64,
    pub points: f64,
    pub experience: f64,
}

/// Running earnings totals keyed by action label.
#[derive(Debug, Clone, Default)]
pub struct EarningsLog {
    entries: HashMap<String, EarningsEntry>,
}

impl EarningsLog {
    pub fn record(&mut self, action_label: &str, money: f64, points: f64, experience: f64) {
        let entry = self.entries.entry(action_label.to_string()).or_default();
        entry.count += 1;
        entry.money += money;
        entry.points += points;
        entry.experience += experience;
    }

    pub fn entry(&self, action_label: &str) -> Option<&EarningsEntry> {
        self.entries.get(action_label)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &EarningsEntry)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_accumulates_per_action() {
        let mut log = EarningsLog::default();
        log.record("gather", 2.0, 0.0, 3.0);
        log.record("gather", 1.0, 0.5, 1.0);
        log.record("craft", 4.0, 0.0, 4.0);

        let gather = log.entry("gather").expect("gather entry expected");
        assert_eq!(gather.count, 2);
        assert_eq!(gather.money, 3.0);
        assert_eq!(gather.points, 0.5);
        assert_eq!(log.entry("craft").map(|e| e.count), Some(1));
        assert_eq!(log.entry("hunt"), None);
    }
}
