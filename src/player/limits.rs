//! Per-currency payment accumulation against configured caps.
use std::collections::HashMap;

use crate::jobs::components::Currency;

#[derive(Debug, Clone, Default)]
struct LimitWindow {
    amount: f64,
    window_started_ms: i64,
    informed: bool,
    reset: bool,
    last_announced_ms: i64,
}

/// Tracks accumulated payouts per currency inside rolling time windows.
///
/// Accumulation is monotonic within a window; when the window rolls over
/// the amount is zeroed and the reset flag raised so callers can clear
/// the one-shot warning state.
#[derive(Debug, Clone, Default)]
pub struct PaymentLimits {
    entries: HashMap<Currency, LimitWindow>,
}

impl PaymentLimits {
    fn window_mut(&mut self, currency: Currency) -> &mut LimitWindow {
        self.entries.entry(currency).or_default()
    }

    /// Whether the cap is reached for this currency, rolling the window
    /// over first when it has expired. A non-positive cap never blocks.
    pub fn reached(&mut self, currency: Currency, cap: f64, window_ms: i64, now_ms: i64) -> bool {
        let window = self.window_mut(currency);
        if window.window_started_ms > 0 && now_ms - window.window_started_ms >= window_ms {
            window.amount = 0.0;
            window.window_started_ms = 0;
            window.informed = false;
            window.reset = true;
        }

        cap > 0.0 && window.amount >= cap
    }

    /// Accumulates an allowed payment, opening a window if none is active.
    pub fn add(&mut self, currency: Currency, amount: f64, now_ms: i64) {
        let window = self.window_mut(currency);
        if window.window_started_ms == 0 {
            window.window_started_ms = now_ms;
        }
        window.amount += amount;
    }

    pub fn amount(&self, currency: Currency) -> f64 {
        self.entries.get(&currency).map(|w| w.amount).unwrap_or(0.0)
    }

    pub fn informed(&self, currency: Currency) -> bool {
        self.entries
            .get(&currency)
            .map(|w| w.informed)
            .unwrap_or(false)
    }

    pub fn set_informed(&mut self, currency: Currency, informed: bool) {
        self.window_mut(currency).informed = informed;
    }

    pub fn was_reset(&self, currency: Currency) -> bool {
        self.entries
            .get(&currency)
            .map(|w| w.reset)
            .unwrap_or(false)
    }

    pub fn clear_reset(&mut self, currency: Currency) {
        self.window_mut(currency).reset = false;
    }

    /// One announcement per configured delay; returns `true` when due and
    /// stamps the announcement time.
    pub fn announce_due(&mut self, currency: Currency, delay_ms: i64, now_ms: i64) -> bool {
        let window = self.window_mut(currency);
        if now_ms - window.last_announced_ms >= delay_ms {
            window.last_announced_ms = now_ms;
            return true;
        }
        false
    }

    /// Milliseconds until the active window rolls over.
    pub fn time_left_ms(&self, currency: Currency, window_ms: i64, now_ms: i64) -> i64 {
        match self.entries.get(&currency) {
            Some(window) if window.window_started_ms > 0 => {
                (window.window_started_ms + window_ms - now_ms).max(0)
            }
            _ => window_ms,
        }
    }

    /// Administrative reset: zero every currency and raise reset flags.
    pub fn reset_all(&mut self) {
        for window in self.entries.values_mut() {
            window.amount = 0.0;
            window.window_started_ms = 0;
            window.informed = false;
            window.reset = true;
        }
    }
}

/// Compact `HH:MM:SS` rendering for limit countdown messages.
pub fn format_time_left(ms: i64) -> String {
    let total_seconds = (ms.max(0)) / 1_000;
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 3_600,
        (total_seconds % 3_600) / 60,
        total_seconds % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: i64 = 3_600_000;

    #[test]
    fn accumulation_is_monotonic_within_a_window() {
        let mut limits = PaymentLimits::default();
        limits.add(Currency::Money, 40.0, 1_000);
        limits.add(Currency::Money, 25.0, 2_000);
        assert_eq!(limits.amount(Currency::Money), 65.0);
        assert!(!limits.reached(Currency::Money, 100.0, WINDOW, 3_000));
        assert!(limits.reached(Currency::Money, 60.0, WINDOW, 3_000));
    }

    #[test]
    fn expired_window_rolls_over_and_flags_reset() {
        let mut limits = PaymentLimits::default();
        limits.add(Currency::Money, 90.0, 1_000);
        limits.set_informed(Currency::Money, true);

        assert!(!limits.reached(Currency::Money, 50.0, WINDOW, 1_000 + WINDOW));
        assert_eq!(limits.amount(Currency::Money), 0.0);
        assert!(limits.was_reset(Currency::Money));
        assert!(!limits.informed(Currency::Money));
    }

    #[test]
    fn non_positive_cap_never_blocks() {
        let mut limits = PaymentLimits::default();
        limits.add(Currency::Points, 500.0, 1_000);
        assert!(!limits.reached(Currency::Points, 0.0, WINDOW, 2_000));
    }

    #[test]
    fn announcements_are_throttled() {
        let mut limits = PaymentLimits::default();
        assert!(limits.announce_due(Currency::Money, 30_000, 40_000));
        assert!(!limits.announce_due(Currency::Money, 30_000, 50_000));
        assert!(limits.announce_due(Currency::Money, 30_000, 70_000));
    }

    #[test]
    fn time_left_counts_down() {
        let mut limits = PaymentLimits::default();
        limits.add(Currency::Money, 1.0, 10_000);
        assert_eq!(
            limits.time_left_ms(Currency::Money, WINDOW, 10_000 + 600_000),
            WINDOW - 600_000
        );
    }

    #[test]
    fn time_left_formats_as_clock() {
        assert_eq!(format_time_left(3_725_000), "01:02:05");
        assert_eq!(format_time_left(-5), "00:00:00");
    }
}
