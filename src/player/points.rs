//! Points wallet tracking spendable and lifetime totals.

/// Spendable points plus a lifetime counter that only grows.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerPoints {
    current: f64,
    total: f64,
}

impl PlayerPoints {
    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn add(&mut self, points: f64) {
        if points <= 0.0 {
            return;
        }
        self.current += points;
        self.total += points;
    }

    pub fn take(&mut self, points: f64) {
        if points <= 0.0 {
            return;
        }
        self.current = (self.current - points).max(0.0);
    }

    /// Restores wallet contents (load path).
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn set(&mut self, current: f64, total: f64) {
        self.current = current.max(0.0);
        self.total = total.max(0.0);
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn have(&self, points: f64) -> bool {
        self.current >= points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_tracks_current_and_total() {
        let mut points = PlayerPoints::default();
        points.add(10.0);
        points.add(5.0);
        points.take(12.0);

        assert_eq!(points.current(), 3.0);
        assert_eq!(points.total(), 15.0);
        assert!(points.have(3.0));
        assert!(!points.have(3.1));
    }

    #[test]
    fn take_floors_at_zero() {
        let mut points = PlayerPoints::default();
        points.add(4.0);
        points.take(100.0);
        assert_eq!(points.current(), 0.0);
    }
}
