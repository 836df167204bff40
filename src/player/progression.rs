//! Per-job progression records and archived snapshots.
use crate::jobs::data::JobDef;

/// A player's level and experience within one job.
#[derive(Debug, Clone)]
pub struct JobProgression {
    job: String,
    level: i32,
    experience: f64,
    max_experience: f64,
}

impl JobProgression {
    pub fn new(def: &JobDef, level: i32, experience: f64) -> Self {
        let level = level.max(1);
        Self {
            job: def.name().to_string(),
            level,
            experience: experience.max(0.0),
            max_experience: def.max_experience(level),
        }
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn experience(&self) -> f64 {
        self.experience
    }

    pub fn max_experience(&self) -> f64 {
        self.max_experience
    }

    pub fn set_level(&mut self, level: i32) {
        self.level = level.max(1);
    }

    /// Re-labels this progression onto a different job, keeping level and
    /// experience (transfer semantics).
    pub fn relabel(&mut self, def: &JobDef) {
        self.job = def.name().to_string();
    }

    /// Recomputes the cached max-experience bound from the job's curve.
    pub fn reload_max_experience(&mut self, def: &JobDef) {
        self.max_experience = def.max_experience(self.level);
    }

    /// Adds experience, consuming level-ups while below `level_cap`.
    /// Returns `true` when at least one level was gained.
    pub fn add_experience(&mut self, amount: f64, level_cap: i32, def: &JobDef) -> bool {
        if amount <= 0.0 {
            return false;
        }

        self.experience += amount;
        let mut leveled = false;
        while self.experience >= self.max_experience && self.level < level_cap {
            self.experience -= self.max_experience;
            self.level += 1;
            self.reload_max_experience(def);
            leveled = true;
        }
        if self.level >= level_cap && self.experience > self.max_experience {
            self.experience = self.max_experience;
        }
        leveled
    }
}

/// Frozen snapshot captured at the moment of leaving a job, consumed once
/// on the next rejoin.
#[derive(Debug, Clone, Copy)]
pub struct ArchivedProgression {
    pub level: i32,
    pub experience: f64,
}

impl ArchivedProgression {
    pub fn capture(progression: &JobProgression) -> Self {
        Self {
            level: progression.level(),
            experience: progression.experience(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::data::JobRegistry;

    #[test]
    fn experience_gain_levels_up_and_clamps_at_cap() {
        let registry = JobRegistry::fallback();
        let farmer = registry.job("Farmer").expect("farmer should exist");
        let mut prog = JobProgression::new(farmer, 1, 0.0);

        // level 1 needs 14.0 exp on the fallback curve
        assert!(prog.add_experience(20.0, 10, farmer));
        assert_eq!(prog.level(), 2);
        assert!((prog.experience() - 6.0).abs() < 1e-9);

        // dumping a huge amount stops at the cap with clamped leftover
        assert!(prog.add_experience(100_000.0, 10, farmer));
        assert_eq!(prog.level(), 10);
        assert!(prog.experience() <= prog.max_experience());
    }

    #[test]
    fn archive_captures_current_state() {
        let registry = JobRegistry::fallback();
        let farmer = registry.job("Farmer").expect("farmer should exist");
        let mut prog = JobProgression::new(farmer, 4, 12.5);
        prog.set_level(6);
        prog.reload_max_experience(farmer);

        let archived = ArchivedProgression::capture(&prog);
        assert_eq!(archived.level, 6);
        assert_eq!(archived.experience, 12.5);
    }
}
