//! Per-quest completion state for one player.
use crate::jobs::{components::ActionType, data::QuestDef};

/// Progress toward one objective of an assigned quest.
#[derive(Debug, Clone)]
pub struct ObjectiveProgress {
    pub action: ActionType,
    pub target_key: String,
    pub target_count: u32,
    pub done: u32,
}

/// A player's in-progress state for one assigned quest.
///
/// Objectives are snapshotted from the quest definition at assignment, so
/// progress survives reference-data edits until the quest rotates out.
#[derive(Debug, Clone)]
pub struct QuestProgression {
    job: String,
    quest: String,
    valid_until_ms: i64,
    assigned_at_ms: i64,
    objectives: Vec<ObjectiveProgress>,
    reward_given: bool,
}

impl QuestProgression {
    pub fn from_def(job: &str, def: &QuestDef, now_ms: i64) -> Self {
        Self {
            job: job.to_string(),
            quest: def.name().to_string(),
            valid_until_ms: now_ms + def.duration_ms(),
            assigned_at_ms: now_ms,
            objectives: def
                .objectives()
                .iter()
                .map(|o| ObjectiveProgress {
                    action: o.action,
                    target_key: o.target_key.clone(),
                    target_count: o.count,
                    done: 0,
                })
                .collect(),
            reward_given: false,
        }
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn quest_name(&self) -> &str {
        &self.quest
    }

    pub fn valid_until_ms(&self) -> i64 {
        self.valid_until_ms
    }

    pub fn assigned_at_ms(&self) -> i64 {
        self.assigned_at_ms
    }

    pub fn objectives(&self) -> &[ObjectiveProgress] {
        &self.objectives
    }

    pub fn reward_given(&self) -> bool {
        self.reward_given
    }

    pub fn set_reward_given(&mut self, given: bool) {
        self.reward_given = given;
    }

    pub fn is_completed(&self) -> bool {
        !self.objectives.is_empty() && self.objectives.iter().all(|o| o.done >= o.target_count)
    }

    /// Completed or past its expiry timestamp.
    pub fn is_ended(&self, now_ms: i64) -> bool {
        self.is_completed() || now_ms > self.valid_until_ms
    }

    pub fn matches_action(&self, action: ActionType) -> bool {
        self.objectives.iter().any(|o| o.action == action)
    }

    /// Applies objective progress. Returns `true` when this call completed
    /// the quest. Ended quests ignore further progress.
    pub fn record(&mut self, action: ActionType, target_key: &str, amount: u32, now_ms: i64) -> bool {
        if self.is_ended(now_ms) {
            return false;
        }

        let Some(objective) = self
            .objectives
            .iter_mut()
            .find(|o| o.action == action && o.target_key.eq_ignore_ascii_case(target_key))
        else {
            return false;
        };

        objective.done = (objective.done + amount).min(objective.target_count);
        self.is_completed()
    }

    /// Restores a completed count directly (codec path); capped at target.
    pub fn set_done(&mut self, action: ActionType, target_key: &str, done: u32) {
        if let Some(objective) = self
            .objectives
            .iter_mut()
            .find(|o| o.action == action && o.target_key.eq_ignore_ascii_case(target_key))
        {
            objective.done = done.min(objective.target_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::data::JobRegistry;

    fn grain_run(now_ms: i64) -> QuestProgression {
        let registry = JobRegistry::fallback();
        let farmer = registry.job("Farmer").expect("farmer should exist");
        let quest = farmer.quest("GrainRun").expect("quest should exist");
        QuestProgression::from_def(farmer.name(), quest, now_ms)
    }

    #[test]
    fn progress_completes_once_all_objectives_reached() {
        let mut prog = grain_run(1_000);
        assert!(!prog.record(ActionType::Gather, "grain", 9, 2_000));
        assert!(!prog.is_completed());
        assert!(prog.record(ActionType::Gather, "GRAIN", 1, 3_000));
        assert!(prog.is_completed());
        assert!(prog.is_ended(3_000));
    }

    #[test]
    fn ended_quests_ignore_further_progress() {
        let mut prog = grain_run(1_000);
        let past_expiry = prog.valid_until_ms() + 1;
        assert!(!prog.record(ActionType::Gather, "grain", 5, past_expiry));
        assert_eq!(prog.objectives()[0].done, 0);
    }

    #[test]
    fn mismatched_action_or_target_is_ignored() {
        let mut prog = grain_run(1_000);
        assert!(!prog.record(ActionType::Craft, "grain", 3, 2_000));
        assert!(!prog.record(ActionType::Gather, "seeds", 3, 2_000));
        assert_eq!(prog.objectives()[0].done, 0);
    }

    #[test]
    fn done_counts_cap_at_target() {
        let mut prog = grain_run(1_000);
        prog.set_done(ActionType::Gather, "grain", 400);
        assert_eq!(prog.objectives()[0].done, 10);
    }
}
