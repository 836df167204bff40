//! Bounded daily-quest rotation per job.
use std::collections::HashMap;

use crate::jobs::{components::ActionType, data::JobDef};

use super::progress::QuestProgression;

/// A job the rotation may draw replacement quests from.
pub struct RotationScope<'a> {
    pub def: &'a JobDef,
    pub level: i32,
    pub max_daily: usize,
}

/// All active quest progressions for one player, keyed by job then quest
/// (both case-insensitive).
#[derive(Debug, Clone, Default)]
pub struct QuestLog {
    by_job: HashMap<String, HashMap<String, QuestProgression>>,
    done_quests: u32,
    skipped_quests: u32,
    board_update_due: Option<(String, i64)>,
}

impl QuestLog {
    /// Recomputes one job's rotation: evicts ended entries, refills from the
    /// job's deterministic candidate order up to `max_daily`, and trims any
    /// overshoot by evicting least-recently-assigned entries first.
    pub fn rotate(&mut self, def: &JobDef, player_level: i32, max_daily: usize, now_ms: i64) {
        let set = self.by_job.entry(def.name().to_lowercase()).or_default();

        set.retain(|_, prog| !prog.is_ended(now_ms));

        while set.len() < max_daily {
            let exclude: Vec<String> = set
                .values()
                .map(|p| p.quest_name().to_lowercase())
                .collect();
            let Some(candidate) = def.next_quest(&exclude, player_level) else {
                break;
            };
            set.insert(
                candidate.name().to_lowercase(),
                QuestProgression::from_def(def.name(), candidate, now_ms),
            );
        }

        while set.len() > max_daily {
            let victim = set
                .values()
                .min_by(|a, b| {
                    a.assigned_at_ms()
                        .cmp(&b.assigned_at_ms())
                        .then_with(|| a.quest_name().cmp(b.quest_name()))
                })
                .map(|p| p.quest_name().to_lowercase());
            let Some(victim) = victim else {
                break;
            };
            set.remove(&victim);
        }
    }

    /// Rotates, then returns the job's active set ordered by assignment
    /// time. A filter keeps only quests with an objective of that action.
    pub fn active_quests(
        &mut self,
        def: &JobDef,
        player_level: i32,
        max_daily: usize,
        filter: Option<ActionType>,
        now_ms: i64,
    ) -> Vec<&QuestProgression> {
        self.rotate(def, player_level, max_daily, now_ms);
        self.active(def.name(), filter)
    }

    /// Current set without recomputation.
    pub fn active(&self, job: &str, filter: Option<ActionType>) -> Vec<&QuestProgression> {
        let Some(set) = self.by_job.get(&job.to_lowercase()) else {
            return Vec::new();
        };
        let mut quests: Vec<&QuestProgression> = set
            .values()
            .filter(|p| filter.map_or(true, |action| p.matches_action(action)))
            .collect();
        quests.sort_by(|a, b| {
            a.assigned_at_ms()
                .cmp(&b.assigned_at_ms())
                .then_with(|| a.quest_name().cmp(b.quest_name()))
        });
        quests
    }

    pub fn in_rotation(&self, job: &str, quest: &str) -> bool {
        self.by_job
            .get(&job.to_lowercase())
            .is_some_and(|set| set.contains_key(&quest.to_lowercase()))
    }

    /// Applies objective progress across one job's set; returns the names of
    /// quests this call completed.
    pub fn record_action(
        &mut self,
        job: &str,
        action: ActionType,
        target_key: &str,
        amount: u32,
        now_ms: i64,
    ) -> Vec<String> {
        let Some(set) = self.by_job.get_mut(&job.to_lowercase()) else {
            return Vec::new();
        };

        let mut completed = Vec::new();
        for prog in set.values_mut() {
            if prog.record(action, target_key, amount, now_ms) {
                completed.push(prog.quest_name().to_string());
            }
        }
        completed
    }

    /// Swaps a completed quest for the next available candidate: the same
    /// job first, then the other provided scopes in order. No-ops when no
    /// candidate exists, the candidate matches the completed quest, it is
    /// already active in its destination job, or a cross-job destination is
    /// full. A successful swap counts as a skip.
    pub fn replace_quest(
        &mut self,
        source_job: &str,
        completed_quest: &str,
        scopes: &[RotationScope],
        now_ms: i64,
    ) -> bool {
        let source_first = scopes
            .iter()
            .filter(|s| s.def.name().eq_ignore_ascii_case(source_job))
            .chain(
                scopes
                    .iter()
                    .filter(|s| !s.def.name().eq_ignore_ascii_case(source_job)),
            );

        let mut candidate = None;
        for scope in source_first {
            let exclude: Vec<String> = self
                .active(scope.def.name(), None)
                .iter()
                .map(|p| p.quest_name().to_lowercase())
                .collect();
            if let Some(quest) = scope.def.next_quest(&exclude, scope.level) {
                candidate = Some((scope.def, quest, scope.max_daily));
                break;
            }
        }
        let Some((dest_def, quest, dest_max)) = candidate else {
            return false;
        };

        if quest.name().eq_ignore_ascii_case(completed_quest) {
            return false;
        }

        let dest_key = dest_def.name().to_lowercase();
        if self.in_rotation(dest_def.name(), quest.name()) {
            return false;
        }

        let cross_job = !dest_def.name().eq_ignore_ascii_case(source_job);
        let dest_len = self.by_job.get(&dest_key).map(|m| m.len()).unwrap_or(0);
        if cross_job && dest_len >= dest_max {
            return false;
        }

        if let Some(source_set) = self.by_job.get_mut(&source_job.to_lowercase()) {
            source_set.remove(&completed_quest.to_lowercase());
        }
        self.by_job.entry(dest_key).or_default().insert(
            quest.name().to_lowercase(),
            QuestProgression::from_def(dest_def.name(), quest, now_ms),
        );
        self.skipped_quests += 1;
        true
    }

    /// Inserts a progression directly (codec restore path), replacing any
    /// entry with the same quest key.
    pub fn insert(&mut self, prog: QuestProgression) {
        self.by_job
            .entry(prog.job().to_lowercase())
            .or_default()
            .insert(prog.quest_name().to_lowercase(), prog);
    }

    pub fn set_reward_given(&mut self, job: &str, quest: &str) {
        if let Some(prog) = self
            .by_job
            .get_mut(&job.to_lowercase())
            .and_then(|set| set.get_mut(&quest.to_lowercase()))
        {
            prog.set_reward_given(true);
        }
    }

    /// Every stored progression, ordered by job then quest name.
    pub fn progressions(&self) -> Vec<&QuestProgression> {
        let mut all: Vec<&QuestProgression> = self
            .by_job
            .values()
            .flat_map(|set| set.values())
            .collect();
        all.sort_by(|a, b| {
            a.job()
                .cmp(b.job())
                .then_with(|| a.quest_name().cmp(b.quest_name()))
        });
        all
    }

    pub fn reset_job(&mut self, job: &str) {
        self.by_job.remove(&job.to_lowercase());
    }

    pub fn reset_all(&mut self) {
        self.by_job.clear();
    }

    pub fn done_quests(&self) -> u32 {
        self.done_quests
    }

    /// Restores the completion counter (load path).
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn set_done_quests(&mut self, done: u32) {
        self.done_quests = done;
    }

    pub fn skipped_quests(&self) -> u32 {
        self.skipped_quests
    }

    /// Restores the skip counter (load path).
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn set_skipped_quests(&mut self, skipped: u32) {
        self.skipped_quests = skipped;
    }

    /// Counts a completion and schedules a quest-board refresh signal if
    /// none is pending. The core only records the due time; a scheduler
    /// system consumes it.
    pub fn record_done(&mut self, job: &str, due_ms: i64) {
        self.done_quests += 1;
        if self.board_update_due.is_none() {
            self.board_update_due = Some((job.to_string(), due_ms));
        }
    }

    /// Takes the pending board-refresh signal once its due time passes.
    pub fn take_due_board_update(&mut self, now_ms: i64) -> Option<String> {
        match &self.board_update_due {
            Some((_, due)) if now_ms >= *due => {
                self.board_update_due.take().map(|(job, _)| job)
            }
            _ => None,
        }
    }
}
