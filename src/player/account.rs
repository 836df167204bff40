//! The per-player aggregate owning all progression, quest, boost and
//! payment-limit state.
use std::collections::HashMap;

use bevy::prelude::*;

use crate::jobs::{
    components::{ActionType, Currency},
    config::ProgressionConfig,
    data::{JobDef, JobRegistry, PayoutDef},
};
use crate::quests::{codec, QuestLog, QuestProgression, RotationScope};

use super::{
    boost::BoostCache,
    collaborators::{AccountSnapshot, Collaborators, JobSnapshot},
    components::PlayerId,
    decay,
    honorific,
    limits::{format_time_left, PaymentLimits},
    log::EarningsLog,
    points::PlayerPoints,
    progression::{ArchivedProgression, JobProgression},
};

/// Shared read-only context threaded through aggregate operations.
pub struct EngineContext<'a> {
    pub registry: &'a JobRegistry,
    pub config: &'a ProgressionConfig,
    pub hooks: &'a Collaborators,
    pub now_ms: i64,
}

/// All mutable state for one player. Exclusive ownership of this component
/// is the per-player mutual-exclusion scope: every mutating operation takes
/// `&mut self`, so hosts either hand it to the ECS scheduler or wrap it in
/// a mutex.
#[derive(Component, Debug)]
pub struct PlayerAccount {
    id: PlayerId,
    name: String,
    progression: Vec<JobProgression>,
    archived: HashMap<String, ArchivedProgression>,
    left_times: HashMap<String, i64>,
    limits: HashMap<Currency, i32>,
    boosts: BoostCache,
    payments: PaymentLimits,
    quests: QuestLog,
    points: PlayerPoints,
    earnings: EarningsLog,
    honorific: String,
    connected: bool,
    last_seen_ms: i64,
    saved: bool,
    max_jobs_snapshot: i32,
}

impl PlayerAccount {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            progression: Vec::new(),
            archived: HashMap::new(),
            left_times: HashMap::new(),
            limits: HashMap::new(),
            boosts: BoostCache::default(),
            payments: PaymentLimits::default(),
            quests: QuestLog::default(),
            points: PlayerPoints::default(),
            earnings: EarningsLog::default(),
            honorific: String::new(),
            connected: false,
            last_seen_ms: 0,
            saved: true,
            max_jobs_snapshot: 0,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn honorific(&self) -> &str {
        &self.honorific
    }

    pub fn is_online(&self) -> bool {
        self.connected
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn last_seen_ms(&self) -> i64 {
        self.last_seen_ms
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn mark_dirty(&mut self) {
        self.saved = false;
    }

    pub fn points(&self) -> &PlayerPoints {
        &self.points
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn earnings(&self) -> &EarningsLog {
        &self.earnings
    }

    pub fn done_quests(&self) -> u32 {
        self.quests.done_quests()
    }

    pub fn skipped_quests(&self) -> u32 {
        self.quests.skipped_quests()
    }

    // ---- membership -----------------------------------------------------

    pub fn is_in_job(&self, job: &str) -> bool {
        self.progression
            .iter()
            .any(|p| p.job().eq_ignore_ascii_case(job))
    }

    pub fn job_progression(&self, job: &str) -> Option<&JobProgression> {
        self.progression
            .iter()
            .find(|p| p.job().eq_ignore_ascii_case(job))
    }

    pub fn progression(&self) -> &[JobProgression] {
        &self.progression
    }

    pub fn total_levels(&self) -> i32 {
        self.progression.iter().map(JobProgression::level).sum()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn archived(&self, job: &str) -> Option<&ArchivedProgression> {
        self.archived.get(&job.to_lowercase())
    }

    /// Joins a job. Rejoining consumes the archived snapshot, applying the
    /// configured decay to level and experience.
    pub fn join_job(&mut self, job: &str, ctx: &EngineContext) -> bool {
        let Some(def) = ctx.registry.job(job) else {
            return false;
        };
        if self.is_in_job(def.name()) {
            return false;
        }

        let mut level = 1;
        let mut experience = 0.0;
        if let Some(archived) = self.archived.remove(&def.name().to_lowercase()) {
            let max_allowed = self.max_job_level_allowed(def, ctx.hooks);
            level = decay::level_after_rejoin(archived.level, max_allowed, &ctx.config.decay);
            experience = decay::exp_after_rejoin(
                archived.level,
                archived.experience,
                def.max_experience(level),
                max_allowed,
                &ctx.config.decay,
            );
        }

        self.progression.push(JobProgression::new(def, level, experience));
        self.refresh_derived(ctx);
        true
    }

    /// Leaves a job, archiving the current progression for a later rejoin.
    pub fn leave_job(&mut self, job: &str, ctx: &EngineContext) -> bool {
        let Some(position) = self
            .progression
            .iter()
            .position(|p| p.job().eq_ignore_ascii_case(job))
        else {
            return false;
        };

        let prog = self.progression.remove(position);
        let key = prog.job().to_lowercase();
        self.archived
            .insert(key.clone(), ArchivedProgression::capture(&prog));
        if ctx.config.rejoin_cooldown_hours > 0 {
            self.left_times
                .insert(key, ctx.now_ms + ctx.config.rejoin_cooldown_hours * 3_600_000);
        }

        self.refresh_derived(ctx);
        true
    }

    /// Drops every membership at once without archiving.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn leave_all_jobs(&mut self, ctx: &EngineContext) -> bool {
        self.progression.clear();
        self.refresh_derived(ctx);
        true
    }

    /// Moves progression from one job to another in place, keeping the
    /// accumulated experience and clamping to the new job's level ceiling.
    pub fn transfer_job(&mut self, old_job: &str, new_job: &str, ctx: &EngineContext) -> bool {
        let Some(new_def) = ctx.registry.job(new_job) else {
            return false;
        };
        if self.is_in_job(new_def.name()) {
            return false;
        }

        let max_allowed = self.max_job_level_allowed(new_def, ctx.hooks);
        let Some(prog) = self
            .progression
            .iter_mut()
            .find(|p| p.job().eq_ignore_ascii_case(old_job))
        else {
            return false;
        };

        prog.relabel(new_def);
        if prog.level() > max_allowed {
            prog.set_level(max_allowed);
        }

        self.refresh_derived(ctx);
        true
    }

    /// Raises the level in a job, clamped to the effective ceiling.
    pub fn promote_job(&mut self, job: &str, levels: i32, ctx: &EngineContext) -> bool {
        if levels <= 0 {
            return false;
        }
        let Some(def) = ctx.registry.job(job) else {
            return false;
        };
        let Some(prog) = self.job_progression(def.name()) else {
            return false;
        };

        let max_allowed = self.max_job_level_allowed(def, ctx.hooks);
        let new_level = (prog.level() + levels).min(max_allowed);
        self.set_level(job, new_level, ctx);
        true
    }

    /// Lowers the level in a job, floored at 1.
    pub fn demote_job(&mut self, job: &str, levels: i32, ctx: &EngineContext) -> bool {
        if levels <= 0 {
            return false;
        }
        let Some(prog) = self.job_progression(job) else {
            return false;
        };

        let new_level = (prog.level() - levels).max(1);
        self.set_level(job, new_level, ctx);
        true
    }

    fn set_level(&mut self, job: &str, level: i32, ctx: &EngineContext) {
        let Some(prog) = self
            .progression
            .iter_mut()
            .find(|p| p.job().eq_ignore_ascii_case(job))
        else {
            return;
        };

        if level == prog.level() {
            return;
        }
        prog.set_level(level);
        if let Some(def) = ctx.registry.job(job) {
            prog.reload_max_experience(def);
        }
        self.refresh_rank_derived(ctx);
    }

    /// Effective level ceiling: the vip ceiling when the matching capability
    /// is granted for the job or globally, widened further by the largest
    /// numeric override.
    pub fn max_job_level_allowed(&self, def: &JobDef, hooks: &Collaborators) -> i32 {
        let job_key = def.name().to_lowercase();
        let vip_key = format!("maxlevel.vip.{job_key}");
        let vip = hooks.capabilities.has_capability(self.id, &vip_key)
            || hooks.capabilities.has_capability(self.id, "maxlevel.vip.all");

        let mut max = if vip {
            def.vip_max_level().max(def.max_level())
        } else {
            def.max_level()
        };

        let override_for_job = hooks.capabilities.max_value(self.id, &vip_key) as i32;
        if override_for_job > max {
            max = override_for_job;
        }
        let override_for_all = hooks.capabilities.max_value(self.id, "maxlevel.vip.all") as i32;
        if override_for_all > max {
            max = override_for_all;
        }
        max
    }

    // ---- derived state --------------------------------------------------

    /// Recomputes everything membership changes can invalidate: per-job
    /// max-experience bounds, currency limits, the honorific, cached
    /// boosts, and externally-held capability caches.
    fn refresh_derived(&mut self, ctx: &EngineContext) {
        self.reload_max_experience(ctx.registry);
        self.refresh_rank_derived(ctx);
    }

    /// The narrower recompute after pure level changes: limits, honorific
    /// and capability caches; max-experience is the caller's concern.
    fn refresh_rank_derived(&mut self, ctx: &EngineContext) {
        self.reload_limits(ctx);
        self.reload_honorific(ctx);
        self.boosts.clear();
        ctx.hooks.capabilities.refresh(self.id);
        self.saved = false;
    }

    pub fn reload_max_experience(&mut self, registry: &JobRegistry) {
        for prog in &mut self.progression {
            if let Some(def) = registry.job(prog.job()) {
                prog.reload_max_experience(def);
            }
        }
    }

    /// Recomputes one currency's cap from the limit equation. Also refreshes
    /// the max-jobs snapshot payout dilution reads.
    pub fn reload_limit(&mut self, currency: Currency, ctx: &EngineContext) {
        let total_levels = self.total_levels();
        self.max_jobs_snapshot = ctx.hooks.max_jobs.max_jobs(self.id);
        let cap = ctx
            .hooks
            .equations
            .cap(currency, total_levels, self.max_jobs_snapshot);
        self.limits.insert(currency, cap as i32);
        self.saved = false;
    }

    pub fn reload_limits(&mut self, ctx: &EngineContext) {
        for currency in Currency::ALL {
            self.reload_limit(currency, ctx);
        }
    }

    pub fn reload_honorific(&mut self, ctx: &EngineContext) {
        self.honorific = honorific::compose(&self.progression, ctx.registry, &ctx.config.honorific);
    }

    pub fn limit(&self, currency: Currency) -> i32 {
        self.limits.get(&currency).copied().unwrap_or(0)
    }

    // ---- boosts ---------------------------------------------------------

    /// Boost multiplier for a job and currency. Offline players always get
    /// 0 without touching the cache; otherwise cached values are reused
    /// inside the freshness window unless `force` is set.
    pub fn boost(&mut self, job: &str, currency: Currency, force: bool, ctx: &EngineContext) -> f64 {
        if !self.is_online() {
            return 0.0;
        }

        let id = self.id;
        let hooks = ctx.hooks;
        self.boosts.get_or_resolve(
            job,
            currency,
            force,
            ctx.now_ms,
            ctx.config.boost_window_ms,
            || resolve_boost(id, job, currency, hooks),
        )
    }

    // ---- payment limits -------------------------------------------------

    /// Whether a payment of `amount` is still under the currency's cap.
    /// Offline players, zero amounts and disabled limits always pass with
    /// no accounting. A blocked payment is never accumulated.
    pub fn is_under_limit(&mut self, currency: Currency, amount: f64, ctx: &EngineContext) -> bool {
        if !self.is_online() || amount == 0.0 {
            return true;
        }
        let settings = ctx.config.limit(currency);
        if !settings.enabled {
            return true;
        }

        let cap = self.limit(currency) as f64;
        if self
            .payments
            .reached(currency, cap, settings.window_ms, ctx.now_ms)
        {
            let label = currency.label();
            let messages = &ctx.config.messages;

            if !self.payments.informed(currency) && !self.payments.was_reset(currency) {
                ctx.hooks
                    .messenger
                    .chat(self.id, &messages.reached.replace("{currency}", label));
                ctx.hooks
                    .messenger
                    .chat(self.id, &messages.reached_detail.replace("{currency}", label));
                if ctx.config.use_payment_curve {
                    ctx.hooks.messenger.chat(self.id, &messages.curve_hint);
                }
                self.payments.set_informed(currency, true);
            }

            if self
                .payments
                .announce_due(currency, ctx.config.announce_delay_ms, ctx.now_ms)
            {
                let left = self
                    .payments
                    .time_left_ms(currency, settings.window_ms, ctx.now_ms);
                let notice = messages
                    .time_left
                    .replace("{currency}", label)
                    .replace("{time}", &format_time_left(left));
                ctx.hooks.messenger.overlay(self.id, &notice);
            }

            if self.payments.was_reset(currency) {
                self.payments.clear_reset(currency);
            }
            return false;
        }

        self.payments.add(currency, amount, ctx.now_ms);
        self.saved = false;
        true
    }

    /// Administrative reset of every payment window, followed by the cap
    /// recomputation the reset invalidates.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn reset_payment_limits(&mut self, ctx: &EngineContext) {
        self.payments.reset_all();
        self.reload_limits(ctx);
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn payments(&self) -> &PaymentLimits {
        &self.payments
    }

    // ---- earnings -------------------------------------------------------

    /// Whether any joined job pays anything for the action.
    pub fn can_get_paid(&self, action: ActionType, ctx: &EngineContext) -> bool {
        for prog in &self.progression {
            let Some(def) = ctx.registry.job(prog.job()) else {
                continue;
            };
            let Some(payout) = def.payout(action) else {
                continue;
            };
            let (money, points, experience) = self.payout_amounts(payout, prog.level());
            if money != 0.0 || points != 0.0 || experience != 0.0 {
                return true;
            }
        }
        false
    }

    /// Level-scaled payout amounts, diluted when the player holds more jobs
    /// than the resolved maximum.
    pub fn payout_amounts(&self, payout: &PayoutDef, level: i32) -> (f64, f64, f64) {
        let scale = 1.0 + payout.per_level * (level - 1).max(0) as f64;
        let num_jobs = self.progression.len() as i32;
        let dilution = if self.max_jobs_snapshot > 0 && num_jobs > self.max_jobs_snapshot {
            self.max_jobs_snapshot as f64 / num_jobs as f64
        } else {
            1.0
        };
        (
            payout.money * scale * dilution,
            payout.points * scale * dilution,
            payout.experience * scale * dilution,
        )
    }

    /// Adds experience in a job, consuming level-ups clamped to the
    /// effective ceiling. Returns `true` when a level was gained.
    pub fn gain_experience(&mut self, job: &str, amount: f64, ctx: &EngineContext) -> bool {
        let Some(def) = ctx.registry.job(job) else {
            return false;
        };
        let cap = self.max_job_level_allowed(def, ctx.hooks);
        let Some(prog) = self
            .progression
            .iter_mut()
            .find(|p| p.job().eq_ignore_ascii_case(job))
        else {
            return false;
        };

        let leveled = prog.add_experience(amount, cap, def);
        if leveled {
            self.refresh_rank_derived(ctx);
        } else {
            self.saved = false;
        }
        leveled
    }

    pub fn add_points(&mut self, amount: f64) {
        self.points.add(amount);
        self.saved = false;
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn take_points(&mut self, amount: f64) {
        self.points.take(amount);
        self.saved = false;
    }

    pub fn record_earnings(&mut self, label: &str, money: f64, points: f64, experience: f64) {
        self.earnings.record(label, money, points, experience);
        self.saved = false;
    }

    // ---- quests ---------------------------------------------------------

    /// Effective daily quest cap: the job's configured cap unless a numeric
    /// capability override applies.
    pub fn max_daily_quests(&self, def: &JobDef, hooks: &Collaborators) -> usize {
        let exact = hooks
            .capabilities
            .max_value(self.id, &format!("maxquests.{}", def.name().to_lowercase()))
            as i32;
        let mut max = exact;
        let global = hooks.capabilities.max_value(self.id, "maxquests.all") as i32;
        if global != 0 && global != max {
            max = global;
        }

        if max > 0 {
            max as usize
        } else {
            def.max_daily_quests()
        }
    }

    /// The active rotation for a job, recomputed lazily on read. Players
    /// outside the job get an empty set.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn active_quests(
        &mut self,
        job: &str,
        filter: Option<ActionType>,
        ctx: &EngineContext,
    ) -> Vec<QuestProgression> {
        let Some(def) = ctx.registry.job(job) else {
            return Vec::new();
        };
        if !self.is_in_job(def.name()) {
            return Vec::new();
        }

        let level = self
            .job_progression(def.name())
            .map(JobProgression::level)
            .unwrap_or(1);
        let max_daily = self.max_daily_quests(def, ctx.hooks);
        self.quests
            .active_quests(def, level, max_daily, filter, ctx.now_ms)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Feeds an action into every joined job's rotation; returns the
    /// (job, quest) pairs this action completed.
    pub fn record_quest_progress(
        &mut self,
        action: ActionType,
        target_key: &str,
        ctx: &EngineContext,
    ) -> Vec<(String, String)> {
        let memberships: Vec<(String, i32)> = self
            .progression
            .iter()
            .map(|p| (p.job().to_string(), p.level()))
            .collect();

        let mut completed = Vec::new();
        for (job, level) in memberships {
            let Some(def) = ctx.registry.job(&job) else {
                continue;
            };
            let max_daily = self.max_daily_quests(def, ctx.hooks);
            self.quests.rotate(def, level, max_daily, ctx.now_ms);
            for quest in self
                .quests
                .record_action(def.name(), action, target_key, 1, ctx.now_ms)
            {
                completed.push((def.name().to_string(), quest));
            }
        }

        if !completed.is_empty() {
            self.saved = false;
        }
        completed
    }

    /// Post-completion bookkeeping: grant the quest reward once, count the
    /// completion, schedule the board-refresh signal and rotate a
    /// replacement in. Returns `true` when a replacement was placed.
    pub fn complete_quest(&mut self, job: &str, quest: &str, ctx: &EngineContext) -> bool {
        if let Some(def) = ctx.registry.job(job).and_then(|j| j.quest(quest)) {
            let already_given = self
                .quests
                .active(job, None)
                .iter()
                .find(|p| p.quest_name().eq_ignore_ascii_case(quest))
                .map(|p| p.reward_given())
                .unwrap_or(false);
            if !already_given {
                if def.reward_points() > 0.0 {
                    self.points.add(def.reward_points());
                }
                if def.reward_money() > 0.0 || def.reward_points() > 0.0 {
                    self.earnings
                        .record("quest", def.reward_money(), def.reward_points(), 0.0);
                }
            }
        }
        self.quests.set_reward_given(job, quest);
        self.quests
            .record_done(job, ctx.now_ms + ctx.config.save_period_ms);

        let scopes: Vec<RotationScope> = self
            .progression
            .iter()
            .filter_map(|p| {
                ctx.registry.job(p.job()).map(|def| RotationScope {
                    def,
                    level: p.level(),
                    max_daily: self.max_daily_quests(def, ctx.hooks),
                })
            })
            .collect();

        let replaced = self.quests.replace_quest(job, quest, &scopes, ctx.now_ms);
        self.saved = false;
        replaced
    }

    /// Takes the pending quest-board refresh signal once due.
    pub fn take_due_board_update(&mut self, now_ms: i64) -> Option<String> {
        self.quests.take_due_board_update(now_ms)
    }

    pub fn quest_progress_string(&self) -> Option<String> {
        codec::serialize(&self.quests)
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn load_quest_progress(&mut self, input: &str, registry: &JobRegistry) {
        codec::parse(input, registry, &mut self.quests);
    }

    /// Clears one job's rotation (or all of them) so the next read redraws.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn reset_quests(&mut self, job: Option<&str>) {
        match job {
            Some(job) => self.quests.reset_job(job),
            None => self.quests.reset_all(),
        }
        self.saved = false;
    }

    // ---- sessions, cooldowns and saving ---------------------------------

    pub fn connect(&mut self, now_ms: i64) {
        self.connected = true;
        self.last_seen_ms = now_ms;
    }

    pub fn disconnect(&mut self, now_ms: i64) {
        self.connected = false;
        self.last_seen_ms = now_ms;
        self.saved = false;
    }

    /// Whether the rejoin-cooldown window recorded on leave has passed.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn rejoin_cooldown_expired(&self, job: &str, now_ms: i64) -> bool {
        self.left_times
            .get(&job.to_lowercase())
            .is_some_and(|until| *until < now_ms)
    }

    /// Drops archives whose rejoin-cooldown window has passed; a later
    /// rejoin then starts from scratch.
    pub fn purge_expired_archives(&mut self, now_ms: i64) {
        let expired: Vec<String> = self
            .left_times
            .iter()
            .filter(|(_, until)| **until < now_ms)
            .map(|(job, _)| job.clone())
            .collect();
        for job in expired {
            self.left_times.remove(&job);
            self.archived.remove(&job);
            self.saved = false;
        }
    }

    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id,
            name: self.name.clone(),
            jobs: self
                .progression
                .iter()
                .map(|p| JobSnapshot {
                    job: p.job().to_string(),
                    level: p.level(),
                    experience: p.experience(),
                })
                .collect(),
            points_current: self.points.current(),
            points_total: self.points.total(),
            done_quests: self.quests.done_quests(),
            skipped_quests: self.quests.skipped_quests(),
            quest_progress: self.quest_progress_string(),
            seen_ms: self.last_seen_ms,
        }
    }

    /// Pushes state to the persistence sink when dirty; the flag clears
    /// only after every sink call went out.
    pub fn save(&mut self, hooks: &Collaborators) {
        if self.saved {
            return;
        }

        let snapshot = self.snapshot();
        hooks.persistence.save(&snapshot);
        hooks.persistence.save_log(self.id, &self.earnings);
        hooks.persistence.save_points(self.id, &self.points);
        hooks.persistence.record_limits(self.id, &self.payments);
        hooks.persistence.update_seen(self.id, self.last_seen_ms);
        self.saved = true;
    }
}

fn resolve_boost(player: PlayerId, job: &str, currency: Currency, hooks: &Collaborators) -> f64 {
    let job_key = job.to_lowercase();
    let label = currency.label();

    let mut boost = hooks
        .capabilities
        .max_value(player, &format!("boost.{job_key}.{label}"));

    for key in [
        format!("boost.{job_key}.all"),
        "boost.all.all".to_string(),
        format!("boost.all.{label}"),
    ] {
        let candidate = hooks.capabilities.max_value(player, &key);
        if candidate != 0.0 && candidate != boost {
            boost = candidate;
        }
    }
    boost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::collaborators::{
        ConfiguredLimitEquations, ConfiguredMaxJobs, LogMessenger, NullSink,
        StaticCapabilityResolver,
    };
    use std::sync::{Arc, Mutex};

    const NOW: i64 = 10_000_000;

    struct Harness {
        registry: JobRegistry,
        config: ProgressionConfig,
        hooks: Collaborators,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_capabilities(StaticCapabilityResolver::default())
        }

        fn with_capabilities(capabilities: StaticCapabilityResolver) -> Self {
            let config = ProgressionConfig::default();
            let hooks = Collaborators {
                capabilities: Box::new(capabilities),
                equations: Box::new(ConfiguredLimitEquations::from_config(&config)),
                max_jobs: Box::new(ConfiguredMaxJobs(config.default_max_jobs)),
                messenger: Box::new(LogMessenger),
                persistence: Box::new(NullSink),
            };
            Self {
                registry: JobRegistry::fallback(),
                config,
                hooks,
            }
        }

        fn ctx(&self) -> EngineContext<'_> {
            self.ctx_at(NOW)
        }

        fn ctx_at(&self, now_ms: i64) -> EngineContext<'_> {
            EngineContext {
                registry: &self.registry,
                config: &self.config,
                hooks: &self.hooks,
                now_ms,
            }
        }
    }

    fn online_account(harness: &Harness) -> PlayerAccount {
        let mut account = PlayerAccount::new(PlayerId::new(7), "Alric");
        account.connect(NOW);
        account.join_job("Farmer", &harness.ctx());
        account
    }

    #[test]
    fn joining_twice_is_rejected() {
        let harness = Harness::new();
        let mut account = online_account(&harness);
        assert!(!account.join_job("Farmer", &harness.ctx()));
        assert_eq!(account.progression().len(), 1);
    }

    #[test]
    fn leave_archives_and_rejoin_decays_from_max() {
        let harness = Harness::new();
        let mut account = online_account(&harness);
        let ctx = harness.ctx();

        // Farmer caps at level 10; an oversized promotion clamps there
        assert!(account.promote_job("Farmer", 25, &ctx));
        assert_eq!(account.job_progression("Farmer").unwrap().level(), 10);

        assert!(account.leave_job("Farmer", &ctx));
        assert_eq!(account.archived("Farmer").unwrap().level, 10);

        // default from-max loss is 50%: 10 -> 5
        assert!(account.join_job("Farmer", &ctx));
        assert_eq!(account.job_progression("Farmer").unwrap().level(), 5);
        assert!(account.archived("Farmer").is_none());
    }

    #[test]
    fn vip_capability_widens_the_level_ceiling() {
        let mut capabilities = StaticCapabilityResolver::default();
        capabilities.grant(PlayerId::new(7), "maxlevel.vip.farmer");
        let harness = Harness::with_capabilities(capabilities);
        let mut account = online_account(&harness);
        let ctx = harness.ctx();

        let farmer = harness.registry.job("Farmer").unwrap();
        assert_eq!(account.max_job_level_allowed(farmer, &harness.hooks), 20);

        assert!(account.promote_job("Farmer", 25, &ctx));
        assert_eq!(account.job_progression("Farmer").unwrap().level(), 20);
    }

    #[test]
    fn demote_floors_at_level_one() {
        let harness = Harness::new();
        let mut account = online_account(&harness);
        let ctx = harness.ctx();

        account.promote_job("Farmer", 4, &ctx);
        assert!(account.demote_job("Farmer", 100, &ctx));
        assert_eq!(account.job_progression("Farmer").unwrap().level(), 1);
        assert!(!account.demote_job("Farmer", 0, &ctx));
        assert!(!account.demote_job("Miller", 1, &ctx));
    }

    #[test]
    fn transfer_keeps_experience_and_clamps_level() {
        let harness = Harness::new();
        let mut account = online_account(&harness);
        let ctx = harness.ctx();

        account.join_job("Blacksmith", &ctx);
        account.promote_job("Blacksmith", 29, &ctx);
        assert_eq!(account.job_progression("Blacksmith").unwrap().level(), 30);
        account.leave_job("Farmer", &ctx);

        // Farmer caps at 10, so the transferred level 30 clamps down
        assert!(account.transfer_job("Blacksmith", "Farmer", &ctx));
        assert!(account.is_in_job("Farmer"));
        assert!(!account.is_in_job("Blacksmith"));
        assert_eq!(account.job_progression("Farmer").unwrap().level(), 10);

        assert!(!account.transfer_job("Farmer", "Farmer", &ctx));
    }

    #[test]
    fn derived_limits_follow_membership_changes() {
        let harness = Harness::new();
        let mut account = online_account(&harness);
        let ctx = harness.ctx();

        let single_job_cap = account.limit(Currency::Money);
        account.join_job("Miller", &ctx);
        account.promote_job("Miller", 9, &ctx);

        let expected = harness
            .hooks
            .equations
            .cap(Currency::Money, account.total_levels(), 3) as i32;
        assert_eq!(account.limit(Currency::Money), expected);
        assert!(account.limit(Currency::Money) > single_job_cap);
        assert_eq!(account.total_levels(), 11);
    }

    #[test]
    fn honorific_tracks_progression() {
        let harness = Harness::new();
        let mut account = online_account(&harness);
        let ctx = harness.ctx();

        assert_eq!(account.honorific(), "Field Hand Farmer");
        account.promote_job("Farmer", 4, &ctx);
        assert_eq!(account.honorific(), "Sower Farmer");
    }

    #[test]
    fn boosts_are_zero_while_offline_and_cached_online() {
        let mut capabilities = StaticCapabilityResolver::default();
        let player = PlayerId::new(7);
        capabilities.set_value(player, "boost.farmer.money", 0.10);
        capabilities.set_value(player, "boost.farmer.all", 0.20);
        capabilities.set_value(player, "boost.all.money", 0.05);
        let harness = Harness::with_capabilities(capabilities);

        let mut account = PlayerAccount::new(player, "Alric");
        account.join_job("Farmer", &harness.ctx());
        assert_eq!(
            account.boost("Farmer", Currency::Money, false, &harness.ctx()),
            0.0
        );

        account.connect(NOW);
        // each later non-zero candidate that differs replaces the running
        // value: 0.10 -> 0.20 -> 0.05
        assert_eq!(
            account.boost("Farmer", Currency::Money, false, &harness.ctx()),
            0.05
        );

        // still inside the freshness window 30 s later
        assert_eq!(
            account.boost("Farmer", Currency::Money, false, &harness.ctx_at(NOW + 30_000)),
            0.05
        );
    }

    struct FixedCap(f64);

    impl crate::player::collaborators::LimitEquationSource for FixedCap {
        fn cap(&self, _c: Currency, _t: i32, _m: i32) -> f64 {
            self.0
        }
    }

    fn limited_harness(cap: f64) -> Harness {
        let mut harness = Harness::new();
        harness.config =
            ProgressionConfig::from_toml_str("[limits.money]\nenabled = true\nwindow_minutes = 60\n")
                .expect("test config should parse");
        harness.hooks.equations = Box::new(FixedCap(cap));
        harness
    }

    #[test]
    fn payment_limit_blocks_without_double_counting() {
        let harness = limited_harness(100.0);
        let mut account = online_account(&harness);
        let ctx = harness.ctx();
        account.reload_limits(&ctx);

        assert!(account.is_under_limit(Currency::Money, 0.0, &ctx));
        assert_eq!(account.payments().amount(Currency::Money), 0.0);

        assert!(account.is_under_limit(Currency::Money, 60.0, &ctx));
        assert!(account.is_under_limit(Currency::Money, 50.0, &ctx));
        assert_eq!(account.payments().amount(Currency::Money), 110.0);

        // cap reached: rejected, and the rejected amount is not added
        assert!(!account.is_under_limit(Currency::Money, 10.0, &ctx));
        assert!(!account.is_under_limit(Currency::Money, 10.0, &ctx));
        assert_eq!(account.payments().amount(Currency::Money), 110.0);
    }

    #[test]
    fn disabled_limits_always_pass() {
        let harness = Harness::new();
        let mut account = online_account(&harness);
        let ctx = harness.ctx();
        // default config ships with limits disabled
        assert!(account.is_under_limit(Currency::Points, 1_000_000.0, &ctx));
        assert_eq!(account.payments().amount(Currency::Points), 0.0);
    }

    #[test]
    fn payouts_dilute_beyond_the_job_cap() {
        let harness = Harness::new();
        let mut account = online_account(&harness);
        let ctx = harness.ctx();
        account.join_job("Miller", &ctx);
        account.join_job("Blacksmith", &ctx);

        let farmer = harness.registry.job("Farmer").unwrap();
        let payout = farmer.payout(ActionType::Gather).unwrap();
        let (money, _, _) = account.payout_amounts(payout, 1);
        assert_eq!(money, 2.0);
        assert!(account.can_get_paid(ActionType::Gather, &ctx));
        assert!(!account.can_get_paid(ActionType::Fish, &ctx));
    }

    #[test]
    fn experience_gain_levels_and_refreshes_rank_state() {
        let harness = Harness::new();
        let mut account = online_account(&harness);
        let ctx = harness.ctx();

        assert!(account.gain_experience("Farmer", 20.0, &ctx));
        assert_eq!(account.job_progression("Farmer").unwrap().level(), 2);
        assert!(!account.gain_experience("Farmer", 0.5, &ctx));
    }

    #[test]
    fn quest_flow_completes_and_replaces() {
        let harness = Harness::new();
        let mut account = online_account(&harness);
        let ctx = harness.ctx();

        let active = account.active_quests("Farmer", None, &ctx);
        assert_eq!(active.len(), 3);

        let completed = account.record_quest_progress(ActionType::Gather, "grain", &ctx);
        assert!(completed.is_empty());
        for _ in 0..9 {
            let done = account.record_quest_progress(ActionType::Gather, "grain", &ctx);
            if !done.is_empty() {
                assert_eq!(done, vec![("Farmer".to_string(), "GrainRun".to_string())]);
            }
        }

        // at level 1 no replacement candidate exists, so the completed
        // quest rotates out on the next read and, with every other level-1
        // quest still active, gets re-drawn as a fresh assignment
        assert!(!account.complete_quest("Farmer", "GrainRun", &ctx));
        assert_eq!(account.done_quests(), 1);
        let after = account.active_quests("Farmer", None, &ctx);
        assert_eq!(after.len(), 3);
        let redrawn = after
            .iter()
            .find(|q| q.quest_name() == "GrainRun")
            .expect("GrainRun should be re-drawn");
        assert!(!redrawn.is_completed());
        assert_eq!(redrawn.objectives()[0].done, 0);
    }

    #[test]
    fn limit_warnings_fire_once_per_cycle() {
        use crate::player::collaborators::Messenger;

        #[derive(Default)]
        struct Recorder {
            chats: Mutex<Vec<String>>,
            overlays: Mutex<Vec<String>>,
        }

        struct SharedMessenger(Arc<Recorder>);

        impl Messenger for SharedMessenger {
            fn chat(&self, _player: PlayerId, line: &str) {
                self.0.chats.lock().unwrap().push(line.to_string());
            }

            fn overlay(&self, _player: PlayerId, line: &str) {
                self.0.overlays.lock().unwrap().push(line.to_string());
            }
        }

        let recorder = Arc::new(Recorder::default());
        let mut harness = limited_harness(50.0);
        harness.hooks.messenger = Box::new(SharedMessenger(Arc::clone(&recorder)));

        let mut account = online_account(&harness);
        let ctx = harness.ctx();
        account.reload_limits(&ctx);

        assert!(account.is_under_limit(Currency::Money, 60.0, &ctx));
        assert!(!account.is_under_limit(Currency::Money, 5.0, &ctx));
        assert!(!account.is_under_limit(Currency::Money, 5.0, &ctx));

        // warned once (two lines, no curve hint), one countdown overlay
        assert_eq!(recorder.chats.lock().unwrap().len(), 2);
        assert_eq!(recorder.overlays.lock().unwrap().len(), 1);
        assert!(recorder.overlays.lock().unwrap()[0].contains("money"));
    }

    #[test]
    fn quest_progress_round_trips_through_the_account() {
        let harness = Harness::new();
        let mut account = online_account(&harness);
        let ctx = harness.ctx();

        account.active_quests("Farmer", None, &ctx);
        account.record_quest_progress(ActionType::Gather, "grain", &ctx);
        let wire = account.quest_progress_string().expect("state expected");

        let mut restored = PlayerAccount::new(PlayerId::new(8), "Bryn");
        restored.load_quest_progress(&wire, &harness.registry);
        assert_eq!(restored.quest_progress_string().as_deref(), Some(wire.as_str()));
    }

    #[test]
    fn save_clears_the_dirty_flag_once_sunk() {
        let harness = Harness::new();
        let mut account = online_account(&harness);
        assert!(!account.is_saved());

        account.save(&harness.hooks);
        assert!(account.is_saved());

        account.add_points(5.0);
        assert!(!account.is_saved());
    }

    #[test]
    fn expired_archives_are_purged_after_the_cooldown() {
        let mut harness = Harness::new();
        harness.config.rejoin_cooldown_hours = 2;
        let mut account = online_account(&harness);
        let ctx = harness.ctx();

        account.leave_job("Farmer", &ctx);
        assert!(account.archived("Farmer").is_some());
        assert!(!account.rejoin_cooldown_expired("Farmer", NOW + 3_600_000));

        let past = NOW + 2 * 3_600_000 + 1;
        assert!(account.rejoin_cooldown_expired("Farmer", past));
        account.purge_expired_archives(past);
        assert!(account.archived("Farmer").is_none());

        // rejoin after the purge starts from scratch
        assert!(account.join_job("Farmer", &harness.ctx_at(past)));
        assert_eq!(account.job_progression("Farmer").unwrap().level(), 1);
    }

    #[test]
    fn leave_all_drops_every_membership_without_archiving() {
        let harness = Harness::new();
        let mut account = online_account(&harness);
        let ctx = harness.ctx();
        account.join_job("Miller", &ctx);

        assert!(account.leave_all_jobs(&ctx));
        assert!(account.progression().is_empty());
        assert!(account.archived("Farmer").is_none());
        assert_eq!(account.honorific(), "Wanderer");
    }

    #[test]
    fn quest_reset_forces_a_redraw() {
        let harness = Harness::new();
        let mut account = online_account(&harness);
        let ctx = harness.ctx();

        account.active_quests("Farmer", None, &ctx);
        account.record_quest_progress(ActionType::Gather, "grain", &ctx);
        account.reset_quests(Some("Farmer"));

        let redrawn = account.active_quests("Farmer", None, &ctx);
        assert_eq!(redrawn.len(), 3);
        assert!(redrawn.iter().all(|q| q.objectives().iter().all(|o| o.done == 0)));
    }

    #[test]
    fn payment_reset_reopens_the_window_and_recomputes_caps() {
        let harness = limited_harness(50.0);
        let mut account = online_account(&harness);
        let ctx = harness.ctx();
        account.reload_limits(&ctx);

        assert!(account.is_under_limit(Currency::Money, 60.0, &ctx));
        assert!(!account.is_under_limit(Currency::Money, 5.0, &ctx));

        account.reset_payment_limits(&ctx);
        assert_eq!(account.payments().amount(Currency::Money), 0.0);
        assert_eq!(account.limit(Currency::Money), 50);
        assert!(account.is_under_limit(Currency::Money, 5.0, &ctx));
    }

    #[test]
    fn points_can_be_spent_down_to_zero() {
        let harness = Harness::new();
        let mut account = online_account(&harness);
        account.save(&harness.hooks);

        account.add_points(6.0);
        account.take_points(2.5);
        assert_eq!(account.points().current(), 3.5);
        assert_eq!(account.points().total(), 6.0);
        assert!(!account.is_saved());
    }

    #[test]
    fn concurrent_join_and_leave_never_duplicate_membership() {
        let harness = Arc::new(Harness::new());
        let account = Arc::new(Mutex::new(PlayerAccount::new(PlayerId::new(7), "Alric")));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let harness = Arc::clone(&harness);
            let account = Arc::clone(&account);
            handles.push(std::thread::spawn(move || {
                let ctx = harness.ctx();
                for _ in 0..50 {
                    {
                        let mut locked = account.lock().unwrap();
                        locked.join_job("Farmer", &ctx);
                        let members = locked
                            .progression()
                            .iter()
                            .filter(|p| p.job() == "Farmer")
                            .count();
                        assert!(members <= 1);
                    }
                    {
                        let mut locked = account.lock().unwrap();
                        locked.leave_job("Farmer", &ctx);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().expect("worker should not panic");
        }

        let locked = account.lock().unwrap();
        assert!(locked.progression().len() <= 1);
    }
}
