//! Systems wiring game events into player accounts.
use bevy::prelude::*;

use crate::core::plugin::WorldTimeline;
use crate::jobs::{components::Currency, config::ProgressionConfig, data::JobRegistry};

use super::{
    account::{EngineContext, PlayerAccount},
    collaborators::Collaborators,
    events::{
        ActionPerformed, JobDemoteRequested, JobJoinRequested, JobLeaveRequested,
        JobPromoteRequested, JobTransferRequested, PlayerConnected, PlayerDisconnected,
    },
};

/// Tracks when the next autosave sweep is due.
#[derive(Resource, Debug, Default)]
pub struct AutosaveState {
    next_due_ms: i64,
}

pub fn handle_connection_events(
    mut connected: MessageReader<PlayerConnected>,
    mut disconnected: MessageReader<PlayerDisconnected>,
    mut accounts: Query<&mut PlayerAccount>,
    hooks: Res<Collaborators>,
    timeline: Res<WorldTimeline>,
) {
    let now = timeline.now_ms();

    for event in connected.read() {
        if let Some(mut account) = accounts.iter_mut().find(|a| a.id() == event.player) {
            account.connect(now);
            info!("{} connected", account.name());
        }
    }

    for event in disconnected.read() {
        if let Some(mut account) = accounts.iter_mut().find(|a| a.id() == event.player) {
            account.disconnect(now);
            account.save(&hooks);
            info!("{} disconnected, state saved", account.name());
        }
    }
}

pub fn handle_join_requests(
    mut events: MessageReader<JobJoinRequested>,
    mut accounts: Query<&mut PlayerAccount>,
    registry: Res<JobRegistry>,
    config: Res<ProgressionConfig>,
    hooks: Res<Collaborators>,
    timeline: Res<WorldTimeline>,
) {
    for event in events.read() {
        let Some(mut account) = accounts.iter_mut().find(|a| a.id() == event.player) else {
            continue;
        };
        let ctx = EngineContext {
            registry: &registry,
            config: &config,
            hooks: &hooks,
            now_ms: timeline.now_ms(),
        };

        if account.join_job(&event.job, &ctx) {
            let level = account
                .job_progression(&event.job)
                .map(|p| p.level())
                .unwrap_or(1);
            info!(
                "{} joined {} at level {}, now styled '{}'",
                account.name(),
                event.job,
                level,
                account.honorific()
            );
        } else {
            debug!("{} could not join {}", account.name(), event.job);
        }
    }
}

pub fn handle_leave_requests(
    mut events: MessageReader<JobLeaveRequested>,
    mut accounts: Query<&mut PlayerAccount>,
    registry: Res<JobRegistry>,
    config: Res<ProgressionConfig>,
    hooks: Res<Collaborators>,
    timeline: Res<WorldTimeline>,
) {
    for event in events.read() {
        let Some(mut account) = accounts.iter_mut().find(|a| a.id() == event.player) else {
            continue;
        };
        let ctx = EngineContext {
            registry: &registry,
            config: &config,
            hooks: &hooks,
            now_ms: timeline.now_ms(),
        };

        if account.leave_job(&event.job, &ctx) {
            info!("{} left {}", account.name(), event.job);
        } else {
            debug!("{} is not in {}", account.name(), event.job);
        }
    }
}

pub fn handle_transfer_requests(
    mut events: MessageReader<JobTransferRequested>,
    mut accounts: Query<&mut PlayerAccount>,
    registry: Res<JobRegistry>,
    config: Res<ProgressionConfig>,
    hooks: Res<Collaborators>,
    timeline: Res<WorldTimeline>,
) {
    for event in events.read() {
        let Some(mut account) = accounts.iter_mut().find(|a| a.id() == event.player) else {
            continue;
        };
        let ctx = EngineContext {
            registry: &registry,
            config: &config,
            hooks: &hooks,
            now_ms: timeline.now_ms(),
        };

        if account.transfer_job(&event.from_job, &event.to_job, &ctx) {
            info!(
                "{} transferred from {} to {}",
                account.name(),
                event.from_job,
                event.to_job
            );
        } else {
            warn!(
                "Transfer {} -> {} refused for {}",
                event.from_job,
                event.to_job,
                account.name()
            );
        }
    }
}

pub fn handle_rank_requests(
    mut promotions: MessageReader<JobPromoteRequested>,
    mut demotions: MessageReader<JobDemoteRequested>,
    mut accounts: Query<&mut PlayerAccount>,
    registry: Res<JobRegistry>,
    config: Res<ProgressionConfig>,
    hooks: Res<Collaborators>,
    timeline: Res<WorldTimeline>,
) {
    for event in promotions.read() {
        let Some(mut account) = accounts.iter_mut().find(|a| a.id() == event.player) else {
            continue;
        };
        let ctx = EngineContext {
            registry: &registry,
            config: &config,
            hooks: &hooks,
            now_ms: timeline.now_ms(),
        };
        if account.promote_job(&event.job, event.levels, &ctx) {
            info!(
                "{} promoted in {} to level {}",
                account.name(),
                event.job,
                account
                    .job_progression(&event.job)
                    .map(|p| p.level())
                    .unwrap_or(1)
            );
        }
    }

    for event in demotions.read() {
        let Some(mut account) = accounts.iter_mut().find(|a| a.id() == event.player) else {
            continue;
        };
        let ctx = EngineContext {
            registry: &registry,
            config: &config,
            hooks: &hooks,
            now_ms: timeline.now_ms(),
        };
        if account.demote_job(&event.job, event.levels, &ctx) {
            info!("{} demoted in {}", account.name(), event.job);
        }
    }
}

/// Pays out money, points and experience for reported actions, applying
/// boosts and payment limits per currency.
pub fn apply_action_payouts(
    mut events: MessageReader<ActionPerformed>,
    mut accounts: Query<&mut PlayerAccount>,
    registry: Res<JobRegistry>,
    config: Res<ProgressionConfig>,
    hooks: Res<Collaborators>,
    timeline: Res<WorldTimeline>,
) {
    for event in events.read() {
        let Some(mut account) = accounts.iter_mut().find(|a| a.id() == event.player) else {
            continue;
        };
        let ctx = EngineContext {
            registry: &registry,
            config: &config,
            hooks: &hooks,
            now_ms: timeline.now_ms(),
        };

        if !account.is_online() || !account.can_get_paid(event.action, &ctx) {
            continue;
        }

        let memberships: Vec<(String, i32)> = account
            .progression()
            .iter()
            .map(|p| (p.job().to_string(), p.level()))
            .collect();

        for (job, level) in memberships {
            let Some(def) = registry.job(&job) else {
                continue;
            };
            let Some(payout) = def.payout(event.action) else {
                continue;
            };

            let (base_money, base_points, base_exp) = account.payout_amounts(payout, level);
            let money = base_money * (1.0 + account.boost(&job, Currency::Money, false, &ctx));
            let points = base_points * (1.0 + account.boost(&job, Currency::Points, false, &ctx));
            let experience =
                base_exp * (1.0 + account.boost(&job, Currency::Experience, false, &ctx));

            let money = if money > 0.0 && account.is_under_limit(Currency::Money, money, &ctx) {
                money
            } else {
                0.0
            };
            let points = if points > 0.0 && account.is_under_limit(Currency::Points, points, &ctx) {
                points
            } else {
                0.0
            };
            let experience = if experience > 0.0
                && account.is_under_limit(Currency::Experience, experience, &ctx)
            {
                experience
            } else {
                0.0
            };

            if money == 0.0 && points == 0.0 && experience == 0.0 {
                continue;
            }

            if points > 0.0 {
                account.add_points(points);
            }
            if experience > 0.0 && account.gain_experience(&job, experience, &ctx) {
                let new_level = account
                    .job_progression(&job)
                    .map(|p| p.level())
                    .unwrap_or(1);
                info!("{} advanced to {} level {}", account.name(), job, new_level);
            }
            account.record_earnings(event.action.name(), money, points, experience);
            debug!(
                "{} earned {:.2}/{:.2}/{:.2} (money/points/exp) from {} on '{}'",
                account.name(),
                money,
                points,
                experience,
                job,
                event.target
            );
        }
    }
}

/// Periodic sweep: purge expired archives and save dirty accounts.
pub fn autosave_accounts(
    mut state: ResMut<AutosaveState>,
    mut accounts: Query<&mut PlayerAccount>,
    config: Res<ProgressionConfig>,
    hooks: Res<Collaborators>,
    timeline: Res<WorldTimeline>,
) {
    let now = timeline.now_ms();
    if now < state.next_due_ms {
        return;
    }
    state.next_due_ms = now + config.save_period_ms;

    for mut account in accounts.iter_mut() {
        account.purge_expired_archives(now);
        if !account.is_saved() {
            account.save(&hooks);
            debug!("Autosaved {}", account.name());
        }
    }
}
