//! Systems feeding actions into quest rotations and handling completions.
use bevy::prelude::*;

use crate::core::plugin::WorldTimeline;
use crate::jobs::{config::ProgressionConfig, data::JobRegistry};
use crate::player::{
    account::{EngineContext, PlayerAccount},
    collaborators::Collaborators,
    events::ActionPerformed,
};

use super::events::{QuestBoardUpdateRequested, QuestCompletedEvent};

/// Routes reported actions into every joined job's active quests and emits
/// a completion event for each quest the action finished.
pub fn advance_quest_progress(
    mut events: MessageReader<ActionPerformed>,
    mut accounts: Query<&mut PlayerAccount>,
    registry: Res<JobRegistry>,
    config: Res<ProgressionConfig>,
    hooks: Res<Collaborators>,
    timeline: Res<WorldTimeline>,
    mut completions: MessageWriter<QuestCompletedEvent>,
) {
    for event in events.read() {
        let Some(mut account) = accounts.iter_mut().find(|a| a.id() == event.player) else {
            continue;
        };
        if !account.is_online() {
            continue;
        }
        let ctx = EngineContext {
            registry: &registry,
            config: &config,
            hooks: &hooks,
            now_ms: timeline.now_ms(),
        };

        for (job, quest) in account.record_quest_progress(event.action, &event.target, &ctx) {
            info!("{} completed quest '{}' for {}", account.name(), quest, job);
            completions.write(QuestCompletedEvent {
                player: event.player,
                job,
                quest,
            });
        }
    }
}

/// Grants rewards, counts the completion and rotates a replacement in.
pub fn handle_quest_completions(
    mut events: MessageReader<QuestCompletedEvent>,
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

        let replaced = account.complete_quest(&event.job, &event.quest, &ctx);
        if replaced {
            debug!(
                "Rotated a replacement in for '{}' ({} skipped so far)",
                event.quest,
                account.skipped_quests()
            );
        }
    }
}

/// Emits pending quest-board refresh signals once their due time passes.
pub fn emit_board_updates(
    mut accounts: Query<&mut PlayerAccount>,
    timeline: Res<WorldTimeline>,
    mut updates: MessageWriter<QuestBoardUpdateRequested>,
) {
    let now = timeline.now_ms();
    for mut account in accounts.iter_mut() {
        if let Some(job) = account.take_due_board_update(now) {
            updates.write(QuestBoardUpdateRequested { job });
        }
    }
}
