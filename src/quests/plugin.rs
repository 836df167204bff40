//! Quests plugin wiring rotation systems.
use bevy::prelude::*;

use crate::player::systems::apply_action_payouts;

use super::{
    events::{QuestBoardUpdateRequested, QuestCompletedEvent},
    systems::{advance_quest_progress, emit_board_updates, handle_quest_completions},
};

pub struct QuestsPlugin;

impl Plugin for QuestsPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<QuestCompletedEvent>()
            .add_event::<QuestBoardUpdateRequested>()
            .add_systems(
                Update,
                (
                    advance_quest_progress.after(apply_action_payouts),
                    handle_quest_completions.after(advance_quest_progress),
                    emit_board_updates.after(handle_quest_completions),
                ),
            );
    }
}
