//! Quest lifecycle events.
use bevy::prelude::{Event, Message};

use crate::player::components::PlayerId;

#[derive(Event, Message, Debug, Clone)]
pub struct QuestCompletedEvent {
    pub player: PlayerId,
    pub job: String,
    pub quest: String,
}

/// Signal for the external scheduler that the quest board for a job is due
/// for a refresh. The engine only emits this; it owns no scheduling handle.
#[derive(Event, Message, Debug, Clone)]
pub struct QuestBoardUpdateRequested {
    pub job: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_event_exposes_fields() {
        let event = QuestCompletedEvent {
            player: PlayerId::new(2),
            job: "Farmer".to_string(),
            quest: "GrainRun".to_string(),
        };
        assert_eq!(event.job, "Farmer");
        assert_eq!(event.quest, "GrainRun");
        assert_eq!(event.player.value(), 2);
    }
}
