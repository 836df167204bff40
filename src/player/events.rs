//! Game events driving the progression engine.
use bevy::prelude::{Event, Message};

use crate::jobs::components::ActionType;

use super::components::PlayerId;

#[derive(Event, Message, Debug, Clone)]
pub struct JobJoinRequested {
    pub player: PlayerId,
    pub job: String,
}

#[derive(Event, Message, Debug, Clone)]
pub struct JobLeaveRequested {
    pub player: PlayerId,
    pub job: String,
}

#[derive(Event, Message, Debug, Clone)]
pub struct JobTransferRequested {
    pub player: PlayerId,
    pub from_job: String,
    pub to_job: String,
}

#[derive(Event, Message, Debug, Clone)]
pub struct JobPromoteRequested {
    pub player: PlayerId,
    pub job: String,
    pub levels: i32,
}

#[derive(Event, Message, Debug, Clone)]
pub struct JobDemoteRequested {
    pub player: PlayerId,
    pub job: String,
    pub levels: i32,
}

#[derive(Event, Message, Debug, Clone)]
pub struct PlayerConnected {
    pub player: PlayerId,
}

#[derive(Event, Message, Debug, Clone)]
pub struct PlayerDisconnected {
    pub player: PlayerId,
}

/// A gameplay action other systems report; feeds payouts and quest
/// objective progress.
#[derive(Event, Message, Debug, Clone)]
pub struct ActionPerformed {
    pub player: PlayerId,
    pub action: ActionType,
    pub target: String,
}
