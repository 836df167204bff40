//! Player identity components and supporting resources.
use std::fmt;

use bevy::prelude::*;
use serde::Serialize;

/// Unique identifier for a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Component, Serialize)]
pub struct PlayerId(u64);

impl PlayerId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PLAYER-{:04}", self.0)
    }
}

/// Resource that issues monotonically increasing player ids.
#[derive(Resource, Default)]
pub struct PlayerIdAllocator {
    next: u64,
}

impl PlayerIdAllocator {
    pub fn next_id(&mut self) -> PlayerId {
        let id = self.next;
        self.next += 1;
        PlayerId::new(id)
    }
}
