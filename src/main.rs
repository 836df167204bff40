use bevy::prelude::*;

mod core;
mod jobs;
mod player;
mod quests;

use crate::{
    core::{CorePlugin, WorldTimeline},
    jobs::{components::ActionType, JobsPlugin},
    player::{
        events::{ActionPerformed, JobJoinRequested, PlayerConnected},
        PlayerAccount, PlayerIdAllocator, PlayerPlugin,
    },
    quests::QuestsPlugin,
};

const DEMO_ACTION_INTERVAL_MS: i64 = 2_000;

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            CorePlugin::default(),
            JobsPlugin,
            PlayerPlugin,
            QuestsPlugin, // after PlayerPlugin to consume ActionPerformed
        ))
        .add_systems(Startup, spawn_demo_player)
        .add_systems(Update, drive_demo_actions)
        .run();
}

/// Spawns one connected player working two jobs so the progression loop is
/// observable out of the box.
fn spawn_demo_player(
    mut commands: Commands,
    mut allocator: ResMut<PlayerIdAllocator>,
    mut connects: MessageWriter<PlayerConnected>,
    mut joins: MessageWriter<JobJoinRequested>,
) {
    let id = allocator.next_id();
    commands.spawn(PlayerAccount::new(id, "Alric"));
    connects.write(PlayerConnected { player: id });
    joins.write(JobJoinRequested {
        player: id,
        job: "Farmer".to_string(),
    });
    joins.write(JobJoinRequested {
        player: id,
        job: "Miller".to_string(),
    });
    info!("Spawned demo player {id}");
}

/// Emits a steady trickle of gather actions for every online player.
fn drive_demo_actions(
    mut next_due_ms: Local<i64>,
    timeline: Res<WorldTimeline>,
    accounts: Query<&PlayerAccount>,
    mut actions: MessageWriter<ActionPerformed>,
) {
    let now = timeline.now_ms();
    if now < *next_due_ms {
        return;
    }
    *next_due_ms = now + DEMO_ACTION_INTERVAL_MS;

    for account in accounts.iter() {
        if !account.is_online() {
            continue;
        }
        actions.write(ActionPerformed {
            player: account.id(),
            action: ActionType::Gather,
            target: "grain".to_string(),
        });
    }
}
