//! Player plugin wiring accounts, collaborators and event handlers.
use bevy::prelude::*;

use crate::jobs::config::ProgressionConfig;

use super::{
    collaborators::Collaborators,
    components::PlayerIdAllocator,
    events::{
        ActionPerformed, JobDemoteRequested, JobJoinRequested, JobLeaveRequested,
        JobPromoteRequested, JobTransferRequested, PlayerConnected, PlayerDisconnected,
    },
    systems::{
        apply_action_payouts, autosave_accounts, handle_connection_events, handle_join_requests,
        handle_leave_requests, handle_rank_requests, handle_transfer_requests, AutosaveState,
    },
};

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        let collaborators = Collaborators::with_defaults(&ProgressionConfig::load_or_default());

        app.init_resource::<PlayerIdAllocator>()
            .init_resource::<AutosaveState>()
            .insert_resource(collaborators)
            .add_event::<JobJoinRequested>()
            .add_event::<JobLeaveRequested>()
            .add_event::<JobTransferRequested>()
            .add_event::<JobPromoteRequested>()
            .add_event::<JobDemoteRequested>()
            .add_event::<PlayerConnected>()
            .add_event::<PlayerDisconnected>()
            .add_event::<ActionPerformed>()
            .add_systems(
                Update,
                (
                    handle_connection_events,
                    handle_join_requests.after(handle_connection_events),
                    handle_leave_requests.after(handle_join_requests),
                    handle_transfer_requests.after(handle_leave_requests),
                    handle_rank_requests.after(handle_transfer_requests),
                    apply_action_payouts.after(handle_rank_requests),
                    autosave_accounts.after(apply_action_payouts),
                ),
            );
    }
}
