//! Jobs plugin loading reference data and engine configuration.
use bevy::prelude::*;

use super::{config::ProgressionConfig, data::JobRegistry};

pub struct JobsPlugin;

impl Plugin for JobsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<JobRegistry>()
            .insert_resource(ProgressionConfig::load_or_default())
            .add_systems(Startup, log_registry_summary);
    }
}

fn log_registry_summary(registry: Res<JobRegistry>) {
    for job in registry.jobs() {
        info!(
            "Loaded job '{}' (max level {}, {} quests, {} daily)",
            job.name(),
            job.max_level(),
            job.quests().len(),
            job.max_daily_quests()
        );
    }
}
