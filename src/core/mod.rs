//! Core module hosting the gameplay timeline.
pub mod plugin;

pub use plugin::{CorePlugin, WorldTimeline};
