//! Quests module: rotation state, progress tracking and the wire codec.
pub mod codec;
pub mod events;
pub mod plugin;
pub mod progress;
pub mod rotation;
pub mod systems;

pub use plugin::QuestsPlugin;
pub use progress::QuestProgression;
pub use rotation::{QuestLog, RotationScope};
