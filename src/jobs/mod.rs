//! Jobs module hosting shared enums, engine configuration and reference data.
pub mod components;
pub mod config;
pub mod data;
pub mod plugin;

pub use components::{ActionType, Currency, DisplayMethod};
pub use config::ProgressionConfig;
pub use data::{JobDef, JobRegistry, QuestDef};
pub use plugin::JobsPlugin;
