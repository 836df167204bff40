//! Player module hosting the per-player aggregate and its systems.
pub mod account;
pub mod boost;
pub mod collaborators;
pub mod components;
pub mod decay;
pub mod events;
pub mod honorific;
pub mod limits;
pub mod log;
pub mod plugin;
pub mod points;
pub mod progression;
pub mod systems;

pub use account::{EngineContext, PlayerAccount};
pub use components::{PlayerId, PlayerIdAllocator};
pub use plugin::PlayerPlugin;
