//! Simulation module
//!
//! All gameplay logic lives here. This module must stay deterministic:
//! - State advances only through `tick` and `SimulationState::reset`
//! - Stable iteration order (spawn order, row-major)
//! - No rendering or platform dependencies

pub mod level;
pub mod physics;
pub mod state;
pub mod tick;

pub use level::{LEVEL_1_1, LevelError, LevelGrid, TileKind};
pub use physics::{Body, Bump, Rect};
pub use state::{Camera, Coin, Enemy, Player, SimulationState, Timer, World, WorldId};
pub use tick::{Intent, Intents, SimEvent, tick};
