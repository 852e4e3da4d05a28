//! Retro Platformer - a tile-based side-scroller rendered as pixel art
//!
//! Core modules:
//! - `sim`: Simulation (level grid, physics, entities, per-tick rules)
//! - `renderer`: Software pixel compositor + WebGPU presentation
//! - `controller`: Frame scheduling, pause/reset, deferred events
//! - `host`: Narrow callback interface toward the surrounding UI
//! - `settings`: Data-driven tuning

pub mod controller;
pub mod host;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use controller::GameController;
pub use host::{HostSink, Scoreboard};
pub use settings::{PhysicsTuning, Settings};

/// Game configuration constants
pub mod consts {
    /// Logical pixels per tile
    pub const TILE: f32 = 16.0;
    /// Integer upscale from logical pixels to device pixels
    pub const SCALE: u32 = 3;

    /// Real milliseconds represented by one simulation `dt` unit (60 Hz frame)
    pub const FRAME_MS: f32 = 16.67;
    /// Upper bound on real elapsed time fed into one tick
    pub const MAX_FRAME_MS: f32 = 33.0;

    /// Seconds on the clock at level start
    pub const START_TIME: u32 = 400;
    /// Collision clamp offset to avoid re-triggering the same contact
    pub const EPSILON: f32 = 0.01;

    /// Player bounding box
    pub const PLAYER_W: f32 = 12.0;
    pub const PLAYER_H: f32 = 14.0;
    /// Player spawn tile (column, rows above the bottom)
    pub const PLAYER_SPAWN_COL: f32 = 2.0;
    pub const PLAYER_SPAWN_ROWS_FROM_BOTTOM: f32 = 4.0;

    /// Enemy bounding box and patrol speed (tiles per frame)
    pub const ENEMY_W: f32 = 12.0;
    pub const ENEMY_H: f32 = 12.0;
    pub const ENEMY_SPEED: f32 = 0.6;

    /// Floating coin box and inset inside its spawn tile
    pub const COIN_SIZE: f32 = 8.0;
    pub const COIN_INSET: f32 = 4.0;

    /// Upward velocity applied after hitting a block from below
    pub const BUMP_REBOUND: f32 = 0.5;
    /// Upward velocity applied to the player after a stomp
    pub const STOMP_BOUNCE: f32 = -6.0;
    /// Vertical tolerance of the stomp test (pixels)
    pub const STOMP_MARGIN: f32 = 4.0;
    /// Grace period after a stomp, in frame units
    pub const STOMP_INVINCIBILITY: f32 = 8.0;

    /// Camera keeps the player at this fraction of the viewport width
    pub const CAMERA_LEAD: f32 = 0.35;
    /// Per-tick camera smoothing factor
    pub const CAMERA_SMOOTHING: f32 = 0.2;

    /// Score awards
    pub const SCORE_BRICK: u32 = 50;
    pub const SCORE_QUESTION: u32 = 200;
    pub const SCORE_STOMP: u32 = 100;
    pub const SCORE_COIN_PICKUP: u32 = 100;
    pub const SCORE_GOAL: u32 = 1000;
    /// Score the HUD adds for every coin counted
    pub const SCORE_PER_COIN: u32 = 200;

    /// Deferred actions (milliseconds of simulated time)
    pub const RESPAWN_DELAY_MS: f32 = 900.0;
    pub const LEVEL_RESET_DELAY_MS: f32 = 800.0;

    /// Lives at the start of a run
    pub const START_LIVES: u32 = 3;
}
