//! Simulation state and entity models
//!
//! Everything the per-tick rules mutate lives in `SimulationState`. The
//! renderer only ever borrows it immutably.

use std::collections::BTreeSet;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::level::{LevelError, LevelGrid, TileKind};
use super::physics::{Body, Bump, Rect};
use super::tick::Intents;
use crate::consts::*;
use crate::settings::PhysicsTuning;

/// Horizontal scroll following the player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Left edge of the view in level pixels
    pub x: f32,
    /// Visible width in logical pixels
    pub view_w: f32,
}

impl Camera {
    pub fn new(view_w: f32) -> Self {
        Self { x: 0.0, view_w }
    }

    /// Scroll target keeping `center_x` at the lead fraction of the view,
    /// never showing anything outside `[0, level_w)`
    pub fn target(&self, center_x: f32, level_w: f32) -> f32 {
        (center_x - self.view_w * CAMERA_LEAD)
            .min(level_w - self.view_w)
            .max(0.0)
    }

    /// Ease toward the target
    pub fn follow(&mut self, center_x: f32, level_w: f32) {
        let target = self.target(center_x, level_w);
        self.x += (target - self.x) * CAMERA_SMOOTHING;
    }
}

/// Physical parameters of the stage plus the camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub tuning: PhysicsTuning,
    pub camera: Camera,
}

/// The player character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub body: Body,
    pub dead: bool,
    /// Remaining invincibility in frame units (0 = vulnerable)
    pub invincible: f32,
}

impl Player {
    /// Spawn point: column 2, four rows above the bottom of the level
    pub fn spawn_point(grid: &LevelGrid) -> Vec2 {
        Vec2::new(
            PLAYER_SPAWN_COL * TILE,
            (grid.height() as f32 - PLAYER_SPAWN_ROWS_FROM_BOTTOM) * TILE,
        )
    }

    pub fn new(grid: &LevelGrid) -> Self {
        Self {
            body: Body::new(Self::spawn_point(grid), PLAYER_W, PLAYER_H),
            dead: false,
            invincible: 0.0,
        }
    }

    /// Put the player back at the spawn point, alive and at rest
    pub fn respawn(&mut self, grid: &LevelGrid) {
        self.body.pos = Self::spawn_point(grid);
        self.body.vel = Vec2::ZERO;
        self.body.on_ground = false;
        self.body.facing = 1;
        self.dead = false;
        self.invincible = 0.0;
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible > 0.0
    }

    /// Apply input, gravity and both collision passes.
    ///
    /// A dead player ignores input but keeps falling.
    pub fn update(
        &mut self,
        grid: &LevelGrid,
        tuning: &PhysicsTuning,
        input: &Intents,
        dt: f32,
    ) -> Option<Bump> {
        let body = &mut self.body;
        let (left, right, up, run) = if self.dead {
            (false, false, false, false)
        } else {
            (input.left, input.right, input.up, input.run)
        };

        let target_speed = if run {
            tuning.max_sprint
        } else {
            tuning.max_run
        };
        let accel = tuning.run_accel * dt * if run { tuning.run_boost } else { 1.0 };

        if left {
            body.vel.x = (body.vel.x - accel).max(-target_speed);
            body.facing = -1;
        } else if right {
            body.vel.x = (body.vel.x + accel).min(target_speed);
            body.facing = 1;
        } else {
            body.vel.x *= tuning.friction;
            if body.vel.x.abs() < tuning.stop_threshold {
                body.vel.x = 0.0;
            }
        }

        body.apply_gravity(tuning.gravity, dt);

        if up && body.on_ground {
            body.vel.y = tuning.jump_velocity;
            body.on_ground = false;
        }

        body.move_x(grid, dt);
        let bump = body.move_y(grid, dt);

        self.invincible = (self.invincible - dt).max(0.0);
        bump
    }
}

/// A patrolling enemy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub body: Body,
    pub alive: bool,
    /// Where `reset` puts it back
    pub spawn: Vec2,
}

impl Enemy {
    /// Enemy standing in the spawn tile at `(col, row)`
    pub fn at_tile(col: i32, row: i32) -> Self {
        let spawn = Vec2::new(col as f32 * TILE, row as f32 * TILE - 1.0);
        let mut enemy = Self {
            body: Body::new(spawn, ENEMY_W, ENEMY_H),
            alive: true,
            spawn,
        };
        enemy.respawn();
        enemy
    }

    /// Back to the spawn point, alive and walking left
    pub fn respawn(&mut self) {
        self.body = Body::new(self.spawn, ENEMY_W, ENEMY_H);
        self.body.vel.x = -ENEMY_SPEED;
        self.body.facing = -1;
        self.alive = true;
    }

    /// Patrol: walk, turn at walls and at ledges
    pub fn update(&mut self, grid: &LevelGrid, tuning: &PhysicsTuning, dt: f32) {
        let body = &mut self.body;
        let was_grounded = body.on_ground;
        body.apply_gravity(tuning.gravity, dt);

        let heading = body.vel.x;
        if body.move_x(grid, dt) {
            body.vel.x = -heading;
        }

        body.move_y(grid, dt);

        if was_grounded || body.on_ground {
            let ahead_x = if body.vel.x > 0.0 {
                body.pos.x + body.w + 1.0
            } else {
                body.pos.x - 1.0
            };
            let (col, row) = LevelGrid::cell_of(ahead_x, body.bottom() + 1.0);
            if !grid.collides(col, row) {
                body.vel.x = -body.vel.x;
            }
        }
        body.facing = if body.vel.x < 0.0 { -1 } else { 1 };
    }
}

/// A floating coin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub pos: Vec2,
    pub taken: bool,
    /// Animation phase (frame units), cosmetic only
    pub t: f32,
}

impl Coin {
    pub fn at_tile(col: i32, row: i32) -> Self {
        Self {
            pos: Vec2::new(
                col as f32 * TILE + COIN_INSET,
                row as f32 * TILE + COIN_INSET,
            ),
            taken: false,
            t: 0.0,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, COIN_SIZE, COIN_SIZE)
    }

    /// Vertical bob for drawing
    pub fn bob_offset(&self) -> f32 {
        (self.t * 3.0).sin() * 1.5
    }
}

/// Level clock in whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    pub remaining: u32,
    /// Fraction of the current second already elapsed
    accumulator: f32,
}

impl Timer {
    pub fn new(seconds: u32) -> Self {
        Self {
            remaining: seconds,
            accumulator: 0.0,
        }
    }

    /// Advance by `seconds` of simulated time.
    ///
    /// Returns the new remaining time if at least one whole second elapsed.
    pub fn advance(&mut self, seconds: f32) -> Option<u32> {
        self.accumulator += seconds;
        let mut changed = false;
        while self.accumulator >= 1.0 {
            self.accumulator -= 1.0;
            self.remaining = self.remaining.saturating_sub(1);
            changed = true;
        }
        changed.then_some(self.remaining)
    }

    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }
}

/// Displayed world number, e.g. `1-1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldId {
    pub major: u32,
    pub minor: u32,
}

impl Default for WorldId {
    fn default() -> Self {
        Self { major: 1, minor: 1 }
    }
}

impl WorldId {
    pub fn next(&self) -> Self {
        Self {
            major: self.major,
            minor: self.minor + 1,
        }
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.major, self.minor)
    }
}

/// Complete simulation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub grid: LevelGrid,
    pub world: World,
    pub player: Player,
    /// In spawn order (row-major over the grid)
    pub enemies: Vec<Enemy>,
    pub coins: Vec<Coin>,
    pub timer: Timer,
    /// Reported world identifier; survives level resets
    pub world_id: WorldId,
    /// Question blocks that already paid out
    pub exhausted: BTreeSet<(i32, i32)>,
    /// Flag reached; waiting for the scheduled reset
    pub level_complete: bool,
}

impl SimulationState {
    /// Load a level; malformed level data is a fatal configuration error
    pub fn new<S: AsRef<str>>(
        rows: &[S],
        tuning: PhysicsTuning,
        view_w: f32,
    ) -> Result<Self, LevelError> {
        let grid = LevelGrid::parse(rows)?;
        let enemies = grid
            .cells_of(TileKind::EnemySpawn)
            .map(|(col, row)| Enemy::at_tile(col, row))
            .collect();
        let coins = grid
            .cells_of(TileKind::CoinSpawn)
            .map(|(col, row)| Coin::at_tile(col, row))
            .collect();
        let player = Player::new(&grid);

        let state = Self {
            world: World {
                tuning,
                camera: Camera::new(view_w),
            },
            player,
            enemies,
            coins,
            timer: Timer::new(START_TIME),
            world_id: WorldId::default(),
            exhausted: BTreeSet::new(),
            level_complete: false,
            grid,
        };

        log::info!(
            "Level loaded: {}x{} tiles, {} enemies, {} coins",
            state.grid.width(),
            state.grid.height(),
            state.enemies.len(),
            state.coins.len()
        );
        Ok(state)
    }

    /// Return every entity and the clock to level start
    pub fn reset(&mut self) {
        self.player.respawn(&self.grid);
        self.world.camera.x = 0.0;
        for enemy in &mut self.enemies {
            enemy.respawn();
        }
        for coin in &mut self.coins {
            coin.taken = false;
            coin.t = 0.0;
        }
        self.timer = Timer::new(START_TIME);
        self.exhausted.clear();
        self.level_complete = false;
    }

    pub fn is_exhausted(&self, col: i32, row: i32) -> bool {
        self.exhausted.contains(&(col, row))
    }

    /// Tile the player's center is in
    pub fn player_tile(&self) -> TileKind {
        let center = self.player.body.center();
        let (col, row) = LevelGrid::cell_of(center.x, center.y);
        self.grid.tile_at(col, row)
    }
}
