//! Per-tick simulation rules
//!
//! One call to `tick` advances the world by `dt` frame units (1.0 = one
//! 60 Hz frame). Order is fixed: clock, player, camera, enemies, coins,
//! goal. Deferred consequences (respawn, level reset) are returned as
//! `SimEvent`s for the controller to schedule.

use serde::{Deserialize, Serialize};

use super::level::TileKind;
use super::physics::Bump;
use super::state::{Player, SimulationState};
use crate::consts::*;
use crate::host::HostSink;

/// A logical input, independent of the device that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Left,
    Right,
    Up,
    Run,
}

impl Intent {
    /// Keyboard binding (`KeyboardEvent.key` values)
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowLeft" => Some(Intent::Left),
            "ArrowRight" => Some(Intent::Right),
            "ArrowUp" | "z" | "Z" | "k" | "K" => Some(Intent::Up),
            "x" | "X" | "l" | "L" => Some(Intent::Run),
            _ => None,
        }
    }

    /// Name used by on-screen buttons (`data-intent="left"`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "left" => Some(Intent::Left),
            "right" => Some(Intent::Right),
            "up" | "jump" => Some(Intent::Up),
            "run" => Some(Intent::Run),
            _ => None,
        }
    }
}

/// Currently held intents, polled once per tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intents {
    pub left: bool,
    pub right: bool,
    /// Jump
    pub up: bool,
    pub run: bool,
}

impl Intents {
    pub fn set(&mut self, intent: Intent, pressed: bool) {
        match intent {
            Intent::Left => self.left = pressed,
            Intent::Right => self.right = pressed,
            Intent::Up => self.up = pressed,
            Intent::Run => self.run = pressed,
        }
    }

    pub fn release_all(&mut self) {
        *self = Self::default();
    }
}

/// Outcomes that need follow-up outside the tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    /// Player died; respawn after a delay
    PlayerDied,
    /// Flag reached; restart the stage after a delay
    GoalReached,
}

/// Advance the simulation by `dt` frame units
pub fn tick(
    state: &mut SimulationState,
    input: &Intents,
    dt: f32,
    sink: &mut dyn HostSink,
) -> Vec<SimEvent> {
    let mut events = Vec::new();

    // Clock
    if !state.player.dead && !state.level_complete {
        if let Some(remaining) = state.timer.advance(dt * FRAME_MS / 1000.0) {
            sink.set_time(remaining);
            if state.timer.is_expired() {
                log::info!("Time up");
                kill_player(&mut state.player, sink, &mut events);
            }
        }
    }

    // Player
    let tuning = state.world.tuning;
    let bump = state.player.update(&state.grid, &tuning, input, dt);
    if let Some(bump) = bump {
        if !state.player.dead {
            bump_block(state, bump, sink);
        }
    }

    let fall_limit = (state.grid.height() as f32 + 2.0) * TILE;
    if state.player.body.pos.y > fall_limit && !state.level_complete {
        kill_player(&mut state.player, sink, &mut events);
    }

    // Camera
    let center_x = state.player.body.center().x;
    let level_w = state.grid.pixel_width();
    state.world.camera.follow(center_x, level_w);

    // Enemies
    let player_rect = state.player.body.rect();
    for enemy in state.enemies.iter_mut().filter(|e| e.alive) {
        enemy.update(&state.grid, &tuning, dt);

        if state.player.dead || state.level_complete {
            continue;
        }
        let enemy_rect = enemy.body.rect();
        if !state.player.body.rect().intersects(&enemy_rect) {
            continue;
        }

        let player = &mut state.player;
        let feet = player.body.bottom() - STOMP_MARGIN;
        if player.body.vel.y > 0.0 && feet < enemy_rect.y + STOMP_MARGIN {
            enemy.alive = false;
            sink.add_score(SCORE_STOMP);
            player.body.vel.y = STOMP_BOUNCE;
            player.invincible = player.invincible.max(STOMP_INVINCIBILITY);
            log::debug!("Stomped enemy at {:?}", enemy_rect);
        } else if !player.is_invincible() {
            kill_player(player, sink, &mut events);
        }
    }

    // Coins
    for coin in state.coins.iter_mut().filter(|c| !c.taken) {
        coin.t += dt;
        if !state.player.dead && player_rect.intersects(&coin.rect()) {
            coin.taken = true;
            sink.add_coin();
            sink.add_score(SCORE_COIN_PICKUP);
        }
    }

    // Goal
    if !state.player.dead && !state.level_complete && state.player_tile() == TileKind::Flag {
        state.level_complete = true;
        state.world_id = state.world_id.next();
        sink.add_score(SCORE_GOAL);
        sink.set_world(&state.world_id.to_string());
        log::info!("Flag reached, next world {}", state.world_id);
        events.push(SimEvent::GoalReached);
    }

    events
}

/// Reward a block hit from below
fn bump_block(state: &mut SimulationState, bump: Bump, sink: &mut dyn HostSink) {
    match bump.kind {
        TileKind::Brick => sink.add_score(SCORE_BRICK),
        TileKind::Question => {
            // Pays out once per level load
            if state.exhausted.insert((bump.col, bump.row)) {
                sink.add_coin();
                sink.add_score(SCORE_QUESTION);
            }
        }
        _ => {}
    }
}

fn kill_player(player: &mut Player, sink: &mut dyn HostSink, events: &mut Vec<SimEvent>) {
    if player.dead {
        return;
    }
    player.dead = true;
    sink.lose_life();
    log::info!("Player died at {:?}", player.body.pos);
    events.push(SimEvent::PlayerDied);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Scoreboard;
    use crate::settings::PhysicsTuning;
    use crate::sim::level::LEVEL_1_1;
    use crate::sim::state::{Coin, Enemy};
    use glam::Vec2;
    use proptest::prelude::*;

    /// Flat test stage: ground on the bottom two rows
    const FLAT: [&str; 8] = [
        "______________________________",
        "______________________________",
        "______________________________",
        "______________________________",
        "______________________________",
        "______________________________",
        "##############################",
        "##############################",
    ];

    fn flat_state() -> SimulationState {
        let mut state = SimulationState::new(&FLAT, PhysicsTuning::default(), 160.0).unwrap();
        settle(&mut state);
        state
    }

    /// Let the player drop onto the ground
    fn settle(state: &mut SimulationState) {
        let mut board = Scoreboard::new();
        for _ in 0..30 {
            tick(state, &Intents::default(), 1.0, &mut board);
        }
        assert!(state.player.body.on_ground);
    }

    #[test]
    fn test_friction_stops_player() {
        let mut state = flat_state();
        let mut board = Scoreboard::new();
        state.player.body.vel.x = 1.8;
        let mut ticks = 0;
        while state.player.body.vel.x != 0.0 {
            tick(&mut state, &Intents::default(), 1.0, &mut board);
            ticks += 1;
            assert!(ticks < 100, "friction never converged");
        }
        assert_eq!(state.player.body.vel.x, 0.0);
    }

    #[test]
    fn test_walk_accelerates_and_turns() {
        let mut state = flat_state();
        let mut board = Scoreboard::new();
        let walk = Intents {
            right: true,
            ..Default::default()
        };
        for _ in 0..5 {
            tick(&mut state, &walk, 1.0, &mut board);
        }
        // 0.2 per tick, still below the walking cap
        assert!((state.player.body.vel.x - 1.0).abs() < 1e-4);
        assert_eq!(state.player.body.facing, 1);

        let left = Intents {
            left: true,
            ..Default::default()
        };
        tick(&mut state, &left, 1.0, &mut board);
        assert_eq!(state.player.body.facing, -1);
    }

    #[test]
    fn test_jump_requires_ground() {
        let mut state = flat_state();
        let mut board = Scoreboard::new();
        let jump = Intents {
            up: true,
            ..Default::default()
        };
        let ground_y = state.player.body.pos.y;
        tick(&mut state, &jump, 1.0, &mut board);
        assert!(state.player.body.pos.y < ground_y);
        assert!(!state.player.body.on_ground);

        // Holding jump in the air does not re-apply the impulse
        let vy = state.player.body.vel.y;
        tick(&mut state, &jump, 1.0, &mut board);
        assert!(state.player.body.vel.y > vy);
    }

    fn enemy_next_to_player(state: &mut SimulationState) -> usize {
        let p = state.player.body.pos;
        let mut enemy = Enemy::at_tile(0, 0);
        enemy.body.pos = Vec2::new(p.x + 4.0, 96.0 - ENEMY_H - EPSILON);
        enemy.body.vel.x = 0.0;
        enemy.body.on_ground = true;
        state.enemies.push(enemy);
        state.enemies.len() - 1
    }

    #[test]
    fn test_stomp_kills_enemy() {
        let mut state = flat_state();
        let mut board = Scoreboard::new();
        let idx = enemy_next_to_player(&mut state);
        let enemy_top = state.enemies[idx].body.pos.y;

        // Falling, feet just inside the enemy's head
        state.player.body.pos.y = enemy_top - PLAYER_H + 2.0 - 3.0;
        state.player.body.vel.y = 3.0;
        state.player.body.on_ground = false;

        let events = tick(&mut state, &Intents::default(), 1.0, &mut board);

        assert!(!state.enemies[idx].alive);
        assert!(!state.player.dead);
        assert!(events.is_empty());
        assert_eq!(state.player.body.vel.y, STOMP_BOUNCE);
        assert_eq!(board.score, u64::from(SCORE_STOMP));
    }

    #[test]
    fn test_side_contact_kills_player() {
        let mut state = flat_state();
        let mut board = Scoreboard::new();
        let idx = enemy_next_to_player(&mut state);

        let events = tick(&mut state, &Intents::default(), 1.0, &mut board);

        assert!(state.enemies[idx].alive);
        assert!(state.player.dead);
        assert_eq!(events, vec![SimEvent::PlayerDied]);
        assert_eq!(board.lives, START_LIVES - 1);

        // Dying is reported once
        let events = tick(&mut state, &Intents::default(), 1.0, &mut board);
        assert!(events.is_empty());
        assert_eq!(board.lives, START_LIVES - 1);
    }

    #[test]
    fn test_falling_too_low_kills_player() {
        let mut state = flat_state();
        let mut board = Scoreboard::new();
        let idx = enemy_next_to_player(&mut state);
        let enemy_top = state.enemies[idx].body.pos.y;

        // Falling, but after this tick's gravity the feet end 10 px below the
        // enemy's top, deeper than the stomp window
        state.player.body.pos.y = enemy_top - PLAYER_H + 10.0 - 1.5;
        state.player.body.vel.y = 1.0;
        state.player.body.on_ground = false;

        let events = tick(&mut state, &Intents::default(), 1.0, &mut board);

        assert!(state.player.body.vel.y > 0.0);
        assert!(state.player.body.bottom() - enemy_top > 2.0 * STOMP_MARGIN);
        assert!(state.enemies[idx].alive);
        assert!(state.player.dead);
        assert_eq!(events, vec![SimEvent::PlayerDied]);
        assert_eq!(board.score, 0);
    }

    #[test]
    fn test_invincible_player_survives_contact() {
        let mut state = flat_state();
        let mut board = Scoreboard::new();
        let idx = enemy_next_to_player(&mut state);
        state.player.invincible = 30.0;

        tick(&mut state, &Intents::default(), 1.0, &mut board);

        assert!(state.enemies[idx].alive);
        assert!(!state.player.dead);
    }

    #[test]
    fn test_coin_pickup() {
        let mut state = flat_state();
        let mut board = Scoreboard::new();
        let p = state.player.body.pos;
        state.coins.push(Coin {
            pos: Vec2::new(p.x + 2.0, p.y + 2.0),
            taken: false,
            t: 0.0,
        });

        tick(&mut state, &Intents::default(), 1.0, &mut board);

        assert!(state.coins.last().unwrap().taken);
        assert_eq!(board.coins, 1);
        assert_eq!(
            board.score,
            u64::from(SCORE_COIN_PICKUP + SCORE_PER_COIN)
        );

        // Taken coins stay taken and pay nothing more
        tick(&mut state, &Intents::default(), 1.0, &mut board);
        assert_eq!(board.coins, 1);
    }

    #[test]
    fn test_falling_off_world_kills() {
        let mut state = flat_state();
        let mut board = Scoreboard::new();
        state.player.body.pos.y = (state.grid.height() as f32 + 3.0) * TILE;
        let events = tick(&mut state, &Intents::default(), 1.0, &mut board);
        assert!(state.player.dead);
        assert_eq!(events, vec![SimEvent::PlayerDied]);
    }

    #[test]
    fn test_timer_runs_out() {
        let mut state = flat_state();
        let mut board = Scoreboard::new();
        state.timer = crate::sim::Timer::new(1);
        let mut died = false;
        // 1 second is ~60 frame units
        for _ in 0..70 {
            let events = tick(&mut state, &Intents::default(), 1.0, &mut board);
            died |= events.contains(&SimEvent::PlayerDied);
        }
        assert!(died);
        assert_eq!(board.time, 0);
        assert!(state.player.dead);
    }

    #[test]
    fn test_timer_ignores_frame_rate() {
        let mut fast = flat_state();
        let mut slow = flat_state();
        let mut board = Scoreboard::new();
        // 120 ticks of half a frame vs 60 ticks of one frame
        for _ in 0..120 {
            tick(&mut fast, &Intents::default(), 0.5, &mut board);
        }
        for _ in 0..60 {
            tick(&mut slow, &Intents::default(), 1.0, &mut board);
        }
        assert_eq!(fast.timer.remaining, slow.timer.remaining);
    }

    #[test]
    fn test_question_block_pays_once() {
        let rows = [
            "______",
            "__?___",
            "______",
            "______",
            "######",
            "######",
        ];
        let mut state = SimulationState::new(&rows, PhysicsTuning::default(), 96.0).unwrap();
        let mut board = Scoreboard::new();

        for _ in 0..2 {
            // Just under the block, moving up
            state.player.body.pos = Vec2::new(34.0, 34.0);
            state.player.body.vel = Vec2::new(0.0, -6.0);
            tick(&mut state, &Intents::default(), 1.0, &mut board);
        }

        assert!(state.is_exhausted(2, 1));
        assert_eq!(board.coins, 1);
        assert_eq!(
            board.score,
            u64::from(SCORE_QUESTION + SCORE_PER_COIN)
        );
    }

    #[test]
    fn test_brick_bump_scores() {
        let rows = ["______", "__B___", "______", "______", "######", "######"];
        let mut state = SimulationState::new(&rows, PhysicsTuning::default(), 96.0).unwrap();
        let mut board = Scoreboard::new();
        state.player.body.pos = Vec2::new(34.0, 34.0);
        state.player.body.vel = Vec2::new(0.0, -6.0);
        tick(&mut state, &Intents::default(), 1.0, &mut board);
        assert_eq!(board.score, u64::from(SCORE_BRICK));
        assert_eq!(state.player.body.vel.y, BUMP_REBOUND);
    }

    #[test]
    fn test_goal_awards_once() {
        let mut state =
            SimulationState::new(&LEVEL_1_1, PhysicsTuning::default(), 320.0).unwrap();
        let mut board = Scoreboard::new();
        let (col, row) = state.grid.cells_of(TileKind::Flag).last().unwrap();
        state.player.body.pos = Vec2::new(col as f32 * TILE + 2.0, row as f32 * TILE + 1.0);
        state.player.body.vel = Vec2::ZERO;

        let events = tick(&mut state, &Intents::default(), 1.0, &mut board);
        assert_eq!(events, vec![SimEvent::GoalReached]);
        assert!(state.level_complete);
        assert_eq!(board.world, "1-2");
        let score = board.score;
        assert_eq!(score, u64::from(SCORE_GOAL));

        for _ in 0..10 {
            let events = tick(&mut state, &Intents::default(), 1.0, &mut board);
            assert!(events.is_empty());
        }
        assert_eq!(board.score, score);
    }

    #[test]
    fn test_camera_follows_player() {
        let mut state =
            SimulationState::new(&LEVEL_1_1, PhysicsTuning::default(), 320.0).unwrap();
        let mut board = Scoreboard::new();
        state.player.body.pos.x = 800.0;
        for _ in 0..60 {
            tick(&mut state, &Intents::default(), 1.0, &mut board);
        }
        let target = state
            .world
            .camera
            .target(state.player.body.center().x, state.grid.pixel_width());
        assert!((state.world.camera.x - target).abs() < 1.0);
        assert!(state.world.camera.x >= 0.0);
    }

    #[test]
    fn test_intent_bindings() {
        assert_eq!(Intent::from_key("ArrowLeft"), Some(Intent::Left));
        assert_eq!(Intent::from_key("z"), Some(Intent::Up));
        assert_eq!(Intent::from_key("L"), Some(Intent::Run));
        assert_eq!(Intent::from_key("Escape"), None);
        assert_eq!(Intent::from_name("jump"), Some(Intent::Up));

        let mut intents = Intents::default();
        intents.set(Intent::Right, true);
        intents.set(Intent::Run, true);
        assert!(intents.right && intents.run && !intents.left);
        intents.release_all();
        assert_eq!(intents, Intents::default());
    }

    #[test]
    fn test_sprint_caps_speed() {
        let mut state = flat_state();
        let mut board = Scoreboard::new();
        let sprint = Intents {
            right: true,
            run: true,
            ..Default::default()
        };
        let mut top = 0.0f32;
        for _ in 0..8 {
            tick(&mut state, &sprint, 1.0, &mut board);
            top = top.max(state.player.body.vel.x);
        }
        assert!(top <= state.world.tuning.max_sprint);
        assert!(top > state.world.tuning.max_run);
    }

    proptest! {
        #[test]
        fn prop_friction_reaches_exact_zero(vx in -2.6f32..2.6) {
            let mut state = flat_state();
            let mut board = Scoreboard::new();
            state.player.body.vel.x = vx;
            for _ in 0..40 {
                tick(&mut state, &Intents::default(), 1.0, &mut board);
            }
            prop_assert_eq!(state.player.body.vel.x, 0.0);
        }
    }
}
