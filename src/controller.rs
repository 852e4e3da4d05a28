//! Frame driver and host-facing controls
//!
//! `GameController` turns wall-clock frame callbacks into clamped simulation
//! steps, owns the queue of deferred actions (respawn after death, restart
//! after the flag) and paints the framebuffer every frame.

use crate::consts::*;
use crate::host::HostSink;
use crate::renderer::frame::{self, Framebuffer};
use crate::settings::Settings;
use crate::sim::{Intents, LEVEL_1_1, LevelError, SimEvent, SimulationState, WorldId, tick};

/// Actions run some time after the event that caused them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    /// Player died; put everything back at level start
    Respawn,
    /// Flag reached; restart the stage
    LevelReset,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScheduledEvent {
    due_ms: f64,
    action: Deferred,
}

/// Deferred-action queue on the simulated clock
///
/// The clock only moves while the game is running, so a paused game never
/// fires a pending respawn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scheduler {
    clock_ms: f64,
    pending: Vec<ScheduledEvent>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, delay_ms: f32, action: Deferred) {
        self.pending.push(ScheduledEvent {
            due_ms: self.clock_ms + f64::from(delay_ms),
            action,
        });
    }

    /// Move the clock forward and drain everything that came due, oldest first
    pub fn advance(&mut self, elapsed_ms: f32) -> Vec<Deferred> {
        self.clock_ms += f64::from(elapsed_ms);
        let now = self.clock_ms;

        let mut due: Vec<ScheduledEvent> = Vec::new();
        self.pending.retain(|event| {
            if event.due_ms <= now {
                due.push(*event);
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.due_ms.total_cmp(&b.due_ms));
        due.into_iter().map(|event| event.action).collect()
    }

    /// Drop every pending action
    pub fn cancel_all(&mut self) {
        if !self.pending.is_empty() {
            log::debug!("Cancelled {} deferred action(s)", self.pending.len());
        }
        self.pending.clear();
    }

    pub fn is_pending(&self, action: Deferred) -> bool {
        self.pending.iter().any(|event| event.action == action)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Exponentially smoothed frames per second
#[derive(Debug, Clone, Copy, Default)]
struct FpsMeter {
    fps: f32,
}

impl FpsMeter {
    fn sample(&mut self, elapsed_ms: f32) {
        if elapsed_ms <= 0.0 {
            return;
        }
        let instant = 1000.0 / elapsed_ms;
        self.fps = if self.fps == 0.0 {
            instant
        } else {
            self.fps * 0.9 + instant * 0.1
        };
    }
}

/// Runs the game: simulation, deferred actions, pause and rendering
pub struct GameController {
    state: SimulationState,
    settings: Settings,
    paused: bool,
    /// Timestamp of the previous frame callback (ms)
    last_time: Option<f64>,
    scheduler: Scheduler,
    frame: Framebuffer,
    fps: FpsMeter,
}

impl GameController {
    /// Load the built-in stage with a view of `view_cols x view_rows` tiles
    pub fn new(settings: Settings, view_cols: u32, view_rows: u32) -> Result<Self, LevelError> {
        let tile = TILE as u32;
        let (width, height) = (view_cols.max(1) * tile, view_rows.max(1) * tile);
        let state = SimulationState::new(&LEVEL_1_1, settings.physics, width as f32)?;

        Ok(Self {
            state,
            settings,
            paused: false,
            last_time: None,
            scheduler: Scheduler::new(),
            frame: Framebuffer::new(width, height),
            fps: FpsMeter::default(),
        })
    }

    /// Back to level start; pending respawns and restarts are cancelled
    pub fn reset(&mut self, sink: &mut dyn HostSink) {
        self.scheduler.cancel_all();
        self.restore_level(sink);
        log::info!("Level reset");
    }

    /// Start a new run from world 1-1
    pub fn restart(&mut self, sink: &mut dyn HostSink) {
        self.state.world_id = WorldId::default();
        self.reset(sink);
    }

    pub fn pause(&mut self, paused: bool) {
        if self.paused != paused {
            log::info!("{}", if paused { "Paused" } else { "Resumed" });
        }
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.frame
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Smoothed frame rate, 0 until two frames were seen
    pub fn fps(&self) -> f32 {
        self.fps.fps
    }

    /// Frame callback. `now_ms` is the animation-frame timestamp.
    pub fn frame(&mut self, now_ms: f64, input: &Intents, sink: &mut dyn HostSink) {
        let raw = match self.last_time {
            Some(last) => (now_ms - last).max(0.0) as f32,
            None => 0.0,
        };
        self.last_time = Some(now_ms);
        self.fps.sample(raw);

        self.step(raw, input, sink);
    }

    /// Advance by `elapsed_ms` of real time (clamped) and repaint
    pub fn step(&mut self, elapsed_ms: f32, input: &Intents, sink: &mut dyn HostSink) {
        if !self.paused {
            let elapsed = elapsed_ms.clamp(0.0, self.settings.max_frame_ms);

            for action in self.scheduler.advance(elapsed) {
                self.run_deferred(action, sink);
            }

            let dt = elapsed / FRAME_MS;
            for event in tick(&mut self.state, input, dt, sink) {
                match event {
                    SimEvent::PlayerDied => {
                        self.scheduler.schedule(RESPAWN_DELAY_MS, Deferred::Respawn)
                    }
                    SimEvent::GoalReached => {
                        self.scheduler
                            .schedule(LEVEL_RESET_DELAY_MS, Deferred::LevelReset)
                    }
                }
            }
        }

        frame::render(&self.state, self.paused, &mut self.frame);
    }

    fn run_deferred(&mut self, action: Deferred, sink: &mut dyn HostSink) {
        log::debug!("Running deferred {:?}", action);
        self.restore_level(sink);
        if action == Deferred::LevelReset {
            log::info!("Starting world {}", self.state.world_id);
        }
    }

    fn restore_level(&mut self, sink: &mut dyn HostSink) {
        self.state.reset();
        sink.set_time(START_TIME);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Scoreboard;
    use crate::sim::TileKind;
    use glam::Vec2;
    use proptest::prelude::*;

    fn controller() -> GameController {
        GameController::new(Settings::default(), 20, 14).unwrap()
    }

    fn idle() -> Intents {
        Intents::default()
    }

    /// Run `ms` of game time in max-size steps
    fn run_for(game: &mut GameController, ms: f32, board: &mut Scoreboard) {
        let mut left = ms;
        while left > 0.0 {
            let step = left.min(MAX_FRAME_MS);
            game.step(step, &idle(), board);
            left -= step;
        }
    }

    fn level_start() -> SimulationState {
        SimulationState::new(
            &LEVEL_1_1,
            Settings::default().physics,
            (20 * TILE as u32) as f32,
        )
        .unwrap()
    }

    #[test]
    fn test_scheduler_fires_in_due_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(900.0, Deferred::Respawn);
        scheduler.schedule(800.0, Deferred::LevelReset);
        assert!(scheduler.advance(500.0).is_empty());
        assert_eq!(
            scheduler.advance(500.0),
            vec![Deferred::LevelReset, Deferred::Respawn]
        );
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_scheduler_cancel() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(10.0, Deferred::Respawn);
        assert!(scheduler.is_pending(Deferred::Respawn));
        scheduler.cancel_all();
        assert!(scheduler.advance(100.0).is_empty());
    }

    #[test]
    fn test_view_size_sets_framebuffer() {
        let game = controller();
        assert_eq!(game.framebuffer().width(), 320);
        assert_eq!(game.framebuffer().height(), 224);
        assert_eq!(game.state().world.camera.view_w, 320.0);
    }

    #[test]
    fn test_elapsed_time_is_clamped() {
        let mut clamped = controller();
        let mut reference = controller();
        let mut board = Scoreboard::new();
        clamped.step(1000.0, &idle(), &mut board);
        reference.step(MAX_FRAME_MS, &idle(), &mut board);
        assert_eq!(clamped.state(), reference.state());
    }

    #[test]
    fn test_first_frame_does_not_advance() {
        let mut game = controller();
        let mut board = Scoreboard::new();
        game.frame(5000.0, &idle(), &mut board);
        assert_eq!(game.state(), &level_start());
        game.frame(5016.0, &idle(), &mut board);
        assert_ne!(game.state(), &level_start());
        assert!(game.fps() > 0.0);
    }

    #[test]
    fn test_pause_skips_simulation() {
        let mut game = controller();
        let mut board = Scoreboard::new();
        game.pause(true);
        let before = game.state().clone();
        for _ in 0..30 {
            game.step(16.0, &idle(), &mut board);
        }
        assert_eq!(game.state(), &before);
        assert!(game.is_paused());

        game.pause(false);
        game.step(16.0, &idle(), &mut board);
        assert_ne!(game.state(), &before);
    }

    #[test]
    fn test_pause_holds_pending_respawn() {
        let mut game = controller();
        let mut board = Scoreboard::new();
        game.state.player.body.pos.y = 10_000.0;
        game.step(16.0, &idle(), &mut board);
        assert!(game.state().player.dead);

        game.pause(true);
        for _ in 0..100 {
            game.step(MAX_FRAME_MS, &idle(), &mut board);
        }
        assert!(game.state().player.dead);
        assert!(game.scheduler().is_pending(Deferred::Respawn));
    }

    #[test]
    fn test_death_respawns_after_delay() {
        let mut game = controller();
        let mut board = Scoreboard::new();
        game.state.player.body.pos.y = 10_000.0;
        game.step(16.0, &idle(), &mut board);
        assert!(game.state().player.dead);
        assert_eq!(board.lives, START_LIVES - 1);

        run_for(&mut game, RESPAWN_DELAY_MS - 100.0, &mut board);
        assert!(game.state().player.dead);

        run_for(&mut game, 150.0, &mut board);
        assert!(!game.state().player.dead);
        assert_eq!(board.time, START_TIME);
        assert!(game.scheduler().is_empty());
    }

    #[test]
    fn test_goal_transition_restores_level_start() {
        let mut game = controller();
        let mut board = Scoreboard::new();

        // Knock the level around first
        game.state.enemies[0].alive = false;
        game.state.coins[0].taken = true;
        game.state.timer.remaining = 123;

        let (col, row) = game
            .state()
            .grid
            .cells_of(TileKind::Flag)
            .last()
            .unwrap();
        game.state.player.body.pos = Vec2::new(col as f32 * TILE + 2.0, row as f32 * TILE + 1.0);
        game.state.player.body.vel = Vec2::ZERO;

        game.step(16.0, &idle(), &mut board);
        assert_eq!(board.score, u64::from(SCORE_GOAL));
        assert_eq!(board.world, "1-2");
        assert!(game.scheduler().is_pending(Deferred::LevelReset));

        run_for(&mut game, LEVEL_RESET_DELAY_MS + 1.0, &mut board);
        let state = game.state();
        assert!(!state.level_complete);
        assert!(state.enemies.iter().all(|e| e.alive));
        assert!(state.coins.iter().all(|c| !c.taken));
        assert_eq!(board.score, u64::from(SCORE_GOAL));
        assert_eq!(state.world_id.to_string(), "1-2");
    }

    #[test]
    fn test_goal_reset_matches_level_start() {
        let mut game = controller();
        let mut board = Scoreboard::new();
        let (col, row) = game
            .state()
            .grid
            .cells_of(TileKind::Flag)
            .last()
            .unwrap();
        game.state.player.body.pos = Vec2::new(col as f32 * TILE + 2.0, row as f32 * TILE + 1.0);
        game.state.player.body.vel = Vec2::ZERO;
        game.step(16.0, &idle(), &mut board);

        // Fire the restart with exactly the remaining delay, no further tick
        let due = game.scheduler.advance(LEVEL_RESET_DELAY_MS);
        assert_eq!(due, vec![Deferred::LevelReset]);
        game.run_deferred(Deferred::LevelReset, &mut board);

        let mut expected = level_start();
        expected.world_id = expected.world_id.next();
        assert_eq!(game.state(), &expected);
    }

    #[test]
    fn test_manual_reset_cancels_pending_respawn() {
        let mut game = controller();
        let mut board = Scoreboard::new();
        game.state.player.body.pos.y = 10_000.0;
        game.step(16.0, &idle(), &mut board);
        assert!(game.scheduler().is_pending(Deferred::Respawn));

        game.reset(&mut board);
        assert!(game.scheduler().is_empty());
        assert!(!game.state().player.dead);

        // Mark the level; a stale respawn would undo these
        game.state.coins[0].taken = true;
        for enemy in &mut game.state.enemies {
            enemy.alive = false;
        }
        run_for(&mut game, RESPAWN_DELAY_MS * 2.0, &mut board);
        assert!(game.state().coins[0].taken);
        assert!(game.state().enemies.iter().all(|e| !e.alive));
        assert!(!game.state().player.dead);
    }

    #[test]
    fn test_restart_returns_to_first_world() {
        let mut game = controller();
        let mut board = Scoreboard::new();
        game.state.world_id = game.state.world_id.next();
        game.reset(&mut board);
        assert_eq!(game.state().world_id.to_string(), "1-2");
        game.restart(&mut board);
        assert_eq!(game.state(), &level_start());
    }

    #[test]
    fn test_reset_reports_start_time() {
        let mut game = controller();
        let mut board = Scoreboard::new();
        for enemy in &mut game.state.enemies {
            enemy.alive = false;
        }
        run_for(&mut game, 2500.0, &mut board);
        assert!(board.time < START_TIME);

        game.reset(&mut board);
        assert_eq!(board.time, START_TIME);

        run_for(&mut game, 2500.0, &mut board);
        game.restart(&mut board);
        assert_eq!(board.time, START_TIME);
    }

    #[test]
    fn test_paused_frame_draws_overlay() {
        let mut game = controller();
        let mut board = Scoreboard::new();
        game.step(16.0, &idle(), &mut board);
        let lit = game.framebuffer().pixel(0, 0).unwrap();
        game.pause(true);
        game.step(16.0, &idle(), &mut board);
        let shaded = game.framebuffer().pixel(0, 0).unwrap();
        assert!(shaded[2] < lit[2]);
    }

    proptest! {
        #[test]
        fn prop_reset_is_idempotent(frames in 0usize..120, right in any::<bool>(), up in any::<bool>()) {
            let mut game = controller();
            let mut board = Scoreboard::new();
            let input = Intents { right, up, ..Default::default() };
            for _ in 0..frames {
                game.step(16.0, &input, &mut board);
            }
            game.reset(&mut board);
            let once = game.state().clone();
            game.reset(&mut board);
            prop_assert_eq!(game.state(), &once);
            prop_assert!(game.scheduler().is_empty());
        }
    }
}
