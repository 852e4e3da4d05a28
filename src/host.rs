//! Host bridge interface
//!
//! The simulation reports score, coins, lives, world and time through
//! `HostSink` and never looks at what the host does with them.

use serde::{Deserialize, Serialize};

use crate::consts::{SCORE_PER_COIN, START_LIVES, START_TIME};
use crate::sim::WorldId;

/// Fire-and-forget callbacks toward the surrounding UI
pub trait HostSink {
    fn add_score(&mut self, points: u32);
    fn add_coin(&mut self);
    fn set_time(&mut self, seconds: u32);
    fn lose_life(&mut self);
    fn gain_life(&mut self);
    fn set_world(&mut self, world: &str);
    fn pause_toggle(&mut self);
}

/// HUD values mirrored out of the simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub score: u64,
    /// Wraps at 100
    pub coins: u32,
    pub lives: u32,
    pub world: String,
    pub time: u32,
    pub paused: bool,
}

impl Default for Scoreboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Scoreboard {
    pub fn new() -> Self {
        Self {
            score: 0,
            coins: 0,
            lives: START_LIVES,
            world: WorldId::default().to_string(),
            time: START_TIME,
            paused: false,
        }
    }

    /// Start a fresh run
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl HostSink for Scoreboard {
    fn add_score(&mut self, points: u32) {
        self.score += u64::from(points);
    }

    /// Count a coin; the counter rolls over at 100 and every coin scores
    fn add_coin(&mut self) {
        self.coins = (self.coins + 1) % 100;
        self.add_score(SCORE_PER_COIN);
        if self.coins == 0 {
            log::info!("100 coins collected");
        }
    }

    fn set_time(&mut self, seconds: u32) {
        self.time = seconds;
    }

    fn lose_life(&mut self) {
        self.lives = self.lives.saturating_sub(1);
    }

    fn gain_life(&mut self) {
        self.lives += 1;
    }

    fn set_world(&mut self, world: &str) {
        self.world = world.to_string();
    }

    fn pause_toggle(&mut self) {
        self.paused = !self.paused;
    }
}
