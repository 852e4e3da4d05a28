//! Axis-separated tile physics
//!
//! Bodies move one axis at a time: X first, then Y. Each axis is resolved
//! against every grid cell the box overlaps after the move. There is no
//! swept test, so a body faster than one tile per tick can tunnel through a
//! single-tile wall; the controller bounds `dt` to keep steps small.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::level::{LevelGrid, TileKind};
use crate::consts::{BUMP_REBOUND, EPSILON, TILE};

/// Axis-aligned rectangle in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }
}

/// A cell hit from below while moving upward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bump {
    pub col: i32,
    pub row: i32,
    pub kind: TileKind,
}

/// A moving axis-aligned box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Top-left corner in pixels
    pub pos: Vec2,
    /// `x` in tiles per frame unit, `y` in pixels per frame unit
    pub vel: Vec2,
    pub w: f32,
    pub h: f32,
    pub on_ground: bool,
    /// -1 = left, 1 = right
    pub facing: i8,
}

impl Body {
    pub fn new(pos: Vec2, w: f32, h: f32) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            w,
            h,
            on_ground: false,
            facing: 1,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, self.w, self.h)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.pos.x + self.w / 2.0, self.pos.y + self.h / 2.0)
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.pos.y + self.h
    }

    pub fn apply_gravity(&mut self, gravity: f32, dt: f32) {
        self.vel.y += gravity * dt;
    }

    /// Integrate X and push the box out of any wall it entered.
    ///
    /// Returns true if the body was stopped; `vel.x` is zeroed in that case.
    pub fn move_x(&mut self, grid: &LevelGrid, dt: f32) -> bool {
        self.pos.x += self.vel.x * TILE * dt;

        let mut blocked = false;
        for (col, row) in LevelGrid::overlapping_cells(self.pos.x, self.pos.y, self.w, self.h) {
            if !grid.collides(col, row) {
                continue;
            }
            let cell_left = col as f32 * TILE;
            let cell_right = cell_left + TILE;
            if self.vel.x > 0.0 && self.pos.x + self.w > cell_left && self.pos.x < cell_left {
                self.pos.x = cell_left - self.w - EPSILON;
                self.vel.x = 0.0;
                blocked = true;
            } else if self.vel.x < 0.0
                && self.pos.x < cell_right
                && self.pos.x + self.w > cell_right
            {
                self.pos.x = cell_right + EPSILON;
                self.vel.x = 0.0;
                blocked = true;
            }
        }
        blocked
    }

    /// Integrate Y, land on floors and bounce off ceilings.
    ///
    /// Returns the first cell bumped from below, if any.
    pub fn move_y(&mut self, grid: &LevelGrid, dt: f32) -> Option<Bump> {
        self.pos.y += self.vel.y * dt;
        self.on_ground = false;

        let mut bump = None;
        for (col, row) in LevelGrid::overlapping_cells(self.pos.x, self.pos.y, self.w, self.h) {
            if !grid.collides(col, row) {
                continue;
            }
            let cell_top = row as f32 * TILE;
            let cell_bottom = cell_top + TILE;
            if self.vel.y > 0.0 && self.bottom() > cell_top && self.pos.y < cell_top {
                self.pos.y = cell_top - self.h - EPSILON;
                self.vel.y = 0.0;
                self.on_ground = true;
            } else if self.vel.y < 0.0
                && self.pos.y < cell_bottom
                && self.bottom() > cell_bottom
            {
                self.pos.y = cell_bottom + EPSILON;
                self.vel.y = BUMP_REBOUND;
                bump.get_or_insert(Bump {
                    col,
                    row,
                    kind: grid.tile_at(col, row),
                });
            }
        }
        bump
    }
}
