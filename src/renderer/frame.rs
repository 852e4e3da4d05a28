//! Software pixel compositor
//!
//! Paints the scene at logical resolution (one pixel per level pixel) into an
//! RGBA framebuffer. The presenter scales it up on the GPU; nothing here
//! touches wgpu, so the whole paint order is unit-testable.

use crate::consts::TILE;
use crate::sim::{LevelGrid, SimulationState, TileKind};

/// Straight-alpha RGBA8 color
pub type Rgba = [u8; 4];

const fn hex(rgb: u32) -> Rgba {
    [(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8, 0xff]
}

const fn hexa(rgb: u32, alpha: u8) -> Rgba {
    [(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8, alpha]
}

/// Stage palette
pub mod palette {
    use super::{Rgba, hex, hexa};

    pub const SKY_TOP: Rgba = hex(0x7ec9ff);
    pub const SKY_BOTTOM: Rgba = hex(0x3480de);
    pub const GROUND_A: Rgba = hex(0x8b4b1e);
    pub const GROUND_B: Rgba = hex(0xc56d2d);
    pub const GRASS: Rgba = hex(0x63b52f);
    pub const GRASS_SHINE: Rgba = hexa(0xffffff, 0x33);
    pub const BRICK: Rgba = hex(0xb0502f);
    pub const BRICK_HL: Rgba = hex(0xd97a58);
    pub const QUESTION: Rgba = hex(0xf4a935);
    pub const QUESTION_HL: Rgba = hex(0xffd56c);
    pub const QUESTION_MARK: Rgba = hex(0x6b3b1a);
    pub const SPENT: Rgba = hex(0x9a6b3f);
    pub const SPENT_HL: Rgba = hex(0xb8875a);
    pub const COIN: Rgba = hex(0xffd949);
    pub const COIN_HL: Rgba = hex(0xfff7b1);
    pub const PIPE: Rgba = hex(0x2dbb6a);
    pub const PIPE_HL: Rgba = hex(0x6be39a);
    pub const PLAYER: Rgba = hex(0xff3a4e);
    pub const PLAYER_HL: Rgba = hex(0xffd1d6);
    pub const PLAYER_EYE: Rgba = hex(0x7a2431);
    pub const PLAYER_FEET: Rgba = hex(0x3b1d11);
    pub const ENEMY: Rgba = hex(0x6b3b1a);
    pub const ENEMY_HL: Rgba = hex(0xd7a579);
    pub const ENEMY_FEET: Rgba = hex(0x2b150a);
    pub const FLAG: Rgba = hex(0xffffff);
    pub const FLAG_POLE: Rgba = hex(0xd0f5ff);
    pub const CASTLE: Rgba = hex(0x59341f);
    pub const CASTLE_WINDOW: Rgba = hexa(0x000000, 0x55);
    pub const PAUSE_SHADE: Rgba = hexa(0x000000, 0x4d);
    pub const TEXT: Rgba = hex(0xffffff);
}

use palette::*;

/// Extra columns painted on each side of the view
const OVERSCAN_COLS: i32 = 2;
/// Enemies further than this outside the view are skipped
const CULL_MARGIN: i32 = 20;

/// CPU-side image at logical resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0, 0, 0, 0xff]; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x < self.width && y < self.height {
            Some(self.pixels[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    /// Raw RGBA8 bytes, row-major, for texture upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn clear(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    /// Fill a rectangle, clipped to the buffer and alpha-blended
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgba) {
        if color[3] == 0 || w <= 0 || h <= 0 {
            return;
        }
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(w).min(self.width as i32);
        let y1 = y.saturating_add(h).min(self.height as i32);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        for row in y0..y1 {
            let start = (row as u32 * self.width) as usize;
            let span = &mut self.pixels[start + x0 as usize..start + x1 as usize];
            if color[3] == 0xff {
                span.fill(color);
            } else {
                for px in span {
                    *px = blend(*px, color);
                }
            }
        }
    }
}

/// Source-over blend onto an opaque destination
fn blend(dst: Rgba, src: Rgba) -> Rgba {
    let a = u32::from(src[3]);
    let mix = |d: u8, s: u8| ((u32::from(s) * a + u32::from(d) * (255 - a) + 127) / 255) as u8;
    [mix(dst[0], src[0]), mix(dst[1], src[1]), mix(dst[2], src[2]), 0xff]
}

fn lerp_color(a: Rgba, b: Rgba, t: f32) -> Rgba {
    let mix = |x: u8, y: u8| (f32::from(x) + (f32::from(y) - f32::from(x)) * t).round() as u8;
    [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2]), 0xff]
}

/// Paint one frame. Reads the state, never writes it.
pub fn render(state: &SimulationState, paused: bool, fb: &mut Framebuffer) {
    draw_sky(fb);

    let cam_x = state.world.camera.x;
    let view_w = fb.width() as f32;
    let cam_px = cam_x.floor() as i32;

    // Tiles
    let grid = &state.grid;
    let first = ((cam_x / TILE).floor() as i32 - OVERSCAN_COLS).max(0);
    let last = ((cam_x + view_w) / TILE).ceil() as i32 + OVERSCAN_COLS;
    let last = last.min(grid.width() as i32);
    let tile = TILE as i32;
    for row in 0..grid.height() as i32 {
        for col in first..last {
            let kind = grid.tile_at(col, row);
            if !kind.is_visible() {
                continue;
            }
            let x = col * tile - cam_px;
            let y = row * tile;
            match kind {
                TileKind::Question if state.is_exhausted(col, row) => draw_spent_block(fb, x, y),
                TileKind::Flag => draw_flag(fb, grid, col, row, x, y),
                _ => draw_tile(fb, kind, x, y),
            }
        }
    }

    // Coins
    for coin in state.coins.iter().filter(|c| !c.taken) {
        let x = (coin.pos.x - cam_x).floor() as i32;
        let y = (coin.pos.y + coin.bob_offset()).floor() as i32;
        fb.fill_rect(x, y, 8, 8, COIN);
        fb.fill_rect(x + 2, y + 2, 2, 2, COIN_HL);
    }

    // Player
    let body = &state.player.body;
    let px = (body.pos.x - cam_x).floor() as i32;
    let py = body.pos.y.floor() as i32;
    draw_player(fb, px, py, body.facing);

    // Enemies
    for enemy in state.enemies.iter().filter(|e| e.alive) {
        let ex = (enemy.body.pos.x - cam_x).floor() as i32;
        let ey = enemy.body.pos.y.floor() as i32;
        if ex + (enemy.body.w as i32) < -CULL_MARGIN || ex > fb.width() as i32 + CULL_MARGIN {
            continue;
        }
        draw_enemy(fb, ex, ey);
    }

    if paused {
        draw_pause_overlay(fb);
    }
}

fn draw_sky(fb: &mut Framebuffer) {
    let h = fb.height();
    let span = h.saturating_sub(1).max(1) as f32;
    let w = fb.width() as i32;
    for y in 0..h {
        let color = lerp_color(SKY_TOP, SKY_BOTTOM, y as f32 / span);
        fb.fill_rect(0, y as i32, w, 1, color);
    }
}

fn draw_tile(fb: &mut Framebuffer, kind: TileKind, x: i32, y: i32) {
    match kind {
        TileKind::Ground => {
            fb.fill_rect(x, y, 16, 16, GROUND_B);
            fb.fill_rect(x + 1, y + 5, 14, 10, GROUND_A);
            fb.fill_rect(x, y, 16, 4, GRASS);
            fb.fill_rect(x, y, 16, 1, GRASS_SHINE);
        }
        TileKind::Brick => {
            fb.fill_rect(x, y, 16, 16, BRICK);
            for i in (2..16).step_by(4) {
                fb.fill_rect(x + 2, y + i, 12, 1, BRICK_HL);
            }
            fb.fill_rect(x + 2, y + 8, 12, 1, BRICK_HL);
        }
        TileKind::Question => {
            fb.fill_rect(x, y, 16, 16, QUESTION);
            fb.fill_rect(x + 2, y + 2, 12, 1, QUESTION_HL);
            fb.fill_rect(x + 2, y + 13, 12, 1, QUESTION_HL);
            fb.fill_rect(x + 1, y + 1, 1, 14, QUESTION_HL);
            fb.fill_rect(x + 14, y + 1, 1, 14, QUESTION_HL);
            fb.fill_rect(x + 7, y + 6, 2, 2, QUESTION_MARK);
        }
        TileKind::Pipe => {
            fb.fill_rect(x + 2, y, 12, 16, PIPE);
            fb.fill_rect(x + 2, y, 12, 3, PIPE_HL);
            fb.fill_rect(x + 2, y + 12, 12, 2, PIPE_HL);
            fb.fill_rect(x + 1, y + 2, 2, 12, PIPE_HL);
        }
        TileKind::Castle => {
            fb.fill_rect(x, y - 8, 16, 24, CASTLE);
            fb.fill_rect(x + 5, y + 4, 6, 6, CASTLE_WINDOW);
        }
        _ => {}
    }
}

/// A question block that already paid out: same frame, no mark
fn draw_spent_block(fb: &mut Framebuffer, x: i32, y: i32) {
    fb.fill_rect(x, y, 16, 16, SPENT);
    fb.fill_rect(x + 2, y + 2, 12, 1, SPENT_HL);
    fb.fill_rect(x + 2, y + 13, 12, 1, SPENT_HL);
    fb.fill_rect(x + 1, y + 1, 1, 14, SPENT_HL);
    fb.fill_rect(x + 14, y + 1, 1, 14, SPENT_HL);
}

/// Pole segment per cell; the topmost cell also carries the cloth
fn draw_flag(fb: &mut Framebuffer, grid: &LevelGrid, col: i32, row: i32, x: i32, y: i32) {
    if grid.tile_at(col, row - 1) == TileKind::Flag {
        fb.fill_rect(x + 7, y, 2, 16, FLAG_POLE);
    } else {
        fb.fill_rect(x + 7, y - 32, 2, 48, FLAG_POLE);
        fb.fill_rect(x + 9, y - 10, 10, 6, FLAG);
    }
}

fn draw_player(fb: &mut Framebuffer, x: i32, y: i32, facing: i8) {
    fb.fill_rect(x, y + 4, 12, 10, PLAYER);
    fb.fill_rect(x + 2, y, 8, 6, PLAYER_HL);
    let eye_x = if facing > 0 { x + 8 } else { x + 2 };
    fb.fill_rect(eye_x, y + 2, 2, 2, PLAYER_EYE);
    fb.fill_rect(x + 1, y + 14, 4, 2, PLAYER_FEET);
    fb.fill_rect(x + 7, y + 14, 4, 2, PLAYER_FEET);
}

fn draw_enemy(fb: &mut Framebuffer, x: i32, y: i32) {
    fb.fill_rect(x, y + 4, 12, 8, ENEMY);
    fb.fill_rect(x + 2, y, 8, 6, ENEMY_HL);
    fb.fill_rect(x + 2, y + 12, 3, 2, ENEMY_FEET);
    fb.fill_rect(x + 7, y + 12, 3, 2, ENEMY_FEET);
}

// ============================================================================
// PAUSE OVERLAY
// ============================================================================

const PAUSE_TEXT: &str = "PAUSED";
const GLYPH_W: i32 = 5;
const GLYPH_H: i32 = 7;

/// 5x7 bitmaps, bit 4 is the leftmost column
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        _ => return None,
    };
    Some(rows)
}

fn draw_pause_overlay(fb: &mut Framebuffer) {
    let (w, h) = (fb.width() as i32, fb.height() as i32);
    fb.fill_rect(0, 0, w, h, PAUSE_SHADE);

    let len = PAUSE_TEXT.chars().count() as i32;
    let natural_w = len * (GLYPH_W + 1) - 1;
    let scale = if natural_w * 2 <= w { 2 } else { 1 };
    let text_w = natural_w * scale;
    let mut pen_x = (w - text_w) / 2;
    let pen_y = (h - GLYPH_H * scale) / 2;

    for ch in PAUSE_TEXT.chars() {
        if let Some(rows) = glyph(ch) {
            for (r, bits) in rows.iter().enumerate() {
                for c in 0..GLYPH_W {
                    if bits & (1 << (GLYPH_W - 1 - c)) != 0 {
                        fb.fill_rect(
                            pen_x + c * scale,
                            pen_y + r as i32 * scale,
                            scale,
                            scale,
                            TEXT,
                        );
                    }
                }
            }
        }
        pen_x += (GLYPH_W + 1) * scale;
    }
}
