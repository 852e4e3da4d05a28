//! Tile grid for the stage
//!
//! Levels are authored as fixed-width strings, one character per tile.
//! The grid is immutable after parsing; anything outside of it reads as
//! solid ground so bodies can never leave the world sideways or downward
//! through the edge columns.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::TILE;

/// Kind of a single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TileKind {
    #[default]
    Empty,
    Ground,
    Brick,
    Question,
    Pipe,
    EnemySpawn,
    CoinSpawn,
    Flag,
    Castle,
}

impl TileKind {
    /// Parse a legend character
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '_' | '^' => Some(TileKind::Empty),
            '#' => Some(TileKind::Ground),
            'B' => Some(TileKind::Brick),
            '?' => Some(TileKind::Question),
            'P' => Some(TileKind::Pipe),
            'E' => Some(TileKind::EnemySpawn),
            'C' => Some(TileKind::CoinSpawn),
            'F' => Some(TileKind::Flag),
            'K' => Some(TileKind::Castle),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            TileKind::Empty => '_',
            TileKind::Ground => '#',
            TileKind::Brick => 'B',
            TileKind::Question => '?',
            TileKind::Pipe => 'P',
            TileKind::EnemySpawn => 'E',
            TileKind::CoinSpawn => 'C',
            TileKind::Flag => 'F',
            TileKind::Castle => 'K',
        }
    }

    /// Blocks movement from every side
    pub fn is_solid(&self) -> bool {
        matches!(
            self,
            TileKind::Ground | TileKind::Brick | TileKind::Pipe | TileKind::Castle
        )
    }

    /// Stops moving bodies (solids plus bumpable question blocks)
    pub fn collides(&self) -> bool {
        self.is_solid() || *self == TileKind::Question
    }

    /// Spawn markers and empty cells draw nothing
    pub fn is_visible(&self) -> bool {
        !matches!(
            self,
            TileKind::Empty | TileKind::EnemySpawn | TileKind::CoinSpawn
        )
    }
}

/// Malformed level data, fatal at load time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelError {
    /// No rows, or rows with no columns
    Empty,
    /// A row whose width differs from the first row
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// A character outside the legend
    UnknownSymbol { row: usize, col: usize, symbol: char },
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Empty => write!(f, "level has no tiles"),
            LevelError::RaggedRow {
                row,
                expected,
                found,
            } => write!(
                f,
                "row {} is {} tiles wide, expected {}",
                row, found, expected
            ),
            LevelError::UnknownSymbol { row, col, symbol } => {
                write!(f, "unknown tile symbol {:?} at row {}, column {}", symbol, row, col)
            }
        }
    }
}

impl std::error::Error for LevelError {}

/// Dense, row-major tile map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelGrid {
    width: usize,
    height: usize,
    tiles: Vec<TileKind>,
}

impl LevelGrid {
    /// Build a grid from fixed-width rows (top row first)
    pub fn parse<S: AsRef<str>>(rows: &[S]) -> Result<Self, LevelError> {
        let width = rows.first().map(|r| r.as_ref().chars().count()).unwrap_or(0);
        if width == 0 {
            return Err(LevelError::Empty);
        }

        let mut tiles = Vec::with_capacity(width * rows.len());
        for (row, line) in rows.iter().enumerate() {
            let line = line.as_ref();
            let found = line.chars().count();
            if found != width {
                return Err(LevelError::RaggedRow {
                    row,
                    expected: width,
                    found,
                });
            }
            for (col, symbol) in line.chars().enumerate() {
                let kind = TileKind::from_symbol(symbol)
                    .ok_or(LevelError::UnknownSymbol { row, col, symbol })?;
                tiles.push(kind);
            }
        }

        Ok(Self {
            width,
            height: rows.len(),
            tiles,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Level width in pixels
    pub fn pixel_width(&self) -> f32 {
        self.width as f32 * TILE
    }

    /// Level height in pixels
    pub fn pixel_height(&self) -> f32 {
        self.height as f32 * TILE
    }

    /// Tile at grid coordinates, `Ground` outside the grid
    pub fn tile_at(&self, col: i32, row: i32) -> TileKind {
        if col < 0 || row < 0 || col >= self.width as i32 || row >= self.height as i32 {
            return TileKind::Ground;
        }
        self.tiles[row as usize * self.width + col as usize]
    }

    pub fn is_solid(&self, col: i32, row: i32) -> bool {
        self.tile_at(col, row).is_solid()
    }

    pub fn collides(&self, col: i32, row: i32) -> bool {
        self.tile_at(col, row).collides()
    }

    /// Grid cell containing a pixel coordinate
    #[inline]
    pub fn cell_of(x: f32, y: f32) -> (i32, i32) {
        ((x / TILE).floor() as i32, (y / TILE).floor() as i32)
    }

    /// All cells covered by a pixel-space box, row-major
    ///
    /// A box whose far edge sits any distance past a cell boundary covers the
    /// next cell; an edge exactly on the boundary does not.
    pub fn overlapping_cells(x: f32, y: f32, w: f32, h: f32) -> impl Iterator<Item = (i32, i32)> {
        let (left, top) = Self::cell_of(x, y);
        let right = (((x + w) / TILE).ceil() as i32 - 1).max(left);
        let bottom = (((y + h) / TILE).ceil() as i32 - 1).max(top);
        (top..=bottom).flat_map(move |row| (left..=right).map(move |col| (col, row)))
    }

    /// Coordinates of every cell of the given kind, row-major
    pub fn cells_of(&self, kind: TileKind) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .filter(move |(_, t)| **t == kind)
            .map(move |(i, _)| ((i % self.width) as i32, (i / self.width) as i32))
    }
}

/// World 1-1
pub const LEVEL_1_1: [&str; 18] = [
    "__________________________________________________________________________________________________________",
    "__________________________________________________________________________________________________________",
    "__________________________________________________________________________________________________________",
    "__________________________________________________________________________________________________________",
    "_____________________________C______________________________B__?_______C__________________________________",
    "___________________________BBB___________________________B_____B____BBBBB_________________________________",
    "_____________________________B___________________________B_____B__________________________________________",
    "_____________________________B_______E___________________B_____B______________E___________________________",
    "_____________________________B___________________________BBBBBBB__________________________________________",
    "_____________________________B______________________________P_____________________________________________",
    "_____________________________B______________________________P_____________________________________________",
    "_____________________________B______________________________P_____________________________________________",
    "_____________________________B_____________BBB_____________PP_____________________________________________",
    "_____________________________B_____________________________PP_____________________________F_______________",
    "_____________________________B_______C_____________________PP_____________________________F_______________",
    "_____________________________BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB_____________________________F____________KKK",
    "##########################################################################################################",
    "##########################################################################################################",
];
