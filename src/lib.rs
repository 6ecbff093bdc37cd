//! # Undercroft
//!
//! A cell-graph dungeon generator for tile-based games.
//!
//! ## Architecture Overview
//!
//! Generation runs as a fixed sequence of stages over one shared
//! [`GenerationContext`]:
//!
//! - **Cell Graph**: the tile grid is partitioned into fixed-size cells and a
//!   randomized depth-first spanning tree of corridors is carved between them
//! - **Rooms**: each free cell may receive a rectangular or special-shaped room
//! - **Special Rooms**: a locked boss arena at the grid center and a puzzle room
//!   full of holes, with a safe platform and floor islands
//! - **Walls**: a post-pass that closes every floor tile off from the void
//! - **Reinforcement**: extra corridors so that rooms have more than one way in
//! - **Features**: cracked walls, hints and a carryable object for the puzzle
//!
//! The result is a [`Dungeon`]: a tile grid plus room metadata and the two
//! transitions collaborators may trigger after generation (filling holes and
//! unlocking the boss room).
//!
//! ```
//! use undercroft::{generate_dungeon, GenerationConfig, TileKind};
//!
//! let dungeon = generate_dungeon(&GenerationConfig::for_testing(7)).unwrap();
//! assert!(dungeon.grid().count(TileKind::Floor) > 0);
//! ```

pub mod generation;
pub mod grid;

pub use generation::*;
pub use grid::*;

/// Core error type for the Undercroft generator.
#[derive(thiserror::Error, Debug)]
pub enum UndercroftError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Generation parameters are unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A tile write fell outside the grid
    #[error("Position ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },

    /// Generation failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Dungeon state does not allow the requested transition
    #[error("Invalid dungeon state: {0}")]
    InvalidState(String),
}

/// Result type used throughout the Undercroft codebase.
pub type UndercroftResult<T> = Result<T, UndercroftError>;

/// Version information for the generator.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Generation defaults and retry bounds.
pub mod config {
    /// Default cell width and height in tiles
    pub const DEFAULT_CELL_SIZE: i32 = 13;

    /// Default margin between the grid edge and the first cell
    pub const DEFAULT_BUFFER: i32 = 2;

    /// Default number of cells per axis
    pub const DEFAULT_CELLS: i32 = 8;

    /// Percentage of free cells that receive a room
    pub const DEFAULT_ROOM_CHANCE_PERCENT: u32 = 75;

    /// Percentage of rooms that get a non-rectangular shape
    pub const DEFAULT_SPECIAL_SHAPED_ROOM_CHANCE: u32 = 35;

    /// Tiles kept clear around a locked boss room
    pub const BOSS_BUFFER_RING: i32 = 2;

    /// Attempts to pull a winding waypoint out of the boss zone
    pub const WAYPOINT_RETRY_LIMIT: u32 = 10;

    /// Random attempts per puzzle feature before the fallback scan
    pub const FEATURE_PLACEMENT_ATTEMPTS: u32 = 100;

    /// Dungeons with at most this many cells count as small
    pub const SMALL_DUNGEON_CELL_LIMIT: i32 = 24;

    /// Special-room connections made in a small dungeon
    pub const SMALL_DUNGEON_CONNECTIONS: usize = 3;

    /// Chance of hazards in a decorated room
    pub const HAZARD_CHANCE_PERCENT: u32 = 30;

    /// Smallest room footprint a room placer may roll
    pub const MIN_ROOM_WIDTH: i32 = 5;
    pub const MIN_ROOM_HEIGHT: i32 = 4;

    /// Side length of the special room's safe platform
    pub const PLATFORM_SIZE: i32 = 3;

    /// Largest grid, in tiles, a configuration may request
    pub const MAX_GRID_TILES: i64 = 4_000_000;

    /// Island side lengths and how many of each the special room receives
    pub const ISLAND_LAYOUT: [(i32, usize); 3] = [(3, 4), (4, 3), (5, 2)];
}
