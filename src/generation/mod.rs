//! # Generation Module
//!
//! Procedural dungeon generation over a coarse cell graph.
//!
//! This module holds the shared vocabulary of the generator (configuration,
//! rooms, decorations and the [`Generator`] trait) and one submodule per
//! generation stage. Every stage receives the same [`GenerationContext`] and
//! mutates it in place; [`DungeonGenerator`] runs the stages in order.

pub mod boss;
pub mod cells;
pub mod connectivity;
pub mod context;
pub mod corridors;
pub mod dungeon;
pub mod features;
pub mod rooms;
pub mod special;
pub mod walls;

pub use boss::{BossLock, BossRoomState, BossTransition};
pub use cells::{Cell, CellGrid};
pub use connectivity::{CorridorRequest, RoomFootprints};
pub use context::GenerationContext;
pub use corridors::CorridorStyle;
pub use dungeon::*;
pub use features::{FeatureKind, PlacedFeature};
pub use special::SpecialRoomState;

use crate::config;
use crate::grid::{Position, Rect, TileKind};
use crate::{UndercroftError, UndercroftResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for dungeon generation.
///
/// Every field has a default, so partial JSON documents deserialize into a
/// complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Random seed for reproducible generation
    pub seed: u64,
    /// Grid width in tiles
    pub dungeon_width: i32,
    /// Grid height in tiles
    pub dungeon_height: i32,
    /// Cell width in tiles
    pub cell_width: i32,
    /// Cell height in tiles
    pub cell_height: i32,
    /// Horizontal margin before the first cell
    pub buffer_x: i32,
    /// Vertical margin before the first cell
    pub buffer_y: i32,
    /// Chance (0-100) that a free cell receives a room
    pub room_chance_percent: u32,
    /// Enables width-varied and winding corridors
    pub enhanced_corridors: bool,
    /// Narrowest enhanced corridor
    pub corridor_min_width: i32,
    /// Widest enhanced corridor
    pub corridor_max_width: i32,
    /// Probability (0.0 to 1.0) that an enhanced corridor winds
    pub corridor_winding_factor: f64,
    /// Base jitter, in tiles, applied to winding waypoints
    pub winding_jitter: i32,
    /// Enables non-rectangular rooms
    pub enable_room_variety: bool,
    /// Chance (0-100) that a room gets a special shape
    pub special_shaped_room_chance: u32,
    pub enable_boss_room: bool,
    pub enable_special_room: bool,
    /// Keeps the boss room locked until the puzzles are solved
    pub enable_puzzle_boss_room_lock: bool,
    /// Tiles kept clear around a locked boss room
    pub boss_buffer_ring: i32,
    /// Attempts to move a waypoint out of the boss zone before accepting it
    pub waypoint_retry_limit: u32,
    /// Random attempts per puzzle feature before the fallback scan
    pub feature_placement_attempts: u32,
    /// Minimum room width for the primary feature search
    pub feature_min_room_width: i32,
    /// Minimum room height for the primary feature search
    pub feature_min_room_height: i32,
    /// Dungeons with at most this many cells count as small
    pub small_dungeon_cell_limit: i32,
    /// Special-room connections in a small dungeon
    pub small_dungeon_connections: usize,
    /// Chance (0-100) that a decorated room also receives hazards
    pub hazard_chance_percent: u32,
    /// Prefab names for decorations
    pub decoration_prefabs: Vec<String>,
    /// Prefab names for hazards
    pub hazard_prefabs: Vec<String>,
}

impl GenerationConfig {
    /// Creates the standard 8×8-cell configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use undercroft::GenerationConfig;
    ///
    /// let config = GenerationConfig::default();
    /// assert_eq!(config.cells_x(), 8);
    /// assert_eq!(config.cells_y(), 8);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            dungeon_width: 0,
            dungeon_height: 0,
            cell_width: config::DEFAULT_CELL_SIZE,
            cell_height: config::DEFAULT_CELL_SIZE,
            buffer_x: config::DEFAULT_BUFFER,
            buffer_y: config::DEFAULT_BUFFER,
            room_chance_percent: config::DEFAULT_ROOM_CHANCE_PERCENT,
            enhanced_corridors: true,
            corridor_min_width: 1,
            corridor_max_width: 3,
            corridor_winding_factor: 0.3,
            winding_jitter: 3,
            enable_room_variety: true,
            special_shaped_room_chance: config::DEFAULT_SPECIAL_SHAPED_ROOM_CHANCE,
            enable_boss_room: true,
            enable_special_room: true,
            enable_puzzle_boss_room_lock: true,
            boss_buffer_ring: config::BOSS_BUFFER_RING,
            waypoint_retry_limit: config::WAYPOINT_RETRY_LIMIT,
            feature_placement_attempts: config::FEATURE_PLACEMENT_ATTEMPTS,
            feature_min_room_width: 6,
            feature_min_room_height: 5,
            small_dungeon_cell_limit: config::SMALL_DUNGEON_CELL_LIMIT,
            small_dungeon_connections: config::SMALL_DUNGEON_CONNECTIONS,
            hazard_chance_percent: config::HAZARD_CHANCE_PERCENT,
            decoration_prefabs: vec![
                "pillar".to_string(),
                "statue".to_string(),
                "brazier".to_string(),
                "rubble".to_string(),
            ],
            hazard_prefabs: vec!["spike_trap".to_string(), "fire_vent".to_string()],
        }
        .with_cell_grid(config::DEFAULT_CELLS, config::DEFAULT_CELLS)
    }

    /// Creates a configuration for testing with a small 4×4-cell grid.
    pub fn for_testing(seed: u64) -> Self {
        Self::new(seed).with_cell_grid(4, 4)
    }

    /// Creates a configuration for large 12×12-cell dungeons.
    pub fn for_detailed_generation(seed: u64) -> Self {
        Self {
            dungeon_width: 172,
            dungeon_height: 172,
            corridor_winding_factor: 0.4,
            special_shaped_room_chance: 45,
            ..Self::new(seed)
        }
    }

    /// Resizes the grid to hold exactly `cells_x × cells_y` cells.
    pub fn with_cell_grid(mut self, cells_x: i32, cells_y: i32) -> Self {
        self.dungeon_width = cells_x * self.cell_width + self.buffer_x * 2;
        self.dungeon_height = cells_y * self.cell_height + self.buffer_y * 2;
        self
    }

    /// Number of cell columns.
    pub fn cells_x(&self) -> i32 {
        if self.cell_width <= 0 {
            return 0;
        }
        ((self.dungeon_width - self.buffer_x * 2) / self.cell_width).max(0)
    }

    /// Number of cell rows.
    pub fn cells_y(&self) -> i32 {
        if self.cell_height <= 0 {
            return 0;
        }
        ((self.dungeon_height - self.buffer_y * 2) / self.cell_height).max(0)
    }

    pub fn total_cells(&self) -> i32 {
        self.cells_x() * self.cells_y()
    }

    /// Small dungeons link the special room to several rooms.
    pub fn is_small_dungeon(&self) -> bool {
        self.total_cells() <= self.small_dungeon_cell_limit
    }

    /// Checks that the configuration can produce a dungeon.
    pub fn validate(&self) -> UndercroftResult<()> {
        let invalid = |message: String| Err(UndercroftError::InvalidConfig(message));

        if self.cell_width < config::MIN_ROOM_WIDTH + 1 {
            return invalid(format!(
                "cell_width must be at least {}, got {}",
                config::MIN_ROOM_WIDTH + 1,
                self.cell_width
            ));
        }
        if self.cell_height < config::MIN_ROOM_HEIGHT + 1 {
            return invalid(format!(
                "cell_height must be at least {}, got {}",
                config::MIN_ROOM_HEIGHT + 1,
                self.cell_height
            ));
        }
        let tiles = i64::from(self.dungeon_width) * i64::from(self.dungeon_height);
        if tiles > config::MAX_GRID_TILES {
            return invalid(format!(
                "a {}x{} grid exceeds the {} tile limit",
                self.dungeon_width,
                self.dungeon_height,
                config::MAX_GRID_TILES
            ));
        }
        if self.buffer_x < 1 || self.buffer_y < 1 {
            return invalid("buffers must be at least one tile".to_string());
        }
        if self.buffer_x > self.dungeon_width / 2 || self.buffer_y > self.dungeon_height / 2 {
            return invalid(format!(
                "buffers {}x{} leave no room inside a {}x{} grid",
                self.buffer_x, self.buffer_y, self.dungeon_width, self.dungeon_height
            ));
        }
        if self.cells_x() < 1 || self.cells_y() < 1 {
            return invalid(format!(
                "a {}x{} grid holds no {}x{} cells",
                self.dungeon_width, self.dungeon_height, self.cell_width, self.cell_height
            ));
        }
        if self.corridor_min_width < 1 || self.corridor_min_width > self.corridor_max_width {
            return invalid(format!(
                "corridor widths must satisfy 1 <= min <= max, got {}..={}",
                self.corridor_min_width, self.corridor_max_width
            ));
        }
        let widest = (self.cell_width.min(self.cell_height) - 3) / 2;
        if self.corridor_max_width > widest {
            return invalid(format!(
                "corridor_max_width {} does not fit inside a cell (at most {})",
                self.corridor_max_width, widest
            ));
        }
        for (name, percent) in [
            ("room_chance_percent", self.room_chance_percent),
            ("special_shaped_room_chance", self.special_shaped_room_chance),
            ("hazard_chance_percent", self.hazard_chance_percent),
        ] {
            if percent > 100 {
                return invalid(format!("{name} must be at most 100, got {percent}"));
            }
        }
        if !(0.0..=1.0).contains(&self.corridor_winding_factor) {
            return invalid(format!(
                "corridor_winding_factor must be within 0.0..=1.0, got {}",
                self.corridor_winding_factor
            ));
        }
        if self.winding_jitter < 0 || self.boss_buffer_ring < 0 {
            return invalid("winding_jitter and boss_buffer_ring must not be negative".to_string());
        }
        if self.feature_min_room_width < 1 || self.feature_min_room_height < 1 {
            return invalid("feature room minimums must be positive".to_string());
        }

        Ok(())
    }

    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> UndercroftResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> UndercroftResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json_string(&self) -> UndercroftResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Index of a room in the context's room list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub usize);

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "room #{}", self.0)
    }
}

/// What part a room plays in the dungeon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomRole {
    /// Ordinary room placed in a free cell
    Normal,
    /// The central boss arena
    Boss,
    /// The puzzle room
    Special,
}

/// Corner of a rectangle, used to choose the L-shape cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Floor plan of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomShape {
    Rectangle,
    /// Rectangle with one quadrant removed
    LShape { cut: RoomCorner },
    /// Near-square with all four corners cut
    PseudoCircular,
    /// Plus shape
    Cross,
    /// Rectangle carrying decorations and possibly hazards
    Decorated,
}

/// Deferred prefab placement, instantiated by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoration {
    /// Prefab reference, opaque to the generator
    pub prefab: String,
    pub position: Position,
    /// Hazards hurt; plain decorations only block
    pub hazard: bool,
}

/// A room: bounding rectangle minus its excluded areas.
///
/// # Examples
///
/// ```
/// use undercroft::{Position, Rect, Room, RoomId, RoomRole};
///
/// let mut room = Room::new(RoomId(0), RoomRole::Normal, Rect::new(5, 5, 10, 8));
/// room.excluded_areas.push(Rect::new(5, 5, 3, 3));
/// assert!(room.contains_position(Position::new(10, 10)));
/// assert!(!room.contains_position(Position::new(6, 6)));
/// assert!(!room.contains_position(Position::new(20, 20)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub role: RoomRole,
    pub shape: RoomShape,
    /// Bounding rectangle
    pub bounds: Rect,
    /// Cut-outs inside the bounds that are not part of the room
    pub excluded_areas: Vec<Rect>,
    pub decorations: Vec<Decoration>,
    /// Cell that hosts the room; `None` for multi-cell rooms
    pub cell: Option<(i32, i32)>,
}

impl Room {
    /// Creates a rectangular room.
    pub fn new(id: RoomId, role: RoomRole, bounds: Rect) -> Self {
        Self {
            id,
            role,
            shape: RoomShape::Rectangle,
            bounds,
            excluded_areas: Vec::new(),
            decorations: Vec::new(),
            cell: None,
        }
    }

    /// Inside the bounds and outside every excluded area.
    pub fn contains_position(&self, pos: Position) -> bool {
        self.bounds.contains(pos) && !self.excluded_areas.iter().any(|area| area.contains(pos))
    }

    /// Gets all floor positions within this room, row by row.
    pub fn floor_positions(&self) -> Vec<Position> {
        self.bounds
            .positions()
            .filter(|&pos| self.contains_position(pos))
            .collect()
    }

    /// Gets the center of the bounding rectangle.
    pub fn center(&self) -> Position {
        self.bounds.center()
    }

    /// Connection point: the center if it is part of the room, else the
    /// nearest contained tile.
    pub fn anchor(&self) -> Position {
        let center = self.center();
        if self.contains_position(center) {
            return center;
        }
        self.floor_positions()
            .into_iter()
            .min_by_key(|pos| pos.distance_squared(center))
            .unwrap_or(center)
    }

    /// Anything but a plain rectangle.
    pub fn is_special_shape(&self) -> bool {
        self.shape != RoomShape::Rectangle
    }

    /// Tile kind written when the room is carved.
    pub fn floor_kind(&self) -> TileKind {
        match self.role {
            RoomRole::Normal => TileKind::Floor,
            RoomRole::Boss => TileKind::BossFloor,
            RoomRole::Special => TileKind::SpecialFloor,
        }
    }
}

/// Trait for procedural generators.
pub trait Generator<T> {
    /// Generates content using the provided configuration and random number generator.
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> UndercroftResult<T>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T, config: &GenerationConfig) -> UndercroftResult<()>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}

/// Utility functions for generation algorithms.
pub mod utils {
    use super::*;

    /// Creates a seeded random number generator from the config.
    pub fn create_rng(config: &GenerationConfig) -> StdRng {
        StdRng::seed_from_u64(config.seed)
    }

    /// Rolls a 0-100 percentage.
    pub fn roll_percent(rng: &mut StdRng, percent: u32) -> bool {
        rng.gen_range(0..100) < percent
    }

    /// Rooms accepted by `filter`, nearest first by center distance.
    ///
    /// Ties are broken by room id so the order is stable.
    pub fn rooms_by_distance<'a>(
        rooms: &'a [Room],
        from: Position,
        filter: impl Fn(&Room) -> bool,
    ) -> Vec<&'a Room> {
        let mut candidates: Vec<&Room> = rooms.iter().filter(|room| filter(room)).collect();
        candidates.sort_by_key(|room| (room.center().distance_squared(from), room.id));
        candidates
    }
}
