//! # Generation Context
//!
//! The single mutable state every generation stage works on.

use super::{BossLock, BossRoomState, CellGrid, Decoration, GenerationConfig, PlacedFeature};
use super::{Room, RoomId, RoomRole, SpecialRoomState};
use crate::grid::{Rect, TileGrid};
use rand::rngs::StdRng;

/// Grid, cells, rooms and random source for one generation pass.
///
/// Stages receive `&mut GenerationContext` and leave it in a consistent,
/// inspectable state when they return.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub config: GenerationConfig,
    pub grid: TileGrid,
    pub cells: CellGrid,
    /// Rooms in creation order; a room's id is its index
    pub rooms: Vec<Room>,
    /// Deferred decorations from every room
    pub decorations: Vec<Decoration>,
    pub boss: Option<BossRoomState>,
    pub special: Option<SpecialRoomState>,
    pub features: Vec<PlacedFeature>,
    /// Cell pairs joined by backbone corridors
    pub spanning_tree: Vec<((i32, i32), (i32, i32))>,
    pub rng: StdRng,
}

impl GenerationContext {
    /// Creates an empty context: a void grid and unvisited cells.
    pub fn new(config: GenerationConfig, rng: StdRng) -> Self {
        let grid = TileGrid::new(config.dungeon_width, config.dungeon_height);
        let cells = CellGrid::new(&config);
        Self {
            config,
            grid,
            cells,
            rooms: Vec::new(),
            decorations: Vec::new(),
            boss: None,
            special: None,
            features: Vec::new(),
            spanning_tree: Vec::new(),
            rng,
        }
    }

    /// Appends a room, assigning it the next id.
    pub fn push_room(&mut self, mut room: Room) -> RoomId {
        let id = RoomId(self.rooms.len());
        room.id = id;
        self.rooms.push(room);
        id
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id.0)
    }

    pub fn boss_room(&self) -> Option<&Room> {
        self.boss.as_ref().and_then(|boss| self.room(boss.room))
    }

    pub fn special_room(&self) -> Option<&Room> {
        self.special.as_ref().and_then(|special| self.room(special.room))
    }

    /// Ordinary rooms only.
    pub fn normal_rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms
            .iter()
            .filter(|room| room.role == RoomRole::Normal)
    }

    pub fn is_boss_locked(&self) -> bool {
        self.boss
            .as_ref()
            .is_some_and(|boss| boss.lock == BossLock::Locked)
    }

    /// Boss room plus its buffer ring, whatever the lock state.
    pub fn boss_zone(&self) -> Option<Rect> {
        self.boss_room()
            .map(|room| room.bounds.expanded(self.config.boss_buffer_ring))
    }

    /// Area no corridor may touch while the boss room is locked.
    pub fn locked_boss_zone(&self) -> Option<Rect> {
        if self.is_boss_locked() {
            self.boss_zone()
        } else {
            None
        }
    }

    /// Tiles corridors may be carved in: the grid minus its outer border.
    pub fn carving_bounds(&self) -> Rect {
        self.grid.interior()
    }
}
