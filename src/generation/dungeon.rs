//! # Dungeon Generation
//!
//! Runs the generation stages in order and wraps the result.
//!
//! [`DungeonGenerator`] owns the stage sequence. The finished [`Dungeon`] is
//! what collaborators consume: tile lookups, room accessors, the hole
//! conversion and the boss lock transitions driven by a [`PuzzleStatus`].

use super::boss::{self, BossLock, BossTransition};
use super::features::{self, PlacedFeature};
use super::{cells, connectivity, rooms, special, walls};
use super::{utils, CellGrid, Decoration, GenerationConfig, GenerationContext, Generator, Room, RoomId};
use crate::grid::{Position, Rect, TileGrid, TileKind};
use crate::{UndercroftError, UndercroftResult};
use log::{debug, info};
use pathfinding::prelude::bfs_reach;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashSet;

/// Cell-graph dungeon generator with boss and puzzle rooms.
///
/// Stages, in order:
/// 1. Reserve and carve the boss room
/// 2. Reserve the special room and fill it with holes
/// 3. Carve the spanning-tree backbone over the free cells
/// 4. Place rooms, each stubbed to its cell center
/// 5. Build the special room interior and its corridors
/// 6. Derive walls
/// 7. Reinforce connectivity, then derive walls for the new corridors
/// 8. Place puzzle features
/// 9. Apply the initial boss lock
#[derive(Debug, Clone, Default)]
pub struct DungeonGenerator;

impl DungeonGenerator {
    pub fn new() -> Self {
        Self
    }

    fn run_stages(&self, ctx: &mut GenerationContext) -> UndercroftResult<()> {
        boss::reserve_boss_room(ctx)?;
        special::reserve_special_room(ctx)?;

        let edges = cells::carve_spanning_tree(ctx)?;
        let placed = rooms::place_rooms(ctx)?;
        debug!("Backbone of {} corridors, {} rooms placed", edges, placed);

        special::build_special_room(ctx)?;
        walls::derive_walls(&mut ctx.grid)?;

        let links = connectivity::reinforce_connectivity(ctx)?;
        let walls_added = walls::derive_walls(&mut ctx.grid)?;
        debug!("{} reinforcement corridors, {} walls added after", links, walls_added);

        features::place_features(ctx)?;
        boss::apply_initial_lock(ctx);
        Ok(())
    }
}

impl Generator<Dungeon> for DungeonGenerator {
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> UndercroftResult<Dungeon> {
        config.validate()?;
        info!(
            "Generating {}x{} dungeon ({}x{} cells, seed {})",
            config.dungeon_width,
            config.dungeon_height,
            config.cells_x(),
            config.cells_y(),
            config.seed
        );

        let mut ctx = GenerationContext::new(config.clone(), StdRng::seed_from_u64(rng.gen()));
        self.run_stages(&mut ctx)?;

        let dungeon = Dungeon { context: ctx };
        info!(
            "Generated {} rooms (boss room: {}, special room: {})",
            dungeon.rooms().len(),
            dungeon.boss_room().is_some(),
            dungeon.special_room().is_some()
        );
        Ok(dungeon)
    }

    fn validate(&self, dungeon: &Dungeon, _config: &GenerationConfig) -> UndercroftResult<()> {
        dungeon.validate()
    }

    fn generator_type(&self) -> &'static str {
        "DungeonGenerator"
    }
}

/// Generates a dungeon seeded from `config.seed`.
///
/// # Examples
///
/// ```
/// use undercroft::{generate_dungeon, GenerationConfig};
///
/// let dungeon = generate_dungeon(&GenerationConfig::for_testing(3)).unwrap();
/// assert!(dungeon.validate().is_ok());
/// ```
pub fn generate_dungeon(config: &GenerationConfig) -> UndercroftResult<Dungeon> {
    let mut rng = utils::create_rng(config);
    DungeonGenerator::new().generate(config, &mut rng)
}

/// The collaborator's answer to "are all puzzles solved?".
pub trait PuzzleStatus {
    fn all_puzzles_solved(&self) -> bool;
}

impl PuzzleStatus for bool {
    fn all_puzzles_solved(&self) -> bool {
        *self
    }
}

impl<F: Fn() -> bool> PuzzleStatus for F {
    fn all_puzzles_solved(&self) -> bool {
        self()
    }
}

/// A generated dungeon.
#[derive(Debug, Clone)]
pub struct Dungeon {
    context: GenerationContext,
}

impl Dungeon {
    /// Tile at `(x, y)`; `Void` outside the grid.
    pub fn tile_kind(&self, x: i32, y: i32) -> TileKind {
        self.context.grid.get(Position::new(x, y))
    }

    pub fn tile_at(&self, pos: Position) -> TileKind {
        self.context.grid.get(pos)
    }

    pub fn grid(&self) -> &TileGrid {
        &self.context.grid
    }

    pub fn width(&self) -> i32 {
        self.context.grid.width()
    }

    pub fn height(&self) -> i32 {
        self.context.grid.height()
    }

    pub fn cells(&self) -> &CellGrid {
        &self.context.cells
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.context.config
    }

    /// Every room in creation order, boss and special rooms included.
    pub fn rooms(&self) -> &[Room] {
        &self.context.rooms
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.context.room(id)
    }

    pub fn boss_room(&self) -> Option<&Room> {
        self.context.boss_room()
    }

    pub fn special_room(&self) -> Option<&Room> {
        self.context.special_room()
    }

    pub fn special_room_entrance(&self) -> Option<Position> {
        self.context.special.as_ref().and_then(|state| state.entrance())
    }

    pub fn special_room_entrances(&self) -> &[Position] {
        self.context
            .special
            .as_ref()
            .map(|state| state.entrances.as_slice())
            .unwrap_or_default()
    }

    pub fn special_room_platform_center(&self) -> Option<Position> {
        self.context
            .special
            .as_ref()
            .and_then(|state| state.platform_center)
    }

    /// Rooms the special room was linked to.
    pub fn special_room_connections(&self) -> &[RoomId] {
        self.context
            .special
            .as_ref()
            .map(|state| state.connections.as_slice())
            .unwrap_or_default()
    }

    /// Barrier markers around a locked boss room.
    pub fn barriers(&self) -> &[Position] {
        self.context
            .boss
            .as_ref()
            .map(|boss| boss.barriers.as_slice())
            .unwrap_or_default()
    }

    /// Prefab placements left for the instantiating collaborator.
    pub fn decorations(&self) -> &[Decoration] {
        &self.context.decorations
    }

    pub fn features(&self) -> &[PlacedFeature] {
        &self.context.features
    }

    /// Cell pairs joined by backbone corridors.
    pub fn spanning_tree(&self) -> &[((i32, i32), (i32, i32))] {
        &self.context.spanning_tree
    }

    pub fn is_boss_room_locked(&self) -> bool {
        self.context.is_boss_locked()
    }

    /// Turns every hole into floor. Returns the number converted; a second
    /// call converts nothing.
    pub fn convert_hole_tiles_to_floor(&mut self) -> usize {
        let converted = self.context.grid.replace_all(TileKind::Hole, TileKind::Floor);
        if converted > 0 {
            info!("Converted {} hole tiles to floor", converted);
        }
        converted
    }

    /// Unlocks the boss room once `status` reports every puzzle solved.
    ///
    /// Returns the transition taken, if any.
    pub fn update_boss_lock(
        &mut self,
        status: &impl PuzzleStatus,
    ) -> UndercroftResult<Option<BossTransition>> {
        if !self.is_boss_room_locked() || !status.all_puzzles_solved() {
            return Ok(None);
        }
        self.unlock_boss_room()
    }

    pub fn unlock_boss_room(&mut self) -> UndercroftResult<Option<BossTransition>> {
        boss::unlock_boss_room(&mut self.context)
    }

    pub fn lock_boss_room(&mut self) -> UndercroftResult<Option<BossTransition>> {
        boss::lock_boss_room(&mut self.context)
    }

    /// Checks the layout guarantees of a finished dungeon.
    ///
    /// Fails with [`UndercroftError::GenerationFailed`] naming the first
    /// broken property: floor connectivity, locked boss isolation, wall
    /// closure or boss/special overlap.
    pub fn validate(&self) -> UndercroftResult<()> {
        self.validate_connectivity()?;
        self.validate_boss_isolation()?;

        let unwalled = walls::unwalled_floor(&self.context.grid);
        if let Some(pos) = unwalled.first() {
            return Err(UndercroftError::GenerationFailed(format!(
                "{} floor tiles touch the void, first at {:?}",
                unwalled.len(),
                pos
            )));
        }

        if let (Some(boss), Some(special)) = (self.boss_room(), self.special_room()) {
            if boss.bounds.intersects(&special.bounds) {
                return Err(UndercroftError::GenerationFailed(format!(
                    "Boss room {:?} overlaps special room {:?}",
                    boss.bounds, special.bounds
                )));
            }
        }
        Ok(())
    }

    /// Every floor tile reachable from every other, skipping a locked boss
    /// room.
    fn validate_connectivity(&self) -> UndercroftResult<()> {
        let grid = &self.context.grid;
        let excluded = self.locked_boss_bounds();
        let counted = |pos: Position| {
            grid.get(pos).is_floor_family() && !excluded.is_some_and(|rect| rect.contains(pos))
        };

        let floor: Vec<Position> = grid
            .iter()
            .map(|(pos, _)| pos)
            .filter(|&pos| counted(pos))
            .collect();
        let Some(&origin) = floor.first() else {
            return Err(UndercroftError::GenerationFailed(
                "Dungeon has no floor".to_string(),
            ));
        };

        let reached: HashSet<Position> = bfs_reach(origin, |&pos| {
            pos.cardinal_adjacent_positions()
                .into_iter()
                .filter(|&next| {
                    grid.get(next).is_traversable()
                        && !excluded.is_some_and(|rect| rect.contains(next))
                })
                .collect::<Vec<_>>()
        })
        .collect();

        let unreached = floor.iter().filter(|pos| !reached.contains(pos)).count();
        if unreached > 0 {
            return Err(UndercroftError::GenerationFailed(format!(
                "{} of {} floor tiles are unreachable from {:?}",
                unreached,
                floor.len(),
                origin
            )));
        }
        Ok(())
    }

    /// Nothing outside a locked boss room is reachable from inside it.
    fn validate_boss_isolation(&self) -> UndercroftResult<()> {
        let (Some(bounds), Some(room)) = (self.locked_boss_bounds(), self.boss_room()) else {
            return Ok(());
        };
        let grid = &self.context.grid;
        let escaped = bfs_reach(room.anchor(), |&pos| {
            pos.cardinal_adjacent_positions()
                .into_iter()
                .filter(|&next| grid.get(next).is_traversable())
                .collect::<Vec<_>>()
        })
        .find(|pos| !bounds.contains(*pos));

        match escaped {
            Some(pos) => Err(UndercroftError::GenerationFailed(format!(
                "Locked boss room leaks to {:?}",
                pos
            ))),
            None => Ok(()),
        }
    }

    fn locked_boss_bounds(&self) -> Option<Rect> {
        if self.is_boss_room_locked() {
            self.boss_room().map(|room| room.bounds)
        } else {
            None
        }
    }

    /// Serializable overview of the dungeon.
    pub fn summary(&self) -> DungeonSummary {
        let tile_counts = TileKind::ALL
            .iter()
            .map(|&kind| (kind, self.context.grid.count(kind)))
            .filter(|&(_, count)| count > 0)
            .collect();

        DungeonSummary {
            seed: self.context.config.seed,
            width: self.width(),
            height: self.height(),
            cells_x: self.context.cells.width(),
            cells_y: self.context.cells.height(),
            rooms: self.context.normal_rooms().count(),
            special_shaped_rooms: self
                .context
                .normal_rooms()
                .filter(|room| room.is_special_shape())
                .count(),
            boss_room: self.boss_room().map(|room| room.bounds),
            boss_lock: self.context.boss.as_ref().map(|boss| boss.lock),
            special_room: self.special_room().map(|room| room.bounds),
            special_room_entrance: self.special_room_entrance(),
            special_room_platform_center: self.special_room_platform_center(),
            special_room_connections: self.special_room_connections().to_vec(),
            islands: self
                .context
                .special
                .as_ref()
                .map_or(0, |state| state.islands.len()),
            decorations: self.context.decorations.len(),
            features: self.context.features.clone(),
            tile_counts,
        }
    }

    /// Consumes the dungeon, returning the raw generation state.
    pub fn into_context(self) -> GenerationContext {
        self.context
    }
}

/// Summary written by `undercroft --summary`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DungeonSummary {
    pub seed: u64,
    pub width: i32,
    pub height: i32,
    pub cells_x: i32,
    pub cells_y: i32,
    /// Ordinary rooms
    pub rooms: usize,
    pub special_shaped_rooms: usize,
    pub boss_room: Option<Rect>,
    pub boss_lock: Option<BossLock>,
    pub special_room: Option<Rect>,
    pub special_room_entrance: Option<Position>,
    pub special_room_platform_center: Option<Position>,
    pub special_room_connections: Vec<RoomId>,
    pub islands: usize,
    pub decorations: usize,
    pub features: Vec<PlacedFeature>,
    /// Non-zero tile counts in declaration order
    pub tile_counts: Vec<(TileKind, usize)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::RoomRole;
    use std::cell::Cell;

    #[test]
    fn test_generator_type() {
        assert_eq!(DungeonGenerator::new().generator_type(), "DungeonGenerator");
    }

    #[test]
    fn test_generation_with_small_dungeon() -> UndercroftResult<()> {
        let config = GenerationConfig::for_testing(12345);
        let dungeon = generate_dungeon(&config)?;

        assert_eq!(dungeon.width(), 56);
        assert_eq!(dungeon.height(), 56);
        assert!(dungeon.grid().count(TileKind::Floor) > 0);
        assert!(dungeon.boss_room().is_some());
        assert!(dungeon.special_room().is_some());
        assert!(dungeon.is_boss_room_locked());
        assert!(!dungeon.barriers().is_empty());
        dungeon.validate()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = GenerationConfig::for_testing(1);
        config.cell_width = 3;
        assert!(matches!(
            generate_dungeon(&config),
            Err(UndercroftError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_tile_kind_out_of_range_is_void() -> UndercroftResult<()> {
        let dungeon = generate_dungeon(&GenerationConfig::for_testing(4))?;
        assert_eq!(dungeon.tile_kind(-1, 0), TileKind::Void);
        assert_eq!(dungeon.tile_kind(0, dungeon.height()), TileKind::Void);
        Ok(())
    }

    #[test]
    fn test_hole_conversion_is_idempotent() -> UndercroftResult<()> {
        let mut dungeon = generate_dungeon(&GenerationConfig::for_testing(8))?;
        let holes = dungeon.grid().count(TileKind::Hole);
        assert!(holes > 0);

        assert_eq!(dungeon.convert_hole_tiles_to_floor(), holes);
        let once = dungeon.grid().clone();
        assert_eq!(dungeon.convert_hole_tiles_to_floor(), 0);
        assert_eq!(dungeon.grid(), &once);
        dungeon.validate()
    }

    #[test]
    fn test_update_boss_lock_polls_status() -> UndercroftResult<()> {
        let mut dungeon = generate_dungeon(&GenerationConfig::for_testing(21))?;
        let polls = Cell::new(0);
        let unsolved = || {
            polls.set(polls.get() + 1);
            false
        };

        assert_eq!(dungeon.update_boss_lock(&unsolved)?, None);
        assert_eq!(polls.get(), 1);
        assert!(dungeon.is_boss_room_locked());

        let transition = dungeon.update_boss_lock(&true)?;
        assert!(matches!(transition, Some(BossTransition::Unlocked { .. })));
        assert!(!dungeon.is_boss_room_locked());
        assert!(dungeon.barriers().is_empty());
        assert_eq!(dungeon.update_boss_lock(&true)?, None);
        dungeon.validate()
    }

    #[test]
    fn test_summary_matches_accessors() -> UndercroftResult<()> {
        let dungeon = generate_dungeon(&GenerationConfig::for_testing(30))?;
        let summary = dungeon.summary();

        assert_eq!(summary.seed, 30);
        assert_eq!(summary.cells_x, 4);
        assert_eq!(
            summary.rooms,
            dungeon.rooms().iter().filter(|room| room.role == RoomRole::Normal).count()
        );
        assert_eq!(summary.boss_lock, Some(BossLock::Locked));
        assert_eq!(summary.special_room_entrance, dungeon.special_room_entrance());
        assert!(summary
            .tile_counts
            .iter()
            .any(|&(kind, count)| kind == TileKind::BossFloor && count == 400));

        let json = serde_json::to_string(&summary)?;
        assert!(json.contains("\"boss_lock\":\"Locked\""));
        Ok(())
    }

    #[test]
    fn test_validate_reports_disconnected_floor() -> UndercroftResult<()> {
        let mut config = GenerationConfig::for_testing(2);
        config.enable_boss_room = false;
        config.enable_special_room = false;
        let dungeon = generate_dungeon(&config)?;
        let mut context = dungeon.into_context();

        // A walled floor tile far from everything else.
        let corner = Position::new(1, 1);
        if context.grid.get(corner) == TileKind::Void {
            context.grid.set(corner, TileKind::Floor)?;
            walls::derive_walls(&mut context.grid)?;
            let broken = Dungeon { context };
            assert!(matches!(
                broken.validate(),
                Err(UndercroftError::GenerationFailed(_))
            ));
        }
        Ok(())
    }
}
