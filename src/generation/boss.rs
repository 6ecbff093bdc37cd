//! # Boss Room
//!
//! The boss arena is a fixed 1.5×1.5-cell room centered on the grid. It can
//! be locked, in which case nothing may be carved in it or within its
//! buffer ring. Unlocking clears the barriers and carves one corridor to
//! the nearest ordinary room.
//!
//! ```text
//!   Locked ──(puzzles solved)──▶ Unlocked
//!     ▲                            │
//!     └──────(lock_boss_room)──────┘
//! ```

use super::rooms::carve_room;
use super::utils::rooms_by_distance;
use super::{connectivity, walls, GenerationConfig, GenerationContext, Room, RoomId, RoomRole};
use crate::grid::{Position, Rect, TileKind};
use crate::{UndercroftError, UndercroftResult};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Boss room accessibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BossLock {
    Locked,
    Unlocked,
}

/// Boss room bookkeeping kept beside the room itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BossRoomState {
    pub room: RoomId,
    pub lock: BossLock,
    /// Barrier markers around the room while it is locked
    pub barriers: Vec<Position>,
}

/// Outcome of a lock state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BossTransition {
    Unlocked {
        /// Room the new corridor leads to, if there was one
        connected_to: Option<RoomId>,
        /// Tiles carved for the corridor
        corridor_tiles: usize,
    },
    Locked,
}

/// Boss room rectangle: ⌈1.5 cells⌉ on each side, centered on the grid.
pub fn boss_room_rect(config: &GenerationConfig) -> Rect {
    let width = (config.cell_width * 3 + 1) / 2;
    let height = (config.cell_height * 3 + 1) / 2;
    Rect::new(
        (config.dungeon_width - width) / 2,
        (config.dungeon_height - height) / 2,
        width,
        height,
    )
}

/// Barrier ring: the perimeter of the room grown by `offset` tiles.
pub fn barrier_ring(bounds: &Rect, offset: i32) -> Vec<Position> {
    bounds.expanded(offset).perimeter()
}

/// Reserves the cells under the boss zone and carves the boss floor.
///
/// The room is skipped when disabled, when the zone does not fit inside the
/// grid, or when its cells would reach the outer row or column of cells.
pub fn reserve_boss_room(ctx: &mut GenerationContext) -> UndercroftResult<Option<RoomId>> {
    if !ctx.config.enable_boss_room {
        return Ok(None);
    }

    let bounds = boss_room_rect(&ctx.config);
    let zone = bounds.expanded(ctx.config.boss_buffer_ring);
    let interior = ctx.grid.interior();
    if zone.intersection(&interior) != Some(zone) {
        warn!(
            "Boss room {:?} does not fit in a {}x{} grid; skipping it",
            bounds,
            ctx.grid.width(),
            ctx.grid.height()
        );
        return Ok(None);
    }

    let cells = ctx.cells.cells_touching(&zone);
    if cells.iter().any(|&(x, y)| ctx.cells.is_edge(x, y)) {
        warn!(
            "Boss room would claim edge cells of a {}x{} cell grid; skipping it",
            ctx.cells.width(),
            ctx.cells.height()
        );
        return Ok(None);
    }

    for &(x, y) in &cells {
        ctx.cells.reserve(x, y, RoomRole::Boss);
    }

    let id = ctx.push_room(Room::new(RoomId(0), RoomRole::Boss, bounds));
    carve_room(&mut ctx.grid, &ctx.rooms[id.0])?;

    let lock = if ctx.config.enable_puzzle_boss_room_lock {
        BossLock::Locked
    } else {
        BossLock::Unlocked
    };
    ctx.boss = Some(BossRoomState {
        room: id,
        lock,
        barriers: Vec::new(),
    });

    debug!(
        "Boss room {:?} reserved {} cells ({:?})",
        bounds,
        cells.len(),
        lock
    );
    Ok(Some(id))
}

/// Raises the barriers of a boss room that starts out locked.
pub fn apply_initial_lock(ctx: &mut GenerationContext) {
    let Some(bounds) = ctx.boss_room().map(|room| room.bounds) else {
        return;
    };
    let ring = ctx.config.boss_buffer_ring;
    if let Some(boss) = ctx.boss.as_mut() {
        if boss.lock == BossLock::Locked {
            boss.barriers = barrier_ring(&bounds, ring);
        }
    }
}

/// Locked → Unlocked: drops the barriers and links the nearest ordinary
/// room to the boss room.
///
/// Returns `Ok(None)` when the room is already unlocked.
pub fn unlock_boss_room(ctx: &mut GenerationContext) -> UndercroftResult<Option<BossTransition>> {
    let boss = ctx
        .boss
        .as_mut()
        .ok_or_else(|| UndercroftError::InvalidState("dungeon has no boss room".to_string()))?;
    if boss.lock == BossLock::Unlocked {
        return Ok(None);
    }
    boss.lock = BossLock::Unlocked;
    boss.barriers.clear();
    let boss_id = boss.room;

    let center = ctx
        .room(boss_id)
        .map(Room::center)
        .ok_or_else(|| UndercroftError::InvalidState(format!("{boss_id} is missing")))?;
    let target = rooms_by_distance(&ctx.rooms, center, |room| room.role == RoomRole::Normal)
        .first()
        .map(|room| room.id);

    let mut corridor_tiles = 0;
    match target {
        Some(target) => {
            corridor_tiles = connectivity::connect_rooms(
                ctx,
                target,
                boss_id,
                TileKind::NonEssentialFloor,
                true,
            )?
            .unwrap_or(0);
            walls::derive_walls(&mut ctx.grid)?;
        }
        None => warn!("Boss room unlocked but there is no room to connect it to"),
    }

    info!(
        "Boss room unlocked; corridor of {} tiles to {:?}",
        corridor_tiles, target
    );
    Ok(Some(BossTransition::Unlocked {
        connected_to: target,
        corridor_tiles,
    }))
}

/// Unlocked → Locked: recreates the barrier ring.
///
/// Corridors carved while unlocked stay in place. Returns `Ok(None)` when
/// the room is already locked.
pub fn lock_boss_room(ctx: &mut GenerationContext) -> UndercroftResult<Option<BossTransition>> {
    let bounds = ctx
        .boss_room()
        .map(|room| room.bounds)
        .ok_or_else(|| UndercroftError::InvalidState("dungeon has no boss room".to_string()))?;
    let ring = ctx.config.boss_buffer_ring;
    let Some(boss) = ctx.boss.as_mut() else {
        return Ok(None);
    };
    if boss.lock == BossLock::Locked {
        return Ok(None);
    }

    boss.lock = BossLock::Locked;
    boss.barriers = barrier_ring(&bounds, ring);
    info!("Boss room locked with {} barriers", boss.barriers.len());
    Ok(Some(BossTransition::Locked))
}
