//! # Special (Puzzle) Room
//!
//! A 2×1-cell room filled with holes. Against the wall opposite its main
//! entrance sits a 3×3 safe platform with a cracked wall behind it, and the
//! hole field is dotted with floor islands. The room is linked to one
//! nearby room, or to several in a small dungeon.
//!
//! Placement happens in two steps: [`reserve_special_room`] claims the cells
//! before the backbone is carved, and [`build_special_room`] lays out the
//! interior and corridors once the ordinary rooms exist.

use super::connectivity::{connect_points, CorridorRequest};
use super::utils::rooms_by_distance;
use super::{GenerationContext, Room, RoomId, RoomRole};
use crate::config::{ISLAND_LAYOUT, PLATFORM_SIZE};
use crate::grid::{Direction, Position, Rect, TileGrid, TileKind};
use crate::UndercroftResult;
use log::{debug, warn};
use rand::Rng;

/// Puzzle room bookkeeping kept beside the room itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialRoomState {
    pub room: RoomId,
    /// The two cells the room spans, left cell first
    pub cells: [(i32, i32); 2],
    /// Entrance tiles on the room edge; the first one is the main entrance
    pub entrances: Vec<Position>,
    /// Side of the room holding the main entrance
    pub entrance_side: Option<Direction>,
    pub platform_center: Option<Position>,
    /// Rooms linked to the special room, in link order
    pub connections: Vec<RoomId>,
    pub islands: Vec<Rect>,
    /// Cracked wall behind the platform
    pub cracked_wall: Option<Position>,
}

impl SpecialRoomState {
    /// Main entrance, where the first corridor meets the room.
    pub fn entrance(&self) -> Option<Position> {
        self.entrances.first().copied()
    }

    /// The 3×3 platform footprint.
    pub fn platform(&self) -> Option<Rect> {
        self.platform_center.map(|center| {
            let half = PLATFORM_SIZE / 2;
            Rect::new(center.x - half, center.y - half, PLATFORM_SIZE, PLATFORM_SIZE)
        })
    }
}

/// Room rectangle for a special room whose left cell is `(x, y)`: both
/// cells, inset by one tile.
fn special_rect(ctx: &GenerationContext, x: i32, y: i32) -> Option<Rect> {
    ctx.cells
        .cell_rect(x, y)
        .union(&ctx.cells.cell_rect(x + 1, y))
        .shrunk(1)
}

/// Whether a special room may start at cell `(x, y)`.
fn is_valid_location(ctx: &GenerationContext, x: i32, y: i32) -> bool {
    if !ctx.cells.is_free(x, y) || !ctx.cells.is_free(x + 1, y) {
        return false;
    }
    let Some(rect) = special_rect(ctx, x, y) else {
        return false;
    };
    if ctx.grid.interior().intersection(&rect) != Some(rect) {
        return false;
    }
    if ctx.boss_zone().is_some_and(|zone| zone.intersects(&rect)) {
        return false;
    }
    ctx.cells.free_cells_connected(&[(x, y), (x + 1, y)])
}

/// First valid location: the four corners, then a row-major scan.
fn find_location(ctx: &GenerationContext) -> Option<(i32, i32)> {
    let last_x = ctx.cells.width() - 2;
    let last_y = ctx.cells.height() - 1;
    let corners = [(0, 0), (last_x, 0), (0, last_y), (last_x, last_y)];
    let scan = (0..=last_y).flat_map(|y| (0..=last_x).map(move |x| (x, y)));

    corners
        .into_iter()
        .chain(scan)
        .find(|&(x, y)| is_valid_location(ctx, x, y))
}

/// Claims two adjacent free cells and fills the room with holes.
pub fn reserve_special_room(ctx: &mut GenerationContext) -> UndercroftResult<Option<RoomId>> {
    if !ctx.config.enable_special_room {
        return Ok(None);
    }
    if ctx.cells.width() < 2 {
        warn!("Special room needs at least two cell columns; skipping it");
        return Ok(None);
    }
    let Some((x, y)) = find_location(ctx) else {
        warn!("No valid location for the special room; skipping it");
        return Ok(None);
    };
    let Some(rect) = special_rect(ctx, x, y) else {
        return Ok(None);
    };

    ctx.cells.reserve(x, y, RoomRole::Special);
    ctx.cells.reserve(x + 1, y, RoomRole::Special);
    let id = ctx.push_room(Room::new(RoomId(0), RoomRole::Special, rect));
    for pos in rect.positions() {
        ctx.grid.set(pos, TileKind::Hole)?;
    }

    ctx.special = Some(SpecialRoomState {
        room: id,
        cells: [(x, y), (x + 1, y)],
        entrances: Vec::new(),
        entrance_side: None,
        platform_center: None,
        connections: Vec::new(),
        islands: Vec::new(),
        cracked_wall: None,
    });
    debug!("Special room {:?} in cells ({}, {})-({}, {})", rect, x, y, x + 1, y);
    Ok(Some(id))
}

/// Side of a room at `center` that faces `target`.
///
/// The axis with the larger offset wins; ties go to the vertical axis.
pub fn facing_side(center: Position, target: Position) -> Direction {
    let delta = target - center;
    if delta.x.abs() > delta.y.abs() {
        if delta.x > 0 {
            Direction::East
        } else {
            Direction::West
        }
    } else if delta.y > 0 {
        Direction::South
    } else {
        Direction::North
    }
}

/// Facing side restricted to the other axis than `side`.
fn cross_axis_side(side: Direction, center: Position, target: Position) -> Direction {
    let delta = target - center;
    if side.is_horizontal() {
        if delta.y > 0 {
            Direction::South
        } else {
            Direction::North
        }
    } else if delta.x > 0 {
        Direction::East
    } else {
        Direction::West
    }
}

/// Lays out entrances, platform, cracked wall and islands, then carves the
/// corridors to the linked rooms.
pub fn build_special_room(ctx: &mut GenerationContext) -> UndercroftResult<()> {
    let Some(room) = ctx.special_room().cloned() else {
        return Ok(());
    };
    let rect = room.bounds;
    let center = rect.center();

    let wanted = if ctx.config.is_small_dungeon() {
        ctx.config.small_dungeon_connections
    } else {
        1
    };
    let targets: Vec<(RoomId, Position)> =
        rooms_by_distance(&ctx.rooms, center, |candidate| candidate.role == RoomRole::Normal)
            .into_iter()
            .take(wanted)
            .map(|target| (target.id, target.center()))
            .collect();

    let primary_toward = targets
        .first()
        .map(|&(_, target_center)| target_center)
        .unwrap_or_else(|| ctx.grid.bounds().center());
    let entrance_side = facing_side(center, primary_toward);
    let platform_side = entrance_side.opposite();

    let mut links = Vec::with_capacity(targets.len());
    let mut entrances: Vec<Position> = Vec::new();
    for (index, &(target, target_center)) in targets.iter().enumerate() {
        let mut side = facing_side(center, target_center);
        if index > 0 && side == platform_side {
            side = cross_axis_side(side, center, target_center);
        }
        let entrance = rect.side_midpoint(side);
        if !entrances.contains(&entrance) {
            entrances.push(entrance);
        }
        links.push((target, entrance, side));
    }
    if entrances.is_empty() {
        warn!("Special room has no room to connect to");
        entrances.push(rect.side_midpoint(entrance_side));
    }
    for &entrance in &entrances {
        ctx.grid.set(entrance, TileKind::SpecialFloor)?;
    }

    // Platform against the far wall, cracked wall just outside it.
    let platform_center = rect.side_midpoint(platform_side).step(entrance_side);
    let half = PLATFORM_SIZE / 2;
    let platform = Rect::new(
        platform_center.x - half,
        platform_center.y - half,
        PLATFORM_SIZE,
        PLATFORM_SIZE,
    );
    for pos in platform.positions() {
        if rect.contains(pos) {
            ctx.grid.set(pos, TileKind::SpecialFloor)?;
        }
    }
    let cracked = rect.side_midpoint(platform_side).step(platform_side);
    let behind = ctx.grid.get(cracked);
    let cracked_wall = if ctx.grid.is_interior(cracked)
        && (behind == TileKind::Void || behind.is_plain_wall())
    {
        ctx.grid.set(cracked, TileKind::CrackedWall4)?;
        Some(cracked)
    } else {
        None
    };

    let mut islands = Vec::new();
    for (size, count) in ISLAND_LAYOUT {
        for _ in 0..count {
            let candidates = island_candidates(&ctx.grid, &rect, &platform, size);
            if candidates.is_empty() {
                debug!("No space left for a {size}x{size} island");
                break;
            }
            let island = candidates[ctx.rng.gen_range(0..candidates.len())];
            for pos in island.positions() {
                ctx.grid.set(pos, TileKind::SpecialFloor)?;
            }
            islands.push(island);
        }
    }

    if let Some(state) = ctx.special.as_mut() {
        state.entrances = entrances;
        state.entrance_side = Some(entrance_side);
        state.platform_center = Some(platform_center);
        state.islands = islands;
        state.cracked_wall = cracked_wall;
    }

    for (target, entrance, side) in links {
        let start = entrance.step(side);
        let goal = match ctx.room(target) {
            Some(target_room) => target_room.anchor(),
            None => continue,
        };
        let request = CorridorRequest {
            start,
            goal,
            endpoints: vec![room.id, target],
            extra_allowed: vec![start],
            kind: TileKind::Floor,
        };
        if connect_points(ctx, &request, true)?.is_some() {
            if let Some(state) = ctx.special.as_mut() {
                state.connections.push(target);
            }
        } else {
            warn!("Special room could not be linked to {}", target);
        }
    }

    debug!(
        "Special room: entrance side {:?}, {} islands, {} connections",
        entrance_side,
        ctx.special.as_ref().map_or(0, |state| state.islands.len()),
        ctx.special.as_ref().map_or(0, |state| state.connections.len())
    );
    Ok(())
}

/// Island footprints of `size × size` that sit entirely on holes and keep a
/// one-tile gap from every special floor tile except the platform.
fn island_candidates(grid: &TileGrid, rect: &Rect, platform: &Rect, size: i32) -> Vec<Rect> {
    let mut candidates = Vec::new();
    for y in rect.y..=rect.bottom() - size + 1 {
        for x in rect.x..=rect.right() - size + 1 {
            let footprint = Rect::new(x, y, size, size);
            if !footprint
                .positions()
                .all(|pos| grid.get(pos) == TileKind::Hole)
            {
                continue;
            }
            let isolated = footprint.expanded(1).perimeter().into_iter().all(|pos| {
                grid.get(pos) != TileKind::SpecialFloor || platform.contains(pos)
            });
            if isolated {
                candidates.push(footprint);
            }
        }
    }
    candidates
}
