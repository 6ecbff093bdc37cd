//! # Corridor Carving
//!
//! Corridors are planned as tile lists first and carved second, so callers
//! can check a plan against their own carving rules before committing it.
//!
//! Three styles are supported:
//!
//! - **Simple**: one horizontal run at the start row, one vertical run at the
//!   end column, width 1
//! - **Direct**: the same two runs as bands of a chosen width, in either order
//! - **Winding**: 1-3 jittered waypoints joined pairwise by direct bands
//!
//! Bands always share their corner tile, so consecutive runs stay
//! 4-connected.

use super::GenerationContext;
use crate::grid::{Position, Rect, TileGrid, TileKind};
use crate::UndercroftResult;
use log::trace;
use rand::Rng;
use std::collections::HashSet;

/// How a corridor is laid between two points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorridorStyle {
    Simple,
    Direct {
        width: i32,
        horizontal_first: bool,
    },
    Winding {
        width: i32,
        waypoints: Vec<Position>,
    },
}

impl CorridorStyle {
    pub fn width(&self) -> i32 {
        match self {
            CorridorStyle::Simple => 1,
            CorridorStyle::Direct { width, .. } | CorridorStyle::Winding { width, .. } => *width,
        }
    }
}

/// Rolls a corridor style for a path from `start` to `end`.
///
/// Winding waypoints are clamped into `bounds`.
pub fn choose_style(
    ctx: &mut GenerationContext,
    start: Position,
    end: Position,
    bounds: Rect,
) -> CorridorStyle {
    if !ctx.config.enhanced_corridors {
        return CorridorStyle::Simple;
    }

    let width = ctx
        .rng
        .gen_range(ctx.config.corridor_min_width..=ctx.config.corridor_max_width);

    if ctx.rng.gen_bool(ctx.config.corridor_winding_factor) {
        let waypoints = winding_waypoints(ctx, start, end, bounds);
        CorridorStyle::Winding { width, waypoints }
    } else {
        let horizontal_first = ctx.rng.gen_bool(0.5);
        CorridorStyle::Direct {
            width,
            horizontal_first,
        }
    }
}

/// Picks 1-3 waypoints spread along the segment from `start` to `end`.
///
/// A waypoint landing in the boss zone is re-rolled with one more tile of
/// jitter each time, up to the configured retry limit. After that the last
/// roll is kept as is.
fn winding_waypoints(
    ctx: &mut GenerationContext,
    start: Position,
    end: Position,
    bounds: Rect,
) -> Vec<Position> {
    let avoid = ctx.boss_zone();
    let count = ctx.rng.gen_range(1..=3);
    let retry_limit = ctx.config.waypoint_retry_limit;
    let base_jitter = ctx.config.winding_jitter;
    let mut waypoints = Vec::with_capacity(count);

    for step in 1..=count {
        let t = step as f64 / (count + 1) as f64;
        let base = Position::new(
            start.x + ((end.x - start.x) as f64 * t).round() as i32,
            start.y + ((end.y - start.y) as f64 * t).round() as i32,
        );

        let mut attempt = 0;
        let waypoint = loop {
            let jitter = base_jitter + attempt as i32;
            let candidate = bounds.clamp(base.offset(
                ctx.rng.gen_range(-jitter..=jitter),
                ctx.rng.gen_range(-jitter..=jitter),
            ));

            if !avoid.is_some_and(|zone| zone.contains(candidate)) {
                break candidate;
            }
            attempt += 1;
            if attempt >= retry_limit {
                trace!(
                    "Waypoint near {:?} still inside the boss zone after {} retries; keeping it",
                    base,
                    attempt
                );
                break candidate;
            }
        };
        waypoints.push(waypoint);
    }

    waypoints
}

/// Expands a style into the tiles it covers, without duplicates, in
/// carving order.
pub fn plan_corridor(start: Position, end: Position, style: &CorridorStyle) -> Vec<Position> {
    let mut tiles = Vec::new();
    match style {
        CorridorStyle::Simple => push_bands(&mut tiles, start, end, 1, true),
        CorridorStyle::Direct {
            width,
            horizontal_first,
        } => push_bands(&mut tiles, start, end, *width, *horizontal_first),
        CorridorStyle::Winding { width, waypoints } => {
            let mut from = start;
            for &to in waypoints.iter().chain(std::iter::once(&end)) {
                push_bands(&mut tiles, from, to, *width, true);
                from = to;
            }
        }
    }

    let mut seen = HashSet::with_capacity(tiles.len());
    tiles.retain(|pos| seen.insert(*pos));
    tiles
}

/// Two perpendicular bands from `a` to `b` meeting at a shared corner.
fn push_bands(tiles: &mut Vec<Position>, a: Position, b: Position, width: i32, horizontal_first: bool) {
    if horizontal_first {
        push_horizontal_band(tiles, a.x, b.x, a.y, width);
        push_vertical_band(tiles, a.y, b.y, b.x, width);
    } else {
        push_vertical_band(tiles, a.y, b.y, a.x, width);
        push_horizontal_band(tiles, a.x, b.x, b.y, width);
    }
}

/// Offsets of a band of `width` tiles centered on its path line.
fn band_offsets(width: i32) -> std::ops::RangeInclusive<i32> {
    -(width - 1) / 2..=width / 2
}

fn push_horizontal_band(tiles: &mut Vec<Position>, x1: i32, x2: i32, y: i32, width: i32) {
    for x in x1.min(x2)..=x1.max(x2) {
        for offset in band_offsets(width) {
            tiles.push(Position::new(x, y + offset));
        }
    }
}

fn push_vertical_band(tiles: &mut Vec<Position>, y1: i32, y2: i32, x: i32, width: i32) {
    for y in y1.min(y2)..=y1.max(y2) {
        for offset in band_offsets(width) {
            tiles.push(Position::new(x + offset, y));
        }
    }
}

/// Writes `kind` onto planned tiles.
///
/// Only void and plain wall tiles inside the grid interior are replaced;
/// anything else is left untouched. Returns the number of tiles written.
pub fn carve_tiles(grid: &mut TileGrid, tiles: &[Position], kind: TileKind) -> UndercroftResult<usize> {
    let interior = grid.interior();
    let mut carved = 0;
    for &pos in tiles {
        if !interior.contains(pos) {
            continue;
        }
        let current = grid.get(pos);
        if current == TileKind::Void || current.is_plain_wall() {
            grid.set(pos, kind)?;
            carved += 1;
        }
    }
    Ok(carved)
}

/// Backbone corridor between the centers of two adjacent cells.
///
/// The path is kept far enough inside the two cells that even the widest
/// band never leaves them.
pub fn carve_backbone_corridor(
    ctx: &mut GenerationContext,
    from: (i32, i32),
    to: (i32, i32),
) -> UndercroftResult<usize> {
    let start = ctx.cells.cell_center(from.0, from.1);
    let end = ctx.cells.cell_center(to.0, to.1);
    let area = ctx
        .cells
        .cell_rect(from.0, from.1)
        .union(&ctx.cells.cell_rect(to.0, to.1));
    let margin = 1 + ctx.config.corridor_max_width / 2;
    let bounds = area.shrunk(margin).unwrap_or(area);

    let style = choose_style(ctx, start, end, bounds);
    let tiles = plan_corridor(start, end, &style);
    carve_tiles(&mut ctx.grid, &tiles, TileKind::Floor)
}

/// Width-1 L-corridor, used to join a room to its cell center.
pub fn carve_stub(ctx: &mut GenerationContext, from: Position, to: Position) -> UndercroftResult<usize> {
    let tiles = plan_corridor(from, to, &CorridorStyle::Simple);
    carve_tiles(&mut ctx.grid, &tiles, TileKind::Floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{GenerationConfig, RoomId, RoomRole, Room};
    use crate::generation::boss::{BossLock, BossRoomState};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn is_four_connected(tiles: &[Position]) -> bool {
        let set: HashSet<Position> = tiles.iter().copied().collect();
        let Some(&origin) = tiles.first() else {
            return true;
        };
        let reached = pathfinding::prelude::bfs_reach(origin, |&pos| {
            pos.cardinal_adjacent_positions()
                .into_iter()
                .filter(|next| set.contains(next))
                .collect::<Vec<_>>()
        })
        .count();
        reached == set.len()
    }

    #[test]
    fn test_simple_corridor_is_an_l() {
        let tiles = plan_corridor(
            Position::new(2, 2),
            Position::new(6, 5),
            &CorridorStyle::Simple,
        );
        assert_eq!(tiles.len(), 5 + 3);
        assert!(tiles.contains(&Position::new(6, 2)));
        assert!(!tiles.contains(&Position::new(2, 5)));
        assert!(is_four_connected(&tiles));
    }

    #[test]
    fn test_direct_band_width() {
        let style = CorridorStyle::Direct {
            width: 3,
            horizontal_first: true,
        };
        let tiles = plan_corridor(Position::new(10, 10), Position::new(20, 10), &style);
        // The closing vertical band adds one tile past the end column.
        assert_eq!(tiles.len(), 11 * 3 + 1);
        assert!(tiles.contains(&Position::new(21, 10)));
        assert!(tiles.contains(&Position::new(15, 9)));
        assert!(tiles.contains(&Position::new(15, 11)));
        assert!(!tiles.contains(&Position::new(15, 12)));

        let even = CorridorStyle::Direct {
            width: 2,
            horizontal_first: false,
        };
        let tiles = plan_corridor(Position::new(4, 4), Position::new(4, 8), &even);
        assert_eq!(tiles.len(), 5 * 2 + 1);
        assert!(tiles.iter().all(|pos| pos.x == 4 || pos.x == 5));
    }

    #[test]
    fn test_winding_plan_stays_connected() {
        let style = CorridorStyle::Winding {
            width: 2,
            waypoints: vec![Position::new(14, 3), Position::new(7, 20)],
        };
        let tiles = plan_corridor(Position::new(2, 2), Position::new(30, 25), &style);
        assert!(tiles.contains(&Position::new(2, 2)));
        assert!(tiles.contains(&Position::new(30, 25)));
        assert!(is_four_connected(&tiles));
    }

    #[test]
    fn test_carve_tiles_preserves_existing_floor() -> UndercroftResult<()> {
        let mut grid = TileGrid::new(8, 8);
        grid.set(Position::new(3, 3), TileKind::BossFloor)?;
        grid.set(Position::new(4, 3), TileKind::WallTop)?;
        grid.set(Position::new(5, 3), TileKind::Hole)?;

        let tiles: Vec<Position> = (0..8).map(|x| Position::new(x, 3)).collect();
        let carved = carve_tiles(&mut grid, &tiles, TileKind::NonEssentialFloor)?;

        // x = 0 and x = 7 are on the border.
        assert_eq!(carved, 4);
        assert_eq!(grid.get(Position::new(3, 3)), TileKind::BossFloor);
        assert_eq!(grid.get(Position::new(4, 3)), TileKind::NonEssentialFloor);
        assert_eq!(grid.get(Position::new(5, 3)), TileKind::Hole);
        assert_eq!(grid.get(Position::new(0, 3)), TileKind::Void);
        Ok(())
    }

    #[test]
    fn test_simple_style_when_enhancement_disabled() {
        let mut config = GenerationConfig::for_testing(4);
        config.enhanced_corridors = false;
        let mut ctx = GenerationContext::new(config, StdRng::seed_from_u64(4));
        let style = choose_style(
            &mut ctx,
            Position::new(5, 5),
            Position::new(40, 40),
            Rect::new(1, 1, 50, 50),
        );
        assert_eq!(style, CorridorStyle::Simple);
    }

    #[test]
    fn test_winding_waypoints_stay_in_bounds() {
        let mut config = GenerationConfig::for_testing(11);
        config.corridor_winding_factor = 1.0;
        config.winding_jitter = 6;
        let mut ctx = GenerationContext::new(config, StdRng::seed_from_u64(11));
        let bounds = Rect::new(4, 4, 20, 20);

        for _ in 0..50 {
            let style = choose_style(&mut ctx, Position::new(5, 5), Position::new(22, 22), bounds);
            let CorridorStyle::Winding { width, waypoints } = style else {
                panic!("winding factor 1.0 must always wind");
            };
            assert!((1..=3).contains(&width));
            assert!((1..=3).contains(&waypoints.len()));
            assert!(waypoints.iter().all(|&pos| bounds.contains(pos)));
        }
    }

    #[test]
    fn test_waypoints_avoid_boss_zone_when_possible() {
        let mut config = GenerationConfig::for_testing(2);
        config.corridor_winding_factor = 1.0;
        config.winding_jitter = 1;
        let mut ctx = GenerationContext::new(config, StdRng::seed_from_u64(2));
        let boss = ctx.push_room(Room::new(RoomId(0), RoomRole::Boss, Rect::new(20, 10, 4, 4)));
        ctx.boss = Some(BossRoomState {
            room: boss,
            lock: BossLock::Locked,
            barriers: Vec::new(),
        });
        let zone = ctx.boss_zone().unwrap();

        // The straight-line midpoint sits inside the zone; growing jitter
        // eventually escapes it.
        let bounds = Rect::new(1, 1, 54, 54);
        let mut escaped = 0;
        for _ in 0..20 {
            if let CorridorStyle::Winding { waypoints, .. } =
                choose_style(&mut ctx, Position::new(21, 2), Position::new(21, 22), bounds)
            {
                escaped += waypoints.iter().filter(|&&pos| !zone.contains(pos)).count();
            }
        }
        assert!(escaped > 0);
    }

    fn locked_boss_context(seed: u64) -> GenerationContext {
        let mut config = GenerationConfig::for_testing(seed);
        config.corridor_winding_factor = 1.0;
        config.winding_jitter = 0;
        config.waypoint_retry_limit = 1;
        let mut ctx = GenerationContext::new(config, StdRng::seed_from_u64(seed));
        let boss = ctx.push_room(Room::new(RoomId(0), RoomRole::Boss, Rect::new(20, 20, 6, 6)));
        ctx.boss = Some(BossRoomState {
            room: boss,
            lock: BossLock::Locked,
            barriers: Vec::new(),
        });
        ctx
    }

    #[test]
    fn test_exhausted_retries_keep_the_waypoint() {
        let mut ctx = locked_boss_context(8);
        let zone = ctx.boss_zone().unwrap();

        for _ in 0..20 {
            let style = choose_style(&mut ctx, Position::new(19, 19), Position::new(26, 26), zone);
            let CorridorStyle::Winding { waypoints, .. } = style else {
                panic!("winding factor 1.0 must always wind");
            };
            assert!(!waypoints.is_empty());
            assert!(waypoints.iter().all(|&pos| zone.contains(pos)));
        }
    }

    #[test]
    fn test_links_never_carve_into_locked_zone() -> UndercroftResult<()> {
        use crate::generation::connectivity::{connect_points, CorridorRequest};
        use crate::generation::rooms::carve_room;

        let mut ctx = locked_boss_context(9);
        let zone = ctx.boss_zone().unwrap();
        let west = ctx.push_room(Room::new(RoomId(0), RoomRole::Normal, Rect::new(4, 21, 5, 5)));
        let east = ctx.push_room(Room::new(RoomId(0), RoomRole::Normal, Rect::new(40, 21, 5, 5)));
        for id in [west, east] {
            carve_room(&mut ctx.grid, &ctx.rooms[id.0])?;
        }
        let before = ctx.grid.clone();

        let request = CorridorRequest {
            start: ctx.rooms[west.0].anchor(),
            goal: ctx.rooms[east.0].anchor(),
            endpoints: vec![west, east],
            extra_allowed: Vec::new(),
            kind: TileKind::NonEssentialFloor,
        };
        let carved = connect_points(&mut ctx, &request, true)?;

        assert!(carved.is_some_and(|tiles| tiles > 0));
        for pos in zone.positions() {
            assert_eq!(ctx.grid.get(pos), before.get(pos), "{pos:?}");
        }
        Ok(())
    }
}
