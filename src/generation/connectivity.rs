//! # Connectivity
//!
//! Links rooms after the backbone and room stages, and measures how well
//! they are already linked.
//!
//! Every link goes through [`connect_points`], which escalates in three steps:
//!
//! 1. the configured corridor style, kept only if every tile passes the
//!    strict carving rule
//! 2. a breadth-first path under the strict rule, inside a window around the
//!    two endpoints
//! 3. for links that must exist, a breadth-first path under the relaxed rule
//!    over the whole interior
//!
//! The strict rule keeps corridors away from rooms that are not endpoints.
//! The relaxed rule may cross ordinary rooms but never holes, puzzle
//! features, the special room or a locked boss zone.

use super::corridors::{carve_tiles, choose_style, plan_corridor};
use super::utils::rooms_by_distance;
use super::{GenerationContext, Room, RoomId, RoomRole};
use crate::grid::{Position, Rect, TileGrid, TileKind};
use crate::UndercroftResult;
use log::{debug, warn};
use pathfinding::prelude::{bfs, bfs_reach};
use std::collections::{BTreeSet, HashMap};

/// Owner map over room bounding rectangles.
#[derive(Debug, Clone)]
pub struct RoomFootprints {
    width: i32,
    height: i32,
    owners: Vec<Option<RoomId>>,
}

impl RoomFootprints {
    /// Marks every tile of each room's bounding rectangle.
    pub fn new(grid: &TileGrid, rooms: &[Room]) -> Self {
        let width = grid.width();
        let height = grid.height();
        let mut owners = vec![None; width as usize * height as usize];
        for room in rooms {
            for pos in room.bounds.positions() {
                if grid.in_bounds(pos) {
                    owners[pos.y as usize * width as usize + pos.x as usize] = Some(room.id);
                }
            }
        }
        Self {
            width,
            height,
            owners,
        }
    }

    /// Room whose bounds cover `pos`.
    pub fn owner(&self, pos: Position) -> Option<RoomId> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width || pos.y >= self.height {
            return None;
        }
        self.owners[pos.y as usize * self.width as usize + pos.x as usize]
    }

    /// True when `pos` and its eight neighbours touch no room outside
    /// `endpoints`.
    pub fn halo_clear(&self, pos: Position, endpoints: &[RoomId]) -> bool {
        std::iter::once(pos)
            .chain(pos.adjacent_positions())
            .all(|tile| {
                self.owner(tile)
                    .map_or(true, |owner| endpoints.contains(&owner))
            })
    }
}

/// A corridor to carve between two points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorridorRequest {
    pub start: Position,
    pub goal: Position,
    /// Rooms the corridor may touch
    pub endpoints: Vec<RoomId>,
    /// Tiles accepted regardless of the carving rule
    pub extra_allowed: Vec<Position>,
    /// Tile written on carved void and wall tiles
    pub kind: TileKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchMode {
    Strict,
    Relaxed,
}

/// Per-tile carving rule for one request.
struct CarvePolicy<'a> {
    grid: &'a TileGrid,
    footprints: &'a RoomFootprints,
    locked_zone: Option<Rect>,
    special_bounds: Option<Rect>,
    request: &'a CorridorRequest,
    mode: SearchMode,
}

impl CarvePolicy<'_> {
    fn allows(&self, pos: Position) -> bool {
        if self.request.extra_allowed.contains(&pos) {
            return self.grid.is_interior(pos);
        }
        if !self.grid.is_interior(pos) {
            return false;
        }

        let tile = self.grid.get(pos);
        if tile == TileKind::Hole || tile == TileKind::SpecialFloor || tile.is_puzzle_feature() {
            return false;
        }
        if self.locked_zone.is_some_and(|zone| zone.contains(pos)) {
            return false;
        }
        if self.special_bounds.is_some_and(|bounds| bounds.contains(pos)) {
            return false;
        }

        match self.mode {
            SearchMode::Strict => self.footprints.halo_clear(pos, &self.request.endpoints),
            SearchMode::Relaxed => true,
        }
    }

    /// Shortest 4-connected path from the request's start to its goal,
    /// staying inside `window`.
    fn search(&self, window: Rect) -> Option<Vec<Position>> {
        let goal = self.request.goal;
        bfs(
            &self.request.start,
            |&pos| {
                pos.cardinal_adjacent_positions()
                    .into_iter()
                    .filter(|&next| window.contains(next) && self.allows(next))
                    .collect::<Vec<_>>()
            },
            |&pos| pos == goal,
        )
    }
}

/// Carves a corridor for `request`.
///
/// When `guaranteed` is set the relaxed search is tried last. Returns the
/// number of tiles written, or `None` if no acceptable path exists.
pub fn connect_points(
    ctx: &mut GenerationContext,
    request: &CorridorRequest,
    guaranteed: bool,
) -> UndercroftResult<Option<usize>> {
    let carving = ctx.carving_bounds();
    let style_bounds = carving
        .shrunk(ctx.config.corridor_max_width / 2)
        .unwrap_or(carving);
    let style = choose_style(ctx, request.start, request.goal, style_bounds);
    let planned = plan_corridor(request.start, request.goal, &style);

    let path = {
        let footprints = RoomFootprints::new(&ctx.grid, &ctx.rooms);
        let mut policy = CarvePolicy {
            grid: &ctx.grid,
            footprints: &footprints,
            locked_zone: ctx.locked_boss_zone(),
            special_bounds: ctx.special_room().map(|room| room.bounds),
            request,
            mode: SearchMode::Strict,
        };

        let reach = 2 * ctx.config.cell_width.max(ctx.config.cell_height);
        let window = Rect::new(request.start.x, request.start.y, 1, 1)
            .union(&Rect::new(request.goal.x, request.goal.y, 1, 1))
            .expanded(reach)
            .intersection(&carving)
            .unwrap_or(carving);

        if planned.iter().all(|&pos| policy.allows(pos)) {
            Some(planned)
        } else if let Some(path) = policy.search(window) {
            Some(path)
        } else if guaranteed {
            policy.mode = SearchMode::Relaxed;
            policy.search(carving)
        } else {
            None
        }
    };

    match path {
        Some(tiles) => Ok(Some(carve_tiles(&mut ctx.grid, &tiles, request.kind)?)),
        None => {
            if guaranteed {
                warn!(
                    "No corridor from {:?} to {:?} even under relaxed rules",
                    request.start, request.goal
                );
            }
            Ok(None)
        }
    }
}

/// Links two rooms anchor to anchor.
pub fn connect_rooms(
    ctx: &mut GenerationContext,
    from: RoomId,
    to: RoomId,
    kind: TileKind,
    guaranteed: bool,
) -> UndercroftResult<Option<usize>> {
    let (Some(start), Some(goal)) = (
        ctx.room(from).map(Room::anchor),
        ctx.room(to).map(Room::anchor),
    ) else {
        return Ok(None);
    };

    let request = CorridorRequest {
        start,
        goal,
        endpoints: vec![from, to],
        extra_allowed: Vec::new(),
        kind,
    };
    connect_points(ctx, &request, guaranteed)
}

/// Rooms linked to each room through floor, indexed by room id.
///
/// Two rooms are linked when their tiles touch directly or when the same
/// corridor component touches both. Corridor tiles are traversable tiles
/// outside every room; their components are labelled by flood fill. A
/// locked boss room never links to anything.
pub fn room_graph(ctx: &GenerationContext) -> Vec<BTreeSet<RoomId>> {
    let grid = &ctx.grid;
    let locked_boss = ctx
        .boss
        .as_ref()
        .filter(|_| ctx.is_boss_locked())
        .map(|boss| boss.room);

    let mut owners: HashMap<Position, RoomId> = HashMap::new();
    for room in &ctx.rooms {
        if Some(room.id) == locked_boss {
            continue;
        }
        for pos in room.floor_positions() {
            if grid.get(pos).is_traversable() {
                owners.insert(pos, room.id);
            }
        }
    }

    let is_corridor = |pos: Position| grid.get(pos).is_traversable() && !owners.contains_key(&pos);
    let mut graph = vec![BTreeSet::new(); ctx.rooms.len()];
    let mut labelled: HashMap<Position, usize> = HashMap::new();
    let mut components: Vec<BTreeSet<RoomId>> = Vec::new();

    for (pos, _) in grid.iter() {
        if !is_corridor(pos) || labelled.contains_key(&pos) {
            continue;
        }
        let label = components.len();
        let mut touching = BTreeSet::new();
        let component: Vec<Position> = bfs_reach(pos, |&tile| {
            tile.cardinal_adjacent_positions()
                .into_iter()
                .filter(|&next| is_corridor(next))
                .collect::<Vec<_>>()
        })
        .collect();

        for tile in component {
            labelled.insert(tile, label);
            for next in tile.cardinal_adjacent_positions() {
                if let Some(&room) = owners.get(&next) {
                    touching.insert(room);
                }
            }
        }
        components.push(touching);
    }

    for touching in &components {
        for &a in touching {
            for &b in touching {
                if a != b {
                    graph[a.0].insert(b);
                }
            }
        }
    }

    for (&pos, &room) in &owners {
        for next in pos.cardinal_adjacent_positions() {
            if let Some(&other) = owners.get(&next) {
                if other != room {
                    graph[room.0].insert(other);
                }
            }
        }
    }

    graph
}

/// Rooms that take part in reinforcement: ordinary rooms, plus the boss
/// room once it is unlocked.
fn reinforcement_eligible(room: &Room, boss_locked: bool) -> bool {
    match room.role {
        RoomRole::Normal => true,
        RoomRole::Boss => !boss_locked,
        RoomRole::Special => false,
    }
}

/// Rooms joined along the backbone, indexed by room id.
///
/// Two rooms are linked when the spanning tree joins their cells through
/// cells that hold no room. Rooms without a cell have no backbone links.
pub fn backbone_links(ctx: &GenerationContext) -> Vec<BTreeSet<RoomId>> {
    let mut tree: HashMap<(i32, i32), Vec<(i32, i32)>> = HashMap::new();
    for &(a, b) in &ctx.spanning_tree {
        tree.entry(a).or_default().push(b);
        tree.entry(b).or_default().push(a);
    }
    let room_at = |cell: (i32, i32)| ctx.cells.get(cell.0, cell.1).and_then(|c| c.room);

    let mut links = vec![BTreeSet::new(); ctx.rooms.len()];
    for room in &ctx.rooms {
        let Some(origin) = room.cell else {
            continue;
        };
        let reached = bfs_reach(origin, |&cell| {
            if cell != origin && room_at(cell).is_some() {
                return Vec::new();
            }
            tree.get(&cell).cloned().unwrap_or_default()
        });
        for cell in reached {
            if let Some(other) = room_at(cell).filter(|&other| other != room.id) {
                links[room.id.0].insert(other);
            }
        }
    }
    links
}

/// Adds non-essential corridors so rooms have at least one, then at least
/// two, linked neighbours.
///
/// The first pass links every room with no floor route to any other room
/// to its nearest eligible room, and must succeed. The second pass counts
/// backbone links plus the first pass's corridors, then tries the three
/// nearest unlinked rooms for each room with fewer than two. It only
/// accepts strict paths. Returns the number of corridors carved.
pub fn reinforce_connectivity(ctx: &mut GenerationContext) -> UndercroftResult<usize> {
    let boss_locked = ctx.is_boss_locked();
    let eligible: Vec<RoomId> = ctx
        .rooms
        .iter()
        .filter(|room| reinforcement_eligible(room, boss_locked))
        .map(|room| room.id)
        .collect();
    let mut carved = 0;
    let mut rescued = Vec::new();

    let mut graph = room_graph(ctx);
    for &id in &eligible {
        if !graph[id.0].is_empty() {
            continue;
        }
        let Some(center) = ctx.room(id).map(Room::center) else {
            continue;
        };
        let nearest = rooms_by_distance(&ctx.rooms, center, |room| {
            room.id != id && eligible.contains(&room.id)
        })
        .first()
        .map(|room| room.id);

        if let Some(target) = nearest {
            if connect_rooms(ctx, id, target, TileKind::NonEssentialFloor, true)?.is_some() {
                debug!("Linked isolated {} to {}", id, target);
                graph[id.0].insert(target);
                graph[target.0].insert(id);
                rescued.push((id, target));
                carved += 1;
            }
        }
    }

    let mut graph = backbone_links(ctx);
    for (a, b) in rescued {
        graph[a.0].insert(b);
        graph[b.0].insert(a);
    }
    for &id in &eligible {
        if graph[id.0].len() >= 2 {
            continue;
        }
        let Some(center) = ctx.room(id).map(Room::center) else {
            continue;
        };
        let candidates: Vec<RoomId> = rooms_by_distance(&ctx.rooms, center, |room| {
            room.id != id && eligible.contains(&room.id) && !graph[id.0].contains(&room.id)
        })
        .into_iter()
        .take(3)
        .map(|room| room.id)
        .collect();

        for target in candidates {
            if graph[id.0].len() >= 2 {
                break;
            }
            if connect_rooms(ctx, id, target, TileKind::NonEssentialFloor, false)?.is_some() {
                debug!("Reinforced {} with a corridor to {}", id, target);
                graph[id.0].insert(target);
                graph[target.0].insert(id);
                carved += 1;
            }
        }
    }

    debug!("Reinforcement carved {} corridors", carved);
    Ok(carved)
}
