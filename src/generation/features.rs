//! # Feature Placement
//!
//! Scatters the puzzle pieces over the finished, walled layout: three
//! cracked walls, two solution hints and one carryable object. Each piece
//! is placed once. A bounded random search over roomy ordinary rooms comes
//! first, then a deterministic scan over every ordinary room. A piece with
//! no valid spot is skipped.

use super::{GenerationContext, Room, RoomId, RoomRole};
use crate::grid::{Position, TileGrid, TileKind};
use crate::UndercroftResult;
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Puzzle pieces placed outside the special room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    CrackedWall,
    CrackedWall2,
    CrackedWall3,
    CarryableObject,
    Hint1,
    Hint2,
}

impl FeatureKind {
    /// Placement order.
    pub const ALL: [FeatureKind; 6] = [
        FeatureKind::CrackedWall,
        FeatureKind::CrackedWall2,
        FeatureKind::CrackedWall3,
        FeatureKind::CarryableObject,
        FeatureKind::Hint1,
        FeatureKind::Hint2,
    ];

    pub fn tile(self) -> TileKind {
        match self {
            FeatureKind::CrackedWall => TileKind::CrackedWall,
            FeatureKind::CrackedWall2 => TileKind::CrackedWall2,
            FeatureKind::CrackedWall3 => TileKind::CrackedWall3,
            FeatureKind::CarryableObject => TileKind::CarryableObject,
            FeatureKind::Hint1 => TileKind::PuzzleSolutionHint1,
            FeatureKind::Hint2 => TileKind::PuzzleSolutionHint2,
        }
    }

    /// Whether the piece replaces a wall rather than a floor tile.
    pub fn is_wall_mounted(self) -> bool {
        self != FeatureKind::CarryableObject
    }
}

/// A feature written into the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedFeature {
    pub kind: FeatureKind,
    pub position: Position,
    /// Room the feature faces or lies in
    pub room: RoomId,
}

/// Whether `kind` may go at `pos` for `room`.
///
/// Wall pieces need a directional wall next to one of the room's ordinary
/// floor tiles. The carryable object needs a room floor tile whose eight
/// neighbours are all floor.
pub fn is_valid_spot(grid: &TileGrid, room: &Room, kind: FeatureKind, pos: Position) -> bool {
    if !grid.is_interior(pos) {
        return false;
    }
    if kind.is_wall_mounted() {
        grid.get(pos).is_edge_wall()
            && pos.cardinal_adjacent_positions().iter().any(|&next| {
                room.contains_position(next) && grid.get(next) == TileKind::Floor
            })
    } else {
        room.contains_position(pos)
            && grid.get(pos) == TileKind::Floor
            && pos
                .adjacent_positions()
                .iter()
                .all(|&next| grid.get(next) == TileKind::Floor)
    }
}

/// Places every [`FeatureKind`] once. Returns the number placed.
///
/// Runs only when the dungeon has a special room.
pub fn place_features(ctx: &mut GenerationContext) -> UndercroftResult<usize> {
    if ctx.special.is_none() {
        debug!("No special room; skipping puzzle features");
        return Ok(0);
    }

    let mut placed = 0;
    for kind in FeatureKind::ALL {
        let spot = random_spot(ctx, kind).or_else(|| fallback_spot(ctx, kind));
        match spot {
            Some((room, position)) => {
                ctx.grid.set(position, kind.tile())?;
                ctx.features.push(PlacedFeature {
                    kind,
                    position,
                    room,
                });
                placed += 1;
            }
            None => warn!("No valid spot for {:?}; skipping it", kind),
        }
    }

    debug!("Placed {} of {} puzzle features", placed, FeatureKind::ALL.len());
    Ok(placed)
}

/// Bounded random search over ordinary rooms of at least the configured
/// size.
fn random_spot(ctx: &mut GenerationContext, kind: FeatureKind) -> Option<(RoomId, Position)> {
    let min_width = ctx.config.feature_min_room_width;
    let min_height = ctx.config.feature_min_room_height;
    let rooms: Vec<RoomId> = ctx
        .rooms
        .iter()
        .filter(|room| room.role == RoomRole::Normal)
        .filter(|room| room.bounds.width >= min_width && room.bounds.height >= min_height)
        .map(|room| room.id)
        .collect();
    if rooms.is_empty() {
        return None;
    }

    for _ in 0..ctx.config.feature_placement_attempts {
        let id = rooms[ctx.rng.gen_range(0..rooms.len())];
        let area = ctx.rooms[id.0].bounds.expanded(1);
        let pos = Position::new(
            ctx.rng.gen_range(area.x..=area.right()),
            ctx.rng.gen_range(area.y..=area.bottom()),
        );
        if is_valid_spot(&ctx.grid, &ctx.rooms[id.0], kind, pos) {
            return Some((id, pos));
        }
    }
    None
}

/// First valid spot over every ordinary room, in room and row order.
fn fallback_spot(ctx: &GenerationContext, kind: FeatureKind) -> Option<(RoomId, Position)> {
    let spot = ctx.normal_rooms().find_map(|room| {
        room.bounds
            .expanded(1)
            .positions()
            .find(|&pos| is_valid_spot(&ctx.grid, room, kind, pos))
            .map(|pos| (room.id, pos))
    });
    if spot.is_some() {
        debug!("{:?} placed by the fallback scan", kind);
    }
    spot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::rooms::carve_room;
    use crate::generation::special::SpecialRoomState;
    use crate::generation::{walls, GenerationConfig};
    use crate::grid::Rect;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn walled_context(rooms: &[Rect]) -> UndercroftResult<GenerationContext> {
        let config = GenerationConfig::for_testing(5);
        let mut ctx = GenerationContext::new(config, StdRng::seed_from_u64(5));
        for &bounds in rooms {
            let id = ctx.push_room(Room::new(RoomId(0), RoomRole::Normal, bounds));
            carve_room(&mut ctx.grid, &ctx.rooms[id.0])?;
        }
        walls::derive_walls(&mut ctx.grid)?;
        Ok(ctx)
    }

    fn with_special(mut ctx: GenerationContext) -> GenerationContext {
        let id = ctx.push_room(Room::new(RoomId(0), RoomRole::Special, Rect::new(40, 40, 8, 6)));
        ctx.special = Some(SpecialRoomState {
            room: id,
            cells: [(2, 2), (3, 2)],
            entrances: Vec::new(),
            entrance_side: None,
            platform_center: None,
            connections: Vec::new(),
            islands: Vec::new(),
            cracked_wall: None,
        });
        ctx
    }

    #[test]
    fn test_valid_spots() -> UndercroftResult<()> {
        let ctx = walled_context(&[Rect::new(5, 5, 8, 6)])?;
        let room = &ctx.rooms[0];

        assert!(is_valid_spot(&ctx.grid, room, FeatureKind::CrackedWall, Position::new(8, 4)));
        assert!(!is_valid_spot(&ctx.grid, room, FeatureKind::CrackedWall, Position::new(4, 4)));
        assert!(!is_valid_spot(&ctx.grid, room, FeatureKind::Hint1, Position::new(8, 6)));

        assert!(is_valid_spot(&ctx.grid, room, FeatureKind::CarryableObject, Position::new(8, 7)));
        assert!(!is_valid_spot(&ctx.grid, room, FeatureKind::CarryableObject, Position::new(5, 7)));
        Ok(())
    }

    #[test]
    fn test_features_need_a_special_room() -> UndercroftResult<()> {
        let mut ctx = walled_context(&[Rect::new(5, 5, 8, 6)])?;
        assert_eq!(place_features(&mut ctx)?, 0);
        assert!(ctx.features.is_empty());
        Ok(())
    }

    #[test]
    fn test_places_every_feature_once() -> UndercroftResult<()> {
        let mut ctx = with_special(walled_context(&[Rect::new(5, 5, 10, 8)])?);
        assert_eq!(place_features(&mut ctx)?, FeatureKind::ALL.len());

        for kind in FeatureKind::ALL {
            assert_eq!(ctx.grid.count(kind.tile()), 1, "{kind:?}");
        }
        for feature in &ctx.features {
            assert_eq!(feature.room, RoomId(0));
            assert_eq!(ctx.grid.get(feature.position), feature.kind.tile());
        }
        assert!(walls::unwalled_floor(&ctx.grid).is_empty());
        Ok(())
    }

    #[test]
    fn test_fallback_uses_small_rooms() -> UndercroftResult<()> {
        // Below the configured minimum size, so only the fallback scan
        // can place anything.
        let mut ctx = with_special(walled_context(&[Rect::new(5, 5, 5, 2)])?);
        ctx.config.feature_placement_attempts = 0;

        let placed = place_features(&mut ctx)?;
        assert_eq!(ctx.features.len(), placed);
        assert!(ctx.features.iter().all(|feature| feature.kind.is_wall_mounted()));
        assert_eq!(placed, 5);
        assert_eq!(ctx.grid.count(TileKind::CarryableObject), 0);
        Ok(())
    }
}
