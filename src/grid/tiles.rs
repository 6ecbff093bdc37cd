//! # Tile Model
//!
//! The closed set of tile classifications and the dense grid that stores them.

use super::{Position, Rect};
use crate::{UndercroftError, UndercroftResult};
use serde::{Deserialize, Serialize};

/// Classification of a single dungeon tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileKind {
    /// Solid rock, never written by the deriver unless next to floor
    #[default]
    Void,
    Floor,
    /// Floor laid by reinforcement corridors
    NonEssentialFloor,
    BossFloor,
    SpecialFloor,
    WallLeft,
    WallRight,
    WallTop,
    WallBottom,
    WallCornerTopLeft,
    WallCornerTopRight,
    WallCornerBottomLeft,
    WallCornerBottomRight,
    CrackedWall,
    CrackedWall2,
    CrackedWall3,
    CrackedWall4,
    CarryableObject,
    Hole,
    PuzzleSolutionHint1,
    PuzzleSolutionHint2,
}

impl TileKind {
    /// Every tile kind, in declaration order.
    pub const ALL: [TileKind; 21] = [
        TileKind::Void,
        TileKind::Floor,
        TileKind::NonEssentialFloor,
        TileKind::BossFloor,
        TileKind::SpecialFloor,
        TileKind::WallLeft,
        TileKind::WallRight,
        TileKind::WallTop,
        TileKind::WallBottom,
        TileKind::WallCornerTopLeft,
        TileKind::WallCornerTopRight,
        TileKind::WallCornerBottomLeft,
        TileKind::WallCornerBottomRight,
        TileKind::CrackedWall,
        TileKind::CrackedWall2,
        TileKind::CrackedWall3,
        TileKind::CrackedWall4,
        TileKind::CarryableObject,
        TileKind::Hole,
        TileKind::PuzzleSolutionHint1,
        TileKind::PuzzleSolutionHint2,
    ];

    /// Floor variants: ordinary, reinforcement, boss and special floor.
    pub fn is_floor_family(self) -> bool {
        matches!(
            self,
            TileKind::Floor
                | TileKind::NonEssentialFloor
                | TileKind::BossFloor
                | TileKind::SpecialFloor
        )
    }

    /// Directional and corner walls written by the wall deriver.
    pub fn is_plain_wall(self) -> bool {
        matches!(
            self,
            TileKind::WallLeft
                | TileKind::WallRight
                | TileKind::WallTop
                | TileKind::WallBottom
                | TileKind::WallCornerTopLeft
                | TileKind::WallCornerTopRight
                | TileKind::WallCornerBottomLeft
                | TileKind::WallCornerBottomRight
        )
    }

    /// Directional walls only (no corners).
    pub fn is_edge_wall(self) -> bool {
        matches!(
            self,
            TileKind::WallLeft | TileKind::WallRight | TileKind::WallTop | TileKind::WallBottom
        )
    }

    /// Walls the player can break open.
    pub fn is_cracked_wall(self) -> bool {
        matches!(
            self,
            TileKind::CrackedWall
                | TileKind::CrackedWall2
                | TileKind::CrackedWall3
                | TileKind::CrackedWall4
        )
    }

    /// Tiles that belong to the puzzle layer and must never be carved over.
    pub fn is_puzzle_feature(self) -> bool {
        self.is_cracked_wall()
            || matches!(
                self,
                TileKind::CarryableObject
                    | TileKind::PuzzleSolutionHint1
                    | TileKind::PuzzleSolutionHint2
            )
    }

    /// Tiles that take part in connectivity checks.
    ///
    /// Holes count because solving the puzzle turns them into floor.
    pub fn is_traversable(self) -> bool {
        self.is_floor_family() || matches!(self, TileKind::Hole | TileKind::CarryableObject)
    }

    /// Tiles whose void neighbours the wall deriver closes off.
    pub fn derives_walls(self) -> bool {
        self.is_floor_family() || self == TileKind::Hole
    }
}

/// Dense `width × height` grid of tile kinds.
///
/// # Examples
///
/// ```
/// use undercroft::{Position, TileGrid, TileKind};
///
/// let mut grid = TileGrid::new(10, 10);
/// grid.set(Position::new(3, 4), TileKind::Floor).unwrap();
/// assert_eq!(grid.get(Position::new(3, 4)), TileKind::Floor);
/// assert_eq!(grid.get(Position::new(-1, 4)), TileKind::Void);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    width: i32,
    height: i32,
    tiles: Vec<TileKind>,
}

impl TileGrid {
    /// Creates a grid filled with [`TileKind::Void`].
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            tiles: vec![TileKind::Void; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// The whole grid as a rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Every tile except the outermost one-tile border.
    pub fn interior(&self) -> Rect {
        Rect::new(1, 1, self.width - 2, self.height - 2)
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    /// True for in-bounds tiles that are not on the outer border.
    pub fn is_interior(&self, pos: Position) -> bool {
        pos.x >= 1 && pos.y >= 1 && pos.x < self.width - 1 && pos.y < self.height - 1
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    /// Tile kind at `pos`; out-of-range positions read as void.
    pub fn get(&self, pos: Position) -> TileKind {
        self.index(pos)
            .map(|index| self.tiles[index])
            .unwrap_or(TileKind::Void)
    }

    /// Writes a tile, failing for out-of-range positions.
    pub fn set(&mut self, pos: Position, kind: TileKind) -> UndercroftResult<()> {
        match self.index(pos) {
            Some(index) => {
                self.tiles[index] = kind;
                Ok(())
            }
            None => Err(UndercroftError::OutOfBounds {
                x: pos.x,
                y: pos.y,
                width: self.width,
                height: self.height,
            }),
        }
    }

    /// Number of tiles of the given kind.
    pub fn count(&self, kind: TileKind) -> usize {
        self.tiles.iter().filter(|&&tile| tile == kind).count()
    }

    /// Iterates `(position, kind)` pairs row by row.
    pub fn iter(&self) -> impl Iterator<Item = (Position, TileKind)> + '_ {
        self.tiles.iter().enumerate().map(move |(index, &kind)| {
            let index = index as i32;
            (Position::new(index % self.width, index / self.width), kind)
        })
    }

    /// All positions holding the given kind, row by row.
    pub fn positions_of(&self, kind: TileKind) -> Vec<Position> {
        self.iter()
            .filter(|&(_, tile)| tile == kind)
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Rewrites every `from` tile to `to`, returning how many changed.
    pub fn replace_all(&mut self, from: TileKind, to: TileKind) -> usize {
        let mut changed = 0;
        for tile in self.tiles.iter_mut().filter(|tile| **tile == from) {
            *tile = to;
            changed += 1;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_families_are_disjoint() {
        for kind in TileKind::ALL {
            let families = [
                kind.is_floor_family(),
                kind.is_plain_wall(),
                kind.is_cracked_wall(),
                kind == TileKind::Void,
                kind == TileKind::Hole,
            ];
            assert!(
                families.iter().filter(|&&member| member).count() <= 1,
                "{kind:?} belongs to more than one family"
            );
        }
    }

    #[test]
    fn test_traversable_tiles() {
        assert!(TileKind::Floor.is_traversable());
        assert!(TileKind::BossFloor.is_traversable());
        assert!(TileKind::Hole.is_traversable());
        assert!(TileKind::CarryableObject.is_traversable());
        assert!(!TileKind::Void.is_traversable());
        assert!(!TileKind::WallTop.is_traversable());
        assert!(!TileKind::CrackedWall4.is_traversable());
    }

    #[test]
    fn test_grid_bounds_checking() {
        let mut grid = TileGrid::new(5, 4);
        assert_eq!(grid.get(Position::new(5, 0)), TileKind::Void);
        assert_eq!(grid.get(Position::new(0, -1)), TileKind::Void);
        assert!(grid.set(Position::new(4, 3), TileKind::Floor).is_ok());
        assert!(matches!(
            grid.set(Position::new(5, 3), TileKind::Floor),
            Err(UndercroftError::OutOfBounds { x: 5, y: 3, .. })
        ));
        assert!(grid.is_interior(Position::new(1, 1)));
        assert!(!grid.is_interior(Position::new(4, 1)));
    }

    #[test]
    fn test_grid_iteration_order_is_row_major() {
        let mut grid = TileGrid::new(3, 2);
        grid.set(Position::new(2, 0), TileKind::Floor).unwrap();
        grid.set(Position::new(0, 1), TileKind::Floor).unwrap();
        assert_eq!(
            grid.positions_of(TileKind::Floor),
            vec![Position::new(2, 0), Position::new(0, 1)]
        );
    }

    #[test]
    fn test_replace_all_counts_changes() {
        let mut grid = TileGrid::new(4, 4);
        grid.set(Position::new(1, 1), TileKind::Hole).unwrap();
        grid.set(Position::new(2, 1), TileKind::Hole).unwrap();
        assert_eq!(grid.replace_all(TileKind::Hole, TileKind::Floor), 2);
        assert_eq!(grid.replace_all(TileKind::Hole, TileKind::Floor), 0);
        assert_eq!(grid.count(TileKind::Floor), 2);
    }
}
