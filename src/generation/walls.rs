//! # Wall Derivation
//!
//! Closes the finished floor layout off from the void. Walls are never
//! placed by the carving stages; this pass derives them from the floor and
//! hole tiles alone, so it can be re-run after any later carving.

use crate::grid::{Position, TileGrid, TileKind};
use crate::UndercroftResult;

/// Corner rules: diagonal offset plus the wall written there.
const CORNER_RULES: [(i32, i32, TileKind); 4] = [
    (1, -1, TileKind::WallCornerTopRight),
    (-1, -1, TileKind::WallCornerTopLeft),
    (1, 1, TileKind::WallCornerBottomRight),
    (-1, 1, TileKind::WallCornerBottomLeft),
];

/// Edge rules: orthogonal offset plus the wall written there.
const EDGE_RULES: [(i32, i32, TileKind); 4] = [
    (-1, 0, TileKind::WallLeft),
    (1, 0, TileKind::WallRight),
    (0, -1, TileKind::WallTop),
    (0, 1, TileKind::WallBottom),
];

/// Writes walls into every void tile next to a floor-family or hole tile.
///
/// Sources are scanned column by column (x outer, y inner) over the interior.
/// Per source, corner rules run before edge rules. Only void tiles are
/// written, so the first source to reach a tile decides its wall kind and
/// scan order shapes the result. Returns the number of walls written.
pub fn derive_walls(grid: &mut TileGrid) -> UndercroftResult<usize> {
    let mut written = 0;

    for x in 1..grid.width() - 1 {
        for y in 1..grid.height() - 1 {
            let source = Position::new(x, y);
            if !grid.get(source).derives_walls() {
                continue;
            }

            for (dx, dy, corner) in CORNER_RULES {
                let horizontal = source.offset(dx, 0);
                let vertical = source.offset(0, dy);
                let diagonal = source.offset(dx, dy);
                if [horizontal, vertical, diagonal]
                    .iter()
                    .all(|&pos| grid.get(pos) == TileKind::Void)
                {
                    grid.set(diagonal, corner)?;
                    written += 1;
                }
            }

            for (dx, dy, wall) in EDGE_RULES {
                let neighbor = source.offset(dx, dy);
                if grid.get(neighbor) == TileKind::Void {
                    grid.set(neighbor, wall)?;
                    written += 1;
                }
            }
        }
    }

    Ok(written)
}

/// Floor-family tiles that still touch the void orthogonally.
pub fn unwalled_floor(grid: &TileGrid) -> Vec<Position> {
    let interior = grid.interior();
    interior
        .positions()
        .filter(|&pos| grid.get(pos).is_floor_family())
        .filter(|&pos| {
            pos.cardinal_adjacent_positions()
                .iter()
                .any(|&next| grid.get(next) == TileKind::Void)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Rect;

    fn grid_with_floor(rect: Rect) -> TileGrid {
        let mut grid = TileGrid::new(12, 12);
        for pos in rect.positions() {
            grid.set(pos, TileKind::Floor).unwrap();
        }
        grid
    }

    #[test]
    fn test_rectangle_gets_full_wall_ring() -> UndercroftResult<()> {
        let mut grid = grid_with_floor(Rect::new(3, 3, 4, 3));
        derive_walls(&mut grid)?;

        assert_eq!(grid.get(Position::new(2, 2)), TileKind::WallCornerTopLeft);
        assert_eq!(grid.get(Position::new(7, 2)), TileKind::WallCornerTopRight);
        assert_eq!(grid.get(Position::new(2, 6)), TileKind::WallCornerBottomLeft);
        assert_eq!(grid.get(Position::new(7, 6)), TileKind::WallCornerBottomRight);
        assert_eq!(grid.get(Position::new(4, 2)), TileKind::WallTop);
        assert_eq!(grid.get(Position::new(4, 6)), TileKind::WallBottom);
        assert_eq!(grid.get(Position::new(2, 4)), TileKind::WallLeft);
        assert_eq!(grid.get(Position::new(7, 4)), TileKind::WallRight);

        let ring = Rect::new(2, 2, 6, 5).perimeter();
        assert!(ring.iter().all(|&pos| grid.get(pos).is_plain_wall()));
        assert!(unwalled_floor(&grid).is_empty());
        Ok(())
    }

    #[test]
    fn test_holes_are_walled_too() -> UndercroftResult<()> {
        let mut grid = TileGrid::new(6, 6);
        grid.set(Position::new(2, 2), TileKind::Hole)?;
        derive_walls(&mut grid)?;

        for pos in Position::new(2, 2).adjacent_positions() {
            assert!(grid.get(pos).is_plain_wall(), "{pos:?} is not a wall");
        }
        Ok(())
    }

    #[test]
    fn test_walls_never_overwrite_floor_or_features() -> UndercroftResult<()> {
        let mut grid = grid_with_floor(Rect::new(3, 3, 3, 3));
        grid.set(Position::new(4, 2), TileKind::CrackedWall4)?;
        grid.set(Position::new(6, 4), TileKind::NonEssentialFloor)?;
        derive_walls(&mut grid)?;

        assert_eq!(grid.get(Position::new(4, 2)), TileKind::CrackedWall4);
        assert_eq!(grid.get(Position::new(6, 4)), TileKind::NonEssentialFloor);
        assert_eq!(grid.get(Position::new(7, 4)), TileKind::WallRight);
        assert!(unwalled_floor(&grid).is_empty());
        Ok(())
    }

    #[test]
    fn test_derivation_is_stable() -> UndercroftResult<()> {
        let mut grid = grid_with_floor(Rect::new(2, 2, 5, 5));
        grid.set(Position::new(4, 4), TileKind::Void)?;
        derive_walls(&mut grid)?;
        let first = grid.clone();

        assert_eq!(derive_walls(&mut grid)?, 0);
        assert_eq!(grid, first);
        Ok(())
    }

    #[test]
    fn test_border_sources_are_ignored() -> UndercroftResult<()> {
        let mut grid = TileGrid::new(5, 5);
        grid.set(Position::new(0, 2), TileKind::Floor)?;
        assert_eq!(derive_walls(&mut grid)?, 0);
        Ok(())
    }
}
