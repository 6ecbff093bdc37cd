//! # Grid Module
//!
//! Coordinates, directions and rectangles shared by every generation stage,
//! plus the dense tile grid the generator writes into.
//!
//! All coordinates are signed so that neighbour arithmetic at the grid edge
//! never underflows; bounds are checked at the [`TileGrid`] boundary instead.

pub mod tiles;

pub use tiles::*;

use serde::{Deserialize, Serialize};

/// Represents a 2D coordinate on the tile grid.
///
/// # Examples
///
/// ```
/// use undercroft::Position;
///
/// let pos = Position::new(10, 5);
/// assert_eq!(pos.x, 10);
/// assert_eq!(pos.y, 5);
///
/// let adjacent = pos.cardinal_adjacent_positions();
/// assert_eq!(adjacent.len(), 4);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Creates a new position with the given coordinates.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance, used for center-to-center ordering.
    ///
    /// ```
    /// use undercroft::Position;
    ///
    /// assert_eq!(Position::new(0, 0).distance_squared(Position::new(3, 4)), 25);
    /// ```
    pub fn distance_squared(self, other: Position) -> i64 {
        let dx = i64::from(self.x - other.x);
        let dy = i64::from(self.y - other.y);
        dx * dx + dy * dy
    }

    /// Returns the position shifted by the given delta.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Returns the neighbouring position one step in `direction`.
    pub fn step(self, direction: Direction) -> Self {
        self + direction.to_delta()
    }

    /// Returns all 8 adjacent positions (including diagonals).
    pub fn adjacent_positions(self) -> [Position; 8] {
        [
            Position::new(self.x - 1, self.y - 1), // NW
            Position::new(self.x, self.y - 1),     // N
            Position::new(self.x + 1, self.y - 1), // NE
            Position::new(self.x - 1, self.y),     // W
            Position::new(self.x + 1, self.y),     // E
            Position::new(self.x - 1, self.y + 1), // SW
            Position::new(self.x, self.y + 1),     // S
            Position::new(self.x + 1, self.y + 1), // SE
        ]
    }

    /// Returns only the 4 cardinal adjacent positions (no diagonals).
    pub fn cardinal_adjacent_positions(self) -> [Position; 4] {
        Direction::cardinal().map(|direction| self.step(direction))
    }
}

impl std::ops::Add for Position {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Position {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// Cardinal directions, also used to name the sides of a room.
///
/// North is towards `y = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Converts a direction to a position delta.
    ///
    /// # Examples
    ///
    /// ```
    /// use undercroft::{Direction, Position};
    ///
    /// assert_eq!(Direction::North.to_delta(), Position::new(0, -1));
    /// ```
    pub fn to_delta(self) -> Position {
        match self {
            Direction::North => Position::new(0, -1),
            Direction::South => Position::new(0, 1),
            Direction::East => Position::new(1, 0),
            Direction::West => Position::new(-1, 0),
        }
    }

    /// Returns the direction pointing the other way.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Whether this direction moves along the x axis.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::East | Direction::West)
    }

    /// The 4 cardinal directions, in neighbour search order.
    pub fn cardinal() -> [Direction; 4] {
        [Direction::North, Direction::West, Direction::East, Direction::South]
    }
}

/// An axis-aligned rectangle of tiles, inclusive of its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Creates a rectangle from its top-left corner and size.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Last column covered by the rectangle.
    pub fn right(&self) -> i32 {
        self.x + self.width - 1
    }

    /// Last row covered by the rectangle.
    pub fn bottom(&self) -> i32 {
        self.y + self.height - 1
    }

    /// Gets the center position of the rectangle.
    pub fn center(&self) -> Position {
        Position::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Number of tiles covered.
    pub fn area(&self) -> i32 {
        self.width.max(0) * self.height.max(0)
    }

    /// Checks if a position is inside this rectangle.
    ///
    /// # Examples
    ///
    /// ```
    /// use undercroft::{Position, Rect};
    ///
    /// let rect = Rect::new(5, 5, 10, 8);
    /// assert!(rect.contains(Position::new(7, 7)));
    /// assert!(rect.contains(Position::new(14, 12)));
    /// assert!(!rect.contains(Position::new(15, 12)));
    /// ```
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.x && pos.y >= self.y && pos.x <= self.right() && pos.y <= self.bottom()
    }

    /// Checks if this rectangle shares at least one tile with another.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    /// Returns the overlapping area, if any.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Some(Rect::new(x, y, right - x + 1, bottom - y + 1))
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x + 1, bottom - y + 1)
    }

    /// Grows the rectangle by `margin` tiles on every side.
    pub fn expanded(&self, margin: i32) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.width + margin * 2,
            self.height + margin * 2,
        )
    }

    /// Shrinks the rectangle by `margin` tiles on every side.
    ///
    /// Returns `None` when nothing would be left.
    pub fn shrunk(&self, margin: i32) -> Option<Rect> {
        let width = self.width - margin * 2;
        let height = self.height - margin * 2;
        if width <= 0 || height <= 0 {
            return None;
        }
        Some(Rect::new(self.x + margin, self.y + margin, width, height))
    }

    /// Moves a position onto the nearest tile of this rectangle.
    pub fn clamp(&self, pos: Position) -> Position {
        Position::new(
            pos.x.clamp(self.x, self.right()),
            pos.y.clamp(self.y, self.bottom()),
        )
    }

    /// Iterates every tile, row by row.
    pub fn positions(&self) -> impl Iterator<Item = Position> {
        let rect = *self;
        (rect.y..rect.y + rect.height)
            .flat_map(move |y| (rect.x..rect.x + rect.width).map(move |x| Position::new(x, y)))
    }

    /// Tiles on the outer ring of the rectangle, without duplicates.
    pub fn perimeter(&self) -> Vec<Position> {
        let mut positions = Vec::new();
        if self.width <= 0 || self.height <= 0 {
            return positions;
        }

        for x in self.x..=self.right() {
            positions.push(Position::new(x, self.y));
            if self.height > 1 {
                positions.push(Position::new(x, self.bottom()));
            }
        }
        for y in (self.y + 1)..self.bottom() {
            positions.push(Position::new(self.x, y));
            if self.width > 1 {
                positions.push(Position::new(self.right(), y));
            }
        }

        positions
    }

    /// Midpoint of one side, on the rectangle's own edge tiles.
    pub fn side_midpoint(&self, side: Direction) -> Position {
        let center = self.center();
        match side {
            Direction::North => Position::new(center.x, self.y),
            Direction::South => Position::new(center.x, self.bottom()),
            Direction::East => Position::new(self.right(), center.y),
            Direction::West => Position::new(self.x, center.y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_position_distance_squared() {
        let pos1 = Position::new(0, 0);
        let pos2 = Position::new(3, 4);
        assert_eq!(pos1.distance_squared(pos2), 25);
        assert_eq!(pos2.distance_squared(pos1), 25);
    }

    #[test]
    fn test_position_cardinal_adjacent() {
        let pos = Position::new(5, 5);
        let adjacent = pos.cardinal_adjacent_positions();
        assert!(adjacent.contains(&Position::new(5, 4))); // North
        assert!(adjacent.contains(&Position::new(4, 5))); // West
        assert!(!adjacent.contains(&Position::new(4, 4))); // No diagonal
        assert_eq!(adjacent[0], Position::new(5, 4));
        assert_eq!(adjacent[3], Position::new(5, 6));
    }

    #[test]
    fn test_position_arithmetic() {
        let pos1 = Position::new(5, 10);
        let pos2 = Position::new(3, 2);
        assert_eq!(pos1 + pos2, Position::new(8, 12));
        assert_eq!(pos1 - pos2, Position::new(2, 8));
        assert_eq!(pos1.step(Direction::West), Position::new(4, 10));
    }

    #[test]
    fn test_direction_opposite() {
        for direction in Direction::cardinal() {
            assert_eq!(direction.opposite().opposite(), direction);
            assert_eq!(
                direction.to_delta() + direction.opposite().to_delta(),
                Position::new(0, 0)
            );
        }
    }

    #[test]
    fn test_rect_geometry() {
        let rect = Rect::new(5, 5, 10, 8);
        assert_eq!(rect.right(), 14);
        assert_eq!(rect.bottom(), 12);
        assert_eq!(rect.center(), Position::new(10, 9));
        assert_eq!(rect.area(), 80);
        assert_eq!(rect.positions().count(), 80);
    }

    #[test]
    fn test_rect_intersection_and_union() {
        let a = Rect::new(0, 0, 5, 5);
        let b = Rect::new(4, 4, 5, 5);
        let c = Rect::new(5, 0, 3, 3);

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert_eq!(a.intersection(&b), Some(Rect::new(4, 4, 1, 1)));
        assert_eq!(a.intersection(&c), None);
        assert_eq!(a.union(&c), Rect::new(0, 0, 8, 5));
    }

    #[test]
    fn test_rect_expand_and_shrink() {
        let rect = Rect::new(10, 10, 4, 4);
        assert_eq!(rect.expanded(2), Rect::new(8, 8, 8, 8));
        assert_eq!(rect.shrunk(1), Some(Rect::new(11, 11, 2, 2)));
        assert_eq!(rect.shrunk(2), None);
        assert_eq!(rect.clamp(Position::new(0, 50)), Position::new(10, 13));
    }

    #[test]
    fn test_rect_perimeter_has_no_duplicates() {
        let rect = Rect::new(2, 3, 5, 4);
        let ring = rect.perimeter();
        let unique: HashSet<_> = ring.iter().copied().collect();
        assert_eq!(ring.len(), unique.len());
        assert_eq!(ring.len(), (5 * 4 - 3 * 2) as usize);
        assert!(ring.iter().all(|&pos| rect.contains(pos)));
    }

    #[test]
    fn test_rect_side_midpoints_lie_on_edges() {
        let rect = Rect::new(3, 3, 24, 11);
        assert_eq!(rect.side_midpoint(Direction::North), Position::new(15, 3));
        assert_eq!(rect.side_midpoint(Direction::South), Position::new(15, 13));
        assert_eq!(rect.side_midpoint(Direction::East), Position::new(26, 8));
        assert_eq!(rect.side_midpoint(Direction::West), Position::new(3, 8));
    }
}
