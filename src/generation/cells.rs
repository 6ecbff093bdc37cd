//! # Cell Graph
//!
//! Partitions the tile grid into fixed-size cells and carves a randomized
//! depth-first spanning tree of corridors between them. The tree is the
//! backbone that keeps every free cell reachable, whether or not it later
//! receives a room.

use super::{corridors, GenerationConfig, GenerationContext, RoomId, RoomRole};
use crate::grid::{Position, Rect};
use crate::UndercroftResult;
use log::{debug, warn};
use pathfinding::prelude::bfs_reach;
use rand::Rng;
use std::collections::HashSet;

/// One partition unit of the coarse grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
    /// Reached by the spanning-tree traversal
    pub visited: bool,
    /// Room placed in this cell
    pub room: Option<RoomId>,
    /// Set for cells claimed by the boss or special room
    pub reserved: Option<RoomRole>,
}

impl Cell {
    /// Cells not claimed by a special room host rooms and backbone corridors.
    pub fn is_free(&self) -> bool {
        self.reserved.is_none()
    }
}

/// Dense `cells_x × cells_y` array of cells plus the geometry to map them
/// onto tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellGrid {
    width: i32,
    height: i32,
    cell_width: i32,
    cell_height: i32,
    buffer_x: i32,
    buffer_y: i32,
    cells: Vec<Cell>,
}

impl CellGrid {
    /// Creates unvisited, unreserved cells for the configured grid.
    pub fn new(config: &GenerationConfig) -> Self {
        let width = config.cells_x();
        let height = config.cells_y();
        let cells = (0..height)
            .flat_map(|y| {
                (0..width).map(move |x| Cell {
                    x,
                    y,
                    visited: false,
                    room: None,
                    reserved: None,
                })
            })
            .collect();

        Self {
            width,
            height,
            cell_width: config.cell_width,
            cell_height: config.cell_height,
            buffer_x: config.buffer_x,
            buffer_y: config.buffer_y,
            cells,
        }
    }

    /// Number of cell columns.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Number of cell rows.
    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    pub fn get(&self, x: i32, y: i32) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            self.cells.get((y * self.width + x) as usize)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut Cell> {
        if self.in_bounds(x, y) {
            self.cells.get_mut((y * self.width + x) as usize)
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn is_free(&self, x: i32, y: i32) -> bool {
        self.get(x, y).is_some_and(Cell::is_free)
    }

    /// Whether the cell lies in the outermost row or column.
    pub fn is_edge(&self, x: i32, y: i32) -> bool {
        x == 0 || y == 0 || x == self.width - 1 || y == self.height - 1
    }

    /// Coordinates of all free cells in row-major order.
    pub fn free_cells(&self) -> Vec<(i32, i32)> {
        self.cells
            .iter()
            .filter(|cell| cell.is_free())
            .map(|cell| (cell.x, cell.y))
            .collect()
    }

    /// Claims a cell for a special room.
    pub fn reserve(&mut self, x: i32, y: i32, role: RoomRole) {
        if let Some(cell) = self.get_mut(x, y) {
            cell.reserved = Some(role);
        }
    }

    /// Tile rectangle covered by a cell.
    pub fn cell_rect(&self, x: i32, y: i32) -> Rect {
        Rect::new(
            self.buffer_x + x * self.cell_width,
            self.buffer_y + y * self.cell_height,
            self.cell_width,
            self.cell_height,
        )
    }

    /// Center tile of a cell; backbone corridors run between these.
    pub fn cell_center(&self, x: i32, y: i32) -> Position {
        self.cell_rect(x, y).center()
    }

    /// Cells whose tile rectangle overlaps `area`.
    pub fn cells_touching(&self, area: &Rect) -> Vec<(i32, i32)> {
        self.cells
            .iter()
            .filter(|cell| self.cell_rect(cell.x, cell.y).intersects(area))
            .map(|cell| (cell.x, cell.y))
            .collect()
    }

    /// In-bounds orthogonal neighbours in up, down, left, right order.
    pub fn neighbors(&self, x: i32, y: i32) -> Vec<(i32, i32)> {
        [(x, y - 1), (x, y + 1), (x - 1, y), (x + 1, y)]
            .into_iter()
            .filter(|&(nx, ny)| self.in_bounds(nx, ny))
            .collect()
    }

    /// Whether the free cells, minus `excluded`, are non-empty and
    /// 4-connected.
    pub fn free_cells_connected(&self, excluded: &[(i32, i32)]) -> bool {
        let open: HashSet<(i32, i32)> = self
            .free_cells()
            .into_iter()
            .filter(|cell| !excluded.contains(cell))
            .collect();

        let Some(&origin) = open.iter().min() else {
            return false;
        };

        let reached = bfs_reach(origin, |&(x, y)| {
            self.neighbors(x, y)
                .into_iter()
                .filter(|cell| open.contains(cell))
                .collect::<Vec<_>>()
        })
        .count();

        reached == open.len()
    }
}

/// Carves the backbone: a randomized depth-first spanning tree over the
/// free cells, one corridor per tree edge.
///
/// Starts at cell (0, 0), or at the first free cell when that one is
/// reserved. Returns the number of corridors carved.
pub fn carve_spanning_tree(ctx: &mut GenerationContext) -> UndercroftResult<usize> {
    let origin = if ctx.cells.is_free(0, 0) {
        Some((0, 0))
    } else {
        ctx.cells.free_cells().first().copied()
    };
    let Some(origin) = origin else {
        warn!("No free cells; skipping backbone corridors");
        return Ok(0);
    };

    if let Some(cell) = ctx.cells.get_mut(origin.0, origin.1) {
        cell.visited = true;
    }
    let mut stack = vec![origin];

    while let Some(&current) = stack.last() {
        let unvisited: Vec<(i32, i32)> = ctx
            .cells
            .neighbors(current.0, current.1)
            .into_iter()
            .filter(|&(x, y)| {
                ctx.cells
                    .get(x, y)
                    .is_some_and(|cell| cell.is_free() && !cell.visited)
            })
            .collect();

        if unvisited.is_empty() {
            stack.pop();
            continue;
        }

        let next = unvisited[ctx.rng.gen_range(0..unvisited.len())];
        if let Some(cell) = ctx.cells.get_mut(next.0, next.1) {
            cell.visited = true;
        }
        corridors::carve_backbone_corridor(ctx, current, next)?;
        ctx.spanning_tree.push((current, next));
        stack.push(next);
    }

    debug!(
        "Spanning tree: {} corridors over {} free cells",
        ctx.spanning_tree.len(),
        ctx.cells.free_cells().len()
    );
    Ok(ctx.spanning_tree.len())
}
