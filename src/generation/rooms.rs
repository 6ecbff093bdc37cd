//! # Room Placement
//!
//! Rolls a room for each free cell, shapes it with exclusion masks and
//! carves it. Each room is then tied to its cell center with a short stub so
//! it joins the backbone.

use super::utils::roll_percent;
use super::{corridors, Decoration, GenerationContext, Room, RoomCorner, RoomId, RoomRole, RoomShape};
use crate::config::{MIN_ROOM_HEIGHT, MIN_ROOM_WIDTH};
use crate::grid::{Position, Rect, TileGrid};
use crate::UndercroftResult;
use log::{debug, warn};
use rand::Rng;

/// Places rooms in free cells and guarantees at least one ordinary room.
///
/// Returns the number of rooms placed.
pub fn place_rooms(ctx: &mut GenerationContext) -> UndercroftResult<usize> {
    let mut placed = 0;

    for (x, y) in ctx.cells.free_cells() {
        if roll_percent(&mut ctx.rng, ctx.config.room_chance_percent) {
            let shape = choose_shape(ctx);
            create_room(ctx, (x, y), shape)?;
            placed += 1;
        }
    }

    if ensure_minimum_rooms(ctx)? {
        placed += 1;
    }

    debug!(
        "Placed {} rooms ({} special-shaped)",
        placed,
        ctx.normal_rooms().filter(|room| room.is_special_shape()).count()
    );
    Ok(placed)
}

/// Adds a plain room to the first free cell when no cell rolled one.
///
/// Returns whether a fallback room was added.
pub fn ensure_minimum_rooms(ctx: &mut GenerationContext) -> UndercroftResult<bool> {
    if ctx.normal_rooms().next().is_some() {
        return Ok(false);
    }
    let Some(&cell) = ctx.cells.free_cells().first() else {
        warn!("No free cell for a fallback room");
        return Ok(false);
    };

    debug!("No room rolled; adding a fallback room in cell {:?}", cell);
    create_room(ctx, cell, RoomShape::Rectangle)?;
    Ok(true)
}

/// Picks a plain rectangle or, when room variety triggers, one of the four
/// special shapes.
fn choose_shape(ctx: &mut GenerationContext) -> RoomShape {
    if !ctx.config.enable_room_variety
        || !roll_percent(&mut ctx.rng, ctx.config.special_shaped_room_chance)
    {
        return RoomShape::Rectangle;
    }

    match ctx.rng.gen_range(0..4) {
        0 => {
            let cut = match (ctx.rng.gen_bool(0.5), ctx.rng.gen_bool(0.5)) {
                (false, false) => RoomCorner::TopLeft,
                (true, false) => RoomCorner::TopRight,
                (false, true) => RoomCorner::BottomLeft,
                (true, true) => RoomCorner::BottomRight,
            };
            RoomShape::LShape { cut }
        }
        1 => RoomShape::PseudoCircular,
        2 => RoomShape::Cross,
        _ => RoomShape::Decorated,
    }
}

/// Sizes, shapes, carves and stubs one room inside a cell.
fn create_room(ctx: &mut GenerationContext, cell: (i32, i32), shape: RoomShape) -> UndercroftResult<RoomId> {
    let cell_rect = ctx.cells.cell_rect(cell.0, cell.1);
    let max_width = ctx.config.cell_width - 1;
    let max_height = ctx.config.cell_height - 1;

    let mut width = ctx.rng.gen_range(MIN_ROOM_WIDTH..=max_width);
    let mut height = ctx.rng.gen_range(MIN_ROOM_HEIGHT..=max_height);
    if shape == RoomShape::PseudoCircular && (width - height).abs() > 2 {
        let side = (width + height) / 2;
        width = side.min(max_width);
        height = side.min(max_height);
    }

    let x = ctx
        .rng
        .gen_range(cell_rect.x + 1..=cell_rect.x + ctx.config.cell_width - width);
    let y = ctx
        .rng
        .gen_range(cell_rect.y + 1..=cell_rect.y + ctx.config.cell_height - height);
    let bounds = Rect::new(x, y, width, height);

    let mut room = Room::new(RoomId(0), RoomRole::Normal, bounds);
    room.shape = shape;
    room.cell = Some(cell);
    room.excluded_areas = excluded_areas(&bounds, shape);
    if shape == RoomShape::Decorated {
        room.decorations = roll_decorations(ctx, &bounds);
    }

    let decorations = room.decorations.clone();
    let id = ctx.push_room(room);
    ctx.decorations.extend(decorations);
    if let Some(slot) = ctx.cells.get_mut(cell.0, cell.1) {
        slot.room = Some(id);
    }

    let anchor = ctx.rooms[id.0].anchor();
    carve_room(&mut ctx.grid, &ctx.rooms[id.0])?;
    let center = ctx.cells.cell_center(cell.0, cell.1);
    corridors::carve_stub(ctx, center, anchor)?;

    Ok(id)
}

/// Cut-outs that turn the bounding rectangle into the requested shape.
pub fn excluded_areas(bounds: &Rect, shape: RoomShape) -> Vec<Rect> {
    let corners = |cut_w: i32, cut_h: i32| {
        vec![
            Rect::new(bounds.x, bounds.y, cut_w, cut_h),
            Rect::new(bounds.right() - cut_w + 1, bounds.y, cut_w, cut_h),
            Rect::new(bounds.x, bounds.bottom() - cut_h + 1, cut_w, cut_h),
            Rect::new(
                bounds.right() - cut_w + 1,
                bounds.bottom() - cut_h + 1,
                cut_w,
                cut_h,
            ),
        ]
    };

    match shape {
        RoomShape::Rectangle | RoomShape::Decorated => Vec::new(),
        RoomShape::LShape { cut } => {
            let cut_w = bounds.width / 2;
            let cut_h = bounds.height / 2;
            let x = match cut {
                RoomCorner::TopLeft | RoomCorner::BottomLeft => bounds.x,
                RoomCorner::TopRight | RoomCorner::BottomRight => bounds.right() - cut_w + 1,
            };
            let y = match cut {
                RoomCorner::TopLeft | RoomCorner::TopRight => bounds.y,
                RoomCorner::BottomLeft | RoomCorner::BottomRight => bounds.bottom() - cut_h + 1,
            };
            vec![Rect::new(x, y, cut_w, cut_h)]
        }
        RoomShape::PseudoCircular => {
            let cut = ((bounds.width as f64 * 0.3) as i32).max(1);
            corners(cut, cut)
        }
        RoomShape::Cross => corners((bounds.width / 3).max(1), (bounds.height / 3).max(1)),
    }
}

/// 1-3 decorations and, on a hazard roll, 1-2 hazards at interior points.
fn roll_decorations(ctx: &mut GenerationContext, bounds: &Rect) -> Vec<Decoration> {
    let interior = bounds.shrunk(1).unwrap_or(*bounds);
    let mut decorations = Vec::new();

    let mut scatter = |ctx: &mut GenerationContext, prefabs: &[String], count: usize, hazard: bool| {
        if prefabs.is_empty() {
            return;
        }
        for _ in 0..count {
            let prefab = prefabs[ctx.rng.gen_range(0..prefabs.len())].clone();
            let position = Position::new(
                ctx.rng.gen_range(interior.x..=interior.right()),
                ctx.rng.gen_range(interior.y..=interior.bottom()),
            );
            decorations.push(Decoration {
                prefab,
                position,
                hazard,
            });
        }
    };

    let prefabs = ctx.config.decoration_prefabs.clone();
    let count = ctx.rng.gen_range(1..=3);
    scatter(ctx, &prefabs, count, false);

    if roll_percent(&mut ctx.rng, ctx.config.hazard_chance_percent) {
        let hazards = ctx.config.hazard_prefabs.clone();
        let count = ctx.rng.gen_range(1..=2);
        scatter(ctx, &hazards, count, true);
    }

    decorations
}

/// Writes the room's floor kind onto every tile it contains.
pub fn carve_room(grid: &mut TileGrid, room: &Room) -> UndercroftResult<usize> {
    let kind = room.floor_kind();
    let mut carved = 0;
    for pos in room.floor_positions() {
        if grid.in_bounds(pos) {
            grid.set(pos, kind)?;
            carved += 1;
        }
    }
    Ok(carved)
}
