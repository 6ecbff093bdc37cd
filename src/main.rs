//! # Undercroft Command Line
//!
//! Generates a dungeon and dumps it as a character map or a JSON summary.

use clap::Parser;
use log::{error, info};
use std::collections::HashSet;
use std::process::ExitCode;
use undercroft::{generate_dungeon, Dungeon, GenerationConfig, Position, TileKind, UndercroftResult};

/// Command line arguments for the Undercroft generator.
#[derive(Parser, Debug)]
#[command(name = "undercroft")]
#[command(about = "Cell-graph dungeon generator with boss and puzzle rooms")]
#[command(version)]
struct Args {
    /// Random seed for dungeon generation
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON configuration file; command line flags override it
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Number of cell columns
    #[arg(long, requires = "cells_y")]
    cells_x: Option<i32>,

    /// Number of cell rows
    #[arg(long, requires = "cells_x")]
    cells_y: Option<i32>,

    /// Skip the boss room
    #[arg(long)]
    no_boss_room: bool,

    /// Skip the special (puzzle) room
    #[arg(long)]
    no_special_room: bool,

    /// Leave the boss room unlocked from the start
    #[arg(long)]
    no_puzzle_lock: bool,

    /// Carve only plain one-tile corridors
    #[arg(long)]
    simple_corridors: bool,

    /// Fill the holes and unlock the boss room before printing
    #[arg(long)]
    solve_puzzles: bool,

    /// Validate the layout and exit non-zero if it is broken
    #[arg(long)]
    check: bool,

    /// Print a JSON summary instead of the map
    #[arg(long)]
    summary: bool,

    /// Log level (error, warn, info, debug, trace) or a full filter string
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    initialize_logging(&args.log_level);

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system based on the specified filter.
fn initialize_logging(log_level: &str) {
    #[cfg(feature = "dev-tools")]
    {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }

    #[cfg(not(feature = "dev-tools"))]
    {
        let _ = env_logger::Builder::new()
            .parse_filters(log_level)
            .format_timestamp(None)
            .try_init();
    }
}

/// Builds the configuration from the file and flags.
fn build_config(args: &Args) -> UndercroftResult<GenerationConfig> {
    let mut config = match &args.config {
        Some(path) => GenerationConfig::load_from_file(path)?,
        None => GenerationConfig::default(),
    };

    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let (Some(cells_x), Some(cells_y)) = (args.cells_x, args.cells_y) {
        config = config.with_cell_grid(cells_x, cells_y);
    }
    if args.no_boss_room {
        config.enable_boss_room = false;
    }
    if args.no_special_room {
        config.enable_special_room = false;
    }
    if args.no_puzzle_lock {
        config.enable_puzzle_boss_room_lock = false;
    }
    if args.simple_corridors {
        config.enhanced_corridors = false;
    }

    config.validate()?;
    Ok(config)
}

/// Returns `Ok(false)` when `--check` finds a broken layout.
fn run(args: &Args) -> UndercroftResult<bool> {
    let config = build_config(args)?;
    info!("Starting Undercroft v{}", undercroft::VERSION);

    #[cfg(feature = "dev-tools")]
    let _span = tracing::info_span!("generate", seed = config.seed).entered();

    let mut dungeon = generate_dungeon(&config)?;

    if args.solve_puzzles {
        dungeon.convert_hole_tiles_to_floor();
        dungeon.update_boss_lock(&true)?;
    }

    let healthy = if args.check {
        match dungeon.validate() {
            Ok(()) => {
                info!("Layout checks passed");
                true
            }
            Err(e) => {
                error!("Layout check failed: {}", e);
                false
            }
        }
    } else {
        true
    };

    if args.summary {
        println!("{}", serde_json::to_string_pretty(&dungeon.summary())?);
    } else {
        print!("{}", render_map(&dungeon));
    }
    Ok(healthy)
}

/// Character used for a tile in the map dump.
fn glyph(kind: TileKind) -> char {
    match kind {
        TileKind::Void => ' ',
        TileKind::Floor => '.',
        TileKind::NonEssentialFloor => ',',
        TileKind::BossFloor => 'B',
        TileKind::SpecialFloor => '_',
        TileKind::WallLeft | TileKind::WallRight => '|',
        TileKind::WallTop | TileKind::WallBottom => '-',
        TileKind::WallCornerTopLeft
        | TileKind::WallCornerTopRight
        | TileKind::WallCornerBottomLeft
        | TileKind::WallCornerBottomRight => '+',
        TileKind::CrackedWall => '1',
        TileKind::CrackedWall2 => '2',
        TileKind::CrackedWall3 => '3',
        TileKind::CrackedWall4 => '4',
        TileKind::CarryableObject => 'o',
        TileKind::Hole => '~',
        TileKind::PuzzleSolutionHint1 => '?',
        TileKind::PuzzleSolutionHint2 => '!',
    }
}

/// Renders the grid row by row; barriers show as `%`.
fn render_map(dungeon: &Dungeon) -> String {
    let barriers: HashSet<Position> = dungeon.barriers().iter().copied().collect();
    let mut out = String::with_capacity(((dungeon.width() + 1) * dungeon.height()) as usize);

    for y in 0..dungeon.height() {
        let row: String = (0..dungeon.width())
            .map(|x| {
                let pos = Position::new(x, y);
                if barriers.contains(&pos) {
                    '%'
                } else {
                    glyph(dungeon.tile_at(pos))
                }
            })
            .collect();
        out.push_str(row.trim_end());
        out.push('\n');
    }
    out
}
