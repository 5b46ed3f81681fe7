use clap::{Parser, Subcommand};
use pcb_common::db::core::{Board, BoardDescription};
use pcb_common::util::config::Config;
use pcb_common::util::{check, generator, logger, visualization};
use pcb_router::AutorouteEngine;
use pcb_router::batch::route_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Autoroutes all open nets of a board.
    Route {
        #[arg(long)]
        board: Option<String>,
    },
    /// Writes a random board with two pin nets and keepouts.
    Generate {
        #[arg(long, default_value_t = 20)]
        nets: usize,
        #[arg(long, default_value_t = 10)]
        obstacles: usize,
        #[arg(long, default_value_t = 0)]
        size: i64,
        #[arg(long, default_value = "inputs/board.toml")]
        output: String,
    },
    /// Verifies clearance and connectivity of a board.
    Check {
        #[arg(long)]
        board: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();

    let config = if args.config.exists() {
        log::info!("Loading configuration from {:?}", args.config);
        let config_str = std::fs::read_to_string(&args.config)
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;
        toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?
    } else {
        log::warn!(
            "Configuration file {:?} not found. Using internal defaults.",
            args.config
        );
        Config::default()
    };

    let command = args.command.unwrap_or(Commands::Route { board: None });

    match command {
        Commands::Generate {
            nets,
            obstacles,
            size,
            output,
        } => {
            prepare_output_dir(&output)?;
            let description = generator::generate_random_board(nets, obstacles, size);
            save_board(&description, &output)?;
            log::info!("Generated: {}", output);
        }
        Commands::Route { board } => {
            let path = board.unwrap_or_else(|| config.input.board_file.clone());
            if let Err(e) = run_routing(&config, &path) {
                log::error!("{e}");
                std::process::exit(1);
            }
        }
        Commands::Check { board } => {
            let path = board.unwrap_or_else(|| config.output.routed_board.clone());
            let board = load_board(&path)?;
            check::run(&board).map_err(|e| anyhow::anyhow!("Verification Failed: {}", e))?;
        }
    }

    Ok(())
}

fn prepare_output_dir(path_str: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(path_str).parent() {
        if !parent.exists() && !parent.as_os_str().is_empty() {
            log::info!("Creating output directory: {:?}", parent);
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn load_board(path: &str) -> anyhow::Result<Board> {
    if !Path::new(path).exists() {
        return Err(anyhow::anyhow!("Input board file missing: {}", path));
    }
    log::info!("Reading board: {}", path);
    let text = std::fs::read_to_string(path)?;
    let description: BoardDescription =
        toml::from_str(&text).map_err(|e| anyhow::anyhow!("Invalid board in '{}': {}", path, e))?;
    Board::from_description(&description).map_err(|e| anyhow::anyhow!("Invalid board in '{}': {}", path, e))
}

fn save_board(description: &BoardDescription, path: &str) -> anyhow::Result<()> {
    let text = toml::to_string(description)?;
    std::fs::write(path, text)?;
    Ok(())
}

fn run_routing(config: &Config, board_path: &str) -> anyhow::Result<()> {
    let board = load_board(board_path)?;
    log::info!(
        "Board: {} layers, {} nets, {} items",
        board.layer_count(),
        board.net_names.len(),
        board.item_count()
    );

    let mut engine = AutorouteEngine::new(board, &config.autoroute);
    let report = route_all(&mut engine, &config.autoroute, Arc::new(AtomicBool::new(false)));
    log::info!(
        "Routed {} connections in {} passes, {} items ripped up",
        report.routed,
        report.passes,
        report.ripped
    );

    let rooms = if config.output.draw_rooms {
        engine.room_shapes()
    } else {
        Vec::new()
    };
    let board = engine.into_board();

    prepare_output_dir(&config.output.image)?;
    log::info!("Generating routed visualization...");
    visualization::draw_board(&board, &rooms, &config.output.image, config.output.image_size)?;

    prepare_output_dir(&config.output.routed_board)?;
    log::info!("Writing routed board to {}", config.output.routed_board);
    save_board(&board.to_description(), &config.output.routed_board)?;

    check::run(&board).map_err(|e| anyhow::anyhow!("Verification Failed: {}", e))?;
    Ok(())
}
