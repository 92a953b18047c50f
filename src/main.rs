use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wayfarer::game::pathfinding::report_nav_error;
use wayfarer::game::smart_move::{Destination, SmartMoveHelper, Waypoint};
use wayfarer::game::{GameData, MapProcessor, NavigationConfig, Position};

/// Plan a smart-move route offline and print its waypoints
#[derive(Parser, Debug)]
#[command(name = "wayfarer")]
#[command(about = "Obstacle-aware, multi-map route planner", long_about = None)]
#[command(version)]
struct Cli {
    /// Game data JSON (maps, geometry, npcs, monsters)
    #[arg(long)]
    data: PathBuf,

    /// Navigation settings
    #[arg(long, default_value = "assets/navigation.ron")]
    config: PathBuf,

    /// Start position
    #[arg(long, num_args = 3, value_names = ["MAP", "X", "Y"], allow_negative_numbers = true)]
    from: Vec<String>,

    /// Destination: `map:x:y`, an alias, a map name or a monster type
    #[arg(long)]
    to: String,

    /// Override the map cache location from the config
    #[arg(long)]
    cache: Option<PathBuf>,
}

fn setup_file_logging() -> std::io::Result<String> {
    let log_dir = PathBuf::from("logs");
    fs::create_dir_all(&log_dir)?;

    // Keep the last 25 runs
    cleanup_old_logs(&log_dir, 25);

    let now = chrono::Local::now();
    let log_filename = format!("wayfarer_{}.log", now.format("%Y%m%d_%H%M%S"));
    let log_path_str = log_dir.join(&log_filename).to_string_lossy().to_string();

    let file_appender = RollingFileAppender::new(Rotation::NEVER, &log_dir, &log_filename);
    let file_layer = fmt::layer().with_writer(file_appender).with_ansi(false);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wayfarer=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(log_path_str)
}

fn cleanup_old_logs(log_dir: &Path, keep_count: usize) {
    if let Ok(entries) = fs::read_dir(log_dir) {
        let mut log_files: Vec<_> = entries
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|s| s.starts_with("wayfarer") && s.ends_with(".log"))
                    .unwrap_or(false)
            })
            .collect();

        // Oldest first
        log_files.sort_by_key(|e| e.metadata().ok().and_then(|m| m.modified().ok()));

        if log_files.len() > keep_count {
            for file in log_files.iter().take(log_files.len() - keep_count) {
                let _ = fs::remove_file(file.path());
            }
        }
    }
}

fn parse_start(from: &[String]) -> Result<Position, String> {
    match from {
        [map, x, y] => {
            let x = x.parse::<f64>().map_err(|e| format!("bad x '{}': {}", x, e))?;
            let y = y.parse::<f64>().map_err(|e| format!("bad y '{}': {}", y, e))?;
            Ok(Position::new(map.clone(), x, y))
        }
        _ => Err("--from takes MAP X Y".to_string()),
    }
}

fn parse_destination(to: &str) -> Destination {
    let parts: Vec<&str> = to.split(':').collect();
    if let [map, x, y] = parts.as_slice() {
        if let (Ok(x), Ok(y)) = (x.parse::<f64>(), y.parse::<f64>()) {
            return Destination::Position(Position::new(*map, x, y));
        }
    }
    Destination::Named(to.to_string())
}

fn run(cli: Cli) -> Result<(), String> {
    let mut config = NavigationConfig::load(&cli.config);
    if cli.cache.is_some() {
        config.map_cache = cli.cache;
    }

    let start = parse_start(&cli.from)?;
    let data = GameData::load(&cli.data).map_err(|e| e.to_string())?;
    let processor = MapProcessor::load_or_build(&data, &config).map_err(|e| e.to_string())?;

    let target = parse_destination(&cli.to)
        .resolve(&start.map, &data, &config)
        .map_err(|e| e.to_string())?;

    let mut helper = SmartMoveHelper::new();
    helper.init_smart_move(target.map.clone(), target.x, target.y);
    if let Err(e) = processor.plan(&start, &mut helper) {
        report_nav_error(&e);
        return Err(e.to_string());
    }

    if helper.has_multiple_destinations() {
        println!("Door path: {}", helper.door_path().join(" -> "));
    }
    println!("{} waypoints:", helper.waypoints().len());
    for (i, waypoint) in helper.waypoints().iter().enumerate() {
        match waypoint {
            Waypoint::Move(p) => println!("  {:>3}. move      ({:.1}, {:.1})", i + 1, p.x, p.y),
            Waypoint::Transport(t) => println!(
                "  {:>3}. transport at ({:.1}, {:.1}) -> {} spawn {} ({:.1}, {:.1})",
                i + 1,
                t.x,
                t.y,
                t.map,
                t.spawn,
                t.landing_x,
                t.landing_y
            ),
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match setup_file_logging() {
        Ok(log_file) => {
            println!("╔══════════════════════════════════════════════════════════╗");
            println!("║  Wayfarer - Logging to file                              ║");
            println!("╠══════════════════════════════════════════════════════════╣");
            println!("║  Log file: {:<45} ║", log_file);
            println!("╚══════════════════════════════════════════════════════════╝");
        }
        Err(e) => eprintln!("Could not set up file logging: {}", e),
    }

    match run(cli) {
        Ok(()) => {
            info!("Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
