//! Binary entrypoint for the tinyworld server.
//!
//! Commands:
//! - `start [--bind <addr>]` - load the world and accept player connections
//! - `init` - write a starter `config.toml`
//! - `check` - load and validate the configured world, then print a summary
//!
//! See the library crate docs for module-level details: `tinyworld::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};

use tinyworld::config::Config;
use tinyworld::server::WorldServer;

#[derive(Parser)]
#[command(name = "tinyworld")]
#[command(about = "A small shared text world served over TCP")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the world server
    Start {
        /// Listen address, overriding `server.bind`
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Write a default configuration file
    Init,
    /// Load the configured world and report what it contains
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { bind } => {
            let mut config = Config::load_or_default(&cli.config).await?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            init_logging(&Some(config.clone()), cli.verbose);
            info!("Starting tinyworld v{}", env!("CARGO_PKG_VERSION"));
            note_missing_config(&cli.config);
            let server = WorldServer::load(config)?;
            server.run().await?;
        }
        Commands::Init => {
            init_logging(&None, cli.verbose);
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Check => {
            init_logging(&None, cli.verbose);
            note_missing_config(&cli.config);
            let server = WorldServer::from_config_path(&cli.config).await?;
            let world = server.world();
            println!(
                "World OK: {} rooms, {} npcs, start room {}",
                world.rooms().len(),
                world.npcs().len(),
                world.start_room()
            );
            for room in world.rooms() {
                println!("  [{}] {} -> {}", room.id(), room.title(), room.exits());
            }
        }
    }

    Ok(())
}

fn note_missing_config(path: &str) {
    if !std::path::Path::new(path).exists() {
        warn!("No configuration at {}; using built-in defaults", path);
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when someone is watching it.
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!(
                "{} [{}] {}: {}",
                ts,
                record.level(),
                record.target(),
                record.args()
            );
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}: {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.target(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
