//! shardcache CLI
//!
//! Command-line interface for inspecting and filling a cache directory.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shardcache::{ByteCache, Config, LoadMode, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// shardcache CLI
#[derive(Parser, Debug)]
#[command(name = "shardcache")]
#[command(about = "Content-addressed byte cache with self-splitting shards")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./shardcache_data")]
    data_dir: String,

    /// Max entries per shard before it splits
    #[arg(short, long, default_value = "4096")]
    threshold: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Cache the contents of a file under an identifier
    Store {
        /// The identifier (e.g. a URL)
        identifier: String,

        /// File whose bytes are cached
        file: PathBuf,
    },

    /// Print or write the payload cached under an identifier
    Fetch {
        /// The identifier to fetch
        identifier: String,

        /// Write the payload here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report whether an identifier is cached
    Check {
        /// The identifier to check
        identifier: String,
    },

    /// Show shard tree statistics
    Stats,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,shardcache=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .split_threshold(args.threshold)
        .open_mode(LoadMode::IndexOnly)
        .build();

    let mut cache = ByteCache::open(config)?;

    match args.command {
        Commands::Store { identifier, file } => {
            let payload = fs::read(&file)?;
            cache.store(&identifier, &payload)?;
            cache.close()?;
            println!("stored {} bytes under {}", payload.len(), identifier);
        }
        Commands::Fetch { identifier, output } => match cache.fetch(&identifier)? {
            Some(payload) => match output {
                Some(path) => fs::write(path, &payload)?,
                None => std::io::stdout().write_all(&payload)?,
            },
            None => {
                println!("not cached: {}", identifier);
            }
        },
        Commands::Check { identifier } => {
            let cached = cache.is_cached(&identifier)?;
            println!("{}", if cached { "cached" } else { "not cached" });
        }
        Commands::Stats => {
            let stats = cache.stats();
            println!("leaves:    {}", stats.leaf_count);
            println!("internal:  {}", stats.internal_count);
            println!("depth:     {}", stats.depth);
            println!("entries:   {}", stats.resident_entries);
        }
    }

    Ok(())
}
