use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use vidsrc_core::{
    bootstrap::{build_aggregator, build_fetcher, build_registry, load_config},
    logging,
    models::{EpisodeRef, ResolveRequest},
    ResolveError,
};

#[derive(Parser, Debug)]
#[command(name = "vidsrc")]
#[command(about = "Resolve playable video sources for an episode", long_about = None)]
struct Args {
    /// Config file (defaults to VIDSRC_CONFIG_PATH, then ./config.yaml)
    #[arg(long, short, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve one source through one backend, falling back when it fails
    Resolve {
        /// Episode reference, e.g. "one-piece-episode-1"
        episode: String,

        /// Backend name (registry default when omitted)
        #[arg(long, short)]
        backend: Option<String>,

        /// Exact quality, e.g. "720" (best default when omitted)
        #[arg(long, short)]
        quality: Option<String>,

        /// Keep placeholder entries and bypass the cache
        #[arg(long)]
        raw: bool,
    },

    /// Resolve through every backend concurrently
    Sources {
        episode: String,

        #[arg(long)]
        raw: bool,
    },

    /// List configured backends in registration order
    Backends,
}

#[derive(Serialize)]
struct BackendList {
    backends: Vec<String>,
    default: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration
    let config = load_config(args.config.as_deref())?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;

    match args.command {
        Command::Resolve {
            episode,
            backend,
            quality,
            raw,
        } => {
            let aggregator = build_aggregator(&config).await?;
            let mut request = ResolveRequest::new(episode).raw(raw);
            if let Some(backend) = backend {
                request = request.with_backend(backend);
            }
            if let Some(quality) = quality {
                request = request.with_quality(quality);
            }

            match aggregator.resolve(&request).await {
                Ok(resolution) => print_json(&resolution)?,
                Err(e) => fail(&e)?,
            }
        }
        Command::Sources { episode, raw } => {
            let aggregator = build_aggregator(&config).await?;
            match aggregator.resolve_all(&EpisodeRef::new(episode), raw).await {
                Ok(all) => print_json(&all)?,
                Err(e) => fail(&e)?,
            }
        }
        Command::Backends => {
            let registry = build_registry(&config, build_fetcher(&config)?)?;
            print_json(&BackendList {
                backends: registry.names(),
                default: registry.default_name().map(str::to_string),
            })?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the caller-facing error payload and exit non-zero.
fn fail(err: &ResolveError) -> Result<()> {
    info!(error = %err, "Resolution failed");
    print_json(&err.payload())?;
    std::process::exit(1);
}
