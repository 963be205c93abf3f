//! `mirrorscout` CLI - resolve content ids to player URLs

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::Context;

#[derive(Parser)]
#[command(name = "mirrorscout")]
#[command(about = "Resolve movies and TV episodes to embedded player URLs")]
#[command(version)]
struct Cli {
    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (default: <config dir>/mirrorscout/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an IMDb or TMDB id to a stream URL
    Resolve {
        /// Content id: tt0133093, tmdb:603, or tt0944947:1:2 for an episode
        id: String,

        /// Only query this site
        #[arg(short, long)]
        site: Option<String>,

        /// Print every link found, not just the best
        #[arg(short, long)]
        all: bool,
    },

    /// Resolve a title directly, without a metadata lookup
    Lookup {
        /// Title to search for
        #[arg(short, long)]
        title: String,

        /// Season number (series only)
        #[arg(long, requires = "episode")]
        season: Option<u32>,

        /// Episode number (series only)
        #[arg(long, requires = "season")]
        episode: Option<u32>,

        /// Only query this site
        #[arg(short, long)]
        site: Option<String>,

        /// Print every link found, not just the best
        #[arg(short, long)]
        all: bool,
    },

    /// Run OCR on a CAPTCHA image
    Captcha {
        /// Image URL
        image_url: String,
    },

    /// List configured sites
    Sites,

    /// Manage site domains
    Domains {
        #[command(subcommand)]
        action: DomainsAction,
    },

    /// Print generated browser fingerprints
    Fingerprint {
        /// Number of profiles to generate
        #[arg(short, long, default_value = "3")]
        count: usize,
    },
}

#[derive(Subcommand)]
enum DomainsAction {
    /// Refresh site domains from the configured lists
    Refresh {
        /// Show what would change without writing the sites document
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let load = || Context::load(cli.config.as_deref());

    match cli.command {
        Commands::Resolve { id, site, all } => {
            cmd::resolve::cmd_resolve(&load()?, &id, site.as_deref(), all).await?;
        }
        Commands::Lookup {
            title,
            season,
            episode,
            site,
            all,
        } => {
            let episode = season.zip(episode);
            cmd::resolve::cmd_lookup(&load()?, &title, episode, site.as_deref(), all).await?;
        }
        Commands::Captcha { image_url } => {
            cmd::captcha::cmd_captcha(&load()?, &image_url).await?;
        }
        Commands::Sites => {
            cmd::sites::cmd_sites(&load()?);
        }
        Commands::Domains {
            action: DomainsAction::Refresh { dry_run },
        } => {
            cmd::domains::cmd_refresh(&load()?, dry_run).await?;
        }
        Commands::Fingerprint { count } => {
            cmd::fingerprint::cmd_fingerprint(count);
        }
    }

    Ok(())
}
