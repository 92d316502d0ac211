//! CLI for the talkgrab talk downloader.

mod commands;
mod progress;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use talkgrab_core::calendar;
use talkgrab_core::config;
use talkgrab_core::http::CurlClient;

use commands::{run_fetch, run_list};

/// Top-level CLI for the talkgrab talk downloader.
#[derive(Debug, Parser)]
#[command(name = "talkgrab")]
#[command(
    about = "Downloads conference talk videos and metadata, resuming partial files",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// List available talks and their video/presentation links.
    List,

    /// Download talk videos (and metadata) to disk, resuming partial files.
    Fetch {
        /// IDs of talks to download (default: all talks).
        #[arg(long = "talks", value_name = "talk-id", num_args = 1..)]
        talks: Vec<u64>,

        /// Don't store .json files with talk metadata.
        #[arg(long)]
        discard_metadata: bool,

        /// Directory to write videos and metadata into (default: config, else cwd).
        #[arg(long, value_name = "DIR")]
        download_dir: Option<PathBuf>,

        /// Don't print per-file download progress.
        #[arg(long)]
        quiet: bool,
    },
}

pub fn run_from_args() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_or_init()?;
    tracing::debug!("loaded config: {:?}", cfg);

    let client = CurlClient::new(cfg.buffer_bytes);

    println!("> Fetching talk calendar...");
    let talks = calendar::fetch_calendar(&client, &cfg.calendar_url)
        .context("couldn't fetch talk calendar")?;

    match cli.command {
        CliCommand::List => run_list(&talks),
        CliCommand::Fetch {
            talks: ids,
            discard_metadata,
            download_dir,
            quiet,
        } => run_fetch(
            &client,
            &cfg,
            &talks,
            &ids,
            !discard_metadata,
            download_dir,
            !quiet,
        ),
    }
}

#[cfg(test)]
mod tests;
