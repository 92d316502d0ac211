//! `talkgrab fetch` – download talk videos and metadata, resuming partials.

use anyhow::{Context, Result};
use std::path::PathBuf;
use talkgrab_core::calendar::{self, Talk, TalkStats};
use talkgrab_core::config::TalkgrabConfig;
use talkgrab_core::downloader::{self, DownloadTarget, TransferOutcome};
use talkgrab_core::filename::talk_filename;
use talkgrab_core::http::HttpClient;
use talkgrab_core::metadata;
use talkgrab_core::progress::NullProgress;

use super::list::{print_stats, print_talk_summary};
use crate::cli::progress::ConsoleProgress;

pub fn run_fetch(
    client: &dyn HttpClient,
    cfg: &TalkgrabConfig,
    talks: &[Talk],
    requested: &[u64],
    store_metadata: bool,
    download_dir: Option<PathBuf>,
    report_progress: bool,
) -> Result<()> {
    let selected = if requested.is_empty() {
        talks.to_vec()
    } else {
        calendar::select_talks(talks, requested)?
    };

    let dir = match download_dir.or_else(|| cfg.download_dir.clone()) {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolve download directory")?,
    };

    println!("> Downloading {} talks...", selected.len());
    for talk in &selected {
        print_talk_summary(talk);

        if store_metadata {
            let path = metadata::write_metadata(talk, &dir)?;
            println!("> Saved talk {} metadata to {}", talk.id, path.display());
        }

        let Some(video_page) = talk.video.as_deref() else {
            continue;
        };
        let url = calendar::video_file_url(video_page, &cfg.video_url_suffix);
        let path = dir.join(format!("{}.mp4", talk_filename(&talk.title)));
        println!(
            "> Fetching talk {} video at {} to {}",
            talk.id,
            url,
            path.display()
        );

        let target = DownloadTarget { url, path };
        let result = if report_progress {
            let mut progress = ConsoleProgress::new();
            downloader::download(client, &target, cfg.buffer_bytes, &mut progress)
        } else {
            downloader::download(client, &target, cfg.buffer_bytes, &mut NullProgress)
        };

        // A failed video download is reported; the rest of the batch
        // continues, and the partial file stays resumable.
        match result {
            Ok(r) if r.outcome == TransferOutcome::AlreadyComplete => {
                println!(
                    "> File {} is already here. Skipping download",
                    target.path.display()
                );
            }
            Ok(r) => {
                tracing::info!(
                    talk = talk.id,
                    bytes = r.bytes_written,
                    path = %target.path.display(),
                    "video downloaded"
                );
            }
            Err(err) => {
                tracing::warn!(talk = talk.id, %err, "video download failed");
                eprintln!("> Error downloading {}: {}", target.url, err);
            }
        }
    }

    print_stats(&TalkStats::collect(&selected));
    Ok(())
}
