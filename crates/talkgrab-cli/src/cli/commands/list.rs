//! `talkgrab list` – print talk summaries and link stats.

use anyhow::Result;
use talkgrab_core::calendar::{Talk, TalkStats};

pub fn run_list(talks: &[Talk]) -> Result<()> {
    println!("> Listing {} talks...", talks.len());
    for talk in talks {
        print_talk_summary(talk);
    }
    print_stats(&TalkStats::collect(talks));
    Ok(())
}

pub(crate) fn print_talk_summary(talk: &Talk) {
    println!(" - {}: {}", talk.id, talk.title);
    println!("\tVideo: {}", talk.video.as_deref().unwrap_or("NA"));
    println!("\tPresentation: {}", talk.pfile.as_deref().unwrap_or("NA"));
    println!("\tSlideshare: {}", talk.slideshare.as_deref().unwrap_or("NA"));
}

pub(crate) fn print_stats(stats: &TalkStats) {
    println!(
        "> Stats: {} talks, {} videos, {} presentation files and {} slideshare links",
        stats.talks, stats.videos, stats.presentations, stats.slideshares
    );
}
