//! Carriage-return progress line for the console.

use std::io::{self, Write};
use talkgrab_core::progress::ProgressSink;

/// Renders progress observations as an in-place `current/total [percent]`
/// line, falling back to a bare byte count when the total is unknown. The
/// percentage is display-only. Prints the closing newline on drop.
pub struct ConsoleProgress {
    printed: bool,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        ConsoleProgress { printed: false }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_progress(&mut self, bytes_on_disk: u64, total: Option<u64>) {
        self.printed = true;
        match total {
            Some(total) if total > 0 => {
                let pct = bytes_on_disk as f64 * 100.0 / total as f64;
                print!("\r\t{bytes_on_disk:>10}/{total:>10}  [{pct:>6.2}%]");
            }
            _ => print!("\r\t{bytes_on_disk:>10} bytes"),
        }
        let _ = io::stdout().flush();
    }
}

impl Drop for ConsoleProgress {
    fn drop(&mut self) {
        if self.printed {
            println!();
        }
    }
}
