//! Progress observation seam.

/// Receives transfer progress observations from the downloader.
///
/// `total` is the full resource size when known, `None` when the server
/// did not report a usable Content-Length. Observations are cosmetic:
/// implementations must not influence the transfer.
pub trait ProgressSink {
    fn on_progress(&mut self, bytes_on_disk: u64, total: Option<u64>);
}

/// Sink that discards all observations.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_progress(&mut self, _bytes_on_disk: u64, _total: Option<u64>) {}
}

/// Collects observations into a sequence, for callers that want the
/// history (the downloader tests assert against it).
impl ProgressSink for Vec<(u64, Option<u64>)> {
    fn on_progress(&mut self, bytes_on_disk: u64, total: Option<u64>) {
        self.push((bytes_on_disk, total));
    }
}
