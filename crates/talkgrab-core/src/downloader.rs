//! Resumable single-file downloads.
//!
//! One call drives a whole transfer on the calling thread: probe the
//! destination file, issue a (possibly ranged) GET through the client
//! seam, decide between resume, restart, and skip from the response
//! headers, then stream the body to disk in fixed-size chunks.
//!
//! A call owns its destination file exclusively; concurrent calls against
//! distinct paths are fine, two calls against the same path are not.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::http::{HttpClient, RequestError};
use crate::progress::ProgressSink;

/// What to fetch and where to store it.
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    pub url: String,
    pub path: PathBuf,
}

/// How a successful download call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Body bytes were transferred and the file now holds the resource.
    Completed,
    /// The file already held the full resource (or the resource is empty);
    /// no body bytes were read.
    AlreadyComplete,
}

/// Outcome of a successful download call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferResult {
    /// Bytes appended during this call. Bytes surviving from an earlier
    /// attempt are not counted.
    pub bytes_written: u64,
    pub outcome: TransferOutcome,
}

/// A failed download. The destination is left in a deterministic state:
/// untouched on request failures, at whatever prefix was written before a
/// mid-transfer failure, so invoking the download again resumes safely.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("failed to {op} {path}: {source}")]
    Filesystem {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Transfer plan derived from on-disk state and response headers.
///
/// `content_length` here is the Content-Length of this response: the
/// remaining bytes when the server honored the range (Content-Range
/// present), the full resource size otherwise. `None` means the header
/// was absent; the transfer then runs to end of stream with an unknown
/// total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferPlan {
    /// Nothing to transfer; the file already holds the whole resource.
    AlreadyComplete,
    /// Append the body at the current end of file.
    Append { total: Option<u64> },
    /// The server ignored the range request: truncate the partial file and
    /// write the full body from byte zero.
    Restart { total: Option<u64> },
}

fn plan_transfer(
    bytes_on_disk: u64,
    content_length: Option<u64>,
    has_content_range: bool,
) -> TransferPlan {
    if content_length == Some(0) {
        return TransferPlan::AlreadyComplete;
    }
    if bytes_on_disk == 0 {
        return TransferPlan::Append {
            total: content_length,
        };
    }
    if has_content_range {
        return TransferPlan::Append {
            total: content_length.map(|remaining| bytes_on_disk + remaining),
        };
    }
    // Full-body reply to our range request.
    if content_length == Some(bytes_on_disk) {
        return TransferPlan::AlreadyComplete;
    }
    TransferPlan::Restart {
        total: content_length,
    }
}

/// Downloads `target.url` into `target.path`, reusing partial local
/// content when the server honors range requests.
///
/// The body is read in `buffer_size`-byte chunks; after each written chunk
/// `progress` observes `(bytes_on_disk, total)`. Every handle is released
/// on every exit path, and a failed call leaves the file resumable by a
/// later call.
pub fn download(
    client: &dyn HttpClient,
    target: &DownloadTarget,
    buffer_size: usize,
    progress: &mut dyn ProgressSink,
) -> Result<TransferResult, DownloadError> {
    let (mut file, existing_bytes) = open_destination(&target.path)?;

    let resume_from = (existing_bytes > 0).then_some(existing_bytes);
    let response = client.get(&target.url, resume_from)?;

    let plan = plan_transfer(
        existing_bytes,
        response.content_length,
        response.has_content_range,
    );
    tracing::debug!(url = %target.url, existing_bytes, ?plan, "transfer planned");

    let (mut bytes_on_disk, total) = match plan {
        TransferPlan::AlreadyComplete => {
            tracing::info!(path = %target.path.display(), "file already complete, skipping transfer");
            return Ok(TransferResult {
                bytes_written: 0,
                outcome: TransferOutcome::AlreadyComplete,
            });
        }
        TransferPlan::Append { total } => {
            if existing_bytes > 0 {
                tracing::info!(path = %target.path.display(), offset = existing_bytes, "resuming partial download");
            }
            (existing_bytes, total)
        }
        TransferPlan::Restart { total } => {
            tracing::info!(path = %target.path.display(), "server ignored range request, restarting from zero");
            file = reopen_truncated(&target.path)?;
            (0, total)
        }
    };

    let mut body = response.body;
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut bytes_written = 0u64;

    loop {
        let n = body.read(&mut buf).map_err(|source| RequestError::Body {
            url: target.url.clone(),
            source,
        })?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])
            .map_err(|source| DownloadError::Filesystem {
                op: "write",
                path: target.path.clone(),
                source,
            })?;
        bytes_on_disk += n as u64;
        bytes_written += n as u64;
        progress.on_progress(bytes_on_disk, total);
    }

    tracing::debug!(path = %target.path.display(), bytes_written, "transfer complete");
    Ok(TransferResult {
        bytes_written,
        outcome: TransferOutcome::Completed,
    })
}

/// Opens the destination for appending if it exists (returning its size),
/// or creates it empty.
fn open_destination(path: &Path) -> Result<(File, u64), DownloadError> {
    if path.exists() {
        let len = path
            .metadata()
            .map_err(|source| DownloadError::Filesystem {
                op: "stat",
                path: path.to_path_buf(),
                source,
            })?
            .len();
        let file = File::options()
            .append(true)
            .open(path)
            .map_err(|source| DownloadError::Filesystem {
                op: "open",
                path: path.to_path_buf(),
                source,
            })?;
        Ok((file, len))
    } else {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| DownloadError::Filesystem {
                op: "create",
                path: path.to_path_buf(),
                source,
            })?;
        Ok((file, 0))
    }
}

fn reopen_truncated(path: &Path) -> Result<File, DownloadError> {
    File::options()
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|source| DownloadError::Filesystem {
            op: "truncate",
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::fs;
    use std::io::{Cursor, Read};

    /// Body that must never be read; used where the contract guarantees
    /// zero body reads.
    struct NoBody;

    impl Read for NoBody {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            panic!("body must not be read");
        }
    }

    struct FakeResponse {
        status: u32,
        content_length: Option<u64>,
        has_content_range: bool,
        body: Option<Vec<u8>>,
    }

    impl FakeResponse {
        fn ok(content_length: Option<u64>, has_content_range: bool, body: &[u8]) -> Self {
            FakeResponse {
                status: 200,
                content_length,
                has_content_range,
                body: Some(body.to_vec()),
            }
        }

        fn headers_only(content_length: Option<u64>, has_content_range: bool) -> Self {
            FakeResponse {
                status: 200,
                content_length,
                has_content_range,
                body: None,
            }
        }

        fn error(status: u32) -> Self {
            FakeResponse {
                status,
                content_length: None,
                has_content_range: false,
                body: None,
            }
        }
    }

    /// Scripted client: pops one canned response per GET and records the
    /// requested resume offsets.
    struct FakeClient {
        responses: RefCell<VecDeque<FakeResponse>>,
        offsets: RefCell<Vec<Option<u64>>>,
    }

    impl FakeClient {
        fn new(responses: Vec<FakeResponse>) -> Self {
            FakeClient {
                responses: RefCell::new(responses.into()),
                offsets: RefCell::new(Vec::new()),
            }
        }
    }

    impl HttpClient for FakeClient {
        fn get(&self, url: &str, resume_from: Option<u64>) -> Result<HttpResponse, RequestError> {
            self.offsets.borrow_mut().push(resume_from);
            let r = self
                .responses
                .borrow_mut()
                .pop_front()
                .expect("unscripted GET");
            if !(200..300).contains(&r.status) {
                return Err(RequestError::Status {
                    url: url.to_string(),
                    status: r.status,
                });
            }
            let body: Box<dyn Read + Send> = match r.body {
                Some(bytes) => Box::new(Cursor::new(bytes)),
                None => Box::new(NoBody),
            };
            Ok(HttpResponse {
                status: r.status,
                content_length: r.content_length,
                has_content_range: r.has_content_range,
                body,
            })
        }
    }

    fn target_in(dir: &tempfile::TempDir) -> DownloadTarget {
        DownloadTarget {
            url: "https://example.com/talk.mp4".to_string(),
            path: dir.path().join("talk.mp4"),
        }
    }

    #[test]
    fn fresh_download_writes_all_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let target = target_in(&dir);
        let payload = vec![42u8; 1000];
        let client = FakeClient::new(vec![FakeResponse::ok(Some(1000), false, &payload)]);

        let mut progress = Vec::new();
        let result = download(&client, &target, 8192, &mut progress).unwrap();

        assert_eq!(result.outcome, TransferOutcome::Completed);
        assert_eq!(result.bytes_written, 1000);
        assert_eq!(fs::read(&target.path).unwrap(), payload);
        assert_eq!(client.offsets.borrow().as_slice(), &[None]);
        // 8192-byte buffer over a 1000-byte body: a single short read.
        assert_eq!(progress, vec![(1000, Some(1000))]);
    }

    #[test]
    fn resume_appends_remaining_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let target = target_in(&dir);
        fs::write(&target.path, vec![b'a'; 400]).unwrap();
        let remaining = vec![b'b'; 600];
        let client = FakeClient::new(vec![FakeResponse::ok(Some(600), true, &remaining)]);

        let mut progress = Vec::new();
        let result = download(&client, &target, 8192, &mut progress).unwrap();

        assert_eq!(result.outcome, TransferOutcome::Completed);
        assert_eq!(result.bytes_written, 600);
        let on_disk = fs::read(&target.path).unwrap();
        assert_eq!(on_disk.len(), 1000);
        assert_eq!(&on_disk[..400], &[b'a'; 400][..]);
        assert_eq!(&on_disk[400..], remaining.as_slice());
        assert_eq!(client.offsets.borrow().as_slice(), &[Some(400)]);
        // Total is offset + remaining, not the raw Content-Length.
        assert_eq!(progress, vec![(1000, Some(1000))]);
    }

    #[test]
    fn ignored_range_restarts_from_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let target = target_in(&dir);
        fs::write(&target.path, vec![b'x'; 400]).unwrap();
        let fresh: Vec<u8> = (0..1000).map(|i| (i % 251) as u8).collect();
        let client = FakeClient::new(vec![FakeResponse::ok(Some(1000), false, &fresh)]);

        let result = download(&client, &target, 8192, &mut crate::progress::NullProgress).unwrap();

        assert_eq!(result.outcome, TransferOutcome::Completed);
        assert_eq!(result.bytes_written, 1000);
        // Byte-identical to a fresh download, never stale + full.
        assert_eq!(fs::read(&target.path).unwrap(), fresh);
    }

    #[test]
    fn complete_file_skips_body_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let target = target_in(&dir);
        let original = vec![b'v'; 1000];
        fs::write(&target.path, &original).unwrap();
        let client = FakeClient::new(vec![FakeResponse::headers_only(Some(1000), false)]);

        let mut progress = Vec::new();
        let result = download(&client, &target, 8192, &mut progress).unwrap();

        assert_eq!(result.outcome, TransferOutcome::AlreadyComplete);
        assert_eq!(result.bytes_written, 0);
        assert_eq!(fs::read(&target.path).unwrap(), original);
        assert!(progress.is_empty());
    }

    #[test]
    fn ranged_response_with_nothing_remaining_skips() {
        let dir = tempfile::tempdir().unwrap();
        let target = target_in(&dir);
        fs::write(&target.path, vec![b'v'; 1000]).unwrap();
        let client = FakeClient::new(vec![FakeResponse::headers_only(Some(0), true)]);

        let result = download(&client, &target, 8192, &mut crate::progress::NullProgress).unwrap();
        assert_eq!(result.outcome, TransferOutcome::AlreadyComplete);
    }

    #[test]
    fn empty_resource_skips_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let target = target_in(&dir);
        let client = FakeClient::new(vec![FakeResponse::headers_only(Some(0), false)]);

        let result = download(&client, &target, 8192, &mut crate::progress::NullProgress).unwrap();

        assert_eq!(result.outcome, TransferOutcome::AlreadyComplete);
        assert_eq!(result.bytes_written, 0);
        // The probe created the (empty) destination.
        assert_eq!(fs::metadata(&target.path).unwrap().len(), 0);
    }

    #[test]
    fn request_error_leaves_partial_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let target = target_in(&dir);
        let partial = vec![b'p'; 400];
        fs::write(&target.path, &partial).unwrap();
        let client = FakeClient::new(vec![FakeResponse::error(503)]);

        let err = download(&client, &target, 8192, &mut crate::progress::NullProgress).unwrap_err();

        assert!(matches!(
            err,
            DownloadError::Request(RequestError::Status { status: 503, .. })
        ));
        assert_eq!(fs::read(&target.path).unwrap(), partial);
    }

    #[test]
    fn unknown_length_streams_to_end_of_body() {
        let dir = tempfile::tempdir().unwrap();
        let target = target_in(&dir);
        let payload = vec![9u8; 300];
        let client = FakeClient::new(vec![FakeResponse::ok(None, false, &payload)]);

        let mut progress = Vec::new();
        let result = download(&client, &target, 128, &mut progress).unwrap();

        assert_eq!(result.outcome, TransferOutcome::Completed);
        assert_eq!(result.bytes_written, 300);
        assert_eq!(fs::read(&target.path).unwrap(), payload);
        // Progress degrades to byte counts with no total.
        assert_eq!(progress, vec![(128, None), (256, None), (300, None)]);
    }

    #[test]
    fn chunked_progress_observations() {
        let dir = tempfile::tempdir().unwrap();
        let target = target_in(&dir);
        let payload = vec![1u8; 1000];
        let client = FakeClient::new(vec![FakeResponse::ok(Some(1000), false, &payload)]);

        let mut progress = Vec::new();
        download(&client, &target, 256, &mut progress).unwrap();

        assert_eq!(
            progress,
            vec![
                (256, Some(1000)),
                (512, Some(1000)),
                (768, Some(1000)),
                (1000, Some(1000)),
            ]
        );
    }

    #[test]
    fn second_invocation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = target_in(&dir);
        let payload = vec![b'z'; 1000];
        let client = FakeClient::new(vec![
            FakeResponse::ok(Some(1000), false, &payload),
            // Second GET is ranged at 1000; server ignores the range and
            // reports the full size, which equals what is on disk.
            FakeResponse::headers_only(Some(1000), false),
        ]);

        let first = download(&client, &target, 8192, &mut crate::progress::NullProgress).unwrap();
        let second = download(&client, &target, 8192, &mut crate::progress::NullProgress).unwrap();

        assert_eq!(first.outcome, TransferOutcome::Completed);
        assert_eq!(second.outcome, TransferOutcome::AlreadyComplete);
        assert_eq!(second.bytes_written, 0);
        assert_eq!(fs::read(&target.path).unwrap(), payload);
        assert_eq!(client.offsets.borrow().as_slice(), &[None, Some(1000)]);
    }

    #[test]
    fn plan_fresh_file() {
        assert_eq!(
            plan_transfer(0, Some(1000), false),
            TransferPlan::Append { total: Some(1000) }
        );
        assert_eq!(
            plan_transfer(0, None, false),
            TransferPlan::Append { total: None }
        );
    }

    #[test]
    fn plan_empty_resource() {
        assert_eq!(plan_transfer(0, Some(0), false), TransferPlan::AlreadyComplete);
        assert_eq!(plan_transfer(400, Some(0), false), TransferPlan::AlreadyComplete);
        assert_eq!(plan_transfer(400, Some(0), true), TransferPlan::AlreadyComplete);
    }

    #[test]
    fn plan_honored_range_appends_with_summed_total() {
        assert_eq!(
            plan_transfer(400, Some(600), true),
            TransferPlan::Append { total: Some(1000) }
        );
        // Remaining coincidentally equals the on-disk size: still a resume,
        // never a skip.
        assert_eq!(
            plan_transfer(400, Some(400), true),
            TransferPlan::Append { total: Some(800) }
        );
    }

    #[test]
    fn plan_ignored_range_restarts_or_skips() {
        assert_eq!(
            plan_transfer(400, Some(1000), false),
            TransferPlan::Restart { total: Some(1000) }
        );
        // Full size equals what is on disk: nothing to do.
        assert_eq!(plan_transfer(1000, Some(1000), false), TransferPlan::AlreadyComplete);
        // No Content-Length either: restart with unknown total.
        assert_eq!(
            plan_transfer(400, None, false),
            TransferPlan::Restart { total: None }
        );
    }

    #[test]
    fn plan_unknown_length_with_range() {
        assert_eq!(
            plan_transfer(400, None, true),
            TransferPlan::Append { total: None }
        );
    }
}
