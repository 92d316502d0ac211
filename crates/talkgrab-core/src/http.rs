//! HTTP client seam and curl-backed implementation.
//!
//! The downloader and calendar fetch consume the [`HttpClient`] trait; the
//! production implementation drives a blocking curl transfer on a worker
//! thread and hands the body back through a channel-backed reader, so
//! callers can pull the response in fixed-size chunks with `io::Read`.

use std::cell::RefCell;
use std::io::{self, Read};
use std::rc::Rc;
use std::str;
use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use thiserror::Error;

/// Buffered body chunks in flight between the transfer thread and the reader.
const BODY_CHANNEL_DEPTH: usize = 16;

/// Errors issuing a GET or reading its response.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The URL could not be parsed or uses an unsupported scheme.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The transfer failed before the response headers were available.
    #[error("GET {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The server answered with an error status.
    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u32 },

    /// The response body failed mid-stream.
    #[error("reading body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: io::Error,
    },
}

/// A streaming GET response.
///
/// `content_length` is the Content-Length of this response: the remaining
/// bytes when the server honored a range request, the full resource size
/// otherwise, `None` when the header is absent. `has_content_range` is
/// true iff a Content-Range header was present (the resume signal).
pub struct HttpResponse {
    pub status: u32,
    pub content_length: Option<u64>,
    pub has_content_range: bool,
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .field("has_content_range", &self.has_content_range)
            .field("body", &"<stream>")
            .finish()
    }
}

/// Blocking HTTP GET capability.
pub trait HttpClient {
    /// Issues a GET for `url`. When `resume_from` is `Some(offset)`, the
    /// request carries `Range: bytes=<offset>-`.
    ///
    /// Implementations return `Err` for error statuses, so a returned
    /// response always carries a readable (possibly empty) body.
    fn get(&self, url: &str, resume_from: Option<u64>) -> Result<HttpResponse, RequestError>;
}

/// Response metadata parsed from the collected header lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResponseMeta {
    status: u32,
    content_length: Option<u64>,
    has_content_range: bool,
}

/// Parse collected header lines (status line first) into ResponseMeta.
fn parse_meta(lines: &[String]) -> ResponseMeta {
    let mut status = 0u32;
    let mut content_length = None;
    let mut has_content_range = false;

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("HTTP/") {
            if let Some(code) = rest.split_whitespace().nth(1) {
                status = code.parse().unwrap_or(0);
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.parse::<u64>() {
                    content_length = Some(n);
                }
            }
            if name.eq_ignore_ascii_case("content-range") {
                has_content_range = true;
            }
        }
    }

    ResponseMeta {
        status,
        content_length,
        has_content_range,
    }
}

/// Curl-backed [`HttpClient`] with blocking, streaming responses.
pub struct CurlClient {
    connect_timeout: Duration,
    transfer_timeout: Duration,
    recv_buffer: usize,
}

impl CurlClient {
    /// `recv_buffer` sizes curl's receive buffer, bounding the chunk sizes
    /// surfaced to the body reader.
    pub fn new(recv_buffer: usize) -> Self {
        CurlClient {
            connect_timeout: Duration::from_secs(30),
            transfer_timeout: Duration::from_secs(3600),
            recv_buffer,
        }
    }
}

impl HttpClient for CurlClient {
    fn get(&self, url: &str, resume_from: Option<u64>) -> Result<HttpResponse, RequestError> {
        let parsed = url::Url::parse(url).map_err(|e| RequestError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(RequestError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme {:?}", parsed.scheme()),
            });
        }

        let (meta_tx, meta_rx) = mpsc::sync_channel::<Result<ResponseMeta, String>>(1);
        let (body_tx, body_rx) = mpsc::sync_channel::<io::Result<Vec<u8>>>(BODY_CHANNEL_DEPTH);

        let u = url.to_string();
        let connect_timeout = self.connect_timeout;
        let transfer_timeout = self.transfer_timeout;
        let recv_buffer = self.recv_buffer;
        thread::spawn(move || {
            let state = Rc::new(RefCell::new(TransferState::default()));
            let result = run_transfer(
                &u,
                resume_from,
                connect_timeout,
                transfer_timeout,
                recv_buffer,
                &state,
                &meta_tx,
                &body_tx,
            );
            if let Err(e) = result {
                let message = e.to_string();
                // Before the headers were delivered this is a request-level
                // failure; after, the reader learns about it as a body error.
                if state.borrow().meta_sent {
                    let _ = body_tx.send(Err(io::Error::new(io::ErrorKind::Other, message)));
                } else {
                    let _ = meta_tx.send(Err(message));
                }
            }
        });

        let meta = match meta_rx.recv() {
            Ok(Ok(meta)) => meta,
            Ok(Err(message)) => {
                return Err(RequestError::Transport {
                    url: url.to_string(),
                    message,
                })
            }
            Err(_) => {
                return Err(RequestError::Transport {
                    url: url.to_string(),
                    message: "transfer ended before response headers".to_string(),
                })
            }
        };

        if !(200..300).contains(&meta.status) {
            return Err(RequestError::Status {
                url: url.to_string(),
                status: meta.status,
            });
        }

        Ok(HttpResponse {
            status: meta.status,
            content_length: meta.content_length,
            has_content_range: meta.has_content_range,
            body: Box::new(ChannelBody::new(body_rx)),
        })
    }
}

#[derive(Default)]
struct TransferState {
    header_lines: Vec<String>,
    meta_sent: bool,
}

/// Runs the curl transfer, sending parsed header metadata once and then
/// body chunks. Dropping the receiving ends aborts the transfer.
fn run_transfer(
    url: &str,
    resume_from: Option<u64>,
    connect_timeout: Duration,
    transfer_timeout: Duration,
    recv_buffer: usize,
    state: &Rc<RefCell<TransferState>>,
    meta_tx: &SyncSender<Result<ResponseMeta, String>>,
    body_tx: &SyncSender<io::Result<Vec<u8>>>,
) -> Result<(), curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(connect_timeout)?;
    easy.timeout(transfer_timeout)?;
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(Duration::from_secs(60))?;
    easy.buffer_size(recv_buffer)?;

    if let Some(offset) = resume_from {
        let mut list = curl::easy::List::new();
        list.append(&format!("Range: bytes={}-", offset))?;
        easy.http_headers(list)?;
    }

    {
        let mut transfer = easy.transfer();

        let st = Rc::clone(state);
        transfer.header_function(move |data| {
            if let Ok(line) = str::from_utf8(data) {
                let mut st = st.borrow_mut();
                // A new status line starts the headers of the next response
                // in a redirect chain; earlier ones are obsolete.
                if line.starts_with("HTTP/") {
                    st.header_lines.clear();
                }
                st.header_lines.push(line.trim_end().to_string());
            }
            true
        })?;

        let st = Rc::clone(state);
        let meta_tx = meta_tx.clone();
        let body_tx = body_tx.clone();
        transfer.write_function(move |data| {
            {
                let mut st = st.borrow_mut();
                if !st.meta_sent {
                    if meta_tx.send(Ok(parse_meta(&st.header_lines))).is_err() {
                        return Ok(0); // receiver gone, abort
                    }
                    st.meta_sent = true;
                }
            }
            if body_tx.send(Ok(data.to_vec())).is_err() {
                return Ok(0);
            }
            Ok(data.len())
        })?;

        transfer.perform()?;
    }

    // Empty body: headers arrived but the write callback never fired.
    let mut st = state.borrow_mut();
    if !st.meta_sent {
        let _ = meta_tx.send(Ok(parse_meta(&st.header_lines)));
        st.meta_sent = true;
    }
    Ok(())
}

/// Pull-based reader over the body chunk channel. A dropped sender is end
/// of stream; an error chunk surfaces as the read error.
struct ChannelBody {
    rx: Receiver<io::Result<Vec<u8>>>,
    pending: Vec<u8>,
    pos: usize,
    done: bool,
}

impl ChannelBody {
    fn new(rx: Receiver<io::Result<Vec<u8>>>) -> Self {
        ChannelBody {
            rx,
            pending: Vec::new(),
            pos: 0,
            done: false,
        }
    }
}

impl Read for ChannelBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.pending.len() {
                let n = (self.pending.len() - self.pos).min(buf.len());
                buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if self.done {
                return Ok(0);
            }
            match self.rx.recv() {
                Ok(Ok(chunk)) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
                Ok(Err(e)) => {
                    self.done = true;
                    return Err(e);
                }
                Err(_) => {
                    self.done = true;
                    return Ok(0);
                }
            }
        }
    }
}
