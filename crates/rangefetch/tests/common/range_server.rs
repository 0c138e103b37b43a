//! Minimal HTTP/1.1 server with HEAD and Range GET support for integration tests.
//!
//! Serves one static body under any path. Behaviour is tuned per test through
//! [`RangeServerOptions`]: Range can be ignored, HEAD refused, and GETs for a
//! given range start can be made to fail or truncate a number of times before
//! they succeed. Every request is counted in [`ServerStats`].

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RangeServerOptions {
    /// If false, HEAD returns 405 (simulates servers that block HEAD).
    pub head_allowed: bool,
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// If false, omit `Accept-Ranges: bytes` on responses.
    pub advertise_ranges: bool,
    /// If true, a HEAD with Range gets `206` and `Content-Range: bytes 0-0/total`.
    pub head_honours_range: bool,
    /// Raw `Content-Disposition` value sent on HEAD responses.
    pub content_disposition: Option<String>,
    /// GETs whose range starts at the key answer `500` this many times first.
    pub fail_range: HashMap<u64, u32>,
    /// GETs whose range starts at the key send half the body and close this many times first.
    pub truncate_range: HashMap<u64, u32>,
    /// 206 responses whose range starts at the key carry this many extra
    /// `0xEE` bytes past the requested end (Content-Length includes them).
    pub pad_range: HashMap<u64, usize>,
    /// Pause between 4 KiB body writes (slow server).
    pub write_delay: Option<Duration>,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            head_allowed: true,
            support_ranges: true,
            advertise_ranges: true,
            head_honours_range: true,
            content_disposition: None,
            fail_range: HashMap::new(),
            truncate_range: HashMap::new(),
            pad_range: HashMap::new(),
            write_delay: None,
        }
    }
}

/// Request counters, shared with the test.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub heads: AtomicUsize,
    pub gets: AtomicUsize,
    /// `(start, end_inclusive)` of every ranged GET, in arrival order.
    pub ranges: Mutex<Vec<(u64, u64)>>,
}

impl ServerStats {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn heads(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }

    /// Number of GETs seen for a range starting at `start`.
    pub fn gets_for_start(&self, start: u64) -> usize {
        self.ranges
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == start)
            .count()
    }
}

pub struct RangeServer {
    /// Base URL ending in `/`.
    pub base: String,
    pub stats: Arc<ServerStats>,
}

impl RangeServer {
    /// URL for `name` on this server.
    pub fn url(&self, name: &str) -> String {
        format!("{}{}", self.base, name)
    }
}

struct Shared {
    body: Vec<u8>,
    opts: RangeServerOptions,
    remaining_failures: Mutex<HashMap<u64, u32>>,
    remaining_truncations: Mutex<HashMap<u64, u32>>,
    stats: Arc<ServerStats>,
}

/// Starts a server in a background thread serving `body`. Runs until the process exits.
pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let stats = Arc::new(ServerStats::default());
    let shared = Arc::new(Shared {
        body,
        remaining_failures: Mutex::new(opts.fail_range.clone()),
        remaining_truncations: Mutex::new(opts.truncate_range.clone()),
        opts,
        stats: Arc::clone(&stats),
    });
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let shared = Arc::clone(&shared);
            thread::spawn(move || handle(stream, &shared));
        }
    });
    RangeServer {
        base: format!("http://127.0.0.1:{}/", port),
        stats,
    }
}

/// Starts a listener that accepts connections and never answers. Returns a
/// URL on it. Each connection is held until the client hangs up.
pub fn start_silent() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for mut stream in listener.incoming().flatten() {
            thread::spawn(move || {
                let mut sink = [0u8; 1024];
                while matches!(stream.read(&mut sink), Ok(n) if n > 0) {}
            });
        }
    });
    format!("http://127.0.0.1:{}/silent.bin", port)
}

/// Decrements the budget for `start`; true if this request should misbehave.
fn take_fault(map: &Mutex<HashMap<u64, u32>>, start: u64) -> bool {
    let mut map = map.lock().unwrap();
    match map.get_mut(&start) {
        Some(n) if *n > 0 => {
            *n -= 1;
            true
        }
        _ => false,
    }
}

fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() > 64 * 1024 {
            break;
        }
    }
    String::from_utf8(buf).ok()
}

fn handle(mut stream: TcpStream, shared: &Shared) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let request = match read_request(&mut stream) {
        Some(r) => r,
        None => return,
    };
    let (method, range) = parse_request(&request);
    let body = &shared.body;
    let opts = &shared.opts;
    let total = body.len() as u64;
    let accept_ranges = if opts.advertise_ranges {
        "Accept-Ranges: bytes\r\n"
    } else {
        ""
    };

    if method.eq_ignore_ascii_case("HEAD") {
        shared.stats.heads.fetch_add(1, Ordering::SeqCst);
        if !opts.head_allowed {
            let _ = stream.write_all(
                b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
            return;
        }
        let disposition = opts
            .content_disposition
            .as_ref()
            .map(|v| format!("Content-Disposition: {}\r\n", v))
            .unwrap_or_default();
        let response = if range.is_some() && opts.head_honours_range && opts.support_ranges {
            format!(
                "HTTP/1.1 206 Partial Content\r\nContent-Length: 1\r\nContent-Range: bytes 0-0/{}\r\n{}{}Connection: close\r\n\r\n",
                total, accept_ranges, disposition
            )
        } else {
            format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}{}Connection: close\r\n\r\n",
                total, accept_ranges, disposition
            )
        };
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
        return;
    }
    shared.stats.gets.fetch_add(1, Ordering::SeqCst);
    if let Some(r) = range {
        shared.stats.ranges.lock().unwrap().push(r);
    }
    let start_key = range.map(|(s, _)| s).unwrap_or(0);

    if take_fault(&shared.remaining_failures, start_key) {
        let _ = stream.write_all(
            b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 5\r\nConnection: close\r\n\r\noops!",
        );
        return;
    }

    let (status, content_range, slice) = match range {
        Some((start, end_incl)) if opts.support_ranges => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start >= total || start > end_incl {
                (
                    "416 Range Not Satisfiable",
                    Some(format!("bytes */{}", total)),
                    &body[0..0],
                )
            } else {
                (
                    "206 Partial Content",
                    Some(format!("bytes {}-{}/{}", start, end_incl, total)),
                    &body[start as usize..=end_incl as usize],
                )
            }
        }
        _ => ("200 OK", None, &body[..]),
    };

    let truncate = take_fault(&shared.remaining_truncations, start_key);
    let padding = match opts.pad_range.get(&start_key) {
        Some(&extra) if content_range.is_some() => vec![0xEE; extra],
        _ => Vec::new(),
    };
    let padded: Vec<u8>;
    let slice = if padding.is_empty() {
        slice
    } else {
        padded = [slice, &padding[..]].concat();
        &padded[..]
    };
    let content_range = content_range
        .map(|v| format!("Content-Range: {}\r\n", v))
        .unwrap_or_default();
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}{}Connection: close\r\n\r\n",
        status,
        slice.len(),
        content_range,
        accept_ranges
    );
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }
    let slice = if truncate {
        &slice[..slice.len() / 2]
    } else {
        slice
    };
    for piece in slice.chunks(4096) {
        if stream.write_all(piece).is_err() {
            return;
        }
        if let Some(d) = opts.write_delay {
            thread::sleep(d);
        }
    }
}

/// Returns (method, optional (start, end_inclusive) for `Range: bytes=X-Y`).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>) {
    let mut method = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if let Some(part) = value.strip_prefix("bytes=") {
                    if let Some((a, b)) = part.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, range)
}
