//! Per-attempt segment error, classified by the retry policy.

use thiserror::Error;

/// Error from one attempt at a segment (curl failure, bad response, or local write failure).
/// Kept separate from [`crate::error::DownloadError`] so the retry loop can classify it
/// before anything is surfaced to the coordinator.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// Curl reported an error (timeout, connection, DNS, ...).
    #[error("{0}")]
    Curl(#[source] curl::Error),
    /// Response had a status other than 200/206.
    #[error("HTTP {0}")]
    Http(u32),
    /// Server answered a partial range with the full body (usually `200 OK`).
    #[error("server ignored Range request (HTTP {0})")]
    UnsupportedRange(u32),
    /// Body ended before the segment was complete (server closed early).
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// Body was longer than the segment; nothing past the segment end was written.
    #[error("response body exceeds segment length of {limit} bytes")]
    Overrun { limit: u64 },
    /// Disk write failed (disk full, permission denied). Never retried.
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
    /// No OS thread could be started for the fetcher.
    #[error("could not start fetcher thread: {0}")]
    Spawn(#[source] std::io::Error),
    /// The segment's cancellation token fired.
    #[error("cancelled")]
    Cancelled,
}
