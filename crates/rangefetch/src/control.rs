//! Cancellation for a running download.
//!
//! The caller owns a root [`CancellationToken`]; the coordinator derives a job
//! token from it and hands a child to every segment fetcher. Cancelling any
//! ancestor stops all descendants. There is no process-wide registry.

use anyhow::{Context, Result};

pub use tokio_util::sync::CancellationToken;

/// Cancel `token` when the process receives SIGINT (Ctrl-C).
///
/// Every in-flight fetcher holding a descendant of `token` aborts its transfer,
/// and the download returns `DownloadError::Cancelled`. Can only be installed
/// once per process.
pub fn cancel_on_interrupt(token: CancellationToken) -> Result<()> {
    ctrlc::set_handler(move || {
        tracing::warn!("interrupt received, cancelling download");
        token.cancel();
    })
    .context("failed to install Ctrl-C handler")
}
