//! Remote metadata resolution (size, range support, filename).
//!
//! Sends a HEAD with `Range: bytes=0-0` and reads the total from
//! `Content-Range`; falls back to a plain HEAD and its `Content-Length`.

mod parse;

use std::str;

use curl::easy::Easy;
use tokio_util::sync::CancellationToken;

use crate::error::DownloadError;
use crate::session::HttpSession;
use crate::url_model::derive_filename;

use parse::{parse_headers, HeadResponse};

/// What the server told us about the resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMetadata {
    /// Sanitized local filename.
    pub file_name: String,
    pub total_size: u64,
    /// True when the server answered the probe with a `Content-Range`, or
    /// advertised `Accept-Ranges: bytes` on a plain HEAD.
    pub ranges_supported: bool,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// Resolves size, range support and filename for `url`.
///
/// Runs in the current thread; use `spawn_blocking` from async code. Both
/// requests abort within about a second of `cancel` firing, and the call then
/// returns `DownloadError::Cancelled`.
pub fn resolve(
    session: &HttpSession,
    url: &str,
    cancel: &CancellationToken,
) -> Result<RemoteMetadata, DownloadError> {
    let probe = match head(session, url, true, cancel)? {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(%url, error = %e, "ranged HEAD probe failed");
            HeadResponse::default()
        }
    };

    if probe.is_success() {
        if let Some(total) = probe.content_range_total {
            tracing::debug!(%url, total, "size from Content-Range");
            return Ok(metadata(url, total, true, &probe, None));
        }
    }

    let plain = match head(session, url, false, cancel)? {
        Ok(r) => r,
        Err(e) => {
            return Err(DownloadError::MetadataResolution {
                url: url.to_string(),
                reason: format!("HEAD request failed: {}", e),
            })
        }
    };
    if !plain.is_success() {
        return Err(DownloadError::MetadataResolution {
            url: url.to_string(),
            reason: match plain.status {
                Some(code) => format!("HEAD returned HTTP {}", code),
                None => "HEAD returned no status".to_string(),
            },
        });
    }
    let Some(total) = plain.content_length else {
        return Err(DownloadError::MetadataResolution {
            url: url.to_string(),
            reason: "server reported neither Content-Range nor Content-Length".to_string(),
        });
    };
    tracing::debug!(%url, total, accept_ranges = plain.accept_ranges, "size from Content-Length");
    Ok(metadata(url, total, plain.accept_ranges, &plain, Some(&probe)))
}

fn metadata(
    url: &str,
    total_size: u64,
    ranges_supported: bool,
    primary: &HeadResponse,
    secondary: Option<&HeadResponse>,
) -> RemoteMetadata {
    let fallback = |own: &Option<String>, other: Option<&Option<String>>| {
        own.clone().or_else(|| other.cloned().flatten())
    };
    let disposition = fallback(
        &primary.content_disposition,
        secondary.map(|s| &s.content_disposition),
    );
    RemoteMetadata {
        file_name: derive_filename(url, disposition.as_deref()),
        total_size,
        ranges_supported,
        etag: fallback(&primary.etag, secondary.map(|s| &s.etag)),
        last_modified: fallback(&primary.last_modified, secondary.map(|s| &s.last_modified)),
    }
}

/// One HEAD request. The outer error means the handle could not be configured
/// or the job was cancelled; the inner one is a transfer failure the caller
/// may fall through on.
fn head(
    session: &HttpSession,
    url: &str,
    ranged: bool,
    cancel: &CancellationToken,
) -> Result<Result<HeadResponse, curl::Error>, DownloadError> {
    if cancel.is_cancelled() {
        return Err(DownloadError::Cancelled);
    }
    let mut easy = Easy::new();
    session.configure(&mut easy, url)?;
    easy.nobody(true)?;
    easy.progress(true)?;
    if ranged {
        easy.range("0-0")?;
    }

    let mut lines: Vec<String> = Vec::new();
    let performed = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                lines.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
        transfer.perform()
    };

    if performed.is_err() && cancel.is_cancelled() {
        return Err(DownloadError::Cancelled);
    }
    Ok(performed.map(|()| parse_headers(&lines)))
}
