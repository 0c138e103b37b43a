//! Job-level errors returned by [`crate::Downloader`].

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::retry::SegmentError;

/// Terminal failure of one segment after its retry budget was spent.
#[derive(Debug)]
pub struct SegmentFetchError {
    pub segment_index: usize,
    /// Attempts made, including the last failed one.
    pub attempts: u32,
    pub cause: SegmentError,
}

impl fmt::Display for SegmentFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "segment {} failed after {} attempt(s): {}",
            self.segment_index, self.attempts, self.cause
        )
    }
}

impl std::error::Error for SegmentFetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    /// Neither the probe nor a plain HEAD produced a usable size.
    #[error("could not resolve metadata for {url}: {reason}")]
    MetadataResolution { url: String, reason: String },

    /// Server answered a ranged request with an unusable status, even for the
    /// whole-resource fallback.
    #[error("server does not honour Range requests (segment {segment_index}, HTTP {status})")]
    UnsupportedRange { segment_index: usize, status: u32 },

    /// One or more segments failed; the others were written to `partial_path`.
    #[error("{} segment(s) failed; partial data kept at {}", .failures.len(), .partial_path.display())]
    SegmentsFailed {
        failures: Vec<SegmentFetchError>,
        partial_path: PathBuf,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("download cancelled")]
    Cancelled,

    /// The HTTP handle could not be set up (bad URL, unsupported option).
    #[error("transport setup failed: {0}")]
    Transport(#[from] curl::Error),
}

impl DownloadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DownloadError::Io {
            path: path.into(),
            source,
        }
    }

    /// Indices of the failed segments, if this is a `SegmentsFailed`.
    pub fn failed_segments(&self) -> Vec<usize> {
        match self {
            DownloadError::SegmentsFailed { failures, .. } => {
                failures.iter().map(|f| f.segment_index).collect()
            }
            _ => Vec::new(),
        }
    }
}
