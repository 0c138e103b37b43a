//! Segmented HTTP(S) downloader.
//!
//! Probes a URL for size and range support, splits it into byte-range
//! segments, fetches them concurrently with per-segment retry and writes them
//! into one preallocated file.

pub mod config;
pub mod control;
mod downloader;
pub mod error;
pub mod logging;
pub mod probe;
pub mod progress;
pub mod retry;
pub mod scheduler;
pub mod segmenter;
pub mod session;
pub mod storage;
pub mod url_model;

#[cfg(test)]
mod test_support;

pub use config::{FetchConfig, RetryConfig};
pub use control::CancellationToken;
pub use error::{DownloadError, SegmentFetchError};
pub use probe::RemoteMetadata;
pub use progress::{JobEvent, ProgressCounter, ProgressStats};
pub use scheduler::{DownloadJob, Downloader, JobReport};
