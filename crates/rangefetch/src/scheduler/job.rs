use std::path::PathBuf;
use std::time::Duration;

use crate::segmenter::{SegmentState, SegmentStatus};

/// One download: what is fetched and how each planned segment ended.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub url: String,
    pub file_name: String,
    pub total_size: u64,
    /// Final status of every segment of the plan that completed the job.
    pub segments: Vec<SegmentStatus>,
}

impl DownloadJob {
    pub fn segments_in(&self, state: SegmentState) -> usize {
        self.segments.iter().filter(|s| s.state == state).count()
    }
}

/// Result of a successful download.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job: DownloadJob,
    /// Final location of the file.
    pub path: PathBuf,
    /// Bytes credited to the progress counter; equals `job.total_size`.
    pub bytes_written: u64,
    pub elapsed: Duration,
    /// True when the server ignored Range and the file was fetched as one segment.
    pub fell_back_to_single: bool,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}
