//! Download coordinator.
//!
//! Pipeline for one URL: probe → segmenter → concurrent fetchers → storage
//! finalize. Falls back to a single whole-resource segment when the server
//! ignores Range, and aggregates every segment failure instead of stopping at
//! the first.

mod job;
mod pass;

pub use job::{DownloadJob, JobReport};

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::config::FetchConfig;
use crate::downloader::{self, FetchContext};
use crate::error::DownloadError;
use crate::probe::{self, RemoteMetadata};
use crate::progress::{EventSink, JobEvent, ProgressCounter};
use crate::retry::RetryPolicy;
use crate::segmenter::{self, Segment, SegmentStatus};
use crate::session::HttpSession;
use crate::storage::{self, StorageWriter, StorageWriterBuilder};

use pass::PassResult;

/// Downloads URLs into a directory. Cheap to clone; clones share the session,
/// the cancellation token and the event channel.
#[derive(Clone)]
pub struct Downloader {
    config: FetchConfig,
    session: Arc<HttpSession>,
    dest_dir: PathBuf,
    file_name: Option<String>,
    cancel: CancellationToken,
    events: EventSink,
}

impl Downloader {
    /// Validates `config` and builds a downloader writing into `dest_dir`.
    pub fn new(config: FetchConfig, dest_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            session: Arc::new(HttpSession::from_config(&config)),
            config,
            dest_dir: dest_dir.into(),
            file_name: None,
            cancel: CancellationToken::new(),
            events: EventSink::default(),
        })
    }

    /// Use `token` as the root cancellation token. Cancelling it stops every
    /// in-flight fetcher and makes `run` return `DownloadError::Cancelled`.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Send [`JobEvent`]s to `tx`.
    pub fn with_events(mut self, tx: UnboundedSender<JobEvent>) -> Self {
        self.events = EventSink::new(Some(tx));
        self
    }

    /// Save under `name` instead of the name derived from the server response.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Downloads `url`, blocking the current thread until every segment has
    /// finished.
    pub fn run(&self, url: &str) -> Result<JobReport, DownloadError> {
        if self.cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }
        let started = Instant::now();
        let meta = probe::resolve(&self.session, url, &self.cancel)?;
        let file_name = self
            .file_name
            .clone()
            .unwrap_or_else(|| meta.file_name.clone());
        let final_path = self.dest_dir.join(&file_name);
        self.ensure_writable(&final_path)?;

        let part_path = storage::temp_path(&final_path);
        let mut builder = StorageWriterBuilder::create(&part_path)
            .map_err(|e| DownloadError::io(&part_path, e))?;
        builder
            .preallocate(meta.total_size)
            .map_err(|e| DownloadError::io(&part_path, e))?;
        let writer = builder.build();

        let plan = if meta.ranges_supported {
            segmenter::plan_segments(
                meta.total_size,
                self.config.segment_threshold_bytes,
                self.config.segment_count,
            )
        } else {
            tracing::info!(%url, "server does not advertise ranges, using one segment");
            segmenter::single_segment(meta.total_size)
        };
        tracing::info!(
            %url,
            file = %file_name,
            total_size = meta.total_size,
            segments = plan.len(),
            "starting download"
        );
        self.events.send(JobEvent::Started {
            file_name: file_name.clone(),
            total_size: meta.total_size,
            segment_count: plan.len(),
        });

        let counter = ProgressCounter::new();
        let result = self.fetch_all(url, &meta, &writer, &counter, plan);
        let finished = |success: bool| {
            self.events.send(JobEvent::Finished {
                file_name: file_name.clone(),
                total_size: meta.total_size,
                elapsed: started.elapsed(),
                success,
            })
        };

        let (statuses, fell_back) = match result {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(%url, error = %e, "download failed");
                finished(false);
                return Err(e);
            }
        };

        if let Err(e) = finalize(writer, &final_path, self.config.overwrite) {
            finished(false);
            return Err(e);
        }
        finished(true);

        let elapsed = started.elapsed();
        tracing::info!(
            path = %final_path.display(),
            bytes = counter.total(),
            elapsed_ms = elapsed.as_millis() as u64,
            "download complete"
        );
        Ok(JobReport {
            job: DownloadJob {
                url: url.to_string(),
                file_name,
                total_size: meta.total_size,
                segments: statuses,
            },
            path: final_path,
            bytes_written: counter.total(),
            elapsed,
            fell_back_to_single: fell_back,
            etag: meta.etag,
            last_modified: meta.last_modified,
        })
    }

    /// Runs [`Downloader::run`] on tokio's blocking pool.
    pub async fn run_async(&self, url: &str) -> Result<JobReport, DownloadError> {
        let this = self.clone();
        let url = url.to_string();
        match tokio::task::spawn_blocking(move || this.run(&url)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(DownloadError::Cancelled),
        }
    }

    /// Runs the plan, falling back once to a single segment if the server
    /// ignores Range. Returns the final statuses and whether it fell back.
    fn fetch_all(
        &self,
        url: &str,
        meta: &RemoteMetadata,
        writer: &StorageWriter,
        counter: &ProgressCounter,
        mut plan: Vec<Segment>,
    ) -> Result<(Vec<SegmentStatus>, bool), DownloadError> {
        let policy = RetryPolicy::from(&self.config.retry);
        let mut fell_back = false;

        loop {
            let job_cancel = self.cancel.child_token();
            let ctx = FetchContext {
                url,
                total_size: meta.total_size,
                session: &self.session,
                storage: writer,
                policy: &policy,
                counter,
                events: &self.events,
                cancel: &job_cancel,
            };
            let initial_credit = if fell_back { counter.total() } else { 0 };
            let outcomes = downloader::download_segments(&ctx, &plan, initial_credit);

            if self.cancel.is_cancelled() {
                tracing::warn!(%url, "download cancelled");
                return Err(DownloadError::Cancelled);
            }

            match pass::summarize(outcomes) {
                PassResult::Complete(statuses) => return Ok((statuses, fell_back)),
                PassResult::Failed(failures) => {
                    return Err(DownloadError::SegmentsFailed {
                        failures,
                        partial_path: writer.temp_path().to_path_buf(),
                    })
                }
                PassResult::Storage(source) => {
                    return Err(DownloadError::io(writer.temp_path(), source))
                }
                PassResult::RangeIgnored {
                    segment_index,
                    status,
                } => {
                    let already_single = plan.len() == 1 && plan[0].covers(meta.total_size);
                    if fell_back || already_single {
                        return Err(DownloadError::UnsupportedRange {
                            segment_index,
                            status,
                        });
                    }
                    tracing::warn!(
                        %url,
                        segment = segment_index,
                        status,
                        "server ignored Range, refetching as one segment"
                    );
                    plan = segmenter::single_segment(meta.total_size);
                    fell_back = true;
                }
            }
        }
    }

    /// Fails early when the final path exists and `overwrite` is off.
    fn ensure_writable(&self, final_path: &Path) -> Result<(), DownloadError> {
        if !self.config.overwrite && final_path.exists() {
            return Err(already_exists(final_path));
        }
        Ok(())
    }
}

fn already_exists(path: &Path) -> DownloadError {
    DownloadError::io(
        path,
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "destination exists (set overwrite to replace it)",
        ),
    )
}

/// Sync the `.part` file and rename it over `final_path`.
fn finalize(writer: StorageWriter, final_path: &Path, overwrite: bool) -> Result<(), DownloadError> {
    let part_path = writer.temp_path().to_path_buf();
    writer
        .sync()
        .map_err(|e| DownloadError::io(&part_path, e))?;
    if final_path.exists() {
        if !overwrite {
            return Err(already_exists(final_path));
        }
        #[cfg(windows)]
        std::fs::remove_file(final_path).map_err(|e| DownloadError::io(final_path, e))?;
    }
    writer
        .finalize(final_path)
        .map_err(|e| DownloadError::io(final_path, e))
}
