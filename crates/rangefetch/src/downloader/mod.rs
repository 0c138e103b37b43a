//! Segment fetchers.
//!
//! Each planned segment gets its own OS thread inside a `std::thread::scope`,
//! its own curl handle (reused across retry attempts) and a child of the job's
//! cancellation token. A fetcher writes only inside its own `[start, end)`.

mod segment;

use std::cell::RefCell;

use curl::easy::Easy;
use tokio_util::sync::CancellationToken;

use crate::error::SegmentFetchError;
use crate::progress::{EventSink, JobEvent, ProgressCounter};
use crate::retry::{run_with_retry, RetryPolicy, SegmentError};
use crate::segmenter::{Segment, SegmentState, SegmentStatus};
use crate::session::HttpSession;
use crate::storage::StorageWriter;

use segment::Credited;

/// Everything a fetcher needs, borrowed from the coordinator for one pass.
pub(crate) struct FetchContext<'a> {
    pub url: &'a str,
    pub total_size: u64,
    pub session: &'a HttpSession,
    pub storage: &'a StorageWriter,
    pub policy: &'a RetryPolicy,
    pub counter: &'a ProgressCounter,
    pub events: &'a EventSink,
    /// Job-scoped token. Fetchers derive children from it and cancel it on a
    /// job-fatal error (local I/O failure or ignored Range).
    pub cancel: &'a CancellationToken,
}

/// Final state of one segment as returned by its fetcher.
#[derive(Debug)]
pub(crate) struct SegmentOutcome {
    pub status: SegmentStatus,
    pub error: Option<SegmentFetchError>,
}

/// Fetches every segment concurrently and waits for all of them.
///
/// Outcomes are returned in plan order. `initial_credit` seeds the progress
/// high-water mark of every segment; it is non-zero only for the
/// whole-resource fallback, whose bytes were partly credited by the
/// abandoned plan.
pub(crate) fn download_segments(
    ctx: &FetchContext<'_>,
    segments: &[Segment],
    initial_credit: u64,
) -> Vec<SegmentOutcome> {
    std::thread::scope(|s| {
        let handles: Vec<_> = segments
            .iter()
            .map(|seg| {
                let seg = *seg;
                std::thread::Builder::new()
                    .name(format!("segment-{}", seg.index))
                    .spawn_scoped(s, move || fetch_segment(ctx, seg, initial_credit))
            })
            .collect();

        handles
            .into_iter()
            .zip(segments)
            .map(|(spawned, seg)| match spawned {
                Ok(handle) => handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic)),
                Err(e) => spawn_failed(ctx, *seg, e),
            })
            .collect()
    })
}

/// The segment fails on its own; siblings that did start keep running.
fn spawn_failed(ctx: &FetchContext<'_>, segment: Segment, e: std::io::Error) -> SegmentOutcome {
    tracing::error!(segment = segment.index, error = %e, "could not spawn fetcher thread");
    let mut status = SegmentStatus::new(segment);
    status.transition(SegmentState::Failed);
    SegmentOutcome {
        status,
        error: Some(SegmentFetchError {
            segment_index: segment.index,
            attempts: 0,
            cause: SegmentError::Spawn(e),
        }),
    }
    .reported(ctx)
}

/// Fetches one segment with retry until it is `Done` or `Failed`.
pub(crate) fn fetch_segment(
    ctx: &FetchContext<'_>,
    segment: Segment,
    initial_credit: u64,
) -> SegmentOutcome {
    let cancel = ctx.cancel.child_token();
    let status = RefCell::new(SegmentStatus::new(segment));
    let mut credited = Credited(initial_credit);
    let mut written = 0u64;

    let result = if segment.is_empty() {
        Ok(0)
    } else {
        let mut easy = Easy::new();
        match ctx.session.configure(&mut easy, ctx.url) {
            Ok(()) => run_with_retry(
                ctx.policy,
                &cancel,
                |attempt| {
                    {
                        let mut st = status.borrow_mut();
                        st.attempts = attempt;
                        st.transition(SegmentState::InFlight);
                    }
                    tracing::debug!(segment = segment.index, attempt, range = %segment.range_header_value(), "GET");
                    segment::download_one_segment(
                        &mut easy,
                        ctx,
                        &segment,
                        &cancel,
                        &mut credited,
                        &mut written,
                    )
                },
                |attempt, err, delay| {
                    tracing::warn!(
                        segment = segment.index,
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "segment attempt failed, retrying"
                    );
                    status.borrow_mut().transition(SegmentState::Retrying);
                },
            ),
            Err(e) => Err(SegmentError::Curl(e)),
        }
    };

    let mut status = status.into_inner();
    status.bytes_received = written;
    let error = match result {
        Ok(bytes) => {
            status.transition(SegmentState::Done);
            tracing::debug!(segment = segment.index, bytes, attempts = status.attempts, "segment done");
            None
        }
        Err(cause) => {
            if matches!(cause, SegmentError::Storage(_) | SegmentError::UnsupportedRange(_)) {
                ctx.cancel.cancel();
            }
            status.transition(SegmentState::Failed);
            if !matches!(cause, SegmentError::Cancelled) {
                tracing::error!(segment = segment.index, attempts = status.attempts, error = %cause, "segment failed");
            }
            Some(SegmentFetchError {
                segment_index: segment.index,
                attempts: status.attempts,
                cause,
            })
        }
    };
    SegmentOutcome { status, error }.reported(ctx)
}

impl SegmentOutcome {
    fn reported(self, ctx: &FetchContext<'_>) -> Self {
        ctx.events.send(JobEvent::SegmentFinished {
            index: self.status.segment.index,
            state: self.status.state,
        });
        self
    }
}
