//! Folding fetcher outcomes into a single verdict for one pass over a plan.

use std::io;

use crate::downloader::SegmentOutcome;
use crate::error::SegmentFetchError;
use crate::retry::SegmentError;
use crate::segmenter::SegmentStatus;

#[derive(Debug)]
pub(super) enum PassResult {
    Complete(Vec<SegmentStatus>),
    /// Some segments failed after exhausting retries; the rest are on disk.
    Failed(Vec<SegmentFetchError>),
    /// A segment got a full or unexpected 2xx body for a partial range.
    RangeIgnored { segment_index: usize, status: u32 },
    Storage(io::Error),
}

/// Local I/O failures win over ignored ranges, which win over ordinary
/// segment failures. Siblings that stopped because of the first two were
/// cancelled and are not reported separately.
pub(super) fn summarize(outcomes: Vec<SegmentOutcome>) -> PassResult {
    let mut statuses = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    let mut range_ignored = None;

    for outcome in outcomes {
        statuses.push(outcome.status);
        let Some(failure) = outcome.error else {
            continue;
        };
        match failure.cause {
            SegmentError::Storage(e) => return PassResult::Storage(e),
            SegmentError::UnsupportedRange(status) => {
                range_ignored.get_or_insert((failure.segment_index, status));
            }
            cause => failures.push(SegmentFetchError { cause, ..failure }),
        }
    }

    if let Some((segment_index, status)) = range_ignored {
        return PassResult::RangeIgnored {
            segment_index,
            status,
        };
    }
    if failures.is_empty() {
        PassResult::Complete(statuses)
    } else {
        PassResult::Failed(failures)
    }
}
