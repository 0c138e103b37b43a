//! One ranged GET for a segment, streamed into the output file.

use std::cell::{Cell, RefCell};
use std::str;

use curl::easy::Easy;
use tokio_util::sync::CancellationToken;

use super::FetchContext;
use crate::progress::JobEvent;
use crate::retry::SegmentError;
use crate::segmenter::Segment;

/// Bytes of a segment credited to the job counter so far. Only grows, so data
/// received again on a retry is not counted twice.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct Credited(pub u64);

/// Runs one attempt: GET `segment` on `easy` (already configured with the
/// session and URL), writing each received chunk at its offset.
///
/// Returns the number of bytes written. `written` is raised to the longest
/// prefix of the segment any attempt has put on disk, failed ones included.
/// A `200` is accepted only when the
/// segment is the whole resource; otherwise nothing is written and the attempt
/// fails with `UnsupportedRange`. Nothing past the segment end is ever written.
pub(super) fn download_one_segment(
    easy: &mut Easy,
    ctx: &FetchContext<'_>,
    segment: &Segment,
    cancel: &CancellationToken,
    credited: &mut Credited,
    written: &mut u64,
) -> Result<u64, SegmentError> {
    let whole = segment.covers(ctx.total_size);
    let limit = segment.len();
    easy.range(&segment.curl_range()).map_err(SegmentError::Curl)?;
    easy.progress(true).map_err(SegmentError::Curl)?;

    let status: Cell<Option<u32>> = Cell::new(None);
    let received = Cell::new(0u64);
    let high_water = Cell::new(credited.0);
    let failure: RefCell<Option<SegmentError>> = RefCell::new(None);

    let performed = {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|line| {
                if let Some(code) = str::from_utf8(line).ok().and_then(status_code) {
                    status.set(Some(code));
                }
                true
            })
            .map_err(SegmentError::Curl)?;
        transfer
            .write_function(|data| {
                if cancel.is_cancelled() {
                    failure.replace(Some(SegmentError::Cancelled));
                    return Ok(0);
                }
                if let Err(e) = check_status(status.get(), whole) {
                    failure.replace(Some(e));
                    return Ok(0);
                }

                let offset = received.get();
                let room = limit - offset;
                let take = (data.len() as u64).min(room) as usize;
                if take > 0 {
                    if let Err(e) = ctx.storage.write_at(segment.start + offset, &data[..take]) {
                        failure.replace(Some(SegmentError::Storage(e)));
                        return Ok(0);
                    }
                    let now = offset + take as u64;
                    received.set(now);
                    if now > high_water.get() {
                        let delta = now - high_water.get();
                        high_water.set(now);
                        let total = ctx.counter.add(delta);
                        ctx.events.send(JobEvent::Progress { delta, total });
                    }
                }
                if take < data.len() {
                    failure.replace(Some(SegmentError::Overrun { limit }));
                    return Ok(0);
                }
                Ok(data.len())
            })
            .map_err(SegmentError::Curl)?;
        transfer
            .progress_function(|_, _, _, _| !cancel.is_cancelled())
            .map_err(SegmentError::Curl)?;
        transfer.perform()
    };

    credited.0 = high_water.get();
    let received = received.get();
    *written = (*written).max(received);

    if let Some(e) = failure.into_inner() {
        return Err(e);
    }
    if let Err(e) = performed {
        if cancel.is_cancelled() {
            return Err(SegmentError::Cancelled);
        }
        return Err(SegmentError::Curl(e));
    }

    let code = easy.response_code().map_err(SegmentError::Curl)?;
    check_status(Some(code), whole)?;
    if received != limit {
        return Err(SegmentError::PartialTransfer {
            expected: limit,
            received,
        });
    }
    Ok(received)
}

/// Validates the response status for a ranged GET before any byte is written.
fn check_status(status: Option<u32>, whole: bool) -> Result<(), SegmentError> {
    match status {
        Some(206) => Ok(()),
        Some(200) if whole => Ok(()),
        Some(code) if (200..300).contains(&code) => Err(SegmentError::UnsupportedRange(code)),
        Some(code) => Err(SegmentError::Http(code)),
        None => Ok(()),
    }
}

/// Status code from an HTTP status line; `None` for ordinary header lines.
/// Each response of a redirect chain starts with one, so the last wins.
fn status_code(line: &str) -> Option<u32> {
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}
