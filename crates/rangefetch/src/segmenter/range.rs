//! Segment type and range planning.

/// Files at or below this size are fetched as a single segment.
pub const DEFAULT_SEGMENT_THRESHOLD: u64 = 16 * 1024 * 1024;

/// Number of segments a large file is split into.
pub const DEFAULT_SEGMENT_COUNT: usize = 16;

/// A single segment: byte range [start, end) (half-open) of the remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Position in the plan (0-based).
    pub index: usize,
    /// Start offset (inclusive).
    pub start: u64,
    /// End offset (exclusive).
    pub end: u64,
}

impl Segment {
    /// Length of this segment in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if this segment is the whole resource `[0, total_size)`.
    pub fn covers(&self, total_size: u64) -> bool {
        self.start == 0 && self.end == total_size
    }

    /// HTTP Range header value (inclusive end): `bytes=start-(end-1)`.
    pub fn range_header_value(&self) -> String {
        if self.start >= self.end {
            "bytes=0-0".to_string()
        } else {
            format!("bytes={}-{}", self.start, self.end - 1)
        }
    }

    /// Range string in the form libcurl expects for `CURLOPT_RANGE` (no `bytes=` prefix).
    pub(crate) fn curl_range(&self) -> String {
        format!("{}-{}", self.start, self.end.saturating_sub(1))
    }
}

/// The degenerate plan: one segment covering `[0, total_size)`.
pub fn single_segment(total_size: u64) -> Vec<Segment> {
    vec![Segment {
        index: 0,
        start: 0,
        end: total_size,
    }]
}

/// Builds a segment plan for `total_size` bytes.
///
/// At or below `threshold` the plan is a single segment. Above it the range is
/// cut into `segment_count` chunks of `total_size / segment_count` bytes and the
/// last chunk takes the remainder. The count is clamped to `[1, total_size]` so
/// no segment is empty.
pub fn plan_segments(total_size: u64, threshold: u64, segment_count: usize) -> Vec<Segment> {
    if total_size <= threshold || segment_count <= 1 {
        return single_segment(total_size);
    }

    let count = (segment_count as u64).min(total_size);
    let base = total_size / count;

    let mut out = Vec::with_capacity(count as usize);
    let mut offset = 0u64;
    for i in 0..count {
        let end = if i == count - 1 { total_size } else { offset + base };
        out.push(Segment {
            index: i as usize,
            start: offset,
            end,
        });
        offset = end;
    }
    out
}
