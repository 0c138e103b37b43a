//! Range math and segment planning.
//!
//! Splits a download into segments whose union is exactly `[0, total_size)`,
//! computes HTTP Range header bounds, and tracks per-segment state.

mod range;
mod state;

pub use range::{
    plan_segments, single_segment, Segment, DEFAULT_SEGMENT_COUNT, DEFAULT_SEGMENT_THRESHOLD,
};
pub use state::{SegmentState, SegmentStatus};
