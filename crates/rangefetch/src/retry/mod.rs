//! Retry and backoff policy.
//!
//! Error classification (timeouts, throttling, connection failures, short
//! bodies) and the explicit retry loop the segment fetcher runs each attempt
//! through. Nothing here knows about threads or segments.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::SegmentError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
