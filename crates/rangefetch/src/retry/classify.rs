//! Classify HTTP status and curl errors into retry policy error kinds.

use super::error::SegmentError;
use super::policy::ErrorKind;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        _ => ErrorKind::Http(code as u16),
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_url_malformed()
        || e.is_unsupported_protocol()
        || e.is_aborted_by_callback()
        || e.is_write_error()
    {
        return ErrorKind::Fatal;
    }
    if e.is_partial_file() {
        return ErrorKind::Truncated;
    }
    // Everything else (connect, resolve, TLS handshake, reset, empty reply)
    // is a network failure worth another attempt.
    ErrorKind::Connection
}

/// Classify a segment error into an [`ErrorKind`].
pub fn classify(e: &SegmentError) -> ErrorKind {
    match e {
        SegmentError::Curl(ce) => classify_curl_error(ce),
        SegmentError::Http(code) => classify_http_status(*code),
        SegmentError::PartialTransfer { .. } => ErrorKind::Truncated,
        SegmentError::UnsupportedRange(_)
        | SegmentError::Overrun { .. }
        | SegmentError::Storage(_)
        | SegmentError::Spawn(_)
        | SegmentError::Cancelled => ErrorKind::Fatal,
    }
}
