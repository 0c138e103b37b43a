//! Retry loop: run an attempt until success, exhaustion, or cancellation.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::classify;
use super::error::SegmentError;
use super::policy::{RetryDecision, RetryPolicy};

/// Granularity of cancellation checks while sleeping between attempts.
const BACKOFF_SLICE: Duration = Duration::from_millis(50);

/// Runs `attempt` until it succeeds or the policy says to stop.
///
/// `attempt` gets the 1-based attempt number. Before each retry, `on_retry` is
/// called with the failed attempt number, its error, and the backoff delay; the
/// delay is then slept in short slices so `cancel` is noticed promptly. A
/// cancellation observed before an attempt or during backoff returns
/// `SegmentError::Cancelled`.
pub fn run_with_retry<T, F, R>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut attempt: F,
    mut on_retry: R,
) -> Result<T, SegmentError>
where
    F: FnMut(u32) -> Result<T, SegmentError>,
    R: FnMut(u32, &SegmentError, Duration),
{
    let mut n = 1u32;
    loop {
        if cancel.is_cancelled() {
            return Err(SegmentError::Cancelled);
        }
        let err = match attempt(n) {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        match policy.decide(n, classify::classify(&err)) {
            RetryDecision::NoRetry => return Err(err),
            RetryDecision::RetryAfter(delay) => {
                on_retry(n, &err, delay);
                if sleep_unless_cancelled(delay, cancel) {
                    return Err(SegmentError::Cancelled);
                }
                n += 1;
            }
        }
    }
}

/// Sleeps for `delay`; returns true if `cancel` fired first.
fn sleep_unless_cancelled(delay: Duration, cancel: &CancellationToken) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if cancel.is_cancelled() {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        std::thread::sleep((deadline - now).min(BACKOFF_SLICE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_err() -> SegmentError {
        SegmentError::Http(500)
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::immediate(3);
        let cancel = CancellationToken::new();
        let mut retries = Vec::new();
        let res = run_with_retry(
            &policy,
            &cancel,
            |n| if n < 3 { Err(http_err()) } else { Ok(n) },
            |n, _, _| retries.push(n),
        );
        assert_eq!(res.unwrap(), 3);
        assert_eq!(retries, vec![1, 2]);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let policy = RetryPolicy::immediate(3);
        let cancel = CancellationToken::new();
        let mut calls = 0;
        let res: Result<(), _> = run_with_retry(
            &policy,
            &cancel,
            |_| {
                calls += 1;
                Err(http_err())
            },
            |_, _, _| {},
        );
        assert!(matches!(res, Err(SegmentError::Http(500))));
        assert_eq!(calls, 3);
    }

    #[test]
    fn fatal_error_is_not_retried() {
        let policy = RetryPolicy::immediate(5);
        let cancel = CancellationToken::new();
        let mut calls = 0;
        let res: Result<(), _> = run_with_retry(
            &policy,
            &cancel,
            |_| {
                calls += 1;
                Err(SegmentError::UnsupportedRange(200))
            },
            |_, _, _| {},
        );
        assert!(matches!(res, Err(SegmentError::UnsupportedRange(200))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn cancelled_token_stops_before_first_attempt() {
        let policy = RetryPolicy::immediate(3);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let res: Result<(), _> = run_with_retry(&policy, &cancel, |_| Ok(()), |_, _, _| {});
        assert!(matches!(res, Err(SegmentError::Cancelled)));
    }

    #[test]
    fn cancel_interrupts_backoff() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(30),
        };
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        let started = Instant::now();
        let res: Result<(), _> = run_with_retry(
            &policy,
            &cancel,
            |_| Err(http_err()),
            move |_, _, _| canceller.cancel(),
        );
        assert!(matches!(res, Err(SegmentError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
