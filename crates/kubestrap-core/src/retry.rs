//! Fixed-interval bounded retry for convergence loops
//!
//! Right after `kubeadm init` the API server may not answer yet and RBAC
//! objects may not exist. The operations retried here are idempotent checks
//! that are expected to fail for a while before succeeding.

use crate::error::{Error, Result};
use smol::Timer;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// How many times to try and how long to wait between tries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Pause after each failed attempt
    pub interval: Duration,
}

impl RetryPolicy {
    /// Create a policy
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Waiting for the master taint to become removable
    pub const fn unmark_master() -> Self {
        Self::new(200, Duration::from_secs(1))
    }

    /// Waiting for kube-system RBAC to become patchable
    pub const fn elevate_privileges() -> Self {
        Self::new(100, Duration::from_millis(500))
    }
}

/// Run `operation` until it succeeds or the policy runs out of attempts
///
/// Failures before the last attempt are logged and swallowed. Exhaustion
/// returns [`Error::RetryExhausted`] wrapping the last failure.
pub async fn retry_after<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts => {
                error!(
                    operation = %operation_name,
                    attempt = attempt,
                    error = %e,
                    "Operation failed after max retries"
                );
                return Err(Error::RetryExhausted {
                    operation: operation_name.to_string(),
                    attempts: attempt,
                    source: Box::new(e),
                });
            }
            Err(e) => {
                warn!(
                    operation = %operation_name,
                    attempt = attempt,
                    error = %e,
                    delay_ms = policy.interval.as_millis(),
                    "Operation failed, retrying"
                );
                Timer::after(policy.interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn failure() -> Error {
        Error::addons("not yet")
    }

    #[smol_potat::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(5, Duration::from_millis(1));

        let value = retry_after(&policy, "wait", || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { if n < 3 { Err(failure()) } else { Ok(n) } }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.get(), 3);
    }

    #[smol_potat::test]
    async fn test_exhaustion_reports_attempts() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(4, Duration::from_millis(1));

        let err = retry_after(&policy, "unmark master", || {
            calls.set(calls.get() + 1);
            async { Err::<(), _>(failure()) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.get(), 4);
        match err {
            Error::RetryExhausted { operation, attempts, source } => {
                assert_eq!(operation, "unmark master");
                assert_eq!(attempts, 4);
                assert!(matches!(*source, Error::Addons(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bootstrap_policies() {
        assert_eq!(RetryPolicy::unmark_master(), RetryPolicy::new(200, Duration::from_secs(1)));
        assert_eq!(
            RetryPolicy::elevate_privileges(),
            RetryPolicy::new(100, Duration::from_millis(500))
        );
    }
}
