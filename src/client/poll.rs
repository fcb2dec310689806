//! Generic polling helpers shared by [`super::pve::PveClient`] and the test
//! mock, so the backoff/deadline logic in spec.md §4.A is written once.

use std::time::Duration;

use super::error::HypervisorError;
use super::retry::RetryPolicy;

/// Polls `probe` on a fixed `interval` until it returns `Ok(true)`, `timeout`
/// elapses, or `probe` returns `Err`.
pub async fn poll_until<F, Fut>(
    mut probe: F,
    interval: Duration,
    timeout: Duration,
    timeout_msg: &str,
) -> Result<(), HypervisorError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<bool, HypervisorError>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if probe().await? {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(HypervisorError::Domain(timeout_msg.to_owned()));
        }
        tokio::time::sleep(interval).await;
    }
}

/// Polls `probe` with exponential backoff per `policy` until it returns
/// `Ok(true)`, `timeout` elapses, or `probe` returns `Err`.
pub async fn poll_backoff<F, Fut>(
    mut probe: F,
    policy: RetryPolicy,
    timeout: Duration,
    timeout_msg: &str,
) -> Result<(), HypervisorError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<bool, HypervisorError>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    let mut attempt = 0u32;
    loop {
        if probe().await? {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(HypervisorError::Domain(timeout_msg.to_owned()));
        }
        attempt += 1;
        tokio::time::sleep(policy.delay_for(attempt)).await;
    }
}
