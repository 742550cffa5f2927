//! Bounded-attempt retry helper shared by the statistics-DB reporter and the
//! repairer (§7 "retryable classes ... retried locally with bounded back-off").

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;

/// Retry `op` until it succeeds or `max_attempts` have been made, sleeping
/// for whatever delay `backoff` produces between attempts. Returns the last
/// error once attempts are exhausted.
pub async fn retry_n<F, Fut, T, E>(max_attempts: u32, mut backoff: ExponentialBackoff, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_attempts.max(1) {
                    return Err(err);
                }
                let delay = backoff.next_backoff().unwrap_or(Duration::from_secs(1));
                tokio::time::sleep(delay).await;
            }
        }
    }
}
