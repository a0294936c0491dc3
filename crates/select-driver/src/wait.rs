//! Observed-condition waiting.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Poll `probe` every `interval` until it yields a value or `budget`
/// elapses. Always probes at least once, so a zero budget degrades to a
/// single immediate check.
pub async fn until<T, F, Fut>(budget: Duration, interval: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + budget;
    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }
        if Instant::now() >= deadline {
            return None;
        }
        sleep(interval).await;
    }
}
