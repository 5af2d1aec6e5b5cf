//! Duration logging for awaited operations

use std::future::Future;
use std::time::Instant;
use tracing::info;

/// Await `future` and log how long `operation` took.
///
/// The output of the future is returned untouched, so the wrapper can sit at
/// any call site:
///
/// ```no_run
/// # async fn fetch() -> u32 { 1 }
/// # async fn demo() {
/// let value = ragup_common::timing::timed("fetch", fetch()).await;
/// # }
/// ```
pub async fn timed<F>(operation: &str, future: F) -> F::Output
where
    F: Future,
{
    let started = Instant::now();
    let output = future.await;
    let elapsed = started.elapsed();

    info!(
        operation,
        elapsed_ms = elapsed.as_millis() as u64,
        "{} took {:.2} seconds",
        operation,
        elapsed.as_secs_f64()
    );

    output
}
