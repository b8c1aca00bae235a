use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::AiError;

/// Backoff schedule between attempts. Attempt N sleeps `BACKOFF[N-1]` before
/// retrying; with 3 max attempts only the first two entries are used.
const BACKOFF: [Duration; 2] = [Duration::from_secs(1), Duration::from_secs(2)];

const MAX_ATTEMPTS: usize = 3;

/// Run `op` up to three times with exponential backoff (1s, 2s).
///
/// Auth errors abort immediately; only `Transient` errors are retried.
pub async fn with_retries<T, F, Fut>(label: &str, mut op: F) -> Result<T, AiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AiError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                let delay = BACKOFF[attempt - 1];
                warn!(
                    label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after transient error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
