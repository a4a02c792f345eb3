// core/src/retry.rs

//! Timeout and retry wrapper shared by every public operation.
//!
//! Writers stage their changes under the deadline and hand back a
//! [`Prepared`] transaction. The commit itself runs once, after the retry
//! loop, with no deadline: a commit that was cut off could have been applied
//! by the store, and reporting it as a retryable timeout would be wrong.

use backon::Retryable;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::StockroomConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::store::StoreTx;

/// A transaction with all writes staged, and the value to hand back once it
/// has committed.
pub(crate) struct Prepared<T> {
  tx: Box<dyn StoreTx>,
  value: T,
}

impl<T> Prepared<T> {
  pub(crate) fn new(tx: Box<dyn StoreTx>, value: T) -> Self {
    Self { tx, value }
  }
}

/// Runs `attempt` under the configured timeout, retrying retryable failures
/// with exponential backoff. Each attempt builds a fresh future, so a
/// timed-out attempt has already dropped (and rolled back) its transaction
/// before the next one starts.
pub(crate) async fn guarded<T, F, Fut>(config: &StockroomConfig, operation: &'static str, mut attempt: F) -> LedgerResult<T>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = LedgerResult<T>>,
{
  let timeout = config.operation_timeout;
  (|| {
    let fut = attempt();
    async move {
      match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(LedgerError::Timeout(timeout)),
      }
    }
  })
  .retry(config.retry.backoff())
  .when(LedgerError::is_retryable)
  .notify(|err: &LedgerError, delay: Duration| {
    warn!(operation, error = %err, delay = ?delay, "Retryable ledger failure, backing off");
  })
  .await
}

/// Stages a write with [`guarded`], then commits it exactly once.
///
/// The commit runs on its own task, so it finishes even if the caller stops
/// waiting. Its failures are returned as they are and never retried.
pub(crate) async fn transact<T, F, Fut>(config: &StockroomConfig, operation: &'static str, attempt: F) -> LedgerResult<T>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = LedgerResult<Prepared<T>>>,
{
  let Prepared { tx, value } = guarded(config, operation, attempt).await?;
  match tokio::spawn(tx.commit()).await {
    Ok(Ok(())) => {
      debug!(operation, "Transaction committed");
      Ok(value)
    }
    Ok(Err(err)) => {
      warn!(operation, error = %err, "Commit failed; outcome is not retried");
      Err(err)
    }
    Err(join_err) => Err(LedgerError::storage(anyhow::anyhow!(
      "commit task for {} did not finish: {}",
      operation,
      join_err
    ))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::RetryConfig;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  fn config(max_attempts: usize, timeout_ms: u64) -> StockroomConfig {
    StockroomConfig {
      operation_timeout: Duration::from_millis(timeout_ms),
      retry: RetryConfig {
        max_attempts,
        min_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
      },
      ..StockroomConfig::default()
    }
  }

  #[tokio::test]
  async fn storage_failures_are_retried_until_success() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let result = guarded(&config(3, 1_000), "flaky", || {
      let counter = counter.clone();
      async move {
        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
          Err(LedgerError::storage(anyhow::anyhow!("connection reset")))
        } else {
          Ok(42)
        }
      }
    })
    .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn domain_errors_are_not_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let result: LedgerResult<()> = guarded(&config(5, 1_000), "invalid", || {
      let counter = counter.clone();
      async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(LedgerError::InvalidState("cart is completed".into()))
      }
    })
    .await;

    assert!(matches!(result, Err(LedgerError::InvalidState(_))));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn slow_attempts_time_out() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let result: LedgerResult<()> = guarded(&config(2, 10), "slow", || {
      let counter = counter.clone();
      async move {
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(())
      }
    })
    .await;

    assert!(matches!(result, Err(LedgerError::Timeout(_))));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
  }
}
