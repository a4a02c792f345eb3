// core/src/config.rs

use backon::ExponentialBuilder;
use std::time::Duration;

/// Tunables for a [`Stockroom`](crate::Stockroom).
#[derive(Debug, Clone)]
pub struct StockroomConfig {
  /// Upper bound for a single attempt of any ledger or store operation.
  /// An attempt that exceeds it is dropped, which rolls its transaction back.
  pub operation_timeout: Duration,
  pub retry: RetryConfig,
  /// Largest `limit` honoured by item search and recent activity.
  pub search_limit_max: usize,
}

impl Default for StockroomConfig {
  fn default() -> Self {
    Self {
      operation_timeout: Duration::from_secs(5),
      retry: RetryConfig::default(),
      search_limit_max: 50,
    }
  }
}

/// Backoff applied to storage failures and timeouts.
#[derive(Debug, Clone)]
pub struct RetryConfig {
  /// Total attempts including the first one. `1` disables retrying.
  pub max_attempts: usize,
  pub min_delay: Duration,
  pub max_delay: Duration,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      min_delay: Duration::from_millis(10),
      max_delay: Duration::from_millis(500),
    }
  }
}

impl RetryConfig {
  pub fn disabled() -> Self {
    Self {
      max_attempts: 1,
      ..Self::default()
    }
  }

  pub fn backoff(&self) -> ExponentialBuilder {
    ExponentialBuilder::default()
      .with_min_delay(self.min_delay)
      .with_max_delay(self.max_delay)
      .with_max_times(self.max_attempts.saturating_sub(1))
      .with_jitter()
  }
}
