// stockroom_server/src/state.rs
use crate::config::AppConfig;
use backon::{ExponentialBuilder, Retryable};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use stockroom::{LedgerError, LedgerStore, MemoryStore, PgStore, Stockroom};
use tracing::{info, instrument, warn};

#[derive(Clone)]
pub struct AppState {
  pub stockroom: Stockroom,
  /// Present when the ledger is backed by PostgreSQL.
  pub db_pool: Option<PgPool>,
  pub config: Arc<AppConfig>,
}

impl AppState {
  /// State over a fresh in-memory ledger.
  pub fn in_memory(config: AppConfig) -> Self {
    let stockroom = Stockroom::with_parts(
      Arc::new(MemoryStore::new()),
      Arc::new(stockroom::SystemClock),
      config.ledger.clone(),
    );
    Self {
      stockroom,
      db_pool: None,
      config: Arc::new(config),
    }
  }

  /// Connects to `DATABASE_URL` (retrying with backoff) and runs the
  /// migrations, or falls back to the in-memory store when it is unset.
  #[instrument(name = "state::initialize", skip(config))]
  pub async fn initialize(config: AppConfig) -> anyhow::Result<Self> {
    let Some(database_url) = config.database_url.clone() else {
      warn!("DATABASE_URL is not set; using the in-memory store. Data will not survive a restart.");
      return Ok(Self::in_memory(config));
    };

    let store = (|| PgStore::connect(&database_url, config.db_max_connections, Duration::from_secs(5)))
      .retry(
        ExponentialBuilder::default()
          .with_min_delay(Duration::from_millis(250))
          .with_max_delay(Duration::from_secs(5))
          .with_max_times(5),
      )
      .notify(|err: &LedgerError, delay: Duration| warn!(error = %err, ?delay, "Database not reachable yet, retrying"))
      .await?;
    info!("Successfully connected to the database.");

    store.migrate().await?;
    info!("Database migrations applied.");

    let db_pool = store.pool().clone();
    let ledger_store: Arc<dyn LedgerStore> = Arc::new(store);
    Ok(Self {
      stockroom: Stockroom::with_parts(ledger_store, Arc::new(stockroom::SystemClock), config.ledger.clone()),
      db_pool: Some(db_pool),
      config: Arc::new(config),
    })
  }
}
