// core/src/stockroom.rs

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::carts::CartStore;
use crate::clock::{Clock, SystemClock};
use crate::config::StockroomConfig;
use crate::error::LedgerResult;
use crate::items::ItemStore;
use crate::ledger::Ledger;
use crate::queries::QueryFacade;
use crate::retry::{self, Prepared};
use crate::store::LedgerStore;

/// Collaborators every component shares.
pub(crate) struct Shared {
  pub(crate) store: Arc<dyn LedgerStore>,
  pub(crate) clock: Arc<dyn Clock>,
  pub(crate) config: StockroomConfig,
}

impl Shared {
  pub(crate) async fn guarded<T, F, Fut>(&self, operation: &'static str, attempt: F) -> LedgerResult<T>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = LedgerResult<T>>,
  {
    retry::guarded(&self.config, operation, attempt).await
  }

  /// Like [`Shared::guarded`] for writers: `attempt` stages its changes and
  /// returns them uncommitted; the commit happens outside the deadline.
  pub(crate) async fn transact<T, F, Fut>(&self, operation: &'static str, attempt: F) -> LedgerResult<T>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = LedgerResult<Prepared<T>>>,
  {
    retry::transact(&self.config, operation, attempt).await
  }
}

impl fmt::Debug for Shared {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Shared")
      .field("store", &self.store)
      .field("clock", &self.clock)
      .field("config", &self.config)
      .finish()
  }
}

/// Entry point: one store, one clock, one configuration, handed out to the
/// item store, cart store, ledger engine and query facade.
///
/// Cheap to clone; clones share everything.
#[derive(Debug, Clone)]
pub struct Stockroom {
  shared: Arc<Shared>,
}

impl Stockroom {
  pub fn new(store: Arc<dyn LedgerStore>) -> Self {
    Self::with_parts(store, Arc::new(SystemClock), StockroomConfig::default())
  }

  pub fn with_parts(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, config: StockroomConfig) -> Self {
    Self {
      shared: Arc::new(Shared { store, clock, config }),
    }
  }

  pub fn items(&self) -> ItemStore {
    ItemStore::new(self.shared.clone())
  }

  pub fn carts(&self) -> CartStore {
    CartStore::new(self.shared.clone())
  }

  pub fn ledger(&self) -> Ledger {
    Ledger::new(self.shared.clone())
  }

  pub fn queries(&self) -> QueryFacade {
    QueryFacade::new(self.shared.clone())
  }

  pub fn store(&self) -> &Arc<dyn LedgerStore> {
    &self.shared.store
  }

  pub fn clock(&self) -> &Arc<dyn Clock> {
    &self.shared.clock
  }

  pub fn config(&self) -> &StockroomConfig {
    &self.shared.config
  }
}
