// core/src/store/locks.rs

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

use crate::model::{CartId, ItemId};

/// Identity of a lockable row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockKey {
  Cart(CartId),
  Item(ItemId),
}

/// Lazily-populated table of per-entity async mutexes.
///
/// Guards are owned so they can live inside a transaction across `.await`
/// points. Entries nobody holds or waits on are pruned once the table grows
/// past `prune_threshold`.
#[derive(Debug)]
pub struct EntityLocks {
  table: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
  prune_threshold: usize,
}

impl EntityLocks {
  pub fn new(prune_threshold: usize) -> Self {
    Self {
      table: Mutex::new(HashMap::new()),
      prune_threshold: prune_threshold.max(1),
    }
  }

  pub async fn acquire(&self, key: LockKey) -> OwnedMutexGuard<()> {
    let lock = {
      let mut table = self.table.lock();
      if table.len() >= self.prune_threshold {
        // Every holder and waiter owns a clone, so a count of one means idle.
        table.retain(|_, lock| Arc::strong_count(lock) > 1);
      }
      table.entry(key).or_default().clone()
    }; // table guard dropped before awaiting
    trace!(?key, "Waiting for entity lock");
    lock.lock_owned().await
  }

  pub fn len(&self) -> usize {
    self.table.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl Default for EntityLocks {
  fn default() -> Self {
    Self::new(1024)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[tokio::test]
  async fn same_key_is_exclusive() {
    let locks = Arc::new(EntityLocks::default());
    let key = LockKey::Cart(CartId::new());

    let guard = locks.acquire(key).await;
    let contender = {
      let locks = locks.clone();
      tokio::spawn(async move {
        let _guard = locks.acquire(key).await;
      })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!contender.is_finished());
    drop(guard);
    tokio::time::timeout(Duration::from_secs(1), contender)
      .await
      .expect("contender should acquire after release")
      .unwrap();
  }

  #[tokio::test]
  async fn different_keys_do_not_block() {
    let locks = EntityLocks::default();
    let _cart = locks.acquire(LockKey::Cart(CartId::new())).await;
    let item = tokio::time::timeout(Duration::from_millis(100), locks.acquire(LockKey::Item(ItemId::new()))).await;
    assert!(item.is_ok());
  }

  #[tokio::test]
  async fn idle_entries_are_pruned() {
    let locks = EntityLocks::new(4);
    let held = locks.acquire(LockKey::Item(ItemId::new())).await;
    for _ in 0..3 {
      drop(locks.acquire(LockKey::Item(ItemId::new())).await);
    }
    assert_eq!(locks.len(), 4);

    let _next = locks.acquire(LockKey::Cart(CartId::new())).await;
    // the three idle entries went away; the held one and the new one remain
    assert_eq!(locks.len(), 2);
    drop(held);
  }

  #[test]
  fn carts_order_before_items() {
    assert!(LockKey::Cart(CartId::new()) < LockKey::Item(ItemId::new()));
  }
}
