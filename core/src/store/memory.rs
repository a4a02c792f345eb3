// core/src/store/memory.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, instrument};

use super::{lock_order, EntityLocks, LedgerStore, LockKey, StoreTx};
use crate::error::LedgerResult;
use crate::model::{Cart, CartId, CartLine, CartLineItem, CartStatus, Item, ItemId, LineItemId, OwnerId};

#[derive(Debug, Default)]
struct Tables {
  items: HashMap<ItemId, Item>,
  carts: HashMap<CartId, Cart>,
  line_items: HashMap<LineItemId, CartLineItem>,
}

impl Tables {
  fn lines_of(&self, cart_id: CartId) -> impl Iterator<Item = &CartLineItem> {
    self.line_items.values().filter(move |line| line.cart_id == cart_id)
  }
}

#[derive(Debug, Default)]
struct Inner {
  tables: RwLock<Tables>,
  locks: EntityLocks,
}

/// Single-process store: committed rows behind a `parking_lot::RwLock`,
/// row locks from an [`EntityLocks`] table.
///
/// The table lock is only ever taken for short synchronous sections; the
/// entity locks are what serialise transactions over the same cart or item.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  inner: Arc<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of live entries in the row lock table.
  pub fn lock_table_len(&self) -> usize {
    self.inner.locks.len()
  }
}

fn sort_by_name(items: &mut [Item]) {
  items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
}

fn sort_newest_first(carts: &mut [Cart]) {
  carts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl LedgerStore for MemoryStore {
  async fn begin(&self) -> LedgerResult<Box<dyn StoreTx>> {
    Ok(Box::new(MemoryTx {
      inner: self.inner.clone(),
      guards: Vec::new(),
      held: HashSet::new(),
      items: HashMap::new(),
      carts: HashMap::new(),
      lines: HashMap::new(),
    }))
  }

  async fn item(&self, id: ItemId) -> LedgerResult<Option<Item>> {
    Ok(self.inner.tables.read().items.get(&id).cloned())
  }

  async fn items_by_owner(&self, owner_id: OwnerId) -> LedgerResult<Vec<Item>> {
    let mut items: Vec<Item> = {
      let tables = self.inner.tables.read();
      tables.items.values().filter(|item| item.owner_id == owner_id).cloned().collect()
    };
    sort_by_name(&mut items);
    Ok(items)
  }

  async fn search_items(&self, owner_id: OwnerId, query: &str, limit: usize) -> LedgerResult<Vec<Item>> {
    let needle = query.to_lowercase();
    let mut items: Vec<Item> = {
      let tables = self.inner.tables.read();
      tables
        .items
        .values()
        .filter(|item| item.owner_id == owner_id && item.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
    };
    sort_by_name(&mut items);
    items.truncate(limit);
    Ok(items)
  }

  async fn low_stock_items(&self, owner_id: OwnerId) -> LedgerResult<Vec<Item>> {
    let mut items: Vec<Item> = {
      let tables = self.inner.tables.read();
      tables
        .items
        .values()
        .filter(|item| item.owner_id == owner_id && item.is_low_stock())
        .cloned()
        .collect()
    };
    items.sort_by(|a, b| {
      a.stock_quantity
        .cmp(&b.stock_quantity)
        .then_with(|| a.name.cmp(&b.name))
        .then(a.id.cmp(&b.id))
    });
    Ok(items)
  }

  async fn cart(&self, id: CartId) -> LedgerResult<Option<Cart>> {
    Ok(self.inner.tables.read().carts.get(&id).cloned())
  }

  async fn cart_lines(&self, cart_id: CartId) -> LedgerResult<Vec<CartLine>> {
    let tables = self.inner.tables.read();
    let mut lines: Vec<CartLine> = tables
      .lines_of(cart_id)
      .map(|line| {
        let item = tables.items.get(&line.item_id);
        CartLine::new(
          line.clone(),
          item.map(|i| i.name.clone()),
          item.map(|i| i.stock_quantity),
        )
      })
      .collect();
    lines.sort_by(|a, b| {
      a.line_item
        .created_at
        .cmp(&b.line_item.created_at)
        .then(a.line_item.id.cmp(&b.line_item.id))
    });
    Ok(lines)
  }

  async fn line_item(&self, id: LineItemId) -> LedgerResult<Option<CartLineItem>> {
    Ok(self.inner.tables.read().line_items.get(&id).cloned())
  }

  async fn carts_by_owner(&self, owner_id: OwnerId, status: Option<CartStatus>) -> LedgerResult<Vec<Cart>> {
    let mut carts: Vec<Cart> = {
      let tables = self.inner.tables.read();
      tables
        .carts
        .values()
        .filter(|cart| cart.owner_id == owner_id && status.map_or(true, |s| cart.status == s))
        .cloned()
        .collect()
    };
    sort_newest_first(&mut carts);
    Ok(carts)
  }

  async fn completed_revenue(&self, owner_id: OwnerId, start: DateTime<Utc>, end: DateTime<Utc>) -> LedgerResult<Decimal> {
    let tables = self.inner.tables.read();
    Ok(
      tables
        .carts
        .values()
        .filter(|cart| cart.owner_id == owner_id && cart.status == CartStatus::Completed)
        .filter(|cart| cart.completed_at.is_some_and(|at| at >= start && at < end))
        .map(|cart| cart.total_amount)
        .sum(),
    )
  }

  async fn recent_carts(&self, owner_id: OwnerId, limit: usize) -> LedgerResult<Vec<Cart>> {
    let mut carts: Vec<Cart> = {
      let tables = self.inner.tables.read();
      tables.carts.values().filter(|cart| cart.owner_id == owner_id).cloned().collect()
    };
    carts.sort_by(|a, b| {
      b.last_activity_at()
        .cmp(&a.last_activity_at())
        .then(b.id.cmp(&a.id))
    });
    carts.truncate(limit);
    Ok(carts)
  }
}

/// Transaction over a [`MemoryStore`].
///
/// Writes are staged in overlay maps (`None` marks a deletion) and applied
/// under one table write lock at commit. Dropping the transaction discards
/// the overlay and releases its row locks.
struct MemoryTx {
  inner: Arc<Inner>,
  guards: Vec<OwnedMutexGuard<()>>,
  held: HashSet<LockKey>,
  items: HashMap<ItemId, Option<Item>>,
  carts: HashMap<CartId, Cart>,
  lines: HashMap<LineItemId, Option<CartLineItem>>,
}

impl MemoryTx {
  async fn lock(&mut self, key: LockKey) {
    if self.held.insert(key) {
      let guard = self.inner.locks.acquire(key).await;
      debug!(?key, "Row lock acquired");
      self.guards.push(guard);
    }
  }

  fn read_item(&self, id: ItemId) -> Option<Item> {
    match self.items.get(&id) {
      Some(staged) => staged.clone(),
      None => self.inner.tables.read().items.get(&id).cloned(),
    }
  }
}

#[async_trait]
impl StoreTx for MemoryTx {
  async fn lock_cart(&mut self, id: CartId) -> LedgerResult<Option<Cart>> {
    self.lock(LockKey::Cart(id)).await;
    if let Some(staged) = self.carts.get(&id) {
      return Ok(Some(staged.clone()));
    }
    Ok(self.inner.tables.read().carts.get(&id).cloned())
  }

  async fn lock_items(&mut self, ids: &[ItemId]) -> LedgerResult<Vec<Item>> {
    let ordered = lock_order(ids);
    for id in &ordered {
      self.lock(LockKey::Item(*id)).await;
    }
    Ok(ordered.into_iter().filter_map(|id| self.read_item(id)).collect())
  }

  async fn line_items(&mut self, cart_id: CartId) -> LedgerResult<Vec<CartLineItem>> {
    let mut lines: Vec<CartLineItem> = {
      let tables = self.inner.tables.read();
      tables
        .lines_of(cart_id)
        .filter(|line| !self.lines.contains_key(&line.id))
        .cloned()
        .collect()
    };
    lines.extend(
      self
        .lines
        .values()
        .flatten()
        .filter(|line| line.cart_id == cart_id)
        .cloned(),
    );
    lines.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    Ok(lines)
  }

  async fn item_in_active_cart(&mut self, item_id: ItemId) -> LedgerResult<bool> {
    let tables = self.inner.tables.read();
    let is_active = |cart_id: &CartId| {
      self
        .carts
        .get(cart_id)
        .or_else(|| tables.carts.get(cart_id))
        .is_some_and(Cart::is_active)
    };
    let committed = tables
      .line_items
      .values()
      .filter(|line| !self.lines.contains_key(&line.id))
      .any(|line| line.item_id == item_id && is_active(&line.cart_id));
    let staged = self
      .lines
      .values()
      .flatten()
      .any(|line| line.item_id == item_id && is_active(&line.cart_id));
    Ok(committed || staged)
  }

  async fn put_item(&mut self, item: &Item) -> LedgerResult<()> {
    self.items.insert(item.id, Some(item.clone()));
    Ok(())
  }

  async fn delete_item(&mut self, id: ItemId) -> LedgerResult<()> {
    self.items.insert(id, None);
    Ok(())
  }

  async fn put_cart(&mut self, cart: &Cart) -> LedgerResult<()> {
    self.carts.insert(cart.id, cart.clone());
    Ok(())
  }

  async fn put_line_item(&mut self, line: &CartLineItem) -> LedgerResult<()> {
    self.lines.insert(line.id, Some(line.clone()));
    Ok(())
  }

  async fn delete_line_item(&mut self, id: LineItemId) -> LedgerResult<()> {
    self.lines.insert(id, None);
    Ok(())
  }

  async fn commit(self: Box<Self>) -> LedgerResult<()> {
    let MemoryTx {
      inner,
      guards,
      items,
      carts,
      lines,
      ..
    } = *self;
    {
      let mut tables = inner.tables.write();
      for (id, staged) in items {
        match staged {
          Some(item) => tables.items.insert(id, item),
          None => tables.items.remove(&id),
        };
      }
      for (id, cart) in carts {
        tables.carts.insert(id, cart);
      }
      for (id, staged) in lines {
        match staged {
          Some(line) => tables.line_items.insert(id, line),
          None => tables.line_items.remove(&id),
        };
      }
    }
    // row locks are released only after the writes are visible
    drop(guards);
    Ok(())
  }
}
