// core/src/store/mod.rs

//! Persistence seam of the ledger.
//!
//! A [`LedgerStore`] serves committed snapshots to readers and opens
//! [`StoreTx`] transactions for writers. Every multi-record mutation goes
//! through a transaction:
//!  - rows are locked explicitly with [`StoreTx::lock_cart`] and
//!    [`StoreTx::lock_items`], always cart first, then items in ascending id
//!    order, so two checkouts over overlapping items cannot deadlock;
//!  - writes are invisible to other callers until [`StoreTx::commit`];
//!  - dropping a transaction without committing discards all of its writes.

mod locks;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use locks::{EntityLocks, LockKey};
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

use crate::error::LedgerResult;
use crate::model::{Cart, CartId, CartLine, CartLineItem, CartStatus, Item, ItemId, LineItemId, OwnerId};

#[async_trait]
pub trait LedgerStore: Send + Sync + fmt::Debug {
  /// Opens a transaction. No locks are held until requested.
  async fn begin(&self) -> LedgerResult<Box<dyn StoreTx>>;

  async fn item(&self, id: ItemId) -> LedgerResult<Option<Item>>;

  /// All of an owner's items ordered by name.
  async fn items_by_owner(&self, owner_id: OwnerId) -> LedgerResult<Vec<Item>>;

  /// Case-insensitive substring match on name, ordered by name, at most `limit` rows.
  async fn search_items(&self, owner_id: OwnerId, query: &str, limit: usize) -> LedgerResult<Vec<Item>>;

  /// Items with `stock_quantity <= low_stock_threshold`, lowest stock first.
  async fn low_stock_items(&self, owner_id: OwnerId) -> LedgerResult<Vec<Item>>;

  async fn cart(&self, id: CartId) -> LedgerResult<Option<Cart>>;

  /// The cart's line items joined with current item data, oldest first.
  async fn cart_lines(&self, cart_id: CartId) -> LedgerResult<Vec<CartLine>>;

  async fn line_item(&self, id: LineItemId) -> LedgerResult<Option<CartLineItem>>;

  /// Newest first.
  async fn carts_by_owner(&self, owner_id: OwnerId, status: Option<CartStatus>) -> LedgerResult<Vec<Cart>>;

  /// Sum of `total_amount` over completed carts with `completed_at` in `[start, end)`.
  async fn completed_revenue(&self, owner_id: OwnerId, start: DateTime<Utc>, end: DateTime<Utc>) -> LedgerResult<Decimal>;

  /// Carts ordered by their latest activity, newest first.
  async fn recent_carts(&self, owner_id: OwnerId, limit: usize) -> LedgerResult<Vec<Cart>>;
}

#[async_trait]
pub trait StoreTx: Send {
  /// Locks the cart row and returns its current state.
  async fn lock_cart(&mut self, id: CartId) -> LedgerResult<Option<Cart>>;

  /// Locks the given items in ascending id order and returns the ones that
  /// exist, in that order. Duplicates are ignored.
  async fn lock_items(&mut self, ids: &[ItemId]) -> LedgerResult<Vec<Item>>;

  /// Line items of a cart as seen by this transaction. The cart must be locked.
  async fn line_items(&mut self, cart_id: CartId) -> LedgerResult<Vec<CartLineItem>>;

  /// Whether any active cart holds a line item for the item.
  async fn item_in_active_cart(&mut self, item_id: ItemId) -> LedgerResult<bool>;

  async fn put_item(&mut self, item: &Item) -> LedgerResult<()>;

  async fn delete_item(&mut self, id: ItemId) -> LedgerResult<()>;

  async fn put_cart(&mut self, cart: &Cart) -> LedgerResult<()>;

  async fn put_line_item(&mut self, line: &CartLineItem) -> LedgerResult<()>;

  async fn delete_line_item(&mut self, id: LineItemId) -> LedgerResult<()>;

  async fn commit(self: Box<Self>) -> LedgerResult<()>;
}

/// Sorted, de-duplicated lock order for a set of items.
pub(crate) fn lock_order(ids: &[ItemId]) -> Vec<ItemId> {
  let mut ordered = ids.to_vec();
  ordered.sort_unstable();
  ordered.dedup();
  ordered
}
