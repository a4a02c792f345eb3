// core/src/items.rs

//! Item Store: registration, edits and lookups of stocked items.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::model::{Item, ItemId, ItemPatch, NewItem, OwnerId};
use crate::retry::Prepared;
use crate::stockroom::Shared;

#[derive(Debug, Clone)]
pub struct ItemStore {
  shared: Arc<Shared>,
}

impl ItemStore {
  pub(crate) fn new(shared: Arc<Shared>) -> Self {
    Self { shared }
  }

  /// Validates and stores a new item. Names are trimmed and prices
  /// normalised to two decimal places.
  #[instrument(name = "items::create_item", skip(self, fields), fields(owner_id = %owner_id))]
  pub async fn create_item(&self, owner_id: OwnerId, fields: NewItem) -> LedgerResult<Item> {
    let item = Item::new(owner_id, fields, self.shared.clock.now())
      .inspect_err(|err| warn!(error = %err, "Item rejected"))?;
    self
      .shared
      .transact("create_item", || async {
        let mut tx = self.shared.store.begin().await?;
        tx.put_item(&item).await?;
        Ok(Prepared::new(tx, ()))
      })
      .await?;
    info!(item_id = %item.id, name = %item.name, stock = item.stock_quantity, "Item created");
    Ok(item)
  }

  #[instrument(name = "items::get_item", skip(self))]
  pub async fn get_item(&self, id: ItemId) -> LedgerResult<Item> {
    self
      .shared
      .guarded("get_item", || self.shared.store.item(id))
      .await?
      .ok_or_else(|| LedgerError::not_found("item", id))
  }

  /// Applies the provided fields. Nothing changes unless every field is valid.
  #[instrument(name = "items::update_item", skip(self, patch))]
  pub async fn update_item(&self, id: ItemId, patch: ItemPatch) -> LedgerResult<Item> {
    self
      .shared
      .transact("update_item", || async {
        let mut tx = self.shared.store.begin().await?;
        let mut item = tx
          .lock_items(&[id])
          .await?
          .pop()
          .ok_or_else(|| LedgerError::not_found("item", id))?;
        item.apply(patch.clone(), self.shared.clock.now())?;
        tx.put_item(&item).await?;
        Ok(Prepared::new(tx, item))
      })
      .await
      .inspect(|item| info!(item_id = %item.id, stock = item.stock_quantity, price = %item.price, "Item updated"))
      .inspect_err(|err| warn!(error = %err, "Item update rejected"))
  }

  /// Deletes the item unless a line item of an active cart still refers to it.
  /// Completed and cancelled carts keep their line items as history.
  #[instrument(name = "items::delete_item", skip(self))]
  pub async fn delete_item(&self, id: ItemId) -> LedgerResult<()> {
    self
      .shared
      .transact("delete_item", || async {
        let mut tx = self.shared.store.begin().await?;
        if tx.lock_items(&[id]).await?.is_empty() {
          return Err(LedgerError::not_found("item", id));
        }
        if tx.item_in_active_cart(id).await? {
          return Err(LedgerError::Conflict(format!(
            "item {} is referenced by an active cart",
            id
          )));
        }
        tx.delete_item(id).await?;
        Ok(Prepared::new(tx, ()))
      })
      .await
      .inspect(|_| info!(item_id = %id, "Item deleted"))
      .inspect_err(|err| warn!(error = %err, "Item deletion rejected"))
  }

  /// Case-insensitive substring search on name, ordered by name. `limit` is
  /// clamped to the configured maximum; an empty query matches every item.
  #[instrument(name = "items::search_items", skip(self))]
  pub async fn search_items(&self, owner_id: OwnerId, query: &str, limit: usize) -> LedgerResult<Vec<Item>> {
    let limit = limit.min(self.shared.config.search_limit_max);
    if limit == 0 {
      return Ok(Vec::new());
    }
    let query = query.trim();
    let items = self
      .shared
      .guarded("search_items", || self.shared.store.search_items(owner_id, query, limit))
      .await?;
    debug!(matches = items.len(), "Item search finished");
    Ok(items)
  }

  /// The owner's full inventory ordered by name.
  #[instrument(name = "items::list_items", skip(self))]
  pub async fn list_items(&self, owner_id: OwnerId) -> LedgerResult<Vec<Item>> {
    self
      .shared
      .guarded("list_items", || self.shared.store.items_by_owner(owner_id))
      .await
  }

  /// Atomically removes `amount` units from stock. Fails without changes
  /// when the item holds fewer than `amount` units.
  #[instrument(name = "items::decrement_stock", skip(self))]
  pub async fn decrement_stock(&self, id: ItemId, amount: i32) -> LedgerResult<Item> {
    if amount < 1 {
      return Err(LedgerError::validation(
        "amount",
        format!("must be at least 1 (got {})", amount),
      ));
    }
    self
      .shared
      .transact("decrement_stock", || async {
        let mut tx = self.shared.store.begin().await?;
        let mut item = tx
          .lock_items(&[id])
          .await?
          .pop()
          .ok_or_else(|| LedgerError::not_found("item", id))?;
        if amount > item.stock_quantity {
          return Err(LedgerError::InsufficientStock {
            item_id: id,
            requested: amount,
            available: item.stock_quantity,
          });
        }
        item.stock_quantity -= amount;
        item.updated_at = self.shared.clock.now();
        tx.put_item(&item).await?;
        Ok(Prepared::new(tx, item))
      })
      .await
      .inspect(|item| info!(item_id = %id, amount, remaining = item.stock_quantity, "Stock decremented"))
      .inspect_err(|err| warn!(error = %err, "Stock decrement rejected"))
  }
}
