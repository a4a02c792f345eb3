// core/src/ledger.rs

//! Ledger Engine: every mutation that spans a cart and its line items, or a
//! cart and the inventory.
//!
//! Each operation runs as one store transaction. The cart row is locked
//! first, then any items in ascending id order; the cart total is recomputed
//! from the line items before commit, so no reader ever sees a total that
//! disagrees with the lines. A failure at any step drops the transaction and
//! nothing it staged becomes visible. The deadline covers staging only; once
//! a transaction is handed to commit it is never reported as timed out.
//!
//! Stock is not reserved while a cart is open. `add_to_cart` compares the
//! requested quantity with current stock, quantity edits are not checked at
//! all, and only `checkout` enforces the limit.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::model::{cart_total, Cart, CartId, CartLineItem, CartStatus, ItemId, LineItemId};
use crate::retry::Prepared;
use crate::stockroom::Shared;
use crate::store::StoreTx;

#[derive(Debug, Clone)]
pub struct Ledger {
  shared: Arc<Shared>,
}

/// What a quantity edit does to its line item.
#[derive(Debug, Clone, Copy)]
enum LineEdit {
  SetQuantity(i32),
  Remove,
}

impl Ledger {
  pub(crate) fn new(shared: Arc<Shared>) -> Self {
    Self { shared }
  }

  /// Adds `quantity` units of an item to an active cart.
  ///
  /// A second add of the same item merges into the existing line item and
  /// keeps its original `price_at_time`. Fails with `InsufficientStock` when
  /// `quantity` alone exceeds the item's current stock.
  #[instrument(name = "ledger::add_to_cart", skip(self))]
  pub async fn add_to_cart(&self, cart_id: CartId, item_id: ItemId, quantity: i32) -> LedgerResult<CartLineItem> {
    self
      .shared
      .transact("add_to_cart", || self.add_to_cart_once(cart_id, item_id, quantity))
      .await
      .inspect(|line| {
        info!(
          line_item_id = %line.id,
          quantity = line.quantity,
          subtotal = %line.subtotal,
          "Item added to cart"
        )
      })
      .inspect_err(|err| warn!(error = %err, "Add to cart rejected"))
  }

  async fn add_to_cart_once(
    &self,
    cart_id: CartId,
    item_id: ItemId,
    quantity: i32,
  ) -> LedgerResult<Prepared<CartLineItem>> {
    let now = self.shared.clock.now();
    let mut tx = self.shared.store.begin().await?;
    let mut cart = lock_active_cart(tx.as_mut(), cart_id).await?;
    if quantity < 1 {
      return Err(LedgerError::validation(
        "quantity",
        format!("must be at least 1 (got {})", quantity),
      ));
    }

    let item = tx
      .lock_items(&[item_id])
      .await?
      .pop()
      .filter(|item| item.owner_id == cart.owner_id)
      .ok_or_else(|| LedgerError::not_found("item", item_id))?;
    if quantity > item.stock_quantity {
      return Err(LedgerError::InsufficientStock {
        item_id,
        requested: quantity,
        available: item.stock_quantity,
      });
    }

    let mut lines = tx.line_items(cart_id).await?;
    let line = match lines.iter_mut().find(|line| line.item_id == item_id) {
      Some(existing) => {
        let merged = existing.quantity.checked_add(quantity).ok_or_else(|| {
          LedgerError::validation("quantity", "merged quantity is out of range")
        })?;
        debug!(line_item_id = %existing.id, from = existing.quantity, to = merged, "Merging into existing line item");
        existing.set_quantity(merged);
        existing.clone()
      }
      None => {
        let created = CartLineItem::new(cart_id, item_id, quantity, item.price, now);
        lines.push(created.clone());
        created
      }
    };
    tx.put_line_item(&line).await?;
    persist_total(tx.as_mut(), &mut cart, &lines, now).await?;
    Ok(Prepared::new(tx, line))
  }

  /// Sets a line item's quantity. Anything below 1 removes the line item.
  ///
  /// The new quantity may exceed current stock; checkout is where that is
  /// rejected.
  #[instrument(name = "ledger::update_line_item_quantity", skip(self))]
  pub async fn update_line_item_quantity(&self, line_item_id: LineItemId, quantity: i32) -> LedgerResult<Cart> {
    let edit = if quantity < 1 {
      LineEdit::Remove
    } else {
      LineEdit::SetQuantity(quantity)
    };
    self
      .shared
      .transact("update_line_item_quantity", || self.edit_line_once(line_item_id, edit))
      .await
      .inspect(|cart| info!(cart_id = %cart.id, total = %cart.total_amount, "Line item quantity updated"))
      .inspect_err(|err| warn!(error = %err, "Quantity update rejected"))
  }

  #[instrument(name = "ledger::remove_line_item", skip(self))]
  pub async fn remove_line_item(&self, line_item_id: LineItemId) -> LedgerResult<Cart> {
    self
      .shared
      .transact("remove_line_item", || self.edit_line_once(line_item_id, LineEdit::Remove))
      .await
      .inspect(|cart| info!(cart_id = %cart.id, total = %cart.total_amount, "Line item removed"))
      .inspect_err(|err| warn!(error = %err, "Line item removal rejected"))
  }

  async fn edit_line_once(&self, line_item_id: LineItemId, edit: LineEdit) -> LedgerResult<Prepared<Cart>> {
    // A line item never moves between carts, so its cart id can be read
    // before the cart is locked.
    let cart_id = self
      .shared
      .store
      .line_item(line_item_id)
      .await?
      .map(|line| line.cart_id)
      .ok_or_else(|| LedgerError::not_found("cart line item", line_item_id))?;

    let now = self.shared.clock.now();
    let mut tx = self.shared.store.begin().await?;
    let mut cart = lock_active_cart(tx.as_mut(), cart_id).await?;
    let mut lines = tx.line_items(cart_id).await?;
    let position = lines
      .iter()
      .position(|line| line.id == line_item_id)
      .ok_or_else(|| LedgerError::not_found("cart line item", line_item_id))?;

    match edit {
      LineEdit::SetQuantity(quantity) => {
        let line = &mut lines[position];
        line.set_quantity(quantity);
        tx.put_line_item(line).await?;
      }
      LineEdit::Remove => {
        lines.remove(position);
        tx.delete_line_item(line_item_id).await?;
      }
    }
    persist_total(tx.as_mut(), &mut cart, &lines, now).await?;
    Ok(Prepared::new(tx, cart))
  }

  /// Completes an active, non-empty cart.
  ///
  /// With `reduce_inventory`, every item's stock is reduced by the cart's
  /// quantity of it in the same transaction. If any item falls short the
  /// whole checkout fails with `InsufficientStock` naming the first short
  /// item in id order, and neither stock nor the cart changes.
  #[instrument(name = "ledger::checkout", skip(self))]
  pub async fn checkout(&self, cart_id: CartId, reduce_inventory: bool) -> LedgerResult<Cart> {
    self
      .shared
      .transact("checkout", || self.checkout_once(cart_id, reduce_inventory))
      .await
      .inspect(|cart| info!(total = %cart.total_amount, "Cart checked out"))
      .inspect_err(|err| warn!(error = %err, "Checkout rejected"))
  }

  async fn checkout_once(&self, cart_id: CartId, reduce_inventory: bool) -> LedgerResult<Prepared<Cart>> {
    let mut tx = self.shared.store.begin().await?;
    let mut cart = lock_active_cart(tx.as_mut(), cart_id).await?;
    let lines = tx.line_items(cart_id).await?;
    if lines.is_empty() {
      return Err(LedgerError::InvalidState(format!(
        "cart {} has no line items to check out",
        cart_id
      )));
    }

    let now = self.shared.clock.now();
    if reduce_inventory {
      let mut demand: BTreeMap<ItemId, i32> = BTreeMap::new();
      for line in &lines {
        let wanted = demand.entry(line.item_id).or_insert(0);
        *wanted = wanted.saturating_add(line.quantity);
      }
      let ids: Vec<ItemId> = demand.keys().copied().collect();
      let mut items = tx.lock_items(&ids).await?;

      // Check everything before staging anything.
      for (item_id, requested) in &demand {
        let item = items
          .iter()
          .find(|item| item.id == *item_id)
          .ok_or_else(|| LedgerError::not_found("item", item_id))?;
        if *requested > item.stock_quantity {
          return Err(LedgerError::InsufficientStock {
            item_id: *item_id,
            requested: *requested,
            available: item.stock_quantity,
          });
        }
      }
      for item in &mut items {
        let requested = demand.get(&item.id).copied().unwrap_or(0);
        item.stock_quantity -= requested;
        item.updated_at = now;
        debug!(item_id = %item.id, requested, remaining = item.stock_quantity, "Stock reduced");
        tx.put_item(item).await?;
      }
    }

    cart.set_total(cart_total(&lines), now);
    cart.transition(CartStatus::Completed, now)?;
    tx.put_cart(&cart).await?;
    Ok(Prepared::new(tx, cart))
  }

  /// Cancels an active cart. Inventory is not touched.
  #[instrument(name = "ledger::cancel_cart", skip(self))]
  pub async fn cancel_cart(&self, cart_id: CartId) -> LedgerResult<Cart> {
    self
      .shared
      .transact("cancel_cart", || async {
        let mut tx = self.shared.store.begin().await?;
        let mut cart = lock_cart(tx.as_mut(), cart_id).await?;
        cart.transition(CartStatus::Cancelled, self.shared.clock.now())?;
        tx.put_cart(&cart).await?;
        Ok(Prepared::new(tx, cart))
      })
      .await
      .inspect(|_| info!("Cart cancelled"))
      .inspect_err(|err| warn!(error = %err, "Cancellation rejected"))
  }
}

async fn lock_cart(tx: &mut dyn StoreTx, cart_id: CartId) -> LedgerResult<Cart> {
  tx.lock_cart(cart_id)
    .await?
    .ok_or_else(|| LedgerError::not_found("cart", cart_id))
}

async fn lock_active_cart(tx: &mut dyn StoreTx, cart_id: CartId) -> LedgerResult<Cart> {
  let cart = lock_cart(tx, cart_id).await?;
  cart.ensure_active()?;
  Ok(cart)
}

async fn persist_total(
  tx: &mut dyn StoreTx,
  cart: &mut Cart,
  lines: &[CartLineItem],
  now: DateTime<Utc>,
) -> LedgerResult<()> {
  let total = cart_total(lines);
  debug!(cart_id = %cart.id, lines = lines.len(), total = %total, "Cart total recomputed");
  cart.set_total(total, now);
  tx.put_cart(cart).await
}
