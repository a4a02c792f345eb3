// core/src/carts.rs

//! Cart Store: cart headers and their joined line items.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::model::{Cart, CartDetails, CartId, CartLineItem, CartStatus, LineItemId, OwnerId};
use crate::retry::Prepared;
use crate::stockroom::Shared;

#[derive(Debug, Clone)]
pub struct CartStore {
  shared: Arc<Shared>,
}

impl CartStore {
  pub(crate) fn new(shared: Arc<Shared>) -> Self {
    Self { shared }
  }

  /// Opens an empty active cart for a customer.
  #[instrument(name = "carts::create_cart", skip(self, notes), fields(owner_id = %owner_id))]
  pub async fn create_cart(&self, owner_id: OwnerId, customer_name: &str, notes: Option<&str>) -> LedgerResult<Cart> {
    let cart = Cart::new(owner_id, customer_name, notes, self.shared.clock.now())
      .inspect_err(|err| warn!(error = %err, "Cart rejected"))?;
    self
      .shared
      .transact("create_cart", || async {
        let mut tx = self.shared.store.begin().await?;
        tx.put_cart(&cart).await?;
        Ok(Prepared::new(tx, ()))
      })
      .await?;
    info!(cart_id = %cart.id, customer = %cart.customer_name, "Cart created");
    Ok(cart)
  }

  /// The cart header only.
  #[instrument(name = "carts::get_cart_header", skip(self))]
  pub async fn get_cart_header(&self, id: CartId) -> LedgerResult<Cart> {
    self
      .shared
      .guarded("get_cart_header", || self.shared.store.cart(id))
      .await?
      .ok_or_else(|| LedgerError::not_found("cart", id))
  }

  /// The cart with its line items, each joined with the item's current name
  /// and stock.
  #[instrument(name = "carts::get_cart", skip(self))]
  pub async fn get_cart(&self, id: CartId) -> LedgerResult<CartDetails> {
    let cart = self.get_cart_header(id).await?;
    let lines = self
      .shared
      .guarded("cart_lines", || self.shared.store.cart_lines(id))
      .await?;
    Ok(CartDetails { cart, lines })
  }

  #[instrument(name = "carts::get_line_item", skip(self))]
  pub async fn get_line_item(&self, id: LineItemId) -> LedgerResult<CartLineItem> {
    self
      .shared
      .guarded("get_line_item", || self.shared.store.line_item(id))
      .await?
      .ok_or_else(|| LedgerError::not_found("cart line item", id))
  }

  /// Newest first, optionally restricted to one status.
  #[instrument(name = "carts::list_carts", skip(self))]
  pub async fn list_carts(&self, owner_id: OwnerId, status: Option<CartStatus>) -> LedgerResult<Vec<Cart>> {
    self
      .shared
      .guarded("list_carts", || self.shared.store.carts_by_owner(owner_id, status))
      .await
  }

  /// Moves the cart out of `active`. Only the status and its timestamps
  /// change; inventory is untouched, so completing through here is a
  /// checkout without stock reduction. An empty cart cannot be completed.
  #[instrument(name = "carts::set_cart_status", skip(self))]
  pub async fn set_cart_status(&self, id: CartId, status: CartStatus) -> LedgerResult<Cart> {
    self
      .shared
      .transact("set_cart_status", || async {
        let mut tx = self.shared.store.begin().await?;
        let mut cart = tx
          .lock_cart(id)
          .await?
          .ok_or_else(|| LedgerError::not_found("cart", id))?;
        if status == CartStatus::Completed && cart.is_active() && tx.line_items(id).await?.is_empty() {
          return Err(LedgerError::InvalidState(format!(
            "cart {} has no line items to complete",
            id
          )));
        }
        cart.transition(status, self.shared.clock.now())?;
        tx.put_cart(&cart).await?;
        Ok(Prepared::new(tx, cart))
      })
      .await
      .inspect(|cart| info!(cart_id = %id, status = %cart.status, "Cart status changed"))
      .inspect_err(|err| warn!(error = %err, "Cart status change rejected"))
  }
}
