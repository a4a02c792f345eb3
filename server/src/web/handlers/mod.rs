// stockroom_server/src/web/handlers/mod.rs

pub mod cart_handlers;
pub mod checkout_handlers;
pub mod dashboard_handlers;
pub mod item_handlers;

use stockroom::{Cart, CartId, CartLineItem, Item, ItemId, LedgerError, LineItemId};

use crate::errors::Result;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

// Records that belong to another owner are reported exactly like missing ones.

pub(crate) async fn owned_item(state: &AppState, user: &AuthenticatedUser, id: ItemId) -> Result<Item> {
  let item = state.stockroom.items().get_item(id).await?;
  if item.owner_id != user.owner_id {
    return Err(LedgerError::not_found("item", id).into());
  }
  Ok(item)
}

pub(crate) async fn owned_cart(state: &AppState, user: &AuthenticatedUser, id: CartId) -> Result<Cart> {
  let cart = state.stockroom.carts().get_cart_header(id).await?;
  if cart.owner_id != user.owner_id {
    return Err(LedgerError::not_found("cart", id).into());
  }
  Ok(cart)
}

pub(crate) async fn owned_line_item(
  state: &AppState,
  user: &AuthenticatedUser,
  id: LineItemId,
) -> Result<CartLineItem> {
  let line = state.stockroom.carts().get_line_item(id).await?;
  let cart = state.stockroom.carts().get_cart_header(line.cart_id).await?;
  if cart.owner_id != user.owner_id {
    return Err(LedgerError::not_found("cart line item", id).into());
  }
  Ok(line)
}
