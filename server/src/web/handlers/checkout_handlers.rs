// stockroom_server/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use stockroom::CartId;
use tracing::{info, instrument};

use super::owned_cart;
use crate::errors::Result;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct CheckoutQuery {
  /// Defaults to `true`; `false` completes the cart without touching stock.
  pub reduce_inventory: Option<bool>,
}

#[instrument(name = "handler::checkout", skip(app_state, auth_user, path, query), fields(cart_id = %path.as_ref()))]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<CartId>,
  query: web::Query<CheckoutQuery>,
) -> Result<HttpResponse> {
  let cart_id = owned_cart(&app_state, &auth_user, path.into_inner()).await?.id;
  let reduce_inventory = query.reduce_inventory.unwrap_or(true);
  let cart = app_state.stockroom.ledger().checkout(cart_id, reduce_inventory).await?;
  info!(total = %cart.total_amount, reduce_inventory, "Checkout completed.");
  Ok(HttpResponse::Ok().json(json!({
      "message": "Checkout completed successfully.",
      "cart": cart
  })))
}

#[instrument(name = "handler::cancel_cart", skip(app_state, auth_user, path), fields(cart_id = %path.as_ref()))]
pub async fn cancel_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<CartId>,
) -> Result<HttpResponse> {
  let cart_id = owned_cart(&app_state, &auth_user, path.into_inner()).await?.id;
  let cart = app_state.stockroom.ledger().cancel_cart(cart_id).await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Cart cancelled.",
      "cart": cart
  })))
}
