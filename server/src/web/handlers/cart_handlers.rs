// stockroom_server/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use stockroom::{CartId, CartStatus, ItemId, LineItemId};
use tracing::{info, instrument};

use super::{owned_cart, owned_line_item};
use crate::errors::Result;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

// --- Request DTOs ---
#[derive(Deserialize, Debug)]
pub struct ListCartsQuery {
  pub status: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct CreateCartPayload {
  pub customer_name: String,
  pub notes: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct AddToCartPayload {
  pub item_id: ItemId,
  pub quantity: i32,
}

#[derive(Deserialize, Debug)]
pub struct UpdateQuantityPayload {
  pub quantity: i32,
}

// --- Handler Implementations ---

#[instrument(name = "handler::list_carts", skip(app_state, auth_user), fields(owner_id = %auth_user.owner_id))]
pub async fn list_carts_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<ListCartsQuery>,
) -> Result<HttpResponse> {
  let status = query.status.as_deref().map(str::parse::<CartStatus>).transpose()?;
  let carts = app_state.stockroom.carts().list_carts(auth_user.owner_id, status).await?;
  info!("Successfully fetched {} carts.", carts.len());
  Ok(HttpResponse::Ok().json(json!({ "carts": carts })))
}

#[instrument(name = "handler::create_cart", skip(app_state, auth_user, payload), fields(owner_id = %auth_user.owner_id))]
pub async fn create_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<CreateCartPayload>,
) -> Result<HttpResponse> {
  let cart = app_state
    .stockroom
    .carts()
    .create_cart(auth_user.owner_id, &payload.customer_name, payload.notes.as_deref())
    .await?;
  Ok(HttpResponse::Created().json(json!({
      "message": "Cart created successfully.",
      "cart": cart
  })))
}

#[instrument(name = "handler::get_cart", skip(app_state, auth_user, path), fields(cart_id = %path.as_ref()))]
pub async fn get_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<CartId>,
) -> Result<HttpResponse> {
  let cart_id = owned_cart(&app_state, &auth_user, path.into_inner()).await?.id;
  let details = app_state.stockroom.carts().get_cart(cart_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "cart": details })))
}

#[instrument(
    name = "handler::add_to_cart",
    skip(app_state, auth_user, path, payload),
    fields(cart_id = %path.as_ref(), item_id = %payload.item_id, quantity = %payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<CartId>,
  payload: web::Json<AddToCartPayload>,
) -> Result<HttpResponse> {
  let cart_id = owned_cart(&app_state, &auth_user, path.into_inner()).await?.id;
  let line_item = app_state
    .stockroom
    .ledger()
    .add_to_cart(cart_id, payload.item_id, payload.quantity)
    .await?;
  let cart = app_state.stockroom.carts().get_cart_header(cart_id).await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Item added to cart successfully.",
      "line_item": line_item,
      "cart": cart
  })))
}

#[instrument(name = "handler::update_line_item", skip(app_state, auth_user, path, payload), fields(line_item_id = %path.as_ref(), quantity = payload.quantity))]
pub async fn update_line_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<LineItemId>,
  payload: web::Json<UpdateQuantityPayload>,
) -> Result<HttpResponse> {
  let line_id = owned_line_item(&app_state, &auth_user, path.into_inner()).await?.id;
  let cart = app_state
    .stockroom
    .ledger()
    .update_line_item_quantity(line_id, payload.quantity)
    .await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Cart updated successfully.",
      "cart": cart
  })))
}

#[instrument(name = "handler::remove_line_item", skip(app_state, auth_user, path), fields(line_item_id = %path.as_ref()))]
pub async fn remove_line_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<LineItemId>,
) -> Result<HttpResponse> {
  let line_id = owned_line_item(&app_state, &auth_user, path.into_inner()).await?.id;
  let cart = app_state.stockroom.ledger().remove_line_item(line_id).await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Item removed from cart.",
      "cart": cart
  })))
}
