// stockroom_server/src/web/handlers/item_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use stockroom::{ItemId, ItemPatch, NewItem};
use tracing::{info, instrument};

use super::owned_item;
use crate::errors::{AppError, Result};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

const DEFAULT_SEARCH_LIMIT: usize = 20;

#[derive(Deserialize, Debug)]
pub struct SearchItemsQuery {
  #[serde(default)]
  pub q: String,
  pub limit: Option<usize>,
}

#[derive(Deserialize, Debug)]
pub struct DecrementStockPayload {
  pub amount: i32,
}

#[instrument(name = "handler::list_items", skip(app_state, auth_user), fields(owner_id = %auth_user.owner_id))]
pub async fn list_items_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse> {
  let items = app_state.stockroom.items().list_items(auth_user.owner_id).await?;
  info!("Successfully fetched {} items.", items.len());
  Ok(HttpResponse::Ok().json(json!({ "items": items })))
}

#[instrument(name = "handler::create_item", skip(app_state, auth_user, payload), fields(owner_id = %auth_user.owner_id))]
pub async fn create_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<NewItem>,
) -> Result<HttpResponse> {
  let item = app_state
    .stockroom
    .items()
    .create_item(auth_user.owner_id, payload.into_inner())
    .await?;
  Ok(HttpResponse::Created().json(json!({
      "message": "Item created successfully.",
      "item": item
  })))
}

#[instrument(name = "handler::search_items", skip(app_state, auth_user), fields(owner_id = %auth_user.owner_id))]
pub async fn search_items_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<SearchItemsQuery>,
) -> Result<HttpResponse> {
  let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
  let items = app_state
    .stockroom
    .items()
    .search_items(auth_user.owner_id, &query.q, limit)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "items": items })))
}

#[instrument(name = "handler::get_item", skip(app_state, auth_user, path), fields(item_id = %path.as_ref()))]
pub async fn get_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<ItemId>,
) -> Result<HttpResponse> {
  let item = owned_item(&app_state, &auth_user, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "item": item })))
}

#[instrument(name = "handler::update_item", skip(app_state, auth_user, path, payload), fields(item_id = %path.as_ref()))]
pub async fn update_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<ItemId>,
  payload: web::Json<ItemPatch>,
) -> Result<HttpResponse> {
  let patch = payload.into_inner();
  if patch.is_empty() {
    return Err(AppError::Validation("Request body contains no fields to update.".to_string()));
  }
  let item_id = owned_item(&app_state, &auth_user, path.into_inner()).await?.id;
  let item = app_state.stockroom.items().update_item(item_id, patch).await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Item updated successfully.",
      "item": item
  })))
}

#[instrument(name = "handler::delete_item", skip(app_state, auth_user, path), fields(item_id = %path.as_ref()))]
pub async fn delete_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<ItemId>,
) -> Result<HttpResponse> {
  let item_id = owned_item(&app_state, &auth_user, path.into_inner()).await?.id;
  app_state.stockroom.items().delete_item(item_id).await?;
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::decrement_stock", skip(app_state, auth_user, path, payload), fields(item_id = %path.as_ref(), amount = payload.amount))]
pub async fn decrement_stock_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<ItemId>,
  payload: web::Json<DecrementStockPayload>,
) -> Result<HttpResponse> {
  let item_id = owned_item(&app_state, &auth_user, path.into_inner()).await?.id;
  let item = app_state
    .stockroom
    .items()
    .decrement_stock(item_id, payload.amount)
    .await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Stock decremented successfully.",
      "item": item
  })))
}

#[instrument(name = "handler::low_stock_items", skip(app_state, auth_user), fields(owner_id = %auth_user.owner_id))]
pub async fn low_stock_items_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse> {
  let items = app_state.stockroom.queries().low_stock_items(auth_user.owner_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "items": items })))
}
