// stockroom_server/src/web/handlers/dashboard_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use stockroom::Clock;
use tracing::instrument;

use crate::errors::Result;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

const DEFAULT_ACTIVITY_LIMIT: usize = 10;

#[derive(Deserialize, Debug)]
pub struct RevenueQuery {
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
pub struct ActivityQuery {
  pub limit: Option<usize>,
}

#[instrument(name = "handler::dashboard_summary", skip(app_state, auth_user), fields(owner_id = %auth_user.owner_id))]
pub async fn dashboard_summary_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse> {
  let now = app_state.stockroom.clock().now();
  let summary = app_state
    .stockroom
    .queries()
    .dashboard_summary(auth_user.owner_id, now)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "as_of": now, "summary": summary })))
}

#[instrument(name = "handler::revenue", skip(app_state, auth_user), fields(owner_id = %auth_user.owner_id))]
pub async fn revenue_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<RevenueQuery>,
) -> Result<HttpResponse> {
  let revenue = app_state
    .stockroom
    .queries()
    .revenue_in_range(auth_user.owner_id, query.start, query.end)
    .await?;
  Ok(HttpResponse::Ok().json(json!({
      "start": query.start,
      "end": query.end,
      "revenue": revenue
  })))
}

#[instrument(name = "handler::recent_activity", skip(app_state, auth_user), fields(owner_id = %auth_user.owner_id))]
pub async fn recent_activity_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<ActivityQuery>,
) -> Result<HttpResponse> {
  let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
  let activity = app_state
    .stockroom
    .queries()
    .recent_activity(auth_user.owner_id, limit)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "activity": activity })))
}
