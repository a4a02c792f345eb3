// stockroom_server/src/web/routes.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::handlers::{cart_handlers, checkout_handlers, dashboard_handlers, item_handlers};

/// Liveness, plus a database round trip when the ledger is backed by PostgreSQL.
async fn health_check_handler(app_state: web::Data<AppState>) -> HttpResponse {
  let Some(pool) = &app_state.db_pool else {
    return HttpResponse::Ok().json(json!({ "status": "ok", "store": "memory" }));
  };
  match sqlx::query("SELECT 1").execute(pool).await {
    Ok(_) => HttpResponse::Ok().json(json!({ "status": "ok", "store": "postgres" })),
    Err(e) => {
      warn!(error = %e, "Health check database ping failed.");
      HttpResponse::ServiceUnavailable().json(json!({ "status": "degraded", "store": "postgres" }))
    }
  }
}

/// Extractor failures (bad JSON, bad query string, non-UUID path segment)
/// are reported in the same shape as every other error.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()))
    .app_data(web::PathConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()));
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  extractor_configs(cfg);
  cfg.service(
    web::scope("/api/v1")
      // Health Check Route
      .route("/health", web::get().to(health_check_handler))
      // Item Routes; fixed segments before `/{item_id}`
      .service(
        web::scope("/items")
          .route("", web::get().to(item_handlers::list_items_handler))
          .route("", web::post().to(item_handlers::create_item_handler))
          .route("/search", web::get().to(item_handlers::search_items_handler))
          .route("/low-stock", web::get().to(item_handlers::low_stock_items_handler))
          .route("/{item_id}", web::get().to(item_handlers::get_item_handler))
          .route("/{item_id}", web::patch().to(item_handlers::update_item_handler))
          .route("/{item_id}", web::delete().to(item_handlers::delete_item_handler))
          .route(
            "/{item_id}/decrement",
            web::post().to(item_handlers::decrement_stock_handler),
          ),
      )
      // Cart Routes
      .service(
        web::scope("/carts")
          .route("", web::get().to(cart_handlers::list_carts_handler))
          .route("", web::post().to(cart_handlers::create_cart_handler))
          .route("/{cart_id}", web::get().to(cart_handlers::get_cart_handler))
          .route("/{cart_id}/items", web::post().to(cart_handlers::add_to_cart_handler))
          .route(
            "/{cart_id}/checkout",
            web::post().to(checkout_handlers::checkout_handler),
          )
          .route("/{cart_id}/cancel", web::post().to(checkout_handlers::cancel_cart_handler)),
      )
      .service(
        web::scope("/cart-items")
          .route("/{line_item_id}", web::patch().to(cart_handlers::update_line_item_handler))
          .route("/{line_item_id}", web::delete().to(cart_handlers::remove_line_item_handler)),
      )
      // Dashboard Routes
      .service(
        web::scope("/dashboard")
          .route("", web::get().to(dashboard_handlers::dashboard_summary_handler))
          .route("/revenue", web::get().to(dashboard_handlers::revenue_handler))
          .route("/activity", web::get().to(dashboard_handlers::recent_activity_handler)),
      ),
  );
}
