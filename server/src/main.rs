// stockroom_server/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use stockroom::OwnerId;
use stockroom_server::config::{AppConfig, LogFormat};
use stockroom_server::seed::seed_demo_inventory;
use stockroom_server::state::AppState;
use stockroom_server::web::configure_app_routes;
use tracing_subscriber::fmt::format::FmtSpan; // For span events in tracing
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter) // Allow RUST_LOG override
    .with_span_events(FmtSpan::CLOSE); // Log when spans close, showing duration
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  // Configuration decides the log format, so it is read first.
  let app_config = AppConfig::from_env()?;
  init_tracing(app_config.log_format);

  tracing::info!("Starting stockroom server...");

  let seed_demo_data = app_config.seed_demo_data;
  let seed_owner_id = app_config.seed_owner_id;
  let app_state = AppState::initialize(app_config).await?;

  if seed_demo_data {
    let owner_id = seed_owner_id.unwrap_or_else(OwnerId::new);
    let created = seed_demo_inventory(&app_state.stockroom, owner_id).await?;
    tracing::info!(%owner_id, created, "Demo data ready; send this id as X-User-ID to browse it.");
  }

  let server_address = app_state.config.bind_address();
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone())) // Share AppState with handlers
      .wrap(tracing_actix_web::TracingLogger::default()) // Actix middleware for tracing requests
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await?;

  tracing::info!("Server stopped.");
  Ok(())
}
