// cart_service/src/main.rs

mod broker;
mod config;
mod db;
mod errors;
mod state;
mod web;

use crate::config::AppConfig;
use crate::db::PgStore;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use cartflow::rpc::Dispatcher;
use cartflow::{Shop, ShopSettings};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // RUST_LOG override
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting cart service...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      panic!("Configuration error: {}", e);
    }
  };

  let db_pool = match db::connect(&app_config).await {
    Ok(pool) => pool,
    Err(e) => {
      tracing::error!(error = %e, "Failed to prepare the database.");
      panic!("Database connection error: {}", e);
    }
  };

  let settings = ShopSettings {
    auto_register_products: app_config.catalog_auto_register,
  };
  let shop = Arc::new(Shop::new(Arc::new(PgStore::new(db_pool)), settings));

  let app_state = AppState {
    shop: shop.clone(),
    config: app_config.clone(),
  };
  let dispatcher = Dispatcher::new(shop, app_config.rpc_deadline);

  let server_address = app_config.server_address();
  tracing::info!("Attempting to bind server to {}...", server_address);

  let server = HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run();

  // Either transport stopping takes the whole process down.
  tokio::select! {
    served = server => served,
    consumed = broker::run_consumer(&app_config, dispatcher) => {
      match consumed {
        Ok(()) => tracing::warn!("RPC consumer stopped; shutting down."),
        Err(ref e) => tracing::error!(error = %e, "RPC consumer failed; shutting down."),
      }
      consumed.map_err(std::io::Error::other)
    }
  }
}
