// storefront/src/main.rs

use anyhow::Context;
use actix_web::{web as actix_data, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use storefront::checkout::spawn_session_janitor;
use storefront::config::{AppConfig, LogFormat, StoreBackend};
use storefront::db::{postgres, Catalog, InMemoryCatalog, InMemoryOrderStore, OrderStore, PgCatalog, PgOrderStore};
use storefront::services::messaging::{LogOnlyChannel, MessagingChannel, TelegramChannel};
use storefront::services::notifier::{spawn_notification_worker, NotificationQueue};
use storefront::services::payment_provider::PaymentProviders;
use storefront::state::AppState;
use storefront::web::{configure_app_routes, RedactedRootSpan};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

async fn build_stores(config: &AppConfig) -> anyhow::Result<(Arc<dyn OrderStore>, Arc<dyn Catalog>)> {
  match config.store_backend {
    StoreBackend::Memory => {
      tracing::warn!("Using in-memory store; orders are lost on restart.");
      let catalog = match config.catalog_seed_path.as_deref() {
        Some(path) => {
          let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read catalog seed {}", path))?;
          let catalog = InMemoryCatalog::from_json(&json)?;
          tracing::info!(path, products = catalog.len(), "Seeded in-memory catalog");
          catalog
        }
        None => {
          tracing::warn!("CATALOG_SEED_PATH not set; in-memory catalog is empty and every buy link will miss.");
          InMemoryCatalog::new()
        }
      };
      Ok((Arc::new(InMemoryOrderStore::new()), Arc::new(catalog)))
    }
    StoreBackend::Postgres => {
      let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required for the postgres backend")?;
      let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("Failed to connect to the database")?;
      tracing::info!("Successfully connected to the database.");
      postgres::run_migrations(&pool).await?;
      tracing::info!("Database migrations applied.");
      Ok((Arc::new(PgOrderStore::new(pool.clone())), Arc::new(PgCatalog::new(pool))))
    }
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  let app_config = Arc::new(AppConfig::from_env()?);
  init_tracing(app_config.log_format);
  tracing::info!("Starting storefront server...");

  let http = reqwest::Client::builder()
    .timeout(app_config.provider_timeout)
    .build()
    .context("Failed to build HTTP client")?;

  let (orders, catalog) = build_stores(&app_config).await?;
  let providers = PaymentProviders::from_config(&app_config, http.clone());

  let channel: Arc<dyn MessagingChannel> = match &app_config.bot_token {
    Some(token) => Arc::new(TelegramChannel::new(
      http.clone(),
      &app_config.telegram_api_base,
      token,
      app_config.operator_ids.clone(),
    )),
    None => {
      tracing::warn!("BOT_TOKEN is not set; outbound messages are only logged.");
      Arc::new(LogOnlyChannel::new(app_config.operator_ids.clone()))
    }
  };
  let (notifier, notifications) = NotificationQueue::new(app_config.notification_queue_capacity);
  let worker = spawn_notification_worker(notifications, channel.clone());

  let app_state = AppState::new(&app_config, orders, catalog, providers, notifier, channel)?;

  let janitor = app_config
    .checkout_session_idle
    .map(|idle| spawn_session_janitor(app_state.sessions.clone(), idle, app_config.checkout_session_sweep));

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  let server_state = app_state.clone();
  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(server_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::<RedactedRootSpan>::new())
      .configure(configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run()
  .await?;

  tracing::info!("Server stopped, draining notifications...");
  if let Some(janitor) = janitor {
    janitor.abort();
  }
  drop(app_state);
  match tokio::time::timeout(Duration::from_secs(10), worker).await {
    Ok(Ok(())) => {}
    Ok(Err(e)) => tracing::error!(error = %e, "Notification worker ended abnormally."),
    Err(_) => tracing::warn!("Notification worker did not drain in time; pending messages are dropped."),
  }
  Ok(())
}
