// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
  Postgres,
  Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub store_backend: StoreBackend,
  pub database_url: Option<String>,
  /// JSON array of products loaded into the in-memory catalog.
  pub catalog_seed_path: Option<String>,

  // Telegram
  pub bot_token: Option<String>,
  pub telegram_api_base: String,
  pub operator_ids: Vec<i64>,
  pub bot_username: Option<String>,

  /// Public base URL the providers call back on, e.g. `https://shop.example.com`.
  pub webhook_domain: String,

  // Monobank acquiring
  pub monobank_api_token: Option<String>,
  pub monobank_api_base: String,
  pub monobank_webhook_token: Option<String>,
  pub monobank_allowed_ips: Vec<IpAddr>,

  // LiqPay
  pub liqpay_public_key: Option<String>,
  pub liqpay_private_key: Option<String>,

  pub provider_timeout: Duration,
  pub notification_queue_capacity: usize,
  /// `None` disables idle eviction of checkout sessions.
  pub checkout_session_idle: Option<Duration>,
  pub checkout_session_sweep: Duration,
  pub log_format: LogFormat,
}

fn parse_var<T>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match raw {
    None => Ok(default),
    Some(v) => v
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))),
  }
}

fn parse_list<T>(name: &str, raw: Option<String>) -> Result<Vec<T>>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .unwrap_or_default()
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| {
      s.parse::<T>()
        .map_err(|e| AppError::Config(format!("Invalid entry '{}' in {}: {}", s, name, e)))
    })
    .collect()
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from an arbitrary variable source. Empty values count as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let server_host = get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse_var("SERVER_PORT", get("SERVER_PORT"), 8080u16)?;

    let store_backend = match get("STORE_BACKEND").as_deref().map(str::trim) {
      None | Some("postgres") => StoreBackend::Postgres,
      Some("memory") => StoreBackend::Memory,
      Some(other) => {
        return Err(AppError::Config(format!(
          "Invalid STORE_BACKEND '{}': expected 'postgres' or 'memory'",
          other
        )))
      }
    };
    let database_url = get("DATABASE_URL");
    if store_backend == StoreBackend::Postgres && database_url.is_none() {
      return Err(AppError::Config(
        "Missing environment variable 'DATABASE_URL' (required when STORE_BACKEND=postgres)".to_string(),
      ));
    }

    let webhook_domain = get("WEBHOOK_DOMAIN")
      .map(|d| d.trim_end_matches('/').to_string())
      .unwrap_or_else(|| format!("http://{}:{}", server_host, server_port));

    let log_format = match get("LOG_FORMAT").as_deref().map(str::trim) {
      None | Some("pretty") => LogFormat::Pretty,
      Some("json") => LogFormat::Json,
      Some(other) => return Err(AppError::Config(format!("Invalid LOG_FORMAT '{}'", other))),
    };

    let idle_secs = parse_var("CHECKOUT_SESSION_IDLE_SECS", get("CHECKOUT_SESSION_IDLE_SECS"), 3600u64)?;
    let sweep_secs = parse_var("CHECKOUT_SESSION_SWEEP_SECS", get("CHECKOUT_SESSION_SWEEP_SECS"), 60u64)?;
    if sweep_secs == 0 {
      return Err(AppError::Config("CHECKOUT_SESSION_SWEEP_SECS must be positive".to_string()));
    }
    let notification_queue_capacity =
      parse_var("NOTIFICATION_QUEUE_CAPACITY", get("NOTIFICATION_QUEUE_CAPACITY"), 1024usize)?;
    if notification_queue_capacity == 0 {
      return Err(AppError::Config("NOTIFICATION_QUEUE_CAPACITY must be positive".to_string()));
    }

    let config = Self {
      server_host,
      server_port,
      store_backend,
      database_url,
      catalog_seed_path: get("CATALOG_SEED_PATH"),
      bot_token: get("BOT_TOKEN"),
      telegram_api_base: get("TELEGRAM_API_BASE")
        .map(|b| b.trim_end_matches('/').to_string())
        .unwrap_or_else(|| "https://api.telegram.org".to_string()),
      operator_ids: parse_list("OPERATOR_IDS", get("OPERATOR_IDS"))?,
      bot_username: get("BOT_USERNAME").map(|u| u.trim_start_matches('@').to_string()),
      webhook_domain,
      monobank_api_token: get("MONOBANK_API_TOKEN"),
      monobank_api_base: get("MONOBANK_API_BASE")
        .map(|b| b.trim_end_matches('/').to_string())
        .unwrap_or_else(|| "https://api.monobank.ua".to_string()),
      monobank_webhook_token: get("MONOBANK_WEBHOOK_TOKEN"),
      monobank_allowed_ips: parse_list("MONOBANK_ALLOWED_IPS", get("MONOBANK_ALLOWED_IPS"))?,
      liqpay_public_key: get("LIQPAY_PUBLIC_KEY"),
      liqpay_private_key: get("LIQPAY_PRIVATE_KEY"),
      provider_timeout: Duration::from_secs(parse_var(
        "PROVIDER_TIMEOUT_SECS",
        get("PROVIDER_TIMEOUT_SECS"),
        15u64,
      )?),
      notification_queue_capacity,
      checkout_session_idle: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
      checkout_session_sweep: Duration::from_secs(sweep_secs),
      log_format,
    };

    if config.operator_ids.is_empty() {
      tracing::warn!("OPERATOR_IDS is empty; operator notifications will be dropped.");
    }
    if config.monobank_api_token.is_some() && config.monobank_webhook_token.is_none() {
      tracing::warn!("MONOBANK_WEBHOOK_TOKEN is not set; Monobank webhooks will be rejected.");
    }
    tracing::info!(backend = ?config.store_backend, "Application configuration loaded successfully.");

    Ok(config)
  }

  pub fn monobank_webhook_url(&self) -> Option<String> {
    self
      .monobank_webhook_token
      .as_ref()
      .map(|token| format!("{}/webhook/monobank?token={}", self.webhook_domain, token))
  }

  pub fn liqpay_webhook_url(&self) -> String {
    format!("{}/webhook/liqpay", self.webhook_domain)
  }

  /// Where the buyer lands after paying: back in the bot chat when its username is known.
  pub fn buyer_return_url(&self) -> Option<String> {
    self.bot_username.as_ref().map(|u| format!("https://t.me/{}", u))
  }
}
