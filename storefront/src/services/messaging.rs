// storefront/src/services/messaging.rs

//! Outbound chat messages. Texts are HTML (Telegram `parse_mode = HTML`), so any
//! buyer-supplied value must go through [`escape_html`] first.

use crate::errors::AppError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, instrument};

pub fn escape_html(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      _ => out.push(c),
    }
  }
  out
}

#[async_trait]
pub trait MessagingChannel: Send + Sync {
  fn operator_ids(&self) -> &[i64];

  async fn send_to_user(&self, user_id: i64, text: &str) -> Result<(), AppError>;

  /// Human-readable name of a chat user, if the backend can resolve one.
  async fn describe_user(&self, _user_id: i64) -> Option<String> {
    None
  }

  /// Best effort: every operator is attempted and failures are only logged.
  async fn send_to_operators(&self, text: &str) {
    for &operator_id in self.operator_ids() {
      if let Err(e) = self.send_to_user(operator_id, text).await {
        error!(operator_id, error = %e, "Failed to notify operator.");
      }
    }
  }
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
  ok: bool,
  description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatEnvelope {
  ok: bool,
  result: Option<TelegramChat>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramChat {
  username: Option<String>,
  first_name: Option<String>,
  last_name: Option<String>,
}

impl TelegramChat {
  /// `@username` when set, otherwise the full name.
  fn display_name(&self) -> Option<String> {
    if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
      return Some(format!("@{}", username));
    }
    let full = [self.first_name.as_deref(), self.last_name.as_deref()]
      .into_iter()
      .flatten()
      .map(str::trim)
      .filter(|p| !p.is_empty())
      .collect::<Vec<_>>()
      .join(" ");
    (!full.is_empty()).then_some(full)
  }
}

pub struct TelegramChannel {
  http: reqwest::Client,
  send_message_url: String,
  get_chat_url: String,
  operator_ids: Vec<i64>,
}

impl TelegramChannel {
  pub fn new(http: reqwest::Client, api_base: &str, bot_token: &str, operator_ids: Vec<i64>) -> Self {
    Self {
      http,
      send_message_url: format!("{}/bot{}/sendMessage", api_base, bot_token),
      get_chat_url: format!("{}/bot{}/getChat", api_base, bot_token),
      operator_ids,
    }
  }
}

#[async_trait]
impl MessagingChannel for TelegramChannel {
  fn operator_ids(&self) -> &[i64] {
    &self.operator_ids
  }

  #[instrument(name = "telegram::send_message", skip(self, text))]
  async fn send_to_user(&self, user_id: i64, text: &str) -> Result<(), AppError> {
    let response = self
      .http
      .post(&self.send_message_url)
      .json(&json!({
        "chat_id": user_id,
        "text": text,
        "parse_mode": "HTML",
        "disable_web_page_preview": true,
      }))
      .send()
      .await
      .map_err(|e| AppError::Delivery(format!("Telegram unreachable: {}", e.without_url())))?;

    let status = response.status();
    let body: TelegramResponse = response
      .json()
      .await
      .map_err(|e| AppError::Delivery(format!("Unreadable Telegram response (HTTP {}): {}", status, e.without_url())))?;
    if !body.ok {
      return Err(AppError::Delivery(format!(
        "Telegram refused message (HTTP {}): {}",
        status,
        body.description.unwrap_or_default()
      )));
    }
    Ok(())
  }

  #[instrument(name = "telegram::get_chat", skip(self))]
  async fn describe_user(&self, user_id: i64) -> Option<String> {
    let response = self
      .http
      .post(&self.get_chat_url)
      .json(&json!({ "chat_id": user_id }))
      .send()
      .await;
    let envelope = match response {
      Ok(r) => r.json::<ChatEnvelope>().await,
      Err(e) => Err(e),
    };
    match envelope {
      Ok(ChatEnvelope { ok: true, result: Some(chat) }) => chat.display_name(),
      Ok(_) => None,
      Err(e) => {
        debug!(error = %e.without_url(), "Could not resolve chat user; falling back to id.");
        None
      }
    }
  }
}

/// Stand-in used when no bot token is configured: messages go to the log only.
pub struct LogOnlyChannel {
  operator_ids: Vec<i64>,
}

impl LogOnlyChannel {
  pub fn new(operator_ids: Vec<i64>) -> Self {
    Self { operator_ids }
  }
}

#[async_trait]
impl MessagingChannel for LogOnlyChannel {
  fn operator_ids(&self) -> &[i64] {
    &self.operator_ids
  }

  async fn send_to_user(&self, user_id: i64, text: &str) -> Result<(), AppError> {
    info!(user_id, %text, "Outbound message (no messaging backend configured).");
    Ok(())
  }
}
