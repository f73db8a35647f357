// storefront/src/errors.rs

use crate::workflow::WorkflowError;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Failures talking to a payment aggregator.
#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("Payment provider '{0}' is not configured")]
  NotConfigured(&'static str),

  #[error("Payment provider unreachable: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("Payment provider rejected the request (HTTP {status}): {message}")]
  Rejected { status: u16, message: String },

  #[error("Payment provider returned a malformed response: {0}")]
  MalformedResponse(String),

  #[error("Could not build payment request: {0}")]
  InvalidRequest(String),

  #[error("Unsupported by payment provider: {0}")]
  Unsupported(String),
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Payment Provider Error: {0}")]
  Provider(#[from] ProviderError),

  #[error("Database Error: {0}")]
  Storage(#[from] sqlx::Error),

  #[error("Storage Unavailable: {0}")]
  StorageUnavailable(String),

  #[error("Security Error: {0}")]
  Security(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Message Delivery Error: {0}")]
  Delivery(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Workflow Error: {0}")]
  Workflow(#[from] WorkflowError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::Security(_) => HttpResponse::Forbidden().json(json!({"error": "Forbidden"})),
      AppError::Provider(_) => HttpResponse::BadGateway().json(json!({"error": "Payment provider error"})),
      AppError::Delivery(_) => HttpResponse::BadGateway().json(json!({"error": "Message delivery failed"})),
      AppError::Storage(_) => HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"})),
      AppError::StorageUnavailable(_) => {
        HttpResponse::ServiceUnavailable().json(json!({"error": "Storage temporarily unavailable"}))
      }
      AppError::Config(_) => HttpResponse::InternalServerError().json(json!({"error": "Configuration issue"})),
      AppError::Workflow(source) => {
        tracing::error!(workflow_error = ?source, "Workflow error details");
        HttpResponse::InternalServerError().json(json!({"error": "Workflow processing error"}))
      }
      AppError::Internal(_) => HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred"})),
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
