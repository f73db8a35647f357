// storefront/src/web/root_span.rs

//! Request spans for `TracingLogger`. Only the path is recorded as the target:
//! provider callback URLs carry a shared secret in their query string.

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::Uri;
use actix_web::Error;
use tracing::field::Empty;
use tracing::Span;
use tracing_actix_web::{DefaultRootSpanBuilder, RootSpanBuilder};

pub struct RedactedRootSpan;

/// What gets logged as `http.target`.
pub fn loggable_target(uri: &Uri) -> &str {
  uri.path()
}

impl RootSpanBuilder for RedactedRootSpan {
  fn on_request_start(request: &ServiceRequest) -> Span {
    let route = request.match_pattern().unwrap_or_else(|| "default".to_string());
    let client_ip = request
      .connection_info()
      .realip_remote_addr()
      .unwrap_or_default()
      .to_string();
    tracing::info_span!(
      "HTTP request",
      http.method = %request.method(),
      http.route = %route,
      http.target = %loggable_target(request.uri()),
      http.client_ip = %client_ip,
      http.status_code = Empty,
      otel.name = %format!("HTTP {} {}", request.method(), route),
      otel.status_code = Empty,
      exception.message = Empty,
      exception.details = Empty,
    )
  }

  fn on_request_end<B: MessageBody>(span: Span, outcome: &Result<ServiceResponse<B>, Error>) {
    DefaultRootSpanBuilder::on_request_end(span, outcome);
  }
}
