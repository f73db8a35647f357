// storefront/src/state.rs

use crate::checkout::SessionRegistry;
use crate::config::AppConfig;
use crate::db::{Catalog, OrderStore};
use crate::errors::Result;
use crate::pipelines::{build_workflows, Workflows};
use crate::services::messaging::MessagingChannel;
use crate::services::notifier::NotificationQueue;
use crate::services::payment_provider::PaymentProviders;
use crate::services::webhook_auth::WebhookVerifier;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub orders: Arc<dyn OrderStore>,
  pub catalog: Arc<dyn Catalog>,
  pub providers: Arc<PaymentProviders>,
  pub verifier: Arc<WebhookVerifier>,
  pub notifier: NotificationQueue,
  /// Direct channel access for lookups; outbound messages go through `notifier`.
  pub messaging: Arc<dyn MessagingChannel>,
  pub sessions: Arc<SessionRegistry>,
  pub workflows: Arc<Workflows>,
}

impl AppState {
  pub fn new(
    config: &AppConfig,
    orders: Arc<dyn OrderStore>,
    catalog: Arc<dyn Catalog>,
    providers: PaymentProviders,
    notifier: NotificationQueue,
    messaging: Arc<dyn MessagingChannel>,
  ) -> Result<Self> {
    Ok(Self {
      verifier: Arc::new(WebhookVerifier::from_config(config)),
      orders,
      catalog,
      providers: Arc::new(providers),
      notifier,
      messaging,
      sessions: Arc::new(SessionRegistry::new()),
      workflows: Arc::new(build_workflows()?),
    })
  }
}
