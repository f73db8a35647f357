// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storefront::checkout::{process_turn, BuyerInput, Reply};
use storefront::config::AppConfig;
use storefront::db::{Catalog, InMemoryCatalog, InMemoryOrderStore, OrderStore};
use storefront::errors::{AppError, ProviderError};
use storefront::models::{CustomerDetails, Order, OrderStatus, PaymentMethod, Product, ProviderId};
use storefront::services::liqpay;
use storefront::services::messaging::MessagingChannel;
use storefront::services::notifier::{spawn_notification_worker, Notification, NotificationQueue};
use storefront::services::payment_provider::{Invoice, InvoiceRequest, PaymentProvider, PaymentProviders};
use storefront::state::AppState;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Level;
use uuid::Uuid;

pub const LIQPAY_PUBLIC_KEY: &str = "sandbox_public";
pub const LIQPAY_PRIVATE_KEY: &str = "sandbox_private";
pub const MONOBANK_WEBHOOK_TOKEN: &str = "mono-hook-secret";
pub const OPERATORS: [i64; 2] = [900, 901];
pub const BUYER: i64 = 4242;
pub const BUYER_HANDLE: &str = "@test_buyer";
pub const KETTLE_ID: i64 = 1;
pub const SOFA_ID: i64 = 2;
pub const KETTLE_PRICE: i64 = 150_000;

// --- Tracing ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Fixtures ---
pub fn test_config() -> AppConfig {
  let vars: HashMap<&str, String> = HashMap::from([
    ("STORE_BACKEND", "memory".to_string()),
    ("WEBHOOK_DOMAIN", "https://shop.example.com".to_string()),
    ("BOT_USERNAME", "shop_bot".to_string()),
    ("OPERATOR_IDS", "900,901".to_string()),
    ("LIQPAY_PUBLIC_KEY", LIQPAY_PUBLIC_KEY.to_string()),
    ("LIQPAY_PRIVATE_KEY", LIQPAY_PRIVATE_KEY.to_string()),
    ("MONOBANK_WEBHOOK_TOKEN", MONOBANK_WEBHOOK_TOKEN.to_string()),
  ]);
  match AppConfig::from_lookup(|k| vars.get(k).cloned()) {
    Ok(config) => config,
    Err(e) => panic!("test config must load: {e}"),
  }
}

pub fn products() -> Vec<Product> {
  vec![
    Product {
      id: KETTLE_ID,
      name: "Kettle".to_string(),
      description: Some("Electric kettle, 1.7 l".to_string()),
      display_price: "1 500 UAH".to_string(),
      price_minor: Some(KETTLE_PRICE),
      media_ref: None,
    },
    Product {
      id: SOFA_ID,
      name: "Custom sofa".to_string(),
      description: None,
      display_price: "On request".to_string(),
      price_minor: None,
      media_ref: None,
    },
  ]
}

pub fn customer() -> CustomerDetails {
  CustomerDetails {
    name: "Test User".to_string(),
    phone: "+380991234567".to_string(),
    city: "Kyiv".to_string(),
    delivery_point: "Branch #5".to_string(),
  }
}

// --- Fake payment provider ---
pub struct FakeProvider {
  id: ProviderId,
  fail: bool,
  pub calls: AtomicUsize,
  pub last_request: Mutex<Option<InvoiceRequest>>,
}

impl FakeProvider {
  pub fn succeeding(id: ProviderId) -> Arc<Self> {
    Arc::new(Self {
      id,
      fail: false,
      calls: AtomicUsize::new(0),
      last_request: Mutex::new(None),
    })
  }

  pub fn failing(id: ProviderId) -> Arc<Self> {
    Arc::new(Self {
      id,
      fail: true,
      calls: AtomicUsize::new(0),
      last_request: Mutex::new(None),
    })
  }

  pub fn call_count(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
  fn id(&self) -> ProviderId {
    self.id
  }

  fn description_limit(&self) -> usize {
    127
  }

  async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, ProviderError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    *self.last_request.lock() = Some(request.clone());
    if self.fail {
      return Err(ProviderError::Rejected {
        status: 503,
        message: "service unavailable".to_string(),
      });
    }
    Ok(Invoice {
      url: format!("https://pay.example.com/{}", request.order_id),
      invoice_id: format!("inv-{}", request.order_id),
    })
  }
}

// --- Recording messaging channel ---
pub struct RecordingChannel {
  operators: Vec<i64>,
  pub sent: Mutex<Vec<(i64, String)>>,
}

impl RecordingChannel {
  pub fn new() -> Arc<Self> {
    Arc::new(Self {
      operators: OPERATORS.to_vec(),
      sent: Mutex::new(Vec::new()),
    })
  }

  pub fn messages_to(&self, chat_id: i64) -> Vec<String> {
    self
      .sent
      .lock()
      .iter()
      .filter(|(id, _)| *id == chat_id)
      .map(|(_, text)| text.clone())
      .collect()
  }
}

#[async_trait]
impl MessagingChannel for RecordingChannel {
  fn operator_ids(&self) -> &[i64] {
    &self.operators
  }

  async fn send_to_user(&self, user_id: i64, text: &str) -> Result<(), AppError> {
    self.sent.lock().push((user_id, text.to_string()));
    Ok(())
  }

  async fn describe_user(&self, user_id: i64) -> Option<String> {
    (user_id == BUYER).then(|| BUYER_HANDLE.to_string())
  }
}

// --- Order store whose customer-details write always fails ---
pub struct FailingDetailsStore {
  pub inner: InMemoryOrderStore,
}

#[async_trait]
impl OrderStore for FailingDetailsStore {
  async fn create_order(&self, user_id: i64, product_id: i64, amount_minor: i64) -> storefront::Result<Uuid> {
    self.inner.create_order(user_id, product_id, amount_minor).await
  }

  async fn set_payment_method(&self, order_id: Uuid, method: PaymentMethod) -> storefront::Result<()> {
    self.inner.set_payment_method(order_id, method).await
  }

  async fn attach_invoice(&self, order_id: Uuid, invoice_id: &str) -> storefront::Result<()> {
    self.inner.attach_invoice(order_id, invoice_id).await
  }

  async fn set_customer_details(&self, _order_id: Uuid, _details: &CustomerDetails) -> storefront::Result<()> {
    Err(AppError::StorageUnavailable("connection pool timed out".to_string()))
  }

  async fn transition_status(&self, order_id: Uuid, new_status: OrderStatus) -> storefront::Result<Option<Order>> {
    self.inner.transition_status(order_id, new_status).await
  }

  async fn get_order(&self, order_id: Uuid) -> storefront::Result<Option<Order>> {
    self.inner.get_order(order_id).await
  }
}

// --- Order store with a slow customer-details write ---
pub struct SlowDetailsStore {
  pub inner: InMemoryOrderStore,
  pub delay: Duration,
}

#[async_trait]
impl OrderStore for SlowDetailsStore {
  async fn create_order(&self, user_id: i64, product_id: i64, amount_minor: i64) -> storefront::Result<Uuid> {
    self.inner.create_order(user_id, product_id, amount_minor).await
  }

  async fn set_payment_method(&self, order_id: Uuid, method: PaymentMethod) -> storefront::Result<()> {
    self.inner.set_payment_method(order_id, method).await
  }

  async fn attach_invoice(&self, order_id: Uuid, invoice_id: &str) -> storefront::Result<()> {
    self.inner.attach_invoice(order_id, invoice_id).await
  }

  async fn set_customer_details(&self, order_id: Uuid, details: &CustomerDetails) -> storefront::Result<()> {
    tokio::time::sleep(self.delay).await;
    self.inner.set_customer_details(order_id, details).await
  }

  async fn transition_status(&self, order_id: Uuid, new_status: OrderStatus) -> storefront::Result<Option<Order>> {
    self.inner.transition_status(order_id, new_status).await
  }

  async fn get_order(&self, order_id: Uuid) -> storefront::Result<Option<Order>> {
    self.inner.get_order(order_id).await
  }
}

// --- Order store whose reads can be switched off ---
#[derive(Default)]
pub struct UnreadableStore {
  pub inner: InMemoryOrderStore,
  pub fail_reads: AtomicBool,
}

#[async_trait]
impl OrderStore for UnreadableStore {
  async fn create_order(&self, user_id: i64, product_id: i64, amount_minor: i64) -> storefront::Result<Uuid> {
    self.inner.create_order(user_id, product_id, amount_minor).await
  }

  async fn set_payment_method(&self, order_id: Uuid, method: PaymentMethod) -> storefront::Result<()> {
    self.inner.set_payment_method(order_id, method).await
  }

  async fn attach_invoice(&self, order_id: Uuid, invoice_id: &str) -> storefront::Result<()> {
    self.inner.attach_invoice(order_id, invoice_id).await
  }

  async fn set_customer_details(&self, order_id: Uuid, details: &CustomerDetails) -> storefront::Result<()> {
    self.inner.set_customer_details(order_id, details).await
  }

  async fn transition_status(&self, order_id: Uuid, new_status: OrderStatus) -> storefront::Result<Option<Order>> {
    self.inner.transition_status(order_id, new_status).await
  }

  async fn get_order(&self, order_id: Uuid) -> storefront::Result<Option<Order>> {
    if self.fail_reads.load(Ordering::SeqCst) {
      return Err(AppError::StorageUnavailable("replica lagging".to_string()));
    }
    self.inner.get_order(order_id).await
  }
}

// --- Harness ---
pub struct TestHarness {
  pub state: AppState,
  pub notifications: Option<mpsc::Receiver<Notification>>,
  /// Backs `state.messaging` and receives deliveries once `start_worker` runs.
  pub channel: Arc<RecordingChannel>,
}

pub fn as_provider(provider: &Arc<FakeProvider>) -> Arc<dyn PaymentProvider> {
  provider.clone()
}

/// Real LiqPay client (signing only, no network) plus any extra providers.
pub fn providers_with(extra: Vec<Arc<dyn PaymentProvider>>) -> PaymentProviders {
  let mut providers = PaymentProviders::from_config(&test_config(), reqwest::Client::new());
  for provider in extra {
    providers.register(provider);
  }
  providers
}

pub fn harness_with(orders: Arc<dyn OrderStore>, providers: PaymentProviders) -> TestHarness {
  setup_tracing();
  let catalog: Arc<dyn Catalog> = Arc::new(InMemoryCatalog::with_products(products()));
  let (notifier, rx) = NotificationQueue::new(64);
  let channel = RecordingChannel::new();
  let state = match AppState::new(&test_config(), orders, catalog, providers, notifier, channel.clone()) {
    Ok(state) => state,
    Err(e) => panic!("state must build: {e}"),
  };
  TestHarness {
    state,
    notifications: Some(rx),
    channel,
  }
}

pub fn harness(providers: PaymentProviders) -> TestHarness {
  harness_with(Arc::new(InMemoryOrderStore::new()), providers)
}

impl TestHarness {
  /// Everything queued so far, without waiting.
  pub fn drain_notifications(&mut self) -> Vec<Notification> {
    let mut out = Vec::new();
    if let Some(rx) = self.notifications.as_mut() {
      while let Ok(n) = rx.try_recv() {
        out.push(n);
      }
    }
    out
  }

  /// Hands the queue to a real worker delivering into `self.channel`.
  pub fn start_worker(&mut self) -> JoinHandle<()> {
    let rx = match self.notifications.take() {
      Some(rx) => rx,
      None => panic!("worker already started"),
    };
    spawn_notification_worker(rx, self.channel.clone())
  }

  pub async fn turn(&self, user_id: i64, input: BuyerInput) -> Vec<Reply> {
    match process_turn(&self.state, user_id, input).await {
      Ok(replies) => replies,
      Err(e) => panic!("turn failed: {e}"),
    }
  }

  pub async fn text(&self, user_id: i64, text: &str) -> Vec<Reply> {
    self.turn(user_id, BuyerInput::Text { text: text.to_string() }).await
  }

  /// Buys the kettle and returns the new order id.
  pub async fn buy_kettle(&self, user_id: i64) -> Uuid {
    let replies = self.turn(user_id, BuyerInput::Buy { product_id: KETTLE_ID }).await;
    match replies.first() {
      Some(Reply::PaymentOptions { order_id, .. }) => *order_id,
      other => panic!("expected payment options, got {other:?}"),
    }
  }

  /// Drives a full checkout for the kettle and returns the order id and the final replies.
  pub async fn checkout(&self, user_id: i64, method: PaymentMethod) -> (Uuid, Vec<Reply>) {
    let order_id = self.buy_kettle(user_id).await;
    self.turn(user_id, BuyerInput::ChoosePayment { order_id, method }).await;
    let c = customer();
    self.text(user_id, &c.phone).await;
    self.text(user_id, &c.name).await;
    self.text(user_id, &c.city).await;
    let replies = self.text(user_id, &c.delivery_point).await;
    (order_id, replies)
  }

  pub async fn order(&self, order_id: Uuid) -> Order {
    match self.state.orders.get_order(order_id).await {
      Ok(Some(order)) => order,
      other => panic!("order {order_id} not readable: {other:?}"),
    }
  }
}

pub fn operator_messages(notifications: &[Notification]) -> Vec<&str> {
  notifications
    .iter()
    .filter_map(|n| match n {
      Notification::Operators { text } => Some(text.as_str()),
      _ => None,
    })
    .collect()
}

pub fn buyer_messages(notifications: &[Notification], user_id: i64) -> Vec<&str> {
  notifications
    .iter()
    .filter_map(|n| match n {
      Notification::Buyer { user_id: id, text } if *id == user_id => Some(text.as_str()),
      _ => None,
    })
    .collect()
}

/// A correctly signed LiqPay callback for `order_id`.
pub fn liqpay_callback(order_id: Uuid, status: &str) -> (String, String) {
  let json = serde_json::json!({
    "order_id": order_id.to_string(),
    "status": status,
    "payment_id": 1_234_567,
    "amount": 1500.0,
    "currency": "UAH",
  });
  let data = STANDARD.encode(json.to_string());
  let signature = liqpay::sign(LIQPAY_PRIVATE_KEY, &data);
  (data, signature)
}

pub fn monobank_body(order_id: Uuid, status: &str) -> Vec<u8> {
  serde_json::json!({
    "invoiceId": format!("inv-{}", order_id),
    "status": status,
    "reference": order_id.to_string(),
    "amount": KETTLE_PRICE,
    "ccy": 980,
  })
  .to_string()
  .into_bytes()
}
