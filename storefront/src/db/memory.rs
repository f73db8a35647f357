// storefront/src/db/memory.rs

//! Process-local stores for dev mode and tests. Every operation runs under one
//! lock, which gives `transition_status` the same atomicity as the SQL version.

use crate::db::{Catalog, OrderStore};
use crate::errors::{AppError, Result};
use crate::models::{CustomerDetails, Order, OrderStatus, PaymentMethod, Product};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryOrderStore {
  orders: Mutex<HashMap<Uuid, Order>>,
}

impl InMemoryOrderStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.orders.lock().is_empty()
  }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
  async fn create_order(&self, user_id: i64, product_id: i64, amount_minor: i64) -> Result<Uuid> {
    let order = Order {
      id: Uuid::new_v4(),
      user_id,
      product_id,
      amount_minor,
      payment_method: None,
      invoice_id: None,
      status: OrderStatus::Pending,
      created_at: Utc::now(),
      customer: None,
    };
    let id = order.id;
    self.orders.lock().insert(id, order);
    Ok(id)
  }

  async fn set_payment_method(&self, order_id: Uuid, method: PaymentMethod) -> Result<()> {
    if let Some(order) = self.orders.lock().get_mut(&order_id) {
      if order.status != OrderStatus::Paid {
        order.payment_method = Some(method);
      }
    }
    Ok(())
  }

  async fn attach_invoice(&self, order_id: Uuid, invoice_id: &str) -> Result<()> {
    if let Some(order) = self.orders.lock().get_mut(&order_id) {
      order.invoice_id = Some(invoice_id.to_string());
    }
    Ok(())
  }

  async fn set_customer_details(&self, order_id: Uuid, details: &CustomerDetails) -> Result<()> {
    if let Some(order) = self.orders.lock().get_mut(&order_id) {
      order.customer = Some(details.clone());
    }
    Ok(())
  }

  async fn transition_status(&self, order_id: Uuid, new_status: OrderStatus) -> Result<Option<Order>> {
    let mut orders = self.orders.lock();
    match orders.get_mut(&order_id) {
      Some(order) if new_status.can_transition_from(order.status) => {
        order.status = new_status;
        Ok(Some(order.clone()))
      }
      _ => Ok(None),
    }
  }

  async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>> {
    Ok(self.orders.lock().get(&order_id).cloned())
  }
}

#[derive(Default)]
pub struct InMemoryCatalog {
  products: RwLock<HashMap<i64, Product>>,
}

impl InMemoryCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
    let catalog = Self::new();
    for product in products {
      catalog.insert(product);
    }
    catalog
  }

  /// Parses a JSON array of products, e.g. a dev-mode seed file.
  pub fn from_json(json: &str) -> Result<Self> {
    let products: Vec<Product> =
      serde_json::from_str(json).map_err(|e| AppError::Config(format!("Invalid catalog seed: {}", e)))?;
    Ok(Self::with_products(products))
  }

  pub fn len(&self) -> usize {
    self.products.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.products.read().is_empty()
  }

  pub fn insert(&self, product: Product) {
    self.products.write().insert(product.id, product);
  }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
  async fn get_product(&self, product_id: i64) -> Result<Option<Product>> {
    Ok(self.products.read().get(&product_id).cloned())
  }
}
