// storefront/src/db/mod.rs

//! Persistence seams. The order store is the only shared mutable resource in the
//! service; the catalog is read-only.

pub mod memory;
pub mod postgres;

use crate::errors::Result;
use crate::models::{CustomerDetails, Order, OrderStatus, PaymentMethod, Product};
use async_trait::async_trait;
use uuid::Uuid;

pub use memory::{InMemoryCatalog, InMemoryOrderStore};
pub use postgres::{PgCatalog, PgOrderStore};

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Inserts a `pending` order and returns its fresh id.
  async fn create_order(&self, user_id: i64, product_id: i64, amount_minor: i64) -> Result<Uuid>;

  /// Overwrites the payment method unless the order is already paid. Unknown ids are a no-op.
  async fn set_payment_method(&self, order_id: Uuid, method: PaymentMethod) -> Result<()>;

  async fn attach_invoice(&self, order_id: Uuid, invoice_id: &str) -> Result<()>;

  async fn set_customer_details(&self, order_id: Uuid, details: &CustomerDetails) -> Result<()>;

  /// Atomically moves the order to `new_status` if its current status is one of
  /// `new_status.allowed_predecessors()`. Returns the updated order when a row
  /// changed, `None` otherwise.
  async fn transition_status(&self, order_id: Uuid, new_status: OrderStatus) -> Result<Option<Order>>;

  async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>>;
}

#[async_trait]
pub trait Catalog: Send + Sync {
  async fn get_product(&self, product_id: i64) -> Result<Option<Product>>;
}
