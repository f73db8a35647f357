// storefront/src/db/postgres.rs

use crate::db::{Catalog, OrderStore};
use crate::errors::{AppError, Result};
use crate::models::{CustomerDetails, Order, OrderStatus, PaymentMethod, Product};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::{FromRow, PgPool};
use tracing::{error, instrument, warn};
use uuid::Uuid;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
  MIGRATOR
    .run(pool)
    .await
    .map_err(|e| AppError::StorageUnavailable(format!("Failed to run migrations: {}", e)))
}

const ORDER_COLUMNS: &str = "id, user_id, product_id, amount_minor, payment_method, invoice_id, status, created_at, \
   customer_name, customer_phone, customer_city, customer_delivery_point";

#[derive(Debug, FromRow)]
struct OrderRow {
  id: Uuid,
  user_id: i64,
  product_id: i64,
  amount_minor: i64,
  payment_method: Option<String>,
  invoice_id: Option<String>,
  status: String,
  created_at: DateTime<Utc>,
  customer_name: Option<String>,
  customer_phone: Option<String>,
  customer_city: Option<String>,
  customer_delivery_point: Option<String>,
}

impl TryFrom<OrderRow> for Order {
  type Error = AppError;

  fn try_from(row: OrderRow) -> Result<Self> {
    let status = OrderStatus::parse(&row.status)
      .ok_or_else(|| AppError::Internal(format!("Order {} has unknown status '{}'", row.id, row.status)))?;
    let payment_method = match row.payment_method.as_deref() {
      None => None,
      Some(code) => Some(
        PaymentMethod::from_code(code)
          .ok_or_else(|| AppError::Internal(format!("Order {} has unknown payment method '{}'", row.id, code)))?,
      ),
    };
    let customer = match (
      row.customer_name,
      row.customer_phone,
      row.customer_city,
      row.customer_delivery_point,
    ) {
      (Some(name), Some(phone), Some(city), Some(delivery_point)) => Some(CustomerDetails {
        name,
        phone,
        city,
        delivery_point,
      }),
      _ => None,
    };

    Ok(Order {
      id: row.id,
      user_id: row.user_id,
      product_id: row.product_id,
      amount_minor: row.amount_minor,
      payment_method,
      invoice_id: row.invoice_id,
      status,
      created_at: row.created_at,
      customer,
    })
  }
}

#[derive(Clone)]
pub struct PgOrderStore {
  pool: PgPool,
}

impl PgOrderStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl OrderStore for PgOrderStore {
  #[instrument(name = "store::create_order", skip(self))]
  async fn create_order(&self, user_id: i64, product_id: i64, amount_minor: i64) -> Result<Uuid> {
    let order_id = Uuid::new_v4();
    sqlx::query(
      "INSERT INTO orders (id, user_id, product_id, amount_minor, status, created_at) VALUES ($1, $2, $3, $4, 'pending', $5)",
    )
    .bind(order_id)
    .bind(user_id)
    .bind(product_id)
    .bind(amount_minor)
    .bind(Utc::now())
    .execute(&self.pool)
    .await
    .map_err(|e| {
      error!("Failed to insert order: {}", e);
      AppError::Storage(e)
    })?;
    Ok(order_id)
  }

  #[instrument(name = "store::set_payment_method", skip(self))]
  async fn set_payment_method(&self, order_id: Uuid, method: PaymentMethod) -> Result<()> {
    sqlx::query("UPDATE orders SET payment_method = $1 WHERE id = $2 AND status <> 'paid'")
      .bind(method.code())
      .bind(order_id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  #[instrument(name = "store::attach_invoice", skip(self))]
  async fn attach_invoice(&self, order_id: Uuid, invoice_id: &str) -> Result<()> {
    let result = sqlx::query("UPDATE orders SET invoice_id = $1 WHERE id = $2")
      .bind(invoice_id)
      .bind(order_id)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      warn!("attach_invoice matched no order.");
    }
    Ok(())
  }

  #[instrument(name = "store::set_customer_details", skip(self, details))]
  async fn set_customer_details(&self, order_id: Uuid, details: &CustomerDetails) -> Result<()> {
    sqlx::query(
      "UPDATE orders SET customer_name = $1, customer_phone = $2, customer_city = $3, customer_delivery_point = $4 \
       WHERE id = $5",
    )
    .bind(&details.name)
    .bind(&details.phone)
    .bind(&details.city)
    .bind(&details.delivery_point)
    .bind(order_id)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  #[instrument(name = "store::transition_status", skip(self))]
  async fn transition_status(&self, order_id: Uuid, new_status: OrderStatus) -> Result<Option<Order>> {
    let predecessors: Vec<String> = new_status
      .allowed_predecessors()
      .iter()
      .map(|s| s.as_str().to_string())
      .collect();
    if predecessors.is_empty() {
      return Ok(None);
    }

    // The row comes back from the same statement that decides the transition.
    let row: Option<OrderRow> = sqlx::query_as(&format!(
      "UPDATE orders SET status = $1 WHERE id = $2 AND status = ANY($3) RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(new_status.as_str())
    .bind(order_id)
    .bind(predecessors)
    .fetch_optional(&self.pool)
    .await?;
    row.map(Order::try_from).transpose()
  }

  #[instrument(name = "store::get_order", skip(self))]
  async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await?;
    row.map(Order::try_from).transpose()
  }
}

#[derive(Clone)]
pub struct PgCatalog {
  pool: PgPool,
}

impl PgCatalog {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl Catalog for PgCatalog {
  #[instrument(name = "catalog::get_product", skip(self))]
  async fn get_product(&self, product_id: i64) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
      "SELECT id, name, description, display_price, price_minor, media_ref FROM products WHERE id = $1",
    )
    .bind(product_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(product)
  }
}
