// storefront/src/models/product.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Catalog entry. Read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
  pub id: i64,
  pub name: String,
  pub description: Option<String>,
  /// Human readable price, e.g. "1 500 UAH" or "On request".
  pub display_price: String,
  /// Price in kopiykas; `None` means "price on request" and the product cannot be bought.
  pub price_minor: Option<i64>,
  pub media_ref: Option<String>,
}
