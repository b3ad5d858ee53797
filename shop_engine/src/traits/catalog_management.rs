use thiserror::Error;

use crate::db_types::{CartLine, NewProduct, Product};

#[derive(Debug, Clone, Error)]
pub enum CatalogApiError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Product {0} is not available for purchase")]
    ProductUnavailable(i64),
    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),
    #[error("Product {product_id} is not in the cart for customer {customer_id}")]
    CartItemNotFound { customer_id: String, product_id: i64 },
}

impl From<sqlx::Error> for CatalogApiError {
    fn from(e: sqlx::Error) -> Self {
        CatalogApiError::DatabaseError(e.to_string())
    }
}

/// Product catalog and cart behaviour.
///
/// Carts are lazy: the first `add_to_cart` for a customer creates one. A product can appear at most once
/// per cart; adding it again accumulates quantity.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement: Clone {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogApiError>;

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, CatalogApiError>;

    async fn fetch_available_products(&self) -> Result<Vec<Product>, CatalogApiError>;

    async fn set_product_availability(&self, product_id: i64, available: bool) -> Result<Product, CatalogApiError>;

    /// Replaces the stock level outright. Reservations use the conditional decrement on the
    /// [`StorefrontDatabase`](super::StorefrontDatabase) side, never this.
    async fn set_product_stock(&self, product_id: i64, stock: i64) -> Result<Product, CatalogApiError>;

    /// Adds `quantity` of the product to the customer's cart, creating the cart if needed.
    /// Fails with [`CatalogApiError::ProductUnavailable`] when `available` is false, and with
    /// [`CatalogApiError::InvalidQuantity`] when `quantity < 1`.
    async fn add_to_cart(&self, customer_id: &str, product_id: i64, quantity: i64) -> Result<Vec<CartLine>, CatalogApiError>;

    /// Sets the quantity of an existing cart line. `quantity < 1` is rejected; use
    /// [`Self::remove_from_cart`] to drop a line.
    async fn set_cart_quantity(&self, customer_id: &str, product_id: i64, quantity: i64) -> Result<Vec<CartLine>, CatalogApiError>;

    async fn remove_from_cart(&self, customer_id: &str, product_id: i64) -> Result<Vec<CartLine>, CatalogApiError>;

    /// The customer's current cart lines, joined with product data. An absent cart reads as empty.
    async fn fetch_cart(&self, customer_id: &str) -> Result<Vec<CartLine>, CatalogApiError>;
}
