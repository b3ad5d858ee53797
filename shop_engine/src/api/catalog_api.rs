use std::fmt::Debug;

use crate::{
    db_types::{CartLine, NewProduct, Product},
    traits::{CatalogApiError, CatalogManagement},
};

/// `CatalogApi` exposes the product catalog and shopping carts: browsing, stock administration, and the
/// per-customer cart that the order flow later converts into an order.
pub struct CatalogApi<B> {
    db: B,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn add_product(&self, product: NewProduct) -> Result<Product, CatalogApiError> {
        self.db.insert_product(product).await
    }

    pub async fn product(&self, product_id: i64) -> Result<Option<Product>, CatalogApiError> {
        self.db.fetch_product(product_id).await
    }

    /// All products currently offered for sale. Hidden products are omitted, but products with zero stock
    /// are included so the storefront can display them as sold out.
    pub async fn available_products(&self) -> Result<Vec<Product>, CatalogApiError> {
        self.db.fetch_available_products().await
    }

    pub async fn set_availability(&self, product_id: i64, available: bool) -> Result<Product, CatalogApiError> {
        self.db.set_product_availability(product_id, available).await
    }

    pub async fn set_stock(&self, product_id: i64, stock: i64) -> Result<Product, CatalogApiError> {
        self.db.set_product_stock(product_id, stock).await
    }

    /// Adds `quantity` units to the customer's cart, creating the cart on first use. Adding a product that
    /// is already in the cart accumulates the quantity. Returns the full cart after the change.
    pub async fn add_to_cart(
        &self,
        customer_id: &str,
        product_id: i64,
        quantity: i64,
    ) -> Result<Vec<CartLine>, CatalogApiError> {
        self.db.add_to_cart(customer_id, product_id, quantity).await
    }

    pub async fn set_cart_quantity(
        &self,
        customer_id: &str,
        product_id: i64,
        quantity: i64,
    ) -> Result<Vec<CartLine>, CatalogApiError> {
        self.db.set_cart_quantity(customer_id, product_id, quantity).await
    }

    pub async fn remove_from_cart(&self, customer_id: &str, product_id: i64) -> Result<Vec<CartLine>, CatalogApiError> {
        self.db.remove_from_cart(customer_id, product_id).await
    }

    pub async fn cart(&self, customer_id: &str) -> Result<Vec<CartLine>, CatalogApiError> {
        self.db.fetch_cart(customer_id).await
    }
}
