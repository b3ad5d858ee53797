use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewProduct, Product},
    traits::StorefrontError,
};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (name, price, available, stock) VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(product.name)
    .bind(product.price)
    .bind(product.available)
    .bind(product.stock)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_available_products(conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    let products =
        sqlx::query_as("SELECT * FROM products WHERE available = 1 ORDER BY name ASC").fetch_all(conn).await?;
    Ok(products)
}

pub async fn set_availability(
    product_id: i64,
    available: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as(
        "UPDATE products SET available = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(available)
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}

pub async fn set_stock(product_id: i64, stock: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product =
        sqlx::query_as("UPDATE products SET stock = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(stock)
            .bind(product_id)
            .fetch_optional(conn)
            .await?;
    Ok(product)
}

/// Atomically reserves `quantity` units of stock. The conditional `WHERE stock >= ?` makes the
/// check-and-decrement a single statement, so two competing reservations for the last units serialise on
/// the row and at most one of them succeeds. No mutation happens on the failure path.
pub async fn reserve_stock(product_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<(), StorefrontError> {
    let result = sqlx::query(
        "UPDATE products SET stock = stock - $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND stock >= $1",
    )
    .bind(quantity)
    .bind(product_id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 1 {
        debug!("🗃️ Reserved {quantity} units of product {product_id}");
        return Ok(());
    }
    match fetch_product(product_id, conn).await? {
        Some(product) => {
            Err(StorefrontError::InsufficientStock { product_id, requested: quantity, available: product.stock })
        },
        None => Err(StorefrontError::ProductNotFound(product_id)),
    }
}

/// Returns `quantity` units of reserved stock to the shelf. Used when an order is cancelled or its
/// reservation expires.
pub async fn release_stock(product_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<(), StorefrontError> {
    let result =
        sqlx::query("UPDATE products SET stock = stock + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
            .bind(quantity)
            .bind(product_id)
            .execute(conn)
            .await?;
    if result.rows_affected() == 0 {
        return Err(StorefrontError::ProductNotFound(product_id));
    }
    debug!("🗃️ Released {quantity} units of product {product_id}");
    Ok(())
}
