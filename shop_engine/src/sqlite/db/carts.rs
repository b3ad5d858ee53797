use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{Cart, CartLine};

pub async fn fetch_cart_for_customer(
    customer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Cart>, sqlx::Error> {
    let cart =
        sqlx::query_as("SELECT * FROM carts WHERE customer_id = $1").bind(customer_id).fetch_optional(conn).await?;
    Ok(cart)
}

/// Carts are created lazily, on the first item added for a customer.
pub async fn fetch_or_create_cart(customer_id: &str, conn: &mut SqliteConnection) -> Result<Cart, sqlx::Error> {
    if let Some(cart) = fetch_cart_for_customer(customer_id, &mut *conn).await? {
        return Ok(cart);
    }
    let cart = sqlx::query_as("INSERT INTO carts (customer_id) VALUES ($1) RETURNING *")
        .bind(customer_id)
        .fetch_one(conn)
        .await?;
    trace!("🛒️ Created cart for customer {customer_id}");
    Ok(cart)
}

/// Adds quantity to the cart line for the product, creating the line if it does not exist. The
/// `(cart_id, product_id)` pair is unique, so repeated adds accumulate rather than duplicate.
pub async fn add_item(cart_id: i64, product_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = quantity + excluded.quantity
        "#,
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(())
}

/// Replaces the quantity of an existing line. Returns false if the product was not in the cart.
pub async fn set_item_quantity(
    cart_id: i64,
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE cart_items SET quantity = $1 WHERE cart_id = $2 AND product_id = $3")
        .bind(quantity)
        .bind(cart_id)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn remove_item(cart_id: i64, product_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
        .bind(cart_id)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Returns the cart lines joined with their products, in insertion order.
pub async fn fetch_cart_lines(cart_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartLine>, sqlx::Error> {
    let lines = sqlx::query_as(
        r#"
        SELECT
            cart_items.product_id AS product_id,
            products.name AS name,
            products.price AS price,
            products.available AS available,
            products.stock AS stock,
            cart_items.quantity AS quantity
        FROM cart_items JOIN products ON cart_items.product_id = products.id
        WHERE cart_items.cart_id = $1
        ORDER BY cart_items.id ASC"#,
    )
    .bind(cart_id)
    .fetch_all(conn)
    .await?;
    Ok(lines)
}

pub async fn clear_cart(cart_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(conn).await?;
    Ok(result.rows_affected())
}
