use chrono::{DateTime, Utc};
use log::{debug, trace};
use shop_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderItem, OrderPaymentState, OrderStatus},
    traits::StorefrontError,
};

pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, StorefrontError> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                customer_id,
                total_price,
                full_name,
                address,
                phone,
                email,
                reserved_until
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.customer_id)
    .bind(order.total_price)
    .bind(order.shipping.full_name)
    .bind(order.shipping.address)
    .bind(order.shipping.phone)
    .bind(order.shipping.email)
    .bind(order.reserved_until)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn insert_order_item(
    order_pk: i64,
    product_id: i64,
    quantity: i64,
    price: Money,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, sqlx::Error> {
    let item = sqlx::query_as(
        "INSERT INTO order_items (order_id, product_id, quantity, price) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(order_pk)
    .bind(product_id)
    .bind(quantity)
    .bind(price)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_orders_for_customer(customer_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE customer_id = $1 ORDER BY created_at ASC")
        .bind(customer_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub async fn fetch_order_items(order_pk: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_pk)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub(crate) async fn update_order_status(
    order_pk: i64,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, StorefrontError> {
    let result: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(order_pk)
            .fetch_optional(conn)
            .await?;
    result.ok_or_else(|| StorefrontError::OrderNotFound(OrderId(format!("id={order_pk}"))))
}

pub(crate) async fn set_payment_state(
    order_pk: i64,
    state: OrderPaymentState,
    conn: &mut SqliteConnection,
) -> Result<Order, StorefrontError> {
    let result: Option<Order> = sqlx::query_as(
        "UPDATE orders SET payment_status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(state)
    .bind(order_pk)
    .fetch_optional(conn)
    .await?;
    result.ok_or_else(|| StorefrontError::OrderNotFound(OrderId(format!("id={order_pk}"))))
}

pub(crate) async fn set_reserved_until(
    order_pk: i64,
    reserved_until: Option<DateTime<Utc>>,
    conn: &mut SqliteConnection,
) -> Result<Order, StorefrontError> {
    let result: Option<Order> = sqlx::query_as(
        "UPDATE orders SET reserved_until = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(reserved_until)
    .bind(order_pk)
    .fetch_optional(conn)
    .await?;
    result.ok_or_else(|| StorefrontError::OrderNotFound(OrderId(format!("id={order_pk}"))))
}

/// Recomputes the order total from its current line items. This is the explicit replacement for
/// signal-style recalculation: every line-item mutation calls it inside the same transaction.
pub(crate) async fn update_order_total(order_pk: i64, conn: &mut SqliteConnection) -> Result<Order, StorefrontError> {
    let result: Option<Order> = sqlx::query_as(
        r#"
        UPDATE orders SET
            total_price = (SELECT COALESCE(SUM(price * quantity), 0) FROM order_items WHERE order_id = $1),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $1
        RETURNING *"#,
    )
    .bind(order_pk)
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ Recomputed total for order pk {order_pk}");
    result.ok_or_else(|| StorefrontError::OrderNotFound(OrderId(format!("id={order_pk}"))))
}

pub(crate) async fn set_order_item_quantity(
    order_pk: i64,
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderItem>, sqlx::Error> {
    let item = sqlx::query_as(
        "UPDATE order_items SET quantity = $1 WHERE order_id = $2 AND product_id = $3 RETURNING *",
    )
    .bind(quantity)
    .bind(order_pk)
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    Ok(item)
}

pub(crate) async fn delete_order_item(
    order_pk: i64,
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM order_items WHERE order_id = $1 AND product_id = $2")
        .bind(order_pk)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Pending orders whose reservation deadline has passed. The sweep cancels these one at a time so a bad
/// row cannot halt the whole pass.
pub(crate) async fn fetch_expired_pending_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
        SELECT * FROM orders
        WHERE status = 'Pending' AND reserved_until IS NOT NULL AND reserved_until < $1
        ORDER BY reserved_until ASC"#,
    )
    .bind(Utc::now())
    .fetch_all(conn)
    .await?;
    debug!("🗃️ {} orders have expired reservations", orders.len());
    Ok(orders)
}
