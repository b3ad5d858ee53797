use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, Payment, PaymentProvider, PaymentStatus},
    traits::StorefrontError,
};

pub(crate) async fn insert_payment(
    order_pk: i64,
    payment: NewPayment,
    conn: &mut SqliteConnection,
) -> Result<Payment, StorefrontError> {
    let payment: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, provider, amount, status, external_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order_pk)
    .bind(payment.provider)
    .bind(payment.amount)
    .bind(payment.status)
    .bind(payment.external_id)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Payment attempt {} recorded against order pk {order_pk}", payment.id);
    Ok(payment)
}

pub async fn fetch_payment(payment_id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(payment_id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn fetch_payment_by_external_id(
    provider: PaymentProvider,
    external_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE provider = $1 AND external_id = $2")
        .bind(provider)
        .bind(external_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

/// The most recent attempt in a given status for an order. Webhooks that do not echo the external id we
/// stored fall back to this: `Pending` for settlement notices, `Paid` for refund corrections.
pub async fn fetch_latest_payment_in_status(
    order_pk: i64,
    provider: PaymentProvider,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
        SELECT * FROM payments
        WHERE order_id = $1 AND provider = $2 AND status = $3
        ORDER BY created_at DESC LIMIT 1"#,
    )
    .bind(order_pk)
    .bind(provider)
    .bind(status)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

pub async fn fetch_payments_for_order(order_pk: i64, conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 ORDER BY created_at ASC")
        .bind(order_pk)
        .fetch_all(conn)
        .await?;
    Ok(payments)
}

pub(crate) async fn update_payment_status(
    payment_id: i64,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Payment, StorefrontError> {
    let result: Option<Payment> =
        sqlx::query_as("UPDATE payments SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(payment_id)
            .fetch_optional(conn)
            .await?;
    result.ok_or_else(|| StorefrontError::PaymentNotFound(format!("id={payment_id}")))
}

pub(crate) async fn attach_response(
    payment_id: i64,
    external_id: Option<&str>,
    raw_response: &str,
    conn: &mut SqliteConnection,
) -> Result<Payment, StorefrontError> {
    let result: Option<Payment> = sqlx::query_as(
        r#"
        UPDATE payments SET
            external_id = COALESCE($1, external_id),
            raw_response = $2,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $3
        RETURNING *"#,
    )
    .bind(external_id)
    .bind(raw_response)
    .bind(payment_id)
    .fetch_optional(conn)
    .await?;
    result.ok_or_else(|| StorefrontError::PaymentNotFound(format!("id={payment_id}")))
}
