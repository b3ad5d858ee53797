use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{OrderId, PaymentProvider},
    traits::StorefrontError,
};

/// Records a webhook event id for replay protection. The `(provider, event_id)` pair is unique, so a
/// duplicate delivery trips the constraint and surfaces as [`StorefrontError::ReplayedWebhook`]. Run this
/// inside the same transaction as the status change it guards.
pub(crate) async fn record_event(
    provider: PaymentProvider,
    event_id: &str,
    order_id: &OrderId,
    payment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<(), StorefrontError> {
    let result = sqlx::query(
        "INSERT INTO webhook_events (provider, event_id, order_id, payment_id) VALUES ($1, $2, $3, $4)",
    )
    .bind(provider)
    .bind(event_id)
    .bind(order_id.as_str())
    .bind(payment_id)
    .execute(conn)
    .await;
    match result {
        Ok(_) => {
            debug!("🗃️ Webhook event {event_id} from {provider} recorded");
            Ok(())
        },
        Err(e) if e.as_database_error().map(|d| d.is_unique_violation()).unwrap_or(false) => {
            Err(StorefrontError::ReplayedWebhook { provider, event_id: event_id.to_string() })
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn event_exists(
    provider: PaymentProvider,
    event_id: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM webhook_events WHERE provider = $1 AND event_id = $2")
            .bind(provider)
            .bind(event_id)
            .fetch_one(conn)
            .await?;
    Ok(count > 0)
}
