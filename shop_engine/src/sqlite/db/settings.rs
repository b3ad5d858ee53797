use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{PaymentProvider, PaymentProviderSettings, ReservationSettings},
    traits::SettingsError,
};

/// Fetches the reservation policy singleton, creating it with defaults when absent.
pub async fn reservation_settings(conn: &mut SqliteConnection) -> Result<ReservationSettings, SettingsError> {
    if let Some(settings) =
        sqlx::query_as::<_, ReservationSettings>("SELECT * FROM reservation_settings WHERE id = 1")
            .fetch_optional(&mut *conn)
            .await?
    {
        return Ok(settings);
    }
    debug!("🗃️ No reservation settings found. Creating the default row.");
    insert_reservation_settings(ReservationSettings::default(), conn).await
}

/// Inserts the settings row. The table holds exactly one row; a second insert fails with
/// [`SettingsError::MultipleSettingsRows`] before touching the database.
pub async fn insert_reservation_settings(
    settings: ReservationSettings,
    conn: &mut SqliteConnection,
) -> Result<ReservationSettings, SettingsError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM reservation_settings").fetch_one(&mut *conn).await?;
    if count > 0 {
        return Err(SettingsError::MultipleSettingsRows);
    }
    let settings = sqlx::query_as(
        r#"
            INSERT INTO reservation_settings
                (id, is_enabled, reservation_time_minutes, auto_cancel_enabled, cleanup_interval_minutes)
            VALUES (1, $1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(settings.is_enabled)
    .bind(settings.reservation_time_minutes)
    .bind(settings.auto_cancel_enabled)
    .bind(settings.cleanup_interval_minutes)
    .fetch_one(conn)
    .await?;
    Ok(settings)
}

pub async fn update_reservation_settings(
    settings: ReservationSettings,
    conn: &mut SqliteConnection,
) -> Result<ReservationSettings, SettingsError> {
    if settings.id != 1 {
        return Err(SettingsError::MultipleSettingsRows);
    }
    // Make sure the row exists first so an update on a fresh database does not silently do nothing.
    let _ = reservation_settings(&mut *conn).await?;
    let settings = sqlx::query_as(
        r#"
        UPDATE reservation_settings SET
            is_enabled = $1,
            reservation_time_minutes = $2,
            auto_cancel_enabled = $3,
            cleanup_interval_minutes = $4
        WHERE id = 1
        RETURNING *"#,
    )
    .bind(settings.is_enabled)
    .bind(settings.reservation_time_minutes)
    .bind(settings.auto_cancel_enabled)
    .bind(settings.cleanup_interval_minutes)
    .fetch_one(conn)
    .await?;
    Ok(settings)
}

pub async fn payment_settings(
    provider: PaymentProvider,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentProviderSettings>, SettingsError> {
    let settings = sqlx::query_as("SELECT * FROM payment_settings WHERE provider = $1")
        .bind(provider)
        .fetch_optional(conn)
        .await?;
    Ok(settings)
}

pub async fn upsert_payment_settings(
    provider: PaymentProvider,
    is_active: bool,
    sandbox: bool,
    conn: &mut SqliteConnection,
) -> Result<PaymentProviderSettings, SettingsError> {
    let settings = sqlx::query_as(
        r#"
            INSERT INTO payment_settings (provider, is_active, sandbox) VALUES ($1, $2, $3)
            ON CONFLICT (provider) DO UPDATE SET is_active = excluded.is_active, sandbox = excluded.sandbox
            RETURNING *;
        "#,
    )
    .bind(provider)
    .bind(is_active)
    .bind(sandbox)
    .fetch_one(conn)
    .await?;
    Ok(settings)
}
