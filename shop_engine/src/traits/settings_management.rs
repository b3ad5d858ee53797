use thiserror::Error;

use crate::db_types::{PaymentProvider, PaymentProviderSettings, ReservationSettings};

#[derive(Debug, Clone, Error)]
pub enum SettingsError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Reservation settings already exist; the settings table holds exactly one row")]
    MultipleSettingsRows,
}

impl From<sqlx::Error> for SettingsError {
    fn from(e: sqlx::Error) -> Self {
        SettingsError::DatabaseError(e.to_string())
    }
}

/// Access to the reservation policy singleton and the per-provider activation flags.
#[allow(async_fn_in_trait)]
pub trait SettingsManagement: Clone {
    /// Returns the reservation policy, creating the row with defaults (enabled, 60 minute reservations,
    /// auto-cancel on, 5 minute sweep) if it does not exist yet.
    async fn reservation_settings(&self) -> Result<ReservationSettings, SettingsError>;

    /// Updates the singleton in place. An update carrying an id other than the singleton's fails with
    /// [`SettingsError::MultipleSettingsRows`].
    async fn update_reservation_settings(&self, settings: ReservationSettings) -> Result<ReservationSettings, SettingsError>;

    async fn payment_settings(&self, provider: PaymentProvider) -> Result<Option<PaymentProviderSettings>, SettingsError>;

    async fn set_provider_active(
        &self,
        provider: PaymentProvider,
        is_active: bool,
        sandbox: bool,
    ) -> Result<PaymentProviderSettings, SettingsError>;
}
