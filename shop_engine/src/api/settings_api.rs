use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{PaymentProvider, PaymentProviderSettings, ReservationSettings},
    traits::{SettingsError, SettingsManagement},
};

/// `SettingsApi` manages the store's runtime policy: the reservation policy singleton and the
/// per-provider activation flags.
pub struct SettingsApi<B> {
    db: B,
}

impl<B> Debug for SettingsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettingsApi")
    }
}

impl<B> SettingsApi<B>
where B: SettingsManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// The current reservation policy. Defaults are created on first access.
    pub async fn reservation_settings(&self) -> Result<ReservationSettings, SettingsError> {
        self.db.reservation_settings().await
    }

    pub async fn update_reservation_settings(&self, new: ReservationSettings) -> Result<ReservationSettings, SettingsError> {
        let updated = self.db.update_reservation_settings(new).await?;
        info!(
            "🪛️ Reservation policy updated: enabled={}, window={}min, auto-cancel={}",
            updated.is_enabled, updated.reservation_time_minutes, updated.auto_cancel_enabled
        );
        Ok(updated)
    }

    pub async fn payment_settings(&self, provider: PaymentProvider) -> Result<Option<PaymentProviderSettings>, SettingsError> {
        self.db.payment_settings(provider).await
    }

    pub async fn set_provider_active(
        &self,
        provider: PaymentProvider,
        is_active: bool,
        sandbox: bool,
    ) -> Result<PaymentProviderSettings, SettingsError> {
        let settings = self.db.set_provider_active(provider, is_active, sandbox).await?;
        info!("🪛️ Provider {provider} is now {}", if settings.is_active { "active" } else { "inactive" });
        Ok(settings)
    }
}
