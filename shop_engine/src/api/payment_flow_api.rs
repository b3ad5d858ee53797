use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewPayment, OrderId, Payment, PaymentProvider, PaymentStatus, WebhookOutcome, WebhookUpdate},
    events::{EventProducers, OrderPaidEvent},
    traits::{SettingsManagement, StorefrontDatabase, StorefrontError},
};

/// `PaymentFlowApi` handles payment attempts and the webhook notifications that settle them.
///
/// A payment attempt records intent; the gateway adapters talk to the provider and the webhook endpoints
/// feed the provider's verdict back through [`Self::apply_webhook`].
pub struct PaymentFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for PaymentFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B> PaymentFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> PaymentFlowApi<B>
where B: StorefrontDatabase + SettingsManagement
{
    /// Records a new payment attempt against an order.
    ///
    /// Fails with [`StorefrontError::UnsupportedProvider`] when the provider is not active, and with
    /// [`StorefrontError::PaymentAmountMismatch`] when the amount differs from the order total. The
    /// order's payment state moves `Unpaid → Pending` on the first attempt.
    pub async fn new_payment_attempt(&self, payment: NewPayment) -> Result<Payment, StorefrontError> {
        let provider = payment.provider;
        let active = self
            .db
            .payment_settings(provider)
            .await
            .map_err(StorefrontError::SettingsError)?
            .map(|s| s.is_active)
            .unwrap_or(false);
        if !active {
            return Err(StorefrontError::UnsupportedProvider(provider));
        }
        let payment = self.db.insert_payment(payment).await?;
        info!("🔄️💰️ Payment attempt {} via {provider} recorded against order", payment.id);
        Ok(payment)
    }

    pub async fn update_payment_status(&self, payment_id: i64, status: PaymentStatus) -> Result<Payment, StorefrontError> {
        self.db.update_payment_status(payment_id, status).await
    }

    pub async fn attach_payment_response(
        &self,
        payment_id: i64,
        external_id: Option<&str>,
        raw_response: &str,
    ) -> Result<Payment, StorefrontError> {
        self.db.attach_payment_response(payment_id, external_id, raw_response).await
    }

    pub async fn payments_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, StorefrontError> {
        self.db.fetch_payments_for_order(order_id).await
    }

    /// Applies a verified webhook notification to its payment and order.
    ///
    /// A replayed `(provider, event_id)` pair fails with [`StorefrontError::ReplayedWebhook`] and changes
    /// nothing. When the event settles the order (payment state moves to `Paid` for the first time) the
    /// order-paid hook fires.
    pub async fn apply_webhook(&self, update: WebhookUpdate) -> Result<WebhookOutcome, StorefrontError> {
        let provider = update.provider;
        let event_id = update.event_id.clone();
        let outcome = self.db.apply_webhook_update(update).await?;
        debug!(
            "🔄️💰️ Webhook {event_id} from {provider} applied. Payment {} is {}",
            outcome.payment.id, outcome.payment.status
        );
        if outcome.order_was_paid {
            self.call_order_paid_hook(&outcome).await;
        }
        Ok(outcome)
    }

    /// Whether a provider is currently accepting payment attempts.
    pub async fn provider_is_active(&self, provider: PaymentProvider) -> Result<bool, StorefrontError> {
        let active = self
            .db
            .payment_settings(provider)
            .await
            .map_err(StorefrontError::SettingsError)?
            .map(|s| s.is_active)
            .unwrap_or(false);
        Ok(active)
    }

    async fn call_order_paid_hook(&self, outcome: &WebhookOutcome) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️💰️ Notifying order paid hook subscribers");
            let event = OrderPaidEvent { order: outcome.order.clone(), payment: outcome.payment.clone() };
            emitter.publish_event(event).await;
        }
    }
}
