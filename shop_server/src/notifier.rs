//! Best-effort mail notifications for order events.
//!
//! Delivery never blocks or rolls back the state transition that triggered it: the hooks run on the
//! event channel's own task, and a send that still fails after the retry budget is only logged.
use std::{sync::Arc, time::Duration};

use log::*;
use shop_engine::events::{EventHooks, OrderCancelledEvent, OrderPaidEvent};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub trait MailSender: Send + Sync {
    // The hook channel runs handlers on a spawned task, so the future must be Send.
    fn send(&self, message: &MailMessage) -> impl std::future::Future<Output = Result<(), MailError>> + Send;
}

#[derive(Debug, thiserror::Error)]
#[error("Could not send mail: {0}")]
pub struct MailError(pub String);

/// A sender that only writes to the log. Stands in until a real SMTP relay is configured; the retry and
/// hook plumbing is identical either way.
#[derive(Debug, Clone, Default)]
pub struct LogMailSender;

impl MailSender for LogMailSender {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        info!("📧️ [mail to {}] {}: {}", message.to, message.subject, message.body);
        Ok(())
    }
}

pub async fn send_with_retries<S: MailSender>(sender: &S, message: MailMessage) {
    for attempt in 1..=MAX_ATTEMPTS {
        match sender.send(&message).await {
            Ok(()) => return,
            Err(e) if attempt < MAX_ATTEMPTS => {
                warn!("📧️ Mail to {} failed (attempt {attempt}/{MAX_ATTEMPTS}): {e}. Retrying.", message.to);
                tokio::time::sleep(RETRY_DELAY).await;
            },
            Err(e) => {
                error!("📧️ Giving up on mail to {} after {MAX_ATTEMPTS} attempts: {e}", message.to);
            },
        }
    }
}

/// Registers mail hooks for the order-paid and order-cancelled events.
pub fn wire_mail_hooks<S: MailSender + 'static>(hooks: &mut EventHooks, sender: Arc<S>) {
    let paid_sender = Arc::clone(&sender);
    hooks.on_order_paid(move |event: OrderPaidEvent| {
        let sender = Arc::clone(&paid_sender);
        Box::pin(async move {
            let message = MailMessage {
                to: event.order.email.clone(),
                subject: format!("Order {} is paid", event.order.order_id),
                body: format!(
                    "We received your payment of {} via {}. Your order is now being processed.",
                    event.payment.amount, event.payment.provider
                ),
            };
            send_with_retries(sender.as_ref(), message).await;
        })
    });
    hooks.on_order_cancelled(move |event: OrderCancelledEvent| {
        let sender = Arc::clone(&sender);
        Box::pin(async move {
            let message = MailMessage {
                to: event.order.email.clone(),
                subject: format!("Order {} was cancelled", event.order.order_id),
                body: "Your order was cancelled and any reserved items have been returned to stock.".to_string(),
            };
            send_with_retries(sender.as_ref(), message).await;
        })
    });
}
