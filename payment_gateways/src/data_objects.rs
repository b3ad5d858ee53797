use serde::{Deserialize, Serialize};
use shop_common::Money;
use shop_engine::db_types::OrderId;

/// Everything a provider needs to start a payment for an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiateRequest {
    pub order_id: OrderId,
    pub amount: Money,
    pub currency: String,
    pub description: String,
    /// Where the provider sends the customer after payment.
    pub return_url: String,
    /// Where the provider posts server-to-server notifications.
    pub callback_url: String,
    pub customer_email: String,
}

/// How the customer gets to the provider's payment page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Redirect {
    /// Send the customer to this URL.
    Url { url: String },
    /// Auto-submit this form to the provider (used by providers without a hosted-checkout API).
    Form { action: String, fields: Vec<(String, String)> },
}

/// The outcome of a successful `initiate` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInitiation {
    /// The provider's reference for this payment, when the provider assigns one up front.
    pub external_id: Option<String>,
    pub redirect: Redirect,
    /// The raw provider response, persisted on the payment row for auditing.
    pub raw: String,
}
