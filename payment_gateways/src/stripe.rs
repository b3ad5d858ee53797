//! Stripe checkout sessions and webhook handling.
use std::sync::Arc;

use log::*;
use reqwest::Client;
use serde_json::Value;
use shop_common::Secret;
use shop_engine::db_types::{PaymentProvider, PaymentStatus, WebhookUpdate};

use crate::{
    data_objects::{InitiateRequest, PaymentInitiation, Redirect},
    helpers::{env_secret, json_str, CLIENT_TIMEOUT},
    signature::verify_stripe_signature,
    GatewayError,
};

const DEFAULT_API_URL: &str = "https://api.stripe.com";
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub api_url: String,
    pub secret_key: Secret<String>,
    pub webhook_secret: Secret<String>,
}

impl StripeConfig {
    /// Reads `SHOP_STRIPE_SECRET_KEY` and `SHOP_STRIPE_WEBHOOK_SECRET`. Fails with
    /// [`GatewayError::NotConfigured`] when the secret key is absent.
    pub fn try_from_env() -> Result<Self, GatewayError> {
        let secret_key = env_secret("SHOP_STRIPE_SECRET_KEY").ok_or_else(|| GatewayError::NotConfigured("Stripe".into()))?;
        let webhook_secret =
            env_secret("SHOP_STRIPE_WEBHOOK_SECRET").ok_or_else(|| GatewayError::NotConfigured("Stripe".into()))?;
        let api_url = std::env::var("SHOP_STRIPE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Ok(Self { api_url, secret_key, webhook_secret })
    }
}

#[derive(Debug, Clone)]
pub struct StripeGateway {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Connection(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Creates a hosted checkout session for the order and returns its payment URL.
    pub async fn initiate(&self, req: &InitiateRequest) -> Result<PaymentInitiation, GatewayError> {
        let amount = req.amount.value().to_string();
        let currency = req.currency.to_ascii_lowercase();
        let params: Vec<(&str, &str)> = vec![
            ("mode", "payment"),
            ("client_reference_id", req.order_id.as_str()),
            ("customer_email", &req.customer_email),
            ("success_url", &req.return_url),
            ("cancel_url", &req.return_url),
            ("line_items[0][quantity]", "1"),
            ("line_items[0][price_data][currency]", &currency),
            ("line_items[0][price_data][unit_amount]", &amount),
            ("line_items[0][price_data][product_data][name]", &req.description),
            ("metadata[order_id]", req.order_id.as_str()),
        ];
        let url = format!("{}/v1/checkout/sessions", self.config.api_url);
        debug!("💳️ Creating Stripe checkout session for order [{}]", req.order_id);
        let response = self
            .client
            .post(url)
            .bearer_auth(self.config.secret_key.reveal())
            .form(&params)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::RemoteStatus { status, message });
        }
        let raw = response.text().await?;
        let body: Value = serde_json::from_str(&raw).map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;
        let session_id = json_str(&body, "id")?;
        let checkout_url = json_str(&body, "url")?;
        info!("💳️ Stripe session {session_id} created for order [{}]", req.order_id);
        Ok(PaymentInitiation {
            external_id: Some(session_id),
            redirect: Redirect::Url { url: checkout_url },
            raw,
        })
    }

    /// Verifies the `Stripe-Signature` header against the raw request body.
    pub fn verify_webhook(&self, signature_header: Option<&str>, payload: &[u8]) -> Result<(), GatewayError> {
        let header = signature_header
            .ok_or_else(|| GatewayError::MalformedPayload("Missing Stripe-Signature header".to_string()))?;
        verify_stripe_signature(self.config.webhook_secret.reveal(), payload, header, SIGNATURE_TOLERANCE_SECS)
    }

    /// Maps a Stripe event to a canonical [`WebhookUpdate`]. Event types we do not act on return
    /// `Ok(None)` so the endpoint can acknowledge them without provider retries.
    pub fn parse_webhook(&self, payload: &[u8]) -> Result<Option<WebhookUpdate>, GatewayError> {
        let body: Value = serde_json::from_slice(payload).map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;
        let event_id = json_str(&body, "id")?;
        let event_type = json_str(&body, "type")?;
        let status = match event_type.as_str() {
            "checkout.session.completed" => PaymentStatus::Paid,
            "checkout.session.expired" | "payment_intent.payment_failed" => PaymentStatus::Failed,
            "charge.refunded" => PaymentStatus::Refunded,
            other => {
                debug!("💳️ Ignoring Stripe event {event_id} of type {other}");
                return Ok(None);
            },
        };
        let object = &body["data"]["object"];
        let order_id = object["client_reference_id"]
            .as_str()
            .or_else(|| object["metadata"]["order_id"].as_str())
            .ok_or_else(|| GatewayError::MalformedPayload("Stripe event carries no order reference".to_string()))?;
        let external_id = object["id"].as_str().map(str::to_string);
        Ok(Some(WebhookUpdate {
            provider: PaymentProvider::Stripe,
            event_id,
            order_id: order_id.to_string().into(),
            external_id,
            status,
            raw: String::from_utf8_lossy(payload).into_owned(),
        }))
    }
}
