//! Fondy hosted checkout and callback handling.
use std::sync::Arc;

use log::*;
use reqwest::Client;
use serde_json::{json, Map, Value};
use shop_common::Secret;
use shop_engine::db_types::{PaymentProvider, PaymentStatus, WebhookUpdate};

use crate::{
    data_objects::{InitiateRequest, PaymentInitiation, Redirect},
    helpers::{env_secret, CLIENT_TIMEOUT},
    signature::{signed_fields_sha1, verify_signed_fields},
    GatewayError,
};

const DEFAULT_API_URL: &str = "https://pay.fondy.eu";

#[derive(Debug, Clone)]
pub struct FondyConfig {
    pub api_url: String,
    pub merchant_id: String,
    pub secret: Secret<String>,
}

impl FondyConfig {
    /// Reads `SHOP_FONDY_MERCHANT_ID` and `SHOP_FONDY_SECRET`.
    pub fn try_from_env() -> Result<Self, GatewayError> {
        let merchant_id =
            std::env::var("SHOP_FONDY_MERCHANT_ID").map_err(|_| GatewayError::NotConfigured("Fondy".into()))?;
        let secret = env_secret("SHOP_FONDY_SECRET").ok_or_else(|| GatewayError::NotConfigured("Fondy".into()))?;
        let api_url = std::env::var("SHOP_FONDY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Ok(Self { api_url, merchant_id, secret })
    }
}

#[derive(Debug, Clone)]
pub struct FondyGateway {
    config: FondyConfig,
    client: Arc<Client>,
}

impl FondyGateway {
    pub fn new(config: FondyConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Connection(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    fn sign(&self, fields: &Map<String, Value>) -> String {
        signed_fields_sha1(fields, "signature", self.config.secret.reveal())
    }

    pub async fn initiate(&self, req: &InitiateRequest) -> Result<PaymentInitiation, GatewayError> {
        let mut request = json!({
            "merchant_id": self.config.merchant_id,
            "order_id": req.order_id.as_str(),
            "order_desc": req.description,
            "amount": req.amount.value().to_string(),
            "currency": req.currency,
            "response_url": req.return_url,
            "server_callback_url": req.callback_url,
            "sender_email": req.customer_email,
        });
        let signature = self.sign(request.as_object().unwrap_or(&Map::new()));
        request["signature"] = Value::String(signature);
        let url = format!("{}/api/checkout/url/", self.config.api_url);
        debug!("💳️ Requesting Fondy checkout URL for order [{}]", req.order_id);
        let response = self.client.post(url).json(&json!({ "request": request })).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::RemoteStatus { status, message });
        }
        let raw = response.text().await?;
        let body: Value = serde_json::from_str(&raw).map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;
        let inner = &body["response"];
        if inner["response_status"].as_str() == Some("failure") {
            let message = inner["error_message"].as_str().unwrap_or("unknown error").to_string();
            let status = inner["error_code"].as_u64().unwrap_or(0) as u16;
            return Err(GatewayError::RemoteStatus { status, message });
        }
        let checkout_url = inner["checkout_url"]
            .as_str()
            .ok_or_else(|| GatewayError::MalformedPayload("Fondy response carries no checkout_url".to_string()))?;
        let external_id = inner["payment_id"].as_str().map(str::to_string);
        info!("💳️ Fondy checkout created for order [{}]", req.order_id);
        Ok(PaymentInitiation { external_id, redirect: Redirect::Url { url: checkout_url.to_string() }, raw })
    }

    pub fn verify_webhook(&self, payload: &[u8]) -> Result<(), GatewayError> {
        let fields = callback_fields(payload)?;
        verify_signed_fields(&fields, "signature", self.config.secret.reveal())
    }

    pub fn parse_webhook(&self, payload: &[u8]) -> Result<Option<WebhookUpdate>, GatewayError> {
        let fields = callback_fields(payload)?;
        let order_id = field_str(&fields, "order_id")?;
        let order_status = field_str(&fields, "order_status")?;
        let payment_id = fields
            .get("payment_id")
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .ok_or_else(|| GatewayError::MalformedPayload("Missing payment_id field".to_string()))?;
        let status = match order_status.as_str() {
            "approved" => PaymentStatus::Paid,
            "declined" | "expired" => PaymentStatus::Failed,
            "reversed" => PaymentStatus::Refunded,
            other => {
                debug!("💳️ Ignoring Fondy callback with order_status {other}");
                return Ok(None);
            },
        };
        // Fondy has no event id of its own; the payment id and reported status pair is unique per
        // transition and serves for replay rejection.
        let event_id = format!("{payment_id}:{order_status}");
        Ok(Some(WebhookUpdate {
            provider: PaymentProvider::Fondy,
            event_id,
            order_id: order_id.into(),
            external_id: Some(payment_id),
            status,
            raw: String::from_utf8_lossy(payload).into_owned(),
        }))
    }
}

pub(crate) fn callback_fields(payload: &[u8]) -> Result<Map<String, Value>, GatewayError> {
    let body: Value = serde_json::from_slice(payload).map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;
    body.as_object()
        .cloned()
        .ok_or_else(|| GatewayError::MalformedPayload("Callback payload is not a JSON object".to_string()))
}

pub(crate) fn field_str(fields: &Map<String, Value>, field: &str) -> Result<String, GatewayError> {
    fields
        .get(field)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| GatewayError::MalformedPayload(format!("Missing {field} field")))
}
