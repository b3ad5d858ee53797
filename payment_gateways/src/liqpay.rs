//! LiqPay checkout and callback handling.
//!
//! LiqPay exchanges a single `data` field (base64-encoded JSON) plus a `signature` over it in both
//! directions, so `initiate` builds the checkout form locally and callbacks are decoded from the same
//! envelope.
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use log::*;
use serde_json::{json, Value};
use shop_common::Secret;
use shop_engine::db_types::{PaymentProvider, PaymentStatus, WebhookUpdate};

use crate::{
    data_objects::{InitiateRequest, PaymentInitiation, Redirect},
    helpers::env_secret,
    signature::{liqpay_signature, verify_liqpay_signature},
    GatewayError,
};

const CHECKOUT_URL: &str = "https://www.liqpay.ua/api/3/checkout";
const API_VERSION: i64 = 3;

#[derive(Debug, Clone)]
pub struct LiqPayConfig {
    pub public_key: String,
    pub private_key: Secret<String>,
    pub sandbox: bool,
}

impl LiqPayConfig {
    /// Reads `SHOP_LIQPAY_PUBLIC_KEY`, `SHOP_LIQPAY_PRIVATE_KEY` and the `SHOP_LIQPAY_SANDBOX` flag.
    pub fn try_from_env() -> Result<Self, GatewayError> {
        let public_key =
            std::env::var("SHOP_LIQPAY_PUBLIC_KEY").map_err(|_| GatewayError::NotConfigured("LiqPay".into()))?;
        let private_key = env_secret("SHOP_LIQPAY_PRIVATE_KEY").ok_or_else(|| GatewayError::NotConfigured("LiqPay".into()))?;
        let sandbox = shop_common::helpers::parse_boolean_flag(std::env::var("SHOP_LIQPAY_SANDBOX").ok(), false);
        Ok(Self { public_key, private_key, sandbox })
    }
}

#[derive(Debug, Clone)]
pub struct LiqPayGateway {
    config: LiqPayConfig,
}

impl LiqPayGateway {
    pub fn new(config: LiqPayConfig) -> Self {
        Self { config }
    }

    pub fn initiate(&self, req: &InitiateRequest) -> Result<PaymentInitiation, GatewayError> {
        let mut payload = json!({
            "version": API_VERSION,
            "public_key": self.config.public_key,
            "action": "pay",
            "amount": req.amount.to_string(),
            "currency": req.currency,
            "description": req.description,
            "order_id": req.order_id.as_str(),
            "result_url": req.return_url,
            "server_url": req.callback_url,
        });
        if self.config.sandbox {
            payload["sandbox"] = json!(1);
        }
        let raw = serde_json::to_string(&payload).map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;
        let data = B64.encode(raw.as_bytes());
        let signature = liqpay_signature(self.config.private_key.reveal(), &data);
        debug!("💳️ Built LiqPay checkout form for order [{}]", req.order_id);
        Ok(PaymentInitiation {
            external_id: None,
            redirect: Redirect::Form {
                action: CHECKOUT_URL.to_string(),
                fields: vec![("data".to_string(), data), ("signature".to_string(), signature)],
            },
            raw,
        })
    }

    /// Verifies the `signature` over the `data` envelope in the callback body.
    pub fn verify_webhook(&self, payload: &[u8]) -> Result<(), GatewayError> {
        let (data, signature) = envelope(payload)?;
        verify_liqpay_signature(self.config.private_key.reveal(), &data, &signature)
    }

    pub fn parse_webhook(&self, payload: &[u8]) -> Result<Option<WebhookUpdate>, GatewayError> {
        let (data, _) = envelope(payload)?;
        let decoded = B64.decode(data.as_bytes()).map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;
        let body: Value = serde_json::from_slice(&decoded).map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;
        let order_id = body["order_id"]
            .as_str()
            .ok_or_else(|| GatewayError::MalformedPayload("LiqPay callback carries no order_id".to_string()))?;
        let liqpay_status = body["status"]
            .as_str()
            .ok_or_else(|| GatewayError::MalformedPayload("LiqPay callback carries no status".to_string()))?;
        let payment_id = body["payment_id"]
            .as_i64()
            .map(|n| n.to_string())
            .or_else(|| body["payment_id"].as_str().map(str::to_string))
            .ok_or_else(|| GatewayError::MalformedPayload("LiqPay callback carries no payment_id".to_string()))?;
        let status = match liqpay_status {
            "success" | "sandbox" => PaymentStatus::Paid,
            "failure" | "error" => PaymentStatus::Failed,
            "reversed" => PaymentStatus::Refunded,
            other => {
                debug!("💳️ Ignoring LiqPay callback with status {other}");
                return Ok(None);
            },
        };
        let event_id = format!("{payment_id}:{liqpay_status}");
        Ok(Some(WebhookUpdate {
            provider: PaymentProvider::LiqPay,
            event_id,
            order_id: order_id.to_string().into(),
            external_id: Some(payment_id),
            status,
            raw: String::from_utf8_lossy(payload).into_owned(),
        }))
    }
}

/// The `{ "data": ..., "signature": ... }` callback envelope.
fn envelope(payload: &[u8]) -> Result<(String, String), GatewayError> {
    let body: Value = serde_json::from_slice(payload).map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;
    let data = body["data"]
        .as_str()
        .ok_or_else(|| GatewayError::MalformedPayload("LiqPay callback carries no data field".to_string()))?;
    let signature = body["signature"]
        .as_str()
        .ok_or_else(|| GatewayError::MalformedPayload("LiqPay callback carries no signature field".to_string()))?;
    Ok((data.to_string(), signature.to_string()))
}
