//! Portmone form-based checkout and callback handling.
//!
//! Portmone has no checkout-session API; the customer is sent there with an auto-submitted form, so
//! `initiate` never leaves the process. Callbacks use the same sorted-fields SHA-1 scheme as Fondy.
use log::*;
use serde_json::Value;
use shop_common::Secret;
use shop_engine::db_types::{PaymentProvider, PaymentStatus, WebhookUpdate};

use crate::{
    data_objects::{InitiateRequest, PaymentInitiation, Redirect},
    fondy::{callback_fields, field_str},
    helpers::env_secret,
    signature::verify_signed_fields,
    GatewayError,
};

const DEFAULT_GATEWAY_URL: &str = "https://www.portmone.com.ua/gateway/";

#[derive(Debug, Clone)]
pub struct PortmoneConfig {
    pub gateway_url: String,
    pub payee_id: String,
    pub secret: Secret<String>,
}

impl PortmoneConfig {
    /// Reads `SHOP_PORTMONE_PAYEE_ID` and `SHOP_PORTMONE_SECRET`.
    pub fn try_from_env() -> Result<Self, GatewayError> {
        let payee_id =
            std::env::var("SHOP_PORTMONE_PAYEE_ID").map_err(|_| GatewayError::NotConfigured("Portmone".into()))?;
        let secret = env_secret("SHOP_PORTMONE_SECRET").ok_or_else(|| GatewayError::NotConfigured("Portmone".into()))?;
        let gateway_url = std::env::var("SHOP_PORTMONE_GATEWAY_URL").unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string());
        Ok(Self { gateway_url, payee_id, secret })
    }
}

#[derive(Debug, Clone)]
pub struct PortmoneGateway {
    config: PortmoneConfig,
}

impl PortmoneGateway {
    pub fn new(config: PortmoneConfig) -> Self {
        Self { config }
    }

    pub fn initiate(&self, req: &InitiateRequest) -> PaymentInitiation {
        let fields = vec![
            ("payee_id".to_string(), self.config.payee_id.clone()),
            ("shop_order_number".to_string(), req.order_id.as_str().to_string()),
            ("bill_amount".to_string(), req.amount.to_string()),
            ("description".to_string(), req.description.clone()),
            ("success_url".to_string(), req.return_url.clone()),
            ("failure_url".to_string(), req.return_url.clone()),
        ];
        debug!("💳️ Built Portmone payment form for order [{}]", req.order_id);
        PaymentInitiation {
            external_id: None,
            redirect: Redirect::Form { action: self.config.gateway_url.clone(), fields },
            raw: String::new(),
        }
    }

    pub fn verify_webhook(&self, payload: &[u8]) -> Result<(), GatewayError> {
        let fields = callback_fields(payload)?;
        verify_signed_fields(&fields, "signature", self.config.secret.reveal())
    }

    pub fn parse_webhook(&self, payload: &[u8]) -> Result<Option<WebhookUpdate>, GatewayError> {
        let fields = callback_fields(payload)?;
        let order_id = field_str(&fields, "shop_order_number")?;
        let bill_status = field_str(&fields, "status")?;
        let bill_id = fields
            .get("bill_id")
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .ok_or_else(|| GatewayError::MalformedPayload("Missing bill_id field".to_string()))?;
        let status = match bill_status.as_str() {
            "PAYED" => PaymentStatus::Paid,
            "REJECTED" => PaymentStatus::Failed,
            "RETURN" => PaymentStatus::Refunded,
            other => {
                debug!("💳️ Ignoring Portmone callback with status {other}");
                return Ok(None);
            },
        };
        let event_id = format!("{bill_id}:{bill_status}");
        Ok(Some(WebhookUpdate {
            provider: PaymentProvider::Portmone,
            event_id,
            order_id: order_id.into(),
            external_id: Some(bill_id),
            status,
            raw: String::from_utf8_lossy(payload).into_owned(),
        }))
    }
}
