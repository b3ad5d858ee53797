use shop_engine::db_types::{PaymentProvider, WebhookUpdate};

use crate::{
    data_objects::{InitiateRequest, PaymentInitiation},
    fondy::{FondyConfig, FondyGateway},
    liqpay::{LiqPayConfig, LiqPayGateway},
    paypal::{PayPalConfig, PayPalGateway},
    portmone::{PortmoneConfig, PortmoneGateway},
    stripe::{StripeConfig, StripeGateway},
    GatewayError,
};

/// One configured provider adapter. The server holds one of these per active provider; the variants are a
/// closed set, so dispatch is a match rather than dynamic.
#[derive(Debug, Clone)]
pub enum GatewayClient {
    Stripe(StripeGateway),
    PayPal(PayPalGateway),
    Fondy(FondyGateway),
    LiqPay(LiqPayGateway),
    Portmone(PortmoneGateway),
}

impl GatewayClient {
    /// Builds the adapter for `provider` from its environment variables. Missing credentials fail with
    /// [`GatewayError::NotConfigured`].
    pub fn from_env(provider: PaymentProvider) -> Result<Self, GatewayError> {
        match provider {
            PaymentProvider::Stripe => Ok(Self::Stripe(StripeGateway::new(StripeConfig::try_from_env()?)?)),
            PaymentProvider::PayPal => Ok(Self::PayPal(PayPalGateway::new(PayPalConfig::try_from_env()?)?)),
            PaymentProvider::Fondy => Ok(Self::Fondy(FondyGateway::new(FondyConfig::try_from_env()?)?)),
            PaymentProvider::LiqPay => Ok(Self::LiqPay(LiqPayGateway::new(LiqPayConfig::try_from_env()?))),
            PaymentProvider::Portmone => Ok(Self::Portmone(PortmoneGateway::new(PortmoneConfig::try_from_env()?))),
            PaymentProvider::Manual => Err(GatewayError::NotConfigured("Manual".into())),
        }
    }

    pub fn provider(&self) -> PaymentProvider {
        match self {
            Self::Stripe(_) => PaymentProvider::Stripe,
            Self::PayPal(_) => PaymentProvider::PayPal,
            Self::Fondy(_) => PaymentProvider::Fondy,
            Self::LiqPay(_) => PaymentProvider::LiqPay,
            Self::Portmone(_) => PaymentProvider::Portmone,
        }
    }

    /// Whether inbound notifications from this provider can be authenticated. PayPal's cannot; its
    /// webhook route accepts payloads on transport trust alone.
    pub fn supports_signature_verification(&self) -> bool {
        !matches!(self, Self::PayPal(_))
    }

    pub async fn initiate(&self, req: &InitiateRequest) -> Result<PaymentInitiation, GatewayError> {
        match self {
            Self::Stripe(gw) => gw.initiate(req).await,
            Self::PayPal(gw) => gw.initiate(req).await,
            Self::Fondy(gw) => gw.initiate(req).await,
            Self::LiqPay(gw) => gw.initiate(req),
            Self::Portmone(gw) => Ok(gw.initiate(req)),
        }
    }

    /// Verifies a webhook's authenticity. `signature_header` is only meaningful for Stripe, whose
    /// signature travels in a header; the other verifying providers sign inside the body. For PayPal this
    /// fails with [`GatewayError::SignatureUnsupported`]; the caller decides whether to proceed anyway.
    pub fn verify_webhook(&self, signature_header: Option<&str>, payload: &[u8]) -> Result<(), GatewayError> {
        match self {
            Self::Stripe(gw) => gw.verify_webhook(signature_header, payload),
            Self::PayPal(_) => Err(GatewayError::SignatureUnsupported),
            Self::Fondy(gw) => gw.verify_webhook(payload),
            Self::LiqPay(gw) => gw.verify_webhook(payload),
            Self::Portmone(gw) => gw.verify_webhook(payload),
        }
    }

    /// Parses a (verified) webhook body into a canonical update. `Ok(None)` means the event is valid but
    /// not one we act on, and should be acknowledged to stop provider retries.
    pub fn parse_webhook(&self, payload: &[u8]) -> Result<Option<WebhookUpdate>, GatewayError> {
        match self {
            Self::Stripe(gw) => gw.parse_webhook(payload),
            Self::PayPal(gw) => gw.parse_webhook(payload),
            Self::Fondy(gw) => gw.parse_webhook(payload),
            Self::LiqPay(gw) => gw.parse_webhook(payload),
            Self::Portmone(gw) => gw.parse_webhook(payload),
        }
    }
}
