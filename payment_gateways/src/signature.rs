//! Signature schemes used by the providers' server-to-server notifications.
//!
//! Three schemes cover the five providers:
//! * Stripe: HMAC-SHA256 over `"{t}.{payload}"`, carried in the `Stripe-Signature` header.
//! * Fondy and Portmone: fields sorted by key (the signature field excluded), values joined with `|`,
//!   the shared secret appended, SHA-1 hex digest.
//! * LiqPay: `signature = base64(sha1(secret + data + secret))` where `data` is the base64-encoded payload.
//!
//! PayPal does not sign its webhooks at all; see the `paypal` module.
//!
//! All comparisons between a recomputed and a supplied signature go through [`constant_time_eq`].
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};
use sha2::Sha256;

use crate::GatewayError;

type HmacSha256 = Hmac<Sha256>;

pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.iter().zip(b) {
        res |= x ^ y;
    }
    res == 0
}

pub fn hmac_sha256_hex(secret: &str, message: &[u8]) -> String {
    // HMAC accepts keys of any length, so new_from_slice cannot fail.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap_or_else(|_| unreachable!());
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

pub fn sha1_hex(message: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(message);
    hex::encode(hasher.finalize())
}

/// The `t=` and `v1=` pairs from a `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripeSignature {
    pub timestamp: String,
    pub v1: String,
}

pub fn parse_stripe_signature(header: &str) -> Result<StripeSignature, GatewayError> {
    let mut timestamp = None;
    let mut v1 = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", val)) => timestamp = Some(val.to_string()),
            Some(("v1", val)) => v1 = Some(val.to_string()),
            _ => {},
        }
    }
    match (timestamp, v1) {
        (Some(timestamp), Some(v1)) => Ok(StripeSignature { timestamp, v1 }),
        _ => Err(GatewayError::MalformedPayload("Stripe-Signature header is missing t= or v1=".to_string())),
    }
}

/// Verifies a Stripe webhook: HMAC-SHA256 over `"{t}.{payload}"` with the endpoint secret, compared
/// against the header's `v1` value. `tolerance_secs` bounds how stale the timestamp may be.
pub fn verify_stripe_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    tolerance_secs: i64,
) -> Result<(), GatewayError> {
    let sig = parse_stripe_signature(header)?;
    let ts = sig
        .timestamp
        .parse::<i64>()
        .map_err(|_| GatewayError::MalformedPayload("Stripe-Signature timestamp is not a number".to_string()))?;
    let now = chrono::Utc::now().timestamp();
    if (now - ts).abs() > tolerance_secs {
        return Err(GatewayError::InvalidSignature);
    }
    let mut signed = sig.timestamp.into_bytes();
    signed.push(b'.');
    signed.extend_from_slice(payload);
    let expected = hmac_sha256_hex(secret, &signed);
    if constant_time_eq(expected.as_bytes(), sig.v1.as_bytes()) {
        Ok(())
    } else {
        Err(GatewayError::InvalidSignature)
    }
}

/// The Fondy/Portmone scheme: take every field except `signature_field`, sort by key, join the values
/// with `|`, append the shared secret, SHA-1 hex.
pub fn signed_fields_sha1(fields: &serde_json::Map<String, serde_json::Value>, signature_field: &str, secret: &str) -> String {
    let mut keys: Vec<&String> = fields.keys().filter(|k| k.as_str() != signature_field).collect();
    keys.sort();
    let mut joined = keys
        .into_iter()
        .map(|k| match &fields[k] {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<String>>()
        .join("|");
    joined.push('|');
    joined.push_str(secret);
    sha1_hex(joined.as_bytes())
}

pub fn verify_signed_fields(
    fields: &serde_json::Map<String, serde_json::Value>,
    signature_field: &str,
    secret: &str,
) -> Result<(), GatewayError> {
    let supplied = fields
        .get(signature_field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| GatewayError::MalformedPayload(format!("Missing {signature_field} field")))?;
    let expected = signed_fields_sha1(fields, signature_field, secret);
    if constant_time_eq(expected.as_bytes(), supplied.to_ascii_lowercase().as_bytes()) {
        Ok(())
    } else {
        Err(GatewayError::InvalidSignature)
    }
}

/// LiqPay's scheme: `base64(sha1(secret + data + secret))`, where `data` is already base64.
pub fn liqpay_signature(secret: &str, data: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(secret.as_bytes());
    hasher.update(data.as_bytes());
    hasher.update(secret.as_bytes());
    B64.encode(hasher.finalize())
}

pub fn verify_liqpay_signature(secret: &str, data: &str, signature: &str) -> Result<(), GatewayError> {
    let expected = liqpay_signature(secret, data);
    if constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        Ok(())
    } else {
        Err(GatewayError::InvalidSignature)
    }
}
