use std::time::Duration;

use serde_json::Value;
use shop_common::Secret;

use crate::GatewayError;

pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Reads an environment variable into a [`Secret`], treating empty values as absent.
pub fn env_secret(var: &str) -> Option<Secret<String>> {
    std::env::var(var).ok().filter(|v| !v.is_empty()).map(Secret::new)
}

/// Pulls a required string field out of a JSON response.
pub fn json_str(body: &Value, field: &str) -> Result<String, GatewayError> {
    body[field]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| GatewayError::MalformedPayload(format!("Missing {field} field in provider response")))
}
