use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Webhook signature verification failed")]
    InvalidSignature,
    #[error("This provider does not sign its webhooks")]
    SignatureUnsupported,
    #[error("Could not reach the payment provider: {0}")]
    Connection(String),
    #[error("Provider rejected the request. Error {status}. {message}")]
    RemoteStatus { status: u16, message: String },
    #[error("Could not make sense of the provider payload: {0}")]
    MalformedPayload(String),
    #[error("Provider {0} is not configured")]
    NotConfigured(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Connection(e.to_string())
    }
}
