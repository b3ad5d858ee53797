use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use payment_gateways::GatewayError;
use shop_engine::traits::{CatalogApiError, SettingsError, StorefrontError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Webhook rejected. {0}")]
    WebhookRejected(String),
    #[error("Could not reach the payment provider. {0}")]
    GatewayConnection(String),
    #[error("An unspecified error happened on the server. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::WebhookRejected(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::GatewayConnection(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<StorefrontError> for ServerError {
    fn from(e: StorefrontError) -> Self {
        match e {
            StorefrontError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id} not found")),
            StorefrontError::PaymentNotFound(msg) => Self::NoRecordFound(format!("Payment not found: {msg}")),
            StorefrontError::ProductNotFound(id) => Self::NoRecordFound(format!("Product {id} not found")),
            StorefrontError::ReplayedWebhook { provider, event_id } => {
                Self::WebhookRejected(format!("Duplicate {provider} event {event_id}"))
            },
            StorefrontError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            // Empty carts, stock shortfalls, amount mismatches and bad transitions are all the
            // client's problem.
            other => Self::InvalidRequest(other.to_string()),
        }
    }
}

impl From<CatalogApiError> for ServerError {
    fn from(e: CatalogApiError) -> Self {
        match e {
            CatalogApiError::ProductNotFound(id) => Self::NoRecordFound(format!("Product {id} not found")),
            CatalogApiError::CartItemNotFound { ref product_id, .. } => {
                Self::NoRecordFound(format!("Product {product_id} is not in the cart"))
            },
            CatalogApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            other => Self::InvalidRequest(other.to_string()),
        }
    }
}

impl From<SettingsError> for ServerError {
    fn from(e: SettingsError) -> Self {
        match e {
            SettingsError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            other => Self::InvalidRequest(other.to_string()),
        }
    }
}

impl From<GatewayError> for ServerError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::InvalidSignature | GatewayError::SignatureUnsupported => {
                Self::WebhookRejected(e.to_string())
            },
            GatewayError::MalformedPayload(msg) => Self::WebhookRejected(msg),
            GatewayError::Connection(msg) => Self::GatewayConnection(msg),
            GatewayError::RemoteStatus { status, message } => {
                Self::GatewayConnection(format!("Provider returned {status}: {message}"))
            },
            GatewayError::NotConfigured(provider) => Self::InvalidRequest(format!("Provider {provider} is not configured")),
        }
    }
}
