mod catalog_api;
mod order_flow_api;
mod payment_flow_api;
mod settings_api;

pub use catalog_api::CatalogApi;
pub use order_flow_api::OrderFlowApi;
pub use payment_flow_api::PaymentFlowApi;
pub use settings_api::SettingsApi;
