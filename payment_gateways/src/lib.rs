//! Outbound payment-provider clients and webhook verification.
//!
//! Each provider module carries its own config (read from `SHOP_*` environment variables, secrets wrapped
//! in [`shop_common::Secret`]), an adapter for starting payments, and the verification and parsing of the
//! provider's server-to-server notifications into the engine's canonical
//! [`shop_engine::db_types::WebhookUpdate`]. The [`GatewayClient`] enum ties the five adapters together
//! behind one surface for the server.
mod client;
pub mod data_objects;
mod error;
pub mod fondy;
mod helpers;
pub mod liqpay;
pub mod paypal;
pub mod portmone;
pub mod signature;
pub mod stripe;

pub use client::GatewayClient;
pub use data_objects::{InitiateRequest, PaymentInitiation, Redirect};
pub use error::GatewayError;
