//! Storage contracts for the storefront engine.
//!
//! The traits in this module define what a database backend must expose in order to drive the engine:
//!
//! * [`StorefrontDatabase`] is the core contract: cart-to-order conversion, the order and payment state
//!   machines, the inventory reservation ledger and webhook idempotency.
//! * [`CatalogManagement`] covers products and carts.
//! * [`SettingsManagement`] covers the reservation policy singleton and per-provider activation flags.
mod catalog_management;
mod settings_management;
mod storefront_database;

pub use catalog_management::{CatalogApiError, CatalogManagement};
pub use settings_management::{SettingsError, SettingsManagement};
pub use storefront_database::{StorefrontDatabase, StorefrontError};
