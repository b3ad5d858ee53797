//! Storefront engine
//!
//! The storefront engine contains the core logic of the e-commerce backend: the product catalog and cart, the
//! order and payment state machines, the inventory reservation ledger, and webhook idempotency tracking.
//! It is HTTP-framework agnostic; the server crate sits on top of it.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). You should never need to access the database directly.
//!    Instead, use the public API provided by the engine. The exception is the data types used in the database,
//!    which are defined in the [`db_types`] module and are public.
//! 2. The engine public API ([`mod@api`]). This provides the public-facing functionality: catalog and cart
//!    management, the cart-to-order conversion flow, payment attempts and webhook application, and the
//!    reservation policy. Specific backends need to implement the traits in the [`traits`] module in order to
//!    act as a backend for the storefront server.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted when certain
//! actions occur, for example when an order is fully paid. A simple hook system is used so that you can react
//! to these events without blocking the flows that produce them.
mod api;
#[cfg(feature = "sqlite")]
mod sqlite;

pub mod db_types;
pub mod events;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use api::{CatalogApi, OrderFlowApi, PaymentFlowApi, SettingsApi};
