//! # Storefront server
//! This crate hosts the HTTP layer of the e-commerce backend. It is responsible for:
//! Exposing the catalog, cart, order and payment APIs over REST.
//! Initiating payments with the configured external providers.
//! Listening for incoming webhook requests from those providers, verifying their signatures, and
//! applying them to the payment state machine.
//! Running the background sweep that cancels orders whose stock reservations have lapsed.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The main route families are:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/products`, `/cart/{customer_id}`: catalog and cart management.
//! * `/orders/{order_id}`: order lifecycle, including `/pay` for starting a payment attempt.
//! * `/webhooks/{provider}`: callback endpoints for the payment providers.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod gateways;
pub mod notifier;
pub mod reservation_worker;
pub mod routes;
pub mod server;
pub mod webhook_routes;

#[cfg(test)]
mod endpoint_tests;
