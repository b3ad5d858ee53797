use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use shop_common::Money;
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------    OrderStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    /// The order has been created from a cart and stock has been reserved. No payment has cleared yet.
    Pending,
    /// A payment for the order has cleared and the order is being fulfilled.
    Processing,
    /// The order has been fulfilled. Terminal.
    Completed,
    /// The order has been cancelled by the user, an admin, or the reservation sweep. Terminal.
    Cancelled,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pending"),
            OrderStatus::Processing => write!(f, "Processing"),
            OrderStatus::Completed => write!(f, "Completed"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatus::Pending
        })
    }
}

/// The result of validating a status transition. Writing the same status twice is a no-op rather than an
/// error, so callers must be prepared to skip the write entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Apply,
    NoOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Illegal order status transition from {from} to {to}")]
pub struct InvalidOrderStatusTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderStatus {
    /// Checks whether moving from `self` to `new` is legal.
    ///
    /// | From \ To  | Pending | Processing | Completed | Cancelled |
    /// |------------|---------|------------|-----------|-----------|
    /// | Pending    | NoOp    | Ok         | Err       | Ok        |
    /// | Processing | Err     | NoOp       | Ok        | Ok        |
    /// | Completed  | Err     | Err        | NoOp      | Err       |
    /// | Cancelled  | Err     | Err        | Err       | NoOp      |
    pub fn validate_transition(self, new: OrderStatus) -> Result<Transition, InvalidOrderStatusTransition> {
        use OrderStatus::*;
        match (self, new) {
            (old, new) if old == new => Ok(Transition::NoOp),
            (Pending, Processing | Cancelled) => Ok(Transition::Apply),
            (Processing, Completed | Cancelled) => Ok(Transition::Apply),
            (from, to) => Err(InvalidOrderStatusTransition { from, to }),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

//--------------------------------------  OrderPaymentState  ---------------------------------------------------------
/// The payment position of an order as a whole. Individual payment attempts carry their own
/// [`PaymentStatus`]; this field summarises them on the order record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderPaymentState {
    Unpaid,
    Pending,
    Paid,
    Refunded,
}

impl Display for OrderPaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderPaymentState::Unpaid => write!(f, "Unpaid"),
            OrderPaymentState::Pending => write!(f, "Pending"),
            OrderPaymentState::Paid => write!(f, "Paid"),
            OrderPaymentState::Refunded => write!(f, "Refunded"),
        }
    }
}

//--------------------------------------   PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Failed => write!(f, "Failed"),
            PaymentStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Failed" => Ok(Self::Failed),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Illegal payment status transition from {from} to {to}")]
pub struct InvalidPaymentStatusTransition {
    pub from: PaymentStatus,
    pub to: PaymentStatus,
}

impl PaymentStatus {
    /// Checks whether moving from `self` to `new` is legal.
    ///
    /// `Pending → {Paid, Failed}`, `Failed → Pending` (a retry), `Paid → Refunded`. `Refunded` is terminal.
    /// Writing the same status twice is a no-op.
    pub fn validate_transition(self, new: PaymentStatus) -> Result<Transition, InvalidPaymentStatusTransition> {
        use PaymentStatus::*;
        match (self, new) {
            (old, new) if old == new => Ok(Transition::NoOp),
            (Pending, Paid | Failed) => Ok(Transition::Apply),
            (Failed, Pending) => Ok(Transition::Apply),
            (Paid, Refunded) => Ok(Transition::Apply),
            (from, to) => Err(InvalidPaymentStatusTransition { from, to }),
        }
    }
}

//--------------------------------------  PaymentProvider    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum PaymentProvider {
    Stripe,
    PayPal,
    Fondy,
    LiqPay,
    Portmone,
    /// Recorded by an admin outside of any gateway, e.g. cash on delivery.
    Manual,
}

pub const GATEWAY_PROVIDERS: [PaymentProvider; 5] = [
    PaymentProvider::Stripe,
    PaymentProvider::PayPal,
    PaymentProvider::Fondy,
    PaymentProvider::LiqPay,
    PaymentProvider::Portmone,
];

impl Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentProvider::Stripe => write!(f, "Stripe"),
            PaymentProvider::PayPal => write!(f, "PayPal"),
            PaymentProvider::Fondy => write!(f, "Fondy"),
            PaymentProvider::LiqPay => write!(f, "LiqPay"),
            PaymentProvider::Portmone => write!(f, "Portmone"),
            PaymentProvider::Manual => write!(f, "Manual"),
        }
    }
}

impl FromStr for PaymentProvider {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stripe" => Ok(Self::Stripe),
            "paypal" => Ok(Self::PayPal),
            "fondy" => Ok(Self::Fondy),
            "liqpay" => Ok(Self::LiqPay),
            "portmone" => Ok(Self::Portmone),
            "manual" => Ok(Self::Manual),
            s => Err(ConversionError(format!("Unknown payment provider: {s}"))),
        }
    }
}

//--------------------------------------      OrderId        ---------------------------------------------------------
/// The public reference for an order. This is what gets sent to payment providers and comes back on webhook
/// payloads, so it is random rather than a row id.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn random() -> Self {
        let n: u64 = rand::random();
        Self(format!("SO-{n:016X}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------      Product        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Money,
    pub available: bool,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub stock: i64,
    #[serde(default = "default_true")]
    pub available: bool,
}

fn default_true() -> bool {
    true
}

impl NewProduct {
    pub fn new<S: Into<String>>(name: S, price: Money, stock: i64) -> Self {
        Self { name: name.into(), price, stock, available: true }
    }
}

//--------------------------------------    Cart & items     ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Cart {
    pub id: i64,
    pub customer_id: String,
    pub created_at: DateTime<Utc>,
}

/// One cart line joined with its product, as used by the conversion flow.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: i64,
    pub name: String,
    pub price: Money,
    pub available: bool,
    pub stock: i64,
    pub quantity: i64,
}

//--------------------------------------       Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_id: String,
    pub status: OrderStatus,
    pub payment_status: OrderPaymentState,
    pub total_price: Money,
    pub full_name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub reserved_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// True iff a reservation was set and its deadline has passed.
    pub fn is_reservation_expired(&self) -> bool {
        self.reserved_until.map(|t| t < Utc::now()).unwrap_or(false)
    }

    /// Whole minutes until the reservation lapses. 0 when already expired, `None` when no reservation is set.
    pub fn reservation_time_left(&self) -> Option<i64> {
        self.reserved_until.map(|t| (t - Utc::now()).num_minutes().max(0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub full_name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub customer_id: String,
    pub total_price: Money,
    pub shipping: ShippingInfo,
    pub reserved_until: Option<DateTime<Utc>>,
}

impl NewOrder {
    pub fn new(customer_id: String, total_price: Money, shipping: ShippingInfo) -> Self {
        Self { order_id: OrderId::random(), customer_id, total_price, shipping, reserved_until: None }
    }

    pub fn with_reservation(mut self, duration: Duration) -> Self {
        self.reserved_until = Some(Utc::now() + duration);
        self
    }

    /// Sets the reservation deadline per the given policy, clearing it when reservations are disabled.
    pub fn with_reservation_policy(mut self, policy: &ReservationSettings) -> Self {
        self.reserved_until = policy.is_enabled.then(|| Utc::now() + policy.reservation_period());
        self
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    /// Unit price frozen at order time. Later product price changes do not affect it.
    pub price: Money,
}

//--------------------------------------      Payment        ---------------------------------------------------------
/// A single payment attempt against an order. An order can accumulate several of these (retries after
/// failures, a refund after a success).
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub provider: PaymentProvider,
    pub amount: Money,
    pub status: PaymentStatus,
    pub external_id: Option<String>,
    pub raw_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub provider: PaymentProvider,
    pub amount: Money,
    pub status: PaymentStatus,
    pub external_id: Option<String>,
}

impl NewPayment {
    pub fn new(order_id: OrderId, provider: PaymentProvider, amount: Money) -> Self {
        Self { order_id, provider, amount, status: PaymentStatus::Pending, external_id: None }
    }
}

//--------------------------------------     Settings        ---------------------------------------------------------
/// The reservation policy. A single row in the database; inserting a second one fails validation.
#[derive(Debug, Clone, Copy, FromRow, Serialize, Deserialize)]
pub struct ReservationSettings {
    pub id: i64,
    pub is_enabled: bool,
    pub reservation_time_minutes: i64,
    pub auto_cancel_enabled: bool,
    pub cleanup_interval_minutes: i64,
}

impl Default for ReservationSettings {
    fn default() -> Self {
        Self { id: 1, is_enabled: true, reservation_time_minutes: 60, auto_cancel_enabled: true, cleanup_interval_minutes: 5 }
    }
}

impl ReservationSettings {
    pub fn reservation_period(&self) -> Duration {
        Duration::minutes(self.reservation_time_minutes)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::minutes(self.cleanup_interval_minutes)
    }
}

/// Per-provider activation flags. Credentials are **not** stored here; they live in the server
/// configuration wrapped in `Secret` so they never touch the database or the logs.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentProviderSettings {
    pub id: i64,
    pub provider: PaymentProvider,
    pub is_active: bool,
    pub sandbox: bool,
}

//--------------------------------------  Webhook bookkeeping ---------------------------------------------------------
/// A canonical, provider-independent webhook notification, produced by the gateway adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookUpdate {
    pub provider: PaymentProvider,
    /// The provider's unique event id, used for replay rejection.
    pub event_id: String,
    pub order_id: OrderId,
    pub external_id: Option<String>,
    pub status: PaymentStatus,
    /// The raw payload, persisted to the payment record for auditing.
    pub raw: String,
}

/// What applying a webhook actually did, so the caller can fire hooks.
#[derive(Debug, Clone)]
pub struct WebhookOutcome {
    pub order: Order,
    pub payment: Payment,
    /// True iff this event moved the order's payment state to `Paid` (first time).
    pub order_was_paid: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct WebhookEvent {
    pub id: i64,
    pub provider: PaymentProvider,
    pub event_id: String,
    pub order_id: Option<OrderId>,
    pub payment_id: Option<i64>,
    pub received_at: DateTime<Utc>,
}
