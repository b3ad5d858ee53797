use shop_common::Money;
use thiserror::Error;

use crate::{
    db_types::{
        InvalidOrderStatusTransition,
        InvalidPaymentStatusTransition,
        NewPayment,
        Order,
        OrderId,
        OrderItem,
        OrderStatus,
        Payment,
        PaymentProvider,
        PaymentStatus,
        ShippingInfo,
        WebhookOutcome,
        WebhookUpdate,
    },
    traits::{CatalogManagement, SettingsError, SettingsManagement},
};

#[derive(Debug, Clone, Error)]
pub enum StorefrontError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Cannot create an order from an empty cart")]
    EmptyCart,
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock { product_id: i64, requested: i64, available: i64 },
    #[error(transparent)]
    OrderTransition(#[from] InvalidOrderStatusTransition),
    #[error(transparent)]
    PaymentTransition(#[from] InvalidPaymentStatusTransition),
    #[error("Payment amount {actual} does not match the order total {expected}")]
    PaymentAmountMismatch { expected: Money, actual: Money },
    #[error("Webhook event {event_id} from {provider} has already been processed")]
    ReplayedWebhook { provider: PaymentProvider, event_id: String },
    #[error("Payments via {0} are not configured or not active")]
    UnsupportedProvider(PaymentProvider),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} can no longer be modified")]
    OrderModificationForbidden(OrderId),
    #[error("The requested payment does not exist: {0}")]
    PaymentNotFound(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),
    #[error(transparent)]
    SettingsError(#[from] SettingsError),
}

impl From<sqlx::Error> for StorefrontError {
    fn from(e: sqlx::Error) -> Self {
        StorefrontError::DatabaseError(e.to_string())
    }
}

/// The core contract of the storefront engine: cart-to-order conversion with inventory reservation, the
/// order and payment state machines, and webhook idempotency.
///
/// Implementations must run each of the mutating flows in a single atomic transaction, and must serialise
/// competing stock reservations for the same product (a conditional decrement or row-level locking, never
/// read-then-write).
#[allow(async_fn_in_trait)]
pub trait StorefrontDatabase: Clone + CatalogManagement + SettingsManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Converts the customer's cart into an order, atomically:
    /// * every line's stock is reserved; any shortfall rolls the whole call back and fails with
    ///   [`StorefrontError::InsufficientStock`];
    /// * the order is created with status `Pending`, payment state `Unpaid`, and item prices frozen from
    ///   the products as of this instant;
    /// * the cart is cleared;
    /// * `reserved_until` is set from the reservation policy when it is enabled.
    ///
    /// An empty (or absent) cart fails with [`StorefrontError::EmptyCart`].
    async fn checkout_cart(&self, customer_id: &str, shipping: ShippingInfo) -> Result<Order, StorefrontError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StorefrontError>;

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, StorefrontError>;

    async fn fetch_orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, StorefrontError>;

    /// Moves the order to `new_status` after validating the transition. A self-transition is a no-op and
    /// returns the unchanged order.
    ///
    /// Cancellation must go through [`Self::cancel_order`] so that stock is released.
    async fn update_order_status(&self, order_id: &OrderId, new_status: OrderStatus) -> Result<Order, StorefrontError>;

    /// Cancels the order, releasing the reserved stock of every line item and clearing `reserved_until`.
    /// Idempotent: cancelling an already-cancelled order is a no-op and must not release stock a second
    /// time. Cancelling a `Completed` order fails with an
    /// [`InvalidOrderStatusTransition`].
    async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, StorefrontError>;

    /// Cancels every `Pending` order whose reservation deadline has passed, releasing its stock. Failures
    /// are logged per order so one bad row does not halt the sweep. Returns the orders that were cancelled.
    async fn expire_reservations(&self) -> Result<Vec<Order>, StorefrontError>;

    /// Changes the quantity of an order line and recomputes the order total in the same transaction,
    /// adjusting the stock reservation by the difference. Only `Pending` orders can be modified, and
    /// `quantity < 1` fails with [`StorefrontError::InvalidQuantity`]; use `remove_order_item` to drop a line.
    async fn set_order_item_quantity(&self, order_id: &OrderId, product_id: i64, quantity: i64) -> Result<Order, StorefrontError>;

    /// Removes an order line, releases its reserved stock and recomputes the order total in the same
    /// transaction. Only `Pending` orders can be modified.
    async fn remove_order_item(&self, order_id: &OrderId, product_id: i64) -> Result<Order, StorefrontError>;

    /// Records a new payment attempt. The amount must equal the order total at this instant, or the call
    /// fails with [`StorefrontError::PaymentAmountMismatch`]. Creation does not pass through transition
    /// validation: any initial status is permitted. The order's payment state moves `Unpaid → Pending` on
    /// the first attempt.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, StorefrontError>;

    /// Moves a payment attempt to `new_status` after validating the transition; self-transitions are
    /// no-ops.
    async fn update_payment_status(&self, payment_id: i64, new_status: PaymentStatus) -> Result<Payment, StorefrontError>;

    /// Stores the provider's transaction reference and raw response on the payment record.
    async fn attach_payment_response(
        &self,
        payment_id: i64,
        external_id: Option<&str>,
        raw_response: &str,
    ) -> Result<Payment, StorefrontError>;

    async fn fetch_payments_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, StorefrontError>;

    /// Applies a verified webhook notification, atomically:
    /// * the `(provider, event_id)` pair is recorded; a duplicate fails with
    ///   [`StorefrontError::ReplayedWebhook`] and changes nothing;
    /// * the payment transitions to the reported status (self-transition: no-op);
    /// * on `Paid`, the order's payment state becomes `Paid` and the order moves `Pending → Processing`;
    /// * on `Refunded`, the order's payment state becomes `Refunded`;
    /// * the raw payload is persisted on the payment record.
    async fn apply_webhook_update(&self, update: WebhookUpdate) -> Result<WebhookOutcome, StorefrontError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StorefrontError> {
        Ok(())
    }
}
