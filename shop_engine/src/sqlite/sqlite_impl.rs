//! `SqliteDatabase` is a concrete implementation of the storefront engine backend.
//!
//! Unsurprisingly, it uses SQLite, and implements all the traits defined in the [`crate::traits`] module.
//! Each mutating flow runs in a single transaction, so stock reservation, order creation and cart clearing
//! happen-or-fail together.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{carts, new_pool, orders, payments, products, settings, webhook_events};
use crate::{
    db_types::{
        CartLine,
        NewOrder,
        NewPayment,
        NewProduct,
        Order,
        OrderId,
        OrderItem,
        OrderPaymentState,
        OrderStatus,
        Payment,
        PaymentProvider,
        PaymentProviderSettings,
        PaymentStatus,
        Product,
        ReservationSettings,
        ShippingInfo,
        Transition,
        WebhookOutcome,
        WebhookUpdate,
    },
    traits::{CatalogApiError, CatalogManagement, SettingsError, SettingsManagement, StorefrontDatabase, StorefrontError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::insert_product(product, &mut conn).await?;
        debug!("🗃️ Product [{}] inserted with id {}", product.name, product.id);
        Ok(product)
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_product(product_id, &mut conn).await?)
    }

    async fn fetch_available_products(&self) -> Result<Vec<Product>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_available_products(&mut conn).await?)
    }

    async fn set_product_availability(&self, product_id: i64, available: bool) -> Result<Product, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        products::set_availability(product_id, available, &mut conn)
            .await?
            .ok_or(CatalogApiError::ProductNotFound(product_id))
    }

    async fn set_product_stock(&self, product_id: i64, stock: i64) -> Result<Product, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        products::set_stock(product_id, stock, &mut conn).await?.ok_or(CatalogApiError::ProductNotFound(product_id))
    }

    async fn add_to_cart(&self, customer_id: &str, product_id: i64, quantity: i64) -> Result<Vec<CartLine>, CatalogApiError> {
        if quantity < 1 {
            return Err(CatalogApiError::InvalidQuantity(quantity));
        }
        let mut tx = self.pool.begin().await?;
        let product = products::fetch_product(product_id, &mut tx)
            .await?
            .ok_or(CatalogApiError::ProductNotFound(product_id))?;
        if !product.available {
            return Err(CatalogApiError::ProductUnavailable(product_id));
        }
        let cart = carts::fetch_or_create_cart(customer_id, &mut tx).await?;
        carts::add_item(cart.id, product_id, quantity, &mut tx).await?;
        let lines = carts::fetch_cart_lines(cart.id, &mut tx).await?;
        tx.commit().await?;
        trace!("🛒️ Customer {customer_id} added {quantity} x product {product_id} to their cart");
        Ok(lines)
    }

    async fn set_cart_quantity(&self, customer_id: &str, product_id: i64, quantity: i64) -> Result<Vec<CartLine>, CatalogApiError> {
        if quantity < 1 {
            return Err(CatalogApiError::InvalidQuantity(quantity));
        }
        let mut tx = self.pool.begin().await?;
        let cart = carts::fetch_cart_for_customer(customer_id, &mut tx)
            .await?
            .ok_or_else(|| CatalogApiError::CartItemNotFound { customer_id: customer_id.to_string(), product_id })?;
        if !carts::set_item_quantity(cart.id, product_id, quantity, &mut tx).await? {
            return Err(CatalogApiError::CartItemNotFound { customer_id: customer_id.to_string(), product_id });
        }
        let lines = carts::fetch_cart_lines(cart.id, &mut tx).await?;
        tx.commit().await?;
        Ok(lines)
    }

    async fn remove_from_cart(&self, customer_id: &str, product_id: i64) -> Result<Vec<CartLine>, CatalogApiError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::fetch_cart_for_customer(customer_id, &mut tx)
            .await?
            .ok_or_else(|| CatalogApiError::CartItemNotFound { customer_id: customer_id.to_string(), product_id })?;
        if !carts::remove_item(cart.id, product_id, &mut tx).await? {
            return Err(CatalogApiError::CartItemNotFound { customer_id: customer_id.to_string(), product_id });
        }
        let lines = carts::fetch_cart_lines(cart.id, &mut tx).await?;
        tx.commit().await?;
        Ok(lines)
    }

    async fn fetch_cart(&self, customer_id: &str) -> Result<Vec<CartLine>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        match carts::fetch_cart_for_customer(customer_id, &mut conn).await? {
            Some(cart) => Ok(carts::fetch_cart_lines(cart.id, &mut conn).await?),
            None => Ok(Vec::new()),
        }
    }
}

impl SettingsManagement for SqliteDatabase {
    async fn reservation_settings(&self) -> Result<ReservationSettings, SettingsError> {
        let mut conn = self.pool.acquire().await?;
        settings::reservation_settings(&mut conn).await
    }

    async fn update_reservation_settings(&self, new: ReservationSettings) -> Result<ReservationSettings, SettingsError> {
        let mut conn = self.pool.acquire().await?;
        settings::update_reservation_settings(new, &mut conn).await
    }

    async fn payment_settings(&self, provider: PaymentProvider) -> Result<Option<PaymentProviderSettings>, SettingsError> {
        let mut conn = self.pool.acquire().await?;
        settings::payment_settings(provider, &mut conn).await
    }

    async fn set_provider_active(
        &self,
        provider: PaymentProvider,
        is_active: bool,
        sandbox: bool,
    ) -> Result<PaymentProviderSettings, SettingsError> {
        let mut conn = self.pool.acquire().await?;
        settings::upsert_payment_settings(provider, is_active, sandbox, &mut conn).await
    }
}

impl StorefrontDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn checkout_cart(&self, customer_id: &str, shipping: ShippingInfo) -> Result<Order, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::fetch_cart_for_customer(customer_id, &mut tx).await?;
        let (cart_id, lines) = match cart {
            Some(cart) => {
                let lines = carts::fetch_cart_lines(cart.id, &mut tx).await?;
                (cart.id, lines)
            },
            None => return Err(StorefrontError::EmptyCart),
        };
        if lines.is_empty() {
            return Err(StorefrontError::EmptyCart);
        }
        // Any reservation failure returns here, and the dropped transaction rolls back the earlier
        // decrements in this call.
        for line in &lines {
            products::reserve_stock(line.product_id, line.quantity, &mut tx).await?;
        }
        let policy = settings::reservation_settings(&mut tx).await?;
        let total_price = lines.iter().map(|l| l.price * l.quantity).sum();
        let order = NewOrder::new(customer_id.to_string(), total_price, shipping).with_reservation_policy(&policy);
        let order = orders::insert_order(order, &mut tx).await?;
        for line in &lines {
            orders::insert_order_item(order.id, line.product_id, line.quantity, line.price, &mut tx).await?;
        }
        carts::clear_cart(cart_id, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Order [{}] created for customer {customer_id} with {} lines, total {}",
            order.order_id,
            lines.len(),
            order.total_price
        );
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_order_id(order_id, &mut conn).await?)
    }

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(order_id.clone()))?;
        Ok(orders::fetch_order_items(order.id, &mut conn).await?)
    }

    async fn fetch_orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_orders_for_customer(customer_id, &mut conn).await?)
    }

    async fn update_order_status(&self, order_id: &OrderId, new_status: OrderStatus) -> Result<Order, StorefrontError> {
        if new_status == OrderStatus::Cancelled {
            // Cancellation releases stock, which plain status writes must not skip.
            return self.cancel_order(order_id).await;
        }
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(order_id.clone()))?;
        let order = match order.status.validate_transition(new_status)? {
            Transition::NoOp => order,
            Transition::Apply => {
                let mut updated = orders::update_order_status(order.id, new_status, &mut tx).await?;
                if new_status.is_terminal() && updated.reserved_until.is_some() {
                    updated = orders::set_reserved_until(order.id, None, &mut tx).await?;
                }
                updated
            },
        };
        tx.commit().await?;
        debug!("🗃️ Order [{}] moved to status {new_status}", order.order_id);
        Ok(order)
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(order_id.clone()))?;
        match order.status.validate_transition(OrderStatus::Cancelled)? {
            Transition::NoOp => {
                trace!("🗃️ Order [{}] is already cancelled. Nothing to do.", order.order_id);
                return Ok(order);
            },
            Transition::Apply => {},
        }
        let items = orders::fetch_order_items(order.id, &mut tx).await?;
        for item in &items {
            products::release_stock(item.product_id, item.quantity, &mut tx).await?;
        }
        orders::update_order_status(order.id, OrderStatus::Cancelled, &mut tx).await?;
        let order = orders::set_reserved_until(order.id, None, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order [{}] cancelled. {} lines released back to stock", order.order_id, items.len());
        Ok(order)
    }

    async fn expire_reservations(&self) -> Result<Vec<Order>, StorefrontError> {
        let policy = SettingsManagement::reservation_settings(self).await?;
        if !policy.auto_cancel_enabled {
            trace!("🗃️ Auto-cancel is disabled; skipping reservation sweep");
            return Ok(Vec::new());
        }
        let expired = {
            let mut conn = self.pool.acquire().await?;
            orders::fetch_expired_pending_orders(&mut conn).await?
        };
        let mut cancelled = Vec::with_capacity(expired.len());
        for order in expired {
            // One bad order must not halt the sweep.
            match self.cancel_order(&order.order_id).await {
                Ok(order) => cancelled.push(order),
                Err(e) => warn!("🗃️ Could not cancel expired order [{}]: {e}", order.order_id),
            }
        }
        Ok(cancelled)
    }

    async fn set_order_item_quantity(&self, order_id: &OrderId, product_id: i64, quantity: i64) -> Result<Order, StorefrontError> {
        if quantity < 1 {
            return Err(StorefrontError::InvalidQuantity(quantity));
        }
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(order_id.clone()))?;
        if order.status != OrderStatus::Pending {
            return Err(StorefrontError::OrderModificationForbidden(order_id.clone()));
        }
        let items = orders::fetch_order_items(order.id, &mut tx).await?;
        let item = items
            .iter()
            .find(|i| i.product_id == product_id)
            .ok_or(StorefrontError::ProductNotFound(product_id))?;
        // Keep the reservation ledger in step with the changed line.
        if quantity > item.quantity {
            products::reserve_stock(product_id, quantity - item.quantity, &mut tx).await?;
        } else if quantity < item.quantity {
            products::release_stock(product_id, item.quantity - quantity, &mut tx).await?;
        }
        orders::set_order_item_quantity(order.id, product_id, quantity, &mut tx).await?;
        let order = orders::update_order_total(order.id, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn remove_order_item(&self, order_id: &OrderId, product_id: i64) -> Result<Order, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(order_id.clone()))?;
        if order.status != OrderStatus::Pending {
            return Err(StorefrontError::OrderModificationForbidden(order_id.clone()));
        }
        let items = orders::fetch_order_items(order.id, &mut tx).await?;
        let item = items
            .iter()
            .find(|i| i.product_id == product_id)
            .ok_or(StorefrontError::ProductNotFound(product_id))?;
        products::release_stock(product_id, item.quantity, &mut tx).await?;
        orders::delete_order_item(order.id, product_id, &mut tx).await?;
        let order = orders::update_order_total(order.id, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(&payment.order_id, &mut tx)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(payment.order_id.clone()))?;
        if payment.amount != order.total_price {
            return Err(StorefrontError::PaymentAmountMismatch {
                expected: order.total_price,
                actual: payment.amount,
            });
        }
        let payment = payments::insert_payment(order.id, payment, &mut tx).await?;
        if order.payment_status == OrderPaymentState::Unpaid {
            orders::set_payment_state(order.id, OrderPaymentState::Pending, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(payment)
    }

    async fn update_payment_status(&self, payment_id: i64, new_status: PaymentStatus) -> Result<Payment, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::fetch_payment(payment_id, &mut tx)
            .await?
            .ok_or_else(|| StorefrontError::PaymentNotFound(format!("id={payment_id}")))?;
        let payment = match payment.status.validate_transition(new_status)? {
            Transition::NoOp => payment,
            Transition::Apply => payments::update_payment_status(payment_id, new_status, &mut tx).await?,
        };
        tx.commit().await?;
        Ok(payment)
    }

    async fn attach_payment_response(
        &self,
        payment_id: i64,
        external_id: Option<&str>,
        raw_response: &str,
    ) -> Result<Payment, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        payments::attach_response(payment_id, external_id, raw_response, &mut conn).await
    }

    async fn fetch_payments_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(order_id.clone()))?;
        Ok(payments::fetch_payments_for_order(order.id, &mut conn).await?)
    }

    async fn apply_webhook_update(&self, update: WebhookUpdate) -> Result<WebhookOutcome, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(&update.order_id, &mut tx)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(update.order_id.clone()))?;
        let payment = match update.external_id.as_deref() {
            Some(ext) => payments::fetch_payment_by_external_id(update.provider, ext, &mut tx).await?,
            None => None,
        };
        // Refund notices often carry a different reference than the one stored at checkout (Stripe
        // sends a charge id where we hold the session id), so corrections match the settled attempt.
        let fallback_status = match update.status {
            PaymentStatus::Refunded => PaymentStatus::Paid,
            _ => PaymentStatus::Pending,
        };
        let payment = match payment {
            Some(p) => p,
            None => payments::fetch_latest_payment_in_status(order.id, update.provider, fallback_status, &mut tx)
                .await?
                .ok_or_else(|| {
                    StorefrontError::PaymentNotFound(format!(
                        "no {} payment attempt for order {}",
                        update.provider, update.order_id
                    ))
                })?,
        };
        // Replay protection and the status change commit (or fail) together.
        webhook_events::record_event(update.provider, &update.event_id, &order.order_id, payment.id, &mut tx).await?;
        let transition = payment.status.validate_transition(update.status)?;
        let payment = match transition {
            Transition::NoOp => payment,
            Transition::Apply => payments::update_payment_status(payment.id, update.status, &mut tx).await?,
        };
        let payment =
            payments::attach_response(payment.id, update.external_id.as_deref(), &update.raw, &mut tx).await?;
        let mut order_was_paid = false;
        let order = match (transition, update.status) {
            (Transition::Apply, PaymentStatus::Paid) => {
                let order = orders::set_payment_state(order.id, OrderPaymentState::Paid, &mut tx).await?;
                order_was_paid = true;
                match order.status.validate_transition(OrderStatus::Processing)? {
                    Transition::Apply => orders::update_order_status(order.id, OrderStatus::Processing, &mut tx).await?,
                    Transition::NoOp => order,
                }
            },
            (Transition::Apply, PaymentStatus::Refunded) => {
                orders::set_payment_state(order.id, OrderPaymentState::Refunded, &mut tx).await?
            },
            _ => order,
        };
        tx.commit().await?;
        debug!(
            "🗃️ Webhook {} from {} applied: payment {} is now {}, order [{}] payment state {}",
            update.event_id, update.provider, payment.id, payment.status, order.order_id, order.payment_status
        );
        Ok(WebhookOutcome { order, payment, order_was_paid })
    }
}
