use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, OrderId, OrderItem, OrderStatus, ShippingInfo},
    events::{EventProducers, OrderCancelledEvent},
    traits::{StorefrontDatabase, StorefrontError},
};

/// `OrderFlowApi` is the primary API for the order life cycle: converting a cart into an order,
/// amending or cancelling pending orders, and sweeping expired reservations.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: StorefrontDatabase
{
    /// Converts the customer's cart into a new order.
    ///
    /// Stock is reserved for every line, unit prices are frozen at their current values, and the cart is
    /// cleared. The whole conversion is atomic: if any line cannot be reserved, the call fails with
    /// [`StorefrontError::InsufficientStock`] and nothing changes.
    pub async fn checkout(&self, customer_id: &str, shipping: ShippingInfo) -> Result<Order, StorefrontError> {
        let order = self.db.checkout_cart(customer_id, shipping).await?;
        info!("🔄️📦️ Order [{}] created for customer {customer_id}", order.order_id);
        Ok(order)
    }

    pub async fn order(&self, order_id: &OrderId) -> Result<Option<Order>, StorefrontError> {
        self.db.fetch_order(order_id).await
    }

    pub async fn order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, StorefrontError> {
        self.db.fetch_order_items(order_id).await
    }

    pub async fn orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, StorefrontError> {
        self.db.fetch_orders_for_customer(customer_id).await
    }

    /// Moves an order to a new status, enforcing the state machine. Moving to `Cancelled` goes through
    /// [`Self::cancel_order`] so that reserved stock is returned.
    pub async fn update_order_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatus,
    ) -> Result<Order, StorefrontError> {
        if new_status == OrderStatus::Cancelled {
            return self.cancel_order(order_id).await;
        }
        self.db.update_order_status(order_id, new_status).await
    }

    /// Cancels an order and returns its reserved stock. Cancelling an already-cancelled order is a no-op
    /// and succeeds. Fires the order-cancelled hook when the status actually changed.
    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, StorefrontError> {
        let old_status = self
            .db
            .fetch_order(order_id)
            .await?
            .ok_or_else(|| StorefrontError::OrderNotFound(order_id.clone()))?
            .status;
        let order = self.db.cancel_order(order_id).await?;
        if old_status != OrderStatus::Cancelled {
            self.call_order_cancelled_hook(&order, old_status).await;
        }
        info!("🔄️📦️ Order [{}] cancelled", order.order_id);
        Ok(order)
    }

    /// Amends the quantity of one line on a pending order, adjusting reserved stock and recomputing the
    /// order total.
    pub async fn set_order_item_quantity(
        &self,
        order_id: &OrderId,
        product_id: i64,
        quantity: i64,
    ) -> Result<Order, StorefrontError> {
        self.db.set_order_item_quantity(order_id, product_id, quantity).await
    }

    pub async fn remove_order_item(
        &self,
        order_id: &OrderId,
        product_id: i64,
    ) -> Result<Order, StorefrontError> {
        self.db.remove_order_item(order_id, product_id).await
    }

    /// Cancels every pending order whose reservation deadline has passed, firing the order-cancelled hook
    /// for each. The background worker calls this on a timer; it is also safe to call ad hoc.
    pub async fn expire_reservations(&self) -> Result<Vec<Order>, StorefrontError> {
        let cancelled = self.db.expire_reservations().await?;
        if !cancelled.is_empty() {
            info!("🔄️🕰️ {} orders cancelled by the reservation sweep", cancelled.len());
        }
        for order in &cancelled {
            self.call_order_cancelled_hook(order, OrderStatus::Pending).await;
        }
        Ok(cancelled)
    }

    async fn call_order_cancelled_hook(&self, order: &Order, old_status: OrderStatus) {
        for emitter in &self.producers.order_cancelled_producer {
            debug!("🔄️📦️ Notifying order cancelled hook subscribers");
            let event = OrderCancelledEvent { order: order.clone(), old_status };
            emitter.publish_event(event).await;
        }
    }
}
