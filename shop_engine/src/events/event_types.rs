use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatus, Payment};

/// Fired when a webhook moves an order's payment state to `Paid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub payment: Payment,
}

impl OrderPaidEvent {
    pub fn new(order: Order, payment: Payment) -> Self {
        Self { order, payment }
    }
}

/// Fired when an order is cancelled, either explicitly or by the reservation sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order: Order,
    pub old_status: OrderStatus,
}

impl OrderCancelledEvent {
    pub fn new(order: Order, old_status: OrderStatus) -> Self {
        Self { order, old_status }
    }
}
