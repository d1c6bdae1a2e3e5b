//! Orders and fill records

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::utils::helpers::generate_id;
use crate::utils::types::{OrderStatus, OrderType, Side};

/// A paper order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    /// Execution price: slippage-adjusted quote for market orders,
    /// the supplied limit for limit orders
    pub price: f64,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub created_at: i64,
    pub filled_at: Option<i64>,
    pub filled_price: Option<f64>,
    pub filled_quantity: Option<f64>,
}

impl Order {
    pub fn new(
        symbol: &str,
        side: Side,
        quantity: f64,
        price: f64,
        order_type: OrderType,
        created_at: i64,
    ) -> Self {
        Self {
            id: generate_id(),
            symbol: symbol.to_string(),
            side,
            quantity,
            price,
            order_type,
            status: OrderStatus::Pending,
            created_at,
            filled_at: None,
            filled_price: None,
            filled_quantity: None,
        }
    }

    /// Move to `target` if the lifecycle allows it
    pub fn transition_to(&mut self, target: OrderStatus) -> bool {
        if !self.status.can_transition_to(target) {
            warn!(
                "Invalid order transition for {}: {} -> {}",
                self.id, self.status, target
            );
            return false;
        }
        self.status = target;
        true
    }

    /// Mark the whole quantity filled at the execution price
    pub fn fill(&mut self, filled_at: i64) -> bool {
        if !self.transition_to(OrderStatus::Filled) {
            return false;
        }
        self.filled_at = Some(filled_at);
        self.filled_price = Some(self.price);
        self.filled_quantity = Some(self.quantity);
        true
    }

    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }
}

/// Outcome of a placed or cancelled order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: String,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_cost: Option<f64>,
}

impl OrderResult {
    pub fn filled(order: &Order, transaction_cost: f64) -> Self {
        Self {
            order_id: order.id.clone(),
            status: order.status,
            filled_price: order.filled_price,
            filled_quantity: order.filled_quantity,
            transaction_cost: Some(transaction_cost),
        }
    }

    pub fn unfilled(order: &Order) -> Self {
        Self {
            order_id: order.id.clone(),
            status: order.status,
            filled_price: None,
            filled_quantity: None,
            transaction_cost: None,
        }
    }
}

/// Fill record appended to the trade history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub transaction_cost: f64,
    pub timestamp: i64,
    pub balance_after: f64,
}
