//! Spot positions held by the paper ledger

use serde::{Deserialize, Serialize};

/// Long position in one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Always > 0 while the position is in the ledger
    pub quantity: f64,
    /// Quantity-weighted average of the BUY fills since the position opened
    pub avg_entry_price: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
    pub created_at: i64,
}

impl Position {
    pub fn open(symbol: &str, quantity: f64, price: f64, created_at: i64) -> Self {
        Self {
            symbol: symbol.to_string(),
            quantity,
            avg_entry_price: price,
            unrealized_pnl: 0.0,
            realized_pnl: 0.0,
            created_at,
        }
    }

    /// Add a BUY fill, re-weighting the average entry price
    pub fn add(&mut self, quantity: f64, price: f64) {
        let total_cost = self.quantity * self.avg_entry_price + quantity * price;
        let total_quantity = self.quantity + quantity;
        self.avg_entry_price = total_cost / total_quantity;
        self.quantity = total_quantity;
    }

    /// Remove a SELL fill and return the PnL it realized
    pub fn reduce(&mut self, quantity: f64, price: f64) -> f64 {
        let realized = (price - self.avg_entry_price) * quantity;
        self.realized_pnl += realized;
        self.quantity -= quantity;
        realized
    }

    /// Mark to market
    pub fn mark(&mut self, price: f64) {
        self.unrealized_pnl = (price - self.avg_entry_price) * self.quantity;
    }

    pub fn cost_basis(&self) -> f64 {
        self.avg_entry_price * self.quantity
    }

    pub fn is_closed(&self) -> bool {
        self.quantity <= 0.0
    }
}

/// Realized result of a position lifecycle that has been fully closed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub symbol: String,
    pub realized_pnl: f64,
    pub opened_at: i64,
    pub closed_at: i64,
}

impl ClosedPosition {
    pub fn from_position(position: Position, closed_at: i64) -> Self {
        Self {
            symbol: position.symbol,
            realized_pnl: position.realized_pnl,
            opened_at: position.created_at,
            closed_at,
        }
    }
}
