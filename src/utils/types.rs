//! Common types used throughout the application

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    /// Multiplier applied to the quoted price for market fills
    pub fn slippage_factor(&self, slippage: f64) -> f64 {
        match self {
            Side::Buy => 1.0 + slippage,
            Side::Sell => 1.0 - slippage,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            _ => Err(LedgerError::InvalidSide(s.to_string())),
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
    Limit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
        }
    }
}

impl FromStr for OrderType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MARKET" => Ok(OrderType::Market),
            "LIMIT" => Ok(OrderType::Limit),
            _ => Err(LedgerError::InvalidOrderType(s.to_string())),
        }
    }
}

/// Order lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Filled,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    /// Check if transition is valid
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        use OrderStatus::*;

        match (self, target) {
            (Pending, Filled) => true,
            (Pending, Rejected) => true,
            (Pending, Cancelled) => true,

            // Terminal states have no exits
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "PENDING"),
            OrderStatus::Filled => write!(f, "FILLED"),
            OrderStatus::Rejected => write!(f, "REJECTED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Gross profit over gross loss.
///
/// With no losing trades the ratio is unbounded; that case is carried as its
/// own variant instead of a float infinity so it serializes unambiguously.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitFactor {
    Finite(f64),
    NoLosses,
}

impl ProfitFactor {
    pub fn from_totals(gross_profit: f64, gross_loss: f64) -> Self {
        if gross_loss > 0.0 {
            ProfitFactor::Finite(gross_profit / gross_loss)
        } else {
            ProfitFactor::NoLosses
        }
    }

    /// `NoLosses` is never below any threshold
    pub fn is_below(&self, threshold: f64) -> bool {
        match self {
            ProfitFactor::Finite(value) => *value < threshold,
            ProfitFactor::NoLosses => false,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            ProfitFactor::Finite(value) => Some(*value),
            ProfitFactor::NoLosses => None,
        }
    }
}

impl Default for ProfitFactor {
    fn default() -> Self {
        ProfitFactor::NoLosses
    }
}

impl fmt::Display for ProfitFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfitFactor::Finite(value) => write!(f, "{:.2}", value),
            ProfitFactor::NoLosses => write!(f, "no losses"),
        }
    }
}
