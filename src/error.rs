//! Error types
//!
//! Every foreseeable failure of the ledger and the policy is an explicit
//! variant here. None of them leave state mutated when returned.

use thiserror::Error;

use crate::utils::types::OrderStatus;

/// Ledger errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("insufficient balance for order {order_id}: required {required:.4}, available {available:.4}")]
    InsufficientBalance {
        order_id: String,
        required: f64,
        available: f64,
    },

    #[error("insufficient position in {symbol} for order {order_id}: requested {requested}, available {available}")]
    InsufficientPosition {
        order_id: String,
        symbol: String,
        requested: f64,
        available: f64,
    },

    #[error("no market price available for {0}")]
    NoMarketPrice(String),

    #[error("no open position for {0}")]
    NoOpenPosition(String),

    #[error("invalid side '{0}', expected BUY or SELL")]
    InvalidSide(String),

    #[error("invalid quantity {0}, must be positive")]
    InvalidQuantity(f64),

    #[error("invalid order type '{0}', expected MARKET or LIMIT")]
    InvalidOrderType(String),

    #[error("invalid price {0}, must be positive")]
    InvalidPrice(f64),

    #[error("limit orders require a price")]
    MissingLimitPrice,

    #[error("invalid balance {0}, must be positive")]
    InvalidBalance(f64),

    #[error("order {0} not found")]
    OrderNotFound(String),

    #[error("order {order_id} is {status} and cannot be cancelled")]
    OrderNotCancellable {
        order_id: String,
        status: OrderStatus,
    },
}

impl LedgerError {
    /// Stable machine-readable code for the transport layer
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::InsufficientPosition { .. } => "insufficient_position",
            LedgerError::NoMarketPrice(_) => "no_market_price",
            LedgerError::NoOpenPosition(_) => "no_open_position",
            LedgerError::InvalidSide(_) => "invalid_side",
            LedgerError::InvalidQuantity(_) => "invalid_quantity",
            LedgerError::InvalidOrderType(_) => "invalid_order_type",
            LedgerError::InvalidPrice(_) => "invalid_price",
            LedgerError::MissingLimitPrice => "missing_limit_price",
            LedgerError::InvalidBalance(_) => "invalid_balance",
            LedgerError::OrderNotFound(_) => "order_not_found",
            LedgerError::OrderNotCancellable { .. } => "order_not_cancellable",
        }
    }
}

/// Policy errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("confidence threshold {0} out of range [0.1, 0.9]")]
    ThresholdOutOfRange(f64),
}

/// Errors of the ledger/policy session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("a trade is already open on {0}")]
    TradeAlreadyOpen(String),

    #[error("no open trade on {0}")]
    NoOpenTrade(String),
}
