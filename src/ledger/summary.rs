//! Read-only views over the ledger

use serde::{Deserialize, Serialize};

use crate::utils::types::ProfitFactor;

/// Portfolio valuation at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub initial_balance: f64,
    pub current_balance: f64,
    /// Sum of quantity x last quote, falling back to entry price
    pub positions_value: f64,
    pub total_value: f64,
    pub total_pnl: f64,
    pub total_return_percentage: f64,
    pub unrealized_pnl: f64,
    /// Open positions plus fully closed ones
    pub realized_pnl: f64,
    pub positions: Vec<PositionDetail>,
    pub num_positions: usize,
    pub num_trades: usize,
}

/// Per-position line of the portfolio summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionDetail {
    pub symbol: String,
    pub quantity: f64,
    pub avg_entry_price: f64,
    /// Last quote, if one was ever received
    pub current_price: Option<f64>,
    pub market_value: f64,
    pub unrealized_pnl: f64,
    pub unrealized_pnl_percentage: f64,
    pub realized_pnl: f64,
}

/// Fill and realized-PnL statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStatistics {
    /// Number of fills
    pub total_trades: usize,
    pub total_fees: f64,
    /// Position lifecycles with positive realized PnL
    pub winning_trades: usize,
    /// Position lifecycles with negative realized PnL
    pub losing_trades: usize,
    /// Percentage, 0-100
    pub win_rate: f64,
    pub total_profit: f64,
    pub total_loss: f64,
    pub profit_factor: ProfitFactor,
    pub avg_win: f64,
    pub avg_loss: f64,
}

/// Cash view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceInfo {
    pub initial_balance: f64,
    pub current_balance: f64,
    pub available_balance: f64,
}
