//! Paper Trading Ledger
//!
//! Simulated order execution and portfolio accounting:
//! - Market orders fill immediately at the last quote plus slippage
//! - Limit orders are accepted as PENDING and stay inert
//! - Weighted-average entry prices, realized and unrealized P&L
//! - Fee-inclusive balance accounting that never goes negative

pub mod order;
pub mod position;
pub mod summary;

pub use order::{Order, OrderResult, TradeRecord};
pub use position::{ClosedPosition, Position};
pub use summary::{BalanceInfo, PortfolioSummary, PositionDetail, TradeStatistics};

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::utils::helpers::{current_timestamp_millis, safe_div};
use crate::utils::types::{OrderStatus, OrderType, ProfitFactor, Side};

/// Paper portfolio: balance, positions, orders and fills for one account
#[derive(Debug, Clone)]
pub struct PortfolioLedger {
    initial_balance: f64,
    current_balance: f64,
    /// Open positions keyed by symbol
    positions: BTreeMap<String, Position>,
    /// Fully closed position lifecycles
    closed_positions: Vec<ClosedPosition>,
    orders: Vec<Order>,
    trade_history: Vec<TradeRecord>,
    /// Last quote per symbol
    current_prices: HashMap<String, f64>,
    transaction_fee: f64,
    slippage: f64,
}

impl PortfolioLedger {
    /// Create a ledger with the default fee (0.1%) and slippage (0.05%)
    pub fn new(initial_balance: f64) -> Self {
        Self::with_config(&LedgerConfig {
            initial_balance,
            ..LedgerConfig::default()
        })
    }

    pub fn with_config(config: &LedgerConfig) -> Self {
        Self {
            initial_balance: config.initial_balance,
            current_balance: config.initial_balance,
            positions: BTreeMap::new(),
            closed_positions: Vec::new(),
            orders: Vec::new(),
            trade_history: Vec::new(),
            current_prices: HashMap::new(),
            transaction_fee: config.transaction_fee,
            slippage: config.slippage,
        }
    }

    /// Record a new quote and mark any open position on the symbol
    pub fn update_market_price(&mut self, symbol: &str, price: f64) -> Result<(), LedgerError> {
        if !(price.is_finite() && price > 0.0) {
            return Err(LedgerError::InvalidPrice(price));
        }

        self.current_prices.insert(symbol.to_string(), price);
        if let Some(position) = self.positions.get_mut(symbol) {
            position.mark(price);
            debug!(
                "Marked {} @ {:.4}, unrealized P&L: {:.4}",
                symbol, price, position.unrealized_pnl
            );
        }
        Ok(())
    }

    /// Place an order.
    ///
    /// Market orders execute synchronously; limit orders are stored as
    /// PENDING and never fill inside the ledger.
    pub fn place_order(
        &mut self,
        symbol: &str,
        side: Side,
        quantity: f64,
        order_type: OrderType,
        price: Option<f64>,
    ) -> Result<OrderResult, LedgerError> {
        if !(quantity.is_finite() && quantity > 0.0) {
            return Err(LedgerError::InvalidQuantity(quantity));
        }

        let execution_price = match order_type {
            OrderType::Market => {
                let last = self
                    .current_prices
                    .get(symbol)
                    .copied()
                    .ok_or_else(|| LedgerError::NoMarketPrice(symbol.to_string()))?;
                last * side.slippage_factor(self.slippage)
            }
            OrderType::Limit => {
                let limit = price.ok_or(LedgerError::MissingLimitPrice)?;
                if !(limit.is_finite() && limit > 0.0) {
                    return Err(LedgerError::InvalidPrice(limit));
                }
                limit
            }
        };

        let order = Order::new(
            symbol,
            side,
            quantity,
            execution_price,
            order_type,
            current_timestamp_millis(),
        );

        match order_type {
            OrderType::Market => self.execute_order(order),
            OrderType::Limit => {
                info!(
                    "Limit order accepted: {} {:.6} {} @ {:.4} ({})",
                    order.side, order.quantity, order.symbol, order.price, order.id
                );
                let result = OrderResult::unfilled(&order);
                self.orders.push(order);
                Ok(result)
            }
        }
    }

    /// Boundary variant taking side and order type as strings
    pub fn place_order_str(
        &mut self,
        symbol: &str,
        side: &str,
        quantity: f64,
        order_type: &str,
        price: Option<f64>,
    ) -> Result<OrderResult, LedgerError> {
        let side: Side = side.parse()?;
        let order_type: OrderType = order_type.parse()?;
        self.place_order(symbol, side, quantity, order_type, price)
    }

    /// Sell the entire position in `symbol` at market
    pub fn close_position(&mut self, symbol: &str) -> Result<OrderResult, LedgerError> {
        let quantity = self
            .positions
            .get(symbol)
            .map(|p| p.quantity)
            .ok_or_else(|| LedgerError::NoOpenPosition(symbol.to_string()))?;

        self.place_order(symbol, Side::Sell, quantity, OrderType::Market, None)
    }

    /// Cancel a PENDING order
    pub fn cancel_order(&mut self, order_id: &str) -> Result<OrderResult, LedgerError> {
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;

        if !order.transition_to(OrderStatus::Cancelled) {
            return Err(LedgerError::OrderNotCancellable {
                order_id: order.id.clone(),
                status: order.status,
            });
        }

        info!("Order cancelled: {}", order.id);
        Ok(OrderResult::unfilled(order))
    }

    fn execute_order(&mut self, mut order: Order) -> Result<OrderResult, LedgerError> {
        let transaction_cost = order.notional() * self.transaction_fee;
        let now = current_timestamp_millis();

        match order.side {
            Side::Buy => {
                let required = order.notional() + transaction_cost;
                if required > self.current_balance {
                    order.transition_to(OrderStatus::Rejected);
                    warn!(
                        "Order {} rejected: insufficient balance (required {:.4}, available {:.4})",
                        order.id, required, self.current_balance
                    );
                    return Err(LedgerError::InsufficientBalance {
                        order_id: order.id,
                        required,
                        available: self.current_balance,
                    });
                }

                order.fill(now);
                self.positions
                    .entry(order.symbol.clone())
                    .and_modify(|p| p.add(order.quantity, order.price))
                    .or_insert_with(|| Position::open(&order.symbol, order.quantity, order.price, now));
                self.current_balance -= required;
            }
            Side::Sell => {
                let position = match self.positions.get_mut(&order.symbol) {
                    Some(position) if position.quantity >= order.quantity => position,
                    other => {
                        let available = other.map(|p| p.quantity).unwrap_or(0.0);
                        order.transition_to(OrderStatus::Rejected);
                        warn!(
                            "Order {} rejected: insufficient position in {} (requested {}, available {})",
                            order.id, order.symbol, order.quantity, available
                        );
                        return Err(LedgerError::InsufficientPosition {
                            order_id: order.id,
                            symbol: order.symbol,
                            requested: order.quantity,
                            available,
                        });
                    }
                };

                order.fill(now);
                let realized = position.reduce(order.quantity, order.price);
                let closed = position.is_closed();
                self.current_balance += order.notional() - transaction_cost;

                if closed {
                    if let Some(position) = self.positions.remove(&order.symbol) {
                        info!(
                            "Position closed: {} realized P&L {:.4}",
                            position.symbol, position.realized_pnl
                        );
                        self.closed_positions
                            .push(ClosedPosition::from_position(position, now));
                    }
                } else if let Some(last) = self.current_prices.get(&order.symbol).copied() {
                    position.mark(last);
                }
                debug!("Realized {:.4} on {}", realized, order.symbol);
            }
        }

        self.trade_history.push(TradeRecord {
            id: order.id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            price: order.price,
            transaction_cost,
            timestamp: now,
            balance_after: self.current_balance,
        });

        info!(
            "Paper trade: {} {:.6} {} @ {:.4} (fee {:.6}, balance {:.4})",
            order.side, order.quantity, order.symbol, order.price, transaction_cost, self.current_balance
        );

        let result = OrderResult::filled(&order, transaction_cost);
        self.orders.push(order);
        self.check_invariants();
        Ok(result)
    }

    /// Panics when the ledger is corrupted; the checked paths above can never
    /// produce these states.
    fn check_invariants(&self) {
        assert!(
            self.current_balance.is_finite() && self.current_balance >= 0.0,
            "ledger corrupted: balance {}",
            self.current_balance
        );
        for position in self.positions.values() {
            assert!(
                position.quantity > 0.0,
                "ledger corrupted: {} held with quantity {}",
                position.symbol,
                position.quantity
            );
        }
    }

    pub fn get_portfolio_summary(&self) -> PortfolioSummary {
        let positions: Vec<PositionDetail> = self
            .positions
            .values()
            .map(|pos| {
                let current_price = self.current_prices.get(&pos.symbol).copied();
                PositionDetail {
                    symbol: pos.symbol.clone(),
                    quantity: pos.quantity,
                    avg_entry_price: pos.avg_entry_price,
                    current_price,
                    market_value: pos.quantity * current_price.unwrap_or(pos.avg_entry_price),
                    unrealized_pnl: pos.unrealized_pnl,
                    unrealized_pnl_percentage: safe_div(pos.unrealized_pnl, pos.cost_basis()) * 100.0,
                    realized_pnl: pos.realized_pnl,
                }
            })
            .collect();

        let positions_value: f64 = positions.iter().map(|p| p.market_value).sum();
        let total_value = self.current_balance + positions_value;
        let unrealized_pnl: f64 = self.positions.values().map(|p| p.unrealized_pnl).sum();
        let realized_pnl = self.positions.values().map(|p| p.realized_pnl).sum::<f64>()
            + self.closed_positions.iter().map(|p| p.realized_pnl).sum::<f64>();

        PortfolioSummary {
            initial_balance: self.initial_balance,
            current_balance: self.current_balance,
            positions_value,
            total_value,
            total_pnl: total_value - self.initial_balance,
            total_return_percentage: safe_div(total_value - self.initial_balance, self.initial_balance) * 100.0,
            unrealized_pnl,
            realized_pnl,
            num_positions: positions.len(),
            positions,
            num_trades: self.trade_history.len(),
        }
    }

    pub fn get_trade_statistics(&self) -> TradeStatistics {
        let realized = self
            .positions
            .values()
            .map(|p| p.realized_pnl)
            .chain(self.closed_positions.iter().map(|p| p.realized_pnl));

        let mut winning_trades = 0;
        let mut losing_trades = 0;
        let mut total_profit = 0.0;
        let mut total_loss = 0.0;
        for pnl in realized {
            if pnl > 0.0 {
                winning_trades += 1;
                total_profit += pnl;
            } else if pnl < 0.0 {
                losing_trades += 1;
                total_loss += pnl.abs();
            }
        }

        let decided = winning_trades + losing_trades;
        TradeStatistics {
            total_trades: self.trade_history.len(),
            total_fees: self.trade_history.iter().map(|t| t.transaction_cost).sum(),
            winning_trades,
            losing_trades,
            win_rate: safe_div(winning_trades as f64, decided as f64) * 100.0,
            total_profit,
            total_loss,
            profit_factor: ProfitFactor::from_totals(total_profit, total_loss),
            avg_win: safe_div(total_profit, winning_trades as f64),
            avg_loss: safe_div(total_loss, losing_trades as f64),
        }
    }

    /// Wipe all state and start again from `new_balance`
    pub fn reset(&mut self, new_balance: f64) -> Result<(), LedgerError> {
        if !(new_balance.is_finite() && new_balance > 0.0) {
            return Err(LedgerError::InvalidBalance(new_balance));
        }

        self.initial_balance = new_balance;
        self.current_balance = new_balance;
        self.positions.clear();
        self.closed_positions.clear();
        self.orders.clear();
        self.trade_history.clear();
        self.current_prices.clear();

        info!("Portfolio reset with balance ${:.2}", new_balance);
        Ok(())
    }

    pub fn balance(&self) -> BalanceInfo {
        BalanceInfo {
            initial_balance: self.initial_balance,
            current_balance: self.current_balance,
            available_balance: self.current_balance,
        }
    }

    pub fn current_balance(&self) -> f64 {
        self.current_balance
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn closed_positions(&self) -> &[ClosedPosition] {
        &self.closed_positions
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn trade_history(&self) -> &[TradeRecord] {
        &self.trade_history
    }

    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.current_prices.get(symbol).copied()
    }

    pub fn transaction_fee(&self) -> f64 {
        self.transaction_fee
    }
}

impl Default for PortfolioLedger {
    fn default() -> Self {
        Self::with_config(&LedgerConfig::default())
    }
}
