//! Trading Session
//!
//! Couples one ledger and one policy: signals are screened by the policy,
//! accepted ones are filled by the ledger, and closed round trips are fed
//! back to the policy as outcomes.
//!
//! Each component sits behind its own mutex. Locks are always taken in the
//! order open trades, ledger, policy, and the policy lock is never held while
//! another is acquired.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::agentic::{
    AdaptivePolicy, AdjustmentReport, Decision, LearningParameters, LearningReset,
    MarketAnalysis, MarketConditions, PerformanceSummary, RecommendationReport, RoundTrip,
    TradeOutcome,
};
use crate::config::AppConfig;
use crate::error::{LedgerError, SessionError};
use crate::ledger::{
    BalanceInfo, ClosedPosition, Order, OrderResult, PortfolioLedger, PortfolioSummary, Position,
    TradeRecord, TradeStatistics,
};
use crate::telemetry::metrics;
use crate::utils::helpers::current_timestamp_millis;
use crate::utils::types::{OrderType, Side};

/// A long position opened through the session and not yet closed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenTrade {
    /// Id of the entry order
    pub trade_id: String,
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub quantity: f64,
    pub opened_at: i64,
    pub market_conditions: MarketConditions,
    pub decision_confidence: f64,
}

/// Policy decision plus the order it led to, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryReport {
    pub decision: Decision,
    pub order: Option<OrderResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitReport {
    pub order: OrderResult,
    pub outcome: TradeOutcome,
    /// Present when this outcome triggered an adjustment pass
    pub adjustment: Option<AdjustmentReport>,
}

pub struct TradingSession {
    open_trades: Mutex<HashMap<String, OpenTrade>>,
    ledger: Mutex<PortfolioLedger>,
    policy: Mutex<AdaptivePolicy>,
}

impl TradingSession {
    pub fn new(ledger: PortfolioLedger, policy: AdaptivePolicy) -> Self {
        metrics::record_confidence_threshold(policy.confidence_threshold());
        Self {
            open_trades: Mutex::new(HashMap::new()),
            ledger: Mutex::new(ledger),
            policy: Mutex::new(policy),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            PortfolioLedger::with_config(&config.ledger),
            AdaptivePolicy::with_config(&config.policy),
        )
    }

    pub fn update_market_price(&self, symbol: &str, price: f64) -> Result<(), LedgerError> {
        self.ledger.lock().update_market_price(symbol, price)
    }

    /// Screen a long entry through the policy and buy `quantity` at market
    /// when accepted. At most one session trade is open per symbol.
    pub fn evaluate_entry(
        &self,
        symbol: &str,
        quantity: f64,
        conditions: &MarketConditions,
        confidence: f64,
    ) -> Result<EntryReport, SessionError> {
        let mut open_trades = self.open_trades.lock();
        if open_trades.contains_key(symbol) {
            return Err(SessionError::TradeAlreadyOpen(symbol.to_string()));
        }

        let decision = self.policy.lock().should_trade(conditions, confidence);
        metrics::record_decision(decision.should_trade);

        if !decision.should_trade {
            info!("Signal on {} rejected: {}", symbol, decision.message);
            return Ok(EntryReport { decision, order: None });
        }

        let mut ledger = self.ledger.lock();
        let order = match ledger.place_order(symbol, Side::Buy, quantity, OrderType::Market, None) {
            Ok(order) => order,
            Err(e) => {
                metrics::record_order_rejected(e.code());
                return Err(e.into());
            }
        };
        metrics::record_order_filled();
        metrics::record_portfolio(&ledger.get_portfolio_summary());

        open_trades.insert(
            symbol.to_string(),
            OpenTrade {
                trade_id: order.order_id.clone(),
                symbol: symbol.to_string(),
                side: Side::Buy,
                entry_price: order.filled_price.unwrap_or_default(),
                quantity: order.filled_quantity.unwrap_or(quantity),
                opened_at: current_timestamp_millis(),
                market_conditions: conditions.clone(),
                decision_confidence: confidence,
            },
        );

        Ok(EntryReport {
            decision,
            order: Some(order),
        })
    }

    /// Close the session trade on `symbol` and feed its outcome to the policy
    pub fn exit(&self, symbol: &str) -> Result<ExitReport, SessionError> {
        let mut open_trades = self.open_trades.lock();
        let trade = open_trades
            .get(symbol)
            .cloned()
            .ok_or_else(|| SessionError::NoOpenTrade(symbol.to_string()))?;

        let mut ledger = self.ledger.lock();
        let order = match ledger.close_position(symbol) {
            Ok(order) => order,
            Err(e) => {
                metrics::record_order_rejected(e.code());
                if matches!(e, LedgerError::NoOpenPosition(_)) {
                    // Position was closed outside the session
                    warn!("Dropping stale open trade on {}", symbol);
                    open_trades.remove(symbol);
                }
                return Err(e.into());
            }
        };
        metrics::record_order_filled();
        metrics::record_portfolio(&ledger.get_portfolio_summary());
        drop(ledger);
        open_trades.remove(symbol);
        drop(open_trades);

        let hold_ms = (current_timestamp_millis() - trade.opened_at).max(0);
        let outcome = TradeOutcome::from_round_trip(RoundTrip {
            trade_id: trade.trade_id,
            symbol: trade.symbol,
            side: trade.side,
            entry_price: trade.entry_price,
            exit_price: order.filled_price.unwrap_or(trade.entry_price),
            quantity: trade.quantity,
            hold_time_minutes: (hold_ms / 60_000) as u64,
            market_conditions: trade.market_conditions,
            decision_confidence: trade.decision_confidence,
        });

        let adjustment = self.record_outcome(outcome.clone());
        Ok(ExitReport {
            order,
            outcome,
            adjustment,
        })
    }

    /// Feed an externally built outcome to the policy
    pub fn record_outcome(&self, outcome: TradeOutcome) -> Option<AdjustmentReport> {
        let mut policy = self.policy.lock();
        let adjustment = policy.record_outcome(outcome);
        metrics::record_outcome(policy.latest_metrics().map(|m| m.win_rate));
        metrics::record_confidence_threshold(policy.confidence_threshold());
        adjustment
    }

    pub fn should_trade(&self, conditions: &MarketConditions, confidence: f64) -> Decision {
        self.policy.lock().should_trade(conditions, confidence)
    }

    /// Direct order placement, bypassing the policy
    pub fn place_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: f64,
        order_type: OrderType,
        price: Option<f64>,
    ) -> Result<OrderResult, LedgerError> {
        let mut ledger = self.ledger.lock();
        let result = ledger.place_order(symbol, side, quantity, order_type, price);
        match &result {
            Ok(order) if order.filled_price.is_some() => {
                metrics::record_order_filled();
                metrics::record_portfolio(&ledger.get_portfolio_summary());
            }
            Ok(_) => {}
            Err(e) => metrics::record_order_rejected(e.code()),
        }
        result
    }

    pub fn cancel_order(&self, order_id: &str) -> Result<OrderResult, LedgerError> {
        self.ledger.lock().cancel_order(order_id)
    }

    /// Reset the ledger; open session trades are forgotten with it
    pub fn reset(&self, new_balance: f64) -> Result<(), LedgerError> {
        let mut open_trades = self.open_trades.lock();
        let mut ledger = self.ledger.lock();
        ledger.reset(new_balance)?;
        if !open_trades.is_empty() {
            warn!("Discarding {} open trades on reset", open_trades.len());
        }
        open_trades.clear();
        metrics::record_portfolio(&ledger.get_portfolio_summary());
        Ok(())
    }

    pub fn reset_learning(&self) -> LearningReset {
        let mut policy = self.policy.lock();
        let reset = policy.reset_learning();
        metrics::record_confidence_threshold(policy.confidence_threshold());
        reset
    }

    pub fn set_confidence_threshold(&self, threshold: f64) -> Result<f64, SessionError> {
        let old = self.policy.lock().set_confidence_threshold(threshold)?;
        metrics::record_confidence_threshold(threshold);
        Ok(old)
    }

    // Snapshot reads

    pub fn portfolio_summary(&self) -> PortfolioSummary {
        self.ledger.lock().get_portfolio_summary()
    }

    pub fn trade_statistics(&self) -> TradeStatistics {
        self.ledger.lock().get_trade_statistics()
    }

    pub fn balance(&self) -> BalanceInfo {
        self.ledger.lock().balance()
    }

    pub fn positions(&self) -> Vec<Position> {
        self.ledger.lock().positions().cloned().collect()
    }

    pub fn closed_positions(&self) -> Vec<ClosedPosition> {
        self.ledger.lock().closed_positions().to_vec()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.ledger.lock().orders().to_vec()
    }

    pub fn trade_history(&self) -> Vec<TradeRecord> {
        self.ledger.lock().trade_history().to_vec()
    }

    pub fn open_trades(&self) -> Vec<OpenTrade> {
        let mut trades: Vec<_> = self.open_trades.lock().values().cloned().collect();
        trades.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        trades
    }

    pub fn has_open_trade(&self, symbol: &str) -> bool {
        self.open_trades.lock().contains_key(symbol)
    }

    pub fn performance_summary(&self) -> PerformanceSummary {
        self.policy.lock().get_performance_summary()
    }

    pub fn learning_parameters(&self) -> LearningParameters {
        self.policy.lock().parameters()
    }

    pub fn recommendations(&self) -> RecommendationReport {
        self.policy.lock().recommendations()
    }

    pub fn market_analysis(&self) -> Option<MarketAnalysis> {
        self.policy.lock().market_analysis()
    }

    pub fn recent_outcomes(&self, n: usize) -> Vec<TradeOutcome> {
        self.policy.lock().recent_outcomes(n).to_vec()
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.policy.lock().confidence_threshold()
    }
}

impl Default for TradingSession {
    fn default() -> Self {
        Self::new(PortfolioLedger::default(), AdaptivePolicy::default())
    }
}
