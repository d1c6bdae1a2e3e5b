//! Performance Analyzer
//!
//! Rolling statistics over recorded trade outcomes:
//! - Win rate, average win/loss, best and worst trade
//! - Sharpe ratio on per-trade percentage returns
//! - Max drawdown of cumulative P&L
//! - Profit factor with an explicit no-losses case

use serde::{Deserialize, Serialize};

use super::outcome::TradeOutcome;
use super::parameters::PolicyState;
use crate::utils::helpers::{mean, population_std_dev, safe_div};
use crate::utils::types::ProfitFactor;

/// Metrics over the analysis window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningMetrics {
    /// Outcomes in the window
    pub total_trades: usize,
    /// Fraction of outcomes with pnl > 0
    pub win_rate: f64,
    pub avg_pnl: f64,
    /// Mean pnl of winners, 0 without winners
    pub avg_win: f64,
    /// Mean pnl of losers (negative), 0 without losers
    pub avg_loss: f64,
    pub sharpe_ratio: f64,
    /// Deepest fall of cumulative pnl below its running peak, <= 0
    pub max_drawdown: f64,
    pub profit_factor: ProfitFactor,
    pub best_trade: f64,
    pub worst_trade: f64,
}

/// Metrics plus the parameters in force when they were computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: i64,
    pub metrics: LearningMetrics,
    pub total_lifetime_trades: usize,
    pub parameters: PolicyState,
}

/// Stateless analyzer over the most recent outcomes
#[derive(Debug, Clone, Copy)]
pub struct PerformanceAnalyzer {
    /// Most recent outcomes considered
    window: usize,
    /// Below this many outcomes nothing is computed
    min_trades: usize,
}

impl PerformanceAnalyzer {
    pub fn new(window: usize, min_trades: usize) -> Self {
        Self { window, min_trades }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Compute metrics over the last `window` outcomes, or `None` while the
    /// full history is shorter than `min_trades`.
    pub fn analyze(&self, outcomes: &[TradeOutcome]) -> Option<LearningMetrics> {
        if outcomes.len() < self.min_trades || outcomes.is_empty() {
            return None;
        }

        let recent = &outcomes[outcomes.len().saturating_sub(self.window)..];
        let pnls: Vec<f64> = recent.iter().map(|t| t.pnl).collect();
        let wins: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
        let losses: Vec<f64> = pnls.iter().copied().filter(|p| *p < 0.0).collect();

        let gross_profit: f64 = wins.iter().sum();
        let gross_loss: f64 = losses.iter().sum::<f64>().abs();

        let returns: Vec<f64> = recent.iter().map(|t| t.pnl_percentage).collect();

        Some(LearningMetrics {
            total_trades: recent.len(),
            win_rate: wins.len() as f64 / recent.len() as f64,
            avg_pnl: mean(&pnls),
            avg_win: mean(&wins),
            avg_loss: mean(&losses),
            sharpe_ratio: Self::calculate_sharpe(&returns),
            max_drawdown: Self::calculate_max_drawdown(&pnls),
            profit_factor: ProfitFactor::from_totals(gross_profit, gross_loss),
            best_trade: pnls.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            worst_trade: pnls.iter().copied().fold(f64::INFINITY, f64::min),
        })
    }

    /// Mean over population standard deviation, unannualized
    pub fn calculate_sharpe(returns: &[f64]) -> f64 {
        let std_dev = population_std_dev(returns);
        if std_dev == 0.0 {
            return 0.0;
        }
        safe_div(mean(returns), std_dev)
    }

    /// Minimum of cumulative pnl minus its running maximum, in currency
    /// units. The running maximum starts at the first cumulative value.
    pub fn calculate_max_drawdown(pnls: &[f64]) -> f64 {
        let mut cumulative = 0.0;
        let mut peak = f64::NEG_INFINITY;
        let mut max_drawdown = 0.0_f64;

        for pnl in pnls {
            cumulative += pnl;
            peak = peak.max(cumulative);
            max_drawdown = max_drawdown.min(cumulative - peak);
        }

        max_drawdown
    }
}

impl Default for PerformanceAnalyzer {
    fn default() -> Self {
        Self::new(50, 5)
    }
}
