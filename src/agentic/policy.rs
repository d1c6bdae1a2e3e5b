//! Adaptive Trade Policy
//!
//! Accepts or rejects trading signals and learns from realized outcomes:
//! - Confidence threshold tuned from rolling win rate and profit factor
//! - Condition weights tuned from per-bucket returns
//! - Optimal volatility / volume ranges re-estimated from winners
//! - Learned filters with a defensive mode after poor performance

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use super::conditions::{ConditionBuckets, MarketAnalysis, TrendStrength, VolatilityLevel};
use super::outcome::{keys, MarketConditions, TradeOutcome};
use super::parameters::PolicyState;
use super::performance::{LearningMetrics, MetricsSnapshot, PerformanceAnalyzer};
use crate::config::PolicyConfig;
use crate::error::PolicyError;
use crate::utils::helpers::{current_timestamp_millis, mean, percentile, population_std_dev};

/// Auto-adjustment keeps the threshold inside this band
const AUTO_THRESHOLD_MIN: f64 = 0.5;
const AUTO_THRESHOLD_MAX: f64 = 0.8;
/// Manual overrides are accepted inside this band
const MANUAL_THRESHOLD_MIN: f64 = 0.1;
const MANUAL_THRESHOLD_MAX: f64 = 0.9;

const WIN_RATE_HIGH: f64 = 0.65;
const WIN_RATE_LOW: f64 = 0.45;
const WIN_RATE_STEP: f64 = 0.05;
const PROFIT_FACTOR_FLOOR: f64 = 1.2;
const PROFIT_FACTOR_STEP: f64 = 0.02;
const WEIGHT_STEP: f64 = 0.1;

const FINAL_SCORE_MIN: f64 = 0.65;
const TREND_CHANGE: f64 = 0.05;

/// Why a signal was accepted or rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    ConfidenceBelowThreshold,
    VolatilityTooHigh,
    VolatilityTooLow,
    InsufficientVolume,
    DefensiveFilter,
    FavorableConditions,
    InsufficientFinalScore,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ConfidenceBelowThreshold => "confidence below threshold",
            Self::VolatilityTooHigh => "volatility too high",
            Self::VolatilityTooLow => "volatility too low",
            Self::InsufficientVolume => "insufficient volume",
            Self::DefensiveFilter => "defensive filter: recent performance poor",
            Self::FavorableConditions => "favorable conditions",
            Self::InsufficientFinalScore => "final score insufficient",
        };
        f.write_str(text)
    }
}

/// Result of evaluating one signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub should_trade: bool,
    pub reason: DecisionReason,
    /// Human-readable explanation
    pub message: String,
    pub signal_confidence: f64,
    pub confidence_threshold: f64,
    /// Absent when rejected on confidence alone
    pub market_score: Option<f64>,
    /// Present only when every filter passed
    pub final_score: Option<f64>,
}

/// Direction of win rate between the last two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceTrend {
    #[serde(rename = "mejorando")]
    Improving,
    #[serde(rename = "empeorando")]
    Declining,
    #[serde(rename = "estable")]
    Stable,
}

impl fmt::Display for PerformanceTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Improving => write!(f, "mejorando"),
            Self::Declining => write!(f, "empeorando"),
            Self::Stable => write!(f, "estable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStatus {
    pub total_lifetime_trades: usize,
    pub performance_updates: usize,
    pub performance_trend: PerformanceTrend,
    pub learning_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Latest metrics, absent until the first adjustment
    pub current_performance: Option<LearningMetrics>,
    pub learning_parameters: PolicyState,
    pub learning_status: LearningStatus,
}

/// Parameters plus the fixed learning settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningParameters {
    pub state: PolicyState,
    pub learning_rate: f64,
    pub min_trades_for_learning: usize,
    pub total_performance_updates: usize,
}

/// What one adjustment pass changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentReport {
    pub metrics: LearningMetrics,
    pub threshold_before: f64,
    pub threshold_after: f64,
    pub parameters: PolicyState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningReset {
    pub trades_removed: usize,
    pub performance_records_removed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationKind {
    Conservative,
    Aggressive,
    RiskManagement,
    PositionSizing,
    Opportunity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub message: String,
    pub action: String,
}

impl Recommendation {
    fn new(kind: RecommendationKind, message: &str, action: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
            action: action.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationReport {
    pub confidence_threshold: f64,
    pub total_trades: usize,
    pub learning_active: bool,
    pub recommendations: Vec<Recommendation>,
    /// Outcomes to record before the next adjustment pass
    pub trades_until_next_adjustment: Option<usize>,
}

/// Outcome-driven trade acceptance policy
#[derive(Debug, Clone)]
pub struct AdaptivePolicy {
    config: PolicyConfig,
    state: PolicyState,
    analyzer: PerformanceAnalyzer,
    /// Every recorded outcome, oldest first
    outcomes: Vec<TradeOutcome>,
    /// One snapshot per adjustment pass
    history: Vec<MetricsSnapshot>,
}

impl AdaptivePolicy {
    pub fn new() -> Self {
        Self::with_config(&PolicyConfig::default())
    }

    /// Zero intervals and windows are raised to 1
    pub fn with_config(config: &PolicyConfig) -> Self {
        info!(
            "Adaptive policy initialized (threshold {:.3})",
            config.confidence_threshold
        );
        let config = PolicyConfig {
            adjustment_interval: config.adjustment_interval.max(1),
            metrics_window: config.metrics_window.max(1),
            conditions_window: config.conditions_window.max(1),
            ..config.clone()
        };
        Self {
            state: PolicyState::with_threshold(config.confidence_threshold),
            analyzer: PerformanceAnalyzer::new(config.metrics_window, config.min_trades_for_learning),
            config,
            outcomes: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Record a closed trade. Every `adjustment_interval` outcomes the
    /// adjustment pipeline runs; its report is returned when it produced
    /// metrics.
    pub fn record_outcome(&mut self, outcome: TradeOutcome) -> Option<AdjustmentReport> {
        info!(
            "Trade recorded: {} P&L {:.2} ({:.2}%)",
            outcome.symbol, outcome.pnl, outcome.pnl_percentage
        );
        self.outcomes.push(outcome);

        if self.outcomes.len() % self.config.adjustment_interval == 0 {
            self.run_adjustment()
        } else {
            None
        }
    }

    fn run_adjustment(&mut self) -> Option<AdjustmentReport> {
        let metrics = self.analyzer.analyze(&self.outcomes)?;

        self.history.push(MetricsSnapshot {
            timestamp: current_timestamp_millis(),
            metrics: metrics.clone(),
            total_lifetime_trades: self.outcomes.len(),
            parameters: self.state.clone(),
        });
        info!(
            "Metrics updated: win rate {:.2}%, avg P&L {:.2}, Sharpe {:.2}, profit factor {}",
            metrics.win_rate * 100.0,
            metrics.avg_pnl,
            metrics.sharpe_ratio,
            metrics.profit_factor
        );

        let threshold_before = self.state.confidence_threshold;
        self.adjust_threshold(&metrics);
        self.reweight_conditions();
        self.update_optimal_conditions();

        Some(AdjustmentReport {
            metrics,
            threshold_before,
            threshold_after: self.state.confidence_threshold,
            parameters: self.state.clone(),
        })
    }

    fn adjust_threshold(&mut self, metrics: &LearningMetrics) {
        let old = self.state.confidence_threshold;
        let mut threshold = old;

        if metrics.win_rate > WIN_RATE_HIGH {
            threshold = AUTO_THRESHOLD_MIN.max(threshold - WIN_RATE_STEP);
        } else if metrics.win_rate < WIN_RATE_LOW {
            threshold = AUTO_THRESHOLD_MAX.min(threshold + WIN_RATE_STEP);
        }

        if metrics.profit_factor.is_below(PROFIT_FACTOR_FLOOR) {
            threshold = AUTO_THRESHOLD_MAX.min(threshold + PROFIT_FACTOR_STEP);
        }

        if threshold != old {
            info!("Confidence threshold adjusted: {:.3} -> {:.3}", old, threshold);
        }
        self.state.confidence_threshold = threshold;
    }

    fn reweight_conditions(&mut self) {
        if self.outcomes.len() < self.config.min_trades_for_conditions {
            return;
        }

        let buckets = ConditionBuckets::from_outcomes(self.recent_outcomes(self.config.conditions_window));
        debug!(
            "Best conditions: volatility {:?}, trend {:?}, volume {:?}",
            buckets.best_volatility(),
            buckets.best_trend(),
            buckets.best_volume()
        );

        let weights = &mut self.state.market_conditions_weights;
        if buckets.volatility_mean(VolatilityLevel::High) > buckets.volatility_mean(VolatilityLevel::Low) {
            weights.bump_volatility(WEIGHT_STEP);
        }
        if buckets.trend_mean(TrendStrength::StrongBullish) > buckets.trend_mean(TrendStrength::Weak) {
            weights.bump_trend_strength(WEIGHT_STEP);
        }
    }

    fn update_optimal_conditions(&mut self) {
        if self.outcomes.len() < self.config.optimal_conditions_min_trades {
            return;
        }

        let winners = self
            .recent_outcomes(self.config.metrics_window)
            .iter()
            .filter(|t| t.is_winner());

        let mut volatilities = Vec::new();
        let mut volume_ratios = Vec::new();
        for trade in winners {
            let conditions = &trade.market_conditions;
            if let Some(vol) = conditions.number(keys::VOLATILITY_VALUE).filter(|v| *v > 0.0) {
                volatilities.push(vol);
            }
            if let Some(ratio) = conditions.number(keys::VOLUME_RATIO).filter(|v| *v > 0.0) {
                volume_ratios.push(ratio);
            }
        }

        let optimal = &mut self.state.optimal_conditions;
        if !volatilities.is_empty() {
            let vol_mean = mean(&volatilities);
            let vol_std = population_std_dev(&volatilities);
            optimal.volatility_range = ((vol_mean - vol_std).max(0.5), vol_mean + vol_std);
        }
        if !volume_ratios.is_empty() {
            optimal.volume_ratio_min = percentile(&volume_ratios, 25.0);
        }

        info!(
            "Optimal conditions updated: volatility {:.3}-{:.3}, volume ratio >= {:.3}",
            optimal.volatility_range.0, optimal.volatility_range.1, optimal.volume_ratio_min
        );
    }

    /// Decide whether a signal should be traded
    pub fn should_trade(&self, conditions: &MarketConditions, signal_confidence: f64) -> Decision {
        let threshold = self.state.confidence_threshold;

        if signal_confidence.is_nan() || signal_confidence < threshold {
            return Decision {
                should_trade: false,
                reason: DecisionReason::ConfidenceBelowThreshold,
                message: format!(
                    "confidence {:.3} below threshold {:.3}",
                    signal_confidence, threshold
                ),
                signal_confidence,
                confidence_threshold: threshold,
                market_score: None,
                final_score: None,
            };
        }

        let market_score = self.evaluate_market_conditions(conditions);

        if let Err(reason) = self.apply_learned_filters(conditions) {
            debug!("Signal filtered: {}", reason);
            return Decision {
                should_trade: false,
                reason,
                message: format!("market filter: {}", reason),
                signal_confidence,
                confidence_threshold: threshold,
                market_score: Some(market_score),
                final_score: None,
            };
        }

        let final_score = signal_confidence * 0.7 + market_score * 0.3;
        let should_trade = final_score > FINAL_SCORE_MIN;
        let reason = if should_trade {
            DecisionReason::FavorableConditions
        } else {
            DecisionReason::InsufficientFinalScore
        };

        debug!(
            "Decision: {} (final {:.3}, confidence {:.3}, market {:.3})",
            should_trade, final_score, signal_confidence, market_score
        );

        Decision {
            should_trade,
            reason,
            message: format!("{}: final score {:.3}", reason, final_score),
            signal_confidence,
            confidence_threshold: threshold,
            market_score: Some(market_score),
            final_score: Some(final_score),
        }
    }

    /// Market score in [0.5, 1.0]
    pub fn evaluate_market_conditions(&self, conditions: &MarketConditions) -> f64 {
        let weights = &self.state.market_conditions_weights;
        let optimal = &self.state.optimal_conditions;
        let mut score = 0.5;

        let volatility = conditions.number_or(keys::VOLATILITY_VALUE, 2.0);
        if optimal.volatility_in_range(volatility) {
            score += 0.15 * weights.volatility;
        }

        let volume_ratio = conditions.number_or(keys::VOLUME_RATIO, 1.0);
        if volume_ratio >= optimal.volume_ratio_min {
            score += 0.10 * weights.volume_ratio;
        }

        let trend = conditions.text_or(keys::TREND_STRENGTH, "WEAK");
        if trend.parse::<TrendStrength>().map_or(false, |t| t.is_strong()) {
            score += 0.20 * weights.trend_strength;
        }

        let rsi = conditions.number_or(keys::RSI, 50.0);
        if (30.0..=70.0).contains(&rsi) {
            score += 0.05 * weights.rsi_level;
        }

        score.min(1.0)
    }

    fn apply_learned_filters(&self, conditions: &MarketConditions) -> Result<(), DecisionReason> {
        let volatility = conditions.number_or(keys::VOLATILITY_VALUE, 2.0);
        if volatility > 5.0 {
            return Err(DecisionReason::VolatilityTooHigh);
        }
        if volatility < 0.5 {
            return Err(DecisionReason::VolatilityTooLow);
        }

        let volume_ratio = conditions.number_or(keys::VOLUME_RATIO, 1.0);
        if volume_ratio < 0.5 {
            return Err(DecisionReason::InsufficientVolume);
        }

        if let Some(latest) = self.latest_metrics() {
            let poor = latest.win_rate < 0.3 && latest.profit_factor.is_below(0.8);
            if poor && (volatility < 1.0 || volume_ratio < 1.0) {
                return Err(DecisionReason::DefensiveFilter);
            }
        }

        Ok(())
    }

    /// Manually override the confidence threshold; returns the previous one
    pub fn set_confidence_threshold(&mut self, threshold: f64) -> Result<f64, PolicyError> {
        if !(MANUAL_THRESHOLD_MIN..=MANUAL_THRESHOLD_MAX).contains(&threshold) {
            return Err(PolicyError::ThresholdOutOfRange(threshold));
        }
        let old = self.state.confidence_threshold;
        self.state.confidence_threshold = threshold;
        info!("Confidence threshold set manually: {:.3} -> {:.3}", old, threshold);
        Ok(old)
    }

    /// Drop all outcomes and history and restore the initial parameters
    pub fn reset_learning(&mut self) -> LearningReset {
        let report = LearningReset {
            trades_removed: self.outcomes.len(),
            performance_records_removed: self.history.len(),
        };
        self.outcomes.clear();
        self.history.clear();
        self.state = PolicyState::with_threshold(self.config.confidence_threshold);
        info!(
            "Learning data reset ({} outcomes, {} snapshots removed)",
            report.trades_removed, report.performance_records_removed
        );
        report
    }

    pub fn get_performance_summary(&self) -> PerformanceSummary {
        PerformanceSummary {
            current_performance: self.latest_metrics().cloned(),
            learning_parameters: self.state.clone(),
            learning_status: LearningStatus {
                total_lifetime_trades: self.outcomes.len(),
                performance_updates: self.history.len(),
                performance_trend: self.performance_trend(),
                learning_active: self.is_learning_active(),
            },
        }
    }

    pub fn performance_trend(&self) -> PerformanceTrend {
        match self.history.as_slice() {
            [.., previous, latest] => {
                let prev = previous.metrics.win_rate;
                let curr = latest.metrics.win_rate;
                if curr > prev + TREND_CHANGE {
                    PerformanceTrend::Improving
                } else if curr < prev - TREND_CHANGE {
                    PerformanceTrend::Declining
                } else {
                    PerformanceTrend::Stable
                }
            }
            _ => PerformanceTrend::Stable,
        }
    }

    /// Needs at least `min_trades_for_conditions` outcomes
    pub fn market_analysis(&self) -> Option<MarketAnalysis> {
        if self.outcomes.len() < self.config.min_trades_for_conditions {
            return None;
        }
        Some(MarketAnalysis::new(
            self.recent_outcomes(self.config.conditions_window),
            self.state.market_conditions_weights.clone(),
            self.state.optimal_conditions.clone(),
        ))
    }

    pub fn recommendations(&self) -> RecommendationReport {
        let learning_active = self.is_learning_active();
        let mut recommendations = Vec::new();

        if learning_active {
            if let Some(latest) = self.latest_metrics() {
                if latest.win_rate < 0.4 {
                    recommendations.push(Recommendation::new(
                        RecommendationKind::Conservative,
                        "Low win rate, be more selective with entries",
                        "Raise the confidence threshold",
                    ));
                } else if latest.win_rate > 0.7 {
                    recommendations.push(Recommendation::new(
                        RecommendationKind::Aggressive,
                        "Excellent win rate, entries can be less conservative",
                        "Lower the confidence threshold gradually",
                    ));
                }

                if latest.profit_factor.is_below(1.0) {
                    recommendations.push(Recommendation::new(
                        RecommendationKind::RiskManagement,
                        "Losses outweigh profits, review stop-loss placement",
                        "Tighten stop losses",
                    ));
                }

                if latest.max_drawdown < -500.0 {
                    recommendations.push(Recommendation::new(
                        RecommendationKind::PositionSizing,
                        "Significant drawdown, consider smaller positions",
                        "Reduce position sizing",
                    ));
                }
            }

            if self.state.confidence_threshold > 0.75 {
                recommendations.push(Recommendation::new(
                    RecommendationKind::Opportunity,
                    "A very conservative threshold may be missing opportunities",
                    "Evaluate lowering the threshold gradually",
                ));
            }
        }

        let interval = self.config.adjustment_interval;
        RecommendationReport {
            confidence_threshold: self.state.confidence_threshold,
            total_trades: self.outcomes.len(),
            learning_active,
            recommendations,
            trades_until_next_adjustment: learning_active
                .then(|| interval - self.outcomes.len() % interval),
        }
    }

    pub fn parameters(&self) -> LearningParameters {
        LearningParameters {
            state: self.state.clone(),
            learning_rate: self.config.learning_rate,
            min_trades_for_learning: self.config.min_trades_for_learning,
            total_performance_updates: self.history.len(),
        }
    }

    pub fn is_learning_active(&self) -> bool {
        self.outcomes.len() >= self.config.min_trades_for_learning
    }

    /// The last `n` outcomes, oldest first
    pub fn recent_outcomes(&self, n: usize) -> &[TradeOutcome] {
        &self.outcomes[self.outcomes.len().saturating_sub(n)..]
    }

    pub fn outcomes(&self) -> &[TradeOutcome] {
        &self.outcomes
    }

    pub fn history(&self) -> &[MetricsSnapshot] {
        &self.history
    }

    pub fn latest_metrics(&self) -> Option<&LearningMetrics> {
        self.history.last().map(|s| &s.metrics)
    }

    pub fn state(&self) -> &PolicyState {
        &self.state
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.state.confidence_threshold
    }
}

impl Default for AdaptivePolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::types::{ProfitFactor, Side};

    const EPS: f64 = 1e-9;

    fn outcome(pnl: f64, conditions: MarketConditions) -> TradeOutcome {
        TradeOutcome {
            trade_id: "t".to_string(),
            symbol: "BTCUSDT".to_string(),
            side: Side::Buy,
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            quantity: 1.0,
            pnl,
            pnl_percentage: pnl,
            hold_time_minutes: 60,
            market_conditions: conditions,
            decision_confidence: 0.7,
            timestamp: 0,
        }
    }

    fn record_all(policy: &mut AdaptivePolicy, pnls: &[f64]) {
        for pnl in pnls {
            policy.record_outcome(outcome(*pnl, MarketConditions::new()));
        }
    }

    #[test]
    fn test_rejects_low_confidence() {
        let policy = AdaptivePolicy::new();
        let decision = policy.should_trade(&MarketConditions::new(), 0.5);

        assert!(!decision.should_trade);
        assert_eq!(decision.reason, DecisionReason::ConfidenceBelowThreshold);
        assert_eq!(decision.reason.to_string(), "confidence below threshold");
        assert_eq!(decision.confidence_threshold, 0.6);
        assert_eq!(decision.signal_confidence, 0.5);
        assert!(decision.final_score.is_none());
    }

    #[test]
    fn test_nan_confidence_is_rejected() {
        let policy = AdaptivePolicy::new();
        let decision = policy.should_trade(&MarketConditions::new(), f64::NAN);
        assert_eq!(decision.reason, DecisionReason::ConfidenceBelowThreshold);
    }

    #[test]
    fn test_default_market_score() {
        // Defaults: volatility 2.0 in (1,3), volume 1.0 < 1.2, trend WEAK, rsi 50
        let policy = AdaptivePolicy::new();
        let score = policy.evaluate_market_conditions(&MarketConditions::new());
        assert!((score - 0.7).abs() < EPS);
    }

    #[test]
    fn test_market_score_is_clamped() {
        let mut policy = AdaptivePolicy::new();
        policy.state.market_conditions_weights.trend_strength = 2.0;
        policy.state.market_conditions_weights.volatility = 2.0;
        let conditions = MarketConditions::new()
            .with(keys::VOLUME_RATIO, 2.0)
            .with(keys::TREND_STRENGTH, "STRONG_BEARISH");
        assert_eq!(policy.evaluate_market_conditions(&conditions), 1.0);
    }

    #[test]
    fn test_accepts_strong_signal() {
        let policy = AdaptivePolicy::new();
        let decision = policy.should_trade(&MarketConditions::new(), 0.7);
        // 0.7 * 0.7 + 0.7 * 0.3 = 0.7
        assert!(decision.should_trade);
        assert_eq!(decision.reason, DecisionReason::FavorableConditions);
        assert!((decision.final_score.unwrap() - 0.7).abs() < EPS);
    }

    #[test]
    fn test_final_score_boundary_rejects() {
        let policy = AdaptivePolicy::new();
        // 0.6 * 0.7 + 0.7 * 0.3 = 0.63
        let decision = policy.should_trade(&MarketConditions::new(), 0.6);
        assert!(!decision.should_trade);
        assert_eq!(decision.reason, DecisionReason::InsufficientFinalScore);
    }

    #[test]
    fn test_learned_filters_in_order() {
        let policy = AdaptivePolicy::new();
        let high = MarketConditions::new()
            .with(keys::VOLATILITY_VALUE, 6.0)
            .with(keys::VOLUME_RATIO, 0.1);
        assert_eq!(policy.should_trade(&high, 0.9).reason, DecisionReason::VolatilityTooHigh);

        let low = MarketConditions::new().with(keys::VOLATILITY_VALUE, 0.4);
        assert_eq!(policy.should_trade(&low, 0.9).reason, DecisionReason::VolatilityTooLow);

        let thin = MarketConditions::new().with(keys::VOLUME_RATIO, 0.3);
        let decision = policy.should_trade(&thin, 0.9);
        assert_eq!(decision.reason, DecisionReason::InsufficientVolume);
        assert!(decision.market_score.is_some());
        assert!(decision.final_score.is_none());
    }

    #[test]
    fn test_defensive_filter_after_poor_performance() {
        let mut policy = AdaptivePolicy::new();
        record_all(&mut policy, &[-10.0, -10.0, -10.0, -10.0, 1.0]);
        let latest = policy.latest_metrics().unwrap();
        assert!(latest.win_rate < 0.3);
        assert!(latest.profit_factor.is_below(0.8));

        let cautious = MarketConditions::new().with(keys::VOLUME_RATIO, 0.9);
        let decision = policy.should_trade(&cautious, 0.9);
        assert_eq!(decision.reason, DecisionReason::DefensiveFilter);

        let strong = MarketConditions::new()
            .with(keys::VOLUME_RATIO, 1.5)
            .with(keys::VOLATILITY_VALUE, 2.0);
        assert_ne!(policy.should_trade(&strong, 0.9).reason, DecisionReason::DefensiveFilter);
    }

    #[test]
    fn test_adjustment_runs_every_five_outcomes() {
        let mut policy = AdaptivePolicy::new();
        for i in 0..4 {
            assert!(policy.record_outcome(outcome(1.0, MarketConditions::new())).is_none(), "{i}");
        }
        let report = policy.record_outcome(outcome(1.0, MarketConditions::new())).unwrap();
        assert_eq!(report.metrics.total_trades, 5);
        assert_eq!(policy.history().len(), 1);
        assert_eq!(policy.history()[0].parameters.confidence_threshold, 0.6);
    }

    #[test]
    fn test_high_win_rate_lowers_threshold_once() {
        let mut policy = AdaptivePolicy::new();
        record_all(&mut policy, &[5.0, 5.0, 5.0, 5.0, -1.0]);

        let latest = policy.latest_metrics().unwrap();
        assert!((latest.win_rate - 0.8).abs() < EPS);
        assert_eq!(latest.profit_factor, ProfitFactor::Finite(20.0));
        assert!((policy.confidence_threshold() - 0.55).abs() < EPS);
    }

    #[test]
    fn test_threshold_floor_and_ceiling() {
        let mut policy = AdaptivePolicy::new();
        for _ in 0..5 {
            record_all(&mut policy, &[5.0; 5]);
        }
        assert!((policy.confidence_threshold() - 0.5).abs() < EPS);

        let mut policy = AdaptivePolicy::new();
        for _ in 0..10 {
            record_all(&mut policy, &[-5.0; 5]);
        }
        assert!((policy.confidence_threshold() - 0.8).abs() < EPS);
    }

    #[test]
    fn test_low_profit_factor_adds_small_step() {
        let mut policy = AdaptivePolicy::new();
        // win rate 0.6: no win-rate rule, profit factor 3/4 < 1.2
        record_all(&mut policy, &[1.0, 1.0, 1.0, -2.0, -2.0]);
        assert!((policy.confidence_threshold() - 0.62).abs() < EPS);
    }

    #[test]
    fn test_zero_adjustment_interval_adjusts_every_outcome() {
        let mut policy = AdaptivePolicy::with_config(&PolicyConfig {
            adjustment_interval: 0,
            metrics_window: 0,
            conditions_window: 0,
            ..PolicyConfig::default()
        });

        for _ in 0..4 {
            assert!(policy.record_outcome(outcome(5.0, MarketConditions::new())).is_none());
        }
        assert!(policy.record_outcome(outcome(5.0, MarketConditions::new())).is_some());
        assert!(policy.record_outcome(outcome(5.0, MarketConditions::new())).is_some());
        assert_eq!(policy.history().len(), 2);
        assert_eq!(policy.recommendations().trades_until_next_adjustment, Some(1));
    }

    #[test]
    fn test_tie_at_win_rate_boundary_makes_no_change() {
        let mut policy = AdaptivePolicy::with_config(&PolicyConfig {
            adjustment_interval: 20,
            min_trades_for_conditions: usize::MAX,
            optimal_conditions_min_trades: usize::MAX,
            ..PolicyConfig::default()
        });
        // 13 winners of 20 = 0.65 exactly, profit factor well above 1.2
        let mut pnls = vec![10.0; 13];
        pnls.extend(vec![-1.0; 7]);
        record_all(&mut policy, &pnls);
        assert!((policy.latest_metrics().unwrap().win_rate - 0.65).abs() < EPS);
        assert_eq!(policy.confidence_threshold(), 0.6);
    }

    #[test]
    fn test_condition_reweighting() {
        let mut policy = AdaptivePolicy::new();
        let high = MarketConditions::new()
            .with(keys::VOLATILITY_LEVEL, "HIGH")
            .with(keys::TREND_STRENGTH, "STRONG_BULLISH");
        let low = MarketConditions::new().with(keys::VOLATILITY_LEVEL, "LOW");

        for _ in 0..5 {
            policy.record_outcome(outcome(3.0, high.clone()));
            policy.record_outcome(outcome(-1.0, low.clone()));
        }

        // Only the pass at 10 outcomes re-weights
        let weights = &policy.state().market_conditions_weights;
        assert!((weights.volatility - 1.1).abs() < EPS);
        assert!((weights.trend_strength - 1.1).abs() < EPS);
        assert_eq!(weights.volume_ratio, 1.0);
    }

    #[test]
    fn test_optimal_conditions_from_winners() {
        let mut policy = AdaptivePolicy::new();
        for i in 0..20 {
            let vol = if i % 2 == 0 { 1.0 } else { 3.0 };
            let conditions = MarketConditions::new()
                .with(keys::VOLATILITY_VALUE, vol)
                .with(keys::VOLUME_RATIO, 1.0 + (i % 4) as f64);
            policy.record_outcome(outcome(2.0, conditions));
        }

        let optimal = &policy.state().optimal_conditions;
        // mean 2, population std 1
        assert!((optimal.volatility_range.0 - 1.0).abs() < EPS);
        assert!((optimal.volatility_range.1 - 3.0).abs() < EPS);
        // ratios 1,2,3,4 repeated five times
        assert!((optimal.volume_ratio_min - 1.75).abs() < EPS);
    }

    #[test]
    fn test_volatility_range_floor() {
        let mut policy = AdaptivePolicy::new();
        for i in 0..20 {
            let vol = if i % 2 == 0 { 0.2 } else { 1.0 };
            let conditions = MarketConditions::new().with(keys::VOLATILITY_VALUE, vol);
            policy.record_outcome(outcome(2.0, conditions));
        }
        let optimal = &policy.state().optimal_conditions;
        assert_eq!(optimal.volatility_range.0, 0.5);
        assert!((optimal.volatility_range.1 - 1.0).abs() < EPS);
        assert_eq!(optimal.volume_ratio_min, 1.2);
    }

    #[test]
    fn test_manual_threshold_bounds() {
        let mut policy = AdaptivePolicy::new();
        assert_eq!(policy.set_confidence_threshold(0.3), Ok(0.6));
        assert_eq!(policy.confidence_threshold(), 0.3);
        assert_eq!(
            policy.set_confidence_threshold(0.95),
            Err(PolicyError::ThresholdOutOfRange(0.95))
        );
        assert_eq!(policy.confidence_threshold(), 0.3);
    }

    #[test]
    fn test_performance_summary_and_trend() {
        let mut policy = AdaptivePolicy::new();
        let summary = policy.get_performance_summary();
        assert!(summary.current_performance.is_none());
        assert!(!summary.learning_status.learning_active);
        assert_eq!(summary.learning_status.performance_trend, PerformanceTrend::Stable);

        record_all(&mut policy, &[-1.0, -1.0, -1.0, 1.0, 1.0]);
        record_all(&mut policy, &[1.0, 1.0, 1.0, 1.0, 1.0]);
        let summary = policy.get_performance_summary();
        assert_eq!(summary.learning_status.performance_updates, 2);
        assert_eq!(summary.learning_status.performance_trend, PerformanceTrend::Improving);
        assert_eq!(summary.current_performance.unwrap().total_trades, 10);

        let json = serde_json::to_value(policy.get_performance_summary()).unwrap();
        assert_eq!(json["learning_status"]["performance_trend"], "mejorando");
    }

    #[test]
    fn test_declining_trend() {
        let mut policy = AdaptivePolicy::new();
        record_all(&mut policy, &[1.0; 5]);
        record_all(&mut policy, &[-1.0; 5]);
        assert_eq!(policy.performance_trend(), PerformanceTrend::Declining);
    }

    #[test]
    fn test_reset_learning() {
        let mut policy = AdaptivePolicy::new();
        record_all(&mut policy, &[5.0; 5]);
        assert_ne!(policy.confidence_threshold(), 0.6);

        let reset = policy.reset_learning();
        assert_eq!(reset.trades_removed, 5);
        assert_eq!(reset.performance_records_removed, 1);
        assert_eq!(policy.state(), &PolicyState::default());
        assert!(policy.outcomes().is_empty());
    }

    #[test]
    fn test_market_analysis_needs_ten_outcomes() {
        let mut policy = AdaptivePolicy::new();
        record_all(&mut policy, &[1.0; 9]);
        assert!(policy.market_analysis().is_none());
        record_all(&mut policy, &[1.0]);
        assert_eq!(policy.market_analysis().unwrap().analysis_period, 10);
    }

    #[test]
    fn test_recommendations() {
        let mut policy = AdaptivePolicy::new();
        record_all(&mut policy, &[-300.0; 3]);
        let report = policy.recommendations();
        assert!(!report.learning_active);
        assert!(report.recommendations.is_empty());
        assert_eq!(report.trades_until_next_adjustment, None);

        // Snapshot at five outcomes: one winner, deep drawdown
        record_all(&mut policy, &[-300.0, 1.0, 1.0]);
        let report = policy.recommendations();
        assert!(report.learning_active);
        assert_eq!(report.trades_until_next_adjustment, Some(4));
        let kinds: Vec<_> = report.recommendations.iter().map(|r| r.kind).collect();
        assert!(kinds.contains(&RecommendationKind::Conservative));
        assert!(kinds.contains(&RecommendationKind::RiskManagement));
        assert!(kinds.contains(&RecommendationKind::PositionSizing));
    }

    #[test]
    fn test_full_history_is_kept() {
        let mut policy = AdaptivePolicy::new();
        record_all(&mut policy, &[1.0; 120]);
        assert_eq!(policy.outcomes().len(), 120);
        assert_eq!(policy.recent_outcomes(50).len(), 50);
        assert_eq!(policy.latest_metrics().unwrap().total_trades, 50);
        assert_eq!(policy.history().len(), 24);
    }
}
