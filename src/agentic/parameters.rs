//! Tunable decision parameters owned by the adaptive policy

use serde::{Deserialize, Serialize};

/// Upper bound for any condition weight
pub const MAX_WEIGHT: f64 = 2.0;

/// Weight applied to each market-condition component of the market score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionWeights {
    pub volatility: f64,
    pub trend_strength: f64,
    pub volume_ratio: f64,
    pub rsi_level: f64,
    pub macd_signal: f64,
}

impl ConditionWeights {
    pub fn bump_volatility(&mut self, step: f64) {
        self.volatility = (self.volatility + step).min(MAX_WEIGHT);
    }

    pub fn bump_trend_strength(&mut self, step: f64) {
        self.trend_strength = (self.trend_strength + step).min(MAX_WEIGHT);
    }
}

impl Default for ConditionWeights {
    fn default() -> Self {
        Self {
            volatility: 1.0,
            trend_strength: 1.0,
            volume_ratio: 1.0,
            rsi_level: 1.0,
            macd_signal: 1.0,
        }
    }
}

/// Condition ranges learned from profitable trades
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimalConditions {
    /// Inclusive (low, high)
    pub volatility_range: (f64, f64),
    pub volume_ratio_min: f64,
    pub trend_strength_min: f64,
}

impl OptimalConditions {
    pub fn volatility_in_range(&self, volatility: f64) -> bool {
        self.volatility_range.0 <= volatility && volatility <= self.volatility_range.1
    }
}

impl Default for OptimalConditions {
    fn default() -> Self {
        Self {
            volatility_range: (1.0, 3.0),
            volume_ratio_min: 1.2,
            trend_strength_min: 0.7,
        }
    }
}

/// Complete parameter set of the policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyState {
    pub confidence_threshold: f64,
    pub market_conditions_weights: ConditionWeights,
    pub optimal_conditions: OptimalConditions,
}

impl PolicyState {
    pub fn with_threshold(confidence_threshold: f64) -> Self {
        Self {
            confidence_threshold,
            market_conditions_weights: ConditionWeights::default(),
            optimal_conditions: OptimalConditions::default(),
        }
    }
}

impl Default for PolicyState {
    fn default() -> Self {
        Self::with_threshold(0.6)
    }
}
