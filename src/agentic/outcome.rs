//! Trade outcomes and the market-condition snapshots attached to them

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::utils::helpers::{current_timestamp_millis, safe_div};
use crate::utils::types::Side;

/// Well-known condition keys
pub mod keys {
    pub const VOLATILITY_VALUE: &str = "volatility_value";
    pub const VOLATILITY_LEVEL: &str = "volatility_level";
    pub const TREND_STRENGTH: &str = "trend_strength";
    pub const VOLUME_RATIO: &str = "volume_ratio";
    pub const RSI: &str = "rsi";
}

/// A single market-condition value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Bool(bool),
    Number(f64),
    Text(String),
    /// Indicator not available for this snapshot
    Null,
}

impl From<bool> for ConditionValue {
    fn from(value: bool) -> Self {
        ConditionValue::Bool(value)
    }
}

impl From<f64> for ConditionValue {
    fn from(value: f64) -> Self {
        ConditionValue::Number(value)
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        ConditionValue::Text(value.to_string())
    }
}

impl From<String> for ConditionValue {
    fn from(value: String) -> Self {
        ConditionValue::Text(value)
    }
}

/// Snapshot of market conditions keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketConditions(BTreeMap<String, ConditionValue>);

impl MarketConditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<ConditionValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<ConditionValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ConditionValue> {
        self.0.get(key)
    }

    /// Numeric value; text, flags and nulls do not count
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(ConditionValue::Number(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn number_or(&self, key: &str, default: f64) -> f64 {
        self.number(key).unwrap_or(default)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(ConditionValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn text_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.text(key).unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<ConditionValue>> FromIterator<(K, V)> for MarketConditions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Realized result of one closed trade, fed back to the policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub trade_id: String,
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub pnl: f64,
    pub pnl_percentage: f64,
    pub hold_time_minutes: u64,
    /// Conditions observed when the trade was decided
    pub market_conditions: MarketConditions,
    pub decision_confidence: f64,
    /// Unix millis
    pub timestamp: i64,
}

/// Inputs of a completed round trip
#[derive(Debug, Clone)]
pub struct RoundTrip {
    pub trade_id: String,
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub hold_time_minutes: u64,
    pub market_conditions: MarketConditions,
    pub decision_confidence: f64,
}

impl TradeOutcome {
    /// Derive pnl from entry/exit: long for BUY, short for SELL
    pub fn from_round_trip(trip: RoundTrip) -> Self {
        let pnl = match trip.side {
            Side::Buy => (trip.exit_price - trip.entry_price) * trip.quantity,
            Side::Sell => (trip.entry_price - trip.exit_price) * trip.quantity,
        };
        let pnl_percentage = safe_div(pnl, trip.entry_price * trip.quantity) * 100.0;

        Self {
            trade_id: trip.trade_id,
            symbol: trip.symbol,
            side: trip.side,
            entry_price: trip.entry_price,
            exit_price: trip.exit_price,
            quantity: trip.quantity,
            pnl,
            pnl_percentage,
            hold_time_minutes: trip.hold_time_minutes,
            market_conditions: trip.market_conditions,
            decision_confidence: trip.decision_confidence,
            timestamp: current_timestamp_millis(),
        }
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
