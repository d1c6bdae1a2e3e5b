//! Market-condition bucketing of trade outcomes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::outcome::{keys, TradeOutcome};
use super::parameters::{ConditionWeights, OptimalConditions};
use crate::utils::helpers::mean;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolatilityLevel {
    High,
    Medium,
    Low,
}

impl FromStr for VolatilityLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendStrength {
    StrongBullish,
    StrongBearish,
    Weak,
}

impl TrendStrength {
    pub fn is_strong(&self) -> bool {
        matches!(self, Self::StrongBullish | Self::StrongBearish)
    }
}

impl FromStr for TrendStrength {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRONG_BULLISH" => Ok(Self::StrongBullish),
            "STRONG_BEARISH" => Ok(Self::StrongBearish),
            "WEAK" => Ok(Self::Weak),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeLevel {
    High,
    Normal,
    Low,
}

impl VolumeLevel {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio > 1.5 {
            Self::High
        } else if ratio > 0.8 {
            Self::Normal
        } else {
            Self::Low
        }
    }
}

/// Percentage returns grouped by the conditions they were taken under.
///
/// Unrecognised volatility or trend labels leave the outcome out of that
/// grouping; a missing label falls back to MEDIUM / WEAK, a missing volume
/// ratio to 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionBuckets {
    pub volatility: BTreeMap<VolatilityLevel, Vec<f64>>,
    pub trend: BTreeMap<TrendStrength, Vec<f64>>,
    pub volume: BTreeMap<VolumeLevel, Vec<f64>>,
}

impl ConditionBuckets {
    pub fn from_outcomes(outcomes: &[TradeOutcome]) -> Self {
        let mut buckets = Self {
            volatility: [VolatilityLevel::High, VolatilityLevel::Medium, VolatilityLevel::Low]
                .into_iter()
                .map(|level| (level, Vec::new()))
                .collect(),
            trend: [TrendStrength::StrongBullish, TrendStrength::StrongBearish, TrendStrength::Weak]
                .into_iter()
                .map(|level| (level, Vec::new()))
                .collect(),
            volume: [VolumeLevel::High, VolumeLevel::Normal, VolumeLevel::Low]
                .into_iter()
                .map(|level| (level, Vec::new()))
                .collect(),
        };

        for outcome in outcomes {
            let conditions = &outcome.market_conditions;
            let ret = outcome.pnl_percentage;

            if let Ok(level) = conditions.text_or(keys::VOLATILITY_LEVEL, "MEDIUM").parse::<VolatilityLevel>() {
                buckets.volatility.entry(level).or_default().push(ret);
            }
            if let Ok(level) = conditions.text_or(keys::TREND_STRENGTH, "WEAK").parse::<TrendStrength>() {
                buckets.trend.entry(level).or_default().push(ret);
            }
            let ratio = conditions.number_or(keys::VOLUME_RATIO, 1.0);
            buckets.volume.entry(VolumeLevel::from_ratio(ratio)).or_default().push(ret);
        }

        buckets
    }

    /// Mean return per bucket, 0 for empty buckets
    pub fn volatility_mean(&self, level: VolatilityLevel) -> f64 {
        self.volatility.get(&level).map(|v| mean(v)).unwrap_or(0.0)
    }

    pub fn trend_mean(&self, level: TrendStrength) -> f64 {
        self.trend.get(&level).map(|v| mean(v)).unwrap_or(0.0)
    }

    pub fn volume_mean(&self, level: VolumeLevel) -> f64 {
        self.volume.get(&level).map(|v| mean(v)).unwrap_or(0.0)
    }

    /// Bucket with the highest mean return; ties resolve to the first key
    pub fn best_volatility(&self) -> Option<VolatilityLevel> {
        best_of(&self.volatility)
    }

    pub fn best_trend(&self) -> Option<TrendStrength> {
        best_of(&self.trend)
    }

    pub fn best_volume(&self) -> Option<VolumeLevel> {
        best_of(&self.volume)
    }
}

fn best_of<K: Copy + Ord>(map: &BTreeMap<K, Vec<f64>>) -> Option<K> {
    let mut best: Option<(K, f64)> = None;
    for (key, values) in map {
        let score = mean(values);
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((*key, score));
        }
    }
    best.map(|(key, _)| key)
}

/// Return statistics of one bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    pub avg_pnl: f64,
    pub win_rate: f64,
    pub trade_count: usize,
    pub best_trade: f64,
    pub worst_trade: f64,
}

impl BucketStats {
    pub fn from_returns(returns: &[f64]) -> Self {
        if returns.is_empty() {
            return Self::default();
        }
        let wins = returns.iter().filter(|r| **r > 0.0).count();
        Self {
            avg_pnl: mean(returns),
            win_rate: wins as f64 / returns.len() as f64,
            trade_count: returns.len(),
            best_trade: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            worst_trade: returns.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }
}

/// Per-condition breakdown of recent performance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAnalysis {
    /// Number of outcomes analysed
    pub analysis_period: usize,
    pub volatility_performance: BTreeMap<VolatilityLevel, BucketStats>,
    pub trend_performance: BTreeMap<TrendStrength, BucketStats>,
    pub volume_performance: BTreeMap<VolumeLevel, BucketStats>,
    pub current_weights: ConditionWeights,
    pub optimal_conditions: OptimalConditions,
}

impl MarketAnalysis {
    pub fn new(
        outcomes: &[TradeOutcome],
        current_weights: ConditionWeights,
        optimal_conditions: OptimalConditions,
    ) -> Self {
        let buckets = ConditionBuckets::from_outcomes(outcomes);
        Self {
            analysis_period: outcomes.len(),
            volatility_performance: stats_of(&buckets.volatility),
            trend_performance: stats_of(&buckets.trend),
            volume_performance: stats_of(&buckets.volume),
            current_weights,
            optimal_conditions,
        }
    }
}

fn stats_of<K: Copy + Ord>(map: &BTreeMap<K, Vec<f64>>) -> BTreeMap<K, BucketStats> {
    map.iter()
        .map(|(key, returns)| (*key, BucketStats::from_returns(returns)))
        .collect()
}
