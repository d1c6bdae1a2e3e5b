//! Agentic Module
//!
//! Outcome-driven learning layer:
//! - Trade outcomes and market-condition snapshots
//! - Rolling performance analysis
//! - Condition bucketing
//! - Adaptive accept/reject policy

pub mod conditions;
pub mod outcome;
pub mod parameters;
pub mod performance;
pub mod policy;

pub use conditions::{BucketStats, MarketAnalysis, TrendStrength, VolatilityLevel, VolumeLevel};
pub use outcome::{keys, ConditionValue, MarketConditions, RoundTrip, TradeOutcome};
pub use parameters::{ConditionWeights, OptimalConditions, PolicyState};
pub use performance::{LearningMetrics, MetricsSnapshot, PerformanceAnalyzer};
pub use policy::{
    AdaptivePolicy, AdjustmentReport, Decision, DecisionReason, LearningParameters,
    LearningReset, PerformanceSummary, PerformanceTrend, Recommendation, RecommendationKind,
    RecommendationReport,
};
