//! Configuration module
//!
//! Handles loading and validation of the application configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::from_yaml(&content)?;
        info!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .with_context(|| "Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.ledger.initial_balance > 0.0,
            "initial_balance must be positive"
        );
        anyhow::ensure!(
            self.ledger.transaction_fee >= 0.0 && self.ledger.transaction_fee < 0.1,
            "transaction_fee must be between 0 and 0.1"
        );
        anyhow::ensure!(
            self.ledger.slippage >= 0.0 && self.ledger.slippage < 0.1,
            "slippage must be between 0 and 0.1"
        );
        anyhow::ensure!(
            (0.1..=0.9).contains(&self.policy.confidence_threshold),
            "confidence_threshold must be between 0.1 and 0.9"
        );
        anyhow::ensure!(
            self.policy.adjustment_interval > 0,
            "adjustment_interval must be positive"
        );
        anyhow::ensure!(
            self.policy.metrics_window > 0 && self.policy.conditions_window > 0,
            "analysis windows must be positive"
        );
        anyhow::ensure!(
            self.simulation.tick_interval_ms > 0,
            "tick_interval_ms must be positive"
        );
        anyhow::ensure!(
            self.simulation.order_notional > 0.0,
            "order_notional must be positive"
        );
        Ok(())
    }
}

/// Paper ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_initial_balance")]
    pub initial_balance: f64,
    /// Fee charged on every fill, as a fraction of notional
    #[serde(default = "default_transaction_fee")]
    pub transaction_fee: f64,
    /// Market order slippage, as a fraction of the quoted price
    #[serde(default = "default_slippage")]
    pub slippage: f64,
}

pub fn default_initial_balance() -> f64 { 10_000.0 }
pub fn default_transaction_fee() -> f64 { 0.001 }
pub fn default_slippage() -> f64 { 0.0005 }

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_balance: default_initial_balance(),
            transaction_fee: default_transaction_fee(),
            slippage: default_slippage(),
        }
    }
}

/// Adaptive policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Starting confidence threshold
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Outcomes required before any metrics are computed
    #[serde(default = "default_min_trades_for_learning")]
    pub min_trades_for_learning: usize,

    /// Adjustment pipeline runs every N recorded outcomes
    #[serde(default = "default_adjustment_interval")]
    pub adjustment_interval: usize,

    /// Outcomes considered by the performance metrics
    #[serde(default = "default_metrics_window")]
    pub metrics_window: usize,

    /// Outcomes considered by the condition re-weighting
    #[serde(default = "default_conditions_window")]
    pub conditions_window: usize,

    /// Lifetime outcomes before condition re-weighting runs
    #[serde(default = "default_min_trades_for_conditions")]
    pub min_trades_for_conditions: usize,

    /// Lifetime outcomes before optimal conditions are re-estimated
    #[serde(default = "default_optimal_conditions_min_trades")]
    pub optimal_conditions_min_trades: usize,

    /// Reported with the parameters; adjustments use fixed steps
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
}

pub fn default_confidence_threshold() -> f64 { 0.6 }
pub fn default_min_trades_for_learning() -> usize { 5 }
pub fn default_adjustment_interval() -> usize { 5 }
pub fn default_metrics_window() -> usize { 50 }
pub fn default_conditions_window() -> usize { 30 }
pub fn default_min_trades_for_conditions() -> usize { 10 }
pub fn default_optimal_conditions_min_trades() -> usize { 20 }
pub fn default_learning_rate() -> f64 { 0.1 }

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            min_trades_for_learning: default_min_trades_for_learning(),
            adjustment_interval: default_adjustment_interval(),
            metrics_window: default_metrics_window(),
            conditions_window: default_conditions_window(),
            min_trades_for_conditions: default_min_trades_for_conditions(),
            optimal_conditions_min_trades: default_optimal_conditions_min_trades(),
            learning_rate: default_learning_rate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
    /// Directory for daily-rolling log files
    pub log_file: Option<String>,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    #[serde(default)]
    pub enable_metrics: bool,
}

fn default_log_level() -> String { "info".to_string() }
fn default_metrics_port() -> u16 { 9090 }

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            log_file: None,
            metrics_port: default_metrics_port(),
            enable_metrics: false,
        }
    }
}

/// Synthetic replay driven by the `simulate` command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_symbols")]
    pub symbols: Vec<SymbolConfig>,
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Quote currency committed per entry
    #[serde(default = "default_order_notional")]
    pub order_notional: f64,
    /// Ticks a position is held before it is closed
    #[serde(default = "default_hold_ticks")]
    pub hold_ticks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolConfig {
    pub symbol: String,
    pub base_price: f64,
    /// Amplitude of the synthetic oscillation, as a fraction of base price
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
}

fn default_symbols() -> Vec<SymbolConfig> {
    vec![
        SymbolConfig {
            symbol: "BTCUSDT".to_string(),
            base_price: 50_000.0,
            amplitude: default_amplitude(),
        },
        SymbolConfig {
            symbol: "ETHUSDT".to_string(),
            base_price: 3_000.0,
            amplitude: default_amplitude(),
        },
    ]
}

fn default_ticks() -> u64 { 500 }
fn default_tick_interval_ms() -> u64 { 10 }
fn default_order_notional() -> f64 { 500.0 }
fn default_hold_ticks() -> u64 { 8 }
fn default_amplitude() -> f64 { 0.03 }

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            ticks: default_ticks(),
            tick_interval_ms: default_tick_interval_ms(),
            order_notional: default_order_notional(),
            hold_ticks: default_hold_ticks(),
        }
    }
}
