//! Adaptive Paper Trader Library
//!
//! Paper-trading ledger, rolling performance analysis and an adaptive
//! accept/reject policy that learns from closed trades.

pub mod agentic;
pub mod config;
pub mod error;
pub mod ledger;
pub mod session;
pub mod telemetry;
pub mod utils;

// Re-export main types
pub use agentic::{AdaptivePolicy, Decision, MarketConditions, PerformanceAnalyzer, TradeOutcome};
pub use config::AppConfig;
pub use error::{LedgerError, PolicyError, SessionError};
pub use ledger::PortfolioLedger;
pub use session::TradingSession;
