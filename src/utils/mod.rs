//! Utility Module

pub mod helpers;
pub mod types;

pub use types::{OrderStatus, OrderType, ProfitFactor, Side};
