//! Prometheus metrics export
//!
//! Recording functions are no-ops until `init_metrics` installs a recorder.

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

use crate::ledger::PortfolioSummary;

pub fn init_metrics(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    register_metrics();
    info!("Prometheus metrics server started on {}", addr);
    Ok(())
}

fn register_metrics() {
    // Portfolio
    describe_gauge!("paper_trader_balance", "Cash balance in quote currency");
    describe_gauge!("paper_trader_total_value", "Balance plus marked position value");
    describe_gauge!("paper_trader_open_positions", "Number of open positions");

    // Orders
    describe_counter!("paper_trader_orders_filled_total", "Market orders filled");
    describe_counter!("paper_trader_orders_rejected_total", "Orders rejected by the ledger");

    // Policy
    describe_gauge!("paper_trader_confidence_threshold", "Current confidence threshold");
    describe_counter!("paper_trader_decisions_total", "Signals evaluated, by outcome");
    describe_gauge!("paper_trader_win_rate", "Win rate of the latest metrics window");
    describe_counter!("paper_trader_outcomes_total", "Trade outcomes recorded");
}

pub fn record_portfolio(summary: &PortfolioSummary) {
    gauge!("paper_trader_balance").set(summary.current_balance);
    gauge!("paper_trader_total_value").set(summary.total_value);
    gauge!("paper_trader_open_positions").set(summary.num_positions as f64);
}

pub fn record_order_filled() {
    counter!("paper_trader_orders_filled_total").increment(1);
}

pub fn record_order_rejected(code: &'static str) {
    counter!("paper_trader_orders_rejected_total", "reason" => code).increment(1);
}

pub fn record_decision(accepted: bool) {
    let label = if accepted { "true" } else { "false" };
    counter!("paper_trader_decisions_total", "accepted" => label).increment(1);
}

pub fn record_confidence_threshold(threshold: f64) {
    gauge!("paper_trader_confidence_threshold").set(threshold);
}

pub fn record_outcome(win_rate: Option<f64>) {
    counter!("paper_trader_outcomes_total").increment(1);
    if let Some(win_rate) = win_rate {
        gauge!("paper_trader_win_rate").set(win_rate);
    }
}
