//! Benchmarks for performance-critical paths
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use adaptive_paper_trader::agentic::{keys, MarketConditions, PerformanceAnalyzer, TradeOutcome};
use adaptive_paper_trader::ledger::PortfolioLedger;
use adaptive_paper_trader::utils::types::{OrderType, Side};
use adaptive_paper_trader::AdaptivePolicy;

fn outcomes(n: usize) -> Vec<TradeOutcome> {
    (0..n)
        .map(|i| {
            let pnl = ((i as f64) * 0.7).sin() * 25.0;
            TradeOutcome {
                trade_id: i.to_string(),
                symbol: "BTCUSDT".to_string(),
                side: Side::Buy,
                entry_price: 50_000.0,
                exit_price: 50_000.0 + pnl * 100.0,
                quantity: 0.01,
                pnl,
                pnl_percentage: pnl / 5.0,
                hold_time_minutes: 30,
                market_conditions: MarketConditions::new()
                    .with(keys::VOLATILITY_VALUE, 1.0 + (i % 3) as f64)
                    .with(keys::VOLUME_RATIO, 0.8 + (i % 5) as f64 * 0.2),
                decision_confidence: 0.7,
                timestamp: i as i64,
            }
        })
        .collect()
}

/// Benchmark windowed metrics over growing histories
fn bench_analyze(c: &mut Criterion) {
    let analyzer = PerformanceAnalyzer::default();
    let mut group = c.benchmark_group("analyze");

    for size in [10, 50, 500] {
        let history = outcomes(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &history, |b, history| {
            b.iter(|| black_box(analyzer.analyze(black_box(history))))
        });
    }

    group.finish();
}

/// Benchmark the accept/reject decision
fn bench_should_trade(c: &mut Criterion) {
    let mut policy = AdaptivePolicy::new();
    for outcome in outcomes(50) {
        policy.record_outcome(outcome);
    }
    let conditions = MarketConditions::new()
        .with(keys::VOLATILITY_VALUE, 2.1)
        .with(keys::VOLUME_RATIO, 1.3)
        .with(keys::TREND_STRENGTH, "STRONG_BULLISH")
        .with(keys::RSI, 55.0);

    c.bench_function("should_trade", |b| {
        b.iter(|| black_box(policy.should_trade(black_box(&conditions), black_box(0.72))))
    });
}

/// Benchmark a full adjustment pass
fn bench_record_outcome(c: &mut Criterion) {
    let history = outcomes(49);
    let last = outcomes(50).pop();

    c.bench_function("record_outcome_with_adjustment", |b| {
        b.iter(|| {
            let mut policy = AdaptivePolicy::new();
            for outcome in &history {
                policy.record_outcome(outcome.clone());
            }
            if let Some(outcome) = last.clone() {
                black_box(policy.record_outcome(outcome));
            }
        })
    });
}

/// Benchmark a market buy followed by a full close
fn bench_round_trip(c: &mut Criterion) {
    c.bench_function("ledger_round_trip", |b| {
        b.iter(|| {
            let mut ledger = PortfolioLedger::new(10_000.0);
            let _ = ledger.update_market_price("BTCUSDT", black_box(50_000.0));
            let _ = ledger.place_order("BTCUSDT", Side::Buy, 0.01, OrderType::Market, None);
            let _ = ledger.update_market_price("BTCUSDT", black_box(50_500.0));
            black_box(ledger.close_position("BTCUSDT"))
        })
    });
}

criterion_group!(
    benches,
    bench_analyze,
    bench_should_trade,
    bench_record_outcome,
    bench_round_trip,
);
criterion_main!(benches);
