//! Integration Tests for the Adaptive Paper Trader
//!
//! Exercises the ledger, the policy and the session through the public API.

use adaptive_paper_trader::agentic::{keys, DecisionReason, MarketConditions, TradeOutcome};
use adaptive_paper_trader::ledger::PortfolioLedger;
use adaptive_paper_trader::utils::types::{OrderStatus, OrderType, ProfitFactor, Side};
use adaptive_paper_trader::{AdaptivePolicy, AppConfig, LedgerError, TradingSession};

const EPS: f64 = 1e-9;

fn outcome(pnl: f64) -> TradeOutcome {
    TradeOutcome {
        trade_id: format!("trade-{pnl}"),
        symbol: "BTCUSDT".to_string(),
        side: Side::Buy,
        entry_price: 100.0,
        exit_price: 100.0 + pnl,
        quantity: 1.0,
        pnl,
        pnl_percentage: pnl,
        hold_time_minutes: 45,
        market_conditions: MarketConditions::new(),
        decision_confidence: 0.7,
        timestamp: 0,
    }
}

#[cfg(test)]
mod scenarios {
    use super::*;

    fn ledger_after_buy() -> PortfolioLedger {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.update_market_price("BTCUSDT", 50_000.0).unwrap();
        ledger
            .place_order("BTCUSDT", Side::Buy, 0.001, OrderType::Market, None)
            .unwrap();
        ledger
    }

    #[test]
    fn test_market_buy_applies_slippage_and_fee() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.update_market_price("BTCUSDT", 50_000.0).unwrap();
        let result = ledger
            .place_order("BTCUSDT", Side::Buy, 0.001, OrderType::Market, None)
            .unwrap();

        assert_eq!(result.status, OrderStatus::Filled);
        assert!((result.filled_price.unwrap() - 50_025.0).abs() < EPS);
        assert_eq!(result.filled_quantity, Some(0.001));
        assert!((result.transaction_cost.unwrap() - 0.050025).abs() < EPS);
        assert!((ledger.current_balance() - 9_949.924975).abs() < 1e-6);

        let position = ledger.position("BTCUSDT").unwrap();
        assert!((position.avg_entry_price - 50_025.0).abs() < EPS);
    }

    #[test]
    fn test_market_sell_realizes_pnl_and_removes_position() {
        let mut ledger = ledger_after_buy();
        let before = ledger.current_balance();
        ledger.update_market_price("BTCUSDT", 51_000.0).unwrap();

        let result = ledger
            .place_order("BTCUSDT", Side::Sell, 0.001, OrderType::Market, None)
            .unwrap();
        let filled = result.filled_price.unwrap();
        assert!((filled - 50_974.5).abs() < EPS);
        assert!(ledger.position("BTCUSDT").is_none());

        let cost = result.transaction_cost.unwrap();
        assert!((ledger.current_balance() - (before + 0.001 * filled - cost)).abs() < 1e-9);

        let summary = ledger.get_portfolio_summary();
        assert_eq!(summary.num_positions, 0);
        assert!((summary.realized_pnl - 0.9495).abs() < 1e-9);
        assert_eq!(summary.num_trades, 2);
    }

    #[test]
    fn test_sell_without_position_is_rejected() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.update_market_price("BTCUSDT", 50_000.0).unwrap();

        let err = ledger
            .place_order("BTCUSDT", Side::Sell, 0.001, OrderType::Market, None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientPosition { .. }));
        assert_eq!(ledger.current_balance(), 10_000.0);
        assert!(ledger.trade_history().is_empty());
    }

    #[test]
    fn test_low_confidence_rejected() {
        let policy = AdaptivePolicy::new();
        let decision = policy.should_trade(&MarketConditions::new(), 0.5);

        assert!(!decision.should_trade);
        assert_eq!(decision.reason, DecisionReason::ConfidenceBelowThreshold);
        assert_eq!(decision.reason.to_string(), "confidence below threshold");
        assert_eq!(decision.signal_confidence, 0.5);
        assert_eq!(decision.confidence_threshold, 0.6);
    }

    #[test]
    fn test_threshold_lowered_once_after_five_winning_outcomes() {
        let mut policy = AdaptivePolicy::new();
        let pnls = [10.0, 12.0, -2.0, 8.0, 5.0];
        let mut reports = Vec::new();
        for pnl in pnls {
            reports.push(policy.record_outcome(outcome(pnl)));
        }

        assert!(reports[..4].iter().all(Option::is_none));
        let report = reports[4].as_ref().unwrap();
        assert!((report.metrics.win_rate - 0.8).abs() < EPS);
        assert_eq!(report.metrics.profit_factor, ProfitFactor::Finite(17.5));
        assert_eq!(report.threshold_before, 0.6);
        assert!((report.threshold_after - 0.55).abs() < EPS);
        assert!((policy.confidence_threshold() - 0.55).abs() < EPS);
        assert_eq!(policy.history().len(), 1);
    }
}

#[cfg(test)]
mod invariants {
    use super::*;

    #[test]
    fn test_reset_is_idempotent() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.update_market_price("ETHUSDT", 3_000.0).unwrap();
        ledger
            .place_order("ETHUSDT", Side::Buy, 1.0, OrderType::Market, None)
            .unwrap();

        ledger.reset(7_500.0).unwrap();
        let first = ledger.get_portfolio_summary();
        ledger.reset(7_500.0).unwrap();
        let second = ledger.get_portfolio_summary();

        assert_eq!(first, second);
        assert_eq!(first.total_value, 7_500.0);
        assert_eq!(first.num_trades, 0);
    }

    #[test]
    fn test_market_order_needs_quote() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        let err = ledger
            .place_order("SOLUSDT", Side::Buy, 1.0, OrderType::Market, None)
            .unwrap_err();
        assert_eq!(err, LedgerError::NoMarketPrice("SOLUSDT".to_string()));
    }

    #[test]
    fn test_string_boundary_validation() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.update_market_price("BTCUSDT", 50_000.0).unwrap();

        assert!(ledger.place_order_str("BTCUSDT", "buy", 0.001, "market", None).is_ok());
        assert_eq!(
            ledger.place_order_str("BTCUSDT", "HOLD", 0.001, "MARKET", None),
            Err(LedgerError::InvalidSide("HOLD".to_string()))
        );
        assert!(matches!(
            ledger.place_order_str("BTCUSDT", "BUY", -1.0, "MARKET", None),
            Err(LedgerError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn test_pending_limit_order_is_inert() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        let result = ledger
            .place_order("BTCUSDT", Side::Buy, 0.01, OrderType::Limit, Some(49_000.0))
            .unwrap();
        assert_eq!(result.status, OrderStatus::Pending);

        ledger.update_market_price("BTCUSDT", 48_000.0).unwrap();
        assert_eq!(ledger.orders()[0].status, OrderStatus::Pending);
        assert_eq!(ledger.current_balance(), 10_000.0);
    }

    #[test]
    fn test_config_defaults_drive_session() {
        let yaml = r#"
ledger:
  initial_balance: 2000.0
policy:
  confidence_threshold: 0.7
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        let session = TradingSession::from_config(&config);

        assert_eq!(session.balance().initial_balance, 2_000.0);
        assert_eq!(session.confidence_threshold(), 0.7);
        assert!(!session.should_trade(&MarketConditions::new(), 0.65).should_trade);
    }

    #[test]
    fn test_full_session_round_trip() {
        let session = TradingSession::default();
        let conditions = MarketConditions::new()
            .with(keys::VOLATILITY_VALUE, 2.0)
            .with(keys::VOLUME_RATIO, 1.4)
            .with(keys::TREND_STRENGTH, "STRONG_BULLISH");

        for round in 0..10 {
            session.update_market_price("BTCUSDT", 50_000.0).unwrap();
            let entry = session
                .evaluate_entry("BTCUSDT", 0.01, &conditions, 0.75)
                .unwrap();
            assert!(entry.decision.should_trade, "round {round}");

            let exit_price = if round % 3 == 0 { 49_000.0 } else { 51_500.0 };
            session.update_market_price("BTCUSDT", exit_price).unwrap();
            session.exit("BTCUSDT").unwrap();
        }

        let summary = session.performance_summary();
        assert_eq!(summary.learning_status.total_lifetime_trades, 10);
        assert_eq!(summary.learning_status.performance_updates, 2);
        assert!(summary.learning_status.learning_active);

        let stats = session.trade_statistics();
        assert_eq!(stats.total_trades, 20);
        assert_eq!(stats.winning_trades + stats.losing_trades, 10);
        assert!(session.market_analysis().is_some());
        assert!(session.positions().is_empty());
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Quote(f64),
        Buy(f64),
        Sell(f64),
        Close,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (10.0f64..1_000.0).prop_map(Op::Quote),
            (0.01f64..20.0).prop_map(Op::Buy),
            (0.01f64..20.0).prop_map(Op::Sell),
            Just(Op::Close),
        ]
    }

    proptest! {
        #[test]
        fn balance_and_quantities_stay_valid(ops in prop::collection::vec(op_strategy(), 1..60)) {
            let mut ledger = PortfolioLedger::new(5_000.0);
            ledger.update_market_price("SOLUSDT", 100.0).unwrap();

            for op in ops {
                let _ = match op {
                    Op::Quote(price) => ledger.update_market_price("SOLUSDT", price).map(|_| ()),
                    Op::Buy(qty) => ledger
                        .place_order("SOLUSDT", Side::Buy, qty, OrderType::Market, None)
                        .map(|_| ()),
                    Op::Sell(qty) => ledger
                        .place_order("SOLUSDT", Side::Sell, qty, OrderType::Market, None)
                        .map(|_| ()),
                    Op::Close => ledger.close_position("SOLUSDT").map(|_| ()),
                };

                prop_assert!(ledger.current_balance() >= 0.0);
                prop_assert!(ledger.positions().all(|p| p.quantity > 0.0));
            }
        }

        #[test]
        fn avg_entry_is_weighted_mean_of_fills(
            fills in prop::collection::vec((0.1f64..10.0, 10.0f64..500.0), 1..20)
        ) {
            let mut ledger = PortfolioLedger::new(1e9);
            let mut notional = 0.0;
            let mut quantity = 0.0;

            for (qty, price) in &fills {
                ledger.update_market_price("ETHUSDT", *price).unwrap();
                let result = ledger
                    .place_order("ETHUSDT", Side::Buy, *qty, OrderType::Market, None)
                    .unwrap();
                notional += qty * result.filled_price.unwrap();
                quantity += qty;
            }

            let position = ledger.position("ETHUSDT").unwrap();
            let expected = notional / quantity;
            prop_assert!((position.avg_entry_price - expected).abs() < 1e-6 * expected);
            prop_assert!((position.quantity - quantity).abs() < 1e-9 * quantity.max(1.0));
        }

        #[test]
        fn rejected_signals_never_touch_the_ledger(confidence in 0.0f64..0.6) {
            let session = TradingSession::default();
            session.update_market_price("BTCUSDT", 50_000.0).unwrap();
            let report = session
                .evaluate_entry("BTCUSDT", 0.01, &MarketConditions::new(), confidence)
                .unwrap();

            prop_assert!(!report.decision.should_trade);
            prop_assert!(session.orders().is_empty());
            prop_assert_eq!(session.balance().current_balance, 10_000.0);
        }
    }
}
