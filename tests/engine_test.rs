//! End-to-end engine scenarios: warm-up, crossover entry, trailing exit,
//! risk throttles, settlement identity, determinism and orchestration.

mod common;

use chrono::Duration;
use common::*;
use streamtrader::domain::indicator::ema::Ema;
use streamtrader::domain::orchestrator::{EngineSettings, StrategyOrchestrator};
use streamtrader::domain::position::{ExitReason, ExitRules, PositionManager, PositionState, Side};
use streamtrader::domain::risk::{RiskConfig, RiskController, RiskRejection};
use streamtrader::domain::strategy::{StrategyConfig, StrategyInstance, TickEvent};
use streamtrader::domain::tick::Tick;

mod warmup {
    use super::*;

    #[test]
    fn no_entries_before_pipeline_is_ready() {
        let mut instance = StrategyInstance::new(crossover_config());
        let warmup = instance.warmup();
        assert_eq!(warmup, 20);

        let ticks = ticks_from(&v_shape(130.0, 30, 19)[..warmup - 1]);
        let events = replay(&mut instance, &ticks);
        assert!(events.iter().all(Option::is_none));
        assert_eq!(instance.position(), &PositionState::Flat);
    }
}

mod crossover {
    use super::*;

    fn expected_cross(prices: &[f64], fast: usize, slow: usize) -> usize {
        let mut f = Ema::new(fast);
        let mut s = Ema::new(slow);
        let pairs: Vec<(f64, f64)> = prices.iter().map(|&p| (f.next(p), s.next(p))).collect();
        (1..pairs.len())
            .find(|&i| pairs[i - 1].0 <= pairs[i - 1].1 && pairs[i].0 > pairs[i].1)
            .unwrap()
    }

    #[test]
    fn opens_exactly_one_long_at_the_crossover_tick() {
        let prices = v_shape(130.0, 30, 19);
        let cross = expected_cross(&prices, 3, 6);
        assert_eq!(cross, 34);

        let mut instance = StrategyInstance::new(crossover_config());
        let events = replay(&mut instance, &ticks_from(&prices));

        assert_eq!(entries(&events), vec![cross]);
        match &events[cross] {
            Some(TickEvent::Entered { side, price, size }) => {
                assert_eq!(*side, Side::Long);
                assert!((price - prices[cross]).abs() < f64::EPSILON);
                // 0.2 * 1000 * 10 / 104
                assert!((size - 2000.0 / 104.0).abs() < 1e-9);
            }
            other => panic!("expected entry, got {other:?}"),
        }
        assert!(matches!(instance.position(), PositionState::Open(p) if p.side == Side::Long));
    }

    #[test]
    fn no_entry_when_volume_does_not_confirm() {
        let mut config = crossover_config();
        config.entry.volume_surge = 1.5;
        let mut instance = StrategyInstance::new(config);
        let events = replay(&mut instance, &ticks_from(&v_shape(130.0, 30, 19)));
        assert!(entries(&events).is_empty());
    }
}

mod trailing {
    use super::*;

    fn trailing_config() -> StrategyConfig {
        StrategyConfig {
            exit: ExitRules {
                profit_target_pct: 0.0,
                stop_loss_pct: 0.5,
                trailing_stop_pct: 0.5,
            },
            ..surge_config("trail")
        }
    }

    #[test]
    fn long_exits_at_trailing_boundary_below_peak() {
        let mut instance = StrategyInstance::new(trailing_config());
        let events = replay(
            &mut instance,
            &ticks_from(&[99.0, 99.0, 100.0, 105.0, 110.0, 109.5, 109.45]),
        );

        assert!(matches!(events[2], Some(TickEvent::Entered { side: Side::Long, .. })));
        assert!(events[3..6].iter().all(Option::is_none));
        match &events[6] {
            Some(TickEvent::Exited(trade)) => {
                assert_eq!(trade.exit_reason, ExitReason::TrailingStop);
                assert!((trade.entry_price - 100.0).abs() < f64::EPSILON);
                assert!((trade.exit_price - 109.45).abs() < f64::EPSILON);
            }
            other => panic!("expected trailing exit, got {other:?}"),
        }
    }

    #[test]
    fn boundary_never_relaxes() {
        let mut pm = PositionManager::new(ExitRules {
            profit_target_pct: 0.0,
            stop_loss_pct: 0.0,
            trailing_stop_pct: 0.5,
        });
        assert!(pm.try_enter(Side::Long, 100.0, 1.0, 10.0, base_time()));
        let mut last = pm.trailing_boundary().unwrap();
        for price in [104.0, 110.0, 107.0, 109.0, 108.0] {
            pm.mark(price);
            let boundary = pm.trailing_boundary().unwrap();
            assert!(boundary >= last);
            last = boundary;
        }
        assert!((last - 109.45).abs() < 1e-9);
    }
}

mod risk {
    use super::*;

    #[test]
    fn fourth_entry_rejected_after_three_losses() {
        let mut instance = StrategyInstance::new(surge_config("streak"));
        let events = replay(&mut instance, &ticks_from(&win_loss_path(4)[..9]));

        let stops: Vec<&TickEvent> = events
            .iter()
            .flatten()
            .filter(|e| matches!(e, TickEvent::Exited(t) if t.exit_reason == ExitReason::StopLoss))
            .collect();
        assert_eq!(stops.len(), 3);
        assert_eq!(entries(&events).len(), 3);
        assert_eq!(
            events[8],
            Some(TickEvent::RiskRejected {
                side: Side::Long,
                reason: RiskRejection::LossStreak,
            })
        );
    }

    #[test]
    fn streak_lifts_only_after_a_win() {
        let mut risk = RiskController::new(RiskConfig::default(), 1000.0);
        for _ in 0..3 {
            risk.record_close(-2.0);
        }
        assert_eq!(risk.size_position(1000.0, 10.0, 100.0), 0.0);
        risk.record_close(0.0);
        assert_eq!(risk.size_position(1000.0, 10.0, 100.0), 0.0);
        risk.record_close(1.0);
        assert!(risk.size_position(1000.0, 10.0, 100.0) > 0.0);
    }

    #[test]
    fn daily_loss_limit_resets_on_next_calendar_day() {
        let mut config = surge_config("daily");
        config.risk.max_daily_loss_pct = 0.5;
        let mut instance = StrategyInstance::new(config);

        let mut ticks = ticks_from(&win_loss_path(1));
        let last = ticks[3].price;
        ticks.push(tick_at(4, last * 1.02));
        let next_day = Tick::new(
            ticks[0].timestamp + Duration::days(1),
            last * 1.02 * 1.02,
            VOLUME,
        );
        ticks.push(next_day);

        let events = replay(&mut instance, &ticks);
        assert!(matches!(events[3], Some(TickEvent::Exited(_))));
        assert_eq!(
            events[4],
            Some(TickEvent::RiskRejected {
                side: Side::Long,
                reason: RiskRejection::DailyLossLimit,
            })
        );
        assert!(matches!(events[5], Some(TickEvent::Entered { .. })));
        assert_eq!(instance.risk_state().daily_loss, 0.0);
        assert_eq!(
            instance.risk_state().last_reset_date,
            Some(ticks[5].timestamp.date_naive())
        );
    }
}

mod settlement {
    use super::*;

    #[test]
    fn net_pnl_is_raw_minus_fees_for_every_trade() {
        let mut instance = StrategyInstance::new(StrategyConfig {
            leverage: 7.0,
            risk: RiskConfig {
                loss_streak_cutoff: 100,
                max_daily_loss_pct: 100.0,
                ..RiskConfig::default()
            },
            ..surge_config("identity")
        });
        replay(&mut instance, &ticks_from(&win_loss_path(6)));
        assert!(!instance.trades().is_empty());
        for trade in instance.trades() {
            assert_eq!(trade.net_pnl, trade.raw_pnl - trade.fees_paid);
            assert!(trade.fees_paid > 0.0);
        }
    }

    #[test]
    fn snapshot_capital_tracks_ledger() {
        let mut instance = StrategyInstance::new(surge_config("capital"));
        replay(&mut instance, &ticks_from(&win_loss_path(3)));
        let snap = instance.snapshot();
        let sum: f64 = instance.trades().iter().map(|t| t.net_pnl).sum();
        assert_eq!(snap.total_trades, instance.trades().len());
        assert!((snap.current_capital - (1000.0 + sum)).abs() < 1e-9);
        assert!((instance.capital() - snap.current_capital).abs() < 1e-9);
    }
}

mod determinism {
    use super::*;

    #[test]
    fn replay_yields_identical_ledger() {
        let mut prices = v_shape(130.0, 30, 19);
        prices.extend(v_shape(119.0, 10, 10));
        let ticks = ticks_from(&prices);

        let run = |config: StrategyConfig| {
            let mut instance = StrategyInstance::new(config);
            replay(&mut instance, &ticks);
            (instance.trades().to_vec(), instance.snapshot())
        };
        assert_eq!(run(crossover_config()), run(crossover_config()));
        assert_eq!(run(surge_config("s")), run(surge_config("s")));
    }
}

mod orchestration {
    use super::*;

    #[test]
    fn each_instance_sees_every_tick() {
        let mut orch = StrategyOrchestrator::new(EngineSettings::default());
        orch.register(StrategyInstance::new(crossover_config())).unwrap();
        orch.register(StrategyInstance::new(surge_config("surge"))).unwrap();

        let ticks = ticks_from(&v_shape(130.0, 30, 19));
        for tick in &ticks {
            let outcomes = orch.dispatch(tick);
            assert_eq!(outcomes.len(), 2);
            assert!(outcomes.iter().all(|o| o.result.is_ok()));
        }

        let mut solo = StrategyInstance::new(crossover_config());
        replay(&mut solo, &ticks);
        assert_eq!(orch.instance("crossover").unwrap().trades(), solo.trades());
        assert_eq!(orch.instance("crossover").unwrap().position(), solo.position());

        let snaps = orch.snapshot_all();
        assert_eq!(snaps.keys().collect::<Vec<_>>(), vec!["crossover", "surge"]);
    }

    #[test]
    fn parallel_dispatch_is_equivalent() {
        let build = || {
            let mut orch = StrategyOrchestrator::new(EngineSettings {
                parallel: true,
                ..EngineSettings::default()
            });
            for name in ["a", "b", "c", "d"] {
                orch.register(StrategyInstance::new(surge_config(name))).unwrap();
            }
            orch.register(StrategyInstance::new(crossover_config())).unwrap();
            orch
        };
        let ticks = ticks_from(&win_loss_path(8));
        let mut seq = build();
        let mut par = build();
        for tick in &ticks {
            seq.dispatch(tick);
            par.dispatch_parallel(tick);
        }
        assert_eq!(seq.snapshot_all(), par.snapshot_all());
        assert_eq!(seq.aggregate(), par.aggregate());
    }

    #[test]
    fn liquidation_fault_in_one_instance_does_not_block_others() {
        let mut orch = StrategyOrchestrator::new(EngineSettings::default());
        orch.register(StrategyInstance::new(StrategyConfig {
            exit: ExitRules {
                profit_target_pct: 50.0,
                ..ExitRules::default()
            },
            ..surge_config("open")
        }))
        .unwrap();
        orch.register(StrategyInstance::new(crossover_config())).unwrap();

        for tick in ticks_from(&[100.0, 100.0, 101.0]) {
            orch.dispatch(&tick);
        }
        orch.dispatch(&tick_at(3, f64::NAN));

        let reports = orch.shutdown(true);
        assert!(reports[0].is_err());
        let idle = reports[1].as_ref().unwrap();
        assert!(idle.liquidated.is_none());
        assert!(idle.unrealized.is_none());
        assert_eq!(orch.instance("open").unwrap().position(), &PositionState::Flat);
    }
}
