#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use streamtrader::domain::position::ExitRules;
use streamtrader::domain::signal::{EntryThresholds, IndicatorParams, SignalRule};
use streamtrader::domain::strategy::{StrategyConfig, StrategyInstance, TickEvent};
use streamtrader::domain::tick::Tick;

pub const VOLUME: f64 = 10.0;

pub fn base_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub fn tick_at(secs: i64, price: f64) -> Tick {
    Tick::new(base_time() + Duration::seconds(secs), price, VOLUME)
}

/// One tick per second from [`base_time`], constant volume.
pub fn ticks_from(prices: &[f64]) -> Vec<Tick> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| tick_at(i as i64, p))
        .collect()
}

/// Falls 1.0 per tick from `start` for `down` ticks, then rises 1.0 per tick.
pub fn v_shape(start: f64, down: usize, up: usize) -> Vec<f64> {
    let bottom = start - down as f64;
    (0..=down)
        .map(|i| start - i as f64)
        .chain((1..=up).map(|k| bottom + k as f64))
        .collect()
}

/// Alternating +2% / -3% moves after two flat ticks.
pub fn win_loss_path(cycles: usize) -> Vec<f64> {
    let mut prices = vec![100.0, 100.0];
    let mut price = 100.0;
    for _ in 0..cycles {
        price *= 1.02;
        prices.push(price);
        price *= 0.97;
        prices.push(price);
    }
    prices
}

/// Volume-surge strategy that trades any 1-tick move once three ticks are
/// seen, unleveraged.
pub fn surge_config(name: &str) -> StrategyConfig {
    StrategyConfig {
        name: name.into(),
        rule: SignalRule::VolumeSurge,
        leverage: 1.0,
        indicators: IndicatorParams {
            volume_period: 3,
            ..IndicatorParams::default()
        },
        entry: EntryThresholds {
            volume_surge: 1.0,
            ..EntryThresholds::default()
        },
        ..StrategyConfig::default()
    }
}

/// EMA(3)/EMA(6) crossover with constant-volume confirmation.
pub fn crossover_config() -> StrategyConfig {
    StrategyConfig {
        name: "crossover".into(),
        rule: SignalRule::EmaCrossover,
        indicators: IndicatorParams {
            ema_fast: 3,
            ema_slow: 6,
            rsi_period: 14,
            volume_period: 20,
            ..IndicatorParams::default()
        },
        entry: EntryThresholds {
            volume_surge: 1.0,
            ..EntryThresholds::default()
        },
        exit: ExitRules {
            profit_target_pct: 50.0,
            stop_loss_pct: 50.0,
            trailing_stop_pct: 0.0,
        },
        ..StrategyConfig::default()
    }
}

pub fn replay(instance: &mut StrategyInstance, ticks: &[Tick]) -> Vec<Option<TickEvent>> {
    ticks
        .iter()
        .map(|t| instance.on_tick(t).unwrap())
        .collect()
}

pub fn entries(events: &[Option<TickEvent>]) -> Vec<usize> {
    events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, Some(TickEvent::Entered { .. })))
        .map(|(i, _)| i)
        .collect()
}
