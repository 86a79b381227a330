//! Indicator pipeline: updates a configured set of streaming indicators per
//! tick and reports a snapshot once all of them are warmed up.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::atr::{Adx, Atr};
use super::bollinger::Bollinger;
use super::ema::Ema;
use super::levels::LevelDetector;
use super::macd::Macd;
use super::profile::VolumeProfile;
use super::roc::Momentum;
use super::rsi::Rsi;
use super::volume::VolumeRatio;
use super::{IndicatorType, IndicatorValue};
use crate::domain::tick::Tick;

/// Indicator values observed at one tick, plus the values from the tick before.
#[derive(Debug, Clone)]
pub struct IndicatorSnapshot {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume: f64,
    pub values: HashMap<IndicatorType, IndicatorValue>,
    /// Values from the previous ready tick; empty on the first ready tick.
    pub prior: HashMap<IndicatorType, IndicatorValue>,
}

impl IndicatorSnapshot {
    pub fn get(&self, kind: &IndicatorType) -> Option<&IndicatorValue> {
        self.values.get(kind)
    }

    pub fn simple(&self, kind: &IndicatorType) -> Option<f64> {
        self.values.get(kind).and_then(IndicatorValue::as_simple)
    }

    pub fn prior_simple(&self, kind: &IndicatorType) -> Option<f64> {
        self.prior.get(kind).and_then(IndicatorValue::as_simple)
    }
}

#[derive(Debug, Clone)]
pub enum Readiness {
    NotReady { seen: usize, required: usize },
    Ready(IndicatorSnapshot),
}

#[derive(Debug, Clone)]
enum IndicatorState {
    Ema(Ema),
    Rsi(Rsi),
    Macd(Macd),
    Bollinger(Bollinger),
    Atr(Atr),
    Adx(Adx),
    VolumeRatio(VolumeRatio),
    Momentum(Momentum),
    Levels(LevelDetector),
    VolumeProfile(VolumeProfile),
}

impl IndicatorState {
    fn for_type(kind: &IndicatorType) -> Self {
        match *kind {
            IndicatorType::Ema(n) => IndicatorState::Ema(Ema::new(n)),
            IndicatorType::Rsi(n) => IndicatorState::Rsi(Rsi::new(n)),
            IndicatorType::Macd { fast, slow, signal } => {
                IndicatorState::Macd(Macd::new(fast, slow, signal))
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult,
            } => IndicatorState::Bollinger(Bollinger::new(period, stddev_mult.get())),
            IndicatorType::Atr(n) => IndicatorState::Atr(Atr::new(n)),
            IndicatorType::Adx(n) => IndicatorState::Adx(Adx::new(n)),
            IndicatorType::VolumeRatio(n) => IndicatorState::VolumeRatio(VolumeRatio::new(n)),
            IndicatorType::Momentum(n) => IndicatorState::Momentum(Momentum::new(n)),
            IndicatorType::Levels {
                lookback,
                merge_pct,
                volume_confirm,
            } => IndicatorState::Levels(LevelDetector::new(
                lookback,
                merge_pct.get(),
                volume_confirm,
            )),
            IndicatorType::VolumeProfile { window, buckets } => {
                IndicatorState::VolumeProfile(VolumeProfile::new(window, buckets))
            }
        }
    }

    fn update(&mut self, tick: &Tick) -> Option<IndicatorValue> {
        match self {
            IndicatorState::Ema(ema) => ema.update(tick.price).map(IndicatorValue::Simple),
            IndicatorState::Rsi(rsi) => rsi.update(tick.price).map(IndicatorValue::Simple),
            IndicatorState::Macd(macd) => macd.update(tick.price).map(|r| IndicatorValue::Macd {
                line: r.line,
                signal: r.signal,
                histogram: r.histogram,
            }),
            IndicatorState::Bollinger(boll) => {
                boll.update(tick.price).map(|b| IndicatorValue::Bollinger {
                    upper: b.upper,
                    middle: b.middle,
                    lower: b.lower,
                })
            }
            IndicatorState::Atr(atr) => atr.update(tick).map(IndicatorValue::Simple),
            IndicatorState::Adx(adx) => adx.update(tick).map(|r| IndicatorValue::Adx {
                adx: r.adx,
                plus_di: r.plus_di,
                minus_di: r.minus_di,
            }),
            IndicatorState::VolumeRatio(ratio) => {
                ratio.update(tick.volume).map(IndicatorValue::Simple)
            }
            IndicatorState::Momentum(roc) => roc.update(tick.price).map(IndicatorValue::Simple),
            IndicatorState::Levels(levels) => {
                levels.update(tick).map(|set| IndicatorValue::Levels {
                    support: set.support,
                    resistance: set.resistance,
                })
            }
            IndicatorState::VolumeProfile(profile) => {
                profile
                    .update(tick.price, tick.volume)
                    .map(|r| IndicatorValue::Profile {
                        poc: r.poc,
                        value_area_low: r.value_area_low,
                        value_area_high: r.value_area_high,
                    })
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorPipeline {
    indicators: Vec<(IndicatorType, IndicatorState)>,
    required: usize,
    seen: usize,
    prior: HashMap<IndicatorType, IndicatorValue>,
}

impl IndicatorPipeline {
    pub fn new(kinds: &[IndicatorType]) -> Self {
        let mut unique: Vec<IndicatorType> = kinds.to_vec();
        unique.sort();
        unique.dedup();

        let required = unique.iter().map(IndicatorType::warmup).max().unwrap_or(0);
        let indicators = unique
            .into_iter()
            .map(|kind| {
                let state = IndicatorState::for_type(&kind);
                (kind, state)
            })
            .collect();

        IndicatorPipeline {
            indicators,
            required,
            seen: 0,
            prior: HashMap::new(),
        }
    }

    /// Ticks that must be observed before the first `Ready`.
    pub fn warmup(&self) -> usize {
        self.required
    }

    pub fn kinds(&self) -> impl Iterator<Item = &IndicatorType> {
        self.indicators.iter().map(|(kind, _)| kind)
    }

    pub fn update(&mut self, tick: &Tick) -> Readiness {
        self.seen += 1;

        let mut values = HashMap::with_capacity(self.indicators.len());
        let mut ready = true;
        for (kind, state) in &mut self.indicators {
            match state.update(tick) {
                Some(value) => {
                    values.insert(kind.clone(), value);
                }
                None => ready = false,
            }
        }

        if !ready {
            return Readiness::NotReady {
                seen: self.seen,
                required: self.required,
            };
        }

        let prior = std::mem::replace(&mut self.prior, values.clone());
        Readiness::Ready(IndicatorSnapshot {
            timestamp: tick.timestamp,
            price: tick.price,
            volume: tick.volume,
            values,
            prior,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::Fraction;
    use chrono::Duration;

    fn ticks(prices: &[f64]) -> Vec<Tick> {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| Tick::new(start + Duration::seconds(i as i64), p, 1.0))
            .collect()
    }

    #[test]
    fn not_ready_until_longest_warmup() {
        let mut pipeline = IndicatorPipeline::new(&[IndicatorType::Ema(3), IndicatorType::Rsi(4)]);
        assert_eq!(pipeline.warmup(), 5);

        let series = ticks(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        for (i, tick) in series.iter().enumerate() {
            let readiness = pipeline.update(tick);
            if i < 4 {
                assert!(matches!(
                    readiness,
                    Readiness::NotReady { seen, required: 5 } if seen == i + 1
                ));
            } else {
                assert!(matches!(readiness, Readiness::Ready(_)));
            }
        }
    }

    #[test]
    fn empty_pipeline_is_ready_immediately() {
        let mut pipeline = IndicatorPipeline::new(&[]);
        let readiness = pipeline.update(&ticks(&[10.0])[0]);
        assert!(matches!(readiness, Readiness::Ready(_)));
    }

    #[test]
    fn duplicate_kinds_are_merged() {
        let pipeline = IndicatorPipeline::new(&[IndicatorType::Ema(3), IndicatorType::Ema(3)]);
        assert_eq!(pipeline.kinds().count(), 1);
    }

    #[test]
    fn snapshot_carries_prior_values() {
        let mut pipeline = IndicatorPipeline::new(&[IndicatorType::Ema(1)]);
        let series = ticks(&[10.0, 20.0]);

        let first = match pipeline.update(&series[0]) {
            Readiness::Ready(s) => s,
            Readiness::NotReady { .. } => panic!("EMA(1) is ready on the first tick"),
        };
        assert!(first.prior.is_empty());
        assert_eq!(first.simple(&IndicatorType::Ema(1)), Some(10.0));

        let second = match pipeline.update(&series[1]) {
            Readiness::Ready(s) => s,
            Readiness::NotReady { .. } => panic!("pipeline regressed to not ready"),
        };
        assert_eq!(second.prior_simple(&IndicatorType::Ema(1)), Some(10.0));
        assert_eq!(second.simple(&IndicatorType::Ema(1)), Some(20.0));
        assert!((second.price - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn small_bollinger_multiplier_is_not_rounded_away() {
        let kind = IndicatorType::Bollinger {
            period: 3,
            stddev_mult: Fraction::new(0.004),
        };
        let mut pipeline = IndicatorPipeline::new(std::slice::from_ref(&kind));
        let mut last = None;
        for tick in ticks(&[100.0, 110.0, 90.0]) {
            last = Some(pipeline.update(&tick));
        }
        let snapshot = match last {
            Some(Readiness::Ready(s)) => s,
            _ => panic!("bollinger(3) is ready after 3 ticks"),
        };
        match snapshot.get(&kind) {
            Some(IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            }) => {
                // sample sigma of 100, 110, 90 is 10
                assert!((middle - 100.0).abs() < 1e-9);
                assert!((upper - 100.04).abs() < 1e-9);
                assert!((lower - 99.96).abs() < 1e-9);
            }
            other => panic!("expected bands, got {other:?}"),
        }
    }

    #[test]
    fn short_level_lookback_reports_effective_warmup() {
        let mut pipeline = IndicatorPipeline::new(&[IndicatorType::Levels {
            lookback: 3,
            merge_pct: Fraction::new(0.2),
            volume_confirm: false,
        }]);
        assert_eq!(pipeline.warmup(), 5);
        let series = ticks(&[10.0, 11.0, 12.0, 11.0, 10.0]);
        for tick in &series[..4] {
            assert!(matches!(
                pipeline.update(tick),
                Readiness::NotReady { required: 5, .. }
            ));
        }
        assert!(matches!(pipeline.update(&series[4]), Readiness::Ready(_)));
    }

    #[test]
    fn every_indicator_kind_produces_values() {
        let kinds = [
            IndicatorType::Ema(3),
            IndicatorType::Rsi(3),
            IndicatorType::Macd {
                fast: 2,
                slow: 4,
                signal: 2,
            },
            IndicatorType::Bollinger {
                period: 3,
                stddev_mult: Fraction::new(2.0),
            },
            IndicatorType::Atr(3),
            IndicatorType::Adx(3),
            IndicatorType::VolumeRatio(3),
            IndicatorType::Momentum(2),
            IndicatorType::Levels {
                lookback: 5,
                merge_pct: Fraction::new(0.2),
                volume_confirm: false,
            },
            IndicatorType::VolumeProfile {
                window: 4,
                buckets: 5,
            },
        ];
        let mut pipeline = IndicatorPipeline::new(&kinds);
        let mut last = None;
        for tick in ticks(&[10.0, 11.0, 12.0, 11.0, 13.0, 12.0, 14.0]) {
            last = Some(pipeline.update(&tick));
        }
        let snapshot = match last {
            Some(Readiness::Ready(s)) => s,
            _ => panic!("pipeline should be ready after 7 ticks"),
        };
        for kind in &kinds {
            assert!(snapshot.get(kind).is_some(), "missing {kind}");
        }
    }
}
