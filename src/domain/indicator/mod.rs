//! Incremental technical indicators.
//!
//! Every indicator here is a streaming accumulator fed one tick at a time:
//! - `IndicatorType`: indicator identity + parameters (serves as HashMap key)
//! - `IndicatorValue`: enum for the different indicator output shapes
//! - [`pipeline::IndicatorPipeline`]: drives a configured set of indicators and
//!   reports readiness once every warm-up is met

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod levels;
pub mod macd;
pub mod pipeline;
pub mod profile;
pub mod roc;
pub mod rsi;
pub mod stddev;
pub mod volume;

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
    Adx {
        adx: f64,
        plus_di: f64,
        minus_di: f64,
    },
    Levels {
        support: Vec<f64>,
        resistance: Vec<f64>,
    },
    Profile {
        poc: f64,
        value_area_low: f64,
        value_area_high: f64,
    },
}

impl IndicatorValue {
    pub fn as_simple(&self) -> Option<f64> {
        match self {
            IndicatorValue::Simple(v) => Some(*v),
            _ => None,
        }
    }
}

/// Fractional indicator parameter, stored bit-exact so [`IndicatorType`]
/// stays hashable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fraction(u64);

impl Fraction {
    pub fn new(value: f64) -> Self {
        Fraction(value.to_bits())
    }

    pub fn get(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Indicator identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorType {
    Ema(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult: Fraction,
    },
    Atr(usize),
    Adx(usize),
    VolumeRatio(usize),
    Momentum(usize),
    Levels {
        lookback: usize,
        merge_pct: Fraction,
        volume_confirm: bool,
    },
    VolumeProfile {
        window: usize,
        buckets: usize,
    },
}

impl IndicatorType {
    /// Number of ticks that must be observed before the indicator reports a value.
    pub fn warmup(&self) -> usize {
        match self {
            IndicatorType::Ema(n)
            | IndicatorType::Atr(n)
            | IndicatorType::VolumeRatio(n)
            | IndicatorType::Bollinger { period: n, .. } => *n,
            IndicatorType::Rsi(n) | IndicatorType::Momentum(n) => n + 1,
            IndicatorType::Macd { slow, .. } => *slow,
            IndicatorType::Adx(n) => (2 * n).saturating_sub(1),
            IndicatorType::Levels { lookback, .. } => (*lookback).max(levels::MIN_LOOKBACK),
            IndicatorType::VolumeProfile { window, .. } => *window,
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult,
            } => write!(f, "BOLLINGER({},{})", period, stddev_mult),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Adx(period) => write!(f, "ADX({})", period),
            IndicatorType::VolumeRatio(period) => write!(f, "VOLRATIO({})", period),
            IndicatorType::Momentum(period) => write!(f, "MOMENTUM({})", period),
            IndicatorType::Levels {
                lookback,
                merge_pct,
                volume_confirm,
            } => {
                if *volume_confirm {
                    write!(f, "LEVELS({},{},VOL)", lookback, merge_pct)
                } else {
                    write!(f, "LEVELS({},{})", lookback, merge_pct)
                }
            }
            IndicatorType::VolumeProfile { window, buckets } => {
                write!(f, "VPROFILE({},{})", window, buckets)
            }
        }
    }
}
