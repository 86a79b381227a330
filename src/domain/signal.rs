//! Signal rules: a closed set of entry/reversal strategies expressed as pure
//! functions over an [`IndicatorSnapshot`], selected by name in configuration.

use std::fmt;
use std::str::FromStr;

use super::indicator::levels::nearest;
use super::indicator::pipeline::IndicatorSnapshot;
use super::indicator::{Fraction, IndicatorType, IndicatorValue};
use super::position::Side;

/// Indicator periods and shape parameters for one strategy instance.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_stddev: f64,
    pub atr_period: usize,
    pub adx_period: usize,
    pub volume_period: usize,
    pub level_lookback: usize,
    pub level_merge_pct: f64,
    pub level_volume_confirm: bool,
    pub profile_window: usize,
    pub profile_buckets: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        IndicatorParams {
            ema_fast: 8,
            ema_slow: 21,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_stddev: 2.0,
            atr_period: 14,
            adx_period: 14,
            volume_period: 20,
            level_lookback: 100,
            level_merge_pct: 0.2,
            level_volume_confirm: false,
            profile_window: 30,
            profile_buckets: 50,
        }
    }
}

impl IndicatorParams {
    pub fn ema_fast(&self) -> IndicatorType {
        IndicatorType::Ema(self.ema_fast)
    }

    pub fn ema_slow(&self) -> IndicatorType {
        IndicatorType::Ema(self.ema_slow)
    }

    pub fn rsi(&self) -> IndicatorType {
        IndicatorType::Rsi(self.rsi_period)
    }

    pub fn macd(&self) -> IndicatorType {
        IndicatorType::Macd {
            fast: self.macd_fast,
            slow: self.macd_slow,
            signal: self.macd_signal,
        }
    }

    pub fn bollinger(&self) -> IndicatorType {
        IndicatorType::Bollinger {
            period: self.bollinger_period,
            stddev_mult: Fraction::new(self.bollinger_stddev),
        }
    }

    pub fn atr(&self) -> IndicatorType {
        IndicatorType::Atr(self.atr_period)
    }

    pub fn adx(&self) -> IndicatorType {
        IndicatorType::Adx(self.adx_period)
    }

    pub fn volume_ratio(&self) -> IndicatorType {
        IndicatorType::VolumeRatio(self.volume_period)
    }

    pub fn momentum(&self) -> IndicatorType {
        IndicatorType::Momentum(1)
    }

    pub fn levels(&self) -> IndicatorType {
        IndicatorType::Levels {
            lookback: self.level_lookback,
            merge_pct: Fraction::new(self.level_merge_pct),
            volume_confirm: self.level_volume_confirm,
        }
    }

    pub fn volume_profile(&self) -> IndicatorType {
        IndicatorType::VolumeProfile {
            window: self.profile_window,
            buckets: self.profile_buckets,
        }
    }
}

/// Entry thresholds. Percent-valued fields use percent units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryThresholds {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub volume_surge: f64,
    pub breakout_pct: f64,
    pub adx_threshold: f64,
    pub min_move_pct: f64,
    pub min_atr_pct: f64,
}

impl Default for EntryThresholds {
    fn default() -> Self {
        EntryThresholds {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            volume_surge: 2.0,
            breakout_pct: 0.15,
            adx_threshold: 25.0,
            min_move_pct: 0.05,
            min_atr_pct: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalRule {
    EmaCrossover,
    MomentumConfluence,
    RsiBollinger,
    MacdVolume,
    VolumeSurge,
    VolumeProfile,
    LevelBreakout,
    TrendStrength,
}

impl SignalRule {
    pub const ALL: [SignalRule; 8] = [
        SignalRule::EmaCrossover,
        SignalRule::MomentumConfluence,
        SignalRule::RsiBollinger,
        SignalRule::MacdVolume,
        SignalRule::VolumeSurge,
        SignalRule::VolumeProfile,
        SignalRule::LevelBreakout,
        SignalRule::TrendStrength,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SignalRule::EmaCrossover => "ema_crossover",
            SignalRule::MomentumConfluence => "momentum_confluence",
            SignalRule::RsiBollinger => "rsi_bollinger",
            SignalRule::MacdVolume => "macd_volume",
            SignalRule::VolumeSurge => "volume_surge",
            SignalRule::VolumeProfile => "volume_profile",
            SignalRule::LevelBreakout => "level_breakout",
            SignalRule::TrendStrength => "trend_strength",
        }
    }

    /// Indicators the pipeline must compute for this rule.
    pub fn required_indicators(&self, p: &IndicatorParams) -> Vec<IndicatorType> {
        match self {
            SignalRule::EmaCrossover => {
                vec![p.ema_fast(), p.ema_slow(), p.rsi(), p.volume_ratio()]
            }
            SignalRule::MomentumConfluence => vec![p.ema_fast(), p.ema_slow(), p.rsi(), p.macd()],
            SignalRule::RsiBollinger => vec![p.rsi(), p.bollinger()],
            SignalRule::MacdVolume => vec![p.macd(), p.volume_ratio()],
            SignalRule::VolumeSurge => vec![p.volume_ratio(), p.momentum()],
            SignalRule::VolumeProfile => vec![p.volume_profile(), p.volume_ratio()],
            SignalRule::LevelBreakout => vec![p.levels()],
            SignalRule::TrendStrength => vec![p.adx(), p.atr(), p.ema_fast(), p.ema_slow()],
        }
    }

    /// Side to open on this snapshot, if any. Long conditions are checked first.
    pub fn entry(
        &self,
        snap: &IndicatorSnapshot,
        p: &IndicatorParams,
        t: &EntryThresholds,
    ) -> Option<Side> {
        match self {
            SignalRule::EmaCrossover => ema_crossover_entry(snap, p, t),
            SignalRule::MomentumConfluence => momentum_confluence_entry(snap, p, t),
            SignalRule::RsiBollinger => rsi_bollinger_entry(snap, p, t),
            SignalRule::MacdVolume => macd_volume_entry(snap, p, t),
            SignalRule::VolumeSurge => volume_surge_entry(snap, p, t),
            SignalRule::VolumeProfile => volume_profile_entry(snap, p, t),
            SignalRule::LevelBreakout => level_breakout_entry(snap, p, t),
            SignalRule::TrendStrength => trend_strength_entry(snap, p, t),
        }
    }

    /// Whether the indicators have flipped against the held side.
    pub fn reversal(
        &self,
        snap: &IndicatorSnapshot,
        side: Side,
        p: &IndicatorParams,
        t: &EntryThresholds,
    ) -> bool {
        let flipped = match self {
            SignalRule::EmaCrossover | SignalRule::TrendStrength => {
                emas(snap, p).map(|(fast, slow)| against(side, fast - slow))
            }
            SignalRule::MomentumConfluence => {
                let rsi = snap.simple(&p.rsi());
                macd(snap, p).zip(rsi).map(|((line, signal), rsi)| match side {
                    Side::Long => line < signal && rsi > t.rsi_overbought,
                    Side::Short => line > signal && rsi < t.rsi_oversold,
                })
            }
            SignalRule::RsiBollinger => snap.simple(&p.rsi()).map(|rsi| match side {
                Side::Long => rsi > t.rsi_overbought,
                Side::Short => rsi < t.rsi_oversold,
            }),
            SignalRule::MacdVolume => macd(snap, p).map(|(line, signal)| against(side, line - signal)),
            SignalRule::VolumeSurge => None,
            SignalRule::VolumeProfile => profile(snap, p).map(|(_, low, high)| match side {
                Side::Long => snap.price < low,
                Side::Short => snap.price > high,
            }),
            SignalRule::LevelBreakout => levels(snap, p).map(|(support, resistance)| match side {
                Side::Long => support.iter().any(|&s| snap.price < s),
                Side::Short => resistance.iter().any(|&r| snap.price > r),
            }),
        };
        flipped.unwrap_or(false)
    }
}

impl fmt::Display for SignalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SignalRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SignalRule::ALL
            .into_iter()
            .find(|rule| rule.name() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = SignalRule::ALL.iter().map(|r| r.name()).collect();
                format!("unknown rule '{}', expected one of {}", s.trim(), known.join(", "))
            })
    }
}

/// True when `spread` (indicator minus its reference) points against `side`.
fn against(side: Side, spread: f64) -> bool {
    match side {
        Side::Long => spread < 0.0,
        Side::Short => spread > 0.0,
    }
}

fn emas(snap: &IndicatorSnapshot, p: &IndicatorParams) -> Option<(f64, f64)> {
    snap.simple(&p.ema_fast()).zip(snap.simple(&p.ema_slow()))
}

fn prior_emas(snap: &IndicatorSnapshot, p: &IndicatorParams) -> Option<(f64, f64)> {
    snap.prior_simple(&p.ema_fast())
        .zip(snap.prior_simple(&p.ema_slow()))
}

fn macd(snap: &IndicatorSnapshot, p: &IndicatorParams) -> Option<(f64, f64)> {
    match snap.get(&p.macd())? {
        IndicatorValue::Macd { line, signal, .. } => Some((*line, *signal)),
        _ => None,
    }
}

fn bands(snap: &IndicatorSnapshot, p: &IndicatorParams) -> Option<(f64, f64)> {
    match snap.get(&p.bollinger())? {
        IndicatorValue::Bollinger { upper, lower, .. } => Some((*lower, *upper)),
        _ => None,
    }
}

fn adx(snap: &IndicatorSnapshot, p: &IndicatorParams) -> Option<(f64, f64, f64)> {
    match snap.get(&p.adx())? {
        IndicatorValue::Adx {
            adx,
            plus_di,
            minus_di,
        } => Some((*adx, *plus_di, *minus_di)),
        _ => None,
    }
}

fn levels<'a>(snap: &'a IndicatorSnapshot, p: &IndicatorParams) -> Option<(&'a [f64], &'a [f64])> {
    match snap.get(&p.levels())? {
        IndicatorValue::Levels {
            support,
            resistance,
        } => Some((support.as_slice(), resistance.as_slice())),
        _ => None,
    }
}

fn profile(snap: &IndicatorSnapshot, p: &IndicatorParams) -> Option<(f64, f64, f64)> {
    match snap.get(&p.volume_profile())? {
        IndicatorValue::Profile {
            poc,
            value_area_low,
            value_area_high,
        } => Some((*poc, *value_area_low, *value_area_high)),
        _ => None,
    }
}

fn ema_crossover_entry(
    snap: &IndicatorSnapshot,
    p: &IndicatorParams,
    t: &EntryThresholds,
) -> Option<Side> {
    let (fast, slow) = emas(snap, p)?;
    let (prev_fast, prev_slow) = prior_emas(snap, p)?;
    let rsi = snap.simple(&p.rsi())?;
    let volume_ok = snap.simple(&p.volume_ratio())? >= t.volume_surge;

    if prev_fast <= prev_slow && fast > slow && rsi < t.rsi_oversold && volume_ok {
        Some(Side::Long)
    } else if prev_fast >= prev_slow && fast < slow && rsi > t.rsi_overbought && volume_ok {
        Some(Side::Short)
    } else {
        None
    }
}

fn momentum_confluence_entry(
    snap: &IndicatorSnapshot,
    p: &IndicatorParams,
    t: &EntryThresholds,
) -> Option<Side> {
    let (fast, slow) = emas(snap, p)?;
    let (line, signal) = macd(snap, p)?;
    let rsi = snap.simple(&p.rsi())?;

    if rsi < t.rsi_oversold && line > signal && fast > slow {
        Some(Side::Long)
    } else if rsi > t.rsi_overbought && line < signal && fast < slow {
        Some(Side::Short)
    } else {
        None
    }
}

fn rsi_bollinger_entry(
    snap: &IndicatorSnapshot,
    p: &IndicatorParams,
    t: &EntryThresholds,
) -> Option<Side> {
    let rsi = snap.simple(&p.rsi())?;
    let (lower, upper) = bands(snap, p)?;

    if rsi < t.rsi_oversold && snap.price < lower {
        Some(Side::Long)
    } else if rsi > t.rsi_overbought && snap.price > upper {
        Some(Side::Short)
    } else {
        None
    }
}

fn macd_volume_entry(
    snap: &IndicatorSnapshot,
    p: &IndicatorParams,
    t: &EntryThresholds,
) -> Option<Side> {
    let (line, signal) = macd(snap, p)?;
    if snap.simple(&p.volume_ratio())? <= t.volume_surge {
        return None;
    }
    if line > signal {
        Some(Side::Long)
    } else if line < signal {
        Some(Side::Short)
    } else {
        None
    }
}

fn volume_surge_entry(
    snap: &IndicatorSnapshot,
    p: &IndicatorParams,
    t: &EntryThresholds,
) -> Option<Side> {
    if snap.simple(&p.volume_ratio())? < t.volume_surge {
        return None;
    }
    let change = snap.simple(&p.momentum())?;
    if change >= t.min_move_pct {
        Some(Side::Long)
    } else if change <= -t.min_move_pct {
        Some(Side::Short)
    } else {
        None
    }
}

fn volume_profile_entry(
    snap: &IndicatorSnapshot,
    p: &IndicatorParams,
    t: &EntryThresholds,
) -> Option<Side> {
    let (_, low, high) = profile(snap, p)?;
    if snap.simple(&p.volume_ratio())? <= t.volume_surge {
        return None;
    }
    if snap.price > high {
        Some(Side::Long)
    } else if snap.price < low {
        Some(Side::Short)
    } else {
        None
    }
}

fn level_breakout_entry(
    snap: &IndicatorSnapshot,
    p: &IndicatorParams,
    t: &EntryThresholds,
) -> Option<Side> {
    let (support, resistance) = levels(snap, p)?;
    let margin = t.breakout_pct / 100.0;

    if let Some(r) = nearest(resistance, snap.price) {
        if snap.price > r * (1.0 + margin) {
            return Some(Side::Long);
        }
    }
    if let Some(s) = nearest(support, snap.price) {
        if snap.price < s * (1.0 - margin) {
            return Some(Side::Short);
        }
    }
    None
}

fn trend_strength_entry(
    snap: &IndicatorSnapshot,
    p: &IndicatorParams,
    t: &EntryThresholds,
) -> Option<Side> {
    let (strength, plus_di, minus_di) = adx(snap, p)?;
    let (fast, slow) = emas(snap, p)?;
    let atr = snap.simple(&p.atr())?;

    if strength < t.adx_threshold || snap.price <= 0.0 || atr / snap.price * 100.0 < t.min_atr_pct {
        return None;
    }
    if plus_di > minus_di && fast > slow {
        Some(Side::Long)
    } else if minus_di > plus_di && fast < slow {
        Some(Side::Short)
    } else {
        None
    }
}
