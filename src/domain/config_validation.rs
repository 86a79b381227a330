//! Configuration loading and validation.
//!
//! Turns `[engine]` and `[strategy.<name>]` sections into an [`EngineConfig`]
//! before any tick is dispatched. Absent keys take their defaults; present
//! keys must parse and satisfy their range checks.

use crate::domain::error::EngineError;
use crate::domain::indicator::levels::MIN_LOOKBACK;
use crate::domain::orchestrator::EngineSettings;
use crate::domain::pnl::FeeSchedule;
use crate::domain::position::ExitRules;
use crate::domain::risk::RiskConfig;
use crate::domain::signal::{EntryThresholds, IndicatorParams, SignalRule};
use crate::domain::strategy::StrategyConfig;
use crate::ports::config_port::ConfigPort;

pub const ENGINE_SECTION: &str = "engine";
pub const STRATEGY_PREFIX: &str = "strategy.";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub settings: EngineSettings,
    pub strategies: Vec<StrategyConfig>,
}

pub fn load_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, EngineError> {
    let settings = validate_engine_settings(config)?;

    let strategies = config
        .sections()
        .iter()
        .filter(|s| s.starts_with(STRATEGY_PREFIX))
        .map(|section| validate_strategy_config(config, section))
        .collect::<Result<Vec<_>, _>>()?;

    if strategies.is_empty() {
        return Err(EngineError::ConfigMissing {
            section: format!("{STRATEGY_PREFIX}<name>"),
            key: "rule".to_string(),
        });
    }
    Ok(EngineConfig {
        settings,
        strategies,
    })
}

pub fn validate_engine_settings(config: &dyn ConfigPort) -> Result<EngineSettings, EngineError> {
    let engine = SectionReader::new(config, ENGINE_SECTION);
    Ok(EngineSettings {
        max_total_loss: engine.non_negative("max_total_loss", 0.0)?,
        parallel: engine.flag("parallel", false)?,
        snapshot_interval: engine.count("snapshot_interval", 0)?,
    })
}

/// Build one strategy from its `[strategy.<name>]` section.
pub fn validate_strategy_config(
    config: &dyn ConfigPort,
    section: &str,
) -> Result<StrategyConfig, EngineError> {
    let name = section
        .strip_prefix(STRATEGY_PREFIX)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| EngineError::invalid(section, "name", "strategy section needs a name"))?;
    let s = SectionReader::new(config, section);

    let rule = validate_rule(config, section)?;
    let initial_capital = s.double("initial_capital", 1000.0)?;
    if initial_capital <= 0.0 {
        return Err(EngineError::invalid(
            section,
            "initial_capital",
            "initial_capital must be positive",
        ));
    }

    let strategy = StrategyConfig {
        name: name.to_string(),
        rule,
        initial_capital,
        leverage: s.double("leverage", 10.0)?,
        indicators: read_indicator_params(&s)?,
        entry: read_entry_thresholds(&s)?,
        risk: RiskConfig {
            max_daily_loss_pct: s.non_negative("max_daily_loss_pct", 5.0)?,
            loss_streak_cutoff: s.count("loss_streak_cutoff", 3)?.try_into().map_err(|_| {
                EngineError::invalid(section, "loss_streak_cutoff", "loss_streak_cutoff is too large")
            })?,
            position_size: s.double("position_size", 0.2)?,
        },
        exit: ExitRules {
            profit_target_pct: s.non_negative("profit_target_pct", 1.0)?,
            stop_loss_pct: s.non_negative("stop_loss_pct", 0.5)?,
            trailing_stop_pct: s.non_negative("trailing_stop_pct", 0.0)?,
        },
        fees: FeeSchedule {
            maker_fee: s.double("maker_fee", -0.0002)?,
            taker_fee: s.double("taker_fee", 0.0005)?,
        },
        cooldown_secs: s.count("cooldown_secs", 0)?,
    };

    validate_periods(section, &strategy.indicators)?;
    validate_thresholds(section, &strategy.entry)?;
    validate_leverage(section, strategy.leverage)?;
    validate_risk(section, &strategy.risk)?;
    validate_fees(section, &strategy.fees)?;
    Ok(strategy)
}

fn validate_rule(config: &dyn ConfigPort, section: &str) -> Result<SignalRule, EngineError> {
    match config.get_string(section, "rule") {
        Some(raw) if !raw.trim().is_empty() => raw
            .parse::<SignalRule>()
            .map_err(|reason| EngineError::invalid(section, "rule", reason)),
        _ => Err(EngineError::ConfigMissing {
            section: section.to_string(),
            key: "rule".to_string(),
        }),
    }
}

fn read_indicator_params(s: &SectionReader<'_>) -> Result<IndicatorParams, EngineError> {
    Ok(IndicatorParams {
        ema_fast: s.period("ema_fast", 8)?,
        ema_slow: s.period("ema_slow", 21)?,
        rsi_period: s.period("rsi_period", 14)?,
        macd_fast: s.period("macd_fast", 12)?,
        macd_slow: s.period("macd_slow", 26)?,
        macd_signal: s.period("macd_signal", 9)?,
        bollinger_period: s.period("bollinger_period", 20)?,
        bollinger_stddev: s.double("bollinger_stddev", 2.0)?,
        atr_period: s.period("atr_period", 14)?,
        adx_period: s.period("adx_period", 14)?,
        volume_period: s.period("volume_period", 20)?,
        level_lookback: s.period("level_lookback", 100)?,
        level_merge_pct: s.non_negative("level_merge_pct", 0.2)?,
        level_volume_confirm: s.flag("level_volume_confirm", false)?,
        profile_window: s.period("profile_window", 30)?,
        profile_buckets: s.period("profile_buckets", 50)?,
    })
}

fn read_entry_thresholds(s: &SectionReader<'_>) -> Result<EntryThresholds, EngineError> {
    Ok(EntryThresholds {
        rsi_oversold: s.double("rsi_oversold", 30.0)?,
        rsi_overbought: s.double("rsi_overbought", 70.0)?,
        volume_surge: s.non_negative("volume_surge", 2.0)?,
        breakout_pct: s.non_negative("breakout_pct", 0.15)?,
        adx_threshold: s.non_negative("adx_threshold", 25.0)?,
        min_move_pct: s.non_negative("min_move_pct", 0.05)?,
        min_atr_pct: s.non_negative("min_atr_pct", 0.0)?,
    })
}

fn validate_periods(section: &str, p: &IndicatorParams) -> Result<(), EngineError> {
    if p.ema_fast >= p.ema_slow {
        return Err(EngineError::invalid(
            section,
            "ema_fast",
            "ema_fast must be less than ema_slow",
        ));
    }
    if p.macd_fast >= p.macd_slow {
        return Err(EngineError::invalid(
            section,
            "macd_fast",
            "macd_fast must be less than macd_slow",
        ));
    }
    if p.level_lookback < MIN_LOOKBACK {
        return Err(EngineError::invalid(
            section,
            "level_lookback",
            format!("level_lookback must be at least {MIN_LOOKBACK}"),
        ));
    }
    if p.bollinger_stddev <= 0.0 {
        return Err(EngineError::invalid(
            section,
            "bollinger_stddev",
            "bollinger_stddev must be positive",
        ));
    }
    Ok(())
}

fn validate_thresholds(section: &str, t: &EntryThresholds) -> Result<(), EngineError> {
    if t.rsi_oversold < 0.0 {
        return Err(EngineError::invalid(
            section,
            "rsi_oversold",
            "rsi_oversold must be between 0 and 100",
        ));
    }
    if t.rsi_overbought > 100.0 {
        return Err(EngineError::invalid(
            section,
            "rsi_overbought",
            "rsi_overbought must be between 0 and 100",
        ));
    }
    if t.rsi_oversold >= t.rsi_overbought {
        return Err(EngineError::invalid(
            section,
            "rsi_oversold",
            "rsi_oversold must be less than rsi_overbought",
        ));
    }
    if t.adx_threshold > 100.0 {
        return Err(EngineError::invalid(
            section,
            "adx_threshold",
            "adx_threshold must be between 0 and 100",
        ));
    }
    Ok(())
}

fn validate_leverage(section: &str, leverage: f64) -> Result<(), EngineError> {
    if leverage < 1.0 {
        return Err(EngineError::invalid(
            section,
            "leverage",
            "leverage must be at least 1",
        ));
    }
    Ok(())
}

fn validate_risk(section: &str, risk: &RiskConfig) -> Result<(), EngineError> {
    if risk.position_size <= 0.0 || risk.position_size > 1.0 {
        return Err(EngineError::invalid(
            section,
            "position_size",
            "position_size must be between 0 and 1",
        ));
    }
    if risk.loss_streak_cutoff < 1 {
        return Err(EngineError::invalid(
            section,
            "loss_streak_cutoff",
            "loss_streak_cutoff must be at least 1",
        ));
    }
    Ok(())
}

fn validate_fees(section: &str, fees: &FeeSchedule) -> Result<(), EngineError> {
    for (key, rate) in [("maker_fee", fees.maker_fee), ("taker_fee", fees.taker_fee)] {
        if rate.abs() >= 1.0 {
            return Err(EngineError::invalid(
                section,
                key,
                format!("{key} is a fraction and must be between -1 and 1"),
            ));
        }
    }
    Ok(())
}

/// Typed reads from one section. Absent keys yield the default; present
/// keys that fail to parse are `ConfigInvalid`.
struct SectionReader<'a> {
    config: &'a dyn ConfigPort,
    section: &'a str,
}

impl<'a> SectionReader<'a> {
    fn new(config: &'a dyn ConfigPort, section: &'a str) -> Self {
        SectionReader { config, section }
    }

    fn raw(&self, key: &str) -> Option<String> {
        self.config
            .get_string(self.section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn double(&self, key: &str, default: f64) -> Result<f64, EngineError> {
        let Some(raw) = self.raw(key) else {
            return Ok(default);
        };
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(EngineError::invalid(
                self.section,
                key,
                format!("'{raw}' is not a number"),
            )),
        }
    }

    fn non_negative(&self, key: &str, default: f64) -> Result<f64, EngineError> {
        let value = self.double(key, default)?;
        if value < 0.0 {
            return Err(EngineError::invalid(
                self.section,
                key,
                format!("{key} must be non-negative"),
            ));
        }
        Ok(value)
    }

    fn count(&self, key: &str, default: u64) -> Result<u64, EngineError> {
        let Some(raw) = self.raw(key) else {
            return Ok(default);
        };
        raw.parse::<u64>().map_err(|_| {
            EngineError::invalid(
                self.section,
                key,
                format!("{key} must be a non-negative integer, got '{raw}'"),
            )
        })
    }

    fn period(&self, key: &str, default: usize) -> Result<usize, EngineError> {
        let value = self.count(key, default as u64)?;
        if value < 1 {
            return Err(EngineError::invalid(
                self.section,
                key,
                format!("{key} must be at least 1"),
            ));
        }
        usize::try_from(value)
            .map_err(|_| EngineError::invalid(self.section, key, format!("{key} is too large")))
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, EngineError> {
        self.config
            .get_bool(self.section, key)
            .map(|v| v.unwrap_or(default))
            .map_err(|reason| EngineError::invalid(self.section, key, reason))
    }
}
