//! Position lifecycle: FLAT → OPEN → FLAT, with trailing extremes and ordered
//! exit-trigger evaluation.

use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ExitReason {
    ProfitTarget,
    StopLoss,
    TrailingStop,
    SignalReversal,
    Liquidation,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExitReason::ProfitTarget => "Profit Target",
            ExitReason::StopLoss => "Stop Loss",
            ExitReason::TrailingStop => "Trailing Stop",
            ExitReason::SignalReversal => "Signal Reversal",
            ExitReason::Liquidation => "Liquidation",
        };
        f.pad(name)
    }
}

/// Exit triggers checked every tick, first match wins.
pub const EXIT_PRECEDENCE: [ExitReason; 4] = [
    ExitReason::ProfitTarget,
    ExitReason::StopLoss,
    ExitReason::TrailingStop,
    ExitReason::SignalReversal,
];

/// Exit thresholds in percent of entry price (unleveraged). Zero disables a trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitRules {
    pub profit_target_pct: f64,
    pub stop_loss_pct: f64,
    pub trailing_stop_pct: f64,
}

impl Default for ExitRules {
    fn default() -> Self {
        ExitRules {
            profit_target_pct: 1.0,
            stop_loss_pct: 0.5,
            trailing_stop_pct: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub side: Side,
    pub entry_price: f64,
    pub size: f64,
    pub leverage: f64,
    pub entry_time: DateTime<Utc>,
    pub highest: f64,
    pub lowest: f64,
}

impl OpenPosition {
    /// Favorable price move since entry in percent, unleveraged.
    pub fn price_change_pct(&self, price: f64) -> f64 {
        self.side.sign() * (price - self.entry_price) / self.entry_price * 100.0
    }

    /// Trailing exit boundary from the best price seen; `None` when disabled.
    pub fn trailing_boundary(&self, trailing_stop_pct: f64) -> Option<f64> {
        if trailing_stop_pct <= 0.0 {
            return None;
        }
        let fraction = trailing_stop_pct / 100.0;
        Some(match self.side {
            Side::Long => self.highest * (1.0 - fraction),
            Side::Short => self.lowest * (1.0 + fraction),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PositionState {
    #[default]
    Flat,
    Open(OpenPosition),
}

#[derive(Debug, Clone)]
pub struct PositionManager {
    state: PositionState,
    rules: ExitRules,
}

impl PositionManager {
    pub fn new(rules: ExitRules) -> Self {
        PositionManager {
            state: PositionState::Flat,
            rules,
        }
    }

    pub fn state(&self) -> &PositionState {
        &self.state
    }

    pub fn open(&self) -> Option<&OpenPosition> {
        match &self.state {
            PositionState::Open(position) => Some(position),
            PositionState::Flat => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PositionState::Open(_))
    }

    /// Open a position. Rejected while already open or when sizing was denied.
    pub fn try_enter(
        &mut self,
        side: Side,
        price: f64,
        size_hint: f64,
        leverage: f64,
        timestamp: DateTime<Utc>,
    ) -> bool {
        if self.is_open() || !size_hint.is_finite() || size_hint <= 0.0 {
            return false;
        }
        self.state = PositionState::Open(OpenPosition {
            side,
            entry_price: price,
            size: size_hint,
            leverage,
            entry_time: timestamp,
            highest: price,
            lowest: price,
        });
        true
    }

    /// Fold the latest price into the trailing extremes.
    pub fn mark(&mut self, price: f64) {
        if let PositionState::Open(position) = &mut self.state {
            position.highest = position.highest.max(price);
            position.lowest = position.lowest.min(price);
        }
    }

    pub fn trailing_boundary(&self) -> Option<f64> {
        self.open()
            .and_then(|p| p.trailing_boundary(self.rules.trailing_stop_pct))
    }

    /// Evaluate exit triggers in [`EXIT_PRECEDENCE`] order. `reversal` is only
    /// consulted when no price-based trigger fired.
    pub fn should_exit<F>(&self, price: f64, mut reversal: F) -> Option<ExitReason>
    where
        F: FnMut(Side) -> bool,
    {
        let position = self.open()?;
        let change = position.price_change_pct(price);

        EXIT_PRECEDENCE.into_iter().find(|reason| match reason {
            ExitReason::ProfitTarget => {
                self.rules.profit_target_pct > 0.0 && change >= self.rules.profit_target_pct
            }
            ExitReason::StopLoss => {
                self.rules.stop_loss_pct > 0.0 && change <= -self.rules.stop_loss_pct
            }
            ExitReason::TrailingStop => match position.trailing_boundary(self.rules.trailing_stop_pct) {
                Some(boundary) => match position.side {
                    Side::Long => price <= boundary,
                    Side::Short => price >= boundary,
                },
                None => false,
            },
            ExitReason::SignalReversal => reversal(position.side),
            ExitReason::Liquidation => false,
        })
    }

    /// Reset to FLAT, handing back the position that was open.
    pub fn take(&mut self) -> Option<OpenPosition> {
        match std::mem::take(&mut self.state) {
            PositionState::Open(position) => Some(position),
            PositionState::Flat => None,
        }
    }
}
