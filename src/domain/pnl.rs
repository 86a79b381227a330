//! Fee-aware PnL settlement.
//!
//! position_value = size × entry_price
//! raw_pnl        = position_value × signed price change × leverage
//! fees           = position_value × (|maker| + |taker|)
//! net_pnl        = raw_pnl − fees
//!
//! Entry is assumed to fill as maker and exit as taker; fees are charged on
//! every settlement regardless of which trigger closed the position.

use chrono::{DateTime, Utc};

use super::error::EngineError;
use super::position::{ExitReason, OpenPosition, Side};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSchedule {
    pub maker_fee: f64,
    pub taker_fee: f64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        FeeSchedule {
            maker_fee: -0.0002,
            taker_fee: 0.0005,
        }
    }
}

impl FeeSchedule {
    pub fn round_trip_rate(&self) -> f64 {
        self.maker_fee.abs() + self.taker_fee.abs()
    }
}

/// A completed entry → exit cycle. Never mutated after settlement.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Trade {
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub size: f64,
    pub leverage: f64,
    /// Unleveraged favorable price move, in percent.
    pub raw_pnl_pct: f64,
    pub raw_pnl: f64,
    pub fees_paid: f64,
    pub net_pnl: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.net_pnl > 0.0
    }
}

/// Mark-to-market view of a position that is still open.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UnrealizedTrade {
    pub side: Side,
    pub entry_price: f64,
    pub mark_price: f64,
    pub entry_time: DateTime<Utc>,
    pub size: f64,
    pub leverage: f64,
    pub raw_pnl_pct: f64,
    pub raw_pnl: f64,
    /// Fees that would be charged if the position closed at `mark_price`.
    pub fees_due: f64,
    pub net_pnl: f64,
}

#[derive(Debug, Clone, Copy)]
struct Breakdown {
    raw_pnl_pct: f64,
    raw_pnl: f64,
    fees: f64,
    net_pnl: f64,
}

#[derive(Debug, Clone)]
pub struct PnlAccountant {
    instance: String,
    fees: FeeSchedule,
}

impl PnlAccountant {
    pub fn new(instance: impl Into<String>, fees: FeeSchedule) -> Self {
        PnlAccountant {
            instance: instance.into(),
            fees,
        }
    }

    /// Settle a position that has already been taken out of the position manager.
    pub fn settle(
        &self,
        position: OpenPosition,
        exit_price: f64,
        exit_time: DateTime<Utc>,
        reason: ExitReason,
    ) -> Result<Trade, EngineError> {
        let b = self.breakdown(&position, exit_price)?;
        Ok(Trade {
            side: position.side,
            entry_price: position.entry_price,
            exit_price,
            entry_time: position.entry_time,
            exit_time,
            size: position.size,
            leverage: position.leverage,
            raw_pnl_pct: b.raw_pnl_pct,
            raw_pnl: b.raw_pnl,
            fees_paid: b.fees,
            net_pnl: b.net_pnl,
            exit_reason: reason,
        })
    }

    pub fn unrealized(
        &self,
        position: &OpenPosition,
        mark_price: f64,
    ) -> Result<UnrealizedTrade, EngineError> {
        let b = self.breakdown(position, mark_price)?;
        Ok(UnrealizedTrade {
            side: position.side,
            entry_price: position.entry_price,
            mark_price,
            entry_time: position.entry_time,
            size: position.size,
            leverage: position.leverage,
            raw_pnl_pct: b.raw_pnl_pct,
            raw_pnl: b.raw_pnl,
            fees_due: b.fees,
            net_pnl: b.net_pnl,
        })
    }

    fn breakdown(&self, position: &OpenPosition, exit_price: f64) -> Result<Breakdown, EngineError> {
        if !position.entry_price.is_finite() || position.entry_price <= 0.0 {
            return Err(self.fault(format!(
                "entry price {} is not a positive number",
                position.entry_price
            )));
        }
        if !position.size.is_finite() || !position.leverage.is_finite() {
            return Err(self.fault("position size or leverage is not finite"));
        }
        if !exit_price.is_finite() {
            return Err(self.fault(format!("exit price {exit_price} is not finite")));
        }

        let position_value = position.size * position.entry_price;
        let raw_pnl_pct = position.price_change_pct(exit_price);
        let raw_pnl = position_value * (raw_pnl_pct / 100.0) * position.leverage;
        let fees = position_value * self.fees.round_trip_rate();
        let net_pnl = raw_pnl - fees;

        if !net_pnl.is_finite() {
            return Err(self.fault("net PnL is not finite"));
        }
        Ok(Breakdown {
            raw_pnl_pct,
            raw_pnl,
            fees,
            net_pnl,
        })
    }

    fn fault(&self, reason: impl Into<String>) -> EngineError {
        EngineError::Settlement {
            instance: self.instance.clone(),
            reason: reason.into(),
        }
    }
}
