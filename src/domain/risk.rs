//! Risk throttles: daily loss cutoff, consecutive-loss streak, position sizing.

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskConfig {
    /// Daily loss limit as a percent of initial capital; 0 disables it.
    pub max_daily_loss_pct: f64,
    pub loss_streak_cutoff: u32,
    /// Fraction of capital committed per entry, before leverage.
    pub position_size: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            max_daily_loss_pct: 5.0,
            loss_streak_cutoff: 3,
            position_size: 0.2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskState {
    pub daily_loss: f64,
    pub last_reset_date: Option<NaiveDate>,
    pub consecutive_losses: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskRejection {
    DailyLossLimit,
    LossStreak,
}

impl fmt::Display for RiskRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskRejection::DailyLossLimit => write!(f, "daily loss limit reached"),
            RiskRejection::LossStreak => write!(f, "consecutive loss cutoff reached"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RiskController {
    config: RiskConfig,
    max_daily_loss: f64,
    state: RiskState,
}

impl RiskController {
    pub fn new(config: RiskConfig, initial_capital: f64) -> Self {
        RiskController {
            config,
            max_daily_loss: initial_capital * config.max_daily_loss_pct / 100.0,
            state: RiskState::default(),
        }
    }

    pub fn state(&self) -> &RiskState {
        &self.state
    }

    /// Daily loss limit in account currency.
    pub fn max_daily_loss(&self) -> f64 {
        self.max_daily_loss
    }

    /// Zero the daily loss when `date` differs from the last reset date.
    /// Returns true when a reset happened; the first observed date only seeds.
    pub fn roll_day(&mut self, date: NaiveDate) -> bool {
        match self.state.last_reset_date {
            Some(last) if last == date => false,
            Some(_) => {
                self.state.daily_loss = 0.0;
                self.state.last_reset_date = Some(date);
                true
            }
            None => {
                self.state.last_reset_date = Some(date);
                false
            }
        }
    }

    pub fn check(&self) -> Result<(), RiskRejection> {
        if self.max_daily_loss > 0.0 && self.state.daily_loss <= -self.max_daily_loss {
            return Err(RiskRejection::DailyLossLimit);
        }
        if self.state.consecutive_losses >= self.config.loss_streak_cutoff {
            return Err(RiskRejection::LossStreak);
        }
        Ok(())
    }

    /// Quantity for a new entry: position_size * capital * leverage / price.
    pub fn position_quantity(
        &self,
        capital: f64,
        leverage: f64,
        price: f64,
    ) -> Result<f64, RiskRejection> {
        self.check()?;
        if price <= 0.0 || capital <= 0.0 {
            return Ok(0.0);
        }
        Ok(self.config.position_size * capital * leverage / price)
    }

    /// Sizing with rejections collapsed to zero.
    pub fn size_position(&self, capital: f64, leverage: f64, price: f64) -> f64 {
        self.position_quantity(capital, leverage, price).unwrap_or(0.0)
    }

    pub fn record_close(&mut self, net_pnl: f64) {
        self.state.daily_loss += net_pnl;
        if net_pnl < 0.0 {
            self.state.consecutive_losses += 1;
        } else if net_pnl > 0.0 {
            self.state.consecutive_losses = 0;
        }
    }
}
