//! Performance metrics folded from the trade ledger.

use std::collections::BTreeMap;

use super::pnl::Trade;
use super::position::ExitReason;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PerformanceSnapshot {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_pnl: f64,
    pub total_fees: f64,
    /// Fraction of trades with positive net PnL.
    pub win_rate: f64,
    pub initial_capital: f64,
    pub current_capital: f64,
    pub roi_pct: f64,
    /// Largest peak-to-trough decline of the settlement capital curve, in percent.
    pub max_drawdown_pct: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_trade_duration_secs: f64,
    pub exits_by_reason: BTreeMap<ExitReason, usize>,
}

/// Append-only trade ledger for one strategy instance.
#[derive(Debug, Clone)]
pub struct PerformanceTracker {
    initial_capital: f64,
    trades: Vec<Trade>,
}

impl PerformanceTracker {
    pub fn new(initial_capital: f64) -> Self {
        PerformanceTracker {
            initial_capital,
            trades: Vec::new(),
        }
    }

    pub fn record(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    /// Capital after every recorded settlement.
    pub fn current_capital(&self) -> f64 {
        self.initial_capital + self.trades.iter().map(|t| t.net_pnl).sum::<f64>()
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut total_pnl = 0.0_f64;
        let mut total_fees = 0.0_f64;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_duration_secs = 0i64;
        let mut exits_by_reason = BTreeMap::new();

        for trade in &self.trades {
            let pnl = trade.net_pnl;
            total_pnl += pnl;
            total_fees += trade.fees_paid;
            if pnl > 0.0 {
                winning_trades += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                losing_trades += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            }
            total_duration_secs += (trade.exit_time - trade.entry_time).num_seconds();
            *exits_by_reason.entry(trade.exit_reason).or_insert(0) += 1;
        }

        let total_trades = self.trades.len();
        let win_rate = ratio(winning_trades as f64, total_trades as f64);
        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let current_capital = self.initial_capital + total_pnl;
        let roi_pct = ratio(total_pnl, self.initial_capital) * 100.0;

        PerformanceSnapshot {
            total_trades,
            winning_trades,
            losing_trades,
            total_pnl,
            total_fees,
            win_rate,
            initial_capital: self.initial_capital,
            current_capital,
            roi_pct,
            max_drawdown_pct: compute_drawdown(self.initial_capital, &self.trades) * 100.0,
            profit_factor,
            avg_win: ratio(total_wins, winning_trades as f64),
            avg_loss: ratio(total_losses, losing_trades as f64),
            largest_win,
            largest_loss,
            avg_trade_duration_secs: ratio(total_duration_secs as f64, total_trades as f64),
            exits_by_reason,
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Largest fractional decline from the running capital peak, walking the
/// settlements in order. The peak starts at initial capital and only rises.
fn compute_drawdown(initial_capital: f64, trades: &[Trade]) -> f64 {
    let mut capital = initial_capital;
    let mut peak = initial_capital;
    let mut max_dd = 0.0_f64;

    for trade in trades {
        capital += trade.net_pnl;
        if capital > peak {
            peak = capital;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - capital) / peak);
        }
    }

    max_dd
}
