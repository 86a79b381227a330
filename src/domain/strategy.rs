//! Strategy instance: one parameter set bound to its own indicator pipeline,
//! position, risk state and trade ledger.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use super::error::EngineError;
use super::indicator::pipeline::{IndicatorPipeline, Readiness};
use super::metrics::{PerformanceSnapshot, PerformanceTracker};
use super::pnl::{FeeSchedule, PnlAccountant, Trade, UnrealizedTrade};
use super::position::{ExitReason, ExitRules, OpenPosition, PositionManager, PositionState, Side};
use super::risk::{RiskConfig, RiskController, RiskRejection, RiskState};
use super::signal::{EntryThresholds, IndicatorParams, SignalRule};
use super::tick::Tick;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub name: String,
    pub rule: SignalRule,
    pub initial_capital: f64,
    pub leverage: f64,
    pub indicators: IndicatorParams,
    pub entry: EntryThresholds,
    pub risk: RiskConfig,
    pub exit: ExitRules,
    pub fees: FeeSchedule,
    /// Minimum seconds between a close and the next entry.
    pub cooldown_secs: u64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            name: "default".to_string(),
            rule: SignalRule::EmaCrossover,
            initial_capital: 1000.0,
            leverage: 10.0,
            indicators: IndicatorParams::default(),
            entry: EntryThresholds::default(),
            risk: RiskConfig::default(),
            exit: ExitRules::default(),
            fees: FeeSchedule::default(),
            cooldown_secs: 0,
        }
    }
}

/// What an instance did with one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickEvent {
    Entered { side: Side, price: f64, size: f64 },
    Exited(Trade),
    RiskRejected { side: Side, reason: RiskRejection },
}

#[derive(Debug, Clone)]
pub struct ShutdownReport {
    pub name: String,
    /// Open position left in place, marked at the last seen price.
    pub unrealized: Option<UnrealizedTrade>,
    /// Position closed on request at the last seen price.
    pub liquidated: Option<Trade>,
    pub snapshot: PerformanceSnapshot,
}

#[derive(Debug, Clone)]
pub struct StrategyInstance {
    config: StrategyConfig,
    pipeline: IndicatorPipeline,
    positions: PositionManager,
    risk: RiskController,
    accountant: PnlAccountant,
    tracker: PerformanceTracker,
    warmed_up: bool,
    last_tick: Option<(DateTime<Utc>, f64)>,
    last_exit: Option<DateTime<Utc>>,
}

impl StrategyInstance {
    pub fn new(config: StrategyConfig) -> Self {
        let kinds = config.rule.required_indicators(&config.indicators);
        StrategyInstance {
            pipeline: IndicatorPipeline::new(&kinds),
            positions: PositionManager::new(config.exit),
            risk: RiskController::new(config.risk, config.initial_capital),
            accountant: PnlAccountant::new(config.name.clone(), config.fees),
            tracker: PerformanceTracker::new(config.initial_capital),
            warmed_up: false,
            last_tick: None,
            last_exit: None,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Ticks needed before the first signal evaluation.
    pub fn warmup(&self) -> usize {
        self.pipeline.warmup()
    }

    pub fn position(&self) -> &PositionState {
        self.positions.state()
    }

    pub fn trades(&self) -> &[Trade] {
        self.tracker.trades()
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        self.tracker.snapshot()
    }

    pub fn risk_state(&self) -> &RiskState {
        self.risk.state()
    }

    pub fn capital(&self) -> f64 {
        self.tracker.current_capital()
    }

    pub fn on_tick(&mut self, tick: &Tick) -> Result<Option<TickEvent>, EngineError> {
        if self.risk.roll_day(tick.date()) {
            debug!(instance = %self.config.name, date = %tick.date(), "daily loss reset");
        }
        self.last_tick = Some((tick.timestamp, tick.price));

        let readiness = self.pipeline.update(tick);
        let snapshot = match readiness {
            Readiness::Ready(snapshot) => {
                if !self.warmed_up {
                    self.warmed_up = true;
                    debug!(instance = %self.config.name, timestamp = %tick.timestamp, "indicators warmed up");
                }
                Some(snapshot)
            }
            Readiness::NotReady { .. } => None,
        };

        if self.positions.is_open() {
            self.positions.mark(tick.price);
            let (rule, params, thresholds) =
                (self.config.rule, &self.config.indicators, &self.config.entry);
            let reason = self.positions.should_exit(tick.price, |side| {
                snapshot
                    .as_ref()
                    .is_some_and(|snap| rule.reversal(snap, side, params, thresholds))
            });
            let Some(reason) = reason else {
                return Ok(None);
            };
            return match self.positions.take() {
                Some(position) => self
                    .close(position, tick.price, tick.timestamp, reason)
                    .map(|trade| Some(TickEvent::Exited(trade))),
                None => Ok(None),
            };
        }

        let Some(snapshot) = snapshot else {
            return Ok(None);
        };
        if self.cooling_down(tick.timestamp) {
            return Ok(None);
        }
        let Some(side) = self
            .config
            .rule
            .entry(&snapshot, &self.config.indicators, &self.config.entry)
        else {
            return Ok(None);
        };

        let size = match self
            .risk
            .position_quantity(self.capital(), self.config.leverage, tick.price)
        {
            Ok(size) => size,
            Err(reason) => {
                debug!(
                    instance = %self.config.name,
                    timestamp = %tick.timestamp,
                    price = tick.price,
                    %side,
                    %reason,
                    "entry rejected by risk controls"
                );
                return Ok(Some(TickEvent::RiskRejected { side, reason }));
            }
        };

        if !self
            .positions
            .try_enter(side, tick.price, size, self.config.leverage, tick.timestamp)
        {
            return Ok(None);
        }
        info!(
            instance = %self.config.name,
            timestamp = %tick.timestamp,
            price = tick.price,
            size,
            %side,
            "position opened"
        );
        Ok(Some(TickEvent::Entered {
            side,
            price: tick.price,
            size,
        }))
    }

    /// Stop the instance. An open position is reported as unrealized unless
    /// `liquidate` is set, in which case it is settled at the last seen price.
    pub fn shutdown(&mut self, liquidate: bool) -> Result<ShutdownReport, EngineError> {
        let mut unrealized = None;
        let mut liquidated = None;

        if liquidate {
            if let Some(position) = self.positions.take() {
                let (time, price) = self
                    .last_tick
                    .unwrap_or((position.entry_time, position.entry_price));
                liquidated = Some(self.close(position, price, time, ExitReason::Liquidation)?);
            }
        } else if let Some(open) = self.positions.open() {
            let price = self.last_tick.map_or(open.entry_price, |(_, price)| price);
            unrealized = Some(self.accountant.unrealized(open, price)?);
        }

        Ok(ShutdownReport {
            name: self.config.name.clone(),
            unrealized,
            liquidated,
            snapshot: self.snapshot(),
        })
    }

    fn cooling_down(&self, now: DateTime<Utc>) -> bool {
        let Some(last) = self.last_exit else {
            return false;
        };
        let elapsed_ms = (now - last).num_milliseconds();
        elapsed_ms < 0 || (elapsed_ms as u64) < self.config.cooldown_secs.saturating_mul(1000)
    }

    /// Settle a position already taken out of the manager, so the instance is
    /// FLAT whether or not settlement succeeds.
    fn close(
        &mut self,
        position: OpenPosition,
        price: f64,
        time: DateTime<Utc>,
        reason: ExitReason,
    ) -> Result<Trade, EngineError> {
        self.last_exit = Some(time);
        let side = position.side;
        match self.accountant.settle(position, price, time, reason) {
            Ok(trade) => {
                self.risk.record_close(trade.net_pnl);
                info!(
                    instance = %self.config.name,
                    timestamp = %time,
                    price,
                    %side,
                    reason = %reason,
                    net_pnl = trade.net_pnl,
                    fees = trade.fees_paid,
                    "position closed"
                );
                self.tracker.record(trade.clone());
                Ok(trade)
            }
            Err(err) => {
                error!(
                    instance = %self.config.name,
                    timestamp = %time,
                    price,
                    %side,
                    error = %err,
                    "settlement failed, position reset to flat"
                );
                Err(err)
            }
        }
    }
}
