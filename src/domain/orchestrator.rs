//! Fan-out of one tick feed to independent strategy instances.
//!
//! Instances share no mutable state; aggregate checks read their snapshots
//! after each dispatch.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{error, info, warn};

use super::error::EngineError;
use super::metrics::PerformanceSnapshot;
use super::strategy::{ShutdownReport, StrategyInstance, TickEvent};
use super::tick::Tick;

/// Engine-wide settings from the `[engine]` section.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineSettings {
    /// Summed net loss that halts all dispatch; 0 disables.
    pub max_total_loss: f64,
    pub parallel: bool,
    /// Dispatched ticks between snapshot logs; 0 disables.
    pub snapshot_interval: u64,
}

#[derive(Debug)]
pub struct DispatchOutcome {
    pub name: String,
    pub result: Result<Option<TickEvent>, EngineError>,
}

/// Totals summed across every registered instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateSnapshot {
    pub instances: usize,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub total_pnl: f64,
    pub total_fees: f64,
    pub initial_capital: f64,
    pub current_capital: f64,
}

impl AggregateSnapshot {
    pub fn win_rate(&self) -> f64 {
        if self.total_trades == 0 {
            0.0
        } else {
            self.winning_trades as f64 / self.total_trades as f64
        }
    }
}

#[derive(Debug, Default)]
pub struct StrategyOrchestrator {
    settings: EngineSettings,
    instances: Vec<StrategyInstance>,
    dispatched: u64,
    halted: bool,
}

impl StrategyOrchestrator {
    pub fn new(settings: EngineSettings) -> Self {
        StrategyOrchestrator {
            settings,
            ..StrategyOrchestrator::default()
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn register(&mut self, instance: StrategyInstance) -> Result<(), EngineError> {
        if self.instances.iter().any(|i| i.name() == instance.name()) {
            return Err(EngineError::DuplicateInstance {
                name: instance.name().to_string(),
            });
        }
        info!(
            instance = %instance.name(),
            rule = %instance.config().rule,
            warmup = instance.warmup(),
            "strategy registered"
        );
        self.instances.push(instance);
        Ok(())
    }

    pub fn instances(&self) -> &[StrategyInstance] {
        &self.instances
    }

    pub fn instance(&self, name: &str) -> Option<&StrategyInstance> {
        self.instances.iter().find(|i| i.name() == name)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Ticks accepted since construction.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Deliver a tick to every instance in registration order.
    pub fn dispatch(&mut self, tick: &Tick) -> Vec<DispatchOutcome> {
        if self.halted {
            return Vec::new();
        }
        let outcomes = self
            .instances
            .iter_mut()
            .map(|instance| DispatchOutcome {
                name: instance.name().to_string(),
                result: instance.on_tick(tick),
            })
            .collect();
        self.after_dispatch(tick, outcomes)
    }

    /// Same contract as [`dispatch`](Self::dispatch), with instances processed
    /// on the rayon pool. Outcomes keep registration order.
    pub fn dispatch_parallel(&mut self, tick: &Tick) -> Vec<DispatchOutcome> {
        if self.halted {
            return Vec::new();
        }
        let outcomes = self
            .instances
            .par_iter_mut()
            .map(|instance| DispatchOutcome {
                name: instance.name().to_string(),
                result: instance.on_tick(tick),
            })
            .collect();
        self.after_dispatch(tick, outcomes)
    }

    pub fn snapshot_all(&self) -> BTreeMap<String, PerformanceSnapshot> {
        self.instances
            .iter()
            .map(|i| (i.name().to_string(), i.snapshot()))
            .collect()
    }

    pub fn aggregate(&self) -> AggregateSnapshot {
        self.instances
            .iter()
            .map(StrategyInstance::snapshot)
            .fold(
                AggregateSnapshot::default(),
                |mut acc, snap| {
                    acc.instances += 1;
                    acc.total_trades += snap.total_trades;
                    acc.winning_trades += snap.winning_trades;
                    acc.total_pnl += snap.total_pnl;
                    acc.total_fees += snap.total_fees;
                    acc.initial_capital += snap.initial_capital;
                    acc.current_capital += snap.current_capital;
                    acc
                },
            )
    }

    /// Shut every instance down in registration order. A failure in one
    /// instance does not prevent the others from reporting.
    pub fn shutdown(&mut self, liquidate: bool) -> Vec<Result<ShutdownReport, EngineError>> {
        self.instances
            .iter_mut()
            .map(|instance| instance.shutdown(liquidate))
            .collect()
    }

    fn after_dispatch(&mut self, tick: &Tick, outcomes: Vec<DispatchOutcome>) -> Vec<DispatchOutcome> {
        self.dispatched += 1;

        let mut settled = false;
        for outcome in &outcomes {
            match &outcome.result {
                Ok(Some(TickEvent::Exited(_))) => settled = true,
                Err(err) => error!(
                    instance = %outcome.name,
                    timestamp = %tick.timestamp,
                    price = tick.price,
                    error = %err,
                    "tick processing failed"
                ),
                _ => {}
            }
        }

        if settled {
            self.check_kill_switch(tick);
        }
        if self.settings.snapshot_interval > 0
            && self.dispatched % self.settings.snapshot_interval == 0
        {
            self.log_snapshots();
        }
        outcomes
    }

    fn check_kill_switch(&mut self, tick: &Tick) {
        if self.settings.max_total_loss <= 0.0 {
            return;
        }
        let total_pnl = self.aggregate().total_pnl;
        if total_pnl <= -self.settings.max_total_loss {
            self.halted = true;
            warn!(
                timestamp = %tick.timestamp,
                total_pnl,
                max_total_loss = self.settings.max_total_loss,
                "total loss limit reached, dispatch halted"
            );
        }
    }

    fn log_snapshots(&self) {
        for (name, snap) in self.snapshot_all() {
            info!(
                instance = %name,
                ticks = self.dispatched,
                trades = snap.total_trades,
                win_rate = snap.win_rate,
                total_pnl = snap.total_pnl,
                capital = snap.current_capital,
                max_drawdown_pct = snap.max_drawdown_pct,
                "performance snapshot"
            );
        }
    }
}
