//! streamtrader: per-instrument streaming strategy execution engine.
//!
//! Hexagonal architecture: the engine (indicators, signal rules, positions,
//! risk, PnL, metrics, orchestration) lives in [`domain`], port traits in
//! [`ports`], and concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
