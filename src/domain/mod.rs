//! Core engine types and logic.

pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod orchestrator;
pub mod pnl;
pub mod position;
pub mod risk;
pub mod signal;
pub mod strategy;
pub mod tick;
