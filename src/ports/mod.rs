//! Traits at the engine's I/O seams.

pub mod config_port;
pub mod tick_port;
