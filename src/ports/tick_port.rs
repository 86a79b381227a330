//! Market-data feed port.

use crate::domain::error::EngineError;
use crate::domain::tick::Tick;

/// A finite or unbounded sequence of ticks in non-decreasing timestamp order.
///
/// Implementations filter malformed and out-of-order ticks, reporting them as
/// [`EngineError::Feed`]; anything yielded as `Ok` is dispatched as-is.
pub trait TickSource: Iterator<Item = Result<Tick, EngineError>> {}

impl<T> TickSource for T where T: Iterator<Item = Result<Tick, EngineError>> {}
