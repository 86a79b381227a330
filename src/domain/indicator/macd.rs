//! MACD (Moving Average Convergence Divergence).
//!
//! MACD line = EMA(fast) - EMA(slow)
//! Signal = EMA(signal) of the MACD line, fed from the first observation
//! Histogram = MACD line - Signal
//! Warmup: slow observations.

use super::ema::Ema;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdReading {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    warmup: usize,
    seen: usize,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Macd {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
            warmup: slow.max(1),
            seen: 0,
        }
    }

    pub fn update(&mut self, price: f64) -> Option<MacdReading> {
        let line = self.fast.next(price) - self.slow.next(price);
        let signal = self.signal.next(line);
        self.seen += 1;

        (self.seen >= self.warmup).then_some(MacdReading {
            line,
            signal,
            histogram: line - signal,
        })
    }
}
