//! Momentum as rate of change.
//!
//! ROC(n) = ((P[i] - P[i-n]) / P[i-n]) * 100
//! If P[i-n] == 0: ROC = 0
//! Warmup: n + 1 observations.

use super::stddev::RollingWindow;

#[derive(Debug, Clone)]
pub struct Momentum {
    prices: RollingWindow,
}

impl Momentum {
    pub fn new(period: usize) -> Self {
        Momentum {
            prices: RollingWindow::new(period.max(1) + 1),
        }
    }

    pub fn update(&mut self, price: f64) -> Option<f64> {
        self.prices.push(price);
        if !self.prices.is_full() {
            return None;
        }
        let prev = self.prices.oldest()?;
        if prev == 0.0 {
            return Some(0.0);
        }
        Some((price - prev) / prev * 100.0)
    }
}
