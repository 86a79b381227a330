//! Relative Strength Index.
//!
//! Simple rolling averages over the last n price deltas:
//!   avg_gain = mean(max(delta, 0)), avg_loss = mean(max(-delta, 0))
//!   RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! When avg_loss == 0, RSI = 100.
//! Warmup: n deltas, i.e. n + 1 prices.

use super::stddev::RollingWindow;

#[derive(Debug, Clone)]
pub struct Rsi {
    prev: Option<f64>,
    deltas: RollingWindow,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Rsi {
            prev: None,
            deltas: RollingWindow::new(period),
        }
    }

    pub fn update(&mut self, price: f64) -> Option<f64> {
        if let Some(prev) = self.prev {
            self.deltas.push(price - prev);
        }
        self.prev = Some(price);

        if !self.deltas.is_full() {
            return None;
        }

        let n = self.deltas.len() as f64;
        let avg_gain = self.deltas.iter().map(|d| d.max(0.0)).sum::<f64>() / n;
        let avg_loss = self.deltas.iter().map(|d| (-d).max(0.0)).sum::<f64>() / n;

        if avg_loss == 0.0 {
            return Some(100.0);
        }
        let rs = avg_gain / avg_loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }
}
