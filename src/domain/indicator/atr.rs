//! Average True Range and Average Directional Index.
//!
//! ATR(n) is the rolling mean of the last n true ranges; the first tick's true
//! range is high - low. ADX(n) smooths +DM, -DM and TR with rolling means,
//! derives DI± and DX, then averages the last n DX values.

use super::stddev::RollingWindow;
use crate::domain::tick::Tick;

#[derive(Debug, Clone)]
pub struct Atr {
    prev_close: Option<f64>,
    ranges: RollingWindow,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Atr {
            prev_close: None,
            ranges: RollingWindow::new(period),
        }
    }

    pub fn update(&mut self, tick: &Tick) -> Option<f64> {
        let tr = match self.prev_close {
            None => tick.high() - tick.low(),
            Some(prev) => tick.true_range(prev),
        };
        self.prev_close = Some(tick.price);
        self.ranges.push(tr);
        self.ranges.is_full().then(|| self.ranges.mean())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdxReading {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

#[derive(Debug, Clone, Copy)]
struct PrevBar {
    high: f64,
    low: f64,
    close: f64,
}

#[derive(Debug, Clone)]
pub struct Adx {
    prev: Option<PrevBar>,
    ranges: RollingWindow,
    plus_dm: RollingWindow,
    minus_dm: RollingWindow,
    dx: RollingWindow,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        Adx {
            prev: None,
            ranges: RollingWindow::new(period),
            plus_dm: RollingWindow::new(period),
            minus_dm: RollingWindow::new(period),
            dx: RollingWindow::new(period),
        }
    }

    pub fn update(&mut self, tick: &Tick) -> Option<AdxReading> {
        let (high, low) = (tick.high(), tick.low());
        let (tr, plus, minus) = match self.prev {
            None => (high - low, 0.0, 0.0),
            Some(prev) => {
                let up = high - prev.high;
                let down = prev.low - low;
                let plus = if up > down && up > 0.0 { up } else { 0.0 };
                let minus = if down > up && down > 0.0 { down } else { 0.0 };
                (tick.true_range(prev.close), plus, minus)
            }
        };
        self.prev = Some(PrevBar {
            high,
            low,
            close: tick.price,
        });

        self.ranges.push(tr);
        self.plus_dm.push(plus);
        self.minus_dm.push(minus);
        if !self.ranges.is_full() {
            return None;
        }

        let tr_mean = self.ranges.mean();
        let (plus_di, minus_di) = if tr_mean > 0.0 {
            (
                100.0 * self.plus_dm.mean() / tr_mean,
                100.0 * self.minus_dm.mean() / tr_mean,
            )
        } else {
            (0.0, 0.0)
        };
        let di_sum = plus_di + minus_di;
        let dx = if di_sum > 0.0 {
            100.0 * (plus_di - minus_di).abs() / di_sum
        } else {
            0.0
        };

        self.dx.push(dx);
        self.dx.is_full().then(|| AdxReading {
            adx: self.dx.mean(),
            plus_di,
            minus_di,
        })
    }
}
