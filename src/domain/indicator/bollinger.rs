//! Bollinger Bands.
//!
//! Middle = SMA(n), Upper/Lower = Middle ± k × sample stddev(n).
//! Warmup: n observations.

use super::stddev::RollingWindow;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    window: RollingWindow,
    multiplier: f64,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64) -> Self {
        Bollinger {
            window: RollingWindow::new(period),
            multiplier,
        }
    }

    pub fn update(&mut self, price: f64) -> Option<BollingerBands> {
        self.window.push(price);
        if !self.window.is_full() {
            return None;
        }
        let middle = self.window.mean();
        let band = self.multiplier * self.window.sample_stddev();
        Some(BollingerBands {
            upper: middle + band,
            middle,
            lower: middle - band,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bollinger_warmup() {
        let mut boll = Bollinger::new(3, 2.0);
        assert_eq!(boll.update(1.0), None);
        assert_eq!(boll.update(2.0), None);
        assert!(boll.update(3.0).is_some());
    }

    #[test]
    fn bollinger_known_values() {
        // 1..=5: mean 3, sample var 2.5
        let mut boll = Bollinger::new(5, 2.0);
        let mut last = None;
        for p in [1.0, 2.0, 3.0, 4.0, 5.0] {
            last = boll.update(p);
        }
        let bands = last.unwrap();
        let sd = 2.5_f64.sqrt();
        assert_relative_eq!(bands.middle, 3.0);
        assert_relative_eq!(bands.upper, 3.0 + 2.0 * sd, epsilon = 1e-12);
        assert_relative_eq!(bands.lower, 3.0 - 2.0 * sd, epsilon = 1e-12);
    }

    #[test]
    fn bollinger_flat_window_collapses() {
        let mut boll = Bollinger::new(4, 2.0);
        let mut last = None;
        for _ in 0..4 {
            last = boll.update(100.0);
        }
        let bands = last.unwrap();
        assert!((bands.upper - 100.0).abs() < f64::EPSILON);
        assert!((bands.lower - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bollinger_upper_above_lower() {
        let mut boll = Bollinger::new(4, 1.5);
        let mut last = None;
        for p in [10.0, 12.0, 9.0, 14.0, 11.0] {
            last = boll.update(p);
        }
        let bands = last.unwrap();
        assert!(bands.upper > bands.middle);
        assert!(bands.middle > bands.lower);
    }
}
