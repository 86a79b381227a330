//! Exponential Moving Average.
//!
//! k = 2/(n+1); the first observation seeds the average directly, then
//! EMA[i] = x[i]*k + EMA[i-1]*(1-k).
//! Warmup: the value is reported once n observations have been seen.

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    value: Option<f64>,
    seen: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Ema {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            value: None,
            seen: 0,
        }
    }

    /// Fold one observation in and return the smoothed value regardless of warm-up.
    pub fn next(&mut self, x: f64) -> f64 {
        let smoothed = match self.value {
            None => x,
            Some(prev) => x * self.alpha + prev * (1.0 - self.alpha),
        };
        self.value = Some(smoothed);
        self.seen += 1;
        smoothed
    }

    pub fn update(&mut self, x: f64) -> Option<f64> {
        let smoothed = self.next(x);
        self.is_ready().then_some(smoothed)
    }

    pub fn is_ready(&self) -> bool {
        self.seen >= self.period
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_warmup() {
        let mut ema = Ema::new(3);
        assert_eq!(ema.update(10.0), None);
        assert_eq!(ema.update(20.0), None);
        assert!(ema.update(30.0).is_some());
    }

    #[test]
    fn ema_seeds_with_first_value() {
        let mut ema = Ema::new(5);
        ema.update(42.0);
        assert_eq!(ema.value(), Some(42.0));
    }

    #[test]
    fn ema_basic_calculation() {
        // k = 0.5: 10 → 15 → 22.5
        let mut ema = Ema::new(3);
        ema.update(10.0);
        ema.update(20.0);
        let v = ema.update(30.0).unwrap();
        assert!((v - 22.5).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_constant_input() {
        let mut ema = Ema::new(4);
        let mut last = None;
        for _ in 0..10 {
            last = ema.update(7.0);
        }
        assert!((last.unwrap() - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_tracks_trend_with_lag() {
        let mut ema = Ema::new(5);
        let mut last = 0.0;
        for i in 0..50 {
            last = ema.next(100.0 + i as f64);
        }
        // steady-state lag of (n-1)/2 = 2 behind a unit-slope series
        assert!((last - 147.0).abs() < 1e-6);
    }
}
