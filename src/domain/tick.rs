//! Market tick representation.

use chrono::{DateTime, NaiveDate, Utc};

/// One observed trade print from the market feed.
///
/// `high`/`low` are optional because many feeds only carry last-trade price;
/// accessors fall back to `price` when they are absent.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Tick {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume: f64,
    pub high: Option<f64>,
    pub low: Option<f64>,
}

impl Tick {
    pub fn new(timestamp: DateTime<Utc>, price: f64, volume: f64) -> Self {
        Tick {
            timestamp,
            price,
            volume,
            high: None,
            low: None,
        }
    }

    pub fn with_range(mut self, high: f64, low: f64) -> Self {
        self.high = Some(high);
        self.low = Some(low);
        self
    }

    pub fn high(&self) -> f64 {
        self.high.unwrap_or(self.price)
    }

    pub fn low(&self) -> f64 {
        self.low.unwrap_or(self.price)
    }

    /// Calendar day (UTC) the tick belongs to; drives daily risk resets.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high() - self.low();
        let hc = (self.high() - prev_close).abs();
        let lc = (self.low() - prev_close).abs();
        hl.max(hc).max(lc)
    }
}
