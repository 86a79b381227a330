//! Support/resistance level detection over a lookback window.
//!
//! A bar is resistance when its high is strictly above the two highs on each
//! side, support when its low is strictly below the two lows on each side.
//! With volume confirmation an extremum also needs above-average volume in its
//! neighbourhood. Nearby levels are merged into their mean.

use std::collections::VecDeque;

use crate::domain::tick::Tick;

const NEIGHBOURS: usize = 2;
/// Smallest window holding one candidate bar and its neighbours on each side.
pub const MIN_LOOKBACK: usize = 2 * NEIGHBOURS + 1;
const VOLUME_SPAN: usize = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelSet {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

/// Level closest to `price`, if any.
pub fn nearest(levels: &[f64], price: f64) -> Option<f64> {
    levels
        .iter()
        .copied()
        .min_by(|a, b| (a - price).abs().total_cmp(&(b - price).abs()))
}

#[derive(Debug, Clone)]
pub struct LevelDetector {
    lookback: usize,
    merge_fraction: f64,
    volume_confirm: bool,
    bars: VecDeque<(f64, f64, f64)>,
}

impl LevelDetector {
    /// `merge_pct` is in percent: 0.2 merges levels within 0.2% of each other.
    pub fn new(lookback: usize, merge_pct: f64, volume_confirm: bool) -> Self {
        let lookback = lookback.max(MIN_LOOKBACK);
        LevelDetector {
            lookback,
            merge_fraction: merge_pct / 100.0,
            volume_confirm,
            bars: VecDeque::with_capacity(lookback),
        }
    }

    pub fn update(&mut self, tick: &Tick) -> Option<LevelSet> {
        if self.bars.len() == self.lookback {
            self.bars.pop_front();
        }
        self.bars.push_back((tick.high(), tick.low(), tick.volume));
        if self.bars.len() < self.lookback {
            return None;
        }
        Some(self.detect())
    }

    fn detect(&self) -> LevelSet {
        let len = self.bars.len();
        let mut support = Vec::new();
        let mut resistance = Vec::new();

        for i in NEIGHBOURS..len.saturating_sub(NEIGHBOURS) {
            let (high, low, _) = self.bars[i];
            let neighbours = (i - NEIGHBOURS..=i + NEIGHBOURS).filter(|&j| j != i);

            let is_peak = neighbours.clone().all(|j| high > self.bars[j].0);
            let is_trough = neighbours.clone().all(|j| low < self.bars[j].1);
            if !(is_peak || is_trough) {
                continue;
            }
            if self.volume_confirm && !self.volume_confirms(i) {
                continue;
            }
            if is_peak {
                resistance.push(high);
            }
            if is_trough {
                support.push(low);
            }
        }

        LevelSet {
            support: merge_levels(support, self.merge_fraction),
            resistance: merge_levels(resistance, self.merge_fraction),
        }
    }

    fn volume_confirms(&self, i: usize) -> bool {
        let start = i.saturating_sub(VOLUME_SPAN);
        let end = (i + VOLUME_SPAN).min(self.bars.len());
        let span = end - start;
        if span == 0 {
            return false;
        }
        let mean = (start..end).map(|j| self.bars[j].2).sum::<f64>() / span as f64;
        self.bars[i].2 > mean
    }
}

/// Sort levels and average runs whose successive gap is within `fraction`.
pub fn merge_levels(mut levels: Vec<f64>, fraction: f64) -> Vec<f64> {
    levels.sort_by(f64::total_cmp);

    let mut merged = Vec::new();
    let mut group: Vec<f64> = Vec::new();
    for level in levels {
        if let Some(&last) = group.last() {
            if level - last > fraction * last.abs() {
                merged.push(group.iter().sum::<f64>() / group.len() as f64);
                group.clear();
            }
        }
        group.push(level);
    }
    if !group.is_empty() {
        merged.push(group.iter().sum::<f64>() / group.len() as f64);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn bar(high: f64, low: f64, volume: f64) -> Tick {
        let mid = (high + low) / 2.0;
        Tick::new(DateTime::from_timestamp(0, 0).unwrap(), mid, volume).with_range(high, low)
    }

    fn feed(detector: &mut LevelDetector, bars: &[(f64, f64, f64)]) -> Option<LevelSet> {
        let mut last = None;
        for &(h, l, v) in bars {
            last = detector.update(&bar(h, l, v));
        }
        last
    }

    #[test]
    fn warmup_is_lookback() {
        let mut detector = LevelDetector::new(5, 0.2, false);
        for _ in 0..4 {
            assert!(detector.update(&bar(101.0, 99.0, 1.0)).is_none());
        }
        assert!(detector.update(&bar(101.0, 99.0, 1.0)).is_some());
    }

    #[test]
    fn detects_peak_and_trough() {
        let mut detector = LevelDetector::new(7, 0.2, false);
        let levels = feed(
            &mut detector,
            &[
                (101.0, 99.0, 1.0),
                (102.0, 99.0, 1.0),
                (105.0, 100.0, 1.0),
                (102.0, 97.0, 1.0),
                (101.0, 95.0, 1.0),
                (102.0, 97.0, 1.0),
                (103.0, 98.0, 1.0),
            ],
        )
        .unwrap();
        assert_eq!(levels.resistance, vec![105.0]);
        assert_eq!(levels.support, vec![95.0]);
    }

    #[test]
    fn equal_neighbours_are_not_extrema() {
        let mut detector = LevelDetector::new(5, 0.2, false);
        let levels = feed(&mut detector, &[(101.0, 99.0, 1.0); 5]).unwrap();
        assert!(levels.resistance.is_empty());
        assert!(levels.support.is_empty());
    }

    #[test]
    fn volume_confirmation_filters_thin_extrema() {
        let bars = [
            (101.0, 99.0, 5.0),
            (102.0, 99.0, 5.0),
            (105.0, 100.0, 1.0),
            (102.0, 99.5, 5.0),
            (101.0, 99.5, 5.0),
        ];
        let mut plain = LevelDetector::new(5, 0.2, false);
        assert_eq!(feed(&mut plain, &bars).unwrap().resistance, vec![105.0]);

        let mut confirmed = LevelDetector::new(5, 0.2, true);
        assert!(feed(&mut confirmed, &bars).unwrap().resistance.is_empty());
    }

    #[test]
    fn merge_levels_groups_nearby() {
        let merged = merge_levels(vec![105.0, 100.1, 100.0], 0.002);
        assert_eq!(merged.len(), 2);
        assert!((merged[0] - 100.05).abs() < 1e-9);
        assert!((merged[1] - 105.0).abs() < f64::EPSILON);
    }

    #[test]
    fn merge_levels_empty() {
        assert!(merge_levels(Vec::new(), 0.002).is_empty());
    }

    #[test]
    fn nearest_level_by_distance() {
        assert_eq!(nearest(&[90.0, 97.0], 98.0), Some(97.0));
        assert_eq!(nearest(&[103.0, 110.0], 108.0), Some(110.0));
        assert_eq!(nearest(&[], 100.0), None);
    }
}
