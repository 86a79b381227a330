//! Volume profile: point of control and 70% value area over a rolling window.

use std::collections::VecDeque;

const VALUE_AREA_SHARE: f64 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileReading {
    pub poc: f64,
    pub value_area_low: f64,
    pub value_area_high: f64,
}

#[derive(Debug, Clone)]
pub struct VolumeProfile {
    window: usize,
    buckets: usize,
    prints: VecDeque<(f64, f64)>,
}

impl VolumeProfile {
    pub fn new(window: usize, buckets: usize) -> Self {
        let window = window.max(1);
        VolumeProfile {
            window,
            buckets: buckets.max(1),
            prints: VecDeque::with_capacity(window),
        }
    }

    pub fn update(&mut self, price: f64, volume: f64) -> Option<ProfileReading> {
        if self.prints.len() == self.window {
            self.prints.pop_front();
        }
        self.prints.push_back((price, volume));
        if self.prints.len() < self.window {
            return None;
        }
        Some(self.compute(price))
    }

    fn compute(&self, latest: f64) -> ProfileReading {
        let (min, max) = self
            .prints
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(p, _)| {
                (lo.min(p), hi.max(p))
            });
        let total: f64 = self.prints.iter().map(|&(_, v)| v).sum();

        // Degenerate profile: a single price or no traded volume.
        if max <= min || total <= 0.0 {
            return ProfileReading {
                poc: latest,
                value_area_low: latest,
                value_area_high: latest,
            };
        }

        let height = (max - min) / self.buckets as f64;
        let mut volumes = vec![0.0_f64; self.buckets];
        for &(price, volume) in &self.prints {
            let bucket = (((price - min) / height).floor() as usize).min(self.buckets - 1);
            volumes[bucket] += volume;
        }

        let mut poc_bucket = 0;
        for (i, &v) in volumes.iter().enumerate() {
            if v > volumes[poc_bucket] {
                poc_bucket = i;
            }
        }

        let mut order: Vec<usize> = (0..self.buckets).collect();
        order.sort_by(|&a, &b| volumes[b].total_cmp(&volumes[a]));

        let target = total * VALUE_AREA_SHARE;
        let mut accumulated = 0.0;
        let mut lo = poc_bucket;
        let mut hi = poc_bucket;
        for bucket in order {
            accumulated += volumes[bucket];
            lo = lo.min(bucket);
            hi = hi.max(bucket);
            if accumulated >= target {
                break;
            }
        }

        ProfileReading {
            poc: min + poc_bucket as f64 * height,
            value_area_low: min + lo as f64 * height,
            value_area_high: min + hi as f64 * height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(profile: &mut VolumeProfile, prints: &[(f64, f64)]) -> Option<ProfileReading> {
        let mut last = None;
        for &(p, v) in prints {
            last = profile.update(p, v);
        }
        last
    }

    #[test]
    fn warmup_is_window() {
        let mut profile = VolumeProfile::new(3, 10);
        assert!(profile.update(100.0, 1.0).is_none());
        assert!(profile.update(101.0, 1.0).is_none());
        assert!(profile.update(102.0, 1.0).is_some());
    }

    #[test]
    fn poc_is_heaviest_bucket() {
        let mut profile = VolumeProfile::new(4, 10);
        let reading = feed(
            &mut profile,
            &[(100.0, 1.0), (110.0, 1.0), (105.0, 10.0), (105.0, 10.0)],
        )
        .unwrap();
        assert!((reading.poc - 105.0).abs() < 1e-9);
        // bucket 5 alone holds 20 of 22 ≥ 70%
        assert!((reading.value_area_low - 105.0).abs() < 1e-9);
        assert!((reading.value_area_high - 105.0).abs() < 1e-9);
    }

    #[test]
    fn value_area_spans_multiple_buckets() {
        let mut profile = VolumeProfile::new(4, 10);
        let reading = feed(
            &mut profile,
            &[(100.0, 5.0), (102.0, 3.0), (104.0, 1.0), (110.0, 1.0)],
        )
        .unwrap();
        // 5 + 3 = 8 of 10 passes 70%
        assert!((reading.poc - 100.0).abs() < 1e-9);
        assert!((reading.value_area_low - 100.0).abs() < 1e-9);
        assert!((reading.value_area_high - 102.0).abs() < 1e-9);
    }

    #[test]
    fn single_price_window_is_degenerate() {
        let mut profile = VolumeProfile::new(3, 50);
        let reading = feed(&mut profile, &[(100.0, 1.0); 3]).unwrap();
        assert_eq!(
            reading,
            ProfileReading {
                poc: 100.0,
                value_area_low: 100.0,
                value_area_high: 100.0
            }
        );
    }

    #[test]
    fn zero_volume_window_is_degenerate() {
        let mut profile = VolumeProfile::new(2, 10);
        let reading = feed(&mut profile, &[(100.0, 0.0), (101.0, 0.0)]).unwrap();
        assert!((reading.poc - 101.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ties_resolve_to_lowest_bucket() {
        let mut profile = VolumeProfile::new(2, 10);
        let reading = feed(&mut profile, &[(100.0, 5.0), (110.0, 5.0)]).unwrap();
        assert!((reading.poc - 100.0).abs() < 1e-9);
    }
}
