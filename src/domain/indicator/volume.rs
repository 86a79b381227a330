//! Volume ratio: current volume over the rolling mean volume (current included).

use super::stddev::RollingWindow;

#[derive(Debug, Clone)]
pub struct VolumeRatio {
    volumes: RollingWindow,
}

impl VolumeRatio {
    pub fn new(period: usize) -> Self {
        VolumeRatio {
            volumes: RollingWindow::new(period),
        }
    }

    pub fn update(&mut self, volume: f64) -> Option<f64> {
        self.volumes.push(volume);
        if !self.volumes.is_full() {
            return None;
        }
        let mean = self.volumes.mean();
        if mean <= 0.0 {
            return Some(0.0);
        }
        Some(volume / mean)
    }
}
