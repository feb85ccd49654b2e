/// Smoothed frame-rate estimate.
///
/// Keeps an exponential moving average of frame time (weight `alpha` on the
/// newest sample) and reports at most once per `report_every` frames.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    avg_dt: f32,
    alpha: f32,
    report_every: u64,
    frames: u64,
}

impl FpsMeter {
    pub fn new(report_every: u64) -> Self {
        Self {
            avg_dt: 1.0 / 60.0,
            alpha: 0.05,
            report_every: report_every.max(1),
            frames: 0,
        }
    }

    /// Feeds one frame time (seconds). Returns the smoothed FPS when a report
    /// is due.
    pub fn record(&mut self, dt: f32) -> Option<f32> {
        self.avg_dt = self.avg_dt * (1.0 - self.alpha) + dt * self.alpha;
        self.frames += 1;
        (self.frames % self.report_every == 0).then(|| self.fps())
    }

    /// Current smoothed FPS.
    pub fn fps(&self) -> f32 {
        if self.avg_dt > 0.0 { 1.0 / self.avg_dt } else { 0.0 }
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new(600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_to_steady_rate() {
        let mut m = FpsMeter::new(1000);
        for _ in 0..500 {
            m.record(1.0 / 120.0);
        }
        assert!((m.fps() - 120.0).abs() < 1.0, "fps = {}", m.fps());
    }

    #[test]
    fn reports_on_interval() {
        let mut m = FpsMeter::new(3);
        assert!(m.record(0.016).is_none());
        assert!(m.record(0.016).is_none());
        assert!(m.record(0.016).is_some());
        assert!(m.record(0.016).is_none());
    }
}
