use std::time::{Duration, Instant};

/// Rates measured over the last completed interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
}

/// Counts frames and ticks and turns them into a snapshot once per interval.
#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    ticks: u32,
    frame_time_sum: Duration,
    latest: LoopMetricsSnapshot,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval_start: now,
            interval,
            frames: 0,
            ticks: 0,
            frame_time_sum: Duration::ZERO,
            latest: LoopMetricsSnapshot::default(),
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
    }

    pub(crate) fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    /// The most recent snapshot, or zeros before the first interval closes.
    pub(crate) fn latest(&self) -> LoopMetricsSnapshot {
        self.latest
    }

    /// Closes the interval when it has elapsed and returns the new snapshot.
    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = if self.frames == 0 {
            0.0
        } else {
            self.frame_time_sum.as_secs_f32() * 1000.0 / self.frames as f32
        };
        self.latest = LoopMetricsSnapshot {
            fps: self.frames as f32 / elapsed_seconds,
            tps: self.ticks as f32 / elapsed_seconds,
            frame_time_ms,
        };

        self.interval_start = now;
        self.frames = 0;
        self.ticks = 0;
        self.frame_time_sum = Duration::ZERO;
        Some(self.latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reports_rates_over_interval() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1), base);
        accumulator.record_frame(Duration::from_millis(20));
        accumulator.record_frame(Duration::from_millis(20));
        for _ in 0..4 {
            accumulator.record_tick();
        }

        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("interval elapsed");
        assert!((snapshot.fps - 2.0).abs() < 0.05);
        assert!((snapshot.tps - 4.0).abs() < 0.05);
        assert!((snapshot.frame_time_ms - 20.0).abs() < 0.001);
        assert_eq!(accumulator.latest(), snapshot);
    }

    #[test]
    fn no_snapshot_before_interval_and_latest_stays_zero() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1), base);
        accumulator.record_frame(Duration::from_millis(16));
        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(500))
            .is_none());
        assert_eq!(accumulator.latest(), LoopMetricsSnapshot::default());
    }

    #[test]
    fn counters_reset_after_each_interval() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1), base);
        accumulator.record_frame(Duration::from_millis(10));
        accumulator.maybe_snapshot(base + Duration::from_secs(1));
        let next = accumulator
            .maybe_snapshot(base + Duration::from_secs(2))
            .expect("second interval");
        assert_eq!(next.fps, 0.0);
        assert_eq!(next.frame_time_ms, 0.0);
    }
}
