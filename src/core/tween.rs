/// Linear, clamped interpolation of a scalar over time.
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    start: f32,
    end: f32,
    started_at: Instant,
    duration: Duration,
}

impl Tween {
    pub fn new(start: f32, end: f32, duration: Duration, started_at: Instant) -> Self {
        Self {
            start,
            end,
            started_at,
            duration,
        }
    }

    /// Value at `now`: `start` before the tween begins, exactly `end` once
    /// `duration` has elapsed.
    pub fn current(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.started_at);
        if elapsed >= self.duration {
            return self.end;
        }
        let progress = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        self.start + (self.end - self.start) * progress as f32
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.current(now) == self.end
    }

    pub fn end(&self) -> f32 {
        self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fade(t0: Instant) -> Tween {
        Tween::new(0.0, 0.5, Duration::from_secs(2), t0)
    }

    #[test]
    fn test_interpolates_and_clamps() {
        let t0 = Instant::now();
        let tween = fade(t0);
        assert_eq!(tween.current(t0), 0.0);
        assert_eq!(tween.current(t0 + Duration::from_secs(1)), 0.25);
        assert_eq!(tween.current(t0 + Duration::from_secs(2)), 0.5);
        assert_eq!(tween.current(t0 + Duration::from_secs(10)), 0.5);
    }

    #[test]
    fn test_non_decreasing() {
        let t0 = Instant::now();
        let tween = fade(t0);
        let mut last = tween.current(t0);
        for ms in (0..3000).step_by(37) {
            let value = tween.current(t0 + Duration::from_millis(ms));
            assert!(value >= last, "{value} < {last} at {ms}ms");
            last = value;
        }
    }

    #[test]
    fn test_finished_only_at_end() {
        let t0 = Instant::now();
        let tween = fade(t0);
        assert!(!tween.is_finished(t0));
        assert!(!tween.is_finished(t0 + Duration::from_millis(1999)));
        assert!(tween.is_finished(t0 + Duration::from_secs(2)));
    }

    #[test]
    fn test_time_before_start_reads_start() {
        let t0 = Instant::now() + Duration::from_secs(5);
        assert_eq!(fade(t0).current(Instant::now()), 0.0);
    }

    #[test]
    fn test_zero_duration_is_immediately_done() {
        let t0 = Instant::now();
        let tween = Tween::new(0.2, 0.9, Duration::ZERO, t0);
        assert_eq!(tween.current(t0), 0.9);
        assert!(tween.is_finished(t0));
    }
}
