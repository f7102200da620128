/// Time sources for the scheduler.
use chrono::Local;
use std::time::Instant;

/// Monotonic time for animation plus the wall-clock text shown on screen.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Local time as shown by the clock overlay, e.g. "9:05"
    fn clock_text(&self) -> String;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn clock_text(&self) -> String {
        Local::now().format("%-I:%M").to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_text_is_drawable() {
        let text = SystemClock.clock_text();
        let (hour, minute) = text.split_once(':').unwrap();
        let hour: u32 = hour.parse().unwrap();
        assert!((1..=12).contains(&hour));
        assert_eq!(minute.len(), 2);
        assert!(minute.chars().all(|c| c.is_ascii_digit()));
    }
}
