//! Periodic tick driver.
//!
//! A two-state machine (Stopped/Running) around the repeating trigger that
//! advances the animator. Time is passed in by the caller, so the schedule
//! is deterministic and testable without sleeping.

use std::time::{Duration, Instant};

pub struct TickDriver {
    interval: Duration,
    /// `Some(due)` while running, `None` while stopped.
    next_due: Option<Instant>,
}

impl TickDriver {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Arms the trigger. The first tick is due immediately at `now`; later
    /// ticks follow every interval. Restarting while running rearms the
    /// schedule from `now`.
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now);
    }

    /// Cancels the pending schedule. Only future ticks are affected.
    pub fn stop(&mut self) {
        self.next_due = None;
    }

    /// Number of ticks due at `now`. Returns 0 while stopped. Each returned
    /// tick advances the schedule by one interval, so a late poll catches up
    /// rather than dropping ticks.
    pub fn poll(&mut self, now: Instant) -> u32 {
        let Some(mut due) = self.next_due else {
            return 0;
        };

        let mut ticks = 0;
        while due <= now {
            ticks += 1;
            due += self.interval;
        }
        self.next_due = Some(due);
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(3);

    #[test]
    fn test_stopped_driver_never_ticks() {
        let mut driver = TickDriver::new(INTERVAL);
        assert!(!driver.is_running());
        assert_eq!(driver.poll(Instant::now()), 0);
    }

    #[test]
    fn test_start_fires_immediately_then_periodically() {
        let t0 = Instant::now();
        let mut driver = TickDriver::new(INTERVAL);

        driver.start(t0);
        assert!(driver.is_running());

        // Immediate first tick, then one per interval.
        assert_eq!(driver.poll(t0), 1);
        assert_eq!(driver.poll(t0 + Duration::from_secs(1)), 0);
        assert_eq!(driver.poll(t0 + Duration::from_secs(3)), 1);
        assert_eq!(driver.poll(t0 + Duration::from_secs(6)), 1);
    }

    #[test]
    fn test_three_ticks_over_two_intervals() {
        let t0 = Instant::now();
        let mut driver = TickDriver::new(INTERVAL);
        driver.start(t0);

        let mut total = 0;
        for secs in [0, 3, 6] {
            total += driver.poll(t0 + Duration::from_secs(secs));
        }
        assert_eq!(total, 3);
    }

    #[test]
    fn test_late_poll_catches_up() {
        let t0 = Instant::now();
        let mut driver = TickDriver::new(INTERVAL);
        driver.start(t0);

        // Immediate tick plus two missed intervals, delivered together.
        assert_eq!(driver.poll(t0 + Duration::from_secs(7)), 3);
        assert_eq!(driver.poll(t0 + Duration::from_secs(8)), 0);
        assert_eq!(driver.poll(t0 + Duration::from_secs(9)), 1);
    }

    #[test]
    fn test_stop_cancels_future_ticks() {
        let t0 = Instant::now();
        let mut driver = TickDriver::new(INTERVAL);
        driver.start(t0);
        assert_eq!(driver.poll(t0), 1);

        driver.stop();
        assert!(!driver.is_running());
        for secs in [3, 6, 9, 30] {
            assert_eq!(driver.poll(t0 + Duration::from_secs(secs)), 0);
        }
    }

    #[test]
    fn test_restart_rearms_with_immediate_tick() {
        let t0 = Instant::now();
        let mut driver = TickDriver::new(INTERVAL);
        driver.start(t0);
        assert_eq!(driver.poll(t0), 1);
        driver.stop();

        let t1 = t0 + Duration::from_secs(10);
        driver.start(t1);
        assert_eq!(driver.poll(t1), 1);
        assert_eq!(driver.poll(t1 + Duration::from_secs(3)), 1);
    }
}
