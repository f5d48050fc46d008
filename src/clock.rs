/// Time sources for the engine.
/// Wall-clock for live runs, a pausable simulated clock for demos and tests.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Default simulation speed: 10 simulated minutes per real second
pub const DEFAULT_MINUTES_PER_SECOND: f64 = 10.0;

/// Anything that can tell the engine what time it is
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real time
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
struct SimClockState {
    current: DateTime<Utc>,
    paused: bool,
    /// Fractional minute accumulator (for smooth time advancement)
    fractional_minute: f64,
    minutes_per_second: f64,
}

/// Simulated clock
///
/// Advances in whole minutes at a configurable rate while unpaused. Shared by
/// reference, so the state sits behind a lock.
#[derive(Debug)]
pub struct SimClock {
    state: Mutex<SimClockState>,
}

impl SimClock {
    /// Create a clock frozen at `start` until advanced
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(SimClockState {
                current: start,
                paused: false,
                fractional_minute: 0.0,
                minutes_per_second: DEFAULT_MINUTES_PER_SECOND,
            }),
        }
    }

    pub fn set_speed(&self, minutes_per_second: f64) {
        self.state.lock().minutes_per_second = minutes_per_second.max(0.0);
    }

    /// Advance by real `delta_seconds`
    /// Returns the number of whole simulated minutes that passed
    pub fn advance(&self, delta_seconds: f64) -> i64 {
        let mut state = self.state.lock();
        if state.paused || delta_seconds <= 0.0 {
            return 0;
        }

        state.fractional_minute += delta_seconds * state.minutes_per_second;
        let minutes = state.fractional_minute.floor() as i64;
        state.fractional_minute -= minutes as f64;
        state.current += Duration::minutes(minutes);

        minutes
    }

    /// Jump forward by whole simulated minutes, ignoring pause
    pub fn advance_minutes(&self, minutes: i64) {
        if minutes > 0 {
            self.state.lock().current += Duration::minutes(minutes);
        }
    }

    /// Move the clock to an absolute instant
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut state = self.state.lock();
        state.current = instant;
        state.fractional_minute = 0.0;
    }

    pub fn toggle_pause(&self) {
        let mut state = self.state.lock();
        state.paused = !state.paused;
    }

    pub fn set_paused(&self, paused: bool) {
        self.state.lock().paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }
}

impl Clock for SimClock {
    fn now(&self) -> DateTime<Utc> {
        self.state.lock().current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_new_sim_clock() {
        let clock = SimClock::starting_at(start());
        assert_eq!(clock.now(), start());
        assert!(!clock.is_paused());
    }

    #[test]
    fn test_advance_time() {
        let clock = SimClock::starting_at(start());

        // 0.1 seconds at 10 minutes/second = 1 minute
        assert_eq!(clock.advance(0.1), 1);
        assert_eq!(clock.now(), start() + Duration::minutes(1));

        // 0.05 seconds = half a minute, nothing whole yet
        assert_eq!(clock.advance(0.05), 0);
        assert_eq!(clock.now(), start() + Duration::minutes(1));

        // Another half minute completes one more
        assert_eq!(clock.advance(0.05), 1);
        assert_eq!(clock.now(), start() + Duration::minutes(2));
    }

    #[test]
    fn test_pause() {
        let clock = SimClock::starting_at(start());
        clock.toggle_pause();
        assert!(clock.is_paused());

        assert_eq!(clock.advance(100.0), 0);
        assert_eq!(clock.now(), start());

        clock.toggle_pause();
        assert_eq!(clock.advance(1.0), 10);
    }

    #[test]
    fn test_advance_minutes_and_set() {
        let clock = SimClock::starting_at(start());
        clock.set_paused(true);
        clock.advance_minutes(90);
        assert_eq!(clock.now(), start() + Duration::minutes(90));

        clock.set(start());
        assert_eq!(clock.now(), start());
    }
}
