//! General time utility functions

use chrono;
use std::thread;
use std::time::{Duration, Instant};

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    if let Some(ns) = duration.num_nanoseconds() {
        Some(ns as f64 / NANOS_PER_SECOND as f64)
    }
    else {
        None
    }
}

/// Sleep for whatever is left of a cycle which started at `cycle_start`.
///
/// Returns `Err` with the overrun duration if the cycle took longer than
/// `period`, in which case no sleep is performed.
pub fn sleep_until_cycle_end(
    cycle_start: Instant,
    period: Duration
) -> Result<(), Duration> {
    let cycle_dur = Instant::now() - cycle_start;

    match period.checked_sub(cycle_dur) {
        Some(d) => {
            thread::sleep(d);
            Ok(())
        },
        None => Err(cycle_dur - period)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        assert_eq!(
            duration_to_seconds(chrono::Duration::milliseconds(1500)),
            Some(1.5)
        );
    }

    #[test]
    fn test_sleep_until_cycle_end() {
        let start = Instant::now();
        assert!(sleep_until_cycle_end(start, Duration::from_millis(2)).is_ok());
        assert!(Instant::now() - start >= Duration::from_millis(2));

        let late = Instant::now() - Duration::from_millis(50);
        let overrun = sleep_until_cycle_end(late, Duration::from_millis(10))
            .unwrap_err();
        assert!(overrun >= Duration::from_millis(40));
    }
}
