use core::time::Duration;
use std::{
    sync::Arc,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

/// Custom epoch: Wednesday, January 1, 2025 00:00:00 UTC
pub const CUSTOM_EPOCH: Duration = Duration::from_millis(1_735_689_600_000);

/// Milliseconds in one day index step.
pub const MILLIS_PER_DAY: u64 = 86_400_000;

/// A trait for time sources that return a wall-clock timestamp.
///
/// This abstraction allows you to plug in the system clock, a monotonic timer,
/// or a mocked time source in tests. The unit is **milliseconds since the Unix
/// epoch**; the generator applies its own epoch when deriving day indices.
///
/// # Example
///
/// ```
/// use dayflake::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

/// Reads `SystemTime::now()` on every call.
///
/// A clock set before 1970 reads as `0`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, saturating_millis)
    }
}

/// A time source anchored to the wall clock once, then advanced by a
/// monotonic timer.
///
/// This avoids wall-clock adjustments (e.g., NTP steps) moving the day index
/// backwards while still aligning timestamps to real calendar days.
///
/// Internally, the clock captures `Instant::now()` and `SystemTime::now()` at
/// construction and reports the wall time at construction plus the monotonic
/// time elapsed since.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    start: Instant,
    start_millis: u64,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Anchors a new clock to the current wall-clock time.
    pub fn new() -> Self {
        let start = Instant::now();
        Self {
            start,
            start_millis: SystemClock.current_millis(),
        }
    }
}

impl TimeSource for MonotonicClock {
    fn current_millis(&self) -> u64 {
        self.start_millis
            .saturating_add(saturating_millis(self.start.elapsed()))
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Derives whole-day indices from a [`TimeSource`] relative to an epoch.
#[derive(Clone, Debug)]
pub struct DayClock<T> {
    time: T,
    epoch_millis: u64,
}

impl<T: TimeSource> DayClock<T> {
    /// Wraps `time` so day `0` starts at `epoch` (a duration since the Unix
    /// epoch).
    pub fn new(time: T, epoch: Duration) -> Self {
        Self {
            time,
            epoch_millis: saturating_millis(epoch),
        }
    }

    /// The configured epoch in milliseconds since the Unix epoch.
    pub fn epoch_millis(&self) -> u64 {
        self.epoch_millis
    }

    /// Current reading of the underlying time source.
    pub fn current_millis(&self) -> u64 {
        self.time.current_millis()
    }

    /// Whole days elapsed since the epoch. Times before the epoch map to day
    /// `0`.
    #[inline]
    pub fn day_index(&self) -> u64 {
        day_index_at(self.time.current_millis(), self.epoch_millis)
    }
}

/// Whole days between `epoch_millis` and `millis`, saturating at zero.
#[inline]
pub const fn day_index_at(millis: u64, epoch_millis: u64) -> u64 {
    millis.saturating_sub(epoch_millis) / MILLIS_PER_DAY
}
