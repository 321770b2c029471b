mod buffered;
mod producer;
#[cfg(test)]
mod tests;

pub use buffered::*;

use core::time::Duration;

use crossbeam_utils::Backoff;

/// How long a waiter sleeps once spinning and yielding have not helped.
const IDLE_PAUSE: Duration = Duration::from_micros(50);

/// One step of a wait loop: spin, then yield, then short sleeps.
///
/// Short waits (a momentarily empty or full buffer) resolve while spinning.
/// Long ones (an idle consumer, an exhausted day) fall through to sleeping so
/// they do not pin a core.
#[inline]
pub(crate) fn pause(backoff: &Backoff) {
    if backoff.is_completed() {
        std::thread::sleep(IDLE_PAUSE);
    } else {
        backoff.snooze();
    }
}
