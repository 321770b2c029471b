use rand::{Rng, rng};

/// A source of randomized sequence increments.
///
/// The producer thread owns its source outright, so implementations need no
/// synchronization.
///
/// # Example
/// ```
/// use dayflake::RandSource;
///
/// struct FixedStep;
/// impl RandSource for FixedStep {
///     fn rand_step(&self, max: u64) -> u64 {
///         max
///     }
/// }
///
/// assert_eq!(FixedStep.rand_step(10), 10);
/// ```
pub trait RandSource {
    /// Returns a value in `1..=max`. `max` is always at least `1`.
    fn rand_step(&self, max: u64) -> u64;
}

/// A `RandSource` that uses the thread-local RNG (`rand::rng()`).
///
/// This RNG is fast, cryptographically secure (ChaCha-based), and
/// automatically reseeded periodically. This type does **not** store the RNG
/// itself; it accesses the calling thread's generator on each call.
#[derive(Default, Clone, Copy, Debug)]
pub struct ThreadRandom;

impl RandSource for ThreadRandom {
    fn rand_step(&self, max: u64) -> u64 {
        rng().random_range(1..=max)
    }
}
