use core::time::Duration;

use crate::{
    error::ConfigError,
    layout::BitLayout,
    ring::check_capacity,
    time::CUSTOM_EPOCH,
};

/// Default ring buffer capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// Configuration for a [`DayflakeGenerator`].
///
/// Every field is validated eagerly when the generator is constructed; see
/// [`GeneratorConfig::validate`].
///
/// # Example
///
/// ```
/// use dayflake::GeneratorConfig;
///
/// let config = GeneratorConfig {
///     sequence_bits: 20,
///     worker_id_bits: 28,
///     enable_sequence_random: true,
///     max_random_increment: 8,
///     ..GeneratorConfig::default()
/// };
/// let layout = config.validate().unwrap();
/// assert_eq!(layout.max_sequence(), (1 << 20) - 1);
/// ```
///
/// [`DayflakeGenerator`]: crate::DayflakeGenerator
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Width of the worker ID field.
    pub worker_id_bits: u8,
    /// Width of the day index field.
    pub day_index_bits: u8,
    /// Width of the per-day sequence field.
    pub sequence_bits: u8,
    /// Sequence carried by the first ID of every day.
    pub initial_sequence: u64,
    /// Ring buffer capacity. Must be a power of two, at least 2.
    pub queue_capacity: usize,
    /// Advance the sequence by a random step instead of `1`.
    pub enable_sequence_random: bool,
    /// Upper bound (inclusive) of a random sequence step. Must be positive.
    pub max_random_increment: u64,
    /// Start of day `0`, as a duration since the Unix epoch.
    pub epoch: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let layout = BitLayout::DEFAULT;
        Self {
            worker_id_bits: layout.worker_id_bits(),
            day_index_bits: layout.day_index_bits(),
            sequence_bits: layout.sequence_bits(),
            initial_sequence: 0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            enable_sequence_random: false,
            max_random_increment: 1,
            epoch: CUSTOM_EPOCH,
        }
    }
}

impl GeneratorConfig {
    /// Checks every field and returns the resulting bit layout.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ZeroWidth`] / [`ConfigError::WidthOverflow`] for bad
    ///   bit widths
    /// - [`ConfigError::CapacityNotPowerOfTwo`] /
    ///   [`ConfigError::CapacityTooSmall`] if `queue_capacity` is not a power
    ///   of two of at least 2
    /// - [`ConfigError::ZeroRandomIncrement`] if `max_random_increment` is `0`
    /// - [`ConfigError::InitialSequenceOutOfRange`] if `initial_sequence` does
    ///   not fit the sequence field
    pub fn validate(&self) -> Result<BitLayout, ConfigError> {
        let layout = BitLayout::new(self.day_index_bits, self.worker_id_bits, self.sequence_bits)?;

        check_capacity(self.queue_capacity)?;

        if self.max_random_increment == 0 {
            return Err(ConfigError::ZeroRandomIncrement);
        }

        if self.initial_sequence > layout.max_sequence() {
            return Err(ConfigError::InitialSequenceOutOfRange {
                initial: self.initial_sequence,
                max: layout.max_sequence(),
            });
        }

        Ok(layout)
    }

    /// The sequence step policy described by this configuration.
    pub(crate) fn increment(&self) -> Increment {
        if self.enable_sequence_random {
            Increment::Random {
                max: self.max_random_increment,
            }
        } else {
            Increment::One
        }
    }
}

/// How far the sequence advances after each ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Increment {
    One,
    Random { max: u64 },
}
