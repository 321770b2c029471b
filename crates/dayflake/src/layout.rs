use core::fmt;

use crate::error::{BitField, ConfigError};

/// Total number of usable bits. The most significant bit is always zero so
/// every ID is a non-negative `i64` as well.
pub const MAX_TOTAL_BITS: u32 = 63;

/// A runtime-validated partition of a 64-bit ID into day index, worker ID and
/// sequence fields.
///
/// Fields are packed from **MSB to LSB**:
///
/// ```text
///  Bit Index:  63           63 62                                            0
///              +--------------+-----------------+---------------+------------+
///  Field:      | reserved (1) | day index (D)   | worker ID (W) | seq (S)    |
///              +--------------+-----------------+---------------+------------+
///              |<----------- MSB ---------- 64 bits ----------- LSB -------->|
/// ```
///
/// With the default widths (15/23/25) one worker can mint 2^25 IDs per day for
/// roughly 89 years after the epoch.
///
/// # Example
///
/// ```
/// use dayflake::BitLayout;
///
/// let layout = BitLayout::new(15, 23, 25).unwrap();
/// let id = layout.encode(12, 7, 3);
/// let parts = layout.decode(id);
/// assert_eq!((parts.day_index, parts.worker_id, parts.sequence), (12, 7, 3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitLayout {
    day_index_bits: u8,
    worker_id_bits: u8,
    sequence_bits: u8,
}

impl Default for BitLayout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl BitLayout {
    /// 15 bits of day index, 23 bits of worker ID, 25 bits of sequence.
    pub const DEFAULT: Self = Self {
        day_index_bits: 15,
        worker_id_bits: 23,
        sequence_bits: 25,
    };

    /// Validates and builds a layout.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ZeroWidth`] if any width is zero
    /// - [`ConfigError::WidthOverflow`] if the widths sum to more than 63
    pub fn new(
        day_index_bits: u8,
        worker_id_bits: u8,
        sequence_bits: u8,
    ) -> Result<Self, ConfigError> {
        for (bits, field) in [
            (day_index_bits, BitField::DayIndex),
            (worker_id_bits, BitField::WorkerId),
            (sequence_bits, BitField::Sequence),
        ] {
            if bits == 0 {
                return Err(ConfigError::ZeroWidth { field });
            }
        }

        let total = u32::from(day_index_bits) + u32::from(worker_id_bits) + u32::from(sequence_bits);
        if total > MAX_TOTAL_BITS {
            return Err(ConfigError::WidthOverflow { total });
        }

        Ok(Self {
            day_index_bits,
            worker_id_bits,
            sequence_bits,
        })
    }

    /// Width of the day index field.
    pub const fn day_index_bits(&self) -> u8 {
        self.day_index_bits
    }

    /// Width of the worker ID field.
    pub const fn worker_id_bits(&self) -> u8 {
        self.worker_id_bits
    }

    /// Width of the sequence field.
    pub const fn sequence_bits(&self) -> u8 {
        self.sequence_bits
    }

    /// Number of bits to shift the worker ID to its position.
    pub const fn worker_id_shift(&self) -> u32 {
        self.sequence_bits as u32
    }

    /// Number of bits to shift the day index to its position.
    pub const fn day_index_shift(&self) -> u32 {
        self.worker_id_bits as u32 + self.sequence_bits as u32
    }

    /// Largest representable day index.
    pub const fn max_day_index(&self) -> u64 {
        mask(self.day_index_bits)
    }

    /// Largest representable worker ID.
    pub const fn max_worker_id(&self) -> u64 {
        mask(self.worker_id_bits)
    }

    /// Largest representable sequence.
    pub const fn max_sequence(&self) -> u64 {
        mask(self.sequence_bits)
    }

    /// Packs the three components into one ID.
    ///
    /// Components are masked to their field width; callers are expected to
    /// stay within the `max_*` bounds.
    #[inline]
    pub const fn encode(&self, day_index: u64, worker_id: u64, sequence: u64) -> u64 {
        debug_assert!(day_index <= self.max_day_index());
        debug_assert!(worker_id <= self.max_worker_id());
        debug_assert!(sequence <= self.max_sequence());

        let day = (day_index & self.max_day_index()) << self.day_index_shift();
        let worker = (worker_id & self.max_worker_id()) << self.worker_id_shift();
        let seq = sequence & self.max_sequence();
        day | worker | seq
    }

    /// Splits an ID back into its components. Diagnostic only.
    pub const fn decode(&self, id: u64) -> IdParts {
        IdParts {
            day_index: (id >> self.day_index_shift()) & self.max_day_index(),
            worker_id: (id >> self.worker_id_shift()) & self.max_worker_id(),
            sequence: id & self.max_sequence(),
        }
    }
}

const fn mask(bits: u8) -> u64 {
    (1 << bits) - 1
}

/// The decoded components of an ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdParts {
    /// Whole days since the epoch.
    pub day_index: u64,
    /// Worker that minted the ID.
    pub worker_id: u64,
    /// Position within the worker's day.
    pub sequence: u64,
}

impl fmt::Display for IdParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "day={} worker={} seq={}",
            self.day_index, self.worker_id, self.sequence
        )
    }
}
