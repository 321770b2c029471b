//! A bounded single-producer, multi-consumer FIFO of precomputed IDs.
//!
//! Every slot carries a *stamp*: the queue position the slot is currently
//! waiting for. For a slot at position `p` (index `p & mask`):
//!
//! - `stamp == p`: empty, the producer may write position `p`
//! - `stamp == p + 1`: holds the value for position `p`, a consumer may claim
//!   it
//! - after the value is taken the consumer sets `stamp = p + capacity`, which
//!   hands the slot to the producer's next lap
//!
//! Consumers claim positions with a CAS on the head cursor, so each position
//! is removed by exactly one consumer and positions are removed in order.
//! Values are plain `u64`s stored in atomics, so no slot ever needs
//! `unsafe` access.

use crossbeam_utils::{Backoff, CachePadded};
use portable_atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::error::ConfigError;

/// Smallest accepted capacity. With a single slot the stamp of a filled slot
/// equals the stamp of the next lap's empty slot.
pub const MIN_QUEUE_CAPACITY: usize = 2;

/// Validates a ring buffer capacity.
///
/// # Errors
///
/// - [`ConfigError::CapacityNotPowerOfTwo`] unless `capacity` is an exact power
///   of two
/// - [`ConfigError::CapacityTooSmall`] if `capacity` is below
///   [`MIN_QUEUE_CAPACITY`]
pub(crate) const fn check_capacity(capacity: usize) -> Result<(), ConfigError> {
    if !capacity.is_power_of_two() {
        return Err(ConfigError::CapacityNotPowerOfTwo { capacity });
    }
    if capacity < MIN_QUEUE_CAPACITY {
        return Err(ConfigError::CapacityTooSmall {
            capacity,
            min: MIN_QUEUE_CAPACITY,
        });
    }
    Ok(())
}

struct Slot {
    stamp: AtomicUsize,
    value: AtomicU64,
}

/// Fixed-capacity FIFO with one writer and any number of readers.
///
/// [`RingBuffer::push`] must only ever be called from a single thread at a
/// time. [`RingBuffer::pop`] may be called from any number of threads.
pub(crate) struct RingBuffer {
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
    slots: Box<[Slot]>,
    mask: usize,
}

impl RingBuffer {
    /// Allocates a buffer with `capacity` slots.
    ///
    /// # Errors
    ///
    /// See [`check_capacity`].
    pub(crate) fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        check_capacity(capacity)?;

        let slots = (0..capacity)
            .map(|position| Slot {
                stamp: AtomicUsize::new(position),
                value: AtomicU64::new(0),
            })
            .collect();

        Ok(Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            slots,
            mask: capacity - 1,
        })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Approximate number of buffered values. Exact when no push or pop is in
    /// flight.
    pub(crate) fn len(&self) -> usize {
        // Head first: the tail read afterwards can only be further ahead, so
        // the difference never wraps.
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head).min(self.capacity())
    }

    /// Appends `value` at the tail, handing it back if the buffer is full.
    #[inline]
    pub(crate) fn push(&self, value: u64) -> Result<(), u64> {
        let tail = self.tail.load(Ordering::Relaxed);
        let slot = &self.slots[tail & self.mask];

        if slot.stamp.load(Ordering::Acquire) != tail {
            // The consumer of the previous lap has not released this slot.
            return Err(value);
        }

        slot.value.store(value, Ordering::Relaxed);
        slot.stamp.store(tail.wrapping_add(1), Ordering::Release);
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Removes the value at the head, or returns `None` if nothing is
    /// buffered.
    #[inline]
    pub(crate) fn pop(&self) -> Option<u64> {
        let backoff = Backoff::new();
        let mut head = self.head.load(Ordering::Relaxed);

        loop {
            let slot = &self.slots[head & self.mask];
            let stamp = slot.stamp.load(Ordering::Acquire);

            if stamp == head.wrapping_add(1) {
                match self.head.compare_exchange_weak(
                    head,
                    head.wrapping_add(1),
                    Ordering::SeqCst,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let value = slot.value.load(Ordering::Relaxed);
                        slot.stamp
                            .store(head.wrapping_add(self.capacity()), Ordering::Release);
                        return Some(value);
                    }
                    Err(current) => {
                        head = current;
                        backoff.spin();
                    }
                }
            } else if stamp == head {
                // The producer has not written this position yet.
                return None;
            } else {
                // Another consumer claimed `head` in the meantime.
                backoff.spin();
                head = self.head.load(Ordering::Relaxed);
            }
        }
    }

    /// Discards every buffered value and returns how many were dropped.
    pub(crate) fn clear(&self) -> usize {
        let mut dropped = 0;
        while self.pop().is_some() {
            dropped += 1;
        }
        dropped
    }
}
