use core::cmp::Ordering as CmpOrdering;

use crossbeam_utils::Backoff;
use portable_atomic::{AtomicBool, AtomicU8, Ordering};

use crate::{
    config::Increment,
    generator::pause,
    layout::BitLayout,
    rand::RandSource,
    ring::RingBuffer,
    status::{IdGenStatus, ProducerState},
    time::{DayClock, TimeSource},
};

/// State shared between a generator and its producer thread.
pub(crate) struct Shared {
    pub(crate) ring: RingBuffer,
    stop: AtomicBool,
    state: AtomicU8,
}

impl Shared {
    pub(crate) fn new(ring: RingBuffer) -> Self {
        Self {
            ring,
            stop: AtomicBool::new(false),
            state: AtomicU8::new(ProducerState::Filling as u8),
        }
    }

    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub(crate) fn state(&self) -> ProducerState {
        ProducerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ProducerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Marks the producer stopped when [`SequenceProducer::run`] returns or
/// unwinds.
struct StopOnExit<'a>(&'a Shared);

impl Drop for StopOnExit<'_> {
    fn drop(&mut self) {
        #[cfg(feature = "tracing")]
        {
            if std::thread::panicking() {
                tracing::error!("sequence producer panicked");
            }
        }
        self.0.request_stop();
        self.0.set_state(ProducerState::Stopped);
    }
}

/// Owns every piece of mutable generation state and runs on its own thread.
///
/// `current_day` and `next_sequence` are only ever touched here, so the
/// sequence stays monotonic without locks or CAS. `next_sequence` is the
/// sequence the *next* ID will carry; once it passes `max_sequence` the day is
/// exhausted and the producer waits for the clock.
pub(crate) struct SequenceProducer<T, R> {
    layout: BitLayout,
    worker_id: u64,
    current_day: u64,
    next_sequence: u64,
    initial_sequence: u64,
    increment: Increment,
    clock: DayClock<T>,
    rng: R,
}

impl<T, R> SequenceProducer<T, R>
where
    T: TimeSource,
    R: RandSource,
{
    /// Prepares a producer that starts minting on `start_day`.
    ///
    /// `start_day`, `worker_id` and `initial_sequence` must already be
    /// validated against `layout`.
    pub(crate) fn new(
        layout: BitLayout,
        worker_id: u64,
        start_day: u64,
        initial_sequence: u64,
        increment: Increment,
        clock: DayClock<T>,
        rng: R,
    ) -> Self {
        Self {
            layout,
            worker_id,
            current_day: start_day,
            next_sequence: initial_sequence,
            initial_sequence,
            increment,
            clock,
            rng,
        }
    }

    /// Computes the next ID, or [`IdGenStatus::Pending`] if the current day's
    /// sequence space is used up.
    pub(crate) fn poll_id(&mut self) -> IdGenStatus {
        // Days past the layout's range clamp to the last representable day,
        // which then exhausts like any other.
        let day = self.clock.day_index().min(self.layout.max_day_index());

        match day.cmp(&self.current_day) {
            CmpOrdering::Greater => self.rollover_to_day(day),
            CmpOrdering::Less => self.cold_clock_behind(day),
            CmpOrdering::Equal => {}
        }

        if self.next_sequence > self.layout.max_sequence() {
            return IdGenStatus::Pending;
        }

        let id = self
            .layout
            .encode(self.current_day, self.worker_id, self.next_sequence);
        self.next_sequence = self.next_sequence.saturating_add(self.step());
        IdGenStatus::Ready { id }
    }

    /// Fills `shared.ring` until a stop is requested.
    pub(crate) fn run(mut self, shared: &Shared) {
        #[cfg(feature = "tracing")]
        tracing::info!(
            worker_id = self.worker_id,
            day = self.current_day,
            capacity = shared.ring.capacity(),
            "sequence producer started"
        );

        let _stop_on_exit = StopOnExit(shared);
        let backoff = Backoff::new();
        let mut state = ProducerState::Filling;

        'produce: while !shared.stop_requested() {
            match self.poll_id() {
                IdGenStatus::Ready { id } => {
                    if state != ProducerState::Filling {
                        state = ProducerState::Filling;
                        shared.set_state(state);
                    }
                    backoff.reset();

                    let mut pending = id;
                    while let Err(rejected) = shared.ring.push(pending) {
                        if shared.stop_requested() {
                            break 'produce;
                        }
                        pending = rejected;
                        pause(&backoff);
                    }
                    backoff.reset();
                }
                IdGenStatus::Pending => {
                    if state != ProducerState::DayExhausted {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            worker_id = self.worker_id,
                            day = self.current_day,
                            "sequence space exhausted for the day, waiting for the clock"
                        );
                        state = ProducerState::DayExhausted;
                        shared.set_state(state);
                    }
                    pause(&backoff);
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!(worker_id = self.worker_id, "sequence producer stopped");
    }

    fn rollover_to_day(&mut self, day: u64) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            worker_id = self.worker_id,
            from = self.current_day,
            to = day,
            "day rollover"
        );
        self.current_day = day;
        self.next_sequence = self.initial_sequence;
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(&self, _day: u64) {
        // Keep minting on the later day; IDs never go backwards.
        #[cfg(feature = "tracing")]
        tracing::warn!(
            worker_id = self.worker_id,
            clock_day = _day,
            current_day = self.current_day,
            "clock moved backwards, holding the current day"
        );
    }

    #[inline]
    fn step(&self) -> u64 {
        match self.increment {
            Increment::One => 1,
            Increment::Random { max } => self.rng.rand_step(max),
        }
    }
}
