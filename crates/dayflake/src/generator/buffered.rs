use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam_utils::Backoff;
use parking_lot::Mutex;
use portable_atomic::{AtomicBool, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use super::{
    pause,
    producer::{SequenceProducer, Shared},
};
use crate::{
    config::GeneratorConfig,
    error::{ConfigError, Error, Result},
    layout::{BitLayout, IdParts},
    rand::ThreadRandom,
    ring::RingBuffer,
    status::{IdGenStatus, ProducerState},
    time::{DayClock, SystemClock, TimeSource, day_index_at},
    worker::{StaticWorkerId, WorkerIdSource},
};

/// A buffered ID generator backed by one dedicated producer thread.
///
/// The producer owns the day index and sequence, mints IDs ahead of demand and
/// pushes them into a fixed-capacity ring buffer. Callers only ever dequeue,
/// so the hot path is a single CAS on the buffer head and never touches the
/// clock.
///
/// ## Features
/// - ✅ Thread-safe; share it behind an [`Arc`] or a reference
/// - ✅ IDs observed across all callers are strictly increasing
/// - ✅ No locks on the hot path
///
/// ## Caveats
/// - Each worker can mint `max_sequence + 1 - initial_sequence` IDs per day
///   (fewer with randomized steps). Once the day is used up, callers wait until
///   the clock reports the next day; a frozen clock stalls them indefinitely.
/// - The producer thread spins while the buffer is full, backing off to short
///   sleeps when nothing is consumed.
///
/// # Example
/// ```
/// use dayflake::{DayflakeGenerator, GeneratorConfig, StaticWorkerId, SystemClock};
///
/// let generator = DayflakeGenerator::new(
///     &GeneratorConfig::default(),
///     &StaticWorkerId(42),
///     SystemClock,
/// )
/// .unwrap();
///
/// let a = generator.next_id().unwrap();
/// let b = generator.next_id().unwrap();
/// assert!(b > a);
/// assert_eq!(generator.decode(a).worker_id, 42);
///
/// generator.close().unwrap();
/// assert!(generator.next_id().is_err());
/// ```
pub struct DayflakeGenerator {
    shared: Arc<Shared>,
    producer: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    layout: BitLayout,
    worker_id: u64,
}

impl DayflakeGenerator {
    /// Validates `config`, reads the worker ID once, and starts the producer
    /// thread.
    ///
    /// # Parameters
    ///
    /// - `config`: bit widths, queue capacity, sequencing policy and epoch
    /// - `workers`: supplies this process's worker ID; called exactly once
    /// - `time`: the clock the producer derives day indices from
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] for any invalid configuration value, a worker ID
    ///   that does not fit the layout, or a clock before the epoch or past the
    ///   last representable day
    /// - [`Error::WorkerIdSource`] if `workers` fails
    /// - [`Error::Spawn`] if the producer thread cannot be started
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn new<W, T>(config: &GeneratorConfig, workers: &W, time: T) -> Result<Self>
    where
        W: WorkerIdSource + ?Sized,
        T: TimeSource + Send + 'static,
    {
        let layout = config.validate()?;

        let worker_id = workers
            .worker_id()
            .map_err(|e| Error::WorkerIdSource(Box::new(e)))?;
        if worker_id > layout.max_worker_id() {
            return Err(ConfigError::WorkerIdOutOfRange {
                worker_id,
                max: layout.max_worker_id(),
            }
            .into());
        }

        let clock = DayClock::new(time, config.epoch);
        let now_millis = clock.current_millis();
        if now_millis < clock.epoch_millis() {
            return Err(ConfigError::ClockBeforeEpoch {
                now_millis,
                epoch_millis: clock.epoch_millis(),
            }
            .into());
        }

        let day = day_index_at(now_millis, clock.epoch_millis());
        if day > layout.max_day_index() {
            return Err(ConfigError::DayOutOfRange {
                day,
                max: layout.max_day_index(),
            }
            .into());
        }

        let shared = Arc::new(Shared::new(RingBuffer::with_capacity(
            config.queue_capacity,
        )?));

        let producer = SequenceProducer::new(
            layout,
            worker_id,
            day,
            config.initial_sequence,
            config.increment(),
            clock,
            ThreadRandom,
        );

        let handle = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(format!("dayflake-producer-{worker_id}"))
                .spawn(move || producer.run(&shared))
                .map_err(Error::Spawn)?
        };

        Ok(Self {
            shared,
            producer: Mutex::new(Some(handle)),
            closed: AtomicBool::new(false),
            layout,
            worker_id,
        })
    }

    /// Starts a generator with the default configuration and the system
    /// clock.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn with_worker_id(worker_id: u64) -> Result<Self> {
        Self::new(
            &GeneratorConfig::default(),
            &StaticWorkerId(worker_id),
            SystemClock,
        )
    }

    /// Takes the next ID, waiting while the buffer is momentarily empty.
    ///
    /// IDs returned by all callers combined are strictly increasing in the
    /// order they were taken.
    ///
    /// # Errors
    ///
    /// - [`Error::Closed`] once [`Self::close`] has been called, including for
    ///   callers that were already waiting
    /// - [`Error::ProducerStopped`] once the producer thread has died and the
    ///   buffer is drained
    pub fn next_id(&self) -> Result<u64> {
        let backoff = Backoff::new();
        loop {
            match self.poll_id()? {
                IdGenStatus::Ready { id } => break Ok(id),
                IdGenStatus::Pending => pause(&backoff),
            }
        }
    }

    /// Takes the next ID if one is buffered, without waiting.
    ///
    /// # Errors
    ///
    /// - [`Error::Closed`] once [`Self::close`] has been called
    /// - [`Error::ProducerStopped`] once the producer thread has died and the
    ///   buffer is drained
    #[inline]
    pub fn poll_id(&self) -> Result<IdGenStatus> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        if let Some(id) = self.shared.ring.pop() {
            return Ok(IdGenStatus::Ready { id });
        }
        self.cold_empty()
    }

    #[cold]
    #[inline(never)]
    fn cold_empty(&self) -> Result<IdGenStatus> {
        if self.shared.state() != ProducerState::Stopped {
            return Ok(IdGenStatus::Pending);
        }
        // `Stopped` is published after the final push, so one more pop sees
        // everything the producer left behind.
        if let Some(id) = self.shared.ring.pop() {
            return Ok(IdGenStatus::Ready { id });
        }
        if self.closed.load(Ordering::Acquire) {
            Err(Error::Closed)
        } else {
            Err(Error::ProducerStopped)
        }
    }

    /// Stops the producer, joins it and discards every buffered ID.
    ///
    /// Safe to call more than once and concurrently with [`Self::next_id`].
    /// Concurrent callers block until the first one has finished joining.
    /// Also runs on drop.
    ///
    /// # Errors
    ///
    /// [`Error::ProducerPanicked`] from the call that joined a producer thread
    /// which panicked. Later calls return `Ok(())`.
    pub fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.shared.request_stop();

        let mut producer = self.producer.lock();
        let Some(handle) = producer.take() else {
            return Ok(());
        };

        let joined = handle.join();
        let _discarded = self.shared.ring.clear();

        #[cfg(feature = "tracing")]
        tracing::info!(
            worker_id = self.worker_id,
            discarded = _discarded,
            "generator closed"
        );

        joined.map_err(|_| {
            #[cfg(feature = "tracing")]
            tracing::error!(worker_id = self.worker_id, "sequence producer panicked");
            Error::ProducerPanicked
        })
    }

    /// Whether [`Self::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// The worker ID embedded in every ID from this generator.
    pub fn worker_id(&self) -> u64 {
        self.worker_id
    }

    /// The validated bit layout.
    pub fn layout(&self) -> BitLayout {
        self.layout
    }

    /// Splits an ID into its components under this generator's layout.
    pub fn decode(&self, id: u64) -> IdParts {
        self.layout.decode(id)
    }

    /// What the producer thread is currently doing.
    pub fn producer_state(&self) -> ProducerState {
        self.shared.state()
    }

    /// Approximate number of IDs waiting in the buffer.
    pub fn buffered(&self) -> usize {
        self.shared.ring.len()
    }

    /// Capacity of the ring buffer.
    pub fn capacity(&self) -> usize {
        self.shared.ring.capacity()
    }
}

impl Drop for DayflakeGenerator {
    fn drop(&mut self) {
        // A panicked producer is already logged by `close`.
        let _ = self.close();
    }
}
