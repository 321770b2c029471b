use crate::{
    ConfigError, DayflakeGenerator, Error, GeneratorConfig, IdGenStatus, MILLIS_PER_DAY,
    ProducerState, StaticWorkerId, TimeSource,
};
use core::time::Duration;
use portable_atomic::{AtomicU64, Ordering};
use std::{
    collections::HashSet,
    sync::Arc,
    thread::{scope, sleep},
    time::Instant,
};

/// Reports a fixed day.
struct FixedDay(u64);

impl TimeSource for FixedDay {
    fn current_millis(&self) -> u64 {
        self.0 * MILLIS_PER_DAY
    }
}

/// Reports `day` for the first `calls_before_rollover` reads and `day + 1`
/// afterwards.
struct StepDayClock {
    day: u64,
    calls_before_rollover: u64,
    calls: AtomicU64,
}

impl TimeSource for StepDayClock {
    fn current_millis(&self) -> u64 {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let day = if call < self.calls_before_rollover {
            self.day
        } else {
            self.day + 1
        };
        day * MILLIS_PER_DAY + MILLIS_PER_DAY / 2
    }
}

/// A day index the test advances by hand.
struct ManualClock {
    day: AtomicU64,
}

impl ManualClock {
    fn at_day(day: u64) -> Arc<Self> {
        Arc::new(Self {
            day: AtomicU64::new(day),
        })
    }

    fn advance_day(&self) {
        self.day.fetch_add(1, Ordering::Relaxed);
    }
}

impl TimeSource for ManualClock {
    fn current_millis(&self) -> u64 {
        self.day.load(Ordering::Relaxed) * MILLIS_PER_DAY
    }
}

/// Reports a fixed day for the first `limit` reads, then panics.
struct FailingClock {
    reads: AtomicU64,
    limit: u64,
}

impl TimeSource for FailingClock {
    fn current_millis(&self) -> u64 {
        let read = self.reads.fetch_add(1, Ordering::Relaxed);
        assert!(read < self.limit, "clock source failed");
        MILLIS_PER_DAY
    }
}

fn config() -> GeneratorConfig {
    GeneratorConfig {
        epoch: Duration::ZERO,
        ..GeneratorConfig::default()
    }
}

fn wait_for_state(generator: &DayflakeGenerator, state: ProducerState) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while generator.producer_state() != state {
        assert!(Instant::now() < deadline, "producer never reached {state:?}");
        sleep(Duration::from_millis(1));
    }
}

fn assert_strictly_increasing(ids: &[u64]) {
    for pair in ids.windows(2) {
        assert!(pair[0] < pair[1], "{} was served before {}", pair[0], pair[1]);
    }
}

#[test]
fn ids_are_strictly_increasing_and_carry_components() {
    let generator = DayflakeGenerator::new(&config(), &StaticWorkerId(9), FixedDay(100)).unwrap();

    let ids: Vec<_> = (0..10_000).map(|_| generator.next_id().unwrap()).collect();
    assert_strictly_increasing(&ids);

    for (expected, id) in (0..).zip(&ids) {
        let parts = generator.decode(*id);
        assert_eq!(parts.day_index, 100);
        assert_eq!(parts.worker_id, 9);
        assert_eq!(parts.sequence, expected);
    }
    assert_eq!(generator.worker_id(), 9);
}

#[test]
fn rejects_non_power_of_two_capacity() {
    let config = GeneratorConfig {
        queue_capacity: 100,
        ..config()
    };
    let result = DayflakeGenerator::new(&config, &StaticWorkerId(0), FixedDay(1));
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::CapacityNotPowerOfTwo { capacity: 100 }))
    ));
}

#[test]
fn rejects_layout_wider_than_63_bits() {
    let config = GeneratorConfig {
        worker_id_bits: 40,
        day_index_bits: 20,
        sequence_bits: 10,
        ..config()
    };
    let result = DayflakeGenerator::new(&config, &StaticWorkerId(0), FixedDay(1));
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::WidthOverflow { total: 70 }))
    ));
}

#[test]
fn rejects_zero_random_increment() {
    let config = GeneratorConfig {
        enable_sequence_random: true,
        max_random_increment: 0,
        ..config()
    };
    let result = DayflakeGenerator::new(&config, &StaticWorkerId(0), FixedDay(1));
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::ZeroRandomIncrement))
    ));
}

#[test]
fn failing_worker_source_fails_construction() {
    let lease = || -> Result<u64, std::io::Error> { Err(std::io::Error::other("no lease available")) };
    let err = DayflakeGenerator::new(&config(), &lease, FixedDay(1))
        .err()
        .expect("construction must fail");
    assert!(matches!(err, Error::WorkerIdSource(_)));
    assert!(err.to_string().contains("no lease available"));
}

#[test]
fn worker_source_is_called_once() {
    let calls = AtomicU64::new(0);
    let lease = || -> Result<u64, std::io::Error> {
        calls.fetch_add(1, Ordering::Relaxed);
        Ok(77)
    };
    let generator = DayflakeGenerator::new(&config(), &lease, FixedDay(1)).unwrap();
    for _ in 0..100 {
        let id = generator.next_id().unwrap();
        assert_eq!(generator.decode(id).worker_id, 77);
    }
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}

#[test]
fn rejects_worker_id_outside_layout() {
    let config = GeneratorConfig {
        worker_id_bits: 4,
        ..config()
    };
    let result = DayflakeGenerator::new(&config, &StaticWorkerId(16), FixedDay(1));
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::WorkerIdOutOfRange {
            worker_id: 16,
            max: 15
        }))
    ));
}

#[test]
fn rejects_clock_before_epoch_and_past_last_day() {
    let before = GeneratorConfig {
        epoch: Duration::from_millis(10 * MILLIS_PER_DAY),
        ..config()
    };
    assert!(matches!(
        DayflakeGenerator::new(&before, &StaticWorkerId(0), FixedDay(3)),
        Err(Error::Config(ConfigError::ClockBeforeEpoch { .. }))
    ));

    let short_days = GeneratorConfig {
        day_index_bits: 3,
        ..config()
    };
    assert!(matches!(
        DayflakeGenerator::new(&short_days, &StaticWorkerId(0), FixedDay(8)),
        Err(Error::Config(ConfigError::DayOutOfRange { day: 8, max: 7 }))
    ));
}

#[test]
fn day_rollover_resets_sequence_and_keeps_order() {
    let clock = StepDayClock {
        day: 500,
        calls_before_rollover: 64,
        calls: AtomicU64::new(0),
    };
    let config = GeneratorConfig {
        initial_sequence: 3,
        queue_capacity: 16,
        ..config()
    };
    let generator = DayflakeGenerator::new(&config, &StaticWorkerId(1), clock).unwrap();

    let ids: Vec<_> = (0..256).map(|_| generator.next_id().unwrap()).collect();
    assert_strictly_increasing(&ids);

    let (before, after): (Vec<u64>, Vec<u64>) = ids
        .iter()
        .partition(|id| generator.decode(**id).day_index == 500);
    assert!(!before.is_empty() && !after.is_empty());
    assert!(before.iter().max() < after.iter().min());

    assert_eq!(generator.decode(before[0]).sequence, 3);
    let first_after = generator.decode(after[0]);
    assert_eq!(first_after.day_index, 501);
    assert_eq!(first_after.sequence, 3);
}

#[test]
fn full_day_of_ids_then_waits_for_next_day() {
    let clock = ManualClock::at_day(40);
    let config = GeneratorConfig {
        sequence_bits: 4,
        queue_capacity: 64,
        ..config()
    };
    let generator = DayflakeGenerator::new(&config, &StaticWorkerId(2), Arc::clone(&clock)).unwrap();

    // Every sequence value, the maximum included, is served within the day.
    for expected in 0..16 {
        let parts = generator.decode(generator.next_id().unwrap());
        assert_eq!(parts.day_index, 40);
        assert_eq!(parts.sequence, expected);
    }

    wait_for_state(&generator, ProducerState::DayExhausted);
    assert_eq!(generator.poll_id().unwrap(), IdGenStatus::Pending);

    clock.advance_day();
    let parts = generator.decode(generator.next_id().unwrap());
    assert_eq!(parts.day_index, 41);
    assert_eq!(parts.sequence, 0);
}

#[test]
fn concurrent_callers_get_unique_increasing_ids() {
    const THREADS: usize = 20;
    const IDS_PER_THREAD: usize = 335_545;

    let generator = DayflakeGenerator::new(&config(), &StaticWorkerId(5), FixedDay(9)).unwrap();

    let per_thread: Vec<Vec<u64>> = scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    (0..IDS_PER_THREAD)
                        .map(|_| generator.next_id().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut all = Vec::with_capacity(THREADS * IDS_PER_THREAD);
    for ids in per_thread {
        assert_eq!(ids.len(), IDS_PER_THREAD);
        assert_strictly_increasing(&ids);
        all.extend(ids);
    }

    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), THREADS * IDS_PER_THREAD, "duplicate IDs were served");
}

#[test]
fn randomized_steps_stay_within_bounds() {
    let config = GeneratorConfig {
        enable_sequence_random: true,
        max_random_increment: 10,
        ..config()
    };
    let generator = DayflakeGenerator::new(&config, &StaticWorkerId(3), FixedDay(12)).unwrap();

    let ids: Vec<_> = (0..10_000).map(|_| generator.next_id().unwrap()).collect();
    assert_strictly_increasing(&ids);

    let mut steps = HashSet::new();
    for pair in ids.windows(2) {
        let step = pair[1] - pair[0];
        assert!((1..=10).contains(&step), "step {step} out of range");
        steps.insert(step);
    }
    assert!(steps.len() > 1, "steps were not randomized");
}

#[test]
fn closed_generator_rejects_calls() {
    let generator = DayflakeGenerator::new(&config(), &StaticWorkerId(0), FixedDay(1)).unwrap();
    generator.next_id().unwrap();

    generator.close().unwrap();
    assert!(generator.is_closed());
    assert!(matches!(generator.next_id(), Err(Error::Closed)));
    assert!(matches!(generator.poll_id(), Err(Error::Closed)));
    assert_eq!(generator.producer_state(), ProducerState::Stopped);
    assert_eq!(generator.buffered(), 0);

    generator.close().unwrap();
    assert!(matches!(generator.next_id(), Err(Error::Closed)));
}

#[test]
fn close_releases_waiting_callers() {
    let config = GeneratorConfig {
        sequence_bits: 2,
        ..config()
    };
    let generator = DayflakeGenerator::new(&config, &StaticWorkerId(0), FixedDay(1)).unwrap();
    let served = AtomicU64::new(0);

    scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                loop {
                    match generator.next_id() {
                        Ok(_) => {
                            served.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(Error::Closed) => break,
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            });
        }

        let deadline = Instant::now() + Duration::from_secs(10);
        while served.load(Ordering::Relaxed) < 4 {
            assert!(Instant::now() < deadline, "day was never drained");
            sleep(Duration::from_millis(1));
        }
        wait_for_state(&generator, ProducerState::DayExhausted);
        sleep(Duration::from_millis(20));
        generator.close().unwrap();
    });

    assert_eq!(served.load(Ordering::Relaxed), 4);
}

#[test]
fn concurrent_close_is_idempotent() {
    let generator = DayflakeGenerator::new(&config(), &StaticWorkerId(0), FixedDay(1)).unwrap();

    scope(|s| {
        for _ in 0..4 {
            s.spawn(|| generator.close().unwrap());
        }
    });

    assert_eq!(generator.producer_state(), ProducerState::Stopped);
    assert!(matches!(generator.next_id(), Err(Error::Closed)));
}

#[test]
fn close_stops_producer_blocked_on_full_buffer() {
    let config = GeneratorConfig {
        queue_capacity: 2,
        ..config()
    };
    let generator = DayflakeGenerator::new(&config, &StaticWorkerId(0), FixedDay(1)).unwrap();
    assert_eq!(generator.capacity(), 2);

    let deadline = Instant::now() + Duration::from_secs(10);
    while generator.buffered() < 2 {
        assert!(Instant::now() < deadline, "buffer never filled");
        sleep(Duration::from_millis(1));
    }

    let started = Instant::now();
    generator.close().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(generator.buffered(), 0);
}

#[test]
fn instances_do_not_share_state() {
    let first = DayflakeGenerator::new(&config(), &StaticWorkerId(1), FixedDay(2)).unwrap();
    let second = DayflakeGenerator::new(&config(), &StaticWorkerId(2), FixedDay(2)).unwrap();

    let a = first.decode(first.next_id().unwrap());
    let b = second.decode(second.next_id().unwrap());
    assert_eq!((a.worker_id, a.sequence), (1, 0));
    assert_eq!((b.worker_id, b.sequence), (2, 0));

    drop(first);
    assert_eq!(second.decode(second.next_id().unwrap()).sequence, 1);
}

#[test]
fn system_clock_generator_smoke() {
    let generator = DayflakeGenerator::with_worker_id(123).unwrap();
    let id = generator.next_id().unwrap();
    let parts = generator.decode(id);
    assert_eq!(parts.worker_id, 123);
    assert!(parts.day_index > 0);
    assert_eq!(generator.layout(), crate::BitLayout::DEFAULT);
}

#[test]
fn dead_producer_fails_callers_instead_of_stalling() {
    let config = GeneratorConfig {
        queue_capacity: 2,
        ..config()
    };
    // One read during construction, three more mint three IDs.
    let clock = FailingClock {
        reads: AtomicU64::new(0),
        limit: 4,
    };
    let generator = DayflakeGenerator::new(&config, &StaticWorkerId(6), clock).unwrap();

    let mut served = Vec::new();
    let err = loop {
        match generator.next_id() {
            Ok(id) => served.push(id),
            Err(e) => break e,
        }
    };
    assert!(matches!(err, Error::ProducerStopped), "unexpected error: {err}");
    assert_eq!(served.len(), 3);
    assert_strictly_increasing(&served);

    assert_eq!(generator.producer_state(), ProducerState::Stopped);
    assert!(matches!(generator.poll_id(), Err(Error::ProducerStopped)));
    assert!(!generator.is_closed());

    assert!(matches!(generator.close(), Err(Error::ProducerPanicked)));
    assert_eq!(generator.producer_state(), ProducerState::Stopped);
    assert!(matches!(generator.next_id(), Err(Error::Closed)));
    generator.close().unwrap();
}
