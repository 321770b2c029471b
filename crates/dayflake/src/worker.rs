use core::convert::Infallible;

/// A capability that supplies this process's worker ID.
///
/// The generator calls [`WorkerIdSource::worker_id`] exactly once, during
/// construction, and keeps the value for its whole lifetime. Cluster-wide
/// uniqueness relies on the source never handing the same ID to two live
/// generators at once; how that is guaranteed (static assignment, a lease
/// from a coordinator, ...) is up to the implementation.
///
/// Any `Fn() -> Result<u64, E>` closure is a source, which makes failing
/// allocators easy to model:
///
/// ```
/// use dayflake::WorkerIdSource;
///
/// let lease = || "17".parse::<u64>();
/// assert_eq!(lease.worker_id().unwrap(), 17);
/// ```
pub trait WorkerIdSource {
    /// The error returned when no worker ID can be supplied.
    type Err: core::error::Error + Send + Sync + 'static;

    /// Returns the worker ID for this process.
    ///
    /// # Errors
    ///
    /// Returns the source's error if no worker ID is available. The generator
    /// fails construction rather than falling back to a default.
    fn worker_id(&self) -> Result<u64, Self::Err>;
}

/// A worker ID fixed at compile time or read from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StaticWorkerId(pub u64);

impl WorkerIdSource for StaticWorkerId {
    type Err = Infallible;

    fn worker_id(&self) -> Result<u64, Self::Err> {
        Ok(self.0)
    }
}

impl<F, E> WorkerIdSource for F
where
    F: Fn() -> Result<u64, E>,
    E: core::error::Error + Send + Sync + 'static,
{
    type Err = E;

    fn worker_id(&self) -> Result<u64, Self::Err> {
        self()
    }
}
