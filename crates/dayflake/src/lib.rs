//! Buffered, strictly monotonic 64-bit IDs.
//!
//! An ID packs, from most to least significant bit: a reserved zero sign bit,
//! the number of whole days since a configurable epoch, a worker ID, and a
//! per-day sequence. A dedicated producer thread mints IDs ahead of demand
//! into a lock-free ring buffer that any number of threads drain through
//! [`DayflakeGenerator::next_id`].
//!
//! ```
//! use dayflake::DayflakeGenerator;
//!
//! let generator = DayflakeGenerator::with_worker_id(7).unwrap();
//! let id = generator.next_id().unwrap();
//! println!("{}", generator.decode(id));
//! ```

mod config;
mod error;
mod generator;
mod layout;
mod rand;
mod ring;
mod status;
mod time;
mod worker;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::layout::*;
pub use crate::rand::*;
pub use crate::ring::MIN_QUEUE_CAPACITY;
pub use crate::status::*;
pub use crate::time::*;
pub use crate::worker::*;
