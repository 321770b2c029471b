use core::time::Duration;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dayflake::{BitLayout, DEFAULT_QUEUE_CAPACITY, GeneratorConfig};

/// Command-line and environment configuration for the `dayflake` binary.
///
/// Every option can also be supplied through its `DAYFLAKE_*` environment
/// variable or a `.env` file. Defaults match [`GeneratorConfig::default`].
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dayflake",
    version,
    about = "Mint and decode day-indexed, strictly monotonic 64-bit IDs"
)]
pub struct CliArgs {
    /// Worker ID embedded in minted IDs. Must be unique among live
    /// generators sharing an ID namespace.
    ///
    /// Environment variable: `DAYFLAKE_WORKER_ID`
    #[arg(long, env = "DAYFLAKE_WORKER_ID", default_value_t = 0)]
    pub worker_id: u64,

    /// Width of the day index field.
    ///
    /// Environment variable: `DAYFLAKE_DAY_INDEX_BITS`
    #[arg(long, env = "DAYFLAKE_DAY_INDEX_BITS", default_value_t = BitLayout::DEFAULT.day_index_bits())]
    pub day_index_bits: u8,

    /// Width of the worker ID field.
    ///
    /// Environment variable: `DAYFLAKE_WORKER_ID_BITS`
    #[arg(long, env = "DAYFLAKE_WORKER_ID_BITS", default_value_t = BitLayout::DEFAULT.worker_id_bits())]
    pub worker_id_bits: u8,

    /// Width of the per-day sequence field.
    ///
    /// Environment variable: `DAYFLAKE_SEQUENCE_BITS`
    #[arg(long, env = "DAYFLAKE_SEQUENCE_BITS", default_value_t = BitLayout::DEFAULT.sequence_bits())]
    pub sequence_bits: u8,

    /// Sequence carried by the first ID of every day.
    ///
    /// Environment variable: `DAYFLAKE_INITIAL_SEQUENCE`
    #[arg(long, env = "DAYFLAKE_INITIAL_SEQUENCE", default_value_t = 0)]
    pub initial_sequence: u64,

    /// Number of IDs minted ahead of demand. Must be a power of two.
    ///
    /// Environment variable: `DAYFLAKE_QUEUE_CAPACITY`
    #[arg(long, env = "DAYFLAKE_QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Advance the sequence by a random step in `1..=max-random-increment`.
    ///
    /// Environment variable: `DAYFLAKE_ENABLE_SEQUENCE_RANDOM`
    #[arg(long, env = "DAYFLAKE_ENABLE_SEQUENCE_RANDOM", default_value_t = false)]
    pub enable_sequence_random: bool,

    /// Largest random sequence step.
    ///
    /// Environment variable: `DAYFLAKE_MAX_RANDOM_INCREMENT`
    #[arg(long, env = "DAYFLAKE_MAX_RANDOM_INCREMENT", default_value_t = 1)]
    pub max_random_increment: u64,

    /// UTC calendar day that day index `0` refers to.
    ///
    /// Environment variable: `DAYFLAKE_EPOCH`
    #[arg(long, env = "DAYFLAKE_EPOCH", default_value = "2025-01-01")]
    pub epoch: NaiveDate,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Mint IDs and print them one per line.
    Mint {
        /// How many IDs to mint.
        #[arg(short, long, default_value_t = 1)]
        count: u64,
    },
    /// Print the day, worker, sequence and calendar day of each ID.
    Decode {
        /// IDs to decode.
        #[arg(required = true)]
        ids: Vec<u64>,
    },
}

/// Validated settings derived from [`CliArgs`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub worker_id: u64,
    pub generator: GeneratorConfig,
    pub layout: BitLayout,
    pub command: Command,
}

impl TryFrom<CliArgs> for Settings {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let epoch = epoch_since_unix(args.epoch)?;

        let generator = GeneratorConfig {
            worker_id_bits: args.worker_id_bits,
            day_index_bits: args.day_index_bits,
            sequence_bits: args.sequence_bits,
            initial_sequence: args.initial_sequence,
            queue_capacity: args.queue_capacity,
            enable_sequence_random: args.enable_sequence_random,
            max_random_increment: args.max_random_increment,
            epoch,
        };
        let layout = generator
            .validate()
            .context("invalid generator configuration")?;

        if args.worker_id > layout.max_worker_id() {
            bail!(
                "DAYFLAKE_WORKER_ID ({}) exceeds the worker ID space (max = {})",
                args.worker_id,
                layout.max_worker_id()
            );
        }

        if args.command == (Command::Mint { count: 0 }) {
            bail!("--count must be greater than 0");
        }

        Ok(Self {
            worker_id: args.worker_id,
            generator,
            layout,
            command: args.command,
        })
    }
}

/// Converts a UTC calendar day into a duration since the Unix epoch.
fn epoch_since_unix(date: NaiveDate) -> anyhow::Result<Duration> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .context("epoch has no midnight")?
        .and_utc()
        .timestamp_millis();

    let Ok(millis) = u64::try_from(midnight) else {
        bail!("DAYFLAKE_EPOCH ({date}) is before 1970-01-01");
    };
    Ok(Duration::from_millis(millis))
}
