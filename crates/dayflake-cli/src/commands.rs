use core::time::Duration;
use std::io::Write;

use chrono::{DateTime, NaiveDate};
use dayflake::{BitLayout, DayflakeGenerator, MILLIS_PER_DAY, StaticWorkerId, TimeSource};

use crate::config::Settings;

/// Mints `count` IDs and writes them to `out`, one per line.
pub fn mint<T, W>(settings: &Settings, count: u64, time: T, out: &mut W) -> anyhow::Result<()>
where
    T: TimeSource + Send + 'static,
    W: Write,
{
    let generator =
        DayflakeGenerator::new(&settings.generator, &StaticWorkerId(settings.worker_id), time)?;

    for _ in 0..count {
        writeln!(out, "{}", generator.next_id()?)?;
    }

    generator.close()?;
    Ok(())
}

/// Writes the components of each ID to `out`, one line per ID.
pub fn decode<W: Write>(
    layout: BitLayout,
    epoch: Duration,
    ids: &[u64],
    out: &mut W,
) -> anyhow::Result<()> {
    for &id in ids {
        let parts = layout.decode(id);
        match calendar_day(parts.day_index, epoch) {
            Some(date) => writeln!(out, "{id}\t{parts}\tdate={date}")?,
            None => writeln!(out, "{id}\t{parts}\tdate=out-of-range")?,
        }
    }
    Ok(())
}

/// The UTC calendar day that `day_index` whole days after `epoch` falls on.
fn calendar_day(day_index: u64, epoch: Duration) -> Option<NaiveDate> {
    let epoch_millis = u64::try_from(epoch.as_millis()).ok()?;
    let millis = day_index
        .checked_mul(MILLIS_PER_DAY)?
        .checked_add(epoch_millis)?;
    DateTime::from_timestamp_millis(i64::try_from(millis).ok()?).map(|at| at.date_naive())
}
