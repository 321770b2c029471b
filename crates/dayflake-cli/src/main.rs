#![doc = include_str!("../README.md")]

mod commands;
mod config;
mod telemetry;

use std::io::{BufWriter, Write};

use clap::Parser;
use config::{CliArgs, Command, Settings};
use dayflake::SystemClock;
use telemetry::init_telemetry;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let settings = Settings::try_from(args)?;

    init_telemetry()?;
    tracing::debug!("running with settings: {settings:#?}");

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match &settings.command {
        Command::Mint { count } => commands::mint(&settings, *count, SystemClock, &mut out)?,
        Command::Decode { ids } => {
            commands::decode(settings.layout, settings.generator.epoch, ids, &mut out)?;
        }
    }

    out.flush()?;
    Ok(())
}
