//! Core application runner (business logic) for `ibs-th1-listener`.
//!
//! This module is intentionally decoupled from CLI parsing and process exit
//! codes so it can be tested deterministically with an injected scanner,
//! injected output streams and an injected shutdown signal.

use crate::alias::{Alias, AliasMap};
use crate::output::OutputFormatter;
use crate::output::influxdb::InfluxDbFormatter;
use crate::reading::Reading;
use crate::scanner::{ScanError, Scanner};
use crate::subscription::ReadingSubscription;
use crate::throttle::Throttle;
use clap::Parser;
use std::io;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Configuration for the core run loop.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// The name of the measurement in InfluxDB line protocol.
    #[arg(long, default_value = "ibs_th1")]
    pub influxdb_measurement: String,

    /// Specify human-readable alias for a sensor.
    /// Format: --alias 49:42:53:00:00:01=Cellar
    #[arg(long = "alias", value_parser = crate::alias::parse_alias, value_name = "ALIAS")]
    pub aliases: Vec<Alias>,

    /// Verbose output, print checksum failures for corrupted frames
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Throttle readings per sensor to at most one per interval.
    /// Accepts duration with suffix: 3s, 1m, 500ms, 2h.
    /// Without suffix, value is interpreted as seconds.
    #[arg(long, value_parser = crate::throttle::parse_duration)]
    pub throttle: Option<Duration>,
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn write_reading(
    reading: &Reading,
    options: &Options,
    throttle: &mut Option<Throttle>,
    formatter: &dyn OutputFormatter,
    aliases: &AliasMap,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> io::Result<()> {
    match &reading.error {
        Some(error) => {
            if options.verbose {
                writeln!(err, "{}: {}", reading.device_id, error)?;
            }
        }
        None => {
            let should_emit = throttle
                .as_mut()
                .is_none_or(|t: &mut Throttle| t.should_emit(reading.device_id));

            if should_emit {
                let name = crate::alias::resolve_name(&reading.device_id, aliases);
                writeln!(out, "{}", formatter.format(reading, &name))?;
            }
        }
    }
    Ok(())
}

/// Run the core processing loop until `shutdown` resolves.
///
/// Subscribes to the decoded reading stream, writing formatted lines for
/// successful readings to `out` and, when `options.verbose` is set, checksum
/// failures to `err`. On shutdown the scan is stopped and readings already
/// queued are flushed before returning.
pub async fn run_with_io(
    options: Options,
    scanner: Arc<dyn Scanner>,
    shutdown: impl Future<Output = ()>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), RunError> {
    let aliases: AliasMap = crate::alias::to_map(&options.aliases);
    let formatter = InfluxDbFormatter::new(options.influxdb_measurement.clone());

    // Create throttle if interval is specified
    let mut throttle = options.throttle.map(Throttle::new);

    // The subscription callback runs on the scanner's delivery context; the
    // channel bridges readings over to this loop.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = ReadingSubscription::new(scanner);
    subscription.subscribe(move |reading| {
        let _ = tx.send(reading);
    });

    let mut shutdown = std::pin::pin!(shutdown);
    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(reading) => write_reading(
                    &reading, &options, &mut throttle, &formatter, &aliases, out, err,
                )?,
                None => break,
            },
            _ = &mut shutdown => break,
        }
    }

    // Unsubscribing drops the callback and with it the channel sender, so
    // the flush below terminates once queued readings are written out.
    subscription.unsubscribe();
    while let Some(reading) = rx.recv().await {
        write_reading(
            &reading, &options, &mut throttle, &formatter, &aliases, out, err,
        )?;
    }

    Ok(())
}
