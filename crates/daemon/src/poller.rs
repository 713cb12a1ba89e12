use slog::{debug, error, info, o, warn, Logger};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{encode, parse, AgentConfig, ObservationSource, PointWriter};

pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Outcome counts for one pass over the airport set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub written: usize,
    /// No observation, or nothing to write.
    pub skipped: usize,
    /// InfluxDB refused the point or could not be reached.
    pub failed: usize,
}

pub struct Poller {
    logger: Logger,
    config: Arc<AgentConfig>,
    source: Arc<dyn ObservationSource>,
    writer: Arc<dyn PointWriter>,
    clock: Arc<dyn Clock>,
}

impl Poller {
    pub fn new(
        logger: Logger,
        config: Arc<AgentConfig>,
        source: Arc<dyn ObservationSource>,
        writer: Arc<dyn PointWriter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Poller {
            logger,
            config,
            source,
            writer,
            clock,
        }
    }

    /// Fetch every configured airport once and write what came back. Each
    /// airport is handled on its own; a failure is logged and the next
    /// airport proceeds.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        let mut observations = self.source.fetch(&self.config.airports).await;

        for airport in &self.config.airports {
            let logger = self.logger.new(o!("airport" => airport.clone()));
            let raw = match observations.remove(airport) {
                Some(Ok(raw)) => raw,
                Some(Err(e)) => {
                    warn!(logger, "Could not fetch data for airport {}: {}", airport, e);
                    report.skipped += 1;
                    continue;
                }
                None => {
                    warn!(logger, "Could not fetch data for airport {}: no result", airport);
                    report.skipped += 1;
                    continue;
                }
            };

            let point = encode(&parse(raw), self.clock.now());
            if !point.has_fields() {
                warn!(logger, "observation for {} has no usable values, not writing", airport);
                report.skipped += 1;
                continue;
            }

            debug!(logger, "point: {}", point);
            match self.writer.write(&point).await {
                Ok(_) => report.written += 1,
                Err(e) => {
                    error!(logger, "Failed to send data to InfluxDB: {}", e);
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Poll until `shutdown` is cancelled, sleeping the configured interval
    /// after each cycle. Cancellation interrupts both the sleep and an
    /// in-flight cycle.
    pub async fn run(&self, shutdown: CancellationToken) {
        let interval = self.config.poll_interval();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(self.logger, "shutdown requested during cycle");
                    break;
                }
                report = self.run_cycle() => info!(
                    self.logger,
                    "Finished cycle: {} written, {} skipped, {} failed",
                    report.written, report.skipped, report.failed
                ),
            }

            info!(self.logger, "Sleeping for {} seconds...", interval.as_secs());
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep(interval) => {}
            }
        }
        info!(self.logger, "poll loop stopped");
    }
}
