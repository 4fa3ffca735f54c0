use crate::prelude::*;

use std::sync::{Arc, Mutex};

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct PollStats {
    pub polls: u64,
    pub fetch_failures: u64,
    pub decode_failures: u64,
    pub readings_published: u64,
}

impl PollStats {
    pub fn print_summary(&self) {
        info!("Poll Statistics:");
        info!("  Polls: {}", self.polls);
        info!("  Fetch failures: {}", self.fetch_failures);
        info!("  Decode failures: {}", self.decode_failures);
        info!("  Readings published: {}", self.readings_published);
    }
}

/// Turns scheduler ticks into readings: fetch, decode, hand off to the sinks.
///
/// A failed fetch or decode only costs that one poll; the loop keeps going.
#[derive(Clone)]
pub struct Poller {
    source: Arc<dyn RegisterSource>,
    channels: Channels,
    pub stats: Arc<Mutex<PollStats>>,
}

impl Poller {
    pub fn new(source: Arc<dyn RegisterSource>, channels: Channels) -> Self {
        Self {
            source,
            channels,
            stats: Arc::new(Mutex::new(PollStats::default())),
        }
    }

    pub async fn start(&self) -> Result<()> {
        let mut receiver = self.channels.to_poller.subscribe();

        debug!("poller starting");

        loop {
            match receiver.recv().await {
                Ok(scheduler::ChannelData::Poll) => {
                    self.poll_once().await;
                }
                Ok(scheduler::ChannelData::Shutdown) => break,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("poller fell behind, skipped {} poll triggers", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        info!("poller loop exiting");

        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.to_poller.send(scheduler::ChannelData::Shutdown);
    }

    pub fn stats(&self) -> PollStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn update_stats(&self, f: impl FnOnce(&mut PollStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            f(&mut stats);
        }
    }

    /// Runs a single poll cycle, returning the reading if one was produced.
    pub async fn poll_once(&self) -> Option<Reading> {
        self.update_stats(|s| s.polls += 1);
        let unit_id = self.source.unit_id();

        let raw = match self.source.read_registers().await {
            Ok(raw) => raw,
            Err(err) => {
                error!("Failed to read registers from tristar unit {}: {}", unit_id, err);
                self.update_stats(|s| s.fetch_failures += 1);
                return None;
            }
        };

        info!("Successfully retrieved {} registers from tristar unit {}", raw.len(), unit_id);

        let record = match tristar::decode_block(&raw) {
            Ok(record) => record,
            Err(err) => {
                warn!("Discarding poll from tristar unit {}: {}", unit_id, err);
                self.update_stats(|s| s.decode_failures += 1);
                return None;
            }
        };

        log_record(&record);

        let reading = Reading {
            time: chrono::Utc::now(),
            unit_id,
            raw,
            record,
        };
        self.publish(&reading);
        self.update_stats(|s| s.readings_published += 1);

        Some(reading)
    }

    fn publish(&self, reading: &Reading) {
        // a send only fails when that sink is disabled and nobody subscribed
        let _ = self
            .channels
            .to_database
            .send(database::ChannelData::Reading(Box::new(reading.clone())));
        let _ = self
            .channels
            .to_influx
            .send(influx::ChannelData::Reading(Box::new(reading.clone())));
        let _ = self
            .channels
            .to_datalog
            .send(datalog_writer::ChannelData::Reading(Box::new(reading.clone())));
    }
}

fn log_record(record: &MeasurementRecord) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }

    for spec in tristar::FIELDS.iter() {
        if let Some(value) = record.get(spec.name) {
            debug!("{}", spec.describe(value));
        }
    }
}
