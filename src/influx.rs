use crate::prelude::*;

use rinfluxdb::line_protocol::{r#async::Client, LineBuilder};
use std::time::Duration;

static MEASUREMENT: &str = "tristar";

#[derive(PartialEq, Clone, Debug)]
pub enum ChannelData {
    Reading(Box<Reading>),
    Shutdown,
}

#[derive(Clone)]
pub struct Influx {
    config: ConfigWrapper,
    channels: Channels,
    retry_delay: Duration,
}

impl Influx {
    pub fn new(config: ConfigWrapper, channels: Channels) -> Self {
        Self::with_retry_delay(config, channels, Duration::from_secs(10))
    }

    pub fn with_retry_delay(config: ConfigWrapper, channels: Channels, retry_delay: Duration) -> Self {
        Self {
            config,
            channels,
            retry_delay,
        }
    }

    pub async fn start(&self) -> Result<()> {
        let config = match self.config.influx() {
            Some(config) if config.enabled() => config.clone(),
            _ => {
                info!("influx disabled, skipping");
                return Ok(());
            }
        };

        info!("initializing influx at {}", config.url());

        let client = {
            let url = reqwest::Url::parse(config.url())?;
            let credentials = match (config.username(), config.password()) {
                (Some(u), Some(p)) => Some((u, p)),
                _ => None,
            };

            Client::new(url, credentials)?
        };

        self.sender(client, config.database()).await
    }

    pub fn stop(&self) {
        let _ = self.channels.to_influx.send(ChannelData::Shutdown);
    }

    async fn sender(&self, client: Client, database: &str) -> Result<()> {
        use ChannelData::*;

        let mut receiver = self.channels.to_influx.subscribe();
        info!("InfluxDB sender started");

        loop {
            match receiver.recv().await {
                Ok(Shutdown) | Err(broadcast::error::RecvError::Closed) => {
                    info!("InfluxDB sender received shutdown signal");
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("InfluxDB sender lagged, dropped {} readings", n);
                }
                Ok(Reading(reading)) => {
                    let points = vec![line_for(&reading).build()];
                    trace!("Sending to InfluxDB: {:?}", points);

                    let mut retry_count = 0;
                    while retry_count < 3 {
                        match client.send(database, &points).await {
                            Ok(_) => {
                                info!("Successfully sent {} fields to InfluxDB", reading.record.len());
                                break;
                            }
                            Err(err) => {
                                error!(
                                    "InfluxDB push failed: {:?} - retrying in {:?} (attempt {}/3)",
                                    err,
                                    self.retry_delay,
                                    retry_count + 1
                                );
                                tokio::time::sleep(self.retry_delay).await;
                                retry_count += 1;
                            }
                        }
                    }
                    if retry_count == 3 {
                        error!("Failed to send data to InfluxDB after 3 attempts");
                    }
                }
            }
        }

        info!("InfluxDB sender loop exiting");

        Ok(())
    }
}

/// One point per reading, one field per decoded value. Integer values stay integer fields.
fn line_for(reading: &Reading) -> LineBuilder {
    let unit_id = reading.unit_id.to_string();
    let mut line = LineBuilder::new(MEASUREMENT)
        .insert_tag("unit_id", unit_id.as_str())
        .set_timestamp(reading.time);
    for (name, value) in reading.record.iter() {
        line = match value {
            tristar::FieldValue::Float(v) => line.insert_field(name, v),
            tristar::FieldValue::Integer(v) => line.insert_field(name, v),
        };
    }
    line
}
