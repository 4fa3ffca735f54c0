use crate::prelude::*;

use tokio::time::{Duration, MissedTickBehavior};

#[derive(Eq, PartialEq, Clone, Debug)]
pub enum ChannelData {
    Poll,
    Shutdown,
}

/// Emits a poll trigger every `tristar.poll_interval` seconds, starting immediately.
#[derive(Clone)]
pub struct Scheduler {
    interval: Duration,
    channels: Channels,
}

impl Scheduler {
    pub fn new(config: ConfigWrapper, channels: Channels) -> Self {
        Self::with_interval(Duration::from_secs(config.tristar().poll_interval()), channels)
    }

    pub fn with_interval(interval: Duration, channels: Channels) -> Self {
        Self { interval, channels }
    }

    pub async fn start(&self) -> Result<()> {
        let mut receiver = self.channels.to_poller.subscribe();
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("scheduler polling every {}s", self.interval.as_secs());

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    trace!("poll tick");
                    if self.channels.to_poller.send(ChannelData::Poll).is_err() {
                        warn!("no poller listening, skipping tick");
                    }
                }
                message = receiver.recv() => match message {
                    Ok(ChannelData::Shutdown) | Err(broadcast::error::RecvError::Closed) => break,
                    // our own Poll messages, or lag from them
                    Ok(ChannelData::Poll) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                },
            }
        }

        info!("scheduler loop exiting");

        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.to_poller.send(ChannelData::Shutdown);
    }
}
