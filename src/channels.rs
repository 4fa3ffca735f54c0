use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct Channels {
    pub to_poller: broadcast::Sender<scheduler::ChannelData>,
    pub to_database: broadcast::Sender<database::ChannelData>,
    pub to_influx: broadcast::Sender<influx::ChannelData>,
    pub to_datalog: broadcast::Sender<datalog_writer::ChannelData>,
}

impl Default for Channels {
    fn default() -> Self {
        Self::new()
    }
}

impl Channels {
    pub fn new() -> Self {
        Self {
            to_poller: Self::channel(),
            to_database: Self::channel(),
            to_influx: Self::channel(),
            to_datalog: Self::channel(),
        }
    }

    fn channel<T: Clone>() -> broadcast::Sender<T> {
        broadcast::channel(2048).0
    }
}
