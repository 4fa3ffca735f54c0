use crate::prelude::*;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(PartialEq, Clone, Debug)]
pub enum ChannelData {
    Reading(Box<Reading>),
    Shutdown,
}

/// Appends every reading, raw registers and decoded record, to a JSON lines file.
#[derive(Debug, Clone)]
pub struct DatalogWriter {
    file: Arc<Mutex<std::fs::File>>,
    path: String,
    channels: Channels,
    readings_written: Arc<Mutex<u64>>,
}

impl DatalogWriter {
    pub fn new(path: &str, channels: Channels) -> Result<Self> {
        info!("Opening datalog file at {}", path);

        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                error!("Failed to open datalog file {}: {}", path, e);
                return Err(e.into());
            }
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)) {
                error!("Failed to set permissions on datalog file {}: {}", path, e);
                return Err(e.into());
            }
        }

        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            path: path.to_string(),
            channels,
            readings_written: Arc::new(Mutex::new(0)),
        })
    }

    pub async fn start(&self) -> Result<()> {
        let mut receiver = self.channels.to_datalog.subscribe();

        loop {
            match receiver.recv().await {
                Ok(ChannelData::Shutdown) | Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("datalog writer lagged, dropped {} readings", n);
                }
                Ok(ChannelData::Reading(reading)) => {
                    if let Err(e) = self.write_reading(&reading) {
                        error!("Failed to write reading to {}: {}", self.path, e);
                    }
                }
            }
        }

        info!("datalog writer loop exiting");

        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.to_datalog.send(ChannelData::Shutdown);
    }

    pub fn write_reading(&self, reading: &Reading) -> Result<()> {
        let mut raw_data = serde_json::Map::new();
        for (register, value) in reading.raw.iter().enumerate() {
            raw_data.insert(
                register.to_string(),
                serde_json::Value::String(format!("0x{:04X}", value)),
            );
        }

        let json = serde_json::json!({
            "utc_timestamp": reading.time.timestamp(),
            "unit_id": reading.unit_id,
            "raw_data": raw_data,
            "record": reading.record,
        });
        let json_string = serde_json::to_string(&json)?;

        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("Failed to lock datalog file"))?;
        writeln!(file, "{}", json_string)?;
        file.flush()?;

        let mut readings_written = self
            .readings_written
            .lock()
            .map_err(|_| anyhow!("Failed to lock readings counter"))?;
        *readings_written += 1;
        debug!("Total readings stored in datalog file: {}", *readings_written);

        Ok(())
    }
}
