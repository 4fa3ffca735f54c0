pub use anyhow::{anyhow, bail, Result};
pub use log::{debug, error, info, trace, warn};
pub use std::io::Write;
pub use std::str::FromStr;
pub use tokio::sync::broadcast;

pub use crate::channels::Channels;
pub use crate::config::{self, ConfigWrapper};
pub use crate::database;
pub use crate::datalog_writer;
pub use crate::influx;
pub use crate::scheduler;
pub use crate::tristar::{self, MeasurementRecord, Reading, RegisterSource};
