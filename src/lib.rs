#[macro_use]
pub mod error;         // Typed errors and error helper macros

pub mod channels;      // Inter-component communication channels
pub mod config;        // Configuration management
pub mod database;      // SQL storage of readings
pub mod datalog_writer; // JSON lines log of readings
pub mod influx;        // InfluxDB integration
pub mod options;       // Command line options parsing
pub mod poller;        // Fetch, decode and publish on every tick
pub mod prelude;       // Common imports and types
pub mod scheduler;     // Periodic poll trigger
pub mod tristar;       // Tristar register decoding and Modbus transport

// Get the package version from Cargo.toml
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::database::Database;
use crate::datalog_writer::DatalogWriter;
use crate::influx::Influx;
use crate::poller::{PollStats, Poller};
use crate::prelude::*;
use crate::scheduler::Scheduler;
use crate::tristar::ModbusSource;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Sets up env_logger. `RUST_LOG` wins over the configured level.
pub fn init_logging(default_level: &str) {
    if let Err(e) = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init()
    {
        eprintln!("Failed to initialise logging: {}", e);
    }
}

/// Holds every component of the running service.
#[derive(Clone)]
pub struct Components {
    pub poller: Poller,
    pub scheduler: Scheduler,
    pub influx: Option<Influx>,
    pub databases: Vec<Database>,
    pub datalog_writer: Option<DatalogWriter>,
}

impl Components {
    pub fn new(config: ConfigWrapper, channels: Channels, source: Arc<dyn RegisterSource>) -> Result<Self> {
        let influx = config
            .influx_enabled()
            .then(|| Influx::new(config.clone(), channels.clone()));

        let databases: Vec<_> = config
            .enabled_databases()
            .into_iter()
            .map(|db| Database::new(db, channels.clone()))
            .collect();
        info!("Created {} database connections", databases.len());

        let datalog_writer = config
            .datalog_file()
            .map(|path| DatalogWriter::new(path, channels.clone()))
            .transpose()?;

        Ok(Self {
            poller: Poller::new(source, channels.clone()),
            scheduler: Scheduler::new(config, channels),
            influx,
            databases,
            datalog_writer,
        })
    }

    /// Spawns sinks first, then the poller, then the scheduler that drives it.
    pub fn start(&self) -> Vec<(&'static str, JoinHandle<Result<()>>)> {
        let mut handles = Vec::new();

        if let Some(influx) = self.influx.clone() {
            handles.push(("influx", tokio::spawn(async move { influx.start().await })));
        }
        for database in self.databases.iter().cloned() {
            handles.push(("database", tokio::spawn(async move { database.start().await })));
        }
        if let Some(writer) = self.datalog_writer.clone() {
            handles.push(("datalog", tokio::spawn(async move { writer.start().await })));
        }

        let poller = self.poller.clone();
        handles.push(("poller", tokio::spawn(async move { poller.start().await })));

        let scheduler = self.scheduler.clone();
        handles.push(("scheduler", tokio::spawn(async move { scheduler.start().await })));

        handles
    }

    /// Stops the scheduler and the poller. A poll already in flight still completes and publishes.
    pub fn stop_producers(&self) {
        info!("Stopping scheduler and poller...");

        self.scheduler.stop();
        self.poller.stop();
    }

    /// Stops the sinks. Only call once the poller task has exited, or its last reading is lost.
    pub fn stop_sinks(&self) {
        info!("Stopping sinks...");

        if let Some(influx) = &self.influx {
            influx.stop();
        }
        for database in &self.databases {
            database.stop();
        }
        if let Some(writer) = &self.datalog_writer {
            writer.stop();
        }
    }
}

fn is_producer(name: &str) -> bool {
    matches!(name, "poller" | "scheduler")
}

async fn wait_for(handles: Vec<(&'static str, JoinHandle<Result<()>>)>) {
    let results = futures::future::join_all(
        handles
            .into_iter()
            .map(|(name, handle)| async move { (name, handle.await) }),
    )
    .await;
    for (name, result) in results {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("{} task failed: {}", name, e),
            Err(e) => error!("Error waiting for {} task: {}", name, e),
        }
    }
}

/// Runs the service against the Tristar configured in `config`.
pub async fn app(shutdown_rx: broadcast::Receiver<()>, config: ConfigWrapper) -> Result<PollStats> {
    let source: Arc<dyn RegisterSource> = Arc::new(ModbusSource::new(config.tristar()));
    app_with_source(shutdown_rx, config, source).await
}

/// Runs the service until a shutdown signal arrives, returning the poll statistics.
pub async fn app_with_source(
    mut shutdown_rx: broadcast::Receiver<()>,
    config: ConfigWrapper,
    source: Arc<dyn RegisterSource>,
) -> Result<PollStats> {
    info!("tristar-bridge {} starting", CARGO_PKG_VERSION);

    let channels = Channels::new();
    let components = Components::new(config, channels, source)?;
    let handles = components.start();

    info!("Waiting for shutdown signal...");
    let _ = shutdown_rx.recv().await;

    info!("Shutdown signal received, stopping components...");
    let (producers, sinks): (Vec<_>, Vec<_>) = handles.into_iter().partition(|(name, _)| is_producer(name));

    components.stop_producers();
    wait_for(producers).await;

    components.stop_sinks();
    wait_for(sinks).await;

    let stats = components.poller.stats();
    stats.print_summary();
    info!("Application shutdown complete");

    Ok(stats)
}
