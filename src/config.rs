use crate::error::ConfigError;
use crate::prelude::*;

use serde::Deserialize;
use std::sync::Arc;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub tristar: Tristar,

    pub influx: Option<Influx>,

    #[serde(default = "Vec::new")]
    pub databases: Vec<Database>,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,

    /// Optional path to append every reading to in JSON lines format
    pub datalog_file: Option<String>,
}

// Tristar {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Tristar {
    pub address: String,
    #[serde(default = "Config::default_modbus_port")]
    pub port: u16,
    pub unit_id: Option<u8>,
    pub poll_interval: Option<u64>,
    pub read_timeout: Option<u64>,
}
impl Tristar {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id.unwrap_or(1)
    }

    pub fn poll_interval(&self) -> u64 {
        self.poll_interval.unwrap_or(300) // 5 minutes
    }

    pub fn read_timeout(&self) -> u64 {
        self.read_timeout.unwrap_or(10)
    }
} // }}}

// Influx {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Influx {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,

    pub database: String,
}
impl Influx {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn username(&self) -> &Option<String> {
        &self.username
    }

    pub fn password(&self) -> &Option<String> {
        &self.password
    }

    pub fn database(&self) -> &str {
        &self.database
    }
} // }}}

// Database {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Database {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    pub url: String,
}
impl Database {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn url(&self) -> &str {
        &self.url
    }
} // }}}

/// Read-only handle shared between components once the config has been validated.
#[derive(Clone, Debug)]
pub struct ConfigWrapper {
    config: Arc<Config>,
}

impl ConfigWrapper {
    pub fn new(file: String) -> Result<Self, ConfigError> {
        Ok(Self::from_config(Config::new(file)?))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn tristar(&self) -> &Tristar {
        &self.config.tristar
    }

    pub fn influx(&self) -> Option<&Influx> {
        self.config.influx.as_ref()
    }

    pub fn influx_enabled(&self) -> bool {
        self.influx().map(|i| i.enabled()).unwrap_or(false)
    }

    pub fn databases(&self) -> &[Database] {
        &self.config.databases
    }

    pub fn enabled_databases(&self) -> Vec<Database> {
        self.databases().iter().filter(|d| d.enabled()).cloned().collect()
    }

    pub fn loglevel(&self) -> &str {
        &self.config.loglevel
    }

    pub fn datalog_file(&self) -> Option<&str> {
        self.config.datalog_file.as_deref()
    }

    pub fn log_summary(&self) {
        self.config.log_summary()
    }
}

impl Config {
    pub fn new(file: String) -> Result<Self, ConfigError> {
        info!("Reading configuration from {}", file);
        let content = std::fs::read_to_string(&file).map_err(|source| ConfigError::Read {
            path: file.clone(),
            source,
        })?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn log_summary(&self) {
        info!("Configuration loaded successfully:");
        info!("  Tristar:");
        info!("    Address: {}", self.tristar.address);
        info!("    Port: {}", self.tristar.port);
        info!("    Unit ID: {}", self.tristar.unit_id());
        info!("    Poll Interval: {}s", self.tristar.poll_interval());
        info!("    Read Timeout: {}s", self.tristar.read_timeout());

        match &self.influx {
            Some(influx) if influx.enabled => {
                info!("  InfluxDB: enabled");
                info!("    URL: {}", influx.url);
                info!("    Database: {}", influx.database);
            }
            _ => info!("  InfluxDB: disabled"),
        }

        info!(
            "  Databases: {} configured, {} enabled",
            self.databases.len(),
            self.databases.iter().filter(|d| d.enabled).count()
        );
        for (i, db) in self.databases.iter().enumerate() {
            info!("    Database[{}]:", i);
            info!("      Enabled: {}", db.enabled);
            info!("      URL: {}", db.url);
        }

        info!("  Datalog File: {}", self.datalog_file.as_deref().unwrap_or("none"));
        info!("  Log Level: {}", self.loglevel);
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tristar.address.trim().is_empty() {
            return Err(ConfigError::MissingAddress);
        }
        if self.tristar.port == 0 {
            return Err(ConfigError::InvalidPort("tristar"));
        }
        if self.tristar.poll_interval() == 0 {
            return Err(ConfigError::InvalidInterval("tristar.poll_interval"));
        }
        if self.tristar.read_timeout() == 0 {
            return Err(ConfigError::InvalidInterval("tristar.read_timeout"));
        }
        // a fetch has to give up before the next poll is due
        if self.tristar.read_timeout() >= self.tristar.poll_interval() {
            return Err(ConfigError::InvalidInterval("tristar.read_timeout"));
        }

        if let Some(influx) = self.influx.as_ref().filter(|i| i.enabled) {
            url::Url::parse(&influx.url).map_err(|source| ConfigError::InvalidUrl {
                what: "influx",
                url: influx.url.clone(),
                source,
            })?;
            if influx.database.is_empty() {
                return Err(ConfigError::MissingInfluxDatabase);
            }
        }

        for db in self.databases.iter().filter(|d| d.enabled) {
            url::Url::parse(db.url()).map_err(|source| ConfigError::InvalidUrl {
                what: "database",
                url: db.url.clone(),
                source,
            })?;
        }

        Ok(())
    }

    fn default_modbus_port() -> u16 {
        502
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }
}
