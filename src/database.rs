use crate::prelude::*;
use crate::tristar::{FieldValue, FIELDS};

use sqlx::{any::AnyConnectOptions, Any, Pool};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelData {
    Reading(Box<Reading>),
    Shutdown,
}

pub type Sender = broadcast::Sender<ChannelData>;

const TABLE: &str = "tristar_readings";

enum DatabaseType {
    MySQL,
    Postgres,
    SQLite,
}

#[derive(Clone, Debug)]
pub struct Database {
    config: config::Database,
    channels: Channels,
    pool: Arc<RwLock<Option<Pool<Any>>>>,
}

impl Database {
    pub fn new(config: config::Database, channels: Channels) -> Self {
        Self {
            config,
            channels,
            pool: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        info!("initializing database {}", self.config.url());

        // subscribe before connecting so readings published meanwhile are queued
        let receiver = self.channels.to_database.subscribe();

        self.connect().await?;
        self.migrate().await?;
        self.inserter(receiver).await?;

        info!("database loop exiting");

        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.to_database.send(ChannelData::Shutdown);
    }

    fn database(&self) -> Result<DatabaseType> {
        let prefix: Vec<&str> = self.config.url().splitn(2, ':').collect();
        match prefix[0] {
            "sqlite" => Ok(DatabaseType::SQLite),
            "mysql" => Ok(DatabaseType::MySQL),
            "postgres" => Ok(DatabaseType::Postgres),
            _ => Err(anyhow!("database.rs:unsupported database {}", self.config.url())),
        }
    }

    async fn connect(&self) -> Result<()> {
        sqlx::any::install_default_drivers();

        let options = AnyConnectOptions::from_str(self.config.url())?;
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;
        *self.pool.write().map_err(|_| anyhow!("Failed to acquire write lock"))? = Some(pool);
        Ok(())
    }

    pub fn connection(&self) -> Result<Pool<Any>> {
        match &*self.pool.read().map_err(|_| anyhow!("Failed to acquire read lock"))? {
            Some(pool) => Ok(pool.clone()),
            None => Err(anyhow!("database.rs:Database not connected")),
        }
    }

    async fn migrate(&self) -> Result<()> {
        use DatabaseType::*;

        let pool = self.connection()?;

        // work out migration directory to use based on database url
        let migrator = match self.database()? {
            SQLite => sqlx::migrate!("db/migrations/sqlite"),
            MySQL => sqlx::migrate!("db/migrations/mysql"),
            Postgres => sqlx::migrate!("db/migrations/postgres"),
        };

        migrator.run(&pool).await?;

        Ok(())
    }

    async fn inserter(&self, mut receiver: broadcast::Receiver<ChannelData>) -> Result<()> {
        let query = self.insert_query()?;

        loop {
            use ChannelData::*;

            match receiver.recv().await {
                Ok(Shutdown) | Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("database inserter lagged, dropped {} readings", n);
                }
                Ok(Reading(reading)) => {
                    let mut retry_count = 0;
                    let max_retries = 3;
                    let mut backoff = 1;

                    while retry_count < max_retries {
                        match self.insert(&query, &reading).await {
                            Ok(_) => {
                                debug!("inserted reading from unit {}", reading.unit_id);
                                break;
                            }
                            Err(err) => {
                                error!("INSERT failed: {:?} - retrying in {}s", err, backoff);
                                tokio::time::sleep(std::time::Duration::from_secs(backoff)).await;
                                retry_count += 1;
                                backoff *= 2;
                            }
                        }
                    }

                    if retry_count == max_retries {
                        error!("Failed to insert data after {} retries", max_retries);
                    }
                }
            }
        }

        Ok(())
    }

    async fn insert(&self, query: &str, reading: &Reading) -> Result<()> {
        let pool = self.connection()?;
        let mut conn = pool.acquire().await?;

        let mut q = sqlx::query(query)
            .bind(reading.time.timestamp())
            .bind(reading.unit_id as i64);

        for spec in FIELDS.iter() {
            q = match reading.record.get(spec.name) {
                Some(FieldValue::Float(v)) => q.bind(v),
                Some(FieldValue::Integer(v)) => q.bind(v),
                None => bail!("database.rs:reading is missing field {}", spec.name),
            };
        }

        q.persistent(true).execute(&mut *conn).await?;

        Ok(())
    }

    fn insert_query(&self) -> Result<String> {
        let placeholders = match self.database()? {
            DatabaseType::MySQL => Self::values_for_mysql(),
            _ => Self::values_for_not_mysql(),
        };

        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            TABLE,
            Self::columns().join(", "),
            placeholders.join(", ")
        ))
    }

    fn columns() -> Vec<&'static str> {
        ["time", "unit_id"]
            .into_iter()
            .chain(FIELDS.iter().map(|f| f.name))
            .collect()
    }

    fn values_for_mysql() -> Vec<String> {
        Self::columns().iter().map(|_| "?".to_string()).collect()
    }

    fn values_for_not_mysql() -> Vec<String> {
        (1..=Self::columns().len()).map(|i| format!("${}", i)).collect()
    }
}
