use crate::prelude::*;
use crate::tristar::decoder::REGISTER_COUNT;

use {
    async_trait::async_trait,
    std::time::Duration,
    tokio_modbus::client::{tcp, Client, Reader},
    tokio_modbus::Slave,
};

/// Anything that can hand the poller a fresh block of holding registers.
#[async_trait]
pub trait RegisterSource: Send + Sync {
    async fn read_registers(&self) -> Result<Vec<u16>>;

    fn unit_id(&self) -> u8;
}

/// Reads the register block over Modbus TCP, opening a new connection per poll.
#[derive(Clone, Debug)]
pub struct ModbusSource {
    address: String,
    port: u16,
    unit_id: u8,
    read_timeout: Duration,
}

impl ModbusSource {
    pub fn new(config: &config::Tristar) -> Self {
        Self {
            address: config.address().to_string(),
            port: config.port(),
            unit_id: config.unit_id(),
            read_timeout: Duration::from_secs(config.read_timeout()),
        }
    }

    async fn socket_addr(&self) -> Result<std::net::SocketAddr> {
        tokio::net::lookup_host((self.address.as_str(), self.port))
            .await
            .map_err(|err| file_error_with_source!(err, "resolving {}:{}", self.address, self.port))?
            .next()
            .ok_or_else(|| file_error!("{}:{} did not resolve to any address", self.address, self.port))
    }

    async fn fetch(&self) -> Result<Vec<u16>> {
        let socket_addr = self.socket_addr().await?;
        debug!("connecting to tristar at {}", socket_addr);

        let mut ctx = tcp::connect_slave(socket_addr, Slave(self.unit_id))
            .await
            .map_err(|err| file_error_with_source!(err, "connecting to {}", socket_addr))?;

        let result = ctx
            .read_holding_registers(0, REGISTER_COUNT as u16)
            .await
            .map_err(|err| file_error_with_source!(err, "reading holding registers"))
            .and_then(|response| {
                response.map_err(|code| file_error!("device returned exception {:?}", code))
            });

        if let Err(err) = ctx.disconnect().await {
            warn!("error closing connection to {}: {}", socket_addr, err);
        }

        result
    }
}

#[async_trait]
impl RegisterSource for ModbusSource {
    async fn read_registers(&self) -> Result<Vec<u16>> {
        match tokio::time::timeout(self.read_timeout, self.fetch()).await {
            Ok(result) => result,
            Err(_) => bail!(
                "timed out after {}s reading from {}:{}",
                self.read_timeout.as_secs(),
                self.address,
                self.port
            ),
        }
    }

    fn unit_id(&self) -> u8 {
        self.unit_id
    }
}
