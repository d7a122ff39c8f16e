pub mod registers;

pub use registers::{Register, RegisterValue};

use crate::Error;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::timeout;
use tokio_modbus::prelude::*;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Read a named register's raw value over an established connection.
#[async_trait]
pub trait RegisterSource {
    async fn read(&mut self, register: Register) -> Result<RegisterValue, Error>;
}

/// Connection lifecycle of the field device. The poller is the sole owner;
/// no other path touches the connection.
#[async_trait]
pub trait FieldDevice: RegisterSource {
    /// Connect if not already connected. Connection failure is an expected,
    /// recurring condition and is reported through the returned boolean.
    async fn ensure_connected(&mut self) -> bool;

    /// Release the connection. No-op when already disconnected.
    async fn disconnect(&mut self);
}

/// SUN2000 inverter behind a Modbus TCP endpoint.
pub struct Sun2000 {
    host: String,
    port: u16,
    unit: u8,
    context: Option<client::Context>,
}

impl Sun2000 {
    pub fn new(host: String, port: u16, unit: u8) -> Self {
        Sun2000 {
            host,
            port,
            unit,
            context: None,
        }
    }
}

#[async_trait]
impl RegisterSource for Sun2000 {
    async fn read(&mut self, register: Register) -> Result<RegisterValue, Error> {
        let context = self.context.as_mut().ok_or(Error::NotConnected)?;

        let words = context
            .read_holding_registers(register.address(), register.quantity())
            .await
            .map_err(|e| Error::ReadError(register, e.to_string()))?;

        RegisterValue::decode(register, &words)
    }
}

#[async_trait]
impl FieldDevice for Sun2000 {
    async fn ensure_connected(&mut self) -> bool {
        if self.context.is_some() {
            return true;
        }

        let address: SocketAddr = match format!("{}:{}", self.host, self.port).parse() {
            Ok(address) => address,
            Err(e) => {
                log::error!("invalid device address {}:{}: {}", self.host, self.port, e);
                return false;
            }
        };

        match timeout(CONNECT_TIMEOUT, tcp::connect_slave(address, Slave(self.unit))).await {
            Ok(Ok(context)) => {
                log::info!("connected to {}", address);
                self.context = Some(context);
                true
            }
            Ok(Err(e)) => {
                log::warn!("connection to {} failed: {}", address, e);
                false
            }
            Err(_) => {
                log::warn!(
                    "connection to {} timed out after {:?}",
                    address,
                    CONNECT_TIMEOUT
                );
                false
            }
        }
    }

    async fn disconnect(&mut self) {
        if self.context.take().is_some() {
            log::debug!("disconnected from {}:{}", self.host, self.port);
        }
    }
}
