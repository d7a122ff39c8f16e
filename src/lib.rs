pub mod bus;
pub mod model;
pub mod poller;
pub mod publish;
pub mod snapshot;
pub mod store;

pub use bus::registers::Register;

#[derive(Debug, Clone)]
pub enum Error {
    NotConnected,
    ReadError(Register, String),
    DecodeError(Register, String),
    PublishError(String),
}
