//! Serial transport

pub mod dump;
pub mod port;
pub mod transport;

pub use port::{wait_for_device, HostLink, SerialPort};
pub use transport::{Transport, TransportSettings};
