//! Serial transport loop
//!
//! Waits for the device node, opens it in raw mode, then pumps host bytes
//! through the decoder and writes its acknowledgements back. When the host
//! disappears the handle is dropped and the whole cycle starts again; the
//! decoder (and with it every speech parameter the host set) lives on.

use super::dump::{dump_bytes, format_bytes};
use super::port::{wait_for_device, HostLink, SerialPort};
use crate::config::DebugLevel;
use crate::protocol::Decoder;
use crate::Result;
use log::{info, warn};
use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Where and how to reach the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    /// Serial device path; may not exist yet
    pub device: PathBuf,

    /// Line speed to force, `None` to leave it alone
    pub baud: Option<u32>,

    /// Device polling interval while the node is missing
    pub poll_interval: Duration,

    /// Largest chunk read at once
    pub read_chunk: usize,
}

/// Serial transport bound to one device path
pub struct Transport {
    settings: TransportSettings,
    debug: DebugLevel,
}

impl Transport {
    pub fn new(settings: TransportSettings, debug: DebugLevel) -> Self {
        Self { settings, debug }
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    /// Wait for the device and open it in raw mode
    ///
    /// Open failures (the node vanished again, permissions while udev is
    /// still settling) are retried. A device that opens but cannot be
    /// configured is a fatal error.
    pub fn connect(&self) -> Result<SerialPort> {
        loop {
            wait_for_device(&self.settings.device, self.settings.poll_interval);

            match SerialPort::open(&self.settings.device) {
                Ok(port) => {
                    port.configure(self.settings.baud)?;
                    return Ok(port);
                }
                Err(e) => {
                    warn!(
                        "Could not open {}: {}",
                        self.settings.device.display(),
                        e
                    );
                    thread::sleep(self.settings.poll_interval);
                }
            }
        }
    }

    /// Emulate forever, reconnecting whenever the host goes away
    ///
    /// Only returns on a fatal configuration error.
    pub fn run(&self, decoder: &mut dyn Decoder) -> Result<()> {
        self.run_with(|| self.connect(), decoder)
    }

    /// Serve links produced by `connect` until it fails
    ///
    /// Waits one poll interval after every lost connection: a node that
    /// stays present while every read fails would otherwise be reopened
    /// in a tight loop.
    pub fn run_with<L, F>(&self, mut connect: F, decoder: &mut dyn Decoder) -> Result<()>
    where
        L: HostLink,
        F: FnMut() -> Result<L>,
    {
        loop {
            let mut link = connect()?;
            info!("Beginning emulation...");

            let reason = self.serve(&mut link, decoder);
            warn!("Detected host disconnect: {}", reason);
            drop(link);
            thread::sleep(self.settings.poll_interval);
        }
    }

    /// Pump one connection until it fails
    ///
    /// Returns the error that ended it; a zero-length read counts as the
    /// host disconnecting.
    pub fn serve<L: HostLink>(&self, link: &mut L, decoder: &mut dyn Decoder) -> io::Error {
        let mut buf = vec![0u8; self.settings.read_chunk.max(1)];

        loop {
            let n = match link.read_chunk(&mut buf) {
                Ok(0) => {
                    return io::Error::new(io::ErrorKind::UnexpectedEof, "Host disconnected")
                }
                Ok(n) => n,
                Err(e) => return e,
            };

            let data = &buf[..n];
            if self.debug.dumps_bytes() {
                dump_bytes(data, "RX");
            }

            let response = decoder.feed(data);
            if !response.is_empty() {
                if self.debug.dumps_bytes() {
                    dump_bytes(&response, "AK");
                }
                self.write_to_host(link, &response);
            }
        }
    }

    /// Write a response; failures and short writes are logged, not retried
    ///
    /// Returns true when every byte was accepted.
    pub fn write_to_host<L: HostLink>(&self, link: &mut L, data: &[u8]) -> bool {
        match link.write_response(data) {
            Ok(written) if written == data.len() => true,
            Ok(written) => {
                warn!(
                    "Wrote {} when {} were to be sent.",
                    written,
                    data.len()
                );
                false
            }
            Err(e) => {
                warn!("Write failed: {}", e);
                false
            }
        }
    }

    /// Print the first `count` chunks received from the host, then stop
    ///
    /// Connection check for new cabling: nothing is decoded or spoken.
    pub fn monitor(&self, count: usize) -> Result<()> {
        let mut seen = 0;
        let mut buf = vec![0u8; self.settings.read_chunk.max(1)];

        while seen < count {
            let mut port = self.connect()?;
            eprintln!("Beginning test...");

            while seen < count {
                match port.read_chunk(&mut buf) {
                    Ok(0) => {
                        eprintln!("Detected host disconnect.");
                        break;
                    }
                    Ok(n) => {
                        seen += 1;
                        println!("{}", format_bytes(&buf[..n], &format!("{:02}:", seen)));
                    }
                    Err(e) => {
                        eprintln!("Detected host disconnect: {}", e);
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}
