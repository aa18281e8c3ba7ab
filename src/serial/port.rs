//! Serial device handling
//!
//! The host's serial line (a USB gadget port, a USB-serial adapter, or a
//! plain UART) is opened as a raw byte pipe: no echo, no signals, no CR/LF
//! translation, no software flow control, and reads that block until at
//! least one byte arrives.

use crate::{Result, RpitalkError};
use log::{debug, info};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::termios::{
    cfmakeraw, cfsetspeed, tcgetattr, tcsetattr, BaudRate, ControlFlags, InputFlags, SetArg,
    SpecialCharacterIndices,
};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Block until `path` exists, checking every `interval`
///
/// USB gadget and adapter device nodes come and go with the cable; a
/// missing node is the normal state between connections, not an error.
pub fn wait_for_device(path: &Path, interval: Duration) {
    while !path.exists() {
        info!("Waiting for USB device, {} ...", path.display());
        thread::sleep(interval);
    }
}

/// Termios speed constant for a numeric baud rate
pub fn baud_rate(baud: u32) -> Option<BaudRate> {
    let rate = match baud {
        300 => BaudRate::B300,
        600 => BaudRate::B600,
        1200 => BaudRate::B1200,
        2400 => BaudRate::B2400,
        4800 => BaudRate::B4800,
        9600 => BaudRate::B9600,
        19200 => BaudRate::B19200,
        38400 => BaudRate::B38400,
        57600 => BaudRate::B57600,
        115200 => BaudRate::B115200,
        _ => return None,
    };
    Some(rate)
}

/// An open serial device
pub struct SerialPort {
    file: File,
    path: PathBuf,
}

impl SerialPort {
    /// Open the device for reading and writing without making it our
    /// controlling terminal
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(nix::libc::O_NOCTTY)
            .open(path)?;
        debug!("Opened {}", path.display());

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Put the line into raw mode
    ///
    /// `baud` of `None` leaves the speed alone, which is what USB gadget
    /// ports want; real UARTs matching the original hardware use 9600.
    pub fn configure(&self, baud: Option<u32>) -> Result<()> {
        let fail = |what: &str, e: Errno| {
            RpitalkError::Serial(format!(
                "Failed to {} serial device {}: {}",
                what,
                self.path.display(),
                e
            ))
        };

        let mut attrs = tcgetattr(self.file.as_fd()).map_err(|e| fail("read attributes of", e))?;

        // No CR/LF munging, ^C handling, echo, etc.
        cfmakeraw(&mut attrs);

        if let Some(baud) = baud {
            let rate = baud_rate(baud).ok_or_else(|| {
                RpitalkError::Config(format!("Unsupported baud rate {}", baud))
            })?;
            attrs.control_flags |= ControlFlags::CLOCAL | ControlFlags::CREAD;
            cfsetspeed(&mut attrs, rate).map_err(|e| fail("set speed of", e))?;
        }

        // Reads block until at least one byte arrives
        attrs.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        attrs.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

        attrs.input_flags &= !(InputFlags::IXON | InputFlags::IXOFF | InputFlags::IXANY);

        tcsetattr(self.file.as_fd(), SetArg::TCSANOW, &attrs).map_err(|e| fail("configure", e))?;

        info!("Opened serial port on device, {}.", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until the device is readable (or has hung up)
    pub fn wait_readable(&self) -> io::Result<()> {
        loop {
            let mut fds = [PollFd::new(self.file.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, PollTimeout::NONE) {
                Ok(_) => return Ok(()),
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(io::Error::from(e)),
            }
        }
    }
}

impl AsFd for SerialPort {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

/// Byte pipe to the host computer
///
/// Implemented by [`SerialPort`]; tests substitute scripted links.
pub trait HostLink {
    /// Block until host bytes are available and read them.
    /// `Ok(0)` means the host went away.
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write a response, returning how many bytes were accepted
    fn write_response(&mut self, data: &[u8]) -> io::Result<usize>;
}

impl HostLink for SerialPort {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.wait_readable()?;
        loop {
            match self.file.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    fn write_response(&mut self, data: &[u8]) -> io::Result<usize> {
        let written = self.file.write(data)?;
        self.file.flush()?;
        Ok(written)
    }
}
