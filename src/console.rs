//! Interactive speech test
//!
//! Lets you type at the emulator without a host attached: every line typed
//! on stdin is fed to the decoder as if the host had sent it, followed by
//! the family's flush byte so it gets spoken. Protocol commands work too,
//! e.g. `[:ra 300]hello` for DECtalk.

use crate::config::DebugLevel;
use crate::protocol::Decoder;
use crate::serial::dump::format_bytes;
use crate::Result;
use log::{debug, info};
use nix::errno::Errno;
use nix::libc;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::signal::{self, SigHandler, Signal};
use std::io::{self, Read, Write};
use std::os::fd::AsFd;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set by the SIGINT handler
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// SIGINT handler - sets flag so the prompt loop can exit cleanly
extern "C" fn handle_sigint(_: libc::c_int) {
    INTERRUPTED.store(true, Ordering::Relaxed);
}

/// Larger than stdin's internal buffer so reads bypass it and poll()
/// stays truthful
const READ_SIZE: usize = 16 * 1024;

/// Feed one typed line to the decoder, terminated so it is spoken
pub fn feed_line(decoder: &mut dyn Decoder, line: &str) -> Vec<u8> {
    let mut data = line.trim_end_matches(['\r', '\n']).as_bytes().to_vec();
    data.push(decoder.flush_terminator());
    decoder.feed(&data)
}

/// Interactive prompt loop
pub struct Console {
    debug: DebugLevel,
}

impl Console {
    pub fn new(debug: DebugLevel) -> Self {
        Self { debug }
    }

    /// Read lines from stdin until EOF or Ctrl+C, then shut speech down
    pub fn run(&self, decoder: &mut dyn Decoder) -> Result<()> {
        unsafe {
            signal::signal(Signal::SIGINT, SigHandler::Handler(handle_sigint))?;
        }

        println!("Type text and press Enter to speak.");
        println!("Press Ctrl+D or Ctrl+C to exit.");

        let result = self.prompt_loop(decoder);
        println!();
        decoder.shutdown();
        result
    }

    fn prompt_loop(&self, decoder: &mut dyn Decoder) -> Result<()> {
        let stdin = io::stdin();
        let mut pending: Vec<u8> = Vec::new();
        let mut buf = vec![0u8; READ_SIZE];

        loop {
            if pending.is_empty() {
                print!("> ");
                io::stdout().flush()?;
            }

            if !self.wait_for_input(&stdin)? {
                debug!("Interrupted");
                return Ok(());
            }

            let n = stdin.lock().read(&mut buf)?;
            if n == 0 {
                if !pending.is_empty() {
                    let line = String::from_utf8_lossy(&pending).into_owned();
                    self.speak_line(decoder, &line);
                }
                return Ok(());
            }

            pending.extend_from_slice(&buf[..n]);
            while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line).into_owned();
                self.speak_line(decoder, &line);
            }
        }
    }

    fn speak_line(&self, decoder: &mut dyn Decoder, line: &str) {
        let response = feed_line(decoder, line);
        if self.debug.dumps_bytes() {
            eprintln!("{}", format_bytes(&response, "AK"));
        }
        info!("Response is {:?}.", String::from_utf8_lossy(&response));
    }

    /// Wait until stdin is readable; false once Ctrl+C was pressed
    fn wait_for_input(&self, stdin: &io::Stdin) -> Result<bool> {
        loop {
            if INTERRUPTED.load(Ordering::Relaxed) {
                return Ok(false);
            }
            let mut fds = [PollFd::new(stdin.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, PollTimeout::from(200u16)) {
                Ok(0) | Err(Errno::EINTR) => continue,
                Ok(_) => return Ok(true),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{create_decoder, DeviceDefaults, Protocol};
    use crate::speech::RecordingBackend;

    #[test]
    fn test_feed_line_is_spoken() {
        let backend = RecordingBackend::new();
        let mut decoder = create_decoder(
            Protocol::Dectalk,
            Box::new(backend.clone()),
            DeviceDefaults::DECTALK,
        );
        backend.clear();

        let response = feed_line(decoder.as_mut(), "[:ra 250]typed text\r\n");
        assert_eq!(response, vec![0x0B]);
        assert_eq!(backend.spoken(), vec!["typed text".to_string()]);
        assert_eq!(decoder.session().rate, 250);
    }

    #[test]
    fn test_feed_line_litetalk() {
        let backend = RecordingBackend::new();
        let mut decoder = create_decoder(
            Protocol::Litetalk,
            Box::new(backend.clone()),
            DeviceDefaults::LITETALK,
        );
        backend.clear();

        assert!(feed_line(decoder.as_mut(), "hello\n").is_empty());
        assert_eq!(backend.spoken(), vec!["hello".to_string()]);
    }
}
