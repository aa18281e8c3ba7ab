//! Per-connection decoder state

use crate::speech::Punctuation;
use log::debug;

/// Largest number of bytes the scratch buffer holds before it is spoken
pub const MAX_BUFFER_SIZE: usize = 4096;

/// What the scratch buffer is currently accumulating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Nothing pending
    Idle,
    /// Text to be spoken
    Literal,
    /// Protocol syntax (DECtalk command text, LiteTalk numeric argument)
    Command,
}

/// Buffer shared by literal text and command text, tagged with its purpose
///
/// Only one purpose is active at a time. Switching to command mode hands
/// back any pending literal text so the caller can speak it first.
#[derive(Debug)]
pub struct ScratchBuffer {
    bytes: Vec<u8>,
    mode: Mode,
}

impl ScratchBuffer {
    pub fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(MAX_BUFFER_SIZE),
            mode: Mode::Idle,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Append a byte. Outside command mode this starts literal text.
    pub fn push(&mut self, byte: u8) {
        if self.mode == Mode::Idle {
            self.mode = Mode::Literal;
        }
        self.bytes.push(byte);
    }

    /// True once the buffer has reached [`MAX_BUFFER_SIZE`]
    pub fn is_full(&self) -> bool {
        self.bytes.len() >= MAX_BUFFER_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Current contents, lossily decoded
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Empty the buffer and return its contents. Returns to idle.
    pub fn take(&mut self) -> String {
        debug!("Flushing scratch buffer: {} bytes ({:?})", self.bytes.len(), self.mode);
        let text = String::from_utf8_lossy(&self.bytes).into_owned();
        self.bytes.clear();
        self.mode = Mode::Idle;
        text
    }

    /// Empty the buffer without leaving command mode
    ///
    /// Used when the buffer overflows or is cancelled mid-command: the
    /// host is still inside its command and later bytes belong to it.
    pub fn drain(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.bytes).into_owned();
        self.bytes.clear();
        if self.mode == Mode::Literal {
            self.mode = Mode::Idle;
        }
        text
    }

    /// Pending literal text, if the buffer currently holds literal text
    ///
    /// Command text is left in place.
    pub fn take_literal(&mut self) -> Option<String> {
        match self.mode {
            Mode::Literal => Some(self.take()),
            Mode::Idle | Mode::Command => None,
        }
    }

    /// Switch to command mode, returning any literal text that was pending
    pub fn begin_command(&mut self) -> Option<String> {
        let pending = self.take_literal();
        self.bytes.clear();
        self.mode = Mode::Command;
        pending
    }

    /// Leave command mode keeping the buffer contents
    ///
    /// Whatever remains is treated as literal text from here on.
    pub fn end_command(&mut self) {
        self.mode = if self.bytes.is_empty() {
            Mode::Idle
        } else {
            Mode::Literal
        };
    }
}

impl Default for ScratchBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable state of one emulated synthesizer
///
/// Outlives serial reconnects: only the device handle is replaced when the
/// host goes away, so parameters set by the host survive.
#[derive(Debug)]
pub struct Session {
    /// Speech rate in device units
    pub rate: i32,

    /// Average pitch in device units
    pub pitch: i32,

    /// Pitch range (DECtalk `dv pr`), unset until the host sends one
    pub pitch_range: Option<i32>,

    /// Volume in device units
    pub volume: i32,

    pub punctuation: Option<Punctuation>,

    /// Voice table index (DECtalk `n0`-`n9`)
    pub voice: Option<u8>,

    /// Design voice gain (DECtalk `dv g5`)
    pub g5: Option<i32>,

    /// Literal/command scratch buffer
    pub buffer: ScratchBuffer,
}

impl Session {
    pub fn new(rate: i32, pitch: i32, volume: i32) -> Self {
        Self {
            rate,
            pitch,
            pitch_range: None,
            volume,
            punctuation: None,
            voice: None,
            g5: None,
            buffer: ScratchBuffer::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.buffer.mode()
    }
}
