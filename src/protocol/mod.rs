//! Serial protocol decoders
//!
//! A decoder turns the byte stream written by the host into speech calls,
//! parameter changes, and the acknowledgement bytes a real synthesizer
//! would send back. One decoder is bound to one device family for its whole
//! lifetime.

pub mod dectalk;
pub mod litetalk;
pub mod session;
pub mod value;

pub use dectalk::{DectalkDecoder, DectalkProfile};
pub use litetalk::LitetalkDecoder;
pub use session::{Mode, ScratchBuffer, Session, MAX_BUFFER_SIZE};
pub use value::ValueToken;

use crate::speech::SpeechBackend;
use crate::{ProtocolError, Result, RpitalkError, DEVICE_VERSION, IDENTITY};
use clap::ValueEnum;
use log::{debug, info, warn};

/// Identification string returned by interrogation/identify requests
pub fn identification() -> String {
    format!("{} {}\r", IDENTITY, DEVICE_VERSION)
}

/// Message spoken when a decoder comes up
pub fn greeting() -> String {
    format!("Starting {}, version {}.", IDENTITY, DEVICE_VERSION)
}

/// Emulated device family
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Protocol {
    /// DECtalk with the compressed pitch scale
    Dectalk,
    /// DECtalk with the original 50-200 pitch scale
    DectalkLegacy,
    /// LiteTalk single-byte command codes
    Litetalk,
}

impl Protocol {
    /// Parse a config file value (case-insensitive)
    pub fn parse(value: &str) -> Result<Self> {
        <Self as ValueEnum>::from_str(value.trim(), true)
            .map_err(|_| RpitalkError::Config(format!("Unknown protocol '{}'", value)))
    }

    /// Whether the family is DECtalk-based
    pub fn is_dectalk(&self) -> bool {
        matches!(self, Protocol::Dectalk | Protocol::DectalkLegacy)
    }
}

/// Initial speech parameters, in device units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDefaults {
    pub rate: i32,
    pub pitch: i32,
    pub volume: i32,
}

impl DeviceDefaults {
    pub const DECTALK: DeviceDefaults = DeviceDefaults {
        rate: 400,
        pitch: 200,
        volume: 50,
    };

    pub const LITETALK: DeviceDefaults = DeviceDefaults {
        rate: 5,
        pitch: 50,
        volume: 5,
    };

    pub fn for_protocol(protocol: Protocol) -> Self {
        if protocol.is_dectalk() {
            Self::DECTALK
        } else {
            Self::LITETALK
        }
    }
}

/// Byte stream decoder for one emulated device
pub trait Decoder: Send {
    /// Process a chunk of host bytes, returning the response to send back
    ///
    /// Chunks may split anywhere; state carries over between calls.
    fn feed(&mut self, data: &[u8]) -> Vec<u8>;

    /// Current session state
    fn session(&self) -> &Session;

    /// Which family this decoder emulates
    fn protocol(&self) -> Protocol;

    /// Byte that makes this family speak buffered text
    fn flush_terminator(&self) -> u8;

    /// Stop speech and release the speech service
    fn shutdown(&mut self);
}

/// Create the decoder for `protocol`, applying `defaults` and speaking the
/// greeting
pub fn create_decoder(
    protocol: Protocol,
    backend: Box<dyn SpeechBackend>,
    defaults: DeviceDefaults,
) -> Box<dyn Decoder> {
    match protocol {
        Protocol::Dectalk => Box::new(DectalkDecoder::new(
            DectalkProfile::CURRENT,
            backend,
            defaults,
        )),
        Protocol::DectalkLegacy => Box::new(DectalkDecoder::new(
            DectalkProfile::LEGACY,
            backend,
            defaults,
        )),
        Protocol::Litetalk => Box::new(LitetalkDecoder::new(backend, defaults)),
    }
}

/// Numeric speech parameters a host can change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Setting {
    Rate,
    Pitch,
    PitchRange,
    Volume,
    DesignVoiceG5,
}

impl Setting {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Setting::Rate => "speech rate",
            Setting::Pitch => "speech pitch",
            Setting::PitchRange => "speech pitch range",
            Setting::Volume => "speech volume",
            Setting::DesignVoiceG5 => "design voice g5 value",
        }
    }

    /// Send an already mapped value to the backend
    ///
    /// Returns true when the backend accepted it. Failures are logged here
    /// and never reach the byte stream.
    pub(crate) fn apply(&self, backend: &mut dyn SpeechBackend, raw: i32, mapped: i32) -> bool {
        let result = match self {
            Setting::Rate => backend.set_rate(mapped),
            Setting::Pitch => backend.set_pitch(mapped),
            Setting::PitchRange => backend.set_pitch_range(mapped),
            // g5 is the overall gain of the design voice
            Setting::Volume | Setting::DesignVoiceG5 => backend.set_volume(mapped),
        };

        match result {
            Ok(()) => {
                info!("Set {} to {} ({}).", self.name(), raw, mapped);
                true
            }
            Err(e) => {
                warn!("Error setting {} to {} ({}): {}", self.name(), raw, mapped, e);
                false
            }
        }
    }
}

/// Log a validation failure caught at the dispatch boundary
pub(crate) fn report(error: &ProtocolError) {
    if error.is_malformed() {
        debug!("{}", error);
    } else {
        warn!("{}", error);
    }
}

/// Speak text, logging rather than propagating backend failures
pub(crate) fn speak(backend: &mut dyn SpeechBackend, text: &str) {
    if let Err(e) = backend.speak(text) {
        warn!("Speech failed: {}", e);
    }
}
