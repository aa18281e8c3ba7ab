//! Error types for RPItalk

use std::io;
use thiserror::Error;

/// Main error type for RPItalk
#[derive(Error, Debug)]
pub enum RpitalkError {
    #[error("Serial device error: {0}")]
    Serial(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Speech synthesis error: {0}")]
    Speech(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("{0}")]
    Other(String),
}

/// Validation failures raised while decoding host commands
///
/// These never abort the byte stream; the decoder logs them and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid DECtalk punctuation level: {value} ({key})")]
    InvalidPunctuation { value: String, key: String },

    #[error("Invalid DECtalk voice name: {value} ({key})")]
    InvalidVoiceName { value: String, key: String },

    #[error("Invalid LiteTalk punctuation level: {value} ({code})")]
    PunctuationOutOfRange { value: String, code: i32 },

    #[error("Malformed numeric value '{0}'")]
    InvalidNumber(String),

    #[error("No current {0} to adjust")]
    NoCurrentValue(&'static str),
}

impl ProtocolError {
    /// True for failures caused by a garbled value rather than an
    /// unsupported setting
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            ProtocolError::InvalidNumber(_) | ProtocolError::NoCurrentValue(_)
        )
    }
}

/// Result type alias for RPItalk operations
pub type Result<T> = std::result::Result<T, RpitalkError>;

impl From<String> for RpitalkError {
    fn from(s: String) -> Self {
        RpitalkError::Other(s)
    }
}

impl From<&str> for RpitalkError {
    fn from(s: &str) -> Self {
        RpitalkError::Other(s.to_string())
    }
}

impl From<nix::Error> for RpitalkError {
    fn from(e: nix::Error) -> Self {
        RpitalkError::Io(io::Error::from(e))
    }
}
