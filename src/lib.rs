//! RPItalk - hardware speech synthesizer emulator
//!
//! Impersonates a DECtalk or LiteTalk synthesizer on a serial line so that
//! software written for those devices (Speakup, old screen readers) keeps
//! working, while the spoken text is redirected to a software TTS engine.

pub mod config;
pub mod console;
pub mod error;
pub mod mapper;
pub mod protocol;
pub mod serial;
pub mod speech;

pub use error::{ProtocolError, Result, RpitalkError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "rpitalk";

/// Name the emulator reports to the host and to the speech service
pub const IDENTITY: &str = "RPItalk";

/// Firmware version reported in identification responses
pub const DEVICE_VERSION: &str = "0.9";
