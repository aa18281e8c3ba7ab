//! Speech back-end abstraction
//!
//! The emulator never produces audio itself. Decoded text and parameter
//! changes are handed to a [`SpeechBackend`], which forwards them to a real
//! synthesis service.

use crate::{Result, RpitalkError};
use clap::ValueEnum;
use log::info;
use std::fmt;

/// Punctuation verbosity understood by the speech service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punctuation {
    None,
    Some,
    Most,
    All,
}

impl Punctuation {
    /// Name used by Speech Dispatcher for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            Punctuation::None => "none",
            Punctuation::Some => "some",
            Punctuation::Most => "most",
            Punctuation::All => "all",
        }
    }
}

impl fmt::Display for Punctuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands sent to a speech back-end
///
/// Mirrors the [`SpeechBackend`] methods one to one so calls can be
/// recorded and replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechCommand {
    /// Speak a string of text
    Speak(String),
    /// Cancel/silence current speech
    Cancel,
    /// Set speech rate (-100..100)
    SetRate(i32),
    /// Set average pitch (-100..100)
    SetPitch(i32),
    /// Set pitch range (-100..100)
    SetPitchRange(i32),
    /// Set speech volume (-100..100)
    SetVolume(i32),
    /// Set punctuation verbosity
    SetPunctuation(Punctuation),
    /// Select a voice by symbolic identifier (e.g. "MALE1")
    SetVoice(String),
    /// Release the connection to the service
    Shutdown,
}

/// Speech back-end trait
///
/// All numeric parameters are on the service's -100..100 scale; callers
/// convert device units with [`crate::mapper`] first.
pub trait SpeechBackend: Send {
    /// Send a raw command to the backend
    fn send(&mut self, cmd: SpeechCommand) -> Result<()> {
        match cmd {
            SpeechCommand::Speak(text) => self.speak(&text),
            SpeechCommand::Cancel => self.cancel(),
            SpeechCommand::SetRate(v) => self.set_rate(v),
            SpeechCommand::SetPitch(v) => self.set_pitch(v),
            SpeechCommand::SetPitchRange(v) => self.set_pitch_range(v),
            SpeechCommand::SetVolume(v) => self.set_volume(v),
            SpeechCommand::SetPunctuation(p) => self.set_punctuation(p),
            SpeechCommand::SetVoice(voice) => self.set_voice(&voice),
            SpeechCommand::Shutdown => self.shutdown(),
        }
    }

    /// Speak text. Blank or whitespace-only text is ignored.
    fn speak(&mut self, text: &str) -> Result<()>;

    /// Cancel/silence current speech
    fn cancel(&mut self) -> Result<()>;

    fn set_rate(&mut self, rate: i32) -> Result<()>;

    fn set_pitch(&mut self, pitch: i32) -> Result<()>;

    fn set_pitch_range(&mut self, range: i32) -> Result<()>;

    fn set_volume(&mut self, volume: i32) -> Result<()>;

    fn set_punctuation(&mut self, level: Punctuation) -> Result<()>;

    /// Select a voice by symbolic identifier ("default", "MALE1", ...)
    fn set_voice(&mut self, voice: &str) -> Result<()>;

    /// Stop speaking and release the service
    fn shutdown(&mut self) -> Result<()>;
}

/// Which speech back-end to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Native engine first, espeak-ng as fallback
    Auto,
    /// Speech Dispatcher (Linux) or the platform engine via the tts crate
    Native,
    /// espeak-ng subprocess per utterance
    Espeak,
    /// No audio; every call is only logged
    Silent,
}

impl BackendKind {
    /// Parse a config file value (case-insensitive)
    pub fn parse(value: &str) -> Result<Self> {
        <Self as ValueEnum>::from_str(value.trim(), true).map_err(|_| {
            RpitalkError::Config(format!("Unknown speech backend '{}'", value))
        })
    }
}

/// Create the speech back-end selected by `kind`
///
/// `Auto` tries Speech Dispatcher first (standard Linux TTS, respects system
/// preferences), then espeak-ng. Failing every candidate is fatal.
pub fn create_backend(kind: BackendKind) -> Result<Box<dyn SpeechBackend>> {
    use super::backends::espeak::EspeakBackend;
    use super::backends::native::NativeBackend;
    use super::backends::recording::RecordingBackend;

    match kind {
        BackendKind::Native => Ok(Box::new(NativeBackend::new()?)),
        BackendKind::Espeak => Ok(Box::new(EspeakBackend::new()?)),
        BackendKind::Silent => {
            info!("Using silent speech backend");
            Ok(Box::new(RecordingBackend::silent()))
        }
        BackendKind::Auto => {
            info!("Trying Speech Dispatcher backend...");
            match NativeBackend::new() {
                Ok(backend) => {
                    info!("✓ Successfully initialized Speech Dispatcher backend");
                    return Ok(Box::new(backend));
                }
                Err(e) => {
                    info!("✗ Speech Dispatcher unavailable: {}", e);
                    info!("To install: sudo apt install speech-dispatcher");
                }
            }

            info!("Trying espeak-ng backend...");
            match EspeakBackend::new() {
                Ok(backend) => {
                    info!("✓ Successfully initialized espeak-ng backend");
                    Ok(Box::new(backend))
                }
                Err(e) => Err(RpitalkError::Speech(format!(
                    "No speech backend available. Tried:\n\
                     1. Speech Dispatcher (install: sudo apt install speech-dispatcher)\n\
                     2. espeak-ng (install: sudo apt install espeak-ng)\n\
                     Error: {}",
                    e
                ))),
            }
        }
    }
}
