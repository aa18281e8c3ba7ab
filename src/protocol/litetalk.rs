//! LiteTalk protocol decoder
//!
//! Commands are introduced by a single control byte (0x01), followed by an
//! optional signed number and a one-letter command code, e.g. `\x01 5s`
//! sets the rate to 5. Everything outside a command is text, spoken when a
//! carriage return or NUL arrives.

use super::session::{Mode, Session};
use super::value::ValueToken;
use super::{greeting, identification, report, speak, Decoder, DeviceDefaults, Protocol, Setting};
use crate::mapper::map_range;
use crate::speech::{Punctuation, SpeechBackend};
use crate::ProtocolError;
use log::{debug, info, warn};

pub const RETURN_CHAR: u8 = 0x0D;
pub const COMMAND_CODE: u8 = 0x01;
pub const CANCEL_COMMAND: u8 = 0x18;
pub const INTERROGATION_COMMAND: u8 = 0x3F;
pub const INDEX_COMMAND: u8 = 0x45;
pub const ID_COMMAND: u8 = 0x49;
pub const PITCH_COMMAND: u8 = 0x70;
pub const PUNCT_COMMAND: u8 = 0x62;
pub const RATE_COMMAND: u8 = 0x73;
pub const VOLUME_COMMAND: u8 = 0x76;

/// Prefix of the interrogation response
pub const INTERROGATION_HEADER: [u8; 2] = [0x00, 0x20];

/// Trailer of the interrogation response
pub const INTERROGATION_TRAILER: u8 = 0x7F;

const RATE_RANGE: (i32, i32) = (0, 9);
const PITCH_RANGE: (i32, i32) = (0, 99);
const VOLUME_RANGE: (i32, i32) = (0, 9);

/// Values used when a command carries no usable number
const DEFAULT_RATE: i32 = 8;
const DEFAULT_PITCH: i32 = 50;
const DEFAULT_VOLUME: i32 = 5;
const DEFAULT_PUNCTUATION: i32 = 7;

/// Punctuation level for `code % 4`
const PUNCTUATION_LEVELS: [Punctuation; 4] = [
    Punctuation::All,
    Punctuation::Most,
    Punctuation::Some,
    Punctuation::None,
];

/// Decoder for the LiteTalk family
pub struct LitetalkDecoder {
    backend: Box<dyn SpeechBackend>,
    session: Session,
}

impl LitetalkDecoder {
    /// Create a decoder, announce startup, and apply the initial rate and
    /// pitch. Volume and punctuation are left to the speech service.
    pub fn new(backend: Box<dyn SpeechBackend>, defaults: DeviceDefaults) -> Self {
        let mut decoder = Self {
            backend,
            session: Session::new(defaults.rate, defaults.pitch, defaults.volume),
        };

        let message = greeting();
        speak(decoder.backend.as_mut(), &message);
        info!("{}", message);

        decoder.set_rate(&defaults.rate.to_string());
        decoder.set_pitch(&defaults.pitch.to_string());

        decoder
    }

    /// Interrogation response: header, identification, CR, trailer
    pub fn interrogation_response() -> Vec<u8> {
        let mut response = INTERROGATION_HEADER.to_vec();
        response.extend_from_slice(identification().as_bytes());
        response.push(RETURN_CHAR);
        response.push(INTERROGATION_TRAILER);
        response
    }

    fn set_rate(&mut self, text: &str) {
        let new = ValueToken::parse_or(text, DEFAULT_RATE)
            .resolve(Some(self.session.rate), "rate")
            .unwrap_or(self.session.rate);
        let mapped = map_range(new, RATE_RANGE.0, RATE_RANGE.1);
        if Setting::Rate.apply(self.backend.as_mut(), new, mapped) {
            self.session.rate = new;
        }
    }

    fn set_pitch(&mut self, text: &str) {
        let new = ValueToken::parse_or(text, DEFAULT_PITCH)
            .resolve(Some(self.session.pitch), "pitch")
            .unwrap_or(self.session.pitch);
        let mapped = map_range(new, PITCH_RANGE.0, PITCH_RANGE.1);
        if Setting::Pitch.apply(self.backend.as_mut(), new, mapped) {
            self.session.pitch = new;
        }
    }

    fn set_volume(&mut self, text: &str) {
        // Relative volume works like relative rate and pitch
        let new = ValueToken::parse_or(text, DEFAULT_VOLUME)
            .resolve(Some(self.session.volume), "volume")
            .unwrap_or(self.session.volume);
        let mapped = map_range(new, VOLUME_RANGE.0, VOLUME_RANGE.1);
        if Setting::Volume.apply(self.backend.as_mut(), new, mapped) {
            self.session.volume = new;
        }
    }

    /// Punctuation takes an absolute 0-15 code; a sign is not an adjustment
    fn set_punctuation(&mut self, text: &str) -> Result<(), ProtocolError> {
        let code = text.trim().parse::<i32>().unwrap_or(DEFAULT_PUNCTUATION);
        if !(0..=15).contains(&code) {
            return Err(ProtocolError::PunctuationOutOfRange {
                value: text.to_string(),
                code,
            });
        }

        let level = PUNCTUATION_LEVELS[(code % 4) as usize];
        match self.backend.set_punctuation(level) {
            Ok(()) => {
                self.session.punctuation = Some(level);
                info!("Set punctuation to {} ({}).", code, level);
            }
            Err(e) => warn!("Error setting punctuation to {} ({}): {}", code, level, e),
        }
        Ok(())
    }

    /// Handle one byte received while in command mode
    fn command_byte(&mut self, byte: u8, response: &mut Vec<u8>) {
        let buffer = &mut self.session.buffer;
        match byte {
            INTERROGATION_COMMAND => {
                response.extend(Self::interrogation_response());
                buffer.end_command();
            }
            ID_COMMAND => {
                response.extend_from_slice(identification().as_bytes());
                response.push(RETURN_CHAR);
                buffer.end_command();
            }
            INDEX_COMMAND => {
                response.push(RETURN_CHAR);
                buffer.end_command();
            }
            RATE_COMMAND => {
                let text = buffer.take();
                self.set_rate(&text);
            }
            PITCH_COMMAND => {
                let text = buffer.take();
                self.set_pitch(&text);
            }
            VOLUME_COMMAND => {
                let text = buffer.take();
                self.set_volume(&text);
            }
            PUNCT_COMMAND => {
                let text = buffer.take();
                if let Err(e) = self.set_punctuation(&text) {
                    report(&e);
                }
            }
            b'0'..=b'9' | b'+' | b'-' => buffer.push(byte),
            _ => {
                info!("Unhandled command, '{}'.", char::from(byte).escape_default());
                buffer.take();
            }
        }
    }
}

impl Decoder for LitetalkDecoder {
    fn feed(&mut self, data: &[u8]) -> Vec<u8> {
        let mut response = Vec::new();

        for &byte in data {
            if byte == CANCEL_COMMAND {
                if let Err(e) = self.backend.cancel() {
                    warn!("Cancel failed: {}", e);
                }
                self.session.buffer.drain();
                response.push(RETURN_CHAR);
            } else if byte == COMMAND_CODE {
                if let Some(text) = self.session.buffer.begin_command() {
                    speak(self.backend.as_mut(), &text);
                }
            } else if self.session.mode() == Mode::Command {
                self.command_byte(byte, &mut response);
            } else if (0x20..=0x7E).contains(&byte) {
                self.session.buffer.push(byte);
            }

            if byte == 0x00 || byte == RETURN_CHAR || self.session.buffer.is_full() {
                let text = self.session.buffer.drain();
                if !text.is_empty() {
                    debug!("Speaking {} buffered bytes", text.len());
                }
                speak(self.backend.as_mut(), &text);
            }
        }

        response
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn protocol(&self) -> Protocol {
        Protocol::Litetalk
    }

    fn flush_terminator(&self) -> u8 {
        RETURN_CHAR
    }

    fn shutdown(&mut self) {
        if let Some(text) = self.session.buffer.take_literal() {
            speak(self.backend.as_mut(), &text);
        }
        if let Err(e) = self.backend.shutdown() {
            warn!("Error shutting down speech: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrogation_response_layout() {
        let response = LitetalkDecoder::interrogation_response();
        assert_eq!(&response[..2], &[0x00, 0x20]);
        assert_eq!(&response[2..14], b"RPItalk 0.9\r");
        assert_eq!(&response[14..], &[0x0D, 0x7F]);
    }

    #[test]
    fn test_punctuation_levels() {
        assert_eq!(PUNCTUATION_LEVELS[0], Punctuation::All);
        assert_eq!(PUNCTUATION_LEVELS[(7 % 4) as usize], Punctuation::None);
        assert_eq!(PUNCTUATION_LEVELS[(13 % 4) as usize], Punctuation::Most);
    }
}
