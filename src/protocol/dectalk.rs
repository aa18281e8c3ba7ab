//! DECtalk protocol decoder
//!
//! Text arrives as plain printable ASCII. Commands are wrapped in square
//! brackets, e.g. `[:ra 300:dv ap 120]`, and control bytes signal break
//! (stop talking) and index (speak what you have, then acknowledge).

use super::session::{Mode, Session};
use super::value::ValueToken;
use super::{greeting, report, speak, Decoder, DeviceDefaults, Protocol, Setting};
use crate::mapper::{map_range, map_range_to};
use crate::speech::{Punctuation, SpeechBackend};
use crate::ProtocolError;
use log::{debug, info, warn};

/// Start of a bracketed command
pub const COMMAND_START: u8 = b'[';

/// End of a bracketed command
pub const COMMAND_END: u8 = b']';

/// Voice identifiers for `[:n0]` through `[:n9]`
pub const VOICES: [&str; 10] = [
    "default",
    "MALE1",        // Paul
    "MALE2",        // Harry
    "MALE3",        // Frank
    "MALE3",        // Dennis
    "CHILD_MALE",   // Kit
    "FEMALE1",      // Betty
    "FEMALE2",      // Ursula
    "FEMALE3",      // Rita
    "CHILD_FEMALE", // Wendy
];

/// Voice names accepted by `[:na ...]`, keyed by first letter
const VOICE_NAMES: &[(char, u8)] = &[('p', 1)];

/// Punctuation modes accepted by `[:pu ...]`, keyed by first letter
const PUNCTUATION: &[(char, Punctuation)] = &[
    ('n', Punctuation::None),
    ('s', Punctuation::Some),
    ('a', Punctuation::All),
    // "pronounce" has no counterpart; none is closest
    ('p', Punctuation::None),
];

/// Static description of a DECtalk model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DectalkProfile {
    pub name: &'static str,

    /// Stop speaking immediately
    pub break_byte: u8,

    /// Speak pending text and echo the byte back
    pub index_byte: u8,

    /// Acknowledgement sent after a break
    pub flush_ack: u8,

    pub rate_range: (i32, i32),

    /// Pitch scale, after adding `pitch_offset` to the host's value
    pub pitch_range: (i32, i32),

    pub pitch_offset: i32,

    pub volume_range: (i32, i32),

    /// Pitch range (`dv pr`) is a percentage on both sides
    pub pitch_span_range: (i32, i32),

    pub g5_range: (i32, i32),
}

impl DectalkProfile {
    /// First-generation tuning: 50-200 pitch scale, raised by 40
    pub const LEGACY: DectalkProfile = DectalkProfile {
        name: "DECtalk (legacy)",
        break_byte: 0x03,
        index_byte: 0x0B,
        flush_ack: 0x01,
        rate_range: (75, 650),
        pitch_range: (50, 200),
        pitch_offset: 40,
        volume_range: (0, 100),
        pitch_span_range: (0, 100),
        g5_range: (60, 86),
    };

    /// Pitch squeezed into 50-180 (the hardware goes to 350) so that the
    /// small pitch changes screen readers send are audible.
    pub const CURRENT: DectalkProfile = DectalkProfile {
        name: "DECtalk",
        pitch_range: (50, 180),
        pitch_offset: 0,
        ..DectalkProfile::LEGACY
    };
}

/// One `:`-separated piece of a bracketed command string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    /// First two characters of the first token
    pub code: &'a str,
    /// Second token of a `dv` command
    pub selector: Option<&'a str>,
    pub value: Option<&'a str>,
}

impl<'a> Command<'a> {
    /// Parse one sub-command; `None` if it is blank
    pub fn parse(text: &'a str) -> Option<Self> {
        let mut tokens = text.split_whitespace();
        let first = tokens.next()?;
        let second = tokens.next();
        let third = tokens.next();

        let end = first
            .char_indices()
            .nth(2)
            .map(|(i, _)| i)
            .unwrap_or(first.len());
        let code = &first[..end];

        if code == "dv" {
            Some(Self {
                code,
                selector: second,
                value: third,
            })
        } else {
            Some(Self {
                code,
                selector: None,
                value: second,
            })
        }
    }

    /// Split a whole command string into its sub-commands
    pub fn split(text: &'a str) -> impl Iterator<Item = Command<'a>> {
        text.trim().split(':').filter_map(Command::parse)
    }

    /// Voice digit of an `n0`-`n9` command
    fn voice_digit(&self) -> Option<u8> {
        let mut chars = self.code.chars();
        match (chars.next(), chars.next()) {
            (Some('n'), Some(d)) if d.is_ascii_digit() => Some(d as u8 - b'0'),
            _ => None,
        }
    }
}

/// Decoder for the DECtalk family
pub struct DectalkDecoder {
    profile: DectalkProfile,
    backend: Box<dyn SpeechBackend>,
    session: Session,
}

impl DectalkDecoder {
    /// Create a decoder, apply the initial parameters, and announce startup
    pub fn new(
        profile: DectalkProfile,
        backend: Box<dyn SpeechBackend>,
        defaults: DeviceDefaults,
    ) -> Self {
        let mut decoder = Self {
            profile,
            backend,
            session: Session::new(defaults.rate, defaults.pitch, defaults.volume),
        };
        debug!("Emulating {}", profile.name);

        let initial = [
            decoder.set_rate(ValueToken::Absolute(defaults.rate)),
            decoder.set_pitch(ValueToken::Absolute(defaults.pitch)),
            decoder.set_volume(ValueToken::Absolute(defaults.volume)),
        ];
        initial.iter().filter_map(|r| r.as_ref().err()).for_each(report);

        let message = greeting();
        speak(decoder.backend.as_mut(), &message);
        info!("{}", message);

        decoder
    }

    fn set_rate(&mut self, token: ValueToken) -> Result<(), ProtocolError> {
        let new = token.resolve(Some(self.session.rate), "rate")?;
        let (min, max) = self.profile.rate_range;
        if Setting::Rate.apply(self.backend.as_mut(), new, map_range(new, min, max)) {
            self.session.rate = new;
        }
        Ok(())
    }

    fn set_pitch(&mut self, token: ValueToken) -> Result<(), ProtocolError> {
        let new = token.resolve(Some(self.session.pitch), "pitch")?;
        let (min, max) = self.profile.pitch_range;
        let mapped = map_range(new.saturating_add(self.profile.pitch_offset), min, max);
        if Setting::Pitch.apply(self.backend.as_mut(), new, mapped) {
            self.session.pitch = new;
        }
        Ok(())
    }

    fn set_pitch_range(&mut self, token: ValueToken) -> Result<(), ProtocolError> {
        let new = token.resolve(self.session.pitch_range, "pitch range")?;
        let (min, max) = self.profile.pitch_span_range;
        let mapped = map_range_to(new, min, max, min, max);
        if Setting::PitchRange.apply(self.backend.as_mut(), new, mapped) {
            self.session.pitch_range = Some(new);
        }
        Ok(())
    }

    fn set_volume(&mut self, token: ValueToken) -> Result<(), ProtocolError> {
        let new = token.resolve(Some(self.session.volume), "volume")?;
        let (min, max) = self.profile.volume_range;
        if Setting::Volume.apply(self.backend.as_mut(), new, map_range(new, min, max)) {
            self.session.volume = new;
        }
        Ok(())
    }

    fn set_g5(&mut self, token: ValueToken) -> Result<(), ProtocolError> {
        let new = token.resolve(self.session.g5, "g5 value")?;
        let (min, max) = self.profile.g5_range;
        if Setting::DesignVoiceG5.apply(self.backend.as_mut(), new, map_range(new, min, max)) {
            self.session.g5 = Some(new);
        }
        Ok(())
    }

    fn set_punctuation(&mut self, value: &str) -> Result<(), ProtocolError> {
        let key = value.chars().next().map(|c| c.to_ascii_lowercase());
        let level = key
            .and_then(|k| PUNCTUATION.iter().find(|(c, _)| *c == k))
            .map(|(_, level)| *level)
            .ok_or_else(|| ProtocolError::InvalidPunctuation {
                value: value.to_string(),
                key: key.map(String::from).unwrap_or_default(),
            })?;

        match self.backend.set_punctuation(level) {
            Ok(()) => {
                self.session.punctuation = Some(level);
                info!("Set punctuation to {} ({}).", value, level);
            }
            Err(e) => warn!("Error setting punctuation to {} ({}): {}", value, level, e),
        }
        Ok(())
    }

    fn set_voice_by_name(&mut self, name: &str) -> Result<(), ProtocolError> {
        let key = name.chars().next().map(|c| c.to_ascii_lowercase());
        let id = key
            .and_then(|k| VOICE_NAMES.iter().find(|(c, _)| *c == k))
            .map(|(_, id)| *id)
            .ok_or_else(|| ProtocolError::InvalidVoiceName {
                value: name.to_string(),
                key: key.map(String::from).unwrap_or_default(),
            })?;
        self.set_voice_by_id(id);
        Ok(())
    }

    fn set_voice_by_id(&mut self, id: u8) {
        let Some(voice) = VOICES.get(id as usize) else {
            return;
        };
        match self.backend.set_voice(voice) {
            Ok(()) => {
                self.session.voice = Some(id);
                info!("Set voice to {}, ID {}.", voice, id);
            }
            Err(e) => warn!("Error setting voice to {}, ID {}: {}", voice, id, e),
        }
    }

    /// Run every sub-command in a bracketed command string
    fn process_commands(&mut self, text: &str) {
        debug!("Processing commands: [{}]", text);
        for command in Command::split(text) {
            if let Err(e) = self.dispatch(&command) {
                report(&e);
            }
        }
    }

    fn dispatch(&mut self, command: &Command<'_>) -> Result<(), ProtocolError> {
        match (command.code, command.selector, command.value) {
            ("ra", _, Some(v)) => self.set_rate(ValueToken::parse(v)?)?,
            ("vo", _, Some(v)) => self.set_volume(ValueToken::parse(v)?)?,
            ("pu", _, Some(v)) => self.set_punctuation(v)?,
            ("na", _, Some(v)) => self.set_voice_by_name(v)?,
            ("dv", Some("ap"), Some(v)) => self.set_pitch(ValueToken::parse(v)?)?,
            ("dv", Some("g5"), Some(v)) => self.set_g5(ValueToken::parse(v)?)?,
            ("dv", Some("pr"), Some(v)) => self.set_pitch_range(ValueToken::parse(v)?)?,
            _ => match command.voice_digit() {
                Some(id) => self.set_voice_by_id(id),
                None => debug!("Unprocessed command '{:?}'.", command),
            },
        }
        Ok(())
    }

    /// Speak pending literal text; command text stays put
    fn flush_literal(&mut self) {
        if let Some(text) = self.session.buffer.take_literal() {
            speak(self.backend.as_mut(), &text);
        }
    }
}

impl Decoder for DectalkDecoder {
    fn feed(&mut self, data: &[u8]) -> Vec<u8> {
        let mut response = Vec::new();

        for &byte in data {
            if byte == self.profile.break_byte {
                if let Err(e) = self.backend.cancel() {
                    warn!("Cancel failed: {}", e);
                }
                response.push(self.profile.flush_ack);
                self.flush_literal();
            } else if byte == self.profile.index_byte {
                response.push(byte);
                self.flush_literal();
            } else if byte == COMMAND_START {
                if let Some(text) = self.session.buffer.begin_command() {
                    speak(self.backend.as_mut(), &text);
                }
            } else if byte == COMMAND_END {
                let text = self.session.buffer.take();
                if !text.is_empty() {
                    self.process_commands(&text);
                }
            } else if (0x20..=0x7E).contains(&byte) {
                self.session.buffer.push(byte);
            }

            if self.session.buffer.is_full() {
                let mode = self.session.buffer.mode();
                let text = self.session.buffer.drain();
                debug!("Scratch buffer full in {:?} mode, speaking it", mode);
                speak(self.backend.as_mut(), &text);
            }
        }

        response
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn protocol(&self) -> Protocol {
        if self.profile == DectalkProfile::LEGACY {
            Protocol::DectalkLegacy
        } else {
            Protocol::Dectalk
        }
    }

    fn flush_terminator(&self) -> u8 {
        self.profile.index_byte
    }

    fn shutdown(&mut self) {
        if self.session.mode() == Mode::Literal {
            self.flush_literal();
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
    fn test_command_parse() {
        let cmd = Command::parse("ra 300").unwrap();
        assert_eq!(cmd.code, "ra");
        assert_eq!(cmd.selector, None);
        assert_eq!(cmd.value, Some("300"));
    }

    #[test]
    fn test_command_parse_device_command() {
        let cmd = Command::parse("dv ap 120").unwrap();
        assert_eq!(cmd.code, "dv");
        assert_eq!(cmd.selector, Some("ap"));
        assert_eq!(cmd.value, Some("120"));
    }

    #[test]
    fn test_command_code_is_two_chars() {
        let cmd = Command::parse("rate 200").unwrap();
        assert_eq!(cmd.code, "ra");
        assert_eq!(cmd.value, Some("200"));

        let cmd = Command::parse("n").unwrap();
        assert_eq!(cmd.code, "n");
        assert_eq!(cmd.voice_digit(), None);
    }

    #[test]
    fn test_command_split_skips_blanks() {
        let commands: Vec<_> = Command::split(" :ra 300::vo 40 ").collect();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].code, "ra");
        assert_eq!(commands[1].code, "vo");
    }

    #[test]
    fn test_voice_digit() {
        assert_eq!(Command::parse("n0").unwrap().voice_digit(), Some(0));
        assert_eq!(Command::parse("n9").unwrap().voice_digit(), Some(9));
        assert_eq!(Command::parse("np").unwrap().voice_digit(), None);
    }

    #[test]
    fn test_profiles_share_control_bytes() {
        assert_eq!(DectalkProfile::CURRENT.break_byte, 0x03);
        assert_eq!(DectalkProfile::CURRENT.index_byte, 0x0B);
        assert_eq!(DectalkProfile::CURRENT.pitch_range, (50, 180));
        assert_eq!(DectalkProfile::LEGACY.pitch_range, (50, 200));
    }
}
