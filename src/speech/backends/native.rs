//! Native TTS backend using the tts crate
//!
//! On Linux the `tts` crate talks to Speech Dispatcher through native
//! bindings, which is the service the emulated synthesizers are redirected
//! to. Other platforms get their system engine.

use crate::speech::{Punctuation, SpeechBackend};
use crate::{Result, RpitalkError};
use log::{debug, error, warn};
use tts::{Gender, Tts as TtsCrate, Voice};

/// Native TTS backend using the tts crate
pub struct NativeBackend {
    /// The tts crate's TTS instance
    tts: TtsCrate,

    /// Last voice identifier applied, to skip redundant voice lookups
    voice: Option<String>,
}

impl NativeBackend {
    /// Connect to the platform speech service
    pub fn new() -> Result<Self> {
        debug!("Creating native TTS backend");

        let tts = TtsCrate::default()
            .map_err(|e| RpitalkError::Speech(format!("Failed to initialize TTS: {}", e)))?;

        debug!("Native TTS backend created successfully");

        Ok(Self { tts, voice: None })
    }

    /// Project a -100..100 value onto an engine range anchored at `normal`
    ///
    /// 0 lands on the engine's normal value, the ends on its min and max.
    fn project(value: i32, min: f32, normal: f32, max: f32) -> f32 {
        let value = value.clamp(-100, 100) as f32 / 100.0;
        if value >= 0.0 {
            normal + (max - normal) * value
        } else {
            normal + (normal - min) * value
        }
    }

    /// Split a symbolic voice identifier into a gender and an ordinal
    ///
    /// "MALE2" -> (Male, 1), "CHILD_FEMALE" -> (Female, 3), "default" -> None
    fn parse_voice(voice: &str) -> Option<(Gender, usize)> {
        let upper = voice.to_ascii_uppercase();
        let (child, rest) = match upper.strip_prefix("CHILD_") {
            Some(rest) => (true, rest),
            None => (false, upper.as_str()),
        };

        let (gender, digits) = if let Some(d) = rest.strip_prefix("FEMALE") {
            (Gender::Female, d)
        } else if let Some(d) = rest.strip_prefix("MALE") {
            (Gender::Male, d)
        } else {
            return None;
        };

        if child {
            return Some((gender, 3));
        }
        let ordinal = digits.parse::<usize>().unwrap_or(1).max(1) - 1;
        Some((gender, ordinal))
    }

    fn pick_voice(voices: &[Voice], gender: Gender, ordinal: usize) -> Option<&Voice> {
        let matching: Vec<&Voice> = voices
            .iter()
            .filter(|v| v.gender() == Some(gender))
            .collect();
        if matching.is_empty() {
            return None;
        }
        Some(matching[ordinal % matching.len()])
    }
}

impl SpeechBackend for NativeBackend {
    fn speak(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        debug!("Speaking: {}", text);
        self.tts.speak(text, false).map_err(|e| {
            error!("Failed to speak: {}", e);
            RpitalkError::Speech(format!("Speak failed: {}", e))
        })?;

        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        debug!("Canceling speech");
        self.tts.stop().map_err(|e| {
            error!("Failed to cancel speech: {}", e);
            RpitalkError::Speech(format!("Cancel failed: {}", e))
        })?;

        Ok(())
    }

    fn set_rate(&mut self, rate: i32) -> Result<()> {
        debug!("Setting rate to {}", rate);

        if !self.tts.supported_features().rate {
            warn!("Rate control not supported on this platform");
            return Ok(());
        }

        let converted = Self::project(
            rate,
            self.tts.min_rate(),
            self.tts.normal_rate(),
            self.tts.max_rate(),
        );
        self.tts
            .set_rate(converted)
            .map_err(|e| RpitalkError::Speech(format!("Failed to set rate: {}", e)))?;

        Ok(())
    }

    fn set_pitch(&mut self, pitch: i32) -> Result<()> {
        debug!("Setting pitch to {}", pitch);

        if !self.tts.supported_features().pitch {
            warn!("Pitch control not supported on this platform");
            return Ok(());
        }

        let converted = Self::project(
            pitch,
            self.tts.min_pitch(),
            self.tts.normal_pitch(),
            self.tts.max_pitch(),
        );
        self.tts
            .set_pitch(converted)
            .map_err(|e| RpitalkError::Speech(format!("Failed to set pitch: {}", e)))?;

        Ok(())
    }

    fn set_pitch_range(&mut self, range: i32) -> Result<()> {
        // The tts crate exposes no pitch range control
        debug!("Pitch range {} not supported by native backend, ignoring", range);
        Ok(())
    }

    fn set_volume(&mut self, volume: i32) -> Result<()> {
        debug!("Setting volume to {}", volume);

        if !self.tts.supported_features().volume {
            warn!("Volume control not supported on this platform");
            return Ok(());
        }

        let converted = Self::project(
            volume,
            self.tts.min_volume(),
            self.tts.normal_volume(),
            self.tts.max_volume(),
        );
        self.tts
            .set_volume(converted)
            .map_err(|e| RpitalkError::Speech(format!("Failed to set volume: {}", e)))?;

        Ok(())
    }

    fn set_punctuation(&mut self, level: Punctuation) -> Result<()> {
        debug!("Punctuation level {} not supported by native backend, ignoring", level);
        Ok(())
    }

    fn set_voice(&mut self, voice: &str) -> Result<()> {
        debug!("Setting voice to {}", voice);
        if self.voice.as_deref() == Some(voice) {
            return Ok(());
        }

        let Some((gender, ordinal)) = Self::parse_voice(voice) else {
            // "default" and unknown identifiers keep the engine's own voice
            self.voice = Some(voice.to_string());
            return Ok(());
        };

        if !self.tts.supported_features().voice {
            warn!("Voice selection not supported on this platform");
            return Ok(());
        }

        let voices = self
            .tts
            .voices()
            .map_err(|e| RpitalkError::Speech(format!("Failed to get voices: {}", e)))?;

        match Self::pick_voice(&voices, gender, ordinal) {
            Some(selected) => {
                debug!("Selecting voice: {}", selected.name());
                self.tts
                    .set_voice(selected)
                    .map_err(|e| RpitalkError::Speech(format!("Failed to set voice: {}", e)))?;
            }
            None => warn!(
                "No {:?} voice available for {} (have {} voices)",
                gender,
                voice,
                voices.len()
            ),
        }

        self.voice = Some(voice.to_string());
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        debug!("Shutting down native TTS backend");
        self.cancel()
    }
}
