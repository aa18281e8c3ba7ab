//! In-memory backend that records every call
//!
//! Lets tests see exactly what a decoder asked the speech service to do.
//! Clones share the same log, so a test keeps one handle and boxes the
//! other into a decoder. The [`RecordingBackend::silent`] flavour runs the
//! emulator without audio (`--backend silent`): calls are logged, never kept.

use crate::speech::{Punctuation, SpeechBackend, SpeechCommand};
use crate::{Result, RpitalkError};
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Shared {
    calls: Vec<SpeechCommand>,
    fail_setters: bool,
    /// False for the silent flavour, which keeps nothing
    retain: bool,
}

/// Backend that records calls instead of speaking
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    shared: Arc<Mutex<Shared>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::with_retention(true)
    }

    /// Backend that only logs calls, for running without audio
    pub fn silent() -> Self {
        Self::with_retention(false)
    }

    fn with_retention(retain: bool) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                retain,
                ..Shared::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        // A poisoned log is still a valid log
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, cmd: SpeechCommand) {
        debug!("Speech call: {:?}", cmd);
        let mut shared = self.lock();
        if shared.retain {
            shared.calls.push(cmd);
        }
    }

    /// Record a setter call, or reject it while failure injection is on
    fn setter(&self, cmd: SpeechCommand) -> Result<()> {
        let mut shared = self.lock();
        if shared.fail_setters {
            debug!("Rejecting speech call: {:?}", cmd);
            return Err(RpitalkError::Speech(format!(
                "Speech service unavailable for {:?}",
                cmd
            )));
        }
        debug!("Speech call: {:?}", cmd);
        if shared.retain {
            shared.calls.push(cmd);
        }
        Ok(())
    }

    /// Make every parameter setter fail until switched off again
    pub fn set_failing(&self, failing: bool) {
        self.lock().fail_setters = failing;
    }

    /// All recorded calls, oldest first
    pub fn calls(&self) -> Vec<SpeechCommand> {
        self.lock().calls.clone()
    }

    /// Text of every recorded `speak` call
    pub fn spoken(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                SpeechCommand::Speak(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded calls other than `speak` and `cancel`
    pub fn setter_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| !matches!(c, SpeechCommand::Speak(_) | SpeechCommand::Cancel))
            .count()
    }

    /// Most recent call, if any
    pub fn last(&self) -> Option<SpeechCommand> {
        self.lock().calls.last().cloned()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.lock().calls.clear();
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechBackend for RecordingBackend {
    fn speak(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        self.record(SpeechCommand::Speak(text.to_string()));
        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        self.record(SpeechCommand::Cancel);
        Ok(())
    }

    fn set_rate(&mut self, rate: i32) -> Result<()> {
        self.setter(SpeechCommand::SetRate(rate))
    }

    fn set_pitch(&mut self, pitch: i32) -> Result<()> {
        self.setter(SpeechCommand::SetPitch(pitch))
    }

    fn set_pitch_range(&mut self, range: i32) -> Result<()> {
        self.setter(SpeechCommand::SetPitchRange(range))
    }

    fn set_volume(&mut self, volume: i32) -> Result<()> {
        self.setter(SpeechCommand::SetVolume(volume))
    }

    fn set_punctuation(&mut self, level: Punctuation) -> Result<()> {
        self.setter(SpeechCommand::SetPunctuation(level))
    }

    fn set_voice(&mut self, voice: &str) -> Result<()> {
        self.setter(SpeechCommand::SetVoice(voice.to_string()))
    }

    fn shutdown(&mut self) -> Result<()> {
        self.record(SpeechCommand::Shutdown);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_is_not_recorded() {
        let mut backend = RecordingBackend::new();
        backend.speak("   ").unwrap();
        backend.speak("").unwrap();
        assert!(backend.calls().is_empty());

        backend.speak("hello").unwrap();
        assert_eq!(backend.spoken(), vec!["hello".to_string()]);
    }

    #[test]
    fn test_silent_keeps_nothing() {
        let handle = RecordingBackend::silent();
        let mut backend = handle.clone();
        for _ in 0..1000 {
            backend.speak("some screen reader text").unwrap();
            backend.set_rate(13).unwrap();
            backend.cancel().unwrap();
        }
        assert!(handle.calls().is_empty());
        assert_eq!(handle.last(), None);
    }

    #[test]
    fn test_clones_share_log() {
        let handle = RecordingBackend::new();
        let mut boxed: Box<dyn SpeechBackend> = Box::new(handle.clone());
        boxed.set_rate(12).unwrap();
        assert_eq!(handle.last(), Some(SpeechCommand::SetRate(12)));
    }

    #[test]
    fn test_failing_setters() {
        let mut backend = RecordingBackend::new();
        backend.set_failing(true);
        assert!(backend.set_volume(3).is_err());
        assert!(backend.speak("still speaks").is_ok());
        assert_eq!(backend.setter_count(), 0);

        backend.set_failing(false);
        assert!(backend.send(SpeechCommand::SetVolume(3)).is_ok());
        assert_eq!(backend.setter_count(), 1);
    }
}
