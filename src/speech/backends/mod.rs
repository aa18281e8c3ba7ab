//! Concrete speech backends

// Native TTS backend using the tts crate (Speech Dispatcher on Linux)
pub mod native;

// espeak-ng subprocess backend
pub mod espeak;

// In-memory backend for silent runs and tests
pub mod recording;
