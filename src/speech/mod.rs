//! Speech back-end adapter

pub mod backend;
pub mod backends;

pub use backend::{create_backend, BackendKind, Punctuation, SpeechBackend, SpeechCommand};
pub use backends::recording::RecordingBackend;
