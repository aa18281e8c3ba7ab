//! espeak-ng backend
//!
//! Spawns one `espeak-ng` process per utterance. Useful on headless boards
//! where Speech Dispatcher is not installed but espeak-ng and an audio
//! device are.
//!
//! Utterances are queued and played one after another by a worker thread,
//! the way a hardware synthesizer queues text: only `cancel` (the host's
//! break or cancel byte) cuts speech short.
//!
//! Dependencies:
//! - espeak-ng (install with: sudo apt install espeak-ng)

use crate::mapper::map_range_to;
use crate::speech::{Punctuation, SpeechBackend};
use crate::{Result, RpitalkError};
use log::{debug, error};
use std::collections::VecDeque;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Punctuation characters spoken at the "some" level
const SOME_PUNCTUATION: &str = "@#$%&*+=";

/// Punctuation characters spoken at the "most" level
const MOST_PUNCTUATION: &str = "@#$%&*+=()[]{}<>/\\|^~_";

/// How often the worker checks whether the current utterance finished
const EXIT_POLL: Duration = Duration::from_millis(20);

#[derive(Default)]
struct PlaybackState {
    /// Argument lists of utterances not started yet
    queue: VecDeque<Vec<String>>,

    /// Currently running espeak-ng process
    current: Option<Child>,

    shutdown: bool,
}

/// Queue shared between the backend and its playback worker
#[derive(Default)]
struct Playback {
    state: Mutex<PlaybackState>,
    signal: Condvar,
}

impl Playback {
    fn lock(&self) -> MutexGuard<'_, PlaybackState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Kill a running espeak-ng process
fn kill_child(current: &mut Option<Child>) {
    if let Some(mut child) = current.take() {
        debug!("Killing espeak-ng process");
        match child.kill() {
            Ok(_) => {
                let _ = child.wait(); // Clean up zombie
            }
            Err(e) => {
                debug!("Failed to kill espeak-ng process: {}", e);
            }
        }
    }
}

/// Worker loop: start the next utterance once the previous one exited
fn run_playback(program: &str, playback: &Playback) {
    let mut state = playback.lock();
    loop {
        if state.shutdown {
            kill_child(&mut state.current);
            return;
        }

        let status = state.current.as_mut().map(|child| child.try_wait());
        match status {
            Some(Ok(None)) => {
                state = match playback.signal.wait_timeout(state, EXIT_POLL) {
                    Ok((guard, _)) => guard,
                    Err(e) => e.into_inner().0,
                };
                continue;
            }
            Some(Ok(Some(_))) => state.current = None,
            Some(Err(e)) => {
                debug!("Lost track of espeak-ng process: {}", e);
                state.current = None;
            }
            None => {}
        }

        match state.queue.pop_front() {
            Some(args) => {
                let spawned = Command::new(program)
                    .args(&args)
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn();
                match spawned {
                    Ok(child) => {
                        debug!("espeak-ng process started, {} queued", state.queue.len());
                        state.current = Some(child);
                    }
                    Err(e) => error!("Failed to spawn espeak-ng: {}", e),
                }
            }
            None => {
                state = playback
                    .signal
                    .wait(state)
                    .unwrap_or_else(|e| e.into_inner());
            }
        }
    }
}

/// espeak-ng backend
pub struct EspeakBackend {
    playback: Arc<Playback>,

    worker: Option<JoinHandle<()>>,

    /// Words per minute (80-450)
    speed: i32,

    /// Pitch (0-99)
    pitch: i32,

    /// Amplitude (0-200)
    amplitude: i32,

    punctuation: Punctuation,

    /// Voice name for espeak-ng, with variant
    voice: String,
}

impl EspeakBackend {
    /// Create a new espeak-ng backend
    ///
    /// Verifies espeak-ng is available
    pub fn new() -> Result<Self> {
        debug!("Creating espeak-ng backend");

        let espeak_path = Self::find_espeak()?;
        debug!("Found espeak-ng at: {}", espeak_path);

        Self::with_program(&espeak_path)
    }

    /// Create a backend driving the espeak-compatible executable `program`
    pub fn with_program(program: &str) -> Result<Self> {
        if !Self::responds(program) {
            return Err(RpitalkError::Speech(format!(
                "{} does not run (tried --version)",
                program
            )));
        }

        let playback = Arc::new(Playback::default());
        let worker = {
            let playback = Arc::clone(&playback);
            let program = program.to_string();
            thread::Builder::new()
                .name("espeak-ng".to_string())
                .spawn(move || run_playback(&program, &playback))
                .map_err(|e| {
                    RpitalkError::Speech(format!("Failed to start playback thread: {}", e))
                })?
        };

        Ok(Self {
            playback,
            worker: Some(worker),
            speed: 175,
            pitch: 50,
            amplitude: 100,
            punctuation: Punctuation::None,
            voice: "en".to_string(),
        })
    }

    fn responds(program: &str) -> bool {
        Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Find espeak-ng executable
    fn find_espeak() -> Result<String> {
        let paths = ["espeak-ng", "/usr/bin/espeak-ng"];

        paths
            .iter()
            .find(|path| Self::responds(path))
            .map(|path| path.to_string())
            .ok_or_else(|| {
                RpitalkError::Speech(
                    "espeak-ng not found. Install with: sudo apt install espeak-ng".to_string(),
                )
            })
    }

    /// Convert a -100..100 rate to espeak speed (80-450 wpm)
    fn rate_to_speed(rate: i32) -> i32 {
        map_range_to(rate, -100, 100, 80, 450)
    }

    /// Convert a -100..100 pitch to espeak pitch (0-99)
    fn pitch_to_espeak(pitch: i32) -> i32 {
        map_range_to(pitch, -100, 100, 0, 99)
    }

    /// Convert a -100..100 volume to espeak amplitude (0-200)
    fn volume_to_amplitude(volume: i32) -> i32 {
        map_range_to(volume, -100, 100, 0, 200)
    }

    /// espeak-ng voice variant for a symbolic voice identifier
    fn voice_for(identifier: &str) -> &'static str {
        match identifier.to_ascii_uppercase().as_str() {
            "MALE1" => "en+m1",
            "MALE2" => "en+m2",
            "MALE3" => "en+m3",
            "CHILD_MALE" => "en+m7",
            "FEMALE1" => "en+f1",
            "FEMALE2" => "en+f2",
            "FEMALE3" => "en+f3",
            "CHILD_FEMALE" => "en+f5",
            _ => "en",
        }
    }

    fn punct_arg(level: Punctuation) -> Option<String> {
        match level {
            Punctuation::None => None,
            Punctuation::Some => Some(format!("--punct={}", SOME_PUNCTUATION)),
            Punctuation::Most => Some(format!("--punct={}", MOST_PUNCTUATION)),
            Punctuation::All => Some("--punct".to_string()),
        }
    }

    /// Command line for one utterance, using the parameters in effect now
    fn utterance_args(&self, text: &str) -> Vec<String> {
        let mut args = vec![
            "-v".to_string(),
            self.voice.clone(),
            "-s".to_string(),
            self.speed.to_string(),
            "-p".to_string(),
            self.pitch.to_string(),
            "-a".to_string(),
            self.amplitude.to_string(),
        ];
        args.extend(Self::punct_arg(self.punctuation));
        args.push("--".to_string());
        args.push(text.to_string());
        args
    }
}

impl SpeechBackend for EspeakBackend {
    fn speak(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        debug!("Speaking: {}", text);

        let args = self.utterance_args(text);
        let mut state = self.playback.lock();
        state.queue.push_back(args);
        debug!("{} utterances queued", state.queue.len());
        self.playback.signal.notify_one();
        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        debug!("Canceling speech");
        let mut state = self.playback.lock();
        state.queue.clear();
        kill_child(&mut state.current);
        Ok(())
    }

    fn set_rate(&mut self, rate: i32) -> Result<()> {
        self.speed = Self::rate_to_speed(rate);
        debug!("Setting rate to {} ({} wpm)", rate, self.speed);
        Ok(())
    }

    fn set_pitch(&mut self, pitch: i32) -> Result<()> {
        self.pitch = Self::pitch_to_espeak(pitch);
        debug!("Setting pitch to {} ({})", pitch, self.pitch);
        Ok(())
    }

    fn set_pitch_range(&mut self, range: i32) -> Result<()> {
        debug!("Pitch range {} not supported by espeak-ng, ignoring", range);
        Ok(())
    }

    fn set_volume(&mut self, volume: i32) -> Result<()> {
        self.amplitude = Self::volume_to_amplitude(volume);
        debug!("Setting volume to {} (amplitude {})", volume, self.amplitude);
        Ok(())
    }

    fn set_punctuation(&mut self, level: Punctuation) -> Result<()> {
        debug!("Setting punctuation to {}", level);
        self.punctuation = level;
        Ok(())
    }

    fn set_voice(&mut self, voice: &str) -> Result<()> {
        let variant = Self::voice_for(voice);
        debug!("Setting voice to {} ({})", variant, voice);
        self.voice = variant.to_string();
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        debug!("Shutting down espeak-ng backend");
        self.cancel()
    }
}

impl Drop for EspeakBackend {
    fn drop(&mut self) {
        self.playback.lock().shutdown = true;
        self.playback.signal.notify_one();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
