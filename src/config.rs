//! Configuration management
//!
//! Settings come from an optional INI file (`~/.rpitalk.cfg` by default)
//! and are overridden by command line flags. Nothing is ever written back:
//! the emulator starts from the same settings every time.

use crate::protocol::{DeviceDefaults, Protocol};
use crate::speech::BackendKind;
use crate::{Result, RpitalkError};
use ini::Ini;
use log::{debug, info, LevelFilter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Serial device used when none is configured (USB gadget serial port)
pub const DEFAULT_DEVICE: &str = "/dev/ttyGS0";

/// Line speed of the original LiteTalk hardware
pub const LITETALK_BAUD: u32 = 9600;

/// Diagnostic verbosity, from `--debug`, `DEBUG`, or the config file
///
/// 0 warnings only, 1 info, 2 debug, 3 debug plus raw byte dumps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct DebugLevel(pub u8);

impl DebugLevel {
    /// Log filter for this level
    pub fn log_filter(&self) -> LevelFilter {
        match self.0 {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }

    /// Whether raw RX/AK traffic is dumped to stderr
    pub fn dumps_bytes(&self) -> bool {
        self.0 >= 3
    }
}

/// Emulator configuration
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Where the configuration was (or would have been) loaded from
    path: PathBuf,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`; a missing file means all defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(path)
                .map_err(|e| RpitalkError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file {:?} not found, using defaults", path);
            Ini::new()
        };

        Ok(Self {
            ini,
            path: path.to_path_buf(),
        })
    }

    /// Parse configuration from INI text
    pub fn from_ini_str(text: &str) -> Result<Self> {
        let ini = Ini::load_from_str(text)
            .map_err(|e| RpitalkError::IniParse(format!("Failed to parse config: {}", e)))?;
        Ok(Self {
            ini,
            path: PathBuf::new(),
        })
    }

    /// Default config file path (~/.rpitalk.cfg)
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".rpitalk.cfg")
    }

    /// Expose the config file path for display
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a string value from config
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .trim()
            .to_string()
    }

    /// Get an integer value from config
    pub fn get_int(&self, section: &str, key: &str, default: i32) -> i32 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Serial device path
    pub fn device(&self) -> PathBuf {
        PathBuf::from(self.get_string("serial", "device", DEFAULT_DEVICE))
    }

    /// Line speed to force, or `None` to leave the device's speed alone
    ///
    /// Unset means the protocol's own default: LiteTalk hardware ran at
    /// 9600, DECtalk over a USB gadget port has no meaningful speed.
    /// An explicit 0 also means "leave alone".
    pub fn baud(&self, protocol: Protocol) -> Option<u32> {
        let default = match protocol {
            Protocol::Litetalk => LITETALK_BAUD as i32,
            Protocol::Dectalk | Protocol::DectalkLegacy => 0,
        };
        match self.get_int("serial", "baud", default) {
            n if n > 0 => Some(n as u32),
            _ => None,
        }
    }

    /// How often to check for the device node while it is missing
    pub fn poll_interval(&self) -> Duration {
        let ms = self.get_int("serial", "poll_interval_ms", 1000).max(10);
        Duration::from_millis(ms as u64)
    }

    /// Largest chunk read from the device at once
    pub fn read_chunk(&self) -> usize {
        self.get_int("serial", "read_chunk", 1024).clamp(1, 65536) as usize
    }

    /// Speech back-end selection
    pub fn backend(&self) -> Result<BackendKind> {
        BackendKind::parse(&self.get_string("speech", "backend", "auto"))
    }

    /// Emulated device family
    pub fn protocol(&self) -> Result<Protocol> {
        Protocol::parse(&self.get_string("emulator", "protocol", "dectalk"))
    }

    /// Debug level from the config file
    pub fn debug_level(&self) -> DebugLevel {
        DebugLevel(self.get_int("emulator", "debug", 0).clamp(0, 255) as u8)
    }

    /// Initial speech parameters for `protocol`
    pub fn device_defaults(&self, protocol: Protocol) -> DeviceDefaults {
        let base = DeviceDefaults::for_protocol(protocol);
        let section = if protocol.is_dectalk() {
            "dectalk"
        } else {
            "litetalk"
        };
        DeviceDefaults {
            rate: self.get_int(section, "rate", base.rate),
            pitch: self.get_int(section, "pitch", base.pitch),
            volume: self.get_int(section, "volume", base.volume),
        }
    }
}
