//! Configuration loading tests
//!
//! Loads real files from a temporary directory so the INI parsing and the
//! missing-file path are both covered.

use rpitalk::config::{Config, DebugLevel, DEFAULT_DEVICE};
use rpitalk::protocol::Protocol;
use rpitalk::speech::BackendKind;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rpitalk.cfg");

    let config = Config::load_from(&path).expect("Failed to load config");
    assert_eq!(config.path(), path.as_path());
    assert_eq!(config.device(), PathBuf::from(DEFAULT_DEVICE));
    assert_eq!(config.protocol().unwrap(), Protocol::Dectalk);

    // Defaults are never written back
    assert!(!path.exists());
}

#[test]
fn test_load_full_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rpitalk.cfg");
    fs::write(
        &path,
        "[serial]\n\
         device = /dev/ttyUSB1\n\
         baud = 19200\n\
         poll_interval_ms = 250\n\
         read_chunk = 512\n\
         \n\
         [speech]\n\
         backend = Silent\n\
         \n\
         [emulator]\n\
         protocol = litetalk\n\
         debug = 2\n\
         \n\
         [litetalk]\n\
         rate = 7\n",
    )
    .unwrap();

    let config = Config::load_from(&path).expect("Failed to load config");
    assert_eq!(config.device(), PathBuf::from("/dev/ttyUSB1"));
    assert_eq!(config.baud(Protocol::Litetalk), Some(19200));
    assert_eq!(config.poll_interval(), Duration::from_millis(250));
    assert_eq!(config.read_chunk(), 512);
    assert_eq!(config.backend().unwrap(), BackendKind::Silent);
    assert_eq!(config.protocol().unwrap(), Protocol::Litetalk);
    assert_eq!(config.debug_level(), DebugLevel(2));

    let defaults = config.device_defaults(Protocol::Litetalk);
    assert_eq!(defaults.rate, 7);
    assert_eq!(defaults.pitch, 50);
}

#[test]
fn test_out_of_range_values_are_clamped() {
    let config = Config::from_ini_str(
        "[serial]\npoll_interval_ms = 1\nread_chunk = 0\n[emulator]\ndebug = -4\n",
    )
    .unwrap();
    assert_eq!(config.poll_interval(), Duration::from_millis(10));
    assert_eq!(config.read_chunk(), 1);
    assert_eq!(config.debug_level(), DebugLevel(0));
}

#[test]
fn test_unparseable_numbers_fall_back() {
    let config = Config::from_ini_str("[serial]\nbaud = fast\n").unwrap();
    assert_eq!(config.baud(Protocol::Litetalk), Some(9600));
}

#[test]
fn test_unknown_backend_is_error() {
    let config = Config::from_ini_str("[speech]\nbackend = festival\n").unwrap();
    assert!(config.backend().is_err());
}

#[test]
fn test_default_path() {
    assert!(Config::config_path().to_str().unwrap().ends_with(".rpitalk.cfg"));
}
