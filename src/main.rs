//! RPItalk main entry point
//!
//! Loads configuration, connects to the speech service, builds the decoder
//! for the emulated device, then either serves the serial line forever or
//! runs one of the diagnostic modes.

use anyhow::Context;
use clap::Parser;
use log::{error, info};
use rpitalk::config::{Config, DebugLevel};
use rpitalk::console::Console;
use rpitalk::protocol::{create_decoder, Protocol};
use rpitalk::serial::{Transport, TransportSettings};
use rpitalk::speech::{create_backend, BackendKind};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "rpitalk", version, about = "DECtalk / LiteTalk hardware synthesizer emulator")]
struct Cli {
    /// Serial device the host talks to
    #[arg(short = 'D', long)]
    device: Option<PathBuf>,

    /// Device family to emulate
    #[arg(short, long, value_enum)]
    protocol: Option<Protocol>,

    /// Force the line speed (0 leaves it alone)
    #[arg(short, long)]
    baud: Option<u32>,

    /// Speech back-end
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Debug level: 1 info, 2 debug, 3 debug plus byte dumps
    #[arg(short, long, env = "DEBUG")]
    debug: Option<u8>,

    /// Config file (default ~/.rpitalk.cfg)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write log output to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Type text on stdin instead of serving the serial line
    #[arg(long, conflicts_with = "monitor")]
    test_speech: bool,

    /// Print the first N chunks received from the host, then exit
    #[arg(long, value_name = "N")]
    monitor: Option<usize>,
}

fn init_logging(level: DebugLevel, log_file: Option<&PathBuf>) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level.log_filter())
        .format_timestamp(None)
        .format_target(false);

    if let Some(path) = log_file {
        use std::fs::OpenOptions;
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("Warning: Failed to open {} for logging: {}", path.display(), e);
                eprintln!("Continuing with logging to stderr...");
            }
        }
    }

    builder.init();
}

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let debug = cli
        .debug
        .map(DebugLevel)
        .unwrap_or_else(|| config.debug_level());
    init_logging(debug, cli.log_file.as_ref());
    info!("Debug/log level set to {}/{}.", debug.0, debug.log_filter());

    if let Err(e) = run(cli, config, debug) {
        error!("Fatal error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli, config: Config, debug: DebugLevel) -> anyhow::Result<()> {
    let protocol = match cli.protocol {
        Some(p) => p,
        None => config.protocol()?,
    };
    let backend_kind = match cli.backend {
        Some(b) => b,
        None => config.backend()?,
    };

    let settings = TransportSettings {
        device: cli.device.unwrap_or_else(|| config.device()),
        baud: match cli.baud {
            Some(0) => None,
            Some(b) => Some(b),
            None => config.baud(protocol),
        },
        poll_interval: config.poll_interval(),
        read_chunk: config.read_chunk(),
    };
    let transport = Transport::new(settings, debug);

    if let Some(count) = cli.monitor {
        return transport
            .monitor(count)
            .context("Connection monitor failed");
    }

    let backend = create_backend(backend_kind).context("Error initializing speech service")?;
    let mut decoder = create_decoder(protocol, backend, config.device_defaults(protocol));
    info!("Emulating {:?}", protocol);

    if cli.test_speech {
        return Console::new(debug)
            .run(decoder.as_mut())
            .context("Speech test failed");
    }

    let result = transport.run(decoder.as_mut());
    decoder.shutdown();
    result.with_context(|| {
        format!(
            "Failed to open/configure serial device {}",
            transport.settings().device.display()
        )
    })
}
