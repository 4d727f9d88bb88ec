//! Pro Controller protocol bridge.
//!
//! Emulates a first-party Pro Controller over a USB HID gadget endpoint
//! while physical input is supplied by an independent source adapter.

mod calibration;
mod codec;
mod config;
mod engine;
mod error;
mod input_adapter;
mod input_source;
mod state;
mod subcommand;
mod transport;

use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use calibration::CalibrationStore;
use config::{BridgeConfig, FirmwareVersion, ImuAxisConfig, MacAddress};
use engine::ProtocolEngine;
use error::BridgeError;
use input_adapter::{ChannelSource, InputAdapter, InputSource};
use state::SharedInput;
use transport::Transport;

#[derive(Parser)]
#[command(name = "procon-bridge", about = "USB gadget Pro Controller protocol bridge")]
struct Args {
    /// HID gadget endpoint to emulate the controller on.
    #[arg(long, default_value = "/dev/hidg0")]
    endpoint: PathBuf,

    /// Controller identifier advertised to the console, 12 hex digits.
    #[arg(long)]
    mac: Option<String>,

    /// Input-report cadence once streaming, in milliseconds.
    #[arg(long, default_value_t = 15)]
    tick_ms: u64,

    /// Firmware version advertised in device-info replies, MAJOR.MINOR.
    #[arg(long)]
    fw_version: Option<String>,

    /// Comma list of IMU axes to invert, drawn from ax,ay,az,gx,gy,gz.
    #[arg(long, default_value = "")]
    imu_invert: String,

    /// Verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

fn build_config(args: &Args) -> Result<BridgeConfig, BridgeError> {
    let mac = match &args.mac {
        Some(s) => s.parse()?,
        None => MacAddress::default(),
    };
    let firmware = match &args.fw_version {
        Some(s) => s.parse()?,
        None => FirmwareVersion::default(),
    };
    let imu_axis: ImuAxisConfig = args.imu_invert.parse()?;

    Ok(BridgeConfig {
        endpoint: args.endpoint.clone(),
        mac,
        tick_ms: args.tick_ms,
        firmware,
        imu_axis,
    })
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    info!("=== Pro Controller protocol bridge ===");

    let exit_code = match run(args).await {
        Ok(()) => 0,
        Err(e) => {
            error!("{e}");
            e.exit_code()
        }
    };
    std::process::exit(exit_code);
}

async fn run(args: Args) -> Result<(), BridgeError> {
    let config = build_config(&args)?;
    info!("gadget endpoint: {}", config.endpoint.display());

    let transport = Transport::open(&config.endpoint)?;
    let calibration = CalibrationStore::new();
    let adapter = InputAdapter::new(config.imu_axis);
    let shared = SharedInput::new();

    // Decoding a physical source gamepad is out of scope; the producer this
    // crate ships reads a minimal line command protocol from stdin. Swap
    // `input_source::spawn` for a real device reader to drive the bridge
    // from hardware.
    let (source, _reader) = input_source::spawn(BufReader::new(std::io::stdin()));
    tokio::spawn(poll_input(source, adapter, Arc::clone(&shared)));

    let engine = ProtocolEngine::new(transport, calibration, config);
    engine.run(shared).await
}

/// Drains the input source onto the shared snapshot on a short fixed
/// cadence, independent of the Protocol Engine's own tick. Exits once the
/// source reports disconnection, marking the shared state so the engine
/// winds down too.
async fn poll_input(mut source: ChannelSource, adapter: InputAdapter, shared: Arc<SharedInput>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(5));
    loop {
        ticker.tick().await;
        let events = source.poll();
        if !events.is_empty() {
            let mut state = shared.snapshot();
            for event in events {
                adapter.apply(&mut state, event);
            }
            shared.write(state);
        }
        if !source.is_connected() {
            warn!("input source disconnected");
            shared.mark_disconnected();
            return;
        }
    }
}
