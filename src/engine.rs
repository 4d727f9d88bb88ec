//! Protocol Engine: drives the connection lifecycle (idle -> handshake ->
//! streaming) and is the sole owner of `EngineState` and `Transport`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::calibration::CalibrationStore;
use crate::codec::{self, OutputFrame, REPORT_LEN};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::state::{EngineState, InputState, Phase, SharedInput};
use crate::subcommand;
use crate::transport::Transport;

/// Opportunistic 0x30 cadence before the console has requested streaming,
/// to encourage enumeration before the handshake completes.
const PRE_STREAM_TICK: Duration = Duration::from_millis(120);

pub struct ProtocolEngine {
    transport: Transport,
    calibration: CalibrationStore,
    config: BridgeConfig,
    state: EngineState,
    /// Last snapshot used to build an input/ack frame, refreshed on every
    /// tick emission and reused by subcommand replies in between ticks.
    last_input: InputState,
}

impl ProtocolEngine {
    pub fn new(transport: Transport, calibration: CalibrationStore, config: BridgeConfig) -> Self {
        Self {
            transport,
            calibration,
            config,
            state: EngineState::default(),
            last_input: InputState::idle(),
        }
    }

    /// Run until a shutdown signal, source disconnect, or a fatal error.
    /// `input` is read by copy-snapshot each tick -- the engine never blocks
    /// on it.
    pub async fn run(mut self, input: Arc<SharedInput>) -> Result<(), BridgeError> {
        let tick = Duration::from_millis(self.config.tick_ms);
        let mut last_emit = Instant::now() - tick;

        loop {
            if !input.is_connected() {
                self.state.phase = Phase::Suspended;
                return Err(BridgeError::SourceDisconnected);
            }

            let target_period = if self.state.phase == Phase::Streaming {
                tick
            } else {
                PRE_STREAM_TICK
            };
            let remaining = target_period.saturating_sub(last_emit.elapsed());

            tokio::select! {
                biased;

                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received, closing transport");
                    return Ok(());
                }

                frame = self.transport.read_frame(remaining) => {
                    if let Some(bytes) = frame? {
                        match self.handle_output(&bytes) {
                            Ok(()) => {}
                            Err(BridgeError::ProtocolViolation(msg)) => warn!("{msg}"),
                            Err(e) => return Err(e),
                        }
                    }
                }
            }

            if last_emit.elapsed() >= target_period {
                self.last_input = input.snapshot();
                self.emit_input_report()?;
                last_emit = Instant::now();
            }
        }
    }

    /// Write a frame, downgrading a transient write failure (host not yet
    /// enumerated) to a dropped frame rather than propagating it.
    fn write_or_drop(&mut self, frame: &[u8; REPORT_LEN]) -> Result<(), BridgeError> {
        match self.transport.write_frame(frame) {
            Ok(()) => Ok(()),
            Err(BridgeError::TransientWriteUnavailable(e)) => {
                debug!("write unavailable, dropping frame: {e}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn handle_output(&mut self, bytes: &[u8; REPORT_LEN]) -> Result<(), BridgeError> {
        match codec::decode_output(bytes) {
            OutputFrame::UsbCommand(0x01) => self.write_or_drop(&status_reply(&self.config))?,
            OutputFrame::UsbCommand(0x02) => {
                debug!("USB command 0x02: pairing handshake request");
                self.state.phase = Phase::Handshaking;
                self.write_or_drop(&handshake_reply())?;
            }
            OutputFrame::UsbCommand(0x03) => self.write_or_drop(&baud_reply())?,
            OutputFrame::UsbCommand(0x04) => {
                debug!("USB command 0x04 (HID only): entering streaming");
                self.state.phase = Phase::Streaming;
            }
            OutputFrame::UsbCommand(0x05) => debug!("USB command 0x05 (disable USB timeout)"),
            OutputFrame::UsbCommand(other) => debug!("unhandled USB command 0x{other:02X}"),

            OutputFrame::RumbleAndSubcommand { subcmd_id, subcmd_payload, .. } => {
                let (ack, reply) = subcommand::handle(
                    subcmd_id,
                    &subcmd_payload,
                    &mut self.state,
                    &self.calibration,
                    &self.config,
                );
                let frame = codec::encode_0x21(&self.state, &self.last_input, ack, subcmd_id, &reply);
                self.state.tick_packet_counter();
                self.write_or_drop(&frame)?;
            }

            OutputFrame::RumbleOnly { .. } => {}

            OutputFrame::Unknown(id) => {
                return Err(BridgeError::ProtocolViolation(format!(
                    "unknown output report id 0x{id:02X}"
                )));
            }
        }
        Ok(())
    }

    fn emit_input_report(&mut self) -> Result<(), BridgeError> {
        let frame = codec::encode_0x30(&self.state, &self.last_input);
        self.write_or_drop(&frame)?;
        self.state.tick_timer();
        Ok(())
    }
}

fn status_reply(config: &BridgeConfig) -> [u8; REPORT_LEN] {
    let mut buf = [0u8; REPORT_LEN];
    buf[0] = 0x81;
    buf[1] = 0x01;
    buf[2] = 0x00;
    buf[3] = 0x03;
    buf[4..10].copy_from_slice(&config.mac.0);
    buf
}

fn handshake_reply() -> [u8; REPORT_LEN] {
    let mut buf = [0u8; REPORT_LEN];
    buf[0] = 0x81;
    buf[1] = 0x02;
    buf
}

fn baud_reply() -> [u8; REPORT_LEN] {
    let mut buf = [0u8; REPORT_LEN];
    buf[0] = 0x81;
    buf[1] = 0x03;
    buf
}
