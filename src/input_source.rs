//! A minimal line-based [`InputSource`] producer. Decoding the physical
//! source gamepad is out of scope for this bridge, so the concrete producer
//! this crate ships just reads whitespace-separated commands from a byte
//! stream (stdin in practice) and turns them into [`SourceEvent`]s -- enough
//! to drive the bridge from a script or a simple test harness.
//!
//! Accepted lines:
//!   `button <Name> <0|1>`
//!   `axis <Name> <float>`
//!   `hat <dx> <dy>`
//!   `imu <ax> <ay> <az> <gx> <gy> <gz>`
//! Blank lines and unrecognised tokens are skipped with a warning; a single
//! malformed line never stops the reader.

use std::io::BufRead;
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;

use tracing::warn;

use crate::input_adapter::{ChannelSource, LogicalAxis, SourceEvent};
use crate::state::{ImuSample, LogicalButton};

/// Spawns a background thread reading lines from `reader` and returns a
/// [`ChannelSource`] fed by it. The thread exits (dropping its `Sender`)
/// when `reader` hits EOF or a read error, which `ChannelSource::poll`
/// surfaces as disconnection.
pub fn spawn<R>(reader: R) -> (ChannelSource, JoinHandle<()>)
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = std::sync::mpsc::channel();
    let handle = std::thread::spawn(move || read_loop(reader, tx));
    (ChannelSource::new(rx), handle)
}

fn read_loop<R: BufRead>(reader: R, tx: Sender<SourceEvent>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("input source read error, stopping: {e}");
                return;
            }
        };
        if let Some(event) = parse_line(&line) {
            if tx.send(event).is_err() {
                return;
            }
        }
    }
}

fn parse_line(line: &str) -> Option<SourceEvent> {
    let mut tokens = line.split_whitespace();
    match tokens.next()? {
        "button" => {
            let name = tokens.next()?;
            let pressed = tokens.next()?;
            let btn: LogicalButton = name.parse().ok().or_else(|| {
                warn!("input source: unknown button {name:?}");
                None
            })?;
            let pressed = pressed == "1";
            Some(SourceEvent::ButtonChange(btn, pressed))
        }
        "axis" => {
            let name = tokens.next()?;
            let value = tokens.next()?;
            let axis: LogicalAxis = name.parse().ok().or_else(|| {
                warn!("input source: unknown axis {name:?}");
                None
            })?;
            let value: f64 = value.parse().ok()?;
            Some(SourceEvent::AxisChange(axis, value))
        }
        "hat" => {
            let dx: i8 = tokens.next()?.parse().ok()?;
            let dy: i8 = tokens.next()?.parse().ok()?;
            Some(SourceEvent::HatChange(dx, dy))
        }
        "imu" => {
            let mut next_i16 = || tokens.next()?.parse::<i16>().ok();
            let sample = ImuSample {
                accel_x: next_i16()?,
                accel_y: next_i16()?,
                accel_z: next_i16()?,
                gyro_x: next_i16()?,
                gyro_y: next_i16()?,
                gyro_z: next_i16()?,
            };
            Some(SourceEvent::ImuSample(sample))
        }
        other => {
            warn!("input source: unrecognised command {other:?}");
            None
        }
    }
}
