//! Input Adapter: maps an abstract source-event stream onto `InputState`.
//!
//! Enumerating and decoding the physical source gamepad is an explicit
//! non-goal -- by the time a [`SourceEvent`] reaches this
//! module, button/axis translation has already happened elsewhere. This
//! module only owns the logical-to-wire mapping (stick normalisation, hat
//! bit composition, trigger-as-button promotion, IMU axis remap).

use std::str::FromStr;

use crate::config::ImuAxisConfig;
use crate::state::{ImuSample, InputState, LogicalButton, Stick};

/// Logical analog axes, closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalAxis {
    LX,
    LY,
    RX,
    RY,
    LTrigger,
    RTrigger,
}

impl FromStr for LogicalAxis {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use LogicalAxis::*;
        Ok(match s.to_ascii_lowercase().as_str() {
            "lx" => LX,
            "ly" => LY,
            "rx" => RX,
            "ry" => RY,
            "ltrigger" => LTrigger,
            "rtrigger" => RTrigger,
            _ => return Err(()),
        })
    }
}

/// One normalised event from the (out-of-scope) source-gamepad layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceEvent {
    ButtonChange(LogicalButton, bool),
    /// `value` normalised to `[-1.0, 1.0]` for sticks, `[0.0, 1.0]` for
    /// triggers; centre/rest is `0.0`.
    AxisChange(LogicalAxis, f64),
    /// Each component in `{-1, 0, 1}`.
    HatChange(i8, i8),
    ImuSample(ImuSample),
}

/// Trigger axes above this normalised value additionally set ZL/ZR.
const TRIGGER_THRESHOLD: f64 = 0.5;

/// Pure mapper from [`SourceEvent`] to `InputState` mutation.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputAdapter {
    imu_axis: ImuAxisConfig,
}

impl InputAdapter {
    pub fn new(imu_axis: ImuAxisConfig) -> Self {
        Self { imu_axis }
    }

    pub fn apply(&self, state: &mut InputState, event: SourceEvent) {
        match event {
            SourceEvent::ButtonChange(btn, pressed) => state.buttons.set(btn, pressed),
            SourceEvent::AxisChange(axis, value) => self.apply_axis(state, axis, value),
            SourceEvent::HatChange(dx, dy) => {
                state.buttons.set_hat(dy < 0, dy > 0, dx < 0, dx > 0)
            }
            SourceEvent::ImuSample(sample) => state.imu.push(self.remap_imu(sample)),
        }
    }

    fn apply_axis(&self, state: &mut InputState, axis: LogicalAxis, value: f64) {
        match axis {
            LogicalAxis::LX => state.left_stick.x = normalize_stick(value, false),
            LogicalAxis::LY => state.left_stick.y = normalize_stick(value, true),
            LogicalAxis::RX => state.right_stick.x = normalize_stick(value, false),
            LogicalAxis::RY => state.right_stick.y = normalize_stick(value, true),
            LogicalAxis::LTrigger => state.buttons.set(LogicalButton::ZL, value > TRIGGER_THRESHOLD),
            LogicalAxis::RTrigger => state.buttons.set(LogicalButton::ZR, value > TRIGGER_THRESHOLD),
        }
    }

    fn remap_imu(&self, sample: ImuSample) -> ImuSample {
        let flip = |v: i16, invert: bool| if invert { v.saturating_neg() } else { v };
        ImuSample {
            accel_x: flip(sample.accel_x, self.imu_axis.invert_accel_x),
            accel_y: flip(sample.accel_y, self.imu_axis.invert_accel_y),
            accel_z: flip(sample.accel_z, self.imu_axis.invert_accel_z),
            gyro_x: flip(sample.gyro_x, self.imu_axis.invert_gyro_x),
            gyro_y: flip(sample.gyro_y, self.imu_axis.invert_gyro_y),
            gyro_z: flip(sample.gyro_z, self.imu_axis.invert_gyro_z),
        }
    }
}

/// Map a normalised `[-1.0, 1.0]` axis value to the wire's `[0, 4095]`
/// range, centre 2048. `invert` flips the axis so raw-up maps to the
/// higher numeric value on the impersonated controller.
fn normalize_stick(value: f64, invert: bool) -> u16 {
    let value = if invert { -value } else { value };
    let clamped = value.clamp(-1.0, 1.0);
    ((clamped * 2047.0) + 2048.0).round() as u16
}

/// A non-blocking producer of [`SourceEvent`]s. The Protocol Engine polls
/// this on its own cadence and never blocks on it.
pub trait InputSource {
    /// Drain and return all events available right now, without blocking.
    fn poll(&mut self) -> Vec<SourceEvent>;

    /// Whether the producer behind this source is still alive. Sources that
    /// can't disconnect (e.g. [`NullSource`]) stay connected forever.
    fn is_connected(&self) -> bool {
        true
    }
}

/// An [`InputSource`] fed by an external producer (e.g. a dedicated thread
/// reading the physical device) over a channel. The only concrete
/// `InputSource` this crate ships, since decoding the physical gamepad
/// itself is out of scope.
pub struct ChannelSource {
    rx: std::sync::mpsc::Receiver<SourceEvent>,
    disconnected: bool,
}

impl ChannelSource {
    pub fn new(rx: std::sync::mpsc::Receiver<SourceEvent>) -> Self {
        Self { rx, disconnected: false }
    }
}

impl InputSource for ChannelSource {
    fn poll(&mut self) -> Vec<SourceEvent> {
        use std::sync::mpsc::TryRecvError;

        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
        events
    }

    fn is_connected(&self) -> bool {
        !self.disconnected
    }
}

/// A source that never produces events -- used when no physical device is
/// wired up; the bridge still streams idle frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSource;

impl InputSource for NullSource {
    fn poll(&mut self) -> Vec<SourceEvent> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_centers_to_2048() {
        assert_eq!(normalize_stick(0.0, false), 2048);
    }

    #[test]
    fn axis_full_deflection_maps_to_extremes() {
        assert_eq!(normalize_stick(1.0, false), 4095);
        assert_eq!(normalize_stick(-1.0, false), 1);
    }

    #[test]
    fn y_axis_inverts_relative_to_raw_source() {
        // raw "up" (positive raw value, per the source convention) should
        // land on the *high* numeric side of the wire range once inverted.
        let up = normalize_stick(1.0, true);
        let down = normalize_stick(-1.0, true);
        assert!(down > up);
    }

    #[test]
    fn trigger_above_midpoint_sets_button() {
        let adapter = InputAdapter::default();
        let mut state = InputState::idle();
        adapter.apply(&mut state, SourceEvent::AxisChange(LogicalAxis::LTrigger, 0.9));
        assert!(state.buttons.get(LogicalButton::ZL));
        adapter.apply(&mut state, SourceEvent::AxisChange(LogicalAxis::LTrigger, 0.1));
        assert!(!state.buttons.get(LogicalButton::ZL));
    }

    #[test]
    fn hat_diagonal_sets_two_bits() {
        let adapter = InputAdapter::default();
        let mut state = InputState::idle();
        adapter.apply(&mut state, SourceEvent::HatChange(1, -1)); // up-right
        assert!(state.buttons.get(LogicalButton::Dup));
        assert!(state.buttons.get(LogicalButton::Dright));
        assert!(!state.buttons.get(LogicalButton::Ddown));
        assert!(!state.buttons.get(LogicalButton::Dleft));
    }

    #[test]
    fn imu_sample_pushed_newest_first() {
        let adapter = InputAdapter::default();
        let mut state = InputState::idle();
        adapter.apply(
            &mut state,
            SourceEvent::ImuSample(ImuSample { accel_x: 42, ..Default::default() }),
        );
        assert_eq!(state.imu.samples()[0].accel_x, 42);
    }

    #[test]
    fn imu_axis_invert_flips_sign() {
        let adapter = InputAdapter::new(ImuAxisConfig {
            invert_accel_x: true,
            ..Default::default()
        });
        let mut state = InputState::idle();
        adapter.apply(
            &mut state,
            SourceEvent::ImuSample(ImuSample { accel_x: 100, accel_y: 50, ..Default::default() }),
        );
        let newest = state.imu.samples()[0];
        assert_eq!(newest.accel_x, -100);
        assert_eq!(newest.accel_y, 50);
    }

    #[test]
    fn channel_source_drains_available_events() {
        let (tx, rx) = std::sync::mpsc::channel();
        tx.send(SourceEvent::ButtonChange(LogicalButton::A, true)).unwrap();
        tx.send(SourceEvent::ButtonChange(LogicalButton::B, true)).unwrap();
        let mut source = ChannelSource::new(rx);
        assert_eq!(source.poll().len(), 2);
        assert_eq!(source.poll().len(), 0);
        assert!(source.is_connected());
    }

    #[test]
    fn channel_source_detects_sender_drop() {
        let (tx, rx) = std::sync::mpsc::channel();
        tx.send(SourceEvent::ButtonChange(LogicalButton::A, true)).unwrap();
        drop(tx);
        let mut source = ChannelSource::new(rx);
        let events = source.poll();
        assert_eq!(events.len(), 1);
        assert!(!source.is_connected());
    }

    #[test]
    fn null_source_never_produces_events() {
        let mut source = NullSource;
        assert!(source.poll().is_empty());
        assert!(source.is_connected());
    }

    #[test]
    fn logical_axis_from_str_roundtrip() {
        assert_eq!("lx".parse::<LogicalAxis>().unwrap(), LogicalAxis::LX);
        assert_eq!("RTrigger".parse::<LogicalAxis>().unwrap(), LogicalAxis::RTrigger);
        assert!("bogus".parse::<LogicalAxis>().is_err());
    }
}
