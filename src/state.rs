//! Shared data model: `InputState` (buttons/sticks/IMU) and `EngineState`
//! (timer, packet counter, phase).

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Logical buttons the Input Adapter can report. Closed set —
/// note there is no `Sl`/`Sr`: the protocol reserves four bits for them in
/// byte 2 but this bridge never sets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalButton {
    A,
    B,
    X,
    Y,
    L,
    R,
    ZL,
    ZR,
    Minus,
    Plus,
    Home,
    Capture,
    Lclick,
    Rclick,
    Dup,
    Ddown,
    Dleft,
    Dright,
}

impl FromStr for LogicalButton {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use LogicalButton::*;
        Ok(match s.to_ascii_lowercase().as_str() {
            "a" => A,
            "b" => B,
            "x" => X,
            "y" => Y,
            "l" => L,
            "r" => R,
            "zl" => ZL,
            "zr" => ZR,
            "minus" => Minus,
            "plus" => Plus,
            "home" => Home,
            "capture" => Capture,
            "lclick" => Lclick,
            "rclick" => Rclick,
            "dup" => Dup,
            "ddown" => Ddown,
            "dleft" => Dleft,
            "dright" => Dright,
            _ => return Err(()),
        })
    }
}

impl LogicalButton {
    /// (byte index within the 3-byte button field, bitmask)
    fn position(self) -> (usize, u8) {
        use LogicalButton::*;
        match self {
            Y => (0, 0x01),
            B => (0, 0x02),
            A => (0, 0x04),
            X => (0, 0x08),
            L => (0, 0x10),
            R => (0, 0x20),
            ZL => (0, 0x40),
            ZR => (0, 0x80),
            Minus => (1, 0x01),
            Plus => (1, 0x02),
            Lclick => (1, 0x04),
            Rclick => (1, 0x08),
            Home => (1, 0x10),
            Capture => (1, 0x20),
            Ddown => (2, 0x01),
            Dup => (2, 0x02),
            Dright => (2, 0x04),
            Dleft => (2, 0x08),
        }
    }
}

/// 24 bits of button/hat state packed as three bytes, matching the wire
/// layout directly (no translation needed at encode time).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    bytes: [u8; 3],
}

impl ButtonState {
    pub fn bytes(&self) -> [u8; 3] {
        self.bytes
    }

    pub fn get(&self, btn: LogicalButton) -> bool {
        let (byte_idx, mask) = btn.position();
        self.bytes[byte_idx] & mask != 0
    }

    pub fn set(&mut self, btn: LogicalButton, pressed: bool) {
        let (byte_idx, mask) = btn.position();
        if pressed {
            self.bytes[byte_idx] |= mask;
        } else {
            self.bytes[byte_idx] &= !mask;
        }
    }

    /// Set the four hat bits (byte 2, low nibble) directly. Diagonals set
    /// two bits at once; this never touches the SL/SR bits (byte 2 high
    /// nibble), which this bridge never emits.
    pub fn set_hat(&mut self, up: bool, down: bool, left: bool, right: bool) {
        self.set(LogicalButton::Dup, up);
        self.set(LogicalButton::Ddown, down);
        self.set(LogicalButton::Dleft, left);
        self.set(LogicalButton::Dright, right);
    }
}

/// A single analog stick, 12-bit unsigned per axis, centre 2048.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stick {
    pub x: u16,
    pub y: u16,
}

impl Stick {
    pub const CENTER: Stick = Stick { x: 2048, y: 2048 };
}

impl Default for Stick {
    fn default() -> Self {
        Stick::CENTER
    }
}

/// One IMU sample: accelerometer + gyroscope, each a signed 16-bit triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImuSample {
    pub accel_x: i16,
    pub accel_y: i16,
    pub accel_z: i16,
    pub gyro_x: i16,
    pub gyro_y: i16,
    pub gyro_z: i16,
}

/// Ring of the three most recent IMU samples. `samples()` returns them
/// newest-first, matching the encode-time ordering the wire frame uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImuRing {
    samples: [ImuSample; 3],
}

impl ImuRing {
    pub fn push(&mut self, sample: ImuSample) {
        self.samples[2] = self.samples[1];
        self.samples[1] = self.samples[0];
        self.samples[0] = sample;
    }

    /// Newest-first, matching wire order.
    pub fn samples(&self) -> [ImuSample; 3] {
        self.samples
    }
}

/// The authoritative snapshot read by the Wire Codec and written by the
/// Input Adapter. Cheap to clone — the Protocol Engine reads it by
/// copy-snapshot rather than holding a lock across a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub buttons: ButtonState,
    pub left_stick: Stick,
    pub right_stick: Stick,
    pub imu: ImuRing,
}

impl InputState {
    /// All buttons released, sticks centred, IMU flat — the idle frame
    /// emitted while the source is disconnected.
    pub fn idle() -> Self {
        Self::default()
    }
}

/// `InputState` plus a liveness flag, shared between the Input Adapter task
/// and the Protocol Engine. The engine reads both by snapshot each tick; it
/// never holds the lock across a tick boundary.
#[derive(Debug)]
pub struct SharedInput {
    state: Mutex<InputState>,
    connected: AtomicBool,
}

impl SharedInput {
    /// Starts idle and connected -- the producer marks disconnection once
    /// its channel closes.
    pub fn new() -> Arc<Self> {
        Arc::new(Self { state: Mutex::new(InputState::idle()), connected: AtomicBool::new(true) })
    }

    pub fn write(&self, state: InputState) {
        *self.state.lock().expect("input state mutex poisoned") = state;
    }

    pub fn snapshot(&self) -> InputState {
        *self.state.lock().expect("input state mutex poisoned")
    }

    pub fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

/// Connection lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Awaiting,
    Handshaking,
    Streaming,
    Suspended,
}

/// Process-wide engine state: counters, negotiated features, phase.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub timer: u8,
    pub packet_counter: u8,
    pub battery_conn: u8,
    pub phase: Phase,
    pub imu_enabled: bool,
    pub vibration_enabled: bool,
    pub player_lights: u8,
    /// Payload of the last "set input mode" subcommand (0x03), if any.
    pub report_mode: Option<u8>,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            timer: 0,
            packet_counter: 0,
            battery_conn: 0x81,
            phase: Phase::Awaiting,
            imu_enabled: false,
            vibration_enabled: false,
            player_lights: 0,
            report_mode: None,
        }
    }
}

impl EngineState {
    pub fn tick_timer(&mut self) {
        self.timer = self.timer.wrapping_add(1);
    }

    pub fn tick_packet_counter(&mut self) {
        self.packet_counter = self.packet_counter.wrapping_add(1);
    }
}
