//! Subcommand Handler: pure function from (id, payload, state) to
//! (ack byte, reply bytes) plus state mutation.
//!
//! Dispatch is a tagged enum rather than a raw byte match, so unknown ids
//! fall into one `Unknown` arm instead of a catch-all pattern guard.

use crate::calibration::CalibrationStore;
use crate::config::BridgeConfig;
use crate::state::{EngineState, Phase};

/// Tagged subcommand ids this bridge understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subcommand {
    BluetoothPairing,
    RequestDeviceInfo,
    SetInputMode,
    TriggerButtonsElapsedTime,
    SetShipmentLowPower,
    SpiFlashRead,
    SetNfcIrConfig,
    SetPlayerLights,
    SetHomeLight,
    SetImuEnable,
    SetImuSensitivity,
    SetVibrationEnable,
    Unknown(u8),
}

impl Subcommand {
    fn from_id(id: u8) -> Self {
        match id {
            0x01 => Subcommand::BluetoothPairing,
            0x02 => Subcommand::RequestDeviceInfo,
            0x03 => Subcommand::SetInputMode,
            0x04 => Subcommand::TriggerButtonsElapsedTime,
            0x08 => Subcommand::SetShipmentLowPower,
            0x10 => Subcommand::SpiFlashRead,
            0x21 => Subcommand::SetNfcIrConfig,
            0x30 => Subcommand::SetPlayerLights,
            0x38 => Subcommand::SetHomeLight,
            0x40 => Subcommand::SetImuEnable,
            0x41 => Subcommand::SetImuSensitivity,
            0x48 => Subcommand::SetVibrationEnable,
            other => Subcommand::Unknown(other),
        }
    }
}

/// Handle one subcommand, mutating `state` as a side effect and returning
/// `(ack_byte, reply)`. Never fails: unknown subcommands get a permissive
/// ack so the handshake never stalls.
pub fn handle(
    subcmd_id: u8,
    payload: &[u8],
    state: &mut EngineState,
    calibration: &CalibrationStore,
    config: &BridgeConfig,
) -> (u8, Vec<u8>) {
    match Subcommand::from_id(subcmd_id) {
        Subcommand::BluetoothPairing => {
            let mut reply = vec![0x03];
            reply.extend_from_slice(payload);
            (0x81, reply)
        }

        Subcommand::RequestDeviceInfo => {
            let mut reply = vec![config.firmware.major, config.firmware.minor, 0x03, 0x02];
            reply.extend_from_slice(&config.mac.0);
            reply.extend_from_slice(&[0x03, 0x02]);
            (0x82, reply)
        }

        Subcommand::SetInputMode => {
            state.phase = Phase::Streaming;
            state.report_mode = payload.first().copied();
            (0x80, Vec::new())
        }

        Subcommand::TriggerButtonsElapsedTime => (0x83, vec![0u8; 7]),

        Subcommand::SetShipmentLowPower => (0x80, Vec::new()),

        Subcommand::SpiFlashRead => {
            if payload.len() >= 5 {
                let offset = u16::from_le_bytes([payload[0], payload[1]]);
                let length = payload[4];
                let mut reply = vec![payload[0], payload[1], 0x00, 0x00, length];
                reply.extend(calibration.read(offset, length));
                (0x90, reply)
            } else {
                (0x90, Vec::new())
            }
        }

        Subcommand::SetNfcIrConfig => (
            0xA0,
            vec![0x01, 0x00, 0xFF, 0x00, 0x03, 0x00, 0x05, 0x01],
        ),

        Subcommand::SetPlayerLights => {
            if let Some(&lights) = payload.first() {
                state.player_lights = lights & 0x0F;
            }
            (0x80, Vec::new())
        }

        Subcommand::SetHomeLight => (0x80, Vec::new()),

        Subcommand::SetImuEnable => {
            state.imu_enabled = payload.first().copied().unwrap_or(0) != 0;
            (0x80, Vec::new())
        }

        Subcommand::SetImuSensitivity => (0x80, Vec::new()),

        Subcommand::SetVibrationEnable => {
            state.vibration_enabled = payload.first().copied().unwrap_or(0) != 0;
            (0x80, Vec::new())
        }

        Subcommand::Unknown(id) => {
            tracing::debug!("unknown subcommand 0x{id:02X}, sending permissive ack");
            (0x80, Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_config() -> BridgeConfig {
        BridgeConfig {
            endpoint: PathBuf::from("/dev/hidg0"),
            mac: crate::config::MacAddress([0x98, 0xB6, 0xE9, 0x46, 0x50, 0x6A]),
            tick_ms: 15,
            firmware: crate::config::FirmwareVersion::default(),
            imu_axis: crate::config::ImuAxisConfig::default(),
        }
    }

    #[test]
    fn device_info_reply_matches_scenario_1() {
        let mut state = EngineState::default();
        let store = CalibrationStore::new();
        let cfg = test_config();
        let (ack, reply) = handle(0x02, &[], &mut state, &store, &cfg);
        assert_eq!(ack, 0x82);
        assert_eq!(reply[0], 3);
        assert_eq!(reply[1], 72);
        assert_eq!(reply[2], 0x03);
        assert_eq!(reply[3], 0x02);
        assert_eq!(&reply[4..10], &cfg.mac.0);
        assert_eq!(&reply[10..12], &[0x03, 0x02]);
    }

    #[test]
    fn spi_read_of_colour_matches_scenario_2() {
        let mut state = EngineState::default();
        let store = CalibrationStore::new();
        let cfg = test_config();
        let payload = [0x50, 0x60, 0x00, 0x00, 0x0B];
        let (ack, reply) = handle(0x10, &payload, &mut state, &store, &cfg);
        assert_eq!(ack, 0x90);
        assert_eq!(&reply[0..5], &payload);
        assert_eq!(reply.len(), 5 + 11);
    }

    #[test]
    fn imu_enable_sets_flag_matches_scenario_3() {
        let mut state = EngineState::default();
        let store = CalibrationStore::new();
        let cfg = test_config();
        let (ack, reply) = handle(0x40, &[0x01], &mut state, &store, &cfg);
        assert_eq!(ack, 0x80);
        assert!(reply.is_empty());
        assert!(state.imu_enabled);
    }

    #[test]
    fn player_lights_matches_scenario_4() {
        let mut state = EngineState::default();
        let store = CalibrationStore::new();
        let cfg = test_config();
        let (ack, _) = handle(0x30, &[0x0F], &mut state, &store, &cfg);
        assert_eq!(ack, 0x80);
        assert_eq!(state.player_lights, 0x0F);
    }

    #[test]
    fn unknown_subcommand_matches_scenario_6() {
        let mut state = EngineState::default();
        let before = state.clone();
        let store = CalibrationStore::new();
        let cfg = test_config();
        let (ack, reply) = handle(0xFE, &[], &mut state, &store, &cfg);
        assert_eq!(ack, 0x80);
        assert!(reply.is_empty());
        assert_eq!(state.timer, before.timer);
        assert_eq!(state.phase, before.phase);
    }

    #[test]
    fn set_input_mode_transitions_to_streaming() {
        let mut state = EngineState::default();
        let store = CalibrationStore::new();
        let cfg = test_config();
        let (ack, _) = handle(0x03, &[0x30], &mut state, &store, &cfg);
        assert_eq!(ack, 0x80);
        assert_eq!(state.phase, Phase::Streaming);
        assert_eq!(state.report_mode, Some(0x30));
    }

    #[test]
    fn vibration_enable_sets_flag() {
        let mut state = EngineState::default();
        let store = CalibrationStore::new();
        let cfg = test_config();
        handle(0x48, &[0x01], &mut state, &store, &cfg);
        assert!(state.vibration_enabled);
        handle(0x48, &[0x00], &mut state, &store, &cfg);
        assert!(!state.vibration_enabled);
    }
}
