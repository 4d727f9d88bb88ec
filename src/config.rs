//! Resolved runtime configuration shared by the Protocol Engine and the
//! Subcommand Handler.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::BridgeError;

/// Per-axis sign flip for the six IMU channels. Default is identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImuAxisConfig {
    pub invert_accel_x: bool,
    pub invert_accel_y: bool,
    pub invert_accel_z: bool,
    pub invert_gyro_x: bool,
    pub invert_gyro_y: bool,
    pub invert_gyro_z: bool,
}

impl FromStr for ImuAxisConfig {
    type Err = BridgeError;

    /// Parses a comma list drawn from `{ax,ay,az,gx,gy,gz}`, e.g. `"ax,gz"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cfg = ImuAxisConfig::default();
        let s = s.trim();
        if s.is_empty() {
            return Ok(cfg);
        }
        for token in s.split(',') {
            match token.trim() {
                "ax" => cfg.invert_accel_x = true,
                "ay" => cfg.invert_accel_y = true,
                "az" => cfg.invert_accel_z = true,
                "gx" => cfg.invert_gyro_x = true,
                "gy" => cfg.invert_gyro_y = true,
                "gz" => cfg.invert_gyro_z = true,
                other => {
                    return Err(BridgeError::ConfigError(format!(
                        "unknown --imu-invert axis {other:?} (expected one of ax,ay,az,gx,gy,gz)"
                    )))
                }
            }
        }
        Ok(cfg)
    }
}

/// Firmware version advertised in device-info replies. Default (3, 72),
/// overridable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl Default for FirmwareVersion {
    fn default() -> Self {
        Self { major: 3, minor: 72 }
    }
}

impl FromStr for FirmwareVersion {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s.split_once('.').ok_or_else(|| {
            BridgeError::ConfigError(format!("invalid --fw-version {s:?} (expected MAJOR.MINOR)"))
        })?;
        let major: u8 = major
            .parse()
            .map_err(|_| BridgeError::ConfigError(format!("invalid firmware major {major:?}")))?;
        let minor: u8 = minor
            .parse()
            .map_err(|_| BridgeError::ConfigError(format!("invalid firmware minor {minor:?}")))?;
        Ok(Self { major, minor })
    }
}

/// A stable MAC-like identifier advertised to the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacAddress(pub [u8; 6]);

impl Default for MacAddress {
    /// Fixed vendor-like identifier.
    fn default() -> Self {
        Self([0x98, 0xB6, 0xE9, 0x46, 0x50, 0x6A])
    }
}

impl FromStr for MacAddress {
    type Err = BridgeError;

    /// Parses 12 hex digits, no separators (e.g. `98B6E946506A`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 12 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(BridgeError::ConfigError(format!(
                "invalid --mac {s:?} (expected 12 hex digits)"
            )));
        }
        let mut mac = [0u8; 6];
        for (i, byte) in mac.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).expect("validated hex above");
        }
        Ok(MacAddress(mac))
    }
}

/// Resolved configuration shared across the Protocol Engine and Subcommand
/// Handler.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub endpoint: PathBuf,
    pub mac: MacAddress,
    pub tick_ms: u64,
    pub firmware: FirmwareVersion,
    pub imu_axis: ImuAxisConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imu_invert_parses_list() {
        let cfg: ImuAxisConfig = "ax,gz".parse().unwrap();
        assert!(cfg.invert_accel_x);
        assert!(cfg.invert_gyro_z);
        assert!(!cfg.invert_accel_y);
    }

    #[test]
    fn imu_invert_empty_is_identity() {
        let cfg: ImuAxisConfig = "".parse().unwrap();
        assert_eq!(cfg, ImuAxisConfig::default());
    }

    #[test]
    fn imu_invert_rejects_unknown_axis() {
        assert!("qq".parse::<ImuAxisConfig>().is_err());
    }

    #[test]
    fn firmware_version_parses() {
        let fw: FirmwareVersion = "3.72".parse().unwrap();
        assert_eq!(fw, FirmwareVersion { major: 3, minor: 72 });
    }

    #[test]
    fn firmware_version_rejects_missing_dot() {
        assert!("372".parse::<FirmwareVersion>().is_err());
    }

    #[test]
    fn mac_address_parses_hex() {
        let mac: MacAddress = "98B6E946506A".parse().unwrap();
        assert_eq!(mac.0, [0x98, 0xB6, 0xE9, 0x46, 0x50, 0x6A]);
    }

    #[test]
    fn mac_address_rejects_wrong_length() {
        assert!("ABCD".parse::<MacAddress>().is_err());
    }
}
