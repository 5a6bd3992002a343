//! Recognized sensor configuration parameters and local value validation.

use serde_json::{Map, Value};

use crate::types::{ConfigOutcome, LidarError, LidarResult};

const LIDAR_MODES: &[&str] = &["512x10", "512x20", "1024x10", "1024x20", "2048x10", "4096x5"];
const OPERATING_MODES: &[&str] = &["NORMAL", "STANDBY"];
const TIMESTAMP_MODES: &[&str] = &[
    "TIME_FROM_INTERNAL_OSC",
    "TIME_FROM_SYNC_PULSE_IN",
    "TIME_FROM_PTP_1588",
];
const LIDAR_PROFILES: &[&str] = &[
    "LEGACY",
    "RNG19_RFL8_SIG16_NIR16",
    "RNG15_RFL8_NIR8",
    "RNG19_RFL8_SIG16_NIR16_DUAL",
    "FUSA_RNG15_RFL8_NIR8_DUAL",
];
const IMU_PROFILES: &[&str] = &["LEGACY"];
const MULTIPURPOSE_IO_MODES: &[&str] = &[
    "OFF",
    "INPUT_NMEA_UART",
    "OUTPUT_FROM_INTERNAL_OSC",
    "OUTPUT_FROM_SYNC_PULSE_IN",
    "OUTPUT_FROM_PTP_1588",
    "OUTPUT_FROM_ENCODER_ANGLE",
];
const POLARITIES: &[&str] = &["ACTIVE_HIGH", "ACTIVE_LOW"];
const SIGNAL_MULTIPLIERS: &[f64] = &[0.25, 0.5, 1.0, 2.0, 3.0];
const COLUMNS_PER_PACKET: &[u64] = &[1, 2, 4, 8, 16];

/// Full circle in millidegrees.
const MAX_MILLIDEGREES: u64 = 360_000;

/// Shape of the value a parameter accepts.
#[derive(Debug, Clone, Copy)]
pub enum ParamKind {
    Choice(&'static [&'static str]),
    Port,
    Address,
    Flag,
    Millidegrees,
    AzimuthWindow,
    Multiplier,
    ColumnsPerPacket,
}

/// A configuration parameter understood by the sensor.
#[derive(Debug, Clone, Copy)]
pub struct ConfigParam {
    pub name: &'static str,
    pub kind: ParamKind,
}

pub const CONFIG_PARAMS: &[ConfigParam] = &[
    ConfigParam { name: "lidar_mode", kind: ParamKind::Choice(LIDAR_MODES) },
    ConfigParam { name: "operating_mode", kind: ParamKind::Choice(OPERATING_MODES) },
    ConfigParam { name: "timestamp_mode", kind: ParamKind::Choice(TIMESTAMP_MODES) },
    ConfigParam { name: "udp_profile_lidar", kind: ParamKind::Choice(LIDAR_PROFILES) },
    ConfigParam { name: "udp_profile_imu", kind: ParamKind::Choice(IMU_PROFILES) },
    ConfigParam { name: "multipurpose_io_mode", kind: ParamKind::Choice(MULTIPURPOSE_IO_MODES) },
    ConfigParam { name: "sync_pulse_in_polarity", kind: ParamKind::Choice(POLARITIES) },
    ConfigParam { name: "sync_pulse_out_polarity", kind: ParamKind::Choice(POLARITIES) },
    ConfigParam { name: "nmea_in_polarity", kind: ParamKind::Choice(POLARITIES) },
    ConfigParam { name: "udp_dest", kind: ParamKind::Address },
    ConfigParam { name: "udp_port_lidar", kind: ParamKind::Port },
    ConfigParam { name: "udp_port_imu", kind: ParamKind::Port },
    ConfigParam { name: "azimuth_window", kind: ParamKind::AzimuthWindow },
    ConfigParam { name: "phase_lock_enable", kind: ParamKind::Flag },
    ConfigParam { name: "phase_lock_offset", kind: ParamKind::Millidegrees },
    ConfigParam { name: "signal_multiplier", kind: ParamKind::Multiplier },
    ConfigParam { name: "columns_per_packet", kind: ParamKind::ColumnsPerPacket },
];

/// Look up a recognized parameter by name.
pub fn lookup(key: &str) -> Option<&'static ConfigParam> {
    CONFIG_PARAMS.iter().find(|p| p.name == key)
}

pub fn recognized_keys() -> impl Iterator<Item = &'static str> {
    CONFIG_PARAMS.iter().map(|p| p.name)
}

/// Check a value against the recognized parameter `key`.
pub fn validate(key: &str, value: &Value) -> LidarResult<()> {
    let param = lookup(key)
        .ok_or_else(|| LidarError::InvalidConfig(format!("unrecognized config key '{key}'")))?;

    let ok = match param.kind {
        ParamKind::Choice(options) => value.as_str().is_some_and(|v| options.contains(&v)),
        ParamKind::Port => value.as_u64().is_some_and(|p| p <= u16::MAX as u64),
        ParamKind::Address => value.as_str().is_some_and(|a| !a.trim().is_empty()),
        ParamKind::Flag => value.is_boolean(),
        ParamKind::Millidegrees => value.as_u64().is_some_and(|d| d < MAX_MILLIDEGREES),
        ParamKind::AzimuthWindow => value.as_array().is_some_and(|w| {
            w.len() == 2 && w.iter().all(|d| d.as_u64().is_some_and(|d| d <= MAX_MILLIDEGREES))
        }),
        ParamKind::Multiplier => value
            .as_f64()
            .is_some_and(|m| SIGNAL_MULTIPLIERS.iter().any(|&s| (s - m).abs() < f64::EPSILON)),
        ParamKind::ColumnsPerPacket => value
            .as_u64()
            .is_some_and(|c| COLUMNS_PER_PACKET.contains(&c)),
    };

    if ok {
        Ok(())
    } else {
        Err(LidarError::InvalidConfig(format!(
            "invalid value {value} for '{key}': expected {}",
            describe(param.kind)
        )))
    }
}

fn describe(kind: ParamKind) -> String {
    match kind {
        ParamKind::Choice(options) => format!("one of {}", options.join(", ")),
        ParamKind::Port => "a UDP port number (0-65535)".to_string(),
        ParamKind::Address => "a non-empty host address".to_string(),
        ParamKind::Flag => "true or false".to_string(),
        ParamKind::Millidegrees => "millidegrees in [0, 360000)".to_string(),
        ParamKind::AzimuthWindow => "[start, end] in millidegrees".to_string(),
        ParamKind::Multiplier => "one of 0.25, 0.5, 1, 2, 3".to_string(),
        ParamKind::ColumnsPerPacket => "one of 1, 2, 4, 8, 16".to_string(),
    }
}

/// Split a config request into keys that may be sent to the sensor and keys
/// rejected locally.
///
/// Fails with `InvalidConfig` when nothing could be applied at all (an empty
/// request, or every key unrecognized or invalid), naming the first offender.
pub fn partition(config: &Map<String, Value>) -> LidarResult<(Vec<(String, Value)>, ConfigOutcome)> {
    if config.is_empty() {
        return Err(LidarError::InvalidConfig(
            "config must contain at least one key".to_string(),
        ));
    }

    let mut accepted = Vec::new();
    let mut outcome = ConfigOutcome::default();
    let mut first_error = None;

    for (key, value) in config {
        match validate(key, value) {
            Ok(()) => accepted.push((key.clone(), value.clone())),
            Err(e) => {
                outcome.reject(key.clone(), e.to_string());
                first_error.get_or_insert(e);
            }
        }
    }

    match (accepted.is_empty(), first_error) {
        (true, Some(e)) => Err(e),
        _ => Ok((accepted, outcome)),
    }
}
