// src/io/servo/types.rs
//
// Data model shared by the codec, the link and its callers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::io::error::DecodeError;

// ============================================================================
// Motor Identity
// ============================================================================

/// 8-bit device address of one servo on the bus. Fixed for the lifetime of
/// whatever holds it; pointing at another motor means building a new link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MotorId(u8);

impl MotorId {
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl From<u8> for MotorId {
    fn from(id: u8) -> Self {
        Self(id)
    }
}

impl fmt::Display for MotorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

// ============================================================================
// Fault Codes
// ============================================================================

/// Fault reported in byte 7 of every telemetry frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultCode {
    #[default]
    None,
    Overtemperature,
    Overcurrent,
    Overvoltage,
    Undervoltage,
    Encoder,
    Hardware,
}

impl FaultCode {
    pub const fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            FaultCode::None => "NONE",
            FaultCode::Overtemperature => "OVERTEMPERATURE",
            FaultCode::Overcurrent => "OVERCURRENT",
            FaultCode::Overvoltage => "OVERVOLTAGE",
            FaultCode::Undervoltage => "UNDERVOLTAGE",
            FaultCode::Encoder => "ENCODER",
            FaultCode::Hardware => "HARDWARE",
        }
    }
}

impl TryFrom<u8> for FaultCode {
    type Error = DecodeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(FaultCode::None),
            1 => Ok(FaultCode::Overtemperature),
            2 => Ok(FaultCode::Overcurrent),
            3 => Ok(FaultCode::Overvoltage),
            4 => Ok(FaultCode::Undervoltage),
            5 => Ok(FaultCode::Encoder),
            6 => Ok(FaultCode::Hardware),
            _ => Err(DecodeError::UnknownFaultCode { code }),
        }
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Origin Mode
// ============================================================================

/// How a set-origin command treats the current shaft position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginMode {
    /// Zero until the next power cycle.
    Temporary,
    /// Zero stored in the drive's flash.
    Permanent,
    /// Return to the stored zero.
    Restore,
}

impl OriginMode {
    pub const fn to_byte(self) -> u8 {
        match self {
            OriginMode::Temporary => 0,
            OriginMode::Permanent => 1,
            OriginMode::Restore => 2,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(OriginMode::Temporary),
            1 => Some(OriginMode::Permanent),
            2 => Some(OriginMode::Restore),
            _ => None,
        }
    }
}

impl std::str::FromStr for OriginMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "temporary" | "temp" => Ok(OriginMode::Temporary),
            "permanent" | "perm" => Ok(OriginMode::Permanent),
            "restore" => Ok(OriginMode::Restore),
            other => Err(format!(
                "unknown origin mode '{}' (expected temporary, permanent or restore)",
                other
            )),
        }
    }
}

// ============================================================================
// Telemetry
// ============================================================================

/// Last known state of the servo, as carried by one telemetry frame.
/// Always replaced as a whole.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Shaft position in degrees (0.1 deg resolution).
    pub position: f32,
    /// Raw speed field, electrical rpm.
    pub velocity: f32,
    /// Phase current in amperes (0.01 A resolution).
    pub current: f32,
    /// Driver temperature in degrees Celsius.
    pub temperature: i8,
    pub fault: FaultCode,
}

// ============================================================================
// Connection State
// ============================================================================

/// Lifecycle of a `MotorLink`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Last `connect()` failed; holds the rendered error.
    Failed(String),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("disconnected"),
            ConnectionState::Connecting => f.write_str("connecting"),
            ConnectionState::Connected => f.write_str("connected"),
            ConnectionState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_code_byte_mapping() {
        for byte in 0u8..=6 {
            let fault = FaultCode::try_from(byte).expect("known fault");
            assert_eq!(fault.to_byte(), byte);
        }
        assert_eq!(
            FaultCode::try_from(7),
            Err(DecodeError::UnknownFaultCode { code: 7 })
        );
        assert_eq!(FaultCode::Encoder.to_string(), "ENCODER");
    }

    #[test]
    fn test_origin_mode_parsing() {
        assert_eq!("Permanent".parse::<OriginMode>(), Ok(OriginMode::Permanent));
        assert_eq!("temp".parse::<OriginMode>(), Ok(OriginMode::Temporary));
        assert!("zero".parse::<OriginMode>().is_err());
        assert_eq!(OriginMode::from_byte(2), Some(OriginMode::Restore));
        assert_eq!(OriginMode::from_byte(3), None);
    }

    #[test]
    fn test_default_snapshot_is_zeroed() {
        let snap = TelemetrySnapshot::default();
        assert_eq!(snap.position, 0.0);
        assert_eq!(snap.velocity, 0.0);
        assert_eq!(snap.current, 0.0);
        assert_eq!(snap.temperature, 0);
        assert_eq!(snap.fault, FaultCode::None);
    }

    #[test]
    fn test_motor_id_display_is_hex() {
        assert_eq!(MotorId::new(0x1F).to_string(), "0x1F");
        assert_eq!(MotorId::from(3).get(), 3);
    }
}
