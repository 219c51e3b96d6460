// src/io/servo/mod.rs
//
// AK-series servo mode protocol.
//
// Commands travel as extended frames with ID `motor_id | (command << 8)`.
// The drive answers with 8-byte telemetry frames on `0x2900 | motor_id`.

pub mod codec;
mod types;

pub use codec::{AkServoCodec, CommandCode, ServoCommand};
pub use types::{ConnectionState, FaultCode, MotorId, OriginMode, TelemetrySnapshot};
