// src/io/servo/codec.rs
//
// AK servo-mode frame codec.
//
// Outbound payloads are big-endian integers built from scaled, clamped
// floats. Inbound telemetry is always 8 bytes:
//   pos(i16, 0.1 deg) | speed(i16, erpm) | current(i16, 0.01 A) | temp(i8) | fault(u8)

use crate::io::codec::FrameCodec;
use crate::io::error::DecodeError;
use crate::io::servo::types::{FaultCode, MotorId, OriginMode, TelemetrySnapshot};
use crate::io::{consts as can_consts, ServoFrame};

/// AK servo-mode protocol constants
pub mod consts {
    /// Motor pole pairs; commanded shaft speed is multiplied by this.
    pub const POLE_PAIRS: i32 = 21;
    /// Base of the telemetry arbitration ID (`0x2900 | motor_id`).
    pub const TELEMETRY_BASE_ID: u32 = 0x2900;
    /// Telemetry payload length
    pub const TELEMETRY_LEN: usize = 8;

    /// Current loop command range in amperes
    pub const CURRENT_MIN_A: f32 = -60.0;
    pub const CURRENT_MAX_A: f32 = 60.0;
    /// Brake current range in amperes
    pub const BRAKE_MIN_A: f32 = 0.0;
    pub const BRAKE_MAX_A: f32 = 60.0;
    /// Position command range in degrees
    pub const POSITION_MIN_DEG: f32 = -36_000.0;
    pub const POSITION_MAX_DEG: f32 = 36_000.0;
    /// Profiled-move acceleration range, deg/s^2
    pub const ACCEL_MIN: i16 = 0;
    pub const ACCEL_MAX: i16 = 200;

    pub const DUTY_SCALE: f64 = 100_000.0;
    pub const CURRENT_SCALE: f64 = 100.0;
    pub const BRAKE_SCALE: f64 = 1_000.0;
    pub const PVA_POSITION_SCALE: f64 = 10_000.0;

    pub const TELEMETRY_POSITION_SCALE: f32 = 0.1;
    pub const TELEMETRY_CURRENT_SCALE: f32 = 0.01;
}

// ============================================================================
// Commands
// ============================================================================

/// Command code carried in bits 8..16 of the arbitration ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandCode {
    Duty = 0,
    Current = 1,
    CurrentBrake = 2,
    Velocity = 3,
    Position = 4,
    SetOrigin = 5,
    PositionVelocityAcceleration = 6,
}

impl CommandCode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(CommandCode::Duty),
            1 => Some(CommandCode::Current),
            2 => Some(CommandCode::CurrentBrake),
            3 => Some(CommandCode::Velocity),
            4 => Some(CommandCode::Position),
            5 => Some(CommandCode::SetOrigin),
            6 => Some(CommandCode::PositionVelocityAcceleration),
            _ => None,
        }
    }
}

/// A servo-mode command, in physical units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ServoCommand {
    /// Duty cycle, fraction of full scale.
    Duty(f32),
    /// Current loop target, amperes.
    Current(f32),
    /// Hold position resisting with up to this current, amperes.
    CurrentBrake(f32),
    /// Shaft speed, degrees per second.
    Velocity(f32),
    /// Absolute position, degrees.
    Position(f32),
    /// Profiled move: position in degrees, speed and acceleration in device units.
    PositionVelocityAcceleration {
        position: f32,
        velocity: i16,
        acceleration: i16,
    },
    SetOrigin(OriginMode),
}

impl ServoCommand {
    pub fn code(&self) -> CommandCode {
        match self {
            ServoCommand::Duty(_) => CommandCode::Duty,
            ServoCommand::Current(_) => CommandCode::Current,
            ServoCommand::CurrentBrake(_) => CommandCode::CurrentBrake,
            ServoCommand::Velocity(_) => CommandCode::Velocity,
            ServoCommand::Position(_) => CommandCode::Position,
            ServoCommand::PositionVelocityAcceleration { .. } => {
                CommandCode::PositionVelocityAcceleration
            }
            ServoCommand::SetOrigin(_) => CommandCode::SetOrigin,
        }
    }
}

// ============================================================================
// AK Servo Codec
// ============================================================================

/// AK servo-mode codec.
pub struct AkServoCodec;

/// `motor_id | (command << 8)`, always inside the 29-bit space.
pub fn command_id(motor: MotorId, code: CommandCode) -> u32 {
    u32::from(motor.get()) | (u32::from(code as u8) << 8)
}

/// Arbitration ID of telemetry frames sent by `motor`.
pub fn telemetry_id(motor: MotorId) -> u32 {
    consts::TELEMETRY_BASE_ID | u32::from(motor.get())
}

/// Multiply, round half away from zero, saturate into i32. NaN becomes 0.
fn scale_i32(value: f32, factor: f64) -> i32 {
    (f64::from(value) * factor).round() as i32
}

fn int32_frame(id: u32, value: i32) -> ServoFrame {
    let mut data = [0u8; can_consts::CLASSIC_MAX_LEN];
    data[0..4].copy_from_slice(&value.to_be_bytes());
    ServoFrame::extended(id, data, 4)
}

impl FrameCodec for AkServoCodec {
    type Command = ServoCommand;
    type Telemetry = TelemetrySnapshot;

    fn encode(motor: MotorId, command: &ServoCommand) -> ServoFrame {
        let id = command_id(motor, command.code());

        match *command {
            ServoCommand::Duty(duty) => int32_frame(id, scale_i32(duty, consts::DUTY_SCALE)),
            ServoCommand::Current(amps) => {
                let amps = amps.clamp(consts::CURRENT_MIN_A, consts::CURRENT_MAX_A);
                int32_frame(id, scale_i32(amps, consts::CURRENT_SCALE))
            }
            ServoCommand::CurrentBrake(amps) => {
                let amps = amps.clamp(consts::BRAKE_MIN_A, consts::BRAKE_MAX_A);
                int32_frame(id, scale_i32(amps, consts::BRAKE_SCALE))
            }
            ServoCommand::Velocity(deg_per_s) => {
                let erpm = (deg_per_s.round() as i32).saturating_mul(consts::POLE_PAIRS);
                int32_frame(id, erpm)
            }
            ServoCommand::Position(deg) => {
                // truncates toward zero
                let deg = deg.clamp(consts::POSITION_MIN_DEG, consts::POSITION_MAX_DEG);
                int32_frame(id, deg as i32)
            }
            ServoCommand::PositionVelocityAcceleration {
                position,
                velocity,
                acceleration,
            } => {
                let position = position.clamp(consts::POSITION_MIN_DEG, consts::POSITION_MAX_DEG);
                let acceleration = acceleration.clamp(consts::ACCEL_MIN, consts::ACCEL_MAX);

                let mut data = [0u8; can_consts::CLASSIC_MAX_LEN];
                let position = scale_i32(position, consts::PVA_POSITION_SCALE);
                data[0..4].copy_from_slice(&position.to_be_bytes());
                data[4..6].copy_from_slice(&velocity.to_be_bytes());
                data[6..8].copy_from_slice(&acceleration.to_be_bytes());
                ServoFrame::extended(id, data, 8)
            }
            ServoCommand::SetOrigin(mode) => {
                let mut data = [0u8; can_consts::CLASSIC_MAX_LEN];
                data[0] = mode.to_byte();
                ServoFrame::extended(id, data, 1)
            }
        }
    }

    /// Decode a telemetry payload.
    ///
    /// Any length other than 8 is rejected, as is a fault byte outside the
    /// known codes.
    fn decode(payload: &[u8]) -> Result<TelemetrySnapshot, DecodeError> {
        let bytes: &[u8; consts::TELEMETRY_LEN] = payload
            .try_into()
            .map_err(|_| DecodeError::WrongLength { len: payload.len() })?;

        let position = i16::from_be_bytes([bytes[0], bytes[1]]);
        let velocity = i16::from_be_bytes([bytes[2], bytes[3]]);
        let current = i16::from_be_bytes([bytes[4], bytes[5]]);

        Ok(TelemetrySnapshot {
            position: f32::from(position) * consts::TELEMETRY_POSITION_SCALE,
            velocity: f32::from(velocity),
            current: f32::from(current) * consts::TELEMETRY_CURRENT_SCALE,
            temperature: bytes[6] as i8,
            fault: FaultCode::try_from(bytes[7])?,
        })
    }
}

impl AkServoCodec {
    /// Build the telemetry frame a drive would send for `snapshot`.
    ///
    /// Values are quantised to the wire resolution and saturate at the i16
    /// limits (about +/-3276.7 deg, +/-327.67 A).
    pub fn encode_telemetry(motor: MotorId, snapshot: &TelemetrySnapshot) -> ServoFrame {
        let position = (snapshot.position / consts::TELEMETRY_POSITION_SCALE).round() as i16;
        let velocity = snapshot.velocity.round() as i16;
        let current = (snapshot.current / consts::TELEMETRY_CURRENT_SCALE).round() as i16;

        let mut data = [0u8; can_consts::CLASSIC_MAX_LEN];
        data[0..2].copy_from_slice(&position.to_be_bytes());
        data[2..4].copy_from_slice(&velocity.to_be_bytes());
        data[4..6].copy_from_slice(&current.to_be_bytes());
        data[6] = snapshot.temperature as u8;
        data[7] = snapshot.fault.to_byte();
        ServoFrame::extended(telemetry_id(motor), data, consts::TELEMETRY_LEN)
    }

    /// Parse a command frame back into the motor it addresses and the
    /// command, in the units the encoder consumed (after clamping and
    /// quantisation). `None` for standard frames, unknown command codes and
    /// short payloads.
    pub fn decode_command(frame: &ServoFrame) -> Option<(MotorId, ServoCommand)> {
        if !frame.is_extended || frame.id > 0xFFFF {
            return None;
        }
        let motor = MotorId::new((frame.id & 0xFF) as u8);
        let code = CommandCode::from_byte(((frame.id >> 8) & 0xFF) as u8)?;
        let payload = frame.payload();

        let int32 = || -> Option<i32> {
            let bytes: [u8; 4] = payload.get(0..4)?.try_into().ok()?;
            Some(i32::from_be_bytes(bytes))
        };

        let command = match code {
            CommandCode::Duty => {
                ServoCommand::Duty((f64::from(int32()?) / consts::DUTY_SCALE) as f32)
            }
            CommandCode::Current => {
                ServoCommand::Current((f64::from(int32()?) / consts::CURRENT_SCALE) as f32)
            }
            CommandCode::CurrentBrake => {
                ServoCommand::CurrentBrake((f64::from(int32()?) / consts::BRAKE_SCALE) as f32)
            }
            CommandCode::Velocity => {
                ServoCommand::Velocity((int32()? / consts::POLE_PAIRS) as f32)
            }
            CommandCode::Position => ServoCommand::Position(int32()? as f32),
            CommandCode::PositionVelocityAcceleration => {
                if payload.len() < 8 {
                    return None;
                }
                ServoCommand::PositionVelocityAcceleration {
                    position: (f64::from(int32()?) / consts::PVA_POSITION_SCALE) as f32,
                    velocity: i16::from_be_bytes([payload[4], payload[5]]),
                    acceleration: i16::from_be_bytes([payload[6], payload[7]]),
                }
            }
            CommandCode::SetOrigin => {
                ServoCommand::SetOrigin(OriginMode::from_byte(*payload.first()?)?)
            }
        };

        Some((motor, command))
    }
}

// ============================================================================
// Tests
// ============================================================================
