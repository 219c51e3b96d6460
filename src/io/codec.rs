// src/io/codec.rs
//
// Frame codec trait.
//
// A codec is a set of pure functions between typed values and CAN frames:
// no I/O, no state. The servo protocol implements it in servo/codec.rs.

use crate::io::error::DecodeError;
use crate::io::servo::MotorId;
use crate::io::ServoFrame;

// ============================================================================
// Frame Codec Trait
// ============================================================================

/// Trait for device protocol codecs.
///
/// The associated types define the protocol's outbound command set and the
/// record decoded from inbound frames.
pub trait FrameCodec {
    /// Typed outbound command
    type Command;

    /// Typed record carried by inbound frames
    type Telemetry;

    /// Encode a command addressed to `motor`.
    ///
    /// Out-of-range values are clamped, never rejected, so encoding is infallible.
    fn encode(motor: MotorId, command: &Self::Command) -> ServoFrame;

    /// Decode an inbound payload.
    ///
    /// Returns `Err(DecodeError)` if the payload is malformed; the caller
    /// decides what to do with the error.
    fn decode(payload: &[u8]) -> Result<Self::Telemetry, DecodeError>;
}

pub use super::servo::codec::AkServoCodec;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::servo::{ServoCommand, TelemetrySnapshot};

    fn encode_via<C: FrameCodec>(motor: MotorId, command: &C::Command) -> ServoFrame {
        C::encode(motor, command)
    }

    #[test]
    fn test_servo_codec_through_trait() {
        let frame = encode_via::<AkServoCodec>(MotorId::new(1), &ServoCommand::Position(10.0));
        assert!(frame.is_extended);
        assert_eq!(frame.id, 0x0401);

        let decoded: Result<TelemetrySnapshot, _> = AkServoCodec::decode(&[0; 8]);
        assert_eq!(decoded, Ok(TelemetrySnapshot::default()));
    }
}
