pub mod io;
pub mod link;
pub mod logging;
pub mod settings;
pub mod simulator;

#[cfg(feature = "cli")]
pub mod cli;

pub use io::{
    AkServoCodec, ConnectionError, ConnectionState, DecodeError, FaultCode, FrameCodec, MotorId,
    OriginMode, SendError, ServoCommand, TelemetrySnapshot,
};
pub use link::{MotorLink, ReaderStats, TelemetryHandle};
