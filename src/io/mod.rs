// src/io/mod.rs
//
// Bus abstraction for talking to AK-series servos.
// Provides frame types, the transport traits the link is written against,
// and the protocol codec. The only real transport is SocketCAN (Linux);
// tests run against the in-memory bus in `mock`.

// Core modules
pub mod codec; // Frame codec trait
mod error;
pub mod servo; // AK servo-mode protocol

// Transports
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod socketcan;

pub use codec::FrameCodec;
pub use error::{ConnectionError, DecodeError, SendError};
pub use servo::{
    AkServoCodec, ConnectionState, FaultCode, MotorId, OriginMode, ServoCommand,
    TelemetrySnapshot,
};
pub use socketcan::SocketCanConnector;

use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// ============================================================================
// CAN constants
// ============================================================================

/// Linux `can_id` flag bits and masks, shared by the kernel filter and the mock bus.
pub mod consts {
    /// Extended ID flag in can_id
    pub const CAN_EFF_FLAG: u32 = 0x8000_0000;
    /// Mask for 29-bit extended ID
    pub const CAN_EFF_MASK: u32 = 0x1FFF_FFFF;
    /// Classic CAN payload limit
    pub const CLASSIC_MAX_LEN: usize = 8;
}

/// Get current time in microseconds since UNIX epoch
pub fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

// ============================================================================
// Frames
// ============================================================================

/// A classic CAN data frame, inbound or outbound.
///
/// The payload lives inline so building and decoding frames never allocates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServoFrame {
    /// Arbitration ID without flag bits (11 or 29 bits)
    pub id: u32,
    /// Extended (29-bit) frame ID
    pub is_extended: bool,
    len: u8,
    data: [u8; consts::CLASSIC_MAX_LEN],
}

impl ServoFrame {
    /// Build a frame; `None` if the payload exceeds 8 bytes or the ID does
    /// not fit the selected address space.
    pub fn new(id: u32, is_extended: bool, payload: &[u8]) -> Option<Self> {
        let id_limit = if is_extended { consts::CAN_EFF_MASK } else { 0x7FF };
        if payload.len() > consts::CLASSIC_MAX_LEN || id > id_limit {
            return None;
        }
        let mut data = [0u8; consts::CLASSIC_MAX_LEN];
        data[..payload.len()].copy_from_slice(payload);
        Some(Self {
            id,
            is_extended,
            len: payload.len() as u8,
            data,
        })
    }

    /// Extended-ID frame from a full 8-byte buffer and a length.
    /// Every servo frame goes through here, so `len` is always <= 8.
    pub(crate) fn extended(id: u32, data: [u8; consts::CLASSIC_MAX_LEN], len: usize) -> Self {
        Self {
            id: id & consts::CAN_EFF_MASK,
            is_extended: true,
            len: len.min(consts::CLASSIC_MAX_LEN) as u8,
            data,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// ID with the kernel's EFF flag applied, as matched by receive filters.
    pub fn raw_can_id(&self) -> u32 {
        if self.is_extended {
            self.id | consts::CAN_EFF_FLAG
        } else {
            self.id
        }
    }
}

// ============================================================================
// Receive filter
// ============================================================================

/// Kernel-style acceptance filter: a frame passes when
/// `raw_can_id & mask == id & mask`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusFilter {
    pub id: u32,
    pub mask: u32,
}

impl BusFilter {
    /// Pass exactly one extended ID.
    pub fn exact_extended(id: u32) -> Self {
        Self {
            id: (id & consts::CAN_EFF_MASK) | consts::CAN_EFF_FLAG,
            mask: consts::CAN_EFF_MASK | consts::CAN_EFF_FLAG,
        }
    }

    /// Pass every extended frame whose low byte is `motor`, i.e. all
    /// commands addressed to that servo.
    pub fn addressed_to(motor: MotorId) -> Self {
        Self {
            id: u32::from(motor.get()) | consts::CAN_EFF_FLAG,
            mask: 0xFF | consts::CAN_EFF_FLAG,
        }
    }

    pub fn matches(&self, frame: &ServoFrame) -> bool {
        frame.raw_can_id() & self.mask == self.id & self.mask
    }
}

// ============================================================================
// Transport traits
// ============================================================================

/// An open, bound, filtered CAN endpoint.
///
/// One thread writes and one thread reads concurrently; the two never need
/// mutual exclusion between them.
pub trait ServoBus: Send + Sync + 'static {
    /// One synchronous write. No queuing, no retry.
    fn write_frame(&self, frame: &ServoFrame) -> io::Result<()>;

    /// Receive with a bounded wait. `Ok(None)` when the wait elapsed with
    /// nothing to read.
    fn read_frame(&self) -> io::Result<Option<ServoFrame>>;
}

/// Opens buses by interface name.
pub trait BusConnector {
    type Bus: ServoBus;

    /// Open `interface`, install `filter`, and bound every receive to
    /// `read_timeout`.
    fn open(
        &self,
        interface: &str,
        filter: BusFilter,
        read_timeout: Duration,
    ) -> Result<Self::Bus, ConnectionError>;
}
