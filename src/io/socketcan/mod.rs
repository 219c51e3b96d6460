// src/io/socketcan/mod.rs
//
// SocketCAN transport for Linux native CAN interfaces.
// Used with CANable / candleLight adapters, native CAN hardware, or vcan.
//
// Requires the interface to be configured first:
//   sudo ip link set can0 up type can bitrate 1000000
//
// This module is only fully functional on Linux.

mod bus;

#[cfg(target_os = "linux")]
pub use bus::{SocketCanBus, SocketCanConnector};

#[cfg(not(target_os = "linux"))]
pub use bus::SocketCanConnector;
