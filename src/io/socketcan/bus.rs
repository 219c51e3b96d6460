// src/io/socketcan/bus.rs
//
// Raw CAN socket bound to one interface, with a kernel receive filter and a
// bounded receive timeout.
//
// This module is only compiled on Linux.

#[cfg(target_os = "linux")]
mod linux_impl {
    use socketcan::{
        CanAddr, CanDataFrame, CanFilter, CanFrame, CanSocket, EmbeddedFrame, ExtendedId, Frame,
        Id, Socket, SocketOptions, StandardId,
    };
    use std::io;
    use std::time::Duration;

    use crate::io::error::ConnectionError;
    use crate::io::{consts, BusConnector, BusFilter, ServoBus, ServoFrame};
    use crate::tlog;

    // ============================================================================
    // Error classification
    // ============================================================================

    // errno values that socket(2) reports; anything else from open is a bind failure
    const EAFNOSUPPORT: i32 = 97;
    const EPROTONOSUPPORT: i32 = 93;
    const EMFILE: i32 = 24;
    const ENFILE: i32 = 23;
    const EACCES: i32 = 13;
    const EPERM: i32 = 1;

    pub(super) fn classify_open_error(interface: &str, source: io::Error) -> ConnectionError {
        let interface = interface.to_string();
        match source.raw_os_error() {
            Some(EAFNOSUPPORT | EPROTONOSUPPORT | EMFILE | ENFILE | EACCES | EPERM) => {
                ConnectionError::SocketCreateFailed { interface, source }
            }
            _ => ConnectionError::BindFailed { interface, source },
        }
    }

    // ============================================================================
    // Connector
    // ============================================================================

    /// Opens raw CAN sockets by interface name.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SocketCanConnector;

    impl BusConnector for SocketCanConnector {
        type Bus = SocketCanBus;

        fn open(
            &self,
            interface: &str,
            filter: BusFilter,
            read_timeout: Duration,
        ) -> Result<SocketCanBus, ConnectionError> {
            let addr = CanAddr::from_iface(interface).map_err(|source| {
                ConnectionError::InterfaceNotFound {
                    interface: interface.to_string(),
                    source,
                }
            })?;

            let socket =
                CanSocket::open_addr(&addr).map_err(|e| classify_open_error(interface, e))?;

            socket
                .set_filters(&[CanFilter::new(filter.id, filter.mask)])
                .map_err(|source| ConnectionError::FilterFailed {
                    interface: interface.to_string(),
                    source,
                })?;

            socket
                .set_read_timeout(read_timeout)
                .map_err(|source| ConnectionError::SocketOptionFailed {
                    interface: interface.to_string(),
                    option: "read timeout",
                    source,
                })?;

            tlog!(
                "[socketcan] Opened {} (filter id=0x{:08X} mask=0x{:08X}, timeout {:?})",
                interface,
                filter.id,
                filter.mask,
                read_timeout
            );

            Ok(SocketCanBus {
                socket,
                interface: interface.to_string(),
            })
        }
    }

    // ============================================================================
    // Bus
    // ============================================================================

    /// Raw CAN socket. Closed when dropped.
    pub struct SocketCanBus {
        socket: CanSocket,
        interface: String,
    }

    impl SocketCanBus {
        pub fn interface(&self) -> &str {
            &self.interface
        }
    }

    /// Convert a received socketcan frame to our frame type; remote and
    /// error frames carry no telemetry and are skipped.
    fn convert_frame(frame: CanFrame) -> Option<ServoFrame> {
        match frame {
            CanFrame::Data(f) => ServoFrame::new(
                f.raw_id() & consts::CAN_EFF_MASK,
                f.is_extended(),
                f.data(),
            ),
            CanFrame::Remote(_) => None,
            CanFrame::Error(_) => None,
        }
    }

    impl ServoBus for SocketCanBus {
        fn write_frame(&self, frame: &ServoFrame) -> io::Result<()> {
            let id = if frame.is_extended {
                ExtendedId::new(frame.id).map(Id::Extended).ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("Invalid extended ID: 0x{:08X}", frame.id),
                    )
                })?
            } else {
                StandardId::new(frame.id as u16)
                    .map(Id::Standard)
                    .ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::InvalidInput,
                            format!("Invalid standard ID: 0x{:03X}", frame.id),
                        )
                    })?
            };

            let data = CanDataFrame::new(id, frame.payload()).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "Failed to create data frame")
            })?;

            self.socket.write_frame(&data)
        }

        fn read_frame(&self) -> io::Result<Option<ServoFrame>> {
            match self.socket.read_frame() {
                Ok(frame) => Ok(convert_frame(frame)),
                Err(ref e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        }
    }
}

// Re-export for Linux
#[cfg(target_os = "linux")]
pub use linux_impl::{SocketCanBus, SocketCanConnector};

// ============================================================================
// Non-Linux Stub
// ============================================================================

#[cfg(not(target_os = "linux"))]
mod stub {
    use std::io;
    use std::time::Duration;

    use crate::io::error::ConnectionError;
    use crate::io::{BusConnector, BusFilter, ServoBus, ServoFrame};

    /// SocketCAN connector (stub for non-Linux)
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SocketCanConnector;

    /// Uninhabited: no bus can be opened off Linux.
    pub enum UnsupportedBus {}

    impl ServoBus for UnsupportedBus {
        fn write_frame(&self, _frame: &ServoFrame) -> io::Result<()> {
            match *self {}
        }

        fn read_frame(&self) -> io::Result<Option<ServoFrame>> {
            match *self {}
        }
    }

    impl BusConnector for SocketCanConnector {
        type Bus = UnsupportedBus;

        fn open(
            &self,
            interface: &str,
            _filter: BusFilter,
            _read_timeout: Duration,
        ) -> Result<UnsupportedBus, ConnectionError> {
            Err(ConnectionError::SocketCreateFailed {
                interface: interface.to_string(),
                source: io::Error::new(
                    io::ErrorKind::Unsupported,
                    "SocketCAN is only available on Linux",
                ),
            })
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub use stub::SocketCanConnector;
