// src/io/mock.rs
//
// In-memory bus for exercising the link without CAN hardware.
//
// Available in test builds and with the `mock` feature. Inbound frames are
// pushed through an mpsc channel; `recv_timeout` gives the same bounded wait
// the kernel socket gives. The acceptance filter passed to `open` is applied
// on the way in, so filtering behaves like the kernel's.

use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::io::error::ConnectionError;
use crate::io::{BusConnector, BusFilter, ServoBus, ServoFrame};

/// Result `MockConnector::open` should produce on its next call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenFailure {
    InterfaceNotFound,
    BindFailed,
}

#[derive(Default)]
struct Shared {
    written: Vec<ServoFrame>,
    fail_writes: bool,
    open_failures: VecDeque<OpenFailure>,
    open_count: usize,
    last_filter: Option<BusFilter>,
}

/// Test-side handle: injects inbound frames and inspects outbound ones.
#[derive(Clone)]
pub struct MockController {
    inbound: Sender<ServoFrame>,
    shared: Arc<Mutex<Shared>>,
}

impl MockController {
    /// Queue a frame as if it arrived from the bus.
    pub fn inject(&self, frame: ServoFrame) {
        let _ = self.inbound.send(frame);
    }

    /// Frames written by the link so far.
    pub fn written(&self) -> Vec<ServoFrame> {
        self.lock().written.clone()
    }

    /// Make subsequent writes fail with `ENOBUFS`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Make the next `open` calls fail, in order.
    pub fn fail_next_opens(&self, failures: &[OpenFailure]) {
        self.lock().open_failures.extend(failures.iter().copied());
    }

    pub fn open_count(&self) -> usize {
        self.lock().open_count
    }

    pub fn last_filter(&self) -> Option<BusFilter> {
        self.lock().last_filter
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Connector handing out `MockBus` instances fed by one `MockController`.
pub struct MockConnector {
    inbound: Arc<Mutex<Receiver<ServoFrame>>>,
    shared: Arc<Mutex<Shared>>,
}

impl MockConnector {
    pub fn new() -> (Self, MockController) {
        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(Mutex::new(Shared::default()));
        (
            Self {
                inbound: Arc::new(Mutex::new(rx)),
                shared: shared.clone(),
            },
            MockController {
                inbound: tx,
                shared,
            },
        )
    }
}

impl BusConnector for MockConnector {
    type Bus = MockBus;

    fn open(
        &self,
        interface: &str,
        filter: BusFilter,
        read_timeout: Duration,
    ) -> Result<MockBus, ConnectionError> {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        shared.open_count += 1;

        if let Some(failure) = shared.open_failures.pop_front() {
            let interface = interface.to_string();
            return Err(match failure {
                OpenFailure::InterfaceNotFound => ConnectionError::InterfaceNotFound {
                    interface,
                    source: io::Error::from_raw_os_error(19), // ENODEV
                },
                OpenFailure::BindFailed => ConnectionError::BindFailed {
                    interface,
                    source: io::Error::from_raw_os_error(100), // ENETDOWN
                },
            });
        }

        shared.last_filter = Some(filter);
        Ok(MockBus {
            inbound: self.inbound.clone(),
            shared: self.shared.clone(),
            filter,
            read_timeout,
        })
    }
}

/// Bus backed by the controller's channel.
pub struct MockBus {
    inbound: Arc<Mutex<Receiver<ServoFrame>>>,
    shared: Arc<Mutex<Shared>>,
    filter: BusFilter,
    read_timeout: Duration,
}

impl ServoBus for MockBus {
    fn write_frame(&self, frame: &ServoFrame) -> io::Result<()> {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        if shared.fail_writes {
            return Err(io::Error::from_raw_os_error(105)); // ENOBUFS
        }
        shared.written.push(*frame);
        Ok(())
    }

    fn read_frame(&self) -> io::Result<Option<ServoFrame>> {
        let rx = self.inbound.lock().unwrap_or_else(PoisonError::into_inner);
        match rx.recv_timeout(self.read_timeout) {
            Ok(frame) if self.filter.matches(&frame) => Ok(Some(frame)),
            Ok(_) => Ok(None),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                // Controller gone: behave like an idle bus
                drop(rx);
                std::thread::sleep(self.read_timeout);
                Ok(None)
            }
        }
    }
}
