// src/link.rs
//
// Connection to one AK servo.
//
// Owns the bus, runs the background telemetry reader, and exposes command
// sends and the last known telemetry snapshot. The reader uses a bounded
// receive and a stop flag, so `disconnect()` can join it before the socket
// is released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::io::servo::codec::telemetry_id;
use crate::io::{
    now_us, AkServoCodec, BusConnector, BusFilter, ConnectionError, ConnectionState, DecodeError,
    FrameCodec, MotorId, OriginMode, SendError, ServoBus, ServoCommand, SocketCanConnector,
    TelemetrySnapshot,
};
use crate::tlog;

/// Default and maximum wait of one reader receive.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Log the 1st, then every Nth, of a repeating reader error.
const LOG_EVERY: u64 = 100;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // guarded values are plain data, always whole
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn should_log(count: u64) -> bool {
    count == 1 || count % LOG_EVERY == 0
}

// ============================================================================
// Reader statistics
// ============================================================================

/// Counters kept by the reader loop. Decode failures land here (and in the
/// log) instead of touching the snapshot. Cleared by each successful
/// `connect()`; still readable after `disconnect()`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReaderStats {
    /// Telemetry frames decoded and published
    pub frames_applied: u64,
    /// Frames rejected by the decoder
    pub decode_errors: u64,
    /// Frames with an unexpected arbitration ID
    pub foreign_frames: u64,
    /// Receive errors other than timeouts
    pub read_errors: u64,
    pub last_error: Option<DecodeError>,
    /// Host time (us since epoch) of the last published snapshot
    pub last_update_us: Option<u64>,
}

// ============================================================================
// Telemetry handle
// ============================================================================

/// Read-only view of a link's telemetry, for polling from another thread.
#[derive(Clone)]
pub struct TelemetryHandle {
    telemetry: Arc<Mutex<TelemetrySnapshot>>,
}

impl TelemetryHandle {
    /// Copy out the current snapshot. Never waits on I/O.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        *lock(&self.telemetry)
    }
}

// ============================================================================
// Motor link
// ============================================================================

struct Session<B> {
    bus: Arc<B>,
    interface: String,
    stop_flag: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

/// Link to a single servo over one CAN interface.
///
/// `Connected` holds exactly when a bus is open and its reader thread is
/// running. Dropping the link disconnects it.
pub struct MotorLink<C: BusConnector = SocketCanConnector> {
    motor: MotorId,
    connector: C,
    read_timeout: Duration,
    state: ConnectionState,
    session: Option<Session<C::Bus>>,
    telemetry: Arc<Mutex<TelemetrySnapshot>>,
    stats: Arc<Mutex<ReaderStats>>,
}

impl MotorLink<SocketCanConnector> {
    /// Link over SocketCAN.
    pub fn new(motor: MotorId) -> Self {
        Self::with_connector(motor, SocketCanConnector)
    }
}

impl<C: BusConnector> MotorLink<C> {
    pub fn with_connector(motor: MotorId, connector: C) -> Self {
        Self {
            motor,
            connector,
            read_timeout: DEFAULT_READ_TIMEOUT,
            state: ConnectionState::Disconnected,
            session: None,
            telemetry: Arc::new(Mutex::new(TelemetrySnapshot::default())),
            stats: Arc::new(Mutex::new(ReaderStats::default())),
        }
    }

    /// Set the reader's receive wait, clamped to 1..=50 ms. Applies from the
    /// next `connect()`.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout.clamp(MIN_READ_TIMEOUT, DEFAULT_READ_TIMEOUT);
        self
    }

    pub fn motor_id(&self) -> MotorId {
        self.motor
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Interface of the live session, if any.
    pub fn interface(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.interface.as_str())
    }

    /// Open `interface`, filter it down to this motor's telemetry, and start
    /// the reader. Tried once; retry policy belongs to the caller.
    pub fn connect(&mut self, interface: &str) -> Result<(), ConnectionError> {
        if self.session.is_some() {
            return Err(ConnectionError::AlreadyConnected);
        }

        self.state = ConnectionState::Connecting;
        let filter = BusFilter::exact_extended(telemetry_id(self.motor));

        let bus = match self.connector.open(interface, filter, self.read_timeout) {
            Ok(bus) => Arc::new(bus),
            Err(e) => return Err(self.fail(e)),
        };

        // counters describe the current session only
        *lock(&self.stats) = ReaderStats::default();

        let stop_flag = Arc::new(AtomicBool::new(false));
        let reader = ReaderLoop {
            bus: bus.clone(),
            motor: self.motor,
            stop_flag: stop_flag.clone(),
            telemetry: self.telemetry.clone(),
            stats: self.stats.clone(),
            backoff: self.read_timeout,
        };

        let handle = match thread::Builder::new()
            .name(format!("akservo-reader-{}", self.motor.get()))
            .spawn(move || reader.run())
        {
            Ok(handle) => handle,
            Err(e) => return Err(self.fail(ConnectionError::ReaderSpawnFailed(e))),
        };

        self.session = Some(Session {
            bus,
            interface: interface.to_string(),
            stop_flag,
            reader: Some(handle),
        });
        self.state = ConnectionState::Connected;

        tlog!("[link] Motor {} connected on {}", self.motor, interface);
        Ok(())
    }

    fn fail(&mut self, error: ConnectionError) -> ConnectionError {
        tlog!("[link] Motor {} connect failed: {}", self.motor, error);
        self.state = ConnectionState::Failed(error.to_string());
        error
    }

    /// Stop the reader, wait for it to exit, then release the bus.
    /// Calling it again, or on a link that never connected, does nothing.
    pub fn disconnect(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        session.stop_flag.store(true, Ordering::Release);
        if let Some(handle) = session.reader.take() {
            if let Err(panic) = handle.join() {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tlog!("[link] Motor {} reader thread panicked: {}", self.motor, msg);
            }
        }

        // reader has exited; ours is the last reference, so this closes the socket
        drop(session);
        self.state = ConnectionState::Disconnected;
        tlog!("[link] Motor {} disconnected", self.motor);
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Encode and write one command. At most one write per call, no retry.
    pub fn send(&self, command: ServoCommand) -> Result<(), SendError> {
        let session = self.session.as_ref().ok_or(SendError::NotConnected)?;
        let frame = AkServoCodec::encode(self.motor, &command);
        session
            .bus
            .write_frame(&frame)
            .map_err(SendError::WriteFailed)
    }

    pub fn send_duty_cycle(&self, duty: f32) -> Result<(), SendError> {
        self.send(ServoCommand::Duty(duty))
    }

    /// Current loop, clamped to +/-60 A.
    pub fn send_current(&self, amps: f32) -> Result<(), SendError> {
        self.send(ServoCommand::Current(amps))
    }

    /// Brake holding up to `amps` (0..=60 A).
    pub fn send_current_brake(&self, amps: f32) -> Result<(), SendError> {
        self.send(ServoCommand::CurrentBrake(amps))
    }

    pub fn send_velocity(&self, deg_per_s: f32) -> Result<(), SendError> {
        self.send(ServoCommand::Velocity(deg_per_s))
    }

    /// Absolute position, clamped to +/-36000 deg.
    pub fn send_position(&self, deg: f32) -> Result<(), SendError> {
        self.send(ServoCommand::Position(deg))
    }

    pub fn send_position_velocity_acceleration(
        &self,
        deg: f32,
        velocity: i16,
        acceleration: i16,
    ) -> Result<(), SendError> {
        self.send(ServoCommand::PositionVelocityAcceleration {
            position: deg,
            velocity,
            acceleration,
        })
    }

    pub fn set_origin(&self, mode: OriginMode) -> Result<(), SendError> {
        self.send(ServoCommand::SetOrigin(mode))
    }

    // ------------------------------------------------------------------------
    // Telemetry
    // ------------------------------------------------------------------------

    /// Last decoded telemetry, or zeroes if nothing has arrived yet.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        *lock(&self.telemetry)
    }

    pub fn telemetry_handle(&self) -> TelemetryHandle {
        TelemetryHandle {
            telemetry: self.telemetry.clone(),
        }
    }

    pub fn stats(&self) -> ReaderStats {
        lock(&self.stats).clone()
    }
}

impl<C: BusConnector> Drop for MotorLink<C> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ============================================================================
// Reader loop
// ============================================================================

struct ReaderLoop<B> {
    bus: Arc<B>,
    motor: MotorId,
    stop_flag: Arc<AtomicBool>,
    telemetry: Arc<Mutex<TelemetrySnapshot>>,
    stats: Arc<Mutex<ReaderStats>>,
    /// Pause after a failed receive so a dead interface doesn't spin
    backoff: Duration,
}

impl<B: ServoBus> ReaderLoop<B> {
    fn run(self) {
        let expected_id = telemetry_id(self.motor);

        while !self.stop_flag.load(Ordering::Acquire) {
            match self.bus.read_frame() {
                Ok(Some(frame)) => {
                    if !frame.is_extended || frame.id != expected_id {
                        lock(&self.stats).foreign_frames += 1;
                        continue;
                    }
                    self.apply(frame.payload());
                }
                Ok(None) => {
                    // Timeout - check the stop flag
                }
                Err(e) => {
                    let count = {
                        let mut stats = lock(&self.stats);
                        stats.read_errors += 1;
                        stats.read_errors
                    };
                    if should_log(count) {
                        tlog!(
                            "[link] Motor {} read error: {} ({} so far)",
                            self.motor,
                            e,
                            count
                        );
                    }
                    thread::sleep(self.backoff);
                }
            }
        }
    }

    fn apply(&self, payload: &[u8]) {
        match AkServoCodec::decode(payload) {
            Ok(snapshot) => {
                *lock(&self.telemetry) = snapshot;

                let mut stats = lock(&self.stats);
                stats.frames_applied += 1;
                stats.last_update_us = Some(now_us());
            }
            Err(err) => {
                let count = {
                    let mut stats = lock(&self.stats);
                    stats.decode_errors += 1;
                    stats.last_error = Some(err);
                    stats.decode_errors
                };
                if should_log(count) {
                    tlog!(
                        "[link] Motor {} dropped telemetry frame: {} (payload {}, {} so far)",
                        self.motor,
                        err,
                        hex::encode(payload),
                        count
                    );
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::mock::{MockConnector, MockController, OpenFailure};
    use crate::io::{FaultCode, ServoFrame};
    use std::sync::Barrier;
    use std::time::Instant;

    const MOTOR: MotorId = MotorId::new(0x05);

    fn mock_link() -> (MotorLink<MockConnector>, MockController) {
        let (connector, controller) = MockConnector::new();
        (MotorLink::with_connector(MOTOR, connector), controller)
    }

    fn telemetry_frame(snapshot: &TelemetrySnapshot) -> ServoFrame {
        AkServoCodec::encode_telemetry(MOTOR, snapshot)
    }

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done() {
            assert!(Instant::now() < deadline, "timed out waiting for reader");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_new_link_is_disconnected_with_zero_snapshot() {
        let (link, _ctl) = mock_link();
        assert_eq!(link.state(), &ConnectionState::Disconnected);
        assert_eq!(link.snapshot(), TelemetrySnapshot::default());
        assert_eq!(link.motor_id(), MOTOR);
        assert!(link.interface().is_none());
    }

    #[test]
    fn test_send_requires_connection() {
        let (link, ctl) = mock_link();
        assert!(matches!(link.send_position(10.0), Err(SendError::NotConnected)));
        assert!(matches!(
            link.set_origin(OriginMode::Temporary),
            Err(SendError::NotConnected)
        ));
        assert!(ctl.written().is_empty());
    }

    #[test]
    fn test_connect_installs_telemetry_filter() {
        let (mut link, ctl) = mock_link();
        link.connect("vcan0").expect("connect");

        assert_eq!(link.state(), &ConnectionState::Connected);
        assert_eq!(link.interface(), Some("vcan0"));
        assert_eq!(ctl.last_filter(), Some(BusFilter::exact_extended(0x2905)));
    }

    #[test]
    fn test_commands_are_written_encoded() {
        let (mut link, ctl) = mock_link();
        link.connect("vcan0").unwrap();

        link.send_position(36000.1).unwrap();
        link.send_current(-100.0).unwrap();
        link.send_position_velocity_acceleration(90.0, 500, 300).unwrap();
        link.set_origin(OriginMode::Permanent).unwrap();

        let written = ctl.written();
        assert_eq!(written.len(), 4);
        assert_eq!(written[0], AkServoCodec::encode(MOTOR, &ServoCommand::Position(36000.0)));
        assert_eq!(written[1], AkServoCodec::encode(MOTOR, &ServoCommand::Current(-60.0)));
        assert_eq!(written[2].id, 0x0605);
        assert_eq!(
            written[2].payload(),
            &[0x00, 0x0D, 0xBB, 0xA0, 0x01, 0xF4, 0x00, 0xC8]
        );
        assert_eq!(written[3].payload(), &[1]);
    }

    #[test]
    fn test_write_failure_is_reported_not_retried() {
        let (mut link, ctl) = mock_link();
        link.connect("vcan0").unwrap();
        ctl.set_fail_writes(true);

        let err = link.send_velocity(10.0).unwrap_err();
        assert!(matches!(err, SendError::WriteFailed(_)));
        assert!(err.is_transient());
        assert!(ctl.written().is_empty());
        assert!(link.is_connected());

        ctl.set_fail_writes(false);
        link.send_velocity(10.0).unwrap();
        assert_eq!(ctl.written().len(), 1);
    }

    #[test]
    fn test_failed_connect_then_retry() {
        let (mut link, ctl) = mock_link();
        ctl.fail_next_opens(&[OpenFailure::InterfaceNotFound, OpenFailure::BindFailed]);

        let err = link.connect("can9").unwrap_err();
        assert!(matches!(err, ConnectionError::InterfaceNotFound { .. }));
        assert!(matches!(link.state(), ConnectionState::Failed(reason) if reason.contains("can9")));
        assert!(matches!(link.send_duty_cycle(0.1), Err(SendError::NotConnected)));

        let err = link.connect("can9").unwrap_err();
        assert!(matches!(err, ConnectionError::BindFailed { .. }));

        link.connect("can9").expect("third attempt succeeds");
        assert!(link.is_connected());
        assert_eq!(ctl.open_count(), 3);
    }

    #[test]
    fn test_connect_twice_is_rejected() {
        let (mut link, ctl) = mock_link();
        link.connect("vcan0").unwrap();

        assert!(matches!(
            link.connect("vcan1"),
            Err(ConnectionError::AlreadyConnected)
        ));
        assert_eq!(link.state(), &ConnectionState::Connected);
        assert_eq!(link.interface(), Some("vcan0"));
        assert_eq!(ctl.open_count(), 1);
    }

    #[test]
    fn test_telemetry_updates_snapshot() {
        let (mut link, ctl) = mock_link();
        link.connect("vcan0").unwrap();

        let expected = TelemetrySnapshot {
            position: 12.3,
            velocity: 450.0,
            current: 1.5,
            temperature: 31,
            fault: FaultCode::Overvoltage,
        };
        ctl.inject(telemetry_frame(&expected));
        wait_for(|| link.stats().frames_applied == 1);

        let snap = link.snapshot();
        assert!((snap.position - 12.3).abs() < 1e-3);
        assert_eq!(snap.velocity, 450.0);
        assert!((snap.current - 1.5).abs() < 1e-4);
        assert_eq!(snap.temperature, 31);
        assert_eq!(snap.fault, FaultCode::Overvoltage);
        assert!(link.stats().last_update_us.is_some());
    }

    #[test]
    fn test_other_motor_telemetry_is_filtered() {
        let (mut link, ctl) = mock_link();
        link.connect("vcan0").unwrap();

        let other = AkServoCodec::encode_telemetry(
            MotorId::new(0x06),
            &TelemetrySnapshot {
                temperature: 99,
                ..Default::default()
            },
        );
        ctl.inject(other);
        let marker = TelemetrySnapshot {
            temperature: 7,
            ..Default::default()
        };
        ctl.inject(telemetry_frame(&marker));
        wait_for(|| link.stats().frames_applied == 1);

        assert_eq!(link.snapshot().temperature, 7);
    }

    #[test]
    fn test_short_frame_leaves_snapshot_unchanged() {
        let (mut link, ctl) = mock_link();
        link.connect("vcan0").unwrap();

        let first = TelemetrySnapshot {
            position: 1.0,
            temperature: 20,
            ..Default::default()
        };
        ctl.inject(telemetry_frame(&first));
        wait_for(|| link.stats().frames_applied == 1);
        let before = link.snapshot();

        ctl.inject(ServoFrame::new(0x2905, true, &[1, 2, 3, 4, 5]).unwrap());
        wait_for(|| link.stats().decode_errors == 1);

        assert_eq!(link.snapshot(), before);
        let stats = link.stats();
        assert_eq!(stats.last_error, Some(DecodeError::WrongLength { len: 5 }));
        assert_eq!(stats.frames_applied, 1);
    }

    #[test]
    fn test_unknown_fault_is_reported_and_reader_continues() {
        let (mut link, ctl) = mock_link();
        link.connect("vcan0").unwrap();

        ctl.inject(ServoFrame::new(0x2905, true, &[0, 10, 0, 0, 0, 0, 30, 0x42]).unwrap());
        wait_for(|| link.stats().decode_errors == 1);
        assert_eq!(link.snapshot(), TelemetrySnapshot::default());
        assert_eq!(
            link.stats().last_error,
            Some(DecodeError::UnknownFaultCode { code: 0x42 })
        );

        let good = TelemetrySnapshot {
            temperature: 25,
            ..Default::default()
        };
        ctl.inject(telemetry_frame(&good));
        wait_for(|| link.stats().frames_applied == 1);
        assert_eq!(link.snapshot().temperature, 25);
    }

    #[test]
    fn test_concurrent_snapshots_never_tear() {
        const FRAMES: i16 = 100;
        const POLLERS: usize = 4;

        let (mut link, ctl) = mock_link();
        link.connect("vcan0").unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let start = Arc::new(Barrier::new(POLLERS + 1));
        let pollers: Vec<_> = (0..POLLERS)
            .map(|_| {
                let handle = link.telemetry_handle();
                let stop = stop.clone();
                let start = start.clone();
                thread::spawn(move || {
                    let mut last_seen = 0i32;
                    let mut samples = 0u64;
                    start.wait();
                    loop {
                        let done = stop.load(Ordering::Acquire);
                        let snap = handle.snapshot();
                        // every field of frame i encodes i
                        let step = snap.velocity as i32;
                        assert_eq!(i32::from(snap.temperature), step, "{:?}", snap);
                        assert_eq!((snap.position * 10.0).round() as i32, step, "{:?}", snap);
                        assert_eq!((snap.current * 100.0).round() as i32, step, "{:?}", snap);
                        assert!(step >= last_seen, "snapshot went backwards: {:?}", snap);
                        last_seen = step;
                        samples += 1;
                        if done {
                            break;
                        }
                        thread::yield_now();
                    }
                    (samples, last_seen)
                })
            })
            .collect();

        start.wait();
        for i in 1..=FRAMES {
            let mut data = [0u8; 8];
            data[0..2].copy_from_slice(&i.to_be_bytes());
            data[2..4].copy_from_slice(&i.to_be_bytes());
            data[4..6].copy_from_slice(&i.to_be_bytes());
            data[6] = i as u8;
            ctl.inject(ServoFrame::new(0x2905, true, &data).unwrap());
            wait_for(|| link.stats().frames_applied == i as u64);
            thread::yield_now();
        }
        stop.store(true, Ordering::Release);

        for poller in pollers {
            let (samples, last_seen) = poller.join().expect("poller saw a torn snapshot");
            assert!(samples > 0);
            // the sample taken after stop sees the final frame
            assert_eq!(last_seen, i32::from(FRAMES));
        }
        assert_eq!(link.snapshot().temperature, FRAMES as i8);
    }

    #[test]
    fn test_disconnect_right_after_connect_is_bounded() {
        let (mut link, _ctl) = mock_link();
        link.connect("vcan0").unwrap();

        let started = Instant::now();
        link.disconnect();
        let elapsed = started.elapsed();

        assert!(
            elapsed <= DEFAULT_READ_TIMEOUT * 2,
            "disconnect took {:?}",
            elapsed
        );
        assert_eq!(link.state(), &ConnectionState::Disconnected);
    }

    #[test]
    fn test_disconnect_is_idempotent_and_reconnect_works() {
        let (mut link, ctl) = mock_link();
        link.disconnect();
        assert_eq!(link.state(), &ConnectionState::Disconnected);

        link.connect("vcan0").unwrap();
        link.disconnect();
        link.disconnect();
        assert_eq!(link.state(), &ConnectionState::Disconnected);
        assert!(matches!(link.send_current(1.0), Err(SendError::NotConnected)));

        link.connect("vcan0").unwrap();
        assert!(link.is_connected());
        assert_eq!(ctl.open_count(), 2);
    }

    #[test]
    fn test_stats_cover_one_session() {
        let (mut link, ctl) = mock_link();
        link.connect("vcan0").unwrap();
        ctl.inject(telemetry_frame(&TelemetrySnapshot::default()));
        ctl.inject(ServoFrame::new(0x2905, true, &[0; 3]).unwrap());
        wait_for(|| link.stats().decode_errors == 1 && link.stats().frames_applied == 1);

        link.disconnect();
        assert_eq!(link.stats().frames_applied, 1);

        link.connect("vcan0").unwrap();
        assert_eq!(link.stats(), ReaderStats::default());

        ctl.inject(telemetry_frame(&TelemetrySnapshot::default()));
        wait_for(|| link.stats().frames_applied == 1);
        assert_eq!(link.stats().decode_errors, 0);
    }

    #[test]
    fn test_snapshot_survives_disconnect() {
        let (mut link, ctl) = mock_link();
        link.connect("vcan0").unwrap();
        let last = TelemetrySnapshot {
            temperature: 42,
            ..Default::default()
        };
        ctl.inject(telemetry_frame(&last));
        wait_for(|| link.stats().frames_applied == 1);

        link.disconnect();
        assert_eq!(link.snapshot().temperature, 42);
    }

    #[test]
    fn test_drop_stops_reader() {
        let (mut link, ctl) = mock_link();
        link.connect("vcan0").unwrap();
        let handle = link.telemetry_handle();

        let started = Instant::now();
        drop(link);
        assert!(started.elapsed() <= DEFAULT_READ_TIMEOUT * 2);

        // reader is gone: injected frames no longer reach the snapshot
        ctl.inject(telemetry_frame(&TelemetrySnapshot {
            temperature: 5,
            ..Default::default()
        }));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(handle.snapshot(), TelemetrySnapshot::default());
    }

    #[test]
    fn test_read_timeout_is_capped() {
        let (connector, _ctl) = MockConnector::new();
        let link = MotorLink::with_connector(MOTOR, connector)
            .with_read_timeout(Duration::from_secs(1));
        assert_eq!(link.read_timeout(), DEFAULT_READ_TIMEOUT);

        let (connector, _ctl) = MockConnector::new();
        let link = MotorLink::with_connector(MOTOR, connector).with_read_timeout(Duration::ZERO);
        assert_eq!(link.read_timeout(), MIN_READ_TIMEOUT);
    }
}
