// src/simulator.rs
//
// Virtual AK servo for bench testing without hardware.
//
// Listens for servo-mode commands addressed to one motor ID, integrates a
// crude first-order model, and publishes telemetry at a fixed rate.
// Typically pointed at a vcan interface:
//   sudo ip link add dev vcan0 type vcan && sudo ip link set vcan0 up

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::io::servo::codec::consts::POLE_PAIRS;
use crate::io::{
    AkServoCodec, BusConnector, BusFilter, ConnectionError, FaultCode, MotorId, OriginMode,
    ServoBus, ServoCommand, TelemetrySnapshot,
};
use crate::tlog;

// ============================================================================
// Model
// ============================================================================

/// Model constants
mod consts {
    /// Shaft speed at full duty, deg/s
    pub const MAX_SPEED_DPS: f32 = 1800.0;
    /// Shaft acceleration per ampere, deg/s^2
    pub const ACCEL_PER_AMP: f32 = 400.0;
    /// Viscous drag, 1/s
    pub const DRAG: f32 = 0.5;
    /// Speed loop time constant, s
    pub const SPEED_TAU: f32 = 0.1;
    /// Position loop gain, 1/s
    pub const POSITION_GAIN: f32 = 8.0;
    pub const AMBIENT_C: f32 = 25.0;
    /// Heating per A^2 per second, and cooling rate toward ambient, 1/s
    pub const HEAT_PER_A2: f32 = 0.02;
    pub const COOLING: f32 = 0.05;
    pub const OVERTEMP_C: f32 = 90.0;
    /// Telemetry position field saturates at i16 * 0.1 deg
    pub const WRAP_DEG: f32 = 3200.0;
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Drive {
    Idle,
    Duty(f32),
    Current(f32),
    Brake(f32),
    Speed(f32),
    Position(f32),
    Profile { target: f32, speed: f32, accel: f32 },
}

/// Shaft state of the virtual servo.
#[derive(Clone, Debug)]
pub struct ServoModel {
    drive: Drive,
    /// Unwrapped position, deg
    angle: f32,
    /// deg/s
    speed: f32,
    amps: f32,
    temperature: f32,
    origin: f32,
    stored_origin: f32,
}

impl Default for ServoModel {
    fn default() -> Self {
        Self {
            drive: Drive::Idle,
            angle: 0.0,
            speed: 0.0,
            amps: 0.0,
            temperature: consts::AMBIENT_C,
            origin: 0.0,
            stored_origin: 0.0,
        }
    }
}

impl ServoModel {
    pub fn apply(&mut self, command: ServoCommand) {
        self.drive = match command {
            ServoCommand::Duty(d) => Drive::Duty(d.clamp(-1.0, 1.0)),
            ServoCommand::Current(a) => Drive::Current(a),
            ServoCommand::CurrentBrake(a) => Drive::Brake(a),
            ServoCommand::Velocity(dps) => Drive::Speed(dps),
            ServoCommand::Position(deg) => Drive::Position(deg),
            ServoCommand::PositionVelocityAcceleration {
                position,
                velocity,
                acceleration,
            } => Drive::Profile {
                target: position,
                speed: f32::from(velocity).abs(),
                accel: f32::from(acceleration),
            },
            ServoCommand::SetOrigin(mode) => {
                match mode {
                    OriginMode::Temporary => self.origin = self.angle,
                    OriginMode::Permanent => {
                        self.origin = self.angle;
                        self.stored_origin = self.angle;
                    }
                    OriginMode::Restore => self.origin = self.stored_origin,
                }
                return;
            }
        };
    }

    /// Position relative to the active origin.
    fn position(&self) -> f32 {
        self.angle - self.origin
    }

    /// Advance the model by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let position = self.position();
        let previous = self.speed;

        match self.drive {
            Drive::Idle => {
                self.speed -= self.speed * consts::DRAG * dt;
            }
            Drive::Duty(d) => {
                self.approach_speed(d * consts::MAX_SPEED_DPS, dt);
            }
            Drive::Current(a) => {
                self.speed += (a * consts::ACCEL_PER_AMP - self.speed * consts::DRAG) * dt;
            }
            Drive::Brake(a) => {
                let max_delta = a * consts::ACCEL_PER_AMP * dt;
                self.speed -= self.speed.clamp(-max_delta, max_delta);
            }
            Drive::Speed(dps) => self.approach_speed(dps, dt),
            Drive::Position(target) => {
                let wanted = ((target - position) * consts::POSITION_GAIN)
                    .clamp(-consts::MAX_SPEED_DPS, consts::MAX_SPEED_DPS);
                self.approach_speed(wanted, dt);
            }
            Drive::Profile {
                target,
                speed,
                accel,
            } => {
                let wanted = ((target - position) * consts::POSITION_GAIN).clamp(-speed, speed);
                let max_delta = accel * dt;
                self.speed += (wanted - self.speed).clamp(-max_delta, max_delta);
            }
        }

        self.speed = self
            .speed
            .clamp(-consts::MAX_SPEED_DPS, consts::MAX_SPEED_DPS);
        self.angle += self.speed * dt;
        if self.position().abs() > consts::WRAP_DEG {
            // keep the reported field inside its i16 range
            self.angle = self.origin + self.position() % consts::WRAP_DEG;
        }

        self.amps = match self.drive {
            Drive::Current(a) => a,
            _ => (self.speed - previous) / dt / consts::ACCEL_PER_AMP,
        };
        self.temperature += (self.amps * self.amps * consts::HEAT_PER_A2
            - (self.temperature - consts::AMBIENT_C) * consts::COOLING)
            * dt;
    }

    fn approach_speed(&mut self, target: f32, dt: f32) {
        let alpha = (dt / consts::SPEED_TAU).min(1.0);
        self.speed += (target - self.speed) * alpha;
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        // shaft deg/s -> rpm -> electrical rpm
        let erpm = self.speed / 6.0 * POLE_PAIRS as f32;
        TelemetrySnapshot {
            position: self.position(),
            velocity: erpm,
            current: self.amps,
            temperature: self.temperature.round().clamp(-128.0, 127.0) as i8,
            fault: if self.temperature >= consts::OVERTEMP_C {
                FaultCode::Overtemperature
            } else {
                FaultCode::None
            },
        }
    }
}

// ============================================================================
// Runner
// ============================================================================

#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    pub interface: String,
    pub motor: MotorId,
    pub rate_hz: u32,
}

impl SimulatorConfig {
    fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.rate_hz.clamp(1, 1000)))
    }
}

/// Run until `stop_flag` is set. Returns early only if the bus cannot be opened.
pub fn run_simulator<C: BusConnector>(
    connector: &C,
    config: &SimulatorConfig,
    stop_flag: Arc<AtomicBool>,
) -> Result<(), ConnectionError> {
    let period = config.period();
    let read_timeout = (period / 4).clamp(Duration::from_millis(1), Duration::from_millis(50));
    let bus = connector.open(
        &config.interface,
        BusFilter::addressed_to(config.motor),
        read_timeout,
    )?;

    tlog!(
        "[sim] Motor {} simulating on {} at {} Hz",
        config.motor,
        config.interface,
        config.rate_hz
    );

    let mut model = ServoModel::default();
    let mut last_step = Instant::now();
    let mut next_publish = last_step;
    let mut write_errors = 0u64;

    while !stop_flag.load(Ordering::Acquire) {
        match bus.read_frame() {
            Ok(Some(frame)) => {
                if let Some((motor, command)) = AkServoCodec::decode_command(&frame) {
                    if motor == config.motor {
                        model.apply(command);
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                tlog!("[sim] Read error: {}", e);
                std::thread::sleep(read_timeout);
            }
        }

        let now = Instant::now();
        if now >= next_publish {
            model.step(now.duration_since(last_step).as_secs_f32());
            last_step = now;

            let frame = AkServoCodec::encode_telemetry(config.motor, &model.telemetry());
            if let Err(e) = bus.write_frame(&frame) {
                write_errors += 1;
                if write_errors == 1 || write_errors % 100 == 0 {
                    tlog!("[sim] Write error: {} ({} so far)", e, write_errors);
                }
            }

            next_publish += period;
            if next_publish < now {
                next_publish = now + period;
            }
        }
    }

    tlog!("[sim] Motor {} stopped", config.motor);
    Ok(())
}
