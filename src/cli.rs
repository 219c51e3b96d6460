// src/cli.rs
//
// Terminal front end: monitor telemetry, send single commands, or run the
// virtual servo. Connect retries live here; the link itself tries once.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use clap::{Args, Parser, Subcommand};

use crate::io::{
    BusConnector, MotorId, OriginMode, ServoCommand, SocketCanConnector, TelemetrySnapshot,
};
use crate::link::MotorLink;
use crate::logging::{init_file_logging, stop_file_logging};
use crate::settings::{load_settings, parse_motor_id, Settings};
use crate::simulator::{run_simulator, SimulatorConfig};
use crate::tlog;

#[derive(Parser, Debug)]
#[command(name = "akservo", version, about = "Drive and monitor an AK-series servo over SocketCAN")]
pub struct Cli {
    /// Settings file (defaults to the per-user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// CAN interface, e.g. can0 or vcan0
    #[arg(short, long, global = true)]
    interface: Option<String>,

    /// Motor address, decimal or 0x-prefixed hex
    #[arg(short, long, global = true, value_parser = parse_motor_id)]
    motor_id: Option<MotorId>,

    /// Output-shaft reduction applied to positions and speeds
    #[arg(long, global = true)]
    gear_ratio: Option<f32>,

    /// Mirror log output into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Copy)]
struct Watch {
    /// Keep re-sending for N poll intervals, printing telemetry each time
    #[arg(long, default_value_t = 0)]
    watch: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print telemetry samples
    Monitor {
        /// Stop after N samples (runs until killed otherwise)
        #[arg(long)]
        count: Option<u64>,
        /// Override the poll interval from settings
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Duty cycle, -1.0..=1.0
    Duty {
        #[arg(allow_negative_numbers = true)]
        duty: f32,
        #[command(flatten)]
        watch: Watch,
    },
    /// Current loop, amperes
    Current {
        #[arg(allow_negative_numbers = true)]
        amps: f32,
        #[command(flatten)]
        watch: Watch,
    },
    /// Current brake, amperes
    Brake {
        #[arg(allow_negative_numbers = true)]
        amps: f32,
        #[command(flatten)]
        watch: Watch,
    },
    /// Output-shaft speed, deg/s
    Velocity {
        #[arg(allow_negative_numbers = true)]
        deg_per_s: f32,
        #[command(flatten)]
        watch: Watch,
    },
    /// Output-shaft position, deg
    Position {
        #[arg(allow_negative_numbers = true)]
        deg: f32,
        #[command(flatten)]
        watch: Watch,
    },
    /// Profiled move: position (deg), speed and acceleration in device units
    Pva {
        #[arg(allow_negative_numbers = true)]
        deg: f32,
        #[arg(allow_negative_numbers = true)]
        velocity: i16,
        #[arg(allow_negative_numbers = true)]
        acceleration: i16,
        #[command(flatten)]
        watch: Watch,
    },
    /// Set the encoder origin: temporary, permanent or restore
    Origin {
        mode: OriginMode,
        #[command(flatten)]
        watch: Watch,
    },
    /// Run a virtual servo on the interface
    Simulate {
        #[arg(long, default_value_t = 100)]
        rate_hz: u32,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let stop_flag = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(stop_flag.clone());

    match execute(cli, &stop_flag) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tlog!("[cli] {}", e);
            stop_file_logging();
            ExitCode::FAILURE
        }
    }
}

/// Ctrl-C only raises `stop_flag`; every loop below checks it, so links are
/// dropped (reader joined, socket closed) and the log file is closed.
fn install_interrupt_handler(stop_flag: Arc<AtomicBool>) {
    let result = ctrlc::set_handler(move || {
        stop_flag.store(true, Ordering::Release);
    });
    if let Err(e) = result {
        tlog!("[cli] Could not install Ctrl-C handler: {}", e);
    }
}

fn execute(cli: Cli, stop_flag: &Arc<AtomicBool>) -> Result<(), String> {
    let settings = resolve_settings(&cli)?;
    if let Some(dir) = &settings.log_dir {
        init_file_logging(dir)?;
    }

    let result = match cli.command {
        Command::Monitor { count, interval_ms } => {
            let mut settings = settings;
            if let Some(ms) = interval_ms {
                settings.poll_interval_ms = ms;
            }
            monitor(&settings, count, stop_flag)
        }
        Command::Simulate { rate_hz } => simulate(&settings, rate_hz, stop_flag.clone()),
        command => {
            let (servo_command, watch) = to_servo_command(&settings, command)?;
            send_and_watch(&settings, servo_command, watch.watch, stop_flag)
        }
    };

    if stop_flag.load(Ordering::Acquire) {
        tlog!("[cli] Interrupted");
    }

    stop_file_logging();
    result
}

/// File settings with command-line overrides applied on top.
fn resolve_settings(cli: &Cli) -> Result<Settings, String> {
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(interface) = &cli.interface {
        settings.interface = interface.clone();
    }
    if let Some(motor) = cli.motor_id {
        settings.motor_id = motor;
    }
    if let Some(ratio) = cli.gear_ratio {
        settings.gear_ratio = ratio;
    }
    if let Some(dir) = &cli.log_dir {
        settings.log_dir = Some(dir.clone());
    }
    settings.validate()?;
    Ok(settings)
}

/// Map a command-line subcommand to a servo command in motor units.
fn to_servo_command(
    settings: &Settings,
    command: Command,
) -> Result<(ServoCommand, Watch), String> {
    Ok(match command {
        Command::Duty { duty, watch } => (ServoCommand::Duty(duty), watch),
        Command::Current { amps, watch } => (ServoCommand::Current(amps), watch),
        Command::Brake { amps, watch } => (ServoCommand::CurrentBrake(amps), watch),
        Command::Velocity { deg_per_s, watch } => {
            (ServoCommand::Velocity(settings.to_motor(deg_per_s)), watch)
        }
        Command::Position { deg, watch } => (ServoCommand::Position(settings.to_motor(deg)), watch),
        Command::Pva {
            deg,
            velocity,
            acceleration,
            watch,
        } => (
            ServoCommand::PositionVelocityAcceleration {
                position: settings.to_motor(deg),
                velocity,
                acceleration,
            },
            watch,
        ),
        Command::Origin { mode, watch } => (ServoCommand::SetOrigin(mode), watch),
        Command::Monitor { .. } | Command::Simulate { .. } => {
            return Err("not a servo command".to_string())
        }
    })
}

/// Try `connect_retries` times, `retry_delay` apart. Gives up early once
/// `stop_flag` is raised.
fn connect_with_retry<C: BusConnector>(
    link: &mut MotorLink<C>,
    settings: &Settings,
    stop_flag: &AtomicBool,
) -> Result<(), String> {
    let attempts = settings.connect_retries.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match link.connect(&settings.interface) {
            Ok(()) => return Ok(()),
            Err(e) => {
                last_error = e.to_string();
                if stop_flag.load(Ordering::Acquire) {
                    return Err(format!("Interrupted while connecting: {}", last_error));
                }
                if attempt < attempts {
                    tlog!(
                        "[cli] Connect attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        attempts,
                        e,
                        settings.retry_delay()
                    );
                    thread::sleep(settings.retry_delay());
                }
            }
        }
    }

    Err(format!(
        "Could not connect to motor {} on {} after {} attempt(s): {}",
        link.motor_id(),
        settings.interface,
        attempts,
        last_error
    ))
}

fn open_link(settings: &Settings, stop_flag: &AtomicBool) -> Result<MotorLink, String> {
    let mut link = MotorLink::new(settings.motor_id).with_read_timeout(settings.read_timeout());
    connect_with_retry(&mut link, settings, stop_flag)?;
    Ok(link)
}

/// One telemetry line, positions and speeds on the output shaft.
fn format_sample(settings: &Settings, snapshot: &TelemetrySnapshot) -> String {
    format!(
        "pos {:>9.1} deg  vel {:>8.1} erpm  cur {:>6.2} A  temp {:>4} C  fault {}",
        settings.to_output(snapshot.position),
        settings.to_output(snapshot.velocity),
        snapshot.current,
        snapshot.temperature,
        snapshot.fault
    )
}

fn monitor(settings: &Settings, count: Option<u64>, stop_flag: &AtomicBool) -> Result<(), String> {
    let link = open_link(settings, stop_flag)?;
    let printed = monitor_loop(&link, settings, count, stop_flag, &mut std::io::stdout().lock())?;

    let stats = link.stats();
    tlog!(
        "[cli] {} samples; {} frames applied, {} decode errors, {} read errors",
        printed,
        stats.frames_applied,
        stats.decode_errors,
        stats.read_errors
    );
    Ok(())
}

/// Wait one poll interval; false if `stop_flag` was raised meanwhile.
fn next_tick(settings: &Settings, stop_flag: &AtomicBool) -> bool {
    if stop_flag.load(Ordering::Acquire) {
        return false;
    }
    thread::sleep(settings.poll_interval());
    !stop_flag.load(Ordering::Acquire)
}

/// Print one sample per poll interval until `count` samples or a stop.
/// Returns the number printed.
fn monitor_loop<C: BusConnector>(
    link: &MotorLink<C>,
    settings: &Settings,
    count: Option<u64>,
    stop_flag: &AtomicBool,
    out: &mut impl Write,
) -> Result<u64, String> {
    let telemetry = link.telemetry_handle();
    let mut printed = 0u64;

    while count.map_or(true, |n| printed < n) && next_tick(settings, stop_flag) {
        writeln!(out, "{}", format_sample(settings, &telemetry.snapshot()))
            .map_err(|e| format!("Failed to write sample: {}", e))?;
        printed += 1;
    }
    Ok(printed)
}

fn send_and_watch(
    settings: &Settings,
    command: ServoCommand,
    watch: u64,
    stop_flag: &AtomicBool,
) -> Result<(), String> {
    let link = open_link(settings, stop_flag)?;
    link.send(command).map_err(|e| format!("Send failed: {}", e))?;
    watch_loop(&link, settings, command, watch, stop_flag, &mut std::io::stdout().lock())?;
    Ok(())
}

/// Re-send `command` each poll interval, `watch` times or until a stop,
/// printing telemetry after each send. Returns the number of samples.
fn watch_loop<C: BusConnector>(
    link: &MotorLink<C>,
    settings: &Settings,
    command: ServoCommand,
    watch: u64,
    stop_flag: &AtomicBool,
    out: &mut impl Write,
) -> Result<u64, String> {
    let mut printed = 0u64;
    while printed < watch && next_tick(settings, stop_flag) {
        // servo mode drops out without a steady command stream
        if let Err(e) = link.send(command) {
            tlog!("[cli] Re-send failed: {}", e);
        }
        writeln!(out, "{}", format_sample(settings, &link.snapshot()))
            .map_err(|e| format!("Failed to write sample: {}", e))?;
        printed += 1;
    }
    Ok(printed)
}

fn simulate(settings: &Settings, rate_hz: u32, stop_flag: Arc<AtomicBool>) -> Result<(), String> {
    let config = SimulatorConfig {
        interface: settings.interface.clone(),
        motor: settings.motor_id,
        rate_hz,
    };
    run_simulator(&SocketCanConnector, &config, stop_flag).map_err(|e| e.to_string())
}
