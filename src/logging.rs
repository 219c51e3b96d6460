// src/logging.rs
//
// Log lines from the link, the reader thread, the simulator and the CLI.
// Everything goes to stderr; with `log_dir` set (settings or `--log-dir`)
// the same lines are appended to a per-run file, so a bench session can be
// replayed after the terminal is gone.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Per-run log file, shared by every thread that calls `tlog!`.
pub static LOG_FILE: Mutex<Option<File>> = Mutex::new(None);

/// Stable name next to the per-run files, pointing at the current one,
/// so `tail -f <log_dir>/akservo.log` follows whichever run is live.
const LATEST_LOG_LINK: &str = "akservo.log";

/// `HH:MM:SS.mmm` local time, the prefix of every line.
pub fn timestamp() -> impl std::fmt::Display {
    chrono::Local::now().format("%H:%M:%S%.3f")
}

/// Open `<log_dir>/<YYYYmmdd-HHMMSS>-akservo.log` and start mirroring
/// `tlog!` output into it. Returns the new file's path.
pub fn init_file_logging(log_dir: &Path) -> Result<PathBuf, String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("Failed to create log dir {}: {}", log_dir.display(), e))?;

    let file_name = chrono::Local::now()
        .format("%Y%m%d-%H%M%S-akservo.log")
        .to_string();
    let log_path = log_dir.join(&file_name);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| format!("Failed to open {}: {}", log_path.display(), e))?;

    #[cfg(unix)]
    point_latest_link(log_dir, &file_name);

    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = Some(file);
    }

    crate::tlog!("[logging] Mirroring log to {}", log_path.display());
    Ok(log_path)
}

/// Relative link, so the log directory can be moved or copied whole.
#[cfg(unix)]
fn point_latest_link(log_dir: &Path, file_name: &str) {
    let link = log_dir.join(LATEST_LOG_LINK);
    let _ = std::fs::remove_file(&link);
    if let Err(e) = std::os::unix::fs::symlink(file_name, &link) {
        eprintln!("{} [logging] Could not update {}: {}", timestamp(), link.display(), e);
    }
}

/// Close the per-run file. stderr output continues.
pub fn stop_file_logging() {
    let closed = match LOG_FILE.lock() {
        Ok(mut guard) => guard.take().is_some(),
        Err(_) => false,
    };
    if closed {
        eprintln!("{} [logging] Log file closed", timestamp());
    }
}

/// `eprintln!` with a timestamp, also appended to the per-run file when one
/// is open. Callers tag the line with their component: `[link]`, `[sim]`...
#[macro_export]
macro_rules! tlog {
    ($($arg:tt)*) => {{
        use std::io::Write as _;
        let line = format!("{} {}", $crate::logging::timestamp(), format_args!($($arg)*));
        eprintln!("{}", line);
        if let Ok(mut guard) = $crate::logging::LOG_FILE.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = writeln!(file, "{}", line);
            }
        }
    }};
}
