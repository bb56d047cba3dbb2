//! Console and file logger.
//!
//! This module implements the [`log`] crate's logging facade, writing log
//! messages to both the console and a log file, so a match can be
//! reviewed after the robot is back in the pit.
//!
//! # Usage
//!
//! Initialize the logger once at the start of your program:
//!
//! ```ignore
//! use oceanus::fs::logger;
//! use log::{info, warn, LevelFilter};
//!
//! fn main() {
//!     logger::init(LevelFilter::Info).expect("Logger init failed");
//!
//!     info!("Program started");
//!     warn!("Battery low");
//! }
//! ```
//!
//! # Log Output
//!
//! Each log entry includes:
//! - Log level (TRACE, DEBUG, INFO, WARN, ERROR)
//! - Timestamp (time since program start)
//! - Target (module path)
//! - Message
//!
//! Example output:
//! ```text
//! INFO [1m 2s 40ms] oceanus::motion::pid::pid - PIDDrive target set: x=0, y=48, angle=0, turn_only=false, timeout=4000 ms
//! WARN [1m 2s 61ms] oceanus::competition - AUTONOMOUS period ran too long (19 ms of 20 ms)
//! ```

use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::Path,
    sync::{Mutex, OnceLock},
};

use humantime::{FormattedDuration, format_duration};
use log::{LevelFilter, Metadata, Record, SetLoggerError};

use crate::time::uptime;

/// Default log file, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "log.txt";

/// A dual-output logger.
///
/// Writes log messages to both the console and a file. The file is
/// created/truncated when the logger is initialized.
pub struct RobotLogger {
    /// Buffered file writer for log output.
    ///
    /// `None` if the file could not be opened (read-only media, missing
    /// directory); console output continues regardless.
    file_writer: Mutex<Option<BufWriter<File>>>,
}

impl RobotLogger {
    fn new(path: &Path) -> Self {
        let file_writer = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .ok()
            .map(BufWriter::new);

        Self {
            file_writer: Mutex::new(file_writer),
        }
    }

    /// Returns `true` if log lines are also going to a file.
    pub fn has_file(&self) -> bool { self.file_writer.lock().is_ok_and(|writer| writer.is_some()) }
}

impl log::Log for RobotLogger {
    fn enabled(&self, metadata: &Metadata) -> bool { metadata.level() <= log::max_level() }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let log_line = format_line(record);

            print!("{log_line}");

            if let Ok(mut writer_guard) = self.file_writer.lock() {
                if let Some(ref mut writer) = *writer_guard {
                    let _ = writer.write_all(log_line.as_bytes());
                }
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut writer_guard) = self.file_writer.lock() {
            if let Some(ref mut writer) = *writer_guard {
                let _ = writer.flush();
            }
        }
    }
}

static LOGGER: OnceLock<RobotLogger> = OnceLock::new();

/// Initializes the logger, writing to [`DEFAULT_LOG_FILE`].
///
/// This function must be called once before any logging macros are used.
///
/// # Arguments
///
/// * `level` - The minimum log level to record. Use [`LevelFilter::Debug`]
///   to see per-cycle controller outputs, [`LevelFilter::Info`] for target
///   and mode changes only.
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a logger has already been set.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> { init_with_path(level, DEFAULT_LOG_FILE) }

/// Initializes the logger, writing to `path`.
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a logger has already been set.
pub fn init_with_path(level: LevelFilter, path: impl AsRef<Path>) -> Result<(), SetLoggerError> {
    let logger = LOGGER.get_or_init(|| RobotLogger::new(path.as_ref()));
    log::set_logger(logger).map(|()| log::set_max_level(level))
}

fn format_line(record: &Record) -> String {
    format!(
        "{} [{}] {} - {}\n",
        record.level(),
        get_time(),
        record.target(),
        record.args()
    )
}

/// Returns the formatted time since the program started, to millisecond
/// precision.
fn get_time() -> FormattedDuration {
    let millis = uptime().as_millis() as u64;
    format_duration(std::time::Duration::from_millis(millis))
}
