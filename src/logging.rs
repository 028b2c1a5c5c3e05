/// Structured logging for the DISDRODB processing chain.
///
/// Provides context-rich logging with processing stage and station
/// identifiers, timestamps, and severity levels. Supports both console
/// output and per-station log files under the processed campaign
/// directory.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Processing stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    L0A,
    L0B,
    /// Full chain, L0A then L0B.
    L0,
    Concat,
    Download,
    Archive,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::L0A => write!(f, "L0A"),
            Stage::L0B => write!(f, "L0B"),
            Stage::L0 => write!(f, "L0"),
            Stage::Concat => write!(f, "CONCAT"),
            Stage::Download => write!(f, "DOWNLOAD"),
            Stage::Archive => write!(f, "ARCHIVE"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional station log file
    log_file: Option<PathBuf>,
    /// Whether to echo messages to the console
    console: bool,
}

impl Logger {
    /// Initialize the global logger.
    ///
    /// `verbose=true` lowers the console threshold to Info; otherwise only
    /// warnings and errors reach the terminal. The log file, when set,
    /// receives everything down to Debug.
    pub fn init(verbose: bool, log_file: Option<PathBuf>) {
        let logger = Logger {
            min_level: if verbose { LogLevel::Info } else { LogLevel::Warning },
            log_file,
            console: true,
        };

        *LOGGER.lock().unwrap() = Some(logger);
    }

    /// Redirect subsequent log lines to a station log file.
    pub fn set_log_file(path: Option<PathBuf>) {
        if let Some(logger) = LOGGER.lock().unwrap().as_mut() {
            logger.log_file = path;
        }
    }

    fn log(&self, level: LogLevel, stage: Stage, station: Option<&str>, message: &str) {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let station_part = station.map(|s| format!(" [{}]", s)).unwrap_or_default();
        let log_entry = format!("{} {} {}{}: {}", timestamp, level, stage, station_part, message);

        // Console output
        if self.console && level >= self.min_level {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", stage, station_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", stage, station_part, message),
                _ => println!("   {}", message),
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path.display(), e);
            }
        }
    }

    fn append_to_file(path: &Path, entry: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(verbose: bool, log_file: Option<PathBuf>) {
    Logger::init(verbose, log_file);
}

/// Point the global logger at a station log file (or detach with `None`).
pub fn set_station_log_file(path: Option<PathBuf>) {
    Logger::set_log_file(path);
}

/// Log a general informational message
pub fn info(stage: Stage, station: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Info, stage, station, message);
    }
}

/// Log a warning message
pub fn warn(stage: Stage, station: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Warning, stage, station, message);
    }
}

/// Log an error message
pub fn error(stage: Stage, station: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Error, stage, station, message);
    }
}

/// Log a debug message
pub fn debug(stage: Stage, station: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Debug, stage, station, message);
    }
}

// ---------------------------------------------------------------------------
// Run Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a multi-station (or multi-file) run.
pub fn log_run_summary(stage: Stage, total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Run complete: {}/{} successful, {} failed",
        successful, total, failed
    );

    if failed == 0 {
        info(stage, None, &message);
    } else if successful == 0 {
        error(stage, None, &message);
    } else {
        warn(stage, None, &message);
    }
}

// ---------------------------------------------------------------------------
// Download Failure Classification
// ---------------------------------------------------------------------------

/// Broad category of a station download failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Remote side failed: HTTP error status, timeout, connection refused.
    Remote,
    /// Local archive problem: missing metadata key, populated data
    /// directory without force, filesystem error.
    Archive,
    /// Anything else.
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Remote => write!(f, "remote"),
            FailureType::Archive => write!(f, "archive"),
            FailureType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Classify a download failure from its error message.
pub fn classify_download_failure(error_message: &str) -> FailureType {
    if error_message.contains("HTTP") || error_message.contains("timeout") {
        FailureType::Remote
    } else if error_message.contains("Metadata")
        || error_message.contains("already exists")
        || error_message.contains("IO error")
    {
        FailureType::Archive
    } else {
        FailureType::Unknown
    }
}

/// Log a download failure with its classification.
pub fn log_download_failure(station: &str, operation: &str, err: &dyn std::error::Error) {
    let failure_type = classify_download_failure(&err.to_string());
    error(
        Stage::Download,
        Some(station),
        &format!("{} failed [{}]: {}", operation, failure_type, err),
    );
}
