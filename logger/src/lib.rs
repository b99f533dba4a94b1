use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy)]
enum LogLevel {
    Debug,
    Info(Color),
    Warn,
    Error,
}

impl LogLevel {
    fn tag(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info(_) => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
    Cyan,
    Magenta,
    White,
}

impl Color {
    fn to_ansi_code(self) -> &'static str {
        match self {
            Color::Red => "\x1b[31m",
            Color::Green => "\x1b[32m",
            Color::Blue => "\x1b[34m",
            Color::Yellow => "\x1b[33m",
            Color::Cyan => "\x1b[36m",
            Color::Magenta => "\x1b[35m",
            Color::White => "\x1b[37m",
        }
    }
}

/// Session logger writing `[LEVEL] [timestamp]: message` lines to a file,
/// optionally echoing them to the console with colours.
///
/// Clones share the same file handle, so several threads may log through
/// their own copy without interleaving partial lines.
#[derive(Debug, Clone)]
pub struct Logger {
    log_file: PathBuf,
    file: Arc<Mutex<File>>,
    echo: bool,
}

impl Logger {
    /// Creates a new `Logger` instance.
    ///
    /// # Parameters
    /// - `log_dir`: Directory holding the log file. Created if missing.
    /// - `session`: Name included in the log file name (`atc_{session}.log`).
    /// - `echo`: Whether every line is also printed to the console.
    ///
    /// # Returns
    /// A new `Logger` instance, with the log file truncated.
    pub fn new(log_dir: &Path, session: &str, echo: bool) -> Result<Self, LoggerError> {
        if log_dir.exists() && !log_dir.is_dir() {
            return Err(LoggerError::InvalidPath(
                "Provided path is not a directory.".into(),
            ));
        }
        std::fs::create_dir_all(log_dir)?;

        let sanitized = session.replace([':', '/', ' '], "_");
        let log_file = log_dir.join(format!("atc_{}.log", sanitized));

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&log_file)?;

        Ok(Logger {
            log_file,
            file: Arc::new(Mutex::new(file)),
            echo,
        })
    }

    /// Path of the file this logger writes to.
    pub fn path(&self) -> &Path {
        &self.log_file
    }

    fn log(&self, level: LogLevel, message: &str) -> Result<(), LoggerError> {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let line = format!("[{}] [{}]: {}\n", level.tag(), timestamp, message);

        if self.echo {
            let colored = match level {
                LogLevel::Debug => format!("\x1b[90m{}\x1b[0m", line),
                LogLevel::Info(color) => format!("{}{}\x1b[0m", color.to_ansi_code(), line),
                LogLevel::Warn => format!("\x1b[93m{}\x1b[0m", line), // Bright Yellow
                LogLevel::Error => format!("\x1b[91m{}\x1b[0m", line), // Bright Red
            };
            let mut stdout = io::stdout().lock();
            stdout.write_all(colored.as_bytes())?;
            stdout.flush()?;
        }

        let mut file = self.file.lock().map_err(|_| LoggerError::Poisoned)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;

        Ok(())
    }

    /// Logs a diagnostic message, greyed out on the console.
    pub fn debug(&self, message: &str) -> Result<(), LoggerError> {
        self.log(LogLevel::Debug, message)
    }

    /// Logs an informational message.
    ///
    /// # Parameters
    /// - `message`: The informational message to log.
    /// - `color`: The color to use for the console output.
    pub fn info(&self, message: &str, color: Color) -> Result<(), LoggerError> {
        self.log(LogLevel::Info(color), message)
    }

    /// Logs a warning message.
    pub fn warn(&self, message: &str) -> Result<(), LoggerError> {
        self.log(LogLevel::Warn, message)
    }

    /// Logs an error message.
    pub fn error(&self, message: &str) -> Result<(), LoggerError> {
        self.log(LogLevel::Error, message)
    }
}

#[derive(Debug)]
pub enum LoggerError {
    IoError(std::io::Error),
    InvalidPath(String),
    /// Another thread panicked while holding the file handle.
    Poisoned,
}

impl std::fmt::Display for LoggerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoggerError::IoError(e) => write!(f, "I/O Error: {}", e),
            LoggerError::InvalidPath(msg) => write!(f, "Invalid Path: {}", msg),
            LoggerError::Poisoned => write!(f, "Log file handle poisoned"),
        }
    }
}

impl std::error::Error for LoggerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoggerError::IoError(e) => Some(e),
            LoggerError::InvalidPath(_) | LoggerError::Poisoned => None,
        }
    }
}

impl From<std::io::Error> for LoggerError {
    fn from(err: std::io::Error) -> Self {
        LoggerError::IoError(err)
    }
}
