use std::fmt;
use std::io;

use ledger::errors::LedgerError;
use logger::LoggerError;

/// Represents errors that can occur in the air-traffic simulation.
#[derive(Debug)]
pub enum SimError {
    InvalidInput,
    InvalidConfig(String), // Bad key, value or range in the configuration
    UnknownAirline(String), // Airline name not present in the roster
    InvalidPhase(String),  // Phase name that does not parse
    LockError(String),     // A shared structure was poisoned
    ThreadStartError(String), // A worker thread could not be spawned
    LedgerError(LedgerError),
    LoggerError(LoggerError),
    IoError(io::Error),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::InvalidInput => {
                write!(f, "Invalid input. Please check your input and try again.")
            }
            SimError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            SimError::UnknownAirline(name) => write!(f, "Airline not found: {}", name),
            SimError::InvalidPhase(name) => write!(f, "Invalid flight phase: {}", name),
            SimError::LockError(msg) => write!(f, "Lock error: {}", msg),
            SimError::ThreadStartError(msg) => write!(f, "Thread start error: {}", msg),
            SimError::LedgerError(e) => write!(f, "Ledger error: {}", e),
            SimError::LoggerError(e) => write!(f, "Logger error: {}", e),
            SimError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::LedgerError(e) => Some(e),
            SimError::LoggerError(e) => Some(e),
            SimError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LedgerError> for SimError {
    fn from(error: LedgerError) -> Self {
        SimError::LedgerError(error)
    }
}

impl From<LoggerError> for SimError {
    fn from(error: LoggerError) -> Self {
        SimError::LoggerError(error)
    }
}

impl From<io::Error> for SimError {
    fn from(error: io::Error) -> Self {
        SimError::IoError(error)
    }
}

impl<T> From<std::sync::PoisonError<T>> for SimError {
    fn from(error: std::sync::PoisonError<T>) -> Self {
        SimError::LockError(error.to_string())
    }
}
