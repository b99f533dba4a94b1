use std::fmt::{self, Display};

use crate::TicketId;

/// Enum representing the possible errors returned by a `ViolationLedger`.
///
/// - `TicketNotFound`: no ticket with the given id was ever recorded.
/// - `InsufficientPayment`: the offered amount does not cover the fine; the ticket is left unpaid.
/// - `AlreadyPaid`: the ticket was settled before.
/// - `Unavailable`: the ledger could not be reached or its storage is unusable.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    TicketNotFound(TicketId),
    InsufficientPayment { due: f64, offered: f64 },
    AlreadyPaid(TicketId),
    Unavailable(String),
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::TicketNotFound(id) => {
                write!(f, "[TicketNotFound]: Ticket #{} not found", id)
            }
            LedgerError::InsufficientPayment { due, offered } => write!(
                f,
                "[InsufficientPayment]: Insufficient payment, missing {:.2} (due {:.2}, offered {:.2})",
                due - offered,
                due,
                offered
            ),
            LedgerError::AlreadyPaid(id) => {
                write!(f, "[AlreadyPaid]: Ticket #{} is already paid", id)
            }
            LedgerError::Unavailable(reason) => {
                write!(f, "[Unavailable]: The ledger is unavailable: {}", reason)
            }
        }
    }
}

impl std::error::Error for LedgerError {}
