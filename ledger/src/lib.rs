//! Violation ticket ledger: records speed-violation tickets, lists the unpaid
//! ones per airline and settles payments.
//!
//! The simulation only talks to the [`ViolationLedger`] trait, so the storage
//! behind it can be swapped (or mocked in tests).

use chrono::{DateTime, Utc};
use errors::LedgerError;
use std::collections::BTreeMap;
use std::sync::Mutex;
pub mod errors;

pub type TicketId = u32;

/// Everything the simulation knows about a violation when it asks for a ticket.
/// Fine and due date are computed by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketRequest {
    pub flight_number: u32,
    pub airline: String,
    pub aircraft_type: String,
    pub recorded_speed: f32,
    pub permissible_speed: f32,
    pub fine: f64,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

/// A recorded ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: TicketId,
    pub flight_number: u32,
    pub airline: String,
    pub aircraft_type: String,
    pub recorded_speed: f32,
    pub permissible_speed: f32,
    pub fine: f64,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub paid: bool,
}

impl Ticket {
    fn from_request(id: TicketId, request: TicketRequest) -> Self {
        Ticket {
            id,
            flight_number: request.flight_number,
            airline: request.airline,
            aircraft_type: request.aircraft_type,
            recorded_speed: request.recorded_speed,
            permissible_speed: request.permissible_speed,
            fine: request.fine,
            issued_at: request.issued_at,
            due_at: request.due_at,
            paid: false,
        }
    }
}

/// Outcome of a successful payment.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub ticket: TicketId,
    pub fine: f64,
    pub amount: f64,
    pub change: f64,
}

/// Service interface of the violation ledger.
pub trait ViolationLedger: Send + Sync {
    /// Stores a new unpaid ticket and returns its id.
    fn record(&self, request: TicketRequest) -> Result<TicketId, LedgerError>;

    /// Marks a ticket as paid without checking any amount.
    fn mark_paid(&self, id: TicketId) -> Result<(), LedgerError>;

    /// Unpaid tickets of the given airline, ordered by id.
    fn list_unpaid(&self, airline: &str) -> Result<Vec<Ticket>, LedgerError>;

    /// Settles a ticket with the given amount.
    ///
    /// # Errors
    /// - `LedgerError::TicketNotFound` if the id is unknown.
    /// - `LedgerError::AlreadyPaid` if the ticket was settled before.
    /// - `LedgerError::InsufficientPayment` if `amount` is below the fine. The ledger is left unchanged.
    fn pay(&self, id: TicketId, amount: f64) -> Result<Receipt, LedgerError>;
}

struct LedgerState {
    tickets: BTreeMap<TicketId, Ticket>,
    last_id: TicketId,
}

/// Process-local ledger kept behind a single mutex.
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        InMemoryLedger {
            state: Mutex::new(LedgerState {
                tickets: BTreeMap::new(),
                last_id: 0,
            }),
        }
    }

    /// Returns a copy of the ticket with the given id, paid or not.
    pub fn get(&self, id: TicketId) -> Result<Ticket, LedgerError> {
        let state = self.lock()?;
        state
            .tickets
            .get(&id)
            .cloned()
            .ok_or(LedgerError::TicketNotFound(id))
    }

    /// Number of tickets recorded so far.
    pub fn len(&self) -> usize {
        self.lock().map(|state| state.tickets.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LedgerState>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Unavailable("ledger lock poisoned".to_string()))
    }
}

impl ViolationLedger for InMemoryLedger {
    fn record(&self, request: TicketRequest) -> Result<TicketId, LedgerError> {
        let mut state = self.lock()?;
        state.last_id += 1;
        let id = state.last_id;
        state.tickets.insert(id, Ticket::from_request(id, request));
        Ok(id)
    }

    fn mark_paid(&self, id: TicketId) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        let ticket = state
            .tickets
            .get_mut(&id)
            .ok_or(LedgerError::TicketNotFound(id))?;
        ticket.paid = true;
        Ok(())
    }

    fn list_unpaid(&self, airline: &str) -> Result<Vec<Ticket>, LedgerError> {
        let state = self.lock()?;
        Ok(state
            .tickets
            .values()
            .filter(|ticket| ticket.airline == airline && !ticket.paid)
            .cloned()
            .collect())
    }

    fn pay(&self, id: TicketId, amount: f64) -> Result<Receipt, LedgerError> {
        let mut state = self.lock()?;
        let ticket = state
            .tickets
            .get_mut(&id)
            .ok_or(LedgerError::TicketNotFound(id))?;

        if ticket.paid {
            return Err(LedgerError::AlreadyPaid(id));
        }
        if amount < ticket.fine {
            return Err(LedgerError::InsufficientPayment {
                due: ticket.fine,
                offered: amount,
            });
        }

        ticket.paid = true;
        Ok(Receipt {
            ticket: id,
            fine: ticket.fine,
            amount,
            change: amount - ticket.fine,
        })
    }
}
