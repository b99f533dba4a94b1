use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use super::airline::AircraftType;
use super::flight::{Flight, FlightDirection, FlightId};

/// A flight waiting for a runway, with the immutable data the scheduler needs
/// to pick one.
#[derive(Debug, Clone, PartialEq)]
pub struct BacklogEntry {
    pub flight: FlightId,
    pub priority: u8,
    pub aircraft_type: AircraftType,
    pub direction: FlightDirection,
    pub scheduled_at: DateTime<Utc>,
}

impl BacklogEntry {
    pub fn for_flight(flight: &Flight) -> Self {
        BacklogEntry {
            flight: flight.number,
            priority: flight.priority(),
            aircraft_type: flight.aircraft_type,
            direction: flight.direction,
            scheduled_at: flight.scheduled_at,
        }
    }
}

// Sequence number breaks ties between identical timestamps in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct BacklogKey {
    priority: u8,
    scheduled_at: DateTime<Utc>,
    seq: u64,
}

/// Priority-ordered set of flights awaiting a runway.
///
/// Entries are ordered by (priority, scheduled time); a flight appears at most
/// once. Removal by flight number is logarithmic and keeps the relative order
/// of every other entry.
#[derive(Debug, Default)]
pub struct Backlog {
    entries: BTreeMap<BacklogKey, BacklogEntry>,
    index: HashMap<FlightId, BacklogKey>,
    next_seq: u64,
}

impl Backlog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the entry unless the flight is already waiting. Returns whether it was added.
    pub fn push(&mut self, entry: BacklogEntry) -> bool {
        if self.index.contains_key(&entry.flight) {
            return false;
        }
        let key = BacklogKey {
            priority: entry.priority,
            scheduled_at: entry.scheduled_at,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.index.insert(entry.flight, key);
        self.entries.insert(key, entry);
        true
    }

    pub fn peek(&self) -> Option<&BacklogEntry> {
        self.entries.values().next()
    }

    pub fn pop(&mut self) -> Option<BacklogEntry> {
        let (_, entry) = self.entries.pop_first()?;
        self.index.remove(&entry.flight);
        Some(entry)
    }

    pub fn remove(&mut self, flight: FlightId) -> Option<BacklogEntry> {
        let key = self.index.remove(&flight)?;
        self.entries.remove(&key)
    }

    pub fn contains(&self, flight: FlightId) -> bool {
        self.index.contains_key(&flight)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &BacklogEntry> {
        self.entries.values()
    }
}
