use std::sync::{Arc, Mutex, MutexGuard};

use super::airline::AircraftType;
use super::backlog::{Backlog, BacklogEntry};
use super::events::{Event, EventSink};
use super::flight::{FlightId, FlightRegistry};
use super::runway::{RunwayId, RunwayPool};
use super::sim_error::SimError;

/// What a single dispatch pass did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DispatchReport {
    pub assigned: Vec<(FlightId, RunwayId)>,
    /// Head entry that could not get a runway and stopped the pass.
    pub blocked: Option<FlightId>,
    /// Entries dropped because their flight is gone, faulted or already served.
    pub dropped: Vec<FlightId>,
}

/// Priority-ordered admission of flights to runways.
///
/// Lock order is backlog, then flight, then runway. Callers must not hold a
/// flight lock while calling into the scheduler.
pub struct AdmissionScheduler {
    backlog: Mutex<Backlog>,
    runways: Arc<RunwayPool>,
    flights: FlightRegistry,
    events: EventSink,
    wait_increment_ms: u64,
}

impl AdmissionScheduler {
    /// `wait_increment_ms` is added to the blocked head flight on every
    /// periodic pass; it is normally the scheduler's poll interval.
    pub fn new(
        runways: Arc<RunwayPool>,
        flights: FlightRegistry,
        events: EventSink,
        wait_increment_ms: u64,
    ) -> Self {
        AdmissionScheduler {
            backlog: Mutex::new(Backlog::new()),
            runways,
            flights,
            events,
            wait_increment_ms,
        }
    }

    pub fn runways(&self) -> &Arc<RunwayPool> {
        &self.runways
    }

    fn lock_backlog(&self) -> Result<MutexGuard<'_, Backlog>, SimError> {
        self.backlog
            .lock()
            .map_err(|_| SimError::LockError("Failed to lock the backlog".to_string()))
    }

    /// Adds a flight to the backlog and immediately tries to serve it.
    /// Enqueuing a flight that is already waiting only runs the pass.
    pub fn enqueue(&self, entry: BacklogEntry) -> Result<DispatchReport, SimError> {
        let mut backlog = self.lock_backlog()?;
        backlog.push(entry);
        self.dispatch_locked(&mut backlog, false)
    }

    /// Periodic pass. The blocked head flight, if any, accrues wait time.
    pub fn dispatch(&self) -> Result<DispatchReport, SimError> {
        let mut backlog = self.lock_backlog()?;
        self.dispatch_locked(&mut backlog, true)
    }

    fn dispatch_locked(
        &self,
        backlog: &mut Backlog,
        accrue_wait: bool,
    ) -> Result<DispatchReport, SimError> {
        let mut report = DispatchReport::default();

        while let Some(entry) = backlog.peek().cloned() {
            let shared = match self.flights.get(entry.flight) {
                Some(shared) => shared,
                None => {
                    backlog.remove(entry.flight);
                    report.dropped.push(entry.flight);
                    continue;
                }
            };
            let mut flight = shared.write().map_err(|_| {
                SimError::LockError(format!("Failed to lock flight {}", entry.flight))
            })?;

            if flight.is_faulted() || flight.runway.is_some() {
                backlog.remove(entry.flight);
                report.dropped.push(entry.flight);
                continue;
            }

            match self.acquire_for(&entry) {
                Some((runway, overflow)) => {
                    backlog.remove(entry.flight);
                    flight.runway = Some(runway);
                    report.assigned.push((entry.flight, runway));
                    self.events.emit(Event::RunwayAssigned {
                        flight: entry.flight,
                        runway,
                        runway_name: self.runways.name_of(runway),
                        overflow,
                    });
                }
                None => {
                    if accrue_wait {
                        flight.wait_ms += self.wait_increment_ms;
                    }
                    report.blocked = Some(entry.flight);
                    break;
                }
            }
        }

        Ok(report)
    }

    /// Tries the preferred runway first, then (except for cargo) every other
    /// runway in index order. Returns the runway and whether it is an overflow pick.
    fn acquire_for(&self, entry: &BacklogEntry) -> Option<(RunwayId, bool)> {
        let preferred = self
            .runways
            .preferred_for(entry.aircraft_type, entry.direction);

        if let Some(id) = preferred {
            if self.runways.try_acquire(id) {
                return Some((id, false));
            }
        }
        if entry.aircraft_type == AircraftType::Cargo {
            return None;
        }

        (0..self.runways.len())
            .filter(|id| Some(*id) != preferred)
            .find(|id| self.runways.try_acquire(*id))
            .map(|id| (id, true))
    }

    /// Removes a faulted flight from scheduling: drops its backlog entry and
    /// frees the runway it holds, if any. Returns the freed runway.
    pub fn retire(&self, flight: FlightId) -> Result<Option<RunwayId>, SimError> {
        let mut backlog = self.lock_backlog()?;
        backlog.remove(flight);

        let mut held = None;
        if let Some(shared) = self.flights.get(flight) {
            let mut state = shared
                .write()
                .map_err(|_| SimError::LockError(format!("Failed to lock flight {}", flight)))?;
            held = state.runway.take();
        }
        if let Some(runway) = held {
            self.release(flight, runway);
        }
        Ok(held)
    }

    /// Drops a flight's backlog entry without touching its runway.
    pub fn withdraw(&self, flight: FlightId) -> Result<bool, SimError> {
        Ok(self.lock_backlog()?.remove(flight).is_some())
    }

    /// Frees a runway on behalf of a flight that has already cleared its own
    /// assignment. Releasing a free runway emits nothing.
    pub fn release(&self, flight: FlightId, runway: RunwayId) -> bool {
        let released = self.runways.release(runway);
        if released {
            self.events.emit(Event::RunwayReleased {
                flight,
                runway,
                runway_name: self.runways.name_of(runway),
            });
        }
        released
    }

    pub fn backlog_len(&self) -> usize {
        self.lock_backlog().map(|backlog| backlog.len()).unwrap_or(0)
    }

    /// Waiting flights in dispatch order.
    pub fn pending(&self) -> Vec<FlightId> {
        self.lock_backlog()
            .map(|backlog| backlog.iter().map(|entry| entry.flight).collect())
            .unwrap_or_default()
    }
}
