//! Structured events raised by the engine and the single consumer that turns
//! them into log lines.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ledger::TicketId;
use logger::{Color, Logger};

use super::airline::{AircraftType, AirlineTable, EmergencyType};
use super::flight::{FlightDirection, FlightId, FlightRegistry};
use super::flight_phase::FlightPhase;
use super::runway::{RunwayId, RunwayPool, RunwayState};
use super::sim_error::SimError;

/// Dashboard counts at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub active_flights: usize,
    pub in_air: usize,
    pub on_ground: usize,
    pub emergency_count: usize,
    pub open_violations: usize,
    pub backlog_len: usize,
    pub runways: Vec<RunwayState>,
    pub per_airline: BTreeMap<String, usize>,
    pub per_phase: BTreeMap<FlightPhase, usize>,
}

impl Snapshot {
    /// Counts active flights only; departed and faulted flights are left out.
    pub fn collect(
        flights: &FlightRegistry,
        airlines: &AirlineTable,
        runways: &RunwayPool,
        backlog_len: usize,
    ) -> Snapshot {
        let mut snapshot = Snapshot {
            runways: runways.states(),
            backlog_len,
            ..Snapshot::default()
        };

        for flight in flights.collect().iter().filter(|flight| flight.is_active()) {
            snapshot.active_flights += 1;
            if flight.phase.is_airborne() {
                snapshot.in_air += 1;
            } else {
                snapshot.on_ground += 1;
            }
            if flight.emergency != EmergencyType::None {
                snapshot.emergency_count += 1;
            }
            if flight.has_open_violation() {
                snapshot.open_violations += 1;
            }
            *snapshot
                .per_airline
                .entry(airlines.name_of(flight.airline).to_string())
                .or_insert(0) += 1;
            *snapshot.per_phase.entry(flight.phase).or_insert(0) += 1;
        }

        snapshot
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ATC dashboard: {} active ({} in air, {} on ground), {} emergency, {} open violations, {} waiting",
            self.active_flights,
            self.in_air,
            self.on_ground,
            self.emergency_count,
            self.open_violations,
            self.backlog_len
        )?;
        for runway in &self.runways {
            write!(
                f,
                " | {}: {}",
                runway.name,
                if runway.occupied { "OCCUPIED" } else { "AVAILABLE" }
            )?;
        }
        for (airline, count) in &self.per_airline {
            write!(f, " | {}: {} flights", airline, count)?;
        }
        for (phase, count) in &self.per_phase {
            write!(f, " | {}: {}", phase, count)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    FlightCreated {
        flight: FlightId,
        airline: String,
        aircraft_type: AircraftType,
        direction: FlightDirection,
        emergency: EmergencyType,
        priority: u8,
    },
    PhaseTransition {
        flight: FlightId,
        from: FlightPhase,
        to: FlightPhase,
        speed: f32,
    },
    ViolationOpened {
        flight: FlightId,
        phase: FlightPhase,
        speed: f32,
        limit: f32,
        reason: String,
        ticket: Option<TicketId>,
    },
    /// The ledger refused to record a ticket; the violation stays open without one.
    LedgerUnavailable {
        flight: FlightId,
        reason: String,
    },
    RunwayAssigned {
        flight: FlightId,
        runway: RunwayId,
        runway_name: String,
        overflow: bool,
    },
    RunwayReleased {
        flight: FlightId,
        runway: RunwayId,
        runway_name: String,
    },
    FaultDetected {
        flight: FlightId,
        description: String,
    },
    FlightDeparted {
        flight: FlightId,
    },
    PeriodicSnapshot(Snapshot),
    SimulationCompleted {
        elapsed: Duration,
    },
    Warning {
        message: String,
    },
}

impl Event {
    /// Flight the event belongs to, if any.
    pub fn flight(&self) -> Option<FlightId> {
        match self {
            Event::FlightCreated { flight, .. }
            | Event::PhaseTransition { flight, .. }
            | Event::ViolationOpened { flight, .. }
            | Event::LedgerUnavailable { flight, .. }
            | Event::RunwayAssigned { flight, .. }
            | Event::RunwayReleased { flight, .. }
            | Event::FaultDetected { flight, .. }
            | Event::FlightDeparted { flight } => Some(*flight),
            Event::PeriodicSnapshot(_)
            | Event::SimulationCompleted { .. }
            | Event::Warning { .. } => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::FlightCreated {
                flight,
                airline,
                aircraft_type,
                direction,
                emergency,
                priority,
            } => {
                write!(
                    f,
                    "New flight #{} ({}) {} {}, priority {}",
                    flight, airline, aircraft_type, direction, priority
                )?;
                if *emergency != EmergencyType::None {
                    write!(f, ", emergency: {}", emergency)?;
                }
                Ok(())
            }
            Event::PhaseTransition {
                flight,
                from,
                to,
                speed,
            } => write!(
                f,
                "Flight #{}: {} -> {} at {:.0} km/h",
                flight, from, to, speed
            ),
            Event::ViolationOpened {
                flight,
                phase,
                speed,
                limit,
                reason,
                ticket,
            } => {
                write!(
                    f,
                    "Speed violation: flight #{} in {} at {:.0} km/h (limit {:.0} km/h): {}",
                    flight, phase, speed, limit, reason
                )?;
                match ticket {
                    Some(ticket) => write!(f, ", ticket #{}", ticket),
                    None => write!(f, ", no ticket issued"),
                }
            }
            Event::LedgerUnavailable { flight, reason } => write!(
                f,
                "Could not record a ticket for flight #{}: {}",
                flight, reason
            ),
            Event::RunwayAssigned {
                flight,
                runway_name,
                overflow,
                ..
            } => {
                write!(f, "Flight #{} assigned {}", flight, runway_name)?;
                if *overflow {
                    write!(f, " (overflow)")?;
                }
                Ok(())
            }
            Event::RunwayReleased {
                flight,
                runway_name,
                ..
            } => write!(f, "Flight #{} released {}", flight, runway_name),
            Event::FaultDetected {
                flight,
                description,
            } => write!(
                f,
                "Ground fault on flight #{}: {}. Aircraft being towed to maintenance",
                flight, description
            ),
            Event::FlightDeparted { flight } => {
                write!(f, "Flight #{} departed from airspace", flight)
            }
            Event::PeriodicSnapshot(snapshot) => write!(f, "{}", snapshot),
            Event::SimulationCompleted { elapsed } => write!(
                f,
                "Simulation completed after {} seconds",
                elapsed.as_secs()
            ),
            Event::Warning { message } => write!(f, "{}", message),
        }
    }
}

/// Producer side of the event channel. Cheap to clone; every thread keeps its own.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: Sender<Event>,
}

impl EventSink {
    pub fn channel() -> (EventSink, Receiver<Event>) {
        let (sender, receiver) = mpsc::channel();
        (EventSink { sender }, receiver)
    }

    /// Never blocks. Events sent after the consumer is gone are dropped.
    pub fn emit(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(Event::Warning {
            message: message.into(),
        });
    }
}

/// Consumer of the event channel: writes every event through the logger until
/// `SimulationCompleted` arrives or every producer is gone.
pub struct EventLogger;

impl EventLogger {
    pub fn spawn(receiver: Receiver<Event>, logger: Logger) -> Result<JoinHandle<()>, SimError> {
        thread::Builder::new()
            .name("event-logger".to_string())
            .spawn(move || {
                let mut reported_failure = false;
                for event in receiver {
                    if let Err(e) = Self::write(&logger, &event) {
                        if !reported_failure {
                            eprintln!("Failed to write to the log: {}", e);
                            reported_failure = true;
                        }
                    }
                    if matches!(event, Event::SimulationCompleted { .. }) {
                        break;
                    }
                }
            })
            .map_err(|_| SimError::ThreadStartError("Failed to start the event logger.".to_string()))
    }

    fn write(logger: &Logger, event: &Event) -> Result<(), logger::LoggerError> {
        let message = event.to_string();
        match event {
            Event::FlightCreated { .. } => logger.info(&message, Color::Blue),
            Event::PhaseTransition { .. } => logger.debug(&message),
            Event::ViolationOpened { .. } => logger.info(&message, Color::Red),
            Event::RunwayAssigned { .. } => logger.info(&message, Color::Green),
            Event::RunwayReleased { .. } => logger.info(&message, Color::White),
            Event::FaultDetected { .. } => logger.info(&message, Color::Magenta),
            Event::FlightDeparted { .. } => logger.info(&message, Color::Yellow),
            Event::PeriodicSnapshot(_) | Event::SimulationCompleted { .. } => {
                logger.info(&message, Color::Cyan)
            }
            Event::LedgerUnavailable { .. } | Event::Warning { .. } => logger.warn(&message),
        }
    }
}
