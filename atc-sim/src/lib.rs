//! Concurrent air-traffic control engine.
//!
//! Flights arrive on per-direction schedules, move through their phases on
//! their own actor threads and compete for a small set of exclusive runways.
//! Runways are handed out by a priority-ordered admission scheduler, speed
//! breaches are ticketed through a [`ledger::ViolationLedger`], and ground
//! faults take flights out of service. Everything observable is published as
//! [`Event`]s on a single channel.

pub mod types;

pub use types::airline::{AircraftType, Airline, AirlineId, AirlineTable, EmergencyType};
pub use types::arrival::{ArrivalGenerator, FlightSchedule};
pub use types::config::SimConfig;
pub use types::events::{Event, EventSink, Snapshot};
pub use types::flight::{Flight, FlightDirection, FlightId};
pub use types::flight_phase::FlightPhase;
pub use types::runway::{RunwayPool, RunwayRole};
pub use types::sim_error::SimError;
pub use types::simulation::{Simulation, SimulationBuilder};
