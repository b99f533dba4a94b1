use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use ledger::TicketId;

use super::airline::{AircraftType, Airline, AirlineId, EmergencyType};
use super::flight_phase::FlightPhase;
use super::runway::RunwayId;
use super::sim_error::SimError;

pub type FlightId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlightDirection {
    NorthArrival,
    SouthArrival,
    EastDeparture,
    WestDeparture,
}

impl FlightDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightDirection::NorthArrival => "North Arrival",
            FlightDirection::SouthArrival => "South Arrival",
            FlightDirection::EastDeparture => "East Departure",
            FlightDirection::WestDeparture => "West Departure",
        }
    }

    pub fn is_departure(&self) -> bool {
        matches!(
            self,
            FlightDirection::EastDeparture | FlightDirection::WestDeparture
        )
    }
}

impl fmt::Display for FlightDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority level of a flight: 1 is served first, 4 last.
pub fn priority_level(aircraft_type: AircraftType, emergency: EmergencyType) -> u8 {
    if aircraft_type == AircraftType::Emergency {
        1
    } else if emergency == EmergencyType::Vip {
        2
    } else if aircraft_type == AircraftType::Cargo {
        3
    } else {
        4
    }
}

/// A flight in the controlled airspace.
///
/// Mutated by its own actor, except `runway` and `wait_ms`, which the
/// admission scheduler writes when it dispatches the flight.
#[derive(Debug, Clone)]
pub struct Flight {
    pub number: FlightId,
    pub airline: AirlineId,
    pub aircraft_type: AircraftType,
    pub emergency: EmergencyType,
    pub direction: FlightDirection,
    pub phase: FlightPhase,
    /// km/h
    pub speed: f32,
    priority: u8,
    pub scheduled_at: DateTime<Utc>,
    pub runway: Option<RunwayId>,
    /// Set once the flight has left the gate on a departure.
    pub outbound: bool,
    /// Reason of the open violation, if any.
    pub violation: Option<String>,
    /// Description of the ground fault that grounded the flight, if any.
    pub fault: Option<String>,
    /// Time spent blocked at the head of the backlog, in milliseconds.
    pub wait_ms: u64,
    pub tickets: Vec<TicketId>,
}

impl Flight {
    /// Creates a flight in the Holding phase. The aircraft category comes
    /// from the operating airline.
    pub fn new(
        number: FlightId,
        airline_id: AirlineId,
        airline: &Airline,
        direction: FlightDirection,
        emergency: EmergencyType,
        scheduled_at: DateTime<Utc>,
    ) -> Self {
        Flight {
            number,
            airline: airline_id,
            aircraft_type: airline.aircraft_type,
            emergency,
            direction,
            phase: FlightPhase::Holding,
            speed: 0.0,
            priority: priority_level(airline.aircraft_type, emergency),
            scheduled_at,
            runway: None,
            outbound: false,
            violation: None,
            fault: None,
            wait_ms: 0,
            tickets: Vec::new(),
        }
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn has_open_violation(&self) -> bool {
        self.violation.is_some()
    }

    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

    /// A flight is active until it leaves the airspace or is towed away.
    pub fn is_active(&self) -> bool {
        !self.is_faulted() && self.phase != FlightPhase::Departure
    }
}

pub type SharedFlight = Arc<RwLock<Flight>>;

/// Every flight the simulation has created, keyed by number.
#[derive(Clone, Default)]
pub struct FlightRegistry {
    flights: Arc<RwLock<HashMap<FlightId, SharedFlight>>>,
}

impl FlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, flight: Flight) -> Result<SharedFlight, SimError> {
        let number = flight.number;
        let shared = Arc::new(RwLock::new(flight));
        self.flights
            .write()
            .map_err(|_| SimError::LockError("Failed to lock flights".to_string()))?
            .insert(number, Arc::clone(&shared));
        Ok(shared)
    }

    pub fn get(&self, number: FlightId) -> Option<SharedFlight> {
        self.flights.read().ok()?.get(&number).cloned()
    }

    /// Copies of every flight, in flight-number order.
    pub fn collect(&self) -> Vec<Flight> {
        let shared: Vec<SharedFlight> = match self.flights.read() {
            Ok(flights) => flights.values().cloned().collect(),
            Err(_) => return Vec::new(),
        };
        let mut flights: Vec<Flight> = shared
            .iter()
            .filter_map(|flight| flight.read().ok().map(|flight| flight.clone()))
            .collect();
        flights.sort_by_key(|flight| flight.number);
        flights
    }

    pub fn len(&self) -> usize {
        self.flights.read().map(|flights| flights.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airline(aircraft_type: AircraftType) -> Airline {
        Airline::new("Test Air", aircraft_type, 1, 1)
    }

    #[test]
    fn test_priority_levels() {
        assert_eq!(priority_level(AircraftType::Emergency, EmergencyType::Military), 1);
        assert_eq!(priority_level(AircraftType::Emergency, EmergencyType::Vip), 1);
        assert_eq!(priority_level(AircraftType::Commercial, EmergencyType::Vip), 2);
        assert_eq!(priority_level(AircraftType::Cargo, EmergencyType::None), 3);
        assert_eq!(priority_level(AircraftType::Commercial, EmergencyType::None), 4);
    }

    #[test]
    fn test_new_flight_starts_in_holding() {
        let flight = Flight::new(
            1000,
            AirlineId(2),
            &airline(AircraftType::Cargo),
            FlightDirection::NorthArrival,
            EmergencyType::None,
            Utc::now(),
        );

        assert_eq!(flight.phase, FlightPhase::Holding);
        assert_eq!(flight.aircraft_type, AircraftType::Cargo);
        assert_eq!(flight.priority(), 3);
        assert!(flight.runway.is_none());
        assert!(flight.is_active());
    }

    #[test]
    fn test_faulted_and_departed_flights_are_inactive() {
        let mut flight = Flight::new(
            1001,
            AirlineId(0),
            &airline(AircraftType::Commercial),
            FlightDirection::EastDeparture,
            EmergencyType::None,
            Utc::now(),
        );
        flight.fault = Some("Brake failure".to_string());
        assert!(!flight.is_active());

        flight.fault = None;
        flight.phase = FlightPhase::Departure;
        assert!(!flight.is_active());
    }

    #[test]
    fn test_registry_collects_in_number_order() {
        let registry = FlightRegistry::new();
        for number in [1002, 1000, 1001] {
            registry
                .insert(Flight::new(
                    number,
                    AirlineId(0),
                    &airline(AircraftType::Commercial),
                    FlightDirection::SouthArrival,
                    EmergencyType::None,
                    Utc::now(),
                ))
                .unwrap();
        }

        let numbers: Vec<FlightId> = registry.collect().iter().map(|f| f.number).collect();
        assert_eq!(numbers, vec![1000, 1001, 1002]);
        assert!(registry.get(1001).is_some());
        assert!(registry.get(999).is_none());
    }
}
