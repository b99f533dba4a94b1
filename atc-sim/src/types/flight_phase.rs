use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::sim_error::SimError;

/// Operational phases a flight goes through, in lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FlightPhase {
    Holding,
    Approach,
    Landing,
    Taxi,
    AtGate,
    TakeoffRoll,
    Climb,
    Cruise,
    Departure,
}

impl FlightPhase {
    pub const ALL: [FlightPhase; 9] = [
        FlightPhase::Holding,
        FlightPhase::Approach,
        FlightPhase::Landing,
        FlightPhase::Taxi,
        FlightPhase::AtGate,
        FlightPhase::TakeoffRoll,
        FlightPhase::Climb,
        FlightPhase::Cruise,
        FlightPhase::Departure,
    ];

    /// Converts the `FlightPhase` variant to its corresponding string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightPhase::Holding => "Holding",
            FlightPhase::Approach => "Approach",
            FlightPhase::Landing => "Landing",
            FlightPhase::Taxi => "Taxi",
            FlightPhase::AtGate => "At Gate",
            FlightPhase::TakeoffRoll => "Takeoff Roll",
            FlightPhase::Climb => "Climb",
            FlightPhase::Cruise => "Cruise",
            FlightPhase::Departure => "Departure",
        }
    }

    /// Minimum time spent in the phase before the automatic transition.
    ///
    /// `None` for Departure (terminal). The Taxi value applies to the inbound
    /// taxi only; outbound taxi ends when a runway is granted.
    pub fn dwell(&self) -> Option<Duration> {
        let seconds = match self {
            FlightPhase::Holding => 10,
            FlightPhase::Approach => 8,
            FlightPhase::Landing => 6,
            FlightPhase::Taxi => 5,
            FlightPhase::AtGate => 5,
            FlightPhase::TakeoffRoll => 3,
            FlightPhase::Climb => 4,
            FlightPhase::Cruise => 10,
            FlightPhase::Departure => return None,
        };
        Some(Duration::from_secs(seconds))
    }

    pub fn is_airborne(&self) -> bool {
        matches!(
            self,
            FlightPhase::Holding
                | FlightPhase::Approach
                | FlightPhase::Landing
                | FlightPhase::Climb
                | FlightPhase::Cruise
        )
    }

    /// Phases in which ground faults can happen.
    pub fn is_ground_handling(&self) -> bool {
        matches!(self, FlightPhase::Taxi | FlightPhase::AtGate)
    }
}

impl fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlightPhase {
    type Err = SimError;

    fn from_str(phase: &str) -> Result<Self, Self::Err> {
        let normalized: String = phase
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "holding" => Ok(FlightPhase::Holding),
            "approach" => Ok(FlightPhase::Approach),
            "landing" => Ok(FlightPhase::Landing),
            "taxi" => Ok(FlightPhase::Taxi),
            "atgate" => Ok(FlightPhase::AtGate),
            "takeoffroll" => Ok(FlightPhase::TakeoffRoll),
            "climb" => Ok(FlightPhase::Climb),
            "cruise" => Ok(FlightPhase::Cruise),
            "departure" => Ok(FlightPhase::Departure),
            _ => Err(SimError::InvalidPhase(phase.to_string())),
        }
    }
}
