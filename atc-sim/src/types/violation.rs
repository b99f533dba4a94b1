//! Speed-envelope checks and the fines attached to a breach.

use chrono::{DateTime, Duration, Utc};
use ledger::TicketRequest;

use super::airline::AircraftType;
use super::flight::{Flight, FlightId};
use super::flight_phase::FlightPhase;

pub const FINE_SURCHARGE: f64 = 0.15;
pub const PAYMENT_WINDOW_HOURS: i64 = 72;

/// Permissible speed range of a phase, in km/h.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedEnvelope {
    pub min: Option<f32>,
    pub max: f32,
    pub reason: &'static str,
}

impl SpeedEnvelope {
    /// Envelope of a phase. Departure has none.
    pub fn for_phase(phase: FlightPhase) -> Option<SpeedEnvelope> {
        let (min, max, reason) = match phase {
            FlightPhase::Holding => (
                Some(400.0),
                600.0,
                "Speed outside holding range (400-600 km/h)",
            ),
            FlightPhase::Approach => (
                Some(240.0),
                290.0,
                "Speed outside approach range (240-290 km/h)",
            ),
            FlightPhase::Landing => (None, 240.0, "Exceeded landing speed limit (240 km/h)"),
            FlightPhase::Taxi => (Some(15.0), 30.0, "Speed outside taxi range (15-30 km/h)"),
            FlightPhase::AtGate => (None, 5.0, "Exceeded gate speed limit (5 km/h)"),
            FlightPhase::TakeoffRoll => (
                None,
                290.0,
                "Exceeded takeoff roll speed limit (290 km/h)",
            ),
            FlightPhase::Climb => (
                Some(250.0),
                463.0,
                "Speed outside climb range (250-463 km/h)",
            ),
            FlightPhase::Cruise => (
                Some(800.0),
                900.0,
                "Speed outside cruise range (800-900 km/h)",
            ),
            FlightPhase::Departure => return None,
        };
        Some(SpeedEnvelope { min, max, reason })
    }

    pub fn permits(&self, speed: f32) -> bool {
        speed <= self.max && self.min.map_or(true, |min| speed >= min)
    }
}

/// A detected breach of a phase's speed envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub flight: FlightId,
    pub phase: FlightPhase,
    pub speed: f32,
    /// Upper bound of the envelope.
    pub limit: f32,
    pub reason: String,
}

/// Verdict for a speed in a phase: `Some((limit, reason))` when outside the envelope.
pub fn check_speed(phase: FlightPhase, speed: f32) -> Option<(f32, &'static str)> {
    let envelope = SpeedEnvelope::for_phase(phase)?;
    if envelope.permits(speed) {
        None
    } else {
        Some((envelope.max, envelope.reason))
    }
}

/// Opens a violation on the flight if its current speed breaches the envelope
/// and no violation is open yet. The open flag is never cleared, so a flight
/// gets at most one violation in its lifetime.
pub fn inspect(flight: &mut Flight) -> Option<Violation> {
    if flight.has_open_violation() {
        return None;
    }
    let (limit, reason) = check_speed(flight.phase, flight.speed)?;
    flight.violation = Some(reason.to_string());
    Some(Violation {
        flight: flight.number,
        phase: flight.phase,
        speed: flight.speed,
        limit,
        reason: reason.to_string(),
    })
}

/// Base fine by aircraft category, before the surcharge.
pub fn base_fine(aircraft_type: AircraftType) -> f64 {
    match aircraft_type {
        AircraftType::Commercial | AircraftType::Emergency => 500_000.0,
        AircraftType::Cargo => 700_000.0,
    }
}

pub fn fine_for(aircraft_type: AircraftType) -> f64 {
    base_fine(aircraft_type) * (1.0 + FINE_SURCHARGE)
}

/// Builds the ledger request for a violation issued at `issued_at`.
pub fn ticket_request(
    violation: &Violation,
    airline: &str,
    aircraft_type: AircraftType,
    issued_at: DateTime<Utc>,
) -> TicketRequest {
    TicketRequest {
        flight_number: violation.flight,
        airline: airline.to_string(),
        aircraft_type: aircraft_type.as_str().to_string(),
        recorded_speed: violation.speed,
        permissible_speed: violation.limit,
        fine: fine_for(aircraft_type),
        issued_at,
        due_at: issued_at + Duration::hours(PAYMENT_WINDOW_HOURS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::airline::{Airline, AirlineId, EmergencyType};
    use crate::types::flight::FlightDirection;

    fn commercial_flight() -> Flight {
        Flight::new(
            1000,
            AirlineId(0),
            &Airline::new("PIA", AircraftType::Commercial, 6, 4),
            FlightDirection::NorthArrival,
            EmergencyType::None,
            Utc::now(),
        )
    }

    #[test]
    fn test_envelope_bounds() {
        assert_eq!(check_speed(FlightPhase::Holding, 400.0), None);
        assert_eq!(check_speed(FlightPhase::Holding, 600.0), None);
        assert_eq!(
            check_speed(FlightPhase::Holding, 399.0),
            Some((600.0, "Speed outside holding range (400-600 km/h)"))
        );
        assert_eq!(check_speed(FlightPhase::Landing, 30.0), None);
        assert!(check_speed(FlightPhase::Landing, 240.5).is_some());
        assert!(check_speed(FlightPhase::Taxi, 14.0).is_some());
        assert_eq!(check_speed(FlightPhase::AtGate, 0.0), None);
        assert_eq!(
            check_speed(FlightPhase::AtGate, 6.0).map(|(limit, _)| limit),
            Some(5.0)
        );
        assert!(check_speed(FlightPhase::Climb, 464.0).is_some());
        assert!(check_speed(FlightPhase::Cruise, 799.0).is_some());
        assert_eq!(check_speed(FlightPhase::Departure, 10_000.0), None);
    }

    #[test]
    fn test_landing_breach_opens_one_violation() {
        let mut flight = commercial_flight();
        flight.phase = FlightPhase::Landing;
        flight.speed = 250.0;

        let violation = inspect(&mut flight).expect("landing at 250 km/h must breach");
        assert_eq!(violation.limit, 240.0);
        assert_eq!(violation.reason, "Exceeded landing speed limit (240 km/h)");
        assert!(flight.has_open_violation());

        assert_eq!(inspect(&mut flight), None);
        flight.phase = FlightPhase::Cruise;
        flight.speed = 1_000.0;
        assert_eq!(inspect(&mut flight), None);
    }

    #[test]
    fn test_compliant_speed_leaves_flag_closed() {
        let mut flight = commercial_flight();
        flight.phase = FlightPhase::Approach;
        flight.speed = 290.0;
        assert_eq!(inspect(&mut flight), None);
        assert!(!flight.has_open_violation());
    }

    #[test]
    fn test_fines_include_surcharge() {
        assert!((fine_for(AircraftType::Commercial) - 575_000.0).abs() < 1e-6);
        assert!((fine_for(AircraftType::Emergency) - 575_000.0).abs() < 1e-6);
        assert!((fine_for(AircraftType::Cargo) - 805_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_ticket_request_is_due_in_three_days() {
        let issued_at = Utc::now();
        let violation = Violation {
            flight: 1003,
            phase: FlightPhase::Landing,
            speed: 250.0,
            limit: 240.0,
            reason: "Exceeded landing speed limit (240 km/h)".to_string(),
        };

        let request = ticket_request(&violation, "FedEx Cargo", AircraftType::Cargo, issued_at);
        assert_eq!(request.flight_number, 1003);
        assert_eq!(request.aircraft_type, "Cargo");
        assert_eq!(request.permissible_speed, 240.0);
        assert_eq!(request.due_at - request.issued_at, Duration::hours(72));
    }
}
