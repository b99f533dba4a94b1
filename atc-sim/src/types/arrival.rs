use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;

use super::airline::{AirlineTable, EmergencyType};
use super::flight::{Flight, FlightDirection, FlightId};

/// First flight number handed out by a generator.
pub const FIRST_FLIGHT_NUMBER: FlightId = 1000;

/// Traffic pattern of one direction.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightSchedule {
    pub direction: FlightDirection,
    pub interval: Duration,
    /// Chance, per slot, that the flight is an emergency.
    pub emergency_probability: f64,
    /// Subtype given to emergency draws.
    pub emergency: EmergencyType,
}

impl FlightSchedule {
    pub fn new(
        direction: FlightDirection,
        interval: Duration,
        emergency_probability: f64,
        emergency: EmergencyType,
    ) -> Self {
        FlightSchedule {
            direction,
            interval,
            emergency_probability: emergency_probability.clamp(0.0, 1.0),
            emergency,
        }
    }

    /// One schedule per direction, as flown at the reference airport.
    pub fn reference_schedules() -> Vec<FlightSchedule> {
        vec![
            FlightSchedule::new(
                FlightDirection::NorthArrival,
                Duration::from_secs(180),
                0.10,
                EmergencyType::DiversionOrLowFuel,
            ),
            FlightSchedule::new(
                FlightDirection::SouthArrival,
                Duration::from_secs(120),
                0.05,
                EmergencyType::Medical,
            ),
            FlightSchedule::new(
                FlightDirection::EastDeparture,
                Duration::from_secs(150),
                0.15,
                EmergencyType::Military,
            ),
            FlightSchedule::new(
                FlightDirection::WestDeparture,
                Duration::from_secs(240),
                0.20,
                EmergencyType::Vip,
            ),
        ]
    }
}

struct Slot {
    schedule: FlightSchedule,
    interval: Duration,
    next_due: Instant,
}

/// Produces new flights as each direction's schedule comes due.
pub struct ArrivalGenerator<R: Rng> {
    airlines: Arc<AirlineTable>,
    slots: Vec<Slot>,
    next_number: FlightId,
    rng: R,
}

impl<R: Rng> ArrivalGenerator<R> {
    /// Every schedule is due at `start`. Intervals are multiplied by `interval_scale`.
    pub fn new(
        airlines: Arc<AirlineTable>,
        schedules: Vec<FlightSchedule>,
        interval_scale: f64,
        start: Instant,
        rng: R,
    ) -> Self {
        let slots = schedules
            .into_iter()
            .map(|schedule| Slot {
                interval: schedule.interval.mul_f64(interval_scale),
                schedule,
                next_due: start,
            })
            .collect();
        ArrivalGenerator {
            airlines,
            slots,
            next_number: FIRST_FLIGHT_NUMBER,
            rng,
        }
    }

    /// Flights produced so far.
    pub fn generated(&self) -> u32 {
        self.next_number - FIRST_FLIGHT_NUMBER
    }

    /// Runs every schedule that is due at `now` and returns the new flights,
    /// in schedule order. A due schedule is pushed back by its interval
    /// whether or not it produced a flight.
    pub fn tick(&mut self, now: Instant) -> Vec<Flight> {
        let mut flights = Vec::new();
        for index in 0..self.slots.len() {
            if now < self.slots[index].next_due {
                continue;
            }
            if let Some(flight) = self.generate(index) {
                flights.push(flight);
            }
            let slot = &mut self.slots[index];
            slot.next_due = now + slot.interval;
        }
        flights
    }

    fn generate(&mut self, index: usize) -> Option<Flight> {
        let schedule = &self.slots[index].schedule;
        let emergency = if self.rng.gen::<f64>() < schedule.emergency_probability {
            Some(schedule.emergency)
        } else {
            None
        };
        let direction = schedule.direction;

        let candidates = self.airlines.candidates(emergency);
        let airline_id = *candidates.choose(&mut self.rng)?;
        let airline = self.airlines.get(airline_id)?;

        let number = self.next_number;
        self.next_number += 1;
        Some(Flight::new(
            number,
            airline_id,
            airline,
            direction,
            emergency.unwrap_or(EmergencyType::None),
            Utc::now(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::airline::{AircraftType, Airline};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generator(schedules: Vec<FlightSchedule>, start: Instant) -> ArrivalGenerator<StdRng> {
        ArrivalGenerator::new(
            Arc::new(AirlineTable::default()),
            schedules,
            1.0,
            start,
            StdRng::seed_from_u64(17),
        )
    }

    #[test]
    fn test_reference_schedules_fire_at_start() {
        let t0 = Instant::now();
        let mut generator = generator(FlightSchedule::reference_schedules(), t0);

        let flights = generator.tick(t0);
        assert_eq!(flights.len(), 4);
        let numbers: Vec<FlightId> = flights.iter().map(|flight| flight.number).collect();
        assert_eq!(numbers, vec![1000, 1001, 1002, 1003]);
        assert_eq!(flights[0].direction, FlightDirection::NorthArrival);
        assert_eq!(flights[3].direction, FlightDirection::WestDeparture);

        assert!(generator.tick(t0 + Duration::from_secs(1)).is_empty());
        let south = generator.tick(t0 + Duration::from_secs(120));
        assert_eq!(south.len(), 1);
        assert_eq!(south[0].direction, FlightDirection::SouthArrival);
        assert_eq!(south[0].number, 1004);
        assert_eq!(generator.generated(), 5);
    }

    #[test]
    fn test_certain_military_emergency() {
        let t0 = Instant::now();
        let schedule = FlightSchedule::new(
            FlightDirection::EastDeparture,
            Duration::from_secs(1),
            1.0,
            EmergencyType::Military,
        );
        let mut generator = generator(vec![schedule], t0);
        let airlines = AirlineTable::default();
        let airforce = airlines.find("Pakistan Airforce").unwrap();

        for second in 0..20 {
            let flights = generator.tick(t0 + Duration::from_secs(second));
            assert_eq!(flights.len(), 1);
            assert_eq!(flights[0].airline, airforce);
            assert_eq!(flights[0].emergency, EmergencyType::Military);
            assert_eq!(flights[0].priority(), 1);
        }
    }

    #[test]
    fn test_regular_slots_skip_emergency_operators() {
        let t0 = Instant::now();
        let schedule = FlightSchedule::new(
            FlightDirection::NorthArrival,
            Duration::from_secs(1),
            0.0,
            EmergencyType::Medical,
        );
        let mut generator = generator(vec![schedule], t0);

        for second in 0..50 {
            for flight in generator.tick(t0 + Duration::from_secs(second)) {
                assert_ne!(flight.aircraft_type, AircraftType::Emergency);
                assert_eq!(flight.emergency, EmergencyType::None);
            }
        }
    }

    #[test]
    fn test_empty_candidate_set_skips_slot() {
        let t0 = Instant::now();
        let airlines = Arc::new(AirlineTable::new(vec![Airline::new(
            "PIA",
            AircraftType::Commercial,
            6,
            4,
        )]));
        let schedule = FlightSchedule::new(
            FlightDirection::SouthArrival,
            Duration::from_secs(10),
            1.0,
            EmergencyType::Medical,
        );
        let mut generator =
            ArrivalGenerator::new(airlines, vec![schedule], 1.0, t0, StdRng::seed_from_u64(1));

        assert!(generator.tick(t0).is_empty());
        assert!(generator.tick(t0 + Duration::from_secs(5)).is_empty());
        assert!(generator.tick(t0 + Duration::from_secs(10)).is_empty());
        assert_eq!(generator.generated(), 0);
    }

    #[test]
    fn test_interval_scale() {
        let t0 = Instant::now();
        let mut generator = ArrivalGenerator::new(
            Arc::new(AirlineTable::default()),
            FlightSchedule::reference_schedules(),
            0.01,
            t0,
            StdRng::seed_from_u64(4),
        );
        assert_eq!(generator.tick(t0).len(), 4);
        let later = generator.tick(t0 + Duration::from_millis(1_300));
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].direction, FlightDirection::SouthArrival);
    }
}
