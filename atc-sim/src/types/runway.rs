use std::sync::{Mutex, MutexGuard};

use super::airline::AircraftType;
use super::flight::FlightDirection;

pub type RunwayId = usize;

/// Traffic a runway is primarily meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunwayRole {
    Arrivals,
    Departures,
    /// Cargo, emergencies and overflow from the other runways.
    Overflow,
}

/// An exclusive runway. Occupancy only changes through `try_acquire` and `release`.
#[derive(Debug)]
pub struct Runway {
    pub id: RunwayId,
    pub name: String,
    pub role: RunwayRole,
    occupied: Mutex<bool>,
}

impl Runway {
    pub fn new(id: RunwayId, name: &str, role: RunwayRole) -> Self {
        Runway {
            id,
            name: name.to_string(),
            role,
            occupied: Mutex::new(false),
        }
    }

    // A bool cannot be left half-written, so a poisoned lock is still usable.
    fn occupancy(&self) -> MutexGuard<'_, bool> {
        self.occupied
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Marks the runway occupied iff it is currently free.
    pub fn try_acquire(&self) -> bool {
        let mut occupied = self.occupancy();
        if *occupied {
            return false;
        }
        *occupied = true;
        true
    }

    /// Frees the runway. Returns whether it was occupied.
    pub fn release(&self) -> bool {
        let mut occupied = self.occupancy();
        let was_occupied = *occupied;
        *occupied = false;
        was_occupied
    }

    pub fn is_occupied(&self) -> bool {
        *self.occupancy()
    }
}

/// Point-in-time view of a runway.
#[derive(Debug, Clone, PartialEq)]
pub struct RunwayState {
    pub id: RunwayId,
    pub name: String,
    pub occupied: bool,
}

/// Fixed set of runways. Holds no admission policy of its own.
#[derive(Debug)]
pub struct RunwayPool {
    runways: Vec<Runway>,
}

impl RunwayPool {
    /// Builds a pool from `(name, role)` pairs; ids follow the given order.
    pub fn new(runways: Vec<(&str, RunwayRole)>) -> Self {
        RunwayPool {
            runways: runways
                .into_iter()
                .enumerate()
                .map(|(id, (name, role))| Runway::new(id, name, role))
                .collect(),
        }
    }

    /// The three runways of the reference airport.
    pub fn reference() -> Self {
        RunwayPool::new(vec![
            ("RWY-A (North-South Arrivals)", RunwayRole::Arrivals),
            ("RWY-B (East-West Departures)", RunwayRole::Departures),
            ("RWY-C (Cargo/Emergency/Overflow)", RunwayRole::Overflow),
        ])
    }

    pub fn len(&self) -> usize {
        self.runways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runways.is_empty()
    }

    pub fn get(&self, id: RunwayId) -> Option<&Runway> {
        self.runways.get(id)
    }

    pub fn name_of(&self, id: RunwayId) -> String {
        self.get(id)
            .map_or_else(|| format!("RWY-{}", id), |runway| runway.name.clone())
    }

    /// Non-blocking acquire. An unknown id is never acquired.
    pub fn try_acquire(&self, id: RunwayId) -> bool {
        self.get(id).is_some_and(Runway::try_acquire)
    }

    /// Frees a runway. Unknown ids and free runways are left as they are.
    /// Returns whether the call actually freed something.
    pub fn release(&self, id: RunwayId) -> bool {
        self.get(id).is_some_and(Runway::release)
    }

    pub fn is_occupied(&self, id: RunwayId) -> bool {
        self.get(id).is_some_and(Runway::is_occupied)
    }

    /// Runway a flight asks for first: cargo and emergency traffic use the
    /// overflow runway, everything else the runway of its direction.
    pub fn preferred_for(
        &self,
        aircraft_type: AircraftType,
        direction: FlightDirection,
    ) -> Option<RunwayId> {
        let role = match aircraft_type {
            AircraftType::Cargo | AircraftType::Emergency => RunwayRole::Overflow,
            AircraftType::Commercial if direction.is_departure() => RunwayRole::Departures,
            AircraftType::Commercial => RunwayRole::Arrivals,
        };
        self.runways
            .iter()
            .find(|runway| runway.role == role)
            .map(|runway| runway.id)
    }

    pub fn states(&self) -> Vec<RunwayState> {
        self.runways
            .iter()
            .map(|runway| RunwayState {
                id: runway.id,
                name: runway.name.clone(),
                occupied: runway.is_occupied(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_acquire_is_exclusive() {
        let pool = RunwayPool::reference();
        assert!(pool.try_acquire(0));
        assert!(!pool.try_acquire(0));
        assert!(pool.is_occupied(0));
        assert!(!pool.is_occupied(1));
    }

    #[test]
    fn test_release_is_idempotent() {
        let pool = RunwayPool::reference();
        assert!(!pool.release(1));
        assert!(!pool.is_occupied(1));

        assert!(pool.try_acquire(1));
        assert!(pool.release(1));
        assert!(!pool.release(1));
        assert!(!pool.is_occupied(1));
        assert!(pool.try_acquire(1));
    }

    #[test]
    fn test_out_of_range_ids_are_ignored() {
        let pool = RunwayPool::reference();
        assert!(!pool.try_acquire(7));
        assert!(!pool.release(7));
        assert_eq!(pool.name_of(7), "RWY-7");
    }

    #[test]
    fn test_preferred_runways() {
        let pool = RunwayPool::reference();
        use FlightDirection::*;
        assert_eq!(pool.preferred_for(AircraftType::Commercial, NorthArrival), Some(0));
        assert_eq!(pool.preferred_for(AircraftType::Commercial, SouthArrival), Some(0));
        assert_eq!(pool.preferred_for(AircraftType::Commercial, EastDeparture), Some(1));
        assert_eq!(pool.preferred_for(AircraftType::Commercial, WestDeparture), Some(1));
        assert_eq!(pool.preferred_for(AircraftType::Cargo, NorthArrival), Some(2));
        assert_eq!(pool.preferred_for(AircraftType::Emergency, WestDeparture), Some(2));
    }

    #[test]
    fn test_concurrent_acquire_has_a_single_winner() {
        let pool = Arc::new(RunwayPool::reference());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || pool.try_acquire(2))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
