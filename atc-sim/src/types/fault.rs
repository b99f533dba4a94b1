use rand::seq::SliceRandom;
use rand::Rng;

use super::flight::Flight;

pub const DEFAULT_FAULT_PROBABILITY: f64 = 0.05;

pub const FAULT_DESCRIPTIONS: [&str; 4] = [
    "Brake failure",
    "Hydraulic leak",
    "APU malfunction",
    "Steering system fault",
];

/// Ground-fault model: while taxiing or at the gate, every poll has a fixed
/// chance of grounding the aircraft for good.
#[derive(Debug, Clone, Copy)]
pub struct FaultInjector {
    probability: f64,
}

impl Default for FaultInjector {
    fn default() -> Self {
        FaultInjector::new(DEFAULT_FAULT_PROBABILITY)
    }
}

impl FaultInjector {
    pub fn new(probability: f64) -> Self {
        FaultInjector {
            probability: probability.clamp(0.0, 1.0),
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Runs one poll's draw for the flight. On a hit the flight is marked
    /// faulted and the description is returned; removing it from scheduling
    /// is up to the caller.
    pub fn check<R: Rng>(&self, flight: &mut Flight, rng: &mut R) -> Option<String> {
        if flight.is_faulted() || !flight.phase.is_ground_handling() {
            return None;
        }
        if rng.gen::<f64>() >= self.probability {
            return None;
        }
        let description = FAULT_DESCRIPTIONS
            .choose(rng)
            .copied()
            .unwrap_or(FAULT_DESCRIPTIONS[0])
            .to_string();
        flight.fault = Some(description.clone());
        Some(description)
    }
}
