//! Per-flight phase machine.
//!
//! Each actor owns one flight and advances it through its phases on a fixed
//! poll. Work that touches shared structures (runways, backlog, ledger, event
//! channel) is collected while the flight is locked and carried out after the
//! lock is dropped, so an actor never holds its flight while waiting on the
//! scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use ledger::ViolationLedger;
use rand::Rng;

use super::airline::{AircraftType, AirlineTable};
use super::backlog::BacklogEntry;
use super::events::{Event, EventSink};
use super::fault::FaultInjector;
use super::flight::{Flight, FlightId, SharedFlight};
use super::flight_phase::FlightPhase;
use super::runway::RunwayId;
use super::scheduler::AdmissionScheduler;
use super::sim_error::SimError;
use super::violation::{self, Violation};

/// Collaborators shared by every flight actor.
pub struct ActorContext {
    pub airlines: Arc<AirlineTable>,
    pub scheduler: Arc<AdmissionScheduler>,
    pub ledger: Arc<dyn ViolationLedger>,
    pub events: EventSink,
    pub faults: FaultInjector,
    /// Multiplies every phase dwell.
    pub dwell_scale: f64,
    pub poll_interval: Duration,
}

/// Outcome of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Continue,
    /// Reached the terminal phase; the actor is done.
    Departed,
    /// Grounded by a fault; the actor is done.
    Faulted,
}

enum Effect {
    Emit(Event),
    Release(RunwayId),
    Enqueue(BacklogEntry),
    Withdraw,
    Retire,
    Ticket {
        violation: Violation,
        airline: String,
        aircraft_type: AircraftType,
    },
}

pub struct FlightActor<R: Rng> {
    number: FlightId,
    flight: SharedFlight,
    context: Arc<ActorContext>,
    rng: R,
    phase_started: Option<Instant>,
}

impl<R: Rng> FlightActor<R> {
    /// Creates the actor of a freshly admitted flight. Its first poll applies
    /// the entry speed of the flight's current phase.
    pub fn new(flight: SharedFlight, context: Arc<ActorContext>, rng: R) -> Result<Self, SimError> {
        let number = flight.read()?.number;
        Ok(FlightActor {
            number,
            flight,
            context,
            rng,
            phase_started: None,
        })
    }

    /// Attaches an actor to a flight that has been in its current phase since
    /// `phase_started`. The flight's speed is left as it is.
    pub fn resume(
        flight: SharedFlight,
        context: Arc<ActorContext>,
        rng: R,
        phase_started: Instant,
    ) -> Result<Self, SimError> {
        let mut actor = FlightActor::new(flight, context, rng)?;
        actor.phase_started = Some(phase_started);
        Ok(actor)
    }

    pub fn number(&self) -> FlightId {
        self.number
    }

    /// Polls the actor until it finishes or `running` is cleared.
    pub fn run(mut self, running: &AtomicBool) {
        while running.load(Ordering::SeqCst) {
            let now = Instant::now();
            match self.step(now) {
                Ok(Progress::Continue) => {}
                Ok(_) => break,
                Err(e) => {
                    self.context
                        .events
                        .warn(format!("Flight #{} stopped: {}", self.number, e));
                    break;
                }
            }
            thread::sleep(self.context.poll_interval.saturating_sub(now.elapsed()));
        }
    }

    /// Runs one poll as of `now`.
    pub fn step(&mut self, now: Instant) -> Result<Progress, SimError> {
        let mut effects = Vec::new();
        let shared = Arc::clone(&self.flight);
        let progress = {
            let mut flight = shared.write()?;
            self.poll(&mut flight, now, &mut effects)
        };
        self.apply(effects);
        Ok(progress)
    }

    fn poll(&mut self, flight: &mut Flight, now: Instant, effects: &mut Vec<Effect>) -> Progress {
        if flight.is_faulted() {
            return Progress::Faulted;
        }
        if flight.phase == FlightPhase::Departure {
            return Progress::Departed;
        }

        let started = match self.phase_started {
            Some(started) => started,
            None => {
                flight.speed = self.entry_speed(flight.phase, flight.outbound, flight.speed);
                self.phase_started = Some(now);
                self.check(flight, effects);
                return Progress::Continue;
            }
        };

        if let Some(description) = self.context.faults.check(flight, &mut self.rng) {
            effects.push(Effect::Emit(Event::FaultDetected {
                flight: flight.number,
                description,
            }));
            effects.push(Effect::Retire);
            return Progress::Faulted;
        }

        let elapsed = now.saturating_duration_since(started);
        let dwell = self.dwell(flight.phase);
        let dwell_over = dwell.is_some_and(|dwell| elapsed >= dwell);
        let mut progress = Progress::Continue;

        match flight.phase {
            FlightPhase::Holding if dwell_over => {
                self.enter(flight, FlightPhase::Approach, now, effects);
            }
            FlightPhase::Approach if dwell_over => {
                self.enter(flight, FlightPhase::Landing, now, effects);
            }
            FlightPhase::Landing => {
                if dwell_over {
                    self.enter(flight, FlightPhase::Taxi, now, effects);
                } else {
                    let progress = fraction(elapsed, dwell);
                    flight.speed = 240.0 * (1.0 - progress) + 30.0 * progress;
                }
            }
            FlightPhase::Taxi if flight.outbound => {
                if flight.runway.is_some() {
                    self.enter(flight, FlightPhase::TakeoffRoll, now, effects);
                }
            }
            FlightPhase::Taxi if dwell_over => {
                self.enter(flight, FlightPhase::AtGate, now, effects);
                effects.push(Effect::Withdraw);
            }
            FlightPhase::AtGate => {
                if let Some(runway) = flight.runway.take() {
                    effects.push(Effect::Release(runway));
                }
                if dwell_over && flight.direction.is_departure() {
                    flight.outbound = true;
                    self.enter(flight, FlightPhase::Taxi, now, effects);
                    effects.push(Effect::Enqueue(BacklogEntry::for_flight(flight)));
                }
            }
            FlightPhase::TakeoffRoll => {
                if dwell_over {
                    self.enter(flight, FlightPhase::Climb, now, effects);
                } else {
                    flight.speed = 290.0 * fraction(elapsed, dwell);
                }
            }
            FlightPhase::Climb if dwell_over => {
                self.enter(flight, FlightPhase::Cruise, now, effects);
                if let Some(runway) = flight.runway.take() {
                    effects.push(Effect::Release(runway));
                }
            }
            FlightPhase::Cruise if dwell_over => {
                self.enter(flight, FlightPhase::Departure, now, effects);
                if let Some(runway) = flight.runway.take() {
                    effects.push(Effect::Release(runway));
                }
                effects.push(Effect::Withdraw);
                effects.push(Effect::Emit(Event::FlightDeparted {
                    flight: flight.number,
                }));
                progress = Progress::Departed;
            }
            _ => {}
        }

        self.check(flight, effects);
        progress
    }

    fn enter(
        &mut self,
        flight: &mut Flight,
        phase: FlightPhase,
        now: Instant,
        effects: &mut Vec<Effect>,
    ) {
        let from = flight.phase;
        flight.phase = phase;
        flight.speed = self.entry_speed(phase, flight.outbound, flight.speed);
        self.phase_started = Some(now);
        effects.push(Effect::Emit(Event::PhaseTransition {
            flight: flight.number,
            from,
            to: phase,
            speed: flight.speed,
        }));
    }

    fn entry_speed(&mut self, phase: FlightPhase, outbound: bool, current: f32) -> f32 {
        match phase {
            FlightPhase::Holding => self.rng.gen_range(400.0..=600.0),
            FlightPhase::Approach => 290.0,
            FlightPhase::Landing => 240.0,
            FlightPhase::Taxi if outbound => self.rng.gen_range(15.0..=30.0),
            FlightPhase::Taxi => 20.0,
            FlightPhase::AtGate | FlightPhase::TakeoffRoll => 0.0,
            FlightPhase::Climb => self.rng.gen_range(250.0..=463.0),
            FlightPhase::Cruise => self.rng.gen_range(800.0..=900.0),
            FlightPhase::Departure => current,
        }
    }

    fn dwell(&self, phase: FlightPhase) -> Option<Duration> {
        phase
            .dwell()
            .map(|dwell| dwell.mul_f64(self.context.dwell_scale))
    }

    fn check(&self, flight: &mut Flight, effects: &mut Vec<Effect>) {
        if let Some(violation) = violation::inspect(flight) {
            effects.push(Effect::Ticket {
                violation,
                airline: self.context.airlines.name_of(flight.airline).to_string(),
                aircraft_type: flight.aircraft_type,
            });
        }
    }

    fn apply(&self, effects: Vec<Effect>) {
        let context = Arc::clone(&self.context);
        for effect in effects {
            match effect {
                Effect::Emit(event) => context.events.emit(event),
                Effect::Release(runway) => {
                    context.scheduler.release(self.number, runway);
                }
                Effect::Enqueue(entry) => {
                    if let Err(e) = context.scheduler.enqueue(entry) {
                        context.events.warn(format!(
                            "Flight #{} could not join the backlog: {}",
                            self.number, e
                        ));
                    }
                }
                Effect::Withdraw => {
                    if let Err(e) = context.scheduler.withdraw(self.number) {
                        context.events.warn(format!(
                            "Flight #{} could not leave the backlog: {}",
                            self.number, e
                        ));
                    }
                }
                Effect::Retire => {
                    if let Err(e) = context.scheduler.retire(self.number) {
                        context.events.warn(format!(
                            "Flight #{} could not be retired: {}",
                            self.number, e
                        ));
                    }
                }
                Effect::Ticket {
                    violation,
                    airline,
                    aircraft_type,
                } => self.issue_ticket(&context, violation, &airline, aircraft_type),
            }
        }
    }

    // The open-violation flag is already set; a ledger failure only means no ticket id.
    fn issue_ticket(
        &self,
        context: &ActorContext,
        violation: Violation,
        airline: &str,
        aircraft_type: AircraftType,
    ) {
        let request = violation::ticket_request(&violation, airline, aircraft_type, Utc::now());
        let ticket = match context.ledger.record(request) {
            Ok(id) => {
                if let Ok(mut flight) = self.flight.write() {
                    flight.tickets.push(id);
                }
                Some(id)
            }
            Err(e) => {
                context.events.emit(Event::LedgerUnavailable {
                    flight: violation.flight,
                    reason: e.to_string(),
                });
                None
            }
        };
        context.events.emit(Event::ViolationOpened {
            flight: violation.flight,
            phase: violation.phase,
            speed: violation.speed,
            limit: violation.limit,
            reason: violation.reason,
            ticket,
        });
    }
}

/// Elapsed share of a dwell, clamped to [0, 1].
fn fraction(elapsed: Duration, dwell: Option<Duration>) -> f32 {
    match dwell {
        Some(dwell) if !dwell.is_zero() => {
            (elapsed.as_secs_f64() / dwell.as_secs_f64()).clamp(0.0, 1.0) as f32
        }
        _ => 1.0,
    }
}
