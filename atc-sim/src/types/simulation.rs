use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use chrono::Utc;
use ledger::{InMemoryLedger, Receipt, Ticket, TicketId, ViolationLedger};
use logger::{Color, Logger};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use threadpool::ThreadPool;

use super::airline::{Airline, AirlineTable};
use super::arrival::{ArrivalGenerator, FlightSchedule};
use super::backlog::BacklogEntry;
use super::config::SimConfig;
use super::events::{Event, EventLogger, EventSink, Snapshot};
use super::fault::FaultInjector;
use super::flight::{Flight, FlightId, FlightRegistry};
use super::flight_actor::{ActorContext, FlightActor};
use super::runway::RunwayPool;
use super::scheduler::AdmissionScheduler;
use super::sim_error::SimError;
use super::ticker::Ticker;

const INITIAL_WORKERS: usize = 8;

/// Assembles a [`Simulation`]. Reference data defaults to the reference
/// airport and can be replaced piece by piece.
pub struct SimulationBuilder {
    config: SimConfig,
    airlines: Vec<Airline>,
    runways: Option<RunwayPool>,
    schedules: Vec<FlightSchedule>,
    ledger: Option<Arc<dyn ViolationLedger>>,
}

impl SimulationBuilder {
    pub fn new(config: SimConfig) -> Self {
        SimulationBuilder {
            config,
            airlines: Airline::default_roster(),
            runways: None,
            schedules: FlightSchedule::reference_schedules(),
            ledger: None,
        }
    }

    pub fn airlines(mut self, airlines: Vec<Airline>) -> Self {
        self.airlines = airlines;
        self
    }

    pub fn runways(mut self, runways: RunwayPool) -> Self {
        self.runways = Some(runways);
        self
    }

    pub fn schedules(mut self, schedules: Vec<FlightSchedule>) -> Self {
        self.schedules = schedules;
        self
    }

    pub fn ledger(mut self, ledger: Arc<dyn ViolationLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Validates the configuration, opens the session log and starts the
    /// event consumer. No flight moves until [`Simulation::start`].
    pub fn build(self) -> Result<Arc<Simulation>, SimError> {
        self.config.validate()?;

        let session = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let logger = Logger::new(&self.config.log_dir, &session, self.config.log_to_console)?;
        logger.info("Air traffic control simulation ready", Color::Cyan)?;

        let (events, receiver) = EventSink::channel();
        let event_logger = EventLogger::spawn(receiver, logger)?;

        let airlines = Arc::new(AirlineTable::new(self.airlines));
        let flights = FlightRegistry::new();
        let runways = Arc::new(self.runways.unwrap_or_else(RunwayPool::reference));
        let scheduler = Arc::new(AdmissionScheduler::new(
            runways,
            flights.clone(),
            events.clone(),
            self.config.scheduler_poll_ms,
        ));
        let ledger: Arc<dyn ViolationLedger> = match self.ledger {
            Some(ledger) => ledger,
            None => Arc::new(InMemoryLedger::new()),
        };
        let context = Arc::new(ActorContext {
            airlines: Arc::clone(&airlines),
            scheduler: Arc::clone(&scheduler),
            ledger: Arc::clone(&ledger),
            events: events.clone(),
            faults: FaultInjector::new(self.config.fault_probability),
            dwell_scale: self.config.dwell_scale,
            poll_interval: self.config.actor_poll(),
        });
        let rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Arc::new(Simulation {
            config: self.config,
            airlines,
            flights,
            scheduler,
            ledger,
            events,
            context,
            schedules: Mutex::new(Some(self.schedules)),
            running: Arc::new(AtomicBool::new(false)),
            started_at: Mutex::new(None),
            rng: Mutex::new(rng),
            thread_pool: Mutex::new(ThreadPool::new(INITIAL_WORKERS)),
            threads: Mutex::new(Vec::new()),
            event_logger: Mutex::new(Some(event_logger)),
        }))
    }
}

/// Owns the engine of one run: the generator, scheduler and supervisor loops
/// and one actor per admitted flight, all stopped by a single running flag.
pub struct Simulation {
    config: SimConfig,
    airlines: Arc<AirlineTable>,
    flights: FlightRegistry,
    scheduler: Arc<AdmissionScheduler>,
    ledger: Arc<dyn ViolationLedger>,
    events: EventSink,
    context: Arc<ActorContext>,
    schedules: Mutex<Option<Vec<FlightSchedule>>>,
    running: Arc<AtomicBool>,
    started_at: Mutex<Option<Instant>>,
    rng: Mutex<StdRng>,
    thread_pool: Mutex<ThreadPool>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    event_logger: Mutex<Option<JoinHandle<()>>>,
}

impl Simulation {
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn airlines(&self) -> &AirlineTable {
        &self.airlines
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts the generator, scheduler and supervisor loops. A second call does nothing.
    pub fn start(self: &Arc<Self>) -> Result<(), SimError> {
        let schedules = match self.schedules.lock()?.take() {
            Some(schedules) => schedules,
            None => return Ok(()),
        };
        let start = Instant::now();
        *self.started_at.lock()? = Some(start);
        self.running.store(true, Ordering::SeqCst);

        let generator_rng = StdRng::seed_from_u64(self.rng.lock()?.gen());
        let mut generator = ArrivalGenerator::new(
            Arc::clone(&self.airlines),
            schedules,
            self.config.arrival_interval_scale,
            start,
            generator_rng,
        );
        let sim = Arc::clone(self);
        let generator_handle = Ticker::new(
            "generator",
            self.config.generator_poll(),
            Arc::clone(&self.running),
        )
        .start(move |now, _| {
            for flight in generator.tick(now) {
                let number = flight.number;
                if let Err(e) = sim.admit(flight) {
                    sim.events
                        .warn(format!("Flight #{} could not be admitted: {}", number, e));
                }
            }
        })?;

        let scheduler = Arc::clone(&self.scheduler);
        let events = self.events.clone();
        let scheduler_handle = Ticker::new(
            "scheduler",
            self.config.scheduler_poll(),
            Arc::clone(&self.running),
        )
        .start(move |_, _| {
            if let Err(e) = scheduler.dispatch() {
                events.warn(format!("Skipped dispatch pass: {}", e));
            }
        })?;

        let sim = Arc::clone(self);
        let duration = self.config.duration();
        let snapshot_interval = self.config.snapshot_interval();
        let mut next_snapshot = start + snapshot_interval;
        let supervisor_handle = Ticker::new(
            "supervisor",
            self.config.supervisor_poll(),
            Arc::clone(&self.running),
        )
        .start(move |now, _| {
            if now.saturating_duration_since(start) >= duration {
                sim.shutdown();
                return;
            }
            if now >= next_snapshot {
                sim.events.emit(Event::PeriodicSnapshot(sim.snapshot()));
                next_snapshot += snapshot_interval;
            }
        })?;

        self.threads
            .lock()?
            .extend([generator_handle, scheduler_handle, supervisor_handle]);
        Ok(())
    }

    /// Registers a flight, queues it for a runway and starts its actor.
    pub fn admit(&self, flight: Flight) -> Result<FlightId, SimError> {
        let number = flight.number;
        let entry = BacklogEntry::for_flight(&flight);
        self.events.emit(Event::FlightCreated {
            flight: number,
            airline: self.airlines.name_of(flight.airline).to_string(),
            aircraft_type: flight.aircraft_type,
            direction: flight.direction,
            emergency: flight.emergency,
            priority: flight.priority(),
        });
        let shared = self.flights.insert(flight)?;
        self.scheduler.enqueue(entry)?;

        let rng = StdRng::seed_from_u64(self.rng.lock()?.gen());
        let actor = FlightActor::new(shared, Arc::clone(&self.context), rng)?;
        let running = Arc::clone(&self.running);

        let mut pool = self.thread_pool.lock()?;
        // Actors live for the whole flight, so every one of them needs its own worker.
        if pool.active_count() + pool.queued_count() >= pool.max_count() {
            let workers = pool.max_count() * 2;
            pool.set_num_threads(workers);
        }
        pool.execute(move || actor.run(&running));
        Ok(number)
    }

    /// Clears the running flag; every loop and actor exits at its next poll.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Shuts down, waits for every loop and actor, then emits the final
    /// snapshot and `SimulationCompleted` and waits for the log to drain.
    /// Calling it again does nothing.
    pub fn join(&self) -> Result<(), SimError> {
        self.shutdown();

        let threads = mem::take(&mut *self.threads.lock()?);
        for handle in threads {
            if handle.join().is_err() {
                self.events.warn("A simulation loop panicked");
            }
        }
        self.thread_pool.lock()?.join();

        let event_logger = match self.event_logger.lock()?.take() {
            Some(handle) => handle,
            None => return Ok(()),
        };
        self.events.emit(Event::PeriodicSnapshot(self.snapshot()));
        self.events.emit(Event::SimulationCompleted {
            elapsed: self.elapsed(),
        });
        event_logger
            .join()
            .map_err(|_| SimError::ThreadStartError("The event logger panicked.".to_string()))
    }

    /// Time since `start`, zero before it.
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at
            .lock()
            .ok()
            .and_then(|started| started.map(|started| started.elapsed()))
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::collect(
            &self.flights,
            &self.airlines,
            self.scheduler.runways(),
            self.scheduler.backlog_len(),
        )
    }

    /// Copies of every flight admitted so far, in flight-number order.
    pub fn flights(&self) -> Vec<Flight> {
        self.flights.collect()
    }

    pub fn flight(&self, number: FlightId) -> Option<Flight> {
        let shared = self.flights.get(number)?;
        let flight = shared.read().ok()?;
        Some(flight.clone())
    }

    /// Unpaid tickets of an airline in the roster.
    pub fn unpaid_tickets(&self, airline: &str) -> Result<Vec<Ticket>, SimError> {
        if self.airlines.find(airline).is_none() {
            return Err(SimError::UnknownAirline(airline.to_string()));
        }
        Ok(self.ledger.list_unpaid(airline)?)
    }

    pub fn pay(&self, ticket: TicketId, amount: f64) -> Result<Receipt, SimError> {
        Ok(self.ledger.pay(ticket, amount)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::airline::{AircraftType, EmergencyType};
    use crate::types::flight::FlightDirection;
    use crate::types::flight_phase::FlightPhase;
    use std::path::PathBuf;
    use std::time::Duration;

    fn test_config(name: &str) -> SimConfig {
        SimConfig {
            log_dir: std::env::temp_dir().join(format!("atc_sim_{}_{}", name, std::process::id())),
            log_to_console: false,
            seed: Some(7),
            ..SimConfig::default()
        }
    }

    fn cleanup(dir: &PathBuf) {
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = test_config("invalid");
        config.actor_poll_ms = 0;
        assert!(matches!(
            SimulationBuilder::new(config).build(),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_admit_before_start_queues_and_assigns() {
        let config = test_config("admit");
        let dir = config.log_dir.clone();
        let sim = SimulationBuilder::new(config).build().unwrap();

        let airlines = sim.airlines();
        let id = airlines.find("FedEx Cargo").unwrap();
        let flight = Flight::new(
            2000,
            id,
            airlines.get(id).unwrap(),
            FlightDirection::SouthArrival,
            EmergencyType::None,
            Utc::now(),
        );
        assert_eq!(sim.admit(flight).unwrap(), 2000);

        let admitted = sim.flight(2000).unwrap();
        assert_eq!(admitted.aircraft_type, AircraftType::Cargo);
        assert_eq!(admitted.runway, Some(2));
        assert_eq!(admitted.phase, FlightPhase::Holding);
        assert_eq!(sim.snapshot().active_flights, 1);

        sim.join().unwrap();
        assert!(sim.join().is_ok());
        cleanup(&dir);
    }

    #[test]
    fn test_unknown_airline_and_ticket() {
        let config = test_config("queries");
        let dir = config.log_dir.clone();
        let sim = SimulationBuilder::new(config).build().unwrap();

        assert!(matches!(
            sim.unpaid_tickets("Ghost Air"),
            Err(SimError::UnknownAirline(_))
        ));
        assert!(sim.unpaid_tickets("PIA").unwrap().is_empty());
        assert!(matches!(
            sim.pay(99, 1_000_000.0),
            Err(SimError::LedgerError(ledger::errors::LedgerError::TicketNotFound(99)))
        ));

        sim.join().unwrap();
        cleanup(&dir);
    }

    #[test]
    fn test_supervisor_stops_after_duration() {
        let mut config = test_config("duration");
        config.duration_secs = 1;
        config.supervisor_poll_ms = 10;
        config.fault_probability = 0.0;
        let dir = config.log_dir.clone();
        let sim = SimulationBuilder::new(config).build().unwrap();

        sim.start().unwrap();
        assert!(sim.is_running());
        std::thread::sleep(Duration::from_millis(1_500));
        assert!(!sim.is_running());
        sim.join().unwrap();

        assert_eq!(sim.flights().len(), 4);
        cleanup(&dir);
    }
}
