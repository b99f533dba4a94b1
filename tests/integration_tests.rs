use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use atc_sim::{
    EmergencyType, FlightDirection, FlightPhase, FlightSchedule, SimConfig, SimError,
    SimulationBuilder,
};
use chrono::Utc;
use ledger::errors::LedgerError;
use ledger::{InMemoryLedger, TicketRequest, ViolationLedger};

// Compresses a whole departure lifecycle into about a second of wall time.
fn fast_config(name: &str) -> SimConfig {
    SimConfig {
        duration_secs: 3,
        actor_poll_ms: 5,
        scheduler_poll_ms: 20,
        generator_poll_ms: 5,
        supervisor_poll_ms: 10,
        snapshot_interval_secs: 1,
        fault_probability: 0.0,
        dwell_scale: 0.02,
        arrival_interval_scale: 0.005,
        seed: Some(2024),
        log_dir: std::env::temp_dir().join(format!(
            "control_tower_{}_{}",
            name,
            std::process::id()
        )),
        log_to_console: false,
    }
}

fn read_log(dir: &Path) -> String {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "log"))
        .map(|path| fs::read_to_string(path).unwrap())
        .collect()
}

fn cleanup(dir: &PathBuf) {
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_full_run_without_faults() {
    let config = fast_config("full_run");
    let dir = config.log_dir.clone();
    let sim = SimulationBuilder::new(config).build().unwrap();

    sim.start().unwrap();
    thread::sleep(Duration::from_millis(3_500));
    assert!(!sim.is_running());
    sim.join().unwrap();

    let flights = sim.flights();
    assert!(flights.len() >= 8, "only {} flights", flights.len());
    let numbers: Vec<u32> = flights.iter().map(|flight| flight.number).collect();
    let expected: Vec<u32> = (1000..1000 + flights.len() as u32).collect();
    assert_eq!(numbers, expected);

    let mut held = HashSet::new();
    for flight in &flights {
        assert!(!flight.is_faulted());
        assert!(!flight.has_open_violation(), "flight {:?}", flight);
        if let Some(runway) = flight.runway {
            assert!(held.insert(runway), "runway {} held twice", runway);
        }
    }
    assert!(flights
        .iter()
        .any(|flight| flight.direction.is_departure() && flight.phase == FlightPhase::Departure));
    assert!(flights
        .iter()
        .filter(|flight| flight.phase == FlightPhase::Departure)
        .all(|flight| flight.direction.is_departure() && flight.runway.is_none()));
    assert!(sim.unpaid_tickets("PIA").unwrap().is_empty());

    let log = read_log(&dir);
    assert!(log.contains("New flight #1000"));
    assert!(log.contains("ATC dashboard"));
    assert!(log.contains("Simulation completed after"));
    cleanup(&dir);
}

#[test]
fn test_faulted_flights_leave_scheduling() {
    let mut config = fast_config("faults");
    config.fault_probability = 1.0;
    let dir = config.log_dir.clone();
    let sim = SimulationBuilder::new(config).build().unwrap();

    sim.start().unwrap();
    thread::sleep(Duration::from_millis(3_500));
    sim.join().unwrap();

    let flights = sim.flights();
    let faulted: Vec<_> = flights.iter().filter(|flight| flight.is_faulted()).collect();
    assert!(!faulted.is_empty());
    for flight in &faulted {
        assert_eq!(flight.phase, FlightPhase::Taxi);
        assert_eq!(flight.runway, None);
    }
    assert!(flights
        .iter()
        .all(|flight| flight.phase != FlightPhase::Departure));
    assert_eq!(sim.snapshot().active_flights, flights.len() - faulted.len());
    assert!(read_log(&dir).contains("Ground fault on flight"));
    cleanup(&dir);
}

#[test]
fn test_military_slot_flies_airforce_only() {
    let config = fast_config("military");
    let dir = config.log_dir.clone();
    let schedule = FlightSchedule::new(
        FlightDirection::EastDeparture,
        Duration::from_secs(60),
        1.0,
        EmergencyType::Military,
    );
    let sim = SimulationBuilder::new(config)
        .schedules(vec![schedule])
        .build()
        .unwrap();

    sim.start().unwrap();
    thread::sleep(Duration::from_millis(1_000));
    sim.join().unwrap();

    let airforce = sim.airlines().find("Pakistan Airforce").unwrap();
    let flights = sim.flights();
    assert!(!flights.is_empty());
    for flight in flights {
        assert_eq!(flight.airline, airforce);
        assert_eq!(flight.emergency, EmergencyType::Military);
        assert_eq!(flight.priority(), 1);
    }
    cleanup(&dir);
}

#[test]
fn test_payment_through_the_simulation() {
    let config = fast_config("payment");
    let dir = config.log_dir.clone();
    let ledger = Arc::new(InMemoryLedger::new());
    let sim = SimulationBuilder::new(config)
        .ledger(ledger.clone())
        .build()
        .unwrap();

    let issued_at = Utc::now();
    let id = ledger
        .record(TicketRequest {
            flight_number: 1003,
            airline: "FedEx Cargo".to_string(),
            aircraft_type: "Cargo".to_string(),
            recorded_speed: 250.0,
            permissible_speed: 240.0,
            fine: 805_000.0,
            issued_at,
            due_at: issued_at + chrono::Duration::hours(72),
        })
        .unwrap();

    assert_eq!(sim.unpaid_tickets("FedEx Cargo").unwrap().len(), 1);
    assert!(matches!(
        sim.pay(id, 800_000.0),
        Err(SimError::LedgerError(LedgerError::InsufficientPayment { .. }))
    ));
    assert_eq!(sim.unpaid_tickets("FedEx Cargo").unwrap().len(), 1);

    let receipt = sim.pay(id, 810_000.0).unwrap();
    assert!((receipt.change - 5_000.0).abs() < 1e-6);
    assert!(sim.unpaid_tickets("FedEx Cargo").unwrap().is_empty());
    assert!(matches!(
        sim.pay(id, 810_000.0),
        Err(SimError::LedgerError(LedgerError::AlreadyPaid(_)))
    ));

    sim.join().unwrap();
    cleanup(&dir);
}
