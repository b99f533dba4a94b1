pub mod airline;

pub mod arrival;

pub mod backlog;

pub mod config;

pub mod events;

pub mod fault;

pub mod flight;

pub mod flight_actor;

pub mod flight_phase;

pub mod runway;

pub mod scheduler;

pub mod sim_error;

pub mod simulation;

pub mod ticker;

pub mod violation;
