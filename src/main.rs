use std::env;
use std::io::{self, Write};
use std::path::Path;

use atc_sim::{SimConfig, SimError, Simulation, SimulationBuilder};

/// Entry point of the control tower console.
///
/// Starts the simulation with the configuration file given as the only
/// argument (defaults when absent) and serves the operator commands until
/// `exit`, end of input, or the end of the configured run.
///
/// # Usage
///
/// ```sh
/// cargo run -- [config_file]
/// ```
fn main() -> Result<(), SimError> {
    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: control-tower [config_file]");
        return Err(SimError::InvalidInput);
    }

    let config = match args.get(1) {
        Some(path) => SimConfig::from_file(Path::new(path))?,
        None => SimConfig::default(),
    };

    let sim = SimulationBuilder::new(config).build()?;
    sim.start()?;
    print_help();

    loop {
        let command = match prompt_input("> ") {
            Some(command) => command,
            None => break,
        };
        if !sim.is_running() {
            println!("The simulation has finished.");
            break;
        }

        match command.as_str() {
            "" => continue,

            "airline" => {
                if let Err(e) = list_unpaid(&sim) {
                    println!("{}", e);
                }
            }

            "pay" => {
                if let Err(e) = pay_ticket(&sim) {
                    println!("{}", e);
                }
            }

            "status" => println!("{}", sim.snapshot()),

            "-h" | "help" => print_help(),

            "exit" => break,

            _ => eprintln!("Invalid command. Use -h for help."),
        }
    }

    println!("Shutting down...");
    sim.join()?;
    Ok(())
}

fn list_unpaid(sim: &Simulation) -> Result<(), SimError> {
    let airline = prompt_input("Enter the airline name: ").ok_or(SimError::InvalidInput)?;
    let tickets = sim.unpaid_tickets(&airline)?;

    if tickets.is_empty() {
        println!("No unpaid tickets for {}.", airline);
        return Ok(());
    }
    println!("Unpaid tickets for {}:", airline);
    for ticket in tickets {
        println!(
            "  #{} | flight {} ({}) | {:.0} km/h (limit {:.0}) | issued {} | due {} | fine {:.2}",
            ticket.id,
            ticket.flight_number,
            ticket.aircraft_type,
            ticket.recorded_speed,
            ticket.permissible_speed,
            ticket.issued_at.format("%Y-%m-%d %H:%M"),
            ticket.due_at.format("%Y-%m-%d %H:%M"),
            ticket.fine
        );
    }
    Ok(())
}

fn pay_ticket(sim: &Simulation) -> Result<(), SimError> {
    let ticket = prompt_input("Enter the ticket id: ")
        .and_then(|input| input.parse().ok())
        .ok_or(SimError::InvalidInput)?;
    let amount: f64 = prompt_input("Enter the amount: ")
        .and_then(|input| input.parse().ok())
        .ok_or(SimError::InvalidInput)?;

    let receipt = sim.pay(ticket, amount)?;
    println!(
        "Ticket #{} paid ({:.2} of {:.2}). Change: {:.2}",
        receipt.ticket, receipt.amount, receipt.fine, receipt.change
    );
    Ok(())
}

/// Reads one trimmed line. `None` on end of input or a read error.
fn prompt_input(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    io::stdout().flush().ok()?;
    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(input.trim().to_string()),
    }
}

fn print_help() {
    println!("Available commands:");
    println!("  airline");
    println!("    Lists the unpaid violation tickets of an airline.");
    println!("  pay");
    println!("    Pays a ticket. You'll be prompted for the id and the amount.");
    println!("  status");
    println!("    Shows the current state of the airspace and runways.");
    println!("  exit");
    println!("    Stops the simulation and closes this application.");
}
