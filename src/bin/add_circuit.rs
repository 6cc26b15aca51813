use std::env;

use dotenvy::dotenv;
use log::{error, info};

use speed_champion_analytics::modules::helpers::logging::setup_logging;
use speed_champion_analytics::modules::models::circuit::Circuit;
use speed_champion_analytics::modules::models::general::establish_connection;

fn main() {
    dotenv().ok();
    setup_logging().expect("failed to setup logging");

    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        eprintln!("usage: add_circuit <name> <city> <indoor|outdoor>");
        return;
    }

    let circuit_type = args[3].as_str();
    if circuit_type != "indoor" && circuit_type != "outdoor" {
        eprintln!("invalid circuit type: {} (expected indoor or outdoor)", circuit_type);
        return;
    }

    let connection = &mut establish_connection();
    match Circuit::new(connection, &args[1], &args[2], circuit_type) {
        Ok(circuit) => {
            info!(target:"add_circuit", "created circuit {} ({})", circuit.id, circuit.name);
            println!("Created circuit: {}", circuit.id);
        }
        Err(err) => {
            error!(target:"add_circuit", "failed creating circuit: {}", err);
        }
    }
}
