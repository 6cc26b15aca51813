use std::env;
use std::fs;

use dotenvy::dotenv;
use log::{error, info};

use speed_champion_analytics::errors::Error;
use speed_champion_analytics::modules::helpers::logging::setup_logging;
use speed_champion_analytics::modules::models::general::establish_connection;
use speed_champion_analytics::modules::race_api::{save_race_request, SaveRaceRequest};

fn main() {
    dotenv().ok();
    setup_logging().expect("failed to setup logging");

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: ingest_race_from_file <request.json>");
        eprintln!("the file holds {{circuit_id, date, selected_drivers}}");
        return;
    }

    let body = match fs::read_to_string(&args[1]) {
        Ok(body) => body,
        Err(err) => {
            error!(target:"ingest_race_from_file", "could not read {}: {}", args[1], err);
            return;
        }
    };
    let request: SaveRaceRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(err) => {
            error!(target:"ingest_race_from_file", "could not parse request file: {}", err);
            return;
        }
    };

    let connection = &mut establish_connection();
    match save_race_request(connection, &request) {
        Ok(race) => {
            info!(target:"ingest_race_from_file", "saved race: {}", race.id);
        }
        Err(Error::NotFoundError { .. }) => {
            error!(target:"ingest_race_from_file", "circuit {} does not exist", request.circuit_id);
        }
        Err(err) => {
            error!(target:"ingest_race_from_file", "failed saving race: {}", err);
        }
    }
}
