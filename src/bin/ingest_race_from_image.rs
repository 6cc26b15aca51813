use std::env;
use std::fs;

use chrono::NaiveDate;
use dotenvy::dotenv;
use log::{error, info, warn};

use speed_champion_analytics::errors::Error;
use speed_champion_analytics::modules::helpers::logging::setup_logging;
use speed_champion_analytics::modules::models::general::establish_connection;
use speed_champion_analytics::modules::race_api::{get_extracted_race, save_race};

#[tokio::main]
async fn main() {
    dotenv().ok();
    setup_logging().expect("failed to setup logging");

    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        eprintln!("usage: ingest_race_from_image <circuit_id> <YYYY-MM-DD> <image>");
        return;
    }

    let circuit_id: i32 = match args[1].parse() {
        Ok(circuit_id) => circuit_id,
        Err(_) => {
            eprintln!("invalid circuit id: {}", args[1]);
            return;
        }
    };
    let date = match NaiveDate::parse_from_str(&args[2], "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) => {
            eprintln!("invalid date: {}", args[2]);
            return;
        }
    };

    let image = match fs::read(&args[3]) {
        Ok(image) => image,
        Err(err) => {
            error!(target:"ingest_race_from_image", "could not read {}: {}", args[3], err);
            return;
        }
    };

    // extraction happens before anything is written, a failing service
    // leaves the database untouched
    let response = match get_extracted_race(image).await {
        Ok(response) => response,
        Err(Error::ValidationError { message }) => {
            warn!(target:"ingest_race_from_image", "rejected upload: {}", message);
            return;
        }
        Err(err) => {
            error!(target:"ingest_race_from_image", "extraction failed: {}", err);
            return;
        }
    };

    let connection = &mut establish_connection();
    match save_race(connection, circuit_id, date, &response.drivers) {
        Ok(race) => {
            info!(target:"ingest_race_from_image", "saved race: {}", race.id);
        }
        Err(Error::NotFoundError { .. }) => {
            error!(target:"ingest_race_from_image", "circuit {} does not exist", circuit_id);
        }
        Err(err) => {
            error!(target:"ingest_race_from_image", "failed saving race: {}", err);
        }
    }
}
