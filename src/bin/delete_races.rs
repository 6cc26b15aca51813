use std::env;

use dotenvy::dotenv;
use log::error;

use speed_champion_analytics::modules::helpers::logging::setup_logging;
use speed_champion_analytics::modules::models::general::establish_connection;
use speed_champion_analytics::modules::models::race::Race;

fn main() {
    dotenv().ok();
    setup_logging().expect("failed to setup logging");

    let connection = &mut establish_connection();

    for arg in env::args().skip(1) {
        let race_id: i32 = match arg.parse() {
            Ok(race_id) => race_id,
            Err(_) => {
                eprintln!("invalid race id: {}", arg);
                continue;
            }
        };

        match Race::get_by_id(connection, race_id) {
            Ok(race) => match race.delete(connection) {
                Ok(_) => println!("Deleted race: {}", race_id),
                Err(err) => {
                    error!(target:"delete_races", "failed deleting race {}: {}", race_id, err);
                }
            },
            Err(diesel::result::Error::NotFound) => {
                println!("Race {} does not exist", race_id);
            }
            Err(err) => {
                error!(target:"delete_races", "failed loading race {}: {}", race_id, err);
            }
        }
    }
}
