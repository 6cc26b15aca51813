use std::env;
use std::thread;

use chrono::NaiveDate;
use diesel::PgConnection;
use dotenvy::dotenv;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::errors::{CustomResult, DatabaseSnafu, ExtractionSnafu, NotFoundSnafu, ValidationSnafu};
use crate::models::NewLapTime;
use crate::modules::helpers::lap::LapHelper;
use crate::modules::models::circuit::Circuit;
use crate::modules::models::driver::Driver;
use crate::modules::models::lap_time::LapTime;
use crate::modules::models::race::Race;
use crate::modules::models::race_result::RaceResult;
use crate::modules::redis::Redis;

/// uploads past this size are rejected before the service is called
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// # get an extracted race from the extraction service
/// send a timing sheet image to the extraction service and parse its
/// best effort guess of driver names and lap time strings. any failure
/// of the service, transport or response, surfaces as an extraction
/// error; nothing has been written at that point so the caller can
/// simply report it.
///
/// ## Arguments
/// * `image` - the raw image bytes
///
/// ## Returns
/// * `ExtractionResponse` - the extracted drivers and their laps
pub async fn get_extracted_race(image: Vec<u8>) -> CustomResult<ExtractionResponse> {
    ensure!(
        image.len() <= MAX_IMAGE_BYTES,
        ValidationSnafu {
            message: "Image too large. Maximum 10MB.".to_string(),
        }
    );

    dotenv().ok();
    let request_url = env::var("EXTRACTION_URL").map_err(|_| {
        ExtractionSnafu {
            message: "EXTRACTION_URL must be set".to_string(),
        }
        .build()
    })?;

    info!(target:"modules/race_api:get_extracted_race", "sending {} byte image to the extraction service", image.len());

    let client = reqwest::Client::new();
    let response = client
        .post(&request_url)
        .header("Content-Type", "application/octet-stream")
        .body(image)
        .send()
        .await
        .map_err(|error| {
            ExtractionSnafu {
                message: error.to_string(),
            }
            .build()
        })?;

    let body = response.text().await.map_err(|error| {
        ExtractionSnafu {
            message: error.to_string(),
        }
        .build()
    })?;

    parse_extraction_response(&body)
}

/// the service is supposed to answer bare json but tends to wrap it in
/// prose, so take the outermost object from the body before parsing
pub fn parse_extraction_response(body: &str) -> CustomResult<ExtractionResponse> {
    let cleaned = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => body,
    };

    serde_json::from_str(cleaned).map_err(|error| {
        ExtractionSnafu {
            message: format!("invalid JSON response: {}", error),
        }
        .build()
    })
}

/// # save a race
/// persist one ingested race: the race itself, one result per driver
/// entry, and the laps that survived parsing. the circuit has to exist
/// before anything is written; past that point drivers are processed
/// independently and a driver with nothing legible still gets an empty
/// result. every call creates a fresh race, identical repeated calls
/// are not merged.
///
/// ## Arguments
/// * `conn` - the database connection
/// * `circuit_id` - the circuit the race was held at
/// * `date` - the calendar date of the race
/// * `drivers` - the extracted driver entries
///
/// ## Returns
/// * `Race` - the created race
pub fn save_race(
    conn: &mut PgConnection,
    circuit_id: i32,
    date: NaiveDate,
    drivers: &[ExtractedDriver],
) -> CustomResult<Race> {
    let circuit_exists = Circuit::exists(conn, circuit_id).context(DatabaseSnafu)?;
    ensure!(
        circuit_exists,
        NotFoundSnafu {
            entity: "circuit",
            id: circuit_id.to_string(),
        }
    );

    let race = Race::new(conn, circuit_id, date).context(DatabaseSnafu)?;
    info!(target:"modules/race_api:save_race", "race {} created at circuit {} on {}", race.id, circuit_id, date);

    let mut saved_drivers: Vec<Driver> = Vec::new();
    for extracted in drivers {
        let driver = Driver::ensure_exists(conn, &extracted.name).context(DatabaseSnafu)?;

        // the aggregates are recomputed from the laps; whatever fastest
        // or average the extraction guessed is ignored
        let aggregates = LapHelper::aggregate_laps(&extracted.laps);
        if aggregates.laps.is_empty() {
            warn!(target:"modules/race_api:save_race", "driver {} has no usable laps, result saved empty", extracted.name);
        }

        let result = RaceResult::new(conn, race.id, driver.id, &aggregates).context(DatabaseSnafu)?;

        let new_laps: Vec<NewLapTime> = aggregates
            .laps
            .iter()
            .map(|lap| NewLapTime {
                race_result_id: result.id,
                lap_number: lap.lap_number,
                lap_time: lap.lap_time,
            })
            .collect();
        if !new_laps.is_empty() {
            LapTime::insert_bulk(conn, &new_laps).context(DatabaseSnafu)?;
        }

        info!(target:"modules/race_api:save_race", "saved result for {} ({} laps)", driver.name, aggregates.laps.len());
        saved_drivers.push(driver);
    }

    // clear the cached statistics the new race feeds into
    let race_clone = race.clone();
    thread::spawn(move || {
        let r_conn = &mut match Redis::connect() {
            Ok(r_conn) => r_conn,
            Err(error) => {
                error!(target:"modules/race_api:save_race", "Error connecting to redis: {}", error);
                return;
            }
        };

        race_clone.clear_cache(r_conn);
        for driver in saved_drivers {
            driver.clear_cache(r_conn);
        }
    });

    Ok(race)
}

/// # save a race from a full ingestion request
/// the request shape the outer api layer hands over: the target circuit
/// and date plus the driver entries the user kept from the extraction.
pub fn save_race_request(conn: &mut PgConnection, request: &SaveRaceRequest) -> CustomResult<Race> {
    save_race(conn, request.circuit_id, request.date, &request.selected_drivers)
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SaveRaceRequest {
    pub circuit_id: i32,
    pub date: NaiveDate,
    pub selected_drivers: Vec<ExtractedDriver>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExtractionResponse {
    pub drivers: Vec<ExtractedDriver>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExtractedDriver {
    pub name: String,
    #[serde(default)]
    pub laps: Vec<ExtractedLap>,
    /// informational only, the pipeline recomputes both
    #[serde(default)]
    pub fastest_lap: Option<String>,
    #[serde(default)]
    pub average_lap: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExtractedLap {
    #[serde(default)]
    pub lap_number: Option<i32>,
    // older extractors send the time under "time"
    #[serde(default, alias = "time")]
    pub lap_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::parse_extraction_response;
    use crate::errors::Error;

    #[test]
    fn parses_the_documented_response_shape() {
        let body = r#"
        {
            "drivers": [
                {
                    "name": "Tiago",
                    "laps": [
                        {"lap_number": 1, "lap_time": "0:36.776"},
                        {"lap_number": 2, "lap_time": "1:23.854"}
                    ],
                    "fastest_lap": "0:35.703",
                    "average_lap": "0:36.323"
                }
            ]
        }
        "#;

        let response = parse_extraction_response(body).unwrap();
        assert_eq!(response.drivers.len(), 1);
        assert_eq!(response.drivers[0].name, "Tiago");
        assert_eq!(response.drivers[0].laps.len(), 2);
        assert_eq!(
            response.drivers[0].laps[0].lap_time.as_deref(),
            Some("0:36.776")
        );
    }

    #[test]
    fn accepts_the_legacy_time_key() {
        let body = r#"{"drivers": [{"name": "Mota", "laps": [{"lap_number": 1, "time": "0:40.123"}]}]}"#;

        let response = parse_extraction_response(body).unwrap();
        assert_eq!(
            response.drivers[0].laps[0].lap_time.as_deref(),
            Some("0:40.123")
        );
    }

    #[test]
    fn tolerates_missing_lap_numbers_and_aggregates() {
        let body = r#"{"drivers": [{"name": "Plata", "laps": [{"lap_time": "0:40.123"}]}]}"#;

        let response = parse_extraction_response(body).unwrap();
        let driver = &response.drivers[0];
        assert_eq!(driver.laps[0].lap_number, None);
        assert_eq!(driver.fastest_lap, None);
        assert_eq!(driver.average_lap, None);
    }

    #[test]
    fn unwraps_json_buried_in_prose() {
        let body = "Here are your results:\n{\"drivers\": []}\nThank you!";

        let response = parse_extraction_response(body).unwrap();
        assert!(response.drivers.is_empty());
    }

    #[test]
    fn malformed_body_is_an_extraction_error() {
        let err = parse_extraction_response("not json at all").unwrap_err();
        assert!(matches!(err, Error::ExtractionError { .. }));
    }

    #[test]
    fn drivers_without_laps_deserialize_to_an_empty_list() {
        let body = r#"{"drivers": [{"name": "Soham"}]}"#;

        let response = parse_extraction_response(body).unwrap();
        assert!(response.drivers[0].laps.is_empty());
    }

    #[test]
    fn ingestion_requests_deserialize_with_the_legacy_key() {
        let body = r#"
        {
            "circuit_id": 2,
            "date": "2025-05-10",
            "selected_drivers": [
                {"name": "Tiago", "laps": [{"lap_number": 1, "time": "0:38.900"}]}
            ]
        }
        "#;

        let request: super::SaveRaceRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.circuit_id, 2);
        assert_eq!(
            request.selected_drivers[0].laps[0].lap_time.as_deref(),
            Some("0:38.900")
        );
    }
}
