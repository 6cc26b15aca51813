use std::thread;

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::PgConnection;
use log::error;
use serde::{Deserialize, Serialize};

use crate::errors::CustomResult;
use crate::macros::database_error_handeler::db_handle_get_error;
use crate::macros::redis::delete_keys;
use crate::models::NewRace;
use crate::modules::helpers::duration::DurationHelper;
use crate::modules::models::circuit::Circuit;
use crate::modules::models::driver::Driver;
use crate::modules::models::lap_time::LapTime;
use crate::modules::models::race_result::RaceResult;
use crate::modules::redis::Redis;
use crate::modules::traits::as_map::AsMap;
use crate::modules::traits::has_id::HasIdTrait;
use crate::schema::{lap_times, race_results, races};

#[derive(
    Queryable, Serialize, Associations, Identifiable, PartialEq, Eq, Hash, Debug, Clone, Deserialize,
)]
#[diesel(belongs_to(Circuit, foreign_key = circuit_id))]
pub struct Race {
    pub id: i32,
    pub circuit_id: i32,
    pub date: NaiveDate,
}

impl Race {
    /************ INSERTERS ************/
    /// # create a race
    /// create a new race at a circuit on a date. every call creates a
    /// distinct race, repeated ingestions for the same circuit and date
    /// are not deduplicated.
    ///
    /// ## Arguments
    /// * `conn` - the database connection
    /// * `circuit_id_in` - the circuit the race was held at
    /// * `date_in` - the calendar date of the race
    ///
    /// ## Returns
    /// * `Race` - the created race
    pub fn new(conn: &mut PgConnection, circuit_id_in: i32, date_in: NaiveDate) -> QueryResult<Race> {
        let new_race = NewRace {
            circuit_id: circuit_id_in,
            date: date_in,
        };

        diesel::insert_into(races::table)
            .values(&new_race)
            .get_result(conn)
    }

    /************ GETTERS ************/
    pub fn get_by_id(conn: &mut PgConnection, id_in: i32) -> QueryResult<Race> {
        use crate::schema::races::dsl::*;
        races.filter(id.eq(id_in)).first::<Race>(conn)
    }

    /// # get all races
    /// get all races from the database, newest first
    pub fn get_all(conn: &mut PgConnection) -> QueryResult<Vec<Race>> {
        use crate::schema::races::dsl::*;
        races.order(date.desc()).load::<Race>(conn)
    }

    /// # get the races at a circuit
    /// get all races held at a circuit, newest first
    pub fn from_circuit(conn: &mut PgConnection, circuit_id_in: i32) -> QueryResult<Vec<Race>> {
        use crate::schema::races::dsl::*;
        races
            .filter(circuit_id.eq(circuit_id_in))
            .order(date.desc())
            .load::<Race>(conn)
    }

    /// # get the races at a circuit sorted by date
    /// get all races held at a circuit, oldest first. this is the
    /// order the evolution series are built in.
    pub fn from_circuit_chronological(
        conn: &mut PgConnection,
        circuit_id_in: i32,
    ) -> QueryResult<Vec<Race>> {
        use crate::schema::races::dsl::*;
        races
            .filter(circuit_id.eq(circuit_id_in))
            .order(date.asc())
            .load::<Race>(conn)
    }

    /// # get the full detail of a race
    /// get a race with every drivers result and its laps, the way it
    /// was ingested.
    ///
    /// ## Arguments
    /// * `conn` - the database connection
    /// * `race_id_in` - the id of the race
    ///
    /// ## Returns
    /// * `RaceDetail` - the race with its nested results
    pub fn get_detail(conn: &mut PgConnection, race_id_in: i32) -> CustomResult<RaceDetail> {
        let race = db_handle_get_error!(
            Race::get_by_id(conn, race_id_in),
            "models/race:get_detail",
            "race",
            race_id_in
        );

        let results = db_handle_get_error!(
            RaceResult::from_race(conn, race.id),
            "models/race:get_detail",
            "race results",
            race_id_in
        );
        let drivers = db_handle_get_error!(
            Driver::from_results(conn, &results),
            "models/race:get_detail",
            "drivers",
            race_id_in
        );
        let laps = db_handle_get_error!(
            LapTime::from_results(conn, &results),
            "models/race:get_detail",
            "laps",
            race_id_in
        );

        Ok(Race::detail_from_rows(&race, &results, &drivers, &laps))
    }

    /// build the race detail from already loaded rows. laps are kept
    /// in their persisted order inside every result.
    pub fn detail_from_rows(
        race: &Race,
        results: &[RaceResult],
        drivers: &[Driver],
        laps: &[LapTime],
    ) -> RaceDetail {
        let driver_map = drivers.to_owned().into_iter().as_map();

        RaceDetail {
            id: race.id,
            circuit: race.circuit_id,
            date: race.date,
            results: results
                .iter()
                .map(|result| RaceResultDetail {
                    driver_name: driver_map
                        .get(&result.driver_id)
                        .map(|driver| driver.name.clone())
                        .unwrap_or_default(),
                    total_time: DurationHelper::format_laptime(result.total_time),
                    fastest_lap: DurationHelper::format_laptime(result.fastest_lap),
                    average_lap: DurationHelper::format_laptime(result.average_lap),
                    laps: laps
                        .iter()
                        .filter(|lap| lap.race_result_id == result.id)
                        .map(|lap| RaceLapDetail {
                            lap_number: lap.lap_number,
                            lap_time: DurationHelper::format_laptime(Some(lap.lap_time)),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /************ DELETERS ************/
    /// # delete a race
    /// delete a race together with its results and their laps, then
    /// clear the statistics cache the race contributed to. corrections
    /// go through delete and re-ingest, results are never edited in
    /// place.
    ///
    /// ## Arguments
    /// * `conn` - the database connection
    pub fn delete(&self, conn: &mut PgConnection) -> QueryResult<()> {
        let results = RaceResult::from_race(conn, self.id)?;
        let result_ids: Vec<i32> = results.iter().map(|result| result.id).collect();
        let drivers = Driver::from_results(conn, &results)?;

        // delete the children first, laps then results then the race
        diesel::delete(lap_times::table.filter(lap_times::race_result_id.eq_any(&result_ids)))
            .execute(conn)?;
        diesel::delete(race_results::table.filter(race_results::race_id.eq(self.id)))
            .execute(conn)?;
        diesel::delete(races::table.filter(races::id.eq(self.id))).execute(conn)?;

        let race = self.clone();
        thread::spawn(move || {
            let r_conn = &mut match Redis::connect() {
                Ok(r_conn) => r_conn,
                Err(error) => {
                    error!(target:"models/race:delete", "Error connecting to redis: {}", error);
                    return;
                }
            };

            race.clear_cache(r_conn);
            for driver in drivers {
                driver.clear_cache(r_conn);
            }
        });

        Ok(())
    }

    /************ CACHING ************/
    pub fn clear_cache(&self, r_conn: &mut redis::Connection) {
        let mut keys = match Redis::keys(r_conn, format!("stats:circuit:{}:*", self.circuit_id)) {
            Ok(keys) => keys,
            Err(error) => {
                error!(target:"models/race:clear_cache", "Error getting keys from redis: {}", error);
                return;
            }
        };
        keys.append(&mut Redis::keys(r_conn, "stats:leaderboard*").unwrap_or_default());

        delete_keys!(r_conn, keys, "models/race:clear_cache");
    }
}

impl HasIdTrait for Race {
    fn get_id(&self) -> i32 {
        self.id
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RaceLapDetail {
    pub lap_number: i32,
    pub lap_time: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RaceResultDetail {
    pub driver_name: String,
    pub total_time: Option<String>,
    pub fastest_lap: Option<String>,
    pub average_lap: Option<String>,
    pub laps: Vec<RaceLapDetail>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RaceDetail {
    pub id: i32,
    pub circuit: i32,
    pub date: NaiveDate,
    pub results: Vec<RaceResultDetail>,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::Race;
    use crate::modules::models::driver::Driver;
    use crate::modules::models::lap_time::LapTime;
    use crate::modules::models::race_result::RaceResult;

    #[test]
    fn detail_groups_laps_under_their_result() {
        let race = Race {
            id: 1,
            circuit_id: 3,
            date: NaiveDate::parse_from_str("2025-05-10", "%Y-%m-%d").unwrap(),
        };
        let results = vec![
            RaceResult {
                id: 10,
                race_id: 1,
                driver_id: 1,
                total_time: Some(80_000),
                fastest_lap: Some(39_000),
                average_lap: Some(40_000),
            },
            RaceResult {
                id: 11,
                race_id: 1,
                driver_id: 2,
                total_time: None,
                fastest_lap: None,
                average_lap: None,
            },
        ];
        let drivers = vec![
            Driver {
                id: 1,
                name: "Tiago".to_string(),
            },
            Driver {
                id: 2,
                name: "Mota".to_string(),
            },
        ];
        let laps = vec![
            LapTime {
                id: 100,
                race_result_id: 10,
                lap_number: 1,
                lap_time: 41_000,
            },
            LapTime {
                id: 101,
                race_result_id: 10,
                lap_number: 2,
                lap_time: 39_000,
            },
        ];

        let detail = Race::detail_from_rows(&race, &results, &drivers, &laps);

        assert_eq!(detail.circuit, 3);
        assert_eq!(detail.results.len(), 2);

        let first = &detail.results[0];
        assert_eq!(first.driver_name, "Tiago");
        assert_eq!(first.total_time.as_deref(), Some("1:20.000"));
        assert_eq!(first.laps.len(), 2);
        assert_eq!(first.laps[0].lap_time.as_deref(), Some("0:41.000"));

        // the all illegible driver keeps an empty but present result
        let second = &detail.results[1];
        assert_eq!(second.driver_name, "Mota");
        assert_eq!(second.total_time, None);
        assert!(second.laps.is_empty());
    }
}
