use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::PgConnection;
use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{CustomResult, Error};
use crate::macros::database_error_handeler::db_handle_get_error;
use crate::macros::redis::delete_keys;
use crate::macros::stats_caching::{cache_stats, read_cache_stats};
use crate::models::NewDriver;
use crate::modules::helpers::duration::DurationHelper;
use crate::modules::helpers::general::Helpers;
use crate::modules::helpers::math::Math;
use crate::modules::models::lap_time::LapTime;
use crate::modules::models::race_result::RaceResult;
use crate::modules::redis::Redis;
use crate::modules::traits::has_id::HasIdTrait;
use crate::schema::drivers;

#[derive(Queryable, Serialize, Identifiable, PartialEq, Eq, Hash, Debug, Clone, Deserialize)]
pub struct Driver {
    pub id: i32,
    pub name: String,
}

impl Driver {
    /************ INSERTERS ************/
    /// # ensure a driver exists
    /// find or create a driver by its exact name. the insert and the
    /// lookup go through `ON CONFLICT DO NOTHING` so two ingestions
    /// running at the same time cannot race each other into duplicate
    /// drivers.
    ///
    /// ## Arguments
    /// * `conn` - the database connection to use
    /// * `name_in` - the exact, case sensitive driver name
    ///
    /// ## Returns
    /// * `Driver` - the existing or freshly created driver
    pub fn ensure_exists(conn: &mut PgConnection, name_in: &str) -> QueryResult<Driver> {
        use crate::schema::drivers::dsl::*;

        let new_driver = NewDriver {
            name: name_in.to_string(),
        };
        diesel::insert_into(drivers)
            .values(&new_driver)
            .on_conflict(name)
            .do_nothing()
            .execute(conn)?;

        drivers.filter(name.eq(name_in)).first::<Driver>(conn)
    }

    /************ GETTERS ************/
    pub fn get_by_id(conn: &mut PgConnection, id_in: i32) -> QueryResult<Driver> {
        use crate::schema::drivers::dsl::*;
        drivers.filter(id.eq(id_in)).first::<Driver>(conn)
    }

    /// # get all drivers
    /// get all drivers from the database, ordered by name
    pub fn get_all(conn: &mut PgConnection) -> QueryResult<Vec<Driver>> {
        use crate::schema::drivers::dsl::*;
        drivers.order(name.asc()).load::<Driver>(conn)
    }

    /// # get the drivers of a list of results
    pub fn from_results(
        conn: &mut PgConnection,
        results: &[RaceResult],
    ) -> QueryResult<Vec<Driver>> {
        use crate::schema::drivers::dsl::*;
        let driver_ids: Vec<i32> = results.iter().map(|result| result.driver_id).collect();
        drivers.filter(id.eq_any(driver_ids)).load::<Driver>(conn)
    }

    /************ STATISTICS ************/
    /// # get a single driver with stats
    /// get a driver and its basic stats: the amount of races driven and
    /// the amount of laps recorded, optionally scoped to one circuit.
    /// a circuit filter that does not parse as an integer is ignored.
    ///
    /// ## Arguments
    /// * `conn` - the database connection
    /// * `driver_id_in` - the id of the driver
    /// * `circuit_filter` - optional, loosely typed circuit filter
    ///
    /// ## Returns
    /// * `DriverStats` - driver and its stats
    pub fn get_with_stats(
        conn: &mut PgConnection,
        driver_id_in: i32,
        circuit_filter: Option<&str>,
    ) -> CustomResult<DriverStats> {
        let circuit = Helpers::parse_circuit_filter(circuit_filter);
        let cache_key = format!(
            "stats:driver:{}:detail:{}",
            driver_id_in,
            circuit.map_or("all".to_string(), |c| c.to_string())
        );
        read_cache_stats!(cache_key);

        let driver = db_handle_get_error!(
            Driver::get_by_id(conn, driver_id_in),
            "models/driver:get_with_stats",
            "driver",
            driver_id_in
        );

        let results = db_handle_get_error!(
            RaceResult::from_driver(conn, driver_id_in, circuit),
            "models/driver:get_with_stats",
            "race results",
            driver_id_in
        );
        let result_ids: Vec<i32> = results.iter().map(|result| result.id).collect();
        let total_laps = db_handle_get_error!(
            LapTime::count_for_results(conn, &result_ids),
            "models/driver:get_with_stats",
            "lap count",
            driver_id_in
        );

        let stats = DriverStats {
            id: driver.id,
            name: driver.name,
            total_races: results.len() as i64,
            total_laps,
        };

        cache_stats!(cache_key, stats);
    }

    /// # get the evolution of a driver
    /// get the drivers results ordered by race date, each annotated
    /// with the race date, the circuit it was driven at, and the
    /// drivers own fastest and average lap of that race. an invalid
    /// circuit filter is ignored, not an error.
    ///
    /// ## Arguments
    /// * `conn` - the database connection
    /// * `driver_id_in` - the id of the driver
    /// * `circuit_filter` - optional, loosely typed circuit filter
    ///
    /// ## Returns
    /// * `DriverEvolution` - the evolution series
    pub fn get_evolution(
        conn: &mut PgConnection,
        driver_id_in: i32,
        circuit_filter: Option<&str>,
    ) -> CustomResult<DriverEvolution> {
        let circuit = Helpers::parse_circuit_filter(circuit_filter);
        let cache_key = format!(
            "stats:driver:{}:evolution:{}",
            driver_id_in,
            circuit.map_or("all".to_string(), |c| c.to_string())
        );
        read_cache_stats!(cache_key);

        let driver = db_handle_get_error!(
            Driver::get_by_id(conn, driver_id_in),
            "models/driver:get_evolution",
            "driver",
            driver_id_in
        );

        let rows = db_handle_get_error!(
            RaceResult::from_driver_with_dates(conn, driver_id_in, circuit),
            "models/driver:get_evolution",
            "race results",
            driver_id_in
        );

        let evolution = Driver::evolution_from_rows(&driver, &rows);

        cache_stats!(cache_key, evolution);
    }

    /// build the evolution series from already loaded rows. the rows
    /// are expected ordered by race date ascending.
    pub fn evolution_from_rows(
        driver: &Driver,
        rows: &[(RaceResult, NaiveDate, i32)],
    ) -> DriverEvolution {
        DriverEvolution {
            driver_id: driver.id,
            driver_name: driver.name.clone(),
            evolution: rows
                .iter()
                .map(|(result, date, circuit_id)| DriverEvolutionPoint {
                    date: *date,
                    circuit_id: *circuit_id,
                    fastest_lap: DurationHelper::format_laptime(result.fastest_lap),
                    average_lap: DurationHelper::format_laptime(result.average_lap),
                })
                .collect(),
        }
    }

    /// # compare drivers
    /// compare up to 4 drivers head to head, optionally scoped to one
    /// circuit. the id list is required input: it must parse in full
    /// and hold at most 4 ids, otherwise the call fails before any
    /// query runs. ids of drivers that do not exist are dropped from
    /// the result instead of failing the whole comparison.
    ///
    /// ## Arguments
    /// * `conn` - the database connection
    /// * `ids_param` - the raw comma separated driver id list
    /// * `circuit_filter` - optional, loosely typed circuit filter
    ///
    /// ## Returns
    /// * `DriverComparison` - one entry per known driver
    pub fn compare(
        conn: &mut PgConnection,
        ids_param: &str,
        circuit_filter: Option<&str>,
    ) -> CustomResult<DriverComparison> {
        let ids = Helpers::parse_id_list(ids_param)?;
        let circuit = Helpers::parse_circuit_filter(circuit_filter);

        let mut drivers_data = Vec::new();
        for driver_id in ids {
            let driver = match Driver::get_by_id(conn, driver_id) {
                Ok(driver) => driver,
                Err(diesel::result::Error::NotFound) => continue,
                Err(source) => {
                    error!(target:"models/driver:compare", "Error getting driver. (error: {})", source);
                    return Err(Error::DatabaseError { source });
                }
            };

            let results = db_handle_get_error!(
                RaceResult::from_driver(conn, driver_id, circuit),
                "models/driver:compare",
                "race results",
                driver_id
            );
            let result_ids: Vec<i32> = results.iter().map(|result| result.id).collect();
            let total_laps = db_handle_get_error!(
                LapTime::count_for_results(conn, &result_ids),
                "models/driver:compare",
                "lap count",
                driver_id
            );

            drivers_data.push(Driver::comparison_entry(&driver, &results, total_laps));
        }

        Ok(DriverComparison {
            drivers: drivers_data,
        })
    }

    /// derive one comparison entry from a drivers loaded results
    pub fn comparison_entry(
        driver: &Driver,
        results: &[RaceResult],
        total_laps: i64,
    ) -> DriverComparisonEntry {
        let fastest: Vec<Option<i64>> = results.iter().map(|result| result.fastest_lap).collect();
        let averages: Vec<Option<i64>> = results.iter().map(|result| result.average_lap).collect();

        DriverComparisonEntry {
            id: driver.id,
            name: driver.name.clone(),
            total_races: results.len() as i64,
            total_laps,
            best_lap: DurationHelper::format_laptime(Math::min_millis(&fastest)),
            average_lap: DurationHelper::format_laptime(Math::mean_millis(&averages)),
        }
    }

    /// # get the leaderboard
    /// rank all drivers by best mean average lap and by best single
    /// fastest lap, once over all results and once restricted to races
    /// of the trailing 365 days. an invalid circuit filter is ignored.
    ///
    /// ## Arguments
    /// * `conn` - the database connection
    /// * `circuit_filter` - optional, loosely typed circuit filter
    ///
    /// ## Returns
    /// * `Leaderboard` - the four ranked lists
    pub fn leaderboard(
        conn: &mut PgConnection,
        circuit_filter: Option<&str>,
    ) -> CustomResult<Leaderboard> {
        let circuit = Helpers::parse_circuit_filter(circuit_filter);
        let cache_key = format!(
            "stats:leaderboard:{}",
            circuit.map_or("all".to_string(), |c| c.to_string())
        );
        read_cache_stats!(cache_key);

        let drivers = db_handle_get_error!(
            Driver::get_all(conn),
            "models/driver:leaderboard",
            "drivers",
            "all"
        );

        let mut rows = Vec::new();
        for driver in drivers {
            let results = db_handle_get_error!(
                RaceResult::from_driver_with_dates(conn, driver.id, circuit),
                "models/driver:leaderboard",
                "race results",
                driver.id
            );
            let result_rows: Vec<DriverResultRow> = results
                .iter()
                .map(|(result, date, _)| DriverResultRow {
                    date: *date,
                    fastest_lap: result.fastest_lap,
                    average_lap: result.average_lap,
                })
                .collect();
            rows.push((driver, result_rows));
        }

        let leaderboard = Driver::leaderboard_from_rows(&rows, chrono::Local::now().date_naive());

        cache_stats!(cache_key, leaderboard);
    }

    /// build the four leaderboard lists from already loaded rows.
    ///
    /// every list is sorted ascending on the underlying millisecond
    /// value and formatted afterwards. sorting the formatted text would
    /// misorder entries once minute digit counts diverge ("10:00.000"
    /// sorts before "2:00.000" as text), so the ordering key is always
    /// numeric. drivers without a qualifying metric are left out of
    /// that list entirely.
    pub fn leaderboard_from_rows(
        rows: &[(Driver, Vec<DriverResultRow>)],
        today: NaiveDate,
    ) -> Leaderboard {
        let one_year_ago = today - chrono::Duration::days(365);

        let mut best_avg_overall = Vec::new();
        let mut fastest_overall = Vec::new();
        let mut best_avg_last_year = Vec::new();
        let mut fastest_last_year = Vec::new();

        for (driver, results) in rows {
            if results.is_empty() {
                continue;
            }

            Driver::push_window_entries(
                driver,
                results,
                &mut best_avg_overall,
                &mut fastest_overall,
            );

            let last_year_results: Vec<DriverResultRow> = results
                .iter()
                .filter(|row| row.date >= one_year_ago)
                .cloned()
                .collect();
            Driver::push_window_entries(
                driver,
                &last_year_results,
                &mut best_avg_last_year,
                &mut fastest_last_year,
            );
        }

        Leaderboard {
            overall: LeaderboardWindow {
                best_average_lap: Driver::sort_and_strip_avg(best_avg_overall),
                fastest_lap: Driver::sort_and_strip_fastest(fastest_overall),
            },
            last_year: LeaderboardWindow {
                best_average_lap: Driver::sort_and_strip_avg(best_avg_last_year),
                fastest_lap: Driver::sort_and_strip_fastest(fastest_last_year),
            },
        }
    }

    fn push_window_entries(
        driver: &Driver,
        results: &[DriverResultRow],
        avg_list: &mut Vec<(i64, LeaderboardAverageEntry)>,
        fastest_list: &mut Vec<(i64, LeaderboardFastestEntry)>,
    ) {
        if results.is_empty() {
            return;
        }

        let averages: Vec<Option<i64>> = results.iter().map(|row| row.average_lap).collect();
        let fastest: Vec<Option<i64>> = results.iter().map(|row| row.fastest_lap).collect();

        if let Some(millis) = Math::mean_millis(&averages) {
            if let Some(average_lap) = DurationHelper::format_laptime(Some(millis)) {
                avg_list.push((
                    millis,
                    LeaderboardAverageEntry {
                        driver_id: driver.id,
                        driver_name: driver.name.clone(),
                        average_lap,
                    },
                ));
            }
        }

        if let Some(millis) = Math::min_millis(&fastest) {
            if let Some(fastest_lap) = DurationHelper::format_laptime(Some(millis)) {
                fastest_list.push((
                    millis,
                    LeaderboardFastestEntry {
                        driver_id: driver.id,
                        driver_name: driver.name.clone(),
                        fastest_lap,
                    },
                ));
            }
        }
    }

    fn sort_and_strip_avg(mut list: Vec<(i64, LeaderboardAverageEntry)>) -> Vec<LeaderboardAverageEntry> {
        list.sort_by_key(|(millis, _)| *millis);
        list.into_iter().map(|(_, entry)| entry).collect()
    }

    fn sort_and_strip_fastest(mut list: Vec<(i64, LeaderboardFastestEntry)>) -> Vec<LeaderboardFastestEntry> {
        list.sort_by_key(|(millis, _)| *millis);
        list.into_iter().map(|(_, entry)| entry).collect()
    }

    /************ CACHING ************/
    pub fn clear_cache(&self, r_conn: &mut redis::Connection) {
        let mut keys = match Redis::keys(r_conn, format!("stats:driver:{}:*", self.id)) {
            Ok(keys) => keys,
            Err(error) => {
                error!(target:"models/driver:clear_cache", "Error getting keys from redis: {}", error);
                return;
            }
        };
        keys.append(&mut Redis::keys(r_conn, "stats:leaderboard*").unwrap_or_default());

        delete_keys!(r_conn, keys, "models/driver:clear_cache");
    }
}

impl HasIdTrait for Driver {
    fn get_id(&self) -> i32 {
        self.id
    }
}

/// one loaded result row of a driver, reduced to what the leaderboard
/// needs
#[derive(Debug, Clone, PartialEq)]
pub struct DriverResultRow {
    pub date: NaiveDate,
    pub fastest_lap: Option<i64>,
    pub average_lap: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DriverStats {
    pub id: i32,
    pub name: String,
    pub total_races: i64,
    pub total_laps: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DriverEvolutionPoint {
    pub date: NaiveDate,
    pub circuit_id: i32,
    pub fastest_lap: Option<String>,
    pub average_lap: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DriverEvolution {
    pub driver_id: i32,
    pub driver_name: String,
    pub evolution: Vec<DriverEvolutionPoint>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DriverComparisonEntry {
    pub id: i32,
    pub name: String,
    pub total_races: i64,
    pub total_laps: i64,
    pub best_lap: Option<String>,
    pub average_lap: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DriverComparison {
    pub drivers: Vec<DriverComparisonEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LeaderboardAverageEntry {
    pub driver_id: i32,
    pub driver_name: String,
    pub average_lap: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LeaderboardFastestEntry {
    pub driver_id: i32,
    pub driver_name: String,
    pub fastest_lap: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LeaderboardWindow {
    pub best_average_lap: Vec<LeaderboardAverageEntry>,
    pub fastest_lap: Vec<LeaderboardFastestEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Leaderboard {
    pub overall: LeaderboardWindow,
    pub last_year: LeaderboardWindow,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Driver, DriverResultRow};
    use crate::modules::models::race_result::RaceResult;

    fn driver(id: i32, name: &str) -> Driver {
        Driver {
            id,
            name: name.to_string(),
        }
    }

    fn date(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
    }

    fn row(date_text: &str, fastest: Option<i64>, average: Option<i64>) -> DriverResultRow {
        DriverResultRow {
            date: date(date_text),
            fastest_lap: fastest,
            average_lap: average,
        }
    }

    #[test]
    fn leaderboard_sorts_numerically_across_minute_digit_boundary() {
        // "10:00.000" sorts before "2:00.000" as text; the ranking has
        // to use the underlying duration instead
        let rows = vec![
            (
                driver(1, "Tiago"),
                vec![row("2025-06-01", Some(600_000), Some(600_000))],
            ),
            (
                driver(2, "Gonçalo"),
                vec![row("2025-06-01", Some(120_000), Some(120_000))],
            ),
        ];

        let leaderboard = Driver::leaderboard_from_rows(&rows, date("2025-06-15"));

        let fastest: Vec<&str> = leaderboard
            .overall
            .fastest_lap
            .iter()
            .map(|entry| entry.driver_name.as_str())
            .collect();
        assert_eq!(fastest, vec!["Gonçalo", "Tiago"]);
        assert_eq!(leaderboard.overall.fastest_lap[0].fastest_lap, "2:00.000");
        assert_eq!(leaderboard.overall.fastest_lap[1].fastest_lap, "10:00.000");

        let averages: Vec<&str> = leaderboard
            .overall
            .best_average_lap
            .iter()
            .map(|entry| entry.driver_name.as_str())
            .collect();
        assert_eq!(averages, vec!["Gonçalo", "Tiago"]);
    }

    #[test]
    fn leaderboard_windows_on_trailing_365_days() {
        let rows = vec![(
            driver(1, "Tiago"),
            vec![
                row("2024-01-01", Some(40_000), Some(41_000)),
                row("2025-06-01", Some(43_000), Some(44_000)),
            ],
        )];

        let leaderboard = Driver::leaderboard_from_rows(&rows, date("2025-06-15"));

        // overall takes the old personal best, last year only sees the
        // recent race
        assert_eq!(leaderboard.overall.fastest_lap[0].fastest_lap, "0:40.000");
        assert_eq!(leaderboard.last_year.fastest_lap[0].fastest_lap, "0:43.000");
        assert_eq!(
            leaderboard.last_year.best_average_lap[0].average_lap,
            "0:44.000"
        );
    }

    #[test]
    fn leaderboard_mean_averages_across_results() {
        let rows = vec![(
            driver(1, "Tiago"),
            vec![
                row("2025-05-01", Some(40_000), Some(42_000)),
                row("2025-06-01", Some(41_000), Some(44_000)),
            ],
        )];

        let leaderboard = Driver::leaderboard_from_rows(&rows, date("2025-06-15"));
        assert_eq!(
            leaderboard.overall.best_average_lap[0].average_lap,
            "0:43.000"
        );
    }

    #[test]
    fn drivers_without_qualifying_results_are_omitted() {
        let rows = vec![
            (driver(1, "Tiago"), vec![]),
            (driver(2, "Gonçalo"), vec![row("2025-06-01", None, None)]),
            (
                driver(3, "Rui"),
                vec![row("2025-06-01", Some(40_000), Some(41_000))],
            ),
        ];

        let leaderboard = Driver::leaderboard_from_rows(&rows, date("2025-06-15"));

        assert_eq!(leaderboard.overall.best_average_lap.len(), 1);
        assert_eq!(leaderboard.overall.fastest_lap.len(), 1);
        assert_eq!(leaderboard.overall.fastest_lap[0].driver_id, 3);
        assert_eq!(leaderboard.last_year.fastest_lap.len(), 1);
    }

    #[test]
    fn driver_with_only_fastest_metric_appears_in_fastest_list_only() {
        let rows = vec![(
            driver(1, "Tiago"),
            vec![row("2025-06-01", Some(40_000), None)],
        )];

        let leaderboard = Driver::leaderboard_from_rows(&rows, date("2025-06-15"));
        assert!(leaderboard.overall.best_average_lap.is_empty());
        assert_eq!(leaderboard.overall.fastest_lap.len(), 1);
    }

    #[test]
    fn comparison_entry_derives_best_and_mean() {
        let results = vec![
            RaceResult {
                id: 1,
                race_id: 1,
                driver_id: 1,
                total_time: Some(200_000),
                fastest_lap: Some(39_500),
                average_lap: Some(40_000),
            },
            RaceResult {
                id: 2,
                race_id: 2,
                driver_id: 1,
                total_time: None,
                fastest_lap: None,
                average_lap: None,
            },
            RaceResult {
                id: 3,
                race_id: 3,
                driver_id: 1,
                total_time: Some(250_000),
                fastest_lap: Some(41_000),
                average_lap: Some(42_000),
            },
        ];

        let entry = Driver::comparison_entry(&driver(1, "Tiago"), &results, 11);

        assert_eq!(entry.total_races, 3);
        assert_eq!(entry.total_laps, 11);
        assert_eq!(entry.best_lap.as_deref(), Some("0:39.500"));
        // the empty result is skipped by the mean, not counted as zero
        assert_eq!(entry.average_lap.as_deref(), Some("0:41.000"));
    }

    #[test]
    fn comparison_entry_with_no_results_has_null_metrics() {
        let entry = Driver::comparison_entry(&driver(1, "Tiago"), &[], 0);
        assert_eq!(entry.total_races, 0);
        assert_eq!(entry.best_lap, None);
        assert_eq!(entry.average_lap, None);
    }

    #[test]
    fn evolution_keeps_row_order_and_formats_nulls_as_none() {
        let rows = vec![
            (
                RaceResult {
                    id: 1,
                    race_id: 1,
                    driver_id: 1,
                    total_time: Some(120_000),
                    fastest_lap: Some(39_000),
                    average_lap: Some(40_000),
                },
                date("2025-03-01"),
                7,
            ),
            (
                RaceResult {
                    id: 2,
                    race_id: 2,
                    driver_id: 1,
                    total_time: None,
                    fastest_lap: None,
                    average_lap: None,
                },
                date("2025-04-01"),
                8,
            ),
        ];

        let evolution = Driver::evolution_from_rows(&driver(1, "Tiago"), &rows);

        assert_eq!(evolution.evolution.len(), 2);
        assert_eq!(evolution.evolution[0].circuit_id, 7);
        assert_eq!(evolution.evolution[0].fastest_lap.as_deref(), Some("0:39.000"));
        assert_eq!(evolution.evolution[1].fastest_lap, None);
        assert_eq!(evolution.evolution[1].average_lap, None);
    }
}
