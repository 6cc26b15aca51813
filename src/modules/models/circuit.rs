use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, VarChar};
use diesel::{select, sql_query, PgConnection};
use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::errors::CustomResult;
use crate::macros::database_error_handeler::db_handle_get_error;
use crate::macros::stats_caching::{cache_stats, read_cache_stats};
use crate::models::NewCircuit;
use crate::modules::helpers::duration::DurationHelper;
use crate::modules::helpers::math::Math;
use crate::modules::models::lap_time::LapTime;
use crate::modules::models::race::Race;
use crate::modules::models::race_result::RaceResult;
use crate::modules::redis::Redis;
use crate::modules::traits::has_id::HasIdTrait;
use crate::schema::circuits;

#[derive(Queryable, Serialize, Identifiable, PartialEq, Eq, Hash, Debug, Clone, Deserialize)]
pub struct Circuit {
    pub id: i32,
    pub name: String,
    pub city: String,
    pub circuit_type: String,
}

impl Circuit {
    /************ INSERTERS ************/
    pub fn new(
        conn: &mut PgConnection,
        name_in: &str,
        city_in: &str,
        circuit_type_in: &str,
    ) -> QueryResult<Circuit> {
        let new_circuit = NewCircuit {
            name: name_in.to_string(),
            city: city_in.to_string(),
            circuit_type: circuit_type_in.to_string(),
        };

        diesel::insert_into(circuits::table)
            .values(&new_circuit)
            .get_result(conn)
    }

    /************ GETTERS ************/
    pub fn exists(conn: &mut PgConnection, id_in: i32) -> QueryResult<bool> {
        use crate::schema::circuits::dsl::*;
        select(exists(circuits.filter(id.eq(id_in)))).get_result(conn)
    }

    pub fn get_by_id(conn: &mut PgConnection, id_in: i32) -> QueryResult<Circuit> {
        use crate::schema::circuits::dsl::*;
        circuits.filter(id.eq(id_in)).first::<Circuit>(conn)
    }

    /// # get all circuits
    /// get all circuits from the database, ordered by name
    ///
    /// ## Arguments
    /// * `conn` - The database connection to use
    ///
    /// ## Returns
    /// * `Vec<Circuit>` - All circuits in the database
    pub fn get_all(conn: &mut PgConnection) -> QueryResult<Vec<Circuit>> {
        use crate::schema::circuits::dsl::*;
        circuits.order(name.asc()).load::<Circuit>(conn)
    }

    /************ STATISTICS ************/
    /// # get a single circuit with stats
    /// get a circuit and its basic stats: the amount of races held
    /// there, the amount of laps recorded, and the all time fastest lap
    /// at the circuit together with the driver that drove it.
    ///
    /// ## Arguments
    /// * `conn` - the database connection
    /// * `circuit_id_in` - the id of the circuit
    ///
    /// ## Returns
    /// * `CircuitStats` - circuit and its stats
    pub fn get_with_stats(conn: &mut PgConnection, circuit_id_in: i32) -> CustomResult<CircuitStats> {
        read_cache_stats!(format!("stats:circuit:{}:detail", circuit_id_in));

        let circuit = db_handle_get_error!(
            Circuit::get_by_id(conn, circuit_id_in),
            "models/circuit:get_with_stats",
            "circuit",
            circuit_id_in
        );

        let totals = db_handle_get_error!(
            sql_query(
                "
        select
            CAST(count(distinct r.id) as INT) as total_races,
            CAST(count(l.id) as INT) as total_laps
        from races r
            left join race_results rr on rr.race_id = r.id
            left join lap_times l on l.race_result_id = rr.id
        where r.circuit_id = $1
        ",
            )
            .bind::<Integer, _>(circuit_id_in)
            .get_result::<CircuitTotalsRow>(conn),
            "models/circuit:get_with_stats",
            "circuit totals",
            circuit_id_in
        );

        let fastest = db_handle_get_error!(
            sql_query(
                "
        select l.lap_time, d.name as driver_name
        from lap_times l
            inner join race_results rr on l.race_result_id = rr.id
            inner join races r on rr.race_id = r.id
            inner join drivers d on rr.driver_id = d.id
        where r.circuit_id = $1
        order by l.lap_time asc
        limit 1
        ",
            )
            .bind::<Integer, _>(circuit_id_in)
            .get_result::<CircuitFastestLapRow>(conn)
            .optional(),
            "models/circuit:get_with_stats",
            "circuit fastest lap",
            circuit_id_in
        );

        let stats = CircuitStats {
            id: circuit.id,
            name: circuit.name,
            city: circuit.city,
            circuit_type: circuit.circuit_type,
            stats: CircuitStatTotals {
                total_races: totals.total_races,
                total_laps: totals.total_laps,
                fastest_lap_ever: fastest
                    .as_ref()
                    .and_then(|row| DurationHelper::format_laptime(Some(row.lap_time))),
                fastest_lap_driver: fastest.map(|row| row.driver_name),
            },
        };

        cache_stats!(format!("stats:circuit:{}:detail", circuit_id_in), stats);
    }

    /// # get the evolution of a circuit
    /// get the lap time trend of a circuit over time: one series with
    /// the fastest single lap of every race and one with the mean of
    /// the drivers average laps, both ordered by race date.
    ///
    /// ## Arguments
    /// * `conn` - the database connection
    /// * `circuit_id_in` - the id of the circuit
    ///
    /// ## Returns
    /// * `CircuitEvolution` - the two evolution series
    pub fn get_evolution(conn: &mut PgConnection, circuit_id_in: i32) -> CustomResult<CircuitEvolution> {
        read_cache_stats!(format!("stats:circuit:{}:evolution", circuit_id_in));

        let circuit = db_handle_get_error!(
            Circuit::get_by_id(conn, circuit_id_in),
            "models/circuit:get_evolution",
            "circuit",
            circuit_id_in
        );

        let races = db_handle_get_error!(
            Race::from_circuit_chronological(conn, circuit_id_in),
            "models/circuit:get_evolution",
            "races",
            circuit_id_in
        );
        let results = db_handle_get_error!(
            RaceResult::from_races(conn, &races),
            "models/circuit:get_evolution",
            "race results",
            circuit_id_in
        );
        let laps = db_handle_get_error!(
            LapTime::from_results(conn, &results),
            "models/circuit:get_evolution",
            "laps",
            circuit_id_in
        );

        let evolution = Circuit::evolution_from_rows(&circuit, &races, &results, &laps);

        cache_stats!(format!("stats:circuit:{}:evolution", circuit_id_in), evolution);
    }

    /// build the evolution series from already loaded rows. the races
    /// are expected in chronological order. a race only contributes to
    /// a series when the metric exists for it, the two series are
    /// skipped independently.
    pub fn evolution_from_rows(
        circuit: &Circuit,
        races: &[Race],
        results: &[RaceResult],
        laps: &[LapTime],
    ) -> CircuitEvolution {
        let mut fastest_lap_evolution = Vec::new();
        let mut average_lap_evolution = Vec::new();

        for race in races {
            let race_results: Vec<&RaceResult> =
                results.iter().filter(|result| result.race_id == race.id).collect();

            let fastest = laps
                .iter()
                .filter(|lap| race_results.iter().any(|result| result.id == lap.race_result_id))
                .map(|lap| lap.lap_time)
                .min();
            if let Some(lap_time) = DurationHelper::format_laptime(fastest) {
                fastest_lap_evolution.push(EvolutionPoint {
                    date: race.date,
                    race_id: race.id,
                    lap_time,
                });
            }

            // mean over the results average laps, not lap weighted
            let averages: Vec<Option<i64>> =
                race_results.iter().map(|result| result.average_lap).collect();
            if let Some(lap_time) = DurationHelper::format_laptime(Math::mean_millis(&averages)) {
                average_lap_evolution.push(EvolutionPoint {
                    date: race.date,
                    race_id: race.id,
                    lap_time,
                });
            }
        }

        CircuitEvolution {
            circuit_id: circuit.id,
            circuit_name: circuit.name.clone(),
            fastest_lap_evolution,
            average_lap_evolution,
        }
    }

}

impl HasIdTrait for Circuit {
    fn get_id(&self) -> i32 {
        self.id
    }
}

#[derive(QueryableByName)]
struct CircuitTotalsRow {
    #[diesel(sql_type = Integer)]
    total_races: i32,
    #[diesel(sql_type = Integer)]
    total_laps: i32,
}

#[derive(QueryableByName)]
struct CircuitFastestLapRow {
    #[diesel(sql_type = BigInt)]
    lap_time: i64,
    #[diesel(sql_type = VarChar)]
    driver_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CircuitStats {
    pub id: i32,
    pub name: String,
    pub city: String,
    pub circuit_type: String,
    pub stats: CircuitStatTotals,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CircuitStatTotals {
    pub total_races: i32,
    pub total_laps: i32,
    pub fastest_lap_ever: Option<String>,
    pub fastest_lap_driver: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EvolutionPoint {
    pub date: chrono::NaiveDate,
    pub race_id: i32,
    pub lap_time: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CircuitEvolution {
    pub circuit_id: i32,
    pub circuit_name: String,
    pub fastest_lap_evolution: Vec<EvolutionPoint>,
    pub average_lap_evolution: Vec<EvolutionPoint>,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::Circuit;
    use crate::modules::models::lap_time::LapTime;
    use crate::modules::models::race::Race;
    use crate::modules::models::race_result::RaceResult;

    fn circuit() -> Circuit {
        Circuit {
            id: 1,
            name: "Kartódromo de Palmela".to_string(),
            city: "Palmela".to_string(),
            circuit_type: "outdoor".to_string(),
        }
    }

    fn race(id: i32, date: &str) -> Race {
        Race {
            id,
            circuit_id: 1,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        }
    }

    fn result(id: i32, race_id: i32, average_lap: Option<i64>) -> RaceResult {
        RaceResult {
            id,
            race_id,
            driver_id: 1,
            total_time: None,
            fastest_lap: None,
            average_lap,
        }
    }

    fn lap(id: i32, race_result_id: i32, lap_time: i64) -> LapTime {
        LapTime {
            id,
            race_result_id,
            lap_number: 1,
            lap_time,
        }
    }

    #[test]
    fn evolution_series_follow_race_order() {
        let races = vec![race(1, "2025-03-01"), race(2, "2025-04-01")];
        let results = vec![
            result(10, 1, Some(40_000)),
            result(11, 2, Some(42_000)),
        ];
        let laps = vec![lap(100, 10, 39_000), lap(101, 11, 41_500)];

        let evolution = Circuit::evolution_from_rows(&circuit(), &races, &results, &laps);

        let fastest: Vec<&str> = evolution
            .fastest_lap_evolution
            .iter()
            .map(|point| point.lap_time.as_str())
            .collect();
        assert_eq!(fastest, vec!["0:39.000", "0:41.500"]);

        let averages: Vec<&str> = evolution
            .average_lap_evolution
            .iter()
            .map(|point| point.lap_time.as_str())
            .collect();
        assert_eq!(averages, vec!["0:40.000", "0:42.000"]);
    }

    #[test]
    fn race_average_is_mean_of_result_averages() {
        // two drivers with different lap counts: the race average is
        // the average of their averages, not weighted by laps
        let races = vec![race(1, "2025-03-01")];
        let results = vec![
            result(10, 1, Some(40_000)),
            result(11, 1, Some(50_000)),
        ];
        let laps = vec![
            lap(100, 10, 40_000),
            lap(101, 11, 50_000),
            lap(102, 11, 50_000),
            lap(103, 11, 50_000),
        ];

        let evolution = Circuit::evolution_from_rows(&circuit(), &races, &results, &laps);
        assert_eq!(evolution.average_lap_evolution[0].lap_time, "0:45.000");
    }

    #[test]
    fn results_without_averages_are_skipped_per_series() {
        // race 1 has laps but only null averages, race 2 has neither
        let races = vec![race(1, "2025-03-01"), race(2, "2025-04-01")];
        let results = vec![result(10, 1, None), result(11, 2, None)];
        let laps = vec![lap(100, 10, 39_000)];

        let evolution = Circuit::evolution_from_rows(&circuit(), &races, &results, &laps);

        assert_eq!(evolution.fastest_lap_evolution.len(), 1);
        assert_eq!(evolution.fastest_lap_evolution[0].race_id, 1);
        assert!(evolution.average_lap_evolution.is_empty());
    }

    #[test]
    fn empty_circuit_yields_empty_series() {
        let evolution = Circuit::evolution_from_rows(&circuit(), &[], &[], &[]);
        assert!(evolution.fastest_lap_evolution.is_empty());
        assert!(evolution.average_lap_evolution.is_empty());
    }
}
