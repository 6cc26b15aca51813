use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::PgConnection;
use serde::{Deserialize, Serialize};

use crate::models::NewRaceResult;
use crate::modules::helpers::lap::LapAggregates;
use crate::modules::models::driver::Driver;
use crate::modules::models::race::Race;
use crate::modules::traits::has_id::HasIdTrait;
use crate::schema::{race_results, races};

#[derive(Queryable, Serialize, Associations, Identifiable, PartialEq, Debug, Clone, Deserialize)]
#[diesel(belongs_to(Race, foreign_key = race_id))]
#[diesel(belongs_to(Driver, foreign_key = driver_id))]
pub struct RaceResult {
    pub id: i32,
    pub race_id: i32,
    pub driver_id: i32,
    pub total_time: Option<i64>,
    pub fastest_lap: Option<i64>,
    pub average_lap: Option<i64>,
}

impl RaceResult {
    /************ INSERTERS ************/
    /// # insert a drivers result of a race
    /// the aggregate fields always come from the aggregator; aggregates
    /// supplied by the extraction service never reach this row. a
    /// result with all aggregates absent is inserted as well, a driver
    /// that attended with nothing legible is not the same as a driver
    /// that did not enter.
    ///
    /// ## Arguments
    /// * `conn` - The database connection to use
    /// * `race_id_in` - The race the result belongs to
    /// * `driver_id_in` - The driver the result belongs to
    /// * `aggregates` - The derived aggregates of the drivers laps
    ///
    /// ## Returns
    /// * `RaceResult` - The inserted result
    pub fn new(
        conn: &mut PgConnection,
        race_id_in: i32,
        driver_id_in: i32,
        aggregates: &LapAggregates,
    ) -> QueryResult<RaceResult> {
        let new_result = NewRaceResult {
            race_id: race_id_in,
            driver_id: driver_id_in,
            total_time: aggregates.total_time,
            fastest_lap: aggregates.fastest_lap,
            average_lap: aggregates.average_lap,
        };

        diesel::insert_into(race_results::table)
            .values(&new_result)
            .get_result(conn)
    }

    /************ GETTERS ************/
    /// # get all results of a race
    pub fn from_race(conn: &mut PgConnection, race_id_in: i32) -> QueryResult<Vec<RaceResult>> {
        use crate::schema::race_results::dsl::*;
        race_results
            .filter(race_id.eq(race_id_in))
            .order(id.asc())
            .load::<RaceResult>(conn)
    }

    /// # get all results of a list of races
    pub fn from_races(conn: &mut PgConnection, races_in: &[Race]) -> QueryResult<Vec<RaceResult>> {
        use crate::schema::race_results::dsl::*;
        race_results
            .filter(race_id.eq_any(races_in.iter().map(|race| race.id).collect::<Vec<i32>>()))
            .load::<RaceResult>(conn)
    }

    /// # get all results of a driver
    /// get all results a driver has driven, optionally restricted to
    /// the races of a single circuit.
    ///
    /// ## Arguments
    /// * `conn` - The database connection to use
    /// * `driver_id_in` - The driver to get the results for
    /// * `circuit` - The circuit to restrict to, if any
    ///
    /// ## Returns
    /// * `Vec<RaceResult>` - the results of the driver
    pub fn from_driver(
        conn: &mut PgConnection,
        driver_id_in: i32,
        circuit: Option<i32>,
    ) -> QueryResult<Vec<RaceResult>> {
        let mut query = race_results::table
            .inner_join(races::table)
            .select(race_results::all_columns)
            .into_boxed();

        query = query.filter(race_results::driver_id.eq(driver_id_in));
        if let Some(circuit_id) = circuit {
            query = query.filter(races::circuit_id.eq(circuit_id));
        }

        query.load::<RaceResult>(conn)
    }

    /// # get all results of a driver with their race dates
    /// get all results of a driver ordered by race date ascending, each
    /// paired with the date and circuit of the race it was driven in.
    /// this is the row shape the evolution and leaderboard queries
    /// consume.
    ///
    /// ## Arguments
    /// * `conn` - The database connection to use
    /// * `driver_id_in` - The driver to get the results for
    /// * `circuit` - The circuit to restrict to, if any
    ///
    /// ## Returns
    /// * `Vec<(RaceResult, NaiveDate, i32)>` - result, race date, circuit id
    pub fn from_driver_with_dates(
        conn: &mut PgConnection,
        driver_id_in: i32,
        circuit: Option<i32>,
    ) -> QueryResult<Vec<(RaceResult, NaiveDate, i32)>> {
        let mut query = race_results::table
            .inner_join(races::table)
            .select((race_results::all_columns, races::date, races::circuit_id))
            .order(races::date.asc())
            .into_boxed();

        query = query.filter(race_results::driver_id.eq(driver_id_in));
        if let Some(circuit_id) = circuit {
            query = query.filter(races::circuit_id.eq(circuit_id));
        }

        query.load::<(RaceResult, NaiveDate, i32)>(conn)
    }
}

impl HasIdTrait for RaceResult {
    fn get_id(&self) -> i32 {
        self.id
    }
}
