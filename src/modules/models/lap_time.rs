use diesel::prelude::*;
use diesel::PgConnection;
use log::error;
use serde::{Deserialize, Serialize};

use crate::models::NewLapTime;
use crate::modules::models::race_result::RaceResult;
use crate::modules::traits::has_id::HasIdTrait;
use crate::schema::lap_times;

#[derive(Queryable, Serialize, Associations, Identifiable, PartialEq, Debug, Clone, Deserialize)]
#[diesel(belongs_to(RaceResult, foreign_key = race_result_id))]
pub struct LapTime {
    pub id: i32,
    pub race_result_id: i32,
    pub lap_number: i32,
    pub lap_time: i64,
}

impl LapTime {
    /************ INSERTERS ************/
    /// # insert multiple laps into the database
    /// insert the kept laps of one result in a single statement. only
    /// laps with a resolved duration ever get here, a lap without one
    /// is never persisted.
    ///
    /// ## Arguments
    /// * `conn` - The database connection to use
    /// * `new_laps` - The new laps to insert
    ///
    /// ## Returns
    /// * `Vec<LapTime>` - The inserted laps
    pub fn insert_bulk(
        conn: &mut PgConnection,
        new_laps: &Vec<NewLapTime>,
    ) -> QueryResult<Vec<LapTime>> {
        use crate::schema::lap_times::dsl::*;

        match diesel::insert_into(lap_times)
            .values(new_laps)
            .get_results::<LapTime>(conn)
        {
            Ok(inserted_laps) => Ok(inserted_laps),
            Err(error) => {
                error!(target:"models/lap_time:insert_bulk", "Error inserting laps: (error: {})", error);
                Err(error)
            }
        }
    }

    /************ GETTERS ************/
    /// # get all laps of a list of results
    /// laps come back in their persisted order
    pub fn from_results(
        conn: &mut PgConnection,
        results_in: &[RaceResult],
    ) -> QueryResult<Vec<LapTime>> {
        use crate::schema::lap_times::dsl::*;
        lap_times
            .filter(
                race_result_id.eq_any(results_in.iter().map(|result| result.id).collect::<Vec<i32>>()),
            )
            .order(id.asc())
            .load::<LapTime>(conn)
    }

    /// # count the laps of a list of results
    pub fn count_for_results(conn: &mut PgConnection, result_ids: &[i32]) -> QueryResult<i64> {
        use crate::schema::lap_times::dsl::*;
        lap_times
            .filter(race_result_id.eq_any(result_ids))
            .count()
            .get_result::<i64>(conn)
    }
}

impl HasIdTrait for LapTime {
    fn get_id(&self) -> i32 {
        self.id
    }
}
