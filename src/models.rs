use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use crate::schema::*;


#[derive(Insertable, Serialize, Debug, Clone, Deserialize)]
#[diesel(table_name = circuits)]
pub struct NewCircuit {
    pub name: String,
    pub city: String,
    pub circuit_type: String,
}

#[derive(Insertable, Serialize, Debug, Clone, Deserialize)]
#[diesel(table_name = drivers)]
pub struct NewDriver {
    pub name: String,
}

#[derive(Insertable, Serialize, Debug, Clone, Deserialize)]
#[diesel(table_name = races)]
pub struct NewRace {
    pub circuit_id: i32,
    pub date: chrono::NaiveDate,
}

#[derive(Insertable, Serialize, Debug, Clone, Deserialize)]
#[diesel(table_name = race_results)]
pub struct NewRaceResult {
    pub race_id: i32,
    pub driver_id: i32,
    pub total_time: Option<i64>,
    pub fastest_lap: Option<i64>,
    pub average_lap: Option<i64>,
}

#[derive(Insertable, Serialize, Debug, Clone, Deserialize)]
#[diesel(table_name = lap_times)]
pub struct NewLapTime {
    pub race_result_id: i32,
    pub lap_number: i32,
    pub lap_time: i64,
}
