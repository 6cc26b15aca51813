pub mod race_api;
pub mod redis;

pub mod models {
    pub mod circuit;
    pub mod driver;
    pub mod race;
    pub mod race_result;
    pub mod lap_time;

    pub mod general;
}

pub mod helpers {
    pub mod duration;
    pub mod lap;

    pub mod math;
    pub mod general;
    pub mod logging;
}

pub mod traits {
    pub mod has_id;
    pub mod as_map;
}
