use chrono::Duration;
use utility::id::{HasId, Id};

use crate::{calendar::Service, stop::Stop};

#[derive(Debug, Clone)]
pub struct Trip {
    pub service_id: Option<Id<Service>>,
    pub headsign: Option<String>,
    pub short_name: Option<String>,
    pub stops: Vec<StopTime>,
}

impl HasId for Trip {
    type IdType = String;
}

#[derive(Debug, Clone)]
pub struct StopTime {
    pub stop_sequence: i32,

    pub stop_id: Option<Id<Stop>>,

    /// arrival time as a duration since midnight. this is because
    /// times greater than 24:00:00 are allowed to represent a time at the next day.
    pub arrival_time: Option<Duration>,

    /// departure time as a duration since midnight. this is because
    /// times greater than 24:00:00 are allowed to represent a time at the next day.
    pub departure_time: Option<Duration>,

    pub stop_headsign: Option<String>,
}
