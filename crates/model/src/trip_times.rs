use chrono::Duration;
use utility::id::Id;

use crate::{stop::Stop, trip::Trip};

/// Per-trip arrival/departure times plus per-stop status, opaque to the
/// realtime engine beyond its trip id. The per-trip record the engine
/// copies and compares across snapshot generations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripTimes {
    pub trip_id: Id<Trip>,
    pub stop_times: Vec<StopTimeUpdate>,
}

impl TripTimes {
    pub fn new(trip_id: Id<Trip>, stop_times: Vec<StopTimeUpdate>) -> Self {
        Self {
            trip_id,
            stop_times,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopTimeStatus {
    Scheduled,
    Skipped,
    /// No realtime data is known for this stop; callers fall back to the
    /// closest known neighbour per the configured propagation policy.
    NoData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopTimeUpdate {
    /// Which scheduled stop this entry belongs to, when the dialect
    /// constructing it needs to align wire calls against a pattern's stop
    /// order; `None` where the caller doesn't need positional alignment.
    pub stop_id: Option<Id<Stop>>,
    pub arrival: Option<Duration>,
    pub departure: Option<Duration>,
    pub status: StopTimeStatus,
}

impl StopTimeUpdate {
    pub fn new(
        arrival: Option<Duration>,
        departure: Option<Duration>,
        status: StopTimeStatus,
    ) -> Self {
        Self {
            stop_id: None,
            arrival,
            departure,
            status,
        }
    }

    pub fn no_data() -> Self {
        Self {
            stop_id: None,
            arrival: None,
            departure: None,
            status: StopTimeStatus::NoData,
        }
    }

    pub fn with_stop(mut self, stop_id: Id<Stop>) -> Self {
        self.stop_id = Some(stop_id);
        self
    }
}
