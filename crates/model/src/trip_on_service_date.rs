use chrono::NaiveDate;
use utility::id::Id;

use crate::trip::Trip;

/// Pairs a trip with a specific service date; the static-model counterpart
/// to the realtime engine's own trip-and-date lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TripOnServiceDate {
    pub trip_id: Id<Trip>,
    pub service_date: NaiveDate,
}

impl TripOnServiceDate {
    pub fn new(trip_id: Id<Trip>, service_date: NaiveDate) -> Self {
        Self {
            trip_id,
            service_date,
        }
    }
}
