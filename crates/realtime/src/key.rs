use chrono::NaiveDate;
use model::{feed::FeedScopedId, trip::Trip};

/// Compound key `(feed-scoped trip id, local service date)` used to index
/// realtime-synthesized patterns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TripIdAndServiceDate {
    pub trip_id: FeedScopedId<Trip>,
    pub service_date: NaiveDate,
}

impl TripIdAndServiceDate {
    pub fn new(trip_id: FeedScopedId<Trip>, service_date: NaiveDate) -> Self {
        Self {
            trip_id,
            service_date,
        }
    }
}
