use utility::id::{HasId, Id};

use crate::{feed::FeedId, stop::Stop, trip_times::TripTimes};

/// A sequence of stops traversed by a family of trips on a route; the
/// structural key timetables are grouped by. Modeled as an id'd struct
/// with an owned stop list, the same shape as `Trip`.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub id: Id<Pattern>,
    pub feed_id: FeedId,
    pub stops: Vec<Id<Stop>>,
    /// The baseline timetable for all service dates with no realtime
    /// changes applied.
    pub scheduled_timetable: Vec<TripTimes>,
    /// Distinguishes statically known patterns from patterns synthesized
    /// at runtime by the update handler.
    pub created_by_realtime_updater: bool,
}

impl Pattern {
    pub fn new(id: Id<Pattern>, feed_id: FeedId, stops: Vec<Id<Stop>>) -> Self {
        Self {
            id,
            feed_id,
            stops,
            scheduled_timetable: Vec::new(),
            created_by_realtime_updater: false,
        }
    }

    pub fn contains_stop(&self, stop_id: &Id<Stop>) -> bool {
        self.stops.contains(stop_id)
    }
}

impl HasId for Pattern {
    type IdType = String;
}
