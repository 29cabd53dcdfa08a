use std::{collections::HashMap, sync::Arc};

use chrono::NaiveDate;
use model::{
    feed::{FeedId, FeedScopedId},
    pattern::Pattern,
    stop::Stop,
    trip::Trip,
    trip_on_service_date::TripOnServiceDate,
};
use utility::id::Id;

use crate::timetable::Timetable;

/// Read-only lookup of patterns, scheduled timetables, stops, trips, and
/// `TripOnServiceDate` entities against the static schedule. Supplied by
/// the (out of scope) static loader; the engine only ever reads through
/// this trait object, never owns schedule data itself.
pub trait TransitModel: Send + Sync {
    fn feed_id(&self) -> &FeedId;

    /// The pattern a trip is scheduled on, if any.
    fn scheduled_pattern(&self, trip_id: &Id<Trip>) -> Option<Arc<Pattern>>;

    fn pattern_by_id(&self, pattern_id: &Id<Pattern>) -> Option<Arc<Pattern>>;

    fn trip(&self, trip_id: &Id<Trip>) -> Option<Arc<Trip>>;

    /// Resolves a feed-scoped trip reference to a local trip id.
    fn resolve_trip(&self, feed_scoped_id: &FeedScopedId<Trip>) -> Option<Id<Trip>>;

    /// Resolves a feed-scoped quay/stop reference to a local stop id.
    fn resolve_stop(&self, feed_scoped_id: &FeedScopedId<Stop>) -> Option<Id<Stop>>;

    /// Looks up a pre-computed `TripOnServiceDate` by its dated-journey or
    /// estimated-journey code.
    fn trip_on_service_date(&self, code: &str) -> Option<TripOnServiceDate>;
}

/// Notified inside `commit()`, before publication, with the timetables that
/// changed this cycle and the buffer's full post-merge map. Optional: the
/// `SnapshotSource` composes this in as a swappable capability rather than
/// through inheritance.
pub trait TransitLayerUpdater: Send + Sync {
    fn update(
        &self,
        dirty_timetables: &[Timetable],
        all_timetables: &HashMap<Id<Pattern>, Arc<Vec<Timetable>>>,
    );
}

/// Heuristic trip resolution consulted only when the `EntityResolver`'s
/// explicit-reference rules all fail to produce a trip. Its internal
/// heuristic is out of this engine's scope; the engine only consumes the
/// trait.
pub trait FuzzyTripMatcher: Send + Sync {
    fn match_trip(&self, hint: &str, service_date_hint: NaiveDate) -> Option<Id<Trip>>;
}
