use std::sync::Arc;

use chrono::NaiveDate;
use model::{pattern::Pattern, trip::Trip, trip_times::TripTimes};
use utility::id::Id;

/// Realtime variant of a pattern's stop-time table for one service date, or
/// the baseline (service date `None`) timetable for all dates without a
/// realtime override.
///
/// Read-only and cheaply `Clone`-able (`Arc`-shared), handed out by
/// `TimetableBuffer::resolve` and `Snapshot::resolve` alike. It has no
/// mutating methods; converting a
/// published `Timetable` into something mutable requires going through
/// [`Timetable::to_dirty`], which produces an independent [`DirtyTimetable`]
/// copy rather than exposing interior mutability on the shared value.
#[derive(Debug, Clone)]
pub struct Timetable(Arc<Inner>);

#[derive(Debug)]
struct Inner {
    pattern_id: Id<Pattern>,
    service_date: Option<NaiveDate>,
    trip_times: Vec<TripTimes>,
}

impl Timetable {
    pub fn baseline(pattern_id: Id<Pattern>, trip_times: Vec<TripTimes>) -> Self {
        Self(Arc::new(Inner {
            pattern_id,
            service_date: None,
            trip_times,
        }))
    }

    pub fn pattern_id(&self) -> &Id<Pattern> {
        &self.0.pattern_id
    }

    pub fn service_date(&self) -> Option<NaiveDate> {
        self.0.service_date
    }

    /// True iff this timetable applies to `date`: either it is the
    /// dateless baseline, or its own service date matches exactly.
    pub fn is_valid_for(&self, date: NaiveDate) -> bool {
        match self.0.service_date {
            None => true,
            Some(service_date) => service_date == date,
        }
    }

    pub fn trip_index(&self, trip_id: &Id<Trip>) -> Option<usize> {
        self.0.trip_times.iter().position(|tt| &tt.trip_id == trip_id)
    }

    pub fn trip_times(&self) -> &[TripTimes] {
        &self.0.trip_times
    }

    /// Copies this timetable's contents into an owned, mutable builder
    /// pinned to `service_date`.
    pub fn to_dirty(&self, service_date: NaiveDate) -> DirtyTimetable {
        DirtyTimetable {
            pattern_id: self.0.pattern_id.clone(),
            service_date,
            trip_times: self.0.trip_times.clone(),
        }
    }
}

/// Owned, mutable timetable under construction by a [`crate::buffer::TimetableBuffer`].
/// The only type on which trip-times can be added, replaced, or removed;
/// [`DirtyTimetable::freeze`] is the one-way conversion back into a
/// publishable [`Timetable`]. This split enforces "mutation is only legal
/// on a timetable owned by the buffer's dirty set" at compile time rather
/// than through a runtime read-only flag.
#[derive(Debug, Clone)]
pub struct DirtyTimetable {
    pattern_id: Id<Pattern>,
    service_date: NaiveDate,
    trip_times: Vec<TripTimes>,
}

impl DirtyTimetable {
    pub fn pattern_id(&self) -> &Id<Pattern> {
        &self.pattern_id
    }

    pub fn service_date(&self) -> NaiveDate {
        self.service_date
    }

    pub fn trip_index(&self, trip_id: &Id<Trip>) -> Option<usize> {
        self.trip_times.iter().position(|tt| &tt.trip_id == trip_id)
    }

    /// Appends a new trip-times entry. Callers must check
    /// `trip_index(tt.trip_id) == None` first; this is a caller obligation
    /// rather than a recoverable error.
    pub fn add_trip_times(&mut self, trip_times: TripTimes) {
        debug_assert!(
            self.trip_index(&trip_times.trip_id).is_none(),
            "add_trip_times called with a trip already present in this timetable"
        );
        self.trip_times.push(trip_times);
    }

    pub fn set_trip_times(&mut self, index: usize, trip_times: TripTimes) {
        self.trip_times[index] = trip_times;
    }

    /// Removes the trip-times entry for `trip_id`, if present. Returns
    /// whether anything was removed.
    pub fn remove_trip_times(&mut self, trip_id: &Id<Trip>) -> bool {
        let before = self.trip_times.len();
        self.trip_times.retain(|tt| &tt.trip_id != trip_id);
        self.trip_times.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.trip_times.is_empty()
    }

    /// Produces a read-only view of this timetable's current contents
    /// without consuming it, used by `TimetableBuffer::resolve` so a
    /// not-yet-committed copy is still visible to later updates in the same
    /// batch.
    pub fn as_timetable(&self) -> Timetable {
        Timetable(Arc::new(Inner {
            pattern_id: self.pattern_id.clone(),
            service_date: Some(self.service_date),
            trip_times: self.trip_times.clone(),
        }))
    }

    pub fn freeze(self) -> Timetable {
        Timetable(Arc::new(Inner {
            pattern_id: self.pattern_id,
            service_date: Some(self.service_date),
            trip_times: self.trip_times,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{
        feed::FeedId,
        trip_times::{StopTimeStatus, StopTimeUpdate},
    };

    fn trip_times(trip: &str) -> TripTimes {
        TripTimes::new(Id::new(trip.to_owned()), vec![StopTimeUpdate::new(None, None, StopTimeStatus::Scheduled)])
    }

    fn pattern_id() -> Id<Pattern> {
        Id::new("pattern-1".to_owned())
    }

    #[test]
    fn baseline_timetable_is_valid_for_any_date() {
        let tt = Timetable::baseline(pattern_id(), vec![trip_times("t1")]);
        assert!(tt.is_valid_for(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        assert!(tt.is_valid_for(NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()));
    }

    #[test]
    fn dated_timetable_is_only_valid_for_its_date() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let dirty = Timetable::baseline(pattern_id(), vec![]).to_dirty(date);
        let tt = dirty.freeze();
        assert!(tt.is_valid_for(date));
        assert!(!tt.is_valid_for(date.succ_opt().unwrap()));
    }

    #[test]
    fn add_then_set_trip_times_round_trips() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut dirty = Timetable::baseline(pattern_id(), vec![]).to_dirty(date);
        assert_eq!(dirty.trip_index(&Id::new("t1".to_owned())), None);
        dirty.add_trip_times(trip_times("t1"));
        let index = dirty.trip_index(&Id::new("t1".to_owned())).unwrap();
        dirty.set_trip_times(index, trip_times("t1"));
        assert_eq!(dirty.freeze().trip_times().len(), 1);
    }

    #[test]
    fn remove_trip_times_reports_whether_it_existed() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut dirty = Timetable::baseline(pattern_id(), vec![trip_times("t1")]).to_dirty(date);
        assert!(dirty.remove_trip_times(&Id::new("t1".to_owned())));
        assert!(!dirty.remove_trip_times(&Id::new("t1".to_owned())));
        assert!(dirty.is_empty());
    }

    #[test]
    #[allow(unused)]
    fn feed_id_is_not_needed_to_build_a_timetable() {
        // Timetables key off Id<Pattern> only; FeedId is used for the
        // clear(feedId) bulk-removal path on TimetableBuffer, not per-timetable.
        let _ = FeedId::new("vbn");
    }
}
