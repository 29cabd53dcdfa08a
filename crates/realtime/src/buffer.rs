use std::{
    collections::HashMap,
    sync::Arc,
};

use chrono::NaiveDate;
use log::{debug, warn};
use model::{
    feed::{FeedId, FeedScopedId},
    pattern::Pattern,
    stop::Stop,
    trip::Trip,
    trip_times::TripTimes,
};
use utility::id::Id;

use crate::{
    collaborators::{TransitLayerUpdater, TransitModel},
    error::BufferError,
    key::TripIdAndServiceDate,
    snapshot::Snapshot,
    timetable::{DirtyTimetable, Timetable},
};

/// Mutable working set that accumulates realtime updates and performs
/// copy-on-write against the last committed state. Exclusively owned by
/// the writer thread; `commit()` produces an immutable [`Snapshot`] while
/// the buffer itself persists, inheriting the committed maps as its new
/// baseline for the next batch.
pub struct TimetableBuffer {
    transit_model: Arc<dyn TransitModel>,
    timetables: HashMap<Id<Pattern>, Arc<Vec<Timetable>>>,
    realtime_added_patterns: HashMap<TripIdAndServiceDate, Arc<Pattern>>,
    patterns_for_stop: HashMap<Id<Stop>, Vec<Arc<Pattern>>>,
    dirty_timetables: HashMap<(Id<Pattern>, NaiveDate), DirtyTimetable>,
    dirty: bool,
    /// Set only via [`TimetableBuffer::freeze`]; a `SnapshotSource` never
    /// calls it during ordinary operation.
    frozen: bool,
}

impl TimetableBuffer {
    pub fn new(transit_model: Arc<dyn TransitModel>) -> Self {
        Self {
            transit_model,
            timetables: HashMap::new(),
            realtime_added_patterns: HashMap::new(),
            patterns_for_stop: HashMap::new(),
            dirty_timetables: HashMap::new(),
            dirty: false,
            frozen: false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Detaches this buffer from further mutation. Not part of the ordinary
    /// SnapshotSource-driven lifecycle; provided for callers that need to
    /// retire a buffer explicitly (e.g. on shutdown).
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Returns the realtime-updated timetable for `(pattern, date)` if one
    /// exists in this buffer (committed or still-dirty); otherwise falls
    /// back to the pattern's scheduled baseline. Never fails, never mutates.
    pub fn resolve(&self, pattern: &Pattern, date: NaiveDate) -> Timetable {
        if let Some(dirty_tt) = self.dirty_timetables.get(&(pattern.id.clone(), date)) {
            return dirty_tt.as_timetable();
        }
        if let Some(set) = self.timetables.get(&pattern.id) {
            if let Some(tt) = set.iter().find(|tt| tt.is_valid_for(date)) {
                return tt.clone();
            }
        }
        Timetable::baseline(pattern.id.clone(), pattern.scheduled_timetable.clone())
    }

    pub fn update(
        &mut self,
        pattern: Arc<Pattern>,
        updated_trip_times: TripTimes,
        service_date: NaiveDate,
    ) -> Result<(), BufferError> {
        if self.frozen {
            return Err(BufferError::Frozen);
        }

        let dirty_key = (pattern.id.clone(), service_date);
        if !self.dirty_timetables.contains_key(&dirty_key) {
            let base = self.resolve(&pattern, service_date);
            debug!(
                "copy-on-write timetable for pattern {} on {service_date}",
                pattern.id
            );
            self.dirty_timetables
                .insert(dirty_key.clone(), base.to_dirty(service_date));
        }

        let dirty_tt = self
            .dirty_timetables
            .get_mut(&dirty_key)
            .expect("just inserted above");
        match dirty_tt.trip_index(&updated_trip_times.trip_id) {
            Some(index) => dirty_tt.set_trip_times(index, updated_trip_times.clone()),
            None => dirty_tt.add_trip_times(updated_trip_times.clone()),
        }

        if pattern.created_by_realtime_updater {
            let key = TripIdAndServiceDate::new(
                FeedScopedId::new(pattern.feed_id.clone(), updated_trip_times.trip_id.clone()),
                service_date,
            );
            self.realtime_added_patterns.insert(key, pattern.clone());
            for stop_id in &pattern.stops {
                let entry = self.patterns_for_stop.entry(stop_id.clone()).or_default();
                if !entry.iter().any(|existing| existing.id == pattern.id) {
                    entry.push(pattern.clone());
                }
            }
        }

        self.dirty = true;
        Ok(())
    }

    /// If no realtime-added pattern is recorded for `(trip_id, service_date)`,
    /// returns false. Otherwise removes the mapping and, unless the trip's
    /// (pattern, date) timetable is ambiguously duplicated, copy-on-writes
    /// it with the trip's times removed.
    pub fn revert_trip_to_scheduled_pattern(
        &mut self,
        trip_id: FeedScopedId<Trip>,
        service_date: NaiveDate,
    ) -> bool {
        let key = TripIdAndServiceDate::new(trip_id.clone(), service_date);
        let Some(pattern) = self.realtime_added_patterns.remove(&key) else {
            return false;
        };

        let local_trip_id = trip_id.id().clone();
        let dirty_key = (pattern.id.clone(), service_date);

        if let Some(dirty_tt) = self.dirty_timetables.get_mut(&dirty_key) {
            dirty_tt.remove_trip_times(&local_trip_id);
            self.dirty = true;
            return true;
        }

        let matching_indices: Vec<usize> = self
            .timetables
            .get(&pattern.id)
            .map(|set| {
                set.iter()
                    .enumerate()
                    .filter(|(_, tt)| {
                        tt.is_valid_for(service_date) && tt.trip_index(&local_trip_id).is_some()
                    })
                    .map(|(index, _)| index)
                    .collect()
            })
            .unwrap_or_default();

        match matching_indices.len() {
            0 => true,
            1 => {
                let target = &self.timetables.get(&pattern.id).unwrap()[matching_indices[0]];
                let mut dirty_tt = target.to_dirty(service_date);
                dirty_tt.remove_trip_times(&local_trip_id);
                self.dirty_timetables.insert(dirty_key, dirty_tt);
                self.dirty = true;
                true
            }
            count => {
                warn!(
                    "ambiguous revert: {count} timetables for pattern {} on {service_date} contain trip {}; leaving all alone",
                    pattern.id, local_trip_id
                );
                true
            }
        }
    }

    /// For each pattern, retains only timetables whose service date is
    /// strictly after `before_date`; drops pattern keys left empty, and
    /// every `realtimeAddedPatterns` entry on or before `before_date`.
    pub fn purge_expired_data(&mut self, before_date: NaiveDate) -> Result<bool, BufferError> {
        if self.frozen {
            return Err(BufferError::Frozen);
        }

        let mut changed = false;
        let mut empty_patterns = Vec::new();
        for (pattern_id, set) in self.timetables.iter_mut() {
            let before_len = set.len();
            let retained: Vec<Timetable> = set
                .iter()
                .filter(|tt| match tt.service_date() {
                    Some(date) => date > before_date,
                    None => true,
                })
                .cloned()
                .collect();
            if retained.len() != before_len {
                changed = true;
            }
            if retained.is_empty() {
                empty_patterns.push(pattern_id.clone());
            } else {
                *set = Arc::new(retained);
            }
        }
        for pattern_id in empty_patterns {
            self.timetables.remove(&pattern_id);
        }

        let before_len = self.realtime_added_patterns.len();
        self.realtime_added_patterns
            .retain(|key, _| key.service_date > before_date);
        if self.realtime_added_patterns.len() != before_len {
            changed = true;
        }

        self.dirty_timetables
            .retain(|(_, date), _| *date > before_date);

        if changed {
            self.dirty = true;
        }
        Ok(changed)
    }

    /// Removes every pattern key whose feed matches `feed_id`, and every
    /// `realtimeAddedPatterns` entry whose trip id's feed matches.
    pub fn clear(&mut self, feed_id: &FeedId) -> Result<bool, BufferError> {
        if self.frozen {
            return Err(BufferError::Frozen);
        }

        let mut changed = false;

        let pattern_ids_to_remove: Vec<Id<Pattern>> = self
            .timetables
            .keys()
            .filter(|pattern_id| {
                self.transit_model
                    .pattern_by_id(pattern_id)
                    .map(|pattern| pattern.feed_id == *feed_id)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        for pattern_id in pattern_ids_to_remove {
            self.timetables.remove(&pattern_id);
            changed = true;
        }

        let before_len = self.realtime_added_patterns.len();
        self.realtime_added_patterns
            .retain(|key, _| key.trip_id.feed_id() != feed_id);
        if self.realtime_added_patterns.len() != before_len {
            changed = true;
        }

        if changed {
            self.dirty = true;
        }
        Ok(changed)
    }

    /// If not dirty, returns `Ok(None)` and leaves state unchanged.
    /// Otherwise splices every dirty timetable into its pattern's committed
    /// set, notifies the optional `TransitLayerUpdater`, and returns a
    /// frozen [`Snapshot`].
    pub fn commit(
        &mut self,
        transit_layer_updater: Option<&dyn TransitLayerUpdater>,
    ) -> Result<Option<Snapshot>, BufferError> {
        if self.frozen {
            return Err(BufferError::Frozen);
        }
        if !self.dirty {
            return Ok(None);
        }

        let mut frozen_dirty = Vec::with_capacity(self.dirty_timetables.len());
        for ((pattern_id, service_date), dirty_tt) in self.dirty_timetables.drain() {
            let frozen_tt = dirty_tt.freeze();
            let set = self
                .timetables
                .entry(pattern_id)
                .or_insert_with(|| Arc::new(Vec::new()));
            let mut next: Vec<Timetable> = set
                .iter()
                .filter(|tt| tt.service_date() != Some(service_date))
                .cloned()
                .collect();
            next.push(frozen_tt.clone());
            next.sort_by_key(|tt| tt.service_date());
            *set = Arc::new(next);
            frozen_dirty.push(frozen_tt);
        }

        if let Some(updater) = transit_layer_updater {
            updater.update(&frozen_dirty, &self.timetables);
        }

        self.dirty = false;
        debug!("committed {} dirty timetable(s)", frozen_dirty.len());

        Ok(Some(Snapshot::new(
            self.timetables.clone(),
            self.realtime_added_patterns.clone(),
            self.patterns_for_stop.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::TransitModel;
    use model::{
        feed::{FeedId, FeedScopedId},
        trip::Trip,
        trip_on_service_date::TripOnServiceDate,
        trip_times::{StopTimeStatus, StopTimeUpdate},
    };
    use std::sync::Arc;

    struct FakeTransitModel {
        patterns: HashMap<Id<Pattern>, Arc<Pattern>>,
    }

    impl TransitModel for FakeTransitModel {
        fn feed_id(&self) -> &FeedId {
            unimplemented!()
        }
        fn scheduled_pattern(&self, _trip_id: &Id<Trip>) -> Option<Arc<Pattern>> {
            None
        }
        fn pattern_by_id(&self, pattern_id: &Id<Pattern>) -> Option<Arc<Pattern>> {
            self.patterns.get(pattern_id).cloned()
        }
        fn trip(&self, _trip_id: &Id<Trip>) -> Option<Arc<Trip>> {
            None
        }
        fn resolve_trip(&self, _id: &FeedScopedId<Trip>) -> Option<Id<Trip>> {
            None
        }
        fn resolve_stop(&self, _id: &FeedScopedId<Stop>) -> Option<Id<Stop>> {
            None
        }
        fn trip_on_service_date(&self, _code: &str) -> Option<TripOnServiceDate> {
            None
        }
    }

    fn trip_times(trip: &str, departure_minute: i64) -> TripTimes {
        TripTimes::new(
            Id::new(trip.to_owned()),
            vec![StopTimeUpdate::new(
                None,
                Some(chrono::Duration::minutes(departure_minute)),
                StopTimeStatus::Scheduled,
            )],
        )
    }

    fn make_buffer(patterns: Vec<Arc<Pattern>>) -> TimetableBuffer {
        let patterns = patterns
            .into_iter()
            .map(|pattern| (pattern.id.clone(), pattern))
            .collect();
        TimetableBuffer::new(Arc::new(FakeTransitModel { patterns }))
    }

    fn scheduled_pattern(id: &str) -> Arc<Pattern> {
        Arc::new(Pattern::new(Id::new(id.to_owned()), FeedId::new("feed-a"), vec![]))
    }

    #[test]
    fn resolve_without_updates_falls_back_to_scheduled_timetable() {
        let mut pattern = (*scheduled_pattern("p1")).clone();
        pattern.scheduled_timetable = vec![trip_times("t1", 600)];
        let pattern = Arc::new(pattern);
        let buffer = make_buffer(vec![pattern.clone()]);

        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let resolved = buffer.resolve(&pattern, date);
        assert_eq!(resolved.trip_times(), pattern.scheduled_timetable.as_slice());
    }

    #[test]
    fn second_update_to_same_pattern_and_date_reuses_the_same_copy() {
        let pattern = scheduled_pattern("p1");
        let mut buffer = make_buffer(vec![pattern.clone()]);
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        buffer
            .update(pattern.clone(), trip_times("t1", 610), date)
            .unwrap();
        assert_eq!(buffer.dirty_timetables.len(), 1);

        buffer
            .update(pattern.clone(), trip_times("t2", 620), date)
            .unwrap();
        // still exactly one dirty copy for (pattern, date).
        assert_eq!(buffer.dirty_timetables.len(), 1);
        let resolved = buffer.resolve(&pattern, date);
        assert_eq!(resolved.trip_times().len(), 2);
    }

    #[test]
    fn commit_on_clean_buffer_returns_none() {
        let pattern = scheduled_pattern("p1");
        let mut buffer = make_buffer(vec![pattern]);
        assert!(buffer.commit(None).unwrap().is_none());
    }

    #[test]
    fn commit_publishes_and_clears_dirty_state() {
        let pattern = scheduled_pattern("p1");
        let mut buffer = make_buffer(vec![pattern.clone()]);
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        buffer
            .update(pattern.clone(), trip_times("t1", 610), date)
            .unwrap();

        let snapshot = buffer.commit(None).unwrap().expect("buffer was dirty");
        assert!(!buffer.is_dirty());
        assert_eq!(snapshot.resolve(&pattern, date).trip_times().len(), 1);
        // idempotence: committing again with no new updates is a no-op.
        assert!(buffer.commit(None).unwrap().is_none());
    }

    #[test]
    fn a_snapshot_taken_before_a_later_commit_keeps_seeing_the_old_value() {
        let pattern = scheduled_pattern("p1");
        let mut buffer = make_buffer(vec![pattern.clone()]);
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        buffer
            .update(pattern.clone(), trip_times("t1", 610), date)
            .unwrap();
        let old_snapshot = buffer.commit(None).unwrap().expect("buffer was dirty");

        buffer
            .update(pattern.clone(), trip_times("t1", 614), date)
            .unwrap();
        let new_snapshot = buffer.commit(None).unwrap().expect("buffer was dirty");

        assert_eq!(
            old_snapshot.resolve(&pattern, date).trip_times()[0].departure,
            Some(chrono::Duration::minutes(610))
        );
        assert_eq!(
            new_snapshot.resolve(&pattern, date).trip_times()[0].departure,
            Some(chrono::Duration::minutes(614))
        );
    }

    #[test]
    fn purge_removes_only_expired_dates() {
        let pattern = scheduled_pattern("p1");
        let mut buffer = make_buffer(vec![pattern.clone()]);
        for day in [31, 1, 2] {
            let month = if day == 31 { 5 } else { 6 };
            let date = NaiveDate::from_ymd_opt(2024, month, day).unwrap();
            buffer
                .update(pattern.clone(), trip_times("t1", 0), date)
                .unwrap();
            buffer.commit(None).unwrap();
        }

        let before = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let changed = buffer.purge_expired_data(before).unwrap();
        assert!(changed);
        let remaining = buffer.timetables.get(&pattern.id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(
            remaining[0].service_date(),
            Some(NaiveDate::from_ymd_opt(2024, 6, 2).unwrap())
        );
    }

    fn realtime_pattern(id: &str, feed_id: &str) -> Arc<Pattern> {
        let mut pattern = Pattern::new(Id::new(id.to_owned()), FeedId::new(feed_id), vec![]);
        pattern.created_by_realtime_updater = true;
        Arc::new(pattern)
    }

    #[test]
    fn revert_removes_the_realtime_added_pattern_and_trip_times() {
        let pattern = realtime_pattern("p1-realtime", "feed-a");
        let mut buffer = make_buffer(vec![pattern.clone()]);
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let trip_id = FeedScopedId::new(pattern.feed_id.clone(), Id::new("tx".to_owned()));

        buffer
            .update(pattern.clone(), trip_times("tx", 0), date)
            .unwrap();
        assert!(buffer
            .realtime_added_patterns
            .contains_key(&TripIdAndServiceDate::new(trip_id.clone(), date)));

        let reverted = buffer.revert_trip_to_scheduled_pattern(trip_id.clone(), date);
        assert!(reverted);
        assert!(!buffer
            .realtime_added_patterns
            .contains_key(&TripIdAndServiceDate::new(trip_id, date)));
        assert!(buffer
            .dirty_timetables
            .get(&(pattern.id.clone(), date))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn revert_with_no_recorded_pattern_returns_false() {
        let pattern = scheduled_pattern("p1");
        let mut buffer = make_buffer(vec![pattern.clone()]);
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let trip_id = FeedScopedId::new(pattern.feed_id.clone(), Id::new("tx".to_owned()));
        assert!(!buffer.revert_trip_to_scheduled_pattern(trip_id, date));
    }

    #[test]
    fn revert_leaves_both_timetables_alone_when_two_contain_the_same_trip() {
        let pattern = realtime_pattern("p1-realtime", "feed-a");
        let mut buffer = make_buffer(vec![pattern.clone()]);
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let trip_id = FeedScopedId::new(pattern.feed_id.clone(), Id::new("tx".to_owned()));

        let tt1 = Timetable::baseline(pattern.id.clone(), vec![trip_times("tx", 0)])
            .to_dirty(date)
            .freeze();
        let tt2 = Timetable::baseline(pattern.id.clone(), vec![trip_times("tx", 5)])
            .to_dirty(date)
            .freeze();
        buffer
            .timetables
            .insert(pattern.id.clone(), Arc::new(vec![tt1, tt2]));
        buffer.realtime_added_patterns.insert(
            TripIdAndServiceDate::new(trip_id.clone(), date),
            pattern.clone(),
        );

        let reverted = buffer.revert_trip_to_scheduled_pattern(trip_id, date);
        assert!(reverted);
        assert_eq!(buffer.timetables.get(&pattern.id).unwrap().len(), 2);
        assert!(!buffer.dirty_timetables.contains_key(&(pattern.id.clone(), date)));
    }

    #[test]
    fn clear_removes_only_the_matching_feeds_patterns_and_added_trips() {
        let pattern_a = realtime_pattern("p1-realtime", "feed-a");
        let pattern_b = realtime_pattern("p1-realtime-b", "feed-b");
        let mut buffer = make_buffer(vec![pattern_a.clone(), pattern_b.clone()]);
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        buffer
            .update(pattern_a.clone(), trip_times("ta", 0), date)
            .unwrap();
        buffer
            .update(pattern_b.clone(), trip_times("tb", 0), date)
            .unwrap();
        buffer.commit(None).unwrap();

        let changed = buffer.clear(&FeedId::new("feed-a")).unwrap();
        assert!(changed);
        assert!(!buffer.timetables.contains_key(&pattern_a.id));
        assert!(buffer.timetables.contains_key(&pattern_b.id));
        assert!(!buffer.realtime_added_patterns.keys().any(|key| key.trip_id.feed_id() == &FeedId::new("feed-a")));
        assert!(buffer.realtime_added_patterns.keys().any(|key| key.trip_id.feed_id() == &FeedId::new("feed-b")));
    }

    #[test]
    fn mutating_a_frozen_buffer_fails() {
        let pattern = scheduled_pattern("p1");
        let mut buffer = make_buffer(vec![pattern.clone()]);
        buffer.freeze();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(
            buffer.update(pattern, trip_times("t1", 0), date),
            Err(BufferError::Frozen)
        );
    }
}
