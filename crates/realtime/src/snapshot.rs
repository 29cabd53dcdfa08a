use std::{collections::HashMap, sync::Arc};

use chrono::NaiveDate;
use model::{pattern::Pattern, stop::Stop};

use crate::{key::TripIdAndServiceDate, timetable::Timetable};

/// The frozen image produced by committing a [`crate::buffer::TimetableBuffer`].
/// Holds the same logical maps as the buffer, but every operation is safe
/// to call from any thread and none of them mutate.
#[derive(Debug, Clone)]
pub struct Snapshot {
    timetables: HashMap<utility::id::Id<Pattern>, Arc<Vec<Timetable>>>,
    realtime_added_patterns: HashMap<TripIdAndServiceDate, Arc<Pattern>>,
    patterns_for_stop: HashMap<utility::id::Id<Stop>, Vec<Arc<Pattern>>>,
}

impl Snapshot {
    pub(crate) fn new(
        timetables: HashMap<utility::id::Id<Pattern>, Arc<Vec<Timetable>>>,
        realtime_added_patterns: HashMap<TripIdAndServiceDate, Arc<Pattern>>,
        patterns_for_stop: HashMap<utility::id::Id<Stop>, Vec<Arc<Pattern>>>,
    ) -> Self {
        Self {
            timetables,
            realtime_added_patterns,
            patterns_for_stop,
        }
    }

    pub fn empty() -> Self {
        Self {
            timetables: HashMap::new(),
            realtime_added_patterns: HashMap::new(),
            patterns_for_stop: HashMap::new(),
        }
    }

    /// Identical semantics to `TimetableBuffer::resolve`, but over frozen
    /// data: same pattern, same date, yields the same result for as long
    /// as this `Snapshot` is held, regardless of what the writer does
    /// afterwards.
    pub fn resolve(&self, pattern: &Pattern, date: NaiveDate) -> Timetable {
        if let Some(set) = self.timetables.get(&pattern.id) {
            if let Some(tt) = set.iter().find(|tt| tt.is_valid_for(date)) {
                return tt.clone();
            }
        }
        Timetable::baseline(pattern.id.clone(), pattern.scheduled_timetable.clone())
    }

    pub fn realtime_added_pattern(
        &self,
        trip_id: &TripIdAndServiceDate,
    ) -> Option<Arc<Pattern>> {
        self.realtime_added_patterns.get(trip_id).cloned()
    }

    pub fn has_realtime_added_patterns(&self) -> bool {
        !self.realtime_added_patterns.is_empty()
    }

    pub fn patterns_for_stop(&self, stop_id: &utility::id::Id<Stop>) -> &[Arc<Pattern>] {
        self.patterns_for_stop
            .get(stop_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.timetables.is_empty()
            && self.realtime_added_patterns.is_empty()
            && self.patterns_for_stop.is_empty()
    }
}
