pub mod estimated_timetable;
pub mod schedule_based;

use std::sync::Arc;

use chrono::NaiveDate;
use model::{pattern::Pattern, trip_times::{StopTimeUpdate, TripTimes}};

use crate::{buffer::TimetableBuffer, error::UpdateError};

/// A single update resolved against the static model, ready to hand to
/// [`TimetableBuffer::update`]. Both dialects produce this shape; only the
/// resolution step that gets there differs.
#[derive(Debug, Clone)]
pub struct ResolvedUpdate {
    pub pattern: Arc<Pattern>,
    pub trip_times: TripTimes,
    pub service_date: NaiveDate,
}

/// Outcome of applying a batch of updates. Errors are per-update and never
/// abort the rest of the batch.
#[derive(Debug, Clone, Default)]
pub struct UpdateResult {
    pub successes: usize,
    pub warnings: Vec<String>,
    pub errors: Vec<UpdateError>,
}

impl UpdateResult {
    pub fn record_success(&mut self) {
        self.successes += 1;
    }

    pub fn record_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn record_error(&mut self, error: UpdateError) {
        self.errors.push(error);
    }

    pub fn merge(&mut self, other: UpdateResult) {
        self.successes += other.successes;
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// True iff every known arrival/departure across `stop_times`, in order,
/// is non-decreasing. `None` entries (no data) are skipped rather than
/// treated as a break in the sequence. Shared by both dialects since
/// `NON_MONOTONIC_TIMES` applies after either one builds its trip-times.
pub(crate) fn stop_times_are_monotonic(stop_times: &[StopTimeUpdate]) -> bool {
    let mut last_seconds: Option<i64> = None;
    for stop_time in stop_times {
        for time in [stop_time.arrival, stop_time.departure].into_iter().flatten() {
            let seconds = time.num_seconds();
            if let Some(previous) = last_seconds {
                if seconds < previous {
                    return false;
                }
            }
            last_seconds = Some(seconds);
        }
    }
    true
}

/// Applies already-resolved updates to the buffer one at a time, folding
/// each `Err` into the result instead of stopping the batch.
pub fn apply_resolved_updates(
    buffer: &mut TimetableBuffer,
    updates: Vec<ResolvedUpdate>,
) -> UpdateResult {
    let mut result = UpdateResult::default();
    for update in updates {
        match buffer.update(update.pattern, update.trip_times, update.service_date) {
            Ok(()) => result.record_success(),
            Err(error) => result.record_error(error.into()),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_sums_successes_and_concatenates_errors() {
        let mut a = UpdateResult {
            successes: 2,
            warnings: vec!["w1".to_owned()],
            errors: vec![UpdateError::DateUnparseable("x".to_owned())],
        };
        let b = UpdateResult {
            successes: 3,
            warnings: vec!["w2".to_owned()],
            errors: vec![],
        };
        a.merge(b);
        assert_eq!(a.successes, 5);
        assert_eq!(a.warnings.len(), 2);
        assert_eq!(a.errors.len(), 1);
        assert!(!a.is_clean());
    }

    #[test]
    fn monotonic_check_skips_no_data_stops() {
        let stops = vec![
            StopTimeUpdate::no_data(),
            StopTimeUpdate::new(None, Some(chrono::Duration::seconds(60)), model::trip_times::StopTimeStatus::Scheduled),
            StopTimeUpdate::new(None, Some(chrono::Duration::seconds(30)), model::trip_times::StopTimeStatus::Scheduled),
        ];
        assert!(!stop_times_are_monotonic(&stops));
    }

    #[test]
    fn monotonic_check_passes_non_decreasing_times() {
        let stops = vec![
            StopTimeUpdate::new(None, Some(chrono::Duration::seconds(30)), model::trip_times::StopTimeStatus::Scheduled),
            StopTimeUpdate::new(None, Some(chrono::Duration::seconds(60)), model::trip_times::StopTimeStatus::Scheduled),
        ];
        assert!(stop_times_are_monotonic(&stops));
    }
}
