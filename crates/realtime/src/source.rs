use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use arc_swap::ArcSwap;
use chrono::NaiveDate;
use log::error;
use model::{
    feed::{FeedId, FeedScopedId},
    trip::Trip,
};

use crate::{
    buffer::TimetableBuffer,
    collaborators::{FuzzyTripMatcher, TransitLayerUpdater, TransitModel},
    config::RealtimeConfig,
    error::BufferError,
    resolver::EntityResolver,
    snapshot::Snapshot,
    update::{
        estimated_timetable::{self, EstimatedTimetableDelivery},
        schedule_based::{self, Incrementality, ScheduleBasedUpdate},
        UpdateResult,
    },
};

/// Publishes immutable [`Snapshot`]s for wait-free reads while serializing
/// writers behind a lock. `current_snapshot` never blocks on a writer:
/// `ArcSwap` hands out the previously published `Arc<Snapshot>` to any
/// reader already holding one, regardless of what the writer does next,
/// while `writer` is the only field a mutating call ever touches.
pub struct SnapshotSource {
    current: ArcSwap<Snapshot>,
    writer: Mutex<Writer>,
}

struct Writer {
    transit_model: Arc<dyn TransitModel>,
    buffer: TimetableBuffer,
    resolver: EntityResolver,
    transit_layer_updater: Option<Arc<dyn TransitLayerUpdater>>,
    config: RealtimeConfig,
    last_commit: Instant,
}

impl SnapshotSource {
    pub fn new(
        transit_model: Arc<dyn TransitModel>,
        fuzzy_matcher: Option<Arc<dyn FuzzyTripMatcher>>,
        transit_layer_updater: Option<Arc<dyn TransitLayerUpdater>>,
        config: RealtimeConfig,
    ) -> Self {
        let resolver = EntityResolver::new(transit_model.clone(), fuzzy_matcher);
        let buffer = TimetableBuffer::new(transit_model.clone());
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
            writer: Mutex::new(Writer {
                transit_model,
                buffer,
                resolver,
                transit_layer_updater,
                config,
                last_commit: Instant::now(),
            }),
        }
    }

    /// Wait-free: returns the most recently published snapshot. Safe to
    /// call from any number of threads concurrently with a writer.
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn apply_schedule_based_batch(
        &self,
        feed_id: &FeedId,
        incrementality: Incrementality,
        updates: Vec<ScheduleBasedUpdate>,
    ) -> UpdateResult {
        let mut writer = self.writer.lock().expect("writer mutex poisoned");
        let result = schedule_based::apply_schedule_based_batch(
            &mut writer.buffer,
            &writer.resolver,
            writer.transit_model.as_ref(),
            writer.config.backwards_delay_propagation,
            feed_id,
            incrementality,
            updates,
        );
        self.maybe_commit(&mut writer);
        result
    }

    pub fn apply_estimated_timetable_delivery(
        &self,
        service_date_hint: NaiveDate,
        delivery: EstimatedTimetableDelivery,
    ) -> UpdateResult {
        let mut writer = self.writer.lock().expect("writer mutex poisoned");
        let result = estimated_timetable::apply_estimated_timetable_delivery(
            &mut writer.buffer,
            &writer.resolver,
            writer.transit_model.as_ref(),
            service_date_hint,
            delivery,
        );
        self.maybe_commit(&mut writer);
        result
    }

    /// Moves a trip back onto its scheduled pattern, undoing a prior
    /// realtime-added-pattern update. Returns `false` if the trip had no
    /// realtime-added pattern recorded for `service_date`.
    pub fn revert_trip_to_scheduled_pattern(
        &self,
        trip_id: FeedScopedId<Trip>,
        service_date: NaiveDate,
    ) -> bool {
        let mut writer = self.writer.lock().expect("writer mutex poisoned");
        let reverted = writer
            .buffer
            .revert_trip_to_scheduled_pattern(trip_id, service_date);
        if reverted {
            self.maybe_commit(&mut writer);
        }
        reverted
    }

    /// Commits and publishes regardless of `max_snapshot_frequency`, for
    /// callers that want an up-to-date snapshot on demand (e.g. before
    /// shutdown).
    pub fn flush_buffer(&self) -> Result<bool, BufferError> {
        let mut writer = self.writer.lock().expect("writer mutex poisoned");
        self.commit(&mut writer)
    }

    fn maybe_commit(&self, writer: &mut Writer) {
        if writer.last_commit.elapsed() < writer.config.max_snapshot_frequency {
            return;
        }
        if let Err(error) = self.commit(writer) {
            error!("commit failed: {error}");
        }
    }

    fn commit(&self, writer: &mut Writer) -> Result<bool, BufferError> {
        if writer.config.purge_expired_data {
            let today = chrono::Local::now().date_naive();
            if let Some(yesterday) = today.pred_opt() {
                writer.buffer.purge_expired_data(yesterday)?;
            }
        }

        let published = writer
            .buffer
            .commit(writer.transit_layer_updater.as_deref())?;
        match published {
            Some(snapshot) => {
                self.current.store(Arc::new(snapshot));
                writer.last_commit = Instant::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
