use std::sync::Arc;

use chrono::NaiveDate;
use log::debug;
use model::{
    feed::{FeedId, FeedScopedId},
    pattern::Pattern,
    stop::Stop,
    trip::Trip,
    trip_times::{StopTimeStatus, StopTimeUpdate, TripTimes},
};
use utility::id::Id;

use crate::{
    collaborators::TransitModel, config::BackwardsDelayPropagation, error::UpdateError,
    resolver::EntityResolver,
};

use super::{ResolvedUpdate, UpdateResult};

/// `FULL_DATASET` feeds replace everything the engine has accumulated for
/// their feed before applying the batch; `DIFFERENTIAL` feeds only touch the
/// trips they mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incrementality {
    FullDataset,
    Differential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleRelationship {
    Scheduled,
    Skipped,
    NoData,
}

#[derive(Debug, Clone)]
pub struct ScheduleStopTimeUpdate {
    pub quay_id: FeedScopedId<Stop>,
    pub arrival_seconds: Option<i64>,
    pub departure_seconds: Option<i64>,
    pub schedule_relationship: ScheduleRelationship,
}

#[derive(Debug, Clone)]
pub struct ScheduleBasedUpdate {
    pub trip_id: FeedScopedId<Trip>,
    pub service_date: NaiveDate,
    pub stop_time_updates: Vec<ScheduleStopTimeUpdate>,
}

/// Applies one trip-update batch: clears the feed's prior realtime state
/// first when `incrementality` is `FullDataset`, then resolves and applies
/// every update, accumulating per-update failures rather than aborting.
pub fn apply_schedule_based_batch(
    buffer: &mut crate::buffer::TimetableBuffer,
    resolver: &EntityResolver,
    transit_model: &dyn TransitModel,
    backwards_delay_propagation: BackwardsDelayPropagation,
    feed_id: &FeedId,
    incrementality: Incrementality,
    updates: Vec<ScheduleBasedUpdate>,
) -> UpdateResult {
    if incrementality == Incrementality::FullDataset {
        if let Err(error) = buffer.clear(feed_id) {
            let mut result = UpdateResult::default();
            result.record_error(error.into());
            return result;
        }
    }

    let (resolved, mut result) =
        resolve_schedule_based_updates(resolver, transit_model, backwards_delay_propagation, updates);
    result.merge(super::apply_resolved_updates(buffer, resolved));
    result
}

fn resolve_schedule_based_updates(
    resolver: &EntityResolver,
    transit_model: &dyn TransitModel,
    backwards_delay_propagation: BackwardsDelayPropagation,
    updates: Vec<ScheduleBasedUpdate>,
) -> (Vec<ResolvedUpdate>, UpdateResult) {
    let mut resolved = Vec::new();
    let mut result = UpdateResult::default();

    for update in updates {
        match resolve_one(resolver, transit_model, backwards_delay_propagation, &update) {
            Ok(resolved_update) => resolved.push(resolved_update),
            Err(error) => result.record_error(error),
        }
    }

    (resolved, result)
}

fn resolve_one(
    resolver: &EntityResolver,
    transit_model: &dyn TransitModel,
    backwards_delay_propagation: BackwardsDelayPropagation,
    update: &ScheduleBasedUpdate,
) -> Result<ResolvedUpdate, UpdateError> {
    let trip_id = resolver
        .resolve_trip(&update.trip_id)
        .ok_or_else(|| UpdateError::UnknownTrip(update.trip_id.clone()))?;

    let scheduled_pattern = transit_model
        .scheduled_pattern(&trip_id)
        .ok_or_else(|| UpdateError::UnknownTrip(update.trip_id.clone()))?;

    let mut stop_ids = Vec::with_capacity(update.stop_time_updates.len());
    for stop_time_update in &update.stop_time_updates {
        let stop_id = resolver
            .resolve_stop(&stop_time_update.quay_id)
            .ok_or_else(|| UpdateError::UnknownStop(stop_time_update.quay_id.clone()))?;
        stop_ids.push(stop_id);
    }

    let pattern = if stop_ids == scheduled_pattern.stops {
        scheduled_pattern
    } else {
        debug!(
            "trip {} diverges from its scheduled pattern; synthesizing a realtime pattern",
            update.trip_id
        );
        Arc::new(synthesize_pattern(&scheduled_pattern, stop_ids.clone()))
    };

    let stop_times: Vec<StopTimeUpdate> = update
        .stop_time_updates
        .iter()
        .zip(stop_ids)
        .map(|(stu, stop_id)| {
            StopTimeUpdate::new(
                stu.arrival_seconds.map(chrono::Duration::seconds),
                stu.departure_seconds.map(chrono::Duration::seconds),
                match stu.schedule_relationship {
                    ScheduleRelationship::Scheduled => StopTimeStatus::Scheduled,
                    ScheduleRelationship::Skipped => StopTimeStatus::Skipped,
                    ScheduleRelationship::NoData => StopTimeStatus::NoData,
                },
            )
            .with_stop(stop_id)
        })
        .collect();

    let stop_times = propagate_backwards_delays(backwards_delay_propagation, stop_times);
    if !super::stop_times_are_monotonic(&stop_times) {
        return Err(UpdateError::NonMonotonicTimes(update.trip_id.clone()));
    }
    let trip_times = TripTimes::new(trip_id, stop_times);

    Ok(ResolvedUpdate {
        pattern,
        trip_times,
        service_date: update.service_date,
    })
}

fn synthesize_pattern(scheduled: &Pattern, stops: Vec<Id<Stop>>) -> Pattern {
    let mut pattern = Pattern::new(
        Id::new(format!("{}-realtime", scheduled.id)),
        scheduled.feed_id.clone(),
        stops,
    );
    pattern.created_by_realtime_updater = true;
    pattern
}

/// Fills gaps by carrying a later stop's known arrival/departure backwards
/// onto earlier stops, per `BackwardsDelayPropagation`. Only the
/// schedule-based dialect needs this: SIRI-ET deliveries carry an explicit
/// call for every visited stop.
fn propagate_backwards_delays(
    policy: BackwardsDelayPropagation,
    mut stop_times: Vec<StopTimeUpdate>,
) -> Vec<StopTimeUpdate> {
    let mut next_known: Option<StopTimeUpdate> = None;
    for stop_time in stop_times.iter_mut().rev() {
        let should_overwrite = match policy {
            BackwardsDelayPropagation::RequiredNoData => {
                stop_time.status == StopTimeStatus::NoData
            }
            BackwardsDelayPropagation::Required => {
                stop_time.status == StopTimeStatus::NoData
                    || (stop_time.arrival.is_none() && stop_time.departure.is_none())
            }
            BackwardsDelayPropagation::Always => true,
        };

        if should_overwrite {
            if let Some(known) = &next_known {
                stop_time.arrival = known.arrival;
                stop_time.departure = known.departure;
            }
        }

        if stop_time.arrival.is_some() || stop_time.departure.is_some() {
            next_known = Some(stop_time.clone());
        }
    }
    stop_times
}
