use std::collections::HashMap;

use chrono::NaiveDate;
use model::{
    feed::FeedScopedId,
    stop::Stop,
    trip_times::{StopTimeStatus, StopTimeUpdate, TripTimes},
};
use utility::id::Id;

use crate::{
    collaborators::TransitModel,
    error::UpdateError,
    resolver::{EntityResolver, EstimatedVehicleJourneyRefs},
};

use super::{ResolvedUpdate, UpdateResult};

#[derive(Debug, Clone)]
pub struct EstimatedCall {
    pub quay_id: FeedScopedId<Stop>,
    pub arrival_seconds: Option<i64>,
    pub departure_seconds: Option<i64>,
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct EstimatedVehicleJourney {
    pub refs: EstimatedVehicleJourneyRefs,
    pub calls: Vec<EstimatedCall>,
}

/// One SIRI-ET delivery: a batch of estimated vehicle journeys sharing a
/// service-date hint for journeys whose references don't carry a dated
/// frame of their own.
#[derive(Debug, Clone, Default)]
pub struct EstimatedTimetableDelivery {
    pub journeys: Vec<EstimatedVehicleJourney>,
}

/// Resolves and applies one estimated-timetable delivery. Unlike the
/// schedule-based dialect, a journey is always mapped onto its scheduled
/// pattern: SIRI-ET carries no signal equivalent to GTFS-RT's
/// `NO_DATA`/added-stop schedule relationships that would justify
/// synthesizing a new one.
pub fn apply_estimated_timetable_delivery(
    buffer: &mut crate::buffer::TimetableBuffer,
    resolver: &EntityResolver,
    transit_model: &dyn TransitModel,
    service_date_hint: NaiveDate,
    delivery: EstimatedTimetableDelivery,
) -> UpdateResult {
    let (resolved, mut result) =
        resolve_estimated_timetable_delivery(resolver, transit_model, service_date_hint, delivery);
    result.merge(super::apply_resolved_updates(buffer, resolved));
    result
}

fn resolve_estimated_timetable_delivery(
    resolver: &EntityResolver,
    transit_model: &dyn TransitModel,
    service_date_hint: NaiveDate,
    delivery: EstimatedTimetableDelivery,
) -> (Vec<ResolvedUpdate>, UpdateResult) {
    let mut resolved = Vec::new();
    let mut result = UpdateResult::default();

    for journey in delivery.journeys {
        match resolve_one(resolver, transit_model, service_date_hint, &journey) {
            Ok(update) => resolved.push(update),
            Err(error) => result.record_error(error),
        }
    }

    (resolved, result)
}

fn fallback_trip_ref(
    transit_model: &dyn TransitModel,
    refs: &EstimatedVehicleJourneyRefs,
) -> FeedScopedId<model::trip::Trip> {
    if let Some(framed) = &refs.framed_vehicle_journey_ref {
        return framed.dated_vehicle_journey_ref.clone();
    }
    let raw = refs
        .dated_vehicle_journey_ref
        .clone()
        .or_else(|| refs.estimated_vehicle_journey_code.clone())
        .unwrap_or_else(|| "<unresolved>".to_owned());
    FeedScopedId::new(transit_model.feed_id().clone(), Id::new(raw))
}

fn resolve_one(
    resolver: &EntityResolver,
    transit_model: &dyn TransitModel,
    service_date_hint: NaiveDate,
    journey: &EstimatedVehicleJourney,
) -> Result<ResolvedUpdate, UpdateError> {
    let fallback_id = fallback_trip_ref(transit_model, &journey.refs);

    let (trip_id, service_date) = resolver
        .resolve_trip_and_service_date(&journey.refs, service_date_hint)
        .map_err(|_| UpdateError::UnknownTrip(fallback_id.clone()))?;

    let pattern = transit_model
        .scheduled_pattern(&trip_id)
        .ok_or_else(|| UpdateError::UnknownTrip(fallback_id.clone()))?;

    let mut calls_by_stop: HashMap<Id<Stop>, &EstimatedCall> = HashMap::new();
    for call in &journey.calls {
        let stop_id = resolver
            .resolve_stop(&call.quay_id)
            .ok_or_else(|| UpdateError::UnknownStop(call.quay_id.clone()))?;
        if !pattern.contains_stop(&stop_id) {
            return Err(UpdateError::InvalidStopSequence(fallback_id.clone()));
        }
        calls_by_stop.insert(stop_id, call);
    }

    let stop_times: Vec<StopTimeUpdate> = pattern
        .stops
        .iter()
        .map(|stop_id| {
            let update = match calls_by_stop.get(stop_id) {
                Some(call) if call.cancelled => {
                    StopTimeUpdate::new(None, None, StopTimeStatus::Skipped)
                }
                Some(call) => StopTimeUpdate::new(
                    call.arrival_seconds.map(chrono::Duration::seconds),
                    call.departure_seconds.map(chrono::Duration::seconds),
                    StopTimeStatus::Scheduled,
                ),
                None => StopTimeUpdate::no_data(),
            };
            update.with_stop(stop_id.clone())
        })
        .collect();

    if !super::stop_times_are_monotonic(&stop_times) {
        return Err(UpdateError::NonMonotonicTimes(fallback_id));
    }

    Ok(ResolvedUpdate {
        pattern,
        trip_times: TripTimes::new(trip_id, stop_times),
        service_date,
    })
}
