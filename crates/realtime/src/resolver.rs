use std::sync::Arc;

use chrono::NaiveDate;
use log::warn;
use model::{feed::FeedScopedId, stop::Stop, trip::Trip};
use utility::id::Id;

use crate::{
    collaborators::{FuzzyTripMatcher, TransitModel},
    error::ResolveError,
};

/// The `framedVehicleJourneyRef` shape from an estimated-timetable
/// delivery: a dated journey reference plus the data-frame (date) it
/// belongs to.
#[derive(Debug, Clone)]
pub struct FramedVehicleJourneyRef {
    pub dated_vehicle_journey_ref: FeedScopedId<Trip>,
    pub data_frame_ref: String,
}

/// The reference fields carried by one estimated vehicle journey, in the
/// precedence order the resolver consults them.
#[derive(Debug, Clone, Default)]
pub struct EstimatedVehicleJourneyRefs {
    pub framed_vehicle_journey_ref: Option<FramedVehicleJourneyRef>,
    pub dated_vehicle_journey_ref: Option<String>,
    pub estimated_vehicle_journey_code: Option<String>,
    /// Free-text hint (e.g. line + destination) handed to the fuzzy
    /// matcher when the explicit references above all fail.
    pub fuzzy_hint: Option<String>,
}

/// Resolves external references (trip refs, stop refs, service-date refs)
/// against the static transit model.
pub struct EntityResolver {
    transit_model: Arc<dyn TransitModel>,
    fuzzy_matcher: Option<Arc<dyn FuzzyTripMatcher>>,
}

impl EntityResolver {
    pub fn new(
        transit_model: Arc<dyn TransitModel>,
        fuzzy_matcher: Option<Arc<dyn FuzzyTripMatcher>>,
    ) -> Self {
        Self {
            transit_model,
            fuzzy_matcher,
        }
    }

    /// Translates a per-stop-time quay reference, used by both update
    /// dialects.
    pub fn resolve_stop(&self, feed_scoped_quay_id: &FeedScopedId<Stop>) -> Option<Id<Stop>> {
        self.transit_model.resolve_stop(feed_scoped_quay_id)
    }

    pub fn resolve_trip(&self, feed_scoped_trip_id: &FeedScopedId<Trip>) -> Option<Id<Trip>> {
        self.transit_model.resolve_trip(feed_scoped_trip_id)
    }

    /// Resolves `(trip, serviceDate)` for an estimated vehicle journey
    /// following the precedence:
    /// 1. `framedVehicleJourneyRef` → `(datedVehicleJourneyRef, dataFrameRef as date)`.
    /// 2. `datedVehicleJourneyRef` alone → a pre-computed `TripOnServiceDate`.
    /// 3. `estimatedVehicleJourneyCode` → same as (2).
    ///
    /// Falls back to the optional fuzzy matcher only once rules 1–3 have
    /// all failed to produce a trip.
    pub fn resolve_trip_and_service_date(
        &self,
        refs: &EstimatedVehicleJourneyRefs,
        service_date_hint: NaiveDate,
    ) -> Result<(Id<Trip>, NaiveDate), ResolveError> {
        if let Some(framed) = &refs.framed_vehicle_journey_ref {
            match NaiveDate::parse_from_str(&framed.data_frame_ref, "%Y-%m-%d") {
                Ok(date) => {
                    if let Some(trip_id) =
                        self.transit_model.resolve_trip(&framed.dated_vehicle_journey_ref)
                    {
                        return Ok((trip_id, date));
                    }
                }
                Err(_) => {
                    warn!(
                        "unparseable dataFrameRef {:?}; falling back to the next resolution rule",
                        framed.data_frame_ref
                    );
                }
            }
        }

        if let Some(dated) = &refs.dated_vehicle_journey_ref {
            if let Some(tosd) = self.transit_model.trip_on_service_date(dated) {
                return Ok((tosd.trip_id, tosd.service_date));
            }
        }

        if let Some(code) = &refs.estimated_vehicle_journey_code {
            if let Some(tosd) = self.transit_model.trip_on_service_date(code) {
                return Ok((tosd.trip_id, tosd.service_date));
            }
        }

        if let (Some(matcher), Some(hint)) = (&self.fuzzy_matcher, &refs.fuzzy_hint) {
            if let Some(trip_id) = matcher.match_trip(hint, service_date_hint) {
                return Ok((trip_id, service_date_hint));
            }
        }

        Err(ResolveError::UnknownTrip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{feed::FeedId, trip_on_service_date::TripOnServiceDate};
    use std::{collections::HashMap, sync::Arc};

    struct FakeTransitModel {
        trips_by_code: HashMap<String, TripOnServiceDate>,
    }

    impl TransitModel for FakeTransitModel {
        fn feed_id(&self) -> &FeedId {
            unimplemented!()
        }
        fn scheduled_pattern(&self, _trip_id: &Id<Trip>) -> Option<Arc<model::pattern::Pattern>> {
            None
        }
        fn pattern_by_id(&self, _pattern_id: &Id<model::pattern::Pattern>) -> Option<Arc<model::pattern::Pattern>> {
            None
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
        fn trip_on_service_date(&self, code: &str) -> Option<TripOnServiceDate> {
            self.trips_by_code.get(code).cloned()
        }
    }

    fn resolver_with(trips_by_code: HashMap<String, TripOnServiceDate>) -> EntityResolver {
        EntityResolver::new(Arc::new(FakeTransitModel { trips_by_code }), None)
    }

    #[test]
    fn dated_vehicle_journey_ref_resolves_via_trip_on_service_date() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut trips = HashMap::new();
        trips.insert(
            "DATED-1".to_owned(),
            TripOnServiceDate::new(Id::new("t1".to_owned()), date),
        );
        let resolver = resolver_with(trips);

        let refs = EstimatedVehicleJourneyRefs {
            dated_vehicle_journey_ref: Some("DATED-1".to_owned()),
            ..Default::default()
        };
        let (trip_id, service_date) = resolver
            .resolve_trip_and_service_date(&refs, date)
            .expect("should resolve");
        assert_eq!(trip_id, Id::new("t1".to_owned()));
        assert_eq!(service_date, date);
    }

    #[test]
    fn all_references_missing_is_unknown_trip() {
        let resolver = resolver_with(HashMap::new());
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let result = resolver.resolve_trip_and_service_date(&EstimatedVehicleJourneyRefs::default(), date);
        assert_eq!(result, Err(ResolveError::UnknownTrip));
    }

    #[test]
    fn estimated_vehicle_journey_code_is_tried_after_dated_ref() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut trips = HashMap::new();
        trips.insert(
            "CODE-1".to_owned(),
            TripOnServiceDate::new(Id::new("t2".to_owned()), date),
        );
        let resolver = resolver_with(trips);

        let refs = EstimatedVehicleJourneyRefs {
            dated_vehicle_journey_ref: Some("missing".to_owned()),
            estimated_vehicle_journey_code: Some("CODE-1".to_owned()),
            ..Default::default()
        };
        let (trip_id, _) = resolver
            .resolve_trip_and_service_date(&refs, date)
            .expect("should fall back to the estimated journey code");
        assert_eq!(trip_id, Id::new("t2".to_owned()));
    }
}
