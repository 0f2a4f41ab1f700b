use gtfs_graph_model::EntityKind;

use super::foreign_key_violation;
use crate::validation_context::require_trip_stop_times;
use crate::{Dataset, Severity, Validator, Violation, ViolationReport};

const CODE_TRIP_WITHOUT_STOP_TIMES: &str = "trip_without_stop_times";

#[derive(Debug, Default)]
pub struct TripValidator;

impl Validator for TripValidator {
    fn name(&self) -> &'static str {
        "trips"
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Trip
    }

    fn validate(&self, dataset: &Dataset, report: &mut ViolationReport) {
        let severity = if require_trip_stop_times() {
            Severity::Error
        } else {
            Severity::Warning
        };
        for trip in dataset.trips() {
            let key = &trip.trip_id;
            if !dataset.routes().contains_key(trip.route_id.as_str()) {
                report.push(foreign_key_violation(
                    EntityKind::Trip,
                    key,
                    "route_id",
                    EntityKind::Route,
                    &trip.route_id,
                ));
            }
            if !dataset.calendar().contains_key(&trip.service_id) {
                report.push(foreign_key_violation(
                    EntityKind::Trip,
                    key,
                    "service_id",
                    EntityKind::Service,
                    trip.service_id,
                ));
            }
            if let Some(shape_id) = trip.shape_id {
                if !dataset.shapes().contains_key(&shape_id) {
                    report.push(foreign_key_violation(
                        EntityKind::Trip,
                        key,
                        "shape_id",
                        EntityKind::Shape,
                        shape_id,
                    ));
                }
            }
            if dataset.trip_stop_time_count(key) == 0 {
                report.push(Violation::new(
                    CODE_TRIP_WITHOUT_STOP_TIMES,
                    severity,
                    EntityKind::Trip,
                    key,
                    "trip has no stop times",
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::validation_context::set_require_trip_stop_times;

    fn dataset_with_bare_trip() -> Dataset {
        let mut dataset = fixtures::full_dataset();
        dataset
            .add_trip(&fixtures::trip_row("1001_9", "1001", 1))
            .unwrap();
        dataset
    }

    #[test]
    fn bare_trip_is_a_warning_by_default() {
        let dataset = dataset_with_bare_trip();
        let mut report = ViolationReport::new();
        TripValidator.validate(&dataset, &mut report);
        assert!(report.has_code(CODE_TRIP_WITHOUT_STOP_TIMES));
        assert!(!report.has_errors());
    }

    #[test]
    fn bare_trip_is_an_error_under_strict_policy() {
        let dataset = dataset_with_bare_trip();
        let _guard = set_require_trip_stop_times(true);
        let mut report = ViolationReport::new();
        TripValidator.validate(&dataset, &mut report);
        assert!(report.has_errors());
    }
}
