use gtfs_graph_model::EntityKind;

use super::{check_url, coordinate_in_range, foreign_key_violation, require_text};
use crate::{Dataset, Validator, Violation, ViolationReport};

const CODE_COORDINATE_OUT_OF_RANGE: &str = "coordinate_out_of_range";
const CODE_PARENT_NOT_STATION: &str = "parent_not_station";
const CODE_STATION_WITH_PARENT: &str = "station_with_parent";

#[derive(Debug, Default)]
pub struct StopValidator;

impl Validator for StopValidator {
    fn name(&self) -> &'static str {
        "stops"
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Stop
    }

    fn validate(&self, dataset: &Dataset, report: &mut ViolationReport) {
        for stop in dataset.stops() {
            let key = &stop.stop_id;
            require_text(report, EntityKind::Stop, key, "stop_name", &stop.stop_name);
            if !coordinate_in_range(stop.stop_lat, stop.stop_lon) {
                report.push(
                    Violation::error(
                        CODE_COORDINATE_OUT_OF_RANGE,
                        EntityKind::Stop,
                        key,
                        "stop lies outside valid coordinates",
                    )
                    .with_context_field("stopLat", stop.stop_lat)
                    .with_context_field("stopLon", stop.stop_lon),
                );
            }
            check_url(report, EntityKind::Stop, key, "stop_url", stop.stop_url.as_deref());

            let Some(parent_id) = stop.parent_station else {
                continue;
            };
            if stop.is_station() {
                report.push(
                    Violation::error(
                        CODE_STATION_WITH_PARENT,
                        EntityKind::Stop,
                        key,
                        "a station cannot have a parent station",
                    )
                    .with_field("parent_station"),
                );
            }
            match dataset.stops().get(&parent_id) {
                None => report.push(foreign_key_violation(
                    EntityKind::Stop,
                    key,
                    "parent_station",
                    EntityKind::Stop,
                    parent_id,
                )),
                Some(parent) if !parent.is_station() => report.push(
                    Violation::error(
                        CODE_PARENT_NOT_STATION,
                        EntityKind::Stop,
                        key,
                        format!("parent stop {} is not a station", parent_id),
                    )
                    .with_field("parent_station")
                    .with_context_field("parentStation", parent_id),
                ),
                Some(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use gtfs_graph_model::LocationType;

    #[test]
    fn parent_must_be_a_station() {
        let mut dataset = fixtures::full_dataset();
        if let Some(station) = dataset.stops.get_mut(&10000) {
            station.location_type = LocationType::StopOrPlatform;
        }
        let mut report = ViolationReport::new();
        StopValidator.validate(&dataset, &mut report);
        assert!(report.has_code(CODE_PARENT_NOT_STATION));
    }

    #[test]
    fn station_cannot_have_parent() {
        let mut dataset = fixtures::full_dataset();
        if let Some(stop) = dataset.stops.get_mut(&10001) {
            stop.location_type = LocationType::Station;
        }
        let mut report = ViolationReport::new();
        StopValidator.validate(&dataset, &mut report);
        assert!(report.has_code(CODE_STATION_WITH_PARENT));
    }

    #[test]
    fn dangling_parent_is_a_foreign_key_violation() {
        let mut dataset = fixtures::full_dataset();
        if let Some(stop) = dataset.stops.get_mut(&20000) {
            stop.parent_station = Some(99);
        }
        let mut report = ViolationReport::new();
        StopValidator.validate(&dataset, &mut report);
        assert!(report.has_code("foreign_key_violation"));
    }
}
