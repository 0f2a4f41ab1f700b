use gtfs_graph_model::{EntityKind, StopTime};

use super::foreign_key_violation;
use crate::{Dataset, Validator, Violation, ViolationReport};

const CODE_MISSING_ARRIVAL_AND_DEPARTURE: &str = "missing_arrival_and_departure";
const CODE_ARRIVAL_AFTER_DEPARTURE: &str = "arrival_after_departure";
const CODE_NO_PICKUP_OR_DROP_OFF: &str = "no_pickup_or_drop_off";
const CODE_SEQUENCE_MISMATCH: &str = "sequence_mismatch";

#[derive(Debug, Default)]
pub struct StopTimeValidator;

impl Validator for StopTimeValidator {
    fn name(&self) -> &'static str {
        "stop_times"
    }

    fn kind(&self) -> EntityKind {
        EntityKind::StopTime
    }

    fn validate(&self, dataset: &Dataset, report: &mut ViolationReport) {
        for (trip_id, times) in &dataset.stop_times {
            if !dataset.trips().contains_key(trip_id.as_str()) {
                for sequence in times.keys() {
                    report.push(foreign_key_violation(
                        EntityKind::StopTime,
                        stop_time_label(trip_id, *sequence),
                        "trip_id",
                        EntityKind::Trip,
                        trip_id,
                    ));
                }
            }
            for (sequence, stop_time) in times {
                validate_stop_time(dataset, trip_id, *sequence, stop_time, report);
            }
        }
    }
}

fn validate_stop_time(
    dataset: &Dataset,
    trip_id: &str,
    sequence: u32,
    stop_time: &StopTime,
    report: &mut ViolationReport,
) {
    let key = stop_time_label(trip_id, sequence);
    if stop_time.trip_id != trip_id || stop_time.stop_sequence != sequence {
        report.push(
            Violation::error(
                CODE_SEQUENCE_MISMATCH,
                EntityKind::StopTime,
                &key,
                "stop time is filed under another trip or sequence",
            )
            .with_context_field("tripId", &stop_time.trip_id)
            .with_context_field("stopSequence", stop_time.stop_sequence),
        );
    }
    if !dataset.stops().contains_key(&stop_time.stop_id) {
        report.push(foreign_key_violation(
            EntityKind::StopTime,
            &key,
            "stop_id",
            EntityKind::Stop,
            stop_time.stop_id,
        ));
    }
    match (stop_time.arrival_time, stop_time.departure_time) {
        (None, None) => report.push(Violation::error(
            CODE_MISSING_ARRIVAL_AND_DEPARTURE,
            EntityKind::StopTime,
            &key,
            "neither arrival_time nor departure_time is set",
        )),
        (Some(arrival), Some(departure)) if arrival > departure => report.push(
            Violation::error(
                CODE_ARRIVAL_AFTER_DEPARTURE,
                EntityKind::StopTime,
                &key,
                "arrival_time is after departure_time",
            )
            .with_context_field("arrivalTime", arrival.to_string())
            .with_context_field("departureTime", departure.to_string()),
        ),
        _ => {}
    }
    if !stop_time.allows_pickup() && !stop_time.allows_drop_off() {
        report.push(Violation::error(
            CODE_NO_PICKUP_OR_DROP_OFF,
            EntityKind::StopTime,
            &key,
            "stop time allows neither pickup nor drop-off",
        ));
    }
}

fn stop_time_label(trip_id: &str, sequence: u32) -> String {
    format!("{}#{}", trip_id, sequence)
}
