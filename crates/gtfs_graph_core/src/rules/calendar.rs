use gtfs_graph_model::EntityKind;

use crate::{Dataset, Validator, Violation, ViolationReport};

const CODE_START_AFTER_END: &str = "start_after_end";
const CODE_NO_ACTIVE_DAY: &str = "no_active_day";
const CODE_INVALID_DATE: &str = "invalid_date";

#[derive(Debug, Default)]
pub struct CalendarValidator;

impl Validator for CalendarValidator {
    fn name(&self) -> &'static str {
        "calendar"
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Service
    }

    fn validate(&self, dataset: &Dataset, report: &mut ViolationReport) {
        for service in dataset.calendar() {
            if !service.has_active_day() {
                report.push(Violation::error(
                    CODE_NO_ACTIVE_DAY,
                    EntityKind::Service,
                    service.service_id,
                    "service runs on no day of the week",
                ));
            }
            for (field, date) in [
                ("start_date", &service.start_date),
                ("end_date", &service.end_date),
            ] {
                if date.to_naive_date().is_none() {
                    report.push(
                        Violation::error(
                            CODE_INVALID_DATE,
                            EntityKind::Service,
                            service.service_id,
                            format!("{} is not a calendar date", date),
                        )
                        .with_field(field),
                    );
                }
            }
            if service.start_date > service.end_date {
                report.push(
                    Violation::error(
                        CODE_START_AFTER_END,
                        EntityKind::Service,
                        service.service_id,
                        "start_date is after end_date",
                    )
                    .with_context_field("startDate", service.start_date.to_string())
                    .with_context_field("endDate", service.end_date.to_string()),
                );
            }
        }
    }
}
