use gtfs_graph_model::EntityKind;
use url::Url;

use crate::validation_context::check_urls;
use crate::{Severity, ValidatorRunner, Violation, ViolationReport};

mod agency;
mod calendar;
mod fare_attributes;
mod fare_rules;
mod routes;
mod shapes;
mod stop_times;
mod stops;
mod trips;

pub use agency::AgencyValidator;
pub use calendar::CalendarValidator;
pub use fare_attributes::FareAttributeValidator;
pub use fare_rules::FareRuleValidator;
pub use routes::RouteValidator;
pub use shapes::ShapeValidator;
pub use stop_times::StopTimeValidator;
pub use stops::StopValidator;
pub use trips::TripValidator;

const CODE_FOREIGN_KEY_VIOLATION: &str = "foreign_key_violation";
const CODE_INVALID_URL: &str = "invalid_url";
const CODE_MISSING_REQUIRED_FIELD: &str = "missing_required_field";

pub(crate) fn register_default_rules(runner: &mut ValidatorRunner) {
    runner.register(AgencyValidator);
    runner.register(RouteValidator);
    runner.register(ShapeValidator);
    runner.register(CalendarValidator);
    runner.register(TripValidator);
    runner.register(StopValidator);
    runner.register(StopTimeValidator);
    runner.register(FareAttributeValidator);
    runner.register(FareRuleValidator);
}

fn foreign_key_violation(
    entity: EntityKind,
    key: impl ToString,
    field: &str,
    target: EntityKind,
    target_key: impl ToString,
) -> Violation {
    let target_key = target_key.to_string();
    Violation::error(
        CODE_FOREIGN_KEY_VIOLATION,
        entity,
        key,
        format!("{} {} does not exist", target, target_key),
    )
    .with_field(field)
    .with_context_field("target", target)
    .with_context_field("targetKey", target_key)
}

fn missing_required_field(entity: EntityKind, key: impl ToString, field: &str) -> Violation {
    Violation::error(
        CODE_MISSING_REQUIRED_FIELD,
        entity,
        key,
        format!("{} is required", field),
    )
    .with_field(field)
}

fn require_text(
    report: &mut ViolationReport,
    entity: EntityKind,
    key: &impl ToString,
    field: &str,
    value: &str,
) {
    if value.trim().is_empty() {
        report.push(missing_required_field(entity, key.to_string(), field));
    }
}

/// Reports `value` unless it is an absolute URL. Skipped entirely when URL
/// checks are switched off for this thread.
fn check_url(
    report: &mut ViolationReport,
    entity: EntityKind,
    key: &impl ToString,
    field: &str,
    value: Option<&str>,
) {
    if !check_urls() {
        return;
    }
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return;
    };
    if let Err(err) = Url::parse(value) {
        report.push(
            Violation::new(
                CODE_INVALID_URL,
                Severity::Warning,
                entity,
                key.to_string(),
                format!("invalid URL: {}", err),
            )
            .with_field(field)
            .with_context_field("fieldValue", value),
        );
    }
}

fn coordinate_in_range(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation_context::set_check_urls;

    #[test]
    fn url_check_honours_thread_policy() {
        let mut report = ViolationReport::new();
        check_url(&mut report, EntityKind::Agency, &1, "agency_url", Some("not a url"));
        assert!(report.has_code(CODE_INVALID_URL));
        assert!(!report.has_errors());

        let _guard = set_check_urls(false);
        let mut report = ViolationReport::new();
        check_url(&mut report, EntityKind::Agency, &1, "agency_url", Some("not a url"));
        assert!(report.is_empty());
    }

    #[test]
    fn coordinates_are_bounded() {
        assert!(coordinate_in_range(48.85, 2.35));
        assert!(!coordinate_in_range(91.0, 0.0));
        assert!(!coordinate_in_range(0.0, -180.5));
        assert!(!coordinate_in_range(f64::NAN, 0.0));
    }
}
