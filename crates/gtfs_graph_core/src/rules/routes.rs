use gtfs_graph_model::EntityKind;

use super::{check_url, foreign_key_violation};
use crate::{Dataset, Validator, Violation, ViolationReport};

const CODE_UNKNOWN_ROUTE_TYPE: &str = "unknown_route_type";
const CODE_LINE_MISMATCH: &str = "line_mismatch";

/// Routes and the lines derived from them.
#[derive(Debug, Default)]
pub struct RouteValidator;

impl Validator for RouteValidator {
    fn name(&self) -> &'static str {
        "routes"
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Route
    }

    fn validate(&self, dataset: &Dataset, report: &mut ViolationReport) {
        for route in dataset.routes() {
            if !dataset.agencies().contains_key(&route.agency_id) {
                report.push(foreign_key_violation(
                    EntityKind::Route,
                    &route.route_id,
                    "agency_id",
                    EntityKind::Agency,
                    route.agency_id,
                ));
            }
            if !route.route_type.is_known() {
                report.push(
                    Violation::error(
                        CODE_UNKNOWN_ROUTE_TYPE,
                        EntityKind::Route,
                        &route.route_id,
                        format!("route_type {} is not a known route type", route.route_type.code()),
                    )
                    .with_field("route_type")
                    .with_context_field("routeType", route.route_type.code()),
                );
            }
            let in_line = dataset
                .line(route.agency_id, &route.route_short_name)
                .is_some_and(|line| line.route_ids().any(|id| id == route.route_id));
            if !in_line {
                report.push(line_mismatch(
                    &route.route_id,
                    route.agency_id,
                    &route.route_short_name,
                ));
            }
            check_url(
                report,
                EntityKind::Route,
                &route.route_id,
                "route_url",
                route.route_url.as_deref(),
            );
        }

        for line in dataset.lines() {
            for route_id in line.route_ids() {
                let matches = dataset.routes().get(route_id).is_some_and(|route| {
                    route.agency_id == line.agency_id()
                        && route.route_short_name == line.short_name()
                });
                if !matches {
                    report.push(line_mismatch(route_id, line.agency_id(), line.short_name()));
                }
            }
        }
    }
}

fn line_mismatch(route_id: &str, agency_id: u32, short_name: &str) -> Violation {
    Violation::error(
        CODE_LINE_MISMATCH,
        EntityKind::Line,
        format!("{}/{}", agency_id, short_name),
        format!("route {} is not grouped under its line", route_id),
    )
    .with_context_field("routeId", route_id)
    .with_context_field("agencyId", agency_id)
    .with_context_field("routeShortName", short_name)
}
