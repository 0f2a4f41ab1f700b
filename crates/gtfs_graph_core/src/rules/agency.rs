use gtfs_graph_model::EntityKind;

use super::{check_url, require_text};
use crate::{Dataset, Validator, ViolationReport};

#[derive(Debug, Default)]
pub struct AgencyValidator;

impl Validator for AgencyValidator {
    fn name(&self) -> &'static str {
        "agency"
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Agency
    }

    fn validate(&self, dataset: &Dataset, report: &mut ViolationReport) {
        for agency in dataset.agencies() {
            let key = &agency.agency_id;
            require_text(report, EntityKind::Agency, key, "agency_name", &agency.agency_name);
            require_text(report, EntityKind::Agency, key, "agency_url", &agency.agency_url);
            require_text(
                report,
                EntityKind::Agency,
                key,
                "agency_timezone",
                &agency.agency_timezone,
            );
            check_url(
                report,
                EntityKind::Agency,
                key,
                "agency_url",
                Some(agency.agency_url.as_str()),
            );
            check_url(
                report,
                EntityKind::Agency,
                key,
                "agency_fare_url",
                agency.agency_fare_url.as_deref(),
            );
        }
    }
}
