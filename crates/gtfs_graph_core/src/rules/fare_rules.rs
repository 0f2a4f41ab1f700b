use gtfs_graph_model::EntityKind;

use super::foreign_key_violation;
use crate::{Dataset, Validator, ViolationReport};

#[derive(Debug, Default)]
pub struct FareRuleValidator;

impl Validator for FareRuleValidator {
    fn name(&self) -> &'static str {
        "fare_rules"
    }

    fn kind(&self) -> EntityKind {
        EntityKind::FareRule
    }

    fn validate(&self, dataset: &Dataset, report: &mut ViolationReport) {
        for rule in dataset.fare_rules() {
            if !dataset.fare_attributes().contains_key(rule.fare_id.as_str()) {
                report.push(foreign_key_violation(
                    EntityKind::FareRule,
                    &rule.fare_id,
                    "fare_id",
                    EntityKind::FareAttribute,
                    &rule.fare_id,
                ));
            }
            if let Some(route_id) = &rule.route_id {
                if !dataset.routes().contains_key(route_id.as_str()) {
                    report.push(foreign_key_violation(
                        EntityKind::FareRule,
                        &rule.fare_id,
                        "route_id",
                        EntityKind::Route,
                        route_id,
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn dangling_route_is_reported() {
        let mut dataset = fixtures::full_dataset();
        let mut rule = dataset.fare_rules()[0].clone();
        rule.route_id = Some("gone".to_string());
        dataset.fare_rules.push(rule);
        let mut report = ViolationReport::new();
        FareRuleValidator.validate(&dataset, &mut report);
        assert_eq!(report.len(), 1);
        assert_eq!(report.iter().next().unwrap().field.as_deref(), Some("route_id"));
    }
}
