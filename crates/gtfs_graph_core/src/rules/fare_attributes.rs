use gtfs_graph_model::EntityKind;

use super::{foreign_key_violation, require_text};
use crate::{Dataset, Validator, Violation, ViolationReport};

const CODE_NUMBER_OUT_OF_RANGE: &str = "number_out_of_range";

#[derive(Debug, Default)]
pub struct FareAttributeValidator;

impl Validator for FareAttributeValidator {
    fn name(&self) -> &'static str {
        "fare_attributes"
    }

    fn kind(&self) -> EntityKind {
        EntityKind::FareAttribute
    }

    fn validate(&self, dataset: &Dataset, report: &mut ViolationReport) {
        for fare in dataset.fare_attributes() {
            let key = &fare.fare_id;
            if !(fare.price.is_finite() && fare.price >= 0.0) {
                report.push(
                    Violation::error(
                        CODE_NUMBER_OUT_OF_RANGE,
                        EntityKind::FareAttribute,
                        key,
                        "price must be a non-negative amount",
                    )
                    .with_field("price")
                    .with_context_field("fieldValue", fare.price),
                );
            }
            require_text(
                report,
                EntityKind::FareAttribute,
                key,
                "currency_type",
                &fare.currency_type,
            );
            if let Some(agency_id) = fare.agency_id {
                if !dataset.agencies().contains_key(&agency_id) {
                    report.push(foreign_key_violation(
                        EntityKind::FareAttribute,
                        key,
                        "agency_id",
                        EntityKind::Agency,
                        agency_id,
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtfs_graph_model::FareAttribute;

    #[test]
    fn negative_price_is_out_of_range() {
        let mut dataset = Dataset::new();
        dataset
            .insert(FareAttribute {
                fare_id: "f".to_string(),
                price: -1.5,
                currency_type: "EUR".to_string(),
                ..Default::default()
            })
            .unwrap();
        let mut report = ViolationReport::new();
        FareAttributeValidator.validate(&dataset, &mut report);
        assert_eq!(report.len(), 1);
        assert!(report.has_code(CODE_NUMBER_OUT_OF_RANGE));
    }
}
