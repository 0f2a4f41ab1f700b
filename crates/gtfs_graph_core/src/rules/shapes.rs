use gtfs_graph_model::EntityKind;

use super::coordinate_in_range;
use crate::{Dataset, Validator, Violation, ViolationReport};

const CODE_EMPTY_SHAPE: &str = "empty_shape";
const CODE_POINT_OUT_OF_RANGE: &str = "point_out_of_range";

#[derive(Debug, Default)]
pub struct ShapeValidator;

impl Validator for ShapeValidator {
    fn name(&self) -> &'static str {
        "shapes"
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Shape
    }

    fn validate(&self, dataset: &Dataset, report: &mut ViolationReport) {
        for shape in dataset.shapes() {
            if shape.is_empty() {
                report.push(Violation::error(
                    CODE_EMPTY_SHAPE,
                    EntityKind::Shape,
                    shape.shape_id,
                    "shape has no points",
                ));
                continue;
            }
            for point in shape.points() {
                if !coordinate_in_range(point.shape_pt_lat, point.shape_pt_lon) {
                    report.push(
                        Violation::error(
                            CODE_POINT_OUT_OF_RANGE,
                            EntityKind::Shape,
                            shape.shape_id,
                            "shape point lies outside valid coordinates",
                        )
                        .with_context_field("shapePtSequence", point.shape_pt_sequence)
                        .with_context_field("shapePtLat", point.shape_pt_lat)
                        .with_context_field("shapePtLon", point.shape_pt_lon),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtfs_graph_model::{Shape, ShapePoint};

    #[test]
    fn empty_and_out_of_range_shapes() {
        let mut dataset = Dataset::new();
        dataset.insert(Shape::new(1)).unwrap();
        dataset
            .insert_shape_point(ShapePoint {
                shape_id: 2,
                shape_pt_lat: 123.0,
                shape_pt_lon: 2.0,
                shape_pt_sequence: 1,
                ..Default::default()
            })
            .unwrap();
        let mut report = ViolationReport::new();
        ShapeValidator.validate(&dataset, &mut report);
        let codes: Vec<&str> = report.iter().map(|v| v.code.as_str()).collect();
        assert_eq!(codes, vec![CODE_EMPTY_SHAPE, CODE_POINT_OUT_OF_RANGE]);
    }
}
