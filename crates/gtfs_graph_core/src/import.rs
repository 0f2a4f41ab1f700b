use gtfs_graph_model::{EntityKind, FareAttribute, FareRule, Route, Stop, StopTime, Trip};
use rustc_hash::FxHashSet;

use crate::dataset::stop_time_key;
use crate::entity::GraphEntity;
use crate::{Dataset, GraphError};

/// Copies entities from one dataset into another, pulling in what they
/// reference on demand. Each referenced entity is fetched at most once.
pub struct Importer<'s, 't> {
    source: &'s Dataset,
    target: &'t mut Dataset,
    visited: FxHashSet<(EntityKind, String)>,
}

impl<'s, 't> Importer<'s, 't> {
    pub fn new(source: &'s Dataset, target: &'t mut Dataset) -> Self {
        Self {
            source,
            target,
            visited: FxHashSet::default(),
        }
    }

    pub fn source(&self) -> &'s Dataset {
        self.source
    }

    pub fn target(&self) -> &Dataset {
        &*self.target
    }

    /// Adds a copy of `entity` to the target. An equal entity already under
    /// the key is left alone; a different one is a duplicate. When
    /// `recursive`, missing references are imported from the source first.
    pub fn import<E: GraphEntity>(&mut self, entity: &E, recursive: bool) -> Result<E::Key, GraphError> {
        let key = entity.key();
        if let Some(existing) = E::collection(self.target).get(&key) {
            return if existing == entity {
                Ok(key)
            } else {
                Err(GraphError::duplicate(E::KIND, &key))
            };
        }
        if recursive {
            entity.import_references(self)?;
            // A reference cycle may have brought the entity in already.
            if E::collection(self.target).get(&key) == Some(entity) {
                return Ok(key);
            }
        }
        self.target.insert(entity.clone())
    }

    /// Imports the source entity stored under `key`, with its references.
    pub fn import_key<E: GraphEntity>(&mut self, key: &E::Key) -> Result<E::Key, GraphError> {
        let marker = (E::KIND, key.to_string());
        if self.visited.contains(&marker) {
            return Ok(key.clone());
        }
        let source = self.source;
        let entity = E::collection(source)
            .get(key)
            .ok_or_else(|| GraphError::not_found(E::KIND, key))?;
        self.visited.insert(marker);
        self.import(entity, true)
    }

    pub fn import_stop_time(
        &mut self,
        stop_time: &StopTime,
        recursive: bool,
    ) -> Result<(String, u32), GraphError> {
        let trip_id = &stop_time.trip_id;
        let sequence = stop_time.stop_sequence;
        if let Some(existing) = self.target.stop_time(trip_id, sequence) {
            return if existing == stop_time {
                Ok((trip_id.clone(), sequence))
            } else {
                Err(GraphError::duplicate(
                    EntityKind::StopTime,
                    stop_time_key(trip_id, sequence),
                ))
            };
        }
        if recursive {
            self.import_key::<Trip>(trip_id)?;
            self.import_key::<Stop>(&stop_time.stop_id)?;
        }
        self.target.insert_stop_time(stop_time.clone())
    }

    pub fn import_fare_rule(&mut self, rule: &FareRule, recursive: bool) -> Result<(), GraphError> {
        if self.target.fare_rules.contains(rule) {
            return Ok(());
        }
        if recursive {
            self.import_key::<FareAttribute>(&rule.fare_id)?;
            if let Some(route_id) = &rule.route_id {
                self.import_key::<Route>(route_id)?;
            }
        }
        self.target.insert_fare_rule(rule.clone())
    }
}

impl Dataset {
    /// Copies `entity` from `source` into this dataset. See
    /// [`Importer::import`].
    pub fn add_object<E: GraphEntity>(
        &mut self,
        source: &Dataset,
        entity: &E,
        recursive: bool,
    ) -> Result<E::Key, GraphError> {
        Importer::new(source, self).import(entity, recursive)
    }

    pub fn add_stop_time_object(
        &mut self,
        source: &Dataset,
        stop_time: &StopTime,
        recursive: bool,
    ) -> Result<(String, u32), GraphError> {
        Importer::new(source, self).import_stop_time(stop_time, recursive)
    }

    pub fn add_fare_rule_object(
        &mut self,
        source: &Dataset,
        rule: &FareRule,
        recursive: bool,
    ) -> Result<(), GraphError> {
        Importer::new(source, self).import_fare_rule(rule, recursive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use gtfs_graph_model::Agency;

    #[test]
    fn recursive_trip_import_brings_its_references() {
        let source = fixtures::full_dataset();
        let mut target = Dataset::new();
        let trip = source.trips().get("1001_1").unwrap();
        target.add_object(&source, trip, true).unwrap();

        assert!(target.agencies().contains_key(&1));
        assert!(target.routes().contains_key("1001"));
        assert!(target.calendar().contains_key(&trip.service_id));
        if let Some(shape_id) = trip.shape_id {
            assert_eq!(target.shapes().get(&shape_id), source.shapes().get(&shape_id));
        }
        assert!(target.line(1, "1").is_some());
    }

    #[test]
    fn plain_import_needs_references_in_place() {
        let source = fixtures::full_dataset();
        let mut target = Dataset::new();
        let route = source.routes().get("1001").unwrap();
        assert!(matches!(
            target.add_object(&source, route, false),
            Err(GraphError::UnresolvedReference {
                target: EntityKind::Agency,
                ..
            })
        ));
        assert!(target.is_empty());
    }

    #[test]
    fn equal_entity_is_a_no_op_and_different_one_is_duplicate() {
        let source = fixtures::full_dataset();
        let mut target = Dataset::new();
        let agency = source.agencies().get(&1).unwrap();
        target.add_object(&source, agency, false).unwrap();
        assert_eq!(target.add_object(&source, agency, false).unwrap(), 1);
        assert_eq!(target.agencies().len(), 1);

        let changed = Agency {
            agency_name: "Other".to_string(),
            ..agency.clone()
        };
        assert!(matches!(
            target.add_object(&source, &changed, false),
            Err(GraphError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn stop_time_import_pulls_parent_station() {
        let source = fixtures::full_dataset();
        let mut target = Dataset::new();
        let stop_time = source.stop_time("1001_1", 1).unwrap();
        target
            .add_stop_time_object(&source, stop_time, true)
            .unwrap();
        assert!(target.stops().contains_key(&10001));
        assert!(target.stops().contains_key(&10000));
        assert_eq!(target.child_stops(10000).count(), 1);
        target
            .add_stop_time_object(&source, stop_time, false)
            .unwrap();
        assert_eq!(target.stop_time_count(), 1);
    }

    #[test]
    fn missing_source_key_is_not_found() {
        let source = fixtures::full_dataset();
        let mut target = Dataset::new();
        let mut importer = Importer::new(&source, &mut target);
        assert!(matches!(
            importer.import_key::<Trip>(&"nope".to_string()),
            Err(GraphError::NotFound { .. })
        ));
        assert_eq!(importer.source().trips().len(), source.trips().len());
    }

    #[test]
    fn stops_in_a_parent_cycle_are_imported_once() {
        let mut source = Dataset::new();
        for (stop_id, parent) in [(6, 7), (7, 6)] {
            source
                .insert(Stop {
                    stop_id,
                    stop_name: format!("Stop {}", stop_id),
                    parent_station: Some(parent),
                    ..Default::default()
                })
                .unwrap();
        }
        let mut target = Dataset::new();
        let stop = source.stops().get(&6).unwrap();
        assert_eq!(target.add_object(&source, stop, true).unwrap(), 6);
        assert_eq!(target.stops(), source.stops());
    }
}
