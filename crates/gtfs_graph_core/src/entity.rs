use gtfs_graph_model::{Agency, EntityKind, FareAttribute, Record, Route, Service, Shape, Stop, Trip};

use crate::collection::EntityCollection;
use crate::import::Importer;
use crate::{Dataset, GraphError};

/// A keyed entity kind held by a [`Dataset`], with the rules for resolving,
/// indexing and removing it.
pub trait GraphEntity: Record {
    fn collection(dataset: &Dataset) -> &EntityCollection<Self>;

    fn collection_mut(dataset: &mut Dataset) -> &mut EntityCollection<Self>;

    /// Fails unless every key this entity holds names an entity in `dataset`.
    fn resolve(&self, _dataset: &Dataset) -> Result<(), GraphError> {
        Ok(())
    }

    /// Copies the entities this one references from the importer's source.
    fn import_references(&self, _importer: &mut Importer<'_, '_>) -> Result<(), GraphError> {
        Ok(())
    }

    /// Records the entity in the derived indexes just before it is stored.
    fn link(&self, _dataset: &mut Dataset) {}

    fn remove(dataset: &mut Dataset, key: &Self::Key, recursive: bool) -> Result<(), GraphError>;

    /// Removes entities of this kind left without dependents.
    fn sweep(dataset: &mut Dataset) -> usize;
}

fn require<E: GraphEntity>(
    dataset: &Dataset,
    kind: EntityKind,
    key: &impl ToString,
    target_key: &E::Key,
) -> Result<(), GraphError> {
    if E::collection(dataset).contains_key(target_key) {
        Ok(())
    } else {
        Err(GraphError::unresolved(kind, key.to_string(), E::KIND, target_key))
    }
}

impl GraphEntity for Agency {
    fn collection(dataset: &Dataset) -> &EntityCollection<Self> {
        &dataset.agencies
    }

    fn collection_mut(dataset: &mut Dataset) -> &mut EntityCollection<Self> {
        &mut dataset.agencies
    }

    fn remove(dataset: &mut Dataset, key: &u32, recursive: bool) -> Result<(), GraphError> {
        dataset.remove_agency_entry(*key, recursive)
    }

    fn sweep(dataset: &mut Dataset) -> usize {
        dataset.sweep_agencies()
    }
}

impl GraphEntity for Route {
    fn collection(dataset: &Dataset) -> &EntityCollection<Self> {
        &dataset.routes
    }

    fn collection_mut(dataset: &mut Dataset) -> &mut EntityCollection<Self> {
        &mut dataset.routes
    }

    fn resolve(&self, dataset: &Dataset) -> Result<(), GraphError> {
        require::<Agency>(dataset, Self::KIND, &self.route_id, &self.agency_id)
    }

    fn import_references(&self, importer: &mut Importer<'_, '_>) -> Result<(), GraphError> {
        importer.import_key::<Agency>(&self.agency_id)?;
        Ok(())
    }

    fn link(&self, dataset: &mut Dataset) {
        dataset.link_route(self);
    }

    fn remove(dataset: &mut Dataset, key: &String, recursive: bool) -> Result<(), GraphError> {
        dataset.remove_route_entry(key, recursive)
    }

    fn sweep(dataset: &mut Dataset) -> usize {
        dataset.sweep_routes()
    }
}

impl GraphEntity for Service {
    fn collection(dataset: &Dataset) -> &EntityCollection<Self> {
        &dataset.calendar
    }

    fn collection_mut(dataset: &mut Dataset) -> &mut EntityCollection<Self> {
        &mut dataset.calendar
    }

    fn remove(dataset: &mut Dataset, key: &u32, recursive: bool) -> Result<(), GraphError> {
        dataset.remove_service_entry(*key, recursive)
    }

    fn sweep(dataset: &mut Dataset) -> usize {
        dataset.sweep_calendar()
    }
}

impl GraphEntity for Shape {
    fn collection(dataset: &Dataset) -> &EntityCollection<Self> {
        &dataset.shapes
    }

    fn collection_mut(dataset: &mut Dataset) -> &mut EntityCollection<Self> {
        &mut dataset.shapes
    }

    fn remove(dataset: &mut Dataset, key: &u32, recursive: bool) -> Result<(), GraphError> {
        dataset.remove_shape_entry(*key, recursive)
    }

    fn sweep(dataset: &mut Dataset) -> usize {
        dataset.sweep_shapes()
    }
}

impl GraphEntity for Stop {
    fn collection(dataset: &Dataset) -> &EntityCollection<Self> {
        &dataset.stops
    }

    fn collection_mut(dataset: &mut Dataset) -> &mut EntityCollection<Self> {
        &mut dataset.stops
    }

    fn import_references(&self, importer: &mut Importer<'_, '_>) -> Result<(), GraphError> {
        if let Some(parent) = self.parent_station {
            importer.import_key::<Stop>(&parent)?;
        }
        Ok(())
    }

    // Parent stations may come later in the file, so they are checked by
    // validation rather than on insert.
    fn link(&self, dataset: &mut Dataset) {
        if let Some(parent) = self.parent_station {
            dataset
                .relations
                .station_children
                .link(parent, self.stop_id);
        }
    }

    fn remove(dataset: &mut Dataset, key: &u32, recursive: bool) -> Result<(), GraphError> {
        dataset.remove_stop_entry(*key, recursive)
    }

    fn sweep(dataset: &mut Dataset) -> usize {
        dataset.sweep_stops()
    }
}

impl GraphEntity for Trip {
    fn collection(dataset: &Dataset) -> &EntityCollection<Self> {
        &dataset.trips
    }

    fn collection_mut(dataset: &mut Dataset) -> &mut EntityCollection<Self> {
        &mut dataset.trips
    }

    fn resolve(&self, dataset: &Dataset) -> Result<(), GraphError> {
        require::<Route>(dataset, Self::KIND, &self.trip_id, &self.route_id)?;
        require::<Service>(dataset, Self::KIND, &self.trip_id, &self.service_id)?;
        if let Some(shape_id) = &self.shape_id {
            require::<Shape>(dataset, Self::KIND, &self.trip_id, shape_id)?;
        }
        Ok(())
    }

    fn import_references(&self, importer: &mut Importer<'_, '_>) -> Result<(), GraphError> {
        importer.import_key::<Route>(&self.route_id)?;
        importer.import_key::<Service>(&self.service_id)?;
        if let Some(shape_id) = &self.shape_id {
            importer.import_key::<Shape>(shape_id)?;
        }
        Ok(())
    }

    fn link(&self, dataset: &mut Dataset) {
        dataset.link_trip(self);
    }

    fn remove(dataset: &mut Dataset, key: &String, recursive: bool) -> Result<(), GraphError> {
        dataset.remove_trip_entry(key, recursive)
    }

    fn sweep(dataset: &mut Dataset) -> usize {
        dataset.sweep_trips()
    }
}

impl GraphEntity for FareAttribute {
    fn collection(dataset: &Dataset) -> &EntityCollection<Self> {
        &dataset.fare_attributes
    }

    fn collection_mut(dataset: &mut Dataset) -> &mut EntityCollection<Self> {
        &mut dataset.fare_attributes
    }

    fn resolve(&self, dataset: &Dataset) -> Result<(), GraphError> {
        match &self.agency_id {
            Some(agency_id) => require::<Agency>(dataset, Self::KIND, &self.fare_id, agency_id),
            None => Ok(()),
        }
    }

    fn import_references(&self, importer: &mut Importer<'_, '_>) -> Result<(), GraphError> {
        if let Some(agency_id) = &self.agency_id {
            importer.import_key::<Agency>(agency_id)?;
        }
        Ok(())
    }

    fn link(&self, dataset: &mut Dataset) {
        if let Some(agency_id) = self.agency_id {
            dataset
                .relations
                .agency_fares
                .link(agency_id, self.fare_id.clone());
        }
    }

    fn remove(dataset: &mut Dataset, key: &String, recursive: bool) -> Result<(), GraphError> {
        dataset.remove_fare_attribute_entry(key, recursive)
    }

    fn sweep(dataset: &mut Dataset) -> usize {
        dataset.sweep_fare_attributes()
    }
}
