use std::collections::BTreeSet;
use std::time::Instant;

use gtfs_graph_model::{
    Agency, EntityKind, FareAttribute, FareRule, Route, Service, Shape, Stop, Trip,
};
use tracing::{debug, info};

use crate::dataset::stop_time_key;
use crate::entity::GraphEntity;
use crate::{Dataset, GraphError};

/// How [`Dataset::remove`] treats dependents and orphans.
///
/// The default neither cascades nor cleans: a removal touches only what it
/// names, and sweeping orphans is opted into with [`RemoveOptions::with_clean`]
/// or a later [`Dataset::clean`]. Cascades themselves never clean in between,
/// so a bulk edit can run one clean at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoveOptions {
    /// Also remove every dependent entity instead of refusing.
    pub recursive: bool,
    /// Run a full [`Dataset::clean`] once the removal is done.
    pub clean_after: bool,
}

impl RemoveOptions {
    pub fn recursive() -> Self {
        Self {
            recursive: true,
            clean_after: false,
        }
    }

    pub fn with_clean(mut self) -> Self {
        self.clean_after = true;
        self
    }
}

/// Number of entities each clean step removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanSummary {
    pub trips: usize,
    pub stops: usize,
    pub shapes: usize,
    pub services: usize,
    pub routes: usize,
    pub agencies: usize,
    pub fare_rules: usize,
    pub fare_attributes: usize,
}

impl CleanSummary {
    pub fn total(&self) -> usize {
        self.trips
            + self.stops
            + self.shapes
            + self.services
            + self.routes
            + self.agencies
            + self.fare_rules
            + self.fare_attributes
    }
}

impl Dataset {
    pub fn remove<E: GraphEntity>(
        &mut self,
        key: &E::Key,
        options: RemoveOptions,
    ) -> Result<(), GraphError> {
        E::remove(self, key, options.recursive)?;
        if options.clean_after {
            self.clean();
        }
        Ok(())
    }

    pub fn remove_agency(&mut self, agency_id: u32, options: RemoveOptions) -> Result<(), GraphError> {
        self.remove::<Agency>(&agency_id, options)
    }

    pub fn remove_route(&mut self, route_id: &str, options: RemoveOptions) -> Result<(), GraphError> {
        self.remove::<Route>(&route_id.to_string(), options)
    }

    pub fn remove_service(&mut self, service_id: u32, options: RemoveOptions) -> Result<(), GraphError> {
        self.remove::<Service>(&service_id, options)
    }

    pub fn remove_shape(&mut self, shape_id: u32, options: RemoveOptions) -> Result<(), GraphError> {
        self.remove::<Shape>(&shape_id, options)
    }

    pub fn remove_stop(&mut self, stop_id: u32, options: RemoveOptions) -> Result<(), GraphError> {
        self.remove::<Stop>(&stop_id, options)
    }

    pub fn remove_trip(&mut self, trip_id: &str, options: RemoveOptions) -> Result<(), GraphError> {
        self.remove::<Trip>(&trip_id.to_string(), options)
    }

    pub fn remove_fare_attribute(
        &mut self,
        fare_id: &str,
        options: RemoveOptions,
    ) -> Result<(), GraphError> {
        self.remove::<FareAttribute>(&fare_id.to_string(), options)
    }

    /// Detaches one stop time from its trip and from its stop's index.
    pub fn remove_stop_time(&mut self, trip_id: &str, stop_sequence: u32) -> Result<(), GraphError> {
        let times = self
            .stop_times
            .get_mut(trip_id)
            .ok_or_else(|| GraphError::not_found(EntityKind::StopTime, stop_time_key(trip_id, stop_sequence)))?;
        let stop_time = times.remove(&stop_sequence).ok_or_else(|| {
            GraphError::not_found(EntityKind::StopTime, stop_time_key(trip_id, stop_sequence))
        })?;
        if times.is_empty() {
            self.stop_times.remove(trip_id);
        }
        self.relations
            .stop_visits
            .unlink(&stop_time.stop_id, &(trip_id.to_string(), stop_sequence));
        self.touch();
        Ok(())
    }

    pub fn remove_fare_rule(&mut self, rule: &FareRule) -> Result<(), GraphError> {
        let position = self
            .fare_rules
            .iter()
            .position(|existing| existing == rule)
            .ok_or_else(|| GraphError::not_found(EntityKind::FareRule, &rule.fare_id))?;
        self.fare_rules.remove(position);
        self.touch();
        Ok(())
    }

    pub(crate) fn remove_agency_entry(&mut self, agency_id: u32, recursive: bool) -> Result<(), GraphError> {
        if !self.agencies.contains_key(&agency_id) {
            return Err(GraphError::not_found(EntityKind::Agency, agency_id));
        }
        let routes = self.agency_route_ids(agency_id);
        let fares = self.relations.agency_fares.children_vec(&agency_id);
        if !recursive {
            if !routes.is_empty() {
                return Err(GraphError::dependents(
                    EntityKind::Agency,
                    agency_id,
                    EntityKind::Route,
                    routes.len(),
                ));
            }
            if !fares.is_empty() {
                return Err(GraphError::dependents(
                    EntityKind::Agency,
                    agency_id,
                    EntityKind::FareAttribute,
                    fares.len(),
                ));
            }
        }
        for route_id in &routes {
            self.remove_route_entry(route_id, true)?;
        }
        for fare_id in &fares {
            self.remove_fare_attribute_entry(fare_id, true)?;
        }
        self.agencies.take(&agency_id);
        self.touch();
        debug!(
            agency_id,
            routes = routes.len(),
            fare_attributes = fares.len(),
            "removed agency"
        );
        Ok(())
    }

    pub(crate) fn remove_route_entry(&mut self, route_id: &str, recursive: bool) -> Result<(), GraphError> {
        if !self.routes.contains_key(route_id) {
            return Err(GraphError::not_found(EntityKind::Route, route_id));
        }
        let trips = self.relations.route_trips.children_vec(route_id);
        let rules = self
            .fare_rules
            .iter()
            .filter(|rule| rule.route_id.as_deref() == Some(route_id))
            .count();
        if !recursive {
            if !trips.is_empty() {
                return Err(GraphError::dependents(
                    EntityKind::Route,
                    route_id,
                    EntityKind::Trip,
                    trips.len(),
                ));
            }
            if rules > 0 {
                return Err(GraphError::dependents(
                    EntityKind::Route,
                    route_id,
                    EntityKind::FareRule,
                    rules,
                ));
            }
        }
        for trip_id in &trips {
            self.remove_trip_entry(trip_id, true)?;
        }
        self.fare_rules
            .retain(|rule| rule.route_id.as_deref() != Some(route_id));
        if let Some(route) = self.routes.take(route_id) {
            self.unlink_route(&route);
        }
        self.touch();
        debug!(route_id, trips = trips.len(), fare_rules = rules, "removed route");
        Ok(())
    }

    pub(crate) fn remove_service_entry(&mut self, service_id: u32, recursive: bool) -> Result<(), GraphError> {
        if !self.calendar.contains_key(&service_id) {
            return Err(GraphError::not_found(EntityKind::Service, service_id));
        }
        let trips = self.relations.service_trips.children_vec(&service_id);
        if !recursive && !trips.is_empty() {
            return Err(GraphError::dependents(
                EntityKind::Service,
                service_id,
                EntityKind::Trip,
                trips.len(),
            ));
        }
        for trip_id in &trips {
            self.remove_trip_entry(trip_id, true)?;
        }
        self.calendar.take(&service_id);
        self.touch();
        debug!(service_id, trips = trips.len(), "removed service");
        Ok(())
    }

    pub(crate) fn remove_shape_entry(&mut self, shape_id: u32, recursive: bool) -> Result<(), GraphError> {
        if !self.shapes.contains_key(&shape_id) {
            return Err(GraphError::not_found(EntityKind::Shape, shape_id));
        }
        let trips = self.relations.shape_trips.children_vec(&shape_id);
        if !recursive && !trips.is_empty() {
            return Err(GraphError::dependents(
                EntityKind::Shape,
                shape_id,
                EntityKind::Trip,
                trips.len(),
            ));
        }
        for trip_id in &trips {
            self.remove_trip_entry(trip_id, true)?;
        }
        self.shapes.take(&shape_id);
        self.touch();
        debug!(shape_id, trips = trips.len(), "removed shape");
        Ok(())
    }

    pub(crate) fn remove_stop_entry(&mut self, stop_id: u32, recursive: bool) -> Result<(), GraphError> {
        if !self.stops.contains_key(&stop_id) {
            return Err(GraphError::not_found(EntityKind::Stop, stop_id));
        }
        let visits = self.relations.stop_visits.children_vec(&stop_id);
        // A stop naming itself as parent is not its own dependent.
        let children: Vec<u32> = self
            .relations
            .station_children
            .children_vec(&stop_id)
            .into_iter()
            .filter(|child| *child != stop_id)
            .collect();
        if !recursive {
            if !visits.is_empty() {
                return Err(GraphError::dependents(
                    EntityKind::Stop,
                    stop_id,
                    EntityKind::StopTime,
                    visits.len(),
                ));
            }
            if !children.is_empty() {
                return Err(GraphError::dependents(
                    EntityKind::Stop,
                    stop_id,
                    EntityKind::Stop,
                    children.len(),
                ));
            }
        }
        for (trip_id, sequence) in &visits {
            self.remove_stop_time(trip_id, *sequence)?;
        }
        // Dropped before its children so that a parent cycle ends here.
        self.drop_stop(stop_id);
        for child in &children {
            if self.stops.contains_key(child) {
                self.remove_stop_entry(*child, true)?;
            }
        }
        debug!(
            stop_id,
            stop_times = visits.len(),
            child_stops = children.len(),
            "removed stop"
        );
        Ok(())
    }

    /// Unconditionally drops a stop and its index entries.
    fn drop_stop(&mut self, stop_id: u32) {
        if let Some(stop) = self.stops.take(&stop_id) {
            if let Some(parent) = stop.parent_station {
                self.relations
                    .station_children
                    .unlink(&parent, &stop.stop_id);
            }
            self.touch();
        }
    }

    pub(crate) fn remove_trip_entry(&mut self, trip_id: &str, recursive: bool) -> Result<(), GraphError> {
        if !self.trips.contains_key(trip_id) {
            return Err(GraphError::not_found(EntityKind::Trip, trip_id));
        }
        let count = self.trip_stop_time_count(trip_id);
        if !recursive && count > 0 {
            return Err(GraphError::dependents(
                EntityKind::Trip,
                trip_id,
                EntityKind::StopTime,
                count,
            ));
        }
        if let Some(times) = self.stop_times.remove(trip_id) {
            for (sequence, stop_time) in times {
                self.relations
                    .stop_visits
                    .unlink(&stop_time.stop_id, &(trip_id.to_string(), sequence));
            }
        }
        if let Some(trip) = self.trips.take(trip_id) {
            self.unlink_trip(&trip);
        }
        self.touch();
        Ok(())
    }

    pub(crate) fn remove_fare_attribute_entry(
        &mut self,
        fare_id: &str,
        recursive: bool,
    ) -> Result<(), GraphError> {
        let agency_id = match self.fare_attributes.get(fare_id) {
            Some(fare) => fare.agency_id,
            None => return Err(GraphError::not_found(EntityKind::FareAttribute, fare_id)),
        };
        let rules = self.fare_rules_of(fare_id).count();
        if !recursive && rules > 0 {
            return Err(GraphError::dependents(
                EntityKind::FareAttribute,
                fare_id,
                EntityKind::FareRule,
                rules,
            ));
        }
        self.fare_rules.retain(|rule| rule.fare_id != fare_id);
        self.fare_attributes.take(fare_id);
        if let Some(agency_id) = agency_id {
            self.relations
                .agency_fares
                .unlink(&agency_id, &fare_id.to_string());
        }
        self.touch();
        Ok(())
    }

    /// Removes every entity left without dependents, in dependency order, so
    /// that a second call removes nothing.
    pub fn clean(&mut self) -> CleanSummary {
        let started = Instant::now();
        let summary = CleanSummary {
            trips: self.sweep_trips(),
            stops: self.sweep_stops(),
            shapes: self.sweep_shapes(),
            services: self.sweep_calendar(),
            routes: self.sweep_routes(),
            agencies: self.sweep_agencies(),
            fare_rules: self.sweep_fare_rules(),
            fare_attributes: self.sweep_fare_attributes(),
        };
        info!(
            removed = summary.total(),
            "clean took {:?}",
            started.elapsed()
        );
        summary
    }

    /// Runs the sweep of a single collection.
    pub fn clean_collection<E: GraphEntity>(&mut self) -> usize {
        E::sweep(self)
    }

    pub(crate) fn sweep_trips(&mut self) -> usize {
        let orphans = self
            .trips
            .keys_where(|trip| !self.stop_times.contains_key(&trip.trip_id));
        for trip_id in &orphans {
            if let Some(trip) = self.trips.take(trip_id) {
                self.unlink_trip(&trip);
            }
        }
        self.note_sweep(EntityKind::Trip, orphans.len())
    }

    /// Stops without stop times go, unless a kept stop names them as its
    /// parent station.
    pub(crate) fn sweep_stops(&mut self) -> usize {
        let mut kept: BTreeSet<u32> = BTreeSet::new();
        for stop in self.stops.iter() {
            if !self.relations.stop_visits.has_children(&stop.stop_id) {
                continue;
            }
            let mut current = Some(stop.stop_id);
            while let Some(stop_id) = current {
                if !kept.insert(stop_id) {
                    break;
                }
                current = self.stops.get(&stop_id).and_then(|s| s.parent_station);
            }
        }
        let orphans = self.stops.keys_where(|stop| !kept.contains(&stop.stop_id));
        for stop_id in &orphans {
            self.drop_stop(*stop_id);
        }
        self.note_sweep(EntityKind::Stop, orphans.len())
    }

    pub(crate) fn sweep_shapes(&mut self) -> usize {
        let orphans = self
            .shapes
            .keys_where(|shape| !self.relations.shape_trips.has_children(&shape.shape_id));
        for shape_id in &orphans {
            self.shapes.take(shape_id);
        }
        self.note_sweep(EntityKind::Shape, orphans.len())
    }

    pub(crate) fn sweep_calendar(&mut self) -> usize {
        let orphans = self.calendar.keys_where(|service| {
            !self
                .relations
                .service_trips
                .has_children(&service.service_id)
        });
        for service_id in &orphans {
            self.calendar.take(service_id);
        }
        self.note_sweep(EntityKind::Service, orphans.len())
    }

    /// A swept route takes the fare rules naming it along.
    pub(crate) fn sweep_routes(&mut self) -> usize {
        let orphans = self.routes.keys_where(|route| {
            !self
                .relations
                .route_trips
                .has_children(route.route_id.as_str())
        });
        for route_id in &orphans {
            self.fare_rules
                .retain(|rule| rule.route_id.as_ref() != Some(route_id));
            if let Some(route) = self.routes.take(route_id) {
                self.unlink_route(&route);
            }
        }
        self.note_sweep(EntityKind::Route, orphans.len())
    }

    /// A swept agency takes the fare attributes naming it, and their rules,
    /// along.
    pub(crate) fn sweep_agencies(&mut self) -> usize {
        let orphans = self
            .agencies
            .keys_where(|agency| self.agency_lines(agency.agency_id).next().is_none());
        for agency_id in &orphans {
            for fare_id in self.relations.agency_fares.children_vec(agency_id) {
                self.fare_rules.retain(|rule| rule.fare_id != fare_id);
                self.fare_attributes.take(&fare_id);
                self.relations.agency_fares.unlink(agency_id, &fare_id);
            }
            self.agencies.take(agency_id);
        }
        self.note_sweep(EntityKind::Agency, orphans.len())
    }

    /// Fare rules naming a zone no stop carries.
    pub fn sweep_fare_rules(&mut self) -> usize {
        let zones = self.zone_ids();
        let before = self.fare_rules.len();
        self.fare_rules
            .retain(|rule| rule.zone_ids().all(|zone| zones.contains(zone)));
        let removed = before - self.fare_rules.len();
        self.note_sweep(EntityKind::FareRule, removed)
    }

    pub(crate) fn sweep_fare_attributes(&mut self) -> usize {
        let orphans = self
            .fare_attributes
            .keys_where(|fare| self.fare_rules_of(&fare.fare_id).next().is_none());
        for fare_id in &orphans {
            if let Some(fare) = self.fare_attributes.take(fare_id) {
                if let Some(agency_id) = fare.agency_id {
                    self.relations.agency_fares.unlink(&agency_id, fare_id);
                }
            }
        }
        self.note_sweep(EntityKind::FareAttribute, orphans.len())
    }

    fn note_sweep(&mut self, kind: EntityKind, removed: usize) -> usize {
        if removed > 0 {
            self.touch();
            debug!(%kind, removed, "swept orphans");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use gtfs_graph_model::LocationType;

    #[test]
    fn non_recursive_stop_removal_reports_dependents() {
        let mut dataset = fixtures::full_dataset();
        let err = dataset
            .remove_stop(10001, RemoveOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::DependentsExist {
                kind: EntityKind::Stop,
                dependent: EntityKind::StopTime,
                ..
            }
        ));
        assert!(dataset.stops().contains_key(&10001));
        assert_eq!(dataset.trip_stop_time_count("1001_1"), 2);
    }

    #[test]
    fn recursive_stop_removal_detaches_stop_times() {
        let mut dataset = fixtures::full_dataset();
        dataset
            .remove_stop(10001, RemoveOptions::recursive())
            .unwrap();
        assert!(!dataset.stops().contains_key(&10001));
        let remaining: Vec<u32> = dataset
            .stop_times("1001_1")
            .map(|stop_time| stop_time.stop_id)
            .collect();
        assert_eq!(remaining, vec![20000]);
        assert_eq!(dataset.stop_times_at(10001).count(), 0);
    }

    #[test]
    fn station_with_children_needs_recursive_removal() {
        let mut dataset = fixtures::full_dataset();
        let err = dataset
            .remove_stop(10000, RemoveOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::DependentsExist {
                dependent: EntityKind::Stop,
                ..
            }
        ));
        dataset
            .remove_stop(10000, RemoveOptions::recursive())
            .unwrap();
        assert!(!dataset.stops().contains_key(&10001));
    }

    #[test]
    fn recursive_agency_removal_cascades() {
        let mut dataset = fixtures::full_dataset();
        dataset
            .remove_agency(1, RemoveOptions::recursive())
            .unwrap();
        assert!(dataset.agency_lines(1).next().is_none());
        assert!(dataset.routes().iter().all(|route| route.agency_id != 1));
        assert!(dataset
            .trips()
            .iter()
            .all(|trip| dataset.routes().contains_key(trip.route_id.as_str())));
        assert!(dataset.stop_times("1001_1").next().is_none());
        assert!(dataset
            .fare_attributes()
            .iter()
            .all(|fare| fare.agency_id != Some(1)));
        assert!(dataset
            .fare_rules()
            .iter()
            .all(|rule| dataset.fare_attributes().contains_key(rule.fare_id.as_str())));
    }

    #[test]
    fn non_recursive_route_removal_is_blocked_by_trips() {
        let mut dataset = fixtures::full_dataset();
        assert!(matches!(
            dataset.remove_route("1001", RemoveOptions::default()),
            Err(GraphError::DependentsExist {
                dependent: EntityKind::Trip,
                ..
            })
        ));
    }

    #[test]
    fn removing_last_route_drops_line() {
        let mut dataset = fixtures::full_dataset();
        dataset
            .remove_route("30001", RemoveOptions::recursive())
            .unwrap();
        assert!(dataset.line(30, "301").is_none());
        assert!(dataset.agencies().contains_key(&30));
    }

    #[test]
    fn removal_with_clean_sweeps_orphans() {
        let mut dataset = fixtures::full_dataset();
        dataset
            .remove_route("30001", RemoveOptions::recursive().with_clean())
            .unwrap();
        assert!(!dataset.agencies().contains_key(&30));
    }

    #[test]
    fn default_removal_leaves_orphans_for_an_explicit_clean() {
        let mut dataset = fixtures::full_dataset();
        dataset
            .remove_trip("30001_1", RemoveOptions::recursive())
            .unwrap();
        assert!(dataset.routes().contains_key("30001"));
        assert!(dataset.stops().contains_key(&30000));
        assert!(!RemoveOptions::default().clean_after);

        let summary = dataset.clean();
        assert_eq!(summary.routes, 1);
        assert!(!dataset.stops().contains_key(&30000));
    }

    #[test]
    fn unknown_key_is_not_found() {
        let mut dataset = fixtures::full_dataset();
        assert!(matches!(
            dataset.remove_trip("missing", RemoveOptions::recursive()),
            Err(GraphError::NotFound {
                kind: EntityKind::Trip,
                ..
            })
        ));
    }

    #[test]
    fn fare_attribute_removal_takes_rules() {
        let mut dataset = fixtures::full_dataset();
        assert!(dataset
            .remove_fare_attribute("1", RemoveOptions::default())
            .is_err());
        dataset
            .remove_fare_attribute("1", RemoveOptions::recursive())
            .unwrap();
        assert_eq!(dataset.fare_rules_of("1").count(), 0);
    }

    #[test]
    fn clean_is_idempotent() {
        let mut dataset = fixtures::full_dataset();
        dataset
            .remove_stop(20000, RemoveOptions::recursive())
            .unwrap();
        let first = dataset.clean();
        assert!(first.total() > 0);
        let second = dataset.clean();
        assert_eq!(second, CleanSummary::default());
    }

    #[test]
    fn clean_keeps_parent_station_of_served_platform() {
        let mut dataset = fixtures::full_dataset();
        dataset.clean();
        assert!(dataset.stops().contains_key(&10000));
        assert!(dataset.stops().contains_key(&10001));
    }

    #[test]
    fn clean_removes_trip_without_stop_times() {
        let mut dataset = fixtures::full_dataset();
        dataset.add_trip(&fixtures::trip_row("1001_9", "1001", 1)).unwrap();
        let summary = dataset.clean();
        assert_eq!(summary.trips, 1);
        assert!(!dataset.trips().contains_key("1001_9"));
    }

    fn stop_with_parent(stop_id: u32, parent_station: u32) -> Stop {
        Stop {
            stop_id,
            stop_name: format!("Stop {}", stop_id),
            location_type: LocationType::Station,
            parent_station: Some(parent_station),
            ..Default::default()
        }
    }

    #[test]
    fn self_parent_stop_is_removed_without_recursing_into_itself() {
        let mut dataset = fixtures::full_dataset();
        dataset.insert(stop_with_parent(5, 5)).unwrap();
        dataset.remove_stop(5, RemoveOptions::default()).unwrap();
        assert!(!dataset.stops().contains_key(&5));

        dataset.insert(stop_with_parent(5, 5)).unwrap();
        dataset.remove_stop(5, RemoveOptions::recursive()).unwrap();
        assert!(!dataset.stops().contains_key(&5));
        assert_eq!(dataset.child_stops(5).count(), 0);
    }

    #[test]
    fn parent_cycle_is_removed_as_a_whole() {
        let mut dataset = fixtures::full_dataset();
        dataset.insert(stop_with_parent(6, 7)).unwrap();
        dataset.insert(stop_with_parent(7, 6)).unwrap();
        assert!(matches!(
            dataset.remove_stop(6, RemoveOptions::default()),
            Err(GraphError::DependentsExist {
                dependent: EntityKind::Stop,
                ..
            })
        ));
        dataset.remove_stop(6, RemoveOptions::recursive()).unwrap();
        assert!(!dataset.stops().contains_key(&6));
        assert!(!dataset.stops().contains_key(&7));
        assert!(dataset.stops().contains_key(&10001));
    }

    #[test]
    fn clean_drops_an_unserved_parent_cycle() {
        let mut dataset = fixtures::full_dataset();
        dataset.insert(stop_with_parent(6, 7)).unwrap();
        dataset.insert(stop_with_parent(7, 6)).unwrap();
        dataset.clean();
        assert!(!dataset.stops().contains_key(&6));
        assert!(!dataset.stops().contains_key(&7));
        assert_eq!(dataset.clean().total(), 0);
    }
}
