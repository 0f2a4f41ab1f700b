use std::collections::{BTreeMap, BTreeSet};

use gtfs_graph_model::{
    Agency, EntityKind, FareAttribute, FareRule, RawRow, Route, RowCodec, Service, Shape,
    ShapePoint, Stop, StopTime, Trip,
};

use crate::collection::EntityCollection;
use crate::entity::GraphEntity;
use crate::relations::OneToMany;
use crate::feed::GTFS_FILE_NAMES;
use crate::translations::Translator;
use crate::GraphError;

/// Whether the graph has been checked since it last changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationState {
    Dirty,
    Validated,
}

/// What to do when a row cannot be built or references something missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnError {
    #[default]
    Raise,
    SkipRow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome<K> {
    Added(K),
    /// The row was rejected by the caller's predicate.
    Filtered,
    /// The row failed and `OnError::SkipRow` was in effect.
    Skipped,
}

impl<K> AddOutcome<K> {
    pub fn key(&self) -> Option<&K> {
        match self {
            AddOutcome::Added(key) => Some(key),
            _ => None,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, AddOutcome::Added(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineKey {
    pub agency_id: u32,
    pub short_name: String,
}

/// Routes of one agency published under the same short name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    agency_id: u32,
    short_name: String,
    routes: BTreeSet<String>,
}

impl Line {
    pub fn agency_id(&self) -> u32 {
        self.agency_id
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn key(&self) -> LineKey {
        LineKey {
            agency_id: self.agency_id,
            short_name: self.short_name.clone(),
        }
    }

    pub fn route_ids(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(String::as_str)
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

/// Derived reverse indexes. Never compared, never written.
#[derive(Debug, Clone, Default)]
pub(crate) struct Relations {
    pub(crate) route_trips: OneToMany<String, String>,
    pub(crate) service_trips: OneToMany<u32, String>,
    pub(crate) shape_trips: OneToMany<u32, String>,
    pub(crate) stop_visits: OneToMany<u32, (String, u32)>,
    pub(crate) station_children: OneToMany<u32, u32>,
    pub(crate) agency_fares: OneToMany<u32, String>,
}

/// The schedule graph: every collection, the links between them and the
/// side tables carried through load and save.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub(crate) agencies: EntityCollection<Agency>,
    pub(crate) lines: BTreeMap<LineKey, Line>,
    pub(crate) routes: EntityCollection<Route>,
    pub(crate) shapes: EntityCollection<Shape>,
    pub(crate) calendar: EntityCollection<Service>,
    pub(crate) trips: EntityCollection<Trip>,
    pub(crate) stop_times: BTreeMap<String, BTreeMap<u32, StopTime>>,
    pub(crate) stops: EntityCollection<Stop>,
    pub(crate) fare_attributes: EntityCollection<FareAttribute>,
    pub(crate) fare_rules: Vec<FareRule>,
    pub(crate) translations: Translator,
    pub(crate) unknown_files: BTreeMap<String, Vec<u8>>,
    pub(crate) relations: Relations,
    state: ValidationState,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            agencies: EntityCollection::new(),
            lines: BTreeMap::new(),
            routes: EntityCollection::new(),
            shapes: EntityCollection::new(),
            calendar: EntityCollection::new(),
            trips: EntityCollection::new(),
            stop_times: BTreeMap::new(),
            stops: EntityCollection::new(),
            fare_attributes: EntityCollection::new(),
            fare_rules: Vec::new(),
            translations: Translator::default(),
            unknown_files: BTreeMap::new(),
            relations: Relations::default(),
            state: ValidationState::Validated,
        }
    }
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ValidationState {
        self.state
    }

    pub fn is_validated(&self) -> bool {
        self.state == ValidationState::Validated
    }

    pub(crate) fn touch(&mut self) {
        self.state = ValidationState::Dirty;
    }

    pub(crate) fn mark_validated(&mut self) {
        self.state = ValidationState::Validated;
    }

    pub fn is_empty(&self) -> bool {
        self.agencies.is_empty()
            && self.routes.is_empty()
            && self.shapes.is_empty()
            && self.calendar.is_empty()
            && self.trips.is_empty()
            && self.stops.is_empty()
            && self.fare_attributes.is_empty()
            && self.fare_rules.is_empty()
            && !self.translations.has_data()
            && self.unknown_files.is_empty()
    }

    pub fn agencies(&self) -> &EntityCollection<Agency> {
        &self.agencies
    }

    pub fn routes(&self) -> &EntityCollection<Route> {
        &self.routes
    }

    pub fn shapes(&self) -> &EntityCollection<Shape> {
        &self.shapes
    }

    pub fn calendar(&self) -> &EntityCollection<Service> {
        &self.calendar
    }

    pub fn trips(&self) -> &EntityCollection<Trip> {
        &self.trips
    }

    pub fn stops(&self) -> &EntityCollection<Stop> {
        &self.stops
    }

    pub fn fare_attributes(&self) -> &EntityCollection<FareAttribute> {
        &self.fare_attributes
    }

    pub fn fare_rules(&self) -> &[FareRule] {
        &self.fare_rules
    }

    pub fn translations(&self) -> &Translator {
        &self.translations
    }

    pub fn translations_mut(&mut self) -> &mut Translator {
        &mut self.translations
    }

    /// Sections read from the package that no collection models, kept verbatim.
    pub fn unknown_files(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.unknown_files
    }

    /// Keeps `contents` to be written back verbatim on save. Names of
    /// modelled files are refused, since saving serializes those from the
    /// collections.
    pub fn insert_unknown_file(
        &mut self,
        name: impl Into<String>,
        contents: Vec<u8>,
    ) -> Result<(), GraphError> {
        let name = name.into();
        if GTFS_FILE_NAMES.contains(&name.as_str()) {
            return Err(GraphError::ReservedFileName(name));
        }
        self.unknown_files.insert(name, contents);
        Ok(())
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.values()
    }

    pub fn line(&self, agency_id: u32, short_name: &str) -> Option<&Line> {
        self.lines.get(&LineKey {
            agency_id,
            short_name: short_name.to_string(),
        })
    }

    pub fn agency_lines(&self, agency_id: u32) -> impl Iterator<Item = &Line> {
        self.lines
            .values()
            .filter(move |line| line.agency_id == agency_id)
    }

    pub(crate) fn agency_route_ids(&self, agency_id: u32) -> Vec<String> {
        self.agency_lines(agency_id)
            .flat_map(|line| line.routes.iter().cloned())
            .collect()
    }

    /// Stop times of a trip in sequence order.
    pub fn stop_times(&self, trip_id: &str) -> impl Iterator<Item = &StopTime> {
        self.stop_times.get(trip_id).into_iter().flat_map(BTreeMap::values)
    }

    pub fn stop_time(&self, trip_id: &str, stop_sequence: u32) -> Option<&StopTime> {
        self.stop_times
            .get(trip_id)
            .and_then(|times| times.get(&stop_sequence))
    }

    pub fn stop_time_count(&self) -> usize {
        self.stop_times.values().map(BTreeMap::len).sum()
    }

    pub fn trip_stop_time_count(&self, trip_id: &str) -> usize {
        self.stop_times.get(trip_id).map_or(0, BTreeMap::len)
    }

    /// Every stop time served at `stop_id`, ordered by trip then sequence.
    pub fn stop_times_at(&self, stop_id: u32) -> impl Iterator<Item = &StopTime> {
        self.relations
            .stop_visits
            .children(&stop_id)
            .filter_map(|(trip_id, sequence)| self.stop_time(trip_id, *sequence))
    }

    pub fn trips_of_route<'a>(&'a self, route_id: &str) -> impl Iterator<Item = &'a Trip> + 'a {
        self.relations
            .route_trips
            .children(route_id)
            .filter_map(|trip_id| self.trips.get(trip_id))
    }

    pub fn trips_of_service(&self, service_id: u32) -> impl Iterator<Item = &Trip> {
        self.relations
            .service_trips
            .children(&service_id)
            .filter_map(|trip_id| self.trips.get(trip_id))
    }

    pub fn trips_of_shape(&self, shape_id: u32) -> impl Iterator<Item = &Trip> {
        self.relations
            .shape_trips
            .children(&shape_id)
            .filter_map(|trip_id| self.trips.get(trip_id))
    }

    pub fn child_stops(&self, station_id: u32) -> impl Iterator<Item = &Stop> {
        self.relations
            .station_children
            .children(&station_id)
            .filter_map(|stop_id| self.stops.get(stop_id))
    }

    pub fn fare_rules_of<'a>(&'a self, fare_id: &'a str) -> impl Iterator<Item = &'a FareRule> {
        self.fare_rules
            .iter()
            .filter(move |rule| rule.fare_id == fare_id)
    }

    /// Stops visited by a trip in sequence order.
    pub fn trip_stops(&self, trip_id: &str) -> Vec<&Stop> {
        self.stop_times(trip_id)
            .filter_map(|stop_time| self.stops.get(&stop_time.stop_id))
            .collect()
    }

    pub fn first_stop(&self, trip_id: &str) -> Option<&Stop> {
        self.stop_times(trip_id)
            .next()
            .and_then(|stop_time| self.stops.get(&stop_time.stop_id))
    }

    pub fn last_stop(&self, trip_id: &str) -> Option<&Stop> {
        self.stop_times(trip_id)
            .last()
            .and_then(|stop_time| self.stops.get(&stop_time.stop_id))
    }

    /// Distinct stops served by any trip of a route.
    pub fn route_stops(&self, route_id: &str) -> Vec<&Stop> {
        let stop_ids: BTreeSet<u32> = self
            .relations
            .route_trips
            .children(route_id)
            .flat_map(|trip_id| self.stop_times(trip_id))
            .map(|stop_time| stop_time.stop_id)
            .collect();
        stop_ids
            .iter()
            .filter_map(|stop_id| self.stops.get(stop_id))
            .collect()
    }

    /// Zone identifiers carried by at least one stop.
    pub fn zone_ids(&self) -> BTreeSet<String> {
        self.stops
            .iter()
            .filter_map(|stop| stop.zone_id.clone())
            .collect()
    }

    /// Adds an already built entity after resolving its references.
    pub fn insert<E: GraphEntity>(&mut self, entity: E) -> Result<E::Key, GraphError> {
        entity.resolve(self)?;
        if E::collection(self).contains_key(&entity.key()) {
            return Err(GraphError::duplicate(E::KIND, entity.key()));
        }
        entity.link(self);
        let key = E::collection_mut(self).insert(entity)?;
        self.touch();
        Ok(key)
    }

    /// Builds an entity from `row` and adds it.
    ///
    /// A `predicate` returning false discards the entity without error.
    /// Construction and resolution failures are returned, or skipped under
    /// `OnError::SkipRow`. A duplicate key is always an error.
    pub fn add<E: GraphEntity + RowCodec>(
        &mut self,
        row: &RawRow,
        on_error: OnError,
        predicate: Option<&dyn Fn(&E) -> bool>,
    ) -> Result<AddOutcome<E::Key>, GraphError> {
        let entity = match E::from_row(row) {
            Ok(entity) => entity,
            Err(source) => {
                return skip_or_raise(
                    GraphError::Field {
                        kind: E::KIND,
                        source,
                    },
                    on_error,
                )
            }
        };
        if let Some(predicate) = predicate {
            if !predicate(&entity) {
                return Ok(AddOutcome::Filtered);
            }
        }
        if let Err(err) = entity.resolve(self) {
            return skip_or_raise(err, on_error);
        }
        self.insert(entity).map(AddOutcome::Added)
    }

    fn add_strict<E: GraphEntity + RowCodec>(&mut self, row: &RawRow) -> Result<E::Key, GraphError> {
        let entity = E::from_row(row).map_err(|source| GraphError::Field {
            kind: E::KIND,
            source,
        })?;
        self.insert(entity)
    }

    pub fn add_agency(&mut self, row: &RawRow) -> Result<u32, GraphError> {
        self.add_strict::<Agency>(row)
    }

    pub fn add_route(&mut self, row: &RawRow) -> Result<String, GraphError> {
        self.add_strict::<Route>(row)
    }

    pub fn add_service(&mut self, row: &RawRow) -> Result<u32, GraphError> {
        self.add_strict::<Service>(row)
    }

    pub fn add_trip(&mut self, row: &RawRow) -> Result<String, GraphError> {
        self.add_strict::<Trip>(row)
    }

    pub fn add_stop(&mut self, row: &RawRow) -> Result<u32, GraphError> {
        self.add_strict::<Stop>(row)
    }

    pub fn add_fare_attribute(&mut self, row: &RawRow) -> Result<String, GraphError> {
        self.add_strict::<FareAttribute>(row)
    }

    /// Adds one shape row, creating the shape on its first point.
    pub fn add_shape_point(&mut self, row: &RawRow) -> Result<(u32, u32), GraphError> {
        let point = ShapePoint::from_row(row).map_err(|source| GraphError::Field {
            kind: EntityKind::Shape,
            source,
        })?;
        self.insert_shape_point(point)
    }

    pub fn add_shape_point_with(
        &mut self,
        row: &RawRow,
        on_error: OnError,
    ) -> Result<AddOutcome<(u32, u32)>, GraphError> {
        match ShapePoint::from_row(row) {
            Ok(point) => self.insert_shape_point(point).map(AddOutcome::Added),
            Err(source) => skip_or_raise(
                GraphError::Field {
                    kind: EntityKind::Shape,
                    source,
                },
                on_error,
            ),
        }
    }

    pub fn insert_shape_point(&mut self, point: ShapePoint) -> Result<(u32, u32), GraphError> {
        let key = (point.shape_id, point.shape_pt_sequence);
        if self.shapes.get(&point.shape_id).is_none() {
            self.shapes.insert(Shape::new(point.shape_id))?;
        }
        let shape = self
            .shapes
            .get_mut(&point.shape_id)
            .ok_or_else(|| GraphError::not_found(EntityKind::Shape, key.0))?;
        shape.insert_point(point).map_err(|point| {
            GraphError::duplicate(
                EntityKind::Shape,
                format!("{}#{}", point.shape_id, point.shape_pt_sequence),
            )
        })?;
        self.touch();
        Ok(key)
    }

    pub fn add_stop_time(&mut self, row: &RawRow) -> Result<(String, u32), GraphError> {
        let stop_time = StopTime::from_row(row).map_err(|source| GraphError::Field {
            kind: EntityKind::StopTime,
            source,
        })?;
        self.insert_stop_time(stop_time)
    }

    pub fn add_stop_time_with(
        &mut self,
        row: &RawRow,
        on_error: OnError,
    ) -> Result<AddOutcome<(String, u32)>, GraphError> {
        let stop_time = match StopTime::from_row(row) {
            Ok(stop_time) => stop_time,
            Err(source) => {
                return skip_or_raise(
                    GraphError::Field {
                        kind: EntityKind::StopTime,
                        source,
                    },
                    on_error,
                )
            }
        };
        if let Err(err) = self.resolve_stop_time(&stop_time) {
            return skip_or_raise(err, on_error);
        }
        self.insert_stop_time(stop_time).map(AddOutcome::Added)
    }

    pub(crate) fn resolve_stop_time(&self, stop_time: &StopTime) -> Result<(), GraphError> {
        let key = stop_time_key(&stop_time.trip_id, stop_time.stop_sequence);
        if !self.trips.contains_key(stop_time.trip_id.as_str()) {
            return Err(GraphError::unresolved(
                EntityKind::StopTime,
                &key,
                EntityKind::Trip,
                &stop_time.trip_id,
            ));
        }
        if !self.stops.contains_key(&stop_time.stop_id) {
            return Err(GraphError::unresolved(
                EntityKind::StopTime,
                &key,
                EntityKind::Stop,
                stop_time.stop_id,
            ));
        }
        Ok(())
    }

    /// Attaches a stop time to its trip and indexes it under its stop.
    pub fn insert_stop_time(&mut self, stop_time: StopTime) -> Result<(String, u32), GraphError> {
        self.resolve_stop_time(&stop_time)?;
        let trip_id = stop_time.trip_id.clone();
        let sequence = stop_time.stop_sequence;
        if self.stop_time(&trip_id, sequence).is_some() {
            return Err(GraphError::duplicate(
                EntityKind::StopTime,
                stop_time_key(&trip_id, sequence),
            ));
        }
        self.relations
            .stop_visits
            .link(stop_time.stop_id, (trip_id.clone(), sequence));
        self.stop_times
            .entry(trip_id.clone())
            .or_default()
            .insert(sequence, stop_time);
        self.touch();
        Ok((trip_id, sequence))
    }

    pub fn add_fare_rule(&mut self, row: &RawRow) -> Result<(), GraphError> {
        let rule = FareRule::from_row(row).map_err(|source| GraphError::Field {
            kind: EntityKind::FareRule,
            source,
        })?;
        self.insert_fare_rule(rule)
    }

    pub fn add_fare_rule_with(
        &mut self,
        row: &RawRow,
        on_error: OnError,
        predicate: Option<&dyn Fn(&FareRule) -> bool>,
    ) -> Result<AddOutcome<()>, GraphError> {
        let rule = match FareRule::from_row(row) {
            Ok(rule) => rule,
            Err(source) => {
                return skip_or_raise(
                    GraphError::Field {
                        kind: EntityKind::FareRule,
                        source,
                    },
                    on_error,
                )
            }
        };
        if let Some(predicate) = predicate {
            if !predicate(&rule) {
                return Ok(AddOutcome::Filtered);
            }
        }
        if let Err(err) = self.resolve_fare_rule(&rule) {
            return skip_or_raise(err, on_error);
        }
        self.insert_fare_rule(rule).map(AddOutcome::Added)
    }

    pub(crate) fn resolve_fare_rule(&self, rule: &FareRule) -> Result<(), GraphError> {
        if !self.fare_attributes.contains_key(rule.fare_id.as_str()) {
            return Err(GraphError::unresolved(
                EntityKind::FareRule,
                &rule.fare_id,
                EntityKind::FareAttribute,
                &rule.fare_id,
            ));
        }
        if let Some(route_id) = &rule.route_id {
            if !self.routes.contains_key(route_id.as_str()) {
                return Err(GraphError::unresolved(
                    EntityKind::FareRule,
                    &rule.fare_id,
                    EntityKind::Route,
                    route_id,
                ));
            }
        }
        Ok(())
    }

    /// Adds a fare rule. A rule equal to one already present is not added
    /// twice.
    pub fn insert_fare_rule(&mut self, rule: FareRule) -> Result<(), GraphError> {
        self.resolve_fare_rule(&rule)?;
        if !self.fare_rules.contains(&rule) {
            self.fare_rules.push(rule);
            self.touch();
        }
        Ok(())
    }

    pub(crate) fn link_route(&mut self, route: &Route) {
        let key = LineKey {
            agency_id: route.agency_id,
            short_name: route.route_short_name.clone(),
        };
        self.lines
            .entry(key)
            .or_insert_with(|| Line {
                agency_id: route.agency_id,
                short_name: route.route_short_name.clone(),
                routes: BTreeSet::new(),
            })
            .routes
            .insert(route.route_id.clone());
    }

    pub(crate) fn unlink_route(&mut self, route: &Route) {
        let key = LineKey {
            agency_id: route.agency_id,
            short_name: route.route_short_name.clone(),
        };
        if let Some(line) = self.lines.get_mut(&key) {
            line.routes.remove(&route.route_id);
            if line.routes.is_empty() {
                self.lines.remove(&key);
            }
        }
    }

    pub(crate) fn link_trip(&mut self, trip: &Trip) {
        let relations = &mut self.relations;
        relations
            .route_trips
            .link(trip.route_id.clone(), trip.trip_id.clone());
        relations
            .service_trips
            .link(trip.service_id, trip.trip_id.clone());
        if let Some(shape_id) = trip.shape_id {
            relations.shape_trips.link(shape_id, trip.trip_id.clone());
        }
    }

    pub(crate) fn unlink_trip(&mut self, trip: &Trip) {
        let relations = &mut self.relations;
        relations
            .route_trips
            .unlink(trip.route_id.as_str(), &trip.trip_id);
        relations
            .service_trips
            .unlink(&trip.service_id, &trip.trip_id);
        if let Some(shape_id) = trip.shape_id {
            relations.shape_trips.unlink(&shape_id, &trip.trip_id);
        }
    }
}

pub(crate) fn stop_time_key(trip_id: &str, stop_sequence: u32) -> String {
    format!("{}#{}", trip_id, stop_sequence)
}

fn skip_or_raise<K>(err: GraphError, on_error: OnError) -> Result<AddOutcome<K>, GraphError> {
    if on_error == OnError::SkipRow && err.is_row_error() {
        Ok(AddOutcome::Skipped)
    } else {
        Err(err)
    }
}

/// Structural equality: every collection pairwise equal and every trip's
/// stop times equal position by position. Derived indexes, translations and
/// preserved files are not compared.
impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.agencies == other.agencies
            && self.routes == other.routes
            && self.shapes == other.shapes
            && self.calendar == other.calendar
            && self.trips == other.trips
            && self.stops == other.stops
            && self.fare_attributes == other.fare_attributes
            && self.fare_rules == other.fare_rules
            && self.stop_times == other.stop_times
    }
}
