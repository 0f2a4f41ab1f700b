use std::path::Path;
use std::time::Instant;

use gtfs_graph_model::{
    Agency, FareAttribute, FareRule, RawRow, Route, RowCodec, Service, ShapePoint, Stop, StopTime,
    Trip,
};
use tracing::{debug, info};

use crate::csv_reader::{read_rows, write_rows};
use crate::input::{Compression, DirectoryFeed, FeedSink, FeedSource, ZipFeedReader, ZipFeedWriter};
use crate::subset::Selection;
use crate::{AddOutcome, Dataset, GraphError, OnError};

pub const AGENCY_FILE: &str = "agency.txt";
pub const ROUTES_FILE: &str = "routes.txt";
pub const SHAPES_FILE: &str = "shapes.txt";
pub const CALENDAR_FILE: &str = "calendar.txt";
pub const TRIPS_FILE: &str = "trips.txt";
pub const STOPS_FILE: &str = "stops.txt";
pub const STOP_TIMES_FILE: &str = "stop_times.txt";
pub const TRANSLATIONS_FILE: &str = "translations.txt";
pub const FARE_ATTRIBUTES_FILE: &str = "fare_attributes.txt";
pub const FARE_RULES_FILE: &str = "fare_rules.txt";

pub const REQUIRED_FILES: &[&str] = &[
    AGENCY_FILE,
    ROUTES_FILE,
    SHAPES_FILE,
    CALENDAR_FILE,
    TRIPS_FILE,
    STOPS_FILE,
    STOP_TIMES_FILE,
];

/// Every section the dataset models, in load and save order.
pub const GTFS_FILE_NAMES: &[&str] = &[
    AGENCY_FILE,
    ROUTES_FILE,
    SHAPES_FILE,
    CALENDAR_FILE,
    TRIPS_FILE,
    STOPS_FILE,
    STOP_TIMES_FILE,
    TRANSLATIONS_FILE,
    FARE_ATTRIBUTES_FILE,
    FARE_RULES_FILE,
];

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Validate the whole graph once every section is in.
    pub validate: bool,
    /// Keep only what the selection reaches, skipping rows that point at
    /// excluded entities.
    pub partial: Option<Selection>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            validate: true,
            partial: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    pub validate: bool,
    pub compression: Compression,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            validate: true,
            compression: Compression::default(),
        }
    }
}

#[derive(Debug, Default)]
struct SectionStats {
    added: usize,
    filtered: usize,
    skipped: usize,
}

impl SectionStats {
    fn record<K>(&mut self, outcome: AddOutcome<K>) {
        match outcome {
            AddOutcome::Added(_) => self.added += 1,
            AddOutcome::Filtered => self.filtered += 1,
            AddOutcome::Skipped => self.skipped += 1,
        }
    }

    fn log(&self, file: &str) {
        debug!(
            file,
            added = self.added,
            filtered = self.filtered,
            skipped = self.skipped,
            "loaded section"
        );
    }
}

fn required_rows<S: FeedSource + ?Sized>(source: &mut S, file: &str) -> Result<Vec<RawRow>, GraphError> {
    match source.read_entry(file)? {
        Some(data) => read_rows(file, &data),
        None => Err(GraphError::MissingFile(file.to_string())),
    }
}

impl Dataset {
    /// Builds a dataset from a package.
    pub fn load<S: FeedSource + ?Sized>(source: &mut S, options: &LoadOptions) -> Result<Self, GraphError> {
        let mut dataset = Dataset::new();
        dataset.load_into(source, options)?;
        Ok(dataset)
    }

    /// Loads the part of a package reachable from `selection`.
    pub fn load_partial<S: FeedSource + ?Sized>(
        source: &mut S,
        selection: Selection,
    ) -> Result<Self, GraphError> {
        let options = LoadOptions {
            partial: Some(selection),
            ..LoadOptions::default()
        };
        Self::load(source, &options)
    }

    /// Loads a zip archive, or an unpacked directory, from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let path = path.as_ref();
        let options = LoadOptions::default();
        if path.is_dir() {
            Self::load(&mut DirectoryFeed::new(path), &options)
        } else {
            Self::load(&mut ZipFeedReader::open(path)?, &options)
        }
    }

    /// Reads every section of `source` into this dataset, which must be
    /// empty. A failed load leaves the dataset in an unspecified state.
    pub fn load_into<S: FeedSource + ?Sized>(
        &mut self,
        source: &mut S,
        options: &LoadOptions,
    ) -> Result<(), GraphError> {
        if !self.is_empty() {
            return Err(GraphError::AlreadyLoaded);
        }
        let started = Instant::now();
        let selection = options.partial.as_ref();
        let on_error = if selection.is_some() {
            OnError::SkipRow
        } else {
            OnError::Raise
        };
        let names = source.entry_names()?;

        let agency_filter =
            selection.map(|selection| move |agency: &Agency| selection.includes_agency(agency.agency_id));
        let mut stats = SectionStats::default();
        for row in required_rows(source, AGENCY_FILE)? {
            let filter = agency_filter.as_ref().map(|f| f as &dyn Fn(&Agency) -> bool);
            stats.record(self.add::<Agency>(&row, on_error, filter)?);
        }
        stats.log(AGENCY_FILE);

        let route_filter = selection.map(|selection| {
            move |route: &Route| selection.includes_line(route.agency_id, &route.route_short_name)
        });
        let mut stats = SectionStats::default();
        for row in required_rows(source, ROUTES_FILE)? {
            let filter = route_filter.as_ref().map(|f| f as &dyn Fn(&Route) -> bool);
            stats.record(self.add::<Route>(&row, on_error, filter)?);
        }
        stats.log(ROUTES_FILE);

        let mut stats = SectionStats::default();
        for row in required_rows(source, SHAPES_FILE)? {
            stats.record(self.add_shape_point_with(&row, on_error)?);
        }
        stats.log(SHAPES_FILE);

        self.load_section::<Service, S>(source, CALENDAR_FILE, on_error)?;
        self.load_section::<Trip, S>(source, TRIPS_FILE, on_error)?;
        if selection.is_some() {
            self.sweep_shapes();
            self.sweep_calendar();
        }

        self.load_section::<Stop, S>(source, STOPS_FILE, on_error)?;
        let mut stats = SectionStats::default();
        for row in required_rows(source, STOP_TIMES_FILE)? {
            stats.record(self.add_stop_time_with(&row, on_error)?);
        }
        stats.log(STOP_TIMES_FILE);
        if selection.is_some() {
            self.sweep_stops();
        }

        if let Some(data) = source.read_entry(TRANSLATIONS_FILE)? {
            let count = self.translations.load(TRANSLATIONS_FILE, &data)?;
            debug!(file = TRANSLATIONS_FILE, added = count, "loaded section");
        }

        self.load_fares(source, on_error, selection.is_some())?;

        for name in names
            .iter()
            .filter(|name| !GTFS_FILE_NAMES.contains(&name.as_str()))
        {
            if let Some(contents) = source.read_entry(name)? {
                debug!(file = %name, bytes = contents.len(), "preserved unknown file");
                self.unknown_files.insert(name.clone(), contents);
            }
        }

        info!(
            agencies = self.agencies.len(),
            routes = self.routes.len(),
            trips = self.trips.len(),
            stops = self.stops.len(),
            stop_times = self.stop_time_count(),
            partial = selection.is_some(),
            "load took {:?}",
            started.elapsed()
        );
        if options.validate {
            self.validate(true)?;
        }
        Ok(())
    }

    fn load_section<E, S>(&mut self, source: &mut S, file: &str, on_error: OnError) -> Result<(), GraphError>
    where
        E: crate::GraphEntity + RowCodec,
        S: FeedSource + ?Sized,
    {
        let mut stats = SectionStats::default();
        for row in required_rows(source, file)? {
            stats.record(self.add::<E>(&row, on_error, None)?);
        }
        stats.log(file);
        Ok(())
    }

    /// Fare attributes and rules come as a pair or not at all. A partial
    /// load keeps only rules whose zones all belong to kept stops.
    fn load_fares<S: FeedSource + ?Sized>(
        &mut self,
        source: &mut S,
        on_error: OnError,
        partial: bool,
    ) -> Result<(), GraphError> {
        let attributes = source.read_entry(FARE_ATTRIBUTES_FILE)?;
        let rules = source.read_entry(FARE_RULES_FILE)?;
        let (attributes, rules) = match (attributes, rules) {
            (None, None) => return Ok(()),
            (Some(attributes), Some(rules)) => (attributes, rules),
            (Some(_), None) => {
                return Err(GraphError::UnpairedFile {
                    present: FARE_ATTRIBUTES_FILE.to_string(),
                    missing: FARE_RULES_FILE.to_string(),
                })
            }
            (None, Some(_)) => {
                return Err(GraphError::UnpairedFile {
                    present: FARE_RULES_FILE.to_string(),
                    missing: FARE_ATTRIBUTES_FILE.to_string(),
                })
            }
        };

        let mut stats = SectionStats::default();
        for row in read_rows(FARE_ATTRIBUTES_FILE, &attributes)? {
            stats.record(self.add::<FareAttribute>(&row, on_error, None)?);
        }
        stats.log(FARE_ATTRIBUTES_FILE);

        let zones = self.zone_ids();
        let zone_filter = move |rule: &FareRule| rule.zone_ids().all(|zone| zones.contains(zone));
        let filter = partial.then_some(&zone_filter as &dyn Fn(&FareRule) -> bool);
        let mut stats = SectionStats::default();
        for row in read_rows(FARE_RULES_FILE, &rules)? {
            stats.record(self.add_fare_rule_with(&row, on_error, filter)?);
        }
        stats.log(FARE_RULES_FILE);

        if partial {
            self.sweep_fare_attributes();
        }
        Ok(())
    }

    /// Writes every section to `sink`. Validation runs first unless
    /// suppressed and a failure aborts before anything is written.
    pub fn save<S: FeedSink + ?Sized>(&mut self, sink: &mut S, options: &SaveOptions) -> Result<(), GraphError> {
        if options.validate {
            self.validate(false)?;
        }
        let started = Instant::now();
        let sections = self.serialize_sections()?;
        for (name, contents) in &sections {
            sink.write_entry(name, contents)?;
            debug!(file = %name, bytes = contents.len(), "wrote section");
        }
        sink.finish()?;
        info!(sections = sections.len(), "save took {:?}", started.elapsed());
        Ok(())
    }

    /// Saves a zip archive at `path`.
    pub fn save_to_path(&mut self, path: impl AsRef<Path>, options: &SaveOptions) -> Result<(), GraphError> {
        let mut writer = ZipFeedWriter::create(path, options.compression)?;
        self.save(&mut writer, options)
    }

    fn serialize_sections(&self) -> Result<Vec<(String, Vec<u8>)>, GraphError> {
        let mut sections = Vec::new();
        sections.push((
            AGENCY_FILE.to_string(),
            rows_of(AGENCY_FILE, self.agencies.iter())?,
        ));
        sections.push((
            ROUTES_FILE.to_string(),
            rows_of(ROUTES_FILE, self.routes.iter())?,
        ));
        sections.push((
            SHAPES_FILE.to_string(),
            rows_of::<ShapePoint>(
                SHAPES_FILE,
                self.shapes.iter().flat_map(|shape| shape.points()),
            )?,
        ));
        sections.push((
            CALENDAR_FILE.to_string(),
            rows_of(CALENDAR_FILE, self.calendar.iter())?,
        ));
        sections.push((TRIPS_FILE.to_string(), rows_of(TRIPS_FILE, self.trips.iter())?));
        sections.push((STOPS_FILE.to_string(), rows_of(STOPS_FILE, self.stops.iter())?));
        sections.push((
            STOP_TIMES_FILE.to_string(),
            rows_of::<StopTime>(
                STOP_TIMES_FILE,
                self.stop_times.values().flat_map(|times| times.values()),
            )?,
        ));
        if self.translations.has_data() {
            sections.push((
                TRANSLATIONS_FILE.to_string(),
                self.translations.to_csv(TRANSLATIONS_FILE)?,
            ));
        }
        if !self.fare_attributes.is_empty() || !self.fare_rules.is_empty() {
            sections.push((
                FARE_ATTRIBUTES_FILE.to_string(),
                rows_of(FARE_ATTRIBUTES_FILE, self.fare_attributes.iter())?,
            ));
            sections.push((
                FARE_RULES_FILE.to_string(),
                rows_of(FARE_RULES_FILE, self.fare_rules.iter())?,
            ));
        }
        for (name, contents) in &self.unknown_files {
            sections.push((name.clone(), contents.clone()));
        }
        Ok(sections)
    }
}

fn rows_of<'a, E: RowCodec + 'a>(
    file: &str,
    items: impl Iterator<Item = &'a E>,
) -> Result<Vec<u8>, GraphError> {
    let rows: Vec<RawRow> = items.map(E::to_row).collect();
    write_rows(file, E::FIELDS, &rows)
}
