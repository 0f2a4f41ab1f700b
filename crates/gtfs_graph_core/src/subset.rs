use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use gtfs_graph_model::{Agency, Route};
use tracing::info;

use crate::import::Importer;
use crate::{Dataset, GraphError};

/// Which lines of one agency are selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineFilter {
    All,
    Only(BTreeSet<String>),
}

impl LineFilter {
    pub fn includes(&self, short_name: &str) -> bool {
        match self {
            LineFilter::All => true,
            LineFilter::Only(names) => names.contains(short_name),
        }
    }
}

/// Root set of a partial load or an extraction: agencies, each with the
/// lines to keep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    agencies: BTreeMap<u32, LineFilter>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all_lines(mut self, agency_id: u32) -> Self {
        self.agencies.insert(agency_id, LineFilter::All);
        self
    }

    /// Adds lines by short name. Has no effect on an agency already
    /// selected with all its lines.
    pub fn lines<I, S>(mut self, agency_id: u32, short_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let filter = self
            .agencies
            .entry(agency_id)
            .or_insert_with(|| LineFilter::Only(BTreeSet::new()));
        if let LineFilter::Only(names) = filter {
            names.extend(short_names.into_iter().map(Into::into));
        }
        self
    }

    pub fn includes_agency(&self, agency_id: u32) -> bool {
        self.agencies.contains_key(&agency_id)
    }

    pub fn includes_line(&self, agency_id: u32, short_name: &str) -> bool {
        self.agencies
            .get(&agency_id)
            .is_some_and(|filter| filter.includes(short_name))
    }

    pub fn agency_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.agencies.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.agencies.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Copy preserved side files and translations into the subset.
    pub include_unknown_files: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            include_unknown_files: true,
        }
    }
}

/// Builds a new dataset holding the selected lines and everything they
/// depend on. The result is validated before it is returned.
pub fn extract(
    source: &Dataset,
    selection: &Selection,
    options: &ExtractOptions,
) -> Result<Dataset, GraphError> {
    let started = Instant::now();
    let mut target = Dataset::new();
    {
        let mut importer = Importer::new(source, &mut target);
        for agency_id in selection.agency_ids() {
            importer.import_key::<Agency>(&agency_id)?;
            let route_ids: Vec<String> = source
                .agency_lines(agency_id)
                .filter(|line| selection.includes_line(agency_id, line.short_name()))
                .flat_map(|line| line.route_ids().map(str::to_string))
                .collect();
            for route_id in &route_ids {
                importer.import_key::<Route>(route_id)?;
                for trip in source.trips_of_route(route_id) {
                    importer.import(trip, true)?;
                    for stop_time in source.stop_times(&trip.trip_id) {
                        importer.import_stop_time(stop_time, true)?;
                    }
                }
            }
        }

        let zones = importer.target().zone_ids();
        for rule in source.fare_rules() {
            let route_kept = rule
                .route_id
                .as_deref()
                .map_or(true, |route_id| importer.target().routes().contains_key(route_id));
            if route_kept && rule.zone_ids().all(|zone| zones.contains(zone)) {
                importer.import_fare_rule(rule, true)?;
            }
        }
    }

    if options.include_unknown_files {
        target.unknown_files = source.unknown_files.clone();
        target.translations = source.translations.clone();
    }
    target.validate(true)?;
    info!(
        agencies = target.agencies.len(),
        routes = target.routes.len(),
        trips = target.trips.len(),
        stops = target.stops.len(),
        "extraction took {:?}",
        started.elapsed()
    );
    Ok(target)
}

impl Dataset {
    pub fn extract(&self, selection: &Selection, options: &ExtractOptions) -> Result<Dataset, GraphError> {
        extract(self, selection, options)
    }
}
