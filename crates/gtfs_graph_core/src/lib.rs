//! In-memory graph of a GTFS schedule.
//!
//! A [`Dataset`] owns every entity of a feed and keeps the references
//! between them resolved: routes point at agencies, trips at routes,
//! services and shapes, stop times at trips and stops, fare rules at fare
//! attributes, routes and stop zones. Feeds are loaded from and saved to
//! zip archives, directories or memory through [`FeedSource`] and
//! [`FeedSink`].

pub mod collection;
pub mod csv_reader;
pub mod dataset;
pub mod entity;
pub mod error;
pub mod feed;
pub mod import;
pub mod input;
pub mod notice;
mod relations;
pub mod removal;
pub mod rules;
pub mod subset;
pub mod translations;
pub mod validation_context;
pub mod validator;

#[cfg(test)]
mod fixtures;

pub use collection::EntityCollection;
pub use dataset::{AddOutcome, Dataset, Line, LineKey, OnError, ValidationState};
pub use entity::GraphEntity;
pub use error::GraphError;
pub use feed::{
    LoadOptions, SaveOptions, AGENCY_FILE, CALENDAR_FILE, FARE_ATTRIBUTES_FILE, FARE_RULES_FILE,
    GTFS_FILE_NAMES, REQUIRED_FILES, ROUTES_FILE, SHAPES_FILE, STOPS_FILE, STOP_TIMES_FILE,
    TRANSLATIONS_FILE, TRIPS_FILE,
};
pub use import::Importer;
pub use input::{
    Compression, DirectoryFeed, FeedSink, FeedSource, MemoryFeed, ZipFeedReader, ZipFeedWriter,
};
pub use notice::{Severity, Violation, ViolationReport};
pub use removal::{CleanSummary, RemoveOptions};
pub use subset::{extract, ExtractOptions, LineFilter, Selection};
pub use translations::Translator;
pub use validation_context::{
    check_urls, require_trip_stop_times, set_check_urls, set_require_trip_stop_times,
    CheckUrlsGuard, RequireTripStopTimesGuard,
};
pub use validator::{Validator, ValidatorRunner};

pub use gtfs_graph_model::{
    Agency, DirectionId, EntityKind, Extensions, FareAttribute, FareRule, GtfsColor, GtfsDate,
    GtfsParseError, GtfsTime, LocationType, PaymentMethod, PickupDropOffType, RawRow, Record,
    Route, RouteType, RowCodec, Service, Shape, ShapePoint, Stop, StopTime, Timepoint, Transfers,
    Trip, YesNoUnknown,
};
