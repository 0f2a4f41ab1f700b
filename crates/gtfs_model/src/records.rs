use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::{
    DirectionId, EntityKind, Extensions, GtfsColor, GtfsDate, GtfsParseError, GtfsTime,
    LocationType, PaymentMethod, PickupDropOffType, RawRow, RouteType, Timepoint, Transfers,
    YesNoUnknown,
};

/// An entity stored under a unique key in its collection.
pub trait Record: Clone + PartialEq + fmt::Debug {
    type Key: Clone + Ord + fmt::Debug + fmt::Display;
    const KIND: EntityKind;

    fn key(&self) -> Self::Key;
}

/// Conversion between a record and one row of its section.
pub trait RowCodec: Sized {
    /// Fixed columns, in the order they are written.
    const FIELDS: &'static [&'static str];

    fn from_row(row: &RawRow) -> Result<Self, GtfsParseError>;
    fn to_row(&self) -> RawRow;
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Agency {
    pub agency_id: u32,
    pub agency_name: String,
    pub agency_url: String,
    pub agency_timezone: String,
    pub agency_lang: Option<String>,
    pub agency_phone: Option<String>,
    pub agency_fare_url: Option<String>,
    pub agency_email: Option<String>,
    pub extensions: Extensions,
}

impl Record for Agency {
    type Key = u32;
    const KIND: EntityKind = EntityKind::Agency;

    fn key(&self) -> u32 {
        self.agency_id
    }
}

impl RowCodec for Agency {
    const FIELDS: &'static [&'static str] = &[
        "agency_id",
        "agency_name",
        "agency_url",
        "agency_timezone",
        "agency_lang",
        "agency_phone",
        "agency_fare_url",
        "agency_email",
    ];

    fn from_row(row: &RawRow) -> Result<Self, GtfsParseError> {
        Ok(Self {
            agency_id: row.required("agency_id")?,
            agency_name: row.required_text("agency_name")?,
            agency_url: row.required_text("agency_url")?,
            agency_timezone: row.required_text("agency_timezone")?,
            agency_lang: row.text("agency_lang"),
            agency_phone: row.text("agency_phone"),
            agency_fare_url: row.text("agency_fare_url"),
            agency_email: row.text("agency_email"),
            extensions: row.extensions(Self::FIELDS),
        })
    }

    fn to_row(&self) -> RawRow {
        let mut row = RawRow::new();
        row.put("agency_id", &self.agency_id);
        row.put("agency_name", &self.agency_name);
        row.put("agency_url", &self.agency_url);
        row.put("agency_timezone", &self.agency_timezone);
        row.put_optional("agency_lang", &self.agency_lang);
        row.put_optional("agency_phone", &self.agency_phone);
        row.put_optional("agency_fare_url", &self.agency_fare_url);
        row.put_optional("agency_email", &self.agency_email);
        row.append_extensions(&self.extensions);
        row
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Route {
    pub route_id: String,
    pub agency_id: u32,
    pub route_short_name: String,
    pub route_long_name: String,
    pub route_desc: Option<String>,
    pub route_type: RouteType,
    pub route_url: Option<String>,
    pub route_color: Option<GtfsColor>,
    pub route_text_color: Option<GtfsColor>,
    pub bikes_allowed: YesNoUnknown,
    pub extensions: Extensions,
}

impl Record for Route {
    type Key = String;
    const KIND: EntityKind = EntityKind::Route;

    fn key(&self) -> String {
        self.route_id.clone()
    }
}

impl RowCodec for Route {
    const FIELDS: &'static [&'static str] = &[
        "route_id",
        "agency_id",
        "route_short_name",
        "route_long_name",
        "route_desc",
        "route_type",
        "route_url",
        "route_color",
        "route_text_color",
        "bikes_allowed",
    ];

    fn from_row(row: &RawRow) -> Result<Self, GtfsParseError> {
        Ok(Self {
            route_id: row.required_text("route_id")?,
            agency_id: row.required("agency_id")?,
            route_short_name: row.text_or_empty("route_short_name"),
            route_long_name: row.text_or_empty("route_long_name"),
            route_desc: row.text("route_desc"),
            route_type: row.required("route_type")?,
            route_url: row.text("route_url"),
            route_color: row.optional("route_color")?,
            route_text_color: row.optional("route_text_color")?,
            bikes_allowed: row.or_default("bikes_allowed")?,
            extensions: row.extensions(Self::FIELDS),
        })
    }

    fn to_row(&self) -> RawRow {
        let mut row = RawRow::new();
        row.put("route_id", &self.route_id);
        row.put("agency_id", &self.agency_id);
        row.put("route_short_name", &self.route_short_name);
        row.put("route_long_name", &self.route_long_name);
        row.put_optional("route_desc", &self.route_desc);
        row.put("route_type", &self.route_type);
        row.put_optional("route_url", &self.route_url);
        row.put_optional("route_color", &self.route_color);
        row.put_optional("route_text_color", &self.route_text_color);
        row.put("bikes_allowed", &self.bikes_allowed);
        row.append_extensions(&self.extensions);
        row
    }
}

/// A weekly operating pattern bounded by a date range (one calendar row).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Service {
    pub service_id: u32,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    pub start_date: GtfsDate,
    pub end_date: GtfsDate,
    pub extensions: Extensions,
}

impl Service {
    pub fn runs_on(&self, weekday: Weekday) -> bool {
        match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    pub fn has_active_day(&self) -> bool {
        self.monday
            || self.tuesday
            || self.wednesday
            || self.thursday
            || self.friday
            || self.saturday
            || self.sunday
    }

    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        let start = self.start_date.to_naive_date();
        let end = self.end_date.to_naive_date();
        match (start, end) {
            (Some(start), Some(end)) => {
                start <= date && date <= end && self.runs_on(date.weekday())
            }
            _ => false,
        }
    }
}

impl Record for Service {
    type Key = u32;
    const KIND: EntityKind = EntityKind::Service;

    fn key(&self) -> u32 {
        self.service_id
    }
}

impl RowCodec for Service {
    const FIELDS: &'static [&'static str] = &[
        "service_id",
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "saturday",
        "sunday",
        "start_date",
        "end_date",
    ];

    fn from_row(row: &RawRow) -> Result<Self, GtfsParseError> {
        Ok(Self {
            service_id: row.required("service_id")?,
            monday: row.required("monday")?,
            tuesday: row.required("tuesday")?,
            wednesday: row.required("wednesday")?,
            thursday: row.required("thursday")?,
            friday: row.required("friday")?,
            saturday: row.required("saturday")?,
            sunday: row.required("sunday")?,
            start_date: row.required("start_date")?,
            end_date: row.required("end_date")?,
            extensions: row.extensions(Self::FIELDS),
        })
    }

    fn to_row(&self) -> RawRow {
        let mut row = RawRow::new();
        row.put("service_id", &self.service_id);
        row.put("monday", &self.monday);
        row.put("tuesday", &self.tuesday);
        row.put("wednesday", &self.wednesday);
        row.put("thursday", &self.thursday);
        row.put("friday", &self.friday);
        row.put("saturday", &self.saturday);
        row.put("sunday", &self.sunday);
        row.put("start_date", &self.start_date);
        row.put("end_date", &self.end_date);
        row.append_extensions(&self.extensions);
        row
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapePoint {
    pub shape_id: u32,
    pub shape_pt_lat: f64,
    pub shape_pt_lon: f64,
    pub shape_pt_sequence: u32,
    pub shape_dist_traveled: Option<f64>,
    pub extensions: Extensions,
}

impl RowCodec for ShapePoint {
    const FIELDS: &'static [&'static str] = &[
        "shape_id",
        "shape_pt_lat",
        "shape_pt_lon",
        "shape_pt_sequence",
        "shape_dist_traveled",
    ];

    fn from_row(row: &RawRow) -> Result<Self, GtfsParseError> {
        Ok(Self {
            shape_id: row.required("shape_id")?,
            shape_pt_lat: row.required("shape_pt_lat")?,
            shape_pt_lon: row.required("shape_pt_lon")?,
            shape_pt_sequence: row.required("shape_pt_sequence")?,
            shape_dist_traveled: row.optional("shape_dist_traveled")?,
            extensions: row.extensions(Self::FIELDS),
        })
    }

    fn to_row(&self) -> RawRow {
        let mut row = RawRow::new();
        row.put("shape_id", &self.shape_id);
        row.put("shape_pt_lat", &self.shape_pt_lat);
        row.put("shape_pt_lon", &self.shape_pt_lon);
        row.put("shape_pt_sequence", &self.shape_pt_sequence);
        row.put_optional("shape_dist_traveled", &self.shape_dist_traveled);
        row.append_extensions(&self.extensions);
        row
    }
}

/// A polyline assembled from the shape rows sharing one `shape_id`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shape {
    pub shape_id: u32,
    points: BTreeMap<u32, ShapePoint>,
}

impl Shape {
    pub fn new(shape_id: u32) -> Self {
        Self {
            shape_id,
            points: BTreeMap::new(),
        }
    }

    /// Adds a point, handing it back when it belongs to another shape or
    /// its sequence is already taken.
    pub fn insert_point(&mut self, point: ShapePoint) -> Result<(), ShapePoint> {
        if point.shape_id != self.shape_id || self.points.contains_key(&point.shape_pt_sequence) {
            return Err(point);
        }
        self.points.insert(point.shape_pt_sequence, point);
        Ok(())
    }

    pub fn point(&self, sequence: u32) -> Option<&ShapePoint> {
        self.points.get(&sequence)
    }

    /// Points in sequence order.
    pub fn points(&self) -> impl Iterator<Item = &ShapePoint> {
        self.points.values()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Record for Shape {
    type Key = u32;
    const KIND: EntityKind = EntityKind::Shape;

    fn key(&self) -> u32 {
        self.shape_id
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stop {
    pub stop_id: u32,
    pub stop_code: Option<String>,
    pub stop_name: String,
    pub stop_desc: Option<String>,
    pub stop_lat: f64,
    pub stop_lon: f64,
    pub zone_id: Option<String>,
    pub stop_url: Option<String>,
    pub location_type: LocationType,
    pub parent_station: Option<u32>,
    pub stop_timezone: Option<String>,
    pub wheelchair_boarding: YesNoUnknown,
    pub extensions: Extensions,
}

impl Stop {
    pub fn is_station(&self) -> bool {
        self.location_type == LocationType::Station
    }
}

impl Record for Stop {
    type Key = u32;
    const KIND: EntityKind = EntityKind::Stop;

    fn key(&self) -> u32 {
        self.stop_id
    }
}

impl RowCodec for Stop {
    const FIELDS: &'static [&'static str] = &[
        "stop_id",
        "stop_code",
        "stop_name",
        "stop_desc",
        "stop_lat",
        "stop_lon",
        "zone_id",
        "stop_url",
        "location_type",
        "parent_station",
        "stop_timezone",
        "wheelchair_boarding",
    ];

    fn from_row(row: &RawRow) -> Result<Self, GtfsParseError> {
        Ok(Self {
            stop_id: row.required("stop_id")?,
            stop_code: row.text("stop_code"),
            stop_name: row.required_text("stop_name")?,
            stop_desc: row.text("stop_desc"),
            stop_lat: row.required("stop_lat")?,
            stop_lon: row.required("stop_lon")?,
            zone_id: row.text("zone_id"),
            stop_url: row.text("stop_url"),
            location_type: row.or_default("location_type")?,
            parent_station: row.optional("parent_station")?,
            stop_timezone: row.text("stop_timezone"),
            wheelchair_boarding: row.or_default("wheelchair_boarding")?,
            extensions: row.extensions(Self::FIELDS),
        })
    }

    fn to_row(&self) -> RawRow {
        let mut row = RawRow::new();
        row.put("stop_id", &self.stop_id);
        row.put_optional("stop_code", &self.stop_code);
        row.put("stop_name", &self.stop_name);
        row.put_optional("stop_desc", &self.stop_desc);
        row.put("stop_lat", &self.stop_lat);
        row.put("stop_lon", &self.stop_lon);
        row.put_optional("zone_id", &self.zone_id);
        row.put_optional("stop_url", &self.stop_url);
        row.put("location_type", &self.location_type);
        row.put_optional("parent_station", &self.parent_station);
        row.put_optional("stop_timezone", &self.stop_timezone);
        row.put("wheelchair_boarding", &self.wheelchair_boarding);
        row.append_extensions(&self.extensions);
        row
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trip {
    pub trip_id: String,
    pub route_id: String,
    pub service_id: u32,
    pub trip_headsign: Option<String>,
    pub trip_short_name: Option<String>,
    pub direction_id: Option<DirectionId>,
    pub block_id: Option<String>,
    pub shape_id: Option<u32>,
    pub wheelchair_accessible: YesNoUnknown,
    pub bikes_allowed: YesNoUnknown,
    pub extensions: Extensions,
}

impl Record for Trip {
    type Key = String;
    const KIND: EntityKind = EntityKind::Trip;

    fn key(&self) -> String {
        self.trip_id.clone()
    }
}

impl RowCodec for Trip {
    const FIELDS: &'static [&'static str] = &[
        "route_id",
        "service_id",
        "trip_id",
        "trip_headsign",
        "trip_short_name",
        "direction_id",
        "block_id",
        "shape_id",
        "wheelchair_accessible",
        "bikes_allowed",
    ];

    fn from_row(row: &RawRow) -> Result<Self, GtfsParseError> {
        Ok(Self {
            trip_id: row.required_text("trip_id")?,
            route_id: row.required_text("route_id")?,
            service_id: row.required("service_id")?,
            trip_headsign: row.text("trip_headsign"),
            trip_short_name: row.text("trip_short_name"),
            direction_id: row.optional("direction_id")?,
            block_id: row.text("block_id"),
            shape_id: row.optional("shape_id")?,
            wheelchair_accessible: row.or_default("wheelchair_accessible")?,
            bikes_allowed: row.or_default("bikes_allowed")?,
            extensions: row.extensions(Self::FIELDS),
        })
    }

    fn to_row(&self) -> RawRow {
        let mut row = RawRow::new();
        row.put("route_id", &self.route_id);
        row.put("service_id", &self.service_id);
        row.put("trip_id", &self.trip_id);
        row.put_optional("trip_headsign", &self.trip_headsign);
        row.put_optional("trip_short_name", &self.trip_short_name);
        row.put_optional("direction_id", &self.direction_id);
        row.put_optional("block_id", &self.block_id);
        row.put_optional("shape_id", &self.shape_id);
        row.put("wheelchair_accessible", &self.wheelchair_accessible);
        row.put("bikes_allowed", &self.bikes_allowed);
        row.append_extensions(&self.extensions);
        row
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StopTime {
    pub trip_id: String,
    pub arrival_time: Option<GtfsTime>,
    pub departure_time: Option<GtfsTime>,
    pub stop_id: u32,
    pub stop_sequence: u32,
    pub stop_headsign: Option<String>,
    pub pickup_type: PickupDropOffType,
    pub drop_off_type: PickupDropOffType,
    pub shape_dist_traveled: Option<f64>,
    pub timepoint: Option<Timepoint>,
    pub extensions: Extensions,
}

impl StopTime {
    pub fn allows_pickup(&self) -> bool {
        self.pickup_type != PickupDropOffType::NoneAvailable
    }

    pub fn allows_drop_off(&self) -> bool {
        self.drop_off_type != PickupDropOffType::NoneAvailable
    }
}

impl RowCodec for StopTime {
    const FIELDS: &'static [&'static str] = &[
        "trip_id",
        "arrival_time",
        "departure_time",
        "stop_id",
        "stop_sequence",
        "stop_headsign",
        "pickup_type",
        "drop_off_type",
        "shape_dist_traveled",
        "timepoint",
    ];

    fn from_row(row: &RawRow) -> Result<Self, GtfsParseError> {
        Ok(Self {
            trip_id: row.required_text("trip_id")?,
            arrival_time: row.optional("arrival_time")?,
            departure_time: row.optional("departure_time")?,
            stop_id: row.required("stop_id")?,
            stop_sequence: row.required("stop_sequence")?,
            stop_headsign: row.text("stop_headsign"),
            pickup_type: row.or_default("pickup_type")?,
            drop_off_type: row.or_default("drop_off_type")?,
            shape_dist_traveled: row.optional("shape_dist_traveled")?,
            timepoint: row.optional("timepoint")?,
            extensions: row.extensions(Self::FIELDS),
        })
    }

    fn to_row(&self) -> RawRow {
        let mut row = RawRow::new();
        row.put("trip_id", &self.trip_id);
        row.put_optional("arrival_time", &self.arrival_time);
        row.put_optional("departure_time", &self.departure_time);
        row.put("stop_id", &self.stop_id);
        row.put("stop_sequence", &self.stop_sequence);
        row.put_optional("stop_headsign", &self.stop_headsign);
        row.put("pickup_type", &self.pickup_type);
        row.put("drop_off_type", &self.drop_off_type);
        row.put_optional("shape_dist_traveled", &self.shape_dist_traveled);
        row.put_optional("timepoint", &self.timepoint);
        row.append_extensions(&self.extensions);
        row
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FareAttribute {
    pub fare_id: String,
    pub price: f64,
    pub currency_type: String,
    pub payment_method: PaymentMethod,
    pub transfers: Option<Transfers>,
    pub agency_id: Option<u32>,
    pub transfer_duration: Option<u32>,
    pub extensions: Extensions,
}

impl Record for FareAttribute {
    type Key = String;
    const KIND: EntityKind = EntityKind::FareAttribute;

    fn key(&self) -> String {
        self.fare_id.clone()
    }
}

impl RowCodec for FareAttribute {
    const FIELDS: &'static [&'static str] = &[
        "fare_id",
        "price",
        "currency_type",
        "payment_method",
        "transfers",
        "agency_id",
        "transfer_duration",
    ];

    fn from_row(row: &RawRow) -> Result<Self, GtfsParseError> {
        Ok(Self {
            fare_id: row.required_text("fare_id")?,
            price: row.required("price")?,
            currency_type: row.required_text("currency_type")?,
            payment_method: row.required("payment_method")?,
            transfers: row.optional("transfers")?,
            agency_id: row.optional("agency_id")?,
            transfer_duration: row.optional("transfer_duration")?,
            extensions: row.extensions(Self::FIELDS),
        })
    }

    fn to_row(&self) -> RawRow {
        let mut row = RawRow::new();
        row.put("fare_id", &self.fare_id);
        row.put("price", &self.price);
        row.put("currency_type", &self.currency_type);
        row.put("payment_method", &self.payment_method);
        row.put_optional("transfers", &self.transfers);
        row.put_optional("agency_id", &self.agency_id);
        row.put_optional("transfer_duration", &self.transfer_duration);
        row.append_extensions(&self.extensions);
        row
    }
}

/// A condition under which a fare applies. Rules have no key of their own;
/// two rules are the same rule when every field matches.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FareRule {
    pub fare_id: String,
    pub route_id: Option<String>,
    pub origin_id: Option<String>,
    pub destination_id: Option<String>,
    pub contains_id: Option<String>,
    pub extensions: Extensions,
}

impl FareRule {
    /// Zones this rule names, in origin, destination, contains order.
    pub fn zone_ids(&self) -> impl Iterator<Item = &str> {
        [&self.origin_id, &self.destination_id, &self.contains_id]
            .into_iter()
            .filter_map(|zone| zone.as_deref())
    }
}

impl RowCodec for FareRule {
    const FIELDS: &'static [&'static str] = &[
        "fare_id",
        "route_id",
        "origin_id",
        "destination_id",
        "contains_id",
    ];

    fn from_row(row: &RawRow) -> Result<Self, GtfsParseError> {
        Ok(Self {
            fare_id: row.required_text("fare_id")?,
            route_id: row.text("route_id"),
            origin_id: row.text("origin_id"),
            destination_id: row.text("destination_id"),
            contains_id: row.text("contains_id"),
            extensions: row.extensions(Self::FIELDS),
        })
    }

    fn to_row(&self) -> RawRow {
        let mut row = RawRow::new();
        row.put("fare_id", &self.fare_id);
        row.put_optional("route_id", &self.route_id);
        row.put_optional("origin_id", &self.origin_id);
        row.put_optional("destination_id", &self.destination_id);
        row.put_optional("contains_id", &self.contains_id);
        row.append_extensions(&self.extensions);
        row
    }
}
