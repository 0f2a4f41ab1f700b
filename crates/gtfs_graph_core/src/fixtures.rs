//! Small hand-built network shared by the unit tests.
//!
//! Agency 1 runs lines 1, 2 and 3 (routes 1001..1003), agency 30 runs line
//! 301 (route 30001). Stop 10001 is a platform of station 10000.

use gtfs_graph_model::RawRow;

use crate::Dataset;

pub(crate) fn agency_row(agency_id: u32) -> RawRow {
    RawRow::from_pairs([
        ("agency_id", agency_id.to_string()),
        ("agency_name", format!("Agency {}", agency_id)),
        ("agency_url", format!("http://agency{}.example.com", agency_id)),
        ("agency_timezone", "Europe/Paris".to_string()),
    ])
}

pub(crate) fn route_row(route_id: &str, agency_id: u32, short_name: &str) -> RawRow {
    RawRow::from_pairs([
        ("route_id", route_id.to_string()),
        ("agency_id", agency_id.to_string()),
        ("route_short_name", short_name.to_string()),
        ("route_long_name", format!("Line {}", short_name)),
        ("route_type", "3".to_string()),
    ])
}

fn service_row(service_id: u32, days: [bool; 7]) -> RawRow {
    let mut row = RawRow::new();
    row.insert("service_id", service_id.to_string());
    let names = [
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "saturday",
        "sunday",
    ];
    for (name, active) in names.iter().zip(days) {
        row.insert(*name, if active { "1" } else { "0" });
    }
    row.insert("start_date", "20240101");
    row.insert("end_date", "20241231");
    row
}

fn shape_point_row(shape_id: u32, sequence: u32, lat: &str, lon: &str) -> RawRow {
    RawRow::from_pairs([
        ("shape_id", shape_id.to_string()),
        ("shape_pt_lat", lat.to_string()),
        ("shape_pt_lon", lon.to_string()),
        ("shape_pt_sequence", sequence.to_string()),
    ])
}

fn stop_row(stop_id: u32, name: &str, zone: &str, lat: &str, lon: &str) -> RawRow {
    RawRow::from_pairs([
        ("stop_id", stop_id.to_string()),
        ("stop_name", name.to_string()),
        ("stop_lat", lat.to_string()),
        ("stop_lon", lon.to_string()),
        ("zone_id", zone.to_string()),
    ])
}

pub(crate) fn trip_row(trip_id: &str, route_id: &str, service_id: u32) -> RawRow {
    RawRow::from_pairs([
        ("trip_id", trip_id.to_string()),
        ("route_id", route_id.to_string()),
        ("service_id", service_id.to_string()),
    ])
}

pub(crate) fn stop_time_row(
    trip_id: &str,
    stop_id: u32,
    sequence: u32,
    arrival: &str,
    departure: &str,
) -> RawRow {
    RawRow::from_pairs([
        ("trip_id", trip_id.to_string()),
        ("arrival_time", arrival.to_string()),
        ("departure_time", departure.to_string()),
        ("stop_id", stop_id.to_string()),
        ("stop_sequence", sequence.to_string()),
    ])
}

fn fare_attribute_row(fare_id: &str, price: &str, agency_id: Option<u32>) -> RawRow {
    let mut row = RawRow::from_pairs([
        ("fare_id", fare_id),
        ("price", price),
        ("currency_type", "EUR"),
        ("payment_method", "0"),
    ]);
    if let Some(agency_id) = agency_id {
        row.insert("agency_id", agency_id.to_string());
    }
    row
}

fn fare_rule_row(fare_id: &str, fields: &[(&str, &str)]) -> RawRow {
    let mut row = RawRow::new();
    row.insert("fare_id", fare_id);
    for (name, value) in fields {
        row.insert(*name, *value);
    }
    row
}

pub(crate) fn full_dataset() -> Dataset {
    let mut dataset = Dataset::new();
    dataset.add_agency(&agency_row(1)).unwrap();
    dataset.add_agency(&agency_row(30)).unwrap();

    dataset.add_route(&route_row("1001", 1, "1")).unwrap();
    dataset.add_route(&route_row("1002", 1, "2")).unwrap();
    dataset.add_route(&route_row("1003", 1, "3")).unwrap();
    dataset.add_route(&route_row("30001", 30, "301")).unwrap();

    for (shape_id, points) in [
        (1, [("48.8400", "2.3700"), ("48.8800", "2.3500")]),
        (2, [("48.8800", "2.3500"), ("48.8950", "2.3100")]),
    ] {
        for (index, (lat, lon)) in points.iter().enumerate() {
            dataset
                .add_shape_point(&shape_point_row(shape_id, index as u32 + 1, lat, lon))
                .unwrap();
        }
    }

    let sunday = [false, false, false, false, false, false, true];
    let weekdays = [true, true, true, true, true, false, false];
    let saturday = [false, false, false, false, false, true, false];
    let daily = [true; 7];
    dataset.add_service(&service_row(1, sunday)).unwrap();
    dataset.add_service(&service_row(2, weekdays)).unwrap();
    dataset.add_service(&service_row(3, saturday)).unwrap();
    dataset.add_service(&service_row(4, daily)).unwrap();
    dataset.add_service(&service_row(5, weekdays)).unwrap();

    let mut first = trip_row("1001_1", "1001", 1);
    first.insert("shape_id", "1");
    first.insert("trip_headsign", "Nord");
    dataset.add_trip(&first).unwrap();
    let mut second = trip_row("1002_1", "1002", 2);
    second.insert("shape_id", "2");
    second.insert("direction_id", "1");
    dataset.add_trip(&second).unwrap();
    dataset.add_trip(&trip_row("1003_1", "1003", 3)).unwrap();
    dataset.add_trip(&trip_row("30001_1", "30001", 4)).unwrap();

    let mut station = stop_row(10000, "Gare Centrale", "1", "48.8443", "2.3730");
    station.insert("location_type", "1");
    dataset.add_stop(&station).unwrap();
    let mut platform = stop_row(10001, "Gare Centrale quai A", "1", "48.8441", "2.3731");
    platform.insert("parent_station", "10000");
    platform.insert("test_attribute", "platform");
    dataset.add_stop(&platform).unwrap();
    dataset
        .add_stop(&stop_row(20000, "Nord", "2", "48.8809", "2.3553"))
        .unwrap();
    dataset
        .add_stop(&stop_row(30000, "Porte", "3", "48.8973", "2.3106"))
        .unwrap();

    for (trip_id, stop_id, sequence, arrival, departure) in [
        ("1001_1", 10001, 1, "", "06:05:00"),
        ("1001_1", 20000, 2, "07:00:00", ""),
        ("1002_1", 20000, 1, "08:00:00", "08:00:00"),
        ("1002_1", 10001, 2, "08:30:00", "08:31:00"),
        ("1003_1", 10001, 1, "09:00:00", "09:00:00"),
        ("1003_1", 20000, 2, "09:40:00", "09:40:00"),
        ("30001_1", 30000, 1, "10:00:00", "10:00:00"),
        ("30001_1", 20000, 2, "24:30:00", "24:30:00"),
    ] {
        dataset
            .add_stop_time(&stop_time_row(trip_id, stop_id, sequence, arrival, departure))
            .unwrap();
    }

    dataset
        .add_fare_attribute(&fare_attribute_row("1", "1.5", Some(1)))
        .unwrap();
    dataset
        .add_fare_attribute(&fare_attribute_row("2", "2.25", Some(30)))
        .unwrap();
    dataset
        .add_fare_attribute(&fare_attribute_row("3", "3", None))
        .unwrap();
    dataset
        .add_fare_rule(&fare_rule_row("1", &[("route_id", "1001")]))
        .unwrap();
    dataset
        .add_fare_rule(&fare_rule_row(
            "1",
            &[("origin_id", "1"), ("destination_id", "2")],
        ))
        .unwrap();
    dataset
        .add_fare_rule(&fare_rule_row(
            "2",
            &[("route_id", "30001"), ("contains_id", "3")],
        ))
        .unwrap();
    dataset
        .add_fare_rule(&fare_rule_row("3", &[("contains_id", "2")]))
        .unwrap();
    dataset
        .add_fare_rule(&fare_rule_row(
            "3",
            &[("origin_id", "1"), ("destination_id", "3")],
        ))
        .unwrap();

    let translator = dataset.translations_mut();
    translator.add_translation("Gare Centrale", "en", "Central Station");
    translator.add_translation("Nord", "en", "North");
    dataset
        .insert_unknown_file("unknown.txt", b"note_id,text\n1,kept verbatim\n".to_vec())
        .unwrap();
    dataset
}
