#![no_main]
use arbitrary::Arbitrary;
use gtfs_graph_core::{Dataset, RawRow, RemoveOptions};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    AddRoute { route: u8, agency: u8, line: u8 },
    AddTrip { trip: u8, route: u8 },
    AddStop { stop: u8, parent: Option<u8>, station: bool },
    AddParentCycle { first: u8, second: u8 },
    AddStopTime { trip: u8, stop: u8, sequence: u8 },
    RemoveRoute { route: u8, recursive: bool },
    RemoveStop { stop: u8, recursive: bool },
    RemoveTrip { trip: u8, recursive: bool },
    RemoveAgency { agency: u8, recursive: bool },
    Clean,
}

fn base() -> Dataset {
    let mut dataset = Dataset::new();
    for agency in 0..3u32 {
        let _ = dataset.add_agency(&RawRow::from_pairs([
            ("agency_id", agency.to_string()),
            ("agency_name", format!("Agency {}", agency)),
            ("agency_url", "http://a.example.com".to_string()),
            ("agency_timezone", "UTC".to_string()),
        ]));
    }
    let _ = dataset.add_service(&RawRow::from_pairs([
        ("service_id", "1"),
        ("monday", "1"),
        ("tuesday", "1"),
        ("wednesday", "1"),
        ("thursday", "1"),
        ("friday", "1"),
        ("saturday", "0"),
        ("sunday", "0"),
        ("start_date", "20240101"),
        ("end_date", "20241231"),
    ]));
    dataset
}

fn apply(dataset: &mut Dataset, op: Op) {
    match op {
        Op::AddRoute { route, agency, line } => {
            let _ = dataset.add_route(&RawRow::from_pairs([
                ("route_id", route.to_string()),
                ("agency_id", (agency % 4).to_string()),
                ("route_short_name", (line % 4).to_string()),
                ("route_type", "3".to_string()),
            ]));
        }
        Op::AddTrip { trip, route } => {
            let _ = dataset.add_trip(&RawRow::from_pairs([
                ("trip_id", trip.to_string()),
                ("route_id", route.to_string()),
                ("service_id", "1".to_string()),
            ]));
        }
        Op::AddStop { stop, parent, station } => {
            let mut row = RawRow::from_pairs([
                ("stop_id", stop.to_string()),
                ("stop_name", "Stop".to_string()),
                ("stop_lat", "48.85".to_string()),
                ("stop_lon", "2.35".to_string()),
                ("location_type", if station { "1" } else { "0" }.to_string()),
            ]);
            if let Some(parent) = parent {
                row.insert("parent_station", parent.to_string());
            }
            let _ = dataset.add_stop(&row);
        }
        Op::AddParentCycle { first, second } => {
            let _ = dataset.add_stop(&station_row(first, second));
            let _ = dataset.add_stop(&station_row(second, first));
        }
        Op::AddStopTime { trip, stop, sequence } => {
            let _ = dataset.add_stop_time(&RawRow::from_pairs([
                ("trip_id", trip.to_string()),
                ("stop_id", stop.to_string()),
                ("stop_sequence", sequence.to_string()),
                ("arrival_time", "08:00:00".to_string()),
                ("departure_time", "08:00:00".to_string()),
            ]));
        }
        Op::RemoveRoute { route, recursive } => {
            let _ = dataset.remove_route(&route.to_string(), options(recursive));
        }
        Op::RemoveStop { stop, recursive } => {
            let _ = dataset.remove_stop(u32::from(stop), options(recursive));
        }
        Op::RemoveTrip { trip, recursive } => {
            let _ = dataset.remove_trip(&trip.to_string(), options(recursive));
        }
        Op::RemoveAgency { agency, recursive } => {
            let _ = dataset.remove_agency(u32::from(agency % 4), options(recursive));
        }
        Op::Clean => {
            dataset.clean();
        }
    }
}

fn station_row(stop: u8, parent: u8) -> RawRow {
    RawRow::from_pairs([
        ("stop_id", stop.to_string()),
        ("stop_name", "Station".to_string()),
        ("stop_lat", "48.85".to_string()),
        ("stop_lon", "2.35".to_string()),
        ("location_type", "1".to_string()),
        ("parent_station", parent.to_string()),
    ])
}

fn options(recursive: bool) -> RemoveOptions {
    if recursive {
        RemoveOptions::recursive()
    } else {
        RemoveOptions::default()
    }
}

// Every mutation either succeeds or leaves the graph consistent, so the
// dataset never carries a dangling reference. Parent stations are checked by
// validation only, so a stop may name a missing or cyclic parent.
fuzz_target!(|ops: Vec<Op>| {
    let mut dataset = base();
    for op in ops {
        apply(&mut dataset, op);
    }
    let report = dataset.check();
    let dangling = report.iter().find(|violation| {
        (violation.code == "foreign_key_violation"
            && violation.field.as_deref() != Some("parent_station"))
            || violation.code == "line_mismatch"
    });
    assert!(dangling.is_none(), "{:?}", dangling);
    dataset.clean();
    assert_eq!(dataset.clean().total(), 0);
});
