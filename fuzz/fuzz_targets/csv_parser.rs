#![no_main]
use gtfs_graph_core::csv_reader::{read_rows, write_rows};
use gtfs_graph_core::{Dataset, LoadOptions, MemoryFeed};
use libfuzzer_sys::fuzz_target;

const AGENCY: &str = "agency_id,agency_name,agency_url,agency_timezone\n1,A,http://a.example.com,UTC\n";

fuzz_target!(|data: &[u8]| {
    if let Ok(rows) = read_rows("fuzz.txt", data) {
        let _ = write_rows("fuzz.txt", &[], &rows);
    }

    // Arbitrary stops.txt behind a valid agency.
    let mut feed = MemoryFeed::new()
        .with_entry("agency.txt", AGENCY)
        .with_entry("routes.txt", "route_id,agency_id,route_type\n")
        .with_entry("calendar.txt", "service_id\n")
        .with_entry("shapes.txt", "shape_id\n")
        .with_entry("trips.txt", "trip_id\n")
        .with_entry("stops.txt", data)
        .with_entry("stop_times.txt", "trip_id\n");
    let _ = Dataset::load(&mut feed, &LoadOptions::default());
});
