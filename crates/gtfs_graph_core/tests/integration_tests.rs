use gtfs_graph_core::{
    set_require_trip_stop_times, Dataset, EntityKind, ExtractOptions, GraphError, LoadOptions,
    MemoryFeed, RawRow, RemoveOptions, SaveOptions, Selection, Severity, FARE_ATTRIBUTES_FILE,
    FARE_RULES_FILE, STOPS_FILE,
};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

const AGENCY: &str = "\u{feff}agency_id,agency_name,agency_url,agency_timezone
1,City Buses,http://buses.example.com,Europe/Paris
30,Airport Link,http://airport.example.com,Europe/Paris
";

const ROUTES: &str = "route_id,agency_id,route_short_name,route_long_name,route_type
1001,1,1,Gare - Nord,3
1002,1,2,Nord - Gare,3
30001,30,301,Airport,3
";

const CALENDAR: &str =
    "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date
1,0,0,0,0,0,0,1,20240101,20241231
2,1,1,1,1,1,0,0,20240101,20241231
3,1,1,1,1,1,1,1,20240101,20241231
";

const SHAPES: &str = "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence
1,48.8441,2.3731,1
1,48.8809,2.3553,2
";

const TRIPS: &str = "trip_id,route_id,service_id,shape_id
1001_1,1001,1,1
1002_1,1002,2,
30001_1,30001,3,
";

const STOPS: &str = "stop_id,stop_name,stop_lat,stop_lon,zone_id,location_type,parent_station,platform_code
10000,Gare,48.8443,2.3730,1,1,,
10001,Gare quai A,48.8441,2.3731,1,0,10000,A
20000,Nord,48.8809,2.3553,2,0,,
30000,Airport,49.0097,2.5479,3,0,,
";

const STOP_TIMES: &str = "trip_id,arrival_time,departure_time,stop_id,stop_sequence
1001_1,,06:05:00,10001,1
1001_1,07:00:00,,20000,2
1002_1,08:00:00,08:00:00,20000,1
1002_1,08:40:00,08:40:00,10001,2
30001_1,09:00:00,09:00:00,20000,1
30001_1,25:10:00,25:10:00,30000,2
";

const FARE_ATTRIBUTES: &str = "fare_id,price,currency_type,payment_method,agency_id
city,1.50,EUR,0,1
airport,9.00,EUR,1,30
";

const FARE_RULES: &str = "fare_id,route_id,origin_id,destination_id,contains_id
city,1001,,,
city,,1,2,
airport,30001,,,3
";

const TRANSLATIONS: &str = "trans_id,lang,translation
Gare,en,Station
";

fn network_feed() -> MemoryFeed {
    MemoryFeed::new()
        .with_entry("agency.txt", AGENCY)
        .with_entry("routes.txt", ROUTES)
        .with_entry("calendar.txt", CALENDAR)
        .with_entry("shapes.txt", SHAPES)
        .with_entry("trips.txt", TRIPS)
        .with_entry("stops.txt", STOPS)
        .with_entry("stop_times.txt", STOP_TIMES)
        .with_entry("fare_attributes.txt", FARE_ATTRIBUTES)
        .with_entry("fare_rules.txt", FARE_RULES)
        .with_entry("translations.txt", TRANSLATIONS)
        .with_entry("feed_info.txt", "feed_publisher_name\nCity\n")
}

// Stop 40000 names itself as parent; 50000 and 50001 name each other, and
// trip 1002_1 calls at 50001.
const CYCLIC_STOPS: &str = "stop_id,stop_name,stop_lat,stop_lon,zone_id,location_type,parent_station
10000,Gare,48.8443,2.3730,1,1,
10001,Gare quai A,48.8441,2.3731,1,0,10000
20000,Nord,48.8809,2.3553,2,0,
30000,Airport,49.0097,2.5479,3,0,
40000,Loop,48.8500,2.3500,,1,40000
50000,Ring,48.8600,2.3600,2,1,50001
50001,Ring quai,48.8601,2.3601,2,0,50000
";

fn cyclic_network() -> Dataset {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let stop_times = format!("{}1002_1,09:00:00,09:00:00,50001,3\n", STOP_TIMES);
    let mut feed = network_feed()
        .with_entry("stops.txt", CYCLIC_STOPS)
        .with_entry("stop_times.txt", stop_times);
    let options = LoadOptions {
        validate: false,
        ..LoadOptions::default()
    };
    Dataset::load(&mut feed, &options).expect("cyclic network loads unvalidated")
}

fn network() -> Dataset {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Dataset::load(&mut network_feed(), &LoadOptions::default()).expect("network loads")
}

fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "gtfs_graph_it_{}_{}_{}",
        std::process::id(),
        nanos,
        name
    ))
}

#[test]
fn loads_and_resolves_the_network() {
    let dataset = network();
    assert!(dataset.is_validated());
    assert_eq!(dataset.agencies().len(), 2);
    assert_eq!(dataset.routes().len(), 3);
    assert_eq!(dataset.stop_time_count(), 6);
    assert_eq!(dataset.child_stops(10000).count(), 1);
    assert_eq!(dataset.agency_lines(1).count(), 2);
    assert_eq!(
        dataset.stops().get(&10001).unwrap().extensions.get("platform_code"),
        Some("A")
    );
    assert_eq!(dataset.translations().translate("Gare", "en"), Some("Station"));
    assert!(dataset.unknown_files().contains_key("feed_info.txt"));
}

#[test]
fn memory_round_trip_preserves_the_graph() -> anyhow::Result<()> {
    let mut dataset = network();
    let mut saved = MemoryFeed::new();
    dataset.save(&mut saved, &SaveOptions::default())?;
    assert_eq!(saved.get("feed_info.txt"), Some(&b"feed_publisher_name\nCity\n"[..]));

    let reloaded = Dataset::load(&mut saved, &LoadOptions::default())?;
    assert_eq!(reloaded, dataset);
    assert_eq!(reloaded.translations(), dataset.translations());
    assert_eq!(reloaded.unknown_files(), dataset.unknown_files());
    Ok(())
}

#[test]
fn zip_round_trip_on_disk() -> anyhow::Result<()> {
    let path = temp_path("feed.zip");
    let mut dataset = network();
    dataset.save_to_path(&path, &SaveOptions::default())?;
    let reopened = Dataset::open(&path)?;
    std::fs::remove_file(&path).ok();
    assert_eq!(reopened, dataset);
    Ok(())
}

#[test]
fn stop_removal_scenario() {
    let mut dataset = network();
    assert!(matches!(
        dataset.remove_stop(10001, RemoveOptions::default()),
        Err(GraphError::DependentsExist {
            kind: EntityKind::Stop,
            ..
        })
    ));
    assert_eq!(dataset.trip_stop_time_count("1001_1"), 2);

    dataset
        .remove_stop(10001, RemoveOptions::recursive())
        .unwrap();
    assert_eq!(dataset.trip_stop_time_count("1001_1"), 1);
    assert!(dataset.stops().contains_key(&10000));
    assert!(dataset.validate(true).is_ok());
}

#[test]
fn strict_trip_policy_is_scoped_to_its_guard() {
    let mut dataset = network();
    dataset
        .add_trip(&RawRow::from_pairs([
            ("trip_id", "1001_2"),
            ("route_id", "1001"),
            ("service_id", "1"),
        ]))
        .unwrap();

    let report = dataset.check();
    let warning = report
        .iter()
        .find(|violation| violation.code == "trip_without_stop_times")
        .unwrap();
    assert_eq!(warning.severity, Severity::Warning);
    assert!(dataset.validate(true).is_ok());

    {
        let _strict = set_require_trip_stop_times(true);
        let err = dataset.validate(true).unwrap_err();
        assert!(err.violations().unwrap().has_code("trip_without_stop_times"));
    }
    assert!(dataset.validate(true).is_ok());
}

#[test]
fn recursive_removal_leaves_no_dangling_references() {
    let mut dataset = network();
    dataset
        .remove_agency(1, RemoveOptions::recursive())
        .unwrap();
    assert!(dataset.check().errors().next().is_none());
    assert!(dataset.routes().iter().all(|route| route.agency_id == 30));
    assert!(dataset.fare_attributes().contains_key("airport"));
    assert!(!dataset.fare_attributes().contains_key("city"));
    assert!(dataset.fare_rules().iter().all(|rule| rule.fare_id == "airport"));
}

#[test]
fn clean_reaches_a_fixed_point() {
    let mut dataset = network();
    dataset
        .remove_route("30001", RemoveOptions::recursive())
        .unwrap();
    let first = dataset.clean();
    assert_eq!(first.agencies, 1);
    assert!(!dataset.stops().contains_key(&30000));
    assert!(!dataset.fare_attributes().contains_key("airport"));
    assert_eq!(dataset.clean().total(), 0);
    assert!(dataset.validate(true).is_ok());
}

#[test]
fn extraction_is_closed_under_references() {
    let source = network();
    let subset = source
        .extract(&Selection::new().lines(1, ["1"]), &ExtractOptions::default())
        .unwrap();
    assert_eq!(subset.routes().keys().collect::<Vec<_>>(), vec!["1001"]);
    assert_eq!(subset.trips().keys().collect::<Vec<_>>(), vec!["1001_1"]);
    assert!(subset.shapes().contains_key(&1));
    assert!(subset.stops().contains_key(&10000));
    assert!(!subset.agencies().contains_key(&30));
    assert_eq!(subset.fare_rules().len(), 2);
    assert!(subset.check().errors().next().is_none());
}

#[test]
fn partial_load_matches_extraction() {
    let partial = Dataset::load_partial(&mut network_feed(), Selection::new().all_lines(30)).unwrap();
    let extracted = network()
        .extract(&Selection::new().all_lines(30), &ExtractOptions::default())
        .unwrap();
    assert_eq!(partial.routes().keys().collect::<Vec<_>>(), vec!["30001"]);
    assert_eq!(partial.trips(), extracted.trips());
    assert_eq!(partial.stops(), extracted.stops());
    assert_eq!(partial.fare_rules(), extracted.fare_rules());
}

#[test]
fn importing_an_equal_object_twice_is_a_no_op() {
    let source = network();
    let mut target = Dataset::new();
    let trip = source.trips().get("1001_1").unwrap();
    target.add_object(&source, trip, true).unwrap();
    let before = target.clone();
    target.add_object(&source, trip, true).unwrap();
    assert_eq!(target, before);
}

#[test]
fn loading_twice_is_refused() {
    let mut dataset = network();
    assert!(matches!(
        dataset.load_into(&mut network_feed(), &LoadOptions::default()),
        Err(GraphError::AlreadyLoaded)
    ));
}

#[test]
fn missing_and_unpaired_files_are_reported() {
    let mut feed = network_feed();
    feed.remove(FARE_RULES_FILE);
    assert!(matches!(
        Dataset::load(&mut feed, &LoadOptions::default()),
        Err(GraphError::UnpairedFile { .. })
    ));
    feed.remove(FARE_ATTRIBUTES_FILE);
    assert!(Dataset::load(&mut feed, &LoadOptions::default()).is_ok());

    feed.remove(STOPS_FILE);
    assert!(matches!(
        Dataset::load(&mut feed, &LoadOptions::default()),
        Err(GraphError::MissingFile(ref name)) if name == STOPS_FILE
    ));
}

#[test]
fn malformed_parents_are_reported_not_followed() {
    let mut dataset = cyclic_network();
    let report = dataset.check();
    assert!(report.has_code("station_with_parent"));
    assert!(dataset.validate(true).is_err());
}

#[test]
fn recursive_removal_of_cyclic_stops_terminates() {
    let mut dataset = cyclic_network();
    dataset
        .remove_stop(40000, RemoveOptions::recursive())
        .unwrap();
    assert!(!dataset.stops().contains_key(&40000));

    dataset
        .remove_stop(50000, RemoveOptions::recursive())
        .unwrap();
    assert!(!dataset.stops().contains_key(&50000));
    assert!(!dataset.stops().contains_key(&50001));
    assert_eq!(dataset.trip_stop_time_count("1002_1"), 2);
    assert!(dataset.validate(true).is_ok());
}

#[test]
fn clean_on_cyclic_stops_reaches_a_fixed_point() {
    let mut dataset = cyclic_network();
    dataset.clean();
    assert!(!dataset.stops().contains_key(&40000));
    assert!(dataset.stops().contains_key(&50000));
    assert!(dataset.stops().contains_key(&50001));
    assert_eq!(dataset.clean().total(), 0);
}

#[test]
fn extraction_through_a_parent_cycle_terminates() {
    let dataset = cyclic_network();
    let err = dataset
        .extract(&Selection::new().lines(1, ["2"]), &ExtractOptions::default())
        .unwrap_err();
    assert!(err.violations().unwrap().has_code("station_with_parent"));

    let subset = dataset
        .extract(&Selection::new().lines(1, ["1"]), &ExtractOptions::default())
        .unwrap();
    assert!(!subset.stops().contains_key(&50001));
    assert!(!subset.stops().contains_key(&40000));
}
