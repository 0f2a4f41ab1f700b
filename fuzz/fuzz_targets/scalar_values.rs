#![no_main]
use gtfs_graph_model::{FieldValue, GtfsColor, GtfsDate, GtfsTime, RouteType};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(date) = GtfsDate::parse(data) {
        assert_eq!(GtfsDate::parse(&date.to_string()), Ok(date));
    }
    if let Ok(time) = GtfsTime::parse(data) {
        assert_eq!(GtfsTime::parse(&time.to_string()), Ok(time));
    }
    let _ = GtfsColor::parse(data);
    let _ = <RouteType as FieldValue>::parse_field(data);
    let _ = <bool as FieldValue>::parse_field(data);
    let _ = <f64 as FieldValue>::parse_field(data);
});
