use std::cell::Cell;

thread_local! {
    static REQUIRE_TRIP_STOP_TIMES: Cell<bool> = const { Cell::new(false) };
    static CHECK_URLS: Cell<bool> = const { Cell::new(true) };
}

pub struct RequireTripStopTimesGuard {
    previous: bool,
}

impl Drop for RequireTripStopTimesGuard {
    fn drop(&mut self) {
        REQUIRE_TRIP_STOP_TIMES.with(|cell| cell.set(self.previous));
    }
}

/// When enabled, a trip without stop times is an error instead of a warning.
pub fn set_require_trip_stop_times(enabled: bool) -> RequireTripStopTimesGuard {
    let previous = REQUIRE_TRIP_STOP_TIMES.with(|cell| cell.replace(enabled));
    RequireTripStopTimesGuard { previous }
}

pub fn require_trip_stop_times() -> bool {
    REQUIRE_TRIP_STOP_TIMES.with(|cell| cell.get())
}

pub struct CheckUrlsGuard {
    previous: bool,
}

impl Drop for CheckUrlsGuard {
    fn drop(&mut self) {
        CHECK_URLS.with(|cell| cell.set(self.previous));
    }
}

pub fn set_check_urls(enabled: bool) -> CheckUrlsGuard {
    let previous = CHECK_URLS.with(|cell| cell.replace(enabled));
    CheckUrlsGuard { previous }
}

pub fn check_urls() -> bool {
    CHECK_URLS.with(|cell| cell.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_previous_policy() {
        assert!(!require_trip_stop_times());
        {
            let _guard = set_require_trip_stop_times(true);
            assert!(require_trip_stop_times());
            {
                let _inner = set_require_trip_stop_times(false);
                assert!(!require_trip_stop_times());
            }
            assert!(require_trip_stop_times());
        }
        assert!(!require_trip_stop_times());
    }

    #[test]
    fn url_checks_default_on() {
        assert!(check_urls());
        let _guard = set_check_urls(false);
        assert!(!check_urls());
    }
}
