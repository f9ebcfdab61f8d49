use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use log::debug;
use route_search::connections::ConnectionArray;
use route_search::csa::{self, CancelToken, SearchError};
use route_search::journey::Journey;
use route_search::search_data::{SearchData, ServiceId, StopId};
use route_search::time::Time;
use thiserror::Error;

use crate::names::StationIndex;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("no station matches {0:?}")]
    StopNotFound(String),
    #[error("start and destination resolve to the same stop")]
    SameEndpoints,
    #[error("invalid travel date {0:?}")]
    BadDate(String),
    #[error("invalid departure time {0:?}")]
    BadTime(String),
    #[error("no route found")]
    NoRoute,
    #[error("the query was cancelled")]
    Cancelled,
}

impl From<SearchError> for PlanError {
    fn from(err: SearchError) -> PlanError {
        match err {
            SearchError::Cancelled => PlanError::Cancelled,
        }
    }
}

/// A loaded timetable ready to answer queries.
///
/// Shared-read: `&Planner` can be queried from any number of threads, each
/// query builds and drops its own connection array and label store. The one
/// shared mutable structure is the per-date service memo; a losing writer on
/// a race recomputes an identical set, so last-wins is fine.
pub struct Planner {
    data: SearchData,
    names: StationIndex,
    service_memo: RwLock<HashMap<NaiveDate, Arc<HashSet<ServiceId>>>>,
}

impl Planner {
    pub fn new(data: SearchData) -> Planner {
        let names = StationIndex::new(&data);
        Planner {
            data,
            names,
            service_memo: RwLock::new(HashMap::new()),
        }
    }

    pub fn data(&self) -> &SearchData {
        &self.data
    }

    pub fn names(&self) -> &StationIndex {
        &self.names
    }

    /// Services running on the date, memoized for the planner's lifetime
    pub fn active_services(&self, date: NaiveDate) -> Arc<HashSet<ServiceId>> {
        if let Some(memoized) = self
            .service_memo
            .read()
            .ok()
            .and_then(|memo| memo.get(&date).cloned())
        {
            return memoized;
        }
        let computed = Arc::new(self.data.services_active_on(date));
        match self.service_memo.write() {
            Ok(mut memo) => memo.entry(date).or_insert(computed).clone(),
            Err(_) => computed,
        }
    }

    /// Up to `count` fastest itineraries between two named stations,
    /// departing `date_str` at or after `time_str`
    pub fn plan(
        &self,
        start_name: &str,
        end_name: &str,
        date_str: &str,
        time_str: &str,
        count: usize,
    ) -> Result<Vec<Journey>, PlanError> {
        self.plan_cancellable(start_name, end_name, date_str, time_str, count, &CancelToken::new())
    }

    /// As `plan`, aborting with `Cancelled` once the token is set
    pub fn plan_cancellable(
        &self,
        start_name: &str,
        end_name: &str,
        date_str: &str,
        time_str: &str,
        count: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<Journey>, PlanError> {
        let start = self
            .names
            .resolve_exact(start_name)
            .ok_or_else(|| PlanError::StopNotFound(start_name.to_owned()))?;
        let end = self
            .names
            .resolve_exact(end_name)
            .ok_or_else(|| PlanError::StopNotFound(end_name.to_owned()))?;
        self.run(start, end, date_str, time_str, count, cancel)
    }

    /// As `plan`, addressing the endpoints by their feed stop identifiers
    pub fn plan_by_id(
        &self,
        start_id: &str,
        end_id: &str,
        date_str: &str,
        time_str: &str,
        count: usize,
    ) -> Result<Vec<Journey>, PlanError> {
        let start = self
            .data
            .lookup_stop(start_id)
            .ok_or_else(|| PlanError::StopNotFound(start_id.to_owned()))?;
        let end = self
            .data
            .lookup_stop(end_id)
            .ok_or_else(|| PlanError::StopNotFound(end_id.to_owned()))?;
        self.run(start, end, date_str, time_str, count, &CancelToken::new())
    }

    fn run(
        &self,
        start: StopId,
        end: StopId,
        date_str: &str,
        time_str: &str,
        count: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<Journey>, PlanError> {
        if start == end {
            return Err(PlanError::SameEndpoints);
        }
        let date =
            parse_query_date(date_str).ok_or_else(|| PlanError::BadDate(date_str.to_owned()))?;
        let departure =
            parse_query_time(time_str).ok_or_else(|| PlanError::BadTime(time_str.to_owned()))?;

        let services = self.active_services(date);
        let connections = ConnectionArray::build(&self.data, &services, departure);
        debug!("{} connections to scan on {}", connections.len(), date);
        let origins = self.data.expand(start);
        let destinations = self.data.expand(end);
        let journeys = csa::search(
            &self.data,
            &connections,
            &origins,
            &destinations,
            departure,
            count,
            cancel,
        )?;
        if journeys.is_empty() {
            return Err(PlanError::NoRoute);
        }
        Ok(journeys)
    }
}

/// Travel dates are accepted as `YYYY-MM-DD` or `YYYYMMDD`
fn parse_query_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.len() == 8 && input.bytes().all(|b| b.is_ascii_digit()) {
        NaiveDate::parse_from_str(input, "%Y%m%d").ok()
    } else {
        NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()
    }
}

fn parse_query_time(input: &str) -> Option<Time> {
    input.trim().parse().ok()
}

#[cfg(test)]
mod test {
    use super::*;
    use route_search::search_data::Builder;
    use std::thread;

    fn time(input: &str) -> Time {
        input.parse().unwrap()
    }

    /// Aarau -> Bern Gleis 1 -> Chur, running every day of December 2025
    fn planner() -> Planner {
        let mut builder = Builder::new();
        let a = builder.stop_id("A");
        let station = builder.stop_id("B");
        let platform = builder.stop_id("B1");
        let c = builder.stop_id("C");
        builder.add_stop(a, "Aarau".into(), None);
        builder.add_stop(station, "Bern".into(), None);
        builder.add_stop(platform, "Bern Gleis 1".into(), Some(station));
        builder.add_stop(c, "Chur".into(), None);
        let service = builder.service_id("S1");
        builder.add_service(
            service,
            0b0111_1111,
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        );
        let trip = builder.trip_id("T1");
        builder.add_trip(trip, service, "IC 1".into());
        builder.add_stop_time(trip, 1, a, time("8:00"), time("8:00"));
        builder.add_stop_time(trip, 2, platform, time("8:30"), time("8:32"));
        builder.add_stop_time(trip, 3, c, time("9:10"), time("9:10"));
        Planner::new(builder.build())
    }

    #[test]
    fn plans_between_named_stations() {
        let planner = planner();
        let journeys = planner.plan("Aarau", "Chur", "2025-12-15", "08:00", 1).unwrap();
        assert_eq!(journeys.len(), 1);
        assert_eq!(journeys[0].segments[0].board_stop_name, "Aarau");
        assert_eq!(journeys[0].arrival(), time("9:10"));
    }

    #[test]
    fn both_date_formats_are_accepted() {
        let planner = planner();
        let dashed = planner.plan("Aarau", "Chur", "2025-12-15", "08:00", 1).unwrap();
        let compact = planner.plan("Aarau", "Chur", "20251215", "08:00", 1).unwrap();
        assert_eq!(dashed, compact);
    }

    #[test]
    fn platform_queries_use_the_station_equivalence() {
        let planner = planner();
        // station name resolves to the station id, the ride alights at the platform
        let journeys = planner.plan("Aarau", "Bern", "2025-12-15", "08:00", 1).unwrap();
        assert_eq!(journeys[0].segments[0].alight_stop, "B1");
        // the same query by platform id
        let by_id = planner.plan_by_id("A", "B1", "2025-12-15", "08:00", 1).unwrap();
        assert_eq!(by_id, journeys);
    }

    #[test]
    fn error_kinds() {
        let planner = planner();
        assert_eq!(
            planner.plan("Nirgendwo", "Chur", "2025-12-15", "08:00", 1),
            Err(PlanError::StopNotFound("Nirgendwo".into()))
        );
        assert_eq!(
            planner.plan("Aarau", "Aarau", "2025-12-15", "08:00", 1),
            Err(PlanError::SameEndpoints)
        );
        assert_eq!(
            planner.plan("Aarau", "Chur", "am Montag", "08:00", 1),
            Err(PlanError::BadDate("am Montag".into()))
        );
        assert_eq!(
            planner.plan("Aarau", "Chur", "2025-12-15", "viertel vor", 1),
            Err(PlanError::BadTime("viertel vor".into()))
        );
        // the trip has left for the day
        assert_eq!(
            planner.plan("Aarau", "Chur", "2025-12-15", "10:00", 1),
            Err(PlanError::NoRoute)
        );
        // out of the calendar range
        assert_eq!(
            planner.plan("Aarau", "Chur", "2026-06-01", "08:00", 1),
            Err(PlanError::NoRoute)
        );
    }

    #[test]
    fn inactive_services_never_appear_in_results() {
        let mut builder = Builder::new();
        let a = builder.stop_id("A");
        let c = builder.stop_id("C");
        builder.add_stop(a, "Aarau".into(), None);
        builder.add_stop(c, "Chur".into(), None);
        let daily = builder.service_id("DAILY");
        let saturday = builder.service_id("SAT");
        builder.add_service(
            daily,
            0b0111_1111,
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        );
        builder.add_service(
            saturday,
            route_search::search_data::weekday_bit(chrono::Weekday::Sat),
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        );
        let slow = builder.trip_id("T-slow");
        builder.add_trip(slow, daily, "IR 36".into());
        builder.add_stop_time(slow, 1, a, time("8:10"), time("8:10"));
        builder.add_stop_time(slow, 2, c, time("9:30"), time("9:30"));
        let fast = builder.trip_id("T-fast");
        builder.add_trip(fast, saturday, "IC 1".into());
        builder.add_stop_time(fast, 1, a, time("8:00"), time("8:00"));
        builder.add_stop_time(fast, 2, c, time("8:45"), time("8:45"));
        let planner = Planner::new(builder.build());

        // Monday: the faster Saturday-only trip must not be used
        let monday = planner.plan("Aarau", "Chur", "2025-12-15", "08:00", 3).unwrap();
        assert_eq!(monday.len(), 1);
        assert_eq!(monday[0].segments[0].trip_id, "T-slow");
        // Saturday: it is
        let saturday = planner.plan("Aarau", "Chur", "2025-12-20", "08:00", 1).unwrap();
        assert_eq!(saturday[0].segments[0].trip_id, "T-fast");
    }

    #[test]
    fn cancelled_token_surfaces_as_cancelled() {
        let planner = planner();
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(
            planner.plan_cancellable("Aarau", "Chur", "2025-12-15", "08:00", 1, &token),
            Err(PlanError::Cancelled)
        );
    }

    #[test]
    fn repeated_queries_are_identical() {
        let planner = planner();
        let first = planner.plan("Aarau", "Chur", "2025-12-15", "08:00", 3);
        let second = planner.plan("Aarau", "Chur", "2025-12-15", "08:00", 3);
        assert_eq!(first, second);
    }

    #[test]
    fn queries_run_in_parallel_over_a_shared_planner() {
        let planner = Arc::new(planner());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let planner = planner.clone();
                thread::spawn(move || planner.plan("Aarau", "Chur", "2025-12-15", "08:00", 2))
            })
            .collect();
        let baseline = planner.plan("Aarau", "Chur", "2025-12-15", "08:00", 2);
        for worker in workers {
            assert_eq!(worker.join().unwrap(), baseline);
        }
    }

    #[test]
    fn service_memo_returns_the_same_set() {
        let planner = planner();
        let date = NaiveDate::from_ymd_opt(2025, 12, 15).unwrap();
        let first = planner.active_services(date);
        let second = planner.active_services(date);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 1);
    }
}
