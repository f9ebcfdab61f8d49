use std::collections::HashMap;

use lazysort::SortedBy;
use route_search::search_data::{SearchData, StopId};
use route_search::time::{Duration, Time};

/// The fastest first-to-last-stop run among all trips departing in one hour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourlyFastest {
    pub departure_hour: u32,
    pub duration: Duration,
    pub route_name: String,
}

/// For every departure hour, the direct connection (one trip, first stop to
/// last stop) with the shortest running time. Hours run past 23 for trips
/// departing after midnight of their service day.
pub fn fastest_direct_per_hour(data: &SearchData) -> Vec<HourlyFastest> {
    let mut best: HashMap<u32, (Duration, &str)> = HashMap::new();
    for trip in data.trips_in_order() {
        if trip.stop_times.len() < 2 {
            continue;
        }
        let (first, last) = match (trip.stop_times.first(), trip.stop_times.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => continue,
        };
        let duration = last.arrival - first.departure;
        let hour = first.departure.hour();
        let entry = best
            .entry(hour)
            .or_insert((duration, trip.route_name.as_str()));
        if duration < entry.0 {
            *entry = (duration, trip.route_name.as_str());
        }
    }
    let mut rows: Vec<HourlyFastest> = best
        .into_iter()
        .map(|(departure_hour, (duration, route_name))| HourlyFastest {
            departure_hour,
            duration,
            route_name: route_name.to_owned(),
        })
        .collect();
    rows.sort_by_key(|row| row.departure_hour);
    rows
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopFrequency {
    pub stop_name: String,
    pub visits: usize,
}

/// The `limit` stops called at most often across the whole timetable
pub fn most_frequented_stops(data: &SearchData, limit: usize) -> Vec<StopFrequency> {
    let mut counts: HashMap<StopId, usize> = HashMap::new();
    for trip in data.trips_in_order() {
        for stop_time in &trip.stop_times {
            *counts.entry(stop_time.stop).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .map(|(stop, visits)| (data.stop_name(stop).to_owned(), visits))
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .take(limit)
        .map(|(stop_name, visits)| StopFrequency { stop_name, visits })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OvernightStopTime {
    pub trip_id: String,
    pub stop_name: String,
    pub arrival: Time,
    pub departure: Time,
    pub route_name: String,
}

/// Calls touching the next service day: an arrival at or past 24:00, or the
/// odd feed row whose arrival lies after its own departure. At most `limit`
/// rows, in timetable order.
pub fn overnight_stop_times(data: &SearchData, limit: usize) -> Vec<OvernightStopTime> {
    let mut rows = Vec::new();
    if limit == 0 {
        return rows;
    }
    'trips: for trip in data.trips_in_order() {
        for stop_time in &trip.stop_times {
            if stop_time.arrival.is_next_day() || stop_time.arrival < stop_time.departure {
                rows.push(OvernightStopTime {
                    trip_id: trip.gtfs_id.clone(),
                    stop_name: data.stop_name(stop_time.stop).to_owned(),
                    arrival: stop_time.arrival,
                    departure: stop_time.departure,
                    route_name: trip.route_name.clone(),
                });
                if rows.len() == limit {
                    break 'trips;
                }
            }
        }
    }
    rows
}

#[cfg(test)]
mod test {
    use super::*;
    use route_search::search_data::Builder;

    fn time(input: &str) -> Time {
        input.parse().unwrap()
    }

    fn data() -> SearchData {
        let mut builder = Builder::new();
        let a = builder.stop_id("A");
        let b = builder.stop_id("B");
        let c = builder.stop_id("C");
        builder.add_stop(a, "Aarau".into(), None);
        builder.add_stop(b, "Bern".into(), None);
        builder.add_stop(c, "Chur".into(), None);
        let service = builder.service_id("S");
        let slow = builder.trip_id("T-slow");
        builder.add_trip(slow, service, "R 7".into());
        builder.add_stop_time(slow, 1, a, time("8:00"), time("8:00"));
        builder.add_stop_time(slow, 2, b, time("8:40"), time("8:41"));
        builder.add_stop_time(slow, 3, c, time("9:20"), time("9:20"));
        let fast = builder.trip_id("T-fast");
        builder.add_trip(fast, service, "IC 1".into());
        builder.add_stop_time(fast, 1, a, time("8:30"), time("8:30"));
        builder.add_stop_time(fast, 2, c, time("9:10"), time("9:10"));
        let night = builder.trip_id("T-night");
        builder.add_trip(night, service, "N 3".into());
        builder.add_stop_time(night, 1, b, time("23:50"), time("23:50"));
        builder.add_stop_time(night, 2, c, time("25:10"), time("25:12"));
        builder.build()
    }

    #[test]
    fn fastest_direct_picks_the_quickest_trip_per_hour() {
        let rows = fastest_direct_per_hour(&data());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].departure_hour, 8);
        assert_eq!(rows[0].duration, Duration::minutes(40));
        assert_eq!(rows[0].route_name, "IC 1");
        assert_eq!(rows[1].departure_hour, 23);
        assert_eq!(rows[1].route_name, "N 3");
    }

    #[test]
    fn most_frequented_counts_calls_and_truncates() {
        let rows = most_frequented_stops(&data(), 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].stop_name, "Chur");
        assert_eq!(rows[0].visits, 3);
        // Aarau and Bern are both visited twice; the tie breaks by name
        assert_eq!(rows[1].stop_name, "Aarau");
    }

    #[test]
    fn overnight_rows_are_those_past_midnight() {
        let rows = overnight_stop_times(&data(), 100);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].trip_id, "T-night");
        assert_eq!(rows[0].stop_name, "Chur");
        assert_eq!(rows[0].arrival, time("25:10"));
        assert!(overnight_stop_times(&data(), 0).is_empty());
    }
}
