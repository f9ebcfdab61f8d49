use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate, Weekday};
use lasso::{Key, Rodeo, Spur};

use crate::time::Time;

pub type StopId = u32;
pub type TripId = u32;
pub type ServiceId = u32;

/// A stop of the feed. A stop carrying a parent link is a platform; a stop
/// referenced as a parent is a station. Parent links never chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stop {
    pub stop_id: StopId,
    pub stop_name: String,
    pub parent_station: Option<StopId>,
}

impl Stop {
    /// The station this stop belongs to: its parent, or itself
    pub fn station_id(&self) -> StopId {
        self.parent_station.unwrap_or(self.stop_id)
    }
}

/// Scheduled call of a trip at one stop, ordered by `stop_sequence`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopTime {
    pub stop_sequence: u32,
    pub stop: StopId,
    pub arrival: Time,
    pub departure: Time,
}

/// A vehicle journey with its calls, carrying the display name of its line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    pub trip_id: TripId,
    pub gtfs_id: String,
    pub service_id: ServiceId,
    pub route_name: String,
    pub stop_times: Vec<StopTime>,
}

/// One calendar row: a service's regular weekday pattern within a date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Service {
    pub service_id: ServiceId,
    weekdays: u8,
    start: NaiveDate,
    end: NaiveDate,
}

impl Service {
    pub fn runs_on(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end && self.weekdays & weekday_bit(date.weekday()) != 0
    }
}

/// Bit of the weekday mask, Monday is the lowest bit
pub fn weekday_bit(weekday: Weekday) -> u8 {
    1 << weekday.num_days_from_monday()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    Added,
    Removed,
}

/// Parsed and indexed feed data, immutable once built.
///
/// Stop and trip identifiers are interned to dense integers so that the
/// connection scan touches integers only; the original feed strings are
/// resolved back during itinerary reconstruction.
pub struct SearchData {
    stop_interner: Rodeo,
    stops: HashMap<StopId, Stop>,
    stop_order: Vec<StopId>,
    children: HashMap<StopId, Vec<StopId>>,
    trips: HashMap<TripId, Trip>,
    trip_order: Vec<TripId>,
    services: Vec<Service>,
    added: HashMap<NaiveDate, HashSet<ServiceId>>,
    removed: HashMap<NaiveDate, HashSet<ServiceId>>,
}

impl SearchData {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn get_stop(&self, stop: StopId) -> Option<&Stop> {
        self.stops.get(&stop)
    }

    pub fn get_trip(&self, trip: TripId) -> Option<&Trip> {
        self.trips.get(&trip)
    }

    /// Stops in feed file order
    pub fn stops_in_order(&self) -> impl Iterator<Item = &Stop> {
        self.stop_order.iter().filter_map(move |id| self.stops.get(id))
    }

    /// Trips in feed file order
    pub fn trips_in_order(&self) -> impl Iterator<Item = &Trip> {
        self.trip_order.iter().filter_map(move |id| self.trips.get(id))
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn trip_count(&self) -> usize {
        self.trips.len()
    }

    /// Display name of a stop, empty for ids without a stops row
    pub fn stop_name(&self, stop: StopId) -> &str {
        self.stops.get(&stop).map(|s| s.stop_name.as_str()).unwrap_or("")
    }

    /// The feed's identifier string for an interned stop id
    pub fn stop_gtfs_id(&self, stop: StopId) -> &str {
        Spur::try_from_usize(stop as usize)
            .and_then(|spur| self.stop_interner.try_resolve(&spur))
            .unwrap_or("")
    }

    /// Dense id of a feed stop identifier, if it appeared anywhere in the feed
    pub fn lookup_stop(&self, gtfs_id: &str) -> Option<StopId> {
        self.stop_interner
            .get(gtfs_id.trim())
            .map(|spur| spur.into_usize() as StopId)
    }

    /// The endpoint equivalence class of a stop: its station followed by all
    /// of the station's platforms, in feed order
    pub fn expand(&self, stop: StopId) -> Vec<StopId> {
        let station = self
            .stops
            .get(&stop)
            .map(|s| s.station_id())
            .unwrap_or(stop);
        let mut expanded = vec![station];
        if let Some(platforms) = self.children.get(&station) {
            for &platform in platforms {
                if !expanded.contains(&platform) {
                    expanded.push(platform);
                }
            }
        }
        expanded
    }

    /// Services running on the date: regular calendar hits, plus the added
    /// exceptions, minus the removed ones
    pub fn services_active_on(&self, date: NaiveDate) -> HashSet<ServiceId> {
        let mut active: HashSet<ServiceId> = self
            .services
            .iter()
            .filter(|service| service.runs_on(date))
            .map(|service| service.service_id)
            .collect();
        if let Some(added) = self.added.get(&date) {
            active.extend(added);
        }
        if let Some(removed) = self.removed.get(&date) {
            for service in removed {
                active.remove(service);
            }
        }
        active
    }
}

/// Accumulates feed rows and produces an immutable `SearchData`
pub struct Builder {
    stop_interner: Rodeo,
    trip_interner: Rodeo,
    service_interner: Rodeo,
    stops: HashMap<StopId, Stop>,
    stop_order: Vec<StopId>,
    trips: HashMap<TripId, Trip>,
    trip_order: Vec<TripId>,
    services: Vec<Service>,
    added: HashMap<NaiveDate, HashSet<ServiceId>>,
    removed: HashMap<NaiveDate, HashSet<ServiceId>>,
}

impl Default for Builder {
    fn default() -> Builder {
        Builder {
            stop_interner: Rodeo::default(),
            trip_interner: Rodeo::default(),
            service_interner: Rodeo::default(),
            stops: HashMap::new(),
            stop_order: Vec::new(),
            trips: HashMap::new(),
            trip_order: Vec::new(),
            services: Vec::new(),
            added: HashMap::new(),
            removed: HashMap::new(),
        }
    }
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Intern a feed stop identifier to its dense id
    pub fn stop_id(&mut self, gtfs_id: &str) -> StopId {
        self.stop_interner.get_or_intern(gtfs_id).into_usize() as StopId
    }

    /// Intern a feed trip identifier to its dense id
    pub fn trip_id(&mut self, gtfs_id: &str) -> TripId {
        self.trip_interner.get_or_intern(gtfs_id).into_usize() as TripId
    }

    /// Dense id of a trip already registered via `add_trip`
    pub fn lookup_trip(&self, gtfs_id: &str) -> Option<TripId> {
        self.trip_interner
            .get(gtfs_id)
            .map(|spur| spur.into_usize() as TripId)
            .filter(|id| self.trips.contains_key(id))
    }

    /// Intern a feed service identifier to its dense id
    pub fn service_id(&mut self, gtfs_id: &str) -> ServiceId {
        self.service_interner.get_or_intern(gtfs_id).into_usize() as ServiceId
    }

    /// Register a stop row. The first row wins for duplicated identifiers.
    pub fn add_stop(&mut self, stop_id: StopId, stop_name: String, parent_station: Option<StopId>) {
        if self.stops.contains_key(&stop_id) {
            return;
        }
        self.stops.insert(
            stop_id,
            Stop {
                stop_id,
                stop_name,
                parent_station,
            },
        );
        self.stop_order.push(stop_id);
    }

    pub fn add_service(
        &mut self,
        service_id: ServiceId,
        weekdays: u8,
        start: NaiveDate,
        end: NaiveDate,
    ) {
        self.services.push(Service {
            service_id,
            weekdays,
            start,
            end,
        });
    }

    pub fn add_exception(&mut self, service_id: ServiceId, date: NaiveDate, kind: ExceptionKind) {
        let set = match kind {
            ExceptionKind::Added => self.added.entry(date).or_insert_with(HashSet::new),
            ExceptionKind::Removed => self.removed.entry(date).or_insert_with(HashSet::new),
        };
        set.insert(service_id);
    }

    /// Register a trip row. The first row wins for duplicated identifiers.
    pub fn add_trip(&mut self, trip_id: TripId, service_id: ServiceId, route_name: String) {
        if self.trips.contains_key(&trip_id) {
            return;
        }
        let gtfs_id = Spur::try_from_usize(trip_id as usize)
            .and_then(|spur| self.trip_interner.try_resolve(&spur))
            .unwrap_or("")
            .to_owned();
        self.trips.insert(
            trip_id,
            Trip {
                trip_id,
                gtfs_id,
                service_id,
                route_name,
                stop_times: Vec::new(),
            },
        );
        self.trip_order.push(trip_id);
    }

    /// Append a call to a registered trip; calls for unknown trips are ignored
    pub fn add_stop_time(
        &mut self,
        trip_id: TripId,
        stop_sequence: u32,
        stop: StopId,
        arrival: Time,
        departure: Time,
    ) {
        if let Some(trip) = self.trips.get_mut(&trip_id) {
            trip.stop_times.push(StopTime {
                stop_sequence,
                stop,
                arrival,
                departure,
            });
        }
    }

    pub fn build(mut self) -> SearchData {
        for trip in self.trips.values_mut() {
            trip.stop_times.sort_by_key(|stop_time| stop_time.stop_sequence);
        }
        let mut children: HashMap<StopId, Vec<StopId>> = HashMap::new();
        for stop_id in &self.stop_order {
            if let Some(parent) = self.stops.get(stop_id).and_then(|s| s.parent_station) {
                children.entry(parent).or_insert_with(Vec::new).push(*stop_id);
            }
        }
        SearchData {
            stop_interner: self.stop_interner,
            stops: self.stops,
            stop_order: self.stop_order,
            children,
            trips: self.trips,
            trip_order: self.trip_order,
            services: self.services,
            added: self.added,
            removed: self.removed,
        }
    }
}
