use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::arena::{Arena, ArenaIndex};
use crate::connections::ConnectionArray;
use crate::journey::{Journey, RideSegment};
use crate::search_data::{SearchData, StopId, TripId};
use crate::time::{Duration, Time};

/// Connections scanned between two cancellation checks
const CANCEL_CHECK_INTERVAL: usize = 1 << 16;

/// Shared flag for cooperative cancellation of a running scan
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("the search was cancelled")]
    Cancelled,
}

/// One way of reaching `stop`: when, and via which connection from which
/// predecessor label. Labels are only ever appended, so back references
/// always point at older entries of the arena and the chains form a DAG.
struct Label {
    stop: StopId,
    arrival: Time,
    back: Option<ArenaIndex<Label>>,
    trip: Option<TripId>,
    board_stop: StopId,
    board_time: Time,
}

/// A ride over one or more consecutive connections of the same trip,
/// still in dense-id form
struct MergedRide {
    trip: TripId,
    board_stop: StopId,
    board_time: Time,
    alight_stop: StopId,
    alight_time: Time,
}

/// Find up to `k` distinct itineraries from any of `origins` to any of
/// `destinations`, departing at or after `t_start`.
///
/// A single forward pass over the connection array keeps up to
/// `max(8, 3k)` labels per stop instead of a single earliest arrival, which
/// preserves enough alternatives to recover `k` distinct full itineraries
/// afterwards. Itineraries are returned in order of arrival.
pub fn search(
    data: &SearchData,
    connections: &ConnectionArray,
    origins: &[StopId],
    destinations: &[StopId],
    t_start: Time,
    k: usize,
    cancel: &CancelToken,
) -> Result<Vec<Journey>, SearchError> {
    let mut scan = Scan::new(data, destinations, k.max(1));
    for &origin in origins {
        scan.insert(Label {
            stop: origin,
            arrival: t_start,
            back: None,
            trip: None,
            board_stop: origin,
            board_time: t_start,
        });
    }
    scan.run(connections, cancel)?;
    Ok(scan.into_journeys())
}

struct Scan<'r> {
    data: &'r SearchData,
    destinations: HashSet<StopId>,
    /// Labels kept per stop
    bound: usize,
    k: usize,
    arena: Arena<Label>,
    stop_labels: HashMap<StopId, Vec<ArenaIndex<Label>>>,
    /// Arrival times of every label currently stored at a destination stop,
    /// sorted ascending; its k-th entry bounds the scan
    dest_arrivals: Vec<Time>,
}

impl<'r> Scan<'r> {
    fn new(data: &'r SearchData, destinations: &[StopId], k: usize) -> Scan<'r> {
        Scan {
            data,
            destinations: destinations.iter().copied().collect(),
            bound: (3 * k).max(8),
            k,
            arena: Arena::new(),
            stop_labels: HashMap::new(),
            dest_arrivals: Vec::new(),
        }
    }

    fn run(&mut self, connections: &ConnectionArray, cancel: &CancelToken) -> Result<(), SearchError> {
        let mut boardable: Vec<ArenaIndex<Label>> = Vec::new();
        for i in 0..connections.len() {
            if i % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return Err(SearchError::Cancelled);
            }
            let dep_time = connections.dep_time[i];
            if let Some(kth) = self.kth_destination_arrival() {
                // every later connection departs later still and cannot
                // improve on the k best arrivals already found
                if dep_time > kth {
                    break;
                }
            }
            let dep_stop = connections.dep_stop[i];
            boardable.clear();
            if let Some(labels) = self.stop_labels.get(&dep_stop) {
                for &id in labels {
                    if self.arena[id].arrival <= dep_time {
                        boardable.push(id);
                    } else {
                        break;
                    }
                }
            }
            if boardable.is_empty() {
                continue;
            }
            let arr_stop = connections.arr_stop[i];
            let arr_time = connections.arr_time[i];
            let trip = connections.trip[i];
            for &back in &boardable {
                self.insert(Label {
                    stop: arr_stop,
                    arrival: arr_time,
                    back: Some(back),
                    trip: Some(trip),
                    board_stop: dep_stop,
                    board_time: dep_time,
                });
            }
        }
        Ok(())
    }

    fn kth_destination_arrival(&self) -> Option<Time> {
        self.dest_arrivals.get(self.k - 1).copied()
    }

    /// Store a label in its stop's bounded list, keeping the list sorted by
    /// arrival and dropping exact duplicates and labels worse than the
    /// stored worst once the list is full
    fn insert(&mut self, label: Label) -> bool {
        let arena = &mut self.arena;
        let list = self.stop_labels.entry(label.stop).or_insert_with(Vec::new);
        if list.len() >= self.bound {
            if let Some(&worst) = list.last() {
                if label.arrival >= arena[worst].arrival {
                    return false;
                }
            }
        }
        for &id in list.iter() {
            let existing = &arena[id];
            if existing.arrival > label.arrival {
                break;
            }
            if existing.arrival == label.arrival
                && existing.trip == label.trip
                && existing.board_stop == label.board_stop
                && existing.board_time == label.board_time
                && existing.back == label.back
            {
                return false;
            }
        }
        let at_destination = self.destinations.contains(&label.stop);
        let arrival = label.arrival;
        let position = list.partition_point(|&id| arena[id].arrival <= arrival);
        let id = arena.alloc(label);
        list.insert(position, id);
        let mut evicted_arrival = None;
        if list.len() > self.bound {
            if let Some(evicted) = list.pop() {
                evicted_arrival = Some(arena[evicted].arrival);
            }
        }
        if at_destination {
            let at = self.dest_arrivals.partition_point(|&t| t <= arrival);
            self.dest_arrivals.insert(at, arrival);
            if let Some(evicted) = evicted_arrival {
                if let Ok(at) = self.dest_arrivals.binary_search(&evicted) {
                    self.dest_arrivals.remove(at);
                }
            }
        }
        true
    }

    /// Reconstruct itineraries from the labels stored at the destinations,
    /// earliest arrival first, dropping duplicates, until `k` are found
    fn into_journeys(self) -> Vec<Journey> {
        let mut finals: Vec<ArenaIndex<Label>> = Vec::new();
        for destination in &self.destinations {
            if let Some(labels) = self.stop_labels.get(destination) {
                finals.extend(labels.iter().copied());
            }
        }
        finals.sort_by_key(|&id| (self.arena[id].arrival, id.index()));

        let mut journeys = Vec::new();
        let mut seen: HashSet<Vec<(StopId, StopId, Time, Time)>> = HashSet::new();
        let mut visited = vec![false; self.arena.len()];
        for id in finals {
            if journeys.len() >= self.k {
                break;
            }
            let hops = match self.chain(id, &mut visited) {
                Some(hops) => hops,
                None => continue,
            };
            let rides = merge_hops(&self.arena, &hops);
            if rides.is_empty() {
                continue;
            }
            let key: Vec<_> = rides
                .iter()
                .map(|ride| (ride.board_stop, ride.alight_stop, ride.board_time, ride.alight_time))
                .collect();
            if !seen.insert(key) {
                continue;
            }
            journeys.push(self.to_journey(&rides));
        }
        journeys
    }

    /// Follow back references to the origin sentinel and return the riding
    /// labels in travel order. A revisited label means the chain is
    /// circular, which the append-only arena rules out, so such a chain is
    /// abandoned rather than followed forever.
    fn chain(
        &self,
        id: ArenaIndex<Label>,
        visited: &mut Vec<bool>,
    ) -> Option<Vec<ArenaIndex<Label>>> {
        let mut hops = Vec::new();
        let mut touched = Vec::new();
        let mut current = id;
        let complete = loop {
            if visited[current.index()] {
                break false;
            }
            visited[current.index()] = true;
            touched.push(current.index());
            match self.arena[current].back {
                Some(back) => {
                    hops.push(current);
                    current = back;
                }
                None => break true,
            }
        };
        for index in touched {
            visited[index] = false;
        }
        if !complete {
            return None;
        }
        hops.reverse();
        Some(hops)
    }

    fn to_journey(&self, rides: &[MergedRide]) -> Journey {
        let mut segments = Vec::with_capacity(rides.len());
        let mut previous: Option<&MergedRide> = None;
        for ride in rides {
            let wait = match previous {
                Some(prev) if prev.alight_stop == ride.board_stop => {
                    ride.board_time - prev.alight_time
                }
                _ => Duration::zero(),
            };
            let (trip_id, route_name) = match self.data.get_trip(ride.trip) {
                Some(trip) => (trip.gtfs_id.clone(), trip.route_name.clone()),
                None => (String::new(), String::new()),
            };
            segments.push(RideSegment {
                trip_id,
                route_name,
                board_stop: self.data.stop_gtfs_id(ride.board_stop).to_owned(),
                board_stop_name: self.data.stop_name(ride.board_stop).to_owned(),
                board_time: ride.board_time,
                alight_stop: self.data.stop_gtfs_id(ride.alight_stop).to_owned(),
                alight_stop_name: self.data.stop_name(ride.alight_stop).to_owned(),
                alight_time: ride.alight_time,
                wait,
            });
            previous = Some(ride);
        }
        Journey { segments }
    }
}

/// Collapse consecutive hops of the same trip into single rides. Hops merge
/// only while they chain exactly: the earlier hop alights where and before
/// the later one boards.
fn merge_hops(arena: &Arena<Label>, hops: &[ArenaIndex<Label>]) -> Vec<MergedRide> {
    let mut rides: Vec<MergedRide> = Vec::new();
    for &id in hops {
        let hop = &arena[id];
        let trip = match hop.trip {
            Some(trip) => trip,
            None => continue,
        };
        if let Some(ride) = rides.last_mut() {
            if ride.trip == trip
                && ride.alight_stop == hop.board_stop
                && ride.alight_time <= hop.board_time
            {
                ride.alight_stop = hop.stop;
                ride.alight_time = hop.arrival;
                continue;
            }
        }
        rides.push(MergedRide {
            trip,
            board_stop: hop.board_stop,
            board_time: hop.board_time,
            alight_stop: hop.stop,
            alight_time: hop.arrival,
        });
    }
    rides
}
