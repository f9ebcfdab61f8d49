use std::collections::HashSet;

use log::debug;

use crate::search_data::{SearchData, ServiceId, StopId, TripId};
use crate::time::Time;

/// An elementary hop between two consecutive calls of one trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub trip: TripId,
    pub dep_stop: StopId,
    pub arr_stop: StopId,
    pub dep_time: Time,
    pub arr_time: Time,
}

/// All elementary connections of one travel date, sorted by departure time.
///
/// Stored as parallel columns: the scan reads stop ids and times for almost
/// every connection and the trip id only when a label is actually extended,
/// so keeping the fields apart keeps the hot part of each row small.
#[derive(Debug, Default)]
pub struct ConnectionArray {
    pub(crate) trip: Vec<TripId>,
    pub(crate) dep_stop: Vec<StopId>,
    pub(crate) arr_stop: Vec<StopId>,
    pub(crate) dep_time: Vec<Time>,
    pub(crate) arr_time: Vec<Time>,
}

impl ConnectionArray {
    /// Materialize the connections of every trip running one of `services`,
    /// dropping hops that do not advance in time and hops departing before
    /// `t_start`. Dropping early is sound because the scan never creates a
    /// label arriving before `t_start`.
    pub fn build(data: &SearchData, services: &HashSet<ServiceId>, t_start: Time) -> ConnectionArray {
        let mut array = ConnectionArray::default();
        for trip in data.trips_in_order() {
            if !services.contains(&trip.service_id) {
                continue;
            }
            for window in trip.stop_times.windows(2) {
                let (from, to) = (&window[0], &window[1]);
                if to.arrival <= from.departure {
                    continue;
                }
                if from.departure < t_start {
                    continue;
                }
                array.trip.push(trip.trip_id);
                array.dep_stop.push(from.stop);
                array.arr_stop.push(to.stop);
                array.dep_time.push(from.departure);
                array.arr_time.push(to.arrival);
            }
        }
        array.sort_by_departure();
        debug!(
            "built {} connections for {} active services",
            array.len(),
            services.len()
        );
        array
    }

    /// Stable sort of all columns by departure time; ties keep trip order
    fn sort_by_departure(&mut self) {
        let mut order: Vec<u32> = (0..self.len() as u32).collect();
        let dep_time = &self.dep_time;
        order.sort_by_key(|&i| dep_time[i as usize]);
        self.trip = permute(&self.trip, &order);
        self.dep_stop = permute(&self.dep_stop, &order);
        self.arr_stop = permute(&self.arr_stop, &order);
        self.dep_time = permute(&self.dep_time, &order);
        self.arr_time = permute(&self.arr_time, &order);
    }

    pub fn len(&self) -> usize {
        self.dep_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dep_time.is_empty()
    }

    pub fn get(&self, index: usize) -> Connection {
        Connection {
            trip: self.trip[index],
            dep_stop: self.dep_stop[index],
            arr_stop: self.arr_stop[index],
            dep_time: self.dep_time[index],
            arr_time: self.arr_time[index],
        }
    }
}

fn permute<T: Copy>(column: &[T], order: &[u32]) -> Vec<T> {
    order.iter().map(|&i| column[i as usize]).collect()
}
