use crate::time::{Duration, Time};

/// One ride on a single trip, from boarding to alighting, with the wait
/// spent at the boarding stop when the ride follows an interchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RideSegment {
    pub trip_id: String,
    pub route_name: String,
    pub board_stop: String,
    pub board_stop_name: String,
    pub board_time: Time,
    pub alight_stop: String,
    pub alight_stop_name: String,
    pub alight_time: Time,
    pub wait: Duration,
}

/// An itinerary: a chronological, non-empty sequence of ride segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Journey {
    pub segments: Vec<RideSegment>,
}

impl Journey {
    /// Departure from the first boarding stop
    pub fn departure(&self) -> Time {
        self.segments.first().map(|s| s.board_time).unwrap_or_default()
    }

    /// Arrival at the final alighting stop
    pub fn arrival(&self) -> Time {
        self.segments.last().map(|s| s.alight_time).unwrap_or_default()
    }

    /// Total travel time including interchange waits
    pub fn duration(&self) -> Duration {
        self.arrival() - self.departure()
    }
}
