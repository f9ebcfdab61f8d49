//! OptimalRoute.CH - journey planning over a GTFS timetable.
//!
//! The feed is read once into memory ([`gtfs::db::load_data`]), wrapped in a
//! [`planner::Planner`] and then queried concurrently: each query builds the
//! connection array for its travel date and runs a K-best connection scan
//! over it (both live in the `route-search` crate).

pub mod analysis;
pub mod format;
pub mod gtfs;
pub mod names;
pub mod planner;
