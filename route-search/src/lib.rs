//! Timetable search: the indexed feed data, the connection array derived
//! from it for a travel date, and the K-best connection scan over that array.

pub mod arena;
pub mod connections;
pub mod csa;
pub mod journey;
pub mod search_data;
pub mod time;
