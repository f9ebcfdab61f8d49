use serde::Deserialize;

pub mod db;

/// Display name used when a route carries no usable name
pub const UNKNOWN_ROUTE_NAME: &str = "Unbekannt";

#[derive(Debug, Deserialize)]
pub struct Stop {
    // "stop_id","stop_name","parent_station",...
    pub stop_id: String,
    pub stop_name: String,
    pub parent_station: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StopTime {
    // "trip_id","arrival_time","departure_time","stop_id","stop_sequence",...
    pub trip_id: String,
    pub stop_id: String,
    pub stop_sequence: u32,
    #[serde(with = "lenient_time")]
    pub arrival_time: route_search::time::Time,
    #[serde(with = "lenient_time")]
    pub departure_time: route_search::time::Time,
}

#[derive(Debug, Deserialize)]
pub struct Trip {
    // "route_id","service_id","trip_id",...
    pub trip_id: String,
    pub route_id: String,
    pub service_id: String,
}

#[derive(Debug, Deserialize)]
pub struct Route {
    // "route_id","route_short_name","route_long_name",...
    pub route_id: String,
    #[serde(default)]
    pub route_short_name: Option<String>,
    #[serde(default)]
    pub route_long_name: Option<String>,
}

impl Route {
    /// Short name preferred, long name as fallback, `"Unbekannt"` otherwise
    pub fn display_name(&self) -> String {
        for candidate in [&self.route_short_name, &self.route_long_name].iter() {
            if let Some(name) = candidate {
                let name = name.trim();
                if !name.is_empty() {
                    return name.to_owned();
                }
            }
        }
        UNKNOWN_ROUTE_NAME.to_owned()
    }
}

#[derive(Debug, Deserialize)]
pub struct Calendar {
    // "service_id","monday",...,"sunday","start_date","end_date"
    pub service_id: String,
    pub monday: u8,
    pub tuesday: u8,
    pub wednesday: u8,
    pub thursday: u8,
    pub friday: u8,
    pub saturday: u8,
    pub sunday: u8,
    pub start_date: String,
    pub end_date: String,
}

impl Calendar {
    /// The seven weekday columns as a bitmask, Monday lowest
    pub fn weekday_mask(&self) -> u8 {
        let days = [
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
            self.saturday,
            self.sunday,
        ];
        let mut mask = 0;
        for (bit, &runs) in days.iter().enumerate() {
            if runs > 0 {
                mask |= 1 << bit;
            }
        }
        mask
    }
}

#[derive(Debug, Deserialize)]
pub struct CalendarDate {
    // "service_id","date","exception_type"
    pub service_id: String,
    pub date: String,
    pub exception_type: u8,
}

/// Clock strings parse to seconds since service midnight; malformed or empty
/// values become zero so the surrounding row survives, as real feeds are
/// sloppy here
mod lenient_time {
    use route_search::time::Time;
    use serde::{de, Deserializer};
    use std::fmt;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Time, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(LenientTimeVisitor)
    }

    struct LenientTimeVisitor;

    impl<'de> de::Visitor<'de> for LenientTimeVisitor {
        type Value = Time;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "time formatted eg. \"[h]h:mm:ss\"")
        }

        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(s.trim().parse().unwrap_or_default())
        }
    }
}
