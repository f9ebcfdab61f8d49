use std::fmt;
use std::ops::Sub;
use std::str::from_utf8;

use thiserror::Error;

/// Duration in seconds between two timetable events, may be negative
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Duration {
    seconds: i32,
}

impl Duration {
    /// Construct a duration of a number of seconds
    pub fn seconds(seconds: i32) -> Duration {
        Duration { seconds }
    }

    /// Construct a duration of a number of minutes
    pub fn minutes(minutes: i32) -> Duration {
        Duration {
            seconds: minutes * 60,
        }
    }

    pub fn zero() -> Duration {
        Duration { seconds: 0 }
    }

    /// Convert to whole minutes
    pub fn to_mins(self) -> i32 {
        self.seconds / 60
    }

    /// Convert to seconds
    pub fn to_secs(self) -> i32 {
        self.seconds
    }
}

/// Local clock time within a service day, second precision.
///
/// The hour runs past 23 for trips continuing beyond midnight, so `25:10:00`
/// is a valid time and is kept distinct from `01:10:00` of the same day.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Time {
    seconds_since_midnight: u32,
}

impl Time {
    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Time {
        Time {
            seconds_since_midnight: (hours * 60 + minutes) * 60 + seconds,
        }
    }

    pub fn from_seconds(seconds_since_midnight: u32) -> Time {
        Time {
            seconds_since_midnight,
        }
    }

    pub fn midnight() -> Time {
        Time::default()
    }

    pub fn seconds(self) -> u32 {
        self.seconds_since_midnight
    }

    /// get the clock hour, it can be over 23
    pub fn hour(self) -> u32 {
        self.seconds_since_midnight / 60 / 60
    }

    /// get the minute of the hour
    pub fn minute(self) -> u32 {
        (self.seconds_since_midnight / 60) % 60
    }

    /// get the seconds within the minute
    pub fn second(self) -> u32 {
        self.seconds_since_midnight % 60
    }

    /// whether this time lies beyond the service day's midnight
    pub fn is_next_day(self) -> bool {
        self.seconds_since_midnight >= 24 * 3600
    }

    /// `HH:MM` rendering, the hour kept past 23 for overnight times
    pub fn hhmm(self) -> String {
        format!("{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Sub<Time> for Time {
    type Output = Duration;

    /// Subtract two `Time`s, returning the `Duration` between. This assumes
    /// both `Time`s are in the same service day.
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self::Output {
        Duration::seconds(self.seconds_since_midnight as i32 - rhs.seconds_since_midnight as i32)
    }
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}

/// # String representations
/// ```rust
/// use route_search::time::Time;
/// let time: Time = "8:30".parse().unwrap();
/// let time: Time = "08:30".parse().unwrap();
/// let time: Time = "09:00:00".parse().unwrap();
/// let time: Time = "23:59:59".parse().unwrap();
/// let time: Time = "25:00:00".parse().unwrap();
/// ```
impl std::str::FromStr for Time {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.as_bytes();
        let (hh, mm, ss) = match s.len() {
            4 if s[1] == b':' => (&s[0..1], &s[2..4], None),
            5 if s[2] == b':' => (&s[0..2], &s[3..5], None),
            7 if s[1] == b':' && s[4] == b':' => (&s[0..1], &s[2..4], Some(&s[5..7])),
            8 if s[2] == b':' && s[5] == b':' => (&s[0..2], &s[3..5], Some(&s[6..8])),
            _ => return Err(TimeParseError::InvalidFormat),
        };
        let hours: u32 = parse_field(hh)?;
        let minutes: u32 = parse_field(mm)?;
        let seconds: u32 = match ss {
            Some(ss) => parse_field(ss)?,
            None => 0,
        };
        if minutes > 59 || seconds > 59 {
            return Err(TimeParseError::OutOfRange);
        }
        Ok(Time::from_hms(hours, minutes, seconds))
    }
}

fn parse_field(field: &[u8]) -> Result<u32, TimeParseError> {
    let digits = from_utf8(field).map_err(|_| TimeParseError::InvalidFormat)?;
    Ok(digits.parse()?)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("time should use the format H[H]:MM[:SS], eg. 8:30 or 23:59:59")]
    InvalidFormat,
    #[error("maximum minutes or seconds is 59")]
    OutOfRange,
    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),
}

#[cfg(test)]
mod test {
    use super::{Duration, Time};

    #[test]
    fn hms_times() {
        assert_eq!(Time::from_hms(12, 59, 59), "12:59:59".parse().unwrap());
        assert_eq!(Time::from_hms(8, 30, 0), "8:30".parse().unwrap());
        assert_eq!(Time::from_seconds(90_600), "25:10".parse().unwrap());
    }

    #[test]
    fn subtract_times() {
        assert_eq!(
            "12:00:15".parse::<Time>().unwrap() - "12:00:00".parse::<Time>().unwrap(),
            Duration::seconds(15)
        );
        assert_eq!(
            "12:00:00".parse::<Time>().unwrap() - "12:00:15".parse::<Time>().unwrap(),
            Duration::seconds(-15)
        );
        assert_eq!(
            "25:10".parse::<Time>().unwrap() - "23:50".parse::<Time>().unwrap(),
            Duration::minutes(80)
        );
    }

    #[test]
    fn parse_and_to_string() {
        assert_eq!("00:00:00".parse::<Time>().unwrap().to_string(), "00:00:00");
        assert_eq!("23:59:59".parse::<Time>().unwrap().to_string(), "23:59:59");
        assert_eq!("24:00:00".parse::<Time>().unwrap().to_string(), "24:00:00");
        assert_eq!("25:00:00".parse::<Time>().unwrap().to_string(), "25:00:00");
        assert_eq!("5:00:00".parse::<Time>().unwrap().to_string(), "05:00:00");
        assert_eq!("5:07".parse::<Time>().unwrap().to_string(), "05:07:00");
    }

    /// `hhmm` keeps the `HH:MM` prefix below 24h and the raw hour above it
    #[test]
    fn hhmm_rendering() {
        assert_eq!("08:30:59".parse::<Time>().unwrap().hhmm(), "08:30");
        assert_eq!("9:05".parse::<Time>().unwrap().hhmm(), "09:05");
        assert_eq!("23:59:59".parse::<Time>().unwrap().hhmm(), "23:59");
        assert_eq!("25:10:00".parse::<Time>().unwrap().hhmm(), "25:10");
        assert!(!"23:59:59".parse::<Time>().unwrap().is_next_day());
        assert!("24:00:00".parse::<Time>().unwrap().is_next_day());
    }

    #[test]
    fn invalid_parses() {
        assert!("".parse::<Time>().is_err());
        assert!("%%:%%:%%".parse::<Time>().is_err());
        assert!("00:00:0".parse::<Time>().is_err());
        assert!("00:00:000".parse::<Time>().is_err());
        assert!("00:00:60".parse::<Time>().is_err());
        assert!("00:60:00".parse::<Time>().is_err());
        assert!("00100100".parse::<Time>().is_err());
        assert!("0:0".parse::<Time>().is_err());
    }
}
