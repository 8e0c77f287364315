//! Aggregation window widths accepted by inference and time-series monitors.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Time-bucket width over which metrics are aggregated.
///
/// The platform accepts a fixed set of widths, or any whole number of weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Granularity {
    FiveMinutes,
    ThirtyMinutes,
    OneHour,
    OneDay,
    Weeks(NonZeroU32),
    OneMonth,
    OneYear,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "unsupported granularity {0:?}: expected one of 5 minutes, 30 minutes, 1 hour, 1 day, 1 month, 1 year, or N weeks"
)]
pub struct GranularityError(pub String);

impl FromStr for Granularity {
    type Err = GranularityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || GranularityError(s.to_string());
        let mut words = s.split_whitespace();
        let (Some(count), Some(unit), None) = (words.next(), words.next(), words.next()) else {
            return Err(err());
        };
        let count: u32 = count.parse().map_err(|_| err())?;
        let unit = unit.to_ascii_lowercase();

        match (count, unit.as_str()) {
            (5, "minutes") => Ok(Granularity::FiveMinutes),
            (30, "minutes") => Ok(Granularity::ThirtyMinutes),
            (1, "hour") => Ok(Granularity::OneHour),
            (1, "day") => Ok(Granularity::OneDay),
            (1, "month") => Ok(Granularity::OneMonth),
            (1, "year") => Ok(Granularity::OneYear),
            (1, "week") => Ok(Granularity::Weeks(NonZeroU32::MIN)),
            (n, "weeks") if n > 1 => NonZeroU32::new(n).map(Granularity::Weeks).ok_or_else(err),
            _ => Err(err()),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::FiveMinutes => f.write_str("5 minutes"),
            Granularity::ThirtyMinutes => f.write_str("30 minutes"),
            Granularity::OneHour => f.write_str("1 hour"),
            Granularity::OneDay => f.write_str("1 day"),
            Granularity::Weeks(n) if n.get() == 1 => f.write_str("1 week"),
            Granularity::Weeks(n) => write!(f, "{n} weeks"),
            Granularity::OneMonth => f.write_str("1 month"),
            Granularity::OneYear => f.write_str("1 year"),
        }
    }
}

impl TryFrom<String> for Granularity {
    type Error = GranularityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Granularity> for String {
    fn from(value: Granularity) -> Self {
        value.to_string()
    }
}
