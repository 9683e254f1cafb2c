pub mod customer;
pub mod job;
pub mod patch;
pub mod round;

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::AppError;

pub use customer::{Customer, CustomerPatch, NewCustomer};
pub use job::{Job, JobPatch, JobStatus, NewJob, Recurrence, StatusUpdate};
pub use patch::Patch;
pub use round::{GeoPoint, NewRound, Round, RoundArea, RoundPatch};

/// A wall-clock time of day, serialised as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(pub NaiveTime);

impl ClockTime {
    pub fn parse(s: &str) -> Option<Self> {
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .ok()
            .map(ClockTime)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ClockTime::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid time '{raw}', expected HH:MM"))
        })
    }
}

/// Parses a calendar date from `YYYY-MM-DD` or an RFC 3339 timestamp
/// (reduced to the date in its own offset).
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

pub(crate) fn require_non_blank(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(())
}

pub(crate) fn check_latitude(value: f64) -> Result<(), AppError> {
    if !(-90.0..=90.0).contains(&value) {
        return Err(AppError::validation("latitude must be between -90 and 90"));
    }
    Ok(())
}

pub(crate) fn check_longitude(value: f64) -> Result<(), AppError> {
    if !(-180.0..=180.0).contains(&value) {
        return Err(AppError::validation("longitude must be between -180 and 180"));
    }
    Ok(())
}
