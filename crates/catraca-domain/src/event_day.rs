//! Event days and the fixed calendar credentials are issued for.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// One day of the event. Displays and serializes as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventDay(pub NaiveDate);

impl fmt::Display for EventDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_FORMAT))
    }
}

impl FromStr for EventDay {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(NaiveDate::parse_from_str(s.trim(), DAY_FORMAT)?))
    }
}

impl Serialize for EventDay {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventDay {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("event calendar has no days")]
    Empty,
    #[error("invalid event day: {0}")]
    InvalidDay(String),
    #[error("duplicate event day: {0}")]
    DuplicateDay(String),
}

/// The event name plus the enumerated set of days credentials cover, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCalendar {
    event_name: String,
    days: Vec<EventDay>,
}

impl EventCalendar {
    pub fn new(event_name: impl Into<String>, days: Vec<EventDay>) -> Result<Self, CalendarError> {
        if days.is_empty() {
            return Err(CalendarError::Empty);
        }
        let mut sorted = days.clone();
        sorted.sort();
        if let Some(w) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(CalendarError::DuplicateDay(w[0].to_string()));
        }
        Ok(Self {
            event_name: event_name.into(),
            days: sorted,
        })
    }

    /// Parse `YYYY-MM-DD` strings (e.g. from the `EVENT_DAYS` env var).
    pub fn parse<S: AsRef<str>>(
        event_name: impl Into<String>,
        raw_days: &[S],
    ) -> Result<Self, CalendarError> {
        let days = raw_days
            .iter()
            .map(|d| {
                d.as_ref()
                    .parse::<EventDay>()
                    .map_err(|_| CalendarError::InvalidDay(d.as_ref().to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(event_name, days)
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn days(&self) -> &[EventDay] {
        &self.days
    }

    pub fn contains(&self, day: &EventDay) -> bool {
        self.days.binary_search(day).is_ok()
    }
}
