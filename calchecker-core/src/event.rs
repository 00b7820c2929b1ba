//! Calendar event types.
//!
//! Events are parsed from the remote feed, compared by UID and written back
//! to the state file as ICS text. Only the fields that survive that round trip
//! are kept here.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

/// Summary used when a VEVENT has no SUMMARY property.
pub const NO_TITLE: &str = "(No title)";

/// A single calendar event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub uid: String,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: EventTime,
    pub end: Option<EventTime>,
    pub status: EventStatus,
    /// Raw RRULE value. Kept for storage only, never expanded.
    pub rrule: Option<String>,
    /// DTSTAMP as published by the feed
    pub stamp: Option<DateTime<Utc>>,
    /// X- properties, preserved in source order
    pub custom_properties: Vec<(String, String)>,
}

impl Event {
    /// Minimal event with the given identity, used by tests and callers that
    /// only care about what the report shows.
    pub fn new(uid: impl Into<String>, summary: impl Into<String>, start: EventTime) -> Self {
        Event {
            uid: uid.into(),
            summary: summary.into(),
            description: None,
            location: None,
            start,
            end: None,
            status: EventStatus::Confirmed,
            rrule: None,
            stamp: None,
            custom_properties: vec![],
        }
    }

    /// Render as a report line: `<summary> @ <ISO-8601 start>`.
    pub fn report_line(&self) -> String {
        format!("{} @ {}", self.summary, self.start.to_iso8601())
    }
}

/// Event start/end value, in whichever form the feed used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTime {
    /// All-day
    Date(NaiveDate),
    DateTimeUtc(DateTime<Utc>),
    /// Local time with no timezone attached
    DateTimeFloating(NaiveDateTime),
    DateTimeZoned { datetime: NaiveDateTime, tzid: String },
}

impl EventTime {
    /// ISO-8601 rendering used in reports.
    ///
    /// Zoned times carry the UTC offset of their TZID when the zone is known
    /// to the IANA database; otherwise they are rendered like floating times.
    pub fn to_iso8601(&self) -> String {
        match self {
            EventTime::Date(d) => d.format("%Y-%m-%d").to_string(),
            EventTime::DateTimeUtc(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, false),
            EventTime::DateTimeFloating(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            EventTime::DateTimeZoned { datetime, tzid } => tzid
                .parse::<Tz>()
                .ok()
                .and_then(|tz| tz.from_local_datetime(datetime).earliest())
                .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string())
                .unwrap_or_else(|| datetime.format("%Y-%m-%dT%H:%M:%S").to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

/// Events keyed by UID.
///
/// Iterates in the order UIDs were first inserted. Inserting a UID that is
/// already present replaces the event but keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventMap {
    events: Vec<Event>,
    index: HashMap<String, usize>,
}

impl EventMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event, returning the one it replaced.
    pub fn insert(&mut self, event: Event) -> Option<Event> {
        match self.index.get(&event.uid) {
            Some(&pos) => Some(std::mem::replace(&mut self.events[pos], event)),
            None => {
                self.index.insert(event.uid.clone(), self.events.len());
                self.events.push(event);
                None
            }
        }
    }

    pub fn get(&self, uid: &str) -> Option<&Event> {
        self.index.get(uid).map(|&pos| &self.events[pos])
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.index.contains_key(uid)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn uids(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|e| e.uid.as_str())
    }
}

impl FromIterator<Event> for EventMap {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        let mut map = EventMap::new();
        for event in iter {
            map.insert(event);
        }
        map
    }
}

impl<'a> IntoIterator for &'a EventMap {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
