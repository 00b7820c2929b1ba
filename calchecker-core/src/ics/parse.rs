//! ICS parsing using the icalendar crate's parser.

use chrono::NaiveDateTime;
use icalendar::{
    DatePerhapsTime,
    parser::{Component, read_calendar, unfold},
};

use crate::error::{CalCheckerError, CalCheckerResult};
use crate::event::{Event, EventMap, EventStatus, EventTime, NO_TITLE};

/// Parse a whole calendar feed into events keyed by UID.
///
/// Every VEVENT in the document is collected. A later VEVENT with the same UID
/// replaces an earlier one.
pub fn parse_calendar(content: &[u8]) -> CalCheckerResult<EventMap> {
    let text = std::str::from_utf8(content)
        .map_err(|e| CalCheckerError::IcsParse(format!("calendar is not valid UTF-8: {e}")))?;
    // Some servers prefix the feed with a byte order mark
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let unfolded = unfold(text);
    let components = read_components(&unfolded)?;

    let mut events = EventMap::new();
    for vevent in collect_vevents(&components) {
        events.insert(to_event(vevent)?);
    }
    Ok(events)
}

/// Parse the stored ICS text of a single event.
pub fn parse_event(content: &str) -> CalCheckerResult<Event> {
    let unfolded = unfold(content);
    let components = read_components(&unfolded)?;

    let vevent = collect_vevents(&components)
        .into_iter()
        .next()
        .ok_or_else(|| CalCheckerError::IcsParse("no VEVENT found".to_string()))?;

    to_event(vevent)
}

fn read_components<'a>(unfolded: &'a str) -> CalCheckerResult<Vec<Component<'a>>> {
    if !unfolded.trim_start().starts_with("BEGIN:VCALENDAR") {
        return Err(CalCheckerError::IcsParse(
            "content does not start with BEGIN:VCALENDAR".to_string(),
        ));
    }

    let calendar = read_calendar(unfolded).map_err(CalCheckerError::IcsParse)?;
    Ok(calendar.components)
}

/// Depth-first walk collecting VEVENT components.
fn collect_vevents<'c, 'a>(components: &'c [Component<'a>]) -> Vec<&'c Component<'a>> {
    let mut found = Vec::new();
    for component in components {
        if component.name == "VEVENT" {
            found.push(component);
        } else {
            found.extend(collect_vevents(&component.components));
        }
    }
    found
}

fn to_event(vevent: &Component) -> CalCheckerResult<Event> {
    let uid = vevent
        .find_prop("UID")
        .map(|p| p.val.to_string())
        .ok_or_else(|| CalCheckerError::IcsParse("VEVENT without UID".to_string()))?;

    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| p.val.to_string())
        .unwrap_or_else(|| NO_TITLE.to_string());

    let start = vevent
        .find_prop("DTSTART")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time)
        .ok_or_else(|| {
            CalCheckerError::IcsParse(format!("VEVENT {uid} has no valid DTSTART"))
        })?;

    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time);

    let description = vevent.find_prop("DESCRIPTION").map(|p| p.val.to_string());
    let location = vevent.find_prop("LOCATION").map(|p| p.val.to_string());
    let rrule = vevent.find_prop("RRULE").map(|p| p.val.to_string());

    let status = vevent
        .find_prop("STATUS")
        .map(|p| match p.val.as_ref() {
            "TENTATIVE" => EventStatus::Tentative,
            "CANCELLED" => EventStatus::Cancelled,
            _ => EventStatus::Confirmed,
        })
        .unwrap_or(EventStatus::Confirmed);

    let stamp = vevent.find_prop("DTSTAMP").and_then(|p| {
        NaiveDateTime::parse_from_str(p.val.as_ref().trim_end_matches('Z'), "%Y%m%dT%H%M%S")
            .ok()
            .map(|dt| dt.and_utc())
    });

    let custom_properties: Vec<(String, String)> = vevent
        .properties
        .iter()
        .filter(|p| p.name.as_ref().starts_with("X-"))
        .map(|p| (p.name.to_string(), p.val.to_string()))
        .collect();

    Ok(Event {
        uid,
        summary,
        description,
        location,
        start,
        end,
        status,
        rrule,
        stamp,
        custom_properties,
    })
}

/// Convert icalendar's DatePerhapsTime to our EventTime, preserving timezone info
fn to_event_time(dpt: DatePerhapsTime) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            icalendar::CalendarDateTime::Utc(dt) => EventTime::DateTimeUtc(dt),
            icalendar::CalendarDateTime::Floating(naive) => EventTime::DateTimeFloating(naive),
            icalendar::CalendarDateTime::WithTimezone { date_time, tzid } => {
                EventTime::DateTimeZoned {
                    datetime: date_time,
                    tzid,
                }
            }
        },
    }
}
