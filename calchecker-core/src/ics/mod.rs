//! ICS parsing and generation.
//!
//! Feeds are parsed into an [`EventMap`](crate::event::EventMap); each event is
//! written back as its own VCALENDAR document for the state file.

mod generate;
mod parse;

pub use generate::generate_ics;
pub use parse::{parse_calendar, parse_event};
