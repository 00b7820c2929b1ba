//! Core of calchecker: watch a calendar feed for added and removed events.
//!
//! - `ics` parses feeds and writes single-event ICS text
//! - `state` keeps the last-seen events in an encrypted file
//! - `diff` compares two snapshots and renders the report
//! - `monitor` runs one fetch, diff and persist cycle

pub mod config;
pub mod crypto;
pub mod diff;
pub mod error;
pub mod event;
pub mod fetch;
pub mod ics;
pub mod monitor;
pub mod state;

pub use config::CheckerConfig;
pub use crypto::EncryptionKey;
pub use error::{CalCheckerError, CalCheckerResult};
pub use event::{Event, EventMap, EventStatus, EventTime};
pub use monitor::monitor_calendar;
