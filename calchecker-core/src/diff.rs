//! Added/deleted detection between two snapshots.
//!
//! Events are compared by UID only. An event whose UID is in both snapshots
//! counts as unchanged even if its content differs.

use crate::event::{Event, EventMap};

const ADDED_HEADER: &str = "New events added";
const DELETED_HEADER: &str = "Events deleted";

/// Events that appeared or disappeared between two snapshots.
#[derive(Debug)]
pub struct EventDiff<'a> {
    added: Vec<&'a Event>,
    deleted: Vec<&'a Event>,
}

impl<'a> EventDiff<'a> {
    /// Added events follow `current`'s order, deleted events `previous`'s.
    pub fn compute(previous: &'a EventMap, current: &'a EventMap) -> Self {
        let added = current
            .iter()
            .filter(|event| !previous.contains(&event.uid))
            .collect();

        let deleted = previous
            .iter()
            .filter(|event| !current.contains(&event.uid))
            .collect();

        EventDiff { added, deleted }
    }

    pub fn added(&self) -> &[&'a Event] {
        &self.added
    }

    pub fn deleted(&self) -> &[&'a Event] {
        &self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty()
    }

    /// Render the change log. Empty when nothing changed.
    pub fn report(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        if !self.added.is_empty() {
            lines.push(ADDED_HEADER.to_string());
            lines.extend(self.added.iter().map(|e| e.report_line()));
        }

        if !self.deleted.is_empty() {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(DELETED_HEADER.to_string());
            lines.extend(self.deleted.iter().map(|e| e.report_line()));
        }

        lines.join("\n")
    }
}
