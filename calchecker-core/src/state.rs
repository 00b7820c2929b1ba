//! Encrypted snapshot of the last-seen events.
//!
//! On disk the file is an encrypted blob (see [`crate::crypto`]). The plaintext
//! is a JSON object mapping each UID to the ICS text of its event.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::crypto::EncryptionKey;
use crate::error::CalCheckerResult;
use crate::event::EventMap;
use crate::ics::{generate_ics, parse_event};

/// Default state file name, relative to the working directory.
pub const DEFAULT_STATE_FILE: &str = "state.bin";

pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StateFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the previous snapshot. A missing file means first run and yields
    /// an empty map.
    pub fn load(&self, key: &EncryptionKey) -> CalCheckerResult<EventMap> {
        // Only a missing file means first run; any other read error is fatal
        let encrypted = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no state file, starting fresh");
                return Ok(EventMap::new());
            }
            Err(e) => return Err(e.into()),
        };
        let decrypted = key.decrypt(&encrypted)?;
        let stored: Map<String, Value> = serde_json::from_slice(&decrypted)?;

        let mut events = EventMap::new();
        for (uid, value) in stored {
            let content: String = serde_json::from_value(value)?;
            let mut event = parse_event(&content)?;
            // The stored key is authoritative
            event.uid = uid;
            events.insert(event);
        }

        debug!(path = %self.path.display(), events = events.len(), "loaded state");
        Ok(events)
    }

    /// Replace the snapshot with `events`.
    ///
    /// Writes to a sibling temp file and renames it over the target, so
    /// readers see either the old or the new snapshot.
    pub fn save(&self, events: &EventMap, key: &EncryptionKey) -> CalCheckerResult<()> {
        let stored: Map<String, Value> = events
            .iter()
            .map(|event| (event.uid.clone(), Value::String(generate_ics(event))))
            .collect();

        let plaintext = serde_json::to_vec(&stored)?;
        let encrypted = key.encrypt(&plaintext)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let temp = self.temp_path();
        std::fs::write(&temp, encrypted)?;
        std::fs::rename(&temp, &self.path)?;

        debug!(path = %self.path.display(), events = events.len(), "saved state");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_STATE_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalCheckerError;
    use crate::event::{Event, EventTime};
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;

    fn sample_events() -> EventMap {
        let mut standup = Event::new(
            "uid1",
            "Standup",
            EventTime::DateTimeFloating(
                NaiveDate::from_ymd_opt(2024, 1, 1)
                    .unwrap()
                    .and_hms_opt(9, 0, 0)
                    .unwrap(),
            ),
        );
        standup.location = Some("Room 4".to_string());

        let offsite = Event::new(
            "uid2",
            "Offsite",
            EventTime::Date(NaiveDate::from_ymd_opt(2024, 2, 15).unwrap()),
        );
        let review = Event::new(
            "uid3",
            "Review",
            EventTime::DateTimeUtc(Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap()),
        );

        [standup, offsite, review].into_iter().collect()
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let state = StateFile::new(dir.path().join("state.bin"));

        let events = state.load(&EncryptionKey::generate()).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_load_unreadable_path_is_io_error() {
        let dir = TempDir::new().unwrap();
        // A regular file where a directory is expected: the read fails with
        // something other than NotFound
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let state = StateFile::new(blocker.join("state.bin"));

        let result = state.load(&EncryptionKey::generate());
        assert!(matches!(result, Err(CalCheckerError::Io(_))));
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let state = StateFile::new(dir.path().join("state.bin"));
        let key = EncryptionKey::generate();
        let events = sample_events();

        state.save(&events, &key).unwrap();
        let loaded = state.load(&key).unwrap();

        assert_eq!(
            loaded.uids().collect::<Vec<_>>(),
            events.uids().collect::<Vec<_>>()
        );
        for event in &events {
            let restored = loaded.get(&event.uid).unwrap();
            assert_eq!(restored.summary, event.summary);
            assert_eq!(restored.start, event.start);
            assert_eq!(restored.location, event.location);
        }
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let state = StateFile::new(dir.path().join("state.bin"));

        state.save(&sample_events(), &EncryptionKey::generate()).unwrap();

        assert!(dir.path().join("state.bin").exists());
        assert!(!dir.path().join("state.bin.tmp").exists());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let state = StateFile::new(dir.path().join("nested/deeper/state.bin"));
        let key = EncryptionKey::generate();

        state.save(&sample_events(), &key).unwrap();
        assert_eq!(state.load(&key).unwrap().len(), 3);
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let state = StateFile::new(dir.path().join("state.bin"));
        let key = EncryptionKey::generate();

        state.save(&sample_events(), &key).unwrap();
        state.save(&EventMap::new(), &key).unwrap();

        assert!(state.load(&key).unwrap().is_empty());
    }

    #[test]
    fn test_state_file_is_not_plaintext() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.bin");
        StateFile::new(&path)
            .save(&sample_events(), &EncryptionKey::generate())
            .unwrap();

        let raw = std::fs::read(&path).unwrap();
        let needle = b"Standup";
        assert!(!raw.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn test_load_with_wrong_key_fails() {
        let dir = TempDir::new().unwrap();
        let state = StateFile::new(dir.path().join("state.bin"));
        state.save(&sample_events(), &EncryptionKey::generate()).unwrap();

        let result = state.load(&EncryptionKey::generate());
        assert!(matches!(result, Err(CalCheckerError::Cipher(_))));
    }

    #[test]
    fn test_load_flipped_byte_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.bin");
        let state = StateFile::new(&path);
        let key = EncryptionKey::generate();
        state.save(&sample_events(), &key).unwrap();

        let mut raw = std::fs::read(&path).unwrap();
        let middle = raw.len() / 2;
        raw[middle] ^= 0x80;
        std::fs::write(&path, raw).unwrap();

        assert!(matches!(state.load(&key), Err(CalCheckerError::Cipher(_))));
    }

    #[test]
    fn test_load_malformed_json_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.bin");
        let key = EncryptionKey::generate();
        std::fs::write(&path, key.encrypt(b"{not json").unwrap()).unwrap();

        let result = StateFile::new(&path).load(&key);
        assert!(matches!(result, Err(CalCheckerError::Serialization(_))));
    }

    #[test]
    fn test_load_malformed_event_text_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.bin");
        let key = EncryptionKey::generate();
        std::fs::write(&path, key.encrypt(br#"{"uid1":"garbage"}"#).unwrap()).unwrap();

        let result = StateFile::new(&path).load(&key);
        assert!(matches!(result, Err(CalCheckerError::IcsParse(_))));
    }
}
