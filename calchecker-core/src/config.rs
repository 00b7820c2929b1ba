//! Run configuration.
//!
//! Built once at process start and passed to [`monitor_calendar`](crate::monitor::monitor_calendar).
//! Everything is validated up front so a bad key or URL fails before any
//! network or file access.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::crypto::EncryptionKey;
use crate::error::{CalCheckerError, CalCheckerResult};
use crate::fetch::FETCH_TIMEOUT;
use crate::state::DEFAULT_STATE_FILE;

pub const CALENDAR_URL_VAR: &str = "CALENDAR_URL";
pub const ENCRYPTION_KEY_VAR: &str = "ENCRYPTION_KEY";
pub const STATE_FILE_VAR: &str = "STATE_FILE";

#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Feed to monitor. `webcal://` is rewritten to `https://`.
    pub calendar_url: Url,
    pub encryption_key: EncryptionKey,
    pub state_file: PathBuf,
    /// Fetch timeout, 10 seconds unless overridden.
    pub timeout: Duration,
}

impl CheckerConfig {
    pub fn new(
        calendar_url: &str,
        encryption_key: &str,
        state_file: impl Into<PathBuf>,
    ) -> CalCheckerResult<Self> {
        Ok(CheckerConfig {
            calendar_url: parse_calendar_url(calendar_url)?,
            encryption_key: EncryptionKey::parse(encryption_key)?,
            state_file: state_file.into(),
            timeout: FETCH_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a configuration from named settings.
    ///
    /// `lookup` resolves the variable names below to values; the CLI maps them
    /// onto its flags, which themselves fall back to the process environment.
    ///
    /// Required:
    /// - `CALENDAR_URL` -- feed URL (http, https or webcal)
    /// - `ENCRYPTION_KEY` -- url-safe base64 of 32 bytes
    ///
    /// Optional:
    /// - `STATE_FILE` -- snapshot path (default: `state.bin`)
    pub fn from_lookup<F>(lookup: F) -> CalCheckerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| CalCheckerError::Config(format!("{name} is not set")))
        };

        let calendar_url = required(CALENDAR_URL_VAR)?;
        let encryption_key = required(ENCRYPTION_KEY_VAR)?;
        let state_file = lookup(STATE_FILE_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string());

        Self::new(&calendar_url, &encryption_key, state_file)
    }
}

fn parse_calendar_url(raw: &str) -> CalCheckerResult<Url> {
    let raw = raw.trim();
    // webcal:// is just a hint for calendar apps; the feed is served over https
    let normalized = match raw.strip_prefix("webcal://") {
        Some(rest) => format!("https://{rest}"),
        None => raw.to_string(),
    };

    // The URL itself may hold an access token, so it is left out of the message
    let url = Url::parse(&normalized)
        .map_err(|e| CalCheckerError::Config(format!("invalid calendar URL: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(CalCheckerError::Config(format!(
            "unsupported calendar URL scheme '{other}'"
        ))),
    }
}
