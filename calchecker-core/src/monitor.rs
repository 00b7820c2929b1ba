//! One fetch, diff and persist cycle.

use tracing::info;

use crate::config::CheckerConfig;
use crate::diff::EventDiff;
use crate::error::CalCheckerResult;
use crate::fetch::fetch_calendar_with_timeout;
use crate::ics::parse_calendar;
use crate::state::StateFile;

/// Check the feed once and return the change report.
///
/// The current events always become the new snapshot, even when the report is
/// empty. Nothing is written if fetching, parsing or loading fails.
pub async fn monitor_calendar(config: &CheckerConfig) -> CalCheckerResult<String> {
    let raw = fetch_calendar_with_timeout(config.calendar_url.as_str(), config.timeout).await?;
    let current = parse_calendar(&raw)?;

    let state = StateFile::new(&config.state_file);
    let previous = state.load(&config.encryption_key)?;

    let diff = EventDiff::compute(&previous, &current);
    info!(
        current = current.len(),
        previous = previous.len(),
        added = diff.added().len(),
        deleted = diff.deleted().len(),
        "compared calendar with saved state"
    );
    let report = diff.report();

    state.save(&current, &config.encryption_key)?;

    Ok(report)
}
