use anyhow::Result;
use tracing::info;

use crate::snapshot::Snapshot;
use crate::store::{Dataset, KeyValueStore, LatestSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    /// The snapshot differed from the previous latest and was archived.
    pub appended: bool,
}

/// Archive `snapshot` if it differs from the latest one, then make it the
/// latest and emit it.
///
/// The slot is read before it is overwritten, so the comparison is always
/// against the previous run's snapshot.
pub fn record<K, H, O>(
    latest: &LatestSlot<'_, K>,
    history: &H,
    output: &O,
    snapshot: &Snapshot,
) -> Result<RecordOutcome>
where
    K: KeyValueStore + ?Sized,
    H: Dataset + ?Sized,
    O: Dataset + ?Sized,
{
    let previous = latest.read()?;
    let unchanged = previous
        .as_ref()
        .is_some_and(|p| p.equals_ignoring_capture_time(snapshot));

    let record = snapshot.to_json();
    if !unchanged {
        history.push_data(&record)?;
        info!("New figures, appended to history");
    } else {
        info!("Figures unchanged since last run");
    }

    latest.write(snapshot)?;
    output.push_data(&record)?;

    Ok(RecordOutcome { appended: !unchanged })
}
