use chrono::Utc;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::config::{DeceasedSettings, Settings, HISTORY_DATASET, KV_STORE, LATEST_KEY, OUTPUT_DATASET};
use crate::db::{SqliteDataset, SqliteKeyValueStore};
use crate::error::RunError;
use crate::fetch::{build_client, HttpFetcher, PageFetcher};
use crate::ocr::TesseractRecognizer;
use crate::parser::deceased::{DeceasedStrategy, ImageRegion, TextPattern};
use crate::parser::extract;
use crate::recorder::{record, RecordOutcome};
use crate::snapshot::Snapshot;
use crate::store::LatestSlot;

/// Wire the HTTP fetcher and the configured deceased strategy, then run once.
pub async fn run(conn: &Connection, settings: &Settings) -> Result<Snapshot, RunError> {
    let client = build_client(settings.timeout).map_err(|e| RunError::FetchFailed {
        url: settings.source_url.to_string(),
        reason: format!("{:#}", e),
    })?;
    let fetcher = HttpFetcher::new(client.clone());

    match &settings.deceased {
        DeceasedSettings::Text => run_once(&fetcher, &TextPattern, conn, settings).await,
        DeceasedSettings::Image {
            region,
            image_match,
            tesseract,
        } => {
            let recognizer = TesseractRecognizer::new(client, tesseract.clone());
            let strategy = ImageRegion::new(recognizer, *region, image_match.clone());
            run_once(&fetcher, &strategy, conn, settings).await
        }
    }
}

/// fetch → extract → record, no retries. Any failure before recording leaves
/// the stores untouched.
pub async fn run_once<F, S>(
    fetcher: &F,
    strategy: &S,
    conn: &Connection,
    settings: &Settings,
) -> Result<Snapshot, RunError>
where
    F: PageFetcher + ?Sized,
    S: DeceasedStrategy + ?Sized,
{
    let url = &settings.source_url;
    let page = fetcher
        .fetch(url)
        .await
        .map_err(|e| RunError::FetchFailed {
            url: url.to_string(),
            reason: format!("{:#}", e),
        })?;

    let snapshot = match extract(&page, &settings.block_selector, strategy, Utc::now()).await {
        Ok(s) => s,
        Err(e) => {
            debug!("Page text: {:.500}", page.text());
            return Err(e.into());
        }
    };
    info!(
        "Infected {}, deceased {}, source updated {}",
        snapshot.infected, snapshot.deceased, snapshot.source_updated_at
    );

    commit(conn, &snapshot)?;
    Ok(snapshot)
}

/// Record inside one IMMEDIATE transaction: concurrent runs on the same
/// database wait for each other instead of both reading the same latest.
pub fn commit(conn: &Connection, snapshot: &Snapshot) -> Result<RecordOutcome, RunError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let outcome = {
        let kv = SqliteKeyValueStore::open(&tx, KV_STORE);
        let latest = LatestSlot::new(&kv, LATEST_KEY);
        let history = SqliteDataset::open(&tx, HISTORY_DATASET);
        let output = SqliteDataset::open(&tx, OUTPUT_DATASET);
        record(&latest, &history, &output, snapshot)?
    };
    tx.commit()?;
    Ok(outcome)
}
