//! Wiring of discovery → workers → inserter through bounded channels.
//!
//! Workers own an archive from dequeue until its processed-set append and
//! staging relocation; the single inserter owns the database. Back-pressure
//! propagates through the channel capacities. Shutdown is one shared signal
//! observed between archives.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use sqlx::postgres::PgPool;
use tokio::sync::mpsc;

use extractor_sql::{ErrorClass, RecordFailure};
use patent_xml::CanonicalRecord;

use crate::discovery::{self, Candidate, ScanOptions};
use crate::processed::ProcessedSet;
use crate::stats::Stats;

/// Completion future shared by every task; resolves on the process signal.
pub type Shutdown = Shared<BoxFuture<'static, ()>>;

const WORK_QUEUE_CAPACITY: usize = 100;
const RESULTS_QUEUE_CAPACITY: usize = 8;
pub const MAX_BATCH_SIZE: usize = 2_000;
const PROGRESS_INTERVAL_SECS: u64 = 30;

pub const FAILURES_LOG: &str = "failed_records.log";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub files_root: PathBuf,
    pub workers: usize,
    pub batch_size: usize,
    pub force: bool,
    pub scan: ScanOptions,
}

struct ArchiveBatch {
    records: Vec<CanonicalRecord>,
}

pub async fn run(
    cfg: PipelineConfig,
    pool: PgPool,
    processed: Arc<ProcessedSet>,
    stats: Arc<Stats>,
    shutdown: Shutdown,
) -> anyhow::Result<()> {
    let batch_size = cfg.batch_size.clamp(1, MAX_BATCH_SIZE);
    let worker_count = cfg.workers.max(1);

    let scan = cfg.scan.clone();
    let scan_processed = processed.clone();
    let candidates =
        tokio::task::spawn_blocking(move || discovery::discover(&scan, &scan_processed)).await?;
    tracing::info!(
        candidates = candidates.len(),
        already_processed = processed.len(),
        "discovery complete"
    );

    let (work_tx, work_rx) = mpsc::channel::<Candidate>(WORK_QUEUE_CAPACITY);
    let (results_tx, results_rx) = mpsc::channel::<ArchiveBatch>(RESULTS_QUEUE_CAPACITY);
    let work_rx = Arc::new(tokio::sync::Mutex::new(work_rx));

    let feeder_shutdown = shutdown.clone();
    let feeder = tokio::spawn(async move {
        for candidate in candidates {
            tokio::select! {
                _ = feeder_shutdown.clone() => break,
                sent = work_tx.send(candidate) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        // Dropping the sender closes the queue once workers drain it.
    });

    let mut workers = Vec::with_capacity(worker_count);
    for worker_id in 0..worker_count {
        workers.push(tokio::spawn(worker_loop(
            worker_id,
            work_rx.clone(),
            results_tx.clone(),
            cfg.files_root.clone(),
            processed.clone(),
            stats.clone(),
            shutdown.clone(),
        )));
    }
    drop(results_tx);

    let inserter = tokio::spawn(inserter_loop(
        results_rx,
        pool.clone(),
        batch_size,
        cfg.force,
        stats.clone(),
        cfg.files_root.join(FAILURES_LOG),
    ));
    let ticker = tokio::spawn(ticker_loop(pool, stats.clone()));

    for worker in workers {
        worker.await?;
    }
    feeder.await?;
    let class_counts = inserter.await?;
    ticker.abort();

    let snap = stats.snapshot();
    tracing::info!(
        archives_processed = snap.archives_processed,
        records_extracted = snap.records_extracted,
        records_inserted = snap.records_inserted,
        errors = snap.errors,
        elapsed_hours = snap.elapsed_hours,
        "pipeline complete"
    );
    for class in ErrorClass::all() {
        let count = class_counts.get(&class).copied().unwrap_or(0);
        if count > 0 {
            tracing::info!(class = %class, count, "record failures by class");
        }
    }
    Ok(())
}

async fn worker_loop(
    worker_id: usize,
    work_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Candidate>>>,
    results_tx: mpsc::Sender<ArchiveBatch>,
    files_root: PathBuf,
    processed: Arc<ProcessedSet>,
    stats: Arc<Stats>,
    shutdown: Shutdown,
) {
    loop {
        if shutdown.peek().is_some() {
            tracing::info!(worker_id, "shutdown observed; worker exiting");
            return;
        }
        let candidate = {
            let mut rx = work_rx.lock().await;
            rx.recv().await
        };
        let Some(candidate) = candidate else { return };

        let key = candidate.path.display().to_string();
        let work_item = candidate.clone();
        let outcome = tokio::task::spawn_blocking(move || process_archive(&work_item)).await;
        let records = match outcome {
            Ok(Ok(records)) => records,
            Ok(Err(err)) => {
                // Not marked processed; the archive is retried next run.
                tracing::warn!(worker_id, archive = %key, error = %err, "archive failed to open");
                stats.add_error();
                continue;
            }
            Err(err) => {
                tracing::error!(worker_id, archive = %key, error = %err, "archive task aborted");
                stats.add_error();
                continue;
            }
        };

        tracing::debug!(worker_id, archive = %key, records = records.len(), "archive extracted");
        stats.add_extracted(records.len() as u64);
        if results_tx.send(ArchiveBatch { records }).await.is_err() {
            return;
        }

        if let Err(err) = processed.insert(&key) {
            tracing::error!(archive = %key, error = %err, "failed appending to processed-set");
        }
        if candidate.staged {
            match discovery::move_to_originals(&files_root, &candidate.path) {
                Ok(dest) => {
                    tracing::debug!(from = %key, to = %dest.display(), "staged archive relocated")
                }
                Err(err) => {
                    tracing::warn!(archive = %key, error = %err, "failed relocating staged archive")
                }
            }
        }
        stats.add_archive();
    }
}

/// Stream one archive and parse every XML it yields. Runs on the blocking
/// pool; an archive's records are accumulated in memory, which is bounded
/// by the few thousand documents a weekly holds.
fn process_archive(candidate: &Candidate) -> Result<Vec<CanonicalRecord>, archive::StreamError> {
    let mut records = Vec::new();
    archive::stream_archive(&candidate.path, candidate.kind, &mut |synthetic, bytes| {
        records.extend(patent_xml::parse_document(&synthetic, &bytes));
    })?;
    Ok(records)
}

async fn inserter_loop(
    mut results_rx: mpsc::Receiver<ArchiveBatch>,
    pool: PgPool,
    batch_size: usize,
    force: bool,
    stats: Arc<Stats>,
    failures_path: PathBuf,
) -> HashMap<ErrorClass, u64> {
    let mut class_counts: HashMap<ErrorClass, u64> = HashMap::new();
    while let Some(batch) = results_rx.recv().await {
        for chunk in batch.records.chunks(batch_size) {
            match extractor_sql::upsert_batch(&pool, chunk, force).await {
                Ok(outcome) => {
                    stats.add_inserted(outcome.inserted);
                    for failure in &outcome.failures {
                        *class_counts.entry(failure.class).or_default() += 1;
                        stats.add_error();
                        append_failure(&failures_path, failure);
                    }
                }
                Err(err) => {
                    // The archive is already marked processed; a later
                    // force-overwrite run recovers the text.
                    tracing::error!(error = %err, records = chunk.len(), "batch commit failed");
                    stats.add_error();
                }
            }
        }
    }
    class_counts
}

fn append_failure(path: &Path, failure: &RecordFailure) {
    let line = format!(
        "{}\t{}\t{}\t{}\n",
        chrono::Utc::now().to_rfc3339(),
        failure.class,
        failure.pub_id,
        failure.message
    );
    let written = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| f.write_all(line.as_bytes()));
    if let Err(err) = written {
        tracing::warn!(path = %path.display(), error = %err, "failed appending to failures log");
    }
}

async fn ticker_loop(pool: PgPool, stats: Arc<Stats>) {
    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs(PROGRESS_INTERVAL_SECS));
    interval.tick().await; // The first tick completes immediately.
    loop {
        interval.tick().await;
        let snap = stats.snapshot();
        let stored = extractor_sql::stored_row_count(
            &pool,
            patent_xml::DocKind::Publication.table(),
        )
        .await
        .unwrap_or(-1);
        tracing::info!(
            archives_processed = snap.archives_processed,
            records_extracted = snap.records_extracted,
            records_inserted = snap.records_inserted,
            errors = snap.errors,
            stored_rows = stored,
            elapsed_hours = snap.elapsed_hours,
            records_per_hour = snap.records_per_hour,
            "progress"
        );
    }
}
