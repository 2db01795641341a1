use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use futures::FutureExt;

use extractor::discovery::{ScanMode, ScanOptions};
use extractor::pipeline::{self, PipelineConfig, Shutdown};
use extractor::processed::{ProcessedSet, PROCESSED_LIST};
use extractor::stats::Stats;

/// Extracts USPTO weekly bulk-data archives into the patent store.
#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Postgres host.
    #[clap(long = "db-host", env = "DB_HOST", default_value = "127.0.0.1")]
    db_host: String,
    /// Postgres port.
    #[clap(long = "db-port", env = "DB_PORT", default_value = "5432")]
    db_port: u16,
    /// Database name.
    #[clap(long = "db-name", env = "DB_NAME", default_value = "patents")]
    db_name: String,
    /// Database user.
    #[clap(long = "db-user", env = "DB_USER", default_value = "postgres")]
    db_user: String,
    /// Database password.
    #[clap(
        long = "db-password",
        env = "DB_PASSWORD",
        default_value = "",
        hide_env_values = true
    )]
    db_password: String,
    /// Worker count, bounded by twice the CPU count.
    #[clap(long, env = "WORKERS", default_value = "8")]
    workers: usize,
    /// Records per UPSERT transaction.
    #[clap(long = "batch-size", env = "BATCH_SIZE", default_value = "500")]
    batch_size: usize,
    /// Root directory holding the per-year archive layout.
    #[clap(long = "files-root", env = "FILES_ROOT")]
    files_root: PathBuf,
    /// Restrict the scan to the staging subtree (NewFiles/) and relocate
    /// consumed files back to the root.
    #[clap(long = "scan-new", env = "SCAN_NEW")]
    scan_new: bool,
    /// Recurse into year subdirectories.
    #[clap(
        long,
        env = "RECURSIVE",
        default_value = "true",
        action = clap::ArgAction::Set
    )]
    recursive: bool,
    /// Minimum size for signature-sniffing extensionless files.
    #[clap(long = "min-archive-size-mb", env = "MIN_ARCHIVE_SIZE_MB", default_value = "1")]
    min_archive_size_mb: u64,
    /// Ignore the processed-set and re-ingest everything discovered.
    #[clap(long, env = "REPROCESS")]
    reprocess: bool,
    /// Overwrite description/claims text unconditionally on conflict.
    #[clap(long, env = "FORCE")]
    force: bool,
    /// Lower bound of the priority year window.
    #[clap(long = "priority-min-year", env = "PRIORITY_MIN_YEAR")]
    priority_min_year: Option<i32>,
    /// Upper bound of the priority year window.
    #[clap(long = "priority-max-year", env = "PRIORITY_MAX_YEAR")]
    priority_max_year: Option<i32>,
    /// Verify configuration and database connectivity, then exit.
    #[clap(long = "test-config", env = "TEST_CONFIG")]
    test_config: bool,
    /// Backfill lookup: weekly date (YYYYMMDD) of the split archive set.
    #[clap(long = "backfill-date", requires = "backfill_file")]
    backfill_date: Option<String>,
    /// Backfill lookup: target XML filename. Bytes go to stdout.
    #[clap(long = "backfill-file", requires = "backfill_date")]
    backfill_file: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting tracing default failed");

    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let task = runtime.spawn(async move { async_main(args).await });
    let result = runtime.block_on(task);
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    result?
}

async fn async_main(args: Args) -> anyhow::Result<()> {
    if !args.files_root.is_dir() {
        anyhow::bail!(
            "files root {} is not a directory",
            args.files_root.display()
        );
    }

    // Backfill lookups read archives directly; no database involved.
    if let (Some(date), Some(file)) = (&args.backfill_date, &args.backfill_file) {
        return run_backfill(&args.files_root, date, file).await;
    }

    let workers = clamp_workers(args.workers);
    let connect_opts = extractor_sql::ConnectOpts {
        host: args.db_host.clone(),
        port: args.db_port,
        database: args.db_name.clone(),
        user: args.db_user.clone(),
        password: args.db_password.clone(),
    };
    let pool = extractor_sql::connect(&connect_opts)
        .await
        .context("connecting to database")?;

    if args.test_config {
        extractor_sql::test_connection(&pool)
            .await
            .context("database connectivity check failed")?;
        tracing::info!(
            host = %args.db_host,
            database = %args.db_name,
            workers,
            batch_size = args.batch_size,
            files_root = %args.files_root.display(),
            "configuration verified"
        );
        return Ok(());
    }

    let processed = Arc::new(
        ProcessedSet::open(&args.files_root.join(PROCESSED_LIST))
            .context("opening processed-set")?,
    );
    let stats = Arc::new(Stats::new());

    let shutdown: Shutdown = tokio::signal::ctrl_c().map(|_| ()).boxed().shared();
    // Drive the signal future so it resolves even while tasks only peek it.
    tokio::spawn(shutdown.clone());

    let mode = if args.scan_new {
        ScanMode::StagingOnly
    } else if args.recursive {
        ScanMode::Recursive
    } else {
        ScanMode::TopLevel
    };
    let priority_years = match (args.priority_min_year, args.priority_max_year) {
        (None, None) => None,
        (min, max) => Some((min.unwrap_or(i32::MIN), max.unwrap_or(i32::MAX))),
    };

    tracing::info!(
        workers,
        batch_size = args.batch_size,
        files_root = %args.files_root.display(),
        scan_new = args.scan_new,
        force = args.force,
        "starting extraction pipeline"
    );

    let cfg = PipelineConfig {
        files_root: args.files_root.clone(),
        workers,
        batch_size: args.batch_size,
        force: args.force,
        scan: ScanOptions {
            root: args.files_root,
            mode,
            min_sniff_bytes: args.min_archive_size_mb * 1024 * 1024,
            reprocess: args.reprocess,
            priority_years,
        },
    };

    pipeline::run(cfg, pool, processed, stats, shutdown).await
}

async fn run_backfill(root: &std::path::Path, date: &str, file: &str) -> anyhow::Result<()> {
    let root = root.to_path_buf();
    let date_owned = date.to_string();
    let file_owned = file.to_string();
    let bytes = tokio::task::spawn_blocking(move || {
        archive::backfill::load_split_xml(&root, &date_owned, &file_owned)
    })
    .await?
    .context("reading split archives")?;

    match bytes {
        Some(bytes) => {
            tracing::info!(len = bytes.len(), file, date, "backfill target found");
            use std::io::Write;
            std::io::stdout().write_all(&bytes)?;
            Ok(())
        }
        None => anyhow::bail!("no archive member named {} for date {}", file, date),
    }
}

fn clamp_workers(requested: usize) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    requested.clamp(1, cpus * 2)
}
