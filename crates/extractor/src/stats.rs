use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic pipeline counters shared by workers, the inserter and the
/// progress ticker.
pub struct Stats {
    started: Instant,
    archives_processed: AtomicU64,
    records_extracted: AtomicU64,
    records_inserted: AtomicU64,
    errors: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    pub archives_processed: u64,
    pub records_extracted: u64,
    pub records_inserted: u64,
    pub errors: u64,
    pub elapsed_hours: f64,
    pub records_per_hour: f64,
}

impl Stats {
    pub fn new() -> Self {
        Stats {
            started: Instant::now(),
            archives_processed: AtomicU64::new(0),
            records_extracted: AtomicU64::new(0),
            records_inserted: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn add_archive(&self) {
        self.archives_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_extracted(&self, n: u64) {
        self.records_extracted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_inserted(&self, n: u64) {
        self.records_inserted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Snapshot {
        let elapsed_hours = self.started.elapsed().as_secs_f64() / 3600.0;
        let records_inserted = self.records_inserted.load(Ordering::Relaxed);
        let records_per_hour = if elapsed_hours > 0.0 {
            records_inserted as f64 / elapsed_hours
        } else {
            0.0
        };
        Snapshot {
            archives_processed: self.archives_processed.load(Ordering::Relaxed),
            records_extracted: self.records_extracted.load(Ordering::Relaxed),
            records_inserted,
            errors: self.errors.load(Ordering::Relaxed),
            elapsed_hours,
            records_per_hour,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}
