//! Durable record of archives whose contents have been committed. One
//! absolute path per line, append-only; presence means "do not reprocess".

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

pub const PROCESSED_LIST: &str = "processed_archives.txt";

pub struct ProcessedSet {
    inner: Mutex<Inner>,
}

struct Inner {
    set: HashSet<String>,
    log: File,
}

impl ProcessedSet {
    /// Load the existing list (blank lines ignored) and open the log for
    /// appending.
    pub fn open(path: &Path) -> io::Result<Self> {
        let mut set = HashSet::new();
        match fs::read_to_string(path) {
            Ok(content) => {
                for line in content.lines() {
                    let line = line.trim();
                    if !line.is_empty() {
                        set.insert(line.to_string());
                    }
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        let log = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(ProcessedSet {
            inner: Mutex::new(Inner { set, log }),
        })
    }

    pub fn contains(&self, path: &str) -> bool {
        self.inner.lock().unwrap().set.contains(path)
    }

    /// Insert and append under one lock, so the in-memory mirror and the
    /// log cannot diverge. Returns false when the path was already present.
    pub fn insert(&self, path: &str) -> io::Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.set.insert(path.to_string()) {
            return Ok(false);
        }
        writeln!(&mut inner.log, "{}", path)?;
        inner.log.flush()?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
