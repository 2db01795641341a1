//! Filesystem scan, candidate classification, processed-set filtering and
//! year prioritization. A scan is a pure function of the filesystem and the
//! processed-set, except that already-processed staging files are relocated
//! back to the originals directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use regex::Regex;

use archive::{detect, ArchiveKind};

use crate::processed::ProcessedSet;

pub const STAGING_DIR: &str = "NewFiles";

lazy_static! {
    static ref I_YEAR_RE: Regex = Regex::new(r"(?i)^I(\d{4})").unwrap();
    static ref YEAR_RE: Regex = Regex::new(r"^(\d{4})").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Recursive,
    TopLevel,
    StagingOnly,
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: PathBuf,
    pub kind: ArchiveKind,
    pub year: Option<i32>,
    pub staged: bool,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub root: PathBuf,
    pub mode: ScanMode,
    pub min_sniff_bytes: u64,
    pub reprocess: bool,
    pub priority_years: Option<(i32, i32)>,
}

/// Year hint from a weekly filename: `I<YYYY>…` first, then a bare leading
/// year.
pub fn year_from_name(name: &str) -> Option<i32> {
    I_YEAR_RE
        .captures(name)
        .or_else(|| YEAR_RE.captures(name))
        .and_then(|c| c[1].parse().ok())
}

pub fn discover(opts: &ScanOptions, processed: &ProcessedSet) -> Vec<Candidate> {
    let root = fs::canonicalize(&opts.root).unwrap_or_else(|_| opts.root.clone());
    let staging = root.join(STAGING_DIR);

    let mut files = Vec::new();
    match opts.mode {
        ScanMode::StagingOnly => walk(&staging, true, &mut files),
        ScanMode::TopLevel => collect_files(&root, &mut files),
        ScanMode::Recursive => {
            // The staging subtree has its own scan mode and semantics.
            match fs::read_dir(&root) {
                Ok(entries) => {
                    for entry in entries.flatten() {
                        let path = entry.path();
                        if path.is_dir() {
                            if path.file_name().map(|n| n == STAGING_DIR).unwrap_or(false) {
                                continue;
                            }
                            walk(&path, true, &mut files);
                        } else {
                            files.push(path);
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(root = %root.display(), error = %err, "cannot read files root");
                }
            }
        }
    }

    let mut candidates = Vec::new();
    for path in files {
        let kind = match detect(&path, opts.min_sniff_bytes) {
            Some(kind) => kind,
            None => continue,
        };
        let key = path.display().to_string();
        if processed.contains(&key) && !opts.reprocess {
            if opts.mode == ScanMode::StagingOnly {
                // Consumed on an earlier run that died before the rename.
                match move_to_originals(&root, &path) {
                    Ok(dest) => {
                        tracing::info!(from = %path.display(), to = %dest.display(), "relocated already-processed staging file")
                    }
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "failed relocating processed staging file")
                    }
                };
            }
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        candidates.push(Candidate {
            year: year_from_name(&name),
            staged: path.starts_with(&staging),
            path,
            kind,
        });
    }

    prioritize(candidates, opts.priority_years)
}

/// Priority-window candidates first, newest first; the rest oldest first so
/// older cohorts are not starved.
fn prioritize(candidates: Vec<Candidate>, window: Option<(i32, i32)>) -> Vec<Candidate> {
    let (min_year, max_year) = match window {
        Some(w) => w,
        None => {
            let mut rest = candidates;
            rest.sort_by(|a, b| basename(&a.path).cmp(&basename(&b.path)));
            return rest;
        }
    };
    let (mut priority, mut rest): (Vec<_>, Vec<_>) = candidates.into_iter().partition(|c| {
        c.year
            .map(|y| y >= min_year && y <= max_year)
            .unwrap_or(false)
    });
    priority.sort_by(|a, b| basename(&b.path).cmp(&basename(&a.path)));
    rest.sort_by(|a, b| basename(&a.path).cmp(&basename(&b.path)));
    priority.extend(rest);
    priority
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    walk(dir, false, out)
}

fn walk(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!(dir = %dir.display(), error = %err, "cannot read directory; skipping");
            }
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if recursive {
                walk(&path, true, out);
            }
        } else {
            out.push(path);
        }
    }
}

/// Rename a consumed staging file back under the files root. On name
/// collision the epoch-seconds suffix keeps both.
pub fn move_to_originals(root: &Path, path: &Path) -> io::Result<PathBuf> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut dest = root.join(&name);
    if dest.exists() {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        dest = root.join(format!("{}.{}", name, epoch));
    }
    fs::rename(path, &dest)?;
    Ok(dest)
}
