//! On-demand retrieval of a single XML by date and filename. Used for
//! backfill requests, not by primary ingest: a target document may live in
//! a split weekly (`D.ZIP` / `D A.ZIP` / `D B.ZIP`), in the staging mirror
//! of any of those, or in a pre-extracted directory tree.

use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use crate::StreamError;

/// Find a pre-expanded XML under `<root>/<year>/xml_extracted`. The
/// expected stamp directory is tried first; otherwise the whole subtree is
/// searched. Any path whose leaf matches the target filename is a hit,
/// which also covers the nested `PG-PUB-2` legacy packaging.
pub fn locate_extracted(root: &Path, date: &str, filename: &str) -> Option<PathBuf> {
    let year = date.get(..4)?;
    let base = root.join(year).join("xml_extracted");
    let expected = base.join(date);
    if expected.is_dir() {
        if let Some(hit) = find_by_leaf(&expected, filename) {
            return Some(hit);
        }
    }
    find_by_leaf(&base, filename)
}

fn find_by_leaf(dir: &Path, filename: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if let Some(hit) = find_by_leaf(&path, filename) {
                return Some(hit);
            }
        } else if path
            .file_name()
            .map(|n| n.to_string_lossy().eq_ignore_ascii_case(filename))
            .unwrap_or(false)
        {
            return Some(path);
        }
    }
    None
}

/// The split-archive rule: `D.ZIP`, `D A.ZIP`, and `D B.ZIP` (plus their
/// staging mirrors) are one logical archive. Each candidate that exists is
/// loaded and searched in turn; the first non-empty extraction wins.
/// Archives are dropped before the next candidate loads, so nothing is
/// cached across dates.
pub fn load_split_xml(
    root: &Path,
    date: &str,
    filename: &str,
) -> Result<Option<Vec<u8>>, StreamError> {
    let year = match date.get(..4) {
        Some(y) => y,
        None => return Ok(None),
    };

    let mut candidates = Vec::with_capacity(6);
    for suffix in ["", "A", "B"] {
        let file = format!("{}{}.ZIP", date, suffix);
        candidates.push(root.join(year).join(&file));
        candidates.push(root.join("NewFiles").join(&file));
    }

    for candidate in candidates {
        if !candidate.is_file() {
            continue;
        }
        match find_in_zip(&candidate, filename) {
            Ok(Some(bytes)) if !bytes.is_empty() => return Ok(Some(bytes)),
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(archive = %candidate.display(), error = %err, "skipping unreadable split archive");
            }
        }
    }

    if let Some(path) = locate_extracted(root, date, filename) {
        return Ok(Some(fs::read(path)?));
    }
    Ok(None)
}

fn leaf(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn find_in_zip(path: &Path, filename: &str) -> Result<Option<Vec<u8>>, StreamError> {
    let file = File::open(path).map_err(StreamError::Open)?;
    let mut outer = zip::ZipArchive::new(io::BufReader::new(file))?;

    let mut names = Vec::with_capacity(outer.len());
    for i in 0..outer.len() {
        names.push(outer.by_index(i).map(|e| e.name().to_string()).unwrap_or_default());
    }

    for (i, name) in names.iter().enumerate() {
        let upper = name.to_ascii_uppercase();
        if leaf(name).eq_ignore_ascii_case(filename) {
            let mut bytes = Vec::new();
            outer.by_index(i)?.read_to_end(&mut bytes)?;
            return Ok(Some(bytes));
        }
        if upper.ends_with(".ZIP") && !upper.contains("DTDS") && !upper.contains("ENTITIES") {
            let mut inner_bytes = Vec::new();
            outer.by_index(i)?.read_to_end(&mut inner_bytes)?;
            match find_in_zip_reader(Cursor::new(inner_bytes), filename) {
                Ok(Some(bytes)) => return Ok(Some(bytes)),
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(entry = %name, error = %err, "corrupt inner zip during backfill");
                }
            }
        }
    }
    Ok(None)
}

fn find_in_zip_reader<R: Read + Seek>(
    reader: R,
    filename: &str,
) -> Result<Option<Vec<u8>>, StreamError> {
    let mut archive = zip::ZipArchive::new(reader)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if leaf(entry.name()).eq_ignore_ascii_case(filename) {
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            return Ok(Some(bytes));
        }
    }
    Ok(None)
}
