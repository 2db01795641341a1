use std::fs::File;
use std::io::{self, Cursor, Read, Seek};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::{ArchiveKind, StreamError};

/// Drive `visit` with every `(synthetic_path, xml_bytes)` pair in the
/// archive. The synthetic path is `basename(archive)` followed by the full
/// container chain, so a consumer can re-open the original bytes later.
///
/// A single unreadable entry or inner container is logged and skipped; only
/// a top-level open failure aborts the archive.
pub fn stream_archive<F>(path: &Path, kind: ArchiveKind, visit: &mut F) -> Result<(), StreamError>
where
    F: FnMut(String, Vec<u8>),
{
    match kind {
        ArchiveKind::Zip => stream_zip(path, visit),
        ArchiveKind::Tar | ArchiveKind::TarGzip => stream_tar(path, kind, visit),
        ArchiveKind::ExtractedDir => Err(StreamError::NotStreamable(kind)),
    }
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn stream_zip<F>(path: &Path, visit: &mut F) -> Result<(), StreamError>
where
    F: FnMut(String, Vec<u8>),
{
    let file = File::open(path).map_err(StreamError::Open)?;
    let mut outer = zip::ZipArchive::new(io::BufReader::new(file))?;
    let base = basename(path);

    let mut names = Vec::with_capacity(outer.len());
    for i in 0..outer.len() {
        match outer.by_index(i) {
            Ok(entry) => names.push(entry.name().to_string()),
            Err(err) => {
                tracing::debug!(archive = %base, index = i, error = %err, "unreadable zip entry");
                names.push(String::new());
            }
        }
    }

    // Pre-2011 weeklies nest one ZIP per document; 2011+ weeklies hold the
    // XML entries directly. A single name scan decides the layout.
    let nested: Vec<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, name)| name.to_ascii_uppercase().ends_with(".ZIP"))
        .map(|(i, _)| i)
        .collect();

    if nested.is_empty() {
        stream_zip_xml_entries(&mut outer, &base, visit);
        return Ok(());
    }

    for i in nested {
        let name = names[i].clone();
        let upper = name.to_ascii_uppercase();
        // Schema payload, not documents.
        if upper.contains("DTDS") || upper.contains("ENTITIES") {
            continue;
        }
        let mut inner_bytes = Vec::new();
        {
            let mut entry = match outer.by_index(i) {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(archive = %base, entry = %name, error = %err, "skipping inner zip");
                    continue;
                }
            };
            if let Err(err) = entry.read_to_end(&mut inner_bytes) {
                tracing::debug!(archive = %base, entry = %name, error = %err, "failed reading inner zip");
                continue;
            }
        }
        let mut inner = match zip::ZipArchive::new(Cursor::new(inner_bytes)) {
            Ok(archive) => archive,
            Err(err) => {
                tracing::debug!(archive = %base, entry = %name, error = %err, "corrupt inner zip");
                continue;
            }
        };
        let prefix = format!("{}/{}", base, name);
        stream_zip_xml_entries(&mut inner, &prefix, visit);
    }
    Ok(())
}

fn stream_zip_xml_entries<R, F>(archive: &mut zip::ZipArchive<R>, prefix: &str, visit: &mut F)
where
    R: Read + Seek,
    F: FnMut(String, Vec<u8>),
{
    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(prefix, index = i, error = %err, "unreadable zip entry");
                continue;
            }
        };
        let name = entry.name().to_string();
        if !name.to_ascii_uppercase().ends_with(".XML") {
            continue;
        }
        let mut bytes = Vec::new();
        if let Err(err) = entry.read_to_end(&mut bytes) {
            tracing::debug!(prefix, entry = %name, error = %err, "failed reading xml entry");
            continue;
        }
        visit(format!("{}/{}", prefix, name), bytes);
    }
}

fn stream_tar<F>(path: &Path, kind: ArchiveKind, visit: &mut F) -> Result<(), StreamError>
where
    F: FnMut(String, Vec<u8>),
{
    let file = File::open(path).map_err(StreamError::Open)?;
    let reader: Box<dyn Read> = match kind {
        ArchiveKind::TarGzip => Box::new(GzDecoder::new(file)),
        _ => Box::new(file),
    };
    let mut archive = tar::Archive::new(reader);
    let base = basename(path);

    for entry in archive.entries()? {
        let mut entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(archive = %base, error = %err, "unreadable tar entry");
                continue;
            }
        };
        let name = match entry.path() {
            Ok(p) => p.to_string_lossy().into_owned(),
            Err(err) => {
                tracing::debug!(archive = %base, error = %err, "tar entry has no usable path");
                continue;
            }
        };
        let upper = name.to_ascii_uppercase();

        if upper.ends_with(".XML") {
            let mut bytes = Vec::new();
            if let Err(err) = entry.read_to_end(&mut bytes) {
                tracing::debug!(archive = %base, entry = %name, error = %err, "failed reading xml entry");
                continue;
            }
            visit(format!("{}/{}", base, name), bytes);
        } else if upper.ends_with(".ZIP") {
            let mut inner_bytes = Vec::new();
            if let Err(err) = entry.read_to_end(&mut inner_bytes) {
                tracing::debug!(archive = %base, entry = %name, error = %err, "failed reading inner zip");
                continue;
            }
            let mut inner = match zip::ZipArchive::new(Cursor::new(inner_bytes)) {
                Ok(archive) => archive,
                Err(err) => {
                    tracing::debug!(archive = %base, entry = %name, error = %err, "corrupt inner zip");
                    continue;
                }
            };
            let prefix = format!("{}/{}", base, name);
            stream_zip_xml_entries(&mut inner, &prefix, visit);
        }
    }
    Ok(())
}
