use std::fs;
use std::io::Read;
use std::path::Path;

/// ZIP local-file-header signature.
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Tar,
    TarGzip,
    /// A TAR whose contents were pre-expanded on disk. Entered only through
    /// an explicit backfill request, never by discovery.
    ExtractedDir,
}

/// Classify a candidate file. Extension rules run first (which covers the
/// uppercase `…SUPP….ZIP` one-offs); extensionless files at or above
/// `min_sniff_bytes` are sniffed by signature.
pub fn detect(path: &Path, min_sniff_bytes: u64) -> Option<ArchiveKind> {
    let name = path.file_name()?.to_string_lossy();
    let upper = name.to_ascii_uppercase();

    if upper.ends_with(".TAR.GZ") || upper.ends_with(".TGZ") {
        return Some(ArchiveKind::TarGzip);
    }
    if upper.ends_with(".TAR") {
        return Some(ArchiveKind::Tar);
    }
    if upper.ends_with(".ZIP") {
        return Some(ArchiveKind::Zip);
    }
    if upper.contains('.') {
        return None;
    }

    let meta = fs::metadata(path).ok()?;
    if !meta.is_file() || meta.len() < min_sniff_bytes {
        return None;
    }
    let mut prefix = Vec::with_capacity(262);
    fs::File::open(path)
        .ok()?
        .take(262)
        .read_to_end(&mut prefix)
        .ok()?;
    if prefix.starts_with(&ZIP_MAGIC) {
        return Some(ArchiveKind::Zip);
    }
    if prefix.len() >= 262 && &prefix[257..262] == b"ustar" {
        return Some(ArchiveKind::Tar);
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn extension_rules_do_not_touch_the_filesystem() {
        // These paths do not exist; classification is by name alone.
        assert_eq!(Some(ArchiveKind::Zip), detect(Path::new("/no/20030313A.ZIP"), 0));
        assert_eq!(Some(ArchiveKind::Zip), detect(Path::new("/no/ipg250107.zip"), 0));
        assert_eq!(Some(ArchiveKind::Zip), detect(Path::new("/no/USPATSUPP.ZIP"), 0));
        assert_eq!(Some(ArchiveKind::Tar), detect(Path::new("/no/I20160526.tar"), 0));
        assert_eq!(Some(ArchiveKind::TarGzip), detect(Path::new("/no/old.tar.gz"), 0));
        assert_eq!(Some(ArchiveKind::TarGzip), detect(Path::new("/no/old.tgz"), 0));
        assert_eq!(None, detect(Path::new("/no/readme.txt"), 0));
    }

    #[test]
    fn extensionless_files_are_sniffed_by_magic() {
        let dir = tempfile::tempdir().unwrap();

        let zip_path = dir.path().join("weekly_zip_blob");
        let mut f = fs::File::create(&zip_path).unwrap();
        f.write_all(&super::ZIP_MAGIC).unwrap();
        f.write_all(&vec![0u8; 600]).unwrap();
        assert_eq!(Some(ArchiveKind::Zip), detect(&zip_path, 1));

        let tar_path = dir.path().join("weekly_tar_blob");
        let mut f = fs::File::create(&tar_path).unwrap();
        let mut block = vec![0u8; 600];
        block[257..262].copy_from_slice(b"ustar");
        f.write_all(&block).unwrap();
        assert_eq!(Some(ArchiveKind::Tar), detect(&tar_path, 1));

        // Below the sniffing threshold nothing is classified.
        assert_eq!(None, detect(&zip_path, 10_000_000));

        let junk = dir.path().join("junk_blob");
        fs::write(&junk, vec![7u8; 600]).unwrap();
        assert_eq!(None, detect(&junk, 1));
    }
}
