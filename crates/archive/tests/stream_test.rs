//! Streaming over real archives built in a temp directory.

use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::Path;

use archive::{backfill, detect, stream_archive, ArchiveKind};

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default();
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    fs::write(path, zip_bytes(entries)).unwrap();
}

fn collect(path: &Path, kind: ArchiveKind) -> Vec<(String, Vec<u8>)> {
    let mut out = Vec::new();
    stream_archive(path, kind, &mut |name, bytes| out.push((name, bytes))).unwrap();
    out
}

#[test]
fn nested_zip_layout_streams_inner_xml() {
    let dir = tempfile::tempdir().unwrap();
    let inner_a = zip_bytes(&[("US20030050000A1-20030313.XML", b"<doc>a</doc>" as &[u8])]);
    let inner_b = zip_bytes(&[("US20030050001A1-20030313.XML", b"<doc>b</doc>" as &[u8])]);
    let dtds = zip_bytes(&[("ST32.DTD", b"<!ELEMENT x>" as &[u8])]);

    let outer = dir.path().join("20030313A.ZIP");
    write_zip(
        &outer,
        &[
            ("20030313/UTIL0050/US20030050000A1-20030313.ZIP", &inner_a[..]),
            ("20030313/UTIL0050/US20030050001A1-20030313.ZIP", &inner_b[..]),
            ("20030313/DTDS.ZIP", &dtds[..]),
        ],
    );

    let got = collect(&outer, ArchiveKind::Zip);
    assert_eq!(2, got.len());
    assert_eq!(
        "20030313A.ZIP/20030313/UTIL0050/US20030050000A1-20030313.ZIP/US20030050000A1-20030313.XML",
        got[0].0
    );
    assert_eq!(b"<doc>a</doc>".to_vec(), got[0].1);
    // The DTDS payload is schema material, never streamed.
    assert!(got.iter().all(|(name, _)| !name.contains("DTDS")));
}

#[test]
fn direct_xml_layout_streams_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ipa160526.zip");
    write_zip(
        &path,
        &[
            ("US20160148332A1-20160526.XML", b"<doc>x</doc>" as &[u8]),
            ("US20160148333A1-20160526.XML", b"<doc>y</doc>" as &[u8]),
            ("README.TXT", b"not xml" as &[u8]),
        ],
    );
    let got = collect(&path, ArchiveKind::Zip);
    assert_eq!(2, got.len());
    assert_eq!("ipa160526.zip/US20160148332A1-20160526.XML", got[0].0);
}

#[test]
fn tar_streams_xml_and_descends_into_zips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("I20160526.tar");
    let inner = zip_bytes(&[("US20160148332A1-20160526.XML", b"<doc>t</doc>" as &[u8])]);

    let mut builder = tar::Builder::new(File::create(&path).unwrap());
    let mut add = |name: &str, data: &[u8]| {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, data).unwrap();
    };
    add("I20160526/UTIL0148/US20160148332A1-20160526.ZIP", &inner);
    add("I20160526/direct.XML", b"<doc>d</doc>");
    add("I20160526/skip.txt", b"nope");
    builder.into_inner().unwrap();

    let got = collect(&path, ArchiveKind::Tar);
    assert_eq!(2, got.len());
    assert_eq!(
        "I20160526.tar/I20160526/UTIL0148/US20160148332A1-20160526.ZIP/US20160148332A1-20160526.XML",
        got[0].0
    );
    assert_eq!("I20160526.tar/I20160526/direct.XML", got[1].0);
}

#[test]
fn gzipped_tar_streams() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weekly.tar.gz");

    let encoder = flate2::write::GzEncoder::new(
        File::create(&path).unwrap(),
        flate2::Compression::default(),
    );
    let mut builder = tar::Builder::new(encoder);
    let mut header = tar::Header::new_gnu();
    header.set_size(12);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "doc.XML", &b"<doc>g</doc>"[..])
        .unwrap();
    builder.into_inner().unwrap().finish().unwrap();

    let got = collect(&path, ArchiveKind::TarGzip);
    assert_eq!(1, got.len());
    assert_eq!("weekly.tar.gz/doc.XML", got[0].0);
    assert_eq!(b"<doc>g</doc>".to_vec(), got[0].1);
}

#[test]
fn corrupt_archive_open_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.zip");
    fs::write(&path, b"this is not a zip").unwrap();
    let result = stream_archive(&path, ArchiveKind::Zip, &mut |_, _| {});
    assert!(result.is_err());
}

#[test]
fn corrupt_inner_zip_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let good = zip_bytes(&[("GOOD.XML", b"<doc/>" as &[u8])]);
    let outer = dir.path().join("20040101.ZIP");
    write_zip(
        &outer,
        &[
            ("20040101/BAD.ZIP", b"garbage bytes" as &[u8]),
            ("20040101/GOOD.ZIP", &good[..]),
        ],
    );
    let got = collect(&outer, ArchiveKind::Zip);
    assert_eq!(1, got.len());
    assert!(got[0].0.ends_with("GOOD.ZIP/GOOD.XML"));
}

#[test]
fn detection_matches_built_archives() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("20030313.ZIP");
    write_zip(&path, &[("A.XML", b"<a/>" as &[u8])]);
    assert_eq!(Some(ArchiveKind::Zip), detect(&path, 1));
}

#[test]
fn split_archives_are_searched_as_one_logical_archive() {
    let root = tempfile::tempdir().unwrap();
    let year_dir = root.path().join("2003");
    fs::create_dir_all(&year_dir).unwrap();

    let inner_a = zip_bytes(&[("US20030050000A1-20030313.XML", b"<doc>a</doc>" as &[u8])]);
    let inner_b = zip_bytes(&[("US20030046754A1-20030313.XML", b"<doc>b</doc>" as &[u8])]);
    write_zip(
        &year_dir.join("20030313A.ZIP"),
        &[("20030313/UTIL0050/US20030050000A1-20030313.ZIP", &inner_a[..])],
    );
    write_zip(
        &year_dir.join("20030313B.ZIP"),
        &[("20030313/UTIL0046/US20030046754A1-20030313.ZIP", &inner_b[..])],
    );

    // Lives in the B half; the A half is tried and passed over.
    let bytes = backfill::load_split_xml(
        root.path(),
        "20030313",
        "US20030046754A1-20030313.XML",
    )
    .unwrap()
    .expect("target should be found in the B archive");
    assert_eq!(b"<doc>b</doc>".to_vec(), bytes);

    assert!(backfill::load_split_xml(root.path(), "20030313", "US99999999.XML")
        .unwrap()
        .is_none());
}

#[test]
fn staging_mirror_is_part_of_the_split_set() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("2004")).unwrap();
    fs::create_dir_all(root.path().join("NewFiles")).unwrap();

    write_zip(
        &root.path().join("NewFiles").join("20040105.ZIP"),
        &[("US20040000001A1-20040105.XML", b"<doc>staged</doc>" as &[u8])],
    );

    let bytes = backfill::load_split_xml(root.path(), "20040105", "US20040000001A1-20040105.XML")
        .unwrap()
        .expect("staging mirror should be searched");
    assert_eq!(b"<doc>staged</doc>".to_vec(), bytes);
}

#[test]
fn extracted_tree_lookup_handles_nested_packaging() {
    let root = tempfile::tempdir().unwrap();
    let nested = root
        .path()
        .join("2002")
        .join("xml_extracted")
        .join("20020801")
        .join("PG-PUB-2")
        .join("UTIL0001");
    fs::create_dir_all(&nested).unwrap();
    let target = nested.join("US20020000001A1-20020801.XML");
    fs::write(&target, b"<doc>extracted</doc>").unwrap();

    let hit = backfill::locate_extracted(root.path(), "20020801", "US20020000001A1-20020801.XML")
        .expect("recursive leaf search should find the file");
    assert_eq!(target, hit);

    // Falls back through load_split_xml when no split ZIPs exist.
    let bytes =
        backfill::load_split_xml(root.path(), "20020801", "US20020000001A1-20020801.XML")
            .unwrap()
            .expect("extracted tree is the last fallback");
    assert_eq!(b"<doc>extracted</doc>".to_vec(), bytes);
}
