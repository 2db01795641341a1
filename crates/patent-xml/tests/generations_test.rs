//! End-to-end parses of one representative document per schema generation.

use patent_xml::{parse_document, DocKind, PartyType};

const LEGACY_2003: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<patent-application-publication>
  <subdoc-bibliographic-information>
    <document-id>
      <doc-number>US20030050000A1</doc-number>
      <kind-code>A1</kind-code>
      <document-date>20030313</document-date>
    </document-id>
    <domestic-filing-data>
      <application-number><doc-number>09/998,264</doc-number></application-number>
      <filing-date>20011129</filing-date>
    </domestic-filing-data>
    <technical-information>
      <title-of-invention>Adjustable widget fastener</title-of-invention>
    </technical-information>
    <inventors>
      <first-named-inventor>
        <name><name-1>Maria</name-1><name-2>Garcia</name-2></name>
        <residence><city>Madrid</city><country>ES</country></residence>
      </first-named-inventor>
    </inventors>
  </subdoc-bibliographic-information>
  <subdoc-abstract>
    <paragraph id="A-0001">A fastener that adjusts to widget size.</paragraph>
  </subdoc-abstract>
  <subdoc-description>
    <paragraph id="P-0001"><number>[0001]</number> The invention relates to fasteners.</paragraph>
    <paragraph id="P-0002"><number>[0002]</number> Prior fasteners were fixed-size.</paragraph>
  </subdoc-description>
  <subdoc-claims>
    <claim id="CLM-1"><claim-text>1. A fastener comprising a body.</claim-text></claim>
    <claim id="CLM-2"><claim-text>2. The fastener of claim 1, wherein the body is steel.</claim-text></claim>
  </subdoc-claims>
</patent-application-publication>"#;

const NEW_SCHEMA_2016: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<us-patent-application-publication lang="EN" dtd-version="v4.4 2014-04-03">
  <us-bibliographic-data-application lang="EN" country="US">
    <publication-reference>
      <document-id>
        <country>US</country>
        <doc-number>20160148332</doc-number>
        <kind>A1</kind>
        <date>20160526</date>
      </document-id>
    </publication-reference>
    <application-reference appl-type="utility">
      <document-id>
        <country>US</country>
        <doc-number>14549358</doc-number>
        <date>20141120</date>
      </document-id>
    </application-reference>
    <invention-title id="d2e71">Cloud ledger reconciliation</invention-title>
    <us-parties>
      <inventors>
        <inventor sequence="00" designation="us-only">
          <addressbook>
            <last-name>Doe</last-name>
            <first-name>Jane</first-name>
            <address><city>Austin</city><country>US</country></address>
          </addressbook>
        </inventor>
      </inventors>
    </us-parties>
    <assignees>
      <assignee>
        <addressbook>
          <orgname>Acme Ledger Corp</orgname>
          <address><city>Dallas</city><country>US</country></address>
        </addressbook>
      </assignee>
    </assignees>
  </us-bibliographic-data-application>
  <abstract id="abstract">
    <p id="p-0001" num="0000">A reconciliation engine for distributed ledgers.</p>
  </abstract>
  <description id="description">
    <heading id="h-0001" level="1">TECHNICAL FIELD</heading>
    <p id="p-0001" num="0001">The present disclosure relates to ledgers.</p>
    <p id="p-0002" num="0002">Reconciliation is performed in batches.</p>
  </description>
  <claims id="claims">
    <claim id="CLM-00001" num="00001">
      <claim-text>1. An engine comprising a processor.</claim-text>
    </claim>
  </claims>
</us-patent-application-publication>"#;

fn grant_doc(number: &str, title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE us-patent-grant SYSTEM "us-patent-grant-v47-2022-02-17.dtd">
<us-patent-grant lang="EN" dtd-version="v4.7">
  <us-bibliographic-data-grant>
    <publication-reference>
      <document-id><country>US</country><doc-number>{number}</doc-number><kind>B2</kind><date>20250107</date></document-id>
    </publication-reference>
    <application-reference appl-type="utility">
      <document-id><country>US</country><doc-number>17111222</doc-number><date>20230601</date></document-id>
    </application-reference>
    <invention-title id="d2e53">{title}</invention-title>
  </us-bibliographic-data-grant>
  <abstract id="abstract"><p id="p-0001" num="0000">Abstract for {number}.</p></abstract>
  <description id="description"><p id="p-0002" num="0001">Grant body text.</p></description>
  <claims id="claims"><claim id="CLM-00001"><claim-text>1. A granted thing.</claim-text></claim></claims>
</us-patent-grant>
"#
    )
}

#[test]
fn legacy_2003_split_archive_member() {
    let path = "20030313A.ZIP/20030313/UTIL0050/US20030050000A1-20030313.ZIP/US20030050000A1-20030313.XML";
    let records = parse_document(path, LEGACY_2003.as_bytes());
    assert_eq!(1, records.len());
    let r = &records[0];

    // The synthetic path is the highest-priority pub-id source.
    assert_eq!("20030050000", r.pub_id);
    assert_eq!(DocKind::Publication, r.doc_kind);
    assert_eq!("A1", r.kind);
    assert_eq!("09998264", r.application_number);
    assert_eq!(Some(2003), r.year);
    assert!(r.raw_xml_path.starts_with("20030313A.ZIP/"));
    assert_eq!("Adjustable widget fastener", r.title);
    assert_eq!("A fastener that adjusts to widget size.", r.abstract_text);
    assert_eq!(2, r.claims.len());
    assert_eq!(1, r.inventors.len());
    assert_eq!("Maria Garcia", r.inventors[0].name);
    assert!(r
        .description_body
        .starts_with("[0001] The invention relates to fasteners."));
    assert!(r.description_body.contains("[0002] Prior fasteners"));
    assert!(r.claims_text.starts_with("1. A fastener"));
}

#[test]
fn new_schema_2016_tar_member() {
    let path =
        "I20160526.tar/I20160526/UTIL0148/US20160148332A1-20160526.ZIP/US20160148332A1-20160526.XML";
    let records = parse_document(path, NEW_SCHEMA_2016.as_bytes());
    assert_eq!(1, records.len());
    let r = &records[0];

    assert_eq!("20160148332", r.pub_id);
    assert_eq!("A1", r.kind);
    assert_eq!("14549358", r.application_number);
    assert_eq!(Some(2016), r.year);
    assert_eq!(
        Some(chrono::NaiveDate::from_ymd_opt(2014, 11, 20).unwrap()),
        r.filing_date
    );
    assert!(r.raw_xml_path.starts_with("I20160526.tar/"));
    assert_eq!("Cloud ledger reconciliation", r.title);
    assert_eq!(1, r.inventors.len());
    assert_eq!("Jane Doe", r.inventors[0].name);
    assert_eq!(PartyType::Organization, r.assignees[0].party_type);
    assert_eq!("Acme Ledger Corp", r.assignees[0].name);

    assert!(r.description_combined.starts_with("CLAIMS:\n1. An engine"));
    assert!(r
        .description_body
        .starts_with("[0001] The present disclosure relates to ledgers."));
    assert!(r.description_body.contains("[0002] Reconciliation"));
}

#[test]
fn direct_xml_zip_entry_uses_entry_name() {
    let path = "ipa160526.zip/US20160148332A1-20160526.XML";
    let records = parse_document(path, NEW_SCHEMA_2016.as_bytes());
    assert_eq!(1, records.len());
    assert_eq!("20160148332", records[0].pub_id);
    assert_eq!(path, records[0].raw_xml_path);
}

#[test]
fn grant_bundle_yields_one_record_per_grant() {
    let blob = format!(
        "{}{}",
        grant_doc("12345678", "Grant One"),
        grant_doc("12345679", "Grant Two")
    );
    let records = parse_document("ipg250107.zip/ipg250107.xml", blob.as_bytes());
    assert_eq!(2, records.len());

    for (record, number) in records.iter().zip(["12345678", "12345679"]) {
        assert_eq!(number, record.pub_id);
        assert_eq!(DocKind::Grant, record.doc_kind);
        assert_eq!("B2", record.kind);
        assert_eq!("17111222", record.application_number);
        assert_eq!(Some(2025), record.year);
        assert_eq!("ipg250107.zip/ipg250107.xml", record.raw_xml_path);
        assert!(record.abstract_text.contains(number));
        // Grant bulk text is never stored, even when the source has it;
        // consumers re-open the archive at raw_xml_path instead.
        assert!(record.claims.is_empty());
        assert_eq!("", record.description_combined);
        assert_eq!("", record.description_body);
        assert_eq!("", record.claims_text);
    }
}

#[test]
fn claims_without_description_still_populate_claims_text() {
    let xml = r#"<us-patent-application-publication>
      <publication-reference><document-id><doc-number>20200000001</doc-number></document-id></publication-reference>
      <claims><claim><claim-text>1. A thing.</claim-text></claim></claims>
    </us-patent-application-publication>"#;
    let records = parse_document("weekly.zip/doc.XML", xml.as_bytes());
    assert_eq!(1, records.len());
    let r = &records[0];
    assert_eq!("CLAIMS:\n1. A thing.", r.description_combined);
    assert_eq!("1. A thing.", r.claims_text);
    assert_eq!("", r.description_body);
}

#[test]
fn bounded_fields_respect_caps() {
    let long_title = "T".repeat(700);
    let xml = format!(
        r#"<us-patent-application-publication>
      <publication-reference><document-id><doc-number>20200000002</doc-number><date>20200102</date></document-id></publication-reference>
      <invention-title>{long_title}</invention-title>
    </us-patent-application-publication>"#
    );
    let records = parse_document("weekly.zip/doc.XML", xml.as_bytes());
    assert_eq!(1, records.len());
    let r = &records[0];
    assert_eq!(500, r.title.len());
    assert!(!r.title.contains('\0'));
    assert_eq!(Some(2020), r.year);
}
