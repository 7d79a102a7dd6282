use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use surveyfill_core::overrides::{parse_payload, scan_markers, OverrideTable};
use surveyfill_core::page::Page;

fn page(html: &str) -> Page {
    Page::parse(html, 1920.0, 1080.0).unwrap()
}

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn test_parse_payload_groups() {
    assert_eq!(
        parse_payload("Q1, A1 ,A2 | Q2,A3"),
        vec![
            ("Q1".to_string(), strings(&["A1", "A2"])),
            ("Q2".to_string(), strings(&["A3"])),
        ]
    );
}

#[test]
fn test_parse_payload_skips_groups_without_code() {
    assert_eq!(
        parse_payload(",A1|Q2,A3||"),
        vec![("Q2".to_string(), strings(&["A3"]))]
    );
    assert!(parse_payload("").is_empty());
}

#[test]
fn test_parse_payload_code_only_group() {
    assert_eq!(parse_payload("Q5"), vec![("Q5".to_string(), Vec::<String>::new())]);
    assert_eq!(parse_payload("Q5,,A1,"), vec![("Q5".to_string(), strings(&["A1"]))]);
}

#[test]
fn test_scan_markers_reads_both_kinds() {
    let p = page(
        r#"<html><body>
        <force data-force="Q1,A3"></force>
        <avoid data-avoid="Q6,Y|Q7,A2,A3"></avoid>
        </body></html>"#,
    );
    let scanned = scan_markers(&p);
    assert!(scanned.found);
    assert_eq!(scanned.table.force.get("Q1"), Some(&strings(&["A3"])));
    assert_eq!(scanned.table.avoid.get("Q6"), Some(&set(&["Y"])));
    assert_eq!(scanned.table.avoid.get("Q7"), Some(&set(&["A2", "A3"])));
}

#[test]
fn test_scan_markers_last_marker_of_a_kind_wins() {
    let p = page(
        r#"<html><body>
        <force data-force="Q1,A1|Q2,A2"></force>
        <force data-force="Q3,A3"></force>
        </body></html>"#,
    );
    let scanned = scan_markers(&p);
    assert_eq!(scanned.table.force.len(), 1);
    assert_eq!(scanned.table.force.get("Q3"), Some(&strings(&["A3"])));
}

#[test]
fn test_scan_markers_empty_page() {
    let scanned = scan_markers(&page("<html><body><p>Hi</p></body></html>"));
    assert!(!scanned.found);
    assert!(scanned.table.is_empty());
}

#[test]
fn test_marker_without_payload() {
    let scanned = scan_markers(&page("<html><body><force></force></body></html>"));
    assert!(scanned.found);
    assert!(scanned.table.is_empty());
}

#[test]
fn test_merge_fresh_wins_persisted_fills_gaps() {
    let mut fresh = OverrideTable::default();
    fresh.force.insert("Q1".into(), strings(&["A9"]));
    let mut persisted = OverrideTable::default();
    persisted.force.insert("Q1".into(), strings(&["A1"]));
    persisted.force.insert("Q2".into(), strings(&["A2"]));
    persisted.avoid.insert("Q3".into(), set(&["A3"]));

    let merged = OverrideTable::merge(&fresh, &persisted);
    assert_eq!(merged.force.get("Q1"), Some(&strings(&["A9"])));
    assert_eq!(merged.force.get("Q2"), Some(&strings(&["A2"])));
    assert_eq!(merged.avoid.get("Q3"), Some(&set(&["A3"])));

    // merging the same persisted table again changes nothing
    assert_eq!(OverrideTable::merge(&merged, &persisted), merged);
    assert_eq!(OverrideTable::merge(&merged, &merged), merged);
    assert_eq!(OverrideTable::merge(&persisted, &persisted), persisted);
}

#[test]
fn test_merge_with_empty_fresh_keeps_persisted() {
    let mut persisted = OverrideTable::default();
    persisted.avoid.insert("Q3".into(), set(&["A3"]));
    assert_eq!(OverrideTable::merge(&OverrideTable::default(), &persisted), persisted);
}

#[test]
fn test_lookups_treat_empty_lists_as_absent() {
    let mut table = OverrideTable::default();
    table.force.insert("Q1".into(), vec![]);
    table.avoid.insert("Q1".into(), BTreeSet::new());
    table.force.insert("Q2".into(), strings(&["A1", "A2"]));

    assert_eq!(table.lookup_forced("Q1"), None);
    assert_eq!(table.lookup_avoided("Q1"), None);
    assert_eq!(table.lookup_forced("Q2"), Some(&strings(&["A1", "A2"])[..]));
    assert_eq!(table.lookup_forced("Q404"), None);
}

#[test]
fn test_json_round_trip_and_null_maps() {
    let mut table = OverrideTable::default();
    table.force.insert("Q1".into(), strings(&["A1"]));
    table.avoid.insert("Q2".into(), set(&["A2", "A3"]));
    let json = table.to_json().unwrap();
    assert_eq!(OverrideTable::from_json(&json).unwrap(), table);

    let parsed = OverrideTable::from_json(r#"{"avoid":null,"force":{"Q1":["A1"]}}"#).unwrap();
    assert!(parsed.avoid.is_empty());
    assert_eq!(parsed.force.get("Q1"), Some(&strings(&["A1"])));

    assert!(OverrideTable::from_json("{}").unwrap().is_empty());
    assert!(OverrideTable::from_json("not json").is_err());
}
