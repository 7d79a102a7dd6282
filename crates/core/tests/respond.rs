//! Dummy answers per widget kind, driven with seeded RNGs.

use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use surveyfill_core::classify::{SemanticContext, WidgetKind};
use surveyfill_core::config::ResponseConfig;
use surveyfill_core::error::HelperError;
use surveyfill_core::overrides::OverrideTable;
use surveyfill_core::page::{ElementId, Page};
use surveyfill_core::respond::values::{date_stamp, numeric_with_refusal, roll};
use surveyfill_core::respond::{
    Responder, CHECKBOX_SELECTOR, DROPDOWN_SELECTOR, NUMERIC_SELECTOR, RADIO_SELECTOR,
    SHORT_TEXT_SELECTOR,
};

fn load_fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path, e))
}

fn parse_fixture(name: &str) -> Page {
    Page::parse(&load_fixture(name), 1920.0, 1080.0).expect("fixture should parse")
}

fn loaded_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 19)
        .unwrap()
        .and_hms_opt(14, 5, 0)
        .unwrap()
}

fn respond(
    seed: u64,
    kind: WidgetKind,
    context: SemanticContext,
    overrides: &OverrideTable,
    question: &str,
    page: &mut Page,
) -> Result<(), HelperError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let config = ResponseConfig::default();
    Responder::new(&mut rng, loaded_at(), &config).respond(kind, context, overrides, question, page)
}

fn forced(question: &str, values: &[&str]) -> OverrideTable {
    let mut table = OverrideTable::default();
    table.force.insert(
        question.to_string(),
        values.iter().map(|v| v.to_string()).collect(),
    );
    table
}

fn avoided(question: &str, values: &[&str]) -> OverrideTable {
    let mut table = OverrideTable::default();
    table.avoid.insert(
        question.to_string(),
        values.iter().map(|v| v.to_string()).collect(),
    );
    table
}

fn checked_values(page: &Page, selector: &str) -> Vec<String> {
    page.query_all(selector)
        .into_iter()
        .filter(|&id| page.is_checked(id))
        .map(|id| page.value(id).to_string())
        .collect()
}

fn other_box(page: &Page, name: &str) -> ElementId {
    page.query(&format!("input[name=\"{}\"]", name)).unwrap()
}

// --- values ---

#[test]
fn test_roll_is_half_open() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let v = roll(&mut rng, 18, 100);
        assert!((18..100).contains(&v), "{} out of range", v);
    }
    assert_eq!(roll(&mut rng, 5, 5), 5);
    assert_eq!(roll(&mut rng, 5, 1), 5);
}

#[test]
fn test_year_refusal_rate() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut refusals = 0;
    for _ in 0..1000 {
        let v = numeric_with_refusal(&mut rng, 1910, 2008, Some(9999), 20);
        if v == 9999 {
            refusals += 1;
        } else {
            assert!((1910..2008).contains(&v), "{} out of range", v);
        }
    }
    assert!(
        (150..=250).contains(&refusals),
        "expected about 200 refusals, got {}",
        refusals
    );
}

#[test]
fn test_date_stamp_format() {
    assert_eq!(date_stamp(&loaded_at()), "10-19 14:05");
    let early = NaiveDate::from_ymd_opt(2026, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 0)
        .unwrap();
    assert_eq!(date_stamp(&early), "01-02 03:04");
}

// --- single choice ---

#[test]
fn test_single_choice_never_picks_hidden_option() {
    for seed in 0..100 {
        let mut page = parse_fixture("single_choice.html");
        respond(seed, WidgetKind::SingleChoice, SemanticContext::None, &OverrideTable::default(), "Q1", &mut page)
            .unwrap();
        let checked = checked_values(&page, RADIO_SELECTOR);
        assert_eq!(checked.len(), 1, "seed {}", seed);
        assert_ne!(checked[0], "A2", "seed {}", seed);
    }
}

#[test]
fn test_single_choice_forced_visible_option() {
    for seed in 0..20 {
        let mut page = parse_fixture("single_choice.html");
        respond(seed, WidgetKind::SingleChoice, SemanticContext::None, &forced("Q1", &["A3"]), "Q1", &mut page)
            .unwrap();
        assert_eq!(checked_values(&page, RADIO_SELECTOR), vec!["A3".to_string()]);
    }
}

#[test]
fn test_single_choice_forced_hidden_option_is_an_error() {
    let mut page = parse_fixture("single_choice.html");
    let err = respond(7, WidgetKind::SingleChoice, SemanticContext::None, &forced("Q1", &["A2"]), "Q1", &mut page)
        .unwrap_err();

    assert!(err.is_alert());
    assert_eq!(
        err.to_string(),
        "ERROR: Q1 - option A2 is hidden but is being used as a forced option."
    );
    assert!(checked_values(&page, RADIO_SELECTOR).is_empty());
}

const CLASS_HIDDEN_RADIOS: &str = r#"<html><head><style>
    .ls-hidden { display: none; }
    </style></head><body><form id="limesurvey">
    <div class="question-container list-radio">
      <div class="answers-list">
        <div class="answer-item ls-hidden"><input type="radio" class="radio" name="q" value="A1"></div>
        <div class="answer-item"><input type="radio" class="radio" name="q" value="A2"></div>
        <div class="answer-item"><input type="radio" class="radio" name="q" value="A3"></div>
      </div>
    </div>
</form></body></html>"#;

#[test]
fn test_single_choice_skips_option_hidden_by_stylesheet() {
    for seed in 0..50 {
        let mut page = Page::parse(CLASS_HIDDEN_RADIOS, 1920.0, 1080.0).unwrap();
        respond(seed, WidgetKind::SingleChoice, SemanticContext::None, &OverrideTable::default(), "Q1", &mut page)
            .unwrap();
        let checked = checked_values(&page, RADIO_SELECTOR);
        assert_eq!(checked.len(), 1, "seed {}", seed);
        assert_ne!(checked[0], "A1", "seed {}", seed);
    }

    let mut page = Page::parse(CLASS_HIDDEN_RADIOS, 1920.0, 1080.0).unwrap();
    let err = respond(1, WidgetKind::SingleChoice, SemanticContext::None, &forced("Q1", &["A1"]), "Q1", &mut page)
        .unwrap_err();
    assert!(matches!(err, HelperError::HiddenOptionForced { ref value, .. } if value == "A1"));
    assert!(checked_values(&page, RADIO_SELECTOR).is_empty());
}

#[test]
fn test_single_choice_clears_previous_answer() {
    let mut page = parse_fixture("single_choice.html");
    let oth = page.query("#answer101oth").unwrap();
    page.set_checked(oth, true);
    let text = other_box(&page, "101X1X101other");
    page.set_value(text, "leftover");

    respond(1, WidgetKind::SingleChoice, SemanticContext::None, &forced("Q1", &["A1"]), "Q1", &mut page)
        .unwrap();
    assert_eq!(checked_values(&page, RADIO_SELECTOR), vec!["A1".to_string()]);
    assert_eq!(page.value(text), "");
}

#[test]
fn test_single_choice_avoid_leaves_other_option() {
    let overrides = avoided("Q1", &["A1", "A3"]);
    for seed in 0..20 {
        let mut page = parse_fixture("single_choice.html");
        respond(seed, WidgetKind::SingleChoice, SemanticContext::None, &overrides, "Q1", &mut page).unwrap();
        assert_eq!(checked_values(&page, RADIO_SELECTOR), vec!["-oth-".to_string()]);
        let text = other_box(&page, "101X1X101other");
        assert_eq!(page.value(text), "Run at: 10-19 14:05");
    }
}

#[test]
fn test_single_choice_other_box_follows_context() {
    let overrides = forced("Q1", &["-oth-"]);
    for seed in 0..20 {
        let mut page = parse_fixture("single_choice.html");
        respond(seed, WidgetKind::SingleChoice, SemanticContext::Age, &overrides, "Q1", &mut page).unwrap();
        let text = other_box(&page, "101X1X101other");
        let age: i64 = page.value(text).parse().unwrap();
        assert!((18..100).contains(&age));

        let mut page = parse_fixture("single_choice.html");
        respond(seed, WidgetKind::SingleChoice, SemanticContext::ZipCode, &overrides, "Q1", &mut page).unwrap();
        let text = other_box(&page, "101X1X101other");
        assert_eq!(page.value(text), "90210");
    }
}

#[test]
fn test_single_choice_all_visible_avoided() {
    let mut page = parse_fixture("single_choice.html");
    let err = respond(
        3,
        WidgetKind::SingleChoice,
        SemanticContext::None,
        &avoided("Q1", &["A1", "A3", "-oth-"]),
        "Q1",
        &mut page,
    )
    .unwrap_err();
    assert!(matches!(err, HelperError::NoEligibleOption { eligible: 0, required: 1, .. }));
    assert!(checked_values(&page, RADIO_SELECTOR).is_empty());
}

#[test]
fn test_single_choice_unmatched_forced_value_still_answers() {
    let mut page = parse_fixture("single_choice.html");
    respond(11, WidgetKind::SingleChoice, SemanticContext::None, &forced("Q1", &["ZZ"]), "Q1", &mut page)
        .unwrap();
    assert_eq!(checked_values(&page, RADIO_SELECTOR).len(), 1);
}

#[test]
fn test_overrides_for_other_questions_are_ignored() {
    for seed in 0..30 {
        let mut page = parse_fixture("single_choice.html");
        respond(seed, WidgetKind::SingleChoice, SemanticContext::None, &forced("Q9", &["A2"]), "Q1", &mut page)
            .unwrap();
        let checked = checked_values(&page, RADIO_SELECTOR);
        assert_eq!(checked.len(), 1);
        assert_ne!(checked[0], "A2");
    }
}

// --- numeric ---

#[test]
fn test_numeric_year_with_refusal() {
    let mut refusals = 0;
    for seed in 0..200 {
        let mut page = parse_fixture("numeric.html");
        respond(seed, WidgetKind::NumericInput, SemanticContext::YearWithRefusal9999, &OverrideTable::default(), "Q2", &mut page)
            .unwrap();
        let input = page.query(NUMERIC_SELECTOR).unwrap();
        let v: i64 = page.value(input).parse().unwrap();
        if v == 9999 {
            refusals += 1;
        } else {
            assert!((1910..2008).contains(&v), "{} out of range", v);
        }
    }
    assert!(refusals > 0 && refusals < 100, "refusals {}", refusals);
}

#[test]
fn test_numeric_values_per_context() {
    let cases: [(SemanticContext, std::ops::Range<i64>); 5] = [
        (SemanticContext::Age, 18..100),
        (SemanticContext::Percent, 18..100),
        (SemanticContext::Year, 1910..2008),
        (SemanticContext::Quantity, 0..20),
        (SemanticContext::None, 0..20),
    ];
    for (context, range) in cases {
        for seed in 0..20 {
            let mut page = parse_fixture("numeric.html");
            respond(seed, WidgetKind::NumericInput, context, &OverrideTable::default(), "Q2", &mut page).unwrap();
            let input = page.query(NUMERIC_SELECTOR).unwrap();
            let v: i64 = page.value(input).parse().unwrap();
            assert!(range.contains(&v), "{:?}: {} not in {:?}", context, v, range);
        }
    }

    let mut page = parse_fixture("numeric.html");
    respond(0, WidgetKind::NumericInput, SemanticContext::ZipCode, &OverrideTable::default(), "Q2", &mut page).unwrap();
    let input = page.query(NUMERIC_SELECTOR).unwrap();
    assert_eq!(page.value(input), "90210");
}

#[test]
fn test_numeric_refusal_zero() {
    let mut saw_zero = false;
    for seed in 0..100 {
        let mut page = parse_fixture("numeric.html");
        respond(seed, WidgetKind::NumericInput, SemanticContext::YearWithRefusalZero, &OverrideTable::default(), "Q2", &mut page)
            .unwrap();
        let input = page.query(NUMERIC_SELECTOR).unwrap();
        let v: i64 = page.value(input).parse().unwrap();
        if v == 0 {
            saw_zero = true;
        } else {
            assert!((1910..2008).contains(&v));
        }
    }
    assert!(saw_zero);
}

#[test]
fn test_multi_numeric_fills_every_field() {
    let mut page = parse_fixture("multi_numeric.html");
    respond(5, WidgetKind::MultiNumericInput, SemanticContext::Quantity, &OverrideTable::default(), "Q3", &mut page)
        .unwrap();
    let inputs = page.query_all(NUMERIC_SELECTOR);
    assert_eq!(inputs.len(), 3);
    for input in inputs {
        let v: i64 = page.value(input).parse().unwrap();
        assert!((0..20).contains(&v));
    }
}

#[test]
fn test_short_text_gets_stamp() {
    let mut page = parse_fixture("short_text.html");
    respond(0, WidgetKind::ShortText, SemanticContext::None, &OverrideTable::default(), "Q4", &mut page).unwrap();
    let input = page.query(SHORT_TEXT_SELECTOR).unwrap();
    assert_eq!(page.value(input), "Run at: 10-19 14:05");
}

// --- array ---

#[test]
fn test_array_checks_one_option_per_row() {
    for seed in 0..20 {
        let mut page = parse_fixture("array.html");
        respond(seed, WidgetKind::ArrayGrid, SemanticContext::None, &OverrideTable::default(), "Q5", &mut page)
            .unwrap();
        for row in page.query_all("tr.answers-list") {
            let checked = page
                .query_all_within(row, "input.radio")
                .into_iter()
                .filter(|&r| page.is_checked(r))
                .count();
            assert_eq!(checked, 1, "seed {} row {}", seed, row);
        }
    }
}

// --- multiple choice ---

#[test]
fn test_multi_choice_checks_between_one_and_half() {
    let mut counts = std::collections::BTreeSet::new();
    for seed in 0..200 {
        let mut page = parse_fixture("multi_choice.html");
        respond(seed, WidgetKind::MultiChoice, SemanticContext::None, &OverrideTable::default(), "Q6", &mut page)
            .unwrap();
        let checked: Vec<ElementId> = page
            .query_all(CHECKBOX_SELECTOR)
            .into_iter()
            .filter(|&b| page.is_checked(b))
            .collect();
        // six boxes: the count is drawn from [1, 3)
        assert!((1..=2).contains(&checked.len()), "seed {}: {}", seed, checked.len());
        counts.insert(checked.len());

        let durian = page.query("input[name=\"106SQ004\"]").unwrap();
        assert!(!page.is_checked(durian), "hidden box checked for seed {}", seed);

        let other = page.query("input.other-checkbox").unwrap();
        let text = other_box(&page, "106other");
        if page.is_checked(other) {
            assert_eq!(page.value(text), "Dummy Data");
        } else {
            assert_eq!(page.value(text), "");
        }
    }
    assert_eq!(counts.into_iter().collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn test_multi_choice_clears_previous_answer() {
    let mut page = parse_fixture("multi_choice.html");
    for b in page.query_all(CHECKBOX_SELECTOR) {
        page.set_checked(b, true);
    }
    respond(9, WidgetKind::MultiChoice, SemanticContext::None, &OverrideTable::default(), "Q6", &mut page)
        .unwrap();
    let checked = page
        .query_all(CHECKBOX_SELECTOR)
        .into_iter()
        .filter(|&b| page.is_checked(b))
        .count();
    assert!(checked <= 2);
}

#[test]
fn test_multi_choice_not_enough_visible_boxes() {
    let html = r#"<html><body><form id="limesurvey">
        <div class="question-container multiple-opt">
          <div class="questions-list">
            <div class="answer-item"><input type="checkbox" class="checkbox" name="a"></div>
            <div class="answer-item" style="display:none"><input type="checkbox" class="checkbox" name="b"></div>
            <div class="answer-item" style="display:none"><input type="checkbox" class="checkbox" name="c"></div>
            <div class="answer-item" style="display:none"><input type="checkbox" class="checkbox" name="d"></div>
            <div class="answer-item" style="display:none"><input type="checkbox" class="checkbox" name="e"></div>
            <div class="answer-item" style="display:none"><input type="checkbox" class="checkbox" name="f"></div>
          </div>
        </div>
    </form></body></html>"#;
    // six boxes allow one or two; only one is visible
    let mut saw_error = false;
    for seed in 0..50 {
        let mut page = Page::parse(html, 1920.0, 1080.0).unwrap();
        match respond(seed, WidgetKind::MultiChoice, SemanticContext::None, &OverrideTable::default(), "Q6", &mut page) {
            Ok(()) => {
                let a = page.query("input[name=\"a\"]").unwrap();
                assert!(page.is_checked(a));
            }
            Err(HelperError::NoEligibleOption { eligible, required, .. }) => {
                assert_eq!((eligible, required), (1, 2));
                saw_error = true;
            }
            Err(e) => panic!("unexpected error {}", e),
        }
    }
    assert!(saw_error);
}

#[test]
fn test_multi_choice_without_boxes_is_a_no_op() {
    let html = r#"<html><body><form id="limesurvey">
        <div class="question-container multiple-opt"><div class="questions-list"></div></div>
    </form></body></html>"#;
    let mut page = Page::parse(html, 1920.0, 1080.0).unwrap();
    assert!(respond(0, WidgetKind::MultiChoice, SemanticContext::None, &OverrideTable::default(), "Q6", &mut page).is_ok());
}

// --- dropdown ---

fn selected_value(page: &Page) -> String {
    let select = page.query(DROPDOWN_SELECTOR).unwrap();
    let option = page.selected_option(select).unwrap();
    page.option_value(option)
}

#[test]
fn test_dropdown_skips_placeholder() {
    let mut seen = std::collections::BTreeSet::new();
    for seed in 0..100 {
        let mut page = parse_fixture("dropdown.html");
        respond(seed, WidgetKind::Dropdown, SemanticContext::None, &OverrideTable::default(), "Q7", &mut page)
            .unwrap();
        let value = selected_value(&page);
        assert_ne!(value, "");
        seen.insert(value);
    }
    assert_eq!(
        seen.into_iter().collect::<Vec<_>>(),
        vec!["A1".to_string(), "A2".to_string(), "A3".to_string()]
    );
}

#[test]
fn test_dropdown_avoid_and_force() {
    for seed in 0..20 {
        let mut page = parse_fixture("dropdown.html");
        respond(seed, WidgetKind::Dropdown, SemanticContext::None, &avoided("Q7", &["A1", "A2"]), "Q7", &mut page)
            .unwrap();
        assert_eq!(selected_value(&page), "A3");

        let mut page = parse_fixture("dropdown.html");
        respond(seed, WidgetKind::Dropdown, SemanticContext::None, &forced("Q7", &["A2"]), "Q7", &mut page)
            .unwrap();
        assert_eq!(selected_value(&page), "A2");
    }
}

#[test]
fn test_dropdown_everything_avoided() {
    let mut page = parse_fixture("dropdown.html");
    let err = respond(
        0,
        WidgetKind::Dropdown,
        SemanticContext::None,
        &avoided("Q7", &["A1", "A2", "A3"]),
        "Q7",
        &mut page,
    )
    .unwrap_err();
    assert!(matches!(err, HelperError::NoEligibleOption { .. }));
    assert_eq!(selected_value(&page), "");
}

#[test]
fn test_missing_widget_elements_are_soft() {
    let html = r#"<html><body><form id="limesurvey">
        <div class="question-container numeric"></div>
    </form></body></html>"#;
    for kind in [
        WidgetKind::SingleChoice,
        WidgetKind::NumericInput,
        WidgetKind::MultiNumericInput,
        WidgetKind::ShortText,
        WidgetKind::ArrayGrid,
        WidgetKind::Dropdown,
    ] {
        let mut page = Page::parse(html, 1920.0, 1080.0).unwrap();
        assert!(
            respond(0, kind, SemanticContext::None, &OverrideTable::default(), "Q", &mut page).is_ok(),
            "{}",
            kind
        );
    }
}
