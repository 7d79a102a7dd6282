//! Decide what kind of question is on the page and what it is about.

use crate::page::Page;
use serde::Serialize;
use std::fmt;

/// Selector for the container that carries the question-type classes.
pub const CONTAINER_SELECTOR: &str = "form#limesurvey div.question-container";
pub const QUESTION_TEXT_SELECTOR: &str = "div.question-text";

/// Structural category of the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WidgetKind {
    SingleChoice,
    NumericInput,
    ShortText,
    ArrayGrid,
    MultiChoice,
    Dropdown,
    MultiNumericInput,
}

/// Container class → widget kind, checked in this order.
const WIDGET_CLASSES: &[(&str, WidgetKind)] = &[
    ("list-radio", WidgetKind::SingleChoice),
    ("numeric", WidgetKind::NumericInput),
    ("text-short", WidgetKind::ShortText),
    ("array-flexible-row", WidgetKind::ArrayGrid),
    ("multiple-opt", WidgetKind::MultiChoice),
    ("list-dropdown", WidgetKind::Dropdown),
    ("numeric-multi", WidgetKind::MultiNumericInput),
];

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WidgetKind::SingleChoice => "single-choice",
            WidgetKind::NumericInput => "numeric",
            WidgetKind::ShortText => "short-text",
            WidgetKind::ArrayGrid => "array",
            WidgetKind::MultiChoice => "multiple-choice",
            WidgetKind::Dropdown => "dropdown",
            WidgetKind::MultiNumericInput => "multi-numeric",
        };
        f.write_str(name)
    }
}

/// Topical hint drawn from the question text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum SemanticContext {
    Age,
    Year,
    ZipCode,
    Quantity,
    Percent,
    /// A year question whose refusal code is 9999.
    YearWithRefusal9999,
    /// A year question whose refusal code is 0 (written "0000" in the text).
    YearWithRefusalZero,
    Scale,
    #[default]
    None,
}

/// Classify the question container by its marker classes.
/// `None` means the helper does not know this question type.
pub fn classify_widget(page: &Page) -> Option<WidgetKind> {
    let container = page.query(CONTAINER_SELECTOR)?;
    let classes = page.classes(container);
    WIDGET_CLASSES
        .iter()
        .find(|(class, _)| classes.contains(class))
        .map(|(_, kind)| *kind)
}

/// Keyword-based context. Families are checked in a fixed order and every
/// later match overwrites an earlier one.
pub fn classify_context(question_text: &str) -> SemanticContext {
    let text = question_text.to_lowercase();
    let mut context = SemanticContext::None;

    if text.contains("age") || text.contains("how old") {
        context = SemanticContext::Age;
    }
    if text.contains("postal ") || text.contains("zip ") {
        context = SemanticContext::ZipCode;
    }
    if text.contains(" many")
        || text.contains(" much")
        || text.contains(" number")
        || text.contains("amount")
    {
        context = SemanticContext::Quantity;
    }
    if text.contains("year") || text.contains(" born") {
        context = if text.contains("9999") {
            SemanticContext::YearWithRefusal9999
        } else if text.contains("0000") {
            SemanticContext::YearWithRefusalZero
        } else {
            SemanticContext::Year
        };
    }
    if text.contains("a scale") {
        context = SemanticContext::Scale;
    }

    context
}

/// Visible text of the question, empty when the page has none.
pub fn question_text(page: &Page) -> String {
    page.query(QUESTION_TEXT_SELECTOR)
        .map(|id| page.visible_text(id))
        .unwrap_or_default()
}

pub fn classify_page_context(page: &Page) -> SemanticContext {
    classify_context(&question_text(page))
}
