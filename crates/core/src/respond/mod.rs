//! Dummy answers for each widget kind.
//!
//! Every answer is drawn at random, constrained by the question's `force` /
//! `avoid` overrides and by what the respondent can actually see. Choices are
//! made by rejection sampling: roll an index, re-roll while the candidate is
//! ineligible. Before any such loop the eligible candidates are counted, and
//! too few of them is reported as [`HelperError::NoEligibleOption`] instead
//! of spinning forever.

pub mod values;

use crate::classify::{SemanticContext, WidgetKind};
use crate::config::ResponseConfig;
use crate::error::HelperError;
use crate::overrides::OverrideTable;
use crate::page::{ElementId, Page};
use chrono::NaiveDateTime;
use rand::Rng;
use tracing::{debug, warn};
use values::{roll, roll_index, ValueGenerator};

pub const RADIO_SELECTOR: &str = "div.answers-list > div.answer-item input.radio";
pub const ANSWER_ITEM_SELECTOR: &str = "div.answer-item";
pub const OTHER_TEXT_SELECTOR: &str = "input.text";
pub const NUMERIC_SELECTOR: &str = "div.question-container input.numeric";
pub const SHORT_TEXT_SELECTOR: &str = "div.question-container input.text";
pub const ARRAY_TABLE_SELECTOR: &str = "table.questions-list";
pub const ARRAY_ROW_SELECTOR: &str = ".answers-list";
pub const ARRAY_OPTION_SELECTOR: &str = "td>input.radio";
pub const CHECKBOX_SELECTOR: &str = "div.questions-list div.answer-item input.checkbox";
pub const OTHER_CHECKBOX_CLASS: &str = "other-checkbox";
pub const DROPDOWN_SELECTOR: &str = "div.question-container select.list-question-select";

/// Writes dummy answers into a page.
pub struct Responder<'a, R> {
    values: ValueGenerator<'a, R>,
}

impl<'a, R: Rng> Responder<'a, R> {
    pub fn new(rng: &'a mut R, now: NaiveDateTime, config: &'a ResponseConfig) -> Self {
        Self {
            values: ValueGenerator { rng, now, config },
        }
    }

    /// Answer the current question. Missing widget elements are logged and
    /// skipped; only override conflicts come back as errors.
    pub fn respond(
        &mut self,
        kind: WidgetKind,
        context: SemanticContext,
        overrides: &OverrideTable,
        question: &str,
        page: &mut Page,
    ) -> Result<(), HelperError> {
        debug!(question, widget = %kind, ?context, "entering dummy response");
        match kind {
            WidgetKind::SingleChoice => self.select_random_radio(context, overrides, question, page),
            WidgetKind::NumericInput => {
                self.enter_numeric_value(context, page);
                Ok(())
            }
            WidgetKind::MultiNumericInput => {
                self.enter_multi_numeric_values(context, page);
                Ok(())
            }
            WidgetKind::ShortText => {
                self.enter_short_text(page);
                Ok(())
            }
            WidgetKind::ArrayGrid => {
                self.select_array_options(page);
                Ok(())
            }
            WidgetKind::MultiChoice => self.select_multiple_choice_options(question, page),
            WidgetKind::Dropdown => self.select_random_dropdown(overrides, question, page),
        }
    }

    fn select_random_radio(
        &mut self,
        context: SemanticContext,
        overrides: &OverrideTable,
        question: &str,
        page: &mut Page,
    ) -> Result<(), HelperError> {
        let options = page.query_all(RADIO_SELECTOR);
        if options.is_empty() {
            warn!(question, "no radio options found");
            return Ok(());
        }

        clear_radio(page, &options);
        let mut r = roll_index(&mut *self.values.rng, options.len());

        if let Some(forced) = overrides.lookup_forced(question) {
            let forced_val = &forced[roll_index(&mut *self.values.rng, forced.len())];
            match options.iter().position(|&o| page.value(o) == forced_val.as_str()) {
                Some(i) if page.is_hidden(options[i]) => {
                    return Err(HelperError::HiddenOptionForced {
                        question: question.to_string(),
                        value: forced_val.clone(),
                    });
                }
                Some(i) => r = i,
                None => warn!(question, value = %forced_val, "forced value matches no option"),
            }
        } else {
            let avoided = overrides.lookup_avoided(question);
            let view: &Page = page;
            let eligible = |o: ElementId| {
                !view.is_hidden(o) && avoided.map_or(true, |a| !a.contains(view.value(o)))
            };
            let count = options.iter().filter(|&&o| eligible(o)).count();
            if count == 0 {
                return Err(no_eligible(question, WidgetKind::SingleChoice, 0, 1));
            }
            while !eligible(options[r]) {
                r = roll_index(&mut *self.values.rng, options.len());
            }
        }

        let chosen = options[r];
        page.set_checked(chosen, true);
        debug!(question, value = page.value(chosen), "radio selected");

        if let Some(other) = other_text_box(page, chosen) {
            let text = self.values.other_text(context);
            page.set_value(other, text);
        }
        Ok(())
    }

    fn enter_numeric_value(&mut self, context: SemanticContext, page: &mut Page) {
        let Some(input) = page.query(NUMERIC_SELECTOR) else {
            warn!("no numeric input found");
            return;
        };
        let value = self.values.numeric(context);
        page.set_value(input, value);
    }

    fn enter_multi_numeric_values(&mut self, context: SemanticContext, page: &mut Page) {
        let inputs = page.query_all(NUMERIC_SELECTOR);
        if inputs.is_empty() {
            warn!("no numeric inputs found");
        }
        for input in inputs {
            let value = self.values.numeric(context);
            page.set_value(input, value);
        }
    }

    fn enter_short_text(&mut self, page: &mut Page) {
        let Some(input) = page.query(SHORT_TEXT_SELECTOR) else {
            warn!("no short text input found");
            return;
        };
        page.set_value(input, self.values.stamp());
    }

    fn select_array_options(&mut self, page: &mut Page) {
        let Some(table) = page.query(ARRAY_TABLE_SELECTOR) else {
            warn!("no array table found");
            return;
        };
        // Rows are independent of each other
        for row in page.query_all_within(table, ARRAY_ROW_SELECTOR) {
            let options = page.query_all_within(row, ARRAY_OPTION_SELECTOR);
            if options.is_empty() {
                continue;
            }
            let r = roll_index(&mut *self.values.rng, options.len());
            page.set_checked(options[r], true);
        }
    }

    fn select_multiple_choice_options(
        &mut self,
        question: &str,
        page: &mut Page,
    ) -> Result<(), HelperError> {
        let checkboxes = page.query_all(CHECKBOX_SELECTOR);
        if checkboxes.is_empty() {
            warn!(question, "no checkboxes found");
            return Ok(());
        }

        let half = checkboxes.len().div_ceil(2) as i64;
        let num_to_check = roll(&mut *self.values.rng, 1, half) as usize;

        clear_multiple_choice(page, &checkboxes);

        let available = checkboxes
            .iter()
            .filter(|&&b| is_checkable_candidate(page, b))
            .count();
        if available < num_to_check {
            return Err(no_eligible(
                question,
                WidgetKind::MultiChoice,
                available,
                num_to_check,
            ));
        }

        let mut checked = 0;
        while checked < num_to_check {
            let r = roll_index(&mut *self.values.rng, checkboxes.len());
            let chkbox = checkboxes[r];
            if !is_checkable_candidate(page, chkbox) {
                continue;
            }
            page.set_checked(chkbox, true);
            if page.has_class(chkbox, OTHER_CHECKBOX_CLASS) {
                if let Some(other) = other_text_box(page, chkbox) {
                    page.set_value(other, self.values.config.other_text.clone());
                }
            }
            checked += 1;
        }
        debug!(question, checked, "checkboxes selected");
        Ok(())
    }

    fn select_random_dropdown(
        &mut self,
        overrides: &OverrideTable,
        question: &str,
        page: &mut Page,
    ) -> Result<(), HelperError> {
        let Some(select) = page.query(DROPDOWN_SELECTOR) else {
            warn!(question, "no dropdown found");
            return Ok(());
        };
        let options = page.options(select);
        if options.is_empty() {
            warn!(question, "dropdown has no options");
            return Ok(());
        }
        let values: Vec<String> = options.iter().map(|&o| page.option_value(o)).collect();
        let mut r = roll_index(&mut *self.values.rng, options.len());

        if let Some(forced) = overrides.lookup_forced(question) {
            let forced_val = &forced[roll_index(&mut *self.values.rng, forced.len())];
            match values.iter().position(|v| v == forced_val) {
                Some(i) => r = i,
                None => warn!(question, value = %forced_val, "forced value matches no option"),
            }
        } else {
            // The empty-valued option is the "please choose" placeholder
            let avoided = overrides.lookup_avoided(question);
            let eligible =
                |v: &String| !v.is_empty() && avoided.map_or(true, |a| !a.contains(v));
            let count = values.iter().filter(|v| eligible(*v)).count();
            if count == 0 {
                return Err(no_eligible(question, WidgetKind::Dropdown, 0, 1));
            }
            while !eligible(&values[r]) {
                r = roll_index(&mut *self.values.rng, options.len());
            }
        }

        page.select_option(select, options[r]);
        debug!(question, value = %values[r], "dropdown selected");
        Ok(())
    }
}

/// Uncheck the selected radio, if any, and empty its "other" box.
fn clear_radio(page: &mut Page, options: &[ElementId]) {
    if let Some(&checked) = options.iter().find(|&&o| page.is_checked(o)) {
        page.set_checked(checked, false);
        if let Some(other) = other_text_box(page, checked) {
            page.set_value(other, "");
        }
    }
}

/// Uncheck every box and empty every "other" box.
fn clear_multiple_choice(page: &mut Page, checkboxes: &[ElementId]) {
    for &chkbox in checkboxes {
        if page.is_checked(chkbox) {
            page.set_checked(chkbox, false);
        }
        if page.has_class(chkbox, OTHER_CHECKBOX_CLASS) {
            if let Some(other) = other_text_box(page, chkbox) {
                page.set_value(other, "");
            }
        }
    }
}

/// A checkbox that is unchecked and whose answer item is shown.
fn is_checkable_candidate(page: &Page, chkbox: ElementId) -> bool {
    let item = page.closest(chkbox, ANSWER_ITEM_SELECTOR).unwrap_or(chkbox);
    !page.is_checked(chkbox) && !page.is_hidden(item)
}

/// The free-text box sharing an answer item with `input`.
fn other_text_box(page: &Page, input: ElementId) -> Option<ElementId> {
    let item = page.closest(input, ANSWER_ITEM_SELECTOR)?;
    page.query_within(item, OTHER_TEXT_SELECTOR)
}

fn no_eligible(question: &str, widget: WidgetKind, eligible: usize, required: usize) -> HelperError {
    HelperError::NoEligibleOption {
        question: question.to_string(),
        widget: widget.to_string(),
        eligible,
        required,
    }
}
