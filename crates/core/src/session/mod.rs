//! One page view of the helper: classification, persisted run state,
//! key bindings and the answer → navigate cycle.
//!
//! A host (a browser extension, a test driver, the CLI) builds a
//! [`HelperSession`] for every page load, feeds it key presses, clicks and
//! page events, and carries out the navigation it returns.

use crate::classify::{classify_page_context, classify_widget, SemanticContext, WidgetKind, CONTAINER_SELECTOR};
use crate::config::HelperConfig;
use crate::error::HelperError;
use crate::overrides::{scan_markers, OverrideTable};
use crate::page::{ElementId, Page};
use crate::respond::{Responder, RADIO_SELECTOR};
use crate::storage::{
    Stores, ACTIVE_KEY, ATTEMPTS_KEY, COMMANDS_KEY, HIDDEN_KEY, PREV_QCODE_KEY, QCODE_KEY,
};
use chrono::{Local, NaiveDateTime};
use rand::rngs::StdRng;
use rand::SeedableRng;
use regex::Regex;
use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const QUESTION_CODE_SELECTOR: &str = "span#QNameNumData";
/// Question code used when the page does not expose one.
pub const UNKNOWN_QUESTION: &str = "N/A";
/// Previous question code recorded before the first page of a session.
pub const START_QUESTION: &str = "Start";
pub const NEXT_BUTTON_SELECTOR: &str = "#movenextbtn";
pub const SUBMIT_BUTTON_SELECTOR: &str = "#movesubmitbtn";
pub const PREV_BUTTON_SELECTOR: &str = "#moveprevbtn";
pub const ALERT_DIALOG_SELECTOR: &str = "#bootstrap-alert-box-modal";
pub const DIALOG_DISMISS_SELECTOR: &str = "div.modal-footer > a.btn.btn-default";
pub const ARRAY_INFO_ROW_SELECTOR: &str = "tbody > tr.answers-list";

/// Which survey navigation control to activate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Navigation {
    Next,
    Submit,
    Previous,
}

/// A navigation decision: the control the host should click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavigationTarget {
    pub navigation: Navigation,
    pub control: ElementId,
}

/// Keys the helper reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Right,
    Left,
    Up,
    Down,
    Space,
    Enter,
    Escape,
    Insert,
}

impl Key {
    /// Map a DOM `keyCode`.
    pub fn from_code(code: u32) -> Option<Key> {
        match code {
            39 => Some(Key::Right),
            37 => Some(Key::Left),
            38 => Some(Key::Up),
            40 => Some(Key::Down),
            32 => Some(Key::Space),
            13 => Some(Key::Enter),
            27 => Some(Key::Escape),
            45 => Some(Key::Insert),
            _ => None,
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Key::Right => 39,
            Key::Left => 37,
            Key::Up => 38,
            Key::Down => 40,
            Key::Space => 32,
            Key::Enter => 13,
            Key::Escape => 27,
            Key::Insert => 45,
        }
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "right" => Ok(Key::Right),
            "left" => Ok(Key::Left),
            "up" => Ok(Key::Up),
            "down" => Ok(Key::Down),
            "space" | "spacebar" => Ok(Key::Space),
            "enter" => Ok(Key::Enter),
            "esc" | "escape" => Ok(Key::Escape),
            "insert" | "ins" => Ok(Key::Insert),
            other => other
                .parse::<u32>()
                .ok()
                .and_then(Key::from_code)
                .ok_or_else(|| format!("unknown key: {}", s)),
        }
    }
}

/// Discrete notifications from the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    /// The survey's validation dialog was shown or hidden.
    DialogVisibilityChanged { visible: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunState {
    /// Auto-run enabled. Persists across sessions.
    pub active: bool,
    /// Overlay collapsed. Persists across sessions.
    pub hidden: bool,
    /// Loads of the same question in a row, minus one.
    pub attempts: u32,
}

/// What the floating overlay shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayState {
    pub status: String,
    pub auto_run: bool,
    pub hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
}

/// A code badge the overlay pins next to an option or array row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoLabel {
    pub element: ElementId,
    pub text: String,
}

/// The helper's state for one page view.
pub struct HelperSession {
    page: Page,
    config: HelperConfig,
    stores: Stores,
    rng: StdRng,
    loaded_at: NaiveDateTime,
    question_code: String,
    widget: Option<WidgetKind>,
    context: SemanticContext,
    overrides: OverrideTable,
    markers_found: bool,
    run: RunState,
    alert: Option<String>,
}

impl HelperSession {
    /// Set up the helper for a freshly loaded page.
    pub fn initialize(page: Page, config: HelperConfig, stores: Stores) -> Result<Self, HelperError> {
        Self::initialize_at(page, config, stores, Local::now().naive_local())
    }

    /// Like [`HelperSession::initialize`] with an explicit load time.
    pub fn initialize_at(
        page: Page,
        config: HelperConfig,
        stores: Stores,
        loaded_at: NaiveDateTime,
    ) -> Result<Self, HelperError> {
        config.validate()?;
        let question_code = page
            .query(QUESTION_CODE_SELECTOR)
            .and_then(|id| page.dataset(id, "code"))
            .unwrap_or(UNKNOWN_QUESTION)
            .to_string();
        let widget = classify_widget(&page);
        let context = classify_page_context(&page);
        let scanned = scan_markers(&page);

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut session = Self {
            page,
            config,
            stores,
            rng,
            loaded_at,
            question_code,
            widget,
            context,
            overrides: scanned.table,
            markers_found: scanned.found,
            run: RunState::default(),
            alert: None,
        };
        session.init_storage()?;

        info!(
            question = %session.question_code,
            widget = ?session.widget,
            context = ?session.context,
            attempts = session.run.attempts,
            active = session.run.active,
            "page initialized"
        );
        Ok(session)
    }

    fn init_storage(&mut self) -> Result<(), HelperError> {
        let local = &mut self.stores.local;
        match local.get_flag(ACTIVE_KEY) {
            Some(active) => self.run.active = active,
            None => local.set_flag(ACTIVE_KEY, false)?,
        }
        match local.get_flag(HIDDEN_KEY) {
            Some(hidden) => self.run.hidden = hidden,
            None => local.set_flag(HIDDEN_KEY, false)?,
        }

        let session = &mut self.stores.session;
        let prev_question = session
            .get(QCODE_KEY)
            .unwrap_or_else(|| START_QUESTION.to_string());
        session.set(QCODE_KEY, &self.question_code)?;
        session.set(PREV_QCODE_KEY, &prev_question)?;

        if prev_question == self.question_code {
            let previous: u32 = session
                .get(ATTEMPTS_KEY)
                .and_then(|a| a.parse().ok())
                .unwrap_or(0);
            self.run.attempts = previous + 1;
            session.set(ATTEMPTS_KEY, &self.run.attempts.to_string())?;
        } else {
            self.run.attempts = 0;
            session.remove(ATTEMPTS_KEY)?;
        }

        let persisted = match session.get(COMMANDS_KEY) {
            Some(raw) => OverrideTable::from_json(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "discarding unreadable persisted overrides");
                OverrideTable::default()
            }),
            None => OverrideTable::default(),
        };
        self.overrides = OverrideTable::merge(&self.overrides, &persisted);
        session.set(COMMANDS_KEY, &self.overrides.to_json()?)?;
        Ok(())
    }

    // --- Accessors ---

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    pub fn question_code(&self) -> &str {
        &self.question_code
    }

    pub fn widget(&self) -> Option<WidgetKind> {
        self.widget
    }

    pub fn context(&self) -> SemanticContext {
        self.context
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    /// Whether the page itself carried any override markers.
    pub fn markers_found(&self) -> bool {
        self.markers_found
    }

    pub fn run_state(&self) -> RunState {
        self.run
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn config(&self) -> &HelperConfig {
        &self.config
    }

    pub fn auto_run_delay(&self) -> Duration {
        self.config.auto_run_delay()
    }

    /// Hand the stores back, e.g. to build the session for the next page.
    pub fn into_stores(self) -> Stores {
        self.stores
    }

    // --- Actions ---

    /// Write a dummy answer for the current question.
    ///
    /// Override conflicts are shown in the alert strip and pause auto-run
    /// (unless `error_deactivate_override` is set) before being returned.
    pub fn answer(&mut self) -> Result<(), HelperError> {
        let Some(kind) = self.widget else {
            warn!(question = %self.question_code, "handleable question type not found");
            return Ok(());
        };

        let result = Responder::new(&mut self.rng, self.loaded_at, &self.config.responses).respond(
            kind,
            self.context,
            &self.overrides,
            &self.question_code,
            &mut self.page,
        );

        match result {
            Err(e) if e.is_alert() => {
                warn!(question = %self.question_code, error = %e, "answer aborted");
                self.set_alert(e.to_string());
                if !self.config.error_deactivate_override {
                    self.set_active(false)?;
                }
                Err(e)
            }
            other => other,
        }
    }

    /// Next page, or submit on the last page. With neither present and
    /// auto-run on, step back instead so the run does not stall.
    pub fn next(&self) -> Option<NavigationTarget> {
        if let Some(control) = self.page.query(NEXT_BUTTON_SELECTOR) {
            return Some(NavigationTarget {
                navigation: Navigation::Next,
                control,
            });
        }
        if let Some(control) = self.page.query(SUBMIT_BUTTON_SELECTOR) {
            return Some(NavigationTarget {
                navigation: Navigation::Submit,
                control,
            });
        }
        if self.run.active {
            return self.previous();
        }
        None
    }

    pub fn previous(&self) -> Option<NavigationTarget> {
        self.page
            .query(PREV_BUTTON_SELECTOR)
            .map(|control| NavigationTarget {
                navigation: Navigation::Previous,
                control,
            })
    }

    /// React to a key press. While the overlay is hidden only Escape works.
    pub fn handle_key(&mut self, key: Key) -> Result<Option<NavigationTarget>, HelperError> {
        debug!(?key, hidden = self.run.hidden, "key pressed");
        if self.run.hidden {
            if key == Key::Escape {
                self.toggle_overlay()?;
            }
            return Ok(None);
        }

        match key {
            Key::Right => {
                self.answer()?;
                Ok(self.next())
            }
            Key::Enter => Ok(self.next()),
            Key::Left => Ok(self.previous()),
            Key::Space => {
                self.set_active(!self.run.active)?;
                Ok(None)
            }
            Key::Insert => {
                self.answer()?;
                Ok(None)
            }
            Key::Escape => {
                self.toggle_overlay()?;
                Ok(None)
            }
            Key::Up | Key::Down => Ok(None),
        }
    }

    /// The overlay's "Input and Continue" button.
    pub fn handle_click(&mut self) -> Result<Option<NavigationTarget>, HelperError> {
        self.answer()?;
        Ok(self.next())
    }

    /// The delayed auto-run cycle. Does nothing unless auto-run is on.
    pub fn auto_run(&mut self) -> Result<Option<NavigationTarget>, HelperError> {
        if !self.run.active {
            return Ok(None);
        }
        self.answer()?;
        Ok(self.next())
    }

    /// Handle a page event. For a validation dialog becoming visible this
    /// returns the dismiss control the host should click.
    pub fn handle_event(&mut self, event: PageEvent) -> Result<Option<ElementId>, HelperError> {
        match event {
            PageEvent::DialogVisibilityChanged { visible: false } => Ok(None),
            PageEvent::DialogVisibilityChanged { visible: true } => {
                let suffix = if self.run.active { " Pausing run..." } else { "" };
                self.set_alert(format!("Answer Invalid.{}", suffix));

                let dismiss = self
                    .page
                    .query(&format!("{} {}", ALERT_DIALOG_SELECTOR, DIALOG_DISMISS_SELECTOR));
                if dismiss.is_none() {
                    warn!("validation dialog has no dismiss control");
                }
                if !self.config.error_deactivate_override {
                    self.set_active(false)?;
                }
                Ok(dismiss)
            }
        }
    }

    pub fn set_active(&mut self, active: bool) -> Result<(), HelperError> {
        self.run.active = active;
        info!(active, "auto-run changed");
        self.stores.local.set_flag(ACTIVE_KEY, active)
    }

    /// Show or hide the overlay; returns the new hidden flag.
    pub fn toggle_overlay(&mut self) -> Result<bool, HelperError> {
        self.run.hidden = !self.run.hidden;
        self.stores.local.set_flag(HIDDEN_KEY, self.run.hidden)?;
        Ok(self.run.hidden)
    }

    pub fn set_alert(&mut self, text: impl Into<String>) {
        self.alert = Some(text.into());
    }

    // --- Overlay ---

    pub fn overlay(&self) -> OverlayState {
        OverlayState {
            status: self.question_code.clone(),
            auto_run: self.run.active,
            hidden: self.run.hidden,
            alert: self.alert.clone(),
        }
    }

    /// Code badges for the options of a single-choice question or the rows
    /// of an array question.
    pub fn info_labels(&self) -> Vec<InfoLabel> {
        match self.widget {
            Some(WidgetKind::SingleChoice) => self
                .page
                .query_all(RADIO_SELECTOR)
                .into_iter()
                .map(|radio| InfoLabel {
                    element: radio,
                    text: self.page.value(radio).to_string(),
                })
                .collect(),
            Some(WidgetKind::ArrayGrid) => self.array_info_labels(),
            _ => {
                debug!("question type for info display not found");
                Vec::new()
            }
        }
    }

    /// Row ids look like `javatbd<sid>X<gid>X<qid><code>`; the label is the
    /// trailing answer code.
    fn array_info_labels(&self) -> Vec<InfoLabel> {
        let qid = self
            .page
            .query(CONTAINER_SELECTOR)
            .and_then(|c| self.page.attr(c, "id"))
            .unwrap_or("")
            .replace("question", "");
        let prefix = match Regex::new(&format!(".+[0-9]+X[0-9]+X{}", regex::escape(&qid))) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(error = %e, "bad row code pattern");
                None
            }
        };

        self.page
            .query_all(ARRAY_INFO_ROW_SELECTOR)
            .into_iter()
            .map(|row| {
                let id = self.page.attr(row, "id").unwrap_or("");
                let text = match &prefix {
                    Some(re) => re.replace(id, "").into_owned(),
                    None => id.to_string(),
                };
                InfoLabel { element: row, text }
            })
            .collect()
    }
}
