use crate::classify::{SemanticContext, WidgetKind};
use crate::overrides::OverrideTable;
use crate::session::{HelperSession, InfoLabel, NavigationTarget, RunState};
use serde::Serialize;

/// Snapshot of a session after a round of input, for the CLI and tests.
#[derive(Debug, Clone, Serialize)]
pub struct FillReport {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget: Option<WidgetKind>,
    pub context: SemanticContext,
    pub run: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation: Option<NavigationTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismissed_dialog: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<InfoLabel>,
    #[serde(skip_serializing_if = "OverrideTable::is_empty")]
    pub overrides: OverrideTable,
    /// `(name, value)` pairs the form would submit.
    pub values: Vec<(String, String)>,
}

impl FillReport {
    pub fn from_session(session: &HelperSession, navigation: Option<NavigationTarget>) -> Self {
        Self {
            question: session.question_code().to_string(),
            widget: session.widget(),
            context: session.context(),
            run: session.run_state(),
            alert: session.alert().map(str::to_string),
            navigation,
            dismissed_dialog: None,
            labels: session.info_labels(),
            overrides: session.overrides().clone(),
            values: session.page().form_values(),
        }
    }
}

/// One line per fact, terse enough to diff between runs.
pub fn to_compact_string(report: &FillReport) -> String {
    let mut lines = Vec::new();

    let widget = report
        .widget
        .map(|w| w.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    lines.push(format!(
        "[q:{} {} ctx:{:?} attempts:{}]",
        report.question, widget, report.context, report.run.attempts
    ));
    lines.push(format!(
        "[auto:{} hidden:{}]",
        on_off(report.run.active),
        on_off(report.run.hidden)
    ));

    if let Some(ref alert) = report.alert {
        lines.push(format!("[alert \"{}\"]", alert));
    }
    for (question, codes) in &report.overrides.force {
        lines.push(format!("[force {} {}]", question, codes.join(",")));
    }
    for (question, codes) in &report.overrides.avoid {
        let codes: Vec<&str> = codes.iter().map(String::as_str).collect();
        lines.push(format!("[avoid {} {}]", question, codes.join(",")));
    }
    for label in &report.labels {
        lines.push(format!("[label {} \"{}\"]", label.element, label.text));
    }
    for (name, value) in &report.values {
        lines.push(format!("[{}=\"{}\"]", name, value));
    }
    if let Some(dialog) = report.dismissed_dialog {
        lines.push(format!("[dismiss {}]", dialog));
    }
    match report.navigation {
        Some(nav) => lines.push(format!("[-> {:?} {}]", nav.navigation, nav.control)),
        None => lines.push("[-> stay]".to_string()),
    }

    lines.join("\n")
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
