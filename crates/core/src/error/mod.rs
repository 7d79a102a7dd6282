//! Error types for surveyfill.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HelperError {
    /// A `force` override names an option the respondent cannot see.
    #[error("ERROR: {question} - option {value} is hidden but is being used as a forced option.")]
    HiddenOptionForced { question: String, value: String },

    /// Not enough visible, non-avoided options left to sample from.
    #[error("ERROR: {question} - {widget} has {eligible} eligible option(s), {required} needed.")]
    NoEligibleOption {
        question: String,
        widget: String,
        eligible: usize,
        required: usize,
    },

    #[error("HTML parse error: {0}")]
    Parse(String),

    #[error("Layout error: {0}")]
    Layout(String),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HelperError {
    /// Errors that come from the page and its overrides rather than from the
    /// environment. These are shown in the alert strip and pause auto-run.
    pub fn is_alert(&self) -> bool {
        matches!(
            self,
            HelperError::HiddenOptionForced { .. } | HelperError::NoEligibleOption { .. }
        )
    }
}
