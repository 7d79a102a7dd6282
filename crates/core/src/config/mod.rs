//! Session and value-generation settings.

use crate::error::HelperError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Configuration for a helper session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HelperConfig {
    pub viewport_width: f32,
    pub viewport_height: f32,
    /// Delay between page initialization and the auto-run cycle, so the
    /// survey's own scripts finish setting up the page first.
    pub auto_run_delay_ms: u64,
    /// Keep auto-run going after a validation dialog or a bad override.
    pub error_deactivate_override: bool,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
    pub responses: ResponseConfig,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1920.0,
            viewport_height: 1080.0,
            auto_run_delay_ms: 10,
            error_deactivate_override: false,
            seed: None,
            responses: ResponseConfig::default(),
        }
    }
}

impl HelperConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, HelperError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the numeric answer fields cannot take.
    pub fn validate(&self) -> Result<(), HelperError> {
        let zip = &self.responses.zip_code;
        if zip.is_empty() || !zip.chars().all(|c| c.is_ascii_digit()) {
            return Err(HelperError::InvalidConfig(format!(
                "responses.zip_code must be digits only, got {:?}",
                zip
            )));
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, HelperError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn auto_run_delay(&self) -> Duration {
        Duration::from_millis(self.auto_run_delay_ms)
    }
}

/// Ranges and literals used when generating dummy answers. All ranges are
/// half-open.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub age_min: i64,
    pub age_max: i64,
    pub earliest_birth_year: i64,
    /// Respondents must be at least this old; the latest birth year is
    /// `current year - adult_age` (exclusive).
    pub adult_age: i64,
    pub quantity_max: i64,
    pub scale_max: i64,
    /// Percent chance of answering a year question with its refusal code.
    pub refusal_chance: i64,
    pub zip_code: String,
    pub stamp_prefix: String,
    pub other_text: String,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            age_min: 18,
            age_max: 100,
            earliest_birth_year: 1910,
            adult_age: 18,
            quantity_max: 20,
            scale_max: 100,
            refusal_chance: 20,
            zip_code: "90210".to_string(),
            stamp_prefix: "Run at: ".to_string(),
            other_text: "Dummy Data".to_string(),
        }
    }
}
