//! Random sampling and dummy value generation.

use crate::classify::SemanticContext;
use crate::config::ResponseConfig;
use chrono::{Datelike, NaiveDateTime, Timelike};
use rand::Rng;

/// Uniform integer in `[min, max)`. An empty range yields `min`.
pub fn roll<R: Rng>(rng: &mut R, min: i64, max: i64) -> i64 {
    if max <= min {
        return min;
    }
    rng.gen_range(min..max)
}

/// Uniform index in `[0, len)`; `0` for an empty slice.
pub fn roll_index<R: Rng>(rng: &mut R, len: usize) -> usize {
    roll(rng, 0, len as i64) as usize
}

/// Uniform in `[min, max)`, or `refused` with `chance`% probability when a
/// refusal code is given.
pub fn numeric_with_refusal<R: Rng>(
    rng: &mut R,
    min: i64,
    max: i64,
    refused: Option<i64>,
    chance: i64,
) -> i64 {
    match refused {
        Some(code) if roll(&mut *rng, 0, 100) < chance => code,
        _ => roll(rng, min, max),
    }
}

/// `MM-DD HH:MM` of the page load.
pub fn date_stamp(now: &NaiveDateTime) -> String {
    format!(
        "{:02}-{:02} {:02}:{:02}",
        now.month(),
        now.day(),
        now.hour(),
        now.minute()
    )
}

/// Value sources for one answer: the RNG, the page-load time and the
/// configured ranges.
pub struct ValueGenerator<'a, R> {
    pub rng: &'a mut R,
    pub now: NaiveDateTime,
    pub config: &'a ResponseConfig,
}

impl<R: Rng> ValueGenerator<'_, R> {
    /// Exclusive upper bound for birth years of adult respondents.
    pub fn latest_birth_year(&self) -> i64 {
        self.now.year() as i64 - self.config.adult_age
    }

    pub fn age(&mut self) -> i64 {
        roll(&mut *self.rng, self.config.age_min, self.config.age_max)
    }

    pub fn birth_year(&mut self) -> i64 {
        let max = self.latest_birth_year();
        roll(&mut *self.rng, self.config.earliest_birth_year, max)
    }

    pub fn quantity(&mut self) -> i64 {
        roll(&mut *self.rng, 0, self.config.quantity_max)
    }

    pub fn scale(&mut self) -> i64 {
        roll(&mut *self.rng, 0, self.config.scale_max)
    }

    pub fn stamp(&self) -> String {
        format!("{}{}", self.config.stamp_prefix, date_stamp(&self.now))
    }

    /// Value typed into a numeric field.
    pub fn numeric(&mut self, context: SemanticContext) -> String {
        let max = self.latest_birth_year();
        let min = self.config.earliest_birth_year;
        let chance = self.config.refusal_chance;
        match context {
            SemanticContext::Age | SemanticContext::Percent => self.age().to_string(),
            SemanticContext::Year => self.birth_year().to_string(),
            SemanticContext::ZipCode => self.config.zip_code.clone(),
            SemanticContext::YearWithRefusal9999 => {
                numeric_with_refusal(&mut *self.rng, min, max, Some(9999), chance).to_string()
            }
            SemanticContext::YearWithRefusalZero => {
                numeric_with_refusal(&mut *self.rng, min, max, Some(0), chance).to_string()
            }
            _ => self.quantity().to_string(),
        }
    }

    /// Value typed into the free-text box attached to an "other" option.
    pub fn other_text(&mut self, context: SemanticContext) -> String {
        match context {
            SemanticContext::Age | SemanticContext::Percent => self.age().to_string(),
            SemanticContext::Year => self.birth_year().to_string(),
            SemanticContext::ZipCode => self.config.zip_code.clone(),
            SemanticContext::Quantity => self.quantity().to_string(),
            SemanticContext::Scale => self.scale().to_string(),
            _ => self.stamp(),
        }
    }
}
