//! Tunables for the grouping engine and defaults for user inputs.
//!
//! `Settings` is a plain value: the engine never reads the environment or
//! the clock. Only [`today_date`] touches the local clock, and only the
//! pipeline entry point calls it when the caller leaves the date blank.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const MONTH_TOKENS: [&str; 12] = [
    "JanAds", "FebAds", "MarAds", "AprAds", "MayAds", "JunAds", "JulAds", "AugAds", "SepAds",
    "OctAds", "NovAds", "DecAds",
];

/// Grouping thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Hash distance at which the story/feed hash score reaches zero.
    /// Typical pairs land between 15 and 25.
    pub hash_threshold: u32,
    /// Maximum hash distance from a cluster seed for carousel cards.
    pub carousel_threshold: u32,
    pub carousel_min_cards: usize,
    pub carousel_max_cards: usize,
    /// Mean pairwise distance at which carousel confidence reaches zero.
    pub carousel_confidence_scale: f64,
    /// OCR overlap considered a strong textual match.
    pub ocr_overlap_threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hash_threshold: 25,
            carousel_threshold: 15,
            carousel_min_cards: 3,
            carousel_max_cards: 10,
            carousel_confidence_scale: 20.0,
            ocr_overlap_threshold: 0.5,
        }
    }
}

impl Settings {
    /// Parse settings from JSON. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hash_threshold == 0 {
            return Err(ConfigError::Validation(
                "hash_threshold must be >= 1".to_string(),
            ));
        }
        if self.carousel_min_cards == 0 {
            return Err(ConfigError::Validation(
                "carousel_min_cards must be >= 1".to_string(),
            ));
        }
        if self.carousel_min_cards > self.carousel_max_cards {
            return Err(ConfigError::Validation(format!(
                "carousel_min_cards ({}) exceeds carousel_max_cards ({})",
                self.carousel_min_cards, self.carousel_max_cards
            )));
        }
        if self.carousel_confidence_scale.is_nan() || self.carousel_confidence_scale <= 0.0 {
            return Err(ConfigError::Validation(
                "carousel_confidence_scale must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.ocr_overlap_threshold) {
            return Err(ConfigError::Validation(
                "ocr_overlap_threshold must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

/// Month campaign token for a date, e.g. `OctAds`.
pub fn default_campaign(date: NaiveDate) -> &'static str {
    MONTH_TOKENS[date.month0() as usize]
}

/// Date token in `YYYY.MM.DD` form.
pub fn default_date(date: NaiveDate) -> String {
    date.format("%Y.%m.%d").to_string()
}

pub fn today_date() -> String {
    default_date(Local::now().date_naive())
}
