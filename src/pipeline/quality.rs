//! Extraction-quality estimate: how much text came out of the deck, and in
//! which script.
//!
//! The estimate is a proxy, not ground truth. A slide deck that is mostly
//! images yields very little text per page, and a model reading that text
//! will judge a deck it has barely seen. The `low` tier lets the report warn
//! about this instead of blocking the analysis.
//!
//! Both signals are pure functions of their inputs:
//!
//! ```text
//! density = chars(text) / (page_count × chars_per_page)
//!
//!   density < 0.4          → low
//!   0.4 ≤ density < 0.75   → medium
//!   0.75 ≤ density         → high
//!
//! language_hint = hangul(text) / non_whitespace(text) > 0.2
//! ```
//!
//! The thresholds were calibrated by eye. They live in [`QualityPolicy`] so
//! they can be tuned without touching the estimator.

use crate::error::DeckGuardError;
use crate::output::{ConfidenceTier, ExtractionResult};
use serde::{Deserialize, Serialize};

/// Calibration constants for [`QualityPolicy::estimate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityPolicy {
    /// Characters a normally text-rich slide is expected to yield. Default: 200.
    pub chars_per_page: f64,
    /// Lowest density reported as `medium`. Default: 0.4.
    pub medium_threshold: f64,
    /// Lowest density reported as `high`. Default: 0.75.
    pub high_threshold: f64,
    /// Hangul share above which the deck counts as Korean. Default: 0.2.
    pub korean_ratio: f64,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            chars_per_page: 200.0,
            medium_threshold: 0.4,
            high_threshold: 0.75,
            korean_ratio: 0.2,
        }
    }
}

/// The two signals derived from extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityEstimate {
    pub confidence_tier: ConfidenceTier,
    pub language_hint: bool,
}

impl QualityPolicy {
    pub(crate) fn validate(&self) -> Result<(), DeckGuardError> {
        if !(self.chars_per_page.is_finite() && self.chars_per_page > 0.0) {
            return Err(DeckGuardError::InvalidConfig(format!(
                "chars_per_page must be > 0, got {}",
                self.chars_per_page
            )));
        }
        if !(self.medium_threshold >= 0.0 && self.medium_threshold <= self.high_threshold) {
            return Err(DeckGuardError::InvalidConfig(format!(
                "quality thresholds must satisfy 0 ≤ medium ≤ high, got {} / {}",
                self.medium_threshold, self.high_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.korean_ratio) {
            return Err(DeckGuardError::InvalidConfig(format!(
                "korean_ratio must be within 0–1, got {}",
                self.korean_ratio
            )));
        }
        Ok(())
    }

    /// Estimate extraction quality for `text` taken from `page_count` pages.
    ///
    /// A `page_count` of zero is treated as one page.
    pub fn estimate(&self, text: &str, page_count: usize) -> QualityEstimate {
        QualityEstimate {
            confidence_tier: self.tier(text.chars().count(), page_count),
            language_hint: self.is_korean(text),
        }
    }

    /// Map a character count to a density tier.
    pub fn tier(&self, char_count: usize, page_count: usize) -> ConfidenceTier {
        let expected = page_count.max(1) as f64 * self.chars_per_page;
        let density = char_count as f64 / expected;

        if density < self.medium_threshold {
            ConfidenceTier::Low
        } else if density < self.high_threshold {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::High
        }
    }

    fn is_korean(&self, text: &str) -> bool {
        let (korean, total) = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .fold((0usize, 0usize), |(korean, total), c| {
                (korean + usize::from(is_hangul(c)), total + 1)
            });

        if total == 0 {
            return false;
        }
        korean as f64 / total as f64 > self.korean_ratio
    }
}

/// Estimate quality with the default policy.
pub fn estimate_quality(text: &str, page_count: usize) -> QualityEstimate {
    QualityPolicy::default().estimate(text, page_count)
}

impl ExtractionResult {
    /// Bundle extracted text with its quality estimate.
    pub fn new(text: String, page_count: usize, policy: &QualityPolicy) -> Self {
        let estimate = policy.estimate(&text, page_count);
        Self {
            text,
            page_count,
            confidence_tier: estimate.confidence_tier,
            language_hint: estimate.language_hint,
        }
    }
}

/// Hangul syllables, Hangul jamo, and Hangul compatibility jamo.
fn is_hangul(c: char) -> bool {
    matches!(c, '\u{AC00}'..='\u{D7AF}' | '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}')
}
