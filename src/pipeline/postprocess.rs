//! Post-processing of the raw model reply.
//!
//! Two jobs, one on each side of normalisation:
//!
//! 1. [`parse_model_json`] turns the reply text into a JSON value. Models
//!    asked for JSON still sometimes wrap it in a ```` ```json ```` fence or
//!    add a sentence before it, so the fence is stripped and, failing that,
//!    the outermost `{ … }` span is tried.
//! 2. [`OutputLimits::apply`] enforces the contract the prompt asks for:
//!    tags from the closed set only, at most 3 friction points and 2 likely
//!    questions. The normaliser deliberately leaves these alone.

use crate::error::DeckGuardError;
use crate::output::{NormalizedAnalysis, StandardTag};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n?```\s*$").unwrap());

/// Parse the model's reply into a JSON value.
///
/// # Errors
/// * [`DeckGuardError::EmptyModelResponse`]: the reply is blank
/// * [`DeckGuardError::MalformedModelResponse`]: no JSON could be recovered
pub fn parse_model_json(reply: &str) -> Result<Value, DeckGuardError> {
    let body = strip_code_fences(reply);
    if body.is_empty() {
        return Err(DeckGuardError::EmptyModelResponse);
    }

    match serde_json::from_str::<Value>(body) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            if let Some(span) = outermost_object(body) {
                if let Ok(value) = serde_json::from_str::<Value>(span) {
                    debug!("Recovered JSON object from surrounding prose");
                    return Ok(value);
                }
            }
            Err(DeckGuardError::MalformedModelResponse {
                detail: first_err.to_string(),
            })
        }
    }
}

/// Remove a single outer Markdown code fence, if present.
fn strip_code_fences(input: &str) -> &str {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps.get(1).map_or(trimmed, |m| m.as_str().trim()),
        None => trimmed,
    }
}

fn outermost_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let end = input.rfind('}')?;
    (start < end).then(|| &input[start..=end])
}

// ── Output limits ────────────────────────────────────────────────────────

/// Caps the model stage applies to a normalised analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLimits {
    /// Default: 8 (the size of the closed tag set).
    pub max_tags: usize,
    /// Default: 3.
    pub max_friction_points: usize,
    /// Default: 2.
    pub max_likely_questions: usize,
}

impl Default for OutputLimits {
    fn default() -> Self {
        Self {
            max_tags: StandardTag::ALL.len(),
            max_friction_points: 3,
            max_likely_questions: 2,
        }
    }
}

impl OutputLimits {
    /// Drop non-standard and duplicate tags and truncate the capped lists.
    pub fn apply(&self, mut analysis: NormalizedAnalysis) -> NormalizedAnalysis {
        let mut seen = HashSet::new();
        analysis.tags = analysis
            .tags
            .iter()
            .filter_map(|t| t.parse::<StandardTag>().ok())
            .filter(|t| seen.insert(*t))
            .take(self.max_tags)
            .map(|t| t.as_str().to_string())
            .collect();

        analysis.friction_points.truncate(self.max_friction_points);
        analysis.likely_questions.truncate(self.max_likely_questions);
        analysis
    }
}
