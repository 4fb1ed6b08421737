//! Value types produced by the analysis pipeline.
//!
//! Everything here is constructed once per deck, handed to the caller and
//! dropped. Nothing is cached or shared between analyses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Tiers and verdicts ───────────────────────────────────────────────────

/// Coarse three-level signal used for both extraction quality and the
/// model's confidence in its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceTier::Low => "low",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::High => "high",
        }
    }

    /// Human-readable badge text.
    pub fn label(self) -> &'static str {
        match self {
            ConfidenceTier::Low => "Low Confidence",
            ConfidenceTier::Medium => "Medium Confidence",
            ConfidenceTier::High => "High Confidence",
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the deck is ready to go out to investors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "GO")]
    Go,
    #[serde(rename = "HOLD")]
    Hold,
    #[serde(rename = "NO_GO")]
    NoGo,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Go => "GO",
            Verdict::Hold => "HOLD",
            Verdict::NoGo => "NO_GO",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Go => "Ready to Send",
            Verdict::Hold => "Review Required",
            Verdict::NoGo => "High Risk",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a single friction point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

// ── Standard tags ────────────────────────────────────────────────────────

/// The closed set of category tags the model may attach to a deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardTag {
    #[serde(rename = "Stage_Mismatch")]
    StageMismatch,
    #[serde(rename = "TAM_Logic_Weak")]
    TamLogicWeak,
    #[serde(rename = "Problem_Solution_Gap")]
    ProblemSolutionGap,
    #[serde(rename = "Moat_Weak")]
    MoatWeak,
    #[serde(rename = "Traction_Too_Soft")]
    TractionTooSoft,
    #[serde(rename = "Unit_Economics_Missing")]
    UnitEconomicsMissing,
    #[serde(rename = "BM_Unclear")]
    BmUnclear,
    #[serde(rename = "Ask_Unclear")]
    AskUnclear,
}

impl StandardTag {
    pub const ALL: [StandardTag; 8] = [
        StandardTag::StageMismatch,
        StandardTag::TamLogicWeak,
        StandardTag::ProblemSolutionGap,
        StandardTag::MoatWeak,
        StandardTag::TractionTooSoft,
        StandardTag::UnitEconomicsMissing,
        StandardTag::BmUnclear,
        StandardTag::AskUnclear,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StandardTag::StageMismatch => "Stage_Mismatch",
            StandardTag::TamLogicWeak => "TAM_Logic_Weak",
            StandardTag::ProblemSolutionGap => "Problem_Solution_Gap",
            StandardTag::MoatWeak => "Moat_Weak",
            StandardTag::TractionTooSoft => "Traction_Too_Soft",
            StandardTag::UnitEconomicsMissing => "Unit_Economics_Missing",
            StandardTag::BmUnclear => "BM_Unclear",
            StandardTag::AskUnclear => "Ask_Unclear",
        }
    }
}

impl FromStr for StandardTag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StandardTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for StandardTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Extraction ───────────────────────────────────────────────────────────

/// Text pulled out of a deck plus the quality signals derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Extracted text. Kept out of serialised reports; it can be large.
    #[serde(default, skip_serializing)]
    pub text: String,
    pub page_count: usize,
    pub confidence_tier: ConfidenceTier,
    /// True when the text is majority Korean script.
    pub language_hint: bool,
}

// ── Normalised analysis ──────────────────────────────────────────────────

/// A list entry that arrived either as a bare string or as a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Item<T> {
    Text(String),
    Structured(T),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrictionPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LikelyQuestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefensePrompt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_response: Option<String>,
}

/// Model output coerced into the shape the renderer relies on.
///
/// `verdict` and `confidence` can only ever hold one of their three
/// canonical values; list items may still be bare strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAnalysis {
    pub verdict: Verdict,
    pub confidence: ConfidenceTier,
    pub rationale: String,
    pub tags: Vec<String>,
    pub friction_points: Vec<Item<FrictionPoint>>,
    pub likely_questions: Vec<Item<LikelyQuestion>>,
    pub defense_prompts: Vec<Item<DefensePrompt>>,
}

impl Default for NormalizedAnalysis {
    fn default() -> Self {
        Self {
            verdict: Verdict::Hold,
            confidence: ConfidenceTier::Medium,
            rationale: String::new(),
            tags: Vec::new(),
            friction_points: Vec::new(),
            likely_questions: Vec::new(),
            defense_prompts: Vec::new(),
        }
    }
}

// ── Report ───────────────────────────────────────────────────────────────

/// Facts about the uploaded file itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub file_name: String,
    pub file_size: u64,
    /// Lowercase hex sha256 of the raw bytes.
    pub file_hash: String,
    pub page_count: usize,
}

/// Token and timing figures for one analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub retries: u32,
    pub extract_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything the pipeline knows about one deck once it is done.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub document: DocumentInfo,
    pub extraction: ExtractionResult,
    /// `"kr"` or `"en"`, from the extraction language hint.
    pub language_detected: String,
    /// Language the model was asked to answer in.
    pub output_language: crate::config::Language,
    pub stage: crate::config::Stage,
    pub analysis: NormalizedAnalysis,
    pub stats: AnalysisStats,
}

/// Result of `inspect`: extraction without a model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionReport {
    pub document: DocumentInfo,
    pub extraction: ExtractionResult,
    pub char_count: usize,
}
