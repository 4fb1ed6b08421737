//! # deckguard
//!
//! Pre-flight risk assessment for startup pitch decks.
//!
//! A founder hands over a PDF; DeckGuard extracts its text, asks a language
//! model how an investor would react, and returns a verdict (GO, HOLD or
//! NO_GO), a confidence tier, the friction points, the questions to expect,
//! and suggested answers.
//!
//! Model output is treated as untrusted. Whatever shape comes back (scores
//! instead of labels, strings instead of records, missing sections) is
//! coerced into one canonical [`NormalizedAnalysis`] so that rendering never
//! fails.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL; size and %PDF checks
//!  ├─ 2. Extract    text layer of every page via pdfium (spawn_blocking)
//!  ├─ 3. Quality    density tier + Korean language hint
//!  ├─ 4. LLM        one model call with retry, backoff and timeout
//!  ├─ 5. Normalize  recover JSON, coerce to the canonical shape, apply limits
//!  └─ 6. Output     AnalysisReport + Markdown rendering
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deckguard::{analyze, render_report, AnalysisConfig, Stage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / ...
//!     let config = AnalysisConfig::builder().stage(Stage::PreA).build()?;
//!     let report = analyze("deck.pdf", &config).await?;
//!     println!("{}", render_report(&report));
//!     eprintln!("verdict: {}", report.analysis.verdict);
//!     Ok(())
//! }
//! ```
//!
//! The two pure stages can be used without a PDF or a model:
//!
//! ```rust
//! use deckguard::{estimate_quality, normalize, ConfidenceTier, Verdict};
//! use serde_json::json;
//!
//! let quality = estimate_quality("", 12);
//! assert_eq!(quality.confidence_tier, ConfidenceTier::Low);
//!
//! let analysis = normalize(&json!({ "verdict": "pass", "confidence": 0.9 }));
//! assert_eq!(analysis.verdict, Verdict::NoGo);
//! assert_eq!(analysis.confidence, ConfidenceTier::High);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `deckguard` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! deckguard = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_batch, analyze_bytes, analyze_sync, analyze_to_file, inspect};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, Language, Stage, DEFAULT_MODEL};
pub use error::DeckGuardError;
pub use output::{
    AnalysisReport, AnalysisStats, ConfidenceTier, DefensePrompt, DocumentInfo, ExtractionResult,
    FrictionPoint, InspectionReport, Item, LikelyQuestion, NormalizedAnalysis, Severity,
    StandardTag, Verdict,
};
pub use pipeline::normalize::{normalize, normalize_str};
pub use pipeline::postprocess::{parse_model_json, OutputLimits};
pub use pipeline::quality::{estimate_quality, QualityEstimate, QualityPolicy};
pub use pipeline::render::{render_analysis, render_report};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, PipelineStage, ProgressCallback};
