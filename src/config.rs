//! Configuration types for deck analysis.
//!
//! All analysis behaviour is controlled through [`AnalysisConfig`], built via
//! its [`AnalysisConfigBuilder`]. Keeping every knob in one struct makes it
//! easy to share a config across concurrent analyses and to log exactly what
//! a run used.

use crate::error::DeckGuardError;
use crate::pipeline::postprocess::OutputLimits;
use crate::pipeline::quality::QualityPolicy;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default model when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for a deck analysis.
///
/// Built via [`AnalysisConfig::builder()`] or using
/// [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use deckguard::{AnalysisConfig, Stage};
///
/// let config = AnalysisConfig::builder()
///     .stage(Stage::PreA)
///     .model("gpt-4o-mini")
///     .max_pages(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Funding stage the deck is pitched for. Default: [`Stage::Seed`].
    pub stage: Stage,

    /// Language the model should answer in. Default: None.
    ///
    /// When unset the extraction language hint decides: Korean decks get a
    /// Korean answer, everything else English.
    pub language: Option<Language>,

    /// LLM model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.3.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 2000.
    pub max_tokens: usize,

    /// Maximum retry attempts on a failed model call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call model timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Deck text beyond this many characters is not sent. Default: 15 000.
    pub max_prompt_chars: usize,

    /// Byte-size ceiling for an uploaded deck. Default: 15 MiB.
    pub max_file_bytes: u64,

    /// Page-count ceiling. Default: 20.
    pub max_pages: usize,

    /// PDF user password for encrypted decks.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Decks analysed at once by [`crate::analyze::analyze_batch`]. Default: 4.
    pub concurrency: usize,

    /// Density and script thresholds for the extraction estimate.
    pub quality: QualityPolicy,

    /// Caps applied to the model's lists after normalisation.
    pub limits: OutputLimits,

    /// Receives stage events as the pipeline runs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            stage: Stage::default(),
            language: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 2000,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            system_prompt: None,
            max_prompt_chars: 15_000,
            max_file_bytes: 15 * 1024 * 1024,
            max_pages: 20,
            password: None,
            download_timeout_secs: 120,
            concurrency: 4,
            quality: QualityPolicy::default(),
            limits: OutputLimits::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("stage", &self.stage)
            .field("language", &self.language)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("max_prompt_chars", &self.max_prompt_chars)
            .field("max_file_bytes", &self.max_file_bytes)
            .field("max_pages", &self.max_pages)
            .field("concurrency", &self.concurrency)
            .field("quality", &self.quality)
            .field("limits", &self.limits)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// Language the model answers in for a deck with the given hint.
    ///
    /// An explicit choice always wins; otherwise the hint picks Korean.
    pub fn output_language(&self, language_hint: bool) -> Language {
        match self.language {
            Some(lang) => lang,
            None if language_hint => Language::Kr,
            None => Language::En,
        }
    }

    pub(crate) fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn stage(mut self, stage: Stage) -> Self {
        self.config.stage = stage;
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.config.language = Some(language);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_prompt_chars(mut self, n: usize) -> Self {
        self.config.max_prompt_chars = n;
        self
    }

    pub fn max_file_bytes(mut self, n: u64) -> Self {
        self.config.max_file_bytes = n;
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn quality(mut self, policy: QualityPolicy) -> Self {
        self.config.quality = policy;
        self
    }

    pub fn limits(mut self, limits: OutputLimits) -> Self {
        self.config.limits = limits;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, DeckGuardError> {
        let c = &self.config;
        if c.max_pages == 0 {
            return Err(DeckGuardError::InvalidConfig(
                "max_pages must be ≥ 1".into(),
            ));
        }
        if c.max_file_bytes == 0 {
            return Err(DeckGuardError::InvalidConfig(
                "max_file_bytes must be ≥ 1".into(),
            ));
        }
        if c.max_prompt_chars == 0 {
            return Err(DeckGuardError::InvalidConfig(
                "max_prompt_chars must be ≥ 1".into(),
            ));
        }
        c.quality.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Funding stage the founder is raising for.
///
/// The stage changes what the model expects to see: a pre-seed deck with no
/// revenue is normal, a Series A deck without it is a red flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    PreSeed,
    #[default]
    Seed,
    PreA,
    SeriesA,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::PreSeed => "pre-seed",
            Stage::Seed => "seed",
            Stage::PreA => "pre-a",
            Stage::SeriesA => "series-a",
        }
    }

    /// Short description of the stage used in the analysis prompt.
    pub fn context(self) -> &'static str {
        match self {
            Stage::PreSeed => "Pre-Seed stage (concept verification, no product yet)",
            Stage::Seed => "Seed stage (MVP exists, early traction)",
            Stage::PreA => "Pre-A stage (early growth, some revenue)",
            Stage::SeriesA => "Series A stage (proven growth, scaling)",
        }
    }
}

impl FromStr for Stage {
    type Err = DeckGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pre-seed" | "preseed" => Ok(Stage::PreSeed),
            "seed" => Ok(Stage::Seed),
            "pre-a" | "prea" => Ok(Stage::PreA),
            "series-a" | "seriesa" => Ok(Stage::SeriesA),
            other => Err(DeckGuardError::InvalidConfig(format!(
                "unknown stage '{other}' (expected pre-seed, seed, pre-a or series-a)"
            ))),
        }
    }
}

/// Response language for the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Kr,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Kr => "kr",
        }
    }
}
