//! Analysis entry points.
//!
//! [`analyze`] runs one deck through the whole pipeline and returns an
//! [`AnalysisReport`]. [`analyze_batch`] runs several independent decks with
//! bounded concurrency, and [`inspect`] stops after extraction so it needs no
//! API key.

use crate::config::AnalysisConfig;
use crate::error::DeckGuardError;
use crate::output::{
    AnalysisReport, AnalysisStats, DocumentInfo, ExtractionResult, InspectionReport,
};
use crate::pipeline::input::LoadedDeck;
use crate::pipeline::{extract, input, llm, normalize, postprocess, render};
use crate::progress::PipelineStage;
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Analyse a pitch deck given as a local path or HTTP/HTTPS URL.
///
/// # Errors
/// Returns `Err(DeckGuardError)` only when there is nothing to report:
/// - File not found, too large, or not a PDF
/// - Too many pages, encrypted or corrupt PDF
/// - No provider configured, model unreachable after retries
/// - Model reply that contains no JSON
///
/// An odd but parseable reply is never an error; it is normalised.
pub async fn analyze(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, DeckGuardError> {
    let input_str = input_str.as_ref();
    let provider = resolve_provider(config)?;
    let load = input::load_input(input_str, config.max_file_bytes, config.download_timeout_secs);
    run_with_events(input_str, config, load, |deck| {
        analyze_loaded(deck, &provider, config)
    })
    .await
}

/// Analyse a deck already held in memory.
///
/// `name` is only used for display in the report.
pub async fn analyze_bytes(
    name: &str,
    bytes: Vec<u8>,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, DeckGuardError> {
    let provider = resolve_provider(config)?;
    let load = async { LoadedDeck::from_bytes(name, bytes, config.max_file_bytes) };
    run_with_events(name, config, load, |deck| analyze_loaded(deck, &provider, config)).await
}

/// Analyse several decks concurrently, at most `config.concurrency` at once.
///
/// Results come back in input order. One deck failing does not affect the
/// others.
pub async fn analyze_batch(
    inputs: &[String],
    config: &AnalysisConfig,
) -> Result<Vec<(String, Result<AnalysisReport, DeckGuardError>)>, DeckGuardError> {
    let provider = resolve_provider(config)?;
    info!(
        "Analysing {} decks, concurrency {}",
        inputs.len(),
        config.concurrency
    );

    let results = stream::iter(inputs.iter().map(|input_str| {
        let provider = Arc::clone(&provider);
        async move {
            let load =
                input::load_input(input_str, config.max_file_bytes, config.download_timeout_secs);
            let result = run_with_events(input_str, config, load, |deck| {
                let provider = Arc::clone(&provider);
                async move { analyze_loaded(deck, &provider, config).await }
            })
            .await;
            (input_str.clone(), result)
        }
    }))
    .buffered(config.concurrency.max(1))
    .collect()
    .await;

    Ok(results)
}

/// Analyse a deck and write the Markdown report to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn analyze_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, DeckGuardError> {
    let report = analyze(input_str, config).await?;
    write_atomic(output_path.as_ref(), &render::render_report(&report)).await?;
    Ok(report)
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, DeckGuardError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DeckGuardError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(input_str, config))
}

/// Load and extract a deck without calling the model.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<InspectionReport, DeckGuardError> {
    let deck = input::load_input(
        input_str.as_ref(),
        config.max_file_bytes,
        config.download_timeout_secs,
    )
    .await?;
    let (document, extraction, _) = extract_deck(deck, config).await?;
    let char_count = extraction.text.chars().count();
    Ok(InspectionReport {
        document,
        extraction,
        char_count,
    })
}

/// Write `contents` to `path` via a sibling temp file and a rename.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), DeckGuardError> {
    let write_err = |e| DeckGuardError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Await `load`, hand the deck to `run`, and fire the progress events
/// under the label `input_str`.
async fn run_with_events<L, F, Fut>(
    input_str: &str,
    config: &AnalysisConfig,
    load: L,
    run: F,
) -> Result<AnalysisReport, DeckGuardError>
where
    L: Future<Output = Result<LoadedDeck, DeckGuardError>>,
    F: FnOnce(LoadedDeck) -> Fut,
    Fut: Future<Output = Result<AnalysisReport, DeckGuardError>>,
{
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(input_str, PipelineStage::Loading);
    }

    let result = match load.await {
        Ok(deck) => run(deck).await,
        Err(e) => Err(e),
    };

    if let Some(ref cb) = config.progress_callback {
        match &result {
            Ok(report) => cb.on_deck_complete(input_str, report.analysis.verdict.as_str()),
            Err(e) => cb.on_deck_error(input_str, &e.to_string()),
        }
    }
    if let Err(ref e) = result {
        warn!("{}: {}", input_str, e);
    }
    result
}

/// Hash and extract a loaded deck.
async fn extract_deck(
    deck: LoadedDeck,
    config: &AnalysisConfig,
) -> Result<(DocumentInfo, ExtractionResult, u64), DeckGuardError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(&deck.name, PipelineStage::Extracting);
    }

    let file_hash = deck.sha256_hex();
    let file_size = deck.size();
    let name = deck.name;

    let start = Instant::now();
    let extracted =
        extract::extract_text(&name, deck.bytes, config.password.as_deref(), config.max_pages)
            .await?;
    let extract_ms = start.elapsed().as_millis() as u64;

    let extraction = ExtractionResult::new(extracted.text, extracted.page_count, &config.quality);
    info!(
        "{}: {} pages, extraction {}, korean={}",
        name, extraction.page_count, extraction.confidence_tier, extraction.language_hint
    );

    let document = DocumentInfo {
        file_name: name,
        file_size,
        file_hash,
        page_count: extraction.page_count,
    };
    Ok((document, extraction, extract_ms))
}

/// Run a loaded deck through extraction, the model and normalisation.
async fn analyze_loaded(
    deck: LoadedDeck,
    provider: &Arc<dyn LLMProvider>,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, DeckGuardError> {
    let total_start = Instant::now();
    let (document, extraction, extract_duration_ms) = extract_deck(deck, config).await?;
    analyze_extracted(
        document,
        extraction,
        extract_duration_ms,
        total_start,
        provider,
        config,
    )
    .await
}

/// Everything after extraction: model call, parsing, normalisation, limits.
async fn analyze_extracted(
    document: DocumentInfo,
    extraction: ExtractionResult,
    extract_duration_ms: u64,
    total_start: Instant,
    provider: &Arc<dyn LLMProvider>,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, DeckGuardError> {
    let output_language = config.output_language(extraction.language_hint);

    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(&document.file_name, PipelineStage::Analyzing);
    }
    let reply =
        llm::request_analysis(provider, &extraction.text, output_language, config).await?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(&document.file_name, PipelineStage::Normalizing);
    }
    let raw = postprocess::parse_model_json(&reply.content)?;
    let analysis = config.limits.apply(normalize::normalize(&raw));
    debug!(
        "{}: verdict {} / confidence {}",
        document.file_name, analysis.verdict, analysis.confidence
    );

    let stats = AnalysisStats {
        input_tokens: reply.input_tokens,
        output_tokens: reply.output_tokens,
        retries: reply.retries,
        extract_duration_ms,
        llm_duration_ms: reply.duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    let language_detected = if extraction.language_hint { "kr" } else { "en" };

    Ok(AnalysisReport {
        document,
        language_detected: language_detected.to_string(),
        extraction,
        output_language,
        stage: config.stage,
        analysis,
        stats,
    })
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, DeckGuardError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        DeckGuardError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`)
/// 2. **Named provider** (`config.provider_name`, model or [`crate::config::DEFAULT_MODEL`])
/// 3. **Environment pair** (`DECKGUARD_LLM_PROVIDER` + `DECKGUARD_MODEL`)
/// 4. **OpenAI** when `OPENAI_API_KEY` is set
/// 5. **Full auto-detection** (`ProviderFactory::from_env`)
fn resolve_provider(config: &AnalysisConfig) -> Result<Arc<dyn LLMProvider>, DeckGuardError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, config.model_or_default());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("DECKGUARD_LLM_PROVIDER"),
        std::env::var("DECKGUARD_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", config.model_or_default());
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| DeckGuardError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_atomic_creates_parent_and_leaves_no_temp() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("reports").join("acme.md");

        write_atomic(&path, "# report\n").await.expect("write");

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# report\n");
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn inspect_rejects_non_pdf_before_pdfium() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"just some notes").unwrap();

        let err = inspect(path.to_str().unwrap(), &AnalysisConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DeckGuardError::NotAPdf { .. }));
    }

    use crate::config::Language;
    use crate::output::{ConfidenceTier, Verdict};
    use crate::progress::AnalysisProgressCallback;
    use edgequake_llm::MockProvider;
    use std::sync::Mutex;

    #[derive(Default)]
    struct EventLog {
        events: Mutex<Vec<String>>,
    }

    impl AnalysisProgressCallback for EventLog {
        fn on_stage(&self, deck: &str, stage: PipelineStage) {
            self.events.lock().unwrap().push(format!("{deck}:{stage:?}"));
        }
        fn on_deck_complete(&self, deck: &str, verdict: &str) {
            self.events.lock().unwrap().push(format!("{deck}:done:{verdict}"));
        }
        fn on_deck_error(&self, deck: &str, _error: &str) {
            self.events.lock().unwrap().push(format!("{deck}:error"));
        }
    }

    async fn mock_with_reply(reply: &str) -> Arc<dyn LLMProvider> {
        let mock = MockProvider::new();
        mock.add_response(reply).await;
        Arc::new(mock)
    }

    fn extracted(text: &str, pages: usize, config: &AnalysisConfig) -> (DocumentInfo, ExtractionResult) {
        let extraction = ExtractionResult::new(text.to_string(), pages, &config.quality);
        let document = DocumentInfo {
            file_name: "acme.pdf".into(),
            file_size: 1234,
            file_hash: "0".repeat(64),
            page_count: pages,
        };
        (document, extraction)
    }

    #[tokio::test]
    async fn analyze_bytes_rejects_oversized_deck_and_reports_error() {
        let log = Arc::new(EventLog::default());
        let config = AnalysisConfig::builder()
            .max_file_bytes(4)
            .provider(Arc::new(MockProvider::new()))
            .progress_callback(log.clone())
            .build()
            .unwrap();
        let err = analyze_bytes("big.pdf", b"%PDF-1.7".to_vec(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, DeckGuardError::FileTooLarge { .. }));
        assert_eq!(
            *log.events.lock().unwrap(),
            vec!["big.pdf:Loading".to_string(), "big.pdf:error".to_string()]
        );
    }

    #[tokio::test]
    async fn fenced_reply_becomes_capped_report() {
        let reply = "```json\n{\"verdict\": \"investable\", \"confidence\": 0.91, \
                     \"rationale\": \"Clear ask.\", \
                     \"tags\": [\"Moat_Weak\", \"Moat_Weak\", \"Vibes\"], \
                     \"friction_points\": [\"a\", \"b\", {\"title\": \"c\"}, \"d\"], \
                     \"likely_questions\": [\"q1\", \"q2\", \"q3\"], \
                     \"defense_prompts\": [\"p1\"]}\n```";
        let log = Arc::new(EventLog::default());
        let config = AnalysisConfig::builder()
            .progress_callback(log.clone())
            .build()
            .unwrap();
        let provider = mock_with_reply(reply).await;
        let (document, extraction) = extracted(&"word ".repeat(400), 10, &config);

        let report = analyze_extracted(document, extraction, 7, Instant::now(), &provider, &config)
            .await
            .expect("report");

        assert_eq!(report.analysis.verdict, Verdict::Go);
        assert_eq!(report.analysis.confidence, ConfidenceTier::High);
        assert_eq!(report.analysis.rationale, "Clear ask.");
        assert_eq!(report.analysis.tags, vec!["Moat_Weak"]);
        assert_eq!(report.analysis.friction_points.len(), 3);
        assert_eq!(report.analysis.likely_questions.len(), 2);
        assert_eq!(report.analysis.defense_prompts.len(), 1);
        assert_eq!(report.extraction.confidence_tier, ConfidenceTier::High);
        assert_eq!(report.output_language, Language::En);
        assert_eq!(report.language_detected, "en");
        assert_eq!(report.stats.extract_duration_ms, 7);
        assert_eq!(report.stats.retries, 0);
        assert_eq!(
            *log.events.lock().unwrap(),
            vec!["acme.pdf:Analyzing".to_string(), "acme.pdf:Normalizing".to_string()]
        );
    }

    #[tokio::test]
    async fn korean_deck_is_answered_in_korean() {
        let config = AnalysisConfig::default();
        let provider = mock_with_reply(r#"{"verdict": "potential", "confidence": "low"}"#).await;
        let (document, extraction) = extracted(&"투자 유치 계획 ".repeat(50), 2, &config);

        let report = analyze_extracted(document, extraction, 0, Instant::now(), &provider, &config)
            .await
            .expect("report");

        assert_eq!(report.output_language, Language::Kr);
        assert_eq!(report.language_detected, "kr");
        assert_eq!(report.analysis.verdict, Verdict::Hold);
        assert_eq!(report.analysis.confidence, ConfidenceTier::Low);
    }

    #[tokio::test]
    async fn reply_without_json_is_malformed() {
        let config = AnalysisConfig::default();
        let provider = mock_with_reply("Sorry, I can't review this deck.").await;
        let (document, extraction) = extracted("some text", 1, &config);

        let err = analyze_extracted(document, extraction, 0, Instant::now(), &provider, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, DeckGuardError::MalformedModelResponse { .. }));
    }
}
