//! End-to-end integration tests for deckguard.
//!
//! These tests use real pitch decks in `./test_cases/` and make live LLM API
//! calls. They are gated behind the `E2E_ENABLED` environment variable so
//! they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=. cargo test --test e2e -- --nocapture
//!
//! Expected files:
//!   test_cases/seed_deck_en.pdf   text-rich English deck
//!   test_cases/seed_deck_kr.pdf   Korean deck
//!   test_cases/image_deck.pdf     slides exported as images

use deckguard::{
    analyze, analyze_batch, analyze_to_file, inspect, render_report, AnalysisConfig,
    AnalysisProgressCallback, ConfidenceTier, DeckGuardError, Language, NoopProgressCallback,
    PipelineStage, Stage, StandardTag,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        init_tracing();
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Assert a report honours the output limits and renders cleanly.
fn assert_report_shape(report: &deckguard::AnalysisReport, context: &str) {
    let a = &report.analysis;
    assert!(a.tags.len() <= 8, "[{context}] too many tags: {:?}", a.tags);
    for tag in &a.tags {
        assert!(
            tag.parse::<StandardTag>().is_ok(),
            "[{context}] tag outside the closed set: {tag}"
        );
    }
    assert!(a.friction_points.len() <= 3, "[{context}] too many friction points");
    assert!(a.likely_questions.len() <= 2, "[{context}] too many questions");

    let md = render_report(report);
    assert!(md.ends_with('\n'), "[{context}] report must end with a newline");
    assert!(md.contains("## Verdict:"), "[{context}] verdict heading missing");
    assert!(!md.contains("\n\n\n\n"), "[{context}] excessive blank lines");
}

// ── Inspect tests (no LLM) ───────────────────────────────────────────────────

#[tokio::test]
async fn test_inspect_text_rich_deck() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("seed_deck_en.pdf"));

    let report = inspect(path.to_str().unwrap(), &AnalysisConfig::default())
        .await
        .expect("inspect() should succeed");

    assert!(report.extraction.page_count >= 1);
    assert!(report.char_count > 0);
    assert_ne!(report.extraction.confidence_tier, ConfidenceTier::Low);
    assert!(!report.extraction.language_hint);
    assert_eq!(report.document.file_hash.len(), 64);

    println!("Inspection: {:?}", report);
}

#[tokio::test]
async fn test_inspect_korean_deck_sets_hint() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("seed_deck_kr.pdf"));

    let report = inspect(path.to_str().unwrap(), &AnalysisConfig::default())
        .await
        .expect("inspect() should succeed");

    assert!(report.extraction.language_hint, "Korean deck should set the hint");
}

#[tokio::test]
async fn test_inspect_image_deck_is_low() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("image_deck.pdf"));

    let report = inspect(path.to_str().unwrap(), &AnalysisConfig::default())
        .await
        .expect("inspect() should succeed");

    assert_eq!(report.extraction.confidence_tier, ConfidenceTier::Low);
}

#[tokio::test]
async fn test_inspect_page_ceiling() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("seed_deck_en.pdf"));

    let config = AnalysisConfig::builder().max_pages(1).build().unwrap();
    match inspect(path.to_str().unwrap(), &config).await {
        Err(DeckGuardError::TooManyPages { max, .. }) => assert_eq!(max, 1),
        Ok(report) => assert_eq!(report.extraction.page_count, 1),
        Err(e) => panic!("unexpected error: {e}"),
    }
}

#[tokio::test]
async fn test_inspect_nonexistent() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP");
        return;
    }

    let result = inspect("/definitely/not/a/real/deck.pdf", &AnalysisConfig::default()).await;
    assert!(matches!(result, Err(DeckGuardError::FileNotFound { .. })));
}

// ── Full analysis (live LLM) ─────────────────────────────────────────────────

#[tokio::test]
async fn test_analyze_english_deck() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("seed_deck_en.pdf"));

    let config = AnalysisConfig::builder().stage(Stage::Seed).build().unwrap();
    let report = analyze(path.to_str().unwrap(), &config)
        .await
        .expect("analyze() should succeed");

    assert_eq!(report.output_language, Language::En);
    assert_eq!(report.stage, Stage::Seed);
    assert!(report.stats.total_duration_ms >= report.stats.llm_duration_ms);
    assert_report_shape(&report, "seed_deck_en");

    println!("{}", render_report(&report));
}

#[tokio::test]
async fn test_analyze_korean_deck_answers_in_korean() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("seed_deck_kr.pdf"));

    let report = analyze(path.to_str().unwrap(), &AnalysisConfig::default())
        .await
        .expect("analyze() should succeed");

    assert_eq!(report.language_detected, "kr");
    assert_eq!(report.output_language, Language::Kr);
    assert_report_shape(&report, "seed_deck_kr");
}

#[tokio::test]
async fn test_explicit_language_overrides_hint() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("seed_deck_kr.pdf"));

    let config = AnalysisConfig::builder()
        .language(Language::En)
        .build()
        .unwrap();
    let report = analyze(path.to_str().unwrap(), &config)
        .await
        .expect("analyze() should succeed");

    assert_eq!(report.output_language, Language::En);
}

#[tokio::test]
async fn test_analyze_to_file_and_json() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("seed_deck_en.pdf"));

    let out = output_dir().join("seed_deck_en.md");
    let report = analyze_to_file(path.to_str().unwrap(), &out, &AnalysisConfig::default())
        .await
        .expect("analyze_to_file() should succeed");

    let written = std::fs::read_to_string(&out).expect("report file");
    assert_eq!(written, render_report(&report));

    let json = serde_json::to_string_pretty(&report).expect("report serialises");
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["analysis"]["verdict"].is_string());
    assert!(value["extraction"].get("text").is_none(), "raw text is not serialised");
}

#[tokio::test]
async fn test_batch_keeps_input_order_and_isolates_failures() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("seed_deck_en.pdf"));

    let inputs = vec![
        path.to_str().unwrap().to_string(),
        "/definitely/not/a/real/deck.pdf".to_string(),
    ];

    #[derive(Default)]
    struct Recorder {
        stages: Mutex<Vec<(String, PipelineStage)>>,
        errors: Mutex<Vec<String>>,
    }
    impl AnalysisProgressCallback for Recorder {
        fn on_stage(&self, deck: &str, stage: PipelineStage) {
            self.stages.lock().unwrap().push((deck.to_string(), stage));
        }
        fn on_deck_error(&self, deck: &str, _error: &str) {
            self.errors.lock().unwrap().push(deck.to_string());
        }
    }

    let recorder = Arc::new(Recorder::default());
    let config = AnalysisConfig::builder()
        .concurrency(2)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let results = analyze_batch(&inputs, &config).await.expect("batch");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, inputs[0]);
    assert!(results[0].1.is_ok());
    assert!(matches!(results[1].1, Err(DeckGuardError::FileNotFound { .. })));

    assert_eq!(*recorder.errors.lock().unwrap(), vec![inputs[1].clone()]);
    assert!(recorder
        .stages
        .lock()
        .unwrap()
        .iter()
        .any(|(_, s)| *s == PipelineStage::Normalizing));
}

// ── Structural tests (no API calls, always run) ──────────────────────────────

#[tokio::test]
async fn test_callback_send_in_tokio_spawn() {
    struct ErrorLogger {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl AnalysisProgressCallback for ErrorLogger {
        fn on_deck_error(&self, deck: &str, error: &str) {
            self.log.lock().unwrap().push(format!("{deck}: {error}"));
        }
    }

    let logger = Arc::new(ErrorLogger {
        log: Arc::new(Mutex::new(vec![])),
    });
    let log_ref = Arc::clone(&logger.log);
    let cb: Arc<dyn AnalysisProgressCallback> = logger;

    tokio::spawn(async move {
        cb.on_deck_error("deck.pdf", "model unreachable after 3 retries");
    })
    .await
    .expect("spawn must succeed");

    assert_eq!(
        *log_ref.lock().unwrap(),
        vec!["deck.pdf: model unreachable after 3 retries"]
    );
}

#[test]
fn test_noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();

    let cb: Arc<dyn AnalysisProgressCallback> = Arc::new(NoopProgressCallback);
    cb.on_stage("deck.pdf", PipelineStage::Extracting);
}

#[test]
fn test_config_builder_accepts_provider_name() {
    let config = AnalysisConfig::builder()
        .provider_name("anthropic")
        .model("claude-sonnet-4-20250514")
        .build()
        .expect("config builds without touching the network");

    assert_eq!(config.provider_name.as_deref(), Some("anthropic"));
    assert_eq!(config.model.as_deref(), Some("claude-sonnet-4-20250514"));
}
