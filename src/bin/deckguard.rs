//! CLI binary for deckguard.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AnalysisConfig` and prints reports.

use anyhow::{Context, Result};
use clap::Parser;
use deckguard::{
    analyze, analyze_batch, analyze_to_file, inspect, render_report, AnalysisConfig,
    AnalysisProgressCallback, AnalysisReport, Language, PipelineStage, ProgressCallback, Stage,
    Verdict,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

fn colour_verdict(verdict: &str) -> String {
    match verdict {
        "GO" => green(verdict),
        "NO_GO" => red(verdict),
        _ => yellow(verdict),
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one spinner for the whole run, plus a log
/// line per finished deck. Decks may finish in any order in batch mode.
struct CliProgressCallback {
    bar: ProgressBar,
    total: usize,
    done: AtomicUsize,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new(total: usize) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix(format!("0/{total}"));
        bar.set_message("Starting…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            total,
            done: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        })
    }

    fn advance(&self) {
        let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        self.bar.set_prefix(format!("{done}/{}", self.total));
        if done == self.total {
            self.bar.finish_and_clear();
        }
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_stage(&self, deck: &str, stage: PipelineStage) {
        self.bar.set_message(format!("{}  {}", deck, dim(stage.describe())));
    }

    fn on_deck_complete(&self, deck: &str, verdict: &str) {
        self.bar
            .println(format!("  {} {}  {}", green("✓"), deck, colour_verdict(verdict)));
        self.advance();
    }

    fn on_deck_error(&self, deck: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 100 {
            let cut: String = error.chars().take(99).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {}  {}", red("✗"), deck, red(&msg)));
        self.advance();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a seed-stage deck (Markdown on stdout)
  deckguard deck.pdf

  # Series A deck, answer in Korean, write the report to a file
  deckguard --stage series-a --language kr deck.pdf -o report.md

  # Several decks at once, JSON out
  deckguard --json --concurrency 4 a.pdf b.pdf https://example.com/c.pdf

  # Check extraction quality only (no API key needed)
  deckguard --inspect-only deck.pdf

  # Use a specific model
  deckguard --provider anthropic --model claude-sonnet-4-20250514 deck.pdf

VERDICTS:
  GO      Ready to Send      no blocking issue found
  HOLD    Review Required    fix the friction points first
  NO_GO   High Risk          the deck will likely be passed on

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  DECKGUARD_LLM_PROVIDER  Provider used when --provider is not given
  DECKGUARD_MODEL         Model used together with DECKGUARD_LLM_PROVIDER
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)

SETUP:
  1. Install libpdfium or point PDFIUM_LIB_PATH at it.
  2. Set API key:     export OPENAI_API_KEY=sk-...
  3. Analyse:         deckguard deck.pdf
"#;

/// Assess how investors will react to a pitch deck.
#[derive(Parser, Debug)]
#[command(
    name = "deckguard",
    version,
    about = "Pre-flight risk assessment for startup pitch decks",
    long_about = "Extract the text of a pitch deck (local PDF or URL), ask a language model how \
an investor would react, and print a verdict, friction points, likely questions and suggested \
answers. Supports OpenAI, Anthropic, Google Gemini, Azure OpenAI, and any OpenAI-compatible \
endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file paths or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write the report to this file instead of stdout (single input only).
    #[arg(short, long, env = "DECKGUARD_OUTPUT")]
    output: Option<PathBuf>,

    /// Funding stage the deck is pitched for: pre-seed, seed, pre-a, series-a.
    #[arg(long, env = "DECKGUARD_STAGE", default_value = "seed", value_parser = parse_stage)]
    stage: Stage,

    /// Answer language. Default: Korean for Korean decks, English otherwise.
    #[arg(long, env = "DECKGUARD_LANGUAGE", value_enum)]
    language: Option<LanguageArg>,

    /// LLM model ID (e.g. gpt-4o-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long)]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "DECKGUARD_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "DECKGUARD_MAX_TOKENS", default_value_t = 2000)]
    max_tokens: usize,

    /// Retries on LLM failure.
    #[arg(long, env = "DECKGUARD_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// LLM call timeout in seconds.
    #[arg(long, env = "DECKGUARD_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DECKGUARD_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Decks analysed at once.
    #[arg(short, long, env = "DECKGUARD_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "DECKGUARD_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// PDF user password for encrypted decks.
    #[arg(long, env = "DECKGUARD_PASSWORD")]
    password: Option<String>,

    /// Reject decks with more pages than this.
    #[arg(long, env = "DECKGUARD_MAX_PAGES", default_value_t = 20)]
    max_pages: usize,

    /// Reject files larger than this many MiB.
    #[arg(long, env = "DECKGUARD_MAX_FILE_MB", default_value_t = 15)]
    max_file_mb: u64,

    /// Output the structured report as JSON instead of Markdown.
    #[arg(long, env = "DECKGUARD_JSON")]
    json: bool,

    /// Report extraction quality only; no model call.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress spinner.
    #[arg(long, env = "DECKGUARD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DECKGUARD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DECKGUARD_QUIET")]
    quiet: bool,
}

fn parse_stage(s: &str) -> Result<Stage, String> {
    s.parse::<Stage>().map_err(|e| e.to_string())
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LanguageArg {
    En,
    Kr,
}

impl From<LanguageArg> for Language {
    fn from(v: LanguageArg) -> Self {
        match v {
            LanguageArg::En => Language::En,
            LanguageArg::Kr => Language::Kr,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs are hidden while the spinner is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.output.is_some() && cli.inputs.len() > 1 {
        anyhow::bail!("--output can only be used with a single input");
    }

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None).await?;
        for input in &cli.inputs {
            let report = inspect(input, &config)
                .await
                .with_context(|| format!("Failed to inspect {input}"))?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report)
                        .context("Failed to serialize inspection")?
                );
            } else {
                println!("File:         {}", report.document.file_name);
                println!("Size:         {} bytes", report.document.file_size);
                println!("SHA-256:      {}", report.document.file_hash);
                println!("Pages:        {}", report.extraction.page_count);
                println!("Characters:   {}", report.char_count);
                println!("Extraction:   {}", report.extraction.confidence_tier.label());
                println!(
                    "Language:     {}",
                    if report.extraction.language_hint { "kr" } else { "en" }
                );
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new(cli.inputs.len());
        Some(cb as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Single deck ──────────────────────────────────────────────────────
    if let [input] = cli.inputs.as_slice() {
        if let Some(ref output_path) = cli.output {
            let report = if cli.json {
                let report = analyze(input, &config).await.context("Analysis failed")?;
                let json = serde_json::to_string_pretty(&report)
                    .context("Failed to serialise report")?;
                deckguard::analyze::write_atomic(output_path, &json)
                    .await
                    .context("Failed to write report")?;
                report
            } else {
                analyze_to_file(input, output_path, &config)
                    .await
                    .context("Analysis failed")?
            };

            if !cli.quiet {
                eprintln!(
                    "{}  {}  →  {}",
                    colour_verdict(report.analysis.verdict.as_str()),
                    report.analysis.confidence.label(),
                    bold(&output_path.display().to_string()),
                );
                print_stats(&report);
            }
        } else {
            let report = analyze(input, &config).await.context("Analysis failed")?;
            print_report(&report, cli.json)?;
            if !cli.quiet && !cli.json {
                print_stats(&report);
            }
        }
        return Ok(());
    }

    // ── Batch ────────────────────────────────────────────────────────────
    let results = analyze_batch(&cli.inputs, &config)
        .await
        .context("Analysis failed")?;

    let mut failed = 0usize;
    let mut no_go = 0usize;
    if cli.json {
        let reports: Vec<&AnalysisReport> =
            results.iter().filter_map(|(_, r)| r.as_ref().ok()).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&reports).context("Failed to serialise reports")?
        );
    }
    for (input, result) in &results {
        match result {
            Ok(report) => {
                if report.analysis.verdict == Verdict::NoGo {
                    no_go += 1;
                }
                if !cli.json {
                    print_report(report, false)?;
                    println!("\n---\n");
                }
            }
            Err(e) => {
                failed += 1;
                if !show_progress {
                    eprintln!("{} {}: {}", red("✗"), input, e);
                }
            }
        }
    }

    if !cli.quiet {
        eprintln!(
            "{} decks analysed  ({} NO_GO, {} failed)",
            bold(&(results.len() - failed).to_string()),
            no_go,
            if failed == 0 {
                failed.to_string()
            } else {
                red(&failed.to_string())
            },
        );
    }

    if failed == results.len() {
        anyhow::bail!("every deck failed");
    }
    Ok(())
}

fn print_report(report: &AnalysisReport, json: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if json {
        let json = serde_json::to_string_pretty(report).context("Failed to serialise report")?;
        writeln!(handle, "{json}").context("Failed to write to stdout")?;
    } else {
        handle
            .write_all(render_report(report).as_bytes())
            .context("Failed to write to stdout")?;
    }
    Ok(())
}

fn print_stats(report: &AnalysisReport) {
    eprintln!(
        "   {} tokens in  /  {} tokens out  —  {}ms total",
        dim(&report.stats.input_tokens.to_string()),
        dim(&report.stats.output_tokens.to_string()),
        report.stats.total_duration_ms,
    );
}

/// Map CLI args to `AnalysisConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .stage(cli.stage)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .concurrency(cli.concurrency)
        .max_pages(cli.max_pages)
        .max_file_bytes(cli.max_file_mb.saturating_mul(1024 * 1024));

    if let Some(language) = cli.language {
        builder = builder.language(language.into());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
