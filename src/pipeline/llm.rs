//! Model interaction: build the analysis messages and call the provider.
//!
//! All prompt wording lives in [`crate::prompts`]; this module only owns
//! message layout, retry and timeout handling.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors are transient. Each failed or timed-out attempt is
//! retried after `retry_backoff_ms * 2^(attempt-1)`: with the defaults
//! 500 ms → 1 s → 2 s. A single wait never exceeds [`MAX_BACKOFF_MS`].

use crate::config::{AnalysisConfig, Language};
use crate::error::DeckGuardError;
use crate::prompts::{analysis_user_prompt, DEFAULT_SYSTEM_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Upper bound on one retry wait.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Raw model reply plus usage figures.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub retries: u32,
    pub duration_ms: u64,
}

/// Ask the model to assess one deck.
///
/// ## Message Layout
///
/// 1. **System message**: verdict vocabulary, tag set and caps (or the
///    caller's override)
/// 2. **User message**: stage context, language instruction, the deck text
///    and the JSON template to answer with
///
/// # Errors
/// * [`DeckGuardError::ApiTimeout`]: the last attempt timed out
/// * [`DeckGuardError::LlmApiError`]: the last attempt failed
pub async fn request_analysis(
    provider: &Arc<dyn LLMProvider>,
    deck_text: &str,
    language: Language,
    config: &AnalysisConfig,
) -> Result<ModelReply, DeckGuardError> {
    let start = Instant::now();
    let messages = build_messages(deck_text, language, config);
    let options = build_options(config);
    let call_timeout = Duration::from_secs(config.api_timeout_secs.max(1));

    let mut last_err: Option<DeckGuardError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_delay_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Model call: retry {}/{} after {}ms",
                attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let attempt_start = Instant::now();
        match timeout(call_timeout, provider.chat(&messages, Some(&options))).await {
            Ok(Ok(response)) => {
                let duration = start.elapsed();
                debug!(
                    "Model call: {} input tokens, {} output tokens, {:?}",
                    response.prompt_tokens, response.completion_tokens, duration
                );
                return Ok(ModelReply {
                    content: response.content,
                    input_tokens: response.prompt_tokens,
                    output_tokens: response.completion_tokens,
                    retries: attempt,
                    duration_ms: duration.as_millis() as u64,
                });
            }
            Ok(Err(e)) => {
                warn!("Model call: attempt {} failed: {}", attempt + 1, e);
                last_err = Some(DeckGuardError::LlmApiError {
                    retries: attempt,
                    message: e.to_string(),
                });
            }
            Err(_) => {
                let elapsed_ms = attempt_start.elapsed().as_millis() as u64;
                warn!("Model call: attempt {} timed out after {}ms", attempt + 1, elapsed_ms);
                last_err = Some(DeckGuardError::ApiTimeout { elapsed_ms });
            }
        }
    }

    Err(match last_err {
        Some(DeckGuardError::LlmApiError { message, .. }) => DeckGuardError::LlmApiError {
            retries: config.max_retries,
            message,
        },
        Some(other) => other,
        None => DeckGuardError::Internal("model call loop made no attempt".into()),
    })
}

/// Wait before retry number `attempt` (1-based), saturating at [`MAX_BACKOFF_MS`].
fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS)
}

fn build_messages(deck_text: &str, language: Language, config: &AnalysisConfig) -> Vec<ChatMessage> {
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(analysis_user_prompt(
            deck_text,
            config.stage,
            language,
            config.max_prompt_chars,
        )),
    ]
}

/// Build `CompletionOptions` from the analysis config.
fn build_options(config: &AnalysisConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
