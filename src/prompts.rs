//! Prompts for the deck analysis call.
//!
//! Every prompt lives here so a wording change touches one file and unit
//! tests can inspect prompts without a model. Callers can replace the system
//! prompt via [`crate::config::AnalysisConfig::system_prompt`]; the user
//! prompt is always built by [`analysis_user_prompt`].

use crate::config::{Language, Stage};
use crate::output::StandardTag;

/// Default system prompt for the analysis call.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are DeckGuard, an expert pitch deck communication risk analyzer. Your job is to identify friction points that may cause investors to drop off early when reviewing a pitch deck.

You must analyze the deck and provide:
1. A verdict: GO (ready to send), HOLD (needs review), or NO_GO (high risk)
2. A confidence level: low, medium, or high
3. A one-line rationale
4. Tags from EXACTLY these 8 options: Stage_Mismatch, TAM_Logic_Weak, Problem_Solution_Gap, Moat_Weak, Traction_Too_Soft, Unit_Economics_Missing, BM_Unclear, Ask_Unclear
5. Up to 3 friction points with severity
6. Up to 2 likely investor questions
7. Defense prompts to help founders respond

IMPORTANT:
- Use ONLY the 8 standard tags listed above
- Maximum 3 friction points
- Maximum 2 likely questions
- Be specific and actionable in your feedback"#;

/// JSON shape the model is asked to answer with.
const RESPONSE_TEMPLATE: &str = r#"{
  "verdict": "GO" | "HOLD" | "NO_GO",
  "confidence": "low" | "medium" | "high",
  "rationale": "one line summary",
  "tags": ["Tag1", "Tag2"],
  "friction_points": [
    {
      "title": "Issue title",
      "description": "Detailed description",
      "severity": "high" | "medium" | "low",
      "tag": "One of the 8 standard tags"
    }
  ],
  "likely_questions": [
    {
      "question": "Investor question",
      "context": "Why they might ask this"
    }
  ],
  "defense_prompts": [
    {
      "question": "Potential challenge",
      "suggested_response": "How to respond"
    }
  ]
}"#;

/// Instruction that pins the response language.
pub fn language_instruction(language: Language) -> &'static str {
    match language {
        Language::Kr => "Respond in Korean (한국어로 답변하세요).",
        Language::En => "Respond in English.",
    }
}

/// Build the user message for one deck.
///
/// `deck_text` is cut to `max_chars` characters so a long deck cannot blow
/// the context window. The allowed tags are repeated here so they reach the
/// model even when the system prompt has been replaced.
pub fn analysis_user_prompt(
    deck_text: &str,
    stage: Stage,
    language: Language,
    max_chars: usize,
) -> String {
    format!(
        "Analyze this pitch deck for a {stage} startup.\n\n\
         {lang}\n\n\
         Pitch Deck Content:\n\
         {content}\n\n\
         Allowed tags: {tags}\n\n\
         Respond with valid JSON in this exact format:\n\
         {template}",
        stage = stage.context(),
        lang = language_instruction(language),
        content = truncate_chars(deck_text, max_chars),
        tags = standard_tag_list(),
        template = RESPONSE_TEMPLATE,
    )
}

/// The allowed tags as a comma-separated list.
pub fn standard_tag_list() -> String {
    StandardTag::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_lists_every_standard_tag() {
        for tag in StandardTag::ALL {
            assert!(
                DEFAULT_SYSTEM_PROMPT.contains(tag.as_str()),
                "missing tag {tag}"
            );
        }
        assert!(DEFAULT_SYSTEM_PROMPT.contains(&standard_tag_list()));
    }

    #[test]
    fn user_prompt_carries_stage_and_language() {
        let prompt = analysis_user_prompt("Our deck", Stage::SeriesA, Language::Kr, 100);
        assert!(prompt.contains("Series A stage (proven growth, scaling)"));
        assert!(prompt.contains("Respond in Korean"));
        assert!(prompt.contains("Our deck"));
        assert!(prompt.contains("\"suggested_response\""));
        assert!(prompt.contains(&format!("Allowed tags: {}", standard_tag_list())));
    }

    #[test]
    fn user_prompt_truncates_deck_text() {
        let text = format!("{}TAIL", "x".repeat(50));
        let prompt = analysis_user_prompt(&text, Stage::Seed, Language::En, 50);
        assert!(!prompt.contains("TAIL"));
        assert!(prompt.contains(&"x".repeat(50)));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("한국어 deck", 3), "한국어");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
