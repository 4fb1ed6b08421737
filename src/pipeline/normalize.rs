//! Coerce loosely-typed model output into a [`NormalizedAnalysis`].
//!
//! Model output drifts: verdicts come back as `"investable"`, confidence as
//! `0.93`, friction points as bare sentences. The renderer cannot branch on
//! all of that, so this stage maps every input, however malformed, onto the
//! canonical shape. It has no failure mode.
//!
//! Unknown vocabulary falls back to the middle of each scale: `HOLD` for the
//! verdict, `medium` for confidence.
//!
//! Only shape is guaranteed here. List caps and the closed tag set are the
//! model stage's business (see [`super::postprocess::OutputLimits`]).

use crate::output::{
    ConfidenceTier, DefensePrompt, FrictionPoint, Item, LikelyQuestion, NormalizedAnalysis,
    Severity, Verdict,
};
use serde_json::{Map, Value};
use tracing::debug;

/// Normalise a parsed model answer.
///
/// Anything that is not a JSON object is treated as an empty object.
pub fn normalize(raw: &Value) -> NormalizedAnalysis {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    NormalizedAnalysis {
        verdict: normalize_verdict(obj.get("verdict")),
        confidence: normalize_confidence(obj.get("confidence")),
        rationale: obj
            .get("rationale")
            .and_then(scalar_text)
            .unwrap_or_default(),
        tags: normalize_tags(obj.get("tags")),
        friction_points: normalize_list(obj.get("friction_points"), friction_point),
        likely_questions: normalize_list(obj.get("likely_questions"), likely_question),
        defense_prompts: normalize_list(obj.get("defense_prompts"), defense_prompt),
    }
}

/// Parse `raw` as JSON and normalise it.
///
/// Text that is not JSON normalises like an empty object.
pub fn normalize_str(raw: &str) -> NormalizedAnalysis {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => normalize(&value),
        Err(e) => {
            debug!("normalize_str: not JSON ({e}); using defaults");
            NormalizedAnalysis::default()
        }
    }
}

// ── Verdict ──────────────────────────────────────────────────────────────

/// Map a verdict label onto the canonical three values.
pub fn verdict_from_label(label: &str) -> Verdict {
    match label {
        "GO" | "investable" => Verdict::Go,
        "HOLD" | "potential" => Verdict::Hold,
        "NO_GO" | "pass" => Verdict::NoGo,
        _ => Verdict::Hold,
    }
}

fn normalize_verdict(value: Option<&Value>) -> Verdict {
    match value {
        Some(Value::String(label)) => verdict_from_label(label),
        _ => Verdict::Hold,
    }
}

// ── Confidence ───────────────────────────────────────────────────────────

/// Map a model score in `[0, 1]` onto a tier.
pub fn confidence_from_score(score: f64) -> ConfidenceTier {
    if !score.is_finite() {
        ConfidenceTier::Medium
    } else if score >= 0.8 {
        ConfidenceTier::High
    } else if score >= 0.5 {
        ConfidenceTier::Medium
    } else {
        ConfidenceTier::Low
    }
}

/// Map a confidence label onto a tier.
pub fn confidence_from_label(label: &str) -> ConfidenceTier {
    match label {
        "low" => ConfidenceTier::Low,
        "medium" => ConfidenceTier::Medium,
        "high" => ConfidenceTier::High,
        _ => ConfidenceTier::Medium,
    }
}

fn normalize_confidence(value: Option<&Value>) -> ConfidenceTier {
    match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .map(confidence_from_score)
            .unwrap_or(ConfidenceTier::Medium),
        Some(Value::String(label)) => confidence_from_label(label),
        _ => ConfidenceTier::Medium,
    }
}

// ── Lists ────────────────────────────────────────────────────────────────

fn normalize_tags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(single) => scalar_text(single).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Normalise every element of a polymorphic list.
///
/// Strings become [`Item::Text`], objects go through `structured`, other
/// scalars are kept as text and `null` / blank entries are dropped.
fn normalize_list<T>(
    value: Option<&Value>,
    structured: fn(&Map<String, Value>) -> T,
) -> Vec<Item<T>> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(fields) => Some(Item::Structured(structured(fields))),
            other => scalar_text(other).map(Item::Text),
        })
        .collect()
}

fn friction_point(fields: &Map<String, Value>) -> FrictionPoint {
    FrictionPoint {
        title: field(fields, "title"),
        description: field(fields, "description"),
        severity: field(fields, "severity").and_then(|s| severity_from_label(&s)),
        tag: field(fields, "tag"),
    }
}

fn likely_question(fields: &Map<String, Value>) -> LikelyQuestion {
    LikelyQuestion {
        question: field(fields, "question"),
        context: field(fields, "context"),
    }
}

fn defense_prompt(fields: &Map<String, Value>) -> DefensePrompt {
    DefensePrompt {
        question: field(fields, "question"),
        suggested_response: field(fields, "suggested_response"),
    }
}

fn severity_from_label(label: &str) -> Option<Severity> {
    match label.to_ascii_lowercase().as_str() {
        "high" => Some(Severity::High),
        "medium" => Some(Severity::Medium),
        "low" => Some(Severity::Low),
        _ => None,
    }
}

// ── Scalars ──────────────────────────────────────────────────────────────

fn field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(scalar_text)
}

/// Text form of a scalar: trimmed strings, numbers and booleans.
///
/// Blank strings, `null`, arrays and objects yield `None`.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn investable_with_high_score() {
        let out = normalize(&json!({"verdict": "investable", "confidence": 0.95}));
        assert_eq!(out.verdict, Verdict::Go);
        assert_eq!(out.confidence, ConfidenceTier::High);
    }

    #[test]
    fn unknown_vocabulary_falls_back_to_middle() {
        let out = normalize(&json!({"verdict": "unknown_value", "confidence": "weird"}));
        assert_eq!(out.verdict, Verdict::Hold);
        assert_eq!(out.confidence, ConfidenceTier::Medium);
    }

    #[test]
    fn verdict_synonym_table() {
        assert_eq!(verdict_from_label("investable"), Verdict::Go);
        assert_eq!(verdict_from_label("potential"), Verdict::Hold);
        assert_eq!(verdict_from_label("pass"), Verdict::NoGo);
        assert_eq!(verdict_from_label("GO"), Verdict::Go);
        assert_eq!(verdict_from_label("HOLD"), Verdict::Hold);
        assert_eq!(verdict_from_label("NO_GO"), Verdict::NoGo);
        assert_eq!(verdict_from_label("go"), Verdict::Hold);
        assert_eq!(verdict_from_label(""), Verdict::Hold);
    }

    #[test]
    fn non_string_verdicts_default_to_hold() {
        for raw in [json!({"verdict": 1}), json!({"verdict": null}), json!({})] {
            assert_eq!(normalize(&raw).verdict, Verdict::Hold, "raw={raw}");
        }
    }

    #[test]
    fn score_bands() {
        assert_eq!(confidence_from_score(0.8), ConfidenceTier::High);
        assert_eq!(confidence_from_score(0.79), ConfidenceTier::Medium);
        assert_eq!(confidence_from_score(0.5), ConfidenceTier::Medium);
        assert_eq!(confidence_from_score(0.49), ConfidenceTier::Low);
        assert_eq!(confidence_from_score(0.0), ConfidenceTier::Low);
        assert_eq!(confidence_from_score(f64::NAN), ConfidenceTier::Medium);
    }

    #[test]
    fn integer_scores_are_numeric() {
        assert_eq!(normalize(&json!({"confidence": 1})).confidence, ConfidenceTier::High);
        assert_eq!(normalize(&json!({"confidence": 0})).confidence, ConfidenceTier::Low);
    }

    #[test]
    fn confidence_labels_pass_through() {
        for (label, tier) in [
            ("low", ConfidenceTier::Low),
            ("medium", ConfidenceTier::Medium),
            ("high", ConfidenceTier::High),
        ] {
            assert_eq!(normalize(&json!({"confidence": label})).confidence, tier);
        }
        assert_eq!(normalize(&json!({"confidence": "0.9"})).confidence, ConfidenceTier::Medium);
        assert_eq!(normalize(&json!({"confidence": [0.9]})).confidence, ConfidenceTier::Medium);
    }

    #[test]
    fn non_object_input_yields_defaults() {
        for raw in [json!(null), json!([1, 2]), json!("GO"), json!(42)] {
            assert_eq!(normalize(&raw), NormalizedAnalysis::default(), "raw={raw}");
        }
    }

    #[test]
    fn mixed_friction_points_all_survive() {
        let out = normalize(&json!({
            "friction_points": [
                "TAM is a top-down guess",
                {"title": "No moat", "description": "Easy to copy", "severity": "high"},
                {"title": "Unclear ask"},
                {"title": "Odd severity", "severity": "catastrophic"},
                null,
                "   ",
                7
            ]
        }));

        assert_eq!(out.friction_points.len(), 5);
        assert_eq!(out.friction_points[0], Item::Text("TAM is a top-down guess".into()));
        match &out.friction_points[1] {
            Item::Structured(fp) => {
                assert_eq!(fp.title.as_deref(), Some("No moat"));
                assert_eq!(fp.severity, Some(Severity::High));
            }
            other => panic!("expected structured, got {other:?}"),
        }
        match &out.friction_points[2] {
            Item::Structured(fp) => {
                assert!(fp.severity.is_none());
                assert!(fp.description.is_none());
            }
            other => panic!("expected structured, got {other:?}"),
        }
        match &out.friction_points[3] {
            Item::Structured(fp) => assert!(fp.severity.is_none()),
            other => panic!("expected structured, got {other:?}"),
        }
        assert_eq!(out.friction_points[4], Item::Text("7".into()));
    }

    #[test]
    fn questions_and_prompts_accept_both_shapes() {
        let out = normalize(&json!({
            "likely_questions": ["Why now?", {"question": "Who pays?", "context": "BM slide is vague"}],
            "defense_prompts": ["Lead with the pilot revenue", {"question": "CAC?", "suggested_response": "$40 blended"}]
        }));
        assert_eq!(out.likely_questions.len(), 2);
        assert_eq!(out.defense_prompts.len(), 2);
        assert_eq!(out.defense_prompts[0], Item::Text("Lead with the pilot revenue".into()));
        assert_eq!(
            out.defense_prompts[1],
            Item::Structured(DefensePrompt {
                question: Some("CAC?".into()),
                suggested_response: Some("$40 blended".into()),
            })
        );
    }

    #[test]
    fn non_array_lists_become_empty() {
        let out = normalize(&json!({
            "friction_points": "just one string",
            "likely_questions": {"question": "?"},
            "defense_prompts": null
        }));
        assert!(out.friction_points.is_empty());
        assert!(out.likely_questions.is_empty());
        assert!(out.defense_prompts.is_empty());
    }

    #[test]
    fn tags_and_rationale_are_forwarded() {
        let out = normalize(&json!({
            "rationale": "  Strong team, weak unit economics.  ",
            "tags": ["Moat_Weak", " Ask_Unclear ", "", null, "Custom"]
        }));
        assert_eq!(out.rationale, "Strong team, weak unit economics.");
        assert_eq!(out.tags, vec!["Moat_Weak", "Ask_Unclear", "Custom"]);

        let single = normalize(&json!({"tags": "BM_Unclear"}));
        assert_eq!(single.tags, vec!["BM_Unclear"]);
    }

    #[test]
    fn no_caps_are_applied() {
        let points: Vec<String> = (0..6).map(|i| format!("point {i}")).collect();
        let out = normalize(&json!({ "friction_points": points }));
        assert_eq!(out.friction_points.len(), 6);
    }

    #[test]
    fn renormalising_is_a_no_op() {
        let raw = json!({
            "verdict": "pass",
            "confidence": 0.42,
            "rationale": " Too early ",
            "tags": ["Stage_Mismatch", 3],
            "friction_points": [
                "bare",
                {"title": " T ", "severity": "LOW", "tag": "Moat_Weak", "extra": true},
                {"description": 12}
            ],
            "likely_questions": [{"question": "Q"}, false],
            "defense_prompts": [{"suggested_response": "A"}]
        });

        let once = normalize(&raw);
        let twice = normalize(&serde_json::to_value(&once).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_str_tolerates_garbage() {
        assert_eq!(normalize_str("not json at all"), NormalizedAnalysis::default());
        assert_eq!(normalize_str(r#"{"verdict":"GO"}"#).verdict, Verdict::Go);
    }
}
