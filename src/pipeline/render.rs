//! Markdown rendering of an analysis.
//!
//! The renderer branches on [`Item`] for every list entry, so a bare string
//! and a record both render. Missing record fields get a placeholder rather
//! than dropping the entry. Rendering cannot fail.

use crate::output::{
    AnalysisReport, ConfidenceTier, DefensePrompt, ExtractionResult, FrictionPoint, Item,
    LikelyQuestion, NormalizedAnalysis,
};
use std::fmt::Write;

/// Badge shown for a friction point without a usable severity.
pub const SEVERITY_PLACEHOLDER: &str = "POINT";

/// Question shown above a defense prompt that arrived as a bare string.
pub const DEFENSE_PLACEHOLDER: &str = "Suggested answer";

const UNTITLED: &str = "Untitled";

/// Render a full report: document header, extraction warning, analysis.
pub fn render_report(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# DeckGuard Report: {}\n", report.document.file_name);
    let _ = writeln!(
        out,
        "- Stage: {}\n- Pages: {}\n- Language detected: {}\n- SHA-256: `{}`\n",
        report.stage.as_str(),
        report.document.page_count,
        report.language_detected,
        report.document.file_hash,
    );
    if let Some(warning) = extraction_warning(&report.extraction) {
        let _ = writeln!(out, "> **Warning:** {warning}\n");
    }
    out.push_str(&render_analysis(&report.analysis));
    out
}

/// Warning line for a sparse extraction, if any.
pub fn extraction_warning(extraction: &ExtractionResult) -> Option<String> {
    (extraction.confidence_tier == ConfidenceTier::Low).then(|| {
        format!(
            "little text could be extracted from {} page(s); the deck may be \
             mostly images and this assessment may be unreliable.",
            extraction.page_count
        )
    })
}

/// Render the analysis body as Markdown.
pub fn render_analysis(analysis: &NormalizedAnalysis) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "## Verdict: {} ({})\n\n**{}**\n",
        analysis.verdict.label(),
        analysis.verdict.as_str(),
        analysis.confidence.label(),
    );

    if !analysis.rationale.is_empty() {
        let _ = writeln!(out, "{}\n", analysis.rationale);
    }

    if !analysis.tags.is_empty() {
        let tags: Vec<String> = analysis.tags.iter().map(|t| format!("`{t}`")).collect();
        let _ = writeln!(out, "Tags: {}\n", tags.join(" "));
    }

    if !analysis.friction_points.is_empty() {
        out.push_str("## Friction Points\n\n");
        for item in &analysis.friction_points {
            render_friction_point(&mut out, item);
        }
    }

    if !analysis.likely_questions.is_empty() {
        out.push_str("## Likely Investor Questions\n\n");
        for item in &analysis.likely_questions {
            render_question(&mut out, item);
        }
    }

    if !analysis.defense_prompts.is_empty() {
        out.push_str("## Defense Prompts\n\n");
        for item in &analysis.defense_prompts {
            render_defense_prompt(&mut out, item);
        }
    }

    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out.push('\n');
    out
}

fn render_friction_point(out: &mut String, item: &Item<FrictionPoint>) {
    match item {
        Item::Text(text) => {
            let _ = writeln!(out, "- {text}\n");
        }
        Item::Structured(point) => {
            let badge = point
                .severity
                .map(|s| s.as_str().to_uppercase())
                .unwrap_or_else(|| SEVERITY_PLACEHOLDER.to_string());
            let title = point.title.as_deref().unwrap_or(UNTITLED);
            let _ = writeln!(out, "### {title} `[{badge}]`\n");
            if let Some(desc) = &point.description {
                let _ = writeln!(out, "{desc}\n");
            }
            if let Some(tag) = &point.tag {
                let _ = writeln!(out, "_Tag: {tag}_\n");
            }
        }
    }
}

fn render_question(out: &mut String, item: &Item<LikelyQuestion>) {
    let (question, context) = match item {
        Item::Text(text) => (Some(text.as_str()), None),
        Item::Structured(q) => (q.question.as_deref(), q.context.as_deref()),
    };
    let _ = writeln!(out, "> \u{201c}{}\u{201d}\n", question.unwrap_or(UNTITLED));
    if let Some(context) = context {
        let _ = writeln!(out, "{context}\n");
    }
}

fn render_defense_prompt(out: &mut String, item: &Item<DefensePrompt>) {
    let (question, response) = match item {
        Item::Text(text) => (DEFENSE_PLACEHOLDER, Some(text.as_str())),
        Item::Structured(p) => (
            p.question.as_deref().unwrap_or(DEFENSE_PLACEHOLDER),
            p.suggested_response.as_deref(),
        ),
    };
    let _ = writeln!(out, "**Q:** {question}\n");
    if let Some(response) = response {
        let _ = writeln!(out, "**A:** {response}\n");
    }
}
