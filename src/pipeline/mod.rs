//! Pipeline stages for deck analysis.
//!
//! Each submodule implements exactly one step, so each can be tested alone.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ quality ──▶ llm ──▶ postprocess ──▶ normalize ──▶ render
//! (path/URL) (pdfium)   (tier+hint)  (model)  (parse JSON)    (coerce)      (Markdown)
//! ```
//!
//! 1. [`input`]: load the deck bytes; size ceiling, `%PDF` magic, sha256
//! 2. [`extract`]: text layer of every page; page-count ceiling
//! 3. [`quality`]: density tier and Korean language hint (pure)
//! 4. [`llm`]: model call with retry/backoff and per-call timeout
//! 5. [`postprocess`]: recover JSON from the reply; apply output limits
//! 6. [`normalize`]: map any reply onto the canonical shape (pure, total)
//! 7. [`render`]: Markdown report for humans

pub mod extract;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod postprocess;
pub mod quality;
pub mod render;
