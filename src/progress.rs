//! Progress-callback trait for per-stage analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to hear about
//! each stage as a deck moves through the pipeline. The host decides what to
//! do with the events: a spinner, a log line, a websocket push.
//!
//! # Example
//!
//! ```rust
//! use deckguard::{AnalysisConfig, AnalysisProgressCallback, PipelineStage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct StageCounter {
//!     seen: AtomicUsize,
//! }
//!
//! impl AnalysisProgressCallback for StageCounter {
//!     fn on_stage(&self, deck: &str, stage: PipelineStage) {
//!         self.seen.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{deck}: {}", stage.describe());
//!     }
//! }
//!
//! let config = AnalysisConfig::builder()
//!     .progress_callback(Arc::new(StageCounter { seen: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// The pipeline step a deck has just entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Loading,
    Extracting,
    Analyzing,
    Normalizing,
}

impl PipelineStage {
    pub fn describe(self) -> &'static str {
        match self {
            PipelineStage::Loading => "loading deck",
            PipelineStage::Extracting => "extracting text",
            PipelineStage::Analyzing => "waiting for the model",
            PipelineStage::Normalizing => "normalising the answer",
        }
    }
}

/// Called by the pipeline as it processes each deck.
///
/// Implementations must be `Send + Sync`: [`crate::analyze::analyze_batch`]
/// runs several decks at once, so events for different decks may arrive
/// concurrently. All methods default to no-ops.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once per deck when it enters a stage.
    fn on_stage(&self, deck: &str, stage: PipelineStage) {
        let _ = (deck, stage);
    }

    /// Called when the deck has been analysed.
    fn on_deck_complete(&self, deck: &str, verdict: &str) {
        let _ = (deck, verdict);
    }

    /// Called when the deck failed with a fatal error.
    fn on_deck_error(&self, deck: &str, error: &str) {
        let _ = (deck, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
