//! The seam between the analysis core and the surfaces that call it.
//!
//! The gateway and the CLI only ever see an `Arc<dyn Analyzer>`; the model
//! backed implementation lives in `attnscope-ml`.

use crate::error::AnalysisError;
use crate::types::{AggregationMode, AnalysisResult};

/// Turns a text into tokens, per-token attention weights, and ranked predictions.
///
/// Implementations are blocking: async callers should go through
/// `tokio::task::spawn_blocking`.
pub trait Analyzer: Send + Sync {
    /// Analyze a single text with the given aggregation mode.
    fn analyze(&self, text: &str, mode: AggregationMode) -> Result<AnalysisResult, AnalysisError>;

    /// Mode used when a caller does not pick one.
    fn default_mode(&self) -> AggregationMode {
        AggregationMode::default()
    }

    /// Whether the underlying model has already been loaded.
    fn is_loaded(&self) -> bool;
}

/// Reject empty or whitespace-only input before anything touches the model.
pub fn validate_input(text: &str) -> Result<&str, AnalysisError> {
    if text.trim().is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    Ok(text)
}
