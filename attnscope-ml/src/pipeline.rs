//! End-to-end analysis: text in, tokens with weights and ranked
//! predictions out.

use std::sync::Arc;
use std::time::Instant;

use attnscope_core::{
    AggregationMode, AnalysisConfig, AnalysisError, AnalysisResult, Analyzer, Prediction, Token,
    validate_input,
};
use tracing::{debug, info, info_span};

use crate::handle::{LoadedModel, ModelHandle};
use crate::interpretability::{aggregate, rank};

/// Run one analysis against an already loaded model.
///
/// Order: validate → tokenize → forward → aggregate the last layer → rank →
/// decode. Empty input is rejected before anything is tokenized.
pub fn run_analysis(
    loaded: &LoadedModel,
    text: &str,
    mode: AggregationMode,
    top_k: usize,
) -> Result<AnalysisResult, AnalysisError> {
    let text = validate_input(text)?;
    let started = Instant::now();

    let ids = loaded.tokenizer.encode(text)?;
    if ids.is_empty() {
        return Err(AnalysisError::EmptySequence);
    }
    let tokens: Vec<Token> = ids
        .iter()
        .map(|&id| Token::new(loaded.tokenizer.display_token(id), id))
        .collect();
    debug!(tokens = tokens.len(), "Tokenized input");

    let output = loaded.model.forward(&ids)?;
    let last = output
        .last_layer()
        .ok_or_else(|| AnalysisError::shape_mismatch("model returned no attention layers"))?;
    let weights = aggregate(last, mode)?;
    if weights.len() != tokens.len() {
        return Err(AnalysisError::shape_mismatch(format!(
            "{} weights for {} tokens",
            weights.len(),
            tokens.len()
        )));
    }

    let candidates = rank(&output.logits, top_k, loaded.tokenizer.as_ref())?;

    info!(
        tokens = tokens.len(),
        layers = output.attentions.len(),
        mode = %mode,
        top_k,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Analysis complete"
    );

    Ok(AnalysisResult {
        tokens,
        weights,
        mode,
        tokenizer_info: loaded.tokenizer.info(),
        prediction: Prediction::from_candidates(candidates),
    })
}

/// The [`Analyzer`] backed by a lazily loaded model.
#[derive(Debug)]
pub struct AttentionPipeline {
    handle: Arc<ModelHandle>,
    analysis: AnalysisConfig,
}

impl AttentionPipeline {
    pub fn new(handle: Arc<ModelHandle>, analysis: AnalysisConfig) -> Self {
        Self { handle, analysis }
    }

    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    /// Analyze with an explicit candidate count instead of the configured one.
    pub fn analyze_with(
        &self,
        text: &str,
        mode: AggregationMode,
        top_k: usize,
    ) -> Result<AnalysisResult, AnalysisError> {
        let span = info_span!("analyze", chars = text.chars().count(), mode = %mode);
        let _guard = span.enter();
        // Reject empty input before paying for a model load.
        validate_input(text)?;
        let loaded = self.handle.get()?;
        run_analysis(&loaded, text, mode, top_k)
    }
}

impl Analyzer for AttentionPipeline {
    fn analyze(&self, text: &str, mode: AggregationMode) -> Result<AnalysisResult, AnalysisError> {
        self.analyze_with(text, mode, self.analysis.top_k)
    }

    fn default_mode(&self) -> AggregationMode {
        self.analysis.mode
    }

    fn is_loaded(&self) -> bool {
        self.handle.is_loaded()
    }
}
