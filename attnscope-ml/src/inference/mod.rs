//! Model inference: the forward-pass seam and its candle implementation.

pub mod loader;
pub mod qwen2;

pub use loader::{ModelFiles, resolve_files};
pub use qwen2::{Qwen2Config, Qwen2Model};

use crate::error::ModelError;
use crate::interpretability::AttentionTensor;

/// Result of one forward pass over a full prompt.
#[derive(Debug, Clone)]
pub struct ForwardOutput {
    /// Post-softmax attention of every layer, first layer first.
    pub attentions: Vec<AttentionTensor>,
    /// Logits at the final position, one per vocabulary entry.
    pub logits: Vec<f32>,
}

impl ForwardOutput {
    pub fn last_layer(&self) -> Option<&AttentionTensor> {
        self.attentions.last()
    }
}

/// A causal language model that exposes its attention weights.
pub trait LanguageModel: Send + Sync {
    fn forward(&self, input_ids: &[u32]) -> Result<ForwardOutput, ModelError>;

    /// Number of logits produced per position.
    fn vocab_size(&self) -> usize;

    fn num_layers(&self) -> usize;
}
