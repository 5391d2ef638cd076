//! # attnscope-ml: attention and next-token analysis for causal LMs
//!
//! This crate runs a Qwen2 causal language model in candle, captures the
//! post-softmax attention of every layer, and turns the last layer into one
//! weight per input token. The final-position logits are ranked into the
//! top-K next-token candidates.
//!
//! - [`tokenizer`]: the [`TextTokenizer`] seam and its `tokenizers` adapter
//! - [`inference`]: the [`LanguageModel`] seam, the Qwen2 decoder, and file
//!   resolution through a local directory or the Hugging Face Hub
//! - [`interpretability`]: head averaging, aggregation modes, softmax, top-K
//! - [`handle`]: the lazily loaded, shared model
//! - [`pipeline`]: the [`Analyzer`](attnscope_core::Analyzer) implementation

pub mod error;
pub mod handle;
pub mod inference;
pub mod interpretability;
pub mod pipeline;
pub mod tokenizer;

// Re-exports
pub use error::ModelError;
pub use handle::{LoadedModel, ModelHandle};
pub use inference::{ForwardOutput, LanguageModel, Qwen2Config, Qwen2Model};
pub use interpretability::{AttentionTensor, RankedId, aggregate, rank, rank_logits, softmax};
pub use pipeline::{AttentionPipeline, run_analysis};
pub use tokenizer::{HfTokenizer, TextTokenizer};
