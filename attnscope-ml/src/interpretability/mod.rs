//! Interpretability: turning raw attention and logits into per-token
//! weights and ranked next-token candidates.

pub mod attention;
pub mod prediction;

pub use attention::{AttentionTensor, aggregate};
pub use prediction::{RankedId, rank, rank_logits, softmax};
