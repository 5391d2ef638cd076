//! Next-token ranking from final-position logits.

use std::cmp::Ordering;

use attnscope_core::{AnalysisError, Candidate};

use crate::tokenizer::TextTokenizer;

/// A vocabulary entry and its softmax probability, before decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedId {
    pub token_id: u32,
    pub probability: f64,
    /// 1-based.
    pub rank: usize,
}

/// Numerically stable softmax, accumulated in `f64`.
///
/// Returns an empty vector for empty input.
pub fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max) as f64;
    let exps: Vec<f64> = logits.iter().map(|&l| (l as f64 - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Descending probability, then ascending vocabulary index.
fn by_probability(a: &(usize, f64), b: &(usize, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

/// The `k` most probable vocabulary ids.
///
/// Ties are ordered by the lower vocabulary index. `k == 0` yields an empty
/// list; `k` larger than the vocabulary is rejected.
pub fn rank_logits(logits: &[f32], k: usize) -> Result<Vec<RankedId>, AnalysisError> {
    if k > logits.len() {
        return Err(AnalysisError::invalid_argument(format!(
            "top_k {k} exceeds vocabulary size {}",
            logits.len()
        )));
    }
    if k == 0 {
        return Ok(Vec::new());
    }
    if logits.iter().any(|l| l.is_nan()) {
        return Err(AnalysisError::inference("logits contain NaN"));
    }
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return Err(AnalysisError::inference(format!(
            "logits have no finite maximum ({max})"
        )));
    }

    let mut indexed: Vec<(usize, f64)> = softmax(logits).into_iter().enumerate().collect();
    if k < indexed.len() {
        indexed.select_nth_unstable_by(k - 1, by_probability);
        indexed.truncate(k);
    }
    indexed.sort_by(by_probability);

    Ok(indexed
        .into_iter()
        .enumerate()
        .map(|(pos, (id, probability))| RankedId {
            token_id: id as u32,
            probability,
            rank: pos + 1,
        })
        .collect())
}

/// Rank the logits and decode each candidate id.
pub fn rank(
    logits: &[f32],
    k: usize,
    tokenizer: &dyn TextTokenizer,
) -> Result<Vec<Candidate>, AnalysisError> {
    Ok(rank_logits(logits, k)?
        .into_iter()
        .map(|r| Candidate {
            token: tokenizer.display_token(r.token_id),
            token_id: r.token_id,
            probability: r.probability,
            rank: r.rank,
        })
        .collect())
}
