//! Attention extraction and aggregation.
//!
//! A captured attention pattern is a dense `[batch, heads, query, key]`
//! tensor of post-softmax weights. [`aggregate`] collapses the heads of the
//! single batch entry into one weight per input token.

use attnscope_core::{AggregationMode, AnalysisError};
use candle_core::{DType, Tensor};

/// Post-softmax attention weights of one layer, row-major
/// `[batch, heads, query, key]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttentionTensor {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl AttentionTensor {
    /// Wrap raw weights, checking that `data` fills `shape` exactly.
    pub fn new(shape: [usize; 4], data: Vec<f32>) -> Result<Self, AnalysisError> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(AnalysisError::shape_mismatch(format!(
                "attention shape {shape:?} needs {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Copy a `[batch, heads, query, key]` candle tensor to host memory.
    pub fn from_candle(tensor: &Tensor) -> candle_core::Result<Self> {
        let (b, h, q, k) = tensor.dims4()?;
        let data = tensor.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
        Ok(Self {
            shape: [b, h, q, k],
            data,
        })
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn num_heads(&self) -> usize {
        self.shape[1]
    }

    pub fn seq_len(&self) -> usize {
        self.shape[3]
    }

    /// Weight that `query` assigns to `key` in `head` of batch entry `batch`.
    pub fn get(&self, batch: usize, head: usize, query: usize, key: usize) -> Option<f32> {
        let [b, h, q, k] = self.shape;
        if batch >= b || head >= h || query >= q || key >= k {
            return None;
        }
        self.data.get(((batch * h + head) * q + query) * k + key).copied()
    }

    fn check_square(&self) -> Result<(usize, usize), AnalysisError> {
        let [batch, heads, queries, keys] = self.shape;
        if heads == 0 || queries == 0 || keys == 0 {
            return Err(AnalysisError::EmptySequence);
        }
        if batch != 1 {
            return Err(AnalysisError::shape_mismatch(format!(
                "expected a single batch entry, got {batch}"
            )));
        }
        if queries != keys {
            return Err(AnalysisError::shape_mismatch(format!(
                "attention is not square: {queries} queries, {keys} keys"
            )));
        }
        Ok((heads, keys))
    }

    /// Mean over heads of batch entry 0, row-major `[query, key]`.
    ///
    /// Heads are summed in index order before dividing, so repeated calls
    /// on the same tensor produce bit-identical output.
    fn head_mean(&self, heads: usize, seq: usize) -> Vec<f32> {
        let plane = seq * seq;
        let mut mean = vec![0.0f32; plane];
        for head in self.data.chunks_exact(plane).take(heads) {
            for (acc, &w) in mean.iter_mut().zip(head) {
                *acc += w;
            }
        }
        let scale = heads as f32;
        mean.iter_mut().for_each(|v| *v /= scale);
        mean
    }
}

/// Collapse one layer's attention into one weight per token.
///
/// - [`AggregationMode::LastTokenDistribution`]: the head-averaged row of the
///   last query position, unscaled.
/// - [`AggregationMode::ColumnSumNormalized`]: head-averaged column sums,
///   min-max scaled into `[0, 1]`. All weights are 0 when every column sum
///   is equal.
pub fn aggregate(
    tensor: &AttentionTensor,
    mode: AggregationMode,
) -> Result<Vec<f32>, AnalysisError> {
    let (heads, seq) = tensor.check_square()?;
    let mean = tensor.head_mean(heads, seq);

    let weights = match mode {
        AggregationMode::LastTokenDistribution => mean[(seq - 1) * seq..].to_vec(),
        AggregationMode::ColumnSumNormalized => {
            let sums = mean.chunks_exact(seq).fold(vec![0.0f32; seq], |mut acc, row| {
                for (a, &w) in acc.iter_mut().zip(row) {
                    *a += w;
                }
                acc
            });
            min_max_scale(sums)
        }
    };

    tracing::debug!(
        heads,
        seq_len = seq,
        mode = %mode,
        "Aggregated attention"
    );
    Ok(weights)
}

fn min_max_scale(values: Vec<f32>) -> Vec<f32> {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if range <= 0.0 || !range.is_finite() {
        tracing::debug!(min, max, "Degenerate column sums, all weights set to 0");
        return vec![0.0; values.len()];
    }
    values.into_iter().map(|v| (v - min) / range).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use pretty_assertions::assert_eq;

    /// Two heads over three tokens, causal.
    fn causal_two_heads() -> AttentionTensor {
        #[rustfmt::skip]
        let data = vec![
            // head 0
            1.0, 0.0, 0.0,
            0.5, 0.5, 0.0,
            0.2, 0.3, 0.5,
            // head 1
            1.0, 0.0, 0.0,
            0.9, 0.1, 0.0,
            0.6, 0.3, 0.1,
        ];
        AttentionTensor::new([1, 2, 3, 3], data).unwrap()
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_last_token_distribution() {
        let w = aggregate(&causal_two_heads(), AggregationMode::LastTokenDistribution).unwrap();
        assert_close(&w, &[0.4, 0.3, 0.3]);
        let sum: f32 = w.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_column_sum_normalized() {
        // mean rows: [1,0,0] [0.7,0.3,0] [0.4,0.3,0.3] -> sums [2.1, 0.6, 0.3]
        let w = aggregate(&causal_two_heads(), AggregationMode::ColumnSumNormalized).unwrap();
        assert_close(&w, &[1.0, 0.3 / 1.8, 0.0]);
    }

    #[test]
    fn test_single_token() {
        let t = AttentionTensor::new([1, 4, 1, 1], vec![1.0; 4]).unwrap();
        assert_eq!(
            aggregate(&t, AggregationMode::LastTokenDistribution).unwrap(),
            vec![1.0]
        );
        // One column sum is trivially both min and max.
        assert_eq!(
            aggregate(&t, AggregationMode::ColumnSumNormalized).unwrap(),
            vec![0.0]
        );
    }

    #[test]
    fn test_degenerate_column_sums() {
        let t = AttentionTensor::new([1, 1, 2, 2], vec![0.5, 0.5, 0.5, 0.5]).unwrap();
        assert_eq!(
            aggregate(&t, AggregationMode::ColumnSumNormalized).unwrap(),
            vec![0.0, 0.0]
        );
    }

    #[test]
    fn test_empty_tensor() {
        let no_heads = AttentionTensor::new([1, 0, 3, 3], vec![]).unwrap();
        assert_eq!(
            aggregate(&no_heads, AggregationMode::LastTokenDistribution),
            Err(AnalysisError::EmptySequence)
        );
        let no_tokens = AttentionTensor::new([1, 2, 0, 0], vec![]).unwrap();
        assert_eq!(
            aggregate(&no_tokens, AggregationMode::ColumnSumNormalized),
            Err(AnalysisError::EmptySequence)
        );
    }

    #[test]
    fn test_shape_mismatch() {
        assert!(matches!(
            AttentionTensor::new([1, 1, 2, 2], vec![1.0; 3]),
            Err(AnalysisError::ShapeMismatch { .. })
        ));
        let batched = AttentionTensor::new([2, 1, 1, 1], vec![1.0; 2]).unwrap();
        assert!(matches!(
            aggregate(&batched, AggregationMode::LastTokenDistribution),
            Err(AnalysisError::ShapeMismatch { .. })
        ));
        let rect = AttentionTensor::new([1, 1, 1, 2], vec![0.5; 2]).unwrap();
        assert!(matches!(
            aggregate(&rect, AggregationMode::LastTokenDistribution),
            Err(AnalysisError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_idempotent() {
        let t = causal_two_heads();
        for mode in [
            AggregationMode::LastTokenDistribution,
            AggregationMode::ColumnSumNormalized,
        ] {
            let a = aggregate(&t, mode).unwrap();
            let b = aggregate(&t, mode).unwrap();
            assert_eq!(
                a.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
                b.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_get_and_from_candle() {
        let t = causal_two_heads();
        let tensor = Tensor::from_vec(t.data.clone(), (1, 2, 3, 3), &Device::Cpu).unwrap();
        let copied = AttentionTensor::from_candle(&tensor).unwrap();
        assert_eq!(copied, t);
        assert_eq!(copied.get(0, 1, 2, 0), Some(0.6));
        assert_eq!(copied.get(0, 2, 0, 0), None);
        assert_eq!(copied.num_heads(), 2);
        assert_eq!(copied.seq_len(), 3);
    }
}
