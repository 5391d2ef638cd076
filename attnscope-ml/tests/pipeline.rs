//! Pipeline tests against in-memory models; no weights are downloaded.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use attnscope_core::{
    AggregationMode, AnalysisConfig, AnalysisError, Analyzer, ModelConfig, TokenizerInfo,
};
use attnscope_ml::{
    AttentionPipeline, AttentionTensor, ForwardOutput, LanguageModel, LoadedModel, ModelError,
    ModelHandle, TextTokenizer, run_analysis,
};
use pretty_assertions::assert_eq;

/// Byte-level tokenizer: one id per byte.
struct ByteTokenizer;

impl TextTokenizer for ByteTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, ModelError> {
        Ok(text.bytes().map(u32::from).collect())
    }

    fn decode_token(&self, id: u32) -> Result<String, ModelError> {
        u8::try_from(id)
            .map(|b| (b as char).to_string())
            .map_err(|_| ModelError::tokenizer(format!("id {id} is not a byte")))
    }

    fn info(&self) -> TokenizerInfo {
        TokenizerInfo {
            model_name: "bytes".into(),
            tokenizer_type: "ByteTokenizer".into(),
            vocab_size: None,
            special_tokens_count: 0,
        }
    }
}

/// Two heads of causal, uniform attention over the prefix.
fn uniform_layer(s: usize) -> Result<AttentionTensor, AnalysisError> {
    let head: Vec<f32> = (0..s)
        .flat_map(|q| (0..s).map(move |k| if k <= q { 1.0 / (q + 1) as f32 } else { 0.0 }))
        .collect();
    AttentionTensor::new([1, 2, s, s], [head.clone(), head].concat())
}

/// Two heads where every query attends only to the first token.
fn first_token_layer(s: usize) -> Result<AttentionTensor, AnalysisError> {
    let head: Vec<f32> = (0..s * s).map(|i| if i % s == 0 { 1.0 } else { 0.0 }).collect();
    AttentionTensor::new([1, 2, s, s], [head.clone(), head].concat())
}

/// Two layers; only the last one attends to the first token. Logits are
/// flat except for a spike on `'!'`.
struct FirstTokenModel;

impl LanguageModel for FirstTokenModel {
    fn forward(&self, input_ids: &[u32]) -> Result<ForwardOutput, ModelError> {
        let s = input_ids.len();
        let attentions = vec![uniform_layer(s), first_token_layer(s)]
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ModelError::forward(e.to_string()))?;
        let mut logits = vec![0.0f32; 256];
        logits[usize::from(b'!')] = 25.0;
        Ok(ForwardOutput { attentions, logits })
    }

    fn vocab_size(&self) -> usize {
        256
    }

    fn num_layers(&self) -> usize {
        2
    }
}

fn loaded() -> LoadedModel {
    LoadedModel::new(Box::new(FirstTokenModel), Box::new(ByteTokenizer))
}

#[test]
fn test_last_layer_drives_weights() {
    let result = run_analysis(&loaded(), "abc", AggregationMode::LastTokenDistribution, 5).unwrap();
    assert_eq!(result.weights, vec![1.0, 0.0, 0.0]);
    assert_eq!(result.tokens.len(), 3);
    assert_eq!(result.tokens[2].text, "c");
    assert_eq!(result.tokens[2].id, u32::from(b'c'));

    let prediction = result.prediction.unwrap();
    assert_eq!(prediction.token, "!");
    assert_eq!(prediction.top_candidates.len(), 5);
    assert_eq!(prediction.top_candidates[1].token_id, 0);
    assert_eq!(result.tokenizer_info.vocab_size_label(), "Unknown");
}

#[test]
fn test_single_token_weight_is_one() {
    let result = run_analysis(&loaded(), "A", AggregationMode::LastTokenDistribution, 1).unwrap();
    assert_eq!(result.weights, vec![1.0]);
}

#[test]
fn test_text_is_not_trimmed() {
    let result = run_analysis(&loaded(), " a ", AggregationMode::LastTokenDistribution, 1).unwrap();
    assert_eq!(result.tokens.len(), 3);
}

#[test]
fn test_empty_input() {
    assert_eq!(
        run_analysis(&loaded(), "", AggregationMode::LastTokenDistribution, 1),
        Err(AnalysisError::EmptyInput)
    );
}

#[test]
fn test_pipeline_as_analyzer() {
    let handle = Arc::new(ModelHandle::preloaded(ModelConfig::default(), loaded()));
    let analysis = AnalysisConfig {
        mode: AggregationMode::ColumnSumNormalized,
        top_k: 3,
        add_special_tokens: true,
    };
    let analyzer: Arc<dyn Analyzer> = Arc::new(AttentionPipeline::new(handle, analysis));
    assert!(analyzer.is_loaded());
    assert_eq!(analyzer.default_mode(), AggregationMode::ColumnSumNormalized);

    let result = analyzer.analyze("hey", analyzer.default_mode()).unwrap();
    assert_eq!(result.weights, vec![1.0, 0.0, 0.0]);
    assert_eq!(result.prediction.unwrap().top_candidates.len(), 3);
}

/// Tokenizer whose post-processing strips everything it produces.
struct SilentTokenizer;

impl TextTokenizer for SilentTokenizer {
    fn encode(&self, _text: &str) -> Result<Vec<u32>, ModelError> {
        Ok(Vec::new())
    }

    fn decode_token(&self, id: u32) -> Result<String, ModelError> {
        Err(ModelError::tokenizer(format!("id {id} is not in the vocabulary")))
    }

    fn info(&self) -> TokenizerInfo {
        TokenizerInfo {
            model_name: "silent".into(),
            tokenizer_type: "SilentTokenizer".into(),
            vocab_size: Some(0),
            special_tokens_count: 0,
        }
    }
}

/// Counts forward passes before delegating to [`FirstTokenModel`].
struct CountingModel {
    calls: Arc<AtomicUsize>,
}

impl LanguageModel for CountingModel {
    fn forward(&self, input_ids: &[u32]) -> Result<ForwardOutput, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        FirstTokenModel.forward(input_ids)
    }

    fn vocab_size(&self) -> usize {
        FirstTokenModel.vocab_size()
    }

    fn num_layers(&self) -> usize {
        FirstTokenModel.num_layers()
    }
}

#[test]
fn test_zero_tokens_is_empty_sequence() {
    let calls = Arc::new(AtomicUsize::new(0));
    let loaded = LoadedModel::new(
        Box::new(CountingModel {
            calls: calls.clone(),
        }),
        Box::new(SilentTokenizer),
    );
    assert_eq!(
        run_analysis(&loaded, "x", AggregationMode::LastTokenDistribution, 1),
        Err(AnalysisError::EmptySequence)
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
