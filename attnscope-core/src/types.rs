//! Core type definitions for attnscope.
//!
//! Everything here is created fresh for a single analysis request and dropped
//! once the response has been produced. Nothing is cached across requests.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A single input token: its display text and vocabulary id.
///
/// Sequence position is implicit in the order of the containing `Vec`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub id: u32,
}

impl Token {
    pub fn new(text: impl Into<String>, id: u32) -> Self {
        Self {
            text: text.into(),
            id,
        }
    }
}

/// How the final layer's attention is reduced to one weight per position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Attention row of the last query position, averaged over heads.
    /// Already a probability distribution; never rescaled.
    #[default]
    LastTokenDistribution,
    /// Column sums over every query position, min-max scaled into `[0, 1]`.
    ColumnSumNormalized,
}

impl AggregationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMode::LastTokenDistribution => "last_token_distribution",
            AggregationMode::ColumnSumNormalized => "column_sum_normalized",
        }
    }

    /// Whether the weights produced by this mode are expected to sum to one.
    pub fn sums_to_one(&self) -> bool {
        matches!(self, AggregationMode::LastTokenDistribution)
    }
}

impl std::fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "last_token_distribution" | "last_token" | "last" => {
                Ok(AggregationMode::LastTokenDistribution)
            }
            "column_sum_normalized" | "column_sum" | "column" => {
                Ok(AggregationMode::ColumnSumNormalized)
            }
            other => Err(format!(
                "unknown aggregation mode '{other}' (expected last_token_distribution or column_sum_normalized)"
            )),
        }
    }
}

/// A ranked next-token candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub token: String,
    pub token_id: u32,
    pub probability: f64,
    /// 1-based position in descending probability order.
    pub rank: usize,
}

/// The top prediction plus the full candidate list it was taken from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub token: String,
    pub probability: f64,
    pub token_id: u32,
    pub top_candidates: Vec<Candidate>,
}

impl Prediction {
    /// Build a prediction from ranked candidates. Returns `None` when empty.
    pub fn from_candidates(candidates: Vec<Candidate>) -> Option<Self> {
        let first = candidates.first()?;
        Some(Self {
            token: first.token.clone(),
            probability: first.probability,
            token_id: first.token_id,
            top_candidates: candidates,
        })
    }
}

/// Static descriptive metadata about the tokenizer in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerInfo {
    pub model_name: String,
    pub tokenizer_type: String,
    /// Base vocabulary size; serialized as `"Unknown"` when the tokenizer
    /// does not report one.
    #[serde(with = "vocab_size_serde")]
    pub vocab_size: Option<usize>,
    pub special_tokens_count: usize,
}

impl TokenizerInfo {
    pub fn vocab_size_label(&self) -> String {
        match self.vocab_size {
            Some(size) => size.to_string(),
            None => vocab_size_serde::UNKNOWN.to_string(),
        }
    }
}

mod vocab_size_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub const UNKNOWN: &str = "Unknown";

    pub fn serialize<S: Serializer>(value: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(size) => serializer.serialize_u64(*size as u64),
            None => serializer.serialize_str(UNKNOWN),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(usize),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(size) => Some(size),
            Raw::Text(text) => text.parse().ok(),
        })
    }
}

/// Everything produced for one analyzed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub tokens: Vec<Token>,
    /// One weight per token, aligned by index.
    pub weights: Vec<f32>,
    pub mode: AggregationMode,
    pub tokenizer_info: TokenizerInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
}

impl AnalysisResult {
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn weight_sum(&self) -> f32 {
        self.weights.iter().sum()
    }

    pub fn token_ids(&self) -> Vec<u32> {
        self.tokens.iter().map(|t| t.id).collect()
    }
}
