//! Request and response bodies for `/visualize`.

use serde::{Deserialize, Serialize};

use crate::config::RenderConfig;
use crate::error::AnalysisError;
use crate::render::Visualization;
use crate::types::{AggregationMode, AnalysisResult, Prediction, Token, TokenizerInfo};

/// Body of `POST /visualize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizeRequest {
    #[serde(default)]
    pub text: String,
    /// Overrides the server's default aggregation mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<AggregationMode>,
}

/// Successful analysis, shaped for the page's script.
#[derive(Debug, Clone, Serialize)]
pub struct VisualizeSuccess {
    pub success: bool,
    pub html: String,
    pub token_count: usize,
    pub tokenizer_info: TokenizerInfo,
    pub token_details_html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
    pub tokens: Vec<Token>,
    pub weights: Vec<f32>,
    pub weight_sum: f32,
    pub mode: AggregationMode,
}

/// Failed analysis.
#[derive(Debug, Clone, Serialize)]
pub struct VisualizeFailure {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum VisualizeResponse {
    Success(Box<VisualizeSuccess>),
    Failure(VisualizeFailure),
}

impl VisualizeResponse {
    pub fn from_result(result: AnalysisResult, render: &RenderConfig) -> Self {
        let viz = Visualization::build(&result, render);
        let html = viz.token_strip_html();
        let token_details_html = viz.token_details_html();
        Self::Success(Box::new(VisualizeSuccess {
            success: true,
            html,
            token_count: result.token_count(),
            weight_sum: viz.weight_check.sum,
            tokenizer_info: result.tokenizer_info,
            token_details_html,
            prediction: result.prediction,
            tokens: result.tokens,
            weights: result.weights,
            mode: result.mode,
        }))
    }

    pub fn from_error(err: &AnalysisError) -> Self {
        Self::Failure(VisualizeFailure {
            success: false,
            error: err.to_string(),
            code: Some(err.code()),
        })
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(VisualizeFailure {
            success: false,
            error: message.into(),
            code: None,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, VisualizeResponse::Success(_))
    }
}
