//! Error types for the attnscope core library.
//!
//! Uses `thiserror` for public API error types. Analysis failures are kept in
//! their own enum so the HTTP gateway and CLI can turn any of them into the
//! structured `{ success: false, error }` response without inspecting IO or
//! configuration errors.

use std::path::PathBuf;

/// Top-level error type for the attnscope workspace.
#[derive(Debug, thiserror::Error)]
pub enum AttnScopeError {
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while turning a text into attention weights and predictions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("Input text is empty")]
    EmptyInput,

    #[error("Tokenization produced an empty sequence")]
    EmptySequence,

    #[error("Model unavailable: {message}")]
    ModelUnavailable { message: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Inference failed: {message}")]
    Inference { message: String },

    #[error("Unexpected tensor shape: {message}")]
    ShapeMismatch { message: String },
}

impl AnalysisError {
    pub fn model_unavailable(message: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference {
            message: message.into(),
        }
    }

    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            message: message.into(),
        }
    }

    /// Short machine-readable code, used in logs and gateway responses.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::EmptyInput => "EMPTY_INPUT",
            AnalysisError::EmptySequence => "EMPTY_SEQUENCE",
            AnalysisError::ModelUnavailable { .. } => "MODEL_UNAVAILABLE",
            AnalysisError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            AnalysisError::Inference { .. } => "INFERENCE_FAILED",
            AnalysisError::ShapeMismatch { .. } => "SHAPE_MISMATCH",
        }
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `AttnScopeError`.
pub type Result<T> = std::result::Result<T, AttnScopeError>;
