//! Error types for the attnscope-ml crate.

use attnscope_core::AnalysisError;
use thiserror::Error;

/// Failures raised while loading or running the model and tokenizer.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Model load error: {0}")]
    Load(String),

    #[error("Hub download error: {0}")]
    Hub(String),

    #[error("Forward pass error: {0}")]
    Forward(String),

    #[error("Tensor error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ModelError {
    pub fn tokenizer(msg: impl std::fmt::Display) -> Self {
        Self::Tokenizer(msg.to_string())
    }

    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn hub(msg: impl std::fmt::Display) -> Self {
        Self::Hub(msg.to_string())
    }

    pub fn forward(msg: impl Into<String>) -> Self {
        Self::Forward(msg.into())
    }

    /// Map a failure that happened while loading weights or tokenizer files.
    pub fn into_unavailable(self) -> AnalysisError {
        AnalysisError::model_unavailable(self.to_string())
    }
}

/// Failures during a request are inference failures; load failures are
/// mapped explicitly through [`ModelError::into_unavailable`].
impl From<ModelError> for AnalysisError {
    fn from(err: ModelError) -> Self {
        AnalysisError::inference(err.to_string())
    }
}
