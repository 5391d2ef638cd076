//! # attnscope Core
//!
//! Core library for attnscope.
//! Provides the shared data model (tokens, weights, candidates), the
//! [`Analyzer`] seam implemented by the model crate, layered configuration,
//! the HTML formatter, and the HTTP gateway.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod gateway;
pub mod render;
pub mod types;

// Re-export commonly used types at the crate root.
pub use analyzer::{Analyzer, validate_input};
pub use config::{
    AnalysisConfig, AttnScopeConfig, DeviceKind, ModelConfig, RenderConfig, ServerConfig,
    WeightDType, config_exists, load_config,
};
pub use error::{AnalysisError, AttnScopeError, ConfigError, Result};
pub use render::Visualization;
pub use types::{AggregationMode, AnalysisResult, Candidate, Prediction, Token, TokenizerInfo};
