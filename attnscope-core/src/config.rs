//! Configuration system for attnscope.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/attnscope/config.toml` and/or
//! `.attnscope/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::AggregationMode;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttnScopeConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// Floating point precision the model weights are loaded in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightDType {
    #[default]
    F32,
    F16,
    Bf16,
}

/// Device the forward pass runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Cpu,
    /// First CUDA device when the runtime was built with CUDA support,
    /// otherwise falls back to the CPU.
    Cuda,
}

/// Which model and tokenizer to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Hugging Face repository id.
    pub model_id: String,
    /// Repository revision (branch, tag, or commit).
    pub revision: String,
    /// Directory holding `config.json`, `tokenizer.json`, and safetensors
    /// weights. When set, nothing is downloaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_dir: Option<PathBuf>,
    pub dtype: WeightDType,
    pub device: DeviceKind,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: "Qwen/Qwen2-0.5B-Instruct".to_string(),
            revision: "main".to_string(),
            local_dir: None,
            dtype: WeightDType::F32,
            device: DeviceKind::Cpu,
        }
    }
}

/// How attention and predictions are computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub mode: AggregationMode,
    /// Number of next-token candidates to return.
    pub top_k: usize,
    /// Whether the tokenizer's post-processor may add special tokens.
    pub add_special_tokens: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: AggregationMode::LastTokenDistribution,
            top_k: 10,
            add_special_tokens: true,
        }
    }
}

/// HTTP gateway settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Presentation settings for the HTML formatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Number of cells in each token's progress bar.
    pub bar_width: usize,
    /// Allowed deviation of the weight sum from 1.0 before it is flagged.
    pub sum_tolerance: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            bar_width: 15,
            sum_tolerance: 0.001,
        }
    }
}

impl AttnScopeConfig {
    /// Reject values that would make analysis or rendering meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.model_id.trim().is_empty() && self.model.local_dir.is_none() {
            return Err(ConfigError::Invalid {
                message: "model.model_id must be set when model.local_dir is absent".into(),
            });
        }
        if self.render.bar_width == 0 {
            return Err(ConfigError::Invalid {
                message: "render.bar_width must be greater than zero".into(),
            });
        }
        if self.render.sum_tolerance.is_nan() || self.render.sum_tolerance <= 0.0 {
            return Err(ConfigError::Invalid {
                message: "render.sum_tolerance must be positive".into(),
            });
        }
        Ok(())
    }

    /// Serialize to the TOML layout accepted by [`load_config`].
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "attnscope", "attnscope")
}

/// Path of the workspace-level configuration file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".attnscope").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `ATTNSCOPE_`)
/// 3. Workspace-local config (`.attnscope/config.toml`)
/// 4. User config (`~/.config/attnscope/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&AttnScopeConfig>,
) -> Result<AttnScopeConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(AttnScopeConfig::default()));

    // User-level config
    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (ATTNSCOPE_MODEL__MODEL_ID, ATTNSCOPE_SERVER__PORT, etc.)
    figment = figment.merge(Env::prefixed("ATTNSCOPE_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Check whether any attnscope configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if let Some(dirs) = project_dirs() {
        if dirs.config_dir().join("config.toml").exists() {
            return true;
        }
    }

    if let Some(ws) = workspace {
        if workspace_config_path(ws).exists() {
            return true;
        }
    }

    false
}

/// Write the default configuration to `<workspace>/.attnscope/config.toml`.
///
/// Refuses to overwrite an existing file. Returns the path written.
pub fn write_default_config(workspace: &Path) -> anyhow::Result<PathBuf> {
    let path = workspace_config_path(workspace);
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = AttnScopeConfig::default().to_toml()?;
    std::fs::write(&path, content)?;
    Ok(path)
}

/// Directory for log files, falling back to the current directory.
pub fn log_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."))
}
