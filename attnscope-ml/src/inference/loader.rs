//! Locating model files and building the model and tokenizer from them.
//!
//! Files come either from a local directory or from the Hugging Face Hub
//! cache (downloaded on first use).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use attnscope_core::{DeviceKind, ModelConfig, WeightDType};
use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use hf_hub::api::sync::ApiBuilder;
use hf_hub::{Repo, RepoType};
use serde::Deserialize;
use tracing::{debug, info};

use super::qwen2::{Qwen2Config, Qwen2Model};
use crate::error::ModelError;

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const TOKENIZER_CONFIG_FILE: &str = "tokenizer_config.json";
const SINGLE_WEIGHTS_FILE: &str = "model.safetensors";
const WEIGHTS_INDEX_FILE: &str = "model.safetensors.index.json";

/// Paths of everything needed to build a model and its tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub tokenizer_config: Option<PathBuf>,
    pub weights: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct SafetensorsIndex {
    weight_map: std::collections::HashMap<String, String>,
}

/// Shard file names referenced by a `model.safetensors.index.json`,
/// deduplicated and sorted.
fn shard_names(index_path: &Path) -> Result<Vec<String>, ModelError> {
    let raw = std::fs::read_to_string(index_path)?;
    let index: SafetensorsIndex = serde_json::from_str(&raw)?;
    let names: BTreeSet<String> = index.weight_map.into_values().collect();
    if names.is_empty() {
        return Err(ModelError::load(format!(
            "{} lists no weight shards",
            index_path.display()
        )));
    }
    Ok(names.into_iter().collect())
}

/// Resolve the configured model to files on disk.
pub fn resolve_files(config: &ModelConfig) -> Result<ModelFiles, ModelError> {
    match &config.local_dir {
        Some(dir) => resolve_local(dir),
        None => resolve_hub(&config.model_id, &config.revision),
    }
}

fn require(path: PathBuf) -> Result<PathBuf, ModelError> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(ModelError::load(format!("missing {}", path.display())))
    }
}

fn resolve_local(dir: &Path) -> Result<ModelFiles, ModelError> {
    debug!(dir = %dir.display(), "Resolving model files from local directory");
    let index = dir.join(WEIGHTS_INDEX_FILE);
    let weights = if index.is_file() {
        shard_names(&index)?
            .into_iter()
            .map(|name| require(dir.join(name)))
            .collect::<Result<Vec<_>, _>>()?
    } else if dir.join(SINGLE_WEIGHTS_FILE).is_file() {
        vec![dir.join(SINGLE_WEIGHTS_FILE)]
    } else {
        let mut found: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "safetensors"))
            .collect();
        found.sort();
        if found.is_empty() {
            return Err(ModelError::load(format!(
                "no safetensors weights in {}",
                dir.display()
            )));
        }
        found
    };

    let tokenizer_config = dir.join(TOKENIZER_CONFIG_FILE);
    Ok(ModelFiles {
        config: require(dir.join(CONFIG_FILE))?,
        tokenizer: require(dir.join(TOKENIZER_FILE))?,
        tokenizer_config: tokenizer_config.is_file().then_some(tokenizer_config),
        weights,
    })
}

fn resolve_hub(model_id: &str, revision: &str) -> Result<ModelFiles, ModelError> {
    info!(model_id, revision, "Fetching model files from the Hugging Face Hub");
    let api = ApiBuilder::new()
        .with_progress(false)
        .build()
        .map_err(ModelError::hub)?;
    let repo = api.repo(Repo::with_revision(
        model_id.to_string(),
        RepoType::Model,
        revision.to_string(),
    ));
    let get = |name: &str| {
        repo.get(name)
            .map_err(|e| ModelError::hub(format!("{model_id}/{name}: {e}")))
    };

    let weights = match repo.get(WEIGHTS_INDEX_FILE) {
        Ok(index) => shard_names(&index)?
            .iter()
            .map(|name| get(name.as_str()))
            .collect::<Result<Vec<_>, _>>()?,
        Err(_) => vec![get(SINGLE_WEIGHTS_FILE)?],
    };

    Ok(ModelFiles {
        config: get(CONFIG_FILE)?,
        tokenizer: get(TOKENIZER_FILE)?,
        tokenizer_config: repo.get(TOKENIZER_CONFIG_FILE).ok(),
        weights,
    })
}

pub fn device_for(kind: DeviceKind) -> Result<Device, ModelError> {
    match kind {
        DeviceKind::Cpu => Ok(Device::Cpu),
        DeviceKind::Cuda => Ok(Device::cuda_if_available(0)?),
    }
}

pub fn dtype_for(dtype: WeightDType) -> DType {
    match dtype {
        WeightDType::F32 => DType::F32,
        WeightDType::F16 => DType::F16,
        WeightDType::Bf16 => DType::BF16,
    }
}

/// Build the Qwen2 model from resolved files.
pub fn load_qwen2(
    files: &ModelFiles,
    device: &Device,
    dtype: DType,
) -> Result<Qwen2Model, ModelError> {
    let config = Qwen2Config::from_file(&files.config)?;
    info!(shards = files.weights.len(), ?dtype, "Loading Qwen2 weights");
    // SAFETY: the weight files are memory-mapped read-only and are not
    // modified for the lifetime of the process.
    let vb = unsafe { VarBuilder::from_mmaped_safetensors(&files.weights, dtype, device)? };
    Ok(Qwen2Model::load(vb, config)?)
}
