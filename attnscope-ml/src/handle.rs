//! Process-wide, lazily loaded model and tokenizer.

use std::sync::Arc;
use std::time::Instant;

use attnscope_core::{AnalysisError, ModelConfig};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::error::ModelError;
use crate::inference::loader::{device_for, dtype_for, load_qwen2};
use crate::inference::{LanguageModel, resolve_files};
use crate::tokenizer::{HfTokenizer, TextTokenizer};

/// A model paired with the tokenizer it was trained with.
pub struct LoadedModel {
    pub model: Box<dyn LanguageModel>,
    pub tokenizer: Box<dyn TextTokenizer>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("vocab_size", &self.model.vocab_size())
            .field("layers", &self.model.num_layers())
            .field("tokenizer", &self.tokenizer.info())
            .finish()
    }
}

impl LoadedModel {
    pub fn new(model: Box<dyn LanguageModel>, tokenizer: Box<dyn TextTokenizer>) -> Self {
        Self { model, tokenizer }
    }

    /// Resolve, download if needed, and build the configured Qwen2 model.
    pub fn load(config: &ModelConfig, add_special_tokens: bool) -> Result<Self, ModelError> {
        let files = resolve_files(config)?;
        let model_name = match &config.local_dir {
            Some(dir) => dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| dir.display().to_string()),
            None => config.model_id.clone(),
        };
        let tokenizer = HfTokenizer::from_file(
            &files.tokenizer,
            files.tokenizer_config.as_deref(),
            &model_name,
            add_special_tokens,
        )?;
        let device = device_for(config.device)?;
        let model = load_qwen2(&files, &device, dtype_for(config.dtype))?;
        Ok(Self::new(Box::new(model), Box::new(tokenizer)))
    }
}

/// Loads the model on first use and shares it read-only afterwards.
///
/// A failed load is reported to the caller and attempted again by the next
/// call to [`ModelHandle::get`].
pub struct ModelHandle {
    config: ModelConfig,
    add_special_tokens: bool,
    cell: OnceCell<Arc<LoadedModel>>,
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("config", &self.config)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl ModelHandle {
    pub fn new(config: ModelConfig, add_special_tokens: bool) -> Self {
        Self {
            config,
            add_special_tokens,
            cell: OnceCell::new(),
        }
    }

    /// A handle that is already populated, used with in-memory models.
    pub fn preloaded(config: ModelConfig, loaded: LoadedModel) -> Self {
        Self {
            config,
            add_special_tokens: true,
            cell: OnceCell::with_value(Arc::new(loaded)),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get(&self) -> Result<Arc<LoadedModel>, AnalysisError> {
        self.cell
            .get_or_try_init(|| {
                let started = Instant::now();
                let loaded = LoadedModel::load(&self.config, self.add_special_tokens)
                    .map_err(|e| {
                        warn!(model_id = %self.config.model_id, error = %e, "Model load failed");
                        e.into_unavailable()
                    })?;
                info!(
                    model_id = %self.config.model_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Model loaded"
                );
                Ok(Arc::new(loaded))
            })
            .cloned()
    }
}
