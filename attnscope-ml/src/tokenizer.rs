//! Tokenizer adapter over Hugging Face `tokenizers`.

use std::path::Path;

use attnscope_core::TokenizerInfo;
use tokenizers::Tokenizer;

use crate::error::ModelError;

/// Class name reported when `tokenizer_config.json` is absent or silent.
pub const DEFAULT_TOKENIZER_CLASS: &str = "PreTrainedTokenizerFast";

/// Splits text into vocabulary ids and maps ids back to display text.
pub trait TextTokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<u32>, ModelError>;

    /// Decode a single id without skipping special tokens.
    fn decode_token(&self, id: u32) -> Result<String, ModelError>;

    fn info(&self) -> TokenizerInfo;

    /// Decoded text for display, or `<id>` when the id cannot be decoded.
    fn display_token(&self, id: u32) -> String {
        self.decode_token(id).unwrap_or_else(|e| {
            tracing::debug!(id, error = %e, "Token id could not be decoded");
            format!("<{id}>")
        })
    }
}

/// A `tokenizer.json` tokenizer.
pub struct HfTokenizer {
    inner: Tokenizer,
    info: TokenizerInfo,
    add_special_tokens: bool,
}

impl std::fmt::Debug for HfTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HfTokenizer")
            .field("info", &self.info)
            .field("add_special_tokens", &self.add_special_tokens)
            .finish()
    }
}

impl HfTokenizer {
    /// Load `tokenizer.json`, reading the class name from the sibling
    /// `tokenizer_config.json` when one is given.
    pub fn from_file(
        tokenizer_json: &Path,
        tokenizer_config: Option<&Path>,
        model_name: &str,
        add_special_tokens: bool,
    ) -> Result<Self, ModelError> {
        let inner = Tokenizer::from_file(tokenizer_json).map_err(|e| {
            ModelError::tokenizer(format!("{}: {e}", tokenizer_json.display()))
        })?;
        let class = tokenizer_config
            .and_then(read_tokenizer_class)
            .unwrap_or_else(|| DEFAULT_TOKENIZER_CLASS.to_string());
        Ok(Self::from_tokenizer(inner, class, model_name, add_special_tokens))
    }

    pub fn from_tokenizer(
        inner: Tokenizer,
        tokenizer_type: String,
        model_name: &str,
        add_special_tokens: bool,
    ) -> Self {
        let base_vocab = inner.get_vocab_size(false);
        let special_tokens_count = inner
            .get_added_tokens_decoder()
            .values()
            .filter(|t| t.special)
            .count();
        let info = TokenizerInfo {
            model_name: model_name.to_string(),
            tokenizer_type,
            vocab_size: (base_vocab > 0).then_some(base_vocab),
            special_tokens_count,
        };
        Self {
            inner,
            info,
            add_special_tokens,
        }
    }
}

impl TextTokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, ModelError> {
        let encoding = self
            .inner
            .encode(text, self.add_special_tokens)
            .map_err(ModelError::tokenizer)?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode_token(&self, id: u32) -> Result<String, ModelError> {
        self.inner.decode(&[id], false).map_err(ModelError::tokenizer)
    }

    fn info(&self) -> TokenizerInfo {
        self.info.clone()
    }
}

/// `tokenizer_class` from a `tokenizer_config.json`, if readable.
fn read_tokenizer_class(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let json: serde_json::Value = serde_json::from_str(&raw).ok()?;
    json.get("tokenizer_class")?.as_str().map(str::to_string)
}
