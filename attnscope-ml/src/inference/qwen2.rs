//! Qwen2 decoder in candle, with eager attention so every layer's
//! post-softmax weights can be returned alongside the logits.

use std::path::Path;

use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{
    Embedding, Linear, Module, RmsNorm, VarBuilder, embedding, linear, linear_no_bias, rms_norm,
};
use serde::Deserialize;
use tracing::info;

use super::{ForwardOutput, LanguageModel};
use crate::error::ModelError;
use crate::interpretability::AttentionTensor;

type Result<T> = candle_core::Result<T>;

/// The subset of a Hugging Face `config.json` the decoder needs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Qwen2Config {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub intermediate_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub num_key_value_heads: usize,
    #[serde(default = "default_rope_theta")]
    pub rope_theta: f64,
    #[serde(default = "default_rms_norm_eps")]
    pub rms_norm_eps: f64,
    #[serde(default)]
    pub tie_word_embeddings: bool,
}

fn default_rope_theta() -> f64 {
    1_000_000.0
}

fn default_rms_norm_eps() -> f64 {
    1e-6
}

impl Qwen2Config {
    pub fn from_file(path: &Path) -> std::result::Result<Self, ModelError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn head_dim(&self) -> usize {
        self.hidden_size / self.num_attention_heads
    }

    pub fn validate(&self) -> std::result::Result<(), ModelError> {
        if self.num_attention_heads == 0 || self.num_key_value_heads == 0 {
            return Err(ModelError::load("attention head counts must be positive"));
        }
        if self.hidden_size % self.num_attention_heads != 0 {
            return Err(ModelError::load(format!(
                "hidden_size {} is not divisible by num_attention_heads {}",
                self.hidden_size, self.num_attention_heads
            )));
        }
        if self.num_attention_heads % self.num_key_value_heads != 0 {
            return Err(ModelError::load(format!(
                "num_attention_heads {} is not a multiple of num_key_value_heads {}",
                self.num_attention_heads, self.num_key_value_heads
            )));
        }
        if self.head_dim() % 2 != 0 {
            return Err(ModelError::load("rotary embeddings need an even head_dim"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rotary Embedding
// ---------------------------------------------------------------------------

struct RotaryEmbedding {
    inv_freq: Vec<f32>,
}

impl RotaryEmbedding {
    fn new(head_dim: usize, rope_theta: f64) -> Self {
        let inv_freq = (0..head_dim)
            .step_by(2)
            .map(|i| 1.0f32 / (rope_theta.powf(i as f64 / head_dim as f64) as f32))
            .collect();
        Self { inv_freq }
    }

    /// `(cos, sin)` tables of shape `[seq_len, head_dim / 2]`.
    fn tables(&self, seq_len: usize, device: &Device, dtype: DType) -> Result<(Tensor, Tensor)> {
        let inv_freq = Tensor::from_slice(&self.inv_freq, (1, self.inv_freq.len()), device)?;
        let t = Tensor::arange(0u32, seq_len as u32, device)?
            .to_dtype(DType::F32)?
            .reshape((seq_len, 1))?;
        let freqs = t.matmul(&inv_freq)?;
        Ok((freqs.cos()?.to_dtype(dtype)?, freqs.sin()?.to_dtype(dtype)?))
    }
}

// ---------------------------------------------------------------------------
// Attention
// ---------------------------------------------------------------------------

struct Attention {
    q_proj: Linear,
    k_proj: Linear,
    v_proj: Linear,
    o_proj: Linear,
    num_heads: usize,
    num_kv_heads: usize,
    n_rep: usize,
    head_dim: usize,
    scale: f64,
}

impl Attention {
    fn load(vb: VarBuilder, config: &Qwen2Config) -> Result<Self> {
        let num_heads = config.num_attention_heads;
        let num_kv_heads = config.num_key_value_heads;
        let head_dim = config.head_dim();
        let hidden_size = config.hidden_size;

        Ok(Self {
            q_proj: linear(hidden_size, num_heads * head_dim, vb.pp("q_proj"))?,
            k_proj: linear(hidden_size, num_kv_heads * head_dim, vb.pp("k_proj"))?,
            v_proj: linear(hidden_size, num_kv_heads * head_dim, vb.pp("v_proj"))?,
            o_proj: linear_no_bias(num_heads * head_dim, hidden_size, vb.pp("o_proj"))?,
            num_heads,
            num_kv_heads,
            n_rep: num_heads / num_kv_heads,
            head_dim,
            scale: 1.0 / (head_dim as f64).sqrt(),
        })
    }

    /// Returns the projected output and the `[batch, heads, seq, seq]`
    /// attention weights in `f32`.
    fn forward(
        &self,
        x: &Tensor,
        cos: &Tensor,
        sin: &Tensor,
        mask: Option<&Tensor>,
    ) -> Result<(Tensor, Tensor)> {
        let (b_sz, seq_len, _) = x.dims3()?;

        let q = self
            .q_proj
            .forward(x)?
            .reshape((b_sz, seq_len, self.num_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()?;
        let k = self
            .k_proj
            .forward(x)?
            .reshape((b_sz, seq_len, self.num_kv_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()?;
        let v = self
            .v_proj
            .forward(x)?
            .reshape((b_sz, seq_len, self.num_kv_heads, self.head_dim))?
            .transpose(1, 2)?;

        let q = candle_nn::rotary_emb::rope(&q, cos, sin)?;
        let k = candle_nn::rotary_emb::rope(&k, cos, sin)?;

        // GQA: expand KV heads
        let k = repeat_kv(k, self.n_rep)?.contiguous()?;
        let v = repeat_kv(v, self.n_rep)?.contiguous()?;

        // Scores and softmax in f32 regardless of weight dtype.
        let scores = (q.matmul(&k.t()?)? * self.scale)?.to_dtype(DType::F32)?;
        let scores = match mask {
            Some(mask) => scores.broadcast_add(mask)?,
            None => scores,
        };
        let attn_weights = candle_nn::ops::softmax_last_dim(&scores)?;

        let attn_output = attn_weights.to_dtype(v.dtype())?.matmul(&v)?;
        let attn_output = attn_output
            .transpose(1, 2)?
            .reshape((b_sz, seq_len, ()))?;

        Ok((self.o_proj.forward(&attn_output)?, attn_weights))
    }
}

/// Expand KV heads for GQA.
fn repeat_kv(x: Tensor, n_rep: usize) -> Result<Tensor> {
    if n_rep == 1 {
        return Ok(x);
    }
    let (b, num_kv_heads, seq_len, head_dim) = x.dims4()?;
    x.unsqueeze(2)?
        .expand((b, num_kv_heads, n_rep, seq_len, head_dim))?
        .reshape((b, num_kv_heads * n_rep, seq_len, head_dim))
}

/// Additive causal mask, `[1, 1, seq, seq]` in `f32`.
fn causal_mask(seq_len: usize, device: &Device) -> Result<Tensor> {
    let mask: Vec<f32> = (0..seq_len)
        .flat_map(|i| (0..seq_len).map(move |j| if j > i { f32::NEG_INFINITY } else { 0.0 }))
        .collect();
    Tensor::from_vec(mask, (1, 1, seq_len, seq_len), device)
}

// ---------------------------------------------------------------------------
// MLP (SiLU-gated)
// ---------------------------------------------------------------------------

struct Mlp {
    gate_proj: Linear,
    up_proj: Linear,
    down_proj: Linear,
}

impl Mlp {
    fn load(vb: VarBuilder, config: &Qwen2Config) -> Result<Self> {
        let (hidden, inter) = (config.hidden_size, config.intermediate_size);
        Ok(Self {
            gate_proj: linear_no_bias(hidden, inter, vb.pp("gate_proj"))?,
            up_proj: linear_no_bias(hidden, inter, vb.pp("up_proj"))?,
            down_proj: linear_no_bias(inter, hidden, vb.pp("down_proj"))?,
        })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let gate = self.gate_proj.forward(x)?.silu()?;
        let up = self.up_proj.forward(x)?;
        self.down_proj.forward(&(gate * up)?)
    }
}

// ---------------------------------------------------------------------------
// Decoder layer
// ---------------------------------------------------------------------------

struct DecoderLayer {
    self_attn: Attention,
    mlp: Mlp,
    input_layernorm: RmsNorm,
    post_attention_layernorm: RmsNorm,
}

impl DecoderLayer {
    fn load(vb: VarBuilder, config: &Qwen2Config) -> Result<Self> {
        Ok(Self {
            self_attn: Attention::load(vb.pp("self_attn"), config)?,
            mlp: Mlp::load(vb.pp("mlp"), config)?,
            input_layernorm: rms_norm(
                config.hidden_size,
                config.rms_norm_eps,
                vb.pp("input_layernorm"),
            )?,
            post_attention_layernorm: rms_norm(
                config.hidden_size,
                config.rms_norm_eps,
                vb.pp("post_attention_layernorm"),
            )?,
        })
    }

    fn forward(
        &self,
        x: &Tensor,
        cos: &Tensor,
        sin: &Tensor,
        mask: Option<&Tensor>,
    ) -> Result<(Tensor, Tensor)> {
        let h = self.input_layernorm.forward(x)?;
        let (h, attn) = self.self_attn.forward(&h, cos, sin, mask)?;
        let x = (x + h)?;
        let h = self.mlp.forward(&self.post_attention_layernorm.forward(&x)?)?;
        Ok(((x + h)?, attn))
    }
}

// ---------------------------------------------------------------------------
// Qwen2Model
// ---------------------------------------------------------------------------

/// Qwen2 causal LM returning per-layer attention with the final logits.
pub struct Qwen2Model {
    embed_tokens: Embedding,
    layers: Vec<DecoderLayer>,
    norm: RmsNorm,
    lm_head: Linear,
    rotary: RotaryEmbedding,
    config: Qwen2Config,
    device: Device,
    dtype: DType,
}

impl std::fmt::Debug for Qwen2Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Qwen2Model")
            .field("config", &self.config)
            .field("device", &self.device)
            .field("dtype", &self.dtype)
            .finish()
    }
}

impl Qwen2Model {
    /// Build the model from weights laid out under `model.*` (and `lm_head`
    /// when embeddings are not tied).
    pub fn load(vb: VarBuilder, config: Qwen2Config) -> Result<Self> {
        let device = vb.device().clone();
        let dtype = vb.dtype();
        let vb_model = vb.pp("model");

        let embed_tokens = embedding(
            config.vocab_size,
            config.hidden_size,
            vb_model.pp("embed_tokens"),
        )?;

        let mut layers = Vec::with_capacity(config.num_hidden_layers);
        for i in 0..config.num_hidden_layers {
            layers.push(DecoderLayer::load(vb_model.pp(format!("layers.{i}")), &config)?);
        }

        let norm = rms_norm(config.hidden_size, config.rms_norm_eps, vb_model.pp("norm"))?;

        let lm_head = if config.tie_word_embeddings {
            Linear::new(embed_tokens.embeddings().clone(), None)
        } else {
            linear_no_bias(config.hidden_size, config.vocab_size, vb.pp("lm_head"))?
        };

        let rotary = RotaryEmbedding::new(config.head_dim(), config.rope_theta);

        info!(
            layers = config.num_hidden_layers,
            hidden = config.hidden_size,
            heads = config.num_attention_heads,
            kv_heads = config.num_key_value_heads,
            vocab = config.vocab_size,
            tied = config.tie_word_embeddings,
            "Qwen2 model built"
        );

        Ok(Self {
            embed_tokens,
            layers,
            norm,
            lm_head,
            rotary,
            config,
            device,
            dtype,
        })
    }

    pub fn config(&self) -> &Qwen2Config {
        &self.config
    }

    /// Run the full prompt once. Returns the final-position logits
    /// (`[vocab]`, `f32`) and one `[1, heads, seq, seq]` attention tensor per
    /// layer.
    pub fn forward_with_attention(&self, input_ids: &[u32]) -> Result<(Tensor, Vec<Tensor>)> {
        let seq_len = input_ids.len();
        if seq_len == 0 {
            return Err(candle_core::Error::Msg("empty input sequence".into()));
        }

        let input = Tensor::new(input_ids, &self.device)?.unsqueeze(0)?;
        let mut hidden = self.embed_tokens.forward(&input)?;
        let (cos, sin) = self.rotary.tables(seq_len, &self.device, self.dtype)?;
        let mask = if seq_len > 1 {
            Some(causal_mask(seq_len, &self.device)?)
        } else {
            None
        };

        let mut attentions = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let (next, attn) = layer.forward(&hidden, &cos, &sin, mask.as_ref())?;
            hidden = next;
            attentions.push(attn);
        }

        let hidden = self.norm.forward(&hidden)?;
        let last = hidden.i((.., seq_len - 1, ..))?;
        let logits = self
            .lm_head
            .forward(&last)?
            .squeeze(0)?
            .to_dtype(DType::F32)?;
        Ok((logits, attentions))
    }
}

impl LanguageModel for Qwen2Model {
    fn forward(&self, input_ids: &[u32]) -> std::result::Result<ForwardOutput, ModelError> {
        if input_ids.is_empty() {
            return Err(ModelError::forward("empty input sequence"));
        }
        let (logits, attentions) = self.forward_with_attention(input_ids)?;
        let attentions = attentions
            .iter()
            .map(AttentionTensor::from_candle)
            .collect::<Result<Vec<_>>>()?;
        Ok(ForwardOutput {
            attentions,
            logits: logits.to_vec1::<f32>()?,
        })
    }

    fn vocab_size(&self) -> usize {
        self.config.vocab_size
    }

    fn num_layers(&self) -> usize {
        self.config.num_hidden_layers
    }
}
