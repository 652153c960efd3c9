use std::path::Path;

use crate::error::Result;
use crate::token::Token;

/// Number of layers to offload when the caller does not say otherwise.
pub const DEFAULT_N_GPU_LAYERS: i32 = 99;

/// Parameters applied when a model is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelParams {
    /// Layers offloaded to an accelerator (0 = CPU only).
    pub n_gpu_layers: i32,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            n_gpu_layers: DEFAULT_N_GPU_LAYERS,
        }
    }
}

/// Sizing of one inference session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionParams {
    /// Context window: prompt length + tokens to predict.
    pub n_ctx: u32,
    /// Largest batch a single decode call accepts (the whole prompt).
    pub n_batch: u32,
}

impl SessionParams {
    /// Size a session so the prompt fits in one batch and the context holds
    /// the prompt plus the whole prediction budget.
    pub fn for_budget(n_prompt: usize, n_predict: usize) -> Self {
        let n_batch = n_prompt.max(1);
        Self {
            n_ctx: saturating_u32(n_prompt.saturating_add(n_predict)).max(1),
            n_batch: saturating_u32(n_batch),
        }
    }
}

fn saturating_u32(v: usize) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

/// Engine-reported performance counters, read after generation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerfCounters {
    pub load_ms: f64,
    pub prompt_eval_ms: f64,
    pub n_prompt_eval: i32,
    pub eval_ms: f64,
    pub n_eval: i32,
    pub sample_ms: f64,
    pub n_sample: i32,
}

/// A loaded model together with its vocabulary.
///
/// The session borrows the model, so a session can never outlive the model
/// it was created from, and it is always released first.
pub trait TextModel {
    type Session<'m>: InferenceSession
    where
        Self: 'm;

    fn load<P: AsRef<Path>>(model_path: P, params: &ModelParams) -> Result<Self>
    where
        Self: Sized;

    /// Tokenize with beginning/end-of-text markers added and special tokens parsed.
    fn tokenize(&self, text: &str) -> Result<Vec<Token>>;

    /// Raw bytes of a token's text. Pieces are not guaranteed to be valid UTF-8
    /// on their own; a multi-byte character may span several tokens.
    fn token_to_piece(&self, token: Token) -> Result<Vec<u8>>;

    /// True for EOS, EOT and any other token that ends generation.
    fn is_end_of_generation(&self, token: Token) -> bool;

    fn has_encoder(&self) -> bool;

    /// Explicit decoder-start token, if the model defines one.
    fn decoder_start_token(&self) -> Option<Token>;

    fn bos_token(&self) -> Token;

    /// Token that seeds decoding after the encoder pass.
    fn decoder_seed_token(&self) -> Token {
        self.decoder_start_token()
            .unwrap_or_else(|| self.bos_token())
    }

    /// Create a context and greedy sampler sized by `params`.
    fn new_session(&self, params: &SessionParams) -> Result<Self::Session<'_>>;
}

/// One context + sampler pair. Dropping it releases the sampler before the context.
pub trait InferenceSession {
    /// Run the encoder over `tokens` (encoder-decoder models only).
    fn encode(&mut self, tokens: &[Token]) -> Result<()>;

    /// Evaluate `tokens`, placing token `i` at position `n_past + i`.
    fn decode(&mut self, tokens: &[Token], n_past: usize) -> Result<()>;

    /// Greedy pick from the logits of the last decoded token.
    fn sample(&mut self) -> Result<Token>;

    /// Performance counters, if the engine keeps them.
    fn perf(&self) -> Option<PerfCounters> {
        None
    }
}
