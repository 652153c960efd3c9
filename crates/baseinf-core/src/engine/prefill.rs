use baseinf_abi::backend::{InferenceSession, TextModel};
use baseinf_abi::error::Result;
use baseinf_abi::token::Token;
use tracing::debug;

use super::GenerationDriver;

impl<M: TextModel, S: InferenceSession> GenerationDriver<'_, M, S> {
    /// Pick the first pending batch.
    ///
    /// Decoder-only models start from the whole prompt. Encoder-decoder
    /// models run the encoder over the prompt here and start decoding from
    /// a single decoder-start token (BOS when the model has none).
    pub(super) fn first_batch(&mut self, prompt: &[Token]) -> Result<Vec<Token>> {
        if !self.model.has_encoder() {
            debug!("[prefill] decoder-only model, prompt is the first batch ({} tokens)", prompt.len());
            return Ok(prompt.to_vec());
        }

        debug!("[prefill] encoding prompt ({} tokens)", prompt.len());
        self.session.encode(prompt)?;

        let start = self.model.decoder_seed_token();
        debug!("[prefill] decoding starts from token {start}");
        Ok(vec![start])
    }
}
