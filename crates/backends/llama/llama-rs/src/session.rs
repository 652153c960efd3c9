use baseinf_abi::backend::{InferenceSession, PerfCounters, SessionParams};
use baseinf_abi::error::{EngineError, Result};
use baseinf_abi::token::Token;
use tracing::{debug, trace};

use crate::batch::LlamaBatch;
use crate::context::LlamaContext;
use crate::model::LlamaModel;
use crate::params::LlamaParams;
use crate::sampling::LlamaSampler;

/// Context, batch and greedy sampler for one generation run.
///
/// Fields drop in declaration order: sampler, batch, then context. The
/// model is borrowed, so it always outlives the session.
pub struct LlamaSession<'m> {
    sampler: LlamaSampler,
    batch: LlamaBatch,
    context: LlamaContext<'m>,
}

impl<'m> LlamaSession<'m> {
    pub fn new(model: &'m LlamaModel, params: &SessionParams) -> Result<Self> {
        let llama_params = LlamaParams::for_session(params);
        let context = LlamaContext::new(model, &llama_params)?;
        let sampler = LlamaSampler::greedy()?;
        let batch = LlamaBatch::new(params.n_batch as usize);
        debug!(
            "[session] ready: n_ctx={} n_batch={}",
            context.n_ctx(),
            batch.capacity()
        );
        Ok(Self {
            sampler,
            batch,
            context,
        })
    }

    /// Stage `tokens` at `n_past..`; `false` if they do not fit the batch.
    fn stage(&mut self, tokens: &[Token], n_past: usize) -> bool {
        if tokens.is_empty() {
            return false;
        }
        match self.batch.set_tokens(tokens, n_past) {
            Ok(()) => true,
            Err(full) => {
                debug!("[session] {} tokens exceed batch capacity {}", tokens.len(), full.capacity);
                false
            }
        }
    }
}

impl InferenceSession for LlamaSession<'_> {
    fn encode(&mut self, tokens: &[Token]) -> Result<()> {
        if !self.stage(tokens, 0) {
            return Err(EngineError::Encode(-1));
        }
        trace!("[session] encode {} tokens", tokens.len());
        self.context.encode(&self.batch).map_err(EngineError::Encode)
    }

    fn decode(&mut self, tokens: &[Token], n_past: usize) -> Result<()> {
        let err = |code| EngineError::Decode {
            n_past,
            n_tokens: tokens.len(),
            code,
        };
        if !self.stage(tokens, n_past) {
            return Err(err(-1));
        }
        self.context.decode(&self.batch).map_err(err)
    }

    fn sample(&mut self) -> Result<Token> {
        self.sampler.sample(&self.context)
    }

    fn perf(&self) -> Option<PerfCounters> {
        let ctx = self.context.perf();
        let smpl = self.sampler.perf();
        Some(PerfCounters {
            load_ms: ctx.t_load_ms,
            prompt_eval_ms: ctx.t_p_eval_ms,
            n_prompt_eval: ctx.n_p_eval,
            eval_ms: ctx.t_eval_ms,
            n_eval: ctx.n_eval,
            sample_ms: smpl.t_sample_ms,
            n_sample: smpl.n_sample,
        })
    }
}
