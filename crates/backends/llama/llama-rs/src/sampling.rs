//! Greedy sampler chain.

use std::ptr::NonNull;

use baseinf_abi::error::{EngineError, Result};
use baseinf_abi::token::Token;
use llama_cpp_sys_2::{
    llama_perf_sampler, llama_perf_sampler_data, llama_sampler, llama_sampler_chain_add,
    llama_sampler_chain_init, llama_sampler_free, llama_sampler_init_greedy, llama_sampler_sample,
};
use tracing::debug;

use crate::context::LlamaContext;
use crate::ffi::default_chain_params;
use crate::token::from_raw;

/// Owns a `llama_sampler` chain; freeing the chain frees its members.
pub struct LlamaSampler {
    chain: NonNull<llama_sampler>,
}

impl LlamaSampler {
    /// Chain with a single argmax selector and perf counters on.
    pub fn greedy() -> Result<Self> {
        let chain = unsafe { llama_sampler_chain_init(default_chain_params()) };
        let chain = NonNull::new(chain)
            .ok_or_else(|| EngineError::ContextCreate("llama_sampler_chain_init returned null".into()))?;
        unsafe { llama_sampler_chain_add(chain.as_ptr(), llama_sampler_init_greedy()) };
        debug!("[sampler] greedy chain ready");
        Ok(Self { chain })
    }

    /// Pick from the logits of the last token decoded in `ctx`.
    pub fn sample(&mut self, ctx: &LlamaContext<'_>) -> Result<Token> {
        let id = unsafe { llama_sampler_sample(self.chain.as_ptr(), ctx.as_ptr(), -1) };
        from_raw(id).ok_or_else(|| EngineError::Sample(format!("sampler returned invalid token id {id}")))
    }

    pub fn perf(&self) -> llama_perf_sampler_data {
        unsafe { llama_perf_sampler(self.chain.as_ptr()) }
    }
}

impl Drop for LlamaSampler {
    fn drop(&mut self) {
        debug!("[ffi] llama_sampler_free()");
        unsafe { llama_sampler_free(self.chain.as_ptr()) };
    }
}
